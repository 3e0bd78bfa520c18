// Folds slices of the event log into cumulative per-surface point sets.
// Rule: the running max is the max across the whole history, never the max of one batch.
// See DESIGN.md: Open questions and decisions

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ReplayError;
use crate::types::*;

/// What one advance contributed to a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchContribution {
    /// Blend these deltas into the surface; its scale is unchanged.
    Added {
        surface: SurfaceId,
        deltas: Vec<PointDelta>,
    },
    /// The surface's cumulative view (or its scale) changed and must be pushed whole.
    Replaced { surface: SurfaceId },
}

/// Result of one advance over the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    /// Index of the last event folded in.
    pub last_index: usize,
    /// Position of the next event to fold.
    pub next_position: usize,
    pub contributions: Vec<BatchContribution>,
}

/// Cumulative replay state for every surface over one event log.
pub struct Accumulator {
    events: Vec<ReplayEvent>,
    targets: Vec<SurfaceId>,
    views: BTreeMap<SurfaceId, SurfaceView>,
}

impl Accumulator {
    /// Resolve every event to one of `surfaces`. Events without a surface go to the
    /// single surface when there is exactly one; otherwise they are reported.
    pub fn new(events: Vec<ReplayEvent>, surfaces: &[SurfaceId]) -> Result<Self, ReplayError> {
        let known: BTreeSet<SurfaceId> = surfaces.iter().copied().collect();
        let mut targets = Vec::with_capacity(events.len());

        for (index, event) in events.iter().enumerate() {
            let target = match event.surface {
                Some(surface) if known.contains(&surface) => surface,
                Some(surface) => return Err(ReplayError::UnknownSurface { index, surface }),
                None if known.len() == 1 => surfaces[0],
                None => {
                    return Err(ReplayError::UnattributedEvent {
                        index,
                        surfaces: known.len(),
                    })
                }
            };
            targets.push(target);
        }

        let views = known.into_iter().map(|s| (s, SurfaceView::empty())).collect();
        Ok(Accumulator {
            events,
            targets,
            views,
        })
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn event(&self, index: usize) -> Option<&ReplayEvent> {
        self.events.get(index)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        self.views.keys().copied()
    }

    /// Current cumulative view for a surface.
    pub fn view(&self, surface: SurfaceId) -> Option<&SurfaceView> {
        self.views.get(&surface)
    }

    /// Clear every surface to an empty view with a zero max.
    pub fn reset(&mut self) {
        for view in self.views.values_mut() {
            *view = SurfaceView::empty();
        }
    }

    /// Replace the current views, e.g. with the full dataset on stop.
    pub fn restore(&mut self, views: &BTreeMap<SurfaceId, SurfaceView>) {
        for (surface, view) in self.views.iter_mut() {
            *view = views.get(surface).cloned().unwrap_or_default();
        }
    }

    /// View of a surface after folding every event in the log.
    pub fn full_view(&self, surface: SurfaceId) -> SurfaceView {
        match self.events.len() {
            0 => SurfaceView::empty(),
            n => self.fold(surface, n - 1),
        }
    }

    /// Fold events `[position, position + step - 1]` (capped at the last event).
    /// Returns `None` when `position` is past the end of the log.
    pub fn advance(&mut self, position: usize, step: usize) -> Option<Advance> {
        let count = self.events.len();
        if position >= count {
            return None;
        }
        let step = step.max(1);
        let last_index = position.saturating_add(step - 1).min(count - 1);

        let contributions = if step == 1 {
            self.add_one(position).into_iter().collect()
        } else {
            self.refold_touched(position, last_index)
        };

        Some(Advance {
            last_index,
            next_position: last_index + 1,
            contributions,
        })
    }

    fn add_one(&mut self, index: usize) -> Option<BatchContribution> {
        let surface = self.targets[index];
        let event = &self.events[index];
        let view = self.views.get_mut(&surface)?;

        let previous_max = view.max;
        for delta in &event.deltas {
            let value = view.points.add(delta);
            view.max = view.max.max(value);
        }

        if view.max != previous_max {
            Some(BatchContribution::Replaced { surface })
        } else if event.deltas.is_empty() {
            None
        } else {
            Some(BatchContribution::Added {
                surface,
                deltas: event.deltas.clone(),
            })
        }
    }

    fn refold_touched(&mut self, first: usize, last: usize) -> Vec<BatchContribution> {
        let touched: BTreeSet<SurfaceId> = self.targets[first..=last].iter().copied().collect();
        let mut contributions = Vec::with_capacity(touched.len());

        for surface in touched {
            let view = self.fold(surface, last);
            self.views.insert(surface, view);
            contributions.push(BatchContribution::Replaced { surface });
        }

        contributions
    }

    /// Fold every event in `[0, last]` that targets `surface`.
    fn fold(&self, surface: SurfaceId, last: usize) -> SurfaceView {
        let mut points = PointSet::new();
        for (event, target) in self.events[..=last].iter().zip(&self.targets) {
            if *target == surface {
                for delta in &event.deltas {
                    points.add(delta);
                }
            }
        }
        SurfaceView::from_points(points)
    }
}
