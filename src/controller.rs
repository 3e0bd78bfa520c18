// Replay state machine: transport controls over accumulator, scheduler and progress.
// Control flow branches on PlaybackState, never on display strings.
// See DESIGN.md: Open questions and decisions

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::accumulator::{Accumulator, Advance, BatchContribution};
use crate::error::ReplayError;
use crate::host::ReplayHost;
use crate::progress::{Progress, ProgressReporter};
use crate::scheduler::Scheduler;
use crate::types::*;

/// Replays a recorded event log onto the host's heatmap surfaces.
pub struct ReplayController<H: ReplayHost> {
    host: H,
    accumulator: Accumulator,
    /// Full dataset per surface: the idle view and the restore target on stop.
    full_views: BTreeMap<SurfaceId, SurfaceView>,
    scheduler: Scheduler,
    progress: ProgressReporter,
    last_progress: Option<Progress>,
    config: ReplayConfig,
    state: PlaybackState,
    position: usize,
    /// Surfaces show a replayed view rather than the full dataset.
    replayed: bool,
}

impl<H: ReplayHost> ReplayController<H> {
    /// Validate the input and show the full view on every surface.
    pub fn new(input: ReplayInput, host: H) -> Result<Self, ReplayError> {
        let config = input.config.validate()?;

        let mut surfaces: BTreeSet<SurfaceId> = input.positions.keys().copied().collect();
        let derive_full_views = surfaces.is_empty();
        if derive_full_views {
            surfaces.extend(input.events.iter().filter_map(|e| e.surface));
        }
        if surfaces.is_empty() {
            surfaces.insert(SurfaceId::default());
        }
        let surfaces: Vec<SurfaceId> = surfaces.into_iter().collect();

        let mut accumulator = Accumulator::new(input.events, &surfaces)?;
        let full_views: BTreeMap<SurfaceId, SurfaceView> = if derive_full_views {
            surfaces
                .iter()
                .map(|s| (*s, accumulator.full_view(*s)))
                .collect()
        } else {
            input
                .positions
                .into_iter()
                .map(|(s, view)| (s, SurfaceView::from(view)))
                .collect()
        };
        accumulator.restore(&full_views);

        debug!(
            events = accumulator.event_count(),
            surfaces = surfaces.len(),
            step = config.step(),
            "replay controller ready"
        );

        let mut controller = ReplayController {
            host,
            accumulator,
            full_views,
            scheduler: Scheduler::new(),
            progress: ProgressReporter::new(),
            last_progress: None,
            config,
            state: PlaybackState::Idle,
            position: 0,
            replayed: false,
        };
        controller.show_full_views();
        controller.set_state(PlaybackState::Idle);
        Ok(controller)
    }

    /// Begin a new playback cycle from the first event. Ignored unless Idle.
    pub fn start(&mut self) {
        if self.state != PlaybackState::Idle {
            return;
        }
        self.scheduler.cancel(&mut self.host);
        self.position = 0;
        self.progress.reset();
        self.last_progress = None;
        self.host.clear_progress();

        if self.accumulator.event_count() == 0 {
            debug!("empty event log, nothing to replay");
            self.replayed = false;
            self.show_full_views();
            self.set_state(PlaybackState::Idle);
            return;
        }

        self.accumulator.reset();
        self.replayed = true;
        let surfaces: Vec<SurfaceId> = self.accumulator.surfaces().collect();
        for surface in surfaces {
            self.host.set_data(surface, &PointSet::new(), 0);
        }

        debug!(events = self.accumulator.event_count(), "replay started");
        self.set_state(PlaybackState::Playing);
        self.scheduler.schedule_next(
            self.state,
            self.position,
            &self.config.interval,
            &mut self.host,
        );
    }

    /// Toggle between Playing and Paused. Ignored while Idle.
    pub fn pause_or_resume(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                self.set_state(PlaybackState::Paused);
                self.scheduler.schedule_next(
                    self.state,
                    self.position,
                    &self.config.interval,
                    &mut self.host,
                );
                debug!(position = self.position, "replay paused");
            }
            PlaybackState::Paused => {
                self.set_state(PlaybackState::Playing);
                debug!(position = self.position, "replay resumed");
                if let Some(position) = self.scheduler.take_resume() {
                    self.advance_from(position);
                }
            }
            PlaybackState::Idle => {}
        }
    }

    /// End the cycle and restore the full dataset.
    /// Also restores after a cycle that finished on its own; otherwise ignored while Idle.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Idle && !self.replayed {
            return;
        }
        self.scheduler.cancel(&mut self.host);
        self.position = 0;
        self.progress.reset();
        self.last_progress = None;
        self.host.clear_progress();
        self.accumulator.restore(&self.full_views);
        self.show_full_views();
        self.replayed = false;
        self.set_state(PlaybackState::Idle);
        debug!("replay stopped");
    }

    /// Events folded per advance, from the next advance on. Clamped to at least 1.
    pub fn set_step(&mut self, step: usize) {
        self.config.set_step(step);
    }

    /// Speed slider value, from the next scheduled advance on.
    pub fn set_interval_speed(&mut self, current: u32) {
        self.config.interval.set_current(current);
    }

    /// Timer callback from the host. Stale tokens are ignored.
    pub fn on_timer(&mut self, token: TimerToken) {
        let Some(position) = self.scheduler.fire(token) else {
            return;
        };
        if self.state == PlaybackState::Playing {
            self.advance_from(position);
        }
    }

    fn advance_from(&mut self, position: usize) {
        let count = self.accumulator.event_count();
        let Some(advance) = self.accumulator.advance(position, self.config.step()) else {
            self.finish();
            return;
        };
        trace!(
            position,
            last = advance.last_index,
            step = self.config.step(),
            "advanced"
        );

        self.push_contributions(&advance);
        let label = self
            .accumulator
            .event(advance.last_index)
            .map(|e| e.label.as_str())
            .unwrap_or_default();
        let progress = self.progress.report(advance.last_index, count, label);
        self.host.show_progress(&progress);
        self.last_progress = Some(progress);
        self.position = advance.next_position;

        if self.position >= count {
            self.finish();
        } else {
            self.scheduler.schedule_next(
                self.state,
                self.position,
                &self.config.interval,
                &mut self.host,
            );
        }
    }

    fn push_contributions(&mut self, advance: &Advance) {
        for contribution in &advance.contributions {
            match contribution {
                BatchContribution::Added { surface, deltas } => {
                    self.host.add_data(*surface, deltas);
                }
                BatchContribution::Replaced { surface } => {
                    if let Some(view) = self.accumulator.view(*surface) {
                        self.host.set_data(*surface, &view.points, view.max);
                    }
                }
            }
        }
    }

    /// Natural end of a cycle: the last event stays shown until `stop` or `start`.
    fn finish(&mut self) {
        self.scheduler.cancel(&mut self.host);
        self.set_state(PlaybackState::Idle);
        debug!(events = self.accumulator.event_count(), "replay finished");
    }

    fn show_full_views(&mut self) {
        for (surface, view) in &self.full_views {
            self.host.set_data(*surface, &view.points, view.max);
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
        self.host.set_transport_label(state.transport_label());
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Position of the next event to replay.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn event_count(&self) -> usize {
        self.accumulator.event_count()
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Current view of a surface as last pushed to the host.
    pub fn surface(&self, surface: SurfaceId) -> Option<&SurfaceView> {
        self.accumulator.view(surface)
    }

    /// Precomputed full view of a surface.
    pub fn full_view(&self, surface: SurfaceId) -> Option<&SurfaceView> {
        self.full_views.get(&surface)
    }

    /// Last progress shown in the current cycle.
    pub fn progress(&self) -> Option<&Progress> {
        self.last_progress.as_ref()
    }

    /// Token of the timer the host should currently be holding.
    pub fn pending_timer(&self) -> Option<TimerToken> {
        self.scheduler.pending_timer()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}
