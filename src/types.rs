// Strong typing over strings. Newtypes for surfaces and timer tokens, typed point keys.
// See DESIGN.md: Open questions and decisions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// Identifier of one independently rendered surface (one monitored display).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SurfaceId(u32);

impl SurfaceId {
    pub const fn new(id: u32) -> Self {
        SurfaceId(id)
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a scheduled timer. A fired timer only acts if its token is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn from_raw(raw: u64) -> Self {
        TimerToken(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// One contribution of an event: an intensity added at a heatmap coordinate.
/// `tag` carries the key name for keyboard events and is absent for pointer events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointDelta {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "count", alias = "intensity")]
    pub intensity: u64,
    #[serde(
        rename = "key",
        alias = "tag",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tag: Option<String>,
}

impl PointDelta {
    pub fn pointer(x: i32, y: i32, intensity: u64) -> Self {
        PointDelta {
            x,
            y,
            intensity,
            tag: None,
        }
    }

    pub fn key(x: i32, y: i32, intensity: u64, tag: impl Into<String>) -> Self {
        PointDelta {
            x,
            y,
            intensity,
            tag: Some(tag.into()),
        }
    }

    pub fn point_key(&self) -> PointKey {
        PointKey {
            x: self.x,
            y: self.y,
            tag: self.tag.clone(),
        }
    }
}

/// Stable identity of a heatmap point: coordinate plus key tag when present.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointKey {
    pub x: i32,
    pub y: i32,
    pub tag: Option<String>,
}

/// Accumulated intensity per point key for one surface.
/// Serialized as a list of deltas, the shape the heatmap widget consumes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "Vec<PointDelta>", from = "Vec<PointDelta>")]
pub struct PointSet {
    values: BTreeMap<PointKey, u64>,
}

impl PointSet {
    pub fn new() -> Self {
        PointSet::default()
    }

    /// Add a delta's intensity at its key. Returns the accumulated value at that key.
    pub fn add(&mut self, delta: &PointDelta) -> u64 {
        let value = self.values.entry(delta.point_key()).or_insert(0);
        *value = value.saturating_add(delta.intensity);
        *value
    }

    pub fn get(&self, key: &PointKey) -> Option<u64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest accumulated value over all keys, 0 when empty.
    pub fn max_value(&self) -> u64 {
        self.values.values().copied().max().unwrap_or(0)
    }

    pub fn to_deltas(&self) -> Vec<PointDelta> {
        self.values
            .iter()
            .map(|(k, v)| PointDelta {
                x: k.x,
                y: k.y,
                intensity: *v,
                tag: k.tag.clone(),
            })
            .collect()
    }
}

impl From<Vec<PointDelta>> for PointSet {
    fn from(deltas: Vec<PointDelta>) -> Self {
        let mut set = PointSet::new();
        for delta in &deltas {
            set.add(delta);
        }
        set
    }
}

impl From<PointSet> for Vec<PointDelta> {
    fn from(set: PointSet) -> Self {
        set.to_deltas()
    }
}

/// A surface's point set together with its running maximum.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurfaceView {
    pub points: PointSet,
    pub max: u64,
}

impl SurfaceView {
    pub fn empty() -> Self {
        SurfaceView::default()
    }

    /// Build a view whose max is the true maximum over its points.
    pub fn from_points(points: PointSet) -> Self {
        let max = points.max_value();
        SurfaceView { points, max }
    }
}

/// Precomputed full view for one surface as supplied by the host page.
/// `max` falls back to the maximum over `points` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceViewInput {
    pub points: Vec<PointDelta>,
    #[serde(default)]
    pub max: Option<u64>,
}

impl From<SurfaceViewInput> for SurfaceView {
    fn from(input: SurfaceViewInput) -> Self {
        let points = PointSet::from(input.points);
        let max = input.max.unwrap_or_else(|| points.max_value());
        SurfaceView { points, max }
    }
}

/// Single recorded interaction event. Keyboard events are collated per second,
/// so one event may carry several deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayEvent {
    /// Display label, typically the event time.
    #[serde(rename = "dt")]
    pub label: String,
    #[serde(rename = "display", default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<SurfaceId>,
    #[serde(rename = "data", default)]
    pub deltas: Vec<PointDelta>,
}

impl ReplayEvent {
    pub fn new(label: impl Into<String>, deltas: Vec<PointDelta>) -> Self {
        ReplayEvent {
            label: label.into(),
            surface: None,
            deltas,
        }
    }

    pub fn on_surface(mut self, surface: SurfaceId) -> Self {
        self.surface = Some(surface);
        self
    }
}

/// Playback state machine. Idle is both the initial state and the end of every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Text for the transport button in this state.
    pub fn transport_label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "Replay",
            PlaybackState::Playing => "Pause",
            PlaybackState::Paused => "Continue",
        }
    }
}

/// Speed slider range in milliseconds. A higher `current` means a shorter delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRange {
    pub min: u32,
    pub max: u32,
    pub current: u32,
}

impl IntervalRange {
    pub fn new(min: u32, max: u32, current: u32) -> Result<Self, ReplayError> {
        if min > max {
            return Err(ReplayError::InvalidConfig(format!(
                "interval_min {} exceeds interval_max {}",
                min, max
            )));
        }
        Ok(IntervalRange {
            min,
            max,
            current: current.clamp(min, max),
        })
    }

    /// Set the slider value, clamped into range.
    pub fn set_current(&mut self, current: u32) {
        self.current = current.clamp(self.min, self.max);
    }

    /// Delay before the next advance: the slider is inverted.
    pub fn delay_ms(&self) -> u32 {
        self.max - self.current + self.min
    }
}

/// Validated replay configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    step: usize,
    pub interval: IntervalRange,
}

impl ReplayConfig {
    pub fn new(step: usize, interval: IntervalRange) -> Self {
        ReplayConfig {
            step: step.max(1),
            interval,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn set_step(&mut self, step: usize) {
        self.step = step.max(1);
    }
}

/// Replay configuration passed from JS, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySettings {
    /// Events folded per visual update. Values below 1 are clamped to 1.
    #[serde(default = "default_step")]
    pub step: i64,
    #[serde(default = "default_interval_min")]
    pub interval_min: u32,
    #[serde(default = "default_interval_max")]
    pub interval_max: u32,
    #[serde(default = "default_interval_current")]
    pub interval_current: u32,
}

fn default_step() -> i64 {
    1
}

fn default_interval_min() -> u32 {
    1
}

fn default_interval_max() -> u32 {
    100
}

fn default_interval_current() -> u32 {
    50
}

impl Default for ReplaySettings {
    fn default() -> Self {
        ReplaySettings {
            step: default_step(),
            interval_min: default_interval_min(),
            interval_max: default_interval_max(),
            interval_current: default_interval_current(),
        }
    }
}

impl ReplaySettings {
    pub fn validate(&self) -> Result<ReplayConfig, ReplayError> {
        let interval = IntervalRange::new(
            self.interval_min,
            self.interval_max,
            self.interval_current,
        )?;
        let step = usize::try_from(self.step.max(1)).unwrap_or(usize::MAX);
        Ok(ReplayConfig::new(step, interval))
    }
}

/// Everything the engine is initialized with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayInput {
    /// Precomputed full view per surface. When empty, surfaces are discovered
    /// from the events and their full views derived from the whole log.
    #[serde(default)]
    pub positions: BTreeMap<SurfaceId, SurfaceViewInput>,
    #[serde(default)]
    pub events: Vec<ReplayEvent>,
    #[serde(default)]
    pub config: ReplaySettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_set_merges_same_key() {
        let mut set = PointSet::new();
        set.add(&PointDelta::key(1, 1, 3, "a"));
        let value = set.add(&PointDelta::key(1, 1, 2, "a"));
        set.add(&PointDelta::pointer(1, 1, 4));

        assert_eq!(value, 5);
        assert_eq!(set.len(), 2);
        assert_eq!(set.max_value(), 5);
    }

    #[test]
    fn inverted_interval_delay() {
        let mut interval = IntervalRange::new(10, 200, 200).unwrap();
        assert_eq!(interval.delay_ms(), 10);

        interval.set_current(10);
        assert_eq!(interval.delay_ms(), 200);

        interval.set_current(5000);
        assert_eq!(interval.current, 200);
    }

    #[test]
    fn settings_clamp_step_and_reject_bad_range() {
        let settings = ReplaySettings {
            step: -4,
            ..ReplaySettings::default()
        };
        assert_eq!(settings.validate().unwrap().step(), 1);

        let settings = ReplaySettings {
            interval_min: 50,
            interval_max: 10,
            ..ReplaySettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ReplayError::InvalidConfig(_))
        ));
    }

    #[test]
    fn event_json_shape() {
        let json = r#"{"dt":"t1","display":1,"data":[{"x":1,"y":2,"count":3,"key":"a"},{"x":4,"y":5,"count":1}]}"#;
        let event: ReplayEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.label, "t1");
        assert_eq!(event.surface, Some(SurfaceId::new(1)));
        assert_eq!(event.deltas[0], PointDelta::key(1, 2, 3, "a"));
        assert_eq!(event.deltas[1].tag, None);
    }

    #[test]
    fn surface_view_input_defaults_max() {
        let json = r#"{"points":[{"x":0,"y":0,"count":2},{"x":0,"y":0,"count":5}]}"#;
        let input: SurfaceViewInput = serde_json::from_str(json).unwrap();
        let view = SurfaceView::from(input);

        assert_eq!(view.points.len(), 1);
        assert_eq!(view.max, 7);
    }

    #[test]
    fn input_keys_positions_by_display() {
        let json = r#"{
            "positions": { "1": { "points": [{ "x": 3, "y": 4, "count": 2 }], "max": 2 } },
            "events": [{ "dt": "t1", "display": 1, "data": [{ "x": 3, "y": 4, "count": 2 }] }],
            "config": { "step": 3 }
        }"#;
        let input: ReplayInput = serde_json::from_str(json).unwrap();

        assert!(input.positions.contains_key(&SurfaceId::new(1)));
        assert_eq!(input.config.step, 3);
        assert_eq!(input.config.interval_max, 100);
    }

    #[test]
    fn transport_labels() {
        assert_eq!(PlaybackState::Idle.transport_label(), "Replay");
        assert_eq!(PlaybackState::Playing.transport_label(), "Pause");
        assert_eq!(PlaybackState::Paused.transport_label(), "Continue");
    }
}
