// heatmap_replay: Rust/WASM replay engine for recorded input heatmaps.
// All replay logic lives here; JS draws the heatmaps and runs the timers.

mod accumulator;
mod controller;
mod error;
mod host;
mod progress;
mod scheduler;
mod types;

use wasm_bindgen::prelude::*;

pub use accumulator::{Accumulator, Advance, BatchContribution};
pub use controller::ReplayController;
pub use error::ReplayError;
pub use host::{CommandBuffer, HostCommand, ReplayHost, ReplayView, SurfaceSink, TimerHost};
pub use progress::{percent, percent_text, Progress, ProgressReporter};
pub use scheduler::Scheduler;
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Replay engine exposed to JavaScript.
/// Every call returns the JSON array of `HostCommand`s the page must apply.
///
/// # Example JSON Input
/// ```json
/// {
///   "positions": { "0": { "points": [{ "x": 1, "y": 1, "count": 5 }], "max": 5 } },
///   "events": [
///     { "dt": "10:00:01", "display": 0, "data": [{ "x": 1, "y": 1, "count": 3 }] },
///     { "dt": "10:00:02", "display": 0, "data": [{ "x": 1, "y": 1, "count": 2 }] }
///   ],
///   "config": { "step": 1, "interval_min": 1, "interval_max": 100, "interval_current": 50 }
/// }
/// ```
#[wasm_bindgen]
pub struct WasmReplay {
    controller: ReplayController<CommandBuffer>,
}

#[wasm_bindgen]
impl WasmReplay {
    #[wasm_bindgen(constructor)]
    pub fn new(input_json: &str) -> Result<WasmReplay, JsValue> {
        let input: ReplayInput = serde_json::from_str(input_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid replay input: {}", e)))?;
        let controller = ReplayController::new(input, CommandBuffer::new())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(WasmReplay { controller })
    }

    /// Commands produced so far without a transport action, e.g. the idle view after construction.
    pub fn take_commands(&mut self) -> Result<String, JsValue> {
        self.drain()
    }

    pub fn start(&mut self) -> Result<String, JsValue> {
        self.controller.start();
        self.drain()
    }

    pub fn pause_or_resume(&mut self) -> Result<String, JsValue> {
        self.controller.pause_or_resume();
        self.drain()
    }

    pub fn stop(&mut self) -> Result<String, JsValue> {
        self.controller.stop();
        self.drain()
    }

    /// Step size from the numeric input. Values below 1 are clamped to 1.
    pub fn set_step(&mut self, step: i32) {
        self.controller.set_step(step.max(1) as usize);
    }

    /// Speed slider value, clamped into the configured interval range.
    pub fn set_interval_speed(&mut self, current: u32) {
        self.controller.set_interval_speed(current);
    }

    /// Called by JS when a `Schedule` command's timer fires.
    pub fn on_timer(&mut self, token: u64) -> Result<String, JsValue> {
        self.controller.on_timer(TimerToken::from_raw(token));
        self.drain()
    }

    /// Text for the transport button.
    pub fn state_label(&self) -> String {
        self.controller.state().transport_label().to_string()
    }

    pub fn position(&self) -> u32 {
        u32::try_from(self.controller.position()).unwrap_or(u32::MAX)
    }
}

impl WasmReplay {
    fn drain(&mut self) -> Result<String, JsValue> {
        self.controller
            .host_mut()
            .drain_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "events": [
            { "dt": "t1", "data": [{ "x": 1, "y": 1, "count": 3, "key": "a" }] },
            { "dt": "t2", "data": [{ "x": 1, "y": 1, "count": 2, "key": "a" }] }
        ],
        "config": { "step": 1 }
    }"#;

    fn commands(json: &str) -> Vec<HostCommand> {
        serde_json::from_str(json).expect("Should parse command JSON")
    }

    #[test]
    fn wasm_replay_creation_works() {
        let mut replay = WasmReplay::new(INPUT).expect("Should parse valid input");
        let idle = commands(&replay.take_commands().unwrap());

        assert_eq!(idle.len(), 2);
        assert_eq!(replay.state_label(), "Replay");
    }

    #[test]
    fn wasm_replay_runs_to_completion() {
        let mut replay = WasmReplay::new(INPUT).expect("Should parse valid input");
        replay.take_commands().unwrap();

        let mut pending = commands(&replay.start().unwrap());
        assert_eq!(replay.state_label(), "Pause");

        while let Some(token) = pending.iter().find_map(|c| match c {
            HostCommand::Schedule { token, .. } => Some(token.as_u64()),
            _ => None,
        }) {
            pending = commands(&replay.on_timer(token).unwrap());
        }

        assert_eq!(replay.position(), 2);
        assert_eq!(replay.state_label(), "Replay");
    }

    #[test]
    fn wasm_replay_stop_clears_progress() {
        let mut replay = WasmReplay::new(INPUT).expect("Should parse valid input");
        replay.start().unwrap();
        replay.set_step(-3);

        let stopped = commands(&replay.stop().unwrap());
        assert!(stopped.contains(&HostCommand::ClearProgress));
        assert_eq!(replay.position(), 0);
    }
}
