// Browser-side checks of the JSON boundary. Run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use heatmap_replay::{HostCommand, WasmReplay};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const INPUT: &str = r#"{
    "positions": { "0": { "points": [{ "x": 4, "y": 2, "count": 7 }] } },
    "events": [
        { "dt": "10:00:01", "display": 0, "data": [{ "x": 4, "y": 2, "count": 3 }] },
        { "dt": "10:00:02", "display": 0, "data": [{ "x": 4, "y": 2, "count": 4 }] }
    ]
}"#;

#[wasm_bindgen_test]
fn invalid_input_is_rejected() {
    assert!(WasmReplay::new("{\"events\": 3}").is_err());
}

#[wasm_bindgen_test]
fn start_schedules_first_advance() {
    let mut replay = WasmReplay::new(INPUT).unwrap();
    replay.take_commands().unwrap();

    let commands: Vec<HostCommand> = serde_json::from_str(&replay.start().unwrap()).unwrap();
    assert!(commands
        .iter()
        .any(|c| matches!(c, HostCommand::Schedule { delay_ms: 51, .. })));
    assert_eq!(replay.state_label(), "Pause");
}
