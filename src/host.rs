// Boundary to the host page: heatmap widgets, status display and timers.
// The engine decides; the host draws and keeps time.

use serde::{Deserialize, Serialize};

use crate::error::ReplayError;
use crate::progress::Progress;
use crate::types::*;

/// Heatmap widget for one or more surfaces.
pub trait SurfaceSink {
    /// Replace a surface's whole dataset and intensity scale.
    fn set_data(&mut self, surface: SurfaceId, points: &PointSet, max: u64);

    /// Blend one event's contribution into a surface without changing its scale.
    fn add_data(&mut self, surface: SurfaceId, deltas: &[PointDelta]);
}

/// Transport button, status text and progress bar.
pub trait ReplayView {
    fn show_progress(&mut self, progress: &Progress);

    /// Reset status text and progress width to empty.
    fn clear_progress(&mut self);

    fn set_transport_label(&mut self, label: &str);
}

/// Deferred callbacks. The host calls `ReplayController::on_timer(token)` after the delay.
pub trait TimerHost {
    fn schedule(&mut self, token: TimerToken, delay_ms: u32);

    fn cancel(&mut self, token: TimerToken);
}

/// Everything the controller drives.
pub trait ReplayHost: SurfaceSink + ReplayView + TimerHost {}

impl<T: SurfaceSink + ReplayView + TimerHost> ReplayHost for T {}

/// Instruction for the host page, serialized for JS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostCommand {
    SetData {
        surface: SurfaceId,
        points: PointSet,
        max: u64,
    },
    AddData {
        surface: SurfaceId,
        deltas: Vec<PointDelta>,
    },
    ShowProgress {
        status: String,
        width: String,
    },
    ClearProgress,
    TransportLabel {
        label: String,
    },
    Schedule {
        token: TimerToken,
        delay_ms: u32,
    },
    Cancel {
        token: TimerToken,
    },
}

/// Host that records every call as a command, drained by the WASM bindings.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<HostCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        CommandBuffer::default()
    }

    pub fn commands(&self) -> &[HostCommand] {
        &self.commands
    }

    pub fn drain(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Drain pending commands as a JSON array.
    pub fn drain_json(&mut self) -> Result<String, ReplayError> {
        let commands = self.drain();
        Ok(serde_json::to_string(&commands)?)
    }
}

impl SurfaceSink for CommandBuffer {
    fn set_data(&mut self, surface: SurfaceId, points: &PointSet, max: u64) {
        self.commands.push(HostCommand::SetData {
            surface,
            points: points.clone(),
            max,
        });
    }

    fn add_data(&mut self, surface: SurfaceId, deltas: &[PointDelta]) {
        self.commands.push(HostCommand::AddData {
            surface,
            deltas: deltas.to_vec(),
        });
    }
}

impl ReplayView for CommandBuffer {
    fn show_progress(&mut self, progress: &Progress) {
        self.commands.push(HostCommand::ShowProgress {
            status: progress.status_text(),
            width: progress.width(),
        });
    }

    fn clear_progress(&mut self) {
        self.commands.push(HostCommand::ClearProgress);
    }

    fn set_transport_label(&mut self, label: &str) {
        self.commands.push(HostCommand::TransportLabel {
            label: label.to_string(),
        });
    }
}

impl TimerHost for CommandBuffer {
    fn schedule(&mut self, token: TimerToken, delay_ms: u32) {
        self.commands.push(HostCommand::Schedule { token, delay_ms });
    }

    fn cancel(&mut self, token: TimerToken) {
        self.commands.push(HostCommand::Cancel { token });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_serialize_tagged() {
        let mut buffer = CommandBuffer::new();
        let mut points = PointSet::new();
        points.add(&PointDelta::key(1, 1, 5, "a"));
        buffer.set_data(SurfaceId::new(0), &points, 5);
        buffer.schedule(TimerToken::from_raw(3), 20);

        let json = buffer.drain_json().unwrap();
        assert_eq!(
            json,
            r#"[{"type":"SetData","surface":0,"points":[{"x":1,"y":1,"count":5,"key":"a"}],"max":5},{"type":"Schedule","token":3,"delay_ms":20}]"#
        );
        assert!(buffer.commands().is_empty());
    }

    #[test]
    fn progress_commands() {
        let mut buffer = CommandBuffer::new();
        buffer.show_progress(&Progress {
            percent: 40,
            label: "t2".to_string(),
        });
        buffer.clear_progress();

        assert_eq!(
            buffer.drain(),
            vec![
                HostCommand::ShowProgress {
                    status: "t2 40%".to_string(),
                    width: "40%".to_string(),
                },
                HostCommand::ClearProgress,
            ]
        );
    }
}
