// Cooperative single-threaded stepper: at most one pending timer or resume token.
// Every timer carries a token; a fired timer whose token is not current is stale.

use tracing::warn;

use crate::host::TimerHost;
use crate::types::{IntervalRange, PlaybackState, TimerToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Timer scheduled to advance from `position`.
    Timer { token: TimerToken, position: usize },
    /// Paused: continue from `position` when resumed.
    Resume { position: usize },
}

/// Owns the single pending continuation of a playback cycle.
#[derive(Debug, Default)]
pub struct Scheduler {
    generation: u64,
    pending: Option<Pending>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Arrange the next advance from `position`.
    /// Playing schedules a timer, Paused records a resume token, Idle does nothing.
    pub fn schedule_next<T: TimerHost>(
        &mut self,
        state: PlaybackState,
        position: usize,
        interval: &IntervalRange,
        host: &mut T,
    ) {
        self.cancel(host);
        match state {
            PlaybackState::Playing => {
                self.generation += 1;
                let token = TimerToken::from_raw(self.generation);
                host.schedule(token, interval.delay_ms());
                self.pending = Some(Pending::Timer { token, position });
            }
            PlaybackState::Paused => {
                self.pending = Some(Pending::Resume { position });
            }
            PlaybackState::Idle => {}
        }
    }

    /// Consume a fired timer. Returns the position to advance from,
    /// or `None` if the token was invalidated.
    pub fn fire(&mut self, token: TimerToken) -> Option<usize> {
        match self.pending {
            Some(Pending::Timer {
                token: current,
                position,
            }) if current == token => {
                self.pending = None;
                Some(position)
            }
            _ => {
                warn!(token = token.as_u64(), "ignoring stale timer");
                None
            }
        }
    }

    /// Consume the resume token recorded while paused.
    pub fn take_resume(&mut self) -> Option<usize> {
        match self.pending {
            Some(Pending::Resume { position }) => {
                self.pending = None;
                Some(position)
            }
            _ => None,
        }
    }

    /// Invalidate any pending timer or resume token.
    pub fn cancel<T: TimerHost>(&mut self, host: &mut T) {
        if let Some(Pending::Timer { token, .. }) = self.pending.take() {
            host.cancel(token);
        }
    }

    /// Token of the pending timer, if one is scheduled.
    pub fn pending_timer(&self) -> Option<TimerToken> {
        match self.pending {
            Some(Pending::Timer { token, .. }) => Some(token),
            _ => None,
        }
    }

    pub fn has_resume(&self) -> bool {
        matches!(self.pending, Some(Pending::Resume { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Timers {
        scheduled: Vec<(TimerToken, u32)>,
        cancelled: Vec<TimerToken>,
    }

    impl TimerHost for Timers {
        fn schedule(&mut self, token: TimerToken, delay_ms: u32) {
            self.scheduled.push((token, delay_ms));
        }

        fn cancel(&mut self, token: TimerToken) {
            self.cancelled.push(token);
        }
    }

    fn interval() -> IntervalRange {
        IntervalRange::new(10, 100, 70).unwrap()
    }

    #[test]
    fn playing_schedules_inverted_delay() {
        let mut scheduler = Scheduler::new();
        let mut timers = Timers::default();
        scheduler.schedule_next(PlaybackState::Playing, 4, &interval(), &mut timers);

        let (token, delay) = timers.scheduled[0];
        assert_eq!(delay, 40);
        assert_eq!(scheduler.pending_timer(), Some(token));
        assert_eq!(scheduler.fire(token), Some(4));
        assert_eq!(scheduler.pending_timer(), None);
    }

    #[test]
    fn rescheduling_invalidates_previous_timer() {
        let mut scheduler = Scheduler::new();
        let mut timers = Timers::default();
        scheduler.schedule_next(PlaybackState::Playing, 0, &interval(), &mut timers);
        scheduler.schedule_next(PlaybackState::Playing, 1, &interval(), &mut timers);

        let (stale, _) = timers.scheduled[0];
        let (current, _) = timers.scheduled[1];
        assert_ne!(stale, current);
        assert_eq!(timers.cancelled, vec![stale]);
        assert_eq!(scheduler.fire(stale), None);
        assert_eq!(scheduler.fire(current), Some(1));
    }

    #[test]
    fn paused_records_resume_token() {
        let mut scheduler = Scheduler::new();
        let mut timers = Timers::default();
        scheduler.schedule_next(PlaybackState::Playing, 2, &interval(), &mut timers);
        let (token, _) = timers.scheduled[0];

        scheduler.schedule_next(PlaybackState::Paused, 2, &interval(), &mut timers);
        assert!(scheduler.has_resume());
        assert_eq!(scheduler.fire(token), None);
        assert_eq!(scheduler.take_resume(), Some(2));
        assert_eq!(scheduler.take_resume(), None);
    }

    #[test]
    fn idle_schedules_nothing() {
        let mut scheduler = Scheduler::new();
        let mut timers = Timers::default();
        scheduler.schedule_next(PlaybackState::Idle, 0, &interval(), &mut timers);

        assert!(timers.scheduled.is_empty());
        assert_eq!(scheduler.pending_timer(), None);
        assert!(!scheduler.has_resume());
    }
}
