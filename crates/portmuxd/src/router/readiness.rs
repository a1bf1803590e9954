//! One-shot gate recording how the backend start turned out.

use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::ROUTER_TARGET;
use crate::engine::Completion;

/// State of a [`ReadinessGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No start outcome has been recorded yet.
    Pending,
    /// The first recorded start succeeded.
    Succeeded,
    /// The first recorded start failed.
    Failed,
}

impl Readiness {
    /// Terminal outcome, or `None` while pending.
    #[must_use]
    pub const fn outcome(self) -> Option<bool> {
        match self {
            Self::Pending => None,
            Self::Succeeded => Some(true),
            Self::Failed => Some(false),
        }
    }
}

struct Waiter {
    deadline: Option<Instant>,
    done: Completion<bool>,
}

struct GateState {
    readiness: Readiness,
    waiters: Vec<Waiter>,
    timer_running: bool,
}

/// Moves from pending to a terminal state exactly once.
///
/// Later signals are ignored. Observers that arrive after the transition see
/// the recorded state. Observers registered while pending are held by the
/// gate; one timer thread answers those whose wait runs out.
pub struct ReadinessGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl std::fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ReadinessGate")
            .field("readiness", &state.readiness)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    /// Builds a pending gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                readiness: Readiness::Pending,
                waiters: Vec::new(),
                timer_running: false,
            }),
            changed: Condvar::new(),
        }
    }

    /// Records success. Returns `true` if this call settled the gate.
    pub fn signal_success(&self) -> bool {
        self.settle(Readiness::Succeeded)
    }

    /// Records failure. Returns `true` if this call settled the gate.
    pub fn signal_failure(&self) -> bool {
        self.settle(Readiness::Failed)
    }

    /// Current state, without waiting.
    #[must_use]
    pub fn state(&self) -> Readiness {
        self.lock().readiness
    }

    /// Whether the gate settled successfully.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.state() == Readiness::Succeeded
    }

    /// Number of observers still waiting for the gate to settle.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Runs `done` with the outcome once the gate settles, or with `false`
    /// after `timeout` if it is still pending. A settled gate runs `done` on
    /// the calling thread.
    pub fn when_settled(self: &Arc<Self>, timeout: Duration, done: Completion<bool>) {
        let mut state = self.lock();
        if let Some(outcome) = state.readiness.outcome() {
            drop(state);
            done(outcome);
            return;
        }
        // An overflowing deadline leaves the observer to the settle.
        let deadline = Instant::now().checked_add(timeout);
        state.waiters.push(Waiter { deadline, done });
        if deadline.is_none() {
            return;
        }
        if state.timer_running {
            drop(state);
            self.changed.notify_all();
            return;
        }
        state.timer_running = true;
        drop(state);

        let gate = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("portmux-login-timer".to_owned())
            .spawn(move || gate.run_timer());
        if let Err(error) = spawned {
            warn!(
                target: ROUTER_TARGET,
                error = %error,
                "failed to spawn readiness timer; waiters are answered on settle only"
            );
            self.lock().timer_running = false;
        }
    }

    fn run_timer(&self) {
        debug!(target: ROUTER_TARGET, "readiness timer started");
        let mut state = self.lock();
        loop {
            if state.readiness != Readiness::Pending || state.waiters.is_empty() {
                state.timer_running = false;
                debug!(target: ROUTER_TARGET, "readiness timer stopped");
                return;
            }
            let now = Instant::now();
            let (expired, waiting): (Vec<_>, Vec<_>) = mem::take(&mut state.waiters)
                .into_iter()
                .partition(|waiter| waiter.deadline.is_some_and(|deadline| deadline <= now));
            state.waiters = waiting;
            if !expired.is_empty() {
                drop(state);
                for waiter in expired {
                    (waiter.done)(false);
                }
                state = self.lock();
                continue;
            }
            let next = state.waiters.iter().filter_map(|waiter| waiter.deadline).min();
            state = match next {
                Some(next) => {
                    self.changed
                        .wait_timeout(state, next.saturating_duration_since(now))
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .changed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn settle(&self, terminal: Readiness) -> bool {
        let mut state = self.lock();
        if state.readiness != Readiness::Pending {
            return false;
        }
        state.readiness = terminal;
        let waiters = mem::take(&mut state.waiters);
        drop(state);
        self.changed.notify_all();
        let outcome = terminal.outcome().unwrap_or(false);
        for waiter in waiters {
            (waiter.done)(outcome);
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::mpsc;

    fn reply_into(sender: &mpsc::Sender<bool>) -> Completion<bool> {
        let sender = sender.clone();
        Box::new(move |outcome| {
            let _ = sender.send(outcome);
        })
    }

    #[rstest]
    #[case(true, Readiness::Succeeded)]
    #[case(false, Readiness::Failed)]
    fn first_signal_wins(#[case] succeed_first: bool, #[case] expected: Readiness) {
        let gate = ReadinessGate::new();
        let first = if succeed_first {
            gate.signal_success()
        } else {
            gate.signal_failure()
        };
        assert!(first);
        assert!(!gate.signal_success());
        assert!(!gate.signal_failure());
        assert_eq!(gate.state(), expected);
    }

    #[test]
    fn late_observers_see_recorded_outcome() {
        let gate = Arc::new(ReadinessGate::new());
        gate.signal_failure();
        let (sender, outcomes) = mpsc::channel();
        gate.when_settled(Duration::from_secs(30), reply_into(&sender));
        assert_eq!(outcomes.try_recv(), Ok(false));
        assert_eq!(gate.waiting(), 0);
    }

    #[test]
    fn held_observers_are_released_by_settlement() {
        let gate = Arc::new(ReadinessGate::new());
        let (sender, outcomes) = mpsc::channel();
        for _ in 0..50 {
            gate.when_settled(Duration::from_secs(30), reply_into(&sender));
        }
        assert_eq!(gate.waiting(), 50);

        assert!(gate.signal_success());
        let answers: Vec<bool> = outcomes.try_iter().collect();
        assert_eq!(answers.len(), 50);
        assert!(answers.iter().all(|answer| *answer));
        assert_eq!(gate.waiting(), 0);
    }

    #[test]
    fn expired_observers_answer_false_while_pending() {
        let gate = Arc::new(ReadinessGate::new());
        let (sender, outcomes) = mpsc::channel();
        gate.when_settled(Duration::from_millis(10), reply_into(&sender));
        gate.when_settled(Duration::from_secs(30), reply_into(&sender));

        assert_eq!(outcomes.recv_timeout(Duration::from_secs(5)), Ok(false));
        assert_eq!(gate.waiting(), 1);
        assert_eq!(gate.state(), Readiness::Pending);

        gate.signal_success();
        assert_eq!(outcomes.recv_timeout(Duration::from_secs(5)), Ok(true));
    }
}
