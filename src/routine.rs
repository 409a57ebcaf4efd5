//! Repeating timed work where the work itself picks the delay before its
//! next invocation.
//!
//! A fixed-period timer can't drive gif playback because every frame has its
//! own hold time, so the wait is re-derived after every invocation from the
//! work's return value.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// One invocation of the scheduled work. Returns the delay to wait before
/// the next invocation, or `None` to cancel the routine from within.
pub(crate) type Work = Box<dyn FnMut() -> Option<Duration> + Send>;

/// Whether a scheduled invocation is currently pending, paused, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoutineState {
    Idle,
    Pending,
    Paused,
}

enum Command {
    Start,
    Pause,
    #[cfg(test)]
    Stop,
    Step,
    Shutdown,
}

/// Runs work repeatedly on a dedicated thread. Invocations are strictly
/// sequential: each invocation's completion is what schedules the next, so
/// at most one is ever in flight. Control calls flip the visible state under
/// the lock before enqueueing their command, so a state query right after
/// `start()` already reports `Pending`; the worker only writes the state on
/// self-cancel, which therefore always wins over a stale caller transition.
pub(crate) struct Routine {
    commands: Sender<Command>,
    state: Arc<Mutex<RoutineState>>,
    worker: Option<JoinHandle<()>>,
}

impl Routine {
    pub fn new(work: Work) -> Self {
        let state = Arc::new(Mutex::new(RoutineState::Idle));
        let (commands, receiver) = unbounded();
        let thread_state = Arc::clone(&state);
        let worker = thread::Builder::new()
            .name("gif-playback".into())
            .spawn(move || run(work, receiver, thread_state))
            .unwrap();
        Self { commands, state, worker: Some(worker) }
    }

    /// Invoke the work now and keep it scheduled. No-op if already pending.
    pub fn start(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if *state == RoutineState::Pending {
                return; // re-entrant start is a no-op
            }
            *state = RoutineState::Pending;
        }
        self.commands.send(Command::Start).ok();
    }

    /// Cancel the pending invocation; a later `start()` resumes by invoking
    /// the work again immediately. Idempotent when paused or idle.
    pub fn pause(&self) {
        {
            let mut state = self.state.lock().unwrap();
            if *state != RoutineState::Pending {
                return;
            }
            *state = RoutineState::Paused;
        }
        self.commands.send(Command::Pause).ok();
    }

    /// Cancel the pending invocation and reset to `Idle`.
    #[cfg(test)]
    pub fn stop(&self) {
        *self.state.lock().unwrap() = RoutineState::Idle;
        self.commands.send(Command::Stop).ok();
    }

    /// Invoke the work exactly once, without touching the pending schedule.
    pub fn step(&self) {
        self.commands.send(Command::Step).ok();
    }

    pub fn state(&self) -> RoutineState {
        *self.state.lock().unwrap()
    }
}

impl Drop for Routine {
    fn drop(&mut self) {
        self.commands.send(Command::Shutdown).ok();
        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}

fn run(mut work: Work, commands: Receiver<Command>, state: Arc<Mutex<RoutineState>>) {
    // `Some(at)` means an invocation is scheduled for `at`
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => match commands.recv_deadline(at) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            },
        };

        match command {
            // the wait ran out: perform the scheduled invocation
            None => match work() {
                Some(delay) => deadline = Some(Instant::now() + delay),
                None => {
                    log::trace!("routine cancelled itself");
                    deadline = None;
                    *state.lock().unwrap() = RoutineState::Idle;
                }
            },
            Some(Command::Start) => {
                if deadline.is_some() {
                    continue; // already scheduled
                }
                match work() {
                    Some(delay) => deadline = Some(Instant::now() + delay),
                    None => {
                        deadline = None;
                        *state.lock().unwrap() = RoutineState::Idle;
                    }
                }
            }
            Some(Command::Pause) => deadline = None,
            #[cfg(test)]
            Some(Command::Stop) => deadline = None,
            Some(Command::Step) => {
                if work().is_none() {
                    deadline = None;
                    *state.lock().unwrap() = RoutineState::Idle;
                }
            }
            Some(Command::Shutdown) => return,
        }
    }
}
