//! The playback controller: play/pause/step over a gif's frame routine.

use crate::routine::{Routine, RoutineState, Work};
use crate::{Shared, DEFAULT_DELAY_MS};
use imgref::ImgRef;
use rgb::RGBA8;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Receives each frame as it becomes due for display.
///
/// The sink is called from the playback thread, strictly sequentially, once
/// per scheduled step. Drawing is assumed to succeed; a sink that wants to
/// report trouble has to do so through its own channels.
pub trait DrawSink: Send {
    fn draw(&mut self, image: ImgRef<'_, RGBA8>, conf: DrawConfig);
}

pub(crate) type SharedSink = Arc<Mutex<Box<dyn DrawSink>>>;

/// Where and how large the frames are drawn. Defaults to the origin and the
/// gif's logical screen size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Partial draw-config update merged by [`PlaybackController::play`].
/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawOverride {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl DrawConfig {
    fn merge(&mut self, over: DrawOverride) {
        if let Some(x) = over.x {
            self.x = x;
        }
        if let Some(y) = over.y {
            self.y = y;
        }
        if let Some(width) = over.width {
            self.width = width;
        }
        if let Some(height) = over.height {
            self.height = height;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Running,
    Paused,
}

impl From<RoutineState> for PlaybackState {
    fn from(state: RoutineState) -> Self {
        match state {
            RoutineState::Idle => PlaybackState::Stopped,
            RoutineState::Pending => PlaybackState::Running,
            RoutineState::Paused => PlaybackState::Paused,
        }
    }
}

/// Owns the one routine that advances the frame cursor and invokes the draw
/// sink. Built lazily by [`Gif::controller`](crate::Gif::controller), at most
/// once per gif; reusable indefinitely across state transitions.
pub struct PlaybackController {
    routine: Routine,
    draw_conf: Arc<Mutex<DrawConfig>>,
}

impl PlaybackController {
    pub(crate) fn new(shared: Arc<Mutex<Shared>>, sink: SharedSink) -> Self {
        let draw_conf = {
            let sh = shared.lock().unwrap();
            Arc::new(Mutex::new(DrawConfig {
                x: 0,
                y: 0,
                width: sh.width,
                height: sh.height,
            }))
        };

        let conf = Arc::clone(&draw_conf);
        // the draw-step closure is the only mutator of the cursor
        let mut index = 0usize;
        let work: Work = Box::new(move || {
            let conf = *conf.lock().unwrap();
            // snapshot the frame so the gif stays unlocked for however long
            // the sink takes to draw
            let image = shared.lock().unwrap().frames[index].clone();
            sink.lock().unwrap().draw(image.as_ref(), conf);

            index += 1;
            let sh = shared.lock().unwrap();
            if index >= sh.frames.len() {
                index = 0;
                if !sh.repeat {
                    return None;
                }
            }

            // the hold time of the frame about to be shown next;
            // 0 here is a gif-encoding artifact, not a real delay
            let delay_ms = match sh.delays.get(index) {
                Some(&ms) if ms != 0 => ms,
                _ => DEFAULT_DELAY_MS,
            };
            Some(Duration::from_millis(u64::from(delay_ms)))
        });

        Self {
            routine: Routine::new(work),
            draw_conf,
        }
    }

    /// Start or resume playback. The first frame (or the frame the cursor was
    /// paused on) is drawn immediately. An override, if given, is merged into
    /// the shared draw configuration first; last write wins.
    pub fn play(&self, position: Option<DrawOverride>) {
        if let Some(over) = position {
            self.draw_conf.lock().unwrap().merge(over);
        }
        self.routine.start();
    }

    /// Cancel the pending step, keeping the cursor. Idempotent.
    pub fn pause(&self) {
        self.routine.pause();
    }

    /// Force-advance by exactly one frame and draw it, independent of the
    /// running timer. Does not change the playback state.
    pub fn next(&self) {
        self.routine.step();
    }

    pub fn state(&self) -> PlaybackState {
        self.routine.state().into()
    }

    /// Current draw configuration.
    pub fn draw_config(&self) -> DrawConfig {
        *self.draw_conf.lock().unwrap()
    }
}
