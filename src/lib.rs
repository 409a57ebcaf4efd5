//! Frame playback scheduler for animated GIFs.
//!
//! A [`Gif`] holds an ordered set of decoded frames plus per-frame timing,
//! loaded either from a URI (fetched and decoded on a background thread) or
//! from frames the caller decoded itself. Playback runs on a timer routine
//! whose period is re-read from the delay table after every frame, and is
//! driven through a lazily-built [`PlaybackController`]: play, pause,
//! single-step, state query.
//!
//! ```no_run
//! use gifplay::{DrawConfig, DrawSink, Gif};
//! use imgref::ImgRef;
//! use rgb::RGBA8;
//!
//! struct Stdout;
//! impl DrawSink for Stdout {
//!     fn draw(&mut self, image: ImgRef<'_, RGBA8>, conf: DrawConfig) {
//!         println!("{}x{} frame at {},{}", image.width(), image.height(), conf.x, conf.y);
//!     }
//! }
//!
//! # fn run() -> gifplay::CatResult<()> {
//! let mut gif = Gif::from_uri("https://example.com/cat.gif")?;
//! while gif.is_loading() {
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! gif.set_draw_sink(Box::new(Stdout));
//! gif.play()?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate quick_error;

use imgref::*;
use rgb::*;

mod error;
pub use crate::error::*;
mod player;
pub use crate::player::*;
mod routine;
mod source;
pub use crate::source::Source;

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

/// Delay used when a frame's delay table entry is missing or zero.
pub const DEFAULT_DELAY_MS: u32 = 100;

/// Floor below which the delay setters leave the stored value unchanged.
/// Malformed gifs commonly carry 0 or garbage, which would busy-loop the timer.
pub const MIN_DELAY_MS: u32 = 10;

pub(crate) struct Shared {
    pub frames: Vec<ImgVec<RGBA8>>,
    pub delays: Vec<u32>,
    pub repeat: bool,
    pub width: u32,
    pub height: u32,
    pub loading: bool,
    pub load_error: Option<Error>,
}

impl Shared {
    /// Decoding finished, frames exist, nothing in flight.
    fn ready(&self) -> bool {
        !self.loading && !self.frames.is_empty()
    }
}

/// An animated gif: the frame set, its playback configuration, and the
/// lazily-built controller driving frame display.
///
/// Frames are immutable once loaded; the delay table and the repeat flag stay
/// mutable and are re-read by the routine before every step, so changes take
/// effect on the very next frame.
pub struct Gif {
    src: Option<String>,
    shared: Arc<Mutex<Shared>>,
    sink: Option<SharedSink>,
    controller: Option<PlaybackController>,
}

impl Gif {
    /// Build from either variant of [`Source`].
    ///
    /// `Source::Uri` kicks off a background fetch+decode; the gif is usable
    /// once [`is_loading`](Self::is_loading) turns false. An empty URI is
    /// `InvalidArgument`. `Source::Frames` is ready immediately, with every
    /// delay set to [`DEFAULT_DELAY_MS`].
    pub fn new(source: Source) -> CatResult<Self> {
        match source {
            Source::Uri(uri) => {
                if uri.is_empty() {
                    return Err(Error::InvalidArgument("empty source uri"));
                }
                Ok(Self::start_loading(uri))
            }
            Source::Frames(frames) => Ok(Self::from_frames(frames)),
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> CatResult<Self> {
        Self::new(Source::Uri(uri.into()))
    }

    /// Build from frames the caller already decoded. Ready immediately.
    pub fn from_frames(frames: Vec<ImgVec<RGBA8>>) -> Self {
        let (width, height) = frames.iter().fold((0, 0), |(w, h), frame| {
            (w.max(frame.width() as u32), h.max(frame.height() as u32))
        });
        let delays = vec![DEFAULT_DELAY_MS; frames.len()];
        Self {
            src: None,
            shared: Arc::new(Mutex::new(Shared {
                frames,
                delays,
                repeat: true,
                width,
                height,
                loading: false,
                load_error: None,
            })),
            sink: None,
            controller: None,
        }
    }

    fn start_loading(uri: String) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            frames: Vec::new(),
            delays: Vec::new(),
            repeat: true,
            width: 0,
            height: 0,
            loading: true,
            load_error: None,
        }));

        let loader_shared = Arc::clone(&shared);
        let loader_uri = uri.clone();
        thread::Builder::new()
            .name("gif-load".into())
            .spawn(move || {
                let result =
                    source::fetch(&loader_uri).and_then(|bytes| source::decode(&bytes));
                let mut sh = loader_shared.lock().unwrap();
                match result {
                    Ok(decoded) => {
                        sh.delays = decoded.delays_ms;
                        sh.frames = decoded.frames;
                        sh.width = decoded.width;
                        sh.height = decoded.height;
                    }
                    Err(err) => {
                        // no partial frame set is published on failure
                        log::warn!("loading {} failed: {}", loader_uri, err);
                        sh.load_error = Some(err);
                    }
                }
                sh.loading = false;
            })
            .unwrap();

        Self {
            src: Some(uri),
            shared,
            sink: None,
            controller: None,
        }
    }

    /// URI this gif was loaded from, if any.
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// True while the background fetch+decode is still running.
    pub fn is_loading(&self) -> bool {
        self.shared.lock().unwrap().loading
    }

    /// Error of a failed background load, handed out once.
    pub fn take_load_error(&self) -> Option<Error> {
        self.shared.lock().unwrap().load_error.take()
    }

    fn ready_shared(&self) -> CatResult<MutexGuard<'_, Shared>> {
        let sh = self.shared.lock().unwrap();
        if sh.ready() {
            Ok(sh)
        } else {
            Err(Error::NotReady)
        }
    }

    /// Decoded frames. `NotReady` while loading or when no frames exist.
    pub fn frames(&self) -> CatResult<Vec<ImgVec<RGBA8>>> {
        Ok(self.ready_shared()?.frames.clone())
    }

    pub fn frame_count(&self) -> CatResult<usize> {
        Ok(self.ready_shared()?.frames.len())
    }

    /// Logical screen size of the gif.
    pub fn dimensions(&self) -> CatResult<(u32, u32)> {
        let sh = self.ready_shared()?;
        Ok((sh.width, sh.height))
    }

    /// Per-frame hold times in milliseconds.
    pub fn delays(&self) -> CatResult<Vec<u32>> {
        Ok(self.ready_shared()?.delays.clone())
    }

    /// Overwrite delays position by position. Entries that are `None` or
    /// below [`MIN_DELAY_MS`] are skipped, not rejected, so partial or sparse
    /// override lists work without aborting the whole update.
    pub fn set_delays(&self, values: &[Option<u32>]) -> CatResult<()> {
        let mut sh = self.ready_shared()?;
        for (slot, value) in sh.delays.iter_mut().zip(values) {
            if let Some(ms) = *value {
                if ms >= MIN_DELAY_MS {
                    *slot = ms;
                }
            }
        }
        Ok(())
    }

    /// Set one frame's delay and return what is now stored there.
    ///
    /// A value below [`MIN_DELAY_MS`] leaves the existing delay unchanged
    /// (and returns it) rather than failing. An index outside the frame
    /// range is `IndexOutOfRange`.
    pub fn set_delay_at(&self, index: usize, value: u32) -> CatResult<u32> {
        let mut sh = self.ready_shared()?;
        let len = sh.delays.len();
        if index >= len {
            return Err(Error::IndexOutOfRange(index, len));
        }
        if value >= MIN_DELAY_MS {
            sh.delays[index] = value;
        }
        Ok(sh.delays[index])
    }

    /// Whether playback wraps past the last frame. Defaults to true.
    pub fn repeat(&self) -> bool {
        self.shared.lock().unwrap().repeat
    }

    /// Takes effect on the routine's next step; last write wins.
    pub fn set_repeat(&self, repeat: bool) {
        self.shared.lock().unwrap().repeat = repeat;
    }

    /// Install or replace the surface frames are drawn onto. Replacing the
    /// sink while playback runs takes effect on the next draw.
    pub fn set_draw_sink(&mut self, sink: Box<dyn DrawSink>) {
        match &self.sink {
            Some(slot) => *slot.lock().unwrap() = sink,
            None => self.sink = Some(Arc::new(Mutex::new(sink))),
        }
    }

    /// Construct-or-fetch the playback controller.
    ///
    /// Built on first access, after checking the gif is ready (`NotReady`
    /// otherwise) and a draw sink is installed (`NoSink`). Subsequent calls
    /// return the same controller with its state and schedule intact; there
    /// is at most one controller per gif.
    pub fn controller(&mut self) -> CatResult<&PlaybackController> {
        if !self.shared.lock().unwrap().ready() {
            return Err(Error::NotReady);
        }
        if self.controller.is_none() {
            let sink = self.sink.as_ref().ok_or(Error::NoSink)?;
            log::debug!(
                "building playback controller for {}",
                self.src.as_deref().unwrap_or("<frames>")
            );
            self.controller = Some(PlaybackController::new(
                Arc::clone(&self.shared),
                Arc::clone(sink),
            ));
        }
        Ok(self.controller.as_ref().expect("controller"))
    }

    /// Start or resume playback from the current cursor.
    pub fn play(&mut self) -> CatResult<()> {
        self.controller()?.play(None);
        Ok(())
    }

    /// Like [`play`](Self::play), merging a draw-config override first.
    pub fn play_at(&mut self, position: DrawOverride) -> CatResult<()> {
        self.controller()?.play(Some(position));
        Ok(())
    }

    pub fn pause(&mut self) -> CatResult<()> {
        self.controller()?.pause();
        Ok(())
    }

    /// Draw exactly one frame and advance the cursor, whatever the state.
    pub fn next(&mut self) -> CatResult<()> {
        self.controller()?.next();
        Ok(())
    }

    pub fn playback_state(&mut self) -> CatResult<PlaybackState> {
        Ok(self.controller()?.state())
    }
}
