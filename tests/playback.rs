//! End-to-end playback scheduling tests against the public API.
//!
//! Frames are 1x1 with the frame's own index stored in the red channel, so
//! the recording sink can reconstruct the exact draw order.

use gifplay::{DrawConfig, DrawOverride, DrawSink, Gif, PlaybackState};
use imgref::{Img, ImgRef, ImgVec};
use rgb::RGBA8;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Recorded {
    indices: Vec<u8>,
    confs: Vec<DrawConfig>,
}

struct RecordingSink(Arc<Mutex<Recorded>>);

impl DrawSink for RecordingSink {
    fn draw(&mut self, image: ImgRef<'_, RGBA8>, conf: DrawConfig) {
        let mut rec = self.0.lock().unwrap();
        rec.indices.push(image.buf()[0].r);
        rec.confs.push(conf);
    }
}

fn frame(index: u8) -> ImgVec<RGBA8> {
    Img::new(vec![RGBA8::new(index, 0, 0, 255)], 1, 1)
}

fn gif_with_sink(frames: u8) -> (Gif, Arc<Mutex<Recorded>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let rec = Arc::new(Mutex::new(Recorded::default()));
    let mut gif = Gif::from_frames((0..frames).map(frame).collect());
    gif.set_draw_sink(Box::new(RecordingSink(Arc::clone(&rec))));
    (gif, rec)
}

fn drawn(rec: &Arc<Mutex<Recorded>>) -> Vec<u8> {
    rec.lock().unwrap().indices.clone()
}

#[test]
fn non_repeating_playback_draws_each_frame_once_then_stops() {
    let (mut gif, rec) = gif_with_sink(3);
    gif.set_repeat(false);
    gif.set_delays(&[Some(50), Some(50), Some(50)]).unwrap();

    gif.play().unwrap();
    thread::sleep(Duration::from_millis(400));

    assert_eq!(drawn(&rec), vec![0, 1, 2]);
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Stopped);
}

#[test]
fn repeating_playback_wraps_the_cursor() {
    let (mut gif, rec) = gif_with_sink(3);
    gif.set_delays(&[Some(50), Some(50), Some(50)]).unwrap();

    gif.play().unwrap();
    thread::sleep(Duration::from_millis(330));
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Running);
    gif.pause().unwrap();

    let indices = drawn(&rec);
    assert!(indices.len() >= 7, "expected at least 7 draws, got {:?}", indices);
    for (n, &index) in indices.iter().take(7).enumerate() {
        assert_eq!(usize::from(index), n % 3);
    }
}

#[test]
fn pause_right_after_play_freezes_after_the_first_draw() {
    let (mut gif, rec) = gif_with_sink(3);

    gif.play().unwrap();
    gif.pause().unwrap();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(drawn(&rec), vec![0]);
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Paused);

    // single-step while paused: one draw, still paused
    gif.next().unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(drawn(&rec), vec![0, 1]);
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Paused);

    // resume continues from the cursor without redrawing a skipped frame
    gif.play().unwrap();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(drawn(&rec), vec![0, 1, 2]);
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Running);
}

#[test]
fn next_while_stopped_draws_exactly_one_frame_per_call() {
    let (mut gif, rec) = gif_with_sink(3);

    gif.next().unwrap();
    gif.next().unwrap();
    thread::sleep(Duration::from_millis(100));

    assert_eq!(drawn(&rec), vec![0, 1]);
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Stopped);
}

#[test]
fn controller_accessor_is_idempotent() {
    let (mut gif, _rec) = gif_with_sink(2);

    let first = gif.controller().unwrap() as *const _;
    gif.play().unwrap();
    thread::sleep(Duration::from_millis(50));

    let again = gif.controller().unwrap();
    assert!(std::ptr::eq(first, again));
    assert_eq!(again.state(), PlaybackState::Running);
}

#[test]
fn play_override_merges_into_the_draw_config() {
    let (mut gif, rec) = gif_with_sink(2);

    gif.play_at(DrawOverride {
        x: Some(12),
        y: Some(-3),
        ..DrawOverride::default()
    })
    .unwrap();
    thread::sleep(Duration::from_millis(50));
    gif.pause().unwrap();

    let confs = rec.lock().unwrap().confs.clone();
    assert!(!confs.is_empty());
    assert_eq!(confs[0].x, 12);
    assert_eq!(confs[0].y, -3);
    assert_eq!(confs[0].width, 1);
    assert_eq!(confs[0].height, 1);
}

#[test]
fn play_and_pause_report_their_state_without_waiting() {
    let (mut gif, _rec) = gif_with_sink(3);

    gif.play().unwrap();
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Running);
    gif.pause().unwrap();
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Paused);
    gif.play().unwrap();
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Running);
}

#[test]
fn slow_sink_does_not_block_delay_updates() {
    struct SlowSink;
    impl DrawSink for SlowSink {
        fn draw(&mut self, _image: ImgRef<'_, RGBA8>, _conf: DrawConfig) {
            thread::sleep(Duration::from_millis(300));
        }
    }

    let _ = env_logger::builder().is_test(true).try_init();
    let mut gif = Gif::from_frames((0..2).map(frame).collect());
    gif.set_draw_sink(Box::new(SlowSink));

    gif.play().unwrap();
    thread::sleep(Duration::from_millis(50)); // first draw is now in progress

    let started = std::time::Instant::now();
    gif.set_delay_at(0, 40).unwrap();
    gif.set_repeat(false);
    assert!(
        started.elapsed() < Duration::from_millis(200),
        "config updates stalled behind the draw"
    );
}

#[test]
fn controller_stays_reusable_after_stopping() {
    let (mut gif, rec) = gif_with_sink(1);
    gif.set_repeat(false);
    gif.set_delay_at(0, 30).unwrap();

    gif.play().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(drawn(&rec), vec![0]);
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Stopped);

    gif.play().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(drawn(&rec), vec![0, 0]);
    assert_eq!(gif.playback_state().unwrap(), PlaybackState::Stopped);
}
