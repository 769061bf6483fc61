// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use masa::playback::source::frame_marker;
use masa::playback::{MemorySource, Session};
use masa::{Direction, EngineConfig, Error, Frame, FrameSource, PlaybackEngine, PlaybackEvent};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fast() -> EngineConfig {
    EngineConfig {
        rate_fps: 1000.0,
        idle_poll_ms: 1,
        ..EngineConfig::default()
    }
}

fn engine(length: usize, config: &EngineConfig) -> PlaybackEngine {
    let source = MemorySource::generated(length, 8, 6).unwrap();
    PlaybackEngine::new(Box::new(source), config).unwrap()
}

/// Collect emitted frame indices until end of stream.
fn play_to_end(events: &Receiver<PlaybackEvent>) -> (Vec<usize>, usize) {
    let mut seen = Vec::new();
    loop {
        match events.recv_timeout(TIMEOUT).unwrap() {
            PlaybackEvent::Frame { index, frame } => {
                assert_eq!(frame_marker(&frame), index);
                seen.push(index);
            }
            PlaybackEvent::EndOfStream(index) => return (seen, index),
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[test]
fn test_forward_playback_reaches_end() {
    let e = engine(10, &fast());
    let events = e.subscribe();
    e.play();

    let (seen, end) = play_to_end(&events);
    assert_eq!(seen, (0..10).collect::<Vec<_>>());
    assert_eq!(end, 9);
    assert!(!e.is_running());
    assert_eq!(e.cursor(), Some(9));

    // forward reads never need a seek
    assert_eq!(e.reader_stats().seeks, 0);
    assert_eq!(e.reader_stats().sequential, 10);
}

#[test]
fn test_backward_playback_from_last_frame() {
    let e = engine(10, &fast());
    let events = e.subscribe();
    assert!(e.set_backward(true));
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::DirectionChanged(Direction::Backward)
    ));
    e.play();

    let (seen, end) = play_to_end(&events);
    assert_eq!(seen, (0..10).rev().collect::<Vec<_>>());
    assert_eq!(end, 0);
}

#[test]
fn test_backward_from_config() {
    let cfg = EngineConfig {
        backward: true,
        ..fast()
    };
    let e = engine(4, &cfg);
    let events = e.subscribe();
    e.play();
    assert_eq!(play_to_end(&events), (vec![3, 2, 1, 0], 0));
}

#[test]
fn test_play_after_end_reports_end_again() {
    let e = engine(3, &fast());
    let events = e.subscribe();
    e.play();
    play_to_end(&events);

    e.play();
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::EndOfStream(2)
    ));
}

#[test]
fn test_seek_emits_and_playback_continues_from_there() {
    let e = engine(10, &fast());
    let events = e.subscribe();
    let frame = e.seek(5).unwrap();
    assert_eq!(frame_marker(&frame), 5);
    assert_eq!(e.cursor(), Some(5));
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::Frame { index: 5, .. }
    ));

    e.play();
    let (seen, end) = play_to_end(&events);
    assert_eq!(seen, vec![6, 7, 8, 9]);
    assert_eq!(end, 9);
}

#[test]
fn test_seek_pauses_playback() {
    let slow = EngineConfig {
        rate_fps: 2.0,
        idle_poll_ms: 1,
        ..EngineConfig::default()
    };
    let e = engine(10, &slow);
    let events = e.subscribe();
    e.play();
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::Frame { index: 0, .. }
    ));

    e.seek(8).unwrap();
    assert!(!e.is_running());
    assert_eq!(e.cursor(), Some(8));
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::Frame { index: 8, .. }
    ));
    assert!(events.recv_timeout(Duration::from_millis(700)).is_err());
}

#[test]
fn test_seek_out_of_range() {
    let e = engine(4, &fast());
    assert!(matches!(
        e.seek(4),
        Err(Error::FrameOutOfRange { index: 4, length: 4 })
    ));
    assert_eq!(e.cursor(), None);
}

#[test]
fn test_direction_change_resets_cursor() {
    let e = engine(10, &fast());
    let events = e.subscribe();
    e.seek(4).unwrap();
    assert!(e.set_backward(true));
    assert_eq!(e.cursor(), None);
    assert!(!e.is_running());
    assert!(!e.set_backward(true));

    let kinds: Vec<_> = events.try_iter().collect();
    assert_eq!(kinds.len(), 2);
    assert!(matches!(kinds[1], PlaybackEvent::DirectionChanged(Direction::Backward)));
}

#[test]
fn test_get_frames_leaves_playback_alone() {
    let slow = EngineConfig {
        rate_fps: 2.0,
        idle_poll_ms: 1,
        ..EngineConfig::default()
    };
    let e = engine(10, &slow);
    let events = e.subscribe();
    e.play();
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::Frame { index: 0, .. }
    ));

    let frames = e.get_frames(&[7, 3, 7]).unwrap();
    let got: Vec<(usize, usize)> = frames.iter().map(|(i, f)| (*i, frame_marker(f))).collect();
    assert_eq!(got, vec![(7, 7), (3, 3), (7, 7)]);
    assert!(e.is_running());
    assert_eq!(e.cursor(), Some(0));

    // playback carries on from where it was
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::Frame { index: 1, .. }
    ));
}

#[test]
fn test_get_frames_while_paused() {
    let e = engine(5, &fast());
    let frames = e.get_frames(&[4]).unwrap();
    assert_eq!(frame_marker(&frames[0].1), 4);
    assert!(!e.is_running());
    assert_eq!(e.cursor(), None);
    assert!(e.get_frames(&[1, 5]).is_err());
}

struct Recorder(Arc<Mutex<Vec<usize>>>);

impl Session for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_frame(&mut self, index: usize, _frame: &Frame) {
        self.0.lock().unwrap().push(index);
    }
}

#[test]
fn test_sessions_see_every_emitted_frame() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let e = engine(5, &fast());
    e.add_session(Box::new(Recorder(Arc::clone(&seen))));
    let events = e.subscribe();
    e.play();
    play_to_end(&events);
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

/// Claims more frames than it can decode.
struct Truncated {
    inner: MemorySource,
    claimed: usize,
}

impl FrameSource for Truncated {
    fn len(&self) -> usize {
        self.claimed
    }

    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn read_next(&mut self) -> masa::Result<Option<Frame>> {
        self.inner.read_next()
    }

    fn set_position(&mut self, index: usize) -> masa::Result<()> {
        self.inner.set_position(index)
    }
}

#[test]
fn test_missing_frame_faults_worker() {
    let source = Truncated {
        inner: MemorySource::generated(3, 2, 2).unwrap(),
        claimed: 6,
    };
    let e = PlaybackEngine::new(Box::new(source), &fast()).unwrap();
    let events = e.subscribe();
    e.play();

    let mut frames = 0;
    loop {
        match events.recv_timeout(TIMEOUT).unwrap() {
            PlaybackEvent::Frame { .. } => frames += 1,
            PlaybackEvent::Fault(reason) => {
                assert!(reason.contains("invariant"));
                break;
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(frames, 3);
    assert!(!e.is_running());
}

#[test]
fn test_empty_source_rejected() {
    let source = Truncated {
        inner: MemorySource::generated(1, 2, 2).unwrap(),
        claimed: 0,
    };
    assert!(matches!(
        PlaybackEngine::new(Box::new(source), &fast()),
        Err(Error::SourceUnavailable(_))
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let cfg = EngineConfig {
        rate_fps: -1.0,
        ..fast()
    };
    let source = MemorySource::generated(2, 2, 2).unwrap();
    assert!(matches!(
        PlaybackEngine::new(Box::new(source), &cfg),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_unrepresentable_rate_rejected_while_playing() {
    let e = engine(6, &fast());
    let events = e.subscribe();
    e.play();
    assert!(matches!(e.set_rate(1e-300), Err(Error::Config(_))));
    assert_eq!(e.state().rate_fps, 1000.0);

    let (_, end) = play_to_end(&events);
    assert_eq!(end, 5);
    assert!(!e.is_running());
}

/// Decodes slowly so commands can land while a read is in progress.
struct Sluggish(MemorySource);

impl FrameSource for Sluggish {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn width(&self) -> u32 {
        self.0.width()
    }

    fn height(&self) -> u32 {
        self.0.height()
    }

    fn read_next(&mut self) -> masa::Result<Option<Frame>> {
        std::thread::sleep(Duration::from_millis(50));
        self.0.read_next()
    }

    fn set_position(&mut self, index: usize) -> masa::Result<()> {
        self.0.set_position(index)
    }
}

#[test]
fn test_pause_during_get_frames_is_kept() {
    let slow = EngineConfig {
        rate_fps: 2.0,
        idle_poll_ms: 1,
        ..EngineConfig::default()
    };
    let source = Sluggish(MemorySource::generated(10, 2, 2).unwrap());
    let e = PlaybackEngine::new(Box::new(source), &slow).unwrap();
    let events = e.subscribe();
    e.play();
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        PlaybackEvent::Frame { index: 0, .. }
    ));

    std::thread::scope(|scope| {
        let reads = scope.spawn(|| e.get_frames(&[5, 6, 7, 8]));
        std::thread::sleep(Duration::from_millis(60));
        e.pause();
        let frames = reads.join().unwrap().unwrap();
        assert_eq!(frames.len(), 4);
    });

    assert!(!e.is_running());
    assert_eq!(e.cursor(), Some(0));
}
