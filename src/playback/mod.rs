// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background frame supply.
//!
//! A [`PlaybackEngine`] owns one worker thread that walks a cursor through a
//! [`FrameSource`] while playing, decoding each frame and sending it to
//! subscribers as a [`PlaybackEvent`]. Commands (`play`, `seek`,
//! `set_backward`, `get_frames`, ...) may be issued from any thread while
//! the worker runs.
//!
//! Cursor, direction, running flag and rate live behind one mutex that is
//! only held for check-and-update. The reader has its own mutex, so decodes
//! never block state commands. A decode that raced with a seek or a
//! direction change is discarded instead of emitted.

pub mod advance;
pub mod session;
pub mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use image::imageops::{self, FilterType};

use crate::config::{self, EngineConfig};
use crate::error::{Error, Result};
use crate::util::broadcast::Broadcast;
use crate::util::geometry::resize_calculator;

pub use advance::{advance, Direction, Step};
pub use session::{BoundingBoxSession, Session};
pub use source::{Frame, FrameReader, FrameSource, MemorySource, ReaderStats};

/// Notifications sent by the engine.
#[derive(Debug, Clone)]
pub enum PlaybackEvent {
    /// A decoded frame and its index.
    Frame { index: usize, frame: Arc<Frame> },
    /// Playback reached the boundary in the direction of travel and stopped.
    EndOfStream(usize),
    DirectionChanged(Direction),
    /// The worker hit an unrecoverable decode failure and stopped.
    Fault(String),
}

/// Snapshot of the engine state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub cursor: Option<usize>,
    pub direction: Direction,
    pub running: bool,
    pub rate_fps: f64,
}

#[derive(Debug)]
struct State {
    cursor: Option<usize>,
    direction: Direction,
    running: bool,
    rate_fps: f64,
    interval: Duration,
    /// Bumped by every command that invalidates an in-flight decode.
    epoch: u64,
    /// Bumped by every explicit change of the running flag.
    control: u64,
}

impl State {
    fn set_running(&mut self, running: bool) {
        self.running = running;
        self.control += 1;
    }
}

struct Shared {
    state: Mutex<State>,
    reader: Mutex<FrameReader>,
    events: Mutex<Broadcast<PlaybackEvent>>,
    sessions: Mutex<Vec<Box<dyn Session>>>,
    alive: AtomicBool,
    length: usize,
    output_size: Option<(u32, u32)>,
    idle_poll: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn emit(&self, event: PlaybackEvent) {
        lock(&self.events).send(event);
    }

    fn decode(&self, index: usize) -> Result<Frame> {
        let frame = lock(&self.reader).read_at(index)?;
        Ok(self.resize(frame))
    }

    fn resize(&self, frame: Frame) -> Frame {
        match self.output_size {
            Some((w, h)) if (w, h) != frame.dimensions() => {
                imageops::resize(&frame, w, h, FilterType::Triangle)
            }
            _ => frame,
        }
    }

    fn publish(&self, index: usize, frame: Frame) {
        for session in lock(&self.sessions).iter_mut() {
            session.on_frame(index, &frame);
        }
        self.emit(PlaybackEvent::Frame {
            index,
            frame: Arc::new(frame),
        });
    }
}

/// Plays a [`FrameSource`] on a background worker.
pub struct PlaybackEngine {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Start an engine over `source`. The engine starts paused with no
    /// cursor.
    pub fn new(source: Box<dyn FrameSource>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let length = source.len();
        if length == 0 {
            return Err(Error::SourceUnavailable("source has no frames".into()));
        }
        let (width, height) = (source.width(), source.height());
        let output_size = if config.resizes() {
            Some(resize_calculator(
                width,
                height,
                config.target_width,
                config.target_height,
                config.keep_ratio,
            )?)
        } else {
            None
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                cursor: None,
                direction: Direction::from_backward(config.backward),
                running: false,
                rate_fps: config.rate_fps,
                interval: config.frame_interval()?,
                epoch: 0,
                control: 0,
            }),
            reader: Mutex::new(FrameReader::new(source)),
            events: Mutex::new(Broadcast::new()),
            sessions: Mutex::new(Vec::new()),
            alive: AtomicBool::new(true),
            length,
            output_size,
            idle_poll: config.idle_poll(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("masa-playback".into())
            .spawn(move || run_worker(&worker_shared))
            .map_err(|e| Error::invariant(format!("cannot start playback worker: {e}")))?;

        log::info!(
            "Playback engine started: {} frames, {}x{}, {} fps",
            length,
            width,
            height,
            config.rate_fps
        );
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    pub fn len(&self) -> usize {
        self.shared.length
    }

    pub fn is_empty(&self) -> bool {
        self.shared.length == 0
    }

    /// Size of emitted frames.
    pub fn frame_size(&self) -> (u32, u32) {
        self.shared
            .output_size
            .unwrap_or_else(|| lock(&self.shared.reader).dimensions())
    }

    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        lock(&self.shared.events).subscribe()
    }

    pub fn add_session(&self, session: Box<dyn Session>) {
        log::debug!("Session {} attached", session.name());
        lock(&self.shared.sessions).push(session);
    }

    pub fn play(&self) {
        let mut state = lock(&self.shared.state);
        if !state.running {
            log::debug!("Playing from {:?} ({})", state.cursor, state.direction);
        }
        state.set_running(true);
    }

    pub fn pause(&self) {
        let mut state = lock(&self.shared.state);
        if state.running {
            log::debug!("Paused at {:?}", state.cursor);
        }
        state.set_running(false);
    }

    /// Flip between playing and paused. Returns the new running state.
    pub fn toggle(&self) -> bool {
        let mut state = lock(&self.shared.state);
        let running = !state.running;
        state.set_running(running);
        running
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared.state).running
    }

    pub fn cursor(&self) -> Option<usize> {
        lock(&self.shared.state).cursor
    }

    pub fn direction(&self) -> Direction {
        lock(&self.shared.state).direction
    }

    pub fn state(&self) -> PlaybackState {
        let state = lock(&self.shared.state);
        PlaybackState {
            cursor: state.cursor,
            direction: state.direction,
            running: state.running,
            rate_fps: state.rate_fps,
        }
    }

    pub fn set_rate(&self, rate_fps: f64) -> Result<()> {
        let interval = config::frame_interval(rate_fps)?;
        let mut state = lock(&self.shared.state);
        state.rate_fps = rate_fps;
        state.interval = interval;
        Ok(())
    }

    /// Pause, decode frame `index`, move the cursor there and emit the
    /// frame. Playback is not resumed.
    pub fn seek(&self, index: usize) -> Result<Arc<Frame>> {
        let length = self.shared.length;
        if index >= length {
            return Err(Error::FrameOutOfRange { index, length });
        }
        {
            let mut state = lock(&self.shared.state);
            state.set_running(false);
            state.epoch += 1;
        }
        let frame = Arc::new(self.shared.decode(index)?);
        lock(&self.shared.state).cursor = Some(index);
        for session in lock(&self.shared.sessions).iter_mut() {
            session.on_frame(index, &frame);
        }
        self.shared.emit(PlaybackEvent::Frame {
            index,
            frame: Arc::clone(&frame),
        });
        log::debug!("Seeked to {index}");
        Ok(frame)
    }

    /// Change direction. The cursor is cleared so the next step anchors at
    /// the boundary of the new direction. Returns whether anything changed.
    pub fn set_backward(&self, backward: bool) -> bool {
        let direction = Direction::from_backward(backward);
        {
            let mut state = lock(&self.shared.state);
            if state.direction == direction {
                return false;
            }
            state.direction = direction;
            state.cursor = None;
            state.epoch += 1;
        }
        for session in lock(&self.shared.sessions).iter_mut() {
            session.on_direction(direction);
        }
        self.shared.emit(PlaybackEvent::DirectionChanged(direction));
        log::debug!("Direction changed to {direction}");
        true
    }

    /// Decode arbitrary frames without disturbing playback. Results follow
    /// the order of `indices`; the cursor and running state are unchanged
    /// unless another command changes them during the call.
    pub fn get_frames(&self, indices: &[usize]) -> Result<Vec<(usize, Frame)>> {
        let length = self.shared.length;
        if let Some(&index) = indices.iter().find(|&&i| i >= length) {
            return Err(Error::FrameOutOfRange { index, length });
        }

        let (was_running, control) = {
            let mut state = lock(&self.shared.state);
            (std::mem::replace(&mut state.running, false), state.control)
        };

        let result = {
            let mut reader = lock(&self.shared.reader);
            let saved = reader.position();
            let frames: Result<Vec<_>> = indices
                .iter()
                .map(|&i| reader.read_at(i).map(|f| (i, self.shared.resize(f))))
                .collect();
            let restored = reader.restore(saved);
            frames.and_then(|frames| restored.map(|_| frames))
        };

        let mut state = lock(&self.shared.state);
        if was_running && state.control == control {
            state.running = true;
        }
        result
    }

    pub fn reader_stats(&self) -> ReaderStats {
        lock(&self.shared.reader).stats()
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        lock(&self.shared.state).set_running(false);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Playback worker panicked");
            }
            log::info!("Playback engine stopped");
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared) {
    while shared.alive.load(Ordering::SeqCst) {
        let (step, epoch, interval) = {
            let mut state = lock(&shared.state);
            if !state.running {
                drop(state);
                std::thread::sleep(shared.idle_poll);
                continue;
            }
            let step = advance(state.cursor, state.direction, shared.length);
            match step {
                Step::Moved(index) => state.cursor = Some(index),
                Step::Ended(_) => state.running = false,
            }
            (step, state.epoch, state.interval)
        };

        let index = match step {
            Step::Ended(index) => {
                log::debug!("End of stream at {index}");
                shared.emit(PlaybackEvent::EndOfStream(index));
                continue;
            }
            Step::Moved(index) => index,
        };

        let frame = match shared.decode(index) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Playback stopped at frame {index}: {e}");
                lock(&shared.state).set_running(false);
                shared.alive.store(false, Ordering::SeqCst);
                shared.emit(PlaybackEvent::Fault(e.to_string()));
                break;
            }
        };

        if lock(&shared.state).epoch != epoch {
            continue;
        }
        shared.publish(index, frame);
        std::thread::sleep(interval);
    }
}
