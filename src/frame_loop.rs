//! The continuously rescheduled update and render cycle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{error, info};
use serde::{Deserialize, Serialize};

/// Host facility that schedules frames, yielding each frame's timestamp in seconds.
pub trait TickSource {
    /// Blocks until the next frame is due. `None` ends the loop.
    fn next_frame(&mut self) -> Option<f64>;
}

/// Pre-recorded timestamps, for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct ManualTicks {
    pending: VecDeque<f64>,
}

impl ManualTicks {
    pub fn new(timestamps: impl IntoIterator<Item = f64>) -> Self {
        Self {
            pending: timestamps.into_iter().collect(),
        }
    }

    /// `count` frames spaced `1 / hz` seconds apart, starting at zero.
    pub fn at_rate(hz: f64, count: usize) -> Self {
        Self::new((0..count).map(|frame| frame as f64 / hz))
    }

    pub fn push(&mut self, timestamp: f64) {
        self.pending.push_back(timestamp);
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl TickSource for ManualTicks {
    fn next_frame(&mut self) -> Option<f64> {
        self.pending.pop_front()
    }
}

/// Wall clock pacing for native hosts without a display-driven scheduler.
#[derive(Debug, Clone)]
pub struct PacedTicks {
    interval: Duration,
    start: Instant,
    next_deadline: Instant,
    remaining: Option<u64>,
}

impl PacedTicks {
    pub fn new(frames_per_second: f64) -> Self {
        let start = Instant::now();
        Self {
            interval: Duration::from_secs_f64(1.0 / frames_per_second.max(1.0)),
            start,
            next_deadline: start,
            remaining: None,
        }
    }

    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl TickSource for PacedTicks {
    fn next_frame(&mut self) -> Option<f64> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let now = Instant::now();
        if self.next_deadline > now {
            thread::sleep(self.next_deadline - now);
        }
        self.next_deadline += self.interval;
        Some(self.start.elapsed().as_secs_f64())
    }
}

/// Seconds elapsed between consecutive frame timestamps. The first frame has a
/// delta of zero.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    last: Option<f64>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delta(&mut self, now: f64) -> f32 {
        let delta = self.last.map_or(0.0, |last| (now - last).max(0.0));
        self.last = Some(now);
        delta as f32
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// What to do when a frame's body returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameErrorPolicy {
    /// Log the failure and carry on with the next frame.
    #[default]
    Continue,
    /// Stop the loop and return the error.
    Abort,
}

impl FrameErrorPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "continue" => Some(Self::Continue),
            "abort" => Some(Self::Abort),
            _ => None,
        }
    }
}

/// Stops a running loop before its next frame.
#[derive(Debug, Clone, Default)]
pub struct LoopHandle(Arc<AtomicBool>);

impl LoopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopSummary {
    pub frames: u64,
    pub failures: u64,
}

/// Frame counter with a smoothed frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub last_delta: f32,
    pub fps: f32,
}

impl FrameStats {
    pub fn record(&mut self, delta: f32) {
        self.frames += 1;
        self.last_delta = delta;
        if delta > 0.0 {
            let instant = 1.0 / delta;
            self.fps = if self.fps == 0.0 {
                instant
            } else {
                self.fps * 0.9 + instant * 0.1
            };
        }
    }
}

pub struct FrameLoop<T: TickSource> {
    ticks: T,
    clock: Clock,
    policy: FrameErrorPolicy,
    handle: LoopHandle,
}

impl<T: TickSource> FrameLoop<T> {
    pub fn new(ticks: T, policy: FrameErrorPolicy) -> Self {
        Self {
            ticks,
            clock: Clock::new(),
            policy,
            handle: LoopHandle::default(),
        }
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    /// Runs `body` with each frame's delta until the tick source is exhausted or the
    /// loop is stopped.
    pub fn run<F>(&mut self, mut body: F) -> Result<LoopSummary>
    where
        F: FnMut(f32) -> Result<()>,
    {
        let mut summary = LoopSummary::default();
        while !self.handle.is_stopped() {
            let Some(now) = self.ticks.next_frame() else {
                break;
            };
            let delta = self.clock.delta(now);
            summary.frames += 1;
            if let Err(err) = body(delta) {
                summary.failures += 1;
                match self.policy {
                    FrameErrorPolicy::Continue => {
                        error!("frame {} failed: {err:#}", summary.frames)
                    }
                    FrameErrorPolicy::Abort => {
                        return Err(err.context(format!("frame {} failed", summary.frames)))
                    }
                }
            }
        }
        info!(
            "frame loop finished after {} frames ({} failed)",
            summary.frames, summary.failures
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn first_delta_is_zero_then_differences() {
        let mut frame_loop = FrameLoop::new(ManualTicks::new([1.0, 1.5, 1.75]), FrameErrorPolicy::Continue);
        let mut deltas = Vec::new();
        let summary = frame_loop
            .run(|delta| {
                deltas.push(delta);
                Ok(())
            })
            .unwrap();
        assert_eq!(deltas, vec![0.0, 0.5, 0.25]);
        assert_eq!(summary, LoopSummary { frames: 3, failures: 0 });
    }

    #[test]
    fn failing_frames_are_logged_and_skipped() {
        let mut frame_loop = FrameLoop::new(ManualTicks::at_rate(60.0, 5), FrameErrorPolicy::Continue);
        let mut calls = 0;
        let summary = frame_loop
            .run(|_| {
                calls += 1;
                if calls == 2 {
                    Err(anyhow!("renderer lost"))
                } else {
                    Ok(())
                }
            })
            .unwrap();
        assert_eq!(calls, 5);
        assert_eq!(summary.failures, 1);
    }

    #[test]
    fn abort_policy_stops_on_first_failure() {
        let mut frame_loop = FrameLoop::new(ManualTicks::at_rate(60.0, 5), FrameErrorPolicy::Abort);
        let mut calls = 0;
        let err = frame_loop
            .run(|_| {
                calls += 1;
                Err(anyhow!("boom"))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(format!("{err:#}").contains("boom"));
    }

    #[test]
    fn handle_stops_before_the_next_frame() {
        let mut frame_loop = FrameLoop::new(ManualTicks::at_rate(60.0, 10), FrameErrorPolicy::Continue);
        let handle = frame_loop.handle();
        let mut calls = 0;
        let summary = frame_loop
            .run(|_| {
                calls += 1;
                if calls == 3 {
                    handle.stop();
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(summary.frames, 3);
    }

    #[test]
    fn paced_ticks_respect_the_frame_limit() {
        let mut ticks = PacedTicks::new(1000.0).with_frame_limit(2);
        assert!(ticks.next_frame().is_some());
        assert!(ticks.next_frame().is_some());
        assert!(ticks.next_frame().is_none());
    }

    #[test]
    fn stats_smooth_the_frame_rate() {
        let mut stats = FrameStats::default();
        stats.record(0.0);
        stats.record(0.5);
        assert_eq!(stats.fps, 2.0);
        stats.record(0.25);
        assert!((stats.fps - 2.2).abs() < 1e-5);
        assert_eq!(stats.frames, 3);
    }
}
