//! Timer-driven frame source.

use std::time::Duration;

use frame_clock::FrameSource;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Frame pacing for [`IntervalFrames`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameConfig {
    /// Target frames per second. Zero is treated as one.
    pub fps: u32,
    /// Stop after this many frames; `None` runs forever.
    pub max_frames: Option<u64>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            max_frames: None,
        }
    }
}

impl FrameConfig {
    /// Time between frames.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

/// Frame source backed by a tokio interval.
///
/// Timestamps are milliseconds since the first tick, so the first frame
/// reports `0.0`. Late ticks are skipped rather than bunched up.
#[derive(Debug)]
pub struct IntervalFrames {
    config: FrameConfig,
    interval: Option<Interval>,
    epoch: Option<Instant>,
    delivered: u64,
}

impl IntervalFrames {
    /// Creates a source; the timer is armed on the first `next_frame`.
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            interval: None,
            epoch: None,
            delivered: 0,
        }
    }

    /// Frames handed out so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl FrameSource for IntervalFrames {
    fn next_frame(&mut self) -> LocalBoxFuture<'_, Option<f64>> {
        async move {
            if self
                .config
                .max_frames
                .is_some_and(|max| self.delivered >= max)
            {
                return None;
            }

            let period = self.config.period();
            let interval = self.interval.get_or_insert_with(|| {
                let mut interval = time::interval(period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                interval
            });
            let tick = interval.tick().await;
            let epoch = *self.epoch.get_or_insert(tick);
            self.delivered += 1;
            Some(tick.duration_since(epoch).as_secs_f64() * 1000.0)
        }
        .boxed_local()
    }
}
