//! Frame timing for the guest loop.
//!
//! [`FrameClock`] turns a stream of host timestamps (milliseconds on a
//! monotonic clock, like an animation-frame callback) into the guest's time
//! signal: the first timestamp becomes the origin and every later one is
//! reported as elapsed time since that origin. [`FrameSource`] is the
//! periodic, self re-arming task that produces those timestamps.

use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use std::collections::VecDeque;

/// One-way clock state machine: `Unset -> Set`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FrameClock {
    /// No timestamp observed yet.
    #[default]
    Unset,
    /// Origin recorded from the first timestamp.
    Set {
        /// Frame origin in host milliseconds.
        origin: f64,
    },
}

/// What the frame loop should do with a timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameTick {
    /// First timestamp: call `setInitialTime` with it.
    Origin(f64),
    /// Later timestamp: call `run` with the elapsed time.
    Run {
        /// Milliseconds since the origin.
        elapsed: f64,
    },
}

impl FrameClock {
    /// Creates a clock with no origin.
    pub fn new() -> Self {
        Self::Unset
    }

    /// Feeds one host timestamp through the state machine.
    pub fn tick(&mut self, timestamp: f64) -> FrameTick {
        match *self {
            FrameClock::Unset => {
                *self = FrameClock::Set { origin: timestamp };
                FrameTick::Origin(timestamp)
            }
            FrameClock::Set { origin } => FrameTick::Run {
                elapsed: timestamp - origin,
            },
        }
    }

    /// Recorded origin, if set.
    pub fn origin(&self) -> Option<f64> {
        match self {
            FrameClock::Unset => None,
            FrameClock::Set { origin } => Some(*origin),
        }
    }

    /// Elapsed time of `timestamp` relative to the origin, without transitioning.
    pub fn elapsed(&self, timestamp: f64) -> Option<f64> {
        self.origin().map(|origin| timestamp - origin)
    }
}

/// Periodic timing source that re-arms after each frame.
///
/// Each call to [`next_frame`](FrameSource::next_frame) arms the next
/// callback and resolves with its timestamp. `None` means a finite source ran
/// out; continuous sources never return it.
pub trait FrameSource {
    /// Waits for the next frame and returns its timestamp in milliseconds.
    fn next_frame(&mut self) -> LocalBoxFuture<'_, Option<f64>>;
}

/// Finite source replaying a fixed list of timestamps, one per frame.
#[derive(Clone, Debug, Default)]
pub struct ManualFrames {
    timestamps: VecDeque<f64>,
}

impl ManualFrames {
    /// Creates a source that yields `timestamps` in order, then ends.
    pub fn new(timestamps: impl IntoIterator<Item = f64>) -> Self {
        Self {
            timestamps: timestamps.into_iter().collect(),
        }
    }

    /// Frames still to be delivered.
    pub fn remaining(&self) -> usize {
        self.timestamps.len()
    }
}

impl FrameSource for ManualFrames {
    fn next_frame(&mut self) -> LocalBoxFuture<'_, Option<f64>> {
        let next = self.timestamps.pop_front();
        // Yield once so a joined drain loop gets polled between frames.
        async move {
            yield_now().await;
            next
        }
        .boxed_local()
    }
}

async fn yield_now() {
    let mut yielded = false;
    future::poll_fn(|cx| {
        if yielded {
            std::task::Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            std::task::Poll::Pending
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn origin_is_set_once_and_elapsed_follows() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.origin(), None);
        assert_eq!(clock.tick(100.0), FrameTick::Origin(100.0));
        assert_eq!(clock.tick(140.0), FrameTick::Run { elapsed: 40.0 });
        assert_eq!(clock.tick(180.0), FrameTick::Run { elapsed: 80.0 });
        assert_eq!(clock.origin(), Some(100.0));
        assert_eq!(clock.elapsed(250.0), Some(150.0));
    }

    #[test]
    fn manual_frames_drain_then_end() {
        let mut frames = ManualFrames::new([1.0, 2.0]);
        assert_eq!(frames.remaining(), 2);
        assert_eq!(block_on(frames.next_frame()), Some(1.0));
        assert_eq!(frames.remaining(), 1);
        assert_eq!(block_on(frames.next_frame()), Some(2.0));
        assert_eq!(block_on(frames.next_frame()), None);
        assert_eq!(frames.remaining(), 0);
    }
}
