#![deny(missing_docs)]
//! Native host runtime for bridge guests.
//!
//! Supplies the collaborators a [`guest_abi::HostState`] needs outside a
//! browser: a timer-driven frame source, software surfaces, level stores, an
//! outbound collector and a spawner, plus [`run_local`] to drive a worker on a
//! single-threaded tokio runtime.

mod frames;
mod outbound;
mod store;
mod surface;

use std::future::Future;

use anyhow::{Context, Result};
use futures::future::LocalBoxFuture;
use guest_abi::DetachedSpawner;

pub use frames::{FrameConfig, IntervalFrames};
pub use outbound::{outbound_channel, OutboundCollector};
pub use store::{FileLevelStore, MemoryLevelStore};
pub use surface::{decode_header, DrawOp, PixelSurface, RecordingSurface, FRAME_HEADER};

/// Spawns detached tasks onto the current tokio `LocalSet`.
///
/// Must be used from inside [`run_local`] (or another `LocalSet`).
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSpawner;

impl DetachedSpawner for TokioSpawner {
    fn spawn_detached(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

/// Runs `future` to completion on a current-thread runtime inside a `LocalSet`.
pub fn run_local<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let local = tokio::task::LocalSet::new();
    Ok(local.block_on(&runtime, future))
}
