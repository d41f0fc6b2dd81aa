//! Worker controller: startup protocol, then the frame and drain loops.

use std::cell::{Cell, RefCell};

use futures::future::{self, Either};
use futures::pin_mut;

use frame_clock::{FrameClock, FrameSource, FrameTick};
use guest_abi::{BridgeError, BridgeResult, GuestAbi, Outbound, SURFACE_UNAVAILABLE_MESSAGE};
use transport::{Batch, MessageChannel};

use crate::discovery::SurfaceDiscovery;
use crate::dispatch::{DispatchStats, GuestForwarder, InputDispatcher, InputForwarder};

/// Log line posted once the drawing surface is installed.
pub const SURFACE_READY_LOG: &str = "Got 2D drawing surface";

/// Counters for a worker's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Frames delivered to the guest, including the origin frame.
    pub frames: usize,
    /// Batches dispatched, including replayed remainder messages.
    pub batches: usize,
    /// Messages handled successfully.
    pub handled: usize,
    /// Repeated requests suppressed within a batch.
    pub suppressed: usize,
    /// Messages whose handler failed.
    pub failed: usize,
}

impl WorkerStats {
    fn record_batch(&mut self, stats: DispatchStats) {
        self.batches += 1;
        self.handled += stats.handled;
        self.suppressed += stats.suppressed;
        self.failed += stats.failed;
    }
}

/// A guest that has not been started yet.
pub struct Worker<G, F = GuestForwarder> {
    guest: G,
    dispatcher: InputDispatcher<F>,
}

impl<G: GuestAbi> Worker<G, GuestForwarder> {
    /// Wraps `guest` with the default input dispatcher.
    pub fn new(guest: G) -> Self {
        Self::with_forwarder(guest, GuestForwarder)
    }
}

impl<G: GuestAbi, F: InputForwarder> Worker<G, F> {
    /// Wraps `guest`, routing unknown kinds through `forwarder`.
    pub fn with_forwarder(guest: G, forwarder: F) -> Self {
        Self {
            guest,
            dispatcher: InputDispatcher::with_forwarder(forwarder),
        }
    }

    /// Producer handle for the guest's inbound channel.
    pub fn channel(&self) -> MessageChannel {
        self.guest.host().channel().clone()
    }

    /// The guest, before startup.
    pub fn guest(&self) -> &G {
        &self.guest
    }

    /// Runs the startup protocol.
    ///
    /// Initialises the guest, waits for the drawing surface and installs it,
    /// posts the ready log and `initDone`, then replays messages that arrived
    /// during discovery one per batch. Without a surface a single error is
    /// posted and the worker never becomes active.
    pub async fn start<D>(mut self, discovery: &mut D) -> BridgeResult<ActiveWorker<G, F>>
    where
        D: SurfaceDiscovery + ?Sized,
    {
        if let Err(err) = self.guest.init() {
            tracing::error!("guest init failed: {err}");
            self.guest.host().post(Outbound::Error(err.to_string()));
            return Err(err);
        }

        let found = discovery.discover().await;
        let Some(surface) = found.surface else {
            tracing::error!("{SURFACE_UNAVAILABLE_MESSAGE}");
            self.guest
                .host()
                .post(Outbound::Error(SURFACE_UNAVAILABLE_MESSAGE.to_owned()));
            return Err(BridgeError::SurfaceUnavailable);
        };

        let (width, height) = surface.size();
        let host = self.guest.host_mut();
        host.install_surface(surface);
        host.post(Outbound::Log(SURFACE_READY_LOG.to_owned()));
        host.post(Outbound::InitDone);
        tracing::info!(width, height, remainder = found.remainder.len(), "worker started");

        let channel = host.channel().clone();
        let mut stats = WorkerStats::default();
        for message in found.remainder {
            let batch = self
                .dispatcher
                .dispatch_batch(&mut self.guest, Batch::single(message));
            stats.record_batch(batch);
        }

        Ok(ActiveWorker {
            guest: RefCell::new(self.guest),
            dispatcher: self.dispatcher,
            channel,
            clock: FrameClock::new(),
            stats: Cell::new(stats),
        })
    }
}

/// A started guest with its surface installed.
pub struct ActiveWorker<G, F = GuestForwarder> {
    guest: RefCell<G>,
    dispatcher: InputDispatcher<F>,
    channel: MessageChannel,
    clock: FrameClock,
    stats: Cell<WorkerStats>,
}

impl<G: GuestAbi, F: InputForwarder> ActiveWorker<G, F> {
    /// Runs the frame loop and the drain loop until `frames` is exhausted.
    ///
    /// Continuous sources never end, so neither does this future. Input still
    /// pending when a finite source ends is dispatched before returning.
    pub async fn run<S>(&mut self, frames: &mut S) -> WorkerStats
    where
        S: FrameSource + ?Sized,
    {
        {
            let guest = &self.guest;
            let stats = &self.stats;
            let clock = &mut self.clock;
            let dispatcher = &mut self.dispatcher;
            let channel = &self.channel;

            let frame_loop = async move {
                while let Some(timestamp) = frames.next_frame().await {
                    let mut guest = guest.borrow_mut();
                    let result = match clock.tick(timestamp) {
                        FrameTick::Origin(origin) => guest.set_initial_time(origin),
                        FrameTick::Run { elapsed } => guest.run(elapsed),
                    };
                    if let Err(err) = result {
                        tracing::warn!(timestamp, "guest frame failed: {err}");
                    }
                    let mut current = stats.get();
                    current.frames += 1;
                    stats.set(current);
                }
            };

            let drain_loop = async move {
                loop {
                    let batch = channel.drain().await;
                    let dispatched = dispatcher.dispatch_batch(&mut *guest.borrow_mut(), batch);
                    let mut current = stats.get();
                    current.record_batch(dispatched);
                    stats.set(current);
                }
            };

            pin_mut!(frame_loop, drain_loop);
            match future::select(frame_loop, drain_loop).await {
                Either::Left(((), _)) => tracing::info!("frame source exhausted"),
                Either::Right(_) => {}
            }
        }

        if let Some(batch) = self.channel.try_drain() {
            self.dispatch(batch);
        }
        self.stats.get()
    }

    /// Dispatches one batch outside the loops.
    pub fn dispatch(&mut self, batch: Batch) -> DispatchStats {
        let dispatched = self.dispatcher.dispatch_batch(self.guest.get_mut(), batch);
        let mut current = self.stats.get();
        current.record_batch(dispatched);
        self.stats.set(current);
        dispatched
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> WorkerStats {
        self.stats.get()
    }

    /// Producer handle for the guest's inbound channel.
    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }

    /// The clock driving `run`.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Borrows the guest. Panics if called from inside [`run`](Self::run).
    pub fn guest(&self) -> std::cell::Ref<'_, G> {
        self.guest.borrow()
    }

    /// Consumes the worker and returns the guest.
    pub fn into_guest(self) -> G {
        self.guest.into_inner()
    }
}
