//! Host-side controller for a single guest instance.
//!
//! The controller owns the startup protocol (init, surface discovery, outbound
//! notifications, remainder replay) and then runs two activity sources on one
//! task: the frame loop, re-armed by a [`FrameSource`], and the drain loop,
//! parked on the message channel between batches. Both reach the guest
//! through a single `RefCell`, so guest calls are strictly serialised.

pub mod discovery;
pub mod dispatch;
pub mod worker;

pub use discovery::{ChannelDiscovery, Discovery, ReadySurface, SurfaceDiscovery, CANVAS_KIND};
pub use dispatch::{DispatchStats, GuestForwarder, InputDispatcher, InputForwarder, InputKind};
pub use frame_clock::{FrameClock, FrameSource, FrameTick, ManualFrames};
pub use worker::{ActiveWorker, Worker, WorkerStats, SURFACE_READY_LOG};
