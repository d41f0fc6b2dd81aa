//! Routing of drained message batches.
//!
//! Level-related kinds go to dedicated guest triggers; everything else takes
//! the generic forwarding path. Request-style kinds (download, save) are
//! handled at most once per batch.

use smallvec::SmallVec;
use std::sync::Arc;

use guest_abi::{BridgeResult, GuestAbi};
use transport::{Batch, Message};

/// Kind carrying uploaded level data.
pub const UPLOAD_LEVEL: &str = "uploadLevel";
/// Kind requesting a level download.
pub const LEVEL_DOWNLOAD: &str = "levelDownload";
/// Kind requesting a level save.
pub const SAVE_LEVEL: &str = "saveLevel";

/// Classification of an inbound message kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Opaque level payload to hand to the guest and autosave.
    UploadLevel,
    /// Payload-less download request.
    LevelDownload,
    /// Payload-less save request.
    SaveLevel,
    /// Anything else; forwarded generically.
    Other,
}

impl InputKind {
    /// Classifies a raw message kind.
    pub fn parse(kind: &str) -> Self {
        match kind {
            UPLOAD_LEVEL => InputKind::UploadLevel,
            LEVEL_DOWNLOAD => InputKind::LevelDownload,
            SAVE_LEVEL => InputKind::SaveLevel,
            _ => InputKind::Other,
        }
    }

    /// Whether repeated occurrences within one batch are suppressed.
    pub fn is_idempotent(self) -> bool {
        matches!(self, InputKind::LevelDownload | InputKind::SaveLevel)
    }
}

/// Generic input path for kinds without a dedicated handler.
pub trait InputForwarder {
    /// Delivers `message` to the guest.
    fn forward(&mut self, guest: &mut dyn GuestAbi, message: Message) -> BridgeResult<()>;
}

impl<F> InputForwarder for F
where
    F: FnMut(&mut dyn GuestAbi, Message) -> BridgeResult<()>,
{
    fn forward(&mut self, guest: &mut dyn GuestAbi, message: Message) -> BridgeResult<()> {
        self(guest, message)
    }
}

/// Default forwarder: registers kind and payload, then calls `pushHandleKindData`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GuestForwarder;

impl InputForwarder for GuestForwarder {
    fn forward(&mut self, guest: &mut dyn GuestAbi, message: Message) -> BridgeResult<()> {
        let host = guest.host_mut();
        let kind = host.register(message.kind);
        let data = host.register(message.data);
        guest.push_handle_kind_data(kind, data)
    }
}

/// Per-batch dispatch counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Messages whose handler completed.
    pub handled: usize,
    /// Repeated request kinds skipped by the per-batch rule.
    pub suppressed: usize,
    /// Messages whose handler failed; the rest of the batch still ran.
    pub failed: usize,
}

/// Routes each message of a batch, in order, to its handler.
#[derive(Debug, Default)]
pub struct InputDispatcher<F = GuestForwarder> {
    forwarder: F,
}

impl InputDispatcher<GuestForwarder> {
    /// Creates a dispatcher using [`GuestForwarder`] for unknown kinds.
    pub fn new() -> Self {
        Self::with_forwarder(GuestForwarder)
    }
}

impl<F: InputForwarder> InputDispatcher<F> {
    /// Creates a dispatcher with a custom generic-input path.
    pub fn with_forwarder(forwarder: F) -> Self {
        Self { forwarder }
    }

    /// Dispatches `batch` in order.
    ///
    /// Dedup keys on kind alone: a second `levelDownload` in the same batch is
    /// skipped even if its payload differs. Failures are logged and counted.
    pub fn dispatch_batch(&mut self, guest: &mut dyn GuestAbi, batch: Batch) -> DispatchStats {
        let mut stats = DispatchStats::default();
        let mut seen: SmallVec<[Arc<str>; 8]> = SmallVec::new();

        for message in batch {
            let kind = InputKind::parse(&message.kind);
            let already_seen = seen.iter().any(|k| **k == *message.kind);
            if kind.is_idempotent() && already_seen {
                tracing::debug!(kind = %message.kind, "suppressing repeated request in batch");
                stats.suppressed += 1;
                continue;
            }

            let key = Arc::clone(&message.kind);
            match self.dispatch_one(guest, kind, message) {
                Ok(()) => stats.handled += 1,
                Err(err) => {
                    tracing::warn!(kind = %key, "input dispatch failed: {err}");
                    stats.failed += 1;
                }
            }
            if !already_seen {
                seen.push(key);
            }
        }

        stats
    }

    fn dispatch_one(
        &mut self,
        guest: &mut dyn GuestAbi,
        kind: InputKind,
        message: Message,
    ) -> BridgeResult<()> {
        tracing::debug!(kind = %message.kind, "dispatching input");
        match kind {
            InputKind::UploadLevel => {
                let level = message.data;
                let handle = guest.host_mut().register(level.clone());
                guest.upload_level(handle)?;
                guest.host().store_level(level);
                Ok(())
            }
            InputKind::LevelDownload => guest.download(),
            InputKind::SaveLevel => guest.save_level(),
            InputKind::Other => self.forwarder.forward(guest, message),
        }
    }
}
