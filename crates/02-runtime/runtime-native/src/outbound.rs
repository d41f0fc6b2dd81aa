//! Outbound notifications collected over a crossbeam channel.

use crossbeam_channel::{Receiver, Sender};
use guest_abi::{Outbound, OutboundSink};

/// Sink that mirrors each notification to `tracing` and forwards it.
#[derive(Clone, Debug)]
pub struct OutboundCollector {
    tx: Sender<Outbound>,
}

/// Creates a collector and the receiver the embedder reads from.
pub fn outbound_channel() -> (OutboundCollector, Receiver<Outbound>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (OutboundCollector { tx }, rx)
}

impl OutboundSink for OutboundCollector {
    fn post(&self, message: Outbound) {
        match &message {
            Outbound::Log(line) => tracing::info!(target: "guest", "{line}"),
            Outbound::Error(line) => tracing::error!(target: "guest", "{line}"),
            Outbound::InitDone => tracing::info!(target: "guest", "init done"),
            Outbound::Custom { kind, data } => {
                tracing::debug!(target: "guest", %kind, %data, "guest message")
            }
        }
        if self.tx.send(message).is_err() {
            tracing::debug!("outbound receiver dropped");
        }
    }
}
