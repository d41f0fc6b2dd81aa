//! Drawing-surface discovery.
//!
//! The surface shows up asynchronously after the guest is initialised. Any
//! input that arrives before it does is handed back as the `remainder` so the
//! controller can replay it once the surface is installed.

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use guest_abi::RenderSurface;
use transport::{Message, MessageChannel};

/// Kind of the inbound message that carries the drawing surface.
pub const CANVAS_KIND: &str = "canvas";

/// Outcome of surface discovery.
#[derive(Default)]
pub struct Discovery {
    /// The surface, or `None` when it is unavailable.
    pub surface: Option<Box<dyn RenderSurface>>,
    /// Messages that arrived before the surface was ready, in arrival order.
    pub remainder: Vec<Message>,
}

impl std::fmt::Debug for Discovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovery")
            .field("surface", &self.surface.is_some())
            .field("remainder", &self.remainder)
            .finish()
    }
}

/// Asynchronous provider of the drawing surface.
pub trait SurfaceDiscovery {
    /// Resolves once the surface is known to exist or not.
    fn discover(&mut self) -> LocalBoxFuture<'_, Discovery>;
}

/// Discovery whose answer is known up front.
#[derive(Default)]
pub struct ReadySurface {
    discovery: Option<Discovery>,
}

impl ReadySurface {
    /// Discovery that yields `surface`.
    pub fn new(surface: impl RenderSurface + 'static) -> Self {
        Self {
            discovery: Some(Discovery {
                surface: Some(Box::new(surface)),
                remainder: Vec::new(),
            }),
        }
    }

    /// Discovery that reports the surface as unavailable.
    pub fn unavailable() -> Self {
        Self {
            discovery: Some(Discovery::default()),
        }
    }

    /// Attaches messages to replay after the surface is installed.
    pub fn with_remainder(mut self, remainder: impl IntoIterator<Item = Message>) -> Self {
        if let Some(discovery) = self.discovery.as_mut() {
            discovery.remainder.extend(remainder);
        }
        self
    }
}

impl SurfaceDiscovery for ReadySurface {
    fn discover(&mut self) -> LocalBoxFuture<'_, Discovery> {
        let discovery = self.discovery.take().unwrap_or_default();
        async move { discovery }.boxed_local()
    }
}

/// Discovery that waits on the message channel for a [`CANVAS_KIND`] message.
///
/// Every other message drained while waiting, including ones batched after
/// the canvas message, becomes the remainder. `make_surface` turns the canvas
/// message into a surface, or returns `None` when no context can be created.
pub struct ChannelDiscovery<F> {
    channel: MessageChannel,
    make_surface: F,
}

impl<F> ChannelDiscovery<F>
where
    F: FnMut(&Message) -> Option<Box<dyn RenderSurface>>,
{
    /// Creates a discovery over `channel`.
    pub fn new(channel: MessageChannel, make_surface: F) -> Self {
        Self {
            channel,
            make_surface,
        }
    }
}

impl<F> SurfaceDiscovery for ChannelDiscovery<F>
where
    F: FnMut(&Message) -> Option<Box<dyn RenderSurface>>,
{
    fn discover(&mut self) -> LocalBoxFuture<'_, Discovery> {
        async move {
            let mut remainder = Vec::new();
            loop {
                let batch = self.channel.drain().await;
                let mut surface = None;
                let mut found = false;
                for message in batch {
                    if !found && message.kind() == CANVAS_KIND {
                        found = true;
                        surface = (self.make_surface)(&message);
                    } else {
                        remainder.push(message);
                    }
                }
                if found {
                    tracing::debug!(
                        available = surface.is_some(),
                        remainder = remainder.len(),
                        "surface discovery finished"
                    );
                    return Discovery { surface, remainder };
                }
            }
        }
        .boxed_local()
    }
}
