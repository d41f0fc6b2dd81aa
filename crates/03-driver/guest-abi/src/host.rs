//! Guest → host call surface.
//!
//! [`HostState`] owns everything the guest's imports touch: the object table,
//! a producer handle onto the message channel, the (initially absent) drawing
//! surface, and the persistence and notification collaborators. Guest runtimes
//! forward each import to the matching method here.

use anyhow::{anyhow, Result};
use futures::FutureExt;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::BridgeResult;
use crate::outbound::{Outbound, OutboundSink};
use crate::storage::{DetachedSpawner, LevelStore, LEVEL_KEY};
use crate::surface::{Paint, Rect, RenderSurface};
use transport::{Handle, Message, MessageChannel, ObjectTable, Value};

const DEFAULT_TABLE_CAPACITY: usize = 64;

/// Host-side state reachable from guest imports.
pub struct HostState {
    objects: ObjectTable,
    channel: MessageChannel,
    surface: Option<Box<dyn RenderSurface>>,
    store: Rc<dyn LevelStore>,
    spawner: Rc<dyn DetachedSpawner>,
    outbound: Rc<dyn OutboundSink>,
}

impl HostState {
    /// Creates a new builder for assembling host state.
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Registers a host value and returns its handle.
    pub fn register(&mut self, value: impl Into<Value>) -> Handle {
        self.objects.add(value)
    }

    /// Resolves a handle received from the guest.
    pub fn resolve(&self, handle: Handle) -> BridgeResult<Value> {
        Ok(self.objects.resolve(handle)?)
    }

    /// Producer handle onto the message channel.
    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }

    /// Installs the drawing surface. Paint imports are no-ops until this happens.
    pub fn install_surface(&mut self, surface: Box<dyn RenderSurface>) {
        self.surface = Some(surface);
    }

    /// Returns `true` once a drawing surface is installed.
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Borrows the installed drawing surface.
    pub fn surface(&self) -> Option<&dyn RenderSurface> {
        self.surface.as_deref()
    }

    /// Sends a notification to the embedder.
    pub fn post(&self, message: Outbound) {
        self.outbound.post(message);
    }

    /// Writes `value` under [`LEVEL_KEY`] in the background. Failures are logged and dropped.
    pub fn store_level(&self, value: Value) {
        let pending = self.store.store(LEVEL_KEY, value);
        self.spawner.spawn_detached(
            async move {
                if let Err(err) = pending.await {
                    tracing::debug!("level store failed: {err}");
                }
            }
            .boxed_local(),
        );
    }

    /// `pushMessage`: resolves both handles and queues the pair on the message channel.
    pub fn emit_message(&mut self, kind: Handle, data: Handle) -> BridgeResult<()> {
        let kind = self.resolve(kind)?;
        let data = self.resolve(data)?;
        self.channel.push(Message::new(&*kind.to_text_lossy(), data));
        Ok(())
    }

    /// `postMessage`: resolves both handles and forwards the pair to the embedder.
    pub fn post_message(&mut self, kind: Handle, data: Handle) -> BridgeResult<()> {
        let kind = self.resolve(kind)?;
        let data = self.resolve(data)?;
        self.post(Outbound::Custom {
            kind: Arc::from(&*kind.to_text_lossy()),
            data,
        });
        Ok(())
    }

    /// `persistLevel`: resolves the level text and stores it.
    pub fn persist_level(&mut self, level: Handle) -> BridgeResult<()> {
        let level = self.resolve(level)?;
        self.store_level(level);
        Ok(())
    }

    /// `clearScreen`.
    pub fn clear_screen(&mut self) {
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.clear();
        }
    }

    /// `setFont`. Does not resolve the handle while no surface exists.
    pub fn set_font(&mut self, font: Handle) -> BridgeResult<()> {
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(());
        };
        let font = self.objects.resolve(font)?;
        surface.set_font(&font.to_text_lossy());
        Ok(())
    }

    /// `fillText`. Does not resolve the handle while no surface exists.
    pub fn fill_text(&mut self, text: Handle, x: f64, y: f64) -> BridgeResult<()> {
        let Some(surface) = self.surface.as_deref_mut() else {
            return Ok(());
        };
        let text = self.objects.resolve(text)?;
        surface.fill_text(&text.to_text_lossy(), x, y);
        Ok(())
    }

    /// `strokeStyle` with unit-float channels.
    pub fn stroke_style(&mut self, r: f64, g: f64, b: f64, a: f64) {
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.set_stroke_style(Paint::from_unit(r, g, b, a));
        }
    }

    /// `fillStyle` with unit-float channels.
    pub fn fill_style(&mut self, r: f64, g: f64, b: f64, a: f64) {
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.set_fill_style(Paint::from_unit(r, g, b, a));
        }
    }

    /// `strokeRect`.
    pub fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.stroke_rect(Rect::new(x, y, width, height));
        }
    }

    /// `fillRect`.
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if let Some(surface) = self.surface.as_deref_mut() {
            surface.fill_rect(Rect::new(x, y, width, height));
        }
    }

    /// `objString` / `objBytes`: registers a copy of guest memory.
    pub fn register_guest_bytes(&mut self, bytes: Vec<u8>, as_text: bool) -> Handle {
        let value = if as_text {
            Value::from_guest_bytes(bytes)
        } else {
            Value::from(bytes)
        };
        self.objects.add(value)
    }

    /// `objLen`: length of the byte rendering of a registered value.
    pub fn object_len(&self, handle: Handle) -> BridgeResult<usize> {
        let value = self.object(handle)?;
        Ok(match value.as_bytes() {
            Some(bytes) => bytes.len(),
            None => value.to_text_lossy().len(),
        })
    }

    /// `objRead`: at most `limit` leading bytes of a registered value.
    ///
    /// Text and bytes are copied as stored; scalars are rendered as text first.
    pub fn object_bytes(&self, handle: Handle, limit: usize) -> BridgeResult<Vec<u8>> {
        let value = self.object(handle)?;
        let rendered;
        let bytes = match value.as_bytes() {
            Some(bytes) => bytes,
            None => {
                rendered = value.to_text_lossy();
                rendered.as_bytes()
            }
        };
        Ok(bytes[..bytes.len().min(limit)].to_vec())
    }

    fn object(&self, handle: Handle) -> BridgeResult<&Value> {
        self.objects
            .get(handle)
            .ok_or(crate::BridgeError::InvalidHandle(handle))
    }
}

impl std::fmt::Debug for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostState")
            .field("objects", &self.objects.len())
            .field("channel", &self.channel)
            .field("surface", &self.surface.is_some())
            .finish()
    }
}

/// Builder for assembling a [`HostState`] from its collaborators.
pub struct HostBuilder {
    channel: Option<MessageChannel>,
    surface: Option<Box<dyn RenderSurface>>,
    store: Option<Rc<dyn LevelStore>>,
    spawner: Option<Rc<dyn DetachedSpawner>>,
    outbound: Option<Rc<dyn OutboundSink>>,
}

impl HostBuilder {
    /// Creates an empty builder with no collaborators attached.
    pub fn new() -> Self {
        Self {
            channel: None,
            surface: None,
            store: None,
            spawner: None,
            outbound: None,
        }
    }

    /// Sets the message channel guest-originated messages are pushed to.
    pub fn channel(mut self, channel: MessageChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Pre-installs a drawing surface (normally installed after discovery).
    pub fn surface(mut self, surface: impl RenderSurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    /// Sets the level store.
    pub fn store(mut self, store: impl LevelStore + 'static) -> Self {
        self.store = Some(Rc::new(store));
        self
    }

    /// Sets the spawner used for fire-and-forget persistence.
    pub fn spawner(mut self, spawner: impl DetachedSpawner + 'static) -> Self {
        self.spawner = Some(Rc::new(spawner));
        self
    }

    /// Sets the outbound notification sink.
    pub fn outbound(mut self, outbound: impl OutboundSink + 'static) -> Self {
        self.outbound = Some(Rc::new(outbound));
        self
    }

    /// Builds the [`HostState`], returning an error if a collaborator is missing.
    ///
    /// A fresh channel is created when none was supplied.
    pub fn build(self) -> Result<HostState> {
        Ok(HostState {
            objects: ObjectTable::with_capacity(DEFAULT_TABLE_CAPACITY),
            channel: self.channel.unwrap_or_default(),
            surface: self.surface,
            store: self.store.ok_or_else(|| anyhow!("missing level store"))?,
            spawner: self.spawner.ok_or_else(|| anyhow!("missing task spawner"))?,
            outbound: self
                .outbound
                .ok_or_else(|| anyhow!("missing outbound sink"))?,
        })
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BridgeError, StorageError};
    use crate::storage::StoreFuture;
    use futures::executor::LocalPool;
    use std::cell::RefCell;

    #[derive(Clone, Default)]
    struct Ops(Rc<RefCell<Vec<String>>>);

    impl RenderSurface for Ops {
        fn size(&self) -> (u32, u32) {
            (64, 48)
        }
        fn clear(&mut self) {
            self.0.borrow_mut().push("clear".into());
        }
        fn set_fill_style(&mut self, paint: Paint) {
            self.0.borrow_mut().push(format!("fill {}", paint.css()));
        }
        fn set_stroke_style(&mut self, paint: Paint) {
            self.0.borrow_mut().push(format!("stroke {}", paint.css()));
        }
        fn set_font(&mut self, font: &str) {
            self.0.borrow_mut().push(format!("font {font}"));
        }
        fn fill_rect(&mut self, rect: Rect) {
            self.0.borrow_mut().push(format!("fillRect {}", rect.width));
        }
        fn stroke_rect(&mut self, rect: Rect) {
            self.0.borrow_mut().push(format!("strokeRect {}", rect.height));
        }
        fn fill_text(&mut self, text: &str, x: f64, y: f64) {
            self.0.borrow_mut().push(format!("text {text} {x} {y}"));
        }
    }

    #[derive(Clone, Default)]
    struct Store {
        writes: Rc<RefCell<Vec<(String, Value)>>>,
        fail: bool,
    }

    impl LevelStore for Store {
        fn store(&self, key: &str, value: Value) -> StoreFuture {
            let writes = Rc::clone(&self.writes);
            let key = key.to_owned();
            let fail = self.fail;
            async move {
                if fail {
                    return Err(StorageError::Io("disk full".into()));
                }
                writes.borrow_mut().push((key, value));
                Ok(())
            }
            .boxed_local()
        }
    }

    fn host(pool: &LocalPool, store: Store, posted: Rc<RefCell<Vec<Outbound>>>) -> HostState {
        HostState::builder()
            .store(store)
            .spawner(pool.spawner())
            .outbound(move |msg: Outbound| posted.borrow_mut().push(msg))
            .build()
            .expect("host build")
    }

    #[test]
    fn builder_requires_collaborators() {
        let err = HostState::builder().build().unwrap_err();
        assert_eq!(err.to_string(), "missing level store");
    }

    #[test]
    fn paint_imports_are_noops_without_surface() {
        let pool = LocalPool::new();
        let mut host = host(&pool, Store::default(), Rc::default());
        let bogus = Handle::from_raw(99);

        host.clear_screen();
        host.fill_style(1.0, 0.0, 0.0, 1.0);
        host.fill_rect(0.0, 0.0, 1.0, 1.0);
        host.set_font(bogus).expect("no surface, no resolve");
        host.fill_text(bogus, 1.0, 2.0).expect("no surface, no resolve");
    }

    #[test]
    fn paint_imports_reach_installed_surface() {
        let pool = LocalPool::new();
        let mut host = host(&pool, Store::default(), Rc::default());
        let ops = Ops::default();
        host.install_surface(Box::new(ops.clone()));

        let font = host.register("12px mono");
        let text = host.register("hi");
        host.clear_screen();
        host.set_font(font).unwrap();
        host.stroke_style(0.0, 1.0, 0.0, 0.5);
        host.stroke_rect(1.0, 2.0, 3.0, 4.0);
        host.fill_text(text, 5.0, 6.0).unwrap();

        assert_eq!(
            *ops.0.borrow(),
            [
                "clear",
                "font 12px mono",
                "stroke rgba(0,255,0)",
                "strokeRect 4",
                "text hi 5 6"
            ]
        );

        let err = host.fill_text(Handle::from_raw(42), 0.0, 0.0).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidHandle(h) if h.raw() == 42));
    }

    #[test]
    fn emit_message_resolves_and_queues() {
        let pool = LocalPool::new();
        let mut host = host(&pool, Store::default(), Rc::default());
        let kind = host.register("levelDownload");
        let data = host.register(Value::Null);

        host.emit_message(kind, data).unwrap();
        let batch = host.channel().try_drain().expect("queued");
        assert_eq!(batch.into_vec(), [Message::signal("levelDownload")]);

        assert!(host.emit_message(kind, Handle::from_raw(7)).is_err());
        assert!(host.channel().try_drain().is_none());
    }

    #[test]
    fn post_message_reaches_outbound() {
        let pool = LocalPool::new();
        let posted = Rc::new(RefCell::new(Vec::new()));
        let mut host = host(&pool, Store::default(), Rc::clone(&posted));
        let kind = host.register("download");
        let data = host.register("#.#");

        host.post_message(kind, data).unwrap();
        assert_eq!(
            *posted.borrow(),
            [Outbound::Custom {
                kind: "download".into(),
                data: Value::from("#.#"),
            }]
        );
    }

    #[test]
    fn persist_level_is_fire_and_forget() {
        let mut pool = LocalPool::new();
        let store = Store::default();
        let mut host = host(&pool, store.clone(), Rc::default());
        let level = host.register("#..#");

        host.persist_level(level).unwrap();
        assert!(store.writes.borrow().is_empty(), "write runs detached");
        pool.run_until_stalled();
        assert_eq!(
            *store.writes.borrow(),
            [(LEVEL_KEY.to_owned(), Value::from("#..#"))]
        );
    }

    #[test]
    fn storage_failures_are_swallowed() {
        let mut pool = LocalPool::new();
        let store = Store {
            fail: true,
            ..Store::default()
        };
        let mut host = host(&pool, store.clone(), Rc::default());
        let level = host.register("#");

        host.persist_level(level).expect("storage errors never surface");
        pool.run_until_stalled();
        assert!(store.writes.borrow().is_empty());
    }

    #[test]
    fn object_bytes_render_scalars_as_text() {
        let pool = LocalPool::new();
        let mut host = host(&pool, Store::default(), Rc::default());
        let text = host.register_guest_bytes(b"abc".to_vec(), true);
        let raw = host.register_guest_bytes(vec![1, 2, 3], false);
        let number = host.register(2.5);

        assert_eq!(host.resolve(text).unwrap(), Value::from("abc"));
        assert_eq!(host.resolve(raw).unwrap(), Value::from(vec![1u8, 2, 3]));
        assert_eq!(host.object_len(number).unwrap(), 3);
        assert_eq!(host.object_bytes(number, usize::MAX).unwrap(), b"2.5");
        assert_eq!(host.object_len(text).unwrap(), 3);
        assert_eq!(host.object_bytes(text, 2).unwrap(), b"ab");
        assert!(host.object_len(Handle::from_raw(50)).is_err());
        assert!(host.object_bytes(Handle::from_raw(50), 1).is_err());
    }
}
