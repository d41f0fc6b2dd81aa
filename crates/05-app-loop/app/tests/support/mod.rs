//! Shared fixtures: a recording guest, surface and level store.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::LocalPool;
use futures::FutureExt;
use guest_abi::{
    BridgeError, BridgeResult, GuestAbi, Handle, HostState, LevelStore, Message, Outbound, Paint,
    Rect, RenderSurface, StoreFuture, Value,
};

/// One host-to-guest call as seen by [`MockGuest`].
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Init,
    SetInitialTime(f64),
    Run(f64),
    Push(String, Value),
    Upload(Value),
    Download,
    Save,
}

/// Guest double that records every export call.
pub struct MockGuest {
    pub calls: Vec<Call>,
    pub emit_on_run: Option<Message>,
    pub fail_init: bool,
    host: HostState,
}

impl MockGuest {
    pub fn new(host: HostState) -> Self {
        Self {
            calls: Vec::new(),
            emit_on_run: None,
            fail_init: false,
            host,
        }
    }
}

impl GuestAbi for MockGuest {
    fn init(&mut self) -> BridgeResult<()> {
        self.calls.push(Call::Init);
        if self.fail_init {
            return Err(BridgeError::Guest {
                export: "init",
                message: "unreachable".into(),
            });
        }
        Ok(())
    }

    fn set_initial_time(&mut self, timestamp: f64) -> BridgeResult<()> {
        self.calls.push(Call::SetInitialTime(timestamp));
        Ok(())
    }

    fn run(&mut self, elapsed: f64) -> BridgeResult<()> {
        self.calls.push(Call::Run(elapsed));
        if let Some(message) = self.emit_on_run.clone() {
            let kind = self.host.register(message.kind);
            let data = self.host.register(message.data);
            self.host.emit_message(kind, data)?;
        }
        Ok(())
    }

    fn push_handle_kind_data(&mut self, kind: Handle, data: Handle) -> BridgeResult<()> {
        let kind = self.host.resolve(kind)?;
        let data = self.host.resolve(data)?;
        self.calls
            .push(Call::Push(kind.to_text_lossy().into_owned(), data));
        Ok(())
    }

    fn upload_level(&mut self, level: Handle) -> BridgeResult<()> {
        let level = self.host.resolve(level)?;
        self.calls.push(Call::Upload(level));
        Ok(())
    }

    fn download(&mut self) -> BridgeResult<()> {
        self.calls.push(Call::Download);
        Ok(())
    }

    fn save_level(&mut self) -> BridgeResult<()> {
        self.calls.push(Call::Save);
        Ok(())
    }

    fn host(&self) -> &HostState {
        &self.host
    }

    fn host_mut(&mut self) -> &mut HostState {
        &mut self.host
    }
}

/// Surface that records paint operations by name.
#[derive(Clone, Default)]
pub struct Canvas(pub Rc<RefCell<Vec<String>>>);

impl RenderSurface for Canvas {
    fn size(&self) -> (u32, u32) {
        (320, 240)
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
    fn fill_rect(&mut self, _rect: Rect) {
        self.0.borrow_mut().push("fillRect".into());
    }
    fn stroke_rect(&mut self, _rect: Rect) {
        self.0.borrow_mut().push("strokeRect".into());
    }
    fn fill_text(&mut self, text: &str, _x: f64, _y: f64) {
        self.0.borrow_mut().push(format!("text {text}"));
    }
}

#[derive(Clone, Default)]
pub struct Store(pub Rc<RefCell<Vec<(String, Value)>>>);

impl LevelStore for Store {
    fn store(&self, key: &str, value: Value) -> StoreFuture {
        let writes = Rc::clone(&self.0);
        let key = key.to_owned();
        async move {
            writes.borrow_mut().push((key, value));
            Ok(())
        }
        .boxed_local()
    }
}

/// Executor plus the collaborators a [`HostState`] needs.
#[derive(Default)]
pub struct Harness {
    pub pool: LocalPool,
    pub posted: Rc<RefCell<Vec<Outbound>>>,
    pub store: Store,
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guest(&self) -> MockGuest {
        let posted = Rc::clone(&self.posted);
        let host = HostState::builder()
            .store(self.store.clone())
            .spawner(self.pool.spawner())
            .outbound(move |msg: Outbound| posted.borrow_mut().push(msg))
            .build()
            .expect("host build");
        MockGuest::new(host)
    }

    pub fn posted(&self) -> Vec<Outbound> {
        self.posted.borrow().clone()
    }

    pub fn writes(&self) -> Vec<(String, Value)> {
        self.store.0.borrow().clone()
    }
}
