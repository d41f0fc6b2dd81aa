//! Host → guest entry points and the wire names of both call directions.

use crate::error::BridgeResult;
use crate::host::HostState;
use transport::Handle;

/// Version of the call table. Guests that export `abiVersion` must match it.
pub const ABI_VERSION: u32 = 1;

/// Names of the functions a guest module exports.
pub mod exports {
    /// One-time setup.
    pub const INIT: &str = "init";
    /// Establishes the guest's time origin.
    pub const SET_INITIAL_TIME: &str = "setInitialTime";
    /// Advances one frame by elapsed milliseconds.
    pub const RUN: &str = "run";
    /// Delivers a generic `(kind, data)` handle pair.
    pub const PUSH_HANDLE_KIND_DATA: &str = "pushHandleKindData";
    /// Delivers an uploaded level handle.
    pub const UPLOAD_LEVEL: &str = "uploadLevel";
    /// Requests a level download.
    pub const DOWNLOAD: &str = "download";
    /// Requests a level save.
    pub const SAVE_LEVEL: &str = "saveLevel";
    /// Optional nullary function returning the guest's ABI version.
    pub const ABI_VERSION: &str = "abiVersion";
    /// Linear memory used by the object helper imports.
    pub const MEMORY: &str = "memory";
}

/// Names of the host functions a guest module may import.
pub mod imports {
    /// Import module every host function lives in.
    pub const MODULE: &str = "env";
    /// `(kind, data)` → message channel.
    pub const PUSH_MESSAGE: &str = "pushMessage";
    /// `(kind, data)` → outbound notification.
    pub const POST_MESSAGE: &str = "postMessage";
    /// Clears the whole surface.
    pub const CLEAR_SCREEN: &str = "clearScreen";
    /// `(font)` sets the text font.
    pub const SET_FONT: &str = "setFont";
    /// `(text, x, y)` draws filled text.
    pub const FILL_TEXT: &str = "fillText";
    /// `(r, g, b, a)` unit-float stroke paint.
    pub const STROKE_STYLE: &str = "strokeStyle";
    /// `(r, g, b, a)` unit-float fill paint.
    pub const FILL_STYLE: &str = "fillStyle";
    /// `(x, y, w, h)` outlines a rectangle.
    pub const STROKE_RECT: &str = "strokeRect";
    /// `(x, y, w, h)` fills a rectangle.
    pub const FILL_RECT: &str = "fillRect";
    /// `(level)` persists level text.
    pub const PERSIST_LEVEL: &str = "persistLevel";
    /// `(ptr, len) -> handle` registers UTF-8 text from guest memory.
    pub const OBJ_STRING: &str = "objString";
    /// `(ptr, len) -> handle` registers raw bytes from guest memory.
    pub const OBJ_BYTES: &str = "objBytes";
    /// `(handle) -> len` byte length of a registered text/bytes value.
    pub const OBJ_LEN: &str = "objLen";
    /// `(handle, ptr, cap) -> written` copies a registered value into guest memory.
    pub const OBJ_READ: &str = "objRead";
}

/// Entry points the host uses to drive a guest.
///
/// Every call is synchronous and must be serialised onto one logical execution
/// context; the guest has no concurrency control of its own. `init` must
/// complete before anything else is called, which the controller enforces.
pub trait GuestAbi {
    /// One-time setup.
    fn init(&mut self) -> BridgeResult<()>;

    /// Establishes the guest's time origin. Called exactly once, before the first `run`.
    fn set_initial_time(&mut self, timestamp: f64) -> BridgeResult<()>;

    /// Advances simulation and drawing by one frame.
    fn run(&mut self, elapsed: f64) -> BridgeResult<()>;

    /// Informs the guest of external input already registered in the object table.
    fn push_handle_kind_data(&mut self, kind: Handle, data: Handle) -> BridgeResult<()>;

    /// Hands the guest an uploaded level payload.
    fn upload_level(&mut self, level: Handle) -> BridgeResult<()>;

    /// Asks the guest to emit its current level for download.
    fn download(&mut self) -> BridgeResult<()>;

    /// Asks the guest to persist its current level.
    fn save_level(&mut self) -> BridgeResult<()>;

    /// Host-side state shared with the guest's imports.
    fn host(&self) -> &HostState;

    /// Mutable host-side state shared with the guest's imports.
    fn host_mut(&mut self) -> &mut HostState;
}
