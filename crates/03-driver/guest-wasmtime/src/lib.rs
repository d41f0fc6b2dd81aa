//! WebAssembly guest runtime for the bridge ABI.
//!
//! [`WasmGuest`] instantiates a module against the `env` host imports, binds
//! its exports, and implements [`GuestAbi`] so the controller can drive it
//! like any other guest.

mod imports;

use std::path::Path;

use anyhow::{ensure, Context, Result};
use guest_abi::{exports, BridgeError, BridgeResult, GuestAbi, Handle, HostState, ABI_VERSION};
use wasmtime::{Config, Engine, Instance, Linker, Module, Store, TypedFunc, WasmParams, WasmResults};

/// Runtime limits applied to a guest instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuestConfig {
    /// Fuel granted before every export call. `None` disables metering.
    pub fuel_per_call: Option<u64>,
}

struct Exports {
    init: TypedFunc<(), ()>,
    set_initial_time: TypedFunc<f64, ()>,
    run: TypedFunc<f64, ()>,
    push_handle_kind_data: Option<TypedFunc<(u32, u32), ()>>,
    upload_level: Option<TypedFunc<u32, ()>>,
    download: Option<TypedFunc<(), ()>>,
    save_level: Option<TypedFunc<(), ()>>,
}

impl Exports {
    fn bind(store: &mut Store<HostState>, instance: &Instance) -> Result<Self> {
        Ok(Self {
            init: required(store, instance, exports::INIT)?,
            set_initial_time: required(store, instance, exports::SET_INITIAL_TIME)?,
            run: required(store, instance, exports::RUN)?,
            push_handle_kind_data: optional(store, instance, exports::PUSH_HANDLE_KIND_DATA)?,
            upload_level: optional(store, instance, exports::UPLOAD_LEVEL)?,
            download: optional(store, instance, exports::DOWNLOAD)?,
            save_level: optional(store, instance, exports::SAVE_LEVEL)?,
        })
    }
}

fn required<P, R>(store: &mut Store<HostState>, instance: &Instance, name: &str) -> Result<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .with_context(|| format!("binding guest export `{name}`"))
}

fn optional<P, R>(
    store: &mut Store<HostState>,
    instance: &Instance,
    name: &str,
) -> Result<Option<TypedFunc<P, R>>>
where
    P: WasmParams,
    R: WasmResults,
{
    match instance.get_func(&mut *store, name) {
        Some(func) => func
            .typed::<P, R>(&*store)
            .map(Some)
            .with_context(|| format!("guest export `{name}` has the wrong signature")),
        None => Ok(None),
    }
}

fn invoke<P, R>(
    store: &mut Store<HostState>,
    fuel: Option<u64>,
    export: &'static str,
    func: &TypedFunc<P, R>,
    params: P,
) -> BridgeResult<R>
where
    P: WasmParams,
    R: WasmResults,
{
    if let Some(fuel) = fuel {
        store
            .set_fuel(fuel)
            .map_err(|err| BridgeError::guest(export, err))?;
    }
    tracing::trace!(export, "calling guest");
    func.call(&mut *store, params)
        .map_err(|err| match err.downcast::<BridgeError>() {
            Ok(bridge) => bridge,
            Err(err) => BridgeError::guest(export, err),
        })
}

/// A WebAssembly module instantiated against a [`HostState`].
pub struct WasmGuest {
    store: Store<HostState>,
    instance: Instance,
    exports: Exports,
    fuel_per_call: Option<u64>,
}

impl WasmGuest {
    /// Compiles `bytes` (binary or text format) and instantiates it.
    pub fn from_bytes(bytes: impl AsRef<[u8]>, host: HostState, config: GuestConfig) -> Result<Self> {
        let engine = engine(&config)?;
        let module = Module::new(&engine, bytes).context("compiling guest module")?;
        Self::instantiate(&engine, &module, host, config)
    }

    /// Loads a `.wasm` or `.wat` file and instantiates it.
    pub fn from_file(path: impl AsRef<Path>, host: HostState, config: GuestConfig) -> Result<Self> {
        let path = path.as_ref();
        let engine = engine(&config)?;
        let module = Module::from_file(&engine, path)
            .with_context(|| format!("loading guest module {}", path.display()))?;
        Self::instantiate(&engine, &module, host, config)
    }

    fn instantiate(engine: &Engine, module: &Module, host: HostState, config: GuestConfig) -> Result<Self> {
        let mut linker = Linker::new(engine);
        imports::link(&mut linker).context("linking host imports")?;

        let mut store = Store::new(engine, host);
        if let Some(fuel) = config.fuel_per_call {
            store.set_fuel(fuel)?;
        }
        let instance = linker
            .instantiate(&mut store, module)
            .context("instantiating guest module")?;

        if let Some(version) = optional::<(), u32>(&mut store, &instance, exports::ABI_VERSION)? {
            let found = version
                .call(&mut store, ())
                .context("reading guest ABI version")?;
            ensure!(
                found == ABI_VERSION,
                "guest ABI version {found} does not match host version {ABI_VERSION}"
            );
        }

        let exports = Exports::bind(&mut store, &instance)?;
        tracing::info!(
            fuel = ?config.fuel_per_call,
            generic_input = exports.push_handle_kind_data.is_some(),
            "guest module instantiated"
        );
        Ok(Self {
            store,
            instance,
            exports,
            fuel_per_call: config.fuel_per_call,
        })
    }

    /// Reads an exported `f64` global. Used to observe guest state.
    pub fn global_f64(&mut self, name: &str) -> Option<f64> {
        let global = self.instance.get_global(&mut self.store, name)?;
        global.get(&mut self.store).f64()
    }

    /// Reads an exported `i32` global.
    pub fn global_i32(&mut self, name: &str) -> Option<i32> {
        let global = self.instance.get_global(&mut self.store, name)?;
        global.get(&mut self.store).i32()
    }

    /// Fuel left after the last call, when metering is enabled.
    pub fn remaining_fuel(&self) -> Option<u64> {
        self.fuel_per_call
            .and_then(|_| self.store.get_fuel().ok())
    }

    /// Consumes the guest and returns its host state.
    pub fn into_host(self) -> HostState {
        self.store.into_data()
    }
}

fn engine(config: &GuestConfig) -> Result<Engine> {
    let mut wasm = Config::new();
    wasm.consume_fuel(config.fuel_per_call.is_some());
    Engine::new(&wasm).context("configuring wasm engine")
}

fn missing(export: &'static str) -> BridgeError {
    BridgeError::MissingExport(export)
}

impl GuestAbi for WasmGuest {
    fn init(&mut self) -> BridgeResult<()> {
        invoke(&mut self.store, self.fuel_per_call, exports::INIT, &self.exports.init, ())
    }

    fn set_initial_time(&mut self, timestamp: f64) -> BridgeResult<()> {
        invoke(
            &mut self.store,
            self.fuel_per_call,
            exports::SET_INITIAL_TIME,
            &self.exports.set_initial_time,
            timestamp,
        )
    }

    fn run(&mut self, elapsed: f64) -> BridgeResult<()> {
        invoke(&mut self.store, self.fuel_per_call, exports::RUN, &self.exports.run, elapsed)
    }

    fn push_handle_kind_data(&mut self, kind: Handle, data: Handle) -> BridgeResult<()> {
        let export = exports::PUSH_HANDLE_KIND_DATA;
        let func = self.exports.push_handle_kind_data.as_ref().ok_or_else(|| missing(export))?;
        invoke(&mut self.store, self.fuel_per_call, export, func, (kind.raw(), data.raw()))
    }

    fn upload_level(&mut self, level: Handle) -> BridgeResult<()> {
        let export = exports::UPLOAD_LEVEL;
        let func = self.exports.upload_level.as_ref().ok_or_else(|| missing(export))?;
        invoke(&mut self.store, self.fuel_per_call, export, func, level.raw())
    }

    fn download(&mut self) -> BridgeResult<()> {
        let export = exports::DOWNLOAD;
        let func = self.exports.download.as_ref().ok_or_else(|| missing(export))?;
        invoke(&mut self.store, self.fuel_per_call, export, func, ())
    }

    fn save_level(&mut self) -> BridgeResult<()> {
        let export = exports::SAVE_LEVEL;
        let func = self.exports.save_level.as_ref().ok_or_else(|| missing(export))?;
        invoke(&mut self.store, self.fuel_per_call, export, func, ())
    }

    fn host(&self) -> &HostState {
        self.store.data()
    }

    fn host_mut(&mut self) -> &mut HostState {
        self.store.data_mut()
    }
}

impl std::fmt::Debug for WasmGuest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmGuest")
            .field("host", self.store.data())
            .field("fuel_per_call", &self.fuel_per_call)
            .finish_non_exhaustive()
    }
}
