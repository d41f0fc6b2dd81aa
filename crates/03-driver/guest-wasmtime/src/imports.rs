//! Host functions linked into the guest's `env` import module.

use guest_abi::{exports, BridgeError, BridgeResult, Handle, HostState};
use wasmtime::{Caller, Extern, Linker, Memory};

type Ctx<'a> = Caller<'a, HostState>;

/// Registers every host import on `linker`.
pub(crate) fn link(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    use guest_abi::imports::*;

    linker.func_wrap(MODULE, PUSH_MESSAGE, |mut caller: Ctx<'_>, kind: u32, data: u32| {
        bridge(caller.data_mut().emit_message(Handle::from_raw(kind), Handle::from_raw(data)))
    })?;
    linker.func_wrap(MODULE, POST_MESSAGE, |mut caller: Ctx<'_>, kind: u32, data: u32| {
        bridge(caller.data_mut().post_message(Handle::from_raw(kind), Handle::from_raw(data)))
    })?;
    linker.func_wrap(MODULE, PERSIST_LEVEL, |mut caller: Ctx<'_>, level: u32| {
        bridge(caller.data_mut().persist_level(Handle::from_raw(level)))
    })?;

    linker.func_wrap(MODULE, CLEAR_SCREEN, |mut caller: Ctx<'_>| {
        caller.data_mut().clear_screen()
    })?;
    linker.func_wrap(MODULE, SET_FONT, |mut caller: Ctx<'_>, font: u32| {
        bridge(caller.data_mut().set_font(Handle::from_raw(font)))
    })?;
    linker.func_wrap(
        MODULE,
        FILL_TEXT,
        |mut caller: Ctx<'_>, text: u32, x: f64, y: f64| {
            bridge(caller.data_mut().fill_text(Handle::from_raw(text), x, y))
        },
    )?;
    linker.func_wrap(
        MODULE,
        STROKE_STYLE,
        |mut caller: Ctx<'_>, r: f64, g: f64, b: f64, a: f64| {
            caller.data_mut().stroke_style(r, g, b, a)
        },
    )?;
    linker.func_wrap(
        MODULE,
        FILL_STYLE,
        |mut caller: Ctx<'_>, r: f64, g: f64, b: f64, a: f64| {
            caller.data_mut().fill_style(r, g, b, a)
        },
    )?;
    linker.func_wrap(
        MODULE,
        STROKE_RECT,
        |mut caller: Ctx<'_>, x: f64, y: f64, w: f64, h: f64| {
            caller.data_mut().stroke_rect(x, y, w, h)
        },
    )?;
    linker.func_wrap(
        MODULE,
        FILL_RECT,
        |mut caller: Ctx<'_>, x: f64, y: f64, w: f64, h: f64| {
            caller.data_mut().fill_rect(x, y, w, h)
        },
    )?;

    linker.func_wrap(MODULE, OBJ_STRING, |mut caller: Ctx<'_>, ptr: u32, len: u32| {
        let bytes = bridge(read_guest(&mut caller, ptr, len))?;
        Ok(caller.data_mut().register_guest_bytes(bytes, true).raw())
    })?;
    linker.func_wrap(MODULE, OBJ_BYTES, |mut caller: Ctx<'_>, ptr: u32, len: u32| {
        let bytes = bridge(read_guest(&mut caller, ptr, len))?;
        Ok(caller.data_mut().register_guest_bytes(bytes, false).raw())
    })?;
    linker.func_wrap(MODULE, OBJ_LEN, |caller: Ctx<'_>, handle: u32| {
        let len = bridge(caller.data().object_len(Handle::from_raw(handle)))?;
        bridge(
            u32::try_from(len)
                .map_err(|_| BridgeError::Memory(format!("object {handle} exceeds 4 GiB"))),
        )
    })?;
    linker.func_wrap(
        MODULE,
        OBJ_READ,
        |mut caller: Ctx<'_>, handle: u32, ptr: u32, cap: u32| {
            let handle = Handle::from_raw(handle);
            let bytes = bridge(caller.data().object_bytes(handle, cap as usize))?;
            bridge(write_guest(&mut caller, ptr, &bytes))?;
            Ok(bytes.len() as u32)
        },
    )?;

    Ok(())
}

/// Hands a bridge failure to wasmtime; the caller downcasts it back.
fn bridge<T>(result: BridgeResult<T>) -> wasmtime::Result<T> {
    result.map_err(wasmtime::Error::new)
}

fn guest_memory(caller: &mut Ctx<'_>) -> BridgeResult<Memory> {
    caller
        .get_export(exports::MEMORY)
        .and_then(Extern::into_memory)
        .ok_or_else(|| BridgeError::Memory("guest does not export `memory`".into()))
}

/// Copies `len` bytes at `ptr` out of guest memory, checking bounds before allocating.
fn read_guest(caller: &mut Ctx<'_>, ptr: u32, len: u32) -> BridgeResult<Vec<u8>> {
    let memory = guest_memory(caller)?;
    let start = ptr as usize;
    start
        .checked_add(len as usize)
        .and_then(|end| memory.data(&*caller).get(start..end))
        .map(<[u8]>::to_vec)
        .ok_or_else(|| {
            BridgeError::Memory(format!(
                "read {len} bytes at {ptr}: outside {} byte memory",
                memory.data_size(&*caller)
            ))
        })
}

fn write_guest(caller: &mut Ctx<'_>, ptr: u32, bytes: &[u8]) -> BridgeResult<()> {
    let memory = guest_memory(caller)?;
    memory
        .write(&mut *caller, ptr as usize, bytes)
        .map_err(|err| BridgeError::Memory(format!("write {} bytes at {ptr}: {err}", bytes.len())))
}
