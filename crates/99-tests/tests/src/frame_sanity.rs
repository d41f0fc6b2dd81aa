#![cfg(all(test, not(target_arch = "wasm32")))]
//! Frame pixel sanity tests.

use app::{ManualFrames, ReadySurface, Worker};
use guest_abi::HostState;
use guest_wasmtime::{GuestConfig, WasmGuest};
use runtime_native::{
    decode_header, outbound_channel, run_local, MemoryLevelStore, PixelSurface, TokioSpawner,
    FRAME_HEADER,
};

use crate::DEMO_GUEST;

#[test]
fn demo_frame_pixels_look_ok() {
    const W: u16 = 16;
    const H: u16 = 16;

    let (sink, _outbound) = outbound_channel();
    let host = HostState::builder()
        .store(MemoryLevelStore::new())
        .spawner(TokioSpawner)
        .outbound(sink)
        .build()
        .expect("host");
    let guest = WasmGuest::from_bytes(DEMO_GUEST, host, GuestConfig::default()).expect("guest");
    let pixels = PixelSurface::new(W, H);

    run_local(async {
        let mut active = Worker::new(guest)
            .start(&mut ReadySurface::new(pixels.clone()))
            .await
            .expect("start");
        active.run(&mut ManualFrames::new([0.0, 16.0])).await
    })
    .expect("runtime");

    let frame = pixels.encode_frame();
    assert_eq!(frame.len(), FRAME_HEADER + usize::from(W) * usize::from(H) * 4);
    // One clear per `run`; the origin frame does not paint.
    assert_eq!(decode_header(&frame), Some((1, W, H)));

    // Opaque blue fill in the top-left corner.
    assert_eq!(pixels.pixel(1, 1), Some([0, 0, 255, 255]));
    assert_eq!(pixels.pixel(4, 4), Some([0, 0, 0, 0]));

    // Half-transparent white outline, empty inside.
    assert_eq!(pixels.pixel(7, 7), Some([128, 128, 128, 128]));
    assert_eq!(pixels.pixel(9, 9), Some([0, 0, 0, 0]));

    assert_eq!(pixels.texts(), ["12px monospace @(2,20) demo"]);
}
