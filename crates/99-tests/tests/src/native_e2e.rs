#![cfg(all(test, not(target_arch = "wasm32")))]
//! Full sessions: startup, batched input, frames and outbound traffic.

use app::{ChannelDiscovery, ManualFrames, ReadySurface, Worker, CANVAS_KIND, SURFACE_READY_LOG};
use crossbeam_channel::Receiver;
use guest_abi::{
    HostState, Message, Outbound, Paint, Rect, RenderSurface, Value, LEVEL_KEY,
    SURFACE_UNAVAILABLE_MESSAGE,
};
use guest_wasmtime::{GuestConfig, WasmGuest};
use runtime_native::{
    outbound_channel, run_local, DrawOp, MemoryLevelStore, RecordingSurface, TokioSpawner,
};

use crate::DEMO_GUEST;

fn session() -> (WasmGuest, MemoryLevelStore, Receiver<Outbound>) {
    let store = MemoryLevelStore::new();
    let (sink, outbound) = outbound_channel();
    let host = HostState::builder()
        .store(store.clone())
        .spawner(TokioSpawner)
        .outbound(sink)
        .build()
        .expect("host");
    let guest = WasmGuest::from_bytes(DEMO_GUEST, host, GuestConfig::default()).expect("demo guest");
    (guest, store, outbound)
}

fn frame_ops() -> Vec<DrawOp> {
    vec![
        DrawOp::Clear,
        DrawOp::FillStyle(Paint::from_unit(0.0, 0.0, 1.0, 1.0)),
        DrawOp::FillRect(Rect::new(0.0, 0.0, 4.0, 4.0)),
        DrawOp::StrokeStyle(Paint::from_unit(1.0, 1.0, 1.0, 0.5)),
        DrawOp::StrokeRect(Rect::new(8.0, 8.0, 4.0, 4.0)),
        DrawOp::Font("12px monospace".into()),
        DrawOp::Text {
            text: "demo".into(),
            x: 2.0,
            y: 20.0,
        },
    ]
}

#[test]
fn batched_session_dedups_requests_and_renders_frames() {
    let (guest, store, outbound) = session();
    let recording = RecordingSurface::new(32, 32);
    let level = Value::from(vec![7u8, 7, 7]);

    let (mut guest, stats) = run_local(async {
        let worker = Worker::new(guest);
        let channel = worker.channel();
        let mut active = worker
            .start(&mut ReadySurface::new(recording.clone()))
            .await
            .expect("start");

        for message in [
            Message::new("uploadLevel", level.clone()),
            Message::signal("saveLevel"),
            Message::signal("saveLevel"),
            Message::signal("levelDownload"),
            Message::signal("levelDownload"),
            Message::new("ping", 1.0),
        ] {
            channel.push(message);
        }

        let stats = active
            .run(&mut ManualFrames::new([1000.0, 1016.0, 1033.0]))
            .await;
        (active.into_guest(), stats)
    })
    .expect("runtime");

    assert_eq!(stats.frames, 3);
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.suppressed, 2);
    assert_eq!(stats.failed, 0);

    assert_eq!(guest.global_f64("origin"), Some(1000.0));
    assert_eq!(guest.global_f64("elapsed"), Some(33.0));
    assert_eq!(guest.global_i32("frames"), Some(2));
    // "ping" from the embedder plus the guest's own "tick".
    assert_eq!(guest.global_i32("inputs"), Some(2));

    assert_eq!(store.get(LEVEL_KEY), Some(level.clone()));
    assert_eq!(
        outbound.try_iter().collect::<Vec<_>>(),
        [
            Outbound::Log(SURFACE_READY_LOG.into()),
            Outbound::InitDone,
            Outbound::Custom {
                kind: "downloadLevel".into(),
                data: level,
            },
        ]
    );

    let expected: Vec<DrawOp> = frame_ops().into_iter().chain(frame_ops()).collect();
    assert_eq!(recording.ops(), expected);
}

#[test]
fn unavailable_surface_reports_once_and_never_runs() {
    let (guest, _store, outbound) = session();

    let result = run_local(Worker::new(guest).start(&mut ReadySurface::unavailable()))
        .expect("runtime");

    assert!(result.is_err());
    assert_eq!(
        outbound.try_iter().collect::<Vec<_>>(),
        [Outbound::Error(SURFACE_UNAVAILABLE_MESSAGE.into())]
    );
}

#[test]
fn messages_queued_around_the_canvas_are_replayed_one_by_one() {
    let (guest, store, outbound) = session();
    let recording = RecordingSurface::new(16, 16);
    let level = Value::from("level-1");

    let stats = run_local(async {
        let worker = Worker::new(guest);
        let channel = worker.channel();
        channel.push(Message::new("uploadLevel", level.clone()));
        channel.push(Message::signal("levelDownload"));
        channel.push(Message::signal(CANVAS_KIND));
        channel.push(Message::signal("levelDownload"));

        let canvas = recording.clone();
        let mut discovery = ChannelDiscovery::new(channel, move |_: &Message| {
            Some(Box::new(canvas.clone()) as Box<dyn RenderSurface>)
        });
        let mut active = worker.start(&mut discovery).await.expect("start");
        active.run(&mut ManualFrames::new([0.0])).await
    })
    .expect("runtime");

    // Three remainder batches plus the guest's "tick".
    assert_eq!(stats.batches, 4);
    assert_eq!(stats.suppressed, 0);
    assert_eq!(store.get(LEVEL_KEY), Some(level.clone()));

    let download = Outbound::Custom {
        kind: "downloadLevel".into(),
        data: level,
    };
    assert_eq!(
        outbound.try_iter().collect::<Vec<_>>(),
        [
            Outbound::Log(SURFACE_READY_LOG.into()),
            Outbound::InitDone,
            download.clone(),
            download,
        ]
    );
    assert!(recording.ops().is_empty());
}
