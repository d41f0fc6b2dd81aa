//! Native host for bridge guests: loads a `.wasm`/`.wat` module and drives it
//! with a timer-based frame loop and a software surface.

mod inbound;

use std::io::Write;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result};
use app::{ChannelDiscovery, Worker, CANVAS_KIND};
use clap::Parser;
use guest_abi::{HostState, Message, Outbound, RenderSurface};
use guest_wasmtime::{GuestConfig, WasmGuest};
use runtime_native::{
    outbound_channel, FileLevelStore, FrameConfig, IntervalFrames, PixelSurface, TokioSpawner,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a bridge guest natively")]
struct Args {
    /// Guest module (.wasm or .wat)
    #[arg(long)]
    guest: PathBuf,

    /// Frames per second
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Stop after this many frames (runs forever when omitted)
    #[arg(long)]
    frames: Option<u64>,

    /// Directory for persisted levels
    #[arg(long, default_value = "levels")]
    store_dir: PathBuf,

    /// JSON-lines file of messages delivered once the guest is running
    #[arg(long)]
    inbound: Option<PathBuf>,

    /// Also read JSON-lines messages from stdin
    #[arg(long)]
    stdin: bool,

    /// Write the final frame (8-byte header + RGBA) to this path
    #[arg(long)]
    dump_frame: Option<PathBuf>,

    /// Surface width in pixels
    #[arg(long, default_value_t = 320)]
    width: u16,

    /// Surface height in pixels
    #[arg(long, default_value_t = 240)]
    height: u16,

    /// Fuel budget per guest call
    #[arg(long)]
    fuel: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    runtime_native::run_local(run(args))?
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Ignore error if already set (e.g., during tests).
    let _ = fmt().with_env_filter(env_filter).with_writer(std::io::stderr).try_init();
}

async fn run(args: Args) -> Result<()> {
    let inbound = match &args.inbound {
        Some(path) => inbound::read_file(path)?,
        None => Vec::new(),
    };

    let (outbound, notifications) = outbound_channel();
    let printer = thread::spawn(move || {
        let stdout = std::io::stdout();
        for note in notifications {
            if let Outbound::Custom { .. } = note {
                if let Ok(line) = serde_json::to_string(&note) {
                    let _ = writeln!(stdout.lock(), "{line}");
                }
            }
        }
    });

    let levels = FileLevelStore::new(&args.store_dir);
    let host = HostState::builder()
        .store(levels.clone())
        .spawner(TokioSpawner)
        .outbound(outbound)
        .build()?;
    let config = GuestConfig {
        fuel_per_call: args.fuel,
    };
    let guest = WasmGuest::from_file(&args.guest, host, config)?;
    let worker = Worker::new(guest);
    let channel = worker.channel();

    let surface = PixelSurface::new(args.width, args.height);
    let canvas = surface.clone();
    let mut discovery = ChannelDiscovery::new(channel.clone(), move |_: &Message| {
        Some(Box::new(canvas.clone()) as Box<dyn RenderSurface>)
    });
    channel.push(Message::signal(CANVAS_KIND));

    let mut active = worker
        .start(&mut discovery)
        .await
        .context("guest startup failed")?;

    let count = inbound.len();
    for message in inbound {
        channel.push(message);
    }
    if count > 0 {
        info!(count, "queued inbound messages");
    }
    if args.stdin {
        inbound::spawn_reader(std::io::BufReader::new(std::io::stdin()), channel.clone());
    }

    let mut frames = IntervalFrames::new(FrameConfig {
        fps: args.fps,
        max_frames: args.frames,
    });
    let stats = active.run(&mut frames).await;
    info!(
        frames = stats.frames,
        batches = stats.batches,
        handled = stats.handled,
        suppressed = stats.suppressed,
        failed = stats.failed,
        "guest stopped"
    );

    levels.settled().await;

    if let Some(path) = &args.dump_frame {
        std::fs::write(path, surface.encode_frame())
            .with_context(|| format!("failed to write frame to {}", path.display()))?;
        info!(path = %path.display(), "frame written");
    }

    drop(active);
    let _ = printer.join();
    Ok(())
}
