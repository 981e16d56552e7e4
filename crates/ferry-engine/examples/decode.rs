//! Ferry decode: run a guest decoder over an image and draw the result.
//!
//! Demonstrates:
//!   1. Fetching a guest module and encoded input from an asset source
//!   2. Decoding through a session (arena commit, guest call, result view)
//!   3. Presenting the frame onto a software surface, zoomed and panned
//!   4. Releasing each result back to the guest
//!
//! With `--root`, assets are read from that directory. Without it a
//! built-in decoder and a generated checkerboard are used.
//!
//! Run with:
//!   cargo run --example decode -- --frames 4
//!   RUST_LOG=ferry=debug cargo run --example decode -- --root assets/

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ferry_core::AssetSource;
use ferry_engine::{FsAssetSource, Session, SessionConfig};
use ferry_surface::{SoftwareSurface, Viewport};
use ferry_test_utils::{checkerboard, encode_rgba, wat, MemoryAssetSource};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Decode an image through a WebAssembly guest")]
struct Args {
    /// Directory holding the module and image assets.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Asset name of the guest module (binary or text format).
    #[arg(long, default_value = "decoder.wasm")]
    module: String,

    /// Asset name of the encoded image.
    #[arg(long, default_value = "image.raw")]
    image: String,

    /// Width of the generated image when no root is given.
    #[arg(long, default_value_t = 64)]
    width: u32,

    /// Height of the generated image when no root is given.
    #[arg(long, default_value_t = 48)]
    height: u32,

    /// Number of decode/present/release rounds.
    #[arg(long, default_value_t = 3)]
    frames: u32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = SessionConfig::new(args.module.clone(), args.image.clone());

    let source: Box<dyn AssetSource> = match &args.root {
        Some(root) => Box::new(FsAssetSource::new(root)),
        None => Box::new(
            MemoryAssetSource::new()
                .with_asset(args.module.clone(), wat::DECODER.as_bytes())
                .with_asset(
                    args.image.clone(),
                    encode_rgba(
                        args.width,
                        args.height,
                        &checkerboard(args.width, args.height, 8),
                    ),
                ),
        ),
    };
    let mut session = Session::load(source.as_ref(), config).context("loading session")?;

    // ─── Decode and present ─────────────────────────────────────

    let mut surface = SoftwareSurface::new(320, 240);
    let mut viewport = Viewport::identity();
    for round in 0..args.frames {
        let mut frame = session
            .decode()
            .with_context(|| format!("decoding frame {round}"))?;
        session.present(&mut frame, &viewport, &mut surface)?;

        let dims = frame
            .dimensions()
            .context("decoded frame has no dimensions")?;
        let metrics = session.release(frame)?;
        tracing::info!(
            round,
            %dims,
            commit_us = metrics.commit_us,
            call_us = metrics.call_us,
            total_us = metrics.total_us,
            grown_bytes = metrics.grown_bytes,
            scratch_reused = metrics.scratch_reused,
            "frame presented"
        );

        viewport.zoom_at((0.0, 0.0), 1.0);
        viewport.pan_by(4.0, 2.0);
    }

    // ─── Summary ────────────────────────────────────────────────

    let lit = surface.pixels().iter().filter(|&&px| px != 0).count();
    tracing::info!(
        decodes = session.decodes(),
        memory_bytes = session.guest().memory_size(),
        generation = %session.guest().memory_generation(),
        scratch_reuses = session.scratch().reuses(),
        lit_pixels = lit,
        "done"
    );
    Ok(())
}
