use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::info;

use shogiboard::kifu::{read_kifu_text, replay_csa};
use shogiboard::{render_surface, RenderConfig, SpriteSheet};

/// CSA 棋譜の各局面を PNG に書き出す
#[derive(Parser)]
#[command(name = "kifu_frames")]
struct Args {
    #[arg(long)]
    sprites: String,
    /// CSA file, optionally gzip-compressed (.gz)
    #[arg(long)]
    csa: PathBuf,
    #[arg(long, default_value = "frames")]
    out_dir: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    shogiboard::init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RenderConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };

    let text = read_kifu_text(&args.csa).with_context(|| format!("failed to read {}", args.csa.display()))?;
    let sfens = replay_csa(&text)?;
    info!("棋譜を読み込みました: {} 局面", sfens.len());

    fs::create_dir_all(&args.out_dir)?;
    let sheet = SpriteSheet::load(&args.sprites, &config)?;

    let pb = ProgressBar::new(sfens.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ply")?);

    sfens.par_iter().enumerate().try_for_each(|(ply, sfen)| -> Result<()> {
        let frame = render_surface(&sheet, sfen, &config)?;
        frame.surface.save_png(&args.out_dir.join(format!("ply-{:03}.png", ply)))?;
        pb.inc(1);
        Ok(())
    })?;
    pb.finish();

    info!(out_dir = %args.out_dir.display(), "局面画像を出力しました");
    Ok(())
}
