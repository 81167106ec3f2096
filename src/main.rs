use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info};

use shogiboard::{draw, render_frame, render_surface, RecordingCanvas, RenderConfig, SpriteSheet, Surface};

#[derive(Parser)]
#[command(name = "shogiboard", about = "Render shogi positions (SFEN) with a piece sprite sheet")]
struct Cli {
    /// JSON render config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one position to a PNG
    Render {
        #[arg(long)]
        sprites: String,
        #[arg(long)]
        sfen: String,
        #[arg(long, default_value = "board.png")]
        out: PathBuf,
        /// Print the draw operations as JSON instead of writing a PNG
        #[arg(long)]
        ops: bool,
    },
    /// Render every position (one per line) in files matching a glob pattern
    Batch {
        #[arg(long)]
        sprites: String,
        #[arg(long)]
        pattern: String,
        #[arg(long, default_value = "frames")]
        out_dir: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<RenderConfig> {
    match path {
        Some(path) => RenderConfig::load(path).with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RenderConfig::default()),
    }
}

fn render_one(sprites: &str, sfen: &str, out: &Path, ops: bool, config: &RenderConfig) -> Result<()> {
    if ops {
        let sheet = SpriteSheet::load(sprites, config)?;
        let (width, height) = config.canvas_size();
        let mut canvas = RecordingCanvas::new(width, height);
        render_frame(&mut canvas, &sheet, sfen, config)?;
        println!("{}", canvas.to_json()?);
        return Ok(());
    }

    let pending = draw(Surface::new(), sprites, sfen, config);
    info!(locator = pending.locator(), size = ?pending.size(), "loading sprite sheet");
    let frame = pending.wait().into_frame()?;
    frame.surface.save_png(out)?;
    info!(out = %out.display(), pieces = frame.summary.pieces, "盤面画像を出力しました");
    Ok(())
}

struct BatchJob {
    source: PathBuf,
    /// 出力ファイル名の元。同名のファイルが複数あれば親ディレクトリ名を付ける。
    name: String,
    index: usize,
    sfen: String,
}

fn file_stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("position")
}

fn output_name(source: &Path, sources: &[PathBuf]) -> String {
    let stem = file_stem(source);
    let parents: Vec<Vec<Component>> = sources
        .iter()
        .filter(|other| file_stem(other) == stem)
        .map(|other| other.parent().map(|p| p.components().collect()).unwrap_or_default())
        .collect();
    if parents.len() < 2 {
        return stem.to_string();
    }

    // 共通の親ディレクトリより下の部分だけを名前に使う
    let own: Vec<Component> = source.parent().map(|p| p.components().collect()).unwrap_or_default();
    let shared = parents
        .iter()
        .map(|other| own.iter().zip(other).take_while(|(a, b)| a == b).count())
        .min()
        .unwrap_or(0);
    let mut parts: Vec<&str> = own[shared..]
        .iter()
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect();
    parts.push(stem);
    parts.join("_")
}

fn collect_jobs(pattern: &str) -> Result<Vec<BatchJob>> {
    let sources = glob::glob(pattern)
        .with_context(|| format!("bad glob pattern {}", pattern))?
        .collect::<std::result::Result<Vec<PathBuf>, _>>()?;

    let mut jobs = Vec::new();
    for source in &sources {
        let name = output_name(source, &sources);
        let text = fs::read_to_string(source).with_context(|| format!("failed to read {}", source.display()))?;
        for (index, sfen) in text.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
            jobs.push(BatchJob {
                source: source.clone(),
                name: name.clone(),
                index,
                sfen: sfen.to_string(),
            });
        }
    }
    Ok(jobs)
}

fn output_path(out_dir: &Path, job: &BatchJob) -> PathBuf {
    out_dir.join(format!("{}-{:03}.png", job.name, job.index))
}

/// 出力先が重なる局面があればエラー。並列に書くと片方が黙って上書きされる。
fn check_unique_outputs(out_dir: &Path, jobs: &[BatchJob]) -> Result<()> {
    let mut seen = HashSet::new();
    for job in jobs {
        let path = output_path(out_dir, job);
        if !seen.insert(path.clone()) {
            return Err(anyhow!(
                "{} #{} would overwrite {}",
                job.source.display(),
                job.index + 1,
                path.display()
            ));
        }
    }
    Ok(())
}

fn render_batch(sprites: &str, pattern: &str, out_dir: &Path, config: &RenderConfig) -> Result<()> {
    let jobs = collect_jobs(pattern)?;
    if jobs.is_empty() {
        return Err(anyhow!("no positions matched {}", pattern));
    }
    check_unique_outputs(out_dir, &jobs)?;
    fs::create_dir_all(out_dir)?;
    let sheet = SpriteSheet::load(sprites, config)?;

    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")?);

    let failures: Vec<String> = jobs
        .par_iter()
        .filter_map(|job| {
            let result = render_surface(&sheet, &job.sfen, config)
                .and_then(|frame| frame.surface.save_png(&output_path(out_dir, job)));
            pb.inc(1);
            result
                .err()
                .map(|e| format!("{} #{}: {}", job.source.display(), job.index + 1, e))
        })
        .collect();
    pb.finish_with_message("done");

    for failure in &failures {
        error!("{}", failure);
    }
    info!(rendered = jobs.len() - failures.len(), failed = failures.len(), "batch finished");
    if failures.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{} of {} positions failed", failures.len(), jobs.len()))
    }
}

fn main() -> Result<()> {
    shogiboard::init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Render { sprites, sfen, out, ops } => render_one(&sprites, &sfen, &out, ops, &config),
        Command::Batch { sprites, pattern, out_dir } => render_batch(&sprites, &pattern, &out_dir, &config),
    }
}
