pub mod bitmap;
pub mod board;
pub mod canvas;
pub mod config;
pub mod draw;
pub mod error;
pub mod kifu;
pub mod sfen;
pub mod sprite;

pub use bitmap::{BitmapCanvas, Surface};
pub use board::{render_frame, FrameSummary};
pub use canvas::{Canvas, RecordingCanvas};
pub use config::RenderConfig;
pub use draw::{draw, render_surface, DrawOutcome, DrawnFrame, PendingDraw};
pub use error::{RenderError, Result};
pub use sfen::parse_position;
pub use sprite::SpriteSheet;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` に従うログ出力を stderr に設定する。既定は info。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
