use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::bitmap::Surface;
use crate::board::{render_frame, FrameSummary};
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::sprite::SpriteSheet;

/// 描き終わった描画先
#[derive(Debug)]
pub struct DrawnFrame {
    pub surface: Surface,
    pub summary: FrameSummary,
}

/// `draw` の結果。失敗しても描画先は呼び出し側に戻る。
#[derive(Debug)]
pub struct DrawOutcome {
    /// 読み込みに失敗した場合は大きさだけ合わせた白紙のまま
    pub surface: Surface,
    pub result: Result<FrameSummary>,
}

impl DrawOutcome {
    /// 成功なら描画先と結果をまとめて返す。失敗なら描画先は捨てる。
    pub fn into_frame(self) -> Result<DrawnFrame> {
        let summary = self.result?;
        Ok(DrawnFrame { surface: self.surface, summary })
    }
}

/// 読み込み中の描画。`draw` は画像の読み込みを待たずにこれを返す。
pub struct PendingDraw {
    size: (u32, u32),
    locator: String,
    handle: JoinHandle<DrawOutcome>,
}

impl PendingDraw {
    /// 描画先の大きさ。読み込み完了前から確定している。
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// キャッシュ回避用のクエリを付けた画像の場所
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// 読み込みと描画の完了を待つ
    pub fn wait(self) -> DrawOutcome {
        let (width, height) = self.size;
        self.handle.join().unwrap_or_else(|_| {
            warn!(locator = %self.locator, "draw worker panicked");
            let mut surface = Surface::new();
            surface.resize(width, height);
            DrawOutcome {
                surface,
                result: Err(RenderError::WorkerPanicked),
            }
        })
    }
}

/// 画像の場所に現在時刻のクエリを付ける
pub fn cache_busted(locator: &str, stamp: u128) -> String {
    let sep = if locator.contains('?') { '&' } else { '?' };
    format!("{}{}{}", locator, sep, stamp)
}

/// 描画先を 11x11 マスに合わせ、駒画像の読み込み後に局面を描く。
///
/// 読み込みは別スレッドで行い、この関数はすぐに戻る。
/// 設定が不正なら描画先には触れずにそのまま返す。
pub fn draw(mut surface: Surface, sprite_locator: &str, position: &str, config: &RenderConfig) -> PendingDraw {
    let checked = config.validate();
    let (width, height) = match &checked {
        Ok(()) => {
            let size = config.canvas_size();
            surface.resize(size.0, size.1);
            size
        }
        Err(_) => surface.size(),
    };

    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let locator = cache_busted(sprite_locator, stamp);
    debug!(locator = %locator, width, height, "starting draw");

    let handle = {
        let locator = locator.clone();
        let position = position.to_string();
        let config = config.clone();
        thread::spawn(move || {
            let result = checked
                .and_then(|()| SpriteSheet::load(&locator, &config))
                .and_then(|sheet| paint(&mut surface, &sheet, &position, &config));
            if let Err(e) = &result {
                warn!(locator = %locator, "draw failed: {}", e);
            }
            DrawOutcome { surface, result }
        })
    };

    PendingDraw {
        size: (width, height),
        locator,
        handle,
    }
}

/// 読み込み済みの駒画像で描画先に1局面を描く
pub fn paint(surface: &mut Surface, sheet: &SpriteSheet, position: &str, config: &RenderConfig) -> Result<FrameSummary> {
    let mut canvas = surface.canvas();
    let summary = render_frame(&mut canvas, sheet, position, config)?;
    canvas.present()?;
    Ok(summary)
}

/// 新しい描画先を作って同期的に描く
pub fn render_surface(sheet: &SpriteSheet, position: &str, config: &RenderConfig) -> Result<DrawnFrame> {
    config.validate()?;
    let mut surface = Surface::new();
    let (width, height) = config.canvas_size();
    surface.resize(width, height);
    let summary = paint(&mut surface, sheet, position, config)?;
    info!(width, height, "surface ready");
    Ok(DrawnFrame { surface, summary })
}
