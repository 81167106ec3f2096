use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// 駒画像1マスの幅
pub const CELL_WIDTH: u32 = 43;
/// 駒画像1マスの高さ
pub const CELL_HEIGHT: u32 = 48;

/// 盤(9) + 左右の余白(2)
pub const CANVAS_CELLS: u32 = 11;

/// 描画先・駒画像の一辺の上限 (px)
pub const MAX_SIDE: u32 = 16384;

/// 描画設定。JSON ファイルから読み込める。省略したフィールドは既定値になる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub cell_width: u32,
    pub cell_height: u32,
    /// `#rrggbb`
    pub grid_color: String,
    pub label_font: String,
    pub label_size: u32,
    pub marker_radius: u32,
    /// true の場合、不正な局面文字列を黙って無視せずエラーにする
    pub strict: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            cell_width: CELL_WIDTH,
            cell_height: CELL_HEIGHT,
            grid_color: "#000000".to_string(),
            label_font: "serif".to_string(),
            label_size: 20,
            marker_radius: 2,
            strict: false,
        }
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: RenderConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(RenderError::InvalidConfig(format!(
                "cell size must be non-zero, got {}x{}",
                self.cell_width, self.cell_height
            )));
        }
        // 駒画像は 8x6 マスなので 11x11 マスの描画先が収まれば足りる
        let fits = |cell: u32| cell.checked_mul(CANVAS_CELLS).map_or(false, |side| side <= MAX_SIDE);
        if !fits(self.cell_width) || !fits(self.cell_height) {
            return Err(RenderError::InvalidConfig(format!(
                "cell size {}x{} makes the canvas larger than {}px",
                self.cell_width, self.cell_height, MAX_SIDE
            )));
        }
        if self.marker_radius > self.cell_width.min(self.cell_height) {
            return Err(RenderError::InvalidConfig(format!(
                "marker radius {} is larger than a cell",
                self.marker_radius
            )));
        }
        parse_hex_color(&self.grid_color)?;
        Ok(())
    }

    /// 描画先の大きさ（11マス x 11マス）。`validate` を通った設定なら溢れない。
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.cell_width.saturating_mul(CANVAS_CELLS),
            self.cell_height.saturating_mul(CANVAS_CELLS),
        )
    }

    pub fn grid_rgb(&self) -> Result<(u8, u8, u8)> {
        parse_hex_color(&self.grid_color)
    }
}

fn parse_hex_color(s: &str) -> Result<(u8, u8, u8)> {
    let invalid = || RenderError::InvalidConfig(format!("invalid color {:?}, expected #rrggbb", s));
    let hex = s.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok((channel(0)?, channel(2)?, channel(4)?))
}
