use serde::Serialize;

use crate::error::Result;
use crate::sprite::{SpriteCell, SpriteSheet};

pub type Point = (i32, i32);

/// 枚数表示の書式
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelStyle {
    pub font: String,
    pub size: u32,
}

/// 罫線と星を1本にまとめたパス。最後に一度だけ描く。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardPath {
    pub lines: Vec<(Point, Point)>,
    /// 中心と半径。塗りつぶす。
    pub dots: Vec<(Point, u32)>,
}

impl BoardPath {
    pub fn line(&mut self, from: Point, to: Point) {
        self.lines.push((from, to));
    }

    pub fn dot(&mut self, center: Point, radius: u32) {
        self.dots.push((center, radius));
    }
}

/// 描画先。ブラウザの 2D コンテキストに相当する最小限の操作。
pub trait Canvas {
    fn size(&self) -> (u32, u32);

    /// シートの `cell` を左上 `at` に等倍で描く
    fn draw_sprite(&mut self, sheet: &SpriteSheet, cell: SpriteCell, at: Point) -> Result<()>;

    /// `at` は文字列の左下（ベースライン）
    fn fill_text(&mut self, text: &str, at: Point, style: &LabelStyle) -> Result<()>;

    fn stroke_path(&mut self, path: &BoardPath, rgb: (u8, u8, u8)) -> Result<()>;
}

/// 記録された描画操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Sprite { cell: SpriteCell, x: i32, y: i32 },
    Text { text: String, x: i32, y: i32 },
    Path { lines: usize, dots: usize, color: String },
}

/// 描画操作を順番に記録するだけの Canvas。重なり順の確認や `--ops` 出力に使う。
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        RecordingCanvas { width, height, ops: Vec::new() }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn sprites_at(&self, x: i32, y: i32) -> Vec<SpriteCell> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Sprite { cell, x: sx, y: sy } if *sx == x && *sy == y => Some(*cell),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.ops)
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw_sprite(&mut self, _sheet: &SpriteSheet, cell: SpriteCell, at: Point) -> Result<()> {
        self.ops.push(DrawOp::Sprite { cell, x: at.0, y: at.1 });
        Ok(())
    }

    fn fill_text(&mut self, text: &str, at: Point, _style: &LabelStyle) -> Result<()> {
        self.ops.push(DrawOp::Text { text: text.to_string(), x: at.0, y: at.1 });
        Ok(())
    }

    fn stroke_path(&mut self, path: &BoardPath, rgb: (u8, u8, u8)) -> Result<()> {
        self.ops.push(DrawOp::Path {
            lines: path.lines.len(),
            dots: path.dots.len(),
            color: format!("#{:02x}{:02x}{:02x}", rgb.0, rgb.1, rgb.2),
        });
        Ok(())
    }
}
