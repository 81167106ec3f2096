use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use image::{imageops, RgbaImage};
use lazy_static::lazy_static;
use serde::Serialize;
use shogi_core::{Color, Piece, PieceKind};
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::{RenderError, Result};

pub const SHEET_COLUMNS: u32 = 8;
pub const SHEET_ROWS: u32 = 6;

/// 空きマスの画像を引くためのキー
pub const EMPTY_SQUARE: &str = "";

/// 駒画像の並び。`None` の行・セルは区切りで使わない。
pub type SpriteLayout = [Option<[Option<&'static str>; SHEET_COLUMNS as usize]>; SHEET_ROWS as usize];

pub const KOMA_LAYOUT: SpriteLayout = [
    Some([None, Some("R"), Some("B"), Some("G"), Some("S"), Some("N"), Some("L"), Some("P")]),
    Some([Some("K"), Some("+R"), Some("+B"), Some(""), Some("+S"), Some("+N"), Some("+L"), Some("+P")]),
    None,
    Some([None, Some("r"), Some("b"), Some("g"), Some("s"), Some("n"), Some("l"), Some("p")]),
    Some([Some("k"), Some("+r"), Some("+b"), None, Some("+s"), Some("+n"), Some("+l"), Some("+p")]),
    None,
];

/// 駒画像シート上の1マスの位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SpriteCell {
    pub column: u32,
    pub row: u32,
    /// 先手の駒か
    pub first_player: bool,
}

impl SpriteCell {
    /// シート上の左上ピクセル座標
    pub fn origin(&self, cell_width: u32, cell_height: u32) -> (u32, u32) {
        (self.column * cell_width, self.row * cell_height)
    }
}

/// レイアウト表から駒コード→画像位置の表を作る。
pub fn build_sprite_table(layout: &SpriteLayout) -> HashMap<String, SpriteCell> {
    let mut table = HashMap::new();
    for (row, cells) in layout.iter().enumerate() {
        let Some(cells) = cells else { continue };
        for (column, code) in cells.iter().enumerate() {
            let Some(code) = code else { continue };
            table.insert(
                code.to_string(),
                SpriteCell {
                    column: column as u32,
                    row: row as u32,
                    first_player: row < 3,
                },
            );
        }
    }
    table
}

lazy_static! {
    pub static ref SPRITE_TABLE: HashMap<String, SpriteCell> = build_sprite_table(&KOMA_LAYOUT);
}

pub fn lookup(code: &str) -> Option<SpriteCell> {
    SPRITE_TABLE.get(code).copied()
}

/// 駒コードを `shogi_core::Piece` に変換する。大文字が先手(Black)。
pub fn piece_for_code(code: &str) -> Option<Piece> {
    let (promoted, letter) = match code.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, code),
    };
    let mut chars = letter.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let color = if c.is_ascii_uppercase() { Color::Black } else { Color::White };
    let kind = match (c.to_ascii_uppercase(), promoted) {
        ('P', false) => PieceKind::Pawn,
        ('L', false) => PieceKind::Lance,
        ('N', false) => PieceKind::Knight,
        ('S', false) => PieceKind::Silver,
        ('G', false) => PieceKind::Gold,
        ('B', false) => PieceKind::Bishop,
        ('R', false) => PieceKind::Rook,
        ('K', false) => PieceKind::King,
        ('P', true) => PieceKind::ProPawn,
        ('L', true) => PieceKind::ProLance,
        ('N', true) => PieceKind::ProKnight,
        ('S', true) => PieceKind::ProSilver,
        ('B', true) => PieceKind::ProBishop,
        ('R', true) => PieceKind::ProRook,
        _ => return None,
    };
    Some(Piece::new(kind, color))
}

/// 読み込み済みの駒画像シート
#[derive(Clone)]
pub struct SpriteSheet {
    image: RgbaImage,
    cell_width: u32,
    cell_height: u32,
}

impl fmt::Debug for SpriteSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteSheet")
            .field("size", &self.image.dimensions())
            .field("cell_width", &self.cell_width)
            .field("cell_height", &self.cell_height)
            .finish()
    }
}

impl SpriteSheet {
    /// 画像ファイルを読み込む。`?` 以降のクエリ部分は無視する。
    pub fn load(locator: &str, config: &RenderConfig) -> Result<Self> {
        let path = locator.split('?').next().unwrap_or(locator);
        debug!(locator, path, "loading sprite sheet");
        let image = image::open(Path::new(path))
            .map_err(|source| RenderError::Asset {
                locator: locator.to_string(),
                source,
            })?
            .to_rgba8();
        Self::from_image(image, config)
    }

    pub fn from_image(image: RgbaImage, config: &RenderConfig) -> Result<Self> {
        config.validate()?;
        let min_width = config.cell_width * SHEET_COLUMNS;
        let min_height = config.cell_height * SHEET_ROWS;
        if image.width() < min_width || image.height() < min_height {
            return Err(RenderError::SheetTooSmall {
                width: image.width(),
                height: image.height(),
                min_width,
                min_height,
            });
        }
        Ok(SpriteSheet {
            image,
            cell_width: config.cell_width,
            cell_height: config.cell_height,
        })
    }

    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    /// 指定マスの画像を切り出す
    pub fn cell_image(&self, cell: SpriteCell) -> RgbaImage {
        let (x, y) = cell.origin(self.cell_width, self.cell_height);
        imageops::crop_imm(&self.image, x, y, self.cell_width, self.cell_height).to_image()
    }
}
