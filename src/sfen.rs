//! SFEN 形式の局面文字列を描画用の配置に変換する。
//!
//! 盤面は `/` 区切りの9段、数字は空きマスの連続数、`+` は成駒。
//! 持ち駒欄は `[枚数]駒` の連続で、`-` は持ち駒なし。

use serde::Serialize;
use shogi_core::PieceKind;
use shogi_usi_parser::FromUsi;
use tracing::{debug, warn};

use crate::error::{RenderError, Result};
use crate::sprite::{self, SpriteCell};

pub const BOARD_SIZE: u32 = 9;

const FIELD_COUNT: usize = 4;

/// 盤上の駒1枚
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub code: String,
    pub cell: SpriteCell,
    /// 盤の左端を 0 とする列
    pub column: u32,
    /// 盤の上端を 0 とする段
    pub row: u32,
}

/// 駒台上の駒1枚
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RackSlot {
    pub code: String,
    pub cell: SpriteCell,
    /// 駒台の左から何番目か (0 始まり)
    pub index: u32,
    /// 枚数表示。枚数が省略されていれば `None`
    pub label: Option<String>,
}

impl RackSlot {
    pub fn first_player(&self) -> bool {
        self.cell.first_player
    }
}

/// 局面文字列から得られる描画内容
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PositionLayout {
    pub squares: Vec<Placement>,
    pub racks: Vec<RackSlot>,
}

/// 局面文字列を解析する。
///
/// フィールド数が4でなければ `Ok(None)` を返す（何も描かない）。
/// `strict` の場合は不正な文字列をすべて `InvalidPosition` にする。
/// 未知の駒コードは常に `UnknownPieceCode`。
pub fn parse_position(sfen: &str, strict: bool) -> Result<Option<PositionLayout>> {
    let fields: Vec<&str> = sfen.split(' ').collect();
    if fields.len() != FIELD_COUNT {
        if strict {
            return Err(RenderError::InvalidPosition(format!(
                "expected {} space-separated fields, got {}",
                FIELD_COUNT,
                fields.len()
            )));
        }
        warn!(fields = fields.len(), "position string is malformed; drawing empty board");
        return Ok(None);
    }

    // 手番と手数は存在チェックのみ
    let (board, _side_to_move, hands, _move_number) = (fields[0], fields[1], fields[2], fields[3]);

    if strict {
        shogi_core::PartialPosition::from_usi(&format!("sfen {}", sfen))
            .map_err(|_| RenderError::InvalidPosition(format!("not a valid SFEN: {}", sfen)))?;
    }

    let squares = parse_board(board, strict)?;
    let racks = parse_hands(hands, strict)?;
    debug!(pieces = squares.len(), captured = racks.len(), "parsed position");
    Ok(Some(PositionLayout { squares, racks }))
}

fn run_length(c: char) -> Option<u32> {
    match c {
        '1'..='9' => c.to_digit(10),
        _ => None,
    }
}

fn parse_board(board: &str, strict: bool) -> Result<Vec<Placement>> {
    let rows: Vec<&str> = board.split('/').collect();
    if strict && rows.len() != BOARD_SIZE as usize {
        return Err(RenderError::InvalidPosition(format!(
            "expected {} board rows, got {}",
            BOARD_SIZE,
            rows.len()
        )));
    }

    let mut squares = Vec::new();
    for (row, text) in rows.iter().enumerate() {
        let mut column = 0;
        let mut symbol = String::new();
        for c in text.chars() {
            if let Some(n) = run_length(c) {
                column += n;
                continue;
            }

            symbol.push(c);
            if symbol == "+" {
                continue;
            }

            let cell = sprite::lookup(&symbol).ok_or_else(|| RenderError::UnknownPieceCode { code: symbol.clone() })?;
            squares.push(Placement {
                code: std::mem::take(&mut symbol),
                cell,
                column,
                row: row as u32,
            });
            column += 1;
        }

        if strict && (column != BOARD_SIZE || !symbol.is_empty()) {
            return Err(RenderError::InvalidPosition(format!(
                "board row {} decodes to {} columns",
                row + 1,
                column
            )));
        }
    }
    Ok(squares)
}

fn parse_hands(hands: &str, strict: bool) -> Result<Vec<RackSlot>> {
    if hands == "-" {
        return Ok(Vec::new());
    }

    let mut racks = Vec::new();
    let mut first_index = 0;
    let mut second_index = 0;
    let mut count = String::new();
    for c in hands.chars() {
        if run_length(c).is_some() || (c == '0' && !count.is_empty()) {
            count.push(c);
            continue;
        }

        let code = c.to_string();
        let cell = sprite::lookup(&code).ok_or_else(|| RenderError::UnknownPieceCode { code: code.clone() })?;
        // 玉は持ち駒にならない
        if strict && sprite::piece_for_code(&code).map(|p| p.piece_kind()) == Some(PieceKind::King) {
            return Err(RenderError::InvalidPosition(format!("{} cannot be held in hand", code)));
        }
        let index = if cell.first_player {
            first_index += 1;
            first_index - 1
        } else {
            second_index += 1;
            second_index - 1
        };
        let label = if count.is_empty() { None } else { Some(std::mem::take(&mut count)) };
        racks.push(RackSlot { code, cell, index, label });
    }

    if !count.is_empty() {
        debug!(count = %count, "dropping trailing count without a piece");
    }
    Ok(racks)
}
