use serde::Serialize;
use tracing::{debug, info};

use crate::canvas::{BoardPath, Canvas, LabelStyle, Point};
use crate::config::{RenderConfig, CANVAS_CELLS};
use crate::error::{RenderError, Result};
use crate::sfen::{self, PositionLayout, RackSlot, BOARD_SIZE};
use crate::sprite::{self, SpriteSheet, EMPTY_SQUARE};

/// 枚数表示の横位置（マス幅に対する割合）
const LABEL_OFFSET: f64 = 1.7;

/// 1枚描いた結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameSummary {
    pub pieces: usize,
    pub captured: usize,
    /// 局面文字列が不正で駒を描かなかった
    pub skipped: bool,
}

/// 背景・駒・駒台・罫線の順に1局面を描く。
///
/// 背景の空きマスは描画先全体を覆う。罫線と星は必ず最後に描くので駒より上に重なる。
pub fn render_frame<C: Canvas>(
    canvas: &mut C,
    sheet: &SpriteSheet,
    position: &str,
    config: &RenderConfig,
) -> Result<FrameSummary> {
    config.validate()?;
    let (w, h) = (config.cell_width as i32, config.cell_height as i32);
    let grid = config.grid_rgb()?;

    let blank = sprite::lookup(EMPTY_SQUARE)
        .ok_or_else(|| RenderError::UnknownPieceCode { code: EMPTY_SQUARE.to_string() })?;
    let (columns, rows) = background_cells(canvas.size(), config);
    for i in 0..columns as i32 {
        for j in 0..rows as i32 {
            canvas.draw_sprite(sheet, blank, (i * w, j * h))?;
        }
    }

    let mut summary = FrameSummary::default();
    match sfen::parse_position(position, config.strict)? {
        Some(layout) => {
            draw_pieces(canvas, sheet, &layout, config)?;
            summary.pieces = layout.squares.len();
            summary.captured = layout.racks.len();
        }
        None => summary.skipped = true,
    }

    canvas.stroke_path(&board_path(config), grid)?;

    info!(
        pieces = summary.pieces,
        captured = summary.captured,
        skipped = summary.skipped,
        "rendered frame"
    );
    Ok(summary)
}

/// 描画先を覆うのに要る空きマスの数。11x11 マスを超えては描かない。
fn background_cells((width, height): (u32, u32), config: &RenderConfig) -> (u32, u32) {
    (
        width.div_ceil(config.cell_width).min(CANVAS_CELLS),
        height.div_ceil(config.cell_height).min(CANVAS_CELLS),
    )
}

fn draw_pieces<C: Canvas>(
    canvas: &mut C,
    sheet: &SpriteSheet,
    layout: &PositionLayout,
    config: &RenderConfig,
) -> Result<()> {
    let (w, h) = (config.cell_width as i32, config.cell_height as i32);
    for p in &layout.squares {
        let at = ((p.column as i32 + 1) * w, (p.row as i32 + 1) * h);
        debug!(code = %p.code, column = p.column, row = p.row, "board piece");
        canvas.draw_sprite(sheet, p.cell, at)?;
    }

    let style = LabelStyle {
        font: config.label_font.clone(),
        size: config.label_size,
    };
    for slot in &layout.racks {
        let (at, label_at) = rack_position(slot, config);
        debug!(code = %slot.code, index = slot.index, first_player = slot.first_player(), "captured piece");
        canvas.draw_sprite(sheet, slot.cell, at)?;
        if let Some(label) = &slot.label {
            canvas.fill_text(label, label_at, &style)?;
        }
    }
    Ok(())
}

/// 駒台の駒の左上と、枚数表示の左下。先手は下端、後手は上端。
fn rack_position(slot: &RackSlot, config: &RenderConfig) -> (Point, Point) {
    let (w, h) = (config.cell_width as f64, config.cell_height as f64);
    let index = slot.index as f64;
    let rack_row = if slot.first_player() { BOARD_SIZE as f64 + 1.0 } else { 0.0 };
    let sprite_at = (((index + 1.0) * w) as i32, (rack_row * h) as i32);
    let label_at = (((index + LABEL_OFFSET) * w).round() as i32, ((rack_row + 1.0) * h) as i32);
    (sprite_at, label_at)
}

/// 10本ずつの縦横の罫線と、4つの星
pub fn board_path(config: &RenderConfig) -> BoardPath {
    let (w, h) = (config.cell_width as i32, config.cell_height as i32);
    let edge = BOARD_SIZE as i32 + 1;
    let mut path = BoardPath::default();

    for i in 1..=edge {
        path.line((w, h * i), (w * edge, h * i));
    }
    for i in 1..=edge {
        path.line((w * i, h), (w * i, h * edge));
    }

    for i in 1..=2 {
        for j in 1..=2 {
            path.dot(((1 + 3 * i) * w, (1 + 3 * j) * h), config.marker_radius);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{DrawOp, RecordingCanvas};
    use image::RgbaImage;

    const BACKGROUND_OPS: usize = (CANVAS_CELLS * CANVAS_CELLS) as usize;

    fn sheet(config: &RenderConfig) -> SpriteSheet {
        SpriteSheet::from_image(RgbaImage::new(43 * 8, 48 * 6), config).unwrap()
    }

    fn render(position: &str) -> (RecordingCanvas, FrameSummary) {
        let config = RenderConfig::default();
        let (width, height) = config.canvas_size();
        let mut canvas = RecordingCanvas::new(width, height);
        let summary = render_frame(&mut canvas, &sheet(&config), position, &config).unwrap();
        (canvas, summary)
    }

    fn piece_ops(canvas: &RecordingCanvas) -> Vec<DrawOp> {
        canvas.ops()[BACKGROUND_OPS..].to_vec()
    }

    #[test]
    fn test_empty_board_draws_no_pieces() {
        let (canvas, summary) = render("9/9/9/9/9/9/9/9/9 b - 1");
        assert_eq!(summary, FrameSummary { pieces: 0, captured: 0, skipped: false });
        let ops = piece_ops(&canvas);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], DrawOp::Path { .. }));
    }

    #[test]
    fn test_background_is_blank_cells() {
        let (canvas, _) = render("9/9/9/9/9/9/9/9/9 b - 1");
        let blank = sprite::lookup(EMPTY_SQUARE).unwrap();
        assert!(canvas.ops()[..BACKGROUND_OPS]
            .iter()
            .all(|op| matches!(op, DrawOp::Sprite { cell, .. } if *cell == blank)));
        assert_eq!(canvas.sprites_at(10 * 43, 10 * 48), vec![blank]);
    }

    #[test]
    fn test_center_pawn_position() {
        let (canvas, summary) = render("9/9/9/9/4P4/9/9/9/9 b - 1");
        assert_eq!(summary.pieces, 1);
        let pawn = sprite::lookup("P").unwrap();
        let ops = piece_ops(&canvas);
        assert_eq!(ops[0], DrawOp::Sprite { cell: pawn, x: 5 * 43, y: 5 * 48 });
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_captures_with_label() {
        let (canvas, summary) = render("9/9/9/9/9/9/9/9/9 b 2Pb 1");
        assert_eq!(summary.captured, 2);
        let ops = piece_ops(&canvas);
        assert_eq!(
            ops[0],
            DrawOp::Sprite { cell: sprite::lookup("P").unwrap(), x: 43, y: 10 * 48 }
        );
        // 1.7 * 43 = 73.1
        assert_eq!(ops[1], DrawOp::Text { text: "2".to_string(), x: 73, y: 11 * 48 });
        assert_eq!(ops[2], DrawOp::Sprite { cell: sprite::lookup("b").unwrap(), x: 43, y: 0 });
        assert!(matches!(ops[3], DrawOp::Path { .. }));
        assert_eq!(ops.iter().filter(|op| matches!(op, DrawOp::Text { .. })).count(), 1);
    }

    #[test]
    fn test_second_player_label_row() {
        let (canvas, _) = render("9/9/9/9/9/9/9/9/9 w p3p 1");
        let ops = piece_ops(&canvas);
        assert_eq!(ops[1], DrawOp::Sprite { cell: sprite::lookup("p").unwrap(), x: 86, y: 0 });
        // (1 + 1.7) * 43 = 116.1
        assert_eq!(ops[2], DrawOp::Text { text: "3".to_string(), x: 116, y: 48 });
    }

    #[test]
    fn test_three_fields_draws_only_grid() {
        let (canvas, summary) = render("9/9/9/9/4P4/9/9/9/9 b -");
        assert!(summary.skipped);
        assert_eq!(summary.pieces, 0);
        let ops = piece_ops(&canvas);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], DrawOp::Path { .. }));
    }

    #[test]
    fn test_grid_is_drawn_last() {
        let (canvas, summary) = render("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b 18P2p 1");
        assert_eq!(summary.pieces, 40);
        let last = canvas.ops().last().unwrap();
        assert_eq!(
            last,
            &DrawOp::Path { lines: 20, dots: 4, color: "#000000".to_string() }
        );
        assert_eq!(canvas.ops().iter().filter(|op| matches!(op, DrawOp::Path { .. })).count(), 1);
    }

    #[test]
    fn test_unknown_code_fails_frame() {
        let config = RenderConfig::default();
        let mut canvas = RecordingCanvas::new(1, 1);
        let result = render_frame(&mut canvas, &sheet(&config), "9/9/9/9/4Z4/9/9/9/9 b - 1", &config);
        assert!(matches!(result, Err(RenderError::UnknownPieceCode { .. })));
    }

    #[test]
    fn test_background_follows_canvas_size() {
        let config = RenderConfig::default();
        assert_eq!(background_cells(config.canvas_size(), &config), (11, 11));
        assert_eq!(background_cells((1, 1), &config), (1, 1));
        assert_eq!(background_cells((44, 48), &config), (2, 1));
        assert_eq!(background_cells((10_000, 10_000), &config), (11, 11));

        let mut canvas = RecordingCanvas::new(86, 48);
        render_frame(&mut canvas, &sheet(&config), "9/9/9/9/9/9/9/9/9 b - 1", &config).unwrap();
        let blanks = canvas.ops().iter().filter(|op| matches!(op, DrawOp::Sprite { .. })).count();
        assert_eq!(blanks, 2);
    }

    #[test]
    fn test_invalid_config_fails_frame() {
        let config = RenderConfig::default();
        let sheet = sheet(&config);
        let huge = RenderConfig { cell_width: 500_000_000, ..RenderConfig::default() };
        let mut canvas = RecordingCanvas::new(1, 1);
        let result = render_frame(&mut canvas, &sheet, "9/9/9/9/9/9/9/9/9 b - 1", &huge);
        assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
        assert!(canvas.ops().is_empty());
    }

    #[test]
    fn test_board_path_geometry() {
        let path = board_path(&RenderConfig::default());
        assert_eq!(path.lines.len(), 20);
        assert_eq!(path.lines[0], ((43, 48), (430, 48)));
        assert_eq!(path.lines[10], ((43, 48), (43, 480)));
        let centers: Vec<Point> = path.dots.iter().map(|&(c, _)| c).collect();
        assert_eq!(centers, vec![(172, 192), (172, 336), (301, 192), (301, 336)]);
        assert!(path.dots.iter().all(|&(_, r)| r == 2));
    }
}
