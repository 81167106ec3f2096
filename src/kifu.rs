//! CSA 形式の棋譜を1手ずつ再生し、各局面の SFEN を得る。

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csa::PieceType;
use flate2::read::GzDecoder;
use shogi_core::{Color, Move, Piece, PieceKind, Position, Square};
use tracing::{debug, warn};

use crate::error::{RenderError, Result};

fn csa_to_shogi_piece_kind(csa_piece_type: PieceType) -> Option<PieceKind> {
    let kind = match csa_piece_type {
        PieceType::Pawn => PieceKind::Pawn,
        PieceType::Lance => PieceKind::Lance,
        PieceType::Knight => PieceKind::Knight,
        PieceType::Silver => PieceKind::Silver,
        PieceType::Gold => PieceKind::Gold,
        PieceType::Bishop => PieceKind::Bishop,
        PieceType::Rook => PieceKind::Rook,
        PieceType::King => PieceKind::King,
        PieceType::ProPawn => PieceKind::ProPawn,
        PieceType::ProLance => PieceKind::ProLance,
        PieceType::ProKnight => PieceKind::ProKnight,
        PieceType::ProSilver => PieceKind::ProSilver,
        PieceType::Horse => PieceKind::ProBishop,
        PieceType::Dragon => PieceKind::ProRook,
        PieceType::All => return None,
    };
    Some(kind)
}

/// 棋譜ファイルを読む。拡張子が `.gz` なら展開する。
pub fn read_kifu_text(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut text = String::new();
    if path.extension().map_or(false, |ext| ext == "gz") {
        GzDecoder::new(file).read_to_string(&mut text)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut text)?;
    }
    Ok(text)
}

fn to_shogi_move(action: &csa::Action, position: &Position) -> Result<Option<Move>> {
    let csa::Action::Move(color, from_csa, to_csa, piece_type_after_csa) = action else {
        // 投了などの特殊な手で終わり
        return Ok(None);
    };
    let invalid = || RenderError::Kifu(format!("invalid move: {:?}", action));

    let to_sq = Square::new(to_csa.file, to_csa.rank).ok_or_else(invalid)?;
    let kind_after = csa_to_shogi_piece_kind(*piece_type_after_csa).ok_or_else(invalid)?;

    if from_csa.file == 0 && from_csa.rank == 0 {
        let piece_color = if *color == csa::Color::Black { Color::Black } else { Color::White };
        return Ok(Some(Move::Drop {
            piece: Piece::new(kind_after, piece_color),
            to: to_sq,
        }));
    }

    let from_sq = Square::new(from_csa.file, from_csa.rank).ok_or_else(invalid)?;
    let piece_before = position.piece_at(from_sq).ok_or_else(invalid)?;
    let promote = piece_before.piece_kind() != kind_after;
    Ok(Some(Move::Normal {
        from: from_sq,
        to: to_sq,
        promote,
    }))
}

fn sfen_of(position: &Position) -> String {
    let sfen = position.to_sfen_owned();
    match sfen.strip_prefix("sfen ") {
        Some(rest) => rest.to_string(),
        None => sfen,
    }
}

/// 平手初期局面から棋譜の指し手を順に適用し、初期局面を含む全局面の SFEN を返す。
pub fn replay_csa(text: &str) -> Result<Vec<String>> {
    let record = csa::parse_csa(text).map_err(|e| RenderError::Kifu(e.to_string()))?;

    let mut position = Position::startpos();
    let mut sfens = vec![sfen_of(&position)];

    for (ply, mv) in record.moves.iter().enumerate() {
        let Some(shogi_move) = to_shogi_move(&mv.action, &position)? else {
            debug!(ply = ply + 1, "end of moves");
            break;
        };
        if position.make_move(shogi_move).is_none() {
            warn!(ply = ply + 1, ?shogi_move, "illegal move in record");
            return Err(RenderError::Kifu(format!("illegal move at ply {}: {:?}", ply + 1, shogi_move)));
        }
        sfens.push(sfen_of(&position));
    }
    Ok(sfens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const RECORD: &str = concat!(
        "V2.2\n",
        "N+sente\n",
        "N-gote\n",
        "P1-KY-KE-GI-KI-OU-KI-GI-KE-KY\n",
        "P2 * -HI *  *  *  *  * -KA * \n",
        "P3-FU-FU-FU-FU-FU-FU-FU-FU-FU\n",
        "P4 *  *  *  *  *  *  *  *  * \n",
        "P5 *  *  *  *  *  *  *  *  * \n",
        "P6 *  *  *  *  *  *  *  *  * \n",
        "P7+FU+FU+FU+FU+FU+FU+FU+FU+FU\n",
        "P8 * +KA *  *  *  *  * +HI * \n",
        "P9+KY+KE+GI+KI+OU+KI+GI+KE+KY\n",
        "+\n",
        "+7776FU\n",
        "-3334FU\n",
        "+8822UM\n",
        "-3122GI\n",
        "%TORYO\n",
    );

    #[test]
    fn test_replay_produces_one_sfen_per_ply() {
        let sfens = replay_csa(RECORD).unwrap();
        assert_eq!(sfens.len(), 5);
        assert!(sfens[0].starts_with("lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - "));
        assert!(sfens.iter().all(|s| s.split(' ').count() == 4));
        // 角交換の後は両者が角を持つ
        let hands = sfens[4].split(' ').nth(2).unwrap();
        assert_eq!(hands, "Bb");
    }

    #[test]
    fn test_replayed_positions_parse() {
        for sfen in replay_csa(RECORD).unwrap() {
            let layout = crate::sfen::parse_position(&sfen, true).unwrap().unwrap();
            assert!(layout.squares.len() >= 38);
        }
    }

    #[test]
    fn test_read_gzip_record() {
        let path = std::env::temp_dir().join(format!("shogiboard-kifu-{}.csa.gz", std::process::id()));
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(RECORD.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let text = read_kifu_text(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(text, RECORD);
    }

    #[test]
    fn test_broken_record() {
        assert!(matches!(replay_csa("+7776XX\n"), Err(RenderError::Kifu(_))));
    }
}
