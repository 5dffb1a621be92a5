// src/board/fen.rs
//
// Forsyth-Edwards Notation parsing and serialization for `Board`.

use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR};
use super::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece};
use crate::square::Square;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    WrongFieldCount(usize),
    BadPlacement(String),
    UnknownPieceGlyph(char),
    RankTooShort(usize),
    RankTooLong(usize),
    BadActiveColor(String),
    BadCastling(String),
    BadEnPassant(String),
    BadHalfmoveClock(String),
    BadFullmoveNumber(String),
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::WrongFieldCount(n) => {
                write!(f, "FEN must have 6 space-separated fields, found {n}")
            }
            FenError::BadPlacement(s) => write!(f, "malformed piece placement field: {s}"),
            FenError::UnknownPieceGlyph(c) => write!(f, "unknown piece glyph '{c}'"),
            FenError::RankTooShort(r) => write!(f, "rank {r} has fewer than 8 squares"),
            FenError::RankTooLong(r) => write!(f, "rank {r} has more than 8 squares"),
            FenError::BadActiveColor(s) => write!(f, "active color must be 'w' or 'b', got '{s}'"),
            FenError::BadCastling(s) => write!(f, "malformed castling field: {s}"),
            FenError::BadEnPassant(s) => write!(f, "malformed en passant field: {s}"),
            FenError::BadHalfmoveClock(s) => write!(f, "malformed halfmove clock: {s}"),
            FenError::BadFullmoveNumber(s) => write!(f, "malformed fullmove number: {s}"),
        }
    }
}

impl std::error::Error for FenError {}

impl From<FenError> for String {
    fn from(e: FenError) -> Self {
        e.to_string()
    }
}

impl Board {
    /// Resets `self` to the position described by `fen`, a standard
    /// six-field FEN string (piece placement, active color, castling
    /// availability, en passant target, halfmove clock, fullmove number).
    pub fn set_fen(&mut self, fen: &str) -> Result<(), FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::WrongFieldCount(fields.len()));
        }

        *self = Board::new_empty();

        parse_placement(self, fields[0])?;
        parse_active_color(self, fields[1])?;
        parse_castling(self, fields[2])?;
        parse_en_passant(self, fields[3])?;
        parse_halfmove_clock(self, fields[4])?;
        parse_fullmove_number(self, fields[5])?;

        self.refresh_zobrist();
        self.refresh_attack_info();
        Ok(())
    }

    /// Renders the current position as a standard six-field FEN string.
    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(64);

        for rank in (0..8).rev() {
            let mut empty_run = 0u8;
            for file in 0..8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    None => empty_run += 1,
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            out.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        out.push(PC_TO_CHAR[pc_index(piece, color)]);
                    }
                }
            }
            if empty_run > 0 {
                out.push_str(&empty_run.to_string());
            }
            if rank != 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(if self.side_to_move == Color::White {
            'w'
        } else {
            'b'
        });

        out.push(' ');
        let mut any_castle = false;
        if self.has_castling(CASTLE_WK) {
            out.push('K');
            any_castle = true;
        }
        if self.has_castling(CASTLE_WQ) {
            out.push('Q');
            any_castle = true;
        }
        if self.has_castling(CASTLE_BK) {
            out.push('k');
            any_castle = true;
        }
        if self.has_castling(CASTLE_BQ) {
            out.push('q');
            any_castle = true;
        }
        if !any_castle {
            out.push('-');
        }

        out.push(' ');
        match self.en_passant {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }

        out.push(' ');
        out.push_str(&self.halfmove_clock.to_string());
        out.push(' ');
        out.push_str(&self.fullmove_number.to_string());

        out
    }
}

#[inline]
fn pc_index(piece: Piece, color: Color) -> usize {
    (color as usize) * 6 + (piece as usize)
}

fn parse_placement(board: &mut Board, field: &str) -> Result<(), FenError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadPlacement(field.to_string()));
    }

    // FEN ranks run 8 down to 1; our rank index is 0 (rank 1) to 7 (rank 8).
    for (i, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file: u8 = 0;

        for c in rank_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                file += skip as u8;
                if file > 8 {
                    return Err(FenError::RankTooLong(8 - rank));
                }
                continue;
            }

            if file >= 8 {
                return Err(FenError::RankTooLong(8 - rank));
            }

            let (piece, color) = CHAR_TO_PC[c as usize]
                .ok_or(FenError::UnknownPieceGlyph(c))?;
            let sq = Square::from_file_rank(file, rank);
            let bb = board.bb(color, piece) | (1u64 << sq.index());
            board.set_bb(color, piece, bb);
            file += 1;
        }

        if file != 8 {
            return Err(FenError::RankTooShort(8 - rank));
        }
    }

    Ok(())
}

fn parse_active_color(board: &mut Board, field: &str) -> Result<(), FenError> {
    board.side_to_move = match field {
        "w" => Color::White,
        "b" => Color::Black,
        _ => return Err(FenError::BadActiveColor(field.to_string())),
    };
    Ok(())
}

fn parse_castling(board: &mut Board, field: &str) -> Result<(), FenError> {
    if field == "-" {
        board.castling_rights = 0;
        return Ok(());
    }

    let mut rights = 0u8;
    for c in field.chars() {
        rights |= match c {
            'K' => CASTLE_WK,
            'Q' => CASTLE_WQ,
            'k' => CASTLE_BK,
            'q' => CASTLE_BQ,
            _ => return Err(FenError::BadCastling(field.to_string())),
        };
    }
    board.castling_rights = rights;
    Ok(())
}

fn parse_en_passant(board: &mut Board, field: &str) -> Result<(), FenError> {
    if field == "-" {
        board.en_passant = None;
        return Ok(());
    }
    let sq =
        Square::from_str(field).map_err(|_| FenError::BadEnPassant(field.to_string()))?;
    board.en_passant = Some(sq);
    Ok(())
}

fn parse_halfmove_clock(board: &mut Board, field: &str) -> Result<(), FenError> {
    board.halfmove_clock = field
        .parse()
        .map_err(|_| FenError::BadHalfmoveClock(field.to_string()))?;
    Ok(())
}

fn parse_fullmove_number(board: &mut Board, field: &str) -> Result<(), FenError> {
    board.fullmove_number = field
        .parse()
        .map_err(|_| FenError::BadFullmoveNumber(field.to_string()))?;
    Ok(())
}
