// src/board/attacks.rs
//
// A full recompute of the board's attack geometry: per-piece attack
// bitboards, the set of pieces giving check to the side to move, and any
// absolutely pinned pieces. `is_square_attacked`/`in_check` in
// `moves::square_control` answer single-square questions cheaply on their
// own; `AttackInfo` exists for callers (principally the search hot path)
// that want `isCheck`/`attacks_by`/`pinned` available as O(1) field reads
// across a whole node instead of re-deriving them move by move.

use crate::bitboard::BitboardExt;
use crate::board::{Board, Color, Piece};
use crate::moves::king::KING_ATTACKS;
use crate::moves::knight::KNIGHT_ATTACKS;
use crate::moves::magic::MagicTables;
use crate::moves::square_control::{FILE_A, FILE_H};
use crate::square::Square;
use crate::utils::square_index;

const NUM_COLORS: usize = 2;
const NUM_PIECES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackInfo {
    /// Union of attacks for each (color, piece type), indexed the same way
    /// as `Board::piece_bb`.
    pub attacks_by: [[u64; NUM_PIECES]; NUM_COLORS],
    /// Union of every piece's attacks for a color.
    pub attacked_by: [u64; NUM_COLORS],
    /// Enemy pieces currently attacking the side-to-move's king. Empty if
    /// the side to move isn't in check.
    pub checkers: u64,
    /// Per-color bitboard of that color's own pieces pinned to their king.
    pub pinned: [u64; NUM_COLORS],
    /// For a pinned square, the enemy square doing the pinning. Only
    /// meaningful for squares set in `pinned`.
    pinner_of: [Option<Square>; 64],
}

impl AttackInfo {
    /// All-empty geometry: no checkers, no pins. Used before a board has
    /// pieces placed (`king_square` would otherwise panic on `compute`).
    pub fn empty() -> Self {
        AttackInfo {
            attacks_by: [[0u64; NUM_PIECES]; NUM_COLORS],
            attacked_by: [0u64; NUM_COLORS],
            checkers: 0,
            pinned: [0u64; NUM_COLORS],
            pinner_of: [None; 64],
        }
    }

    pub fn compute(board: &Board, tables: &MagicTables) -> Self {
        let occ = board.occupied();
        let mut attacks_by = [[0u64; NUM_PIECES]; NUM_COLORS];

        for &color in &[Color::White, Color::Black] {
            for &piece in &[
                Piece::Pawn,
                Piece::Knight,
                Piece::Bishop,
                Piece::Rook,
                Piece::Queen,
                Piece::King,
            ] {
                let mut bb = board.pieces(piece, color);
                let mut acc = 0u64;
                while bb != 0 {
                    let sq = bb.pop_lsb();
                    acc |= attacks_from_square(piece, color, sq, occ, tables);
                }
                attacks_by[color as usize][piece as usize] = acc;
            }
        }

        let attacked_by = [
            attacks_by[Color::White as usize].iter().fold(0u64, |a, b| a | b),
            attacks_by[Color::Black as usize].iter().fold(0u64, |a, b| a | b),
        ];

        let stm = board.side_to_move;
        let king_sq = board.king_square(stm);
        let checkers = attackers_to(board, king_sq, stm.opposite(), tables);

        let mut pinned = [0u64; NUM_COLORS];
        let mut pinner_of = [None; 64];
        for &color in &[Color::White, Color::Black] {
            let king_sq = board.king_square(color);
            let enemy = color.opposite();
            let own_occ = board.occupancy(color);
            let enemy_occ = board.occupancy(enemy);

            let rook_rays = tables.rook.get_attacks(king_sq.index() as usize, enemy_occ);
            let bishop_rays = tables.bishop.get_attacks(king_sq.index() as usize, enemy_occ);
            let rook_like = board.pieces(Piece::Rook, enemy) | board.pieces(Piece::Queen, enemy);
            let bishop_like = board.pieces(Piece::Bishop, enemy) | board.pieces(Piece::Queen, enemy);

            let mut pinners = (rook_rays & rook_like) | (bishop_rays & bishop_like);
            while pinners != 0 {
                let pinner_sq = Square::from_index(pinners.pop_lsb());
                let between_bb = between(king_sq, pinner_sq);
                let blockers = between_bb & own_occ;
                if blockers.pop_count() == 1 {
                    pinned[color as usize] |= blockers;
                    pinner_of[blockers.lsb() as usize] = Some(pinner_sq);
                }
            }
        }

        AttackInfo {
            attacks_by,
            attacked_by,
            checkers,
            pinned,
            pinner_of,
        }
    }

    #[inline(always)]
    pub fn is_check(&self) -> bool {
        self.checkers != 0
    }

    #[inline(always)]
    pub fn checker_count(&self) -> u32 {
        self.checkers.pop_count()
    }

    #[inline(always)]
    pub fn is_pinned(&self, color: Color, sq: Square) -> bool {
        self.pinned[color as usize].has_square(sq)
    }

    #[inline(always)]
    pub fn pinner_of(&self, sq: Square) -> Option<Square> {
        self.pinner_of[sq.index() as usize]
    }
}

fn attacks_from_square(piece: Piece, color: Color, sq: u8, occ: u64, tables: &MagicTables) -> u64 {
    match piece {
        Piece::Knight => KNIGHT_ATTACKS[sq as usize],
        Piece::King => KING_ATTACKS[sq as usize],
        Piece::Pawn => crate::moves::pawn::pawn_attacks(sq, color),
        Piece::Bishop => tables.bishop.get_attacks(sq as usize, occ),
        Piece::Rook => tables.rook.get_attacks(sq as usize, occ),
        Piece::Queen => tables.queen_attacks(sq as usize, occ),
    }
}

/// Bitboard of every `attacker`-colored piece giving check to/attacking
/// `square`. Mirrors `moves::square_control::is_square_attacked` but
/// accumulates the attacker set instead of short-circuiting on the first hit.
fn attackers_to(board: &Board, square: Square, attacker: Color, tables: &MagicTables) -> u64 {
    let idx = square.index();
    let target = 1u64 << idx;
    let occ = board.occupied();

    let pawn_attackers = match attacker {
        Color::White => ((target & !FILE_H) >> 7) | ((target & !FILE_A) >> 9),
        Color::Black => ((target & !FILE_A) << 7) | ((target & !FILE_H) << 9),
    };

    let mut bb = pawn_attackers & board.pieces(Piece::Pawn, attacker);
    bb |= KNIGHT_ATTACKS[idx as usize] & board.pieces(Piece::Knight, attacker);
    bb |= KING_ATTACKS[idx as usize] & board.pieces(Piece::King, attacker);

    let rook_attacks = tables.rook.get_attacks(idx as usize, occ);
    bb |= rook_attacks & board.pieces(Piece::Rook, attacker);

    let bishop_attacks = tables.bishop.get_attacks(idx as usize, occ);
    bb |= bishop_attacks & board.pieces(Piece::Bishop, attacker);

    bb |= (rook_attacks | bishop_attacks) & board.pieces(Piece::Queen, attacker);

    bb
}

/// Squares strictly between `a` and `b` along a shared rank, file, or
/// diagonal. Empty if the two squares aren't aligned.
pub(crate) fn between(a: Square, b: Square) -> u64 {
    let (af, ar) = (a.file() as i32, a.rank() as i32);
    let (bf, br) = (b.file() as i32, b.rank() as i32);
    let (df_raw, dr_raw) = (bf - af, br - ar);

    let aligned = df_raw == 0 || dr_raw == 0 || df_raw.abs() == dr_raw.abs();
    if !aligned || (df_raw == 0 && dr_raw == 0) {
        return 0;
    }

    let df = df_raw.signum();
    let dr = dr_raw.signum();

    let mut bb = 0u64;
    let mut f = af + df;
    let mut r = ar + dr;
    while (f, r) != (bf, br) {
        bb |= 1u64 << square_index(r as usize, f as usize);
        f += df;
        r += dr;
    }
    bb
}
