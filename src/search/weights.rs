// HCE weight table: the JSON-serializable knobs behind the evaluator.
//
// Loading a file replaces the process-wide default weights pointer; it does
// not touch search state (TT, killers, history) since the evaluator reads
// this table fresh on every call rather than caching derived values.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::RwLock;

use crate::search::pesto;

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct PieceTable {
    pub mg: [i32; 64],
    pub eg: [i32; 64],
}

impl PieceTable {
    fn from_pesto(table: ([i32; 64], [i32; 64])) -> Self {
        Self {
            mg: table.0,
            eg: table.1,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct MaterialTable {
    pub pawn: (i32, i32),
    pub knight: (i32, i32),
    pub bishop: (i32, i32),
    pub rook: (i32, i32),
    pub queen: (i32, i32),
    pub king: (i32, i32),
}

/// One complete evaluator parameterization: material, piece-square tables,
/// mobility, pawn structure, and king safety ("king-attack curve").
#[derive(Clone, Serialize, Deserialize)]
pub struct HCEWeightTable {
    pub material: MaterialTable,
    pub pawn_table: PieceTable,
    pub knight_table: PieceTable,
    pub bishop_table: PieceTable,
    pub rook_table: PieceTable,
    pub queen_table: PieceTable,
    pub king_table: PieceTable,
    pub mobility_weight: i32,
    pub isolated_pawn_penalty: i32,
    pub doubled_pawn_penalty: i32,
    pub king_zone_attack_penalty: i32,
    pub king_shield_bonus: i32,
    pub king_open_file_penalty: i32,
    pub blocked_passer_penalty: i32,
    pub passed_pawn_bonus: [i32; 8],
}

impl Default for HCEWeightTable {
    fn default() -> Self {
        Self {
            material: MaterialTable {
                pawn: pesto::PAWN_VAL,
                knight: pesto::KNIGHT_VAL,
                bishop: pesto::BISHOP_VAL,
                rook: pesto::ROOK_VAL,
                queen: pesto::QUEEN_VAL,
                king: pesto::KING_VAL,
            },
            pawn_table: PieceTable::from_pesto(pesto::PAWN_TABLE),
            knight_table: PieceTable::from_pesto(pesto::KNIGHT_TABLE),
            bishop_table: PieceTable::from_pesto(pesto::BISHOP_TABLE),
            rook_table: PieceTable::from_pesto(pesto::ROOK_TABLE),
            queen_table: PieceTable::from_pesto(pesto::QUEEN_TABLE),
            king_table: PieceTable::from_pesto(pesto::KING_TABLE),
            mobility_weight: 5,
            isolated_pawn_penalty: -15,
            doubled_pawn_penalty: -10,
            king_zone_attack_penalty: 15,
            king_shield_bonus: 20,
            king_open_file_penalty: -30,
            blocked_passer_penalty: -50,
            passed_pawn_bonus: [0, 10, 20, 40, 80, 150, 300, 0],
        }
    }
}

impl HCEWeightTable {
    pub fn piece_table(&self, kind: crate::board::Piece) -> &PieceTable {
        use crate::board::Piece;
        match kind {
            Piece::Pawn => &self.pawn_table,
            Piece::Knight => &self.knight_table,
            Piece::Bishop => &self.bishop_table,
            Piece::Rook => &self.rook_table,
            Piece::Queen => &self.queen_table,
            Piece::King => &self.king_table,
        }
    }

    pub fn piece_value(&self, kind: crate::board::Piece) -> (i32, i32) {
        use crate::board::Piece;
        match kind {
            Piece::Pawn => self.material.pawn,
            Piece::Knight => self.material.knight,
            Piece::Bishop => self.material.bishop,
            Piece::Rook => self.material.rook,
            Piece::Queen => self.material.queen,
            Piece::King => self.material.king,
        }
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let text = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, text)
    }
}

static CURRENT: Lazy<RwLock<HCEWeightTable>> = Lazy::new(|| RwLock::new(HCEWeightTable::default()));

/// Snapshot of the weights the evaluator should use right now.
pub fn current() -> HCEWeightTable {
    CURRENT.read().expect("weights lock poisoned").clone()
}

/// Replace the process-wide default weights pointer. Takes effect on the
/// next evaluation; existing search state (TT, killers, history) is untouched.
pub fn set_current(table: HCEWeightTable) {
    *CURRENT.write().expect("weights lock poisoned") = table;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_json() {
        let table = HCEWeightTable::default();
        let json = table.to_json().unwrap();
        let back = HCEWeightTable::from_json(&json).unwrap();
        assert_eq!(back.material.pawn, table.material.pawn);
        assert_eq!(back.passed_pawn_bonus, table.passed_pawn_bonus);
    }

    #[test]
    fn set_current_is_observed_by_current() {
        let mut table = HCEWeightTable::default();
        table.mobility_weight = 42;
        set_current(table);
        assert_eq!(current().mobility_weight, 42);
        // Restore default so other tests in this process aren't affected.
        set_current(HCEWeightTable::default());
    }
}
