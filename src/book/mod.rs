//! Opening book: a read-only Zobrist -> move-list lookup.
//!
//! Treated as an external collaborator with a fixed contract rather than
//! part of the search/eval core; this module is that collaborator, kept
//! thin and consumed only by the CLI and WASM front-ends (`handle_go` /
//! `VantageEngine::new`), never by the search itself.
//!
//! The on-disk format is this engine's own: repeated
//! `(zobrist: u64 LE, from: u8, to: u8, promo: u8, weight: u16 LE)` records,
//! keyed by the same incrementally-maintained Zobrist signature the board
//! already carries. This is deliberately not the standard Polyglot wire
//! format -- that format's hash keys depend on a fixed table of 781
//! pseudo-random constants external to this crate, and this component only
//! commits to a Zobrist -> move contract, not byte-for-byte compatibility
//! with third-party `.bin` books.

mod entry;

pub use entry::BookEntry;

use crate::board::Board;
use crate::moves::execute::generate_legal;
use crate::moves::magic::MagicTables;
use crate::moves::magic::loader::load_magic_tables;
use crate::moves::types::Move;
use arrayvec::ArrayVec;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

pub struct PolyglotBook {
    entries: HashMap<u64, Vec<BookEntry>>,
    tables: MagicTables,
}

impl PolyglotBook {
    /// Load a book from disk. Absence of the file is an ordinary "no book"
    /// condition for callers (they fall back to searching), not an error
    /// worth propagating loudly.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut entries: HashMap<u64, Vec<BookEntry>> = HashMap::new();
        let mut rest = bytes;
        while let Some((key, entry)) = BookEntry::decode(rest) {
            entries.entry(key).or_default().push(entry);
            rest = &rest[BookEntry::ENCODED_LEN..];
        }
        Self {
            entries,
            tables: load_magic_tables(),
        }
    }

    /// Serialize `entries` (keyed by the zobrist signature of the position
    /// they apply to) into this book's wire format.
    pub fn to_bytes(entries: &[(u64, BookEntry)]) -> Vec<u8> {
        let mut out = Vec::with_capacity(entries.len() * BookEntry::ENCODED_LEN);
        for (key, entry) in entries {
            entry.encode(*key, &mut out);
        }
        out
    }

    /// Look up `board`'s current position and return a weighted-random book
    /// move, or `None` if the position isn't in the book (or none of its
    /// recorded entries are still legal, e.g. after a book built from a
    /// stale move generator).
    pub fn probe(&self, board: &Board) -> Option<Move> {
        let candidates = self.entries.get(&board.zobrist)?;
        if candidates.is_empty() {
            return None;
        }

        let mut board = board.clone();
        let mut legal: ArrayVec<Move, 256> = ArrayVec::new();
        let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
        generate_legal(&mut board, &self.tables, &mut legal, &mut scratch);

        let playable: Vec<(&BookEntry, Move)> = candidates
            .iter()
            .filter_map(|entry| {
                legal
                    .iter()
                    .find(|m| {
                        m.from.index() == entry.from
                            && m.to.index() == entry.to
                            && m.promotion == entry.promotion
                    })
                    .map(|m| (entry, *m))
            })
            .collect();

        if playable.is_empty() {
            return None;
        }

        let total_weight: u32 = playable.iter().map(|(e, _)| e.weight.max(1) as u32).sum();
        let mut roll = rand::random::<u32>() % total_weight;
        for (entry, mv) in &playable {
            let w = entry.weight.max(1) as u32;
            if roll < w {
                return Some(*mv);
            }
            roll -= w;
        }
        playable.last().map(|(_, mv)| *mv)
    }
}
