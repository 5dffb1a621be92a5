// src/moves/magic/precompute.rs
//
// Magic bitboard table construction: for every square, find a magic number
// that maps the relevant occupancy subset onto a dense, collision-free
// attack-table index, then bake the attack table for every such subset.

use super::attacks::{bishop_attacks_per_square, rook_attacks_per_square};
use super::search::find_magic_number_for_square;
use super::structs::{BishopMagicTables, MagicEntry, MagicTables, RookMagicTables};
use rand::{RngCore, SeedableRng, rngs::StdRng};

pub enum MagicTableSeed {
    Fixed(u64),
    Random,
}

fn make_rng(seed: MagicTableSeed) -> StdRng {
    match seed {
        MagicTableSeed::Fixed(s) => StdRng::seed_from_u64(s),
        MagicTableSeed::Random => {
            let mut bytes = [0u8; 32];
            rand::rng().fill_bytes(&mut bytes);
            StdRng::from_seed(bytes)
        }
    }
}

const FILE_A: u64 = 0x0101_0101_0101_0101;
const RANK_1: u64 = 0x0000_0000_0000_00FF;

/// Relevant-occupancy mask for a rook on `square`: the full rook ray with the
/// board edge in each direction stripped off (a blocker on the final square
/// of a ray can never change the attack set, since the ray always includes
/// that square regardless of what sits on it).
fn rook_mask(square: usize) -> u64 {
    let rank = square / 8;
    let file = square % 8;
    let mut mask = 0u64;

    for r in (rank + 1)..7 {
        mask |= 1u64 << (r * 8 + file);
    }
    for r in (1..rank).rev() {
        mask |= 1u64 << (r * 8 + file);
    }
    for f in (file + 1)..7 {
        mask |= 1u64 << (rank * 8 + f);
    }
    for f in (1..file).rev() {
        mask |= 1u64 << (rank * 8 + f);
    }
    mask
}

/// Relevant-occupancy mask for a bishop on `square`, same reasoning as
/// `rook_mask` but along diagonals.
fn bishop_mask(square: usize) -> u64 {
    let rank = square as isize / 8;
    let file = square as isize % 8;
    let mut mask = 0u64;

    for (dr, df) in [(1isize, 1isize), (1, -1), (-1, 1), (-1, -1)] {
        let mut r = rank + dr;
        let mut f = file + df;
        while (1..7).contains(&r) && (1..7).contains(&f) {
            mask |= 1u64 << (r * 8 + f);
            r += dr;
            f += df;
        }
    }
    mask
}

/// Enumerates every subset of `mask`'s set bits via the Carry-Rippler trick.
fn subsets_of(mask: u64) -> Vec<u64> {
    let mut subsets = Vec::with_capacity(1usize << mask.count_ones());
    let mut subset = 0u64;
    loop {
        subsets.push(subset);
        if subset == mask {
            break;
        }
        subset = subset.wrapping_sub(mask) & mask;
    }
    subsets
}

fn build_table<R: RngCore>(
    rng: &mut R,
    attacks_fn: fn(usize, u64) -> u64,
    mask_fn: fn(usize) -> u64,
) -> Result<Vec<MagicEntry>, String> {
    let mut entries = Vec::with_capacity(64);

    for square in 0..64 {
        let mask = mask_fn(square);
        let blockers = subsets_of(mask);
        let attacks: Vec<u64> = blockers.iter().map(|&b| attacks_fn(square, b)).collect();
        let shift = 64 - mask.count_ones();

        let magic = find_magic_number_for_square(&blockers, &attacks, shift, rng)?;

        let table_size = 1usize << mask.count_ones();
        let mut table = vec![0u64; table_size];
        for (&blocker, &attack) in blockers.iter().zip(attacks.iter()) {
            let index = (blocker.wrapping_mul(magic) >> shift) as usize;
            table[index] = attack;
        }

        entries.push(MagicEntry {
            magic,
            shift,
            mask,
            table: table.into_boxed_slice(),
        });
    }

    Ok(entries)
}

pub fn generate_magic_tables(seed: MagicTableSeed) -> Result<MagicTables, String> {
    let mut rng = make_rng(seed);

    let rook_entries = build_table(&mut rng, rook_attacks_per_square, rook_mask)?;
    let bishop_entries = build_table(&mut rng, bishop_attacks_per_square, bishop_mask)?;

    Ok(MagicTables {
        rook: RookMagicTables {
            entries: rook_entries,
        },
        bishop: BishopMagicTables {
            entries: bishop_entries,
        },
    })
}
