// src/moves/magic/loader.rs
//
// Builds the magic bitboard tables once per process and hands callers their
// own owned copy. The `load_magic` feature does not change what gets built
// here -- both paths run `generate_magic_tables` -- it only changes the seed:
// `deterministic_magic` pins the magic search to a fixed seed so CI and tests
// see the exact same tables run to run, while the default draws fresh
// randomness and relies on the process-wide cache so the (one-time, ~second
// scale) search cost is paid at most once.

use super::precompute::{MagicTableSeed, generate_magic_tables};
use super::structs::MagicTables;
use once_cell::sync::OnceCell;

fn seed() -> MagicTableSeed {
    #[cfg(feature = "deterministic_magic")]
    {
        MagicTableSeed::Fixed(0x5DEE_CE91_0B36_1CA3)
    }
    #[cfg(not(feature = "deterministic_magic"))]
    {
        MagicTableSeed::Random
    }
}

static TABLES: OnceCell<MagicTables> = OnceCell::new();

fn tables() -> &'static MagicTables {
    TABLES.get_or_init(|| generate_magic_tables(seed()).expect("failed to generate magic tables"))
}

pub fn load_magic_tables() -> MagicTables {
    tables().clone()
}

/// Process-wide shared magic tables, for hot paths (e.g. the board's
/// incremental attack/pin geometry) that would otherwise pay `MagicTables`'s
/// deep-clone cost on every call.
pub fn magic_tables_ref() -> &'static MagicTables {
    tables()
}
