use vantage::board::{Board, Color, Piece};
use vantage::book::PolyglotBook;
use vantage::moves::execute::{generate_legal, make_move_basic};
use vantage::moves::magic::MagicTables;
use vantage::moves::magic::loader::load_magic_tables;
use vantage::moves::types::Move;
use vantage::search::search::search;
use vantage::search::tt::TranspositionTable;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::str::FromStr;
use std::time::Duration;

/// Engine-wide state toggled by `setoption`
/// (`MultiPV`, `Hash`, `UseOwnBook`).
struct EngineOptions {
    multi_pv: usize,
    hash_mb: usize,
    use_own_book: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            multi_pv: 1,
            hash_mb: 32,
            use_own_book: false,
        }
    }
}

fn main() {
    // Load magic tables once at startup
    let magic_tables = load_magic_tables();

    let mut board = Board::new(); // Start position
    let mut options = EngineOptions::default();
    let mut tt = TranspositionTable::new(options.hash_mb);

    let book = PolyglotBook::load("book.bin").ok();
    if book.is_some() {
        println!("info string Opening Book loaded successfully");
    } else {
        println!("info string No opening book found (book.bin), running engine only");
    }

    // Main UCI loop
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l.trim().to_string(),
            Err(_) => break,
        };

        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let command = parts[0];

        match command {
            "uci" => handle_uci(&options),
            "isready" => println!("readyok"),
            "ucinewgame" => {
                board = Board::new();
                tt.clear();
            }
            "setoption" => {
                let prev_hash_mb = options.hash_mb;
                handle_setoption(&parts, &mut options);
                if options.hash_mb != prev_hash_mb {
                    tt = TranspositionTable::new(options.hash_mb);
                }
            }
            "position" => {
                if let Some(new_board) = handle_position(&parts, &magic_tables) {
                    board = new_board;
                }
            }
            "go" => {
                handle_go(&parts, &mut board, &magic_tables, &mut tt, &book, &options);
            }
            "fen" => {
                println!("{}", board.to_fen());
            }
            "quit" => break,
            "d" | "display" => {
                println!("{}", board);
            }
            "test" | "bench" => {
                run_epd_tests("../bench_arena/bk.epd", &magic_tables);
            }
            _ => {}
        }
    }
}

fn handle_uci(options: &EngineOptions) {
    println!("id name Vantage 1.0");
    println!("id author Vaishak Menon");
    println!("option name MultiPV type spin default 1 min 1 max 500");
    println!("option name Hash type spin default 32 min 1 max 1048576");
    println!("option name UseOwnBook type check default false");
    // Echo back whatever `setoption` has already applied, in case `uci` is
    // re-sent mid-session (most GUIs only send it once, but it's cheap to honor).
    let _ = options;
    println!("uciok");
}

/// `setoption name X value Y` — applies the named option.
/// `Hash`/`MultiPV`/`UseOwnBook` are the only names the engine understands;
/// anything else is silently ignored (an unrecognized token, not an error).
fn handle_setoption(parts: &[&str], options: &mut EngineOptions) {
    let name_idx = parts.iter().position(|&p| p == "name");
    let value_idx = parts.iter().position(|&p| p == "value");
    let Some(name_idx) = name_idx else { return };

    let name_end = value_idx.unwrap_or(parts.len());
    if name_idx + 1 >= name_end {
        return;
    }
    let name = parts[name_idx + 1..name_end].join(" ");
    let value = value_idx.map(|vi| parts[vi + 1..].join(" "));

    match name.as_str() {
        "MultiPV" => {
            if let Some(v) = value.as_deref().and_then(|v| v.parse::<usize>().ok()) {
                options.multi_pv = v.clamp(1, 500);
            }
        }
        "Hash" => {
            if let Some(v) = value.as_deref().and_then(|v| v.parse::<usize>().ok()) {
                options.hash_mb = v.clamp(1, 1_048_576);
            }
        }
        "UseOwnBook" => {
            options.use_own_book = value.as_deref() == Some("true");
        }
        _ => {}
    }
}

fn handle_position(parts: &[&str], tables: &MagicTables) -> Option<Board> {
    let mut board = if parts.len() > 1 && parts[1] == "startpos" {
        Board::new()
    } else if parts.len() > 1 && parts[1] == "fen" {
        let fen_start = 2;
        let mut fen_end = parts.len();
        for (i, &part) in parts.iter().enumerate().skip(fen_start) {
            if part == "moves" {
                fen_end = i;
                break;
            }
        }

        let fen_string = parts[fen_start..fen_end].join(" ");
        Board::from_str(&fen_string).ok()?
    } else {
        Board::new()
    };

    // Apply moves if any
    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for move_str in &parts[moves_idx + 1..] {
            if let Some(mv) = parse_uci_move(&board, move_str, tables) {
                make_move_basic(&mut board, mv);
            } else {
                eprintln!("Invalid move: {}", move_str);
                return None;
            }
        }
    }

    Some(board)
}

fn parse_uci_move(board: &Board, move_str: &str, tables: &MagicTables) -> Option<Move> {
    if move_str.len() < 4 {
        return None;
    }

    let chars: Vec<char> = move_str.chars().collect();

    let from_file = (chars[0] as u8).wrapping_sub(b'a');
    let from_rank = (chars[1] as u8).wrapping_sub(b'1');
    let to_file = (chars[2] as u8).wrapping_sub(b'a');
    let to_rank = (chars[3] as u8).wrapping_sub(b'1');

    if from_file > 7 || from_rank > 7 || to_file > 7 || to_rank > 7 {
        return None;
    }

    let from_square = (from_rank * 8 + from_file) as usize;
    let to_square = (to_rank * 8 + to_file) as usize;

    let promo_piece = if move_str.len() >= 5 {
        match chars[4] {
            'q' => Some(vantage::board::Piece::Queen),
            'r' => Some(vantage::board::Piece::Rook),
            'b' => Some(vantage::board::Piece::Bishop),
            'n' => Some(vantage::board::Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mut moves = Vec::with_capacity(256);
    let mut scratch = Vec::with_capacity(256);
    let mut board_copy = board.clone();
    generate_legal(&mut board_copy, tables, &mut moves, &mut scratch);

    for mv in moves {
        // FIXED: Cast index() to usize for comparison
        if (mv.from.index() as usize) == from_square && (mv.to.index() as usize) == to_square {
            if promo_piece.is_some() {
                if mv.promotion == promo_piece {
                    return Some(mv);
                }
            } else if mv.promotion.is_none() {
                return Some(mv);
            }
        }
    }
    None
}

fn handle_go(
    parts: &[&str],
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    book: &Option<PolyglotBook>,
    options: &EngineOptions,
) {
    // --- STEP A: Check Opening Book First ---
    // If enabled, and the book suggests a move for this position, play it
    // immediately rather than searching.
    if options.use_own_book
        && let Some(b) = book
        && let Some(book_move) = b.probe(board)
    {
        println!("info string Book move found");
        println!("bestmove {}", book_move.to_uci());
        return;
    }
    // ----------------------------------------
    let mut depth = 64;
    let mut time = vantage::search::search::TimeControl::default();
    let mut search_moves: Vec<String> = Vec::new();
    let mut in_searchmoves = false;

    let mut i = 1;
    while i < parts.len() {
        match parts[i] {
            "depth" => {
                in_searchmoves = false;
                if i + 1 < parts.len() {
                    depth = parts[i + 1].parse().unwrap_or(64);
                }
                i += 2;
            }
            "movetime" => {
                in_searchmoves = false;
                if i + 1 < parts.len() {
                    time.movetime = parts[i + 1].parse().ok().map(Duration::from_millis);
                }
                i += 2;
            }
            "wtime" => {
                in_searchmoves = false;
                if i + 1 < parts.len() {
                    time.wtime = parts[i + 1].parse().ok().map(Duration::from_millis);
                }
                i += 2;
            }
            "btime" => {
                in_searchmoves = false;
                if i + 1 < parts.len() {
                    time.btime = parts[i + 1].parse().ok().map(Duration::from_millis);
                }
                i += 2;
            }
            "winc" => {
                in_searchmoves = false;
                if i + 1 < parts.len() {
                    time.winc = parts[i + 1].parse().ok().map(Duration::from_millis).unwrap_or_default();
                }
                i += 2;
            }
            "binc" => {
                in_searchmoves = false;
                if i + 1 < parts.len() {
                    time.binc = parts[i + 1].parse().ok().map(Duration::from_millis).unwrap_or_default();
                }
                i += 2;
            }
            "movestogo" => {
                in_searchmoves = false;
                if i + 1 < parts.len() {
                    time.movestogo = parts[i + 1].parse().ok();
                }
                i += 2;
            }
            "infinite" => {
                in_searchmoves = false;
                depth = 100;
                time.infinite = true;
                i += 1;
            }
            "searchmoves" => {
                in_searchmoves = true;
                i += 1;
            }
            _ => {
                if in_searchmoves {
                    search_moves.push(parts[i].to_string());
                }
                i += 1;
            }
        }
    }

    let move_filter = if search_moves.is_empty() {
        None
    } else {
        let filtered: Vec<Move> = search_moves
            .iter()
            .filter_map(|s| parse_uci_move(board, s, tables))
            .collect();
        if filtered.is_empty() { None } else { Some(filtered) }
    };

    if let Some(budget) = time.budget(board.side_to_move) {
        println!("info string Target time: {}ms", budget.as_millis());
    }

    let settings = vantage::search::search::SearchSettings {
        max_depth: depth,
        multi_pv: options.multi_pv,
        time,
        move_filter,
    };

    let results = vantage::search::search::search_with_settings(board, tables, tt, &settings, |r| {
        for (idx, variation) in r.variations.iter().enumerate() {
            let score_str = if variation.score.abs() >= 30000 {
                let moves = (31000 - variation.score.abs() + 1) / 2;
                if variation.score > 0 {
                    format!("mate {}", moves)
                } else {
                    format!("mate -{}", moves)
                }
            } else {
                format!("cp {}", variation.score)
            };
            let pv: Vec<String> = variation.moves.iter().map(|m| m.to_uci()).collect();
            println!(
                "info depth {} multipv {} score {} nodes {} time {} pv {}",
                r.depth,
                idx + 1,
                score_str,
                r.nodes,
                r.time.as_millis(),
                pv.join(" ")
            );
        }
    });

    match results.best_move() {
        Some(m) => println!("bestmove {}", m.to_uci()),
        None => println!("bestmove 0000"),
    }
}

// --- EPD Test Runner ---
fn run_epd_tests(path: &str, tables: &MagicTables) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => match File::open(format!("bench_arena/{}", path.split('/').last().unwrap())) {
            Ok(f) => f,
            Err(_) => {
                println!("Error: Could not find EPD file at '{}' or local.", path);
                return;
            }
        },
    };

    println!("Running Tactical Tests from {} (1s per position)...", path);
    println!("----------------------------------------------------");

    let lines: Vec<String> = BufReader::new(file)
        .lines()
        .map(|l| l.unwrap_or_default())
        .collect();

    #[cfg(feature = "cli")]
    let progress = indicatif::ProgressBar::new(lines.len() as u64);
    #[cfg(feature = "cli")]
    progress.set_style(
        indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} positions")
            .unwrap_or(indicatif::ProgressStyle::default_bar()),
    );

    let mut solved = 0;
    let mut total = 0;

    for (line_idx, line) in lines.iter().enumerate() {
        #[cfg(feature = "cli")]
        progress.inc(1);
        if line.trim().is_empty() {
            continue;
        }

        if let Some(bm_idx) = line.find(" bm ") {
            let fen = &line[..bm_idx].trim();
            let rest = &line[bm_idx + 4..];
            let move_end = rest.find(';').unwrap_or(rest.len());
            let san_move = rest[..move_end].trim();

            let mut board = match Board::from_str(fen) {
                Ok(b) => b,
                Err(_) => {
                    println!("Error parsing FEN on line {}", line_idx + 1);
                    continue;
                }
            };

            let expected_uci = san_to_uci(&mut board, san_move, tables);

            // Fixed 1.0s search for testing
            let time_limit = Some(Duration::from_millis(1000));
            let depth = 64;

            let (_score, best_move) = search(&mut board, tables, depth, time_limit);

            let result_str = match best_move {
                Some(m) => m.to_uci(),
                None => "none".to_string(),
            };

            let passed = if let Some(ref exp) = expected_uci {
                *exp == result_str
            } else {
                false
            };

            if passed {
                solved += 1;
            }
            total += 1;

            println!("Test #{}: {}", total, if passed { "PASS" } else { "FAIL" });
            if !passed {
                println!(
                    "   Expected: {} | Got: {}",
                    expected_uci.unwrap_or(san_move.to_string()),
                    result_str
                );
            }
        }
    }

    #[cfg(feature = "cli")]
    progress.finish_and_clear();

    println!("----------------------------------------------------");
    println!("Result: {}/{} Solved", solved, total);
}

// --- Helper: Convert SAN to UCI ---
fn san_to_uci(board: &mut Board, san: &str, tables: &MagicTables) -> Option<String> {
    let mut moves = Vec::with_capacity(256);
    let mut scratch = Vec::with_capacity(256);
    generate_legal(board, tables, &mut moves, &mut scratch);

    let clean_san = san.replace("+", "").replace("#", "").replace("x", "");

    // Handle Castling
    if clean_san == "O-O" {
        return moves
            .iter()
            .find(|m| {
                let from = m.from.index() as i8;
                let to = m.to.index() as i8;
                (to - from).abs() == 2 && to > from
            })
            .map(|m| m.to_uci());
    }
    if clean_san == "O-O-O" {
        return moves
            .iter()
            .find(|m| {
                let from = m.from.index() as i8;
                let to = m.to.index() as i8;
                (to - from).abs() == 2 && to < from
            })
            .map(|m| m.to_uci());
    }

    if clean_san.len() < 2 {
        return None;
    }
    let target_str = &clean_san[clean_san.len() - 2..];

    let file = (target_str.chars().nth(0)? as u8).wrapping_sub(b'a');
    let rank = (target_str.chars().nth(1)? as u8).wrapping_sub(b'1');
    if file > 7 || rank > 7 {
        return None;
    }
    let target_sq = (rank * 8 + file) as usize;

    let first_char = clean_san.chars().next()?;
    let piece_type = match first_char {
        'N' => Piece::Knight,
        'B' => Piece::Bishop,
        'R' => Piece::Rook,
        'Q' => Piece::Queen,
        'K' => Piece::King,
        _ => Piece::Pawn,
    };

    let disambig_char = if piece_type == Piece::Pawn {
        if clean_san.len() > 2 && first_char.is_lowercase() {
            Some(first_char)
        } else {
            None
        }
    } else {
        let content = &clean_san[1..clean_san.len() - 2];
        if !content.is_empty() {
            content.chars().next()
        } else {
            None
        }
    };

    let candidates: Vec<&Move> = moves
        .iter()
        .filter(|m| {
            // FIXED: Cast index() to usize
            if (m.to.index() as usize) != target_sq {
                return false;
            }

            if let Some((_, p)) = board.piece_at(m.from) {
                if p != piece_type {
                    return false;
                }
            } else {
                return false;
            }

            if let Some(d) = disambig_char {
                let from_sq = m.from.index();
                let from_file = from_sq % 8;
                let from_rank = from_sq / 8;

                if d >= 'a' && d <= 'h' {
                    if from_file != (d as u8 - b'a') {
                        return false;
                    }
                } else if d >= '1' && d <= '8' {
                    if from_rank != (d as u8 - b'1') {
                        return false;
                    }
                }
            }
            true
        })
        .collect();

    if !candidates.is_empty() {
        Some(candidates[0].to_uci())
    } else {
        None
    }
}
