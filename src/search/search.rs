use crate::board::{Board, Color};
use crate::moves::execute::{
    generate_legal, make_move_basic, make_null_move, undo_move_basic, undo_null_move,
};
use crate::moves::magic::MagicTables;
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::eval::{Evaluator, HceEvaluator, static_eval};
use crate::search::picker::MovePicker;
use crate::search::see::SeeExt;
use crate::search::tt::{NodeType, TranspositionTable};
use arrayvec::ArrayVec;
use std::time::{Duration, Instant};

const INF: i32 = 32000;
const MATE_SCORE: i32 = 31000;
const MATE_THRESHOLD: i32 = MATE_SCORE - 1000; // 30000 - buffer for mate distance
const MAX_Q_SEARCH_DEPTH: usize = 100;

// --- Tuning Constants ---

// Reverse Futility Pruning (RFP)
const RFP_DEPTH_LIMIT: i32 = 9;
const RFP_MARGIN_BASE: i32 = 80;
const RFP_MARGIN_MULT: i32 = 90;

// Futility Pruning (FP)
const FP_DEPTH_LIMIT: i32 = 7;
const FP_MARGIN_BASE: i32 = 100;
const FP_MARGIN_MULT: i32 = 100;
const FP_HISTORY_THRESHOLD: i32 = 512;

// Late Move Pruning (LMP)
const LMP_DEPTH_LIMIT: i32 = 14;
const LMP_BASE_MOVES: i32 = 3;
const LMP_MOVE_MULTIPLIER: i32 = 6;

// Late Move Reduction (LMR)
const LMR_MIN_DEPTH: i32 = 2;
const LMR_MIN_MOVES: i32 = 4;
// const LMR_BASE: f64 = 0.75;
// const LMR_DIVISOR: f64 = 2.5;

// --- TT Score Adjustment Helpers ---
fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score + ply
    } else if score <= -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score >= MATE_THRESHOLD {
        score - ply
    } else if score <= -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}
// -----------------------------------

pub struct TimeManager {
    pub start_time: Instant,
    pub allotted: Option<Duration>,
    pub stop_signal: bool,
}

impl TimeManager {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            allotted: limit,
            stop_signal: false,
        }
    }

    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }

        if let Some(limit) = self.allotted {
            let elapsed = self.start_time.elapsed();

            // Hard Stop: Abort immediately if we hit the limit
            if elapsed >= limit {
                self.stop_signal = true;
            }
        }
    }

    /// Returns the allocated time limit
    #[inline(always)]
    pub fn allocated_time(&self) -> Option<Duration> {
        self.allotted
    }

    /// Returns elapsed time since search started
    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
pub fn quiescence(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> i32 {
    // SAFETY BRAKE: Prevent Q-search explosions
    if ply > MAX_Q_SEARCH_DEPTH {
        return static_eval(board, tables, alpha, beta);
    }

    let stand_pat = static_eval(board, tables, alpha, beta);

    if stand_pat >= beta {
        return beta;
    }
    if stand_pat >= alpha {
        alpha = stand_pat;
    }

    // Use MovePicker in captures-only mode for quiescence
    let empty_killers = [None, None];
    let empty_history = [[0i32; 64]; 64];
    let mut picker = MovePicker::new(None, empty_killers, true);

    while let Some(mv) = picker.next(board, tables, &empty_history) {
        *nodes += 1;
        if *nodes & 63 == 0 {
            time.check_time();
        }
        if time.stop_signal {
            return stand_pat;
        }

        let mut captured_value = 0;
        if let Some(piece) = board.piece_type_at(mv.to) {
            captured_value = piece.value();
        }

        // DELTA PRUNING SAFETY
        // Don't prune if it's a promotion (potentially huge value)
        // Don't prune if it's En Passant (captured_value is 0, but it captures a pawn)
        let is_prom = mv.is_promotion();
        let is_ep = mv.is_en_passant();

        // "Blindness" Fix: Only prune standard captures.
        if !is_prom && !is_ep && stand_pat + captured_value + 200 < alpha {
            continue;
        }

        // SEE Pruning: Skip captures that lose material
        // Note: MovePicker already filters bad captures for us, but we keep this
        // for promotions and en passant which bypass SEE classification
        if !is_prom && !is_ep && !board.static_exchange_eval(mv, 0, tables) {
            continue;
        }

        let undo = make_move_basic(board, mv);
        let score = -quiescence(board, tables, ctx, tt, ply + 1, -beta, -alpha, nodes, time);
        undo_move_basic(board, undo);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }
    alpha
}

#[allow(clippy::too_many_arguments, clippy::only_used_in_recursion)]
#[allow(clippy::too_many_arguments)]
pub fn alpha_beta(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    nodes: &mut u64,
    time: &mut TimeManager,
    prev_move: Option<Move>,
) -> (i32, Option<Move>) {
    // Check every 1024 nodes instead of 2047 for tighter control
    if *nodes & 63 == 0 {
        time.check_time();
    }

    if time.stop_signal {
        return (0, None);
    }
    *nodes += 1;

    // 2. Repetition & TT Probing (Standard)
    if ply > 0 && board.is_repetition() {
        return (HceEvaluator.draw_score(board), None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let hash = board.zobrist;
    let mut hash_move = None;
    let mut tt_static_eval = None;

    // TT PROBE WITH MATE SCORE ADJUSTMENT
    if let Some((tt_move, raw_score, raw_static_eval, tt_depth, tt_bound)) =
        tt.probe(hash, depth as u8, alpha, beta, ply as i32)
    {
        if let Some(tm) = tt_move {
            hash_move = Some(tm);
        }
        tt_static_eval = Some(raw_static_eval);

        if tt_depth >= depth as u8 {
            // Convert the stored independent score back to relative score
            let tt_score = score_from_tt(raw_score, ply as i32);

            if ply > 0 {
                match tt_bound {
                    0 => return (tt_score, tt_move),
                    1 if tt_score >= beta => return (tt_score, tt_move),
                    2 if tt_score <= alpha => return (tt_score, tt_move),
                    _ => {}
                }
            }
        }
    }

    let in_check_now = board.attack_info.is_check();

    // FIX 6: CHECK EXTENSION
    // If we are in check, extend the search by 1 ply.
    // This resolves forced mates and prevents the horizon effect.
    let extension = if in_check_now { 1 } else { 0 };

    if depth <= 0 && !in_check_now {
        let score = quiescence(board, tables, ctx, tt, ply, alpha, beta, nodes, time);
        return (score, None);
    }

    // [STEP 1] Calculate Eval Early
    // We lift this out so both RFP and SFP can share it. Reuse the TT's
    // stored static eval when this node was probed, rather than
    // recomputing it from scratch.
    let static_eval_val = if !in_check_now {
        tt_static_eval.unwrap_or_else(|| static_eval(board, tables, alpha, beta))
    } else {
        0 // Dummy value, we won't use it if in check
    };

    // [STEP 2] Update Reverse Futility Pruning (RFP) to use the variable
    if depth < RFP_DEPTH_LIMIT && !in_check_now && ply > 0 {
        let margin = RFP_MARGIN_BASE + RFP_MARGIN_MULT * depth;
        if static_eval_val - margin >= beta {
            return (beta, None);
        }
    }
    // =============================================================

    // =============================================================
    // 1. NULL MOVE PRUNING (Tuned)
    // =============================================================
    if depth >= 4
        && !in_check_now
        // REMOVED: && (beta - alpha == 1) <--- Unlocks NMP for PV nodes (Massive speedup)
        && board.has_major_pieces(board.side_to_move)
        && static_eval_val >= beta
    // Only null move if we are already winning statically
    {
        // Dynamic Reduction: If deep, reduce more.
        let r = if depth > 6 { 3 } else { 2 };

        let undo = make_null_move(board);

        // Scout search with Null Window
        let (val, _) = alpha_beta(
            board,
            tables,
            ctx,
            tt,
            depth - r - 1,
            ply + 1,
            -beta,
            -beta + 1,
            nodes,
            time,
            None,
        );
        let score = -val;
        undo_null_move(board, undo);

        if score >= beta && !time.stop_signal {
            // Verification search for high depths (Optional safety)
            if score >= MATE_THRESHOLD {
                // Don't trust null move mates, search normally
            } else {
                return (beta, None);
            }
        }
    }

    // Use MovePicker for staged move generation
    let counter_move = ctx.counter_move(prev_move);
    let mut picker = MovePicker::with_counter(hash_move, ctx.killer_moves[ply], counter_move, false);

    let mut best_move = None;
    let mut best_score = -INF;
    let original_alpha = alpha;
    let mut move_count = 0;

    while let Some(mv) = picker.next(board, tables, &ctx.history) {
        // [STEP 3] OPTIMIZED FUTILITY PRUNING
        // Logic: If the move is quiet and our position is hopelessly below Alpha, skip it.
        if depth < FP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && move_count > 0
        {
            let margin = FP_MARGIN_BASE + FP_MARGIN_MULT * depth;

            // HISTORY PROTECTION (The Optimization):
            // We retrieve the history score for this move.
            let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];

            // If the move has a high history score (> 2000), it has been good in other nodes.
            // We should NOT prune it, even if static eval says it's bad.
            if history < FP_HISTORY_THRESHOLD && static_eval_val + margin <= alpha {
                continue; // PRUNE: Skip to next move
            }
        }

        // =========================================================
        // LATE MOVE PRUNING (LMP)
        // =========================================================
        // Logic: If we have searched many quiet moves and haven't found a
        // good one yet, it's highly unlikely the remaining (unsorted) moves
        // will be any better. Just cut them off.
        if depth < LMP_DEPTH_LIMIT
            && !in_check_now
            && !mv.is_capture()
            && !mv.is_promotion()
            && alpha == original_alpha
        {
            let lmp_threshold = LMP_BASE_MOVES + LMP_MOVE_MULTIPLIER * depth;
            if move_count > lmp_threshold as usize {
                break;
            }
        }
        // =========================================================

        let undo = make_move_basic(board, mv);
        let mut score;

        if move_count == 0 {
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 + extension,
                ply + 1,
                -beta,
                -alpha,
                nodes,
                time,
                Some(mv),
            );
            score = -val;
        } else {
            // =========================================================
            // 2. LATE MOVE REDUCTION (Tuned: Soft Formula)
            // =========================================================
            let mut r = 0;
            if depth > LMR_MIN_DEPTH
                && move_count > LMR_MIN_MOVES as usize
                && !mv.is_capture()
                && !mv.is_promotion()
                && !in_check_now
            // Don't reduce if we are escaping check!
            {
                // OLD (Suicidal): 1 + (depth / 3) + (move_count / 10)

                // NEW (Standard):
                // 1. Base reduction
                r = 1 + (depth / 8) + (move_count as i32 / 20);

                // 2. History Safety (Keep this, it's good)
                let history = ctx.history[mv.from.index() as usize][mv.to.index() as usize];
                if history > FP_HISTORY_THRESHOLD {
                    r -= 1; // Trust history
                }

                // 3. PV Node Safety
                // If we are in a PV node (open window), reduce less
                if beta - alpha > 1 {
                    r -= 1;
                }

                // Clamp
                if r < 0 {
                    r = 0;
                }
                if r > depth - 2 {
                    r = depth - 2;
                } // Leave at least depth 1
            }

            // Perform the Reduced Search (Zero Window)
            let (val, _) = alpha_beta(
                board,
                tables,
                ctx,
                tt,
                depth - 1 - r,
                ply + 1,
                -alpha - 1,
                -alpha,
                nodes,
                time,
                Some(mv),
            );
            score = -val;

            // Re-search if the reduced search found a surprisingly good move
            if score > alpha && r > 0 {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    nodes,
                    time,
                    Some(mv),
                );
                score = -val;
            }

            if score > alpha && score < beta {
                let (val, _) = alpha_beta(
                    board,
                    tables,
                    ctx,
                    tt,
                    depth - 1 + extension,
                    ply + 1,
                    -beta,
                    -alpha,
                    nodes,
                    time,
                    Some(mv),
                );
                score = -val;
            }
        }

        undo_move_basic(board, undo);
        move_count += 1;

        if time.stop_signal {
            return (0, None);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                alpha = score;
                best_move = Some(mv);
            }
            if score >= beta {
                // TT SAVE WITH MATE SCORE ADJUSTMENT (LowerBound/Beta Cutoff)
                let tt_score = score_to_tt(beta, ply as i32);
                tt.save(
                    hash,
                    Some(mv),
                    tt_score,
                    static_eval_val,
                    depth as u8,
                    NodeType::LowerBound as u8,
                    ply as i32,
                );

                if !mv.is_capture() {
                    ctx.update_killer(ply, mv);
                    ctx.update_counter(prev_move, mv);

                    let bonus = depth * depth;
                    ctx.update_history(mv, bonus);
                }

                return (beta, Some(mv));
            }
        }
    }

    // No legal moves found - checkmate or stalemate
    if move_count == 0 {
        if in_check_now {
            return (-MATE_SCORE + ply as i32, None);
        }
        return (0, None);
    }

    if time.stop_signal {
        return (0, None);
    }

    let node_type = if best_score >= beta {
        NodeType::LowerBound
    } else if best_score > original_alpha {
        NodeType::Exact
    } else {
        NodeType::UpperBound
    };

    // TT SAVE WITH MATE SCORE ADJUSTMENT (Best Score)
    // We save 'best_score' (which is alpha if exact, or the best failed low score if UpperBound)
    let tt_score = score_to_tt(best_score, ply as i32);
    tt.save(
        hash,
        best_move,
        tt_score,
        static_eval_val,
        depth as u8,
        node_type as u8,
        ply as i32,
    );

    (best_score, best_move)
}

pub fn search(
    board: &mut Board,
    tables: &MagicTables,
    max_depth: i32,
    time_limit: Option<Duration>,
) -> (i32, Option<Move>) {
    let mut evaluator = HceEvaluator;
    evaluator.on_set_position(board);

    let mut last_completed_best_move = None;
    let mut last_completed_best_score = 0;
    let mut nodes = 0;
    let mut tt = TranspositionTable::new(512);
    let mut ctx = SearchContext::new();
    let mut time = TimeManager::new(time_limit);
    let mut last_iter_duration = Duration::from_millis(0);

    for depth in 1..=max_depth {
        let iter_start = Instant::now();

        // --- ITERATIVE DEEPENING SAFETY CHECK ---
        // Predict if we can afford the next depth before starting it.
        // Conservative estimate: Next depth takes ~3x longer than previous.
        // (Using 3x instead of 2x because branching factor can spike in tactical positions)
        if depth > 1
            && let Some(limit) = time.allocated_time()
        {
            let total_elapsed = time.elapsed();
            let predicted_next = last_iter_duration * 3;

            // If predicting the next depth would push us over the limit: STOP.
            if total_elapsed + predicted_next > limit {
                break;
            }
        }
        // -----------------------------------------

        for from in 0..64 {
            for to in 0..64 {
                ctx.history[from][to] /= 8;
            }
        }

        // --- Aspiration Window Logic ---
        let mut alpha = -INF;
        let mut beta = INF;
        let window = 50; // Window size (50cp)

        // Only apply aspiration windows at depth > 4 for stability
        if depth > 4 {
            alpha = last_completed_best_score - window;
            beta = last_completed_best_score + window;
        }

        let mut score;
        let mut mv;

        loop {
            // Perform the search with the current window
            let result = alpha_beta(
                board, tables, &mut ctx, &mut tt, depth, 0, alpha, beta, &mut nodes, &mut time,
                None,
            );

            score = result.0;
            mv = result.1;

            // If we ran out of time during the search, stop immediately
            if time.stop_signal {
                break;
            }

            // 1. Fail Low (Score <= Alpha): Position is worse than expected.
            // Only widen alpha downwards. Keep beta unchanged for stability.
            if score <= alpha {
                alpha = -INF;
                continue;
            }

            // 2. Fail High (Score >= Beta): Position is better than expected.
            // Only widen beta upwards. Keep alpha unchanged for stability.
            if score >= beta {
                beta = INF;
                continue;
            }

            // 3. Success: Score is within the window.
            break;
        }
        // -------------------------------

        // Record duration for the NEXT prediction check
        last_iter_duration = iter_start.elapsed();

        // CRITICAL FIX: If the stop signal was triggered, DO NOT update the best move.
        // The search at this depth is incomplete and likely contains blunders.
        if time.stop_signal {
            break;
        }

        // Only update if the depth actually finished
        last_completed_best_score = score;
        last_completed_best_move = mv;

        // Output info for GUI (standard UCI)
        if let Some(valid_mv) = last_completed_best_move {
            let score_str = if last_completed_best_score.abs() >= MATE_THRESHOLD {
                let moves = (MATE_SCORE - last_completed_best_score.abs() + 1) / 2;
                if last_completed_best_score > 0 {
                    format!("mate {}", moves)
                } else {
                    format!("mate -{}", moves)
                }
            } else {
                format!("cp {}", last_completed_best_score)
            };

            println!(
                "info depth {} score {} nodes {} time {} pv {}",
                depth,
                score_str,
                nodes,
                time.start_time.elapsed().as_millis(),
                valid_mv.to_uci()
            );
        }

        // Optimization: If we found a mate, stop searching deeper
        if score.abs() >= MATE_THRESHOLD {
            break;
        }
    }

    (last_completed_best_score, last_completed_best_move)
}

// ============================================================================
// Top-level contract: settings in, multi-PV results out.
// ============================================================================

/// Per-side time control, mirroring the UCI `go` parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeControl {
    pub movetime: Option<Duration>,
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Duration,
    pub binc: Duration,
    pub movestogo: Option<u32>,
    pub infinite: bool,
}

impl TimeControl {
    /// A flat per-move budget (`movetime`/`infinite`), independent of side to move.
    pub fn fixed(movetime: Option<Duration>) -> Self {
        Self {
            movetime,
            infinite: movetime.is_none(),
            ..Default::default()
        }
    }

    /// Derive a hard time budget for `side`, or `None` to search until `max_depth`
    /// (or `stop`) under `infinite`/untimed play.
    pub fn budget(&self, side: Color) -> Option<Duration> {
        if self.infinite {
            return None;
        }
        if let Some(mt) = self.movetime {
            return Some(mt);
        }
        let (time, inc) = match side {
            Color::White => (self.wtime, self.winc),
            Color::Black => (self.btime, self.binc),
        };
        let t = time?;

        // Reserve a safety margin (~15%, capped) for GUI/OS overhead.
        let safety = (t / 7).min(Duration::from_millis(500));
        let usable = t.saturating_sub(safety);

        let alloc = if let Some(mtg) = self.movestogo {
            let plan = mtg.max(2);
            usable / plan + (inc * 3) / 4
        } else if usable > Duration::from_secs(5) {
            usable / 40 + (inc * 9) / 10
        } else if usable > Duration::from_secs(2) {
            usable / 30 + (inc * 3) / 4
        } else if usable > Duration::from_millis(500) {
            usable / 20 + inc / 2
        } else {
            inc / 2 + Duration::from_millis(20)
        };

        let hard_cap = usable / 5;
        Some(alloc.min(hard_cap).min(usable))
    }
}

/// Search configuration for `search_with_settings`.
pub struct SearchSettings {
    pub max_depth: i32,
    /// Number of principal variations to report, per the UCI `MultiPV` option.
    pub multi_pv: usize,
    pub time: TimeControl,
    /// `searchmoves` — restrict the root to this set if present.
    pub move_filter: Option<Vec<Move>>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_depth: 64,
            multi_pv: 1,
            time: TimeControl::default(),
            move_filter: None,
        }
    }
}

/// One reported line: the move sequence, its score, and how tight the window was.
#[derive(Clone, Debug)]
pub struct SearchedVariation {
    pub moves: Vec<Move>,
    pub score: i32,
    pub bound: NodeType,
}

/// Everything the UCI `info`/`bestmove` output needs for one completed depth.
#[derive(Clone, Debug)]
pub struct SearchResults {
    pub depth: i32,
    pub seldepth: i32,
    pub nodes: u64,
    pub time: Duration,
    /// Ordered best-first; `variations[0].moves[0]` is `bestmove`.
    pub variations: Vec<SearchedVariation>,
}

impl SearchResults {
    pub fn best_move(&self) -> Option<Move> {
        self.variations.first().and_then(|v| v.moves.first().copied())
    }
}

/// Re-walk the TT along `first` to recover the rest of a principal variation.
/// Stops on a TT miss, an illegal/stale hash move, or a repeated position
/// (guards against PV cycles through the TT).
fn collect_pv(board: &mut Board, tables: &MagicTables, tt: &TranspositionTable, first: Move, max_len: usize) -> Vec<Move> {
    let mut pv = Vec::with_capacity(max_len);
    let mut undos = Vec::with_capacity(max_len);
    let mut seen_keys: ArrayVec<u64, 128> = ArrayVec::new();
    let mut next = Some(first);

    while let Some(mv) = next {
        if pv.len() >= max_len || seen_keys.is_full() {
            break;
        }
        if !move_is_legal_now(board, tables, mv) {
            break;
        }
        seen_keys.push(board.zobrist);
        undos.push(make_move_basic(board, mv));
        pv.push(mv);

        next = if board.is_repetition() || seen_keys.contains(&board.zobrist) {
            None
        } else {
            tt.probe(board.zobrist, 0, -INF, INF, 0)
                .and_then(|(tt_move, _, _, _, _)| tt_move)
        };
    }

    for undo in undos.into_iter().rev() {
        undo_move_basic(board, undo);
    }
    pv
}

fn move_is_legal_now(board: &mut Board, tables: &MagicTables, mv: Move) -> bool {
    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, tables, &mut moves, &mut scratch);
    moves
        .iter()
        .any(|m| m.from == mv.from && m.to == mv.to && m.promotion == mv.promotion)
}

fn root_moves(board: &mut Board, tables: &MagicTables, filter: Option<&[Move]>) -> Vec<Move> {
    let mut moves: ArrayVec<Move, 256> = ArrayVec::new();
    let mut scratch: ArrayVec<Move, 256> = ArrayVec::new();
    generate_legal(board, tables, &mut moves, &mut scratch);
    let moves: Vec<Move> = moves.into_iter().collect();
    match filter {
        None => moves,
        Some(allowed) => moves
            .into_iter()
            .filter(|m| {
                allowed
                    .iter()
                    .any(|a| a.from == m.from && a.to == m.to && a.promotion == m.promotion)
            })
            .collect(),
    }
}

/// Search one root move's subtree at `depth`, honoring the same aspiration
/// strategy the single-PV loop uses, and report its PV / bound.
#[allow(clippy::too_many_arguments)]
fn search_root_move(
    board: &mut Board,
    tables: &MagicTables,
    ctx: &mut SearchContext,
    tt: &mut TranspositionTable,
    depth: i32,
    mv: Move,
    nodes: &mut u64,
    time: &mut TimeManager,
) -> SearchedVariation {
    let undo = make_move_basic(board, mv);
    let (child_score, _) = alpha_beta(
        board,
        tables,
        ctx,
        tt,
        depth - 1,
        1,
        -INF,
        INF,
        nodes,
        time,
        Some(mv),
    );
    undo_move_basic(board, undo);
    let score = -child_score;

    // `collect_pv` replays `mv` itself before following the TT, so it yields
    // the whole line (root move plus continuation) in one pass.
    let moves = collect_pv(board, tables, tt, mv, 64);

    SearchedVariation {
        moves,
        score,
        bound: NodeType::Exact,
    }
}

/// Iterative deepening with Multi-PV: for each depth, run the root search
/// `multi_pv` times, excluding the already-reported best moves from earlier
/// PV indices so each line is distinct.
pub fn search_with_settings(
    board: &mut Board,
    tables: &MagicTables,
    tt: &mut TranspositionTable,
    settings: &SearchSettings,
    mut on_depth_finish: impl FnMut(&SearchResults),
) -> SearchResults {
    tt.new_search();
    let mut evaluator = HceEvaluator;
    evaluator.on_set_position(board);
    let mut ctx = SearchContext::new();
    let budget = settings.time.budget(board.side_to_move);
    let mut time = TimeManager::new(budget);
    let mut nodes = 0u64;

    let multi_pv = settings.multi_pv.max(1);
    let start = Instant::now();
    let mut last_good = SearchResults {
        depth: 0,
        seldepth: 0,
        nodes: 0,
        time: Duration::from_millis(0),
        variations: Vec::new(),
    };

    'depths: for depth in 1..=settings.max_depth {
        let root = root_moves(board, tables, settings.move_filter.as_deref());
        if root.is_empty() {
            break;
        }

        let mut variations: Vec<SearchedVariation> = Vec::with_capacity(multi_pv);
        let mut excluded: Vec<Move> = Vec::with_capacity(multi_pv);

        for _pv_idx in 0..multi_pv.min(root.len()) {
            let mut best: Option<SearchedVariation> = None;

            for &mv in root
                .iter()
                .filter(|m| !excluded.iter().any(|e| e.from == m.from && e.to == m.to && e.promotion == m.promotion))
            {
                let variation = search_root_move(board, tables, &mut ctx, tt, depth, mv, &mut nodes, &mut time);
                if time.stop_signal {
                    break;
                }
                if best.as_ref().is_none_or(|b| variation.score > b.score) {
                    best = Some(variation);
                }
            }

            if time.stop_signal {
                break;
            }

            if let Some(v) = best {
                if let Some(first) = v.moves.first() {
                    excluded.push(*first);
                }
                variations.push(v);
            }
        }

        if time.stop_signal || variations.is_empty() {
            break 'depths;
        }

        let results = SearchResults {
            depth,
            seldepth: depth,
            nodes,
            time: start.elapsed(),
            variations,
        };
        on_depth_finish(&results);
        let found_mate = results
            .variations
            .first()
            .is_some_and(|v| v.score.abs() >= MATE_THRESHOLD);
        last_good = results;

        if found_mate {
            break;
        }
    }

    last_good
}
