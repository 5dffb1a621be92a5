use crate::moves::types::Move;

pub struct SearchContext {
    pub killer_moves: Vec<[Option<Move>; 2]>,
    pub history: [[i32; 64]; 64],
    /// Counter-move table: indexed by the *previous* move's (from, to), holds
    /// the quiet move that most recently refuted it with a beta cutoff.
    pub counters: Box<[[Option<Move>; 64]; 64]>,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchContext {
    pub fn new() -> Self {
        Self {
            killer_moves: vec![[None; 2]; 64],
            history: [[0; 64]; 64],
            counters: Box::new([[None; 64]; 64]),
        }
    }

    pub fn update_killer(&mut self, ply: usize, mv: Move) {
        if self.killer_moves[ply][0] != Some(mv) {
            self.killer_moves[ply][1] = self.killer_moves[ply][0];
            self.killer_moves[ply][0] = Some(mv);
        }
    }

    pub fn update_history(&mut self, mv: Move, depth: i32) {
        let bonus = (depth * depth).min(400);
        self.history[mv.from.index() as usize][mv.to.index() as usize] += bonus;
    }

    /// Record `mv` as the refutation of `prev_move`, as seen on a quiet beta cutoff.
    pub fn update_counter(&mut self, prev_move: Option<Move>, mv: Move) {
        if let Some(pm) = prev_move {
            self.counters[pm.from.index() as usize][pm.to.index() as usize] = Some(mv);
        }
    }

    /// The move on record as refuting `prev_move`, if any.
    pub fn counter_move(&self, prev_move: Option<Move>) -> Option<Move> {
        prev_move.and_then(|pm| self.counters[pm.from.index() as usize][pm.to.index() as usize])
    }
}
