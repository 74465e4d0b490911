//! Chess rules behind the engine's [`Position`] contract.
//!
//! Move generation, legality and make-move come from `shakmaty`. Unmake is
//! a pop from a stack of earlier states, and the stack doubles as the key
//! history used for repetition detection.

use quiver_engine::{Color, GenKind, Move, MoveList, PieceKind, Position, Square};
use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Bitboard, CastlingMode, Chess, EnPassantMode, Position as _, Role};
use tracing::warn;

use crate::error::BoardError;
use crate::see;

pub(crate) fn kind_of(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

fn role_of(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

pub(crate) fn color_of(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

pub(crate) fn board_color(color: Color) -> shakmaty::Color {
    match color {
        Color::White => shakmaty::Color::White,
        Color::Black => shakmaty::Color::Black,
    }
}

pub(crate) fn board_square(sq: Square) -> shakmaty::Square {
    shakmaty::Square::new(sq.index() as u32)
}

fn engine_square(sq: shakmaty::Square) -> Square {
    let index = u32::from(sq) as u8;
    Square::from_coords(index % 8, index / 8)
}

/// Engine encoding of a board move. Castling becomes the king's two-square step.
fn engine_move(m: &shakmaty::Move) -> Move {
    match *m {
        shakmaty::Move::Normal { from, to, promotion, .. } => match promotion {
            Some(role) => Move::new_promotion(engine_square(from), engine_square(to), kind_of(role)),
            None => Move::new(engine_square(from), engine_square(to)),
        },
        shakmaty::Move::EnPassant { from, to } => Move::new(engine_square(from), engine_square(to)),
        shakmaty::Move::Castle { king, rook } => {
            let king = engine_square(king);
            let rook = engine_square(rook);
            let file = if rook.file() > king.file() { 6 } else { 2 };
            Move::new(king, Square::from_coords(file, king.rank()))
        }
        shakmaty::Move::Put { .. } => Move::NULL,
    }
}

/// Mixes a square/color index into a pseudo-random 64-bit word.
const fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// One entry of the game/search history.
#[derive(Debug, Clone)]
struct State {
    chess: Chess,
    key: u64,
    /// Earlier states this one could repeat; reset by pawn moves, captures
    /// and null moves.
    reversible: usize,
}

impl State {
    fn new(chess: Chess, reversible: usize) -> Self {
        let key = chess.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0;
        Self { chess, key, reversible }
    }
}

/// A chess game position with its history.
#[derive(Debug, Clone)]
pub struct ChessPosition {
    current: State,
    history: Vec<State>,
}

impl ChessPosition {
    /// The standard starting position.
    pub fn startpos() -> Self {
        Self::from_chess(Chess::default())
    }

    /// Set up a position from FEN.
    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        let parsed = fen.trim().parse::<Fen>().map_err(|e| BoardError::InvalidFen {
            fen: fen.to_owned(),
            reason: e.to_string(),
        })?;
        let chess: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| BoardError::IllegalPosition {
                fen: fen.to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_chess(chess))
    }

    fn from_chess(chess: Chess) -> Self {
        Self {
            current: State::new(chess, 0),
            history: Vec::new(),
        }
    }

    /// Play a game move given in UCI notation, keeping it in the history.
    pub fn play_uci(&mut self, uci: &str) -> Result<(), BoardError> {
        let invalid = || BoardError::InvalidMove { uci: uci.to_owned() };
        let mv = Move::from_uci(uci).ok_or_else(invalid)?;
        if !self.legal_moves().contains(mv) {
            return Err(invalid());
        }
        self.make_move(mv);
        Ok(())
    }

    /// Every legal move in the current position.
    pub fn legal_moves(&self) -> MoveList {
        let mut list = MoveList::new();
        for m in &self.current.chess.legal_moves() {
            list.push(engine_move(m));
        }
        list
    }

    /// The underlying rules state.
    pub fn chess(&self) -> &Chess {
        &self.current.chess
    }

    /// Plies played since the position was set up, null moves included.
    pub fn game_ply(&self) -> usize {
        self.history.len()
    }

    /// Translate an engine move into a board move, if it describes a move
    /// of a piece belonging to the side to move.
    pub(crate) fn board_move(&self, mv: Move) -> Option<shakmaty::Move> {
        if mv.is_null() {
            return None;
        }
        let chess = &self.current.chess;
        let board = chess.board();
        let from = board_square(mv.from());
        let to = board_square(mv.to());
        if !board.by_color(chess.turn()).contains(from) {
            return None;
        }
        let role = board.role_at(from)?;
        let file_step = mv.to().file().abs_diff(mv.from().file());

        if role == Role::King && file_step == 2 && mv.to().rank() == mv.from().rank() {
            let rook_file = if mv.to().file() > mv.from().file() { 7 } else { 0 };
            let rook = board_square(Square::from_coords(rook_file, mv.from().rank()));
            return Some(shakmaty::Move::Castle { king: from, rook });
        }
        if role == Role::Pawn && file_step == 1 && !board.occupied().contains(to) {
            return Some(shakmaty::Move::EnPassant { from, to });
        }
        Some(shakmaty::Move::Normal {
            role,
            from,
            capture: board.role_at(to),
            to,
            promotion: mv.promotion().map(role_of),
        })
    }

    fn push(&mut self, next: State) {
        let prev = std::mem::replace(&mut self.current, next);
        self.history.push(prev);
    }

    fn pop(&mut self) {
        if let Some(prev) = self.history.pop() {
            self.current = prev;
        }
    }

    fn is_repetition(&self) -> bool {
        let window = self.current.reversible.min(self.history.len());
        self.history
            .iter()
            .rev()
            .take(window)
            .skip(1)
            .step_by(2)
            .any(|s| s.key == self.current.key)
    }
}

impl Default for ChessPosition {
    fn default() -> Self {
        Self::startpos()
    }
}

impl Position for ChessPosition {
    fn side_to_move(&self) -> Color {
        color_of(self.current.chess.turn())
    }

    fn in_check(&self) -> bool {
        self.current.chess.is_check()
    }

    fn key(&self) -> u64 {
        self.current.key
    }

    fn pawn_key(&self) -> u64 {
        let board = self.current.chess.board();
        let pawns = board.by_role(Role::Pawn);
        let mut key = 0;
        for sq in pawns & board.by_color(shakmaty::Color::White) {
            key ^= splitmix(u64::from(u32::from(sq)));
        }
        for sq in pawns & board.by_color(shakmaty::Color::Black) {
            key ^= splitmix(64 + u64::from(u32::from(sq)));
        }
        key
    }

    fn make_move(&mut self, mv: Move) {
        let mut chess = self.current.chess.clone();
        match self.board_move(mv) {
            Some(m) => chess.play_unchecked(&m),
            None => warn!(%mv, "make_move called with a move that does not fit the board"),
        }
        let reversible = (chess.halfmoves() as usize).min(self.current.reversible + 1);
        self.push(State::new(chess, reversible));
    }

    fn unmake_move(&mut self, _: Move) {
        self.pop();
    }

    fn make_null(&mut self) {
        let chess = match self.current.chess.clone().swap_turn() {
            Ok(chess) => chess,
            Err(e) => {
                warn!(error = %e, "null move rejected by the board");
                self.current.chess.clone()
            }
        };
        self.push(State::new(chess, 0));
    }

    fn unmake_null(&mut self) {
        self.pop();
    }

    fn is_legal(&self, mv: Move) -> bool {
        self.board_move(mv).is_some_and(|m| self.current.chess.is_legal(&m))
    }

    fn gives_check(&self, mv: Move) -> bool {
        self.board_move(mv).is_some_and(|m| {
            let mut next = self.current.chess.clone();
            next.play_unchecked(&m);
            next.is_check()
        })
    }

    fn see(&self, mv: Move, threshold: i32) -> bool {
        match self.board_move(mv) {
            Some(m) => see::see(&self.current.chess, &m) >= threshold,
            None => threshold <= 0,
        }
    }

    fn is_draw(&self) -> bool {
        let chess = &self.current.chess;
        if chess.halfmoves() >= 100 && !chess.is_checkmate() {
            return true;
        }
        chess.is_insufficient_material() || self.is_repetition()
    }

    fn non_pawn_material(&self, side: Color) -> bool {
        let board = self.current.chess.board();
        let pawns_and_kings = board.by_role(Role::Pawn) | board.by_role(Role::King);
        let pieces: Bitboard = board.by_color(board_color(side)) & !pawns_and_kings;
        pieces.any()
    }

    fn generate(&self, kind: GenKind, list: &mut MoveList) {
        let chess = &self.current.chess;
        if kind != GenKind::Tactical || chess.is_check() {
            for m in &chess.legal_moves() {
                list.push(engine_move(m));
            }
            return;
        }
        for m in &chess.capture_moves() {
            list.push(engine_move(m));
        }
        for m in chess.promotion_moves().iter().filter(|m| !m.is_capture()) {
            list.push(engine_move(m));
        }
    }

    fn moved_piece(&self, mv: Move) -> Option<PieceKind> {
        self.current.chess.board().role_at(board_square(mv.from())).map(kind_of)
    }

    fn captured_piece(&self, mv: Move) -> Option<PieceKind> {
        let chess = &self.current.chess;
        let board = chess.board();
        let to = board_square(mv.to());
        if let Some(piece) = board.piece_at(to) {
            return (piece.color != chess.turn()).then(|| kind_of(piece.role));
        }
        let is_pawn = board.role_at(board_square(mv.from())) == Some(Role::Pawn);
        (is_pawn && mv.from().file() != mv.to().file()).then_some(PieceKind::Pawn)
    }
}
