use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::trace;
use thiserror::Error;

use crate::rules::{self, MovementRule};
use crate::{Move, Piece, PieceId, PieceType, Position, Team};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("position {0} is out of bounds")]
    OutOfBounds(Position),
    #[error("square {0} is already occupied")]
    Occupied(Position),
    #[error("square {0} holds an obstacle")]
    Obstacle(Position),
    #[error("no piece at {0}")]
    EmptySquare(Position),
    #[error("piece {0} is not on the board")]
    UnknownPiece(PieceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Occupied(PieceId),
    Obstacle,
}

/// Grid of cells plus an arena of the pieces standing on it. Cells refer
/// to pieces by id; the arena is the single owner of piece data.
#[derive(Debug, Clone)]
pub struct Board {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    pieces: BTreeMap<PieceId, Piece>,
    next_id: u32,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![Cell::Empty; (width * height) as usize],
            pieces: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// 8x8 board in the usual starting position.
    pub fn standard() -> Self {
        let mut board = Self::new(8, 8);
        board.setup_initial_position();
        board
    }

    fn setup_initial_position(&mut self) {
        let piece_order = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];

        for (file, &piece_type) in (0..8).zip(piece_order.iter()) {
            for (team, back, pawns) in [(Team::White, 0, 1), (Team::Black, 7, 6)] {
                // Squares are fresh and in bounds, placement cannot fail.
                let _ = self.place_piece(piece_type, team, Position::new(file, back));
                let _ = self.place_piece(PieceType::Pawn, team, Position::new(file, pawns));
            }
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_position_valid(&self, pos: Position) -> bool {
        pos.file >= 0 && pos.file < self.width && pos.rank >= 0 && pos.rank < self.height
    }

    fn index(&self, pos: Position) -> Result<usize, BoardError> {
        if self.is_position_valid(pos) {
            Ok((pos.rank * self.width + pos.file) as usize)
        } else {
            Err(BoardError::OutOfBounds(pos))
        }
    }

    /// Raw cell lookup; `None` for squares off the board.
    pub fn cell(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).ok().and_then(|i| self.cells.get(i))
    }

    pub fn get_piece_at(&self, pos: Position) -> Result<Option<&Piece>, BoardError> {
        let index = self.index(pos)?;
        Ok(match self.cells[index] {
            Cell::Occupied(id) => self.pieces.get(&id),
            _ => None,
        })
    }

    pub fn is_obstacle(&self, pos: Position) -> Result<bool, BoardError> {
        let index = self.index(pos)?;
        Ok(self.cells[index] == Cell::Obstacle)
    }

    /// True for an in-bounds square with neither a piece nor an obstacle.
    pub fn is_free(&self, pos: Position) -> bool {
        matches!(self.cell(pos), Some(Cell::Empty))
    }

    pub fn set_obstacle(&mut self, pos: Position, obstacle: bool) -> Result<(), BoardError> {
        let index = self.index(pos)?;
        match (self.cells[index], obstacle) {
            (Cell::Occupied(_), true) => Err(BoardError::Occupied(pos)),
            (Cell::Occupied(_), false) => Ok(()),
            (_, true) => {
                self.cells[index] = Cell::Obstacle;
                Ok(())
            }
            (_, false) => {
                self.cells[index] = Cell::Empty;
                Ok(())
            }
        }
    }

    /// Places a piece carrying the standard rules for its type.
    pub fn place_piece(
        &mut self,
        piece_type: PieceType,
        team: Team,
        pos: Position,
    ) -> Result<PieceId, BoardError> {
        self.place_piece_with_rules(piece_type, team, pos, rules::standard_rules(piece_type))
    }

    pub fn place_piece_with_rules(
        &mut self,
        piece_type: PieceType,
        team: Team,
        pos: Position,
        rules: Vec<Arc<MovementRule>>,
    ) -> Result<PieceId, BoardError> {
        let index = self.index(pos)?;
        match self.cells[index] {
            Cell::Occupied(_) => return Err(BoardError::Occupied(pos)),
            Cell::Obstacle => return Err(BoardError::Obstacle(pos)),
            Cell::Empty => {}
        }

        let id = PieceId(self.next_id);
        self.next_id += 1;

        let mut piece = Piece::new(id, piece_type, team, pos);
        for rule in rules {
            piece.add_rule(rule);
        }
        self.pieces.insert(id, piece);
        self.cells[index] = Cell::Occupied(id);
        trace!("placed {:?} {:?} {} at {}", team, piece_type, id, pos);
        Ok(id)
    }

    pub fn remove_piece(&mut self, pos: Position) -> Result<Option<Piece>, BoardError> {
        let index = self.index(pos)?;
        match self.cells[index] {
            Cell::Occupied(id) => {
                self.cells[index] = Cell::Empty;
                Ok(self.pieces.remove(&id))
            }
            _ => Ok(None),
        }
    }

    pub fn remove_piece_by_id(&mut self, id: PieceId) -> Option<Piece> {
        let piece = self.pieces.remove(&id)?;
        if let Ok(index) = self.index(piece.position) {
            self.cells[index] = Cell::Empty;
        }
        Some(piece)
    }

    /// Moves whatever stands on `from` to `to`, returning a captured enemy.
    /// Movement rules are not consulted here.
    pub fn move_piece(&mut self, from: Position, to: Position) -> Result<Option<Piece>, BoardError> {
        let from_index = self.index(from)?;
        let to_index = self.index(to)?;

        let id = match self.cells[from_index] {
            Cell::Occupied(id) => id,
            _ => return Err(BoardError::EmptySquare(from)),
        };
        let team = self.pieces.get(&id).ok_or(BoardError::UnknownPiece(id))?.team;

        let captured = match self.cells[to_index] {
            Cell::Obstacle => return Err(BoardError::Obstacle(to)),
            Cell::Occupied(other) if other == id => return Ok(None),
            Cell::Occupied(other) => {
                let victim = self.pieces.get(&other).ok_or(BoardError::UnknownPiece(other))?;
                if victim.team == team {
                    return Err(BoardError::Occupied(to));
                }
                self.pieces.remove(&other)
            }
            Cell::Empty => None,
        };

        self.cells[from_index] = Cell::Empty;
        self.cells[to_index] = Cell::Occupied(id);
        if let Some(piece) = self.pieces.get_mut(&id) {
            piece.position = to;
        }
        Ok(captured)
    }

    /// Plays `mv` on this board without any mutation hooks. This is the
    /// simulation step used on cloned boards.
    pub fn apply_move(&mut self, mv: &Move) -> Result<Option<Piece>, BoardError> {
        self.move_piece(mv.from, mv.to)
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(&id)
    }

    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn pieces_by_team(&self, team: Team) -> impl Iterator<Item = &Piece> {
        self.pieces.values().filter(move |piece| piece.team == team)
    }

    pub fn find_king(&self, team: Team) -> Option<&Piece> {
        self.pieces_by_team(team).find(|piece| piece.piece_type == PieceType::King)
    }

    /// Union of every rule attached to the piece.
    pub fn valid_destinations(&self, id: PieceId) -> BTreeSet<Position> {
        let mut out = BTreeSet::new();
        if let Some(piece) = self.pieces.get(&id) {
            for slot in piece.rules() {
                slot.rule.collect_into(self, piece.position, piece.team, &mut out);
            }
        }
        out
    }

    fn moves_for(&self, piece: &Piece) -> Vec<Move> {
        self.valid_destinations(piece.id)
            .into_iter()
            .map(|to| {
                let captured = match self.cell(to) {
                    Some(Cell::Occupied(other)) => Some(*other),
                    _ => None,
                };
                Move::new(piece.position, to, piece.id, captured)
            })
            .collect()
    }

    pub fn get_valid_moves(&self, pos: Position) -> Result<Vec<Move>, BoardError> {
        Ok(match self.get_piece_at(pos)? {
            Some(piece) => self.moves_for(piece),
            None => Vec::new(),
        })
    }

    /// Every move of every piece of `team`, in piece-id then square order.
    pub fn all_moves(&self, team: Team) -> Vec<Move> {
        self.pieces_by_team(team)
            .flat_map(|piece| self.moves_for(piece))
            .collect()
    }

    pub fn move_count(&self, team: Team) -> usize {
        self.pieces_by_team(team)
            .map(|piece| self.valid_destinations(piece.id).len())
            .sum()
    }

    /// Whether any piece of `by` could move onto `pos`.
    pub fn is_square_attacked(&self, pos: Position, by: Team) -> bool {
        self.pieces_by_team(by)
            .any(|piece| self.valid_destinations(piece.id).contains(&pos))
    }

    pub fn attackers_of(&self, pos: Position, by: Team) -> usize {
        self.pieces_by_team(by)
            .filter(|piece| self.valid_destinations(piece.id).contains(&pos))
            .count()
    }

    pub fn is_in_check(&self, team: Team) -> bool {
        match self.find_king(team) {
            Some(king) => self.is_square_attacked(king.position, team.opposite()),
            None => false,
        }
    }
}
