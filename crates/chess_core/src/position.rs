use std::fmt;

/// A square on the board, 0-based. Bounds depend on the board, so a
/// `Position` on its own is never assumed to be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub rank: i32, // 0 = White's back rank
    pub file: i32, // 0 = a-file
}

impl Position {
    pub const fn new(file: i32, rank: i32) -> Self {
        Self { file, rank }
    }

    /// Shifts by a raw offset. The result may fall outside the board.
    pub const fn offset(self, df: i32, dr: i32) -> Self {
        Self {
            file: self.file + df,
            rank: self.rank + dr,
        }
    }

    /// Chebyshev distance, i.e. king steps between two squares.
    pub fn distance(self, other: Position) -> i32 {
        (self.file - other.file).abs().max((self.rank - other.rank).abs())
    }

    pub fn is_adjacent(self, other: Position) -> bool {
        self != other && self.distance(other) == 1
    }

    pub fn from_algebraic(notation: &str) -> Option<Self> {
        let mut chars = notation.chars();
        let file = chars.next()?;
        if !file.is_ascii_lowercase() {
            return None;
        }

        let rank: i32 = chars.as_str().parse().ok()?;
        if rank < 1 {
            return None;
        }

        Some(Self {
            file: (file as u8 - b'a') as i32,
            rank: rank - 1,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (0..26).contains(&self.file) && self.rank >= 0 {
            write!(f, "{}{}", (b'a' + self.file as u8) as char, self.rank + 1)
        } else {
            write!(f, "({}, {})", self.file, self.rank)
        }
    }
}
