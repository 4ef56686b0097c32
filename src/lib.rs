use std::ops::{Index, IndexMut};

use arrayvec::ArrayVec;
use thiserror::Error;

mod fmt;
mod parse;
pub mod solve;

pub const WIDTH: usize = 6;
pub const HEIGHT: usize = 6;
pub const CELLS: usize = WIDTH * HEIGHT;
pub const EXIT_ROW: usize = 2;

/// The car that has to reach the right edge of the exit row.
pub const PRIMARY: CarId = CarId(b'A');

const PRIMARY_FIRST: usize = EXIT_ROW * WIDTH;
const PRIMARY_GOAL: usize = PRIMARY_FIRST + WIDTH - 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum InvalidBoardError {
    #[error("expected 36 cells, found {0}")]
    Length(usize),
    #[error("unexpected cell {ch:?} at offset {offset}")]
    Cell { ch: char, offset: usize },
    #[error("expected exactly one primary car, found {0}")]
    PrimaryCount(usize),
    #[error("primary car at offset {0} is outside the exit row")]
    PrimaryPlacement(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum MoveError {
    #[error("car {0} is not on the board")]
    UnknownCar(CarId),
    #[error("move {mv} exceeds free distance {free}")]
    Blocked { mv: Move, free: usize },
}

/// A car letter, `A` to `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CarId(u8);

impl CarId {
    pub fn new(letter: char) -> Option<Self> {
        letter.is_ascii_uppercase().then_some(Self(letter as u8))
    }

    fn bit(self) -> u32 {
        1 << (self.0 - b'A')
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    /// A frozen piece. Blocks like a car but never moves.
    Wall,
    Car(CarId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Expansion order of the search.
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Up | Direction::Down => Orientation::Vertical,
            Direction::Right | Direction::Left => Orientation::Horizontal,
        }
    }

    pub fn sign(self) -> Sign {
        match self {
            Direction::Right | Direction::Down => Sign::Plus,
            Direction::Up | Direction::Left => Sign::Minus,
        }
    }

    pub fn from_axis(orientation: Orientation, sign: Sign) -> Self {
        match (orientation, sign) {
            (Orientation::Horizontal, Sign::Plus) => Direction::Right,
            (Orientation::Horizontal, Sign::Minus) => Direction::Left,
            (Orientation::Vertical, Sign::Plus) => Direction::Down,
            (Orientation::Vertical, Sign::Minus) => Direction::Up,
        }
    }

    /// Offset delta of a single step in row-major order.
    fn stride(self) -> isize {
        match self {
            Direction::Up => -(WIDTH as isize),
            Direction::Right => 1,
            Direction::Down => WIDTH as isize,
            Direction::Left => -1,
        }
    }
}

/// One slide of a car along its own axis, written as `B+2` or `C-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub car: CarId,
    pub sign: Sign,
    pub distance: u8,
}

/// A 6x6 grid in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    grid: [Cell; CELLS],
}

impl Default for Board {
    fn default() -> Self {
        Self {
            grid: [Cell::Empty; CELLS],
        }
    }
}

impl Index<usize> for Board {
    type Output = Cell;
    fn index(&self, offset: usize) -> &Self::Output {
        &self.grid[offset]
    }
}
impl IndexMut<usize> for Board {
    fn index_mut(&mut self, offset: usize) -> &mut Self::Output {
        &mut self.grid[offset]
    }
}

impl Board {
    pub fn cells(&self) -> impl Iterator<Item = (usize, Cell)> + '_ {
        self.grid.iter().copied().enumerate()
    }

    /// Starting offsets of the non-overlapping `AA` runs.
    fn primary_runs(&self) -> impl Iterator<Item = usize> + '_ {
        let mut offset = 0;
        std::iter::from_fn(move || {
            while offset + 1 < CELLS {
                let start = offset;
                if self.grid[start] == Cell::Car(PRIMARY)
                    && self.grid[start + 1] == Cell::Car(PRIMARY)
                {
                    offset += 2;
                    return Some(start);
                }
                offset += 1;
            }
            None
        })
    }

    fn primary_offset(&self) -> Option<usize> {
        self.primary_runs().next()
    }

    /// Checks the primary car invariants. Other cars are trusted to be straight
    /// lines of 2 or 3 cells.
    pub fn validate(&self) -> Result<(), InvalidBoardError> {
        let runs = self.primary_runs().count();
        if runs != 1 {
            return Err(InvalidBoardError::PrimaryCount(runs));
        }
        match self.primary_offset() {
            Some(offset) if (PRIMARY_FIRST..=PRIMARY_GOAL).contains(&offset) => Ok(()),
            Some(offset) => Err(InvalidBoardError::PrimaryPlacement(offset)),
            None => Err(InvalidBoardError::PrimaryCount(0)),
        }
    }

    pub fn is_winning(&self) -> bool {
        self.primary_offset() == Some(PRIMARY_GOAL)
    }

    pub fn car_at(&self, offset: usize) -> Option<CarId> {
        match self.grid.get(offset)? {
            Cell::Car(car) => Some(*car),
            Cell::Empty | Cell::Wall => None,
        }
    }

    /// Cars with their first occupied offset, in order of first appearance.
    pub fn cars(&self) -> ArrayVec<(usize, CarId), 26> {
        let mut seen = 0u32;
        let mut cars = ArrayVec::new();
        for (offset, cell) in self.cells() {
            let Cell::Car(car) = cell else { continue };
            if seen & car.bit() == 0 {
                seen |= car.bit();
                cars.push((offset, car));
            }
        }
        cars
    }

    pub fn anchor(&self, car: CarId) -> Option<usize> {
        self.grid.iter().position(|&cell| cell == Cell::Car(car))
    }

    pub fn orientation(&self, car: CarId) -> Orientation {
        let first = self.anchor(car);
        let last = self.grid.iter().rposition(|&cell| cell == Cell::Car(car));
        match (first, last) {
            // A horizontal car spans at most 2 offsets, a vertical one at least 6.
            (Some(first), Some(last)) if last - first >= 3 => Orientation::Vertical,
            _ => Orientation::Horizontal,
        }
    }

    pub fn car_len(&self, car: CarId) -> usize {
        self.grid
            .iter()
            .filter(|&&cell| cell == Cell::Car(car))
            .count()
    }

    /// How far `car` can slide in `dir` starting from its occupied cell `from`.
    /// Zero when `dir` is across the car's axis.
    pub fn free_distance(&self, car: CarId, from: usize, dir: Direction) -> usize {
        let orientation = self.orientation(car);
        if dir.orientation() != orientation {
            return 0;
        }

        let stride = dir.stride();
        let (row, col) = (from / WIDTH, from % WIDTH);
        let mut lead = from as isize;
        let mut free = 0;
        let mut step = 1;
        loop {
            let pos = lead + stride * step;
            if !(0..CELLS as isize).contains(&pos) {
                break;
            }
            let pos = pos as usize;
            // Walk over the car's own cells first.
            if self.grid[pos] == Cell::Car(car) {
                lead = pos as isize;
                continue;
            }
            let wraps = match orientation {
                Orientation::Horizontal => pos / WIDTH != row,
                Orientation::Vertical => pos % WIDTH != col,
            };
            if self.grid[pos] != Cell::Empty || wraps {
                break;
            }
            free = step as usize;
            step += 1;
        }
        free
    }

    /// Successive boards with `car` slid by `1..=distance` cells in `dir`.
    /// `distance` must not exceed [`Board::free_distance`].
    pub(crate) fn slides(
        &self,
        car: CarId,
        from: usize,
        dir: Direction,
        distance: usize,
    ) -> impl Iterator<Item = Board> + '_ {
        let stride = dir.stride();
        let tail = self.car_len(car) as isize * stride;
        let mut lead = from as isize;
        while let Some(next) = usize::try_from(lead + stride)
            .ok()
            .filter(|&next| self.car_at(next) == Some(car))
        {
            lead = next as isize;
        }

        (0..distance).scan(self.clone(), move |board, _| {
            lead += stride;
            board[lead as usize] = Cell::Car(car);
            board[(lead - tail) as usize] = Cell::Empty;
            Some(board.clone())
        })
    }

    /// Applies a single move token, checking that the slide is legal.
    pub fn apply(&self, mv: Move) -> Result<Board, MoveError> {
        let from = self.anchor(mv.car).ok_or(MoveError::UnknownCar(mv.car))?;
        let dir = Direction::from_axis(self.orientation(mv.car), mv.sign);
        let free = self.free_distance(mv.car, from, dir);
        let distance = mv.distance as usize;
        if distance == 0 || distance > free {
            return Err(MoveError::Blocked { mv, free });
        }
        self.slides(mv.car, from, dir, distance)
            .last()
            .ok_or(MoveError::Blocked { mv, free })
    }
}

impl Move {
    pub fn new(car: CarId, dir: Direction, distance: u8) -> Self {
        Self {
            car,
            sign: dir.sign(),
            distance,
        }
    }
}
