use std::fmt;

use crate::{Board, CarId, Cell, Move, Sign, WIDTH};

/// `{}` renders the flat 36-character form, `{:#}` one row per line.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (offset, cell) in self.cells() {
            if f.alternate() && offset != 0 && offset % WIDTH == 0 {
                f.write_str("\n")?;
            }
            fmt::Display::fmt(&cell, f)?;
        }
        Ok(())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => f.write_str("."),
            Cell::Wall => f.write_str("x"),
            Cell::Car(car) => fmt::Display::fmt(car, f),
        }
    }
}

impl fmt::Display for CarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&(self.0 as char), f)
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Plus => f.write_str("+"),
            Sign::Minus => f.write_str("-"),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.car, self.sign, self.distance)
    }
}
