use std::str::FromStr;

use anyhow::{bail, ensure, Context};

use crate::{Board, CarId, Cell, InvalidBoardError, Move, Sign, CELLS};

impl FromStr for Board {
    type Err = InvalidBoardError;

    /// Accepts either one 36-character line or six rows; whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars = s.chars().filter(|ch| !ch.is_whitespace());
        let len = chars.clone().count();
        if len != CELLS {
            return Err(InvalidBoardError::Length(len));
        }

        let mut board = Board::default();
        for (offset, ch) in chars.enumerate() {
            board[offset] = match ch {
                // The live board marks empty cells with `o`.
                '.' | 'o' => Cell::Empty,
                'x' => Cell::Wall,
                'A'..='Z' => Cell::Car(CarId(ch as u8)),
                _ => return Err(InvalidBoardError::Cell { ch, offset }),
            };
        }
        Ok(board)
    }
}

impl FromStr for Move {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = chars.next().context("Empty move")?;
        let car = CarId::new(letter).with_context(|| format!("Invalid car: {letter:?}"))?;
        let sign = match chars.next() {
            Some('+') => Sign::Plus,
            Some('-') => Sign::Minus,
            Some(ch) => bail!("Invalid sign: {ch:?}"),
            None => bail!("Missing sign in {s:?}"),
        };
        let digits = chars.as_str();
        ensure!(
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
            "Invalid distance in {s:?}"
        );
        let distance = digits
            .parse::<u8>()
            .with_context(|| format!("Invalid distance in {s:?}"))?;
        ensure!(distance != 0, "Zero distance in {s:?}");
        Ok(Move {
            car,
            sign,
            distance,
        })
    }
}
