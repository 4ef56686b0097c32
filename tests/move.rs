use std::fmt::Write;

use anyhow::{ensure, Context};
use common::*;
use rush_hour_solver::{Board, Move};

mod common;

fn main() {
    run_tests("move", |content| {
        let input = content
            .split_once(SEPARATOR)
            .map_or(content, |(input, _)| input)
            .trim();
        let (actions, map) = input.split_once('\n').context("No actions")?;
        ensure!(!actions.is_empty(), "No actions");

        let mut board = map.parse::<Board>().context("Invalid map")?;
        let mut got = format!("{input}\n\n{SEPARATOR}");
        for (token, i) in actions.split_whitespace().zip(1..) {
            let mv = token
                .parse::<Move>()
                .with_context(|| format!("Invalid token at step {i}: {token:?}"))?;
            match board.apply(mv) {
                Ok(next) => board = next,
                Err(err) => {
                    writeln!(got, "{mv}: {err}").unwrap();
                    break;
                }
            }
            let anchor = board.anchor(mv.car).context("Car vanished")?;
            write!(got, "{mv} -> {anchor}\n{board:#}\n{SEPARATOR}").unwrap();
        }

        Ok(got)
    });
}
