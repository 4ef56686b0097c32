use std::time::{Duration, Instant};

use crate::{Board, Direction, InvalidBoardError, Move};

type IndexMap<K, V> = indexmap::IndexMap<K, V, fxhash::FxBuildHasher>;

/// Optional cutoffs, checked once per expanded board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_combinations: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl Limits {
    fn exceeded(&self, stats: &Stats) -> bool {
        self.max_combinations
            .map_or(false, |max| stats.combinations >= max)
            || self.time_limit.map_or(false, |limit| stats.elapsed >= limit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Expanded boards plus every generated child, duplicates included.
    pub combinations: u64,
    /// Distinct boards taken off the frontier.
    pub expanded: usize,
    pub elapsed: Duration,
}

/// A board together with the moves that led to it from the initial board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub board: Board,
    /// Total distance slid over all moves.
    pub steps: u32,
    pub moves: Vec<Move>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub state: State,
    pub stats: Stats,
}

impl Solution {
    pub fn moves(&self) -> &[Move] {
        &self.state.moves
    }

    pub fn move_count(&self) -> usize {
        self.state.moves.len()
    }

    pub fn steps(&self) -> u32 {
        self.state.steps
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Solved(Solution),
    /// Every reachable board was expanded without reaching the exit.
    Exhausted(Stats),
    /// A [`Limits`] cutoff stopped the search first.
    Cutoff(Stats),
}

impl Outcome {
    pub fn stats(&self) -> &Stats {
        match self {
            Outcome::Solved(solution) => &solution.stats,
            Outcome::Exhausted(stats) | Outcome::Cutoff(stats) => stats,
        }
    }
}

struct Node {
    parent: usize,
    mv: Option<Move>,
}

const ROOT: usize = !0usize;

pub fn solve(board: &Board) -> Result<Outcome, InvalidBoardError> {
    bfs(board, &Limits::default(), |_| {})
}

pub fn solve_str(board: &str, limits: &Limits) -> Result<Outcome, InvalidBoardError> {
    bfs(&board.parse()?, limits, |_| {})
}

/// Breadth-first search over boards, sliding each car, in order of first
/// appearance, up, right, down and left by every feasible distance.
///
/// The first winning board found is returned, which is not necessarily the
/// shortest solution. A child that wins ends the search as soon as it is
/// generated, without waiting for it to reach the front of the queue.
pub fn bfs(
    board: &Board,
    limits: &Limits,
    mut on_step: impl FnMut(&Stats),
) -> Result<Outcome, InvalidBoardError> {
    board.validate()?;

    let start = Instant::now();
    let mut stats = Stats::default();

    // Insertion order is the frontier, entries behind the cursor are visited.
    let mut nodes = IndexMap::default();
    nodes.insert(board.clone(), Node { parent: ROOT, mv: None });

    let mut cursor = 0;
    let (board, parent, last_move) = 'bfs: loop {
        #[cfg(feature = "coz")]
        coz::scope!("Expand");

        stats.elapsed = start.elapsed();
        let Some((board, _)) = nodes.get_index(cursor) else {
            return Ok(Outcome::Exhausted(stats));
        };
        if limits.exceeded(&stats) {
            return Ok(Outcome::Cutoff(stats));
        }
        let board = board.clone();

        stats.combinations += 1;
        stats.expanded += 1;
        on_step(&stats);

        if board.is_winning() {
            let node = &nodes[cursor];
            break 'bfs (board, node.parent, node.mv);
        }

        for (from, car) in board.cars() {
            for dir in Direction::ALL {
                let free = board.free_distance(car, from, dir);
                for (child, distance) in board.slides(car, from, dir, free).zip(1..) {
                    #[cfg(feature = "coz")]
                    coz::progress!("Child");

                    stats.combinations += 1;
                    let mv = Move::new(car, dir, distance);
                    if child.is_winning() {
                        break 'bfs (child, cursor, Some(mv));
                    }
                    nodes.entry(child).or_insert(Node {
                        parent: cursor,
                        mv: Some(mv),
                    });
                }
            }
        }
        cursor += 1;
    };
    stats.elapsed = start.elapsed();

    let mut moves = std::iter::successors((parent != ROOT).then_some(parent), |&i| {
        let parent = nodes[i].parent;
        (parent != ROOT).then_some(parent)
    })
    .filter_map(|i| nodes[i].mv)
    .collect::<Vec<_>>();
    moves.reverse();
    moves.extend(last_move);

    let steps = moves.iter().map(|mv| mv.distance as u32).sum();
    Ok(Outcome::Solved(Solution {
        state: State {
            board,
            steps,
            moves,
        },
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use rayon::prelude::*;

    use super::*;

    const CLASSIC: &str = "BB...CD..E.CDAAE.CD..E..F...GGF.HHH.";

    fn solved(outcome: Outcome) -> Solution {
        match outcome {
            Outcome::Solved(solution) => solution,
            other => panic!("Not solved: {other:?}"),
        }
    }

    fn tokens(solution: &Solution) -> String {
        solution
            .moves()
            .iter()
            .map(|mv| mv.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn one_move() {
        let board = "............AA......................".parse().unwrap();
        let solution = solved(solve(&board).unwrap());
        assert_eq!(tokens(&solution), "A+4");
        assert_eq!(solution.steps(), 4);
        assert_eq!(solution.move_count(), 1);
        assert_eq!(solution.stats.combinations, 5);
        assert!(solution.state.board.is_winning());
    }

    #[test]
    fn already_solved() {
        let board = "................AA..................".parse().unwrap();
        let solution = solved(solve(&board).unwrap());
        assert!(solution.moves().is_empty());
        assert_eq!(solution.steps(), 0);
        assert_eq!(solution.stats.combinations, 1);
        assert_eq!(solution.stats.expanded, 1);
    }

    #[test]
    fn boxed_in() {
        let board = "BCDEFGBCDEFGBAAEFGHHHIIIJJJKKKLLLMMM".parse().unwrap();
        match solve(&board).unwrap() {
            Outcome::Exhausted(stats) => {
                assert_eq!(stats.combinations, 1);
                assert_eq!(stats.expanded, 1);
            }
            other => panic!("Expect exhausted, got {other:?}"),
        }
    }

    #[test]
    fn invalid_input() {
        let board = "....................................".parse().unwrap();
        assert_eq!(solve(&board), Err(InvalidBoardError::PrimaryCount(0)));
        assert_eq!(
            solve_str("AA", &Limits::default()),
            Err(InvalidBoardError::Length(2))
        );
    }

    #[test]
    fn solution_replays() {
        let board: Board = CLASSIC.parse().unwrap();
        let solution = solved(solve(&board).unwrap());
        let last = solution
            .moves()
            .iter()
            .try_fold(board, |board, &mv| board.apply(mv))
            .unwrap();
        assert!(last.is_winning());
        assert_eq!(last, solution.state.board);
    }

    #[test]
    fn deterministic_across_threads() {
        let expect = solved(solve(&CLASSIC.parse().unwrap()).unwrap());
        let results = (0..4)
            .into_par_iter()
            .map(|_| solved(solve_str(CLASSIC, &Limits::default()).unwrap()))
            .collect::<Vec<_>>();
        for got in results {
            assert_eq!(got.state, expect.state);
            assert_eq!(got.stats.combinations, expect.stats.combinations);
            assert_eq!(got.stats.expanded, expect.stats.expanded);
        }
    }

    #[test]
    fn cutoff() {
        let limits = Limits {
            max_combinations: Some(100),
            time_limit: None,
        };
        match solve_str(CLASSIC, &limits).unwrap() {
            // Overshoots by at most one expansion: the board itself plus up to
            // four slides for each of the 8 cars.
            Outcome::Cutoff(stats) => {
                assert!((100..100 + 1 + 8 * 4).contains(&stats.combinations));
            }
            other => panic!("Expect cutoff, got {other:?}"),
        }
    }

    #[test]
    fn time_limit() {
        let limits = Limits {
            max_combinations: None,
            time_limit: Some(Duration::ZERO),
        };
        match solve_str(CLASSIC, &limits).unwrap() {
            Outcome::Cutoff(stats) => {
                assert_eq!(stats.expanded, 0);
                assert_eq!(stats.combinations, 0);
            }
            other => panic!("Expect cutoff, got {other:?}"),
        }
    }

    #[test]
    fn progress_callback() {
        let mut calls = 0;
        let board = CLASSIC.parse().unwrap();
        let outcome = bfs(&board, &Limits::default(), |_| calls += 1).unwrap();
        assert_eq!(calls, outcome.stats().expanded);
    }
}
