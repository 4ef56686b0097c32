use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use console::{style, Key, Term};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use rush_hour_solver::solve::{self, Limits, Outcome, Solution};
use rush_hour_solver::{Board, Cell, InvalidBoardError, Move, PRIMARY};

#[derive(Parser)]
#[command(name = "rush-hour-solver")]
#[command(about = "A solver for 6x6 sliding-block parking puzzles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve boards and print one line of moves per board
    Solve {
        /// Boards as 36 characters, row by row: `.` empty, `A`-`Z` cars, `x` frozen
        #[arg(value_name = "BOARD")]
        boards: Vec<String>,

        /// Read more boards from a file, one per line
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Number of worker threads for solving many boards
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Solve a board and step through the solution
    Play {
        #[arg(value_name = "BOARD")]
        board: String,

        #[command(flatten)]
        limits: LimitArgs,
    },
}

#[derive(Args)]
struct LimitArgs {
    /// Give up after generating this many boards
    #[arg(short = 'n', long)]
    max_combinations: Option<u64>,

    /// Give up after this many seconds
    #[arg(short, long, value_name = "SECS")]
    time_limit: Option<f64>,
}

impl LimitArgs {
    fn limits(&self) -> Result<Limits> {
        let time_limit = self
            .time_limit
            .map(Duration::try_from_secs_f64)
            .transpose()
            .context("Invalid time limit")?;
        Ok(Limits {
            max_combinations: self.max_combinations,
            time_limit,
        })
    }
}

enum Action {
    Exit,
    Next,
    Prev,
    Reset,
}

impl TryFrom<Key> for Action {
    type Error = ();

    fn try_from(key: Key) -> Result<Self, Self::Error> {
        Ok(match key {
            Key::ArrowRight | Key::Enter | Key::Char('d' | ' ') => Self::Next,
            Key::ArrowLeft | Key::Char('a' | 'z') => Self::Prev,
            Key::Char('r') => Self::Reset,
            Key::Escape | Key::Char('q') => Self::Exit,
            _ => return Err(()),
        })
    }
}

fn fmt_moves(moves: &[Move]) -> String {
    moves
        .iter()
        .map(|mv| mv.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render(board: &Board, highlight: Option<Move>) -> String {
    let mut out = String::new();
    for (offset, cell) in board.cells() {
        if offset != 0 && offset % rush_hour_solver::WIDTH == 0 {
            out.push('\n');
        }
        let text = cell.to_string();
        let styled = match cell {
            Cell::Car(car) if car == PRIMARY => style(text).red().bold(),
            Cell::Car(car) if highlight.map_or(false, |mv| mv.car == car) => {
                style(text).yellow().bold()
            }
            Cell::Car(_) => style(text).bold(),
            Cell::Wall | Cell::Empty => style(text).dim(),
        };
        out.push_str(&styled.to_string());
    }
    out
}

fn report(solution: &Solution) {
    eprintln!(
        "{}",
        style(format!(
            "{} moves, {} steps, {} combinations in {:.2?}",
            solution.move_count(),
            solution.steps(),
            solution.stats.combinations,
            solution.stats.elapsed,
        ))
        .dim()
    );
}

fn solve_one(board: &Board, limits: &Limits) -> Result<Outcome, InvalidBoardError> {
    let spinner = ProgressBar::new_spinner();
    let outcome = solve::bfs(board, limits, |stats| {
        if stats.expanded % 4096 == 0 {
            spinner.set_message(format!("{} combinations", stats.combinations));
            spinner.tick();
        }
    });
    spinner.finish_and_clear();
    outcome
}

fn read_boards(boards: Vec<String>, file: Option<PathBuf>) -> Result<Vec<String>> {
    let mut all = boards;
    if let Some(path) = file {
        let data = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        all.extend(
            data.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_owned),
        );
    }
    ensure!(!all.is_empty(), "No boards given");
    Ok(all)
}

fn run_solve(
    boards: Vec<String>,
    file: Option<PathBuf>,
    jobs: Option<usize>,
    limits: Limits,
) -> Result<()> {
    let boards = read_boards(boards, file)?;
    if let Some(jobs) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to set up worker threads")?;
    }

    let outcomes = if let [board] = &boards[..] {
        vec![board
            .parse::<Board>()
            .and_then(|board| solve_one(&board, &limits))]
    } else {
        let bar =
            ProgressBar::new(boards.len() as u64).with_style(ProgressStyle::default_bar());
        let outcomes = boards
            .par_iter()
            .progress_with(bar.clone())
            .map(|board| solve::solve_str(board, &limits))
            .collect::<Vec<_>>();
        bar.finish_and_clear();
        outcomes
    };

    let mut invalid_cnt = 0;
    for (board, outcome) in boards.iter().zip(outcomes) {
        match outcome {
            Ok(Outcome::Solved(solution)) => {
                println!("{board} {}", fmt_moves(solution.moves()));
                report(&solution);
            }
            Ok(Outcome::Exhausted(stats)) => {
                println!("{board} unsolvable");
                eprintln!(
                    "{}",
                    style(format!("{} combinations explored", stats.combinations)).dim()
                );
            }
            Ok(Outcome::Cutoff(stats)) => {
                println!("{board} cutoff");
                eprintln!(
                    "{}",
                    style(format!(
                        "gave up after {} combinations in {:.2?}",
                        stats.combinations, stats.elapsed
                    ))
                    .yellow()
                );
            }
            Err(err) => {
                println!("{board} invalid: {err}");
                invalid_cnt += 1;
            }
        }
    }

    if invalid_cnt != 0 {
        bail!("{invalid_cnt}/{} boards were invalid", boards.len());
    }
    Ok(())
}

fn run_play(board: &str, limits: Limits) -> Result<()> {
    let init_board = board.parse::<Board>().context("Invalid board")?;
    let solution = match solve_one(&init_board, &limits).context("Invalid board")? {
        Outcome::Solved(solution) => solution,
        Outcome::Exhausted(_) => bail!("The board has no solution"),
        Outcome::Cutoff(_) => bail!("No solution found within the limits"),
    };
    report(&solution);

    let mut frames = vec![(init_board, None)];
    for &mv in solution.moves() {
        let (board, _) = frames.last().context("No frames")?;
        let next = board.apply(mv).context("Solver produced an illegal move")?;
        frames.push((next, Some(mv)));
    }

    let term = Term::stderr();
    let mut cur = 0;
    loop {
        let (board, mv) = &frames[cur];
        match mv {
            Some(mv) => {
                let anchor = board.anchor(mv.car).context("Car vanished")?;
                eprintln!("step {cur}/{}: {mv} -> {anchor}", frames.len() - 1);
            }
            None => eprintln!("start, {} moves to go", frames.len() - 1),
        }
        eprintln!("{}\n", render(board, *mv));

        let action = loop {
            if let Ok(action) = Action::try_from(term.read_key()?) {
                break action;
            }
        };

        match action {
            Action::Exit => break,
            Action::Next if cur + 1 < frames.len() => cur += 1,
            Action::Prev if cur > 0 => cur -= 1,
            Action::Next | Action::Prev => {}
            Action::Reset => cur = 0,
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Solve {
            boards,
            file,
            jobs,
            limits,
        } => run_solve(boards, file, jobs, limits.limits()?),
        Command::Play { board, limits } => run_play(&board, limits.limits()?),
    }
}
