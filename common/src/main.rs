use anyhow::Context;
use clap::Parser;
use minesweeper_ai::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Autonomous minesweeper bot: plays known-safe cells, guesses otherwise.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of rows
    #[arg(long, default_value_t = 8)]
    height: usize,

    /// Number of columns
    #[arg(long, default_value_t = 8)]
    width: usize,

    /// Number of mines to plant
    #[arg(long, default_value_t = 8)]
    mines: usize,

    /// Seed for a reproducible game
    #[arg(long)]
    seed: Option<u64>,

    /// Imposed first move, as row,col
    #[arg(long, value_parser = parse_cell)]
    first: Option<Cell>,

    /// Pause between moves, in milliseconds
    #[arg(long, default_value_t = 0)]
    delay_ms: u64,

    /// Check every deduction with the SAT solver after each move
    #[arg(long)]
    audit: bool,
}

fn parse_cell(s: &str) -> Result<Cell, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected row,col but got {s:?}"))?;
    let row = row.trim().parse().map_err(|e| format!("bad row: {e}"))?;
    let col = col.trim().parse().map_err(|e| format!("bad column: {e}"))?;
    Ok(Cell::new(row, col))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    // --- 1. Initialization ---
    let mut game = Game::new(args.height, args.width, args.mines, &mut rng)
        .context("failed to create board")?;
    info!(
        height = args.height,
        width = args.width,
        mines = args.mines,
        "new game"
    );

    println!("--- Minesweeper Knowledge-Base Bot ---");
    println!("Strategy: play cells known to be safe, guess randomly otherwise.");
    print!("{game}");

    if let Some(first) = args.first {
        println!("\nImposed first move {first}");
        game.reveal(first)?;
        print!("{game}");
    }

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while game.game_state == GameState::Playing {
        let Some(mv) = game.step(&mut rng)? else {
            println!("No moves left to make.");
            break;
        };
        move_count += 1;

        match mv {
            Move::Safe(cell) => println!("\n--- Move #{move_count}: {cell} (known safe) ---"),
            Move::Guess(cell) => println!("\n--- Move #{move_count}: {cell} (guess) ---"),
        }
        print!("{game}");

        if args.audit {
            game.audit().context("agent made an unsound deduction")?;
        }

        if args.delay_ms > 0 {
            thread::sleep(Duration::from_millis(args.delay_ms));
        }
    }

    // --- 3. Final Result ---
    println!("\n--- Game Over ---");
    print!("{}", game.board());
    println!(
        "Known mines: {}, known safe: {}, moves made: {}",
        game.agent().known_mines().len(),
        game.agent().known_safe().len(),
        game.agent().moves_made().len(),
    );

    match game.game_state {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => println!("Result: The bot hit a mine and lost."),
        GameState::Playing => println!("Result: The game ended unexpectedly."),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("1, 2"), Ok(Cell::new(1, 2)));
        assert!(parse_cell("1").is_err());
        assert!(parse_cell("a,2").is_err());
    }
}
