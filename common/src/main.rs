use clap::Parser;
use minesweeper_kb::*;
use rand::{SeedableRng, rngs::StdRng};
use std::thread;
use std::time::Duration;

/// Plays a game of minesweeper, moving on proven facts and guessing only when
/// nothing can be proven.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Board width in cells.
    #[arg(long, default_value_t = 10)]
    width: usize,

    /// Board height in cells.
    #[arg(long, default_value_t = 10)]
    height: usize,

    /// Number of mines on the board.
    #[arg(long, default_value_t = 15)]
    mines: usize,

    /// Seed for the mine layout and the bot's guesses. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Pause between moves, in milliseconds.
    #[arg(long, default_value_t = 500)]
    delay_ms: u64,

    /// Check every deduction against the SAT oracle after each move.
    #[arg(long)]
    verify: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Initialization ---
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut session = Session::new(args.width, args.height, args.mines, seed)?;
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    let delay = Duration::from_millis(args.delay_ms);

    println!("--- Knowledge-Based Minesweeper Bot ---");
    println!("Strategy: Play proven safe cells, guess uniformly otherwise.");
    println!("Seed: {seed}");
    print_board(&session);
    thread::sleep(delay);

    // --- 2. Game Loop ---
    let mut move_count = 0;
    let mut guesses = 0;
    while session.game.game_state == GameState::Playing {
        move_count += 1;
        println!("\n--- Move #{move_count} ---");

        // --- 3. Bot's Decision Logic ---
        let Some(next) = session.knowledge.next_move(&mut rng) else {
            println!("No valid moves left for the bot to make.");
            break;
        };
        match next {
            Move::Safe(cell) => println!("Logic found a guaranteed safe cell: {cell}"),
            Move::Guess(cell) => {
                guesses += 1;
                println!("No logically safe move found. Guessing {cell}...");
            }
        }

        // --- 4. Execute the Chosen Move ---
        match session.reveal(next.cell())? {
            Reveal::Exploded => println!("Bot hit a mine at {}.", next.cell()),
            Reveal::Opened(_) => println!(
                "Known mines: {}, known safe: {}, open constraints: {}",
                session.knowledge.mines().len(),
                session.knowledge.safes().len(),
                session.knowledge.constraints().len()
            ),
        }

        if args.verify {
            oracle::verify(&session.knowledge, &session.game.clues())?;
        }

        print_board(&session);
        thread::sleep(delay);
    }

    // --- 5. Final Result ---
    println!("\n--- Game Over ---");
    println!("Moves: {move_count}, guesses: {guesses}");

    match session.game.game_state {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => println!("Result: The bot hit a mine and lost."),
        GameState::Playing => println!("Result: The game ended unexpectedly."),
    }

    Ok(())
}

fn print_board(session: &Session) {
    let Session { game, knowledge } = session;

    // Print header
    print!("   ");
    for col in 0..game.width {
        print!("{col:^3}");
    }
    println!("\n  +{}", "---".repeat(game.width));

    // Print rows
    for (row, tiles) in game.board.iter().enumerate() {
        print!("{row:^2}|");
        for (col, tile) in tiles.iter().enumerate() {
            let flagged = knowledge.mines().contains(&Cell::new(row, col));
            let display = match tile {
                Tile::Hidden if flagged => " F ".to_string(),
                Tile::Hidden => " ■ ".to_string(),
                Tile::Revealed(0) => " . ".to_string(),
                Tile::Revealed(n) => format!(" {n} "),
            };
            print!("{display}");
        }
        println!();
    }
    println!();
}
