// src/main.rs
// Hot-seat console game: both seats share one terminal, every move goes
// through the session layer and is persisted to the configured store.
use anyhow::{bail, Context};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use duel_chess::{
    Board, ClientCommand, Color, CommandType, Config, GameId, GameSnapshot, JsonFileStore, Move, PieceKind, Position, Role,
    ServerMessage, SessionManager, Subscription,
};

#[derive(Debug)]
enum UserInput {
    Move(Move),
    Highlight(Position),
    Resign,
    Export(PathBuf),
    Help,
    Quit,
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    import: Option<PathBuf>,
    resume: Option<GameId>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::load(args.config.as_deref()).context("loading configuration")?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_new(&config.log_filter).context("parsing log filter")?)
        .init();

    let store = JsonFileStore::open(&config.store_dir).context("opening game store")?;
    let manager = SessionManager::new(store, config.broadcast_capacity);
    let game_id = match (args.resume, &args.import) {
        (Some(id), _) => id,
        (None, Some(path)) => {
            let json = fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))?;
            manager.import_game(&GameSnapshot::from_json(&json)?)?
        }
        (None, None) => manager.create_game()?,
    };
    tracing::info!(game = %game_id, dir = %config.store_dir.display(), "console session starting");

    let white = manager.connect(game_id, Role::Player(Color::White)).await?;
    let black = manager.connect(game_id, Role::Player(Color::Black)).await?;
    let mut seats = [white, black];

    println!("==============================");
    println!("|      Duel Chess (v{})     |", env!("CARGO_PKG_VERSION"));
    println!("==============================");
    println!("Game id: {} (resume later with `duel_chess {}`)", game_id, game_id);
    print_help();

    'game_loop: loop {
        for seat in seats.iter_mut() {
            print_notices(seat);
        }

        let snapshot = manager.snapshot(game_id).await?;
        println!("------------------------------------------");
        println!("{}", Board::from_layout(snapshot.board.clone()));
        if snapshot.game_over {
            println!("\n=== GAME OVER: {}. ===", snapshot.status);
            break 'game_loop;
        }

        let turn = snapshot.turn;
        let seat = &seats[seat_index(turn)];
        print!("\n{}'s turn. Enter move (e.g. e2e4, a7a8q) or command: ", turn);
        io::stdout().flush()?;

        let mut input_line = String::new();
        if io::stdin().read_line(&mut input_line)? == 0 {
            println!("\nEnd of input detected. The game is saved as {}.", game_id);
            break 'game_loop;
        }
        let input_trimmed = input_line.trim();
        if input_trimmed.is_empty() { continue 'game_loop; }

        let command = match parse_user_input(input_trimmed) {
            Ok(UserInput::Move(mv)) => {
                let mv = match complete_promotion(&snapshot.board, turn, mv)? {
                    Some(mv) => mv,
                    None => continue 'game_loop,
                };
                client_command(CommandType::MakeMove, game_id, Some(mv), None)
            }
            Ok(UserInput::Highlight(pos)) => client_command(CommandType::Highlight, game_id, None, Some(pos)),
            Ok(UserInput::Resign) => client_command(CommandType::Resign, game_id, None, None),
            Ok(UserInput::Export(path)) => {
                match snapshot.to_json().map_err(anyhow::Error::from).and_then(|json| {
                    fs::write(&path, json).with_context(|| format!("writing '{}'", path.display()))
                }) {
                    Ok(()) => println!("Game exported to '{}'.", path.display()),
                    Err(e) => println!("Error: {:#}", e),
                }
                continue 'game_loop;
            }
            Ok(UserInput::Help) => { print_help(); continue 'game_loop; }
            Ok(UserInput::Quit) => {
                println!("Exiting. The game is saved as {}.", game_id);
                break 'game_loop;
            }
            Err(e) => { println!("Input Error: {}", e); continue 'game_loop; }
        };

        match manager.dispatch(seat, command).await {
            Ok(ServerMessage::LoadGame { message: Some(state), .. }) => println!("\n*** {} ***", state),
            Ok(ServerMessage::LoadHighlight { board, destinations, .. }) => {
                println!("{}", highlight_diagram(&board, &destinations));
                if destinations.is_empty() { println!("No legal moves from there."); }
            }
            Ok(ServerMessage::Notification { message }) => println!("{}", message),
            Ok(_) => {}
            Err(e) => println!("Error: {}", e),
        }
    }

    for seat in seats.iter() {
        manager.leave(seat).await?;
    }
    println!("\nGame session finished.");
    Ok(())
}

fn seat_index(color: Color) -> usize {
    match color { Color::White => 0, Color::Black => 1 }
}

fn client_command(command_type: CommandType, game_id: GameId, mv: Option<Move>, position: Option<Position>) -> ClientCommand {
    ClientCommand { command_type, game_id, mv, position }
}

fn print_notices(seat: &mut Subscription) {
    while let Some(message) = seat.try_recv() {
        if let ServerMessage::Notification { message } = message {
            println!("[{}] {}", seat.role(), message);
        }
    }
}

/// Asks for a promotion piece when a pawn reaches the far rank without one.
/// `None` means the move was abandoned.
fn complete_promotion(board: &duel_chess::Layout, turn: Color, mut mv: Move) -> anyhow::Result<Option<Move>> {
    let needs_choice = mv.promotion.is_none()
        && mv.to.row() == turn.promotion_row()
        && board.get(&mv.from).is_some_and(|p| p.kind == PieceKind::Pawn && p.color == turn);
    if !needs_choice { return Ok(Some(mv)); }

    loop {
        print!("Promote pawn to? (q=Queen, r=Rook, b=Bishop, n=Knight): ");
        io::stdout().flush()?;
        let mut promo_input = String::new();
        if io::stdin().read_line(&mut promo_input)? == 0 {
            println!("\nEnd of input during promotion. Move cancelled.");
            return Ok(None);
        }
        match promo_input.trim().chars().next().and_then(PieceKind::from_symbol) {
            Some(kind) if PieceKind::PROMOTIONS.contains(&kind) => {
                mv.promotion = Some(kind);
                return Ok(Some(mv));
            }
            _ => println!("Invalid choice. Please enter q, r, b, or n."),
        }
    }
}

fn highlight_diagram(board: &duel_chess::Layout, targets: &std::collections::BTreeSet<Position>) -> String {
    let mut out = String::from("  +-----------------+\n");
    for row in (1..=8).rev() {
        out.push_str(&format!("{} | ", row));
        for column in 1..=8 {
            let cell = match Position::new(row, column) {
                Ok(pos) if targets.contains(&pos) => '*',
                Ok(pos) => board.get(&pos).map_or('.', |p| p.to_string().chars().next().unwrap_or('?')),
                Err(_) => '?',
            };
            out.push(cell);
            out.push(' ');
        }
        out.push_str("|\n");
    }
    out.push_str("  +-----------------+\n    a b c d e f g h");
    out
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => match args.next() {
                Some(path) => parsed.config = Some(PathBuf::from(path)),
                None => bail!("{} needs a path", arg),
            },
            "-i" | "--import" => match args.next() {
                Some(path) => parsed.import = Some(PathBuf::from(path)),
                None => bail!("{} needs a path", arg),
            },
            "-h" | "--help" => {
                println!("usage: duel_chess [--config <file.json>] [--import <snapshot.json> | <game-id>]");
                std::process::exit(0);
            }
            other => {
                let id = other.parse::<GameId>().with_context(|| format!("'{}' is not a game id", other))?;
                parsed.resume = Some(id);
            }
        }
    }
    Ok(parsed)
}

/// Parses user input into a UserInput variant.
fn parse_user_input(input: &str) -> Result<UserInput, String> {
    let mut parts = input.splitn(2, char::is_whitespace);
    let command_word = parts.next().unwrap_or("").to_lowercase();
    let argument = parts.next().unwrap_or("").trim();

    match command_word.as_str() {
        "moves" | "highlight" => {
            if argument.is_empty() { return Err("Usage: moves <square>, e.g. 'moves e2'".to_string()); }
            argument.parse::<Position>().map(UserInput::Highlight).map_err(|e| e.to_string())
        }
        "resign" => Ok(UserInput::Resign),
        "export" => {
            if argument.is_empty() { return Err("Usage: export <file.json>".to_string()); }
            Ok(UserInput::Export(PathBuf::from(argument)))
        }
        "help" | "?" => Ok(UserInput::Help),
        "quit" | "exit" => Ok(UserInput::Quit),
        _ => input.parse::<Move>().map(UserInput::Move).map_err(|e| e.to_string()),
    }
}

/// Prints available commands.
fn print_help() {
    println!("\nAvailable Commands:");
    println!("  <move>           Enter move in coordinate notation (e.g., e2e4, a7a8q).");
    println!("                   Castle by moving the king two squares (e1g1, e1c1).");
    println!("                   Promotion (q, r, b, n) is optional; will prompt if needed.");
    println!("  moves <square>   Highlight the legal destinations of a piece.");
    println!("  resign           Forfeit the game (ends game).");
    println!("  export <file>    Write the current game snapshot as JSON (start from it with --import).");
    println!("  help             Show this help message.");
    println!("  quit / exit      Leave; the game stays saved and can be resumed by id.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_and_moves_are_told_apart() {
        assert!(matches!(parse_user_input("e2e4"), Ok(UserInput::Move(_))));
        assert!(matches!(parse_user_input("moves g1"), Ok(UserInput::Highlight(_))));
        assert!(matches!(parse_user_input("RESIGN"), Ok(UserInput::Resign)));
        assert!(matches!(parse_user_input("export out.json"), Ok(UserInput::Export(_))));
        assert!(parse_user_input("moves").is_err());
        assert!(parse_user_input("z9z9").is_err());
    }

    #[test]
    fn args_take_config_and_game_id() {
        let args = ["--config", "chess.json", "1234"].into_iter().map(String::from);
        let parsed = parse_args(args).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("chess.json")));
        assert_eq!(parsed.resume, Some(GameId::new(1234)));
        let parsed = parse_args(["-i", "saved.json"].into_iter().map(String::from)).unwrap();
        assert_eq!(parsed.import, Some(PathBuf::from("saved.json")));
        assert!(parse_args(["--import"].into_iter().map(String::from)).is_err());
        assert!(parse_args(["nope"].into_iter().map(String::from)).is_err());
    }
}
