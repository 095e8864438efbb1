use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use tictactoe_client::config::ClientConfig;
use tictactoe_client::session::{Session, SessionEvent};
use tictactoe_client::ui::{Command, HELP, Notification, Scoreboard, render_screen};

#[tokio::main]
async fn main() {
    // Logs go to stderr so they don't interleave with the board on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tictactoe_client=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::from_env();
    if let Some(url) = url_arg() {
        config = config.with_server_url(url);
    }

    info!(
        "tictactoe-client v{} connecting to {}",
        env!("CARGO_PKG_VERSION"),
        config.server_url
    );

    let mut session = Session::new(&config);
    let mut score = Scoreboard::new();
    info!(session_id = %session.id(), "session created");
    session.open();
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("failed to read input: {e}");
                        break;
                    }
                };
                if !run_command(&mut session, &line).await {
                    break;
                }
            }
            Some(event) = session.next_event() => {
                on_event(&mut session, &mut score, event).await;
            }
        }
    }

    session.close().await;
    println!(
        "final score after {} games: computer {} | player {} | draws {}",
        score.games(),
        score.computer_wins,
        score.player_wins,
        score.draws
    );
}

/// Returns `false` when the user asked to quit.
async fn run_command(session: &mut Session, line: &str) -> bool {
    let Some(command) = Command::parse(line) else {
        println!("{HELP}");
        return true;
    };

    match command {
        Command::Choose(cell) => {
            if let Err(e) = session.submit_choice(cell) {
                println!("{}", Notification::for_rejection(&e));
            }
        }
        Command::Reset => match session.submit_reset() {
            Ok(()) => println!("{}", Notification::reset_sent()),
            Err(e) => println!("{}", Notification::for_rejection(&e)),
        },
        Command::Open => session.open(),
        Command::Close => session.close().await,
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

async fn on_event(session: &mut Session, score: &mut Scoreboard, event: SessionEvent) {
    if let SessionEvent::GameOver { winner, .. } = &event {
        score.record(*winner);
    }
    if let Some(notification) = Notification::for_event(&event) {
        println!("{notification}");
    }

    match event {
        SessionEvent::StateUpdated(_) | SessionEvent::GameOver { .. } => {
            print!("{}", render_screen(session.state(), session.phase(), score));
        }
        SessionEvent::Disconnected { .. } | SessionEvent::TransportError(_)
            if session.reconnect_policy().is_enabled() =>
        {
            match session.reconnect().await {
                Ok(()) => println!("{}", Notification::success("Reconnected.")),
                Err(e) => println!("{}", Notification::for_rejection(&e)),
            }
        }
        _ => {}
    }
}

/// `--url <ws-url>` or `--url=<ws-url>`.
fn url_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--url" {
            return args.next();
        }
        if let Some(url) = arg.strip_prefix("--url=") {
            return Some(url.to_string());
        }
    }
    None
}
