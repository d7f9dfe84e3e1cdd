//! Clickety CLI: plays a click for every keypress until Ctrl-C.
//!
//! Usage:
//!   clickety [--voices n] [--bell] [--stop-after secs]
//!
//! Keys are read from stdin. Logging goes to stderr, filtered by `RUST_LOG`
//! (default `info`).

use clap::Parser;
use clickety::adapter::spawn_input_thread;
use clickety::{ctrl_c, Config, EventBridge, HookTable, KeyboardHook, Player, StopSource, StopToken};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "clickety",
    version,
    about = "Play a click on every keypress"
)]
struct Cli {
    /// Number of player voices used round-robin
    #[arg(long, default_value_t = clickety::config::DEFAULT_VOICES)]
    voices: usize,
    /// Ring the terminal bell on every click
    #[arg(long)]
    bell: bool,
    /// Stop after this many seconds, as if interrupted
    #[arg(long)]
    stop_after: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            voices: self.voices,
            bell: self.bell,
            stop_after: self.stop_after.map(Duration::from_secs),
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config: Config) -> Result<u64, String> {
    let exit = StopSource::new();

    // start
    let mut signals = EventBridge::new(StopToken::never(), ctrl_c(exit.clone()));
    let timer = config.stop_after.map(|delay| exit.request_stop_after(delay));

    let mut player = Player::new(config.voices, config.bell, Box::new(std::io::stdout()))
        .map_err(|e| format!("failed to create player: {}", e))?;
    player.start();

    let table = Arc::new(HookTable::new());
    let mut keyboard = EventBridge::new(exit.token(), KeyboardHook::new(table.clone()));
    let end_of_input = exit.clone();
    spawn_input_thread(table, std::io::stdin(), move || {
        end_of_input.request_stop();
    })
    .map_err(|e| format!("failed to start keyboard input: {}", e))?;

    tracing::info!("press ctrl-C to stop...");

    // click, until ctrl-C
    let clicked = clickety::clickety(&mut player, &keyboard).await;

    // stop
    keyboard.destroy().await;
    let destroyed = player.destroy();
    signals.destroy().await;
    if let Some(timer) = timer {
        timer.abort();
    }

    clicked.map_err(|e| format!("playback failed: {}", e))?;
    destroyed.map_err(|e| format!("failed to stop player: {}", e))?;
    Ok(player.clicks())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.into_config();
    if let Err(e) = config.validate() {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(version = clickety::VERSION, "main start");
    match rt.block_on(run(config)) {
        Ok(clicks) => {
            tracing::info!(clicks, "main exit");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
