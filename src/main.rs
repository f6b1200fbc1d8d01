mod cli;
mod engine;
mod error;
mod install;
mod launcher;
mod model;
mod orchestrator;
mod project;
mod settings;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

/// Log to stderr, filtered by `RUST_LOG` (warnings only by default).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_silent = args.silent;
    let is_non_tui = args.silent || args.json || args.text || cfg!(not(feature = "tui"));

    // A subscriber writing to stderr would scribble over the TUI's alternate screen.
    if is_non_tui {
        init_tracing();
    }

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success; the editor we spawned must not hold us up.
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_silent {
                println!("{:#}", e);
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
