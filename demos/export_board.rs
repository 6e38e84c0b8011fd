//! Export boards to a local directory
//!
//! This example demonstrates the core functionality of trello-dump:
//! - Loading API credentials from the environment (or a `.env` file)
//! - Reading board IDs from stdin, one per line, or from the first argument
//! - Subscribing to progress events
//! - Running the export with signal handling
//!
//! ```text
//! export TRELLGO_APIKEY=... TRELLGO_APITOK=...
//! echo 5f1b2c3d4e5f6a7b8c9d0e1f | cargo run --example export_board -- "" ./backup
//! cargo run --example export_board -- 5f1b2c3d4e5f6a7b8c9d0e1f ./backup < /dev/null
//! ```

use std::io::IsTerminal;
use trello_dump::config::{ApiCredentials, Config, ExportConfig, read_board_ids};
use trello_dump::{Event, Exporter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trello_dump=info".into()),
        )
        .init();
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let board_arg = args.next();
    let storage_dir = args.next().unwrap_or_else(|| "trello-backup".to_string());

    let stdin = std::io::stdin();
    let board_ids = if stdin.is_terminal() {
        read_board_ids(std::io::empty(), board_arg.as_deref())?
    } else {
        read_board_ids(stdin.lock(), board_arg.as_deref())?
    };

    let (credentials, base_url) = ApiCredentials::from_env()?;
    let mut config = Config {
        board_ids,
        export: ExportConfig {
            storage_dir: storage_dir.into(),
            include_archived: std::env::var("INCLUDE_ARCHIVED").is_ok(),
            split_archived: std::env::var("SPLIT_ARCHIVED").is_ok(),
            ..Default::default()
        },
        ..Default::default()
    };
    config.api.credentials = credentials;
    if let Some(url) = base_url {
        config.api.base_url = url;
    }

    let board_ids = config.board_ids.clone();
    let exporter = Exporter::connect(config)?;

    // Card counts first, the way a dry run would report them
    for board_id in &board_ids {
        let counts = exporter.count_cards(board_id).await?;
        println!(
            "Board {}: {} open, {} archived, {} total",
            board_id, counts.open, counts.archived, counts.total
        );
    }

    // Progress subscriber
    let mut events = exporter.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::BoardStarted { board_id } => println!("Exporting board {}", board_id),
                Event::Progress {
                    processed, total, ..
                } => println!("  processed {}/{}", processed, total),
                Event::CardFailed { card_id, error } => {
                    println!("  ✗ card {} failed: {}", card_id, error)
                }
                Event::BoardExported {
                    name,
                    cards,
                    failed,
                    ..
                } => println!("✓ {} done ({} cards, {} failed)", name, cards, failed),
                Event::BoardFailed { board_id, error } => {
                    println!("✗ board {} failed: {}", board_id, error)
                }
                Event::CardExported { .. } => {}
            }
        }
    });

    let status = trello_dump::run_until_signal(&exporter).await?;

    println!();
    println!("Boards processed:");
    for board in &status.processed_boards {
        println!("  {}", board);
    }
    if status.cancelled {
        println!("Export was cancelled before all boards finished");
    }
    if status.had_errors {
        println!(
            "Export finished with {} errors, see the log output above",
            status.error_count
        );
        std::process::exit(1);
    }
    Ok(())
}
