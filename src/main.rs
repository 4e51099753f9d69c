//! ProAcademics backend entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Connect storage (MongoDB, or memory without `MONGODB_URI`)
//!   6. Build the AI provider chain and services
//!   7. Seed admin account and starter content
//!   8. Spawn Ctrl-C → shutdown signal watcher
//!   9. Serve HTTP until shutdown

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use proacademics::config::{self, Config};
use proacademics::error::AppError;
use proacademics::llm::providers;
use proacademics::store::Backend;
use proacademics::{app, http, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present; the file is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some(), config.log_file.as_deref())?;

    info!(
        service = %config.service_name,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let backend = Backend::connect(&config.database).await?;
    let chain = providers::build_chain(&config.ai, &config.ai_credentials)?;
    if chain.is_empty() {
        warn!("no AI API keys configured; evaluation fails and chat uses canned replies");
    }

    let state = app::build_state(&config, &backend, chain);
    app::seed(&state, &config).await?;

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config, &state);

    http::serve(&config.server.bind, state, shutdown).await
}

fn print_startup_summary(config: &Config, state: &http::AppState) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 58;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let providers = state.chain.names();
    let ai_line = if providers.is_empty() { "none configured".to_string() } else { providers.join(" → ") };

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ ProAcademics backend                                         ║");
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║   {}║", fit(format!("listen:  http://{}", config.server.bind)));
    println!("║   {}║", fit(format!("storage: {} (db {})", state.storage, config.database.db_name)));
    println!("║   {}║", fit(format!("ai:      {ai_line}")));
    println!(
        "║   {}║",
        fit(format!(
            "lex:     {} questions/session, bands {}/{}",
            config.lex.session_length, config.lex.recent_band, config.lex.weak_band
        ))
    );
    println!("║   {}║", fit(format!("pid:     {}", std::process::id())));
    println!("╚══════════════════════════════════════════════════════════════╝");
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: proacademics [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    CliArgs { log_level: logger::verbosity_level(verbosity), config_path }
}
