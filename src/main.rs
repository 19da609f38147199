use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use meccabbs::bbs::{roles, BbsServer, Session, SessionContext};
use meccabbs::config::{Config, LoggingConfig};
use meccabbs::mecca::{CompiledTemplate, Hangup, Interpreter, RunOutcome, TemplateStore};

#[derive(Parser)]
#[command(name = "meccabbs")]
#[command(about = "A telnet-style BBS driven by MECCA display templates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the BBS server
    Start {
        /// Listen address override (e.g., 0.0.0.0:2323)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Initialize a new BBS configuration
    Init,
    /// Compile a template file and print a JSON summary
    Check {
        /// Template source file
        file: PathBuf,
    },
    /// Run a template from the template root against this terminal
    Render {
        /// Template name relative to the template root (e.g., misc/logo)
        name: String,
        /// User name the template sees
        #[arg(short, long, default_value = "Sysop")]
        user: String,
    },
    /// Show BBS status and template statistics
    Status,
}

fn init_logging(verbose: u8, logging: Option<&LoggingConfig>) {
    let log_level = match verbose {
        0 => logging.map(|l| l.level.as_str()).unwrap_or("info"),
        1 => "debug",
        _ => "trace",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level));
    if let Some(path) = logging.and_then(|l| l.file.as_deref()) {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", path, e),
        }
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config).await;
    // Check and render write to the terminal, so only the server logs to a file
    let logging = match (&cli.command, &loaded) {
        (Commands::Start { .. }, Ok(config)) => Some(config.logging.clone()),
        (_, Ok(config)) => Some(LoggingConfig { level: config.logging.level.clone(), file: None }),
        _ => None,
    };
    init_logging(cli.verbose, logging.as_ref());

    info!("Starting MeccaBBS v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Start { bind } => {
            let mut config = loaded?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let bbs = BbsServer::new(config).await?;
            info!("BBS server starting...");
            bbs.run().await?;
        }
        Commands::Init => {
            info!("Initializing new BBS configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Check { file } => {
            let source = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| anyhow!("Failed to read template {}: {}", file.display(), e))?;
            let name = file.file_stem().and_then(|s| s.to_str()).unwrap_or("template").to_string();
            let (ok, payload) = match CompiledTemplate::compile(&name, &source) {
                Ok(template) => {
                    let mut labels: Vec<_> = template.labels().iter().collect();
                    labels.sort_by_key(|(_, idx)| **idx);
                    let labels: Vec<_> = labels
                        .into_iter()
                        .map(|(l, idx)| serde_json::json!({ "name": l, "index": idx }))
                        .collect();
                    let payload = serde_json::json!({
                        "status": "ok",
                        "template": name,
                        "instructions": template.len(),
                        "labels": labels,
                    });
                    (true, payload)
                }
                Err(e) => (
                    false,
                    serde_json::json!({
                        "status": "error",
                        "template": name,
                        "error": e.to_string(),
                    }),
                ),
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Render { name, user } => {
            let config = loaded.unwrap_or_else(|e| {
                warn!("{}; rendering with default configuration", e);
                Config::default()
            });
            let store = Arc::new(TemplateStore::with_root(&config.mecca.template_root));
            let interpreter = Interpreter::new(store).with_charset(config.mecca.charset);

            let mut session =
                Session::new(0, "127.0.0.1".to_string(), config.server.session_timeout);
            session.login(user, roles::LEVEL_SYSOP);
            let context = SessionContext::new(&config.bbs, &session);

            let (hangup_tx, hangup) = Hangup::channel();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = hangup_tx.send(true);
                }
            });
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let report = interpreter
                .run(&name, Arc::new(context), stdin, tokio::io::stdout(), hangup)
                .await;
            match report.outcome {
                RunOutcome::Aborted(e) => {
                    error!("Template {} aborted: {}", name, e);
                    std::process::exit(1);
                }
                outcome => info!("Template {} finished: {:?}", name, outcome),
            }
        }
        Commands::Status => {
            let bbs = BbsServer::new(loaded?).await?;
            bbs.show_status().await?;
        }
    }

    Ok(())
}
