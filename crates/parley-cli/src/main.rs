use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parley_core::config::{Config, LoggingConfig};
use parley_gateway::GatewayState;

#[derive(Parser)]
#[command(
    name = "parley",
    about = "Voice conversation gateway: speech in, speech out",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to listen on (default: 8000)
        #[arg(long)]
        port: Option<u16>,

        /// Address to bind (default: 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show resolved configuration with secrets redacted
    Show,
    /// Verify that every provider has an API key
    Check,
}

/// Filter directives used when `RUST_LOG` is unset.
fn default_directives(logging: Option<&LoggingConfig>, verbose: bool) -> Vec<String> {
    let fallback = if verbose { "debug" } else { "info" };
    let level = logging
        .and_then(|l| l.level.clone())
        .unwrap_or_else(|| fallback.to_string());

    let mut directives = vec![level];
    if let Some(logging) = logging {
        directives.extend(logging.filters.iter().cloned());
    }
    directives
}

fn init_logging(logging: Option<&LoggingConfig>, verbose: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(logging, verbose).join(","))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.is_some_and(|l| l.format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let mut config = Config::load(&config_path)?;

    init_logging(config.logging.as_ref(), cli.verbose)?;

    match cli.command {
        Commands::Serve { port, bind } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }

            tracing::info!(
                config = %config_path.display(),
                stt = %config.transcription.provider,
                llm = %config.generation.model,
                "Starting Parley gateway"
            );

            let state = GatewayState::from_config(Arc::new(config))?;
            parley_gateway::start_gateway(Arc::new(state)).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config.redacted())?;
                println!("{json}");
            }
            ConfigAction::Check => {
                config.validate_keys()?;
                println!("Config: {}", config_path.display());
                println!("Transcription: {}", config.transcription.provider);
                println!("Generation: {}", config.generation.model);
                println!("Synthesis: {}", config.synthesis.voice_id);
                println!("All provider keys present");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(None, false), vec!["info"]);
        assert_eq!(default_directives(None, true), vec!["debug"]);
    }

    #[test]
    fn test_config_level_and_filters() {
        let logging = LoggingConfig {
            format: "json".into(),
            level: Some("warn".into()),
            filters: vec!["parley_gateway=debug".into(), "tower_http=info".into()],
        };
        assert_eq!(
            default_directives(Some(&logging), true),
            vec!["warn", "parley_gateway=debug", "tower_http=info"]
        );
        assert!(EnvFilter::try_new(default_directives(Some(&logging), false).join(",")).is_ok());
    }

    #[test]
    fn test_cli_parses_serve_overrides() {
        let cli = Cli::try_parse_from([
            "parley", "--verbose", "serve", "--port", "9000", "--bind", "127.0.0.1",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Serve { port, bind } => {
                assert_eq!(port, Some(9000));
                assert_eq!(bind.as_deref(), Some("127.0.0.1"));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_cli_parses_config_check() {
        let cli = Cli::try_parse_from(["parley", "config", "check", "-c", "/tmp/p.json"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/p.json"));
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Check
            }
        ));
    }
}
