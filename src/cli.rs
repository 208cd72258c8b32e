//! Command line: `serve` runs the listener, `invoke` answers events from stdin or a file.

use crate::adapter::{serve, Invoker};
use crate::app::build_app;
use crate::config::{resolve_db_path, Settings};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// JSON-file-backed REST mock server
#[derive(Parser, Debug)]
#[command(name = "mockrest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the document over HTTP until interrupted
    Serve {
        #[command(flatten)]
        common: CommonArgs,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Answer invocation events: one JSON event per line on stdin, or one from --event
    Invoke {
        #[command(flatten)]
        common: CommonArgs,
        /// Read a single event from this file instead of stdin
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

/// Flags shared by both commands; each overrides its `MOCKREST_*` variable.
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Path to the JSON document
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// Rewrite table file (JSON object of pattern -> target)
    #[arg(long)]
    pub routes: Option<PathBuf>,
    /// Name of the id field
    #[arg(long = "id")]
    pub id_field: Option<String>,
    /// Reject every request that is not GET, HEAD or OPTIONS
    #[arg(long)]
    pub read_only: bool,
    /// Keep changes in memory only
    #[arg(long)]
    pub no_persist: bool,
    /// Disable CORS headers
    #[arg(long)]
    pub no_cors: bool,
}

impl CommonArgs {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(db) = &self.db {
            settings.db_path = resolve_db_path(db);
        }
        if let Some(routes) = &self.routes {
            settings.routes_path = Some(routes.clone());
        }
        if let Some(id_field) = &self.id_field {
            settings.id_field = id_field.clone();
        }
        settings.read_only |= self.read_only;
        settings.persist &= !self.no_persist;
        settings.cors &= !self.no_cors;
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mockrest=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Parse arguments and run the selected command.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();
    let mut settings = Settings::from_env()?;

    match cli.command {
        Command::Serve { common, host, port } => {
            common.apply(&mut settings);
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            let app = build_app(&settings).await?;
            serve(app, &settings.bind_addr()).await?;
        }
        Command::Invoke { common, event } => {
            common.apply(&mut settings);
            let invoker = Invoker::from_settings(&settings).await?;
            match event {
                Some(path) => {
                    let text = tokio::fs::read_to_string(&path).await?;
                    let res = invoker.invoke_json(&text).await;
                    println!("{}", serde_json::to_string(&res)?);
                }
                None => {
                    let handled = invoker
                        .run_lines(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                        .await?;
                    tracing::info!(handled, "stdin closed");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "mockrest",
            "serve",
            "--db",
            "/tmp/x.json",
            "--id",
            "_id",
            "--read-only",
            "--no-persist",
            "-p",
            "4000",
        ])
        .unwrap();
        let Command::Serve { common, port, .. } = cli.command else {
            panic!("expected serve");
        };
        let mut settings = Settings::default();
        common.apply(&mut settings);
        assert_eq!(settings.db_path, PathBuf::from("/tmp/x.json"));
        assert_eq!(settings.id_field, "_id");
        assert!(settings.read_only);
        assert!(!settings.persist);
        assert!(settings.cors);
        assert_eq!(port, Some(4000));
    }

    #[test]
    fn invoke_takes_event_file() {
        let cli = Cli::try_parse_from(["mockrest", "invoke", "--event", "e.json", "--no-cors"]).unwrap();
        let Command::Invoke { common, event } = cli.command else {
            panic!("expected invoke");
        };
        assert_eq!(event, Some(PathBuf::from("e.json")));
        assert!(common.no_cors);
    }
}
