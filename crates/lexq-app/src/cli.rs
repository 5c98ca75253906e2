//! CLI argument definitions for the lexq binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lexq - answers dialog platform turns from a hosted QA service.
#[derive(Parser, Debug)]
#[command(name = "lexq", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Run a single turn from an event JSON file and print the response.
    Invoke {
        /// Event file, or `-` for stdin.
        #[arg(short = 'e', long = "event")]
        event: String,
    },
    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Priority: --config flag > LEXQ_CONFIG env var > ~/.lexq/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("LEXQ_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --port flag > LEXQ_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("LEXQ_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    /// Priority: --log-level flag > RUST_LOG > config file value.
    pub fn resolve_log_filter(&self, config_level: &str) -> String {
        if let Some(ref level) = self.log_level {
            return level.clone();
        }
        match std::env::var("RUST_LOG") {
            Ok(filter) if !filter.trim().is_empty() => filter,
            _ => config_level.to_string(),
        }
    }
}

fn default_config_path() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".lexq").join("config.toml"),
        Err(_) => PathBuf::from("config.toml"),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let args = CliArgs::try_parse_from(["lexq"]).unwrap();
        assert_eq!(args.command(), Command::Serve);
    }

    #[test]
    fn test_invoke_with_event() {
        let args = CliArgs::try_parse_from(["lexq", "invoke", "--event", "event.json"]).unwrap();
        assert_eq!(
            args.command(),
            Command::Invoke {
                event: "event.json".to_string()
            }
        );
    }

    #[test]
    fn test_invoke_requires_event() {
        assert!(CliArgs::try_parse_from(["lexq", "invoke"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "lexq", "serve", "--port", "9000", "--log-level", "debug", "-c", "/tmp/x.toml",
        ])
        .unwrap();
        assert_eq!(args.resolve_port(3040), 9000);
        assert_eq!(args.resolve_log_filter("info"), "debug");
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/x.toml"));
    }

    #[test]
    fn test_init_config_force() {
        let args = CliArgs::try_parse_from(["lexq", "init-config", "--force"]).unwrap();
        assert_eq!(args.command(), Command::InitConfig { force: true });
    }

    #[test]
    fn test_expand_home_plain_path() {
        assert_eq!(expand_home("/var/lib/lexq.db"), PathBuf::from("/var/lib/lexq.db"));
        assert_eq!(expand_home("relative.db"), PathBuf::from("relative.db"));
    }
}
