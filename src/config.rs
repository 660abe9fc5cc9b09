//! Configuration for the policy verdict service
//!
//! CLI arguments with environment variable fallbacks using clap. A `.env`
//! file is loaded by the binary before parsing.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::auth::jwt::MIN_SECRET_LEN;

/// Where saved predictions (and accounts) are kept
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryBackend {
    /// MongoDB collections `predicciones` and `usuarios`
    Mongo,
    /// One JSON file for history, accounts in memory
    File,
    /// Everything in process memory
    Memory,
}

impl HistoryBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mongo => "mongo",
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Policy verdict - outcome prediction for public policy proposals
#[derive(Parser, Debug, Clone)]
#[command(name = "policy-verdict")]
#[command(about = "Predicts, suggests and records public policy outcomes")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Trained model artifact (JSON)
    #[arg(long, env = "MODEL_PATH", default_value = "model/policy_model.json")]
    pub model_path: PathBuf,

    /// Reference corpus of evaluated policies (delimited text)
    #[arg(long, env = "CORPUS_PATH", default_value = "data/politicas.csv")]
    pub corpus_path: PathBuf,

    /// Text encoding label of the corpus file
    #[arg(long, env = "CORPUS_ENCODING", default_value = "latin1")]
    pub corpus_encoding: String,

    /// Column delimiter of the corpus file
    #[arg(long, env = "CORPUS_DELIMITER", default_value = ";")]
    pub corpus_delimiter: char,

    /// History storage backend
    #[arg(long, env = "HISTORY_BACKEND", value_enum, default_value = "mongo")]
    pub history_backend: HistoryBackend,

    /// History file, used by the file backend
    #[arg(long, env = "HISTORY_FILE", default_value = "data/history.json")]
    pub history_file: PathBuf,

    /// MongoDB connection URI
    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGO_DB", default_value = "politicas_db")]
    pub mongo_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET_KEY")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (dev JWT secret, in-memory fallback)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET_KEY is required in production mode".to_string()),
                Some(secret) if secret.len() < MIN_SECRET_LEN => {
                    return Err(format!(
                        "JWT_SECRET_KEY must be at least {} characters",
                        MIN_SECRET_LEN
                    ))
                }
                Some(_) => {}
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be positive".to_string());
        }

        if !self.corpus_delimiter.is_ascii() {
            return Err("CORPUS_DELIMITER must be a single ASCII character".to_string());
        }

        if self.history_backend == HistoryBackend::File
            && self.history_file.as_os_str().is_empty()
        {
            return Err("HISTORY_FILE is required for the file backend".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-production-secret-of-32-characters!!";

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["policy-verdict"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--jwt-secret", SECRET]);
        assert_eq!(args.listen.to_string(), "127.0.0.1:5000");
        assert_eq!(args.mongo_db, "politicas_db");
        assert_eq!(args.corpus_delimiter, ';');
        assert_eq!(args.history_backend, HistoryBackend::Mongo);
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_secret_required_outside_dev_mode() {
        // Ignore any secret exported in the test environment
        let mut args = parse(&[]);
        args.jwt_secret = None;
        assert!(args.validate().is_err());

        args.jwt_secret = Some("short".into());
        assert!(args.validate().is_err());

        args.dev_mode = true;
        args.jwt_secret = None;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_backend_and_format_values() {
        let args = parse(&[
            "--jwt-secret",
            SECRET,
            "--history-backend",
            "file",
            "--log-format",
            "json",
        ]);
        assert_eq!(args.history_backend, HistoryBackend::File);
        assert_eq!(args.log_format, LogFormat::Json);

        let argv = ["policy-verdict", "--history-backend", "redis"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let args = parse(&["--jwt-secret", SECRET, "--corpus-delimiter", "¦"]);
        assert!(args.validate().is_err());
    }
}
