use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use goalscope_service::{FileTokenSource, StaticToken, TokenSource};

#[derive(Debug, Clone, Parser)]
#[command(name = "goalscope", about = "Terminal client for SMART goal tracking")]
pub struct Config {
    /// Backend API base URL
    #[arg(long, env = "GOALSCOPE_API_URL", default_value = "http://127.0.0.1:4200/api")]
    pub server_url: String,

    /// Bearer token for the backend
    #[arg(long, env = "GOALSCOPE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// File holding the bearer token. Re-read when the backend rejects the
    /// current token.
    #[arg(long, env = "GOALSCOPE_TOKEN_FILE", conflicts_with = "access_token")]
    pub token_file: Option<PathBuf>,

    /// Where tracing output goes; the terminal belongs to the UI.
    #[arg(long, env = "GOALSCOPE_LOG_FILE", default_value = "goalscope.log")]
    pub log_file: PathBuf,

    /// UI tick in milliseconds. Drives debounce and timed dismissals.
    #[arg(long, default_value = "100")]
    pub tick_ms: u64,
}

impl Config {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }

    pub fn token_source(&self) -> Result<Arc<dyn TokenSource>> {
        match &self.token_file {
            Some(path) => {
                let source = FileTokenSource::open(path)
                    .with_context(|| format!("failed to read token file {}", path.display()))?;
                Ok(Arc::new(source))
            }
            None => Ok(Arc::new(StaticToken::new(self.access_token.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["goalscope"]);
        assert_eq!(config.tick(), Duration::from_millis(100));
        assert_eq!(config.log_file, PathBuf::from("goalscope.log"));
        assert!(config.token_file.is_none());
    }

    #[test]
    fn token_flag_and_file_conflict() {
        let result = Config::try_parse_from([
            "goalscope",
            "--access-token",
            "abc",
            "--token-file",
            "/tmp/token",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn static_token_from_flag() {
        let config = Config::parse_from(["goalscope", "--access-token", "abc"]);
        let tokens = config.token_source().unwrap();
        assert_eq!(tokens.token().as_deref(), Some("abc"));
    }
}
