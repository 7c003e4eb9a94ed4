use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::ServiceError;

/// Supplies the bearer token for backend calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current token, if any.
    fn token(&self) -> Option<String>;

    /// Obtain a fresh token after the backend rejected the current one.
    async fn refresh(&self) -> Result<(), ServiceError>;
}

/// A fixed token. It cannot be refreshed.
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.is_empty()))
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }

    async fn refresh(&self) -> Result<(), ServiceError> {
        Err(ServiceError::Unauthorized(
            "static access token cannot be refreshed".into(),
        ))
    }
}

/// A token kept in a file that another process rewrites. Refreshing re-reads
/// the file.
pub struct FileTokenSource {
    path: PathBuf,
    current: RwLock<Option<String>>,
}

impl FileTokenSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let path = path.into();
        let token = read_token(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(token),
        })
    }
}

fn read_token(path: &PathBuf) -> Result<Option<String>, ServiceError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ServiceError::Unauthorized(format!("read {}: {e}", path.display())))?;
    let token = raw.trim();
    Ok((!token.is_empty()).then(|| token.to_string()))
}

#[async_trait]
impl TokenSource for FileTokenSource {
    fn token(&self) -> Option<String> {
        self.current.read().ok().and_then(|t| t.clone())
    }

    async fn refresh(&self) -> Result<(), ServiceError> {
        let path = self.path.clone();
        let fresh = tokio::task::spawn_blocking(move || read_token(&path))
            .await
            .map_err(|e| ServiceError::Internal(format!("token refresh task: {e}")))??;
        let changed = fresh != self.token();
        if !changed {
            warn!(path = %self.path.display(), "token file unchanged on refresh");
            return Err(ServiceError::Unauthorized("token was not renewed".into()));
        }
        match self.current.write() {
            Ok(mut slot) => *slot = fresh,
            Err(_) => return Err(ServiceError::Internal("token lock poisoned".into())),
        }
        debug!(path = %self.path.display(), "access token reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_never_refreshes() {
        let source = StaticToken::new(Some("abc".into()));
        assert_eq!(source.token().as_deref(), Some("abc"));
        assert!(matches!(
            source.refresh().await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert_eq!(StaticToken::new(Some(String::new())).token(), None);
    }

    #[tokio::test]
    async fn file_token_rereads_on_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "first\n").unwrap();

        let source = FileTokenSource::open(&path).unwrap();
        assert_eq!(source.token().as_deref(), Some("first"));

        assert!(source.refresh().await.is_err());

        std::fs::write(&path, "second").unwrap();
        source.refresh().await.unwrap();
        assert_eq!(source.token().as_deref(), Some("second"));
    }
}
