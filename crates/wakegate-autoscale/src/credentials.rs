//! Bearer token sources for the Kubernetes API.

use std::path::Path;

use tracing::warn;

/// Supplies the bearer token for each scale request.
///
/// Consulted on every call, so a token that appears or rotates while the
/// process runs is picked up without a restart.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Reads the token from an environment variable, falling back to a file
/// whose path is named by a second variable (e.g. the mounted service
/// account token).
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    token_var: String,
    token_file_var: String,
}

impl EnvCredentials {
    pub fn new(token_var: &str, token_file_var: &str) -> Self {
        Self {
            token_var: token_var.to_string(),
            token_file_var: token_file_var.to_string(),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new("KUBE_CLUSTER_TOKEN", "KUBE_CLUSTER_TOKEN_FILE")
    }
}

impl CredentialSource for EnvCredentials {
    fn bearer_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var(&self.token_var)
            && !token.is_empty()
        {
            return Some(token);
        }
        let path = std::env::var(&self.token_file_var).ok()?;
        read_token_file(Path::new(&path))
    }
}

/// Read and trim a token file. Empty or unreadable files yield `None`.
pub fn read_token_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let token = contents.trim();
            (!token.is_empty()).then(|| token.to_string())
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read token file");
            None
        }
    }
}

/// A fixed token, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
