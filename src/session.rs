// Session store - explicit owner of the bearer credential
//
// The credential is replaced wholesale, never mutated in place. Whether it
// survives the process is a persistence detail behind this type: the TUI and
// CLI use a token file under ~/.config/labelscan/, tests use an in-memory
// store.

use std::path::PathBuf;

/// Holds the current authentication credential, if any.
#[derive(Debug)]
pub struct SessionStore {
    credential: Option<String>,
    token_path: Option<PathBuf>,
}

impl SessionStore {
    /// Store with no persistence. Starts empty.
    pub fn in_memory() -> Self {
        Self {
            credential: None,
            token_path: None,
        }
    }

    /// Store backed by a token file. An existing token is loaded eagerly so
    /// a previous login survives a restart.
    pub fn with_persistence(token_path: PathBuf) -> Self {
        let credential = match std::fs::read_to_string(&token_path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    None
                } else {
                    tracing::debug!(path = %token_path.display(), "loaded persisted credential");
                    Some(token.to_string())
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %token_path.display(), error = %e, "could not read token file");
                None
            }
        };

        Self {
            credential,
            token_path: Some(token_path),
        }
    }

    /// Default token file location: ~/.config/labelscan/token
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn default_token_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("labelscan").join("token"))
    }

    /// Replace the stored credential.
    pub fn set_credential(&mut self, token: String) {
        self.credential = Some(token);
        self.persist();
        tracing::info!("credential stored");
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Remove the credential, both in memory and on disk.
    pub fn clear_credential(&mut self) {
        if self.credential.take().is_some() {
            tracing::info!("credential cleared");
        }
        if let Some(path) = &self.token_path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove token file");
                }
            }
        }
    }

    fn persist(&self) {
        let (Some(path), Some(token)) = (&self.token_path, &self.credential) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "could not create token directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(path, token) {
            tracing::warn!(path = %path.display(), error = %e, "could not persist credential");
        }
    }
}
