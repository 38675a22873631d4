mod backend;
mod context;

use std::fmt;

use tracing::{debug, warn};

pub use backend::{CredentialBackend, FileBackend, MemoryBackend};
pub use context::SessionContext;

/// Fixed key the access code is stored under.
pub const CREDENTIAL_STORAGE_KEY: &str = "passgate-session-password";

/// A trimmed, non-empty access code. Its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trims `raw`; returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Credential(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Load/save/clear for the single persisted credential.
///
/// Backend failures are logged and swallowed: without working storage the
/// credential simply lives in memory (see [`SessionContext`]).
pub struct CredentialStore {
    backend: Option<Box<dyn CredentialBackend>>,
}

impl CredentialStore {
    pub fn new(backend: impl CredentialBackend + 'static) -> Self {
        Self { backend: Some(Box::new(backend)) }
    }

    /// A store with no durable backend.
    pub fn in_memory() -> Self {
        Self { backend: None }
    }

    pub fn load(&self) -> Option<Credential> {
        let backend = self.backend.as_ref()?;
        match backend.read(CREDENTIAL_STORAGE_KEY) {
            Ok(value) => value.as_deref().and_then(Credential::parse),
            Err(e) => {
                warn!("Failed to read stored credential, continuing without it: {e}");
                None
            }
        }
    }

    pub fn save(&self, credential: &Credential) {
        let Some(backend) = &self.backend else {
            return;
        };
        match backend.write(CREDENTIAL_STORAGE_KEY, credential.expose()) {
            Ok(()) => debug!("Credential persisted"),
            Err(e) => warn!("Failed to persist credential, keeping it in memory only: {e}"),
        }
    }

    pub fn clear(&self) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(e) = backend.remove(CREDENTIAL_STORAGE_KEY) {
            warn!("Failed to remove stored credential: {e}");
        }
    }
}
