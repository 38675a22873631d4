use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::{Credential, CredentialStore};

/// Owner of the current credential, shared by the start screen and every
/// conversation view.
///
/// The in-memory value is authoritative; the store only mirrors it. Readers
/// can [`subscribe`](SessionContext::subscribe) to be told when it changes,
/// e.g. when a 401 clears it.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    store: CredentialStore,
    current: watch::Sender<Option<Credential>>,
}

impl SessionContext {
    /// Seeds the context from whatever the store holds.
    pub fn load(store: CredentialStore) -> Self {
        let initial = store.load();
        let (current, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner { store, current }),
        }
    }

    /// A context with no durable storage behind it.
    pub fn in_memory() -> Self {
        Self::load(CredentialStore::in_memory())
    }

    pub fn current(&self) -> Option<Credential> {
        self.inner.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    pub fn set(&self, credential: Credential) {
        self.inner.store.save(&credential);
        self.inner.current.send_replace(Some(credential));
    }

    pub fn clear(&self) {
        self.inner.store.clear();
        if self.inner.current.send_replace(None).is_some() {
            info!("Stored credential cleared");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.inner.current.subscribe()
    }
}
