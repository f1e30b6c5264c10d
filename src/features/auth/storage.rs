//! Durable single-slot storage for the bearer credential.
//!
//! The store is a plain key-value cell under one fixed key, `token`. It
//! performs no validation and no network calls. Read failures count as "no credential";
//! write failures are logged and swallowed so they never break a session
//! transition.

use crate::features::auth::token::Credential;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::{debug, warn};

pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: &Credential);
    fn clear(&self);
}

/// In-process store for tests and hosts without durable storage.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credential> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credential: &Credential) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
    }

    fn clear(&self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCredential {
    token: String,
}

/// JSON file holding `{"token": "<bearer>"}`. Survives process restarts.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> io::Result<Option<Credential>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let stored: StoredCredential = serde_json::from_str(&raw)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Ok(Credential::parse(&stored.token))
    }

    fn write(&self, credential: &Credential) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec(&StoredCredential {
            token: credential.expose().to_string(),
        })
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        // Write to a sibling file first so a crash never leaves a torn token.
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmp)?;
            file.write_all(&payload)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credential> {
        match self.read() {
            Ok(credential) => credential,
            Err(err) => {
                warn!(path = %self.path.display(), "failed to read credential: {err}");
                None
            }
        }
    }

    fn set(&self, credential: &Credential) {
        match self.write(credential) {
            Ok(()) => debug!(path = %self.path.display(), "credential stored"),
            Err(err) => warn!(path = %self.path.display(), "failed to store credential: {err}"),
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "credential cleared"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), "failed to clear credential: {err}"),
        }
    }
}
