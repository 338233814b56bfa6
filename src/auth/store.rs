use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::IdToken;

/// Storage abstraction for the signed-in user's ID token.
pub trait TokenStore: Send + Sync {
    fn load(&self, profile: &str) -> Result<Option<IdToken>, AuthError>;
    fn save(&self, profile: &str, token: &IdToken) -> Result<(), AuthError>;
    fn clear(&self, profile: &str) -> Result<(), AuthError>;
}

/// File-backed token store using one TOML file per profile.
///
/// # Example
/// ```no_run
/// use spectra::auth::{FileTokenStore, IdToken, TokenStore};
///
/// let store = FileTokenStore::new_default();
/// store.save("default", &IdToken::new("eyJ...".to_string()))?;
/// # Ok::<(), spectra::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_spectra_dir(),
        }
    }

    fn token_path(&self, profile: &str) -> PathBuf {
        self.base_dir
            .join(format!("token.{}.toml", normalize_label(profile)))
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, profile: &str) -> Result<Option<IdToken>, AuthError> {
        let path = self.token_path(profile);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: TokenFile = toml::from_str(&raw)?;
        Ok(Some(file.token))
    }

    fn save(&self, profile: &str, token: &IdToken) -> Result<(), AuthError> {
        let path = self.token_path(profile);
        Self::ensure_parent(&path)?;
        let file = TokenFile {
            version: 1,
            profile: profile.to_string(),
            token: token.clone(),
            saved_at: Utc::now(),
        };
        fs::write(&path, toml::to_string(&file)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<(), AuthError> {
        match fs::remove_file(self.token_path(profile)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

/// Process-local token store, the analogue of browser session storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, IdToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, profile: &str) -> Result<Option<IdToken>, AuthError> {
        Ok(self.tokens.lock().unwrap().get(profile).cloned())
    }

    fn save(&self, profile: &str, token: &IdToken) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .unwrap()
            .insert(profile.to_string(), token.clone());
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<(), AuthError> {
        self.tokens.lock().unwrap().remove(profile);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    profile: String,
    token: IdToken,
    saved_at: DateTime<Utc>,
}

/// `~/.spectra`, or `.spectra` when no home directory is known.
pub fn default_spectra_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".spectra"))
        .unwrap_or_else(|| PathBuf::from(".spectra"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileTokenStore) {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn saved_token_loads_back() {
        let (_dir, store) = temp_store();
        let token = IdToken {
            token: "abc".to_string(),
            expires_at: DateTime::from_timestamp(4_102_444_800, 0),
        };
        store.save("default", &token).unwrap();
        assert_eq!(store.load("default").unwrap(), Some(token));
    }

    #[test]
    fn missing_profile_loads_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load("work").unwrap(), None);
    }

    #[test]
    fn clear_removes_token_and_is_idempotent() {
        let (_dir, store) = temp_store();
        store
            .save("default", &IdToken::new("abc".to_string()))
            .unwrap();
        store.clear("default").unwrap();
        store.clear("default").unwrap();
        assert_eq!(store.load("default").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, store) = temp_store();
        store.save("default", &IdToken::new("abc".to_string())).unwrap();
        let mode = fs::metadata(dir.path().join("token.default.toml"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn labels_are_normalized() {
        assert_eq!(normalize_label("  "), "default");
        assert_eq!(normalize_label("Work Laptop"), "work-laptop");
        assert_eq!(normalize_label("///"), "default");
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        store.save("p", &IdToken::new("t".to_string())).unwrap();
        assert_eq!(store.load("p").unwrap().unwrap().token, "t");
        store.clear("p").unwrap();
        assert!(store.load("p").unwrap().is_none());
    }
}
