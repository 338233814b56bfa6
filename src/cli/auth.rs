//! CLI auth command handlers for login, status, and logout.

use chrono::{DateTime, Duration, Local, Utc};

use super::PROFILE;
use crate::auth::store::{FileTokenStore, TokenStore};
use crate::auth::IdToken;
use crate::config::SpectraConfig;
use crate::error::Result;

fn store(config: &SpectraConfig) -> FileTokenStore {
    FileTokenStore::new(config.token_dir.clone())
}

/// Handle `spectra auth login <ID_TOKEN>`.
pub fn handle_login(config: &SpectraConfig, token: &str) -> Result<()> {
    let id_token = IdToken::new(token.trim().to_string());
    // Reject tokens that carry no usable identity before saving them.
    let identity = id_token.identity()?;
    if id_token.is_expired(Duration::zero()) {
        println!("⚠️  Token is already expired; saving anyway");
    }

    store(config).save(PROFILE, &id_token)?;

    let who = identity.email.as_deref().unwrap_or(&identity.uid);
    println!("✅ Signed in as {who}");
    Ok(())
}

/// Handle `spectra auth status`.
pub fn handle_status(config: &SpectraConfig) -> Result<()> {
    let Some(id_token) = store(config).load(PROFILE)? else {
        println!("❌ Not signed in");
        return Ok(());
    };

    let identity = id_token.identity()?;
    println!("User: {}", identity.uid);
    if let Some(name) = &identity.name {
        println!("Name: {name}");
    }
    if let Some(email) = &identity.email {
        println!("Email: {email}");
    }
    match id_token.expires_at {
        Some(at) if id_token.is_expired(Duration::zero()) => {
            println!("⚠️  Token expired at {}", local_time(at));
        }
        Some(at) => {
            println!("✅ Token valid until {}", local_time(at));
        }
        None => println!("✅ Token has no expiry"),
    }
    Ok(())
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Handle `spectra auth logout`.
pub fn handle_logout(config: &SpectraConfig) -> Result<()> {
    store(config).clear(PROFILE)?;
    println!("✅ Signed out");
    Ok(())
}
