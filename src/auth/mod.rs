//! ID tokens, token storage, and credential resolution.

pub mod credentials;
pub mod error;
pub mod store;
pub mod token;

pub use credentials::{CredentialSource, Credentials, StaticCredentials, StoredCredentials};
pub use error::AuthError;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{IdToken, Identity};
