//! Outbound-mail credentials and the refresher that keeps them usable.
//!
//! Only the [`CredentialRefresher`] mutates stored credentials; the send
//! executor reads them and asks the refresher for a fresh access token when
//! the transport rejects a stale one.

mod cipher;
mod model;
mod refresher;
pub mod repository;

pub use cipher::{PlaintextCipher, SecretCipher};
pub use model::{AuthProvider, Credential, NewCredential};
pub use refresher::{CredentialRefresher, TokenExchange};
