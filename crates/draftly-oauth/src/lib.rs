//! # draftly-oauth
//!
//! `OAuth2` plumbing for outbound mail: the token model, provider endpoints,
//! and the refresh-token exchange used to keep access tokens usable.
//!
//! Interactive login (authorization code / device flows) is handled by the
//! hosting application; this crate only turns a stored refresh token into a
//! fresh access token.
//!
//! ## Token Refresh
//!
//! ```ignore
//! use draftly_oauth::{OAuthClient, Provider};
//!
//! let client = OAuthClient::new("client_id", Provider::google()?)
//!     .with_client_secret("client_secret");
//!
//! let token = client.refresh_access_token("1//refresh-token").await?;
//! println!("expires at {:?}", token.expires_at);
//! ```
//!
//! A provider rejecting the grant surfaces as [`Error::OAuth`] with
//! `error == "invalid_grant"`; [`Error::is_invalid_grant`] checks for it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
pub mod provider;
pub mod token;

pub use client::OAuthClient;
pub use error::{Error, INVALID_GRANT, Result};
pub use provider::Provider;
pub use token::Token;
