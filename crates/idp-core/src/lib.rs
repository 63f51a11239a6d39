//! # idp-core
//!
//! Configuration, account handling and error types shared by the identity
//! provider crates.
//!
//! Configuration is built once at startup and shared read-only (typically
//! behind an `Arc`); nothing here holds mutable state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod config;
pub mod error;

pub use account::{Account, AccountList, Authenticator, UserProfile};
pub use config::{IdpConfig, SecretNames};
pub use error::{Error, Result};
