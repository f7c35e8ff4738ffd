//! # Authentication Module
//!
//! Google account connection for the link core.
//!
//! ## Overview
//!
//! - [`LoginController`] runs the loopback OAuth 2.0 login (PKCE, S256) and
//!   persists the resulting credential
//! - [`CredentialStore`] keeps that credential in the platform secure store
//! - [`AuthorizedClientFactory`] hands out HTTP clients that attach a bearer
//!   token, refreshing it first when it has expired
//!
//! Only one login can be in flight per controller.

pub mod client;
pub mod credential_store;
pub mod error;
pub mod login;
pub mod oauth;
pub mod types;

pub use client::{AuthorizedClient, AuthorizedClientFactory};
pub use credential_store::CredentialStore;
pub use error::{AuthError, Result};
pub use login::{LoginController, LoginStart};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier, TokenGrant};
pub use types::{CredentialRecord, LoginPhase, ProviderKind, UNKNOWN_EMAIL};
