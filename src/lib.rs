//! Donatify client: session management and REST access for the Donatify
//! volunteering/donation API.
//!
//! SYSTEM CONTEXT
//! ==============
//! The remote API owns all persistent state. This crate keeps a local bearer
//! token (see [`storage`]), turns it into a user identity through the
//! [`session`] store, and derives which screen group a front end should mount
//! through the [`router`]. The [`api`] module wraps every consumed endpoint.

pub mod api;
pub mod config;
pub mod router;
pub mod session;
pub mod storage;
pub mod validation;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use session::{SessionError, SessionState, SessionStore};
