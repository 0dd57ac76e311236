//! Use cases (interactors) for drivesync
//!
//! Use cases are thin coordinators that delegate I/O to ports.
//!
//! - [`AuthenticateUseCase`] - Token loading, refresh, interactive login, logout

pub mod authenticate;

pub use authenticate::{AuthenticateUseCase, ObtainedTokens, TokenSource};
