//! drivesync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RemoteId`, `SyncPath`, `LocalFile`, `RemoteIndex`
//! - **Use cases** - `AuthenticateUseCase`
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `IAuthProvider`,
//!   `ITokenStore`, `ISyncObserver`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`drivesync-drive` for Google Drive, `drivesync-sync` for the engine).

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
