//! Smart Bookmark: a private, real-time personal bookmark manager.
//!
//! Identity, persistence and change notification sit behind collaborator
//! traits in [`services`]; the view components in [`managers`] only talk to
//! those traits. This library crate exposes all modules for the binary and
//! integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
