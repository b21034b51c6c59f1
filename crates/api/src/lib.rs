//! Conductor API server library.
//!
//! Exposes config, state, the process engine, error handling and routes so
//! the binary and the integration tests share them.

pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
