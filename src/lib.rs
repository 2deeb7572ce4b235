// Library exports for autoxdcc
// The presentation layer (bot frontend, HTTP webhook receiver) lives
// elsewhere; this crate is the session engine and relay transport only.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod model;
pub mod notify;
pub mod relay;
pub mod runtime;
