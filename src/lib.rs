// Public API for the rig binary and integration tests

pub mod api;
pub mod broadcaster;
pub mod channel;
pub mod classify;
pub mod config;
pub mod platform;
pub mod protocol;
pub mod session;
pub mod status;
pub mod types;
pub mod viewer;
