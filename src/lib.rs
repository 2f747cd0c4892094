// Library exports for testing and the `term-autolog` binary
//
// # Threading
//
// The monitor, the boundary filter and the identity registry run on one
// event-loop thread. The only other threads are the two pipeline workers,
// reached exclusively through their bounded queues.

/// Application version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod debug;

pub mod app;
pub mod boundary;
pub mod cli;
pub mod error;
pub mod identity;
pub mod menu;
pub mod monitor;
pub mod pipeline;
pub mod session;
pub mod surface;

pub use term_autolog_config as config;
