// Adapters layer: concrete implementations for external systems.

pub mod nature_remo;
pub mod server;

pub use nature_remo::NatureRemoClient;
