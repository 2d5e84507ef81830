// Domain layer: hub models and the port the core talks to.

pub mod model;
pub mod ports;
