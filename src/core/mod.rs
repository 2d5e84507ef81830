pub mod poller;
pub mod resolver;

pub use crate::domain::model::{Appliance, Device, Signal, Target};
pub use crate::domain::ports::HubApi;
pub use crate::utils::error::Result;
pub use poller::{spawn_poller, DarknessPoller, PollHandle, PollOutcome, PollReport};
pub use resolver::resolve;
