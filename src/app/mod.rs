pub mod invocation;

pub use invocation::{start_polling, EnvLookup, InvocationContext, RequestReply};
