#[allow(clippy::module_inception)]
pub mod actor;
pub mod fetcher;
pub mod messages;
pub mod spawn;

pub use actor::{Actor, ActorContext, ActorRef};
