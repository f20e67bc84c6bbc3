//! Core ESMTP types.

mod address;
mod capability;
mod envelope;
mod reply;

pub use address::{Address, Mailbox};
pub use capability::{Capability, CapabilitySet};
pub use envelope::Envelope;
pub use reply::{Reply, ReplyCode};
