//! Domain records exchanged with the remote API.
//!
//! Field names follow the wire format of the auth, factions and forum namespaces.

mod faction;
mod post;
mod statistic;
mod user;

pub use faction::*;
pub use post::*;
pub use statistic::*;
pub use user::*;
