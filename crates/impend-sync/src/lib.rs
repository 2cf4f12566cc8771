//! Optimistic mutation and live reconciliation for impend.
//!
//! The flow: a user action is applied to the in-memory collection first,
//! then sent to the store. Success is a quiet confirmation (the committed
//! row also comes back through the change feed); failure rolls the
//! optimistic change back. Independently, a feed subscriber pushes
//! remote-origin change events into the same collection, so every device
//! signed into the account converges on the store's view.

pub mod client;
pub mod command;
pub mod feed;
pub mod reconcile;
pub mod session;

pub use client::*;
pub use command::*;
pub use feed::*;
pub use reconcile::*;
pub use session::*;
