pub mod auth;
pub mod blob;
pub mod config;
pub mod error;
pub mod event;
pub mod memory;
pub mod store;
pub mod todo;
pub mod validate;

pub use auth::*;
pub use blob::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use store::*;
pub use todo::*;
pub use validate::*;

pub use memory::{MemoryAuthProvider, MemoryBlobStore, MemoryTodoStore};
