//! CampusKart core types, token storage and session state

pub mod error;
pub mod session;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use session::{ExpiryListener, Session, TokenPair};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::*;
