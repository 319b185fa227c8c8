//! Application layer for the tacos session adapter.
//!
//! Composes the session repository, the remote HTTP seam and the decoders
//! into session-aware services, with [`OrderingGateway`] as the single
//! entry point.

pub mod gateway;
pub mod index_mapping;
pub mod session_locks;
pub mod session_store;
pub mod sweeper;
pub mod transport;

pub use gateway::{CartLine, OrderingGateway};
pub use index_mapping::IndexMappingStore;
pub use session_locks::SessionLocks;
pub use session_store::{Handshake, SessionStore};
pub use sweeper::spawn_sweeper;
pub use transport::{RemoteReply, TokenPage, Transport, fetch_token};
