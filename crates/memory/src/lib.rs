//! Memory and persistence backends for the affinity engine.
//!
//! - [`session`]: working memory (L1), the per-session message window
//! - [`in_memory`]: map-backed state, episodic, and fact stores
//! - [`sqlite`]: episodic memory (FTS5) and user facts in SQLite
//! - [`durable`]: the SQLite relationship mirror with history and emotion logs
//! - [`noop`]: a durable store that keeps nothing

pub mod durable;
pub mod in_memory;
pub mod noop;
pub mod session;
pub mod sqlite;

pub use durable::SqliteDurableStore;
pub use in_memory::{InMemoryEpisodicStore, InMemoryFactStore, InMemoryStateStore};
pub use noop::NoopDurableStore;
pub use session::SessionStore;
pub use sqlite::{SqliteMemoryStore, connect};
