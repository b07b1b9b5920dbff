//! # Store Module
//!
//! Persistence seams of the pipeline.
//!
//! ## Components
//! - `traits`: `ExampleStore` and `InteractionLog` capabilities
//! - `sqlite`: SQLite-backed implementations with bounded timeouts
//! - `memory`: in-process implementations for tests and embedding

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::{InMemoryExampleStore, InMemoryInteractionLog};
pub use sqlite::{SqliteExampleStore, SqliteInteractionLog};
pub use traits::{ExampleStore, InteractionLog};
