pub mod connection;
pub mod schema;
pub mod store;

pub use connection::{init_db, DbConfig, GraphDb};
pub use schema::apply_schema;
pub use store::{GraphStore, MemoryGraphStore, SurrealGraphStore};
