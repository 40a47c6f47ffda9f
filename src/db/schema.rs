use crate::db::connection::GraphDb;
use crate::AnalysisError;

/// Projection tables, relation tables, and novel_id indexes.
const SCHEMA_001: &str = include_str!("migrations/001_initial_schema.surql");

/// Apply the database schema to an initialized connection.
///
/// Safe to call multiple times; SurrealDB updates existing definitions
/// rather than failing.
pub async fn apply_schema(db: &GraphDb) -> Result<(), AnalysisError> {
    db.query(SCHEMA_001).await?;
    Ok(())
}
