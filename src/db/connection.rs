use std::path::Path;

use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;

use crate::AnalysisError;

/// Unified database handle. Works with embedded, in-memory, and remote
/// SurrealDB engines.
pub type GraphDb = Surreal<Any>;

const NAMESPACE: &str = "mailuo";
const DATABASE: &str = "novels";

/// Graph store connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DbConfig {
    /// Embedded RocksDB (default). Single-process access.
    Embedded {
        /// Overrides the default path under the data directory.
        #[serde(default)]
        path: Option<String>,
    },
    /// Transient in-memory engine, used by tests.
    Memory,
    /// Remote SurrealDB server via WebSocket.
    Remote { endpoint: String },
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::Embedded { path: None }
    }
}

/// Initialize and connect to the graph database.
pub async fn init_db(config: &DbConfig, data_path: &Path) -> Result<GraphDb, AnalysisError> {
    let db = match config {
        DbConfig::Embedded { path } => {
            let db_path = path
                .as_deref()
                .map(String::from)
                .unwrap_or_else(|| data_path.to_string_lossy().into_owned());
            surrealdb::engine::any::connect(format!("rocksdb:{db_path}")).await?
        }
        DbConfig::Memory => surrealdb::engine::any::connect("mem://").await?,
        DbConfig::Remote { endpoint } => {
            let db = surrealdb::engine::any::connect(endpoint).await?;
            let user = std::env::var("MAILUO_DB_USER").unwrap_or_else(|_| "root".to_string());
            let pass = std::env::var("MAILUO_DB_PASS").unwrap_or_else(|_| "root".to_string());
            db.signin(surrealdb::opt::auth::Root {
                username: &user,
                password: &pass,
            })
            .await?;
            db
        }
    };
    db.use_ns(NAMESPACE).use_db(DATABASE).await?;
    Ok(db)
}
