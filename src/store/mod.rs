pub mod memory;
pub mod mysql;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::error::StoreError;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Read-only access to the grade_range / grade_personality tables.
///
/// Both lookups return the first matching row, if any. Overlapping ranges or
/// patterns are a data problem; whichever row the backend yields first wins.
#[async_trait]
pub trait GradeStore: Send + Sync {
    /// Grade whose range satisfies `min_avg <= average <= max_avg`
    async fn grade_for_average(&self, average: f64) -> Result<Option<String>, StoreError>;

    /// Trait whose `grade_value` contains `grade` as a substring
    async fn trait_for_grade(&self, grade: &str) -> Result<Option<String>, StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Build the configured backend
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn GradeStore>> {
    let store: Arc<dyn GradeStore> = match config.backend {
        StoreBackend::Mysql => Arc::new(MySqlStore::connect(config).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::from_config(config)),
    };
    info!("Grade store ready ({})", store.backend_name());
    Ok(store)
}
