use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::StoreError;
use crate::store::GradeStore;

const GRADE_QUERY: &str = "SELECT grade FROM grade_range WHERE ? <= max_avg AND ? >= min_avg";
// BINARY keeps the match case-sensitive whatever the column collation is
const TRAIT_QUERY: &str =
    "SELECT trait FROM grade_personality WHERE grade_value LIKE BINARY ? ESCAPE '!'";

/// MySQL-backed store over a shared connection pool
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Open the pool and make sure at least one connection succeeds before serving
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to connect to MySQL at {}:{}/{}: {}",
                    config.host, config.port, config.name, e
                )
            })?;

        info!("🗄️ Connected to MySQL {}:{}/{}", config.host, config.port, config.name);
        Ok(Self { pool })
    }
}

/// LIKE pattern for plain substring containment. `%`, `_` and the escape
/// character itself are escaped so they match literally.
fn contains_pattern(grade: &str) -> String {
    let mut pattern = String::with_capacity(grade.len() + 2);
    pattern.push('%');
    for c in grade.chars() {
        if matches!(c, '%' | '_' | '!') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl GradeStore for MySqlStore {
    async fn grade_for_average(&self, average: f64) -> Result<Option<String>, StoreError> {
        let grade = sqlx::query_scalar::<_, String>(GRADE_QUERY)
            .bind(average)
            .bind(average)
            .fetch_optional(&self.pool)
            .await?;
        Ok(grade)
    }

    async fn trait_for_grade(&self, grade: &str) -> Result<Option<String>, StoreError> {
        let personality = sqlx::query_scalar::<_, String>(TRAIT_QUERY)
            .bind(contains_pattern(grade))
            .fetch_optional(&self.pool)
            .await?;
        Ok(personality)
    }

    fn backend_name(&self) -> &'static str {
        "mysql"
    }
}
