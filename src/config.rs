use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
    #[serde(default = "default_listen_address")]
    pub address: String,
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// Used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mysql,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default = "default_db_user")]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Per-lookup bound; unset means lookups may wait forever
    pub query_timeout_ms: Option<u64>,
    /// Seed rows for the memory backend
    #[serde(default)]
    pub grade_ranges: Vec<GradeRangeRow>,
    #[serde(default)]
    pub personalities: Vec<PersonalityRow>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GradeRangeRow {
    pub min_avg: f64,
    pub max_avg: f64,
    pub grade: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PersonalityRow {
    pub grade_value: String,
    #[serde(rename = "trait")]
    pub trait_text: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
            port: default_listen_port(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
            max_connections: default_max_connections(),
            query_timeout_ms: None,
            grade_ranges: Vec::new(),
            personalities: Vec::new(),
        }
    }
}

// Default value functions
fn default_listen_address() -> String { "0.0.0.0".to_string() }
fn default_listen_port() -> u16 { 3000 }
fn default_log_filter() -> String { "grade_persona=info".to_string() }
fn default_db_host() -> String { "localhost".to_string() }
fn default_db_port() -> u16 { 3306 }
fn default_db_user() -> String { "root".to_string() }
fn default_db_name() -> String { "personality".to_string() }
fn default_max_connections() -> u32 { 5 }

impl Config {
    /// Load the TOML file at `path`, falling back to defaults when it does not exist.
    /// Database environment variables are applied on top either way.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
            Self::parse(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))?
        } else {
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        for range in &config.database.grade_ranges {
            if range.min_avg > range.max_avg {
                anyhow::bail!(
                    "grade range '{}' has min_avg {} above max_avg {}",
                    range.grade, range.min_avg, range.max_avg
                );
            }
        }
        Ok(config)
    }

    /// CC_DB_* are the variables the hosting platform injects for its managed MySQL add-on.
    fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if let Some(host) = lookup("CC_DB_HOST") {
            db.host = host;
        }
        if let Some(user) = lookup("CC_DB_USER") {
            db.user = user;
        }
        if let Some(password) = lookup("CC_DB_PASSWORD") {
            db.password = password;
        }
        if let Some(name) = lookup("CC_DB_NAME") {
            db.name = name;
        }
        if let Some(port) = lookup("CC_DB_PORT") {
            db.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid CC_DB_PORT '{}': {}", port, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.listen.address, "0.0.0.0");
        assert_eq!(config.listen.port, 3000);
        assert_eq!(config.database.backend, StoreBackend::Mysql);
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.database.query_timeout_ms, None);
        assert!(!config.log.json);
    }

    #[test]
    fn test_memory_seed_rows() {
        let config = Config::parse(
            r#"
            [database]
            backend = "memory"
            query_timeout_ms = 250

            [[database.grade_ranges]]
            min_avg = 85
            max_avg = 100
            grade = "A"

            [[database.personalities]]
            grade_value = "A,B"
            trait = "Confident"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.database.query_timeout_ms, Some(250));
        assert_eq!(
            config.database.grade_ranges,
            vec![GradeRangeRow { min_avg: 85.0, max_avg: 100.0, grade: "A".into() }]
        );
        assert_eq!(config.database.personalities[0].trait_text, "Confident");
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = Config::parse(
            r#"
            [[database.grade_ranges]]
            min_avg = 90
            max_avg = 80
            grade = "B"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_avg"), "got: {}", err);
    }

    #[test]
    fn test_env_overrides_database() {
        let env: HashMap<&str, &str> = [
            ("CC_DB_HOST", "db.internal"),
            ("CC_DB_USER", "reader"),
            ("CC_DB_PASSWORD", "hunter2"),
            ("CC_DB_NAME", "grades"),
            ("CC_DB_PORT", "3307"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.database.host, "db.internal");
        assert_eq!(config.database.user, "reader");
        assert_eq!(config.database.password, "hunter2");
        assert_eq!(config.database.name, "grades");
        assert_eq!(config.database.port, 3307);
    }

    #[test]
    fn test_bad_env_port() {
        let mut config = Config::default();
        let result = config.apply_env(|k| (k == "CC_DB_PORT").then(|| "nope".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load("/nonexistent/grade-persona.toml").unwrap();
        assert_eq!(config.listen.port, 3000);
    }
}
