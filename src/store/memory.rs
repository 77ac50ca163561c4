use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::{DatabaseConfig, GradeRangeRow, PersonalityRow};
use crate::error::StoreError;
use crate::store::GradeStore;

/// In-process grade tables
///
/// Rows are scanned in insertion order, so "first match" means the row that
/// was added first. Used for local runs seeded from the config file and in tests.
pub struct MemoryStore {
    ranges: RwLock<Vec<GradeRangeRow>>,
    personalities: RwLock<Vec<PersonalityRow>>,
    lookups: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            ranges: RwLock::new(Vec::new()),
            personalities: RwLock::new(Vec::new()),
            lookups: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            ranges: RwLock::new(config.grade_ranges.clone()),
            personalities: RwLock::new(config.personalities.clone()),
            lookups: AtomicU64::new(0),
        }
    }

    pub fn insert_range(&self, min_avg: f64, max_avg: f64, grade: &str) {
        self.ranges.write().push(GradeRangeRow {
            min_avg,
            max_avg,
            grade: grade.to_string(),
        });
    }

    pub fn insert_personality(&self, grade_value: &str, trait_text: &str) {
        self.personalities.write().push(PersonalityRow {
            grade_value: grade_value.to_string(),
            trait_text: trait_text.to_string(),
        });
    }

    /// Number of lookups served so far
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GradeStore for MemoryStore {
    async fn grade_for_average(&self, average: f64) -> Result<Option<String>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let ranges = self.ranges.read();
        let mut matches = ranges
            .iter()
            .filter(|r| average <= r.max_avg && average >= r.min_avg);

        let first = matches.next().map(|r| r.grade.clone());
        if first.is_some() && matches.next().is_some() {
            debug!("Overlapping grade ranges for average {}, using {:?}", average, first);
        }
        Ok(first)
    }

    async fn trait_for_grade(&self, grade: &str) -> Result<Option<String>, StoreError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let personalities = self.personalities.read();
        let mut matches = personalities
            .iter()
            .filter(|p| p.grade_value.contains(grade));

        let first = matches.next().map(|p| p.trait_text.clone());
        if first.is_some() && matches.next().is_some() {
            debug!("Several personality patterns contain grade {}, using {:?}", grade, first);
        }
        Ok(first)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_range(85.0, 100.0, "A");
        store.insert_range(70.0, 84.99, "B");
        store.insert_range(50.0, 69.99, "C");
        store.insert_personality("A,B", "Confident");
        store.insert_personality("C", "Steady");
        store
    }

    #[tokio::test]
    async fn test_range_bounds_are_inclusive() {
        let store = sample_store();
        assert_eq!(store.grade_for_average(85.0).await.unwrap().as_deref(), Some("A"));
        assert_eq!(store.grade_for_average(100.0).await.unwrap().as_deref(), Some("A"));
        assert_eq!(store.grade_for_average(84.99).await.unwrap().as_deref(), Some("B"));
        assert_eq!(store.grade_for_average(50.0).await.unwrap().as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn test_range_gap_and_outside() {
        let store = sample_store();
        // between 84.99 and 85 nothing is configured
        assert_eq!(store.grade_for_average(84.995).await.unwrap(), None);
        assert_eq!(store.grade_for_average(40.0).await.unwrap(), None);
        assert_eq!(store.grade_for_average(100.5).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overlapping_ranges_first_wins() {
        let store = MemoryStore::new();
        store.insert_range(60.0, 80.0, "B");
        store.insert_range(75.0, 90.0, "A");
        assert_eq!(store.grade_for_average(78.0).await.unwrap().as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_trait_substring_match() {
        let store = sample_store();
        assert_eq!(store.trait_for_grade("B").await.unwrap().as_deref(), Some("Confident"));
        assert_eq!(store.trait_for_grade("C").await.unwrap().as_deref(), Some("Steady"));
        assert_eq!(store.trait_for_grade("F").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_trait_match_is_plain_containment() {
        let store = MemoryStore::new();
        store.insert_personality("BA", "Ambitious");
        // "A" is inside "BA"; kept for compatibility with LIKE '%A%'
        assert_eq!(store.trait_for_grade("A").await.unwrap().as_deref(), Some("Ambitious"));
        // case-sensitive
        assert_eq!(store.trait_for_grade("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lookup_counter() {
        let store = sample_store();
        assert_eq!(store.lookups(), 0);
        store.grade_for_average(90.0).await.unwrap();
        store.trait_for_grade("A").await.unwrap();
        assert_eq!(store.lookups(), 2);
    }

    #[tokio::test]
    async fn test_from_config_seed() {
        let mut config = DatabaseConfig::default();
        config.grade_ranges.push(GradeRangeRow { min_avg: 0.0, max_avg: 100.0, grade: "P".into() });
        config.personalities.push(PersonalityRow { grade_value: "P".into(), trait_text: "Calm".into() });

        let store = MemoryStore::from_config(&config);
        assert_eq!(store.grade_for_average(12.5).await.unwrap().as_deref(), Some("P"));
        assert_eq!(store.trait_for_grade("P").await.unwrap().as_deref(), Some("Calm"));
    }
}
