use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::error::{PersonaError, StoreError};
use crate::store::GradeStore;

/// Query parameters of `GET /get-personality`, kept as raw strings so that
/// bad marks become a 400 with our own message instead of an extractor rejection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalityRequest {
    pub name: Option<String>,
    pub sub1: Option<String>,
    pub sub2: Option<String>,
    pub sub3: Option<String>,
}

impl PersonalityRequest {
    /// Build from decoded query pairs. A repeated key keeps its first value;
    /// unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut request = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "name" => &mut request.name,
                "sub1" => &mut request.sub1,
                "sub2" => &mut request.sub2,
                "sub3" => &mut request.sub3,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        request
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(serialize_with = "serialize_marks")]
    pub average_marks: f64,
    pub grade: String,
    pub personality_trait: String,
}

/// Whole averages go out as JSON integers (`90`, not `90.0`)
fn serialize_marks<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Parse one mark: `-?digits(.digits)?` after trimming. No exponent, no `+`.
pub fn parse_mark(raw: Option<&str>) -> Option<f64> {
    let text = raw?.trim();
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !fraction.map_or(true, all_digits) {
        return None;
    }
    let value: f64 = text.parse().ok()?;
    value.is_finite().then_some(value)
}

pub fn average(marks: [f64; 3]) -> f64 {
    (marks[0] + marks[1] + marks[2]) / 3.0
}

/// marks -> average -> grade -> personality trait
pub struct PersonaResolver {
    store: Arc<dyn GradeStore>,
    query_timeout: Option<Duration>,
}

impl PersonaResolver {
    pub fn new(store: Arc<dyn GradeStore>, query_timeout: Option<Duration>) -> Self {
        Self { store, query_timeout }
    }

    pub async fn resolve(&self, request: &PersonalityRequest) -> Result<PersonalityResult, PersonaError> {
        debug!(
            student = ?request.name,
            sub1 = ?request.sub1,
            sub2 = ?request.sub2,
            sub3 = ?request.sub3,
            "Received personality request"
        );

        let marks = [
            parse_mark(request.sub1.as_deref()),
            parse_mark(request.sub2.as_deref()),
            parse_mark(request.sub3.as_deref()),
        ];
        let marks = match marks {
            [Some(a), Some(b), Some(c)] => [a, b, c],
            _ => return Err(PersonaError::InvalidMarks),
        };

        let average_marks = average(marks);
        debug!("Calculated average marks: {}", average_marks);

        let grade = self
            .bounded(self.store.grade_for_average(average_marks))
            .await
            .map_err(PersonaError::GradeLookup)?
            .ok_or(PersonaError::GradeNotFound { average: average_marks })?;
        debug!("Average {} -> grade {}", average_marks, grade);

        let personality_trait = self
            .bounded(self.store.trait_for_grade(&grade))
            .await
            .map_err(PersonaError::TraitLookup)?
            .ok_or_else(|| PersonaError::TraitNotFound { grade: grade.clone() })?;

        info!(
            "🎓 {:?}: average {} -> {} -> {}",
            request.name, average_marks, grade, personality_trait
        );

        Ok(PersonalityResult {
            name: request.name.clone(),
            average_marks,
            grade,
            personality_trait,
        })
    }

    /// Apply the configured per-lookup timeout, if any
    async fn bounded<T, F>(&self, lookup: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match self.query_timeout {
            Some(limit) => tokio::time::timeout(limit, lookup)
                .await
                .map_err(|_| StoreError::Timeout(limit))?,
            None => lookup.await,
        }
    }
}
