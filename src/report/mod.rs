// src/report/mod.rs
//! Report entity and the intake workflow that attaches an `Analysis` before persistence.
//!
//! The intake never hands a report with a half-built analysis to the store: the pipeline
//! either returns a complete `Analysis` or the submission fails before `insert`.

pub mod store;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{Analysis, Category, UrgencyLevel};
use crate::classify::{ClassificationPipeline, ReportContext};
use crate::error::IntakeError;

pub use store::{MemoryReportStore, ReportFilter, ReportStore, DEFAULT_LIST_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Investigating,
    Resolved,
    Closed,
}

/// GeoJSON-style point: `coordinates = [longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

fn point_type() -> String {
    "Point".to_string()
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, IntakeError> {
        let valid = longitude.is_finite()
            && latitude.is_finite()
            && (-180.0..=180.0).contains(&longitude)
            && (-90.0..=90.0).contains(&latitude);
        if !valid {
            return Err(IntakeError::InvalidCoordinates {
                longitude,
                latitude,
            });
        }
        Ok(Self {
            kind: point_type(),
            coordinates: [longitude, latitude],
        })
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// What a citizen submits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// User-chosen category label; filled from the analysis when blank.
    #[serde(default)]
    pub category: Option<String>,
    pub location: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Persisted report record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub coordinates: GeoPoint,
    pub status: ReportStatus,
    pub urgency_level: UrgencyLevel,
    pub anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Report-creation workflow: validate → classify → attach → persist.
#[derive(Clone)]
pub struct ReportIntake {
    pipeline: ClassificationPipeline,
    store: Arc<dyn ReportStore>,
}

impl ReportIntake {
    pub fn new(pipeline: ClassificationPipeline, store: Arc<dyn ReportStore>) -> Self {
        Self { pipeline, store }
    }

    pub async fn submit(&self, draft: ReportDraft) -> Result<Report, IntakeError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(IntakeError::MissingField("title"));
        }
        let location = draft.location.trim().to_string();
        if location.is_empty() {
            return Err(IntakeError::MissingField("location"));
        }
        let coordinates = GeoPoint::new(draft.coordinates[0], draft.coordinates[1])?;

        let category_hint = draft
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        // Classification is skipped entirely for an empty description.
        let analysis = if draft.description.trim().is_empty() {
            None
        } else {
            let context = ReportContext {
                category_hint: category_hint.clone(),
                location: Some(location.clone()),
            };
            Some(
                self.pipeline
                    .classify_report_with_context(&draft.description, &context)
                    .await?,
            )
        };

        let category = category_hint.unwrap_or_else(|| {
            analysis
                .as_ref()
                .map(Analysis::category)
                .unwrap_or(Category::Other)
                .to_string()
        });
        let urgency_level = analysis
            .as_ref()
            .and_then(Analysis::urgency_level)
            .unwrap_or_default();

        let now = Utc::now();
        let report = Report {
            id: String::new(),
            title,
            description: draft.description,
            category,
            location,
            coordinates,
            status: ReportStatus::Pending,
            urgency_level,
            anonymous: draft.anonymous,
            user_id: if draft.anonymous { None } else { draft.user_id },
            images: draft.images,
            analysis,
            created_at: now,
            updated_at: now,
        };

        let saved = self.store.insert(report).await?;
        info!(
            id = %saved.id,
            category = %saved.category,
            urgency = %saved.urgency_level,
            analyzed = saved.analysis.is_some(),
            "report stored"
        );
        Ok(saved)
    }

    pub async fn list(&self, filter: &ReportFilter) -> Result<Vec<Report>, IntakeError> {
        Ok(self.store.find(filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_point_rejects_out_of_range() {
        assert!(GeoPoint::new(-73.98, 40.75).is_ok());
        assert!(matches!(
            GeoPoint::new(200.0, 0.0),
            Err(IntakeError::InvalidCoordinates { .. })
        ));
        assert!(GeoPoint::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn geo_point_serializes_as_geojson() {
        let p = GeoPoint::new(1.5, 2.5).unwrap();
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["type"], "Point");
        assert_eq!(v["coordinates"][0], 1.5);
    }
}
