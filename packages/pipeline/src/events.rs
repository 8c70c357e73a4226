//! Progress events emitted while an analysis runs.
//!
//! These are streamed to clients via SSE. `dataReady` is the signal that
//! every map and chart input is available.

use serde::Serialize;
use site_engine_geography_models::GeoPoint;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AnalysisReport;

/// Events emitted by the pipeline during execution.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnalysisEvent {
    /// A run was accepted.
    #[serde(rename_all = "camelCase")]
    Started {
        /// Run id.
        run_id: Uuid,
        /// Address as submitted.
        address: String,
        /// Radii that will be analyzed, ascending.
        radii: Vec<f64>,
    },
    /// The address was geocoded.
    Geocoded {
        /// Canonical label.
        label: String,
        /// Site coordinates.
        center: GeoPoint,
    },
    /// Tracts around the site were resolved.
    TractsResolved {
        /// Number of tracts kept after the distance filter.
        count: usize,
    },
    /// One survey year finished loading.
    #[serde(rename_all = "camelCase")]
    DemographicsFetched {
        /// ACS vintage.
        survey_year: u16,
        /// Tract records loaded.
        records: usize,
        /// Counties that failed or timed out.
        failed_counties: Vec<String>,
    },
    /// The report is complete.
    DataReady {
        /// The full report.
        report: Box<AnalysisReport>,
    },
    /// The run failed.
    Error {
        /// Error message.
        message: String,
    },
}

/// Sends `event` if a listener is attached. A closed channel is ignored.
pub(crate) async fn emit(events: Option<&mpsc::Sender<AnalysisEvent>>, event: AnalysisEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
