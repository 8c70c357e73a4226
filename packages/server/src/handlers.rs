//! HTTP handler functions for the site analysis API.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use site_engine_pipeline::events::AnalysisEvent;
use site_engine_pipeline::{AnalysisRequest, PipelineError};
use site_engine_server_models::{AnalyzeRequest, ApiAnalysis, ApiError, ApiHealth};
use tokio::sync::mpsc;

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/analyze`
///
/// Runs one analysis and returns the formatted result.
pub async fn analyze(state: web::Data<AppState>, body: web::Json<AnalyzeRequest>) -> HttpResponse {
    let body = body.into_inner();
    let session = state.sessions.session(body.session_id.as_deref());
    let request = AnalysisRequest {
        address: body.address,
        radii: body.radii,
    };

    match state.analyzer.analyze(&request, &session, None).await {
        Ok(report) => HttpResponse::Ok().json(ApiAnalysis::from(&report)),
        Err(e) => error_response(&e),
    }
}

/// `POST /api/analyze/stream`
///
/// Runs one analysis in the background and streams its progress events as
/// Server-Sent Events. The stream ends after `dataReady` or `error`.
pub async fn analyze_stream(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeRequest>,
) -> HttpResponse {
    let body = body.into_inner();
    let session = state.sessions.session(body.session_id.as_deref());
    let request = AnalysisRequest {
        address: body.address,
        radii: body.radii,
    };
    let analyzer = state.analyzer.clone();

    let (tx, mut rx) = mpsc::channel::<AnalysisEvent>(32);

    actix_web::rt::spawn(async move {
        if let Err(e) = analyzer.analyze(&request, &session, Some(&tx)).await {
            log::warn!("Streamed analysis of '{}' failed: {e}", request.address);
        }
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    log::error!("Failed to serialize analysis event: {e}");
                    continue;
                }
            };
            yield Ok::<_, actix_web::Error>(web::Bytes::from(format!("data: {json}\n\n")));
        }
    };

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(stream)
}

/// HTTP status for a failed analysis.
pub(crate) const fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::AddressTooShort { .. } | PipelineError::InvalidRadius { .. } => {
            StatusCode::BAD_REQUEST
        }
        PipelineError::LocationNotFound { .. }
        | PipelineError::Geocode(_)
        | PipelineError::GeocodeTimeout { .. } => StatusCode::NOT_FOUND,
        PipelineError::Superseded => StatusCode::CONFLICT,
        PipelineError::Config(_) | PipelineError::Geo(_) | PipelineError::Census(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(error: &PipelineError) -> HttpResponse {
    let status = status_for(error);
    if status.is_server_error() {
        log::error!("Analysis failed: {error}");
    } else {
        log::info!("Analysis rejected ({status}): {error}");
    }

    HttpResponse::build(status).json(ApiError {
        error: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_statuses() {
        assert_eq!(
            status_for(&PipelineError::AddressTooShort { min_len: 5 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&PipelineError::InvalidRadius {
                message: "radius must be positive".to_string()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&PipelineError::LocationNotFound {
                address: "Nowhere Lane".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&PipelineError::GeocodeTimeout { seconds: 20 }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&PipelineError::Superseded), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let response = health().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn error_body_carries_message() {
        let response = error_response(&PipelineError::Superseded);
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Superseded by a newer analysis");
    }
}
