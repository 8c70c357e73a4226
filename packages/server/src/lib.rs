#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for site analysis.
//!
//! `POST /api/analyze` runs an analysis and answers with the formatted
//! result. `POST /api/analyze/stream` runs the same pipeline and streams its
//! progress events over SSE, ending with `dataReady` (or `error`).
//!
//! Clients may send a `sessionId`; a new analysis in a session supersedes
//! any run of that session still in flight.

mod handlers;
pub mod interactive;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use site_engine_pipeline::SiteAnalyzer;
use site_engine_pipeline::session::AnalysisSession;

/// Client sessions keyed by the id the client sends.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, AnalysisSession>>,
}

impl SessionRegistry {
    /// Returns the session for `id`, creating it on first use. Requests
    /// without an id get a private session.
    #[must_use]
    pub fn session(&self, id: Option<&str>) -> AnalysisSession {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return AnalysisSession::new();
        };

        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Number of known sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared application state.
pub struct AppState {
    /// Pipeline with its configuration and external services.
    pub analyzer: Arc<SiteAnalyzer>,
    /// Client sessions.
    pub sessions: SessionRegistry,
}

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Bind address.
    pub bind_addr: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl ServerOptions {
    /// Reads `BIND_ADDR` and `PORT`, keeping the defaults for missing or
    /// malformed values.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        }
    }
}

/// Starts the API server with options from the environment.
///
/// Initializes logging, then delegates to [`serve`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if configuration is invalid, a
/// client cannot be built, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    serve(ServerOptions::from_env()).await
}

/// Builds the analyzer and runs the HTTP server until shutdown. This is a
/// regular async function; the caller provides the runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if configuration is invalid, a
/// client cannot be built, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn serve(options: ServerOptions) -> std::io::Result<()> {
    log::info!("Loading analysis configuration...");
    let analyzer = SiteAnalyzer::from_env().map_err(std::io::Error::other)?;
    let config = analyzer.config();
    log::info!(
        "ACS {} vs {}, default radii {:?}",
        config.survey.current_year,
        config.survey.baseline_year,
        config.default_radii
    );

    let state = web::Data::new(AppState {
        analyzer: Arc::new(analyzer),
        sessions: SessionRegistry::default(),
    });

    let ServerOptions { bind_addr, port } = options;
    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/analyze", web::post().to(handlers::analyze))
                    .route("/analyze/stream", web::post().to(handlers::analyze_stream)),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_shared_by_id() {
        let registry = SessionRegistry::default();
        let a = registry.session(Some("tab-1"));
        let b = registry.session(Some("tab-1"));

        let ticket = a.begin();
        let _ = b.begin();
        assert!(!a.is_current(&ticket));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn anonymous_requests_get_private_sessions() {
        let registry = SessionRegistry::default();
        let a = registry.session(None);
        let b = registry.session(Some(""));

        let ticket = a.begin();
        let _ = b.begin();
        assert!(a.is_current(&ticket));
        assert!(registry.is_empty());
    }

    #[test]
    fn default_options() {
        let options = ServerOptions::default();
        assert_eq!(options.bind_addr, "127.0.0.1");
        assert_eq!(options.port, 8080);
    }
}
