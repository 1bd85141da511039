//! HTTP Server for the cwrgen API.
//!
//! Provides REST endpoints to generate CWR files from CSV uploads and to
//! validate existing CWR files.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/generate`   | Upload CSV, receive a CWR file       |
//! | POST   | `/api/validate`   | Upload a CWR file, receive findings  |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//!
//! Both POST endpoints take multipart form data with the payload in the
//! `file` field. Optional text fields: `era` (`current` or `legacy`),
//! `expectedCatalog`, and for generation `sequence`, `lenient` and
//! `skipValidation`.

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, GenerateResponse, ValidateResponse};
use crate::compose::AgreementPolicy;
use crate::config::BusinessConfig;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::pipeline::{generate_from_bytes, validate_bytes, GenerateOptions, ValidateOptions};
use crate::schema::Era;

type SharedConfig = Arc<BusinessConfig>;

/// Build the router with all endpoints.
pub fn router(config: BusinessConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/generate", post(generate))
        .route("/api/validate", post(validate))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(port: u16, config: BusinessConfig) -> Result<(), Box<dyn std::error::Error>> {
    let sender = config.sender_name.clone();
    let app = router(config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 cwrgen server running on http://localhost:{}", port);
    println!("   Sender: {}", sender);
    println!("   POST /api/generate - Upload CSV, get CWR");
    println!("   POST /api/validate - Upload CWR, get findings");
    println!("   GET  /api/logs     - SSE log stream");
    println!("   GET  /health       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Csv(_) | PipelineError::HeaderNotFound(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Pipeline(PipelineError::Compose(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Health check endpoint
async fn health(State(config): State<SharedConfig>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cwrgen",
        "version": env!("CARGO_PKG_VERSION"),
        "sender": config.sender_name,
        "agreements": config.agreements.len(),
        "endpoints": {
            "generate": "POST /api/generate",
            "validate": "POST /api/validate",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// A multipart upload: the `file` payload plus text fields.
#[derive(Debug, Default)]
struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
    fields: HashMap<String, String>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> ServerResult<Self> {
        let mut upload = Upload::default();
        let mut has_file = false;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                upload.file_name = field.file_name().map(|s| s.to_string());
                upload.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?
                    .to_vec();
                has_file = true;
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                upload.fields.insert(name, text);
            }
        }

        if !has_file {
            return Err(ServerError::BadRequest("No file provided".to_string()));
        }
        Ok(upload)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.text(key), Some("true" | "1" | "on" | "yes"))
    }

    fn era(&self) -> ServerResult<Era> {
        match self.text("era") {
            Some(raw) => raw.parse().map_err(ServerError::BadRequest),
            None => Ok(Era::default()),
        }
    }

    fn generate_options(&self) -> ServerResult<GenerateOptions> {
        let sequence = match self.text("sequence") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ServerError::BadRequest(format!("Invalid sequence '{}'", raw)))?,
            None => 1,
        };

        Ok(GenerateOptions {
            era: self.era()?,
            agreement_policy: self.flag("lenient").then_some(AgreementPolicy::Lenient),
            expected_catalog: self.text("expectedCatalog").map(str::to_string),
            sequence,
            skip_validation: self.flag("skipValidation"),
            timestamp: None,
        })
    }

    fn validate_options(&self) -> ServerResult<ValidateOptions> {
        Ok(ValidateOptions {
            era: self.era()?,
            expected_catalog: self.text("expectedCatalog").map(str::to_string),
        })
    }

    fn announce(&self, action: &str) {
        log_info(format!(
            "📄 {}: {} ({} bytes)",
            action,
            self.file_name.as_deref().unwrap_or("unknown"),
            self.bytes.len()
        ));
    }
}

/// CSV upload → CWR file
async fn generate(
    State(config): State<SharedConfig>,
    multipart: Multipart,
) -> ServerResult<Json<GenerateResponse>> {
    let upload = Upload::read(multipart).await?;
    let options = upload.generate_options()?;
    upload.announce("NEW GENERATION");

    let result = generate_from_bytes(&upload.bytes, &config, options)?;
    Ok(Json(GenerateResponse::from(result)))
}

/// CWR upload → findings
async fn validate(multipart: Multipart) -> ServerResult<Json<ValidateResponse>> {
    let upload = Upload::read(multipart).await?;
    let options = upload.validate_options()?;
    upload.announce("NEW VALIDATION");

    let report = validate_bytes(&upload.bytes, options)?;
    Ok(Json(ValidateResponse::from(report)))
}
