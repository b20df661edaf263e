#![forbid(unsafe_code)]

use std::{
    env,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bolt_adapter::{AdapterHealthResponse, AdapterRuntime, GenerateAdapterResponse};
use bolt_kernel_contracts::raw::RawRequest;
use bolt_storage::StorageError;

#[derive(serde::Serialize)]
struct RetrieveErrorResponse {
    status: String,
    outcome: String,
    reason: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let bind = env::var("BOLT_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let addr: SocketAddr = bind.parse()?;
    let runtime = Arc::new(Mutex::new(AdapterRuntime::default_from_env()?));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/generate", post(generate))
        .route("/preview/:filename", get(preview))
        .route("/download/:filename", get(download))
        .with_state(runtime);

    println!("bolt_adapter_http listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
) -> (StatusCode, Json<AdapterHealthResponse>) {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdapterHealthResponse {
                    status: "error".to_string(),
                    outcome: "UNHEALTHY".to_string(),
                    reason: Some("adapter runtime lock poisoned".to_string()),
                    schema_version: 0,
                    artifact_dir: String::new(),
                }),
            );
        }
    };
    let report = runtime.health_report();
    let code = if report.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, Json(report))
}

async fn generate(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
    Json(raw): Json<RawRequest>,
) -> (StatusCode, Json<GenerateAdapterResponse>) {
    let mut runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GenerateAdapterResponse {
                    status: "error".to_string(),
                    outcome: "GENERATION_FAILED".to_string(),
                    filename: None,
                    download_url: None,
                    preview_url: None,
                    nut_download_url: None,
                    nut_preview_url: None,
                    nut_generated: None,
                    field: None,
                    reason: Some("adapter runtime lock poisoned".to_string()),
                }),
            );
        }
    };
    let response = runtime.run_generate(raw);
    let code = match response.outcome.as_str() {
        "GENERATED" => StatusCode::OK,
        "REJECTED" => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, Json(response))
}

async fn preview(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
    Path(filename): Path<String>,
) -> Response {
    fetch_artifact(&runtime, &filename, false)
}

async fn download(
    State(runtime): State<Arc<Mutex<AdapterRuntime>>>,
    Path(filename): Path<String>,
) -> Response {
    fetch_artifact(&runtime, &filename, true)
}

fn fetch_artifact(runtime: &Mutex<AdapterRuntime>, name: &str, attachment: bool) -> Response {
    let runtime = match runtime.lock() {
        Ok(runtime) => runtime,
        Err(_) => {
            return retrieve_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "UNAVAILABLE",
                "adapter runtime lock poisoned",
            );
        }
    };
    match runtime.read_artifact(name) {
        Ok((bytes, content_type)) => {
            if attachment {
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, content_type.to_string()),
                        (
                            header::CONTENT_DISPOSITION,
                            format!("attachment; filename=\"{name}\""),
                        ),
                    ],
                    bytes,
                )
                    .into_response()
            } else {
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, content_type.to_string())],
                    bytes,
                )
                    .into_response()
            }
        }
        Err(StorageError::NotFound { .. }) => {
            retrieve_error(StatusCode::NOT_FOUND, "NOT_FOUND", "artifact not found")
        }
        Err(_) => retrieve_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "UNAVAILABLE",
            "artifact could not be read",
        ),
    }
}

fn retrieve_error(code: StatusCode, outcome: &str, reason: &str) -> Response {
    (
        code,
        Json(RetrieveErrorResponse {
            status: "error".to_string(),
            outcome: outcome.to_string(),
            reason: reason.to_string(),
        }),
    )
        .into_response()
}
