use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{Json, Response};
use axum::routing::{get, post};
use clap::Parser;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use razshelf::analyze::{self, AnalyzeConfig};
use razshelf::catalog;
use razshelf::formats::{Book, LevelSummary, ReadingFeedback};
use razshelf::levels;
use razshelf::store::{GcsStore, LocalFsStore, ObjectStore, file_name_of};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct ServerArgs {
    #[arg(long, default_value = "127.0.0.1:8787")]
    addr: SocketAddr,

    /// Local store directory, used when `RAZSHELF_BUCKET` is unset.
    #[arg(long, default_value = "media")]
    data_dir: PathBuf,

    /// Allowed CORS origin for the web app (`*` for any).
    #[arg(long, default_value = "*")]
    cors_origin: String,
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ObjectStore>,
    client: reqwest::Client,
    ai: Option<Arc<AnalyzeConfig>>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    razshelf::logging::init()?;

    let args = ServerArgs::parse();
    tracing::info!(?args, "starting razshelf-server");

    let bucket = std::env::var("RAZSHELF_BUCKET")
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty());
    let store: Arc<dyn ObjectStore> = match &bucket {
        Some(bucket) => {
            tracing::info!(bucket = %bucket, "serving from bucket store");
            Arc::new(GcsStore::new(bucket.clone()))
        }
        None => {
            tracing::info!(data_dir = %args.data_dir.display(), "serving from local store");
            Arc::new(LocalFsStore::new(&args.data_dir))
        }
    };

    let ai = AnalyzeConfig::from_env().map(Arc::new);
    if ai.is_none() {
        tracing::info!("RAZSHELF_AI_API_KEY unset; analyze-reading is disabled");
    }

    let state = AppState {
        store,
        client: reqwest::Client::new(),
        ai,
    };

    let cors = cors_layer(&args.cors_origin)?;
    let app = Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/levels", get(list_levels))
        .route("/api/levels/:level/books", get(list_books))
        .route("/api/pdf/:level/:filename", get(get_pdf))
        .route("/api/audio/:level/:filename", get(get_audio))
        .route("/api/analyze-reading", post(analyze_reading))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origin == "*" {
        AllowOrigin::any()
    } else {
        AllowOrigin::exact(
            origin
                .parse::<HeaderValue>()
                .map_err(|err| anyhow::anyhow!("invalid cors origin {origin:?}: {err}"))?,
        )
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]))
}

#[derive(Debug, Serialize)]
struct LevelsResponse {
    levels: Vec<LevelSummary>,
}

#[derive(Debug, Serialize)]
struct BooksResponse {
    books: Vec<Book>,
}

async fn list_levels(State(state): State<AppState>) -> Json<LevelsResponse> {
    let mut summaries = Vec::new();
    for code in levels::level_codes() {
        // A level whose listing fails is reported as empty; the rest of
        // the summary still goes out.
        let book_count = match state.store.list(&format!("pdf/{code}/")).await {
            Ok(entries) => entries
                .iter()
                .map(|entry| file_name_of(&entry.key))
                .filter(|name| !name.starts_with('.') && name.to_lowercase().ends_with(".pdf"))
                .count(),
            Err(err) => {
                tracing::warn!(level = code, error = %format!("{err:#}"), "level listing failed");
                0
            }
        };
        summaries.push(LevelSummary {
            id: code.to_owned(),
            name: code.to_owned(),
            book_count,
        });
    }
    Json(LevelsResponse { levels: summaries })
}

async fn list_books(
    State(state): State<AppState>,
    Path(level): Path<String>,
) -> Result<Json<BooksResponse>, StatusCode> {
    if !levels::is_level_code(&level) {
        return Err(StatusCode::NOT_FOUND);
    }

    // Both listings are fully materialized before any matching happens.
    let pdf_files = list_file_names(&state, &format!("pdf/{level}/")).await?;
    let audio_files = list_file_names(&state, &format!("audio/{level}/")).await?;

    let build = catalog::build_catalog(&level, &pdf_files, &audio_files);
    if !build.report.is_clean() {
        tracing::debug!(
            level = %level,
            skipped = build.report.skipped.len(),
            overwrites = build.report.audio_overwrites.len(),
            "catalog build diagnostics"
        );
    }
    Ok(Json(BooksResponse { books: build.books }))
}

async fn list_file_names(state: &AppState, prefix: &str) -> Result<Vec<String>, StatusCode> {
    let entries = state.store.list(prefix).await.map_err(|err| {
        tracing::error!(prefix = %prefix, error = %format!("{err:#}"), "listing failed");
        StatusCode::BAD_GATEWAY
    })?;
    Ok(entries
        .iter()
        .map(|entry| file_name_of(&entry.key).to_owned())
        .collect())
}

async fn get_pdf(
    State(state): State<AppState>,
    Path((level, filename)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    serve_object(&state, &format!("pdf/{level}/{filename}"), "application/pdf").await
}

async fn get_audio(
    State(state): State<AppState>,
    Path((level, filename)): Path<(String, String)>,
) -> Result<Response, StatusCode> {
    serve_object(&state, &format!("audio/{level}/{filename}"), "audio/mpeg").await
}

async fn serve_object(
    state: &AppState,
    key: &str,
    content_type: &'static str,
) -> Result<Response, StatusCode> {
    let body = state
        .store
        .get(key)
        .await
        .map_err(|err| {
            tracing::error!(key = %key, error = %format!("{err:#}"), "object fetch failed");
            StatusCode::BAD_GATEWAY
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut resp = Response::new(Body::from(body));
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );
    Ok(resp)
}

async fn analyze_reading(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ReadingFeedback>, (StatusCode, String)> {
    let Some(config) = &state.ai else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "reading analysis is not configured".to_owned(),
        ));
    };

    let mut audio: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid multipart body: {err}"),
        )
    })? {
        if field.name() == Some("audio") {
            let bytes = field.bytes().await.map_err(|err| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("read audio field: {err}"),
                )
            })?;
            audio = Some(bytes.to_vec());
        }
    }
    let Some(audio) = audio else {
        return Err((StatusCode::BAD_REQUEST, "no audio file provided".to_owned()));
    };

    let feedback = analyze::analyze_reading(&state.client, config, audio)
        .await
        .map_err(|err| {
            tracing::error!(error = %format!("{err:#}"), "reading analysis failed");
            (StatusCode::BAD_GATEWAY, format!("analysis failed: {err:#}"))
        })?;
    Ok(Json(feedback))
}
