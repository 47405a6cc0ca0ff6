use std::net::SocketAddr;
use std::time::Duration;

use axum::body::{Bytes, Full};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use urlencoding::encode;

use crate::config::Config;
use crate::controllers::paste::PasteStore;
use crate::error::ApiError;
use crate::models::PutStatus;
use crate::types::api::{DeleteParams, PasteResponse, SavePaste, StatusResponse};
use crate::App;

/// The manual for the program in man page form.
const MAN_PAGE: &str = include_str!("../../assets/usage.txt");

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], app.config.port));

    match app.config.sweep.interval_secs {
        Some(secs) if secs > 0 => spawn_sweeper(app.store.clone(), Duration::from_secs(secs)),
        _ => info!("no sweep interval configured, expired pastes are removed on read"),
    }

    info!("listening on {addr}");

    axum::Server::bind(&addr)
        .serve(router(app).into_make_service())
        .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api", post(save_paste))
        .route("/api/:id", get(get_paste).delete(delete_paste))
        .route("/raw/:id", get(raw_paste))
        .route("/download/:id", get(download_paste))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            app.config.limits.max_upload_size,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

fn spawn_sweeper(store: PasteStore, every: Duration) {
    info!("sweeping expired pastes every {every:?}");
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(_) => {}
                Err(err) if err.is_unavailable() => {
                    warn!("expiry sweep skipped, retrying next tick: {err}");
                }
                Err(err) => error!("expiry sweep failed: {err}"),
            }
        }
    });
}

async fn index() -> &'static str {
    MAN_PAGE
}

async fn save_paste(
    State(config): State<Config>,
    State(store): State<PasteStore>,
    Json(request): Json<SavePaste>,
) -> crate::ApiResult<impl IntoResponse> {
    let stored = store
        .put(
            &request.title,
            &request.paste,
            request.expiry,
            &config.base_url,
        )
        .await?;

    let status_code = match stored.status {
        PutStatus::Created => StatusCode::CREATED,
        PutStatus::Existing => StatusCode::OK,
    };

    Ok((status_code, Json(PasteResponse::from(stored))))
}

async fn get_paste(
    State(store): State<PasteStore>,
    Path(id): Path<String>,
) -> crate::ApiResult<Json<PasteResponse>> {
    let paste = store.get(&id).await?;
    Ok(Json(paste.into()))
}

async fn delete_paste(
    State(store): State<PasteStore>,
    Query(params): Query<DeleteParams>,
    Path(id): Path<String>,
) -> crate::ApiResult<Json<StatusResponse>> {
    let delete_key = params.delkey.ok_or(ApiError::MissingDeleteKey)?;

    // same answer whether or not anything was removed
    store.delete(&id, &delete_key).await?;

    Ok(Json(StatusResponse {
        status: format!("Deleted paste {id}"),
    }))
}

async fn raw_paste(
    State(store): State<PasteStore>,
    Path(id): Path<String>,
) -> crate::ApiResult<impl IntoResponse> {
    let paste = store.get(&id).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        paste.body,
    ))
}

async fn download_paste(
    State(store): State<PasteStore>,
    Path(id): Path<String>,
) -> crate::ApiResult<Response<Full<Bytes>>> {
    let paste = store.get(&id).await?;
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        encode(&paste.title)
    );

    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Full::from(paste.body))?;
    Ok(response)
}
