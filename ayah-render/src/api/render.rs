//! POST /render-video
//!
//! Runs the render pipeline and streams the MP4 back. Headers declaring an
//! MP4 attachment are only produced after the artifact has been opened, so
//! every failure before that point is still a JSON error.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use ayah_common::RenderRequest;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, RenderError, RenderStage};
use crate::AppState;

const ATTACHMENT: &str = "attachment; filename=\"video.mp4\"";

/// POST /render-video
pub async fn render_video(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;

    let request_id = Uuid::new_v4();
    let requested = request
        .config
        .as_ref()
        .and_then(|config| config.requested_template())
        .unwrap_or_default();
    let span = info_span!("render_video", %request_id, template = %requested);

    async move {
        info!(ayahs = request.ayahs.len(), "Render requested");

        let outcome = match state.orchestrator.render(request).await {
            Ok(artifact) => artifact
                .open()
                .await
                .map_err(|e| RenderError::failed(RenderStage::Stream, e)),
            Err(e) => Err(e),
        };

        let stream = match outcome {
            Ok(stream) => stream,
            Err(e) => {
                if !matches!(e, RenderError::InvalidTemplate { .. }) {
                    state.record_error(e.to_string()).await;
                }
                return Err(e.into());
            }
        };

        info!(bytes = stream.len(), "Streaming video");
        Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("video/mp4")),
                (header::CONTENT_DISPOSITION, HeaderValue::from_static(ATTACHMENT)),
                (header::CONTENT_LENGTH, HeaderValue::from(stream.len())),
            ],
            Body::from_stream(stream),
        )
            .into_response())
    }
    .instrument(span)
    .await
}

/// Build render routes
pub fn render_routes() -> Router<AppState> {
    Router::new().route("/render-video", post(render_video))
}
