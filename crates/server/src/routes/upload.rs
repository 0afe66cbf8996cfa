//! Image upload route handler.
//!
//! A request moves through fixed steps: the multipart body is received and
//! the image is written to disk, then the PIN is checked. A wrong PIN deletes
//! the file that was just written before the 401 goes out.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::file::{LocalFileStorage, PendingFile, StoredFile};
use crate::metrics::UploadOutcome;
use crate::state::AppState;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "imageFile";

/// Multipart field carrying the PIN.
pub const PIN_FIELD: &str = "pinCode";

/// Request body allowance on top of the file limit, for multipart framing
/// and the PIN field.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the upload router.
pub fn router(state: &AppState) -> Router<AppState> {
    let body_limit = state
        .config()
        .max_upload_size
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new().route(
        "/upload",
        post(upload_image).layer(DefaultBodyLimit::max(body_limit)),
    )
}

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub message: String,
}

impl UploadResponse {
    pub fn success(url: String) -> Self {
        Self {
            success: true,
            url: Some(url),
            message: "image posted successfully".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            message: message.into(),
        }
    }
}

/// Fields collected from the multipart body.
#[derive(Debug, Default)]
struct Received {
    file: Option<StoredFile>,
    pin: Option<String>,
}

/// What to do with a received upload once the PIN has been checked.
#[derive(Debug, PartialEq, Eq)]
enum Decision {
    /// Wrong or missing PIN; the file, if any, must be deleted.
    Rejected(Option<StoredFile>),
    /// Right PIN but nothing to keep.
    NoFile,
    /// Right PIN and a file.
    Accepted(StoredFile),
}

/// Upload an image.
///
/// POST /upload
/// Content-Type: multipart/form-data
///
/// Form fields:
/// - imageFile: The image to upload
/// - pinCode: The shared upload PIN
async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match handle_upload(&state, multipart).await {
        Ok(response) => {
            state.metrics().record_upload(UploadOutcome::Accepted);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            state.metrics().record_upload(outcome_of(&e));
            e.into_response()
        }
    }
}

async fn handle_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<UploadResponse> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "upload is not a multipart body");
        AppError::BadRequest(rejection.body_text())
    })?;

    let storage = state.storage();
    let received = receive(storage, &mut multipart, state.config().max_upload_size).await?;

    match decide(received, &state.config().upload_pin) {
        Decision::Rejected(file) => {
            if let Some(stored) = file {
                discard_quietly(storage, &stored).await;
            }
            warn!("upload rejected: incorrect security code");
            Err(AppError::Unauthorized)
        }
        Decision::NoFile => Err(AppError::NoFile),
        Decision::Accepted(stored) => {
            let url = storage.public_url(&stored);
            state.metrics().record_upload_bytes(stored.size);
            info!(url = %url, size = stored.size, "image uploaded");
            Ok(UploadResponse::success(url))
        }
    }
}

/// Read every field, writing the image to disk as it arrives.
///
/// On failure, a file already written for this request is deleted.
async fn receive(
    storage: &LocalFileStorage,
    multipart: &mut Multipart,
    limit: usize,
) -> AppResult<Received> {
    let mut received = Received::default();

    if let Err(e) = read_fields(storage, multipart, limit, &mut received).await {
        if let Some(stored) = received.file.take() {
            discard_quietly(storage, &stored).await;
        }
        return Err(e);
    }

    Ok(received)
}

async fn read_fields(
    storage: &LocalFileStorage,
    multipart: &mut Multipart,
    limit: usize,
    received: &mut Received,
) -> AppResult<()> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == IMAGE_FIELD {
            // Browsers send an empty filename when nothing was picked.
            let original_name = match field.file_name() {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => continue,
            };
            if received.file.is_some() {
                debug!("ignoring extra image part");
                continue;
            }
            received.file = Some(persist(storage, field, &original_name, limit).await?);
        } else if name == PIN_FIELD {
            received.pin = Some(field.text().await.map_err(|e| multipart_error(e, limit))?);
        } else {
            debug!(field = %name, "ignoring unknown form field");
        }
    }

    Ok(())
}

/// Stream one file part to disk, enforcing the size limit.
async fn persist(
    storage: &LocalFileStorage,
    mut field: Field<'_>,
    original_name: &str,
    limit: usize,
) -> AppResult<StoredFile> {
    let mut pending = storage.create(original_name).await?;
    let partial = pending.stored().clone();

    let written = match copy_field(&mut field, &mut pending, limit).await {
        Ok(()) => pending.finish().await.map_err(AppError::from),
        Err(e) => Err(e),
    };

    if written.is_err() {
        discard_quietly(storage, &partial).await;
    }
    written
}

async fn copy_field(
    field: &mut Field<'_>,
    pending: &mut PendingFile,
    limit: usize,
) -> AppResult<()> {
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if pending.written() + chunk.len() as u64 > limit as u64 {
            warn!(limit, "upload exceeds size limit");
            return Err(AppError::PayloadTooLarge { limit });
        }
        pending.write(&chunk).await?;
    }
    Ok(())
}

/// Check the PIN and decide the fate of the received file.
fn decide(received: Received, expected_pin: &str) -> Decision {
    if !pin_matches(expected_pin, received.pin.as_deref()) {
        return Decision::Rejected(received.file);
    }
    match received.file {
        Some(stored) => Decision::Accepted(stored),
        None => Decision::NoFile,
    }
}

/// Constant-time PIN comparison. A missing PIN never matches.
fn pin_matches(expected: &str, supplied: Option<&str>) -> bool {
    supplied.is_some_and(|pin| pin.as_bytes().ct_eq(expected.as_bytes()).into())
}

/// Best-effort delete; failures are logged and otherwise ignored.
async fn discard_quietly(storage: &LocalFileStorage, stored: &StoredFile) {
    if let Err(e) = storage.discard(stored).await {
        warn!(name = %stored.name, error = %e, "failed to delete discarded upload");
    }
}

fn multipart_error(e: MultipartError, limit: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::BadRequest(e.body_text())
    }
}

fn outcome_of(e: &AppError) -> UploadOutcome {
    match e {
        AppError::Unauthorized => UploadOutcome::Rejected,
        AppError::NoFile => UploadOutcome::NoFile,
        AppError::PayloadTooLarge { .. } => UploadOutcome::TooLarge,
        _ => UploadOutcome::Failed,
    }
}
