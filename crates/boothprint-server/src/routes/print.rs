// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// POST /print/image
//
// Accepts the photo three ways:
//   - multipart/form-data with the file in `photo` and text fields beside it
//   - JSON with a base64 `image` field
//   - url-encoded form with a base64 `image` field

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde_json::{Map, Value};
use tracing::{info, warn};

use boothprint_core::error::{BoothError, Result};
use boothprint_core::types::{Envelope, ImageSource, PrintRequest};
use boothprint_print::StagedFile;
use boothprint_print::staging::write_upload;

use crate::error::ApiError;
use crate::services::PrintOutcome;
use crate::state::AppState;

/// Multipart file field carrying the photo.
pub const PHOTO_FIELD: &str = "photo";
/// Base64 image field in JSON and form bodies.
pub const IMAGE_FIELD: &str = "image";
/// Non-file multipart fields accepted per request.
pub const MAX_FIELDS: usize = 10;

pub async fn image(State(state): State<AppState>, req: Request) -> std::result::Result<Json<Envelope>, ApiError> {
    let request = read_print_request(&state, req).await?;

    match state.printer.print(&request).await {
        Ok(PrintOutcome::Simulated { .. }) => Ok(Json(Envelope::ok(None))),
        Ok(PrintOutcome::Printed { remaining, .. }) => {
            info!(?remaining, "print job submitted");
            Ok(Json(Envelope::ok(None)))
        }
        Err(e) => Err(ApiError::Envelope(e)),
    }
}

/// Decode the body into a `PrintRequest` according to its content type.
///
/// Body-level failures (limits, malformed multipart or JSON) are upload
/// errors with the plain body; a well-formed body without an image is the
/// enveloped `NoImageData`.
async fn read_print_request(
    state: &AppState,
    req: Request,
) -> std::result::Result<PrintRequest, ApiError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| BoothError::Upload(e.body_text()))?;
        let (fields, upload) =
            read_multipart(multipart, &state.settings.staging_dir, state.settings.max_upload_bytes)
                .await?;
        return request_from_fields(fields, upload).ok_or(ApiError::Envelope(BoothError::NoImageData));
    }

    if content_type.starts_with("application/json") {
        let Json(body) = Json::<Map<String, Value>>::from_request(req, state)
            .await
            .map_err(|e| BoothError::Upload(e.body_text()))?;
        return PrintRequest::from_json(&body).ok_or(ApiError::Envelope(BoothError::NoImageData));
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|e| BoothError::Upload(e.body_text()))?;
        return request_from_fields(fields, None).ok_or(ApiError::Envelope(BoothError::NoImageData));
    }

    warn!(content_type = %content_type, "no image data provided");
    Err(ApiError::Envelope(BoothError::NoImageData))
}

/// Uploaded file first, then a non-empty `image` field.  `image` itself is
/// not passed on as a field.
fn request_from_fields(fields: Vec<(String, String)>, upload: Option<PathBuf>) -> Option<PrintRequest> {
    let image = match upload {
        Some(path) => ImageSource::Uploaded { path },
        None => {
            let payload = fields
                .iter()
                .find(|(key, _)| key == IMAGE_FIELD)
                .map(|(_, value)| value.clone())
                .filter(|value| !value.is_empty())?;
            ImageSource::Base64 { payload }
        }
    };
    let fields = fields.into_iter().filter(|(key, _)| key != IMAGE_FIELD).collect();
    Some(PrintRequest::new(image, fields))
}

/// Drain the multipart stream.  The photo is written to `dir`; on any error
/// it is removed again.
async fn read_multipart(
    mut multipart: Multipart,
    dir: &Path,
    limit: usize,
) -> Result<(Vec<(String, String)>, Option<PathBuf>)> {
    let mut upload = None;
    match collect_parts(&mut multipart, dir, limit, &mut upload).await {
        Ok(fields) => Ok((fields, upload)),
        Err(e) => {
            if let Some(path) = upload {
                StagedFile::adopt(path).remove().await;
            }
            Err(e)
        }
    }
}

async fn collect_parts(
    multipart: &mut Multipart,
    dir: &Path,
    limit: usize,
    upload: &mut Option<PathBuf>,
) -> Result<Vec<(String, String)>> {
    let mut fields = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| BoothError::Upload(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_some() {
            if name != PHOTO_FIELD {
                return Err(BoothError::Upload(format!("Unexpected field '{name}'")));
            }
            if upload.is_some() {
                return Err(BoothError::Upload("Too many files".into()));
            }
            let bytes = read_limited(&mut field, limit, "File too large").await?;
            *upload = Some(write_upload(dir, &bytes).await?);
            info!(bytes = bytes.len(), "photo received");
        } else {
            if fields.len() >= MAX_FIELDS {
                return Err(BoothError::Upload("Too many fields".into()));
            }
            let bytes = read_limited(&mut field, limit, "Field value too long").await?;
            fields.push((name, String::from_utf8_lossy(&bytes).into_owned()));
        }
    }

    Ok(fields)
}

async fn read_limited(field: &mut Field<'_>, limit: usize, too_large: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| BoothError::Upload(e.body_text()))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(BoothError::Upload(too_large.into()));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
