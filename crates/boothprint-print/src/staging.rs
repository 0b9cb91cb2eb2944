// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image staging.
//
// `lp` prints files, so every image is put on disk in the staging directory
// first.  The staged file belongs to the request that created it and is
// removed once the spooler is done with it, whatever the outcome.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use tracing::{debug, info, warn};
use uuid::Uuid;

use boothprint_core::error::{BoothError, Result};
use boothprint_core::types::ImageSource;

/// Standard alphabet, padding optional.  Booth apps are not consistent
/// about trailing `=`.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An image on disk waiting to be printed.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// Take ownership of a file the HTTP layer already wrote.
    pub fn adopt(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file.  Failures are logged and otherwise ignored: the
    /// staging directory is scratch space.
    pub async fn remove(mut self) {
        let path = std::mem::take(&mut self.path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "staged file removed"),
            Err(e) => debug!(path = %path.display(), error = %e, "could not remove staged file"),
        }
    }
}

/// Files never handed to `remove` (a panicking handler, a dropped request
/// future) are deleted here, synchronously.
impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.path.as_os_str().is_empty() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => warn!(path = %self.path.display(), "staged file removed on drop"),
            Err(e) => debug!(path = %self.path.display(), error = %e, "could not remove staged file"),
        }
    }
}

/// Put the request's image into `dir`.
pub async fn stage(source: &ImageSource, dir: &Path) -> Result<StagedFile> {
    match source {
        ImageSource::Uploaded { path } => {
            info!(path = %path.display(), "photo uploaded");
            Ok(StagedFile::adopt(path.clone()))
        }
        ImageSource::Base64 { payload } => {
            let (bytes, extension) = decode_image_payload(payload)?;
            let path = dir.join(staged_name(extension));
            tokio::fs::write(&path, &bytes).await?;
            info!(path = %path.display(), bytes = bytes.len(), "image saved");
            Ok(StagedFile { path })
        }
    }
}

/// Write an uploaded file body into `dir` under a fresh name.
pub async fn write_upload(dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(format!("upload_{}", Uuid::new_v4().simple()));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Decode a base64 image, with or without a `data:image/<type>;base64,`
/// prefix.  Returns the bytes and a file extension for the staged copy.
pub fn decode_image_payload(payload: &str) -> Result<(Vec<u8>, &'static str)> {
    let (subtype, body) = split_data_uri(payload);

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| BoothError::InvalidImageData(e.to_string()))?;
    if bytes.is_empty() {
        return Err(BoothError::InvalidImageData("decoded image is empty".into()));
    }

    Ok((bytes, extension_for(subtype)))
}

/// Split off a `data:image/<word>;base64,` prefix.  Anything else is
/// returned untouched as the body.
fn split_data_uri(payload: &str) -> (Option<&str>, &str) {
    let Some(rest) = payload.strip_prefix("data:image/") else {
        return (None, payload);
    };
    let Some((subtype, body)) = rest.split_once(";base64,") else {
        return (None, payload);
    };
    let is_word = !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_word {
        (Some(subtype), body)
    } else {
        (None, payload)
    }
}

fn extension_for(subtype: Option<&str>) -> &'static str {
    match subtype.map(str::to_ascii_lowercase).as_deref() {
        Some("png") => "png",
        Some("gif") => "gif",
        Some("webp") => "webp",
        Some("bmp") => "bmp",
        Some("tiff") => "tiff",
        _ => "jpg",
    }
}

/// `print_<unix millis>_<8 hex>.<ext>`: time keeps names ordered, the uuid
/// fragment keeps two requests in the same millisecond apart.
fn staged_name(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let tag = Uuid::new_v4().simple().to_string();
    format!("print_{millis}_{}.{extension}", &tag[..8])
}
