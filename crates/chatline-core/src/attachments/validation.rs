//! Attachment admission policy
//!
//! Decides which selected files may become pending attachments before any of
//! them is read. Rules run in a fixed order and collect errors instead of
//! stopping at the first one:
//!
//! 1. count: only as many files as there are free slots
//! 2. type: media type must be on the allow-list
//! 3. size: per-file ceiling, then a running aggregate ceiling that stops the batch

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::PendingAttachment;
use crate::error::AttachmentError;

pub const MAX_ATTACHMENTS: usize = 4;
pub const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024; // 2 MiB
pub const MAX_TOTAL_BYTES: u64 = 4 * 1024 * 1024; // 4 MiB

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const IMAGE_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Where the bytes of a selected file come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

/// A file the user picked, described but not yet read
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    /// Size measured at selection time; the decoded byte count is authoritative
    pub(crate) size_bytes: u64,
    pub(crate) source: FileSource,
}

impl SelectedFile {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Describe a file on disk. The media type comes from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            mime_type: mime_type_for_path(path),
            size_bytes: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }
}

/// Check if a media type may be attached
pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    mime_type == PDF_MIME_TYPE || IMAGE_MIME_TYPES.contains(&mime_type)
}

/// Media type for a path, derived from its extension
pub fn mime_type_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => PDF_MIME_TYPE.to_string(),
        "png" => "image/png".to_string(),
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "webp" => "image/webp".to_string(),
        "gif" => "image/gif".to_string(),
        "txt" => "text/plain".to_string(),
        "" => "application/octet-stream".to_string(),
        other => format!("application/x-{}", other),
    }
}

/// Result of running the admission rules over a batch
#[derive(Debug, Default)]
pub struct Admission {
    pub admitted: Vec<SelectedFile>,
    pub errors: Vec<AttachmentError>,
}

/// Apply the count, type and size rules to `files` given what is already pending
pub fn admit(files: Vec<SelectedFile>, pending: &[PendingAttachment]) -> Admission {
    let mut admission = Admission::default();
    let mut candidates = files;

    let free_slots = MAX_ATTACHMENTS.saturating_sub(pending.len());
    if candidates.len() > free_slots {
        let dropped = candidates.len() - free_slots;
        warn!(free_slots, dropped, "Attachment batch exceeds free slots");
        candidates.truncate(free_slots);
        admission.errors.push(AttachmentError::TooMany {
            max: MAX_ATTACHMENTS,
            dropped,
        });
    }

    let mut typed = Vec::with_capacity(candidates.len());
    for file in candidates {
        if is_allowed_mime_type(&file.mime_type) {
            typed.push(file);
        } else {
            debug!(name = %file.name, mime_type = %file.mime_type, "Rejected attachment type");
            admission.errors.push(AttachmentError::UnsupportedType {
                name: file.name,
                mime_type: file.mime_type,
            });
        }
    }

    let mut running_total: u64 = pending.iter().map(|p| p.size_bytes).sum();
    let total = typed.len();
    for (index, file) in typed.into_iter().enumerate() {
        if file.size_bytes > MAX_FILE_BYTES {
            debug!(name = %file.name, size = file.size_bytes, "Rejected oversized attachment");
            admission.errors.push(AttachmentError::FileTooLarge {
                name: file.name,
                size: file.size_bytes,
                max: MAX_FILE_BYTES,
            });
            continue;
        }

        if running_total + file.size_bytes > MAX_TOTAL_BYTES {
            let dropped = total - index;
            warn!(running_total, dropped, "Attachment batch exceeds total size");
            admission.errors.push(AttachmentError::TotalTooLarge {
                max: MAX_TOTAL_BYTES,
                dropped,
            });
            break;
        }

        running_total += file.size_bytes;
        admission.admitted.push(file);
    }

    admission
}
