use futures::future::join_all;
use tracing::{debug, warn};

use super::data_url::build_data_url;
use super::validation::{FileSource, MAX_FILE_BYTES, MAX_TOTAL_BYTES, SelectedFile, admit};
use super::PendingAttachment;
use crate::error::AttachmentError;

/// Result of ingesting one batch of selected files
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Newly decoded attachments, in selection order
    pub added: Vec<PendingAttachment>,
    pub errors: Vec<AttachmentError>,
}

impl IngestOutcome {
    /// Human-readable summary of everything that went wrong, if anything did
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

/// Validate a batch against the already-pending set and decode what is admitted.
///
/// Files decode concurrently; the call returns once every decode has settled.
/// A failed decode drops only that file.
pub async fn ingest_files(files: Vec<SelectedFile>, pending: &[PendingAttachment]) -> IngestOutcome {
    let batch_size = files.len();
    let admission = admit(files, pending);
    let mut errors = admission.errors;

    debug!(
        batch_size,
        admitted = admission.admitted.len(),
        "Decoding admitted attachments"
    );

    let results = join_all(admission.admitted.into_iter().map(decode_file)).await;

    let mut decoded = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result {
            Ok(attachment) => decoded.push(attachment),
            Err(e) => {
                warn!(error = %e, "Failed to decode attachment");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        errors.push(AttachmentError::DecodeFailed { failed });
    }

    let added = enforce_total(decoded, pending, &mut errors);
    IngestOutcome { added, errors }
}

/// Re-apply the aggregate ceiling to the bytes actually read, in selection order
fn enforce_total(
    decoded: Vec<PendingAttachment>,
    pending: &[PendingAttachment],
    errors: &mut Vec<AttachmentError>,
) -> Vec<PendingAttachment> {
    let mut running_total: u64 = pending.iter().map(|p| p.size_bytes).sum();
    let total = decoded.len();
    let mut added = Vec::with_capacity(total);

    for (index, attachment) in decoded.into_iter().enumerate() {
        if running_total + attachment.size_bytes > MAX_TOTAL_BYTES {
            let dropped = total - index;
            warn!(running_total, dropped, "Decoded attachments exceed total size");
            errors.push(AttachmentError::TotalTooLarge {
                max: MAX_TOTAL_BYTES,
                dropped,
            });
            break;
        }
        running_total += attachment.size_bytes;
        added.push(attachment);
    }

    added
}

async fn decode_file(file: SelectedFile) -> std::io::Result<PendingAttachment> {
    let bytes = match file.source {
        FileSource::Path(ref path) => tokio::fs::read(path).await?,
        FileSource::Memory(ref bytes) => bytes.clone(),
    };

    // The file may have grown since it was measured
    let size_bytes = bytes.len() as u64;
    if size_bytes > MAX_FILE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{} grew to {} bytes after selection", file.name, size_bytes),
        ));
    }

    Ok(PendingAttachment {
        data_url: build_data_url(&file.mime_type, &bytes),
        name: file.name,
        mime_type: file.mime_type,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::validation::PDF_MIME_TYPE;

    #[tokio::test]
    async fn test_ingest_memory_files() {
        let files = vec![
            SelectedFile::from_bytes("a.png", "image/png", b"Hello".to_vec()),
            SelectedFile::from_bytes("b.pdf", PDF_MIME_TYPE, vec![1, 2, 3]),
        ];

        let outcome = ingest_files(files, &[]).await;

        assert!(outcome.error_summary().is_none());
        assert_eq!(outcome.added.len(), 2);
        assert_eq!(outcome.added[0].data_url, "data:image/png;base64,SGVsbG8=");
        assert_eq!(outcome.added[1].size_bytes, 3);
    }

    #[tokio::test]
    async fn test_partial_decode_failure_keeps_successes() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        std::fs::write(&good, b"png-bytes").unwrap();

        let good_file = SelectedFile::from_path(&good).await.unwrap();
        let missing = SelectedFile {
            name: "gone.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 10,
            source: FileSource::Path(dir.path().join("gone.png")),
        };

        let outcome = ingest_files(vec![missing, good_file], &[]).await;

        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.added[0].name, "good.png");
        assert_eq!(
            outcome.errors,
            vec![AttachmentError::DecodeFailed { failed: 1 }]
        );
        assert_eq!(
            outcome.error_summary().as_deref(),
            Some("Failed to read 1 file(s).")
        );
    }

    #[tokio::test]
    async fn test_validation_and_decode_errors_are_combined() {
        let files = vec![
            SelectedFile::from_bytes("notes.txt", "text/plain", b"x".to_vec()),
            SelectedFile::from_bytes("ok.gif", "image/gif", b"GIF89a".to_vec()),
        ];

        let outcome = ingest_files(files, &[]).await;

        assert_eq!(outcome.added.len(), 1);
        let summary = outcome.error_summary().unwrap();
        assert!(summary.contains("notes.txt"));
    }

    #[tokio::test]
    async fn test_total_rechecked_against_bytes_read() {
        let understated = |name: &str| SelectedFile {
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 1,
            source: FileSource::Memory(vec![0u8; MAX_FILE_BYTES as usize]),
        };
        let files = vec![understated("a.png"), understated("b.png"), understated("c.png")];

        let outcome = ingest_files(files, &[]).await;

        assert_eq!(outcome.added.len(), 2);
        let total: u64 = outcome.added.iter().map(|a| a.size_bytes).sum();
        assert!(total <= MAX_TOTAL_BYTES);
        assert_eq!(
            outcome.errors,
            vec![AttachmentError::TotalTooLarge {
                max: MAX_TOTAL_BYTES,
                dropped: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_total_recheck_counts_pending() {
        let pending = vec![PendingAttachment {
            name: "big.pdf".to_string(),
            mime_type: PDF_MIME_TYPE.to_string(),
            data_url: String::new(),
            size_bytes: MAX_TOTAL_BYTES - 10,
        }];
        let file = SelectedFile {
            name: "grown.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 5,
            source: FileSource::Memory(vec![0u8; 64]),
        };

        let outcome = ingest_files(vec![file], &pending).await;

        assert!(outcome.added.is_empty());
        assert_eq!(
            outcome.errors,
            vec![AttachmentError::TotalTooLarge {
                max: MAX_TOTAL_BYTES,
                dropped: 1
            }]
        );
    }
}
