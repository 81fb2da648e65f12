pub mod data_url;
pub mod ingest;
pub mod validation;

pub use ingest::{IngestOutcome, ingest_files};
pub use validation::{
    FileSource, MAX_ATTACHMENTS, MAX_FILE_BYTES, MAX_TOTAL_BYTES, SelectedFile, admit,
    is_allowed_mime_type,
};

use serde::Serialize;

use crate::message::AttachmentMeta;

/// A validated, decoded file waiting to be sent with the next message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAttachment {
    pub name: String,
    pub mime_type: String,
    pub data_url: String,
    #[serde(skip)]
    pub size_bytes: u64,
}

impl PendingAttachment {
    pub fn to_meta(&self) -> AttachmentMeta {
        AttachmentMeta {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
        }
    }

    /// Base64 payload without the media-type prefix
    pub fn payload(&self) -> Option<&str> {
        data_url::parse_data_url(&self.data_url).map(|(_, payload)| payload)
    }

    /// Whether the data URL prefix agrees with the declared media type
    pub fn mime_matches(&self) -> bool {
        data_url::parse_data_url(&self.data_url).is_some_and(|(mime, _)| mime == self.mime_type)
    }
}
