pub mod attachments;
pub mod composer;
pub mod error;
pub mod markdown;
pub mod message;
pub mod models;
pub mod session;
pub mod settings;
pub mod transport;

pub use attachments::{PendingAttachment, SelectedFile};
pub use error::{AttachmentError, ChatError, ChatResult};
pub use message::{AttachmentMeta, ConversationUsage, Message, ResponseMetrics, Role};
pub use models::{DEFAULT_MODEL, ModelCatalog, ModelMetadata, ReasoningEffort};
pub use session::{ChatSession, SessionState};
pub use settings::ChatSettings;
pub use transport::{ChatResponse, ChatTransport, HttpTransport};
