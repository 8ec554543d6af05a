pub mod metadata;
pub mod payload;
pub mod record;

pub use metadata::{DownloadEntry, DownloadMetadata, FailedEntry};
pub use payload::{AnswerGroup, EmbeddedPayload, PayloadOption, RightAnswer};
pub use record::{Record, StoredRecord};
