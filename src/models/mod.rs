//! Core data structures shared across the pipeline.

mod attachment;
mod collection;
mod paper;

pub use attachment::{Attachment, AttachmentKind, AttachmentStatus};
pub use collection::{build_tree, Collection, CollectionRow};
pub use paper::{Author, ItemType, PaperRecord, RawExtraction, SourceKind, SourceUrl};
