//! Attachment state for a save session.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What ends up attached to the bibliographic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Pdf,
    Link,
}

/// Download lifecycle. Transitions are monotonic: `Pending -> Downloaded` or
/// `Pending -> Failed`, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    Pending,
    Downloaded,
    Failed,
}

/// The PDF bytes or, after degradation, a verified hyperlink.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub status: AttachmentStatus,
    /// Downloaded PDF content; empty for link attachments.
    pub bytes: Vec<u8>,
    /// The URL this attachment was (or would have been) fetched from.
    pub url: String,
    /// Download attempts performed across all candidates.
    pub attempts: u32,
}

impl Attachment {
    /// A PDF attachment awaiting download.
    pub fn pending_pdf(url: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Pdf,
            status: AttachmentStatus::Pending,
            bytes: Vec::new(),
            url: url.into(),
            attempts: 0,
        }
    }

    /// The degraded outcome: a link attachment standing in for a PDF that
    /// could not be fetched. Created already resolved.
    pub fn link(url: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Link,
            status: AttachmentStatus::Downloaded,
            bytes: Vec::new(),
            url: url.into(),
            attempts: 0,
        }
    }

    pub fn mark_downloaded(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.transition(AttachmentStatus::Downloaded)?;
        self.bytes = bytes;
        Ok(())
    }

    pub fn mark_failed(&mut self) -> Result<()> {
        self.transition(AttachmentStatus::Failed)
    }

    fn transition(&mut self, next: AttachmentStatus) -> Result<()> {
        if self.status != AttachmentStatus::Pending {
            return Err(Error::InvalidRequest(format!(
                "attachment transition {:?} -> {:?} is not allowed",
                self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}
