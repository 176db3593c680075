//! Turn-scoped binary attachments (documents and images).
//!
//! An attachment lives only for the turn that introduced it: it is validated
//! by the ingest node, consumed by the generation node, and never persisted
//! in a checkpoint.

use serde::{Deserialize, Serialize};

/// The declared media kind of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Pdf,
    Png,
    Jpeg,
}

impl AttachmentKind {
    /// The MIME type sent to the model provider.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Short label used in audit records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png | Self::Jpeg => "image",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mime())
    }
}

/// A decoded binary payload submitted alongside a turn's text.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Caller-declared file name, if any (sanitized by the ingest node).
    pub name: Option<String>,

    /// Declared media kind.
    pub kind: AttachmentKind,

    /// Decoded payload bytes.
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(kind: AttachmentKind, data: Vec<u8>) -> Self {
        Self {
            name: None,
            kind,
            data,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Decoded payload size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
