use serde::{Deserialize, Serialize};

use crate::fs::FileNode;

/// Coarse content type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
    Text,
    Other,
}

impl MediaKind {
    /// Whether a playlist should carry this kind.
    pub fn is_playable(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::Audio)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Image => write!(f, "image"),
            MediaKind::Text => write!(f, "text"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

pub trait MediaClassifier {
    fn classify(&self, node: &FileNode) -> MediaKind;
}

/// Infers the kind from the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeClassifier;

impl MediaClassifier for MimeClassifier {
    fn classify(&self, node: &FileNode) -> MediaKind {
        if node.is_dir {
            return MediaKind::Other;
        }
        let Some(mime) = mime_guess::from_path(&node.name).first() else {
            return MediaKind::Other;
        };
        match mime.type_().as_str() {
            "video" => MediaKind::Video,
            "audio" => MediaKind::Audio,
            "image" => MediaKind::Image,
            "text" => MediaKind::Text,
            _ => MediaKind::Other,
        }
    }
}
