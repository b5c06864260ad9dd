//! Accepted upload media types.

/// Content types accepted for video uploads.
pub const VIDEO_CONTENT_TYPES: &[&str] = &["video/mp4"];

/// Content types accepted for thumbnail uploads.
pub const THUMBNAIL_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Kind of upload, each with its own allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Thumbnail,
}

impl MediaKind {
    pub fn allowed_content_types(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => VIDEO_CONTENT_TYPES,
            MediaKind::Thumbnail => THUMBNAIL_CONTENT_TYPES,
        }
    }

    /// Check a declared content type against the allow-list.
    ///
    /// Parameters (`; charset=...`) and case are ignored.
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = essence(content_type);
        self.allowed_content_types()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }
}

/// Strip parameters and whitespace from a content type.
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

/// File extension for a content type (`image/png` -> `png`).
pub fn extension_for(content_type: &str) -> &str {
    match essence(content_type).to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "video/mp4" => "mp4",
        _ => {
            let essence = essence(content_type);
            essence
                .split_once('/')
                .map(|(_, subtype)| subtype)
                .filter(|s| !s.is_empty())
                .unwrap_or("bin")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_allow_list() {
        assert!(MediaKind::Video.accepts("video/mp4"));
        assert!(MediaKind::Video.accepts("VIDEO/MP4"));
        assert!(MediaKind::Video.accepts("video/mp4; codecs=avc1"));
        assert!(!MediaKind::Video.accepts("video/quicktime"));
        assert!(!MediaKind::Video.accepts("image/png"));
        assert!(!MediaKind::Video.accepts(""));
    }

    #[test]
    fn test_thumbnail_allow_list() {
        assert!(MediaKind::Thumbnail.accepts("image/jpeg"));
        assert!(MediaKind::Thumbnail.accepts("image/png"));
        assert!(!MediaKind::Thumbnail.accepts("image/gif"));
        assert!(!MediaKind::Thumbnail.accepts("video/mp4"));
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png; q=1"), "png");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("garbage"), "bin");
    }
}
