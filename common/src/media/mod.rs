pub mod cloudinary;
pub mod reconciler;
pub mod test_media;

use std::sync::Arc;

use async_trait::async_trait;
use derive_more::Display;

pub use reconciler::{MediaPlan, Reconciler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MediaKind {
    #[display(fmt = "image")]
    Image,
    #[display(fmt = "video")]
    Video,
}

/// Declares one media-bearing field of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaSlot {
    /// Stored field name.
    pub field: &'static str,
    /// Multipart part name the files arrive under.
    pub form_field: &'static str,
    pub kind: MediaKind,
    pub max: usize,
    pub list: bool,
}

impl MediaSlot {
    pub const fn single(field: &'static str, form_field: &'static str, kind: MediaKind) -> Self {
        Self {
            field,
            form_field,
            kind,
            max: 1,
            list: false,
        }
    }

    pub const fn list(
        field: &'static str,
        form_field: &'static str,
        kind: MediaKind,
        max: usize,
    ) -> Self {
        Self {
            field,
            form_field,
            kind,
            max,
            list: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: &UploadedFile, kind: MediaKind) -> anyhow::Result<StoredAsset>;

    /// Returns whether the host confirmed the removal.
    async fn destroy(&self, public_id: &str, kind: MediaKind) -> anyhow::Result<bool>;

    fn public_id(&self, url: &str) -> Option<String> {
        public_id_from_url(url)
    }
}

pub type MediaObject = Arc<dyn MediaStore>;

/// Extracts the asset identifier from a delivery URL such as
/// `https://res.cloudinary.com/<cloud>/image/upload/<transforms>/v123/<folder>/<name>.jpg`.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, path) = url.split_once("/upload/")?;
    let path = path.split(|x: char| x == '?' || x == '#').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|x| !x.is_empty()).collect();

    let start = segments
        .iter()
        .position(|segment| is_version(segment))
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let segments = &segments[start..];
    let (last, folders) = segments.split_last()?;

    let name = match last.rsplit_once('.') {
        Some((name, _)) if !name.is_empty() => name,
        _ => last,
    };

    let mut public_id = folders.join("/");
    if !public_id.is_empty() {
        public_id.push('/');
    }
    public_id.push_str(name);
    Some(public_id)
}

fn is_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|x| x.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_id_skips_version_and_extension() {
        assert_eq!(
            public_id_from_url(
                "https://res.cloudinary.com/demo/image/upload/v1712345678/showroom/vehicles/abc.jpg"
            ),
            Some("showroom/vehicles/abc".to_string())
        );
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/video/upload/clip.mp4"),
            Some("clip".to_string())
        );
        assert_eq!(
            public_id_from_url(
                "https://res.cloudinary.com/demo/image/upload/c_fill,w_300/v42/blog_posts/x.png?x=1"
            ),
            Some("blog_posts/x".to_string())
        );
    }

    #[test]
    fn foreign_urls_have_no_public_id() {
        assert_eq!(public_id_from_url("https://example.com/image.jpg"), None);
        assert_eq!(public_id_from_url(""), None);
    }
}
