use async_trait::async_trait;
use image::RgbaImage;
use log::warn;
use cb_canvas::{decode_background, placeholder_background};
use crate::error::AppError;
use crate::generator::backend::ensure_success;

/// Size of the sheet shown in place of an image that could not be loaded.
pub const PLACEHOLDER_SIZE: (u32, u32) = (512, 512);

#[async_trait]
pub trait ImageFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

/// Fetches `http(s)://` URLs over the network and anything else from disk.
#[derive(Debug, Clone, Default)]
pub struct HttpImageFetch {
    client: reqwest::Client,
}

impl HttpImageFetch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetch for HttpImageFetch {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = ensure_success(self.client.get(url).send().await?).await?;
            return Ok(response.bytes().await?.to_vec());
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        tokio::fs::read(path).await.map_err(|source| AppError::Io {
            path: path.to_string(),
            source,
        })
    }
}

/// A decoded image, or the placeholder shown instead.
#[derive(Debug, Clone)]
pub enum Preview {
    Ready(RgbaImage),
    Placeholder { image: RgbaImage, reason: String },
}

impl Preview {
    pub fn image(&self) -> &RgbaImage {
        match self {
            Self::Ready(image) | Self::Placeholder { image, .. } => image,
        }
    }

    pub fn into_image(self) -> RgbaImage {
        match self {
            Self::Ready(image) | Self::Placeholder { image, .. } => image,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

/// Fetch and decode `url`. Failures never escape: they become a placeholder.
pub async fn fetch_preview(fetcher: &dyn ImageFetch, url: &str) -> Preview {
    let reason = match fetcher.fetch(url).await {
        Ok(bytes) => match decode_background(&bytes) {
            Ok(image) => return Preview::Ready(image),
            Err(e) => e.to_string(),
        },
        Err(e) => e.to_string(),
    };

    warn!("Showing placeholder for {}: {}", url, reason);
    let (width, height) = PLACEHOLDER_SIZE;
    Preview::Placeholder {
        image: placeholder_background(width, height),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_canvas::encode_png;

    struct FixedFetch(Result<Vec<u8>, u16>);

    #[async_trait]
    impl ImageFetch for FixedFetch {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, AppError> {
            self.0.clone().map_err(|status| AppError::Backend { status, body: "gone".into() })
        }
    }

    #[tokio::test]
    async fn test_decodes_good_bytes() {
        let png = encode_png(&placeholder_background(4, 3)).unwrap();
        let preview = fetch_preview(&FixedFetch(Ok(png)), "https://cdn.test/a.png").await;
        assert!(!preview.is_placeholder());
        assert_eq!(preview.image().dimensions(), (4, 3));
    }

    #[tokio::test]
    async fn test_fetch_error_becomes_placeholder() {
        let preview = fetch_preview(&FixedFetch(Err(404)), "https://cdn.test/a.png").await;
        match preview {
            Preview::Placeholder { image, reason } => {
                assert_eq!(image.dimensions(), PLACEHOLDER_SIZE);
                assert!(reason.contains("404"));
            }
            Preview::Ready(_) => panic!("expected placeholder"),
        }
    }

    #[tokio::test]
    async fn test_garbage_bytes_become_placeholder() {
        let preview = fetch_preview(&FixedFetch(Ok(b"<html>".to_vec())), "https://cdn.test/a.png").await;
        assert!(preview.is_placeholder());
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let err = HttpImageFetch::default().fetch("/definitely/not/here.png").await.unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }
}
