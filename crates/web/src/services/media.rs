//! Photo storage.
//!
//! Uploaded store photos are decoded, resized to a fixed display width, and
//! written to the upload directory under a generated name. The directory is
//! served as static files by the router.

use std::path::PathBuf;

use image::{DynamicImage, ImageFormat, imageops::FilterType};
use thiserror::Error;
use uuid::Uuid;

/// Photos wider than this are scaled down, preserving aspect ratio.
const TARGET_WIDTH: u32 = 800;

/// Errors that can occur while storing a photo.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The upload was not an image type we can decode.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The bytes could not be decoded as the claimed format.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking image task panicked or was cancelled.
    #[error("image task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Stores uploaded photos on the local filesystem.
#[derive(Debug, Clone)]
pub struct MediaStore {
    upload_dir: PathBuf,
}

impl MediaStore {
    /// Create a media store rooted at `upload_dir`.
    #[must_use]
    pub const fn new(upload_dir: PathBuf) -> Self {
        Self { upload_dir }
    }

    /// Resize and persist an uploaded photo, returning the stored filename.
    ///
    /// The filename is generated server-side; client-supplied names are
    /// never used for the file on disk.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::UnsupportedMediaType` if `mime` is not a
    /// decodable image type, `MediaError::Image` if the bytes do not decode,
    /// or `MediaError::Io` if the file cannot be written.
    pub async fn store_photo(&self, data: Vec<u8>, mime: &str) -> Result<String, MediaError> {
        let format = format_for_mime(mime)?;
        let extension = extension_for_format(format);

        let filename = format!("{}.{extension}", Uuid::new_v4());
        let path = self.upload_dir.join(&filename);

        // Decode and resize on a blocking thread; large JPEGs take long
        // enough to stall the runtime otherwise.
        tokio::task::spawn_blocking(move || -> Result<(), MediaError> {
            let img = image::load_from_memory(&data)?;
            let resized = resize_to_width(&img, TARGET_WIDTH);
            resized.save_with_format(&path, format)?;
            Ok(())
        })
        .await??;

        Ok(filename)
    }
}

/// Map an upload's MIME type to a decodable image format.
fn format_for_mime(mime: &str) -> Result<ImageFormat, MediaError> {
    let subtype = mime
        .strip_prefix("image/")
        .ok_or_else(|| MediaError::UnsupportedMediaType(mime.to_owned()))?;

    ImageFormat::from_extension(subtype)
        .ok_or_else(|| MediaError::UnsupportedMediaType(mime.to_owned()))
}

/// Preferred file extension for a format.
fn extension_for_format(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("bin")
}

/// Scale an image to exactly `width`, preserving aspect ratio. Narrower
/// images are scaled up; every stored photo ends up the same width.
fn resize_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    if img.width() == width {
        return img.clone();
    }
    let height = (u64::from(img.height()) * u64::from(width) / u64::from(img.width())).max(1);
    #[allow(clippy::cast_possible_truncation)]
    img.resize_exact(width, height as u32, FilterType::Lanczos3)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_mime_accepts_images() {
        assert_eq!(format_for_mime("image/jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for_mime("image/png").unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_format_for_mime_rejects_non_images() {
        assert!(matches!(
            format_for_mime("application/pdf"),
            Err(MediaError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            format_for_mime("text/html"),
            Err(MediaError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_resize_scales_wide_images_down() {
        let img = DynamicImage::new_rgb8(1600, 900);
        let resized = resize_to_width(&img, TARGET_WIDTH);
        assert_eq!(resized.width(), TARGET_WIDTH);
        assert_eq!(resized.height(), 450);
    }

    #[test]
    fn test_resize_scales_narrow_images_up() {
        let img = DynamicImage::new_rgb8(400, 300);
        let resized = resize_to_width(&img, TARGET_WIDTH);
        assert_eq!(resized.width(), TARGET_WIDTH);
        assert_eq!(resized.height(), 600);
    }

    #[tokio::test]
    async fn test_store_photo_writes_resized_file() {
        let dir = std::env::temp_dir().join(format!("media-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(1000, 500)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let store = MediaStore::new(dir.clone());
        let filename = store.store_photo(bytes, "image/png").await.unwrap();
        assert!(filename.ends_with(".png"));

        let saved = image::open(dir.join(&filename)).unwrap();
        assert_eq!(saved.width(), TARGET_WIDTH);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_store_photo_rejects_unsupported_type() {
        let store = MediaStore::new(std::env::temp_dir());
        let result = store.store_photo(b"%PDF-1.4".to_vec(), "application/pdf").await;
        assert!(matches!(result, Err(MediaError::UnsupportedMediaType(_))));
    }
}
