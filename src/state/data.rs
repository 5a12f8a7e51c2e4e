//! Shared data structures for the upload session
//!
//! These structs are the values that flow between the file picker,
//! the session controller and the processing client.

use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::error::UploadError;

/// Media type used when the extension tells us nothing
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// A file the user picked or dropped, read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Where the file came from (empty for in-memory files)
    pub path: PathBuf,
    /// File name sent with the multipart part
    pub name: String,
    /// Media type derived from the extension
    pub media_type: String,
    /// Size on disk in bytes
    pub size: u64,
    /// File contents (at most one byte past the read limit)
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Build a file from bytes already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = declared_media_type(Path::new(&name));

        Self {
            path: PathBuf::new(),
            size: bytes.len() as u64,
            name,
            media_type,
            bytes,
        }
    }

    /// Read a file from disk.
    ///
    /// Reads at most `read_limit + 1` bytes so an oversized drop never
    /// pulls the whole file into memory; `size` always comes from metadata.
    pub async fn open(path: PathBuf, read_limit: u64) -> Result<Self, UploadError> {
        let io_error = |err: std::io::Error| UploadError::Io {
            path: path.clone(),
            reason: err.to_string(),
        };

        let metadata = tokio::fs::metadata(&path).await.map_err(io_error)?;
        if !metadata.is_file() {
            return Err(UploadError::Io {
                path: path.clone(),
                reason: "not a regular file".to_string(),
            });
        }

        let file = tokio::fs::File::open(&path).await.map_err(io_error)?;
        let mut bytes = Vec::with_capacity(metadata.len().min(read_limit) as usize);
        file.take(read_limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .await
            .map_err(io_error)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            media_type: declared_media_type(&path),
            size: metadata.len(),
            name,
            bytes,
            path,
        })
    }

    /// Pixel size of the image, if the header can be read
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image_dimensions(&self.bytes)
    }
}

/// Media type for a path, the way a browser fills in `File.type`.
pub fn declared_media_type(path: &Path) -> String {
    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => return UNKNOWN_MEDIA_TYPE.to_string(),
    };

    if extension == "pdf" {
        return "application/pdf".to_string();
    }

    ImageFormat::from_extension(&extension)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| UNKNOWN_MEDIA_TYPE.to_string())
}

/// Read width and height from an encoded image header
pub fn image_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Where a processed image came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSource {
    /// Base64 payload inside the JSON response
    Embedded,
    /// Fetched from a URL the service pointed at
    Remote(url::Url),
}

/// What the processing service gave back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessedResult {
    Image { bytes: Vec<u8>, source: ResultSource },
    /// Text result of the URL-reference flow (an exam grade)
    Grade(String),
}

/// What a request sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    File(SelectedFile),
    DocumentUrl(url::Url),
}

/// One request the session wants made, tagged with its session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub token: u64,
    pub payload: Payload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_declared_media_type() {
        assert_eq!(declared_media_type(Path::new("scan.JPG")), "image/jpeg");
        assert_eq!(declared_media_type(Path::new("scan.png")), "image/png");
        assert_eq!(declared_media_type(Path::new("exam.pdf")), "application/pdf");
        assert_eq!(declared_media_type(Path::new("notes.txt")), UNKNOWN_MEDIA_TYPE);
        assert_eq!(declared_media_type(Path::new("README")), UNKNOWN_MEDIA_TYPE);
    }

    #[test]
    fn test_from_bytes() {
        let file = SelectedFile::from_bytes("photo.webp", vec![1, 2, 3]);
        assert_eq!(file.media_type, "image/webp");
        assert_eq!(file.size, 3);
    }

    #[test]
    fn test_dimensions_of_png() {
        let img = image::RgbImage::from_pixel(4, 3, image::Rgb([255, 0, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let file = SelectedFile::from_bytes("red.png", bytes);
        assert_eq!(file.dimensions(), Some((4, 3)));
        assert_eq!(image_dimensions(b"not an image"), None);
    }

    #[tokio::test]
    async fn test_open_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("page.jpeg");
        std::fs::write(&path, vec![7u8; 2048]).unwrap();

        let file = SelectedFile::open(path.clone(), 1024 * 1024).await.unwrap();
        assert_eq!(file.name, "page.jpeg");
        assert_eq!(file.media_type, "image/jpeg");
        assert_eq!(file.size, 2048);
        assert_eq!(file.bytes.len(), 2048);
        assert_eq!(file.path, path);
    }

    #[tokio::test]
    async fn test_open_stops_past_read_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.png");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        let file = SelectedFile::open(path, 100).await.unwrap();
        assert_eq!(file.size, 4096);
        assert_eq!(file.bytes.len(), 101);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let result = SelectedFile::open(PathBuf::from("/nonexistent/path.png"), 10).await;
        assert!(matches!(result, Err(UploadError::Io { .. })));
    }
}
