//! Image I/O operations service
//!
//! This module separates file I/O and content sniffing from the queue logic,
//! making intake decisions testable without touching the filesystem.

use crate::{
    error::{StudioError, Result},
    types::SourceFile,
};
use std::io::Cursor;
use std::path::Path;

/// Extensions accepted when scanning directories for images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif", "gif"];

/// MIME type sent by clients that do not know the content type
const GENERIC_MIME: &str = "application/octet-stream";

/// Service for image file input/output and type detection
pub struct ImageIOService;

impl ImageIOService {
    /// Load a source file from disk
    ///
    /// The declared MIME type is guessed from the extension, mirroring what a
    /// browser reports for a picked file.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bgremove_studio::services::ImageIOService;
    ///
    /// let file = ImageIOService::load_source("input.jpg")?;
    /// assert!(file.is_image());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_source<P: AsRef<Path>>(path: P) -> Result<SourceFile> {
        let path_ref = path.as_ref();

        let bytes = std::fs::read(path_ref)
            .map_err(|e| StudioError::file_io_error("read image file", path_ref, &e))?;

        let name = path_ref
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_ref.display().to_string());

        let declared = mime_guess::from_path(path_ref)
            .first()
            .map(|m| m.essence_str().to_string());

        log::debug!(
            "Loaded {} ({} bytes, declared type: {})",
            path_ref.display(),
            bytes.len(),
            declared.as_deref().unwrap_or("unknown")
        );

        Ok(SourceFile::new(name, declared.as_deref(), bytes))
    }

    /// Resolve the image MIME type of a file, or `None` if it is not an image
    ///
    /// Resolution order:
    /// 1. a declared `image/*` type is accepted as-is
    /// 2. a declared specific non-image type is rejected
    /// 3. magic-byte sniffing of the content
    /// 4. extension guess from the file name
    pub fn detect_image_mime(name: &str, declared: Option<&str>, bytes: &[u8]) -> Option<String> {
        if let Some(declared) = declared.map(str::trim).filter(|m| !m.is_empty()) {
            let lowered = declared.to_ascii_lowercase();
            if lowered.starts_with("image/") {
                return Some(lowered);
            }
            if lowered != GENERIC_MIME {
                log::debug!("Rejecting {}: declared type {} is not an image", name, declared);
                return None;
            }
        }

        if let Some(sniffed) = Self::sniff_mime(bytes) {
            return Some(sniffed.to_string());
        }

        if bytes.is_empty() {
            return None;
        }

        mime_guess::from_path(name)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
    }

    /// Detect an image MIME type from binary data by examining magic bytes
    #[must_use]
    pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data
            .get(0..8)
            .is_some_and(|slice| slice == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
        {
            return Some("image/png");
        }

        // JPEG: FF D8 FF
        if data.get(0..3).is_some_and(|slice| slice == [0xFF, 0xD8, 0xFF]) {
            return Some("image/jpeg");
        }

        // WebP: RIFF....WEBP
        if data.get(0..4).is_some_and(|slice| slice == b"RIFF")
            && data.get(8..12).is_some_and(|slice| slice == b"WEBP")
        {
            return Some("image/webp");
        }

        // TIFF, little and big endian
        if data
            .get(0..4)
            .is_some_and(|slice| slice == [0x49, 0x49, 0x2A, 0x00] || slice == [0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some("image/tiff");
        }

        if Self::is_bmp_header(data) {
            return Some("image/bmp");
        }

        // GIF: GIF8
        if data.get(0..4).is_some_and(|slice| slice == b"GIF8") {
            return Some("image/gif");
        }

        // `guess_format` accepts BMP on the two-byte magic alone
        image::guess_format(data)
            .ok()
            .filter(|format| *format != image::ImageFormat::Bmp)
            .map(|format| format.to_mime_type())
    }

    /// BMP file header: `BM`, zeroed reserved fields and a known DIB header size
    fn is_bmp_header(data: &[u8]) -> bool {
        const DIB_HEADER_SIZES: [u32; 7] = [12, 40, 52, 56, 64, 108, 124];

        let dib_size = data
            .get(14..18)
            .and_then(|slice| <[u8; 4]>::try_from(slice).ok())
            .map(u32::from_le_bytes);

        data.get(0..2).is_some_and(|magic| magic == b"BM")
            && data
                .get(6..10)
                .is_some_and(|reserved| reserved.iter().all(|&b| b == 0))
            && dib_size.is_some_and(|size| DIB_HEADER_SIZES.contains(&size))
    }

    /// Read pixel dimensions from an encoded image header
    #[must_use]
    pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    /// Check if a path looks like an image based on its extension
    #[must_use]
    pub fn has_image_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    /// Write bytes to a file, creating the parent directory if needed
    pub fn write_bytes<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StudioError::file_io_error("create output directory", parent, &e))?;
        }

        std::fs::write(path_ref, bytes)
            .map_err(|e| StudioError::file_io_error("write output file", path_ref, &e))?;

        log::debug!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use tempfile::tempdir;

    fn encoded(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::new(width, height);
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), format)
            .unwrap();
        buffer
    }

    fn encoded_png(width: u32, height: u32) -> Vec<u8> {
        encoded(ImageFormat::Png, width, height)
    }

    #[test]
    fn test_sniff_mime_known_formats() {
        assert_eq!(
            ImageIOService::sniff_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            Some("image/png")
        );
        assert_eq!(
            ImageIOService::sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]),
            Some("image/jpeg")
        );
        assert_eq!(
            ImageIOService::sniff_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some("image/webp")
        );
        assert_eq!(
            ImageIOService::sniff_mime(&[0x49, 0x49, 0x2A, 0x00]),
            Some("image/tiff")
        );
        assert_eq!(
            ImageIOService::sniff_mime(&[0x4D, 0x4D, 0x00, 0x2A]),
            Some("image/tiff")
        );
        assert_eq!(
            ImageIOService::sniff_mime(&encoded(ImageFormat::Bmp, 3, 2)),
            Some("image/bmp")
        );
        assert_eq!(ImageIOService::sniff_mime(b"GIF89a"), Some("image/gif"));
    }

    #[test]
    fn test_sniff_mime_rejects_other_content() {
        assert_eq!(ImageIOService::sniff_mime(b"hello world"), None);
        assert_eq!(ImageIOService::sniff_mime(b"%PDF-1.7"), None);
        assert_eq!(ImageIOService::sniff_mime(&[0x89, 0x50]), None);
        assert_eq!(ImageIOService::sniff_mime(&[]), None);
    }

    #[test]
    fn test_text_starting_with_bm_is_not_an_image() {
        let text = b"BMW service history: oil change at 40,000 km, brakes at 55,000 km";
        assert_eq!(ImageIOService::sniff_mime(text), None);
        assert_eq!(ImageIOService::detect_image_mime("history", None, text), None);
        assert_eq!(
            ImageIOService::detect_image_mime("history", Some("application/octet-stream"), text),
            None
        );

        let bmp = encoded(ImageFormat::Bmp, 2, 2);
        assert_eq!(
            ImageIOService::detect_image_mime("upload", None, &bmp),
            Some("image/bmp".to_string())
        );
    }

    #[test]
    fn test_detect_image_mime_declared_type_wins() {
        assert_eq!(
            ImageIOService::detect_image_mime("a.png", Some("image/png"), b"not really"),
            Some("image/png".to_string())
        );
        assert_eq!(
            ImageIOService::detect_image_mime("a.PNG", Some("IMAGE/PNG"), b""),
            Some("image/png".to_string())
        );
        // A specific non-image type is rejected even if the bytes look like an image
        assert_eq!(
            ImageIOService::detect_image_mime(
                "a.txt",
                Some("text/plain"),
                &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
            ),
            None
        );
    }

    #[test]
    fn test_detect_image_mime_falls_back_to_sniffing() {
        let png = encoded_png(2, 2);
        assert_eq!(
            ImageIOService::detect_image_mime("upload", None, &png),
            Some("image/png".to_string())
        );
        assert_eq!(
            ImageIOService::detect_image_mime("upload", Some("application/octet-stream"), &png),
            Some("image/png".to_string())
        );
    }

    #[test]
    fn test_detect_image_mime_extension_guess() {
        assert_eq!(
            ImageIOService::detect_image_mime("logo.svg", None, b"<svg></svg>"),
            Some("image/svg+xml".to_string())
        );
        assert_eq!(ImageIOService::detect_image_mime("empty.png", None, b""), None);
        assert_eq!(ImageIOService::detect_image_mime("notes.txt", None, b"hello"), None);
    }

    #[test]
    fn test_probe_dimensions() {
        let png = encoded_png(7, 3);
        assert_eq!(ImageIOService::probe_dimensions(&png), Some((7, 3)));
        assert_eq!(ImageIOService::probe_dimensions(b"garbage"), None);
    }

    #[test]
    fn test_has_image_extension() {
        assert!(ImageIOService::has_image_extension(Path::new("a.jpg")));
        assert!(ImageIOService::has_image_extension(Path::new("a.JPEG")));
        assert!(ImageIOService::has_image_extension(Path::new("dir/a.webp")));
        assert!(!ImageIOService::has_image_extension(Path::new("a.txt")));
        assert!(!ImageIOService::has_image_extension(Path::new("noext")));
    }

    #[test]
    fn test_load_source_and_write_bytes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("portrait.png");
        std::fs::write(&input, encoded_png(4, 4)).unwrap();

        let file = ImageIOService::load_source(&input).unwrap();
        assert_eq!(file.name(), "portrait.png");
        assert_eq!(file.declared_mime(), Some("image/png"));
        assert!(file.is_image());

        let output = dir.path().join("nested").join("out.bin");
        ImageIOService::write_bytes(&output, b"abc").unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"abc");
    }

    #[test]
    fn test_load_source_missing_file() {
        let result = ImageIOService::load_source("/definitely/not/here.png");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("read image file"));
    }
}
