//! Export of processed results
//!
//! A single export hands out the selected record's result under a derived
//! name; a bulk export packs every processed result into one ZIP archive.

use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::services::ImageIOService;
use crate::state::StudioState;
use crate::tracing_config::{events, spans};
use crate::types::ImageStatus;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Derive the export name of a processed image
///
/// The last extension of `original` is replaced by `suffix` plus `extension`;
/// names without an extension keep their full text as the stem.
///
/// ```rust
/// use bgremove_studio::export::processed_file_name;
///
/// assert_eq!(processed_file_name("cat.jpg", "_processed", "png"), "cat_processed.png");
/// assert_eq!(processed_file_name("a.b.webp", "_processed", "png"), "a.b_processed.png");
/// ```
#[must_use]
pub fn processed_file_name(original: &str, suffix: &str, extension: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .map_or_else(|| original.to_string(), |s| s.to_string_lossy().into_owned());
    format!("{}{}.{}", stem, suffix, extension)
}

/// One exported image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    name: String,
    mime: String,
    bytes: Arc<Vec<u8>>,
}

impl ExportedFile {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the image to `path`, creating parent directories
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ImageIOService::write_bytes(path, &self.bytes)
    }

    /// Write the image into `dir` under its export name
    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.name);
        self.write_to(&path)?;
        Ok(path)
    }
}

/// A ZIP archive holding every processed result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArchive {
    name: String,
    entries: Vec<String>,
    bytes: Vec<u8>,
}

impl ExportArchive {
    /// Archive file name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry names in queue order
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encoded ZIP content
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        ImageIOService::write_bytes(path, &self.bytes)
    }

    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.name);
        self.write_to(&path)?;
        Ok(path)
    }
}

/// Export naming and packaging rules
#[derive(Debug, Clone)]
pub struct Exporter {
    suffix: String,
    extension: String,
    archive_name: String,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(&StudioConfig::default())
    }
}

impl Exporter {
    #[must_use]
    pub fn new(config: &StudioConfig) -> Self {
        Self {
            suffix: config.output_suffix.clone(),
            extension: config.output_extension.clone(),
            archive_name: config.archive_name.clone(),
        }
    }

    /// Export name for an original file name
    #[must_use]
    pub fn file_name_for(&self, original: &str) -> String {
        processed_file_name(original, &self.suffix, &self.extension)
    }

    /// Export the currently selected record
    ///
    /// # Errors
    /// - `NothingToExport` when nothing is selected or the selection is not processed
    pub fn export_current(&self, state: &StudioState) -> Result<ExportedFile> {
        let record = state
            .current()
            .ok_or_else(|| StudioError::nothing_to_export("no image is selected"))?;

        let result = match (record.status(), record.result()) {
            (ImageStatus::Processed, Some(result)) => result,
            (status, _) => {
                return Err(StudioError::nothing_to_export(format!(
                    "{} is {}, not processed",
                    record.file_name(),
                    status
                )))
            },
        };

        let _span = spans::export("single", 1).entered();
        let file = ExportedFile {
            name: self.file_name_for(record.file_name()),
            mime: result.mime().to_string(),
            bytes: result.shared_bytes(),
        };
        log::info!("Exported {} as {}", record.file_name(), file.name);
        Ok(file)
    }

    /// Export every processed record as a separate file, in queue order
    ///
    /// Names are disambiguated the same way as archive entries.
    #[must_use]
    pub fn export_each(&self, state: &StudioState) -> Vec<ExportedFile> {
        let mut used = HashSet::new();
        state
            .processed_records()
            .filter_map(|record| {
                let result = record.result()?;
                Some(ExportedFile {
                    name: self.unique_name(record.file_name(), &mut used),
                    mime: result.mime().to_string(),
                    bytes: result.shared_bytes(),
                })
            })
            .collect()
    }

    /// Pack every processed record, in queue order, into one ZIP archive
    ///
    /// Colliding names get a `_2`, `_3`, ... counter before the extension.
    /// With no processed records the archive is valid but empty.
    pub fn export_all(&self, state: &StudioState) -> Result<ExportArchive> {
        let processed: Vec<_> = state.processed_records().collect();
        let _span = spans::export("archive", processed.len()).entered();

        if processed.is_empty() {
            events::warning_with_recommendation(
                "No processed images to export, archive will be empty",
                "Run a batch before exporting",
            );
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut used = HashSet::new();
        let mut entries = Vec::with_capacity(processed.len());

        for record in processed {
            let Some(result) = record.result() else {
                continue;
            };

            let name = self.unique_name(record.file_name(), &mut used);
            writer.start_file(name.as_str(), options)?;
            writer.write_all(result.bytes())?;
            log::debug!("Added {} ({} bytes) to archive", name, result.len());
            entries.push(name);
        }

        let bytes = writer.finish()?.into_inner();
        log::info!(
            "Packed {} image(s) into {} ({} bytes)",
            entries.len(),
            self.archive_name,
            bytes.len()
        );

        Ok(ExportArchive {
            name: self.archive_name.clone(),
            entries,
            bytes,
        })
    }

    fn unique_name(&self, original: &str, used: &mut HashSet<String>) -> String {
        let base = self.file_name_for(original);
        if used.insert(base.clone()) {
            return base;
        }

        let stem = Path::new(original)
            .file_stem()
            .map_or_else(|| original.to_string(), |s| s.to_string_lossy().into_owned());
        (2..)
            .map(|n| format!("{}{}_{}.{}", stem, self.suffix, n, self.extension))
            .find(|candidate| used.insert(candidate.clone()))
            .unwrap_or(base)
    }
}
