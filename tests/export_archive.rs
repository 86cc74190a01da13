//! End-to-end tests: intake, batch run and export to disk

use async_trait::async_trait;
use bgremove_studio::{
    BatchProcessor, Exporter, ImageStatus, PreviewRef, RemovalClient, RemovalRequest, SourceFile,
    StudioConfig, StudioError, StudioEvent, StudioStore,
};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tempfile::TempDir;

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

/// Returns a PNG whose trailing bytes name the source file
struct TaggingClient {
    reject: &'static str,
}

#[async_trait]
impl RemovalClient for TaggingClient {
    async fn remove_background(&self, request: RemovalRequest) -> bgremove_studio::Result<PreviewRef> {
        if request.file_name() == self.reject {
            return Err(StudioError::remote("HTTP 422"));
        }
        let mut bytes = PNG_HEADER.to_vec();
        bytes.extend_from_slice(request.file_name().as_bytes());
        Ok(PreviewRef::from_response(bytes))
    }

    fn endpoint(&self) -> &str {
        "tagging://"
    }
}

fn read_archive(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            (entry.name().to_string(), content)
        })
        .collect()
}

async fn processed_store() -> Arc<StudioStore> {
    let store = Arc::new(StudioStore::default());
    store
        .intake(vec![
            SourceFile::new("cat.jpg", Some("image/jpeg"), JPEG_HEADER.to_vec()),
            SourceFile::new("notes.txt", Some("text/plain"), b"not an image".to_vec()),
            SourceFile::new("broken.png", None, PNG_HEADER.to_vec()),
            SourceFile::new("cat.png", None, PNG_HEADER.to_vec()),
            SourceFile::new("dog.webp", Some("image/webp"), b"RIFF\0\0\0\0WEBPVP8 ".to_vec()),
        ])
        .unwrap();

    let processor = BatchProcessor::new(
        Arc::clone(&store),
        Arc::new(TaggingClient {
            reject: "broken.png",
        }),
    );
    let summary = processor.run_batch().await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 1);
    store
}

#[tokio::test]
async fn test_batch_then_zip_export() {
    let store = processed_store().await;
    let state = store.snapshot();
    assert_eq!(state.len(), 4);

    let archive = Exporter::default().export_all(&state).unwrap();
    assert_eq!(archive.name(), "processed_images.zip");
    assert_eq!(
        archive.entries(),
        &["cat_processed.png", "cat_processed_2.png", "dog_processed.png"]
    );

    let dir = TempDir::new().unwrap();
    let path = archive.save_in(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("processed_images.zip"));

    let on_disk = std::fs::read(&path).unwrap();
    let entries = read_archive(&on_disk);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, archive.entries());
    assert!(entries[0].1.ends_with(b"cat.jpg"));
    assert!(entries[1].1.ends_with(b"cat.png"));
    assert!(entries[2].1.ends_with(b"dog.webp"));
}

#[tokio::test]
async fn test_errored_record_is_left_out_until_reprocessed() {
    let store = processed_store().await;
    let broken = store
        .snapshot()
        .records()
        .iter()
        .find(|record| record.file_name() == "broken.png")
        .map(|record| record.id())
        .unwrap();
    assert_eq!(
        store.snapshot().record(broken).unwrap().status(),
        ImageStatus::Errored
    );

    store.dispatch(StudioEvent::Select(broken)).unwrap();
    assert!(matches!(
        Exporter::default().export_current(&store.snapshot()),
        Err(StudioError::NothingToExport(_))
    ));

    let processor = BatchProcessor::new(Arc::clone(&store), Arc::new(TaggingClient { reject: "" }));
    assert_eq!(
        processor.reprocess(broken).await.unwrap(),
        Some(ImageStatus::Processed)
    );

    let state = store.snapshot();
    let file = Exporter::default().export_current(&state).unwrap();
    assert_eq!(file.name(), "broken_processed.png");
    assert_eq!(file.mime(), "image/png");

    let archive = Exporter::default().export_all(&state).unwrap();
    assert_eq!(archive.len(), 4);
    assert_eq!(archive.entries()[1], "broken_processed.png");
}

#[tokio::test]
async fn test_export_each_writes_files() {
    let store = processed_store().await;
    let config = StudioConfig::builder()
        .output_suffix("_nobg")
        .build()
        .unwrap();
    let files = Exporter::new(&config).export_each(&store.snapshot());

    let dir = TempDir::new().unwrap();
    let written: Vec<_> = files
        .iter()
        .map(|file| file.save_in(dir.path()).unwrap())
        .collect();

    assert_eq!(written.len(), 3);
    assert_eq!(written[0], dir.path().join("cat_nobg.png"));
    assert_eq!(written[1], dir.path().join("cat_nobg_2.png"));
    assert!(written.iter().all(|path| path.is_file()));
}

#[test]
fn test_cleared_queue_exports_empty_archive() {
    let store = StudioStore::default();
    store
        .intake(vec![SourceFile::new("a.png", None, PNG_HEADER.to_vec())])
        .unwrap();
    store.dispatch(StudioEvent::Clear).unwrap();

    let archive = Exporter::default().export_all(&store.snapshot()).unwrap();
    assert!(archive.is_empty());
    assert!(read_archive(archive.bytes()).is_empty());
}
