//! Service layer for intake and progress concerns

pub mod io;
pub mod progress;

pub use io::{ImageIOService, IMAGE_EXTENSIONS};
pub use progress::{
    create_cli_progress_reporter, BatchProcessingStats, BatchProgressUpdate,
    ConsoleProgressReporter, EnhancedProgressReporter, NoOpProgressReporter, ProcessingStage,
    ProgressReporter, ProgressTracker, ProgressUpdate,
};
