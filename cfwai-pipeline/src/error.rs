use thiserror::Error;

/// Folds every adapter crate's error type into one enum for stage-level
/// logging, per spec §7's ambient error types note.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("persistence error: {0}")]
    Store(#[from] cfwai_store::StoreError),
    #[error("library service error: {0}")]
    Library(#[from] cfwai_library::LibraryError),
    #[error("downloader error: {0}")]
    Download(#[from] cfwai_downloader::DownloadError),
    #[error("tagging error: {0}")]
    Tag(#[from] cfwai_tagger::TagError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}
