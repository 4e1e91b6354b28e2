pub mod archive;
pub mod preview;

pub use archive::ArchiveResponse;
pub use preview::PreviewResult;
