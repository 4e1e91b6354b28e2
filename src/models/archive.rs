use serde::Serialize;

/// Body returned by `GET /archive` on success.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveResponse {
    pub success: bool,
    /// Base64 encoded single-file HTML snapshot.
    pub archive: String,
    /// RFC 3339 capture time (UTC).
    pub timestamp: String,
}
