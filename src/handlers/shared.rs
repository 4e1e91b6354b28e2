use url::Url;

use crate::error::{AppError, AppResult};
use crate::preview::guard::check_public_host;

/// Reject request targets whose host resolves to a private address
/// (SSRF protection).
pub async fn ensure_public_host(url: &Url) -> AppResult<()> {
    check_public_host(url)
        .await
        .map_err(|rejection| AppError::Validation(rejection.to_string()))
}
