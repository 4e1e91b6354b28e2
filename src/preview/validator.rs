//! Image validation: fetch a candidate, decode its header, apply the policy.

use std::io::Cursor;
use std::time::Duration;

use image::ImageReader;
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use reqwest::Client as ReqwestClient;
use strum::{Display, EnumString};
use url::Url;

use super::guard::check_public_host;

pub const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// Codec identified from an image's magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ImageFormat {
    Png,
    #[strum(to_string = "jpeg", serialize = "jpg")]
    Jpeg,
    Jp2,
    Webp,
    Gif,
    Bmp,
    Tiff,
    Avif,
    Ico,
    Other,
}

impl ImageFormat {
    /// Whether [`inspect`] can read dimensions for this format. AVIF needs a
    /// native decoder that is not built in.
    pub fn is_decodable(self) -> bool {
        !matches!(self, Self::Avif | Self::Other)
    }

    fn from_mime(mime: &str) -> Self {
        match mime {
            "image/png" => Self::Png,
            "image/jpeg" => Self::Jpeg,
            "image/jp2" => Self::Jp2,
            "image/webp" => Self::Webp,
            "image/gif" => Self::Gif,
            "image/bmp" => Self::Bmp,
            "image/tiff" => Self::Tiff,
            "image/avif" => Self::Avif,
            "image/vnd.microsoft.icon" | "image/x-icon" => Self::Ico,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Acceptance thresholds for preview images.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePolicy {
    pub formats: Vec<ImageFormat>,
    pub min_width: u32,
    pub min_height: u32,
    pub min_area: u64,
    pub max_area: u64,
    /// Larger side over smaller side, checked in both orientations.
    pub max_aspect_ratio: f64,
}

impl Default for ImagePolicy {
    fn default() -> Self {
        Self {
            formats: vec![
                ImageFormat::Png,
                ImageFormat::Jpeg,
                ImageFormat::Jp2,
                ImageFormat::Webp,
            ],
            min_width: 100,
            min_height: 100,
            min_area: 100 * 100,
            max_area: 1024 * 1024,
            max_aspect_ratio: 3.0,
        }
    }
}

impl ImagePolicy {
    pub fn accepts(&self, meta: &ImageMetadata) -> bool {
        if !self.formats.contains(&meta.format) {
            return false;
        }
        if meta.width < self.min_width || meta.height < self.min_height {
            return false;
        }

        let area = u64::from(meta.width) * u64::from(meta.height);
        if area < self.min_area || area > self.max_area {
            return false;
        }

        let (w, h) = (f64::from(meta.width), f64::from(meta.height));
        w / h <= self.max_aspect_ratio && h / w <= self.max_aspect_ratio
    }
}

/// Read format and dimensions from the leading bytes of an image.
pub fn inspect(bytes: &[u8]) -> Option<ImageMetadata> {
    let kind = infer::get(bytes)?;
    let format = ImageFormat::from_mime(kind.mime_type());

    let (width, height) = match format {
        ImageFormat::Jp2 => jp2_dimensions(bytes)?,
        ImageFormat::Other => return None,
        _ => ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()?,
    };

    if width == 0 || height == 0 {
        return None;
    }

    Some(ImageMetadata {
        width,
        height,
        format,
    })
}

/// JPEG 2000 keeps its size in the `ihdr` box of the `jp2h` header:
/// height then width, both big-endian u32.
fn jp2_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let at = bytes.windows(4).position(|w| w == b"ihdr")? + 4;
    let field = |offset: usize| -> Option<u32> {
        let raw: [u8; 4] = bytes.get(at + offset..at + offset + 4)?.try_into().ok()?;
        Some(u32::from_be_bytes(raw))
    };
    let height = field(0)?;
    let width = field(4)?;
    Some((width, height))
}

/// Fetches candidate images and decides whether they are fit for a preview.
#[derive(Clone)]
pub struct ImageValidator {
    client: ReqwestClient,
    policy: ImagePolicy,
    block_private_hosts: bool,
}

impl ImageValidator {
    /// Candidate URLs come from the fetched page, so with
    /// `block_private_hosts` each one is resolved and checked before any
    /// request is made.
    pub fn new(client: ReqwestClient, policy: ImagePolicy, block_private_hosts: bool) -> Self {
        Self {
            client,
            policy,
            block_private_hosts,
        }
    }

    /// Never fails: any fetch, size or decode problem counts as a rejection.
    pub async fn is_acceptable(&self, url: &Url) -> bool {
        if self.block_private_hosts {
            if let Err(rejection) = check_public_host(url).await {
                tracing::debug!(url = %url, reason = %rejection, "Skipping image candidate");
                return false;
            }
        }

        let Some(bytes) = self.download(url).await else {
            return false;
        };

        match inspect(&bytes) {
            Some(meta) => {
                let accepted = self.policy.accepts(&meta);
                tracing::debug!(
                    url = %url,
                    width = meta.width,
                    height = meta.height,
                    format = %meta.format,
                    accepted,
                    "Checked image candidate"
                );
                accepted
            }
            None => {
                tracing::debug!(url = %url, "Could not decode image candidate");
                false
            }
        }
    }

    async fn download(&self, url: &Url) -> Option<Vec<u8>> {
        let mut response = self
            .client
            .get(url.clone())
            .header(ACCEPT, IMAGE_ACCEPT)
            .timeout(IMAGE_FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| tracing::debug!(error = ?e, url = %url, "Image fetch failed"))
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), url = %url, "Image fetch returned error status");
            return None;
        }

        let declared = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if declared.is_some_and(|len| len > MAX_IMAGE_BYTES) {
            tracing::debug!(url = %url, "Image exceeds size cap");
            return None;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.ok()? {
            if bytes.len() as u64 + chunk.len() as u64 > MAX_IMAGE_BYTES {
                tracing::debug!(url = %url, "Image body exceeded size cap");
                return None;
            }
            bytes.extend_from_slice(&chunk);
        }
        Some(bytes)
    }
}
