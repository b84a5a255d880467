use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;

pub const IMAGE_ENDPOINT: &str = "https://image.pollinations.ai/prompt";
/// Bodies smaller than this are treated as error pages, not images.
pub const MIN_IMAGE_BYTES: usize = 1024;
const IMAGE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid content: {0}")]
    InvalidContent(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed query parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageParams {
    pub width: u32,
    pub height: u32,
    pub model: String,
    pub seed: u64,
    pub enhance: bool,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            model: "flux".to_string(),
            seed: 42,
            enhance: true,
        }
    }
}

pub fn image_request_url(endpoint: &str, prompt: &str, params: &ImageParams) -> String {
    format!(
        "{}/{}?width={}&height={}&model={}&seed={}&enhance={}&nologo=true",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(prompt),
        params.width,
        params.height,
        urlencoding::encode(&params.model),
        params.seed,
        params.enhance
    )
}

pub struct ImageResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait ImageSource: Send + Sync {
    fn request_url(&self, prompt: &str) -> String;
    async fn download(&self, prompt: &str) -> Result<ImageResponse, FetchError>;
}

pub struct PollinationsImage {
    client: Client,
    endpoint: String,
    params: ImageParams,
}

impl PollinationsImage {
    pub fn new(client: Client, endpoint: &str, params: ImageParams) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            params,
        }
    }
}

#[async_trait]
impl ImageSource for PollinationsImage {
    fn request_url(&self, prompt: &str) -> String {
        image_request_url(&self.endpoint, prompt, &self.params)
    }

    async fn download(&self, prompt: &str) -> Result<ImageResponse, FetchError> {
        let resp = self
            .client
            .get(self.request_url(prompt))
            .timeout(IMAGE_TIMEOUT)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Ok(ImageResponse {
                status,
                body: Vec::new(),
            });
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(ImageResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// After network errors and rejected bodies.
    pub transient_backoff: Duration,
    /// After non-200 responses.
    pub status_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            transient_backoff: Duration::from_secs(2),
            status_backoff: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    WebP,
}

pub fn sniff_format(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageKind::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageKind::Png)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageKind::Gif)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageKind::WebP)
    } else {
        None
    }
}

#[cfg(feature = "decode")]
pub fn validate_image(bytes: &[u8]) -> Result<ImageKind, FetchError> {
    let kind = sniff_format(bytes)
        .ok_or_else(|| FetchError::InvalidContent("unrecognized image signature".to_string()))?;
    image::load_from_memory(bytes)
        .map_err(|e| FetchError::InvalidContent(format!("decode failed: {}", e)))?;
    Ok(kind)
}

#[cfg(not(feature = "decode"))]
pub fn validate_image(bytes: &[u8]) -> Result<ImageKind, FetchError> {
    sniff_format(bytes)
        .ok_or_else(|| FetchError::InvalidContent("unrecognized image signature".to_string()))
}

/// Downloads an image for `prompt` into `destination`, retrying per `policy`.
///
/// The file only appears at `destination` once it has passed validation; on
/// `false` nothing is left there. Skipping prompts that are already cached is
/// up to the caller.
pub async fn fetch_and_cache(
    source: &dyn ImageSource,
    prompt: &str,
    destination: &Path,
    policy: &RetryPolicy,
) -> bool {
    for attempt in 1..=policy.max_retries {
        match try_fetch(source, prompt, destination).await {
            Ok(kind) => {
                info!(
                    "[fetcher] saved {:?} image to {} (attempt {})",
                    kind,
                    destination.display(),
                    attempt
                );
                return true;
            }
            Err(e) => {
                warn!(
                    "[fetcher] attempt {}/{} failed: {}",
                    attempt, policy.max_retries, e
                );
                if attempt < policy.max_retries {
                    let backoff = match e {
                        FetchError::Status(_) => policy.status_backoff,
                        _ => policy.transient_backoff,
                    };
                    sleep(backoff).await;
                }
            }
        }
    }
    error!(
        "[fetcher] giving up on {} after {} attempts",
        destination.display(),
        policy.max_retries
    );
    false
}

async fn try_fetch(
    source: &dyn ImageSource,
    prompt: &str,
    destination: &Path,
) -> Result<ImageKind, FetchError> {
    debug!("[fetcher] requesting {}", source.request_url(prompt));
    let resp = source.download(prompt).await?;
    if resp.status != 200 {
        return Err(FetchError::Status(resp.status));
    }
    if resp.body.len() < MIN_IMAGE_BYTES {
        return Err(FetchError::InvalidContent(format!(
            "body of {} bytes is below {}",
            resp.body.len(),
            MIN_IMAGE_BYTES
        )));
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }
    let staging = staging_path(destination);
    if let Err(e) = fs::write(&staging, &resp.body).await {
        discard(&staging).await;
        return Err(e.into());
    }
    let outcome = match validate_image(&resp.body) {
        Ok(kind) => fs::rename(&staging, destination)
            .await
            .map(|_| kind)
            .map_err(FetchError::from),
        Err(e) => Err(e),
    };
    if outcome.is_err() {
        discard(&staging).await;
    }
    outcome
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            error!("[fetcher] failed to remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub fn no_backoff() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            transient_backoff: Duration::ZERO,
            status_backoff: Duration::ZERO,
        }
    }

    /// A small noisy PNG, well above the size threshold.
    #[cfg(feature = "decode")]
    pub fn sample_image() -> Vec<u8> {
        let img = image::RgbImage::from_fn(48, 48, |x, y| {
            let v = (x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503)).wrapping_mul(2_246_822_519);
            image::Rgb([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8])
        });
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[cfg(not(feature = "decode"))]
    pub fn sample_image() -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.resize(4096, 7);
        bytes
    }

    pub enum Scripted {
        Ok(Vec<u8>),
        Status(u16),
        NetworkDown,
    }

    /// Plays back scripted responses; once exhausted every call is a 500.
    pub struct ScriptedSource {
        replies: Mutex<VecDeque<Scripted>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub fn new(replies: Vec<Scripted>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageSource for ScriptedSource {
        fn request_url(&self, prompt: &str) -> String {
            image_request_url(IMAGE_ENDPOINT, prompt, &ImageParams::default())
        }

        async fn download(&self, _prompt: &str) -> Result<ImageResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Ok(body)) => Ok(ImageResponse { status: 200, body }),
                Some(Scripted::Status(status)) => Ok(ImageResponse {
                    status,
                    body: Vec::new(),
                }),
                Some(Scripted::NetworkDown) => Err(FetchError::Transport("connection refused".into())),
                None => Ok(ImageResponse {
                    status: 500,
                    body: Vec::new(),
                }),
            }
        }
    }
}
