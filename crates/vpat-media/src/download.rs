//! Source video download over HTTP(S).
//!
//! Streams the response body to disk so large videos never sit in memory.

use std::path::Path;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{MediaError, MediaResult};

/// Download `url` into `output_path`, returning the number of bytes written.
///
/// The file is complete and flushed when this returns `Ok`.
pub async fn download_video(
    client: &reqwest::Client,
    url: &Url,
    output_path: &Path,
) -> MediaResult<u64> {
    debug!("Downloading {} to {}", url, output_path.display());

    let mut response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!(
            "{} returned {}",
            url, status
        )));
    }

    let mut file = tokio::fs::File::create(output_path).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;

    if written == 0 {
        return Err(MediaError::download_failed(format!(
            "{} returned an empty body",
            url
        )));
    }

    info!(bytes = written, "Downloaded source video from {}", url);
    Ok(written)
}
