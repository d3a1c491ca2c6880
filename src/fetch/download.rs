//! # Archive download.
//!
//! [`download`] fetches a tunnel archive over HTTP(S) and unpacks it into a
//! target directory.
//!
//! ## Rules
//! - Redirects are followed **manually** (the client is built with redirects
//!   off) so the hop bound is explicit rather than whatever the HTTP stack
//!   defaults to.
//! - The body is streamed into memory, reporting `(received, total)` after
//!   each chunk; extraction happens only after the transfer completes, so a
//!   cancelled or failed download never leaves partial files behind.
//! - Non-2xx/3xx responses fail with the body text (or the bare status when
//!   the body is empty).
//! - Nothing here retries; retry policy belongs to the caller.

use std::path::Path;

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::TunnelError;
use crate::fetch::extract;

/// Downloads `url` and extracts the archive into `target_dir`.
///
/// `on_progress` is invoked after every received chunk with the running byte
/// count and the total reported by the server (`None` when unknown).
/// Cancelling `cancel` aborts the transfer with
/// [`TunnelError::DownloadCanceled`].
pub async fn download<F>(
    url: &str,
    target_dir: &Path,
    max_redirects: usize,
    mut on_progress: F,
    cancel: &CancellationToken,
) -> Result<(), TunnelError>
where
    F: FnMut(u64, Option<u64>),
{
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()?;

    let mut current = url.to_string();
    for _hop in 0..=max_redirects {
        debug!(target: "tunnelvisor", url = %current, "fetching archive");
        let response = tokio::select! {
            r = client.get(&current).send() => r?,
            _ = cancel.cancelled() => return Err(TunnelError::DownloadCanceled),
        };

        let status = response.status();
        if status.is_success() {
            let total = response.content_length();
            let bytes = read_body(response, total, &mut on_progress, cancel).await?;
            tokio::fs::create_dir_all(target_dir).await?;
            extract::unpack(&current, &bytes, target_dir)?;
            return Ok(());
        }

        if status.is_redirection() {
            if let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                // Location may be relative; resolve it against the current URL.
                current = Url::parse(&current)
                    .and_then(|base| base.join(location))
                    .map(String::from)
                    .map_err(|_| TunnelError::DownloadServer {
                        status: status.as_u16(),
                        body: format!("unparseable redirect location: {location}"),
                    })?;
                continue;
            }
        }

        let body = response.text().await.unwrap_or_default();
        return Err(TunnelError::DownloadServer {
            status: status.as_u16(),
            body,
        });
    }

    Err(TunnelError::TooManyRedirects {
        limit: max_redirects,
        url: url.to_string(),
    })
}

/// Streams the response body into memory, reporting progress per chunk.
async fn read_body<F>(
    mut response: reqwest::Response,
    total: Option<u64>,
    on_progress: &mut F,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, TunnelError>
where
    F: FnMut(u64, Option<u64>),
{
    let mut bytes = Vec::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
    let mut received: u64 = 0;
    loop {
        let chunk = tokio::select! {
            c = response.chunk() => c?,
            _ = cancel.cancelled() => return Err(TunnelError::DownloadCanceled),
        };
        match chunk {
            Some(data) => {
                received += data.len() as u64;
                bytes.extend_from_slice(&data);
                on_progress(received, total);
            }
            None => return Ok(bytes),
        }
    }
}
