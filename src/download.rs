//! Downloads source files over HTTP.

use std::{fs::File, io::Write, path::Path};

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use reqwest::{Client, StatusCode};

use crate::error::{LwfError, Result};

/// Builds the HTTP client shared by every download in a run.
pub fn make_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("lwf/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|source| LwfError::Fetch {
            url: String::new(),
            source,
        })
}

/// True for `http://` and `https://` locations.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Streams the body at `url` into `file_path`, advancing `progress_bar` by
/// bytes received. A 404 is reported as [`LwfError::NotFound`] so callers can
/// treat it as missing data.
pub async fn download_file(
    client: &Client,
    url: &str,
    file_path: &Path,
    progress_bar: &ProgressBar,
) -> Result<()> {
    debug!("GET {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| LwfError::Fetch {
            url: url.to_string(),
            source,
        })?;

    match response.status() {
        StatusCode::NOT_FOUND => return Err(LwfError::NotFound(url.to_string())),
        status if !status.is_success() => {
            return Err(LwfError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
        _ => {}
    }

    // Switch the spinner to a byte bar when the size is known
    if let Some(total_size) = response.content_length().filter(|&n| n > 0) {
        progress_bar.set_length(total_size);
        if let Ok(style) = ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
        ) {
            progress_bar.set_style(style.progress_chars("=> "));
        }
    }

    let mut file = File::create(file_path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|source| LwfError::Fetch {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }
    file.flush()?;

    debug!("Downloaded {} bytes to {}", downloaded, file_path.display());

    Ok(())
}

// -- Tests -------------------------------------------------------------------
