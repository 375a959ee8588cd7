use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::{Client, StatusCode};
use tokio::{
    fs::{self, File},
    io::{AsyncWriteExt, BufWriter},
};

use crate::normalize::LineNormalizer;
use crate::{BookId, Error};

/// What happened to a single book.
#[derive(Debug)]
pub enum Outcome {
    /// Body was saved to the target file.
    Written { bytes: u64 },
    /// Target file already existed, nothing was requested.
    Skipped,
    /// The archive answered with anything but 200.
    BadStatus(StatusCode),
    /// Transport or filesystem error.
    Failed(Error),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Written { bytes } => write!(f, "written ({bytes} bytes)"),
            Outcome::Skipped => write!(f, "skipped, already on disk"),
            Outcome::BadStatus(status) => write!(f, "dropped, HTTP {status}"),
            Outcome::Failed(err) => write!(f, "dropped, {err}"),
        }
    }
}

/// Attempts to put a single book on disk. Never fails, every error ends up in the `Outcome`.
pub async fn fetch_one(client: &Client, base_url: &str, dir: &Path, id: BookId) -> Outcome {
    let target = id.target_path(dir);
    // Skip check. Any error while checking is treated as "not there".
    if fs::try_exists(&target).await.unwrap_or(false) {
        return Outcome::Skipped;
    }

    match download(client, &id.url(base_url), &id.part_path(dir), &target).await {
        Ok(Some(bytes)) => Outcome::Written { bytes },
        Ok(None) => Outcome::Skipped,
        Err(Fetched::Status(status)) => Outcome::BadStatus(status),
        Err(Fetched::Error(err)) => Outcome::Failed(err),
    }
}

enum Fetched {
    Status(StatusCode),
    Error(Error),
}

impl From<reqwest::Error> for Fetched {
    fn from(err: reqwest::Error) -> Self {
        Fetched::Error(err.into())
    }
}

impl From<std::io::Error> for Fetched {
    fn from(err: std::io::Error) -> Self {
        Fetched::Error(err.into())
    }
}

/// GETs `url` and streams the normalized body into `part`, renaming it onto `target` when done.
/// Returns the number of bytes written.
async fn download(
    client: &Client,
    url: &str,
    part: &Path,
    target: &Path,
) -> core::result::Result<Option<u64>, Fetched> {
    let mut res = client.get(url).send().await?;
    if res.status() != StatusCode::OK {
        return Err(Fetched::Status(res.status()));
    }

    let guard = PartFile::new(part);
    let mut file = BufWriter::new(File::create(part).await?);
    let mut normalizer = LineNormalizer::new();
    let mut buf = Vec::new();
    let mut written = 0u64;

    while let Some(chunk) = res.chunk().await? {
        buf.clear();
        normalizer.feed(&chunk, &mut buf);
        file.write_all(&buf).await?;
        written += buf.len() as u64;
    }
    buf.clear();
    normalizer.finish(&mut buf);
    file.write_all(&buf).await?;
    written += buf.len() as u64;
    file.flush().await?;
    drop(file);

    // Another run may have finished this book while we were downloading.
    if target.try_exists()? {
        return Ok(None);
    }
    // No await from here on: once the book is renamed into place the task always reports it.
    std::fs::rename(part, target)?;
    guard.disarm();
    Ok(Some(written))
}

/// Removes the part file unless disarmed, so failed or cancelled downloads leave nothing behind.
struct PartFile {
    path: Option<PathBuf>,
}

impl PartFile {
    fn new(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
        }
    }

    fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
