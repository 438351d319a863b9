//! Content-addressed scrollo cache.
//!
//! Each distinct user input gets one immutable file named after its CRC-32,
//! and a well-known path is hard-linked to the most recently requested entry
//! so an external renderer can pick it up.

use std::path::{Path, PathBuf};

use rand::Rng;
use tokio::io::AsyncWriteExt;

use crate::crypto::checksum;
use crate::error::{RedeemError, Result};

/// Maximum number of characters of user input kept in a cache entry.
pub const MAX_SCROLLO_CHARS: usize = 256;

/// Renders the decorated cache file content for `text`.
pub fn render_scrollo(text: &str) -> String {
    let truncated: String = text.chars().take(MAX_SCROLLO_CHARS).collect();
    format!(" {} ✨✨✨ ", truncated)
}

/// Cache key for `text`: its CRC-32 in decimal.
pub fn scrollo_key(text: &str) -> String {
    checksum(text).to_string()
}

/// Cache directory plus the well-known "currently displayed" link.
#[derive(Debug, Clone)]
pub struct ScrolloCache {
    dir: PathBuf,
    link_path: PathBuf,
}

impl ScrolloCache {
    pub fn new(dir: impl Into<PathBuf>, link_path: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            link_path: link_path.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn link_path(&self) -> &Path {
        &self.link_path
    }

    /// Path of the cache entry for `text`.
    pub fn entry_path(&self, text: &str) -> PathBuf {
        self.dir.join(scrollo_key(text))
    }

    /// Ensures an entry exists for `text` and points the well-known link at it.
    ///
    /// The entry is created exclusively, so concurrent first deliveries of the
    /// same text produce exactly one writer; existing entries are never
    /// rewritten. Returns the entry path.
    pub async fn ensure_and_link(&self, text: &str) -> Result<PathBuf> {
        let entry = self.entry_path(text);

        let created = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&entry)
            .await;

        match created {
            Ok(mut file) => {
                let content = render_scrollo(text);
                file.write_all(content.as_bytes())
                    .await
                    .map_err(|source| RedeemError::CacheWrite {
                        path: entry.clone(),
                        source,
                    })?;
                file.flush().await.map_err(|source| RedeemError::CacheWrite {
                    path: entry.clone(),
                    source,
                })?;
                tracing::debug!("Created scrollo cache entry {}", entry.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::debug!("Scrollo cache hit {}", entry.display());
            }
            Err(source) => {
                return Err(RedeemError::CacheCreate {
                    path: entry,
                    source,
                });
            }
        }

        self.relink(&entry).await?;
        Ok(entry)
    }

    /// Atomically repoints the well-known link at `entry`.
    ///
    /// A fresh hard link is made under a temporary name next to the link and
    /// renamed over it, so readers never observe a missing link.
    async fn relink(&self, entry: &Path) -> Result<()> {
        let suffix: u64 = rand::thread_rng().gen_range(0..u64::MAX);
        let file_name = self
            .link_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scrollo".to_string());
        let staging = self
            .link_path
            .with_file_name(format!(".{}.{:016x}.tmp", file_name, suffix));

        let link_err = |source: std::io::Error| RedeemError::CacheLink {
            link: self.link_path.clone(),
            target: entry.to_path_buf(),
            source,
        };

        tokio::fs::hard_link(entry, &staging).await.map_err(link_err)?;
        if let Err(source) = tokio::fs::rename(&staging, &self.link_path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(link_err(source));
        }
        Ok(())
    }
}
