use std::path::PathBuf;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use uuid::Uuid;

use mytravel_db::models::BlobRow;

use crate::error::{ApiError, ApiResult};
use crate::state::DbHandle;

/// Bytes kept from the start of an upload for content-type sniffing.
const SNIFF_LEN: usize = 16;

/// Photo blob store.
///
/// Each blob is a flat file at `{dir}/{id}` plus a metadata row. Blobs are
/// never rewritten: replacing a place's photo uploads a new blob and leaves
/// the old one unreferenced.
pub struct PhotoStore {
    dir: PathBuf,
    db: DbHandle,
}

impl PhotoStore {
    pub async fn new(dir: PathBuf, db: DbHandle) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Photo storage directory: {}", dir.display());
        Ok(Self { dir, db })
    }

    pub fn file_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    /// Streams `body` to disk under a fresh id and records its metadata.
    ///
    /// The stored content type comes from the leading bytes when they match a
    /// known image format, otherwise from `declared_type`.
    pub async fn upload<S, E>(
        &self,
        filename: &str,
        declared_type: Option<&str>,
        body: S,
    ) -> ApiResult<BlobRow>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<ApiError>,
    {
        let id = Uuid::new_v4().to_string();
        let part_path = self.dir.join(format!("{}.part", id));

        let written = match write_stream(&part_path, body).await {
            Ok(w) => w,
            Err(e) => {
                discard(&part_path).await;
                return Err(e);
            }
        };

        if written.size == 0 {
            discard(&part_path).await;
            return Err(ApiError::InvalidInput("photo is empty".into()));
        }

        let final_path = self.file_path(&id);
        fs::rename(&part_path, &final_path).await.map_err(|e| {
            anyhow::anyhow!("failed to move {} into place: {}", part_path.display(), e)
        })?;

        let content_type = sniff_content_type(&written.head)
            .map(str::to_string)
            .or_else(|| {
                declared_type
                    .filter(|t| !t.trim().is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let blob = BlobRow {
            id,
            filename: filename.to_string(),
            content_type,
            size: written.size as i64,
            sha256: written.sha256,
            created_at: chrono::Utc::now().timestamp(),
        };

        let row = blob.clone();
        if let Err(e) = self.db.call(move |db| Ok(db.insert_blob(&row)?)).await {
            discard(&final_path).await;
            return Err(e);
        }

        info!(
            "Stored photo {} ({}, {} bytes, {})",
            blob.id, blob.filename, blob.size, blob.content_type
        );
        Ok(blob)
    }

    /// Opens a blob for streaming. Ids that are not UUIDs are rejected before
    /// touching the filesystem.
    pub async fn open(&self, id: &str) -> ApiResult<(BlobRow, ReaderStream<fs::File>)> {
        let id = id
            .parse::<Uuid>()
            .map_err(|_| ApiError::InvalidInput("invalid photo id".into()))?
            .to_string();

        let lookup = id.clone();
        let blob = self
            .db
            .call(move |db| Ok(db.get_blob(&lookup)?))
            .await?
            .ok_or(ApiError::NotFound("photo"))?;

        let path = self.file_path(&id);
        let file = match fs::File::open(&path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Photo {} has metadata but no file at {}", id, path.display());
                return Err(ApiError::NotFound("photo"));
            }
            Err(e) => {
                return Err(anyhow::anyhow!("failed to open {}: {}", path.display(), e).into());
            }
        };

        Ok((blob, ReaderStream::with_capacity(file, 64 * 1024)))
    }
}

struct Written {
    size: u64,
    sha256: String,
    head: Vec<u8>,
}

async fn write_stream<S, E>(path: &std::path::Path, body: S) -> ApiResult<Written>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<ApiError>,
{
    let mut body = std::pin::pin!(body);
    let io_err = |e: std::io::Error| anyhow::anyhow!("failed to write {}: {}", path.display(), e);

    let mut file = fs::File::create(path).await.map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut size: u64 = 0;
    let mut head = Vec::with_capacity(SNIFF_LEN);

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(Into::into)?;
        if head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
        }
        hasher.update(&chunk);
        size += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(io_err)?;
    }
    file.flush().await.map_err(io_err)?;

    Ok(Written {
        size,
        sha256: hex::encode(hasher.finalize()),
        head,
    })
}

async fn discard(path: &std::path::Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Recognizes common image formats by their magic bytes.
pub fn sniff_content_type(head: &[u8]) -> Option<&'static str> {
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if head.len() >= 12 && &head[0..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        Some("image/webp")
    } else if head.starts_with(b"BM") {
        Some("image/bmp")
    } else if head.len() >= 12 && &head[4..8] == b"ftyp" {
        match &head[8..12] {
            b"avif" | b"avis" => Some("image/avif"),
            b"heic" | b"heix" | b"mif1" | b"msf1" => Some("image/heic"),
            _ => None,
        }
    } else {
        None
    }
}
