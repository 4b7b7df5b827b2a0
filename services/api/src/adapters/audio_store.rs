//! services/api/src/adapters/audio_store.rs
//!
//! Local-disk storage for uploaded dream recordings. Files get random names
//! and are served back under `/uploads`.

use std::path::{Path, PathBuf};

use dream_journal_core::ports::{PortError, PortResult};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Audio containers accepted for upload.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["wav", "mp3", "m4a", "ogg", "webm"];

/// URL prefix under which stored recordings are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Returns the lowercased extension if `file_name` is an accepted audio container.
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

#[derive(Clone, Debug)]
pub struct AudioStore {
    root: PathBuf,
}

impl AudioStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the upload directory if needed.
    pub async fn initialize(&self) -> PortResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to create upload dir: {}", e)))?;
        tracing::info!("Audio store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Writes a recording and returns its public URL.
    pub async fn save(&self, extension: &str, data: &[u8]) -> PortResult<String> {
        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let path = self.root.join(&file_name);

        write_atomically(&path, data)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to store audio: {}", e)))?;

        tracing::debug!("Stored audio {} ({} bytes)", file_name, data.len());
        Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
    }
}

/// Writes to a `.part` sibling first so a half-written upload is never served.
/// The temp file is removed again if any step fails.
async fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension("part");
    let write = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, path).await
    };
    if let Err(e) = write.await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}
