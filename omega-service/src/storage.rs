//! Upload directory.
//!
//! Files are stored verbatim under their original name. A repeated name
//! overwrites the earlier file; concurrent writes to one name are last
//! writer wins.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{ServiceError, ServiceResult};

/// Writes uploaded reports into a single directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_dir(&self) -> ServiceResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ServiceError::Storage {
                path: self.dir.display().to_string(),
                source,
            })
    }

    /// Store `content` as `filename`, returning the path written
    pub async fn save(&self, filename: &str, content: &[u8]) -> ServiceResult<PathBuf> {
        let name = stored_name(filename)?;
        self.ensure_dir().await?;

        let path = self.dir.join(name);
        if name != filename {
            debug!(original = %filename, stored = %name, "Stripped directory components from upload name");
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|source| ServiceError::Storage {
                path: path.display().to_string(),
                source,
            })?;

        info!(path = %path.display(), size = content.len(), "Stored upload");
        Ok(path)
    }
}

/// Final path component of a client-supplied name.
///
/// Both separators are honoured since browsers on Windows may send full paths.
fn stored_name(filename: &str) -> ServiceResult<&str> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    match name {
        "" | "." | ".." => Err(ServiceError::InvalidRequest {
            message: format!("Invalid file name: {:?}", filename),
        }),
        _ => Ok(name),
    }
}
