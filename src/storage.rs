use crate::errors::ServiceError;
use crate::local::LocalData;
use std::path::Path;
use tokio::fs;
use tracing::error;

pub async fn load_store(path: &Path) -> LocalData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file {}: {err}", path.display());
                LocalData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => LocalData::default(),
        Err(err) => {
            error!("failed to read data file {}: {err}", path.display());
            LocalData::default()
        }
    }
}

pub async fn persist_store(path: &Path, data: &LocalData) -> Result<(), ServiceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload =
        serde_json::to_vec_pretty(data).map_err(|e| ServiceError::Decode(e.to_string()))?;
    fs::write(path, payload).await?;
    Ok(())
}
