use crate::error::{Result, StudioError};
use crate::gemini::image_client::parse_data_uri;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};

pub const FILE_PREFIX: &str = "nano-banana";

pub fn file_name(image_id: &str) -> String {
    format!("{}-{}.png", FILE_PREFIX, image_id)
}

/// Saves an image to `dir/nano-banana-<id>.png`, creating `dir` if needed.
/// Accepts base64 data URIs and http(s) URLs.
pub async fn download_image(url: &str, image_id: &str, dir: &Path) -> Result<PathBuf> {
    let bytes = if let Some(inline) = parse_data_uri(url) {
        STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| StudioError::DownloadError(format!("invalid base64 payload: {}", e)))?
    } else if url.starts_with("http://") || url.starts_with("https://") {
        let response = reqwest::get(url).await?.error_for_status()?;
        response.bytes().await?.to_vec()
    } else {
        return Err(StudioError::DownloadError(format!(
            "unsupported image url for {}",
            image_id
        )));
    };

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name(image_id));
    tokio::fs::write(&path, &bytes).await?;

    log::info!("💾 Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
