use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

/// Side of the square every stored avatar is cropped to.
pub const AVATAR_SIZE: u32 = 250;

pub struct AvatarUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Whether a declared content type is one we can decode. Uploads without a
/// content type are left to the decoder.
pub fn is_supported_type(content_type: Option<&str>) -> bool {
    match content_type {
        None | Some("application/octet-stream") => true,
        Some(ct) => ext_from_mime(ct).is_some(),
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Crops the upload to an `AVATAR_SIZE` square and places it in `avatars_dir`
/// as `<user_id>_<name>`. Returns the public reference `avatars/<file>`.
///
/// The file is fully written to a temp file in the same directory and then
/// renamed, so readers of the final path never see a partial image.
pub async fn store_avatar(
    avatars_dir: &Path,
    user_id: Uuid,
    upload: AvatarUpload,
) -> anyhow::Result<String> {
    let dir = avatars_dir.to_path_buf();
    tokio::task::spawn_blocking(move || store_avatar_blocking(&dir, user_id, upload))
        .await
        .context("avatar task panicked")?
}

fn store_avatar_blocking(dir: &Path, user_id: Uuid, upload: AvatarUpload) -> anyhow::Result<String> {
    let (image, format) = cover_square(&upload.body, AVATAR_SIZE)?;

    let file_name = format!(
        "{}_{}",
        user_id,
        sanitize_file_name(upload.file_name.as_deref(), format)
    );

    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let mut tmp = NamedTempFile::new_in(dir).context("create temp avatar")?;
    image
        .write_to(tmp.as_file_mut(), format)
        .context("encode avatar")?;

    let dest: PathBuf = dir.join(&file_name);
    tmp.persist(&dest)
        .map_err(|e| e.error)
        .with_context(|| format!("move avatar to {}", dest.display()))?;

    debug!(user_id = %user_id, path = %dest.display(), "avatar stored");
    Ok(format!("avatars/{file_name}"))
}

/// Decodes `body` and scales it to fill a `size` square, cropping the overflow
/// evenly from both sides. Returns the image with the format to re-encode it in.
fn cover_square(body: &[u8], size: u32) -> anyhow::Result<(DynamicImage, ImageFormat)> {
    let source = image::guess_format(body).context("unrecognised image data")?;
    let decoded = image::load_from_memory_with_format(body, source).context("decode image")?;
    let resized = decoded.resize_to_fill(size, size, FilterType::Lanczos3);

    // Only JPEG keeps its format; everything else is re-encoded losslessly.
    let format = match source {
        ImageFormat::Jpeg => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    };
    Ok((resized, format))
}

fn sanitize_file_name(name: Option<&str>, format: ImageFormat) -> String {
    let stem = name
        .map(Path::new)
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .map(|s| {
            s.chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
                .collect::<String>()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "avatar".to_string());
    let ext = match format {
        ImageFormat::Jpeg => "jpg",
        _ => "png",
    };
    format!("{stem}.{ext}")
}
