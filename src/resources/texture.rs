//! Fetching raw asset bytes and decoding images.
//!
//! Natively assets are read from `./assets/`, on the web they are requested
//! from `<origin>/assets/`.

use anyhow::Context;

use crate::error::{AssetLoadError, WithAssetPath};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no browser window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("reading the page origin: {e:?}"))?;
    let base = reqwest::Url::parse(&format!("{origin}/assets/"))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };

    Ok(data)
}

/// Decodes an encoded image, using `mime_type` when known and sniffing the
/// format otherwise.
pub fn decode_image(bytes: &[u8], mime_type: Option<&str>) -> anyhow::Result<image::DynamicImage> {
    let format = mime_type.and_then(image::ImageFormat::from_mime_type);
    let img = match format {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    };
    Ok(img)
}

/// Fetches and decodes a standalone image such as the emissive map.
pub async fn load_image(file_name: &str) -> Result<image::DynamicImage, AssetLoadError> {
    log::info!("Loading image {file_name}");
    let bytes = load_binary(file_name).await.with_asset_path(file_name)?;
    decode_image(&bytes, None).with_asset_path(file_name)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([251, 98, 96, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn decodes_with_and_without_mime_type() {
        let bytes = png_bytes();
        let sniffed = decode_image(&bytes, None).unwrap();
        let typed = decode_image(&bytes, Some("image/png")).unwrap();

        assert_eq!(sniffed.width(), 2);
        assert_eq!(typed.to_rgba8().get_pixel(0, 0).0, [251, 98, 96, 255]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_image(b"not an image", None).is_err());
    }

    #[tokio::test]
    async fn missing_image_reports_its_path() {
        let err = load_image("textures/does-not-exist.png").await.unwrap_err();
        assert_eq!(err.path, "textures/does-not-exist.png");
    }
}
