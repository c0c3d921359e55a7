use std::path::Path;

use image::RgbaImage;

use super::AtlasError;

/// Decodes an image file to an 8-bit RGBA pixel buffer.
///
/// Any format enabled in the `image` crate build is accepted; everything is
/// converted to 4-channel RGBA before upload.
pub(super) fn decode_rgba(path: &Path) -> Result<RgbaImage, AtlasError> {
    let img = image::open(path).map_err(|source| AtlasError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes a solid-color 64×64 PNG to a unique temp path.
    fn write_test_png(name: &str, color: [u8; 4]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("pyrite-decode-{}-{}.png", name, std::process::id()));
        let img = RgbaImage::from_pixel(64, 64, image::Rgba(color));
        img.save(&path).expect("failed to write test png");
        path
    }

    #[test]
    fn decodes_png_to_rgba() {
        let path = write_test_png("red", [255, 0, 0, 255]);

        let decoded = decode_rgba(&path).unwrap();
        assert_eq!(decoded.dimensions(), (64, 64));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(63, 63).0, [255, 0, 0, 255]);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = decode_rgba(Path::new("definitely-missing.png")).unwrap_err();
        match err {
            AtlasError::Load { path, .. } => {
                assert_eq!(path, Path::new("definitely-missing.png"));
            }
            other => panic!("expected Load error, got {other:?}"),
        }
    }
}
