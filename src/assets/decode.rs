use std::path::Path;

use crate::foundation::error::{StillclipError, StillclipResult};

/// Decoded source pixels sized exactly to the image's pixel dimensions.
///
/// Built once per conversion and reused for every output frame, since all
/// frames are identical.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Vec<u8>,
}

/// Read and decode a raster image (PNG/JPEG) from disk.
pub fn decode_image_file(path: &Path) -> StillclipResult<RasterFrame> {
    let bytes = std::fs::read(path).map_err(|e| {
        StillclipError::decode(format!(
            "failed to read source image '{}': {e}",
            path.display()
        ))
    })?;
    decode_image(&bytes)
}

/// Decode a raster image from memory into a [`RasterFrame`].
pub fn decode_image(bytes: &[u8]) -> StillclipResult<RasterFrame> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| StillclipError::decode(format!("source image is not decodable: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(RasterFrame {
        width,
        height,
        rgba8_premul,
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn decode_image_png_dimensions_and_premul() {
        let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
        let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let frame = decode_image(&buf).unwrap();
        assert_eq!(frame.width, 1);
        assert_eq!(frame.height, 1);
        assert_eq!(
            frame.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_image_rejects_junk_bytes() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, StillclipError::Decode(_)));
    }

    #[test]
    fn decode_image_file_reports_missing_path() {
        let err = decode_image_file(Path::new("/nonexistent/source.png")).unwrap_err();
        assert!(matches!(err, StillclipError::Decode(_)));
        assert!(err.to_string().contains("/nonexistent/source.png"));
    }
}
