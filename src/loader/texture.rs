use image::ImageFormat;

use crate::error::LoadError;
use crate::object::GpuResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Srgb,
    Linear,
}

/// How the renderer samples the texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureMapping {
    Uv,
    EquirectangularReflection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Texels {
    Rgba8(Vec<u8>),
    RgbaF32(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    id: GpuResourceId,
    pub width: u32,
    pub height: u32,
    pub texels: Texels,
    pub color_space: ColorSpace,
    pub mapping: TextureMapping,
}

impl Texture {
    pub fn id(&self) -> GpuResourceId {
        self.id
    }
}

/// Decodes an 8 bit colour image. Colour data is authored in sRGB.
pub fn decode_texture(path: &str, bytes: &[u8]) -> Result<Texture, LoadError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| LoadError::decode_failed(path, err))?
        .to_rgba8();
    Ok(Texture {
        id: GpuResourceId::next(),
        width: image.width(),
        height: image.height(),
        texels: Texels::Rgba8(image.into_raw()),
        color_space: ColorSpace::Srgb,
        mapping: TextureMapping::Uv,
    })
}

/// Decodes a Radiance HDR panorama for image based lighting.
pub fn decode_hdr(path: &str, bytes: &[u8]) -> Result<Texture, LoadError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)
        .map_err(|err| LoadError::decode_failed(path, err))?
        .to_rgba32f();
    Ok(Texture {
        id: GpuResourceId::next(),
        width: image.width(),
        height: image.height(),
        texels: Texels::RgbaF32(image.into_raw()),
        color_space: ColorSpace::Linear,
        mapping: TextureMapping::EquirectangularReflection,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{Rgb, Rgb32FImage, Rgba, RgbaImage};

    fn png_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(2, 3, Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn png_decodes_as_srgb() {
        let texture = decode_texture("red.png", &png_bytes()).unwrap();
        assert_eq!((texture.width, texture.height), (2, 3));
        assert_eq!(texture.color_space, ColorSpace::Srgb);
        assert_eq!(texture.mapping, TextureMapping::Uv);
        match &texture.texels {
            Texels::Rgba8(data) => assert_eq!(&data[..4], &[255, 0, 0, 255]),
            other => panic!("unexpected texels {other:?}"),
        }
    }

    #[test]
    fn hdr_uses_equirectangular_mapping() {
        let image = Rgb32FImage::from_pixel(4, 2, Rgb([2.0, 1.0, 0.5]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Hdr)
            .unwrap();

        let texture = decode_hdr("sky.hdr", &bytes).unwrap();
        assert_eq!(texture.mapping, TextureMapping::EquirectangularReflection);
        assert_eq!(texture.color_space, ColorSpace::Linear);
        assert!(matches!(texture.texels, Texels::RgbaF32(ref data) if data.len() == 4 * 2 * 4));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_texture("junk.png", b"not an image").unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
        assert!(decode_hdr("junk.hdr", &png_bytes()).is_err());
    }
}
