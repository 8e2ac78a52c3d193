use std::io::Cursor;
use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use super::ConversionError;

/// ICO entries cannot exceed 256px per side
const ICO_MAX_DIMENSION: u32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
    Ico,
    Svg,
}

impl LogoFormat {
    pub fn extension(self) -> &'static str {
        match self {
            LogoFormat::Png => "png",
            LogoFormat::Jpeg => "jpg",
            LogoFormat::Webp => "webp",
            LogoFormat::Gif => "gif",
            LogoFormat::Ico => "ico",
            LogoFormat::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            LogoFormat::Png => "image/png",
            LogoFormat::Jpeg => "image/jpeg",
            LogoFormat::Webp => "image/webp",
            LogoFormat::Gif => "image/gif",
            LogoFormat::Ico => "image/x-icon",
            LogoFormat::Svg => "image/svg+xml",
        }
    }

    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type.to_ascii_lowercase().as_str() {
            "image/png" => Some(LogoFormat::Png),
            "image/jpeg" | "image/jpg" => Some(LogoFormat::Jpeg),
            "image/webp" => Some(LogoFormat::Webp),
            "image/gif" => Some(LogoFormat::Gif),
            "image/x-icon" | "image/vnd.microsoft.icon" => Some(LogoFormat::Ico),
            "image/svg+xml" => Some(LogoFormat::Svg),
            _ => None,
        }
    }

    fn image_format(self) -> Option<ImageFormat> {
        match self {
            LogoFormat::Png => Some(ImageFormat::Png),
            LogoFormat::Jpeg => Some(ImageFormat::Jpeg),
            LogoFormat::Webp => Some(ImageFormat::WebP),
            LogoFormat::Gif => Some(ImageFormat::Gif),
            LogoFormat::Ico => Some(ImageFormat::Ico),
            LogoFormat::Svg => None,
        }
    }
}

impl FromStr for LogoFormat {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(LogoFormat::Png),
            "jpg" | "jpeg" => Ok(LogoFormat::Jpeg),
            "webp" => Ok(LogoFormat::Webp),
            "gif" => Ok(LogoFormat::Gif),
            "ico" => Ok(LogoFormat::Ico),
            "svg" => Ok(LogoFormat::Svg),
            other => Err(ConversionError::UnsupportedFormat(format!(
                "'{}' is not a supported logo format (png, jpg, webp, gif, ico, svg)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogoOptions {
    /// Invert color channels, keeping transparency
    pub dark_variant: bool,
    /// Longest side in pixels; images are never upscaled
    pub max_dimension: Option<u32>,
}

/// Raster logo conversion. Synchronous and CPU-bound: call from
/// `spawn_blocking`.
pub struct LogoConverter;

impl LogoConverter {
    pub fn convert(
        data: &[u8],
        source: LogoFormat,
        target: LogoFormat,
        options: LogoOptions,
    ) -> Result<Vec<u8>, ConversionError> {
        if source == LogoFormat::Svg {
            if target == LogoFormat::Svg && !options.dark_variant && options.max_dimension.is_none()
            {
                return Ok(data.to_vec());
            }
            return Err(ConversionError::UnsupportedSource(
                "SVG logos are served as SVG only".to_string(),
            ));
        }

        let output_format = target.image_format().ok_or_else(|| {
            ConversionError::UnsupportedFormat("Raster logos cannot be converted to SVG".to_string())
        })?;

        let mut img = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()
            .map_err(|e| ConversionError::Decode(e.to_string()))?;

        let limit = match (target, options.max_dimension) {
            (LogoFormat::Ico, Some(max)) => Some(max.min(ICO_MAX_DIMENSION)),
            (LogoFormat::Ico, None) => Some(ICO_MAX_DIMENSION),
            (_, max) => max,
        };
        if let Some(max) = limit {
            let (width, height) = img.dimensions();
            if width > max || height > max {
                img = img.resize(max, max, FilterType::Lanczos3);
            }
        }

        if options.dark_variant {
            img = invert_preserving_alpha(img);
        }

        // JPEG has no alpha channel
        if target == LogoFormat::Jpeg {
            img = DynamicImage::ImageRgb8(img.to_rgb8());
        }

        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), output_format)
            .map_err(|e| ConversionError::Encode(e.to_string()))?;

        tracing::debug!(
            source = source.extension(),
            target = target.extension(),
            dark = options.dark_variant,
            input_bytes = data.len(),
            output_bytes = buffer.len(),
            "Logo converted"
        );

        Ok(buffer)
    }
}

fn invert_preserving_alpha(img: DynamicImage) -> DynamicImage {
    let mut rgba = img.to_rgba8();
    for pixel in rgba.pixels_mut() {
        pixel[0] = 255 - pixel[0];
        pixel[1] = 255 - pixel[1];
        pixel[2] = 255 - pixel[2];
    }
    DynamicImage::ImageRgba8(rgba)
}

/// Solid-color PNG used as a Slack swatch
pub fn solid_swatch_png(r: u8, g: u8, b: u8, size: u32) -> Result<Vec<u8>, ConversionError> {
    let img = image::RgbImage::from_pixel(size, size, image::Rgb([r, g, b]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ConversionError::Encode(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn decode(data: &[u8]) -> DynamicImage {
        image::load_from_memory(data).unwrap()
    }

    #[test]
    fn parses_format_aliases() {
        assert_eq!("JPEG".parse::<LogoFormat>().unwrap(), LogoFormat::Jpeg);
        assert_eq!("jpg".parse::<LogoFormat>().unwrap(), LogoFormat::Jpeg);
        assert!("tiff".parse::<LogoFormat>().is_err());
    }

    #[test]
    fn png_to_webp_and_jpeg() {
        let source = png(8, 8, [200, 10, 10, 255]);
        for target in [LogoFormat::Webp, LogoFormat::Jpeg, LogoFormat::Gif] {
            let out =
                LogoConverter::convert(&source, LogoFormat::Png, target, LogoOptions::default())
                    .unwrap();
            assert_eq!(decode(&out).dimensions(), (8, 8));
        }
    }

    #[test]
    fn resize_only_shrinks() {
        let source = png(400, 200, [0, 0, 0, 255]);
        let options = LogoOptions {
            max_dimension: Some(100),
            ..Default::default()
        };
        let out = LogoConverter::convert(&source, LogoFormat::Png, LogoFormat::Png, options).unwrap();
        assert_eq!(decode(&out).dimensions(), (100, 50));

        let small = png(10, 10, [0, 0, 0, 255]);
        let out = LogoConverter::convert(&small, LogoFormat::Png, LogoFormat::Png, options).unwrap();
        assert_eq!(decode(&out).dimensions(), (10, 10));
    }

    #[test]
    fn ico_is_capped_at_256() {
        let source = png(512, 512, [0, 128, 255, 255]);
        let out =
            LogoConverter::convert(&source, LogoFormat::Png, LogoFormat::Ico, LogoOptions::default())
                .unwrap();
        let img = image::load_from_memory_with_format(&out, ImageFormat::Ico).unwrap();
        assert_eq!(img.dimensions(), (256, 256));
    }

    #[test]
    fn dark_variant_inverts_color_and_keeps_alpha() {
        let source = png(2, 2, [255, 0, 10, 128]);
        let options = LogoOptions {
            dark_variant: true,
            ..Default::default()
        };
        let out = LogoConverter::convert(&source, LogoFormat::Png, LogoFormat::Png, options).unwrap();
        let pixel = decode(&out).to_rgba8().get_pixel(0, 0).0;
        assert_eq!(pixel, [0, 255, 245, 128]);
    }

    #[test]
    fn svg_passthrough_and_rejections() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#;
        let out =
            LogoConverter::convert(svg, LogoFormat::Svg, LogoFormat::Svg, LogoOptions::default())
                .unwrap();
        assert_eq!(out, svg.to_vec());

        let err =
            LogoConverter::convert(svg, LogoFormat::Svg, LogoFormat::Png, LogoOptions::default())
                .unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedSource(_)));

        let raster = png(4, 4, [0, 0, 0, 255]);
        let err =
            LogoConverter::convert(&raster, LogoFormat::Png, LogoFormat::Svg, LogoOptions::default())
                .unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedFormat(_)));
    }

    #[test]
    fn swatch_is_a_valid_png() {
        let out = solid_swatch_png(0x33, 0x66, 0x99, 16).unwrap();
        let img = decode(&out);
        assert_eq!(img.to_rgb8().get_pixel(3, 3).0, [0x33, 0x66, 0x99]);
    }
}
