use thiserror::Error;

use crate::textflow::Rect;

/// Handle to an image already written into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image data too short ({0} bytes)")]
    TooShort(usize),
    #[error("unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,
    #[error("PNG decode error: {0}")]
    Png(#[from] png::DecodingError),
    #[error("unsupported PNG color type {0:?}")]
    UnsupportedColorType(png::ColorType),
    #[error("JPEG has {0} components (expected 1 or 3)")]
    UnsupportedJpegComponents(u8),
    #[error("no SOF marker found in JPEG data")]
    MissingJpegFrame,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceRGB,
    DeviceGray,
}

impl ColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceGray => "DeviceGray",
        }
    }
}

/// Decoded image ready to become an XObject.
#[derive(Debug)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub color_space: ColorSpace,
    /// JPEG bytes as-is (DCTDecode) or 8-bit samples for PNG.
    pub data: Vec<u8>,
    /// 8-bit alpha samples, written as a soft mask.
    pub alpha: Option<Vec<u8>>,
}

pub fn detect_format(data: &[u8]) -> Result<ImageFormat, ImageError> {
    if data.len() < 4 {
        return Err(ImageError::TooShort(data.len()));
    }
    match data {
        [0xFF, 0xD8, ..] => Ok(ImageFormat::Jpeg),
        [0x89, b'P', b'N', b'G', ..] => Ok(ImageFormat::Png),
        _ => Err(ImageError::UnsupportedFormat),
    }
}

pub fn load_image(data: Vec<u8>) -> Result<ImageData, ImageError> {
    match detect_format(&data)? {
        ImageFormat::Jpeg => load_jpeg(data),
        ImageFormat::Png => load_png(&data),
    }
}

fn load_jpeg(data: Vec<u8>) -> Result<ImageData, ImageError> {
    let (width, height, components) = jpeg_frame(&data)?;
    let color_space = match components {
        1 => ColorSpace::DeviceGray,
        3 => ColorSpace::DeviceRGB,
        n => return Err(ImageError::UnsupportedJpegComponents(n)),
    };
    Ok(ImageData {
        width,
        height,
        format: ImageFormat::Jpeg,
        color_space,
        data,
        alpha: None,
    })
}

/// Walk marker segments until a SOF0..SOF3 frame header.
fn jpeg_frame(data: &[u8]) -> Result<(u32, u32, u8), ImageError> {
    let mut i = 2;
    while i + 3 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = data[i + 1];
        match marker {
            0xC0..=0xC3 => {
                if i + 9 >= data.len() {
                    break;
                }
                let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
                let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
                return Ok((width, height, data[i + 9]));
            }
            0xFF | 0x00 => i += 1,
            0xD0..=0xD9 | 0x01 => i += 2,
            _ => {
                let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
                i += 2 + len;
            }
        }
    }
    Err(ImageError::MissingJpegFrame)
}

fn load_png(data: &[u8]) -> Result<ImageData, ImageError> {
    let mut decoder = png::Decoder::new(data);
    // Palette and low bit depths become 8-bit gray or RGB samples.
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    buf.truncate(frame.buffer_size());

    let (color_space, samples, alpha) = match frame.color_type {
        png::ColorType::Rgb => (ColorSpace::DeviceRGB, buf, None),
        png::ColorType::Grayscale => (ColorSpace::DeviceGray, buf, None),
        png::ColorType::Rgba => {
            let (rgb, alpha) = split_alpha(&buf, 4);
            (ColorSpace::DeviceRGB, rgb, Some(alpha))
        }
        png::ColorType::GrayscaleAlpha => {
            let (gray, alpha) = split_alpha(&buf, 2);
            (ColorSpace::DeviceGray, gray, Some(alpha))
        }
        other => return Err(ImageError::UnsupportedColorType(other)),
    };

    Ok(ImageData {
        width: frame.width,
        height: frame.height,
        format: ImageFormat::Png,
        color_space,
        data: samples,
        alpha,
    })
}

/// Separate interleaved samples into color channels and an alpha plane.
fn split_alpha(buf: &[u8], stride: usize) -> (Vec<u8>, Vec<u8>) {
    let pixels = buf.len() / stride;
    let mut color = Vec::with_capacity(pixels * (stride - 1));
    let mut alpha = Vec::with_capacity(pixels);
    for px in buf.chunks_exact(stride) {
        color.extend_from_slice(&px[..stride - 1]);
        alpha.push(px[stride - 1]);
    }
    (color, alpha)
}

/// Where an image lands on the page, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale an image to fit inside `rect` keeping its aspect ratio,
/// anchored to the rect's top-left corner.
pub fn fit_within(width: u32, height: u32, rect: &Rect) -> ImagePlacement {
    let (iw, ih) = (width.max(1) as f64, height.max(1) as f64);
    let scale = (rect.width / iw).min(rect.height / ih);
    let (w, h) = (iw * scale, ih * scale);
    ImagePlacement {
        x: rect.x,
        y: rect.y - h,
        width: w,
        height: h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_by_magic() {
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(), ImageFormat::Jpeg);
        assert_eq!(
            detect_format(&[0x89, b'P', b'N', b'G', 0x0D]).unwrap(),
            ImageFormat::Png
        );
        assert!(matches!(detect_format(b"GIF89a"), Err(ImageError::UnsupportedFormat)));
        assert!(matches!(detect_format(&[1, 2]), Err(ImageError::TooShort(2))));
    }

    #[test]
    fn jpeg_frame_header_is_read() {
        // SOI, APP0 (len 4), SOF0 with 40x20, 3 components.
        let data = vec![
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00,
            0x14, 0x00, 0x28, 0x03, 0x00, 0x00,
        ];
        let img = load_image(data).unwrap();
        assert_eq!((img.width, img.height), (40, 20));
        assert_eq!(img.color_space, ColorSpace::DeviceRGB);
    }

    #[test]
    fn truncated_jpeg_is_rejected() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
        assert!(matches!(load_image(data), Err(ImageError::MissingJpegFrame)));
    }

    #[test]
    fn split_alpha_deinterleaves() {
        let (rgb, a) = split_alpha(&[1, 2, 3, 200, 4, 5, 6, 100], 4);
        assert_eq!(rgb, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(a, vec![200, 100]);
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        let rect = Rect { x: 40.0, y: 800.0, width: 60.0, height: 60.0 };
        let p = fit_within(200, 100, &rect);
        assert_eq!((p.width, p.height), (60.0, 30.0));
        assert_eq!((p.x, p.y), (40.0, 770.0));
    }
}
