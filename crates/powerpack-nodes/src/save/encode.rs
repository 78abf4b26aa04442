//! PNG and JPEG encoding with embedded text

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::error::{PowerpackError, Result};
use crate::tensor::ImageBatch;

/// EXIF tag of the Exif sub-IFD pointer
const TAG_EXIF_IFD: u16 = 0x8769;
/// EXIF UserComment tag
const TAG_USER_COMMENT: u16 = 0x9286;

const TIFF_LONG: u16 = 4;
const TIFF_UNDEFINED: u16 = 7;

/// 8-bit interleaved pixels of one image
#[derive(Debug, Clone, PartialEq)]
pub struct Pixels {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub data: Vec<u8>,
}

impl Pixels {
    /// First image of a batch
    pub fn from_batch(batch: &ImageBatch) -> Result<Self> {
        let data = batch.first_as_u8()?;
        let dim = |v: usize| {
            u32::try_from(v).map_err(|_| PowerpackError::Image(format!("dimension {v} too large")))
        };
        Ok(Self {
            width: dim(batch.width)?,
            height: dim(batch.height)?,
            channels: batch.channels,
            data,
        })
    }

    /// Same pixels without the alpha channel (gray and RGB pass through)
    fn without_alpha(&self) -> (Vec<u8>, ExtendedColorType) {
        match self.channels {
            1 => (self.data.clone(), ExtendedColorType::L8),
            4 => (
                self.data
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect(),
                ExtendedColorType::Rgb8,
            ),
            _ => (self.data.clone(), ExtendedColorType::Rgb8),
        }
    }
}

fn is_latin1(text: &str) -> bool {
    text.chars().all(|c| (c as u32) <= 0xFF)
}

/// Encode a PNG carrying the given text chunks.
///
/// Latin-1 text goes into `tEXt` chunks, anything else into `iTXt`.
pub fn encode_png(pixels: &Pixels, text_chunks: &[(&str, String)]) -> Result<Vec<u8>> {
    let color = match pixels.channels {
        1 => png::ColorType::Grayscale,
        3 => png::ColorType::Rgb,
        4 => png::ColorType::Rgba,
        n => return Err(PowerpackError::Image(format!("unsupported channel count {n}"))),
    };

    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, pixels.width, pixels.height);
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    for (keyword, text) in text_chunks {
        if is_latin1(text) {
            encoder.add_text_chunk(keyword.to_string(), text.clone())?;
        } else {
            encoder.add_itxt_chunk(keyword.to_string(), text.clone())?;
        }
    }

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels.data)?;
    writer.finish()?;
    Ok(buf)
}

/// EXIF UserComment payload: 8-byte charset header, then the text.
fn user_comment_payload(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        let mut payload = b"ASCII\0\0\0".to_vec();
        payload.extend_from_slice(text.as_bytes());
        payload
    } else {
        let mut payload = b"UNICODE\0".to_vec();
        payload.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        payload
    }
}

/// Little-endian TIFF block: IFD0 -> Exif IFD -> UserComment.
fn exif_tiff(comment: &str) -> Result<Vec<u8>> {
    let payload = user_comment_payload(comment);
    let count = u32::try_from(payload.len())
        .map_err(|_| PowerpackError::Image("EXIF comment too large".to_string()))?;

    // Offsets are from the start of the TIFF header.
    const IFD0: u32 = 8;
    const EXIF_IFD: u32 = IFD0 + 2 + 12 + 4;
    const DATA: u32 = EXIF_IFD + 2 + 12 + 4;

    let mut tiff = Vec::with_capacity(DATA as usize + payload.len());
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&IFD0.to_le_bytes());

    let mut ifd = |tag: u16, kind: u16, count: u32, value: u32| {
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&tag.to_le_bytes());
        tiff.extend_from_slice(&kind.to_le_bytes());
        tiff.extend_from_slice(&count.to_le_bytes());
        tiff.extend_from_slice(&value.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
    };
    ifd(TAG_EXIF_IFD, TIFF_LONG, 1, EXIF_IFD);
    ifd(TAG_USER_COMMENT, TIFF_UNDEFINED, count, DATA);

    tiff.extend_from_slice(&payload);
    Ok(tiff)
}

/// Insert an APP1 EXIF segment with a UserComment into an encoded JPEG.
///
/// The segment goes right after SOI, or after the JFIF APP0 segment when
/// there is one.
pub fn insert_user_comment(jpeg: &[u8], comment: &str) -> Result<Vec<u8>> {
    if jpeg.len() < 4 || jpeg[..2] != [0xFF, 0xD8] {
        return Err(PowerpackError::Image("not a JPEG stream".to_string()));
    }

    let tiff = exif_tiff(comment)?;
    let segment_len = u16::try_from(2 + 6 + tiff.len())
        .map_err(|_| PowerpackError::Image("EXIF segment exceeds 64 KiB".to_string()))?;

    let mut insert_at = 2;
    if jpeg[2..4] == [0xFF, 0xE0] && jpeg.len() >= 6 {
        let app0_len = u16::from_be_bytes([jpeg[4], jpeg[5]]) as usize;
        insert_at = (4 + app0_len).min(jpeg.len());
    }

    let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
    out.extend_from_slice(&jpeg[..insert_at]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(&tiff);
    out.extend_from_slice(&jpeg[insert_at..]);
    Ok(out)
}

/// Encode a JPEG at `quality` with `comment` as the EXIF UserComment.
/// Alpha is dropped.
pub fn encode_jpeg(pixels: &Pixels, quality: u8, comment: &str) -> Result<Vec<u8>> {
    let (data, color) = pixels.without_alpha();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode(
        &data,
        pixels.width,
        pixels.height,
        color,
    )?;
    insert_user_comment(&buf, comment)
}
