//! GIMP brush (.gbr) reading and writing
//!
//! Layout, all fields big-endian u32:
//! `header_size, version, width, height, bytes[, magic "GIMP", spacing]`,
//! then the name (up to `header_size`), then `width * height * bytes` samples.
//! Version 1 has no magic or spacing. Gray samples store `255 - alpha`.

use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use image::RgbaImage;

use super::FormatError;
use crate::brush::{BrushBase, RasterBrush, RasterSource};
use crate::mask::PixelMask;

pub const GBR_MAGIC: &[u8; 4] = b"GIMP";

pub(crate) const V1_HEADER_SIZE: usize = 20;
const V2_HEADER_SIZE: usize = 28;
const MAX_SPACING_PERCENT: u32 = 1000;
const V1_SPACING_PERCENT: u32 = 25;

/// Header fields of one brush record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GbrHeader {
    pub header_size: u32,
    pub version: u32,
    pub width: u32,
    pub height: u32,
    pub bytes: u32,
    /// Percent of brush size; absent in version 1 files
    pub spacing: Option<u32>,
}

pub struct GbrParser;

impl GbrParser {
    /// Parse a single .gbr file
    pub fn parse(data: &[u8]) -> Result<RasterBrush, FormatError> {
        Self::parse_record(data).map(|(brush, _)| brush)
    }

    /// Parse one record at the start of `data`; returns the brush and bytes consumed
    pub fn parse_record(data: &[u8]) -> Result<(RasterBrush, usize), FormatError> {
        let header = Self::read_header(data)?;
        let name_offset = if header.version == 1 {
            V1_HEADER_SIZE
        } else {
            V2_HEADER_SIZE
        };
        let header_size = header.header_size as usize;

        let name_bytes = &data[name_offset..header_size];
        let name_end = name_bytes
            .iter()
            .rposition(|&b| b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        let name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();

        let (width, height) = (header.width as usize, header.height as usize);
        let end = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(header.bytes as usize))
            .and_then(|n| n.checked_add(header_size))
            .ok_or(FormatError::Truncated {
                needed: usize::MAX,
                available: data.len(),
            })?;
        if data.len() < end {
            return Err(FormatError::Truncated {
                needed: end,
                available: data.len(),
            });
        }
        let pixels = &data[header_size..end];

        let source = match header.bytes {
            1 => {
                let alpha = pixels.iter().map(|&v| 255 - v).collect();
                let mask = PixelMask::from_raw(width, height, alpha)
                    .unwrap_or_else(|| PixelMask::new(width, height));
                RasterSource::Mask(mask)
            }
            _ => {
                let image = RgbaImage::from_raw(header.width, header.height, pixels.to_vec())
                    .unwrap_or_else(|| RgbaImage::new(header.width, header.height));
                RasterSource::Image(image)
            }
        };

        let spacing = header.spacing.unwrap_or(V1_SPACING_PERCENT) as f64 / 100.0;

        tracing::debug!(
            "GBR '{}': version={}, {}x{}, {} bytes/px, spacing={}",
            name,
            header.version,
            width,
            height,
            header.bytes,
            spacing
        );

        let base = BrushBase::new(name, width, height, spacing);
        Ok((RasterBrush::from_parts(base, source), end))
    }

    /// Read and validate the fixed header
    pub fn read_header(data: &[u8]) -> Result<GbrHeader, FormatError> {
        if data.len() < V1_HEADER_SIZE {
            return Err(FormatError::Truncated {
                needed: V1_HEADER_SIZE,
                available: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let header_size = cursor.read_u32::<BigEndian>()?;
        let version = cursor.read_u32::<BigEndian>()?;
        let width = cursor.read_u32::<BigEndian>()?;
        let height = cursor.read_u32::<BigEndian>()?;
        let bytes = cursor.read_u32::<BigEndian>()?;

        if header_size == 0 {
            return Err(FormatError::ZeroHeaderSize);
        }
        if header_size as usize > data.len() {
            return Err(FormatError::Truncated {
                needed: header_size as usize,
                available: data.len(),
            });
        }

        let spacing = match version {
            1 => {
                if (header_size as usize) < V1_HEADER_SIZE {
                    return Err(FormatError::HeaderTooSmall(header_size));
                }
                None
            }
            2 => {
                if (header_size as usize) < V2_HEADER_SIZE {
                    return Err(FormatError::HeaderTooSmall(header_size));
                }
                let mut magic = [0u8; 4];
                cursor.read_exact(&mut magic)?;
                if &magic != GBR_MAGIC {
                    tracing::warn!("GBR magic mismatch: {:?}", magic);
                }
                let spacing = cursor.read_u32::<BigEndian>()?;
                if spacing > MAX_SPACING_PERCENT {
                    return Err(FormatError::SpacingOutOfRange(spacing));
                }
                Some(spacing)
            }
            other => return Err(FormatError::UnsupportedVersion(other)),
        };

        if width == 0 || height == 0 {
            return Err(FormatError::ZeroDimensions { width, height });
        }
        if bytes != 1 && bytes != 4 {
            return Err(FormatError::UnsupportedDepth(bytes));
        }

        Ok(GbrHeader {
            header_size,
            version,
            width,
            height,
            bytes,
            spacing,
        })
    }
}

pub struct GbrWriter;

impl GbrWriter {
    /// Write `brush` as a version 2 record
    ///
    /// Mask brushes are stored as 1 byte gray, colour brushes as RGBA.
    pub fn write<W: Write>(writer: &mut W, brush: &RasterBrush) -> Result<(), FormatError> {
        let base = brush.base();
        let mut name = base.name().as_bytes().to_vec();
        name.push(0);

        let (bytes, pixels): (u32, Vec<u8>) = match brush.source() {
            RasterSource::Mask(mask) => (1, mask.data().iter().map(|&a| 255 - a).collect()),
            RasterSource::Image(image) => (4, image.as_raw().clone()),
        };
        let spacing = ((base.spacing() * 100.0).round().max(0.0) as u32).min(MAX_SPACING_PERCENT);
        let header_size = u32::try_from(V2_HEADER_SIZE + name.len()).map_err(|_| {
            FormatError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "brush name too long",
            ))
        })?;

        writer.write_u32::<BigEndian>(header_size)?;
        writer.write_u32::<BigEndian>(2)?;
        writer.write_u32::<BigEndian>(base.width() as u32)?;
        writer.write_u32::<BigEndian>(base.height() as u32)?;
        writer.write_u32::<BigEndian>(bytes)?;
        writer.write_all(GBR_MAGIC)?;
        writer.write_u32::<BigEndian>(spacing)?;
        writer.write_all(&name)?;
        writer.write_all(&pixels)?;
        Ok(())
    }

    pub fn to_bytes(brush: &RasterBrush) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::new();
        Self::write(&mut out, brush)?;
        Ok(out)
    }
}
