#![allow(clippy::unwrap_used)]
use byteorder::{BigEndian, WriteBytesExt};
use image::RgbaImage;

use super::*;
use crate::brush::{PipeBrush, PipeBrushParasite, RasterBrush, RasterSource, SelectionMode};
use crate::mask::PixelMask;

/// Hand-built record so tests do not depend on the writer
fn gbr_bytes(version: u32, width: u32, height: u32, bytes: u32, spacing: u32, name: &str) -> Vec<u8> {
    let mut name_bytes = name.as_bytes().to_vec();
    name_bytes.push(0);
    let fixed = if version == 1 { 20 } else { 28 };
    let mut out = Vec::new();
    out.write_u32::<BigEndian>((fixed + name_bytes.len()) as u32).unwrap();
    out.write_u32::<BigEndian>(version).unwrap();
    out.write_u32::<BigEndian>(width).unwrap();
    out.write_u32::<BigEndian>(height).unwrap();
    out.write_u32::<BigEndian>(bytes).unwrap();
    if version != 1 {
        out.extend_from_slice(b"GIMP");
        out.write_u32::<BigEndian>(spacing).unwrap();
    }
    out.extend_from_slice(&name_bytes);
    let samples = (width * height * bytes) as usize;
    out.extend((0..samples).map(|i| (i * 7 % 256) as u8));
    out
}

#[test]
fn parses_gray_brush_as_inverted_mask() {
    let data = gbr_bytes(2, 3, 2, 1, 40, "gray");
    let brush = GbrParser::parse(&data).unwrap();
    assert_eq!(brush.base().name(), "gray");
    assert_eq!((brush.base().width(), brush.base().height()), (3, 2));
    assert!((brush.base().spacing() - 0.4).abs() < 1e-9);
    let RasterSource::Mask(mask) = brush.source() else {
        panic!("expected a mask brush");
    };
    // Stored sample 7 at index 1 means alpha 248
    assert_eq!(mask.alpha_at(0, 0), 255);
    assert_eq!(mask.alpha_at(1, 0), 248);
    assert!(!brush.has_color());
}

#[test]
fn parses_rgba_brush() {
    let data = gbr_bytes(2, 2, 2, 4, 100, "rgba");
    let brush = GbrParser::parse(&data).unwrap();
    let RasterSource::Image(image) = brush.source() else {
        panic!("expected a colour brush");
    };
    assert_eq!(image.get_pixel(0, 0).0, [0, 7, 14, 21]);
    assert!(brush.has_color());
}

#[test]
fn version_one_defaults_spacing() {
    let data = gbr_bytes(1, 2, 2, 1, 0, "old");
    let brush = GbrParser::parse(&data).unwrap();
    assert_eq!(brush.base().name(), "old");
    assert!((brush.base().spacing() - 0.25).abs() < 1e-9);
}

#[test]
fn rejects_zero_width() {
    let data = gbr_bytes(2, 0, 4, 1, 25, "empty");
    assert!(matches!(
        GbrParser::parse(&data),
        Err(FormatError::ZeroDimensions { width: 0, .. })
    ));
}

#[test]
fn rejects_buffer_shorter_than_header() {
    let data = gbr_bytes(2, 2, 2, 1, 25, "short");
    let header_size = 28 + "short".len() + 1;
    let cut = &data[..header_size - 1];
    assert!(matches!(
        GbrParser::parse(cut),
        Err(FormatError::Truncated { .. })
    ));
}

#[test]
fn rejects_missing_pixels() {
    let data = gbr_bytes(2, 4, 4, 4, 25, "px");
    assert!(matches!(
        GbrParser::parse(&data[..data.len() - 1]),
        Err(FormatError::Truncated { .. })
    ));
}

#[test]
fn rejects_zero_header_size() {
    let mut data = gbr_bytes(2, 2, 2, 1, 25, "z");
    data[..4].copy_from_slice(&[0, 0, 0, 0]);
    assert!(matches!(
        GbrParser::parse(&data),
        Err(FormatError::ZeroHeaderSize)
    ));
}

#[test]
fn rejects_large_spacing_and_odd_depth() {
    let data = gbr_bytes(2, 2, 2, 1, 1001, "wide");
    assert!(matches!(
        GbrParser::parse(&data),
        Err(FormatError::SpacingOutOfRange(1001))
    ));
    let data = gbr_bytes(2, 2, 2, 3, 25, "rgb");
    assert!(matches!(
        GbrParser::parse(&data),
        Err(FormatError::UnsupportedDepth(3))
    ));
}

#[test]
fn rejects_tiny_input() {
    assert!(GbrParser::parse(&[0, 0, 0]).is_err());
    assert!(GbrParser::parse(&[]).is_err());
}

#[test]
fn mask_brush_round_trips() {
    let mask = PixelMask::from_raw(3, 3, (0..9).map(|i| i * 30).collect()).unwrap();
    let brush = RasterBrush::from_mask("round", mask.clone(), 0.3).unwrap();
    let bytes = GbrWriter::to_bytes(&brush).unwrap();
    let loaded = GbrParser::parse(&bytes).unwrap();
    assert_eq!(loaded.base().name(), "round");
    assert_eq!((loaded.base().width(), loaded.base().height()), (3, 3));
    assert!((loaded.base().spacing() - 0.3).abs() < 1e-3);
    assert_eq!(loaded.source(), &RasterSource::Mask(mask));
}

#[test]
fn colour_brush_round_trips() {
    let image = RgbaImage::from_fn(4, 3, |x, y| image::Rgba([x as u8 * 40, y as u8 * 60, 7, 200]));
    let brush = RasterBrush::from_image("colour", image.clone(), 1.5).unwrap();
    let loaded = GbrParser::parse(&GbrWriter::to_bytes(&brush).unwrap()).unwrap();
    assert_eq!(loaded.source(), &RasterSource::Image(image));
    assert!((loaded.base().spacing() - 1.5).abs() < 1e-3);
}

fn pipe_cells(n: usize) -> Vec<RasterBrush> {
    (0..n)
        .map(|i| {
            RasterBrush::from_mask(
                format!("cell {}", i),
                PixelMask::filled(2 + i, 2, (50 * (i + 1)) as u8),
                0.25,
            )
            .unwrap()
        })
        .collect()
}

#[test]
fn pipe_round_trips() {
    let parasite = PipeBrushParasite::new(
        6,
        &[3, 2],
        &[SelectionMode::Pressure, SelectionMode::Random],
    )
    .unwrap();
    let pipe = PipeBrush::new("leaves", pipe_cells(6), parasite.clone()).unwrap();
    let bytes = GihWriter::to_bytes(&pipe).unwrap();
    let loaded = GihParser::parse(&bytes).unwrap();

    assert_eq!(loaded.base().name(), "leaves");
    assert_eq!(loaded.parasite(), &parasite);
    assert_eq!(loaded.brushes().len(), 6);
    for (a, b) in loaded.brushes().iter().zip(pipe.brushes()) {
        assert_eq!(a.source(), b.source());
        assert_eq!(a.base().name(), b.base().name());
    }
}

#[test]
fn pipe_without_descriptor_cycles_cells() {
    let mut data = b"plain\n2\n".to_vec();
    for cell in pipe_cells(2) {
        data.extend(GbrWriter::to_bytes(&cell).unwrap());
    }
    let pipe = GihParser::parse(&data).unwrap();
    assert_eq!(pipe.parasite().selection(), &[SelectionMode::Incremental]);
    assert_eq!(pipe.parasite().rank(), &[2]);
}

#[test]
fn pipe_cell_count_must_match_ranks() {
    let mut data = b"bad\n2 ncells:2 dim:1 rank0:3 sel0:random\n".to_vec();
    for cell in pipe_cells(2) {
        data.extend(GbrWriter::to_bytes(&cell).unwrap());
    }
    assert!(matches!(
        GihParser::parse(&data),
        Err(FormatError::CellCountMismatch { .. })
    ));
}

#[test]
fn pipe_with_missing_cells_is_rejected() {
    let mut data = b"short\n3 ncells:3 dim:1 rank0:3 sel0:incremental\n".to_vec();
    for cell in pipe_cells(2) {
        data.extend(GbrWriter::to_bytes(&cell).unwrap());
    }
    assert!(GihParser::parse(&data).is_err());
}

#[test]
fn pipe_cell_count_larger_than_data_is_rejected() {
    let data = b"x\n100000000000000 ncells:100000000000000 dim:1 rank0:100000000000000 sel0:incremental\n";
    assert!(matches!(
        GihParser::parse(data),
        Err(FormatError::InvalidPipeHeader(_))
    ));

    let mut data = b"huge\n4 ncells:4 dim:4 rank0:4294967296 rank1:4294967296 rank2:4294967296 rank3:4294967296 sel0:random\n".to_vec();
    for cell in pipe_cells(4) {
        data.extend(GbrWriter::to_bytes(&cell).unwrap());
    }
    assert!(matches!(
        GihParser::parse(&data),
        Err(FormatError::CellCountMismatch { .. })
    ));
}

#[test]
fn pipe_name_with_line_break_is_not_written() {
    let parasite = PipeBrushParasite::new(2, &[2], &[SelectionMode::Incremental]).unwrap();
    let pipe = PipeBrush::new("two\nlines", pipe_cells(2), parasite).unwrap();
    assert!(matches!(
        GihWriter::to_bytes(&pipe),
        Err(FormatError::InvalidPipeHeader(_))
    ));
}

#[test]
fn pipe_header_must_be_present() {
    assert!(matches!(
        GihParser::parse(b"just a name"),
        Err(FormatError::InvalidPipeHeader(_))
    ));
    assert!(matches!(
        GihParser::parse(b"name\nmany cells\n"),
        Err(FormatError::InvalidPipeHeader(_))
    ));
}

#[test]
fn file_type_from_extension() {
    use std::path::Path;
    assert_eq!(
        BrushFileType::from_path(Path::new("a/b/Leaf.GIH")),
        Some(BrushFileType::Gih)
    );
    assert_eq!(
        BrushFileType::from_path(Path::new("x.gbr")),
        Some(BrushFileType::Gbr)
    );
    assert_eq!(
        BrushFileType::from_path(Path::new("leaf.svg")),
        Some(BrushFileType::Svg)
    );
    assert_eq!(BrushFileType::from_path(Path::new("x.png")), None);
}

const RED_SQUARE: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><rect width="8" height="8" fill="red"/></svg>"#;

#[test]
fn svg_is_rasterized_at_its_own_size() {
    let brush = SvgParser::parse("square", RED_SQUARE).unwrap();
    assert_eq!(brush.base().name(), "square");
    assert_eq!((brush.base().width(), brush.base().height()), (8, 8));
    assert!(brush.has_color());
    let RasterSource::Image(image) = brush.source() else {
        panic!("svg brushes are colour brushes");
    };
    assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(7, 7).0, [255, 0, 0, 255]);
}

#[test]
fn svg_colour_is_stored_straight() {
    let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><rect x="2" width="2" height="4" fill="#00ff00" fill-opacity="0.5"/></svg>"##;
    let brush = SvgParser::parse("half", svg).unwrap();
    let RasterSource::Image(image) = brush.source() else {
        panic!("svg brushes are colour brushes");
    };
    assert_eq!(image.get_pixel(0, 1).0[3], 0);
    let [r, g, b, a] = image.get_pixel(3, 1).0;
    assert!((127..=129).contains(&a));
    assert!(g >= 250);
    assert_eq!((r, b), (0, 0));
}

#[test]
fn broken_or_oversized_svg_is_rejected() {
    assert!(matches!(
        SvgParser::parse("junk", b"not xml at all"),
        Err(FormatError::InvalidSvg(_))
    ));
    let huge = br#"<svg xmlns="http://www.w3.org/2000/svg" width="100000" height="10"/>"#;
    assert!(matches!(
        SvgParser::parse("huge", huge),
        Err(FormatError::InvalidSvg(_))
    ));
}

