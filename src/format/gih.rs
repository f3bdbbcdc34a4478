//! GIMP image pipe (.gih) reading and writing
//!
//! A text line with the pipe name, a text line `"<ncells> <descriptor>"`, then
//! `ncells` .gbr records back to back.

use std::io::Write;

use super::gbr::{GbrParser, GbrWriter, V1_HEADER_SIZE};
use super::FormatError;
use crate::brush::{PipeBrush, PipeBrushParasite, SelectionMode};

/// Split off one `\n` terminated line; `\r` before the newline is dropped
fn read_line(data: &[u8]) -> Option<(String, &[u8])> {
    let end = data.iter().position(|&b| b == b'\n')?;
    let line = String::from_utf8_lossy(&data[..end])
        .trim_end_matches('\r')
        .to_string();
    Some((line, &data[end + 1..]))
}

pub struct GihParser;

impl GihParser {
    pub fn parse(data: &[u8]) -> Result<PipeBrush, FormatError> {
        let (name, rest) = read_line(data)
            .ok_or_else(|| FormatError::InvalidPipeHeader("missing name line".to_string()))?;
        let (header, body) = read_line(rest)
            .ok_or_else(|| FormatError::InvalidPipeHeader("missing parameter line".to_string()))?;

        let header = header.trim();
        let (count, descriptor) = header.split_once(' ').unwrap_or((header, ""));
        let ncells: usize = count.parse().map_err(|_| {
            FormatError::InvalidPipeHeader(format!("bad cell count '{}'", count))
        })?;
        if ncells == 0 {
            return Err(FormatError::InvalidPipeHeader("no cells".to_string()));
        }
        // Every cell is at least a version 1 header plus one pixel
        let room = body.len() / (V1_HEADER_SIZE + 1);
        if ncells > room {
            return Err(FormatError::InvalidPipeHeader(format!(
                "{} cells declared, {} bytes hold at most {}",
                ncells,
                body.len(),
                room
            )));
        }

        let parasite = if descriptor.trim().is_empty() {
            tracing::debug!("GIH '{}' has no descriptor, cycling {} cells", name, ncells);
            PipeBrushParasite::new(ncells, &[ncells], &[SelectionMode::Incremental])?
        } else {
            PipeBrushParasite::parse(descriptor, ncells)?
        };

        let mut cells = Vec::with_capacity(ncells);
        let mut offset = 0usize;
        for _ in 0..ncells {
            let (cell, used) = GbrParser::parse_record(&body[offset..])?;
            cells.push(cell);
            offset += used;
        }
        parasite.validate_cell_count(cells.len())?;

        tracing::debug!(
            "GIH '{}': {} cells, parasite '{}'",
            name,
            cells.len(),
            parasite
        );

        Ok(PipeBrush::from_parts(name, cells, parasite))
    }
}

pub struct GihWriter;

impl GihWriter {
    /// Names are stored on their own line, so line breaks are rejected
    pub fn write<W: Write>(writer: &mut W, pipe: &PipeBrush) -> Result<(), FormatError> {
        let name = pipe.base().name();
        if name.contains(['\n', '\r']) {
            return Err(FormatError::InvalidPipeHeader(format!(
                "name {:?} contains a line break",
                name
            )));
        }
        writeln!(writer, "{}", name)?;
        writeln!(writer, "{} {}", pipe.brushes().len(), pipe.parasite())?;
        for cell in pipe.brushes() {
            GbrWriter::write(writer, cell)?;
        }
        Ok(())
    }

    pub fn to_bytes(pipe: &PipeBrush) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::new();
        Self::write(&mut out, pipe)?;
        Ok(out)
    }
}
