use super::PixelBuffer;

/// Supplies the colour of each dab pixel in scan order
///
/// Bytes returned by [`color`](ColoringSource::color) are in the colour space
/// of the dab being filled.
pub trait ColoringSource {
    fn color(&self) -> &[u8];
    fn next_column(&mut self);
    fn next_row(&mut self);
}

/// One colour for every pixel
#[derive(Debug, Clone, Copy)]
pub struct PlainColoring<'a> {
    color: &'a [u8],
}

impl<'a> PlainColoring<'a> {
    pub fn new(color: &'a [u8]) -> Self {
        Self { color }
    }
}

impl ColoringSource for PlainColoring<'_> {
    fn color(&self) -> &[u8] {
        self.color
    }

    fn next_column(&mut self) {}

    fn next_row(&mut self) {}
}

/// Streams colour from a pixel buffer, starting at its top-left corner
///
/// Positions past the edge of the source read as transparent black.
#[derive(Debug, Clone)]
pub struct DeviceColoring<'a> {
    source: &'a PixelBuffer,
    x: usize,
    y: usize,
    transparent: Vec<u8>,
}

impl<'a> DeviceColoring<'a> {
    pub fn new(source: &'a PixelBuffer) -> Self {
        Self {
            source,
            x: 0,
            y: 0,
            transparent: vec![0; source.color_space().pixel_size()],
        }
    }
}

impl ColoringSource for DeviceColoring<'_> {
    fn color(&self) -> &[u8] {
        self.source
            .pixel(self.x, self.y)
            .unwrap_or(self.transparent.as_slice())
    }

    fn next_column(&mut self) {
        self.x += 1;
    }

    fn next_row(&mut self) {
        self.x = 0;
        self.y += 1;
    }
}
