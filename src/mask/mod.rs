//! 8-bit alpha masks
//!
//! [`PixelMask`] is the single-channel buffer every dab passes through. Reads
//! outside the mask return [`OPACITY_TRANSPARENT`]; the resampling code relies
//! on that to treat the surroundings of a brush as empty.
//!
//! The sampling helpers in this module work on interleaved 8-bit samples with
//! any channel count, so premultiplied RGBA levels share them with masks.

pub const OPACITY_TRANSPARENT: u8 = 0;
pub const OPACITY_OPAQUE: u8 = 255;

/// Rotations closer to zero than this are treated as no rotation
const ANGLE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMask {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelMask {
    /// Create a fully transparent mask
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![OPACITY_TRANSPARENT; width * height],
        }
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap existing row-major samples; `None` when the length does not match
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Alpha at (x, y); transparent outside the mask
    #[inline]
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        self.index(x, y)
            .map(|i| self.data[i])
            .unwrap_or(OPACITY_TRANSPARENT)
    }

    /// Set alpha at (x, y); ignored outside the mask
    #[inline]
    pub fn set_alpha_at(&mut self, x: i32, y: i32, alpha: u8) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = alpha;
        }
    }

    /// Sum of all alpha values
    pub fn total(&self) -> u64 {
        self.data.iter().map(|&a| a as u64).sum()
    }

    /// Bilinear sample at fractional pixel-index coordinates
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let mut out = [0.0];
        sample_bilinear(&self.data, self.width, self.height, 1, x, y, &mut out);
        out[0]
    }

    /// Linear blend `(1 - t) * first + t * second`
    ///
    /// Both masks must have the same size; the result takes the size of `first`
    /// and samples missing from `second` read as transparent.
    pub fn interpolate(first: &PixelMask, second: &PixelMask, t: f64) -> PixelMask {
        let data = interpolate_samples(&first.data, &second.data, t);
        PixelMask {
            width: first.width,
            height: first.height,
            data,
        }
    }

    /// Rotate around the centre into a buffer large enough to hold the result
    pub fn rotate(&self, angle: f64) -> PixelMask {
        let (data, width, height) = rotate_samples(&self.data, self.width, self.height, 1, angle);
        PixelMask {
            width,
            height,
            data,
        }
    }
}

/// Round and clamp an accumulated sample into a byte
#[inline]
pub(crate) fn to_u8(value: f64) -> u8 {
    (value + 0.5).floor().clamp(0.0, 255.0) as u8
}

/// Multiply two 8-bit coverages, rounding to nearest
#[inline]
pub(crate) fn mul_u8(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 0x80;
    (((t >> 8) + t) >> 8) as u8
}

/// Bilinear sample of interleaved 8-bit data
///
/// `x`/`y` are pixel-index coordinates (pixel centres at integers). Samples
/// outside the buffer contribute zero. One value per channel lands in `out`.
#[inline]
pub(crate) fn sample_bilinear(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    x: f64,
    y: f64,
    out: &mut [f64],
) {
    let left = x.floor();
    let top = y.floor();
    let x_interp = x - left;
    let y_interp = y - top;
    let (left, top) = (left as i64, top as i64);

    let fetch = |px: i64, py: i64, c: usize| -> f64 {
        if px >= 0 && py >= 0 && (px as usize) < width && (py as usize) < height {
            src[(py as usize * width + px as usize) * channels + c] as f64
        } else {
            0.0
        }
    };

    let a = 1.0 - x_interp;
    let b = 1.0 - y_interp;

    for (c, value) in out.iter_mut().enumerate().take(channels) {
        *value = a * b * fetch(left, top, c)
            + a * (1.0 - b) * fetch(left, top + 1, c)
            + (1.0 - a) * b * fetch(left + 1, top, c)
            + (1.0 - a) * (1.0 - b) * fetch(left + 1, top + 1, c);
    }
}

pub(crate) fn interpolate_samples(first: &[u8], second: &[u8], t: f64) -> Vec<u8> {
    first
        .iter()
        .enumerate()
        .map(|(i, &a)| {
            let b = second.get(i).copied().unwrap_or(OPACITY_TRANSPARENT);
            to_u8((1.0 - t) * a as f64 + t * b as f64)
        })
        .collect()
}

/// Size of the axis-aligned box holding a `width` x `height` rectangle rotated by `angle`
pub fn rotated_extent(width: f64, height: f64, angle: f64) -> (f64, f64) {
    let (sin, cos) = angle.sin_cos();
    (
        width * cos.abs() + height * sin.abs(),
        width * sin.abs() + height * cos.abs(),
    )
}

/// Rotate interleaved samples about the buffer centre
///
/// Returns the rotated samples and their new width and height.
pub(crate) fn rotate_samples(
    src: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    angle: f64,
) -> (Vec<u8>, usize, usize) {
    let turns = angle.rem_euclid(std::f64::consts::TAU);
    if turns < ANGLE_EPSILON || std::f64::consts::TAU - turns < ANGLE_EPSILON || width == 0 || height == 0 {
        return (src.to_vec(), width, height);
    }

    let (extent_w, extent_h) = rotated_extent(width as f64, height as f64, angle);
    // Trim float noise so a quarter turn of an NxM buffer stays MxN
    let dst_width = ((extent_w - 1e-6).ceil() as usize).max(1);
    let dst_height = ((extent_h - 1e-6).ceil() as usize).max(1);

    let (sin, cos) = angle.sin_cos();
    let src_cx = width as f64 / 2.0;
    let src_cy = height as f64 / 2.0;
    let dst_cx = dst_width as f64 / 2.0;
    let dst_cy = dst_height as f64 / 2.0;

    let mut dst = vec![0u8; dst_width * dst_height * channels];
    let mut sample = vec![0.0; channels];

    for dy in 0..dst_height {
        let ry = dy as f64 + 0.5 - dst_cy;
        for dx in 0..dst_width {
            let rx = dx as f64 + 0.5 - dst_cx;
            // Inverse rotation back into source space
            let sx = rx * cos + ry * sin + src_cx - 0.5;
            let sy = -rx * sin + ry * cos + src_cy - 0.5;

            sample_bilinear(src, width, height, channels, sx, sy, &mut sample);

            let base = (dy * dst_width + dx) * channels;
            for (c, value) in sample.iter().enumerate() {
                dst[base + c] = to_u8(*value);
            }
        }
    }

    (dst, dst_width, dst_height)
}
