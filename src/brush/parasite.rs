//! Pipe brush selection descriptor
//!
//! The descriptor is the immutable part: dimension count, per-dimension rank
//! and selection mode, and the strides that flatten a multi-dimensional index
//! into a cell number. The mutable per-dimension indices live in a
//! [`PipeCursor`] owned by the stroke.
//!
//! On disk the descriptor is a space separated `key:value` list, e.g.
//! `ncells:12 dim:2 rank0:3 sel0:pressure rank1:4 sel1:incremental`.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::PaintInformation;
use crate::format::FormatError;

/// Most selection dimensions a pipe can have
pub const MAX_DIMENSIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    #[default]
    Constant,
    Incremental,
    Angular,
    Velocity,
    Random,
    Pressure,
    TiltX,
    TiltY,
}

impl SelectionMode {
    /// Parse a `selN` value; unknown names select Constant
    pub fn parse(value: &str) -> Self {
        match value {
            "constant" => SelectionMode::Constant,
            "incremental" => SelectionMode::Incremental,
            "angular" => SelectionMode::Angular,
            "velocity" => SelectionMode::Velocity,
            "random" => SelectionMode::Random,
            "pressure" => SelectionMode::Pressure,
            "xtilt" => SelectionMode::TiltX,
            "ytilt" => SelectionMode::TiltY,
            other => {
                debug!("[Parasite] Unknown selection mode '{}', using constant", other);
                SelectionMode::Constant
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Constant => "constant",
            SelectionMode::Incremental => "incremental",
            SelectionMode::Angular => "angular",
            SelectionMode::Velocity => "velocity",
            SelectionMode::Random => "random",
            SelectionMode::Pressure => "pressure",
            SelectionMode::TiltX => "xtilt",
            SelectionMode::TiltY => "ytilt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeBrushParasite {
    ncells: usize,
    dim: usize,
    rank: [usize; MAX_DIMENSIONS],
    selection: [SelectionMode; MAX_DIMENSIONS],
    brushes_count: [usize; MAX_DIMENSIONS],
    needs_movement: bool,
}

impl PipeBrushParasite {
    /// Build from explicit ranks and modes; the slices give one entry per dimension
    pub fn new(
        ncells: usize,
        ranks: &[usize],
        selections: &[SelectionMode],
    ) -> Result<Self, FormatError> {
        let dim = ranks.len();
        if dim == 0 || dim > MAX_DIMENSIONS {
            return Err(FormatError::InvalidParasite(format!(
                "dimension count {} outside 1..={}",
                dim, MAX_DIMENSIONS
            )));
        }
        if selections.len() != dim {
            return Err(FormatError::InvalidParasite(format!(
                "{} ranks but {} selection modes",
                dim,
                selections.len()
            )));
        }

        let mut rank = [0; MAX_DIMENSIONS];
        let mut selection = [SelectionMode::Constant; MAX_DIMENSIONS];
        rank[..dim].copy_from_slice(ranks);
        selection[..dim].copy_from_slice(selections);

        let mut parasite = Self {
            ncells,
            dim,
            rank,
            selection,
            brushes_count: [0; MAX_DIMENSIONS],
            needs_movement: false,
        };
        parasite.sanitize();
        parasite.set_brushes_count();
        Ok(parasite)
    }

    /// Parse a descriptor string
    ///
    /// Keys may appear in any order and unknown keys are ignored. `ncells`
    /// falls back to `default_ncells` when the descriptor omits it.
    pub fn parse(descriptor: &str, default_ncells: usize) -> Result<Self, FormatError> {
        let mut ncells = default_ncells;
        let mut dim = 1usize;
        let mut rank = [0usize; MAX_DIMENSIONS];
        let mut selection = [SelectionMode::Constant; MAX_DIMENSIONS];

        let parse_number = |key: &str, value: &str| -> Result<usize, FormatError> {
            value.parse::<usize>().map_err(|_| {
                FormatError::InvalidParasite(format!("{} has non-numeric value '{}'", key, value))
            })
        };

        for token in descriptor.split_whitespace() {
            let Some((key, value)) = token.split_once(':') else {
                continue;
            };
            match key {
                "ncells" => ncells = parse_number(key, value)?,
                "dim" => dim = parse_number(key, value)?,
                _ => {
                    if let Some(i) = key.strip_prefix("rank").and_then(|n| n.parse::<usize>().ok()) {
                        if i < MAX_DIMENSIONS {
                            rank[i] = parse_number(key, value)?;
                        }
                    } else if let Some(i) =
                        key.strip_prefix("sel").and_then(|n| n.parse::<usize>().ok())
                    {
                        if i < MAX_DIMENSIONS {
                            selection[i] = SelectionMode::parse(value);
                        }
                    }
                }
            }
        }

        if dim == 0 || dim > MAX_DIMENSIONS {
            return Err(FormatError::InvalidParasite(format!(
                "dimension count {} outside 1..={}",
                dim, MAX_DIMENSIONS
            )));
        }
        Self::new(ncells, &rank[..dim], &selection[..dim])
    }

    /// Modes that divide by the rank fall back to Constant when the rank is zero
    fn sanitize(&mut self) {
        for i in 0..self.dim {
            let divides = matches!(
                self.selection[i],
                SelectionMode::Incremental | SelectionMode::Angular
            );
            if divides && self.rank[i] == 0 {
                warn!(
                    "[Parasite] Dimension {} uses {} with rank 0, treating as constant",
                    i,
                    self.selection[i].as_str()
                );
                self.selection[i] = SelectionMode::Constant;
            }
        }
        self.needs_movement = self.selection[..self.dim]
            .iter()
            .any(|s| *s == SelectionMode::Angular);
    }

    /// Strides: each dimension splits the cells left by the one before it
    fn set_brushes_count(&mut self) {
        let mut total = self.ncells;
        for i in 0..self.dim {
            if self.rank[i] != 0 {
                total /= self.rank[i];
            }
            self.brushes_count[i] = total;
        }
    }

    pub fn ncells(&self) -> usize {
        self.ncells
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rank(&self) -> &[usize] {
        &self.rank[..self.dim]
    }

    pub fn selection(&self) -> &[SelectionMode] {
        &self.selection[..self.dim]
    }

    pub fn brushes_count(&self) -> &[usize] {
        &self.brushes_count[..self.dim]
    }

    pub fn needs_movement(&self) -> bool {
        self.needs_movement
    }

    /// Cells implied by the ranks, with rank 0 counting as 1
    /// Product of the ranks; saturates instead of overflowing
    pub fn expected_cells(&self) -> usize {
        self.rank()
            .iter()
            .try_fold(1usize, |acc, &r| acc.checked_mul(r.max(1)))
            .unwrap_or(usize::MAX)
    }

    /// Fail unless the declared cell count matches both the ranks and `available`
    pub fn validate_cell_count(&self, available: usize) -> Result<(), FormatError> {
        let expected = self.expected_cells();
        if self.ncells != expected || self.ncells != available {
            return Err(FormatError::CellCountMismatch {
                declared: self.ncells,
                expected,
                available,
            });
        }
        Ok(())
    }

    /// Advance `cursor` for one dab and return the flat cell index
    pub fn select<R: Rng + ?Sized>(
        &self,
        cursor: &mut PipeCursor,
        info: &PaintInformation,
        rng: &mut R,
    ) -> usize {
        let mut current = 0;
        for i in 0..self.dim {
            let next = next_index(self.selection[i], cursor.index[i], self.rank[i], info, rng);
            cursor.index[i] = next;
            current += self.brushes_count[i] * next;
        }
        current
    }
}

impl fmt::Display for PipeBrushParasite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ncells:{} dim:{}", self.ncells, self.dim)?;
        for i in 0..self.dim {
            write!(
                f,
                " rank{}:{} sel{}:{}",
                i,
                self.rank[i],
                i,
                self.selection[i].as_str()
            )?;
        }
        Ok(())
    }
}

/// Bucket `value` in 0..=1 into `rank` cells by rounding
#[inline]
fn bucket_round(value: f64, rank: usize) -> usize {
    let v = value.clamp(0.0, 1.0);
    ((v * (rank - 1) as f64).round() as usize).min(rank - 1)
}

/// Bucket `value` in 0..1 into `rank` equal ranges
#[inline]
fn bucket_floor(value: f64, rank: usize) -> usize {
    let v = value.clamp(0.0, 1.0);
    ((v * rank as f64).floor() as usize).min(rank - 1)
}

fn next_index<R: Rng + ?Sized>(
    mode: SelectionMode,
    current: usize,
    rank: usize,
    info: &PaintInformation,
    rng: &mut R,
) -> usize {
    if rank == 0 {
        return current;
    }
    match mode {
        SelectionMode::Constant => current,
        SelectionMode::Incremental => (current + 1) % rank,
        SelectionMode::Random => rng.gen_range(0..rank),
        SelectionMode::Pressure => bucket_round(info.pressure, rank),
        SelectionMode::Velocity => bucket_round(info.velocity, rank),
        SelectionMode::Angular => {
            let angle = (info.drawing_angle + FRAC_PI_2).rem_euclid(TAU);
            bucket_floor(angle / TAU, rank)
        }
        SelectionMode::TiltX => bucket_floor((info.tilt_x.clamp(-1.0, 1.0) + 1.0) / 2.0, rank),
        SelectionMode::TiltY => bucket_floor((info.tilt_y.clamp(-1.0, 1.0) + 1.0) / 2.0, rank),
    }
}

/// Per-stroke selection state of a pipe brush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeCursor {
    index: [usize; MAX_DIMENSIONS],
}

impl PipeCursor {
    /// Fresh state: Incremental dimensions start just before cell 0
    pub fn new(parasite: &PipeBrushParasite) -> Self {
        let mut index = [0; MAX_DIMENSIONS];
        for i in 0..parasite.dim {
            if parasite.selection[i] == SelectionMode::Incremental && parasite.rank[i] > 0 {
                index[i] = parasite.rank[i] - 1;
            }
        }
        Self { index }
    }

    pub fn index(&self) -> &[usize; MAX_DIMENSIONS] {
        &self.index
    }
}
