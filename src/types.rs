use core::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RealignError, Result};

/// Channel group width used unless a run asks for something else.
pub const DEFAULT_ALIGN: usize = 64;

/// Channel-first dimensions of the input tensor, fixed for a whole run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape {
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self { channels, height, width }
    }

    /// (C, H, W)
    pub fn dims(&self) -> [usize; 3] {
        [self.channels, self.height, self.width]
    }

    /// C * H * W, or `InvalidShape` if that does not fit in a `usize`.
    pub fn element_count(&self) -> Result<usize> {
        checked_len(&self.dims())
    }

    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.height == 0 || self.width == 0 {
            return Err(RealignError::InvalidShape(format!(
                "every dimension must be positive, got {self}"
            )));
        }

        self.element_count().map(|_| ())
    }

    /// Zero channels appended so the channel count lands on a multiple of `align`.
    pub fn padding(&self, align: usize) -> usize {
        (align - self.channels % align) % align
    }

    pub fn padded_channels(&self, align: usize) -> Result<usize> {
        self.channels.checked_add(self.padding(align)).ok_or_else(|| {
            RealignError::InvalidShape(format!("{self} padded to {align} channels overflows"))
        })
    }

    pub fn num_groups(&self, align: usize) -> Result<usize> {
        Ok(self.padded_channels(align)? / align)
    }

    /// Element count of the padded channel-last tensor, H * W * (C + padding).
    pub fn padded_element_count(&self, align: usize) -> Result<usize> {
        checked_len(&[self.height, self.width, self.padded_channels(align)?])
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(c={}, h={}, w={})", self.channels, self.height, self.width)
    }
}

/// Product of `dims`, failing instead of wrapping on overflow.
pub(crate) fn checked_len(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| RealignError::InvalidShape(format!("{dims:?} has more elements than fit in memory")))
}

pub(crate) fn validate_align(align: usize) -> Result<()> {
    if align == 0 {
        return Err(RealignError::InvalidShape("channel alignment must be positive".to_string()));
    }

    Ok(())
}

/// Parameters of one realign run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealignConfig {
    pub data_path: PathBuf,
    pub shape: Shape,
    pub output_path: PathBuf,
    #[serde(default = "default_group_dir")]
    pub group_dir: PathBuf,           // where the per-group files land
    #[serde(default = "default_align")]
    pub align: usize,
    #[serde(default = "default_group_prefix")]
    pub group_prefix: String,         // group n is written to {group_prefix}{n}.txt
}

fn default_group_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_align() -> usize {
    DEFAULT_ALIGN
}

fn default_group_prefix() -> String {
    "output_group_".to_string()
}

impl RealignConfig {
    pub fn new(
        data_path: impl Into<PathBuf>,
        shape: Shape,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            data_path: data_path.into(),
            shape,
            output_path: output_path.into(),
            ..Default::default()
        }
    }

    /// File a group with the given 1-based index is written to.
    pub fn group_path(&self, index: usize) -> PathBuf {
        self.group_dir.join(format!("{}{}.txt", self.group_prefix, index))
    }
}

impl Default for RealignConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.txt"),
            shape: Shape::new(256, 256, 256),
            output_path: PathBuf::from("data_channelast.txt"),
            group_dir: default_group_dir(),
            align: default_align(),
            group_prefix: default_group_prefix(),
        }
    }
}

impl fmt::Display for RealignConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RealignConfig {{ data: {}, shape: {}, output: {}, align: {} }}",
            self.data_path.display(),
            self.shape,
            self.output_path.display(),
            self.align,
        )
    }
}
