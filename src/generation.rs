// synthetic inputs: random tensors and random index arrays as flat text files
use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distr::Uniform;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RealignError, Result};
use crate::textio::{write_indices, write_values};
use crate::types::checked_len;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueDistribution {
    Uniform(f64, f64),   // [low, high)
    Normal(f64, f64),    // mean, std dev
}

impl Default for ValueDistribution {
    fn default() -> Self {
        ValueDistribution::Uniform(-1.0, 1.0)
    }
}

impl ValueDistribution {
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        match *self {
            ValueDistribution::Uniform(low, high) => {
                let uniform = Uniform::<f64>::new(low, high)
                    .map_err(|e| RealignError::InvalidDistribution(format!("{self:?}: {e}")))?;
                Ok((0..n).map(|_| uniform.sample(rng)).collect())
            }
            ValueDistribution::Normal(mean, std_dev) => {
                let normal = Normal::new(mean, std_dev)
                    .map_err(|e| RealignError::InvalidDistribution(format!("{self:?}: {e}")))?;
                Ok((0..n).map(|_| normal.sample(rng)).collect())
            }
        }
    }
}

/// One file of a fixture set.
#[derive(Clone, Debug, PartialEq)]
pub enum Fixture {
    Tensor { dims: Vec<usize> },
    Indices { name: String, count: usize, upper: usize },
}

impl Fixture {
    pub fn file_name(&self) -> String {
        match self {
            Fixture::Tensor { dims } => {
                let dims = dims.iter().map(|d| d.to_string()).collect::<Vec<_>>();
                format!("{}.txt", dims.join("_"))
            }
            Fixture::Indices { name, .. } => format!("{name}.txt"),
        }
    }
}

/// The 3D, 4D and 5D inputs plus the index arrays used to exercise gather kernels.
pub fn default_fixtures() -> Vec<Fixture> {
    vec![
        Fixture::Tensor { dims: vec![128, 128, 128] },
        Fixture::Indices { name: "indices_128_3d".to_string(), count: 128, upper: 128 },
        Fixture::Indices { name: "indices_72_3d".to_string(), count: 72, upper: 128 },
        Fixture::Tensor { dims: vec![128, 128, 128, 5] },
        Fixture::Indices { name: "indices_128_4d".to_string(), count: 128, upper: 128 },
        Fixture::Tensor { dims: vec![5, 128, 3, 128, 128] },
        Fixture::Indices { name: "indices_128_5d".to_string(), count: 128, upper: 128 },
    ]
}

/// Writes `dims.iter().product()` random values, one per line.
pub fn generate_tensor_file<R: Rng + ?Sized>(
    path: impl AsRef<Path>,
    dims: &[usize],
    distribution: &ValueDistribution,
    rng: &mut R,
) -> Result<usize> {
    let values = distribution.sample_n(checked_len(dims)?, rng)?;
    write_values(&path, &values)?;

    info!(?dims, path = %path.as_ref().display(), "tensor generated");
    Ok(values.len())
}

/// Writes `count` random indices drawn from `0..upper`, one per line.
pub fn generate_index_file<R: Rng + ?Sized>(
    path: impl AsRef<Path>,
    count: usize,
    upper: usize,
    rng: &mut R,
) -> Result<usize> {
    if upper == 0 {
        return Err(RealignError::InvalidShape("index upper bound must be positive".to_string()));
    }

    let indices: Vec<usize> = (0..count).map(|_| rng.random_range(0..upper)).collect();
    write_indices(&path, &indices)?;

    info!(count, upper, path = %path.as_ref().display(), "indices generated");
    Ok(count)
}

/// Generates every fixture into `dir`, creating it if needed. Returns the written paths in order.
pub fn generate_fixtures<R: Rng + ?Sized>(
    dir: impl AsRef<Path>,
    fixtures: &[Fixture],
    distribution: &ValueDistribution,
    rng: &mut R,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| RealignError::from_io(dir, e))?;

    let mut paths = Vec::with_capacity(fixtures.len());
    for fixture in fixtures {
        let path = dir.join(fixture.file_name());
        match fixture {
            Fixture::Tensor { dims } => {
                generate_tensor_file(&path, dims, distribution, rng)?;
            }
            Fixture::Indices { count, upper, .. } => {
                generate_index_file(&path, *count, *upper, rng)?;
            }
        }
        paths.push(path);
    }

    Ok(paths)
}
