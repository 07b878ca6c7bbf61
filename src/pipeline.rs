use std::fs;
use std::path::Path;

use ndarray::Axis;
use tracing::{info, warn};

use crate::error::{RealignError, Result};
use crate::manifest::{merge, write_group, Manifest};
use crate::realign::{chw_from_values, pad_and_permute_aligned, restore, split_groups_aligned};
use crate::textio::{read_values, write_values};
use crate::types::{validate_align, RealignConfig, Shape};

/// Reads the flat channel-first input, writes one file per channel group and merges them.
///
/// Every check happens before the first file is created: a bad shape, a missing or
/// unparsable input, or a wrong element count leaves the filesystem untouched.
/// Returns the manifest the groups were merged from; it is also saved as
/// `manifest.json` in the group directory.
pub fn run(config: &RealignConfig) -> Result<Manifest> {
    let shape = config.shape;
    shape.validate()?;
    validate_align(config.align)?;
    shape.padded_element_count(config.align)?;

    info!(%config, "realign started");

    let values = read_values(&config.data_path)?;
    let expected = shape.element_count()?;
    if values.len() != expected {
        warn!(actual = values.len(), expected, "element count mismatch, nothing written");
        return Err(RealignError::SizeMismatch {
            actual: values.len(),
            expected,
        });
    }

    let tensor = chw_from_values(values, &shape)?;
    let padded = pad_and_permute_aligned(tensor, &shape, config.align)?;
    let groups = split_groups_aligned(&padded, config.align)?;
    info!(
        padded_channels = padded.len_of(Axis(2)),
        groups = groups.len(),
        "channels padded and grouped"
    );

    fs::create_dir_all(&config.group_dir)
        .map_err(|e| RealignError::from_io(&config.group_dir, e))?;

    let mut manifest = Manifest::new(shape, config.align);
    for group in &groups {
        manifest.push(write_group(group, config)?);
    }
    manifest.save(&config.group_dir)?;

    merge(&manifest, &config.output_path)?;

    Ok(manifest)
}

/// Turns a merged group-major file back into the original channel-first values.
/// Returns the number of values written to `output_path`.
pub fn restore_file(
    merged_path: impl AsRef<Path>,
    shape: &Shape,
    align: usize,
    output_path: impl AsRef<Path>,
) -> Result<usize> {
    let values = read_values(merged_path)?;
    let tensor = restore(values, shape, align)?;

    write_values(&output_path, tensor.iter())?;
    info!(%shape, path = %output_path.as_ref().display(), "channel-first data restored");

    Ok(tensor.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_align_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = RealignConfig {
            data_path: dir.path().join("data.txt"),
            shape: Shape::new(1, 1, 1),
            output_path: dir.path().join("out.txt"),
            group_dir: dir.path().join("groups"),
            align: 0,
            ..Default::default()
        };
        std::fs::write(&config.data_path, "1.0\n").unwrap();

        assert!(matches!(run(&config).unwrap_err(), RealignError::InvalidShape(_)));
        assert!(!config.group_dir.exists());
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_huge_shape_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = RealignConfig {
            group_dir: dir.path().join("groups"),
            ..RealignConfig::new(
                dir.path().join("data.txt"),
                Shape::new(1 << 32, 1 << 32, 1),
                dir.path().join("out.txt"),
            )
        };
        std::fs::write(&config.data_path, "").unwrap();

        assert!(matches!(run(&config).unwrap_err(), RealignError::InvalidShape(_)));
        assert!(!config.group_dir.exists());
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = RealignConfig::new(
            dir.path().join("missing.txt"),
            Shape::new(1, 1, 1),
            dir.path().join("out.txt"),
        );

        assert!(matches!(run(&config).unwrap_err(), RealignError::FileNotFound { .. }));
    }
}
