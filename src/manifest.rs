use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RealignError, Result};
use crate::realign::Group;
use crate::textio::{read_values, write_values};
use crate::types::{RealignConfig, Shape};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Ordered list of group files, in the order they have to be merged back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub shape: Shape,
    pub align: usize,
    groups: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(shape: Shape, align: usize) -> Self {
        Self {
            shape,
            align,
            groups: Vec::new(),
        }
    }

    pub fn push(&mut self, path: PathBuf) {
        self.groups.push(path);
    }

    pub fn groups(&self) -> &[PathBuf] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Writes the manifest as `manifest.json` inside `dir` and returns its path.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        let file = File::create(&path).map_err(|e| RealignError::from_io(&path, e))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| {
            RealignError::Manifest {
                path: path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|e| RealignError::from_io(&path, e))?;

        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| RealignError::from_io(path, e))?;

        serde_json::from_str(&text).map_err(|source| RealignError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Writes one group, flattened (H, W, channel) row-major, to the file named after its index.
pub fn write_group(group: &Group, config: &RealignConfig) -> Result<PathBuf> {
    let path = config.group_path(group.index);
    write_values(&path, group.tensor.iter())?;

    info!(group = group.index, path = %path.display(), "group written");
    Ok(path)
}

/// Concatenates every group file in manifest order into `output_path`.
///
/// All files are read before anything is created, and the output is written to a
/// sibling temp file that is renamed into place, so a failed merge never leaves a
/// partial output behind. A group file that cannot be read for any reason is reported
/// as `FileNotFound`; a file that reads but holds a bad value is a `ParseError`.
/// Returns the number of values written.
pub fn merge(manifest: &Manifest, output_path: impl AsRef<Path>) -> Result<usize> {
    let output_path = output_path.as_ref();

    let mut merged = Vec::new();
    for path in manifest.groups() {
        let values = read_values(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "merge aborted");
            match e {
                RealignError::Io { path, .. } => RealignError::FileNotFound { path },
                other => other,
            }
        })?;
        debug!(path = %path.display(), values = values.len(), "group read");
        merged.extend(values);
    }

    let tmp_path = temp_path(output_path);
    if let Err(e) = write_values(&tmp_path, &merged) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    fs::rename(&tmp_path, output_path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        RealignError::from_io(output_path, e)
    })?;

    info!(groups = manifest.len(), values = merged.len(), path = %output_path.display(), "groups merged");
    Ok(merged.len())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn group(index: usize, values: Vec<f64>) -> Group {
        let len = values.len();
        Group {
            index,
            tensor: Array3::from_shape_vec((1, 1, len), values).unwrap(),
        }
    }

    fn config(dir: &Path) -> RealignConfig {
        RealignConfig {
            group_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_keeps_manifest_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let first = write_group(&group(1, vec![1.0, 2.0]), &config).unwrap();
        let second = write_group(&group(2, vec![3.0]), &config).unwrap();

        // replay in reverse to show the manifest decides, not the file names
        let mut manifest = Manifest::new(Shape::new(1, 1, 1), 2);
        manifest.push(second);
        manifest.push(first);

        let output = dir.path().join("merged.txt");
        assert_eq!(merge(&manifest, &output).unwrap(), 3);
        assert_eq!(read_values(&output).unwrap(), vec![3.0, 1.0, 2.0]);
        assert!(!temp_path(&output).exists());
    }

    #[test]
    fn test_merge_missing_group_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut manifest = Manifest::new(Shape::new(1, 1, 1), 1);
        manifest.push(write_group(&group(1, vec![1.0]), &config).unwrap());
        manifest.push(dir.path().join("output_group_2.txt"));

        let output = dir.path().join("merged.txt");
        let err = merge(&manifest, &output).unwrap_err();

        assert!(matches!(err, RealignError::FileNotFound { .. }));
        assert!(!output.exists());
        assert!(!temp_path(&output).exists());
    }

    #[test]
    fn test_merge_unreadable_group_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        // opens fine but every read fails
        let unreadable = dir.path().join("output_group_2.txt");
        fs::create_dir(&unreadable).unwrap();

        let mut manifest = Manifest::new(Shape::new(1, 1, 1), 1);
        manifest.push(write_group(&group(1, vec![1.0]), &config).unwrap());
        manifest.push(unreadable.clone());

        let output = dir.path().join("merged.txt");
        match merge(&manifest, &output).unwrap_err() {
            RealignError::FileNotFound { path } => assert_eq!(path, unreadable),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_merge_bad_value_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.txt");
        fs::write(&bad, "1.0\nnot-a-number\n").unwrap();

        let mut manifest = Manifest::new(Shape::new(1, 1, 1), 1);
        manifest.push(bad);

        let output = dir.path().join("merged.txt");
        assert!(matches!(
            merge(&manifest, &output).unwrap_err(),
            RealignError::ParseError { line: 2, .. }
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_manifest_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::new(Shape::new(65, 2, 3), 64);
        manifest.push(dir.path().join("output_group_1.txt"));
        manifest.push(dir.path().join("output_group_2.txt"));

        let path = manifest.save(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(MANIFEST_FILE));
        assert_eq!(Manifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn test_manifest_load_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Manifest::load(&path).unwrap_err(), RealignError::Manifest { .. }));
    }
}
