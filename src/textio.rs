// plain text tensors: one number per line, no header
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use crate::error::{RealignError, Result};

/// Reads one float per line. Blank lines are skipped, anything else has to parse.
pub fn read_values(path: impl AsRef<Path>) -> Result<Vec<f64>> {
    read_lines(path.as_ref())
}

/// Reads one signed index per line, the format gather index files use.
pub fn read_indices(path: impl AsRef<Path>) -> Result<Vec<i64>> {
    read_lines(path.as_ref())
}

fn read_lines<T: FromStr>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| RealignError::from_io(path, e))?;

    let mut values = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| RealignError::from_io(path, e))?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }

        let value = token.parse::<T>().map_err(|_| RealignError::ParseError {
            path: path.to_path_buf(),
            line: i + 1,
            value: token.to_string(),
        })?;
        values.push(value);
    }

    Ok(values)
}

/// Writes `values` one per line with six decimal places, replacing the file if it exists.
pub fn write_values<'a>(
    path: impl AsRef<Path>,
    values: impl IntoIterator<Item = &'a f64>,
) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| RealignError::from_io(path, e))?;

    let mut writer = BufWriter::new(file);
    for value in values {
        writeln!(writer, "{value:.6}").map_err(|e| RealignError::from_io(path, e))?;
    }
    writer.flush().map_err(|e| RealignError::from_io(path, e))
}

pub fn write_indices(path: impl AsRef<Path>, indices: &[usize]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| RealignError::from_io(path, e))?;

    let mut writer = BufWriter::new(file);
    for index in indices {
        writeln!(writer, "{index}").map_err(|e| RealignError::from_io(path, e))?;
    }
    writer.flush().map_err(|e| RealignError::from_io(path, e))
}
