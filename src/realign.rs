use ndarray::{concatenate, s, Array3, Axis};
use tracing::debug;

use crate::error::{RealignError, Result};
use crate::types::{validate_align, Shape, DEFAULT_ALIGN};

/// One `align`-wide window of the padded channel-last tensor, shaped (H, W, align).
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub index: usize,   // 1-based, ascending in channel order
    pub tensor: Array3<f64>,
}

/// Builds the (C, H, W) tensor from a flat channel-first value sequence.
pub fn chw_from_values(values: Vec<f64>, shape: &Shape) -> Result<Array3<f64>> {
    let expected = shape.element_count()?;
    if values.len() != expected {
        return Err(RealignError::SizeMismatch {
            actual: values.len(),
            expected,
        });
    }

    Ok(Array3::from_shape_vec(shape.dims(), values)?)
}

/// Pads the channel axis of a (C, H, W) tensor up to a multiple of 64 and moves it last.
pub fn pad_and_permute(tensor: Array3<f64>, shape: &Shape) -> Result<Array3<f64>> {
    pad_and_permute_aligned(tensor, shape, DEFAULT_ALIGN)
}

/// Output shape is (H, W, C + padding) where the padding channels are zeros
/// appended after the original C.
pub fn pad_and_permute_aligned(
    tensor: Array3<f64>,
    shape: &Shape,
    align: usize,
) -> Result<Array3<f64>> {
    shape.validate()?;
    validate_align(align)?;

    if tensor.shape() != shape.dims() {
        return Err(RealignError::ShapeMismatch {
            expected: shape.dims().to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }

    let padding = shape.padding(align);
    shape.padded_element_count(align)?;
    debug!(channels = shape.channels, padding, align, "padding channel axis");

    let zeros = Array3::<f64>::zeros((padding, shape.height, shape.width));
    let padded = concatenate(Axis(0), &[tensor.view(), zeros.view()])?;

    Ok(padded.permuted_axes([1, 2, 0]).as_standard_layout().into_owned())
}

pub fn split_groups(padded: &Array3<f64>) -> Result<Vec<Group>> {
    split_groups_aligned(padded, DEFAULT_ALIGN)
}

/// Cuts the last axis into consecutive non-overlapping `align`-wide groups.
pub fn split_groups_aligned(padded: &Array3<f64>, align: usize) -> Result<Vec<Group>> {
    validate_align(align)?;

    let channels = padded.len_of(Axis(2));
    if channels == 0 || channels % align != 0 {
        return Err(RealignError::InvalidShape(format!(
            "expected an (h, w, c) tensor with c a positive multiple of {align}, got {:?}",
            padded.shape()
        )));
    }

    let groups = (0..channels / align)
        .map(|g| {
            let start = g * align;
            Group {
                index: g + 1,
                tensor: padded.slice(s![.., .., start..start + align]).to_owned(),
            }
        })
        .collect();

    Ok(groups)
}

/// Joins groups back into the padded channel-last tensor, in the order given.
pub fn assemble_groups(groups: &[Group]) -> Result<Array3<f64>> {
    if groups.is_empty() {
        return Err(RealignError::InvalidShape("no groups to assemble".to_string()));
    }

    let views: Vec<_> = groups.iter().map(|g| g.tensor.view()).collect();
    Ok(concatenate(Axis(2), &views)?)
}

/// Inverse of the whole conversion.
///
/// `values` is the merged group-major sequence (every value of group 1, then group 2, ...),
/// the result is the original (C, H, W) tensor with the padding channels dropped.
pub fn restore(values: Vec<f64>, shape: &Shape, align: usize) -> Result<Array3<f64>> {
    shape.validate()?;
    validate_align(align)?;

    let expected = shape.padded_element_count(align)?;
    if values.len() != expected {
        return Err(RealignError::SizeMismatch {
            actual: values.len(),
            expected,
        });
    }

    // group-major (G, H, W, align) -> (H, W, G * align) -> (C', H, W)
    let group_len = shape.height * shape.width * align;
    let groups = values
        .chunks_exact(group_len)
        .map(|chunk| Array3::from_shape_vec((shape.height, shape.width, align), chunk.to_vec()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let views: Vec<_> = groups.iter().map(|g| g.view()).collect();
    let padded = concatenate(Axis(2), &views)?;

    let chw = padded.permuted_axes([2, 0, 1]);
    let restored = chw
        .slice(s![..shape.channels, .., ..])
        .as_standard_layout()
        .into_owned();
    Ok(restored)
}
