// channel-first (CHW, NCHW, LNCHW) <-> channel-aligned channel-last, for any of the three ranks
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use tracing::debug;

use crate::error::{RealignError, Result};
use crate::types::{checked_len, validate_align};

/// Position of the channel axis in a channel-first shape: CHW, NCHW or LNCHW.
///
/// The channel axis always sits right before the trailing (H, W) pair, so for a rank
/// `r` tensor it is `r - 3`.
pub fn channel_axis(ndim: usize) -> Result<usize> {
    match ndim {
        3..=5 => Ok(ndim - 3),
        _ => Err(RealignError::InvalidShape(format!(
            "expected a 3D, 4D or 5D channel-first tensor, got rank {ndim}"
        ))),
    }
}

/// Converts a channel-first tensor into the grouped channel-last layout.
///
/// The channel axis is zero-padded to a multiple of `align` and cut into groups of
/// `align` channels. The result has shape `(G, leading.., H, W, align)`: every value
/// of group 1, then group 2, and inside a group channels are innermost. For a 3D input
/// flattening the result gives exactly the merged file a realign run writes.
pub fn to_aligned(input: ArrayViewD<f64>, align: usize) -> Result<ArrayD<f64>> {
    let cax = channel_axis(input.ndim())?;

    let dims = input.shape();
    let aligned = aligned_dims(dims, align)?;
    let (groups, padded_channels) = (aligned[0], aligned[0] * align);

    let mut padded_dims = dims.to_vec();
    padded_dims[cax] = padded_channels;
    debug!(?dims, padded_channels, align, "aligning channel axis");

    let channels = dims[cax];
    let mut padded = ArrayD::<f64>::zeros(IxDyn(&padded_dims));
    padded
        .slice_axis_mut(Axis(cax), Slice::from(0..channels))
        .assign(&input);

    // (leading.., C', H, W) -> (leading.., G, align, H, W)
    let mut split_dims = dims[..cax].to_vec();
    split_dims.extend_from_slice(&[groups, align, dims[cax + 1], dims[cax + 2]]);
    let split = padded.into_shape_with_order(IxDyn(&split_dims))?;

    // -> (G, leading.., H, W, align)
    let mut axes = vec![cax];
    axes.extend(0..cax);
    axes.extend_from_slice(&[cax + 2, cax + 3, cax + 1]);

    Ok(split.permuted_axes(IxDyn(&axes)).as_standard_layout().into_owned())
}

/// Shape of the grouped layout for channel-first `dims`: `(G, leading.., H, W, align)`.
pub fn aligned_dims(dims: &[usize], align: usize) -> Result<Vec<usize>> {
    validate_align(align)?;
    let cax = channel_axis(dims.len())?;
    if dims.contains(&0) {
        return Err(RealignError::InvalidShape(format!("every dimension must be positive, got {dims:?}")));
    }

    let channels = dims[cax];
    let padded_channels = channels
        .checked_add((align - channels % align) % align)
        .ok_or_else(|| RealignError::InvalidShape(format!("{channels} channels overflow when padded")))?;

    let mut aligned = vec![padded_channels / align];
    aligned.extend_from_slice(&dims[..cax]);
    aligned.extend_from_slice(&[dims[cax + 1], dims[cax + 2], align]);
    checked_len(&aligned)?;

    Ok(aligned)
}

/// Inverse of [`to_aligned`]: drops the padding channels and returns the channel-first
/// tensor with `channels` channels.
pub fn from_aligned(aligned: ArrayViewD<f64>, channels: usize) -> Result<ArrayD<f64>> {
    let ndim = aligned.ndim();
    let cax = channel_axis(ndim.saturating_sub(1))?;

    let dims = aligned.shape().to_vec();
    let (groups, align) = (dims[0], dims[ndim - 1]);
    if align == 0 || channels == 0 || groups != channels.div_ceil(align) {
        return Err(RealignError::ShapeMismatch {
            expected: vec![channels.div_ceil(align.max(1)), align],
            actual: vec![groups, align],
        });
    }

    // (G, leading.., H, W, align) -> (leading.., G, align, H, W)
    let mut axes: Vec<usize> = (1..=cax).collect();
    axes.extend_from_slice(&[0, cax + 3, cax + 1, cax + 2]);
    let split = aligned.permuted_axes(IxDyn(&axes));

    let mut padded_dims = dims[1..=cax].to_vec();
    padded_dims.extend_from_slice(&[groups * align, dims[cax + 1], dims[cax + 2]]);
    let padded = split.as_standard_layout().into_owned().into_shape_with_order(IxDyn(&padded_dims))?;

    let restored = padded
        .slice_axis(Axis(cax), Slice::from(0..channels))
        .as_standard_layout()
        .into_owned();
    Ok(restored)
}

/// Flat channel-first values plus their dims, as read from a text file, into the
/// dynamic-rank array the layout and gather functions take.
pub fn array_from_values(values: Vec<f64>, dims: &[usize]) -> Result<ArrayD<f64>> {
    let expected = checked_len(dims)?;
    if values.len() != expected {
        return Err(RealignError::SizeMismatch {
            actual: values.len(),
            expected,
        });
    }

    Ok(ArrayD::from_shape_vec(IxDyn(dims), values)?)
}
