use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn};
use tracing::debug;

use crate::error::{RealignError, Result};
use crate::layout::channel_axis;
use crate::types::checked_len;

// negative indices count from the end of the axis, like python
fn resolve_indices(indices: &[i64], axis: usize, len: usize) -> Result<Vec<usize>> {
    if indices.is_empty() {
        return Err(RealignError::InvalidShape("gather needs at least one index".to_string()));
    }

    indices
        .iter()
        .map(|&index| {
            let resolved = if index < 0 { index + len as i64 } else { index };
            if resolved < 0 || resolved as u64 >= len as u64 {
                return Err(RealignError::IndexOutOfRange { index, axis, len });
            }
            Ok(resolved as usize)
        })
        .collect()
}

/// Gathers slices of a channel-first tensor along `axis`.
///
/// Output axis `axis` has one entry per index, in index order, and every other axis
/// is unchanged. Works for any rank.
pub fn gather_chw(input: ArrayViewD<f64>, indices: &[i64], axis: usize) -> Result<ArrayD<f64>> {
    if axis >= input.ndim() {
        return Err(RealignError::InvalidShape(format!(
            "axis {axis} does not exist in a rank {} tensor",
            input.ndim()
        )));
    }

    let resolved = resolve_indices(indices, axis, input.len_of(Axis(axis)))?;
    Ok(input.select(Axis(axis), &resolved))
}

/// Gather on data already in the grouped channel-last layout `(G, leading.., H, W, align)`.
///
/// `channels` is the real channel count of the data (padding excluded) and `axis` is
/// numbered the channel-first way: for NCHW data axis 1 is C. The result is in the
/// same grouped layout, so gathering here and gathering the channel-first data then
/// aligning it give the same values. A channel gather re-pads the output to the next
/// multiple of `align`; any other axis keeps the groups and their padding as they are.
pub fn gather_hwc(
    aligned: ArrayViewD<f64>,
    channels: usize,
    indices: &[i64],
    axis: usize,
) -> Result<ArrayD<f64>> {
    let ndim = aligned.ndim();
    let cax = channel_axis(ndim.saturating_sub(1))?;
    let align = aligned.len_of(Axis(ndim - 1));
    let groups = aligned.len_of(Axis(0));

    if align == 0 || channels == 0 || groups != channels.div_ceil(align) {
        return Err(RealignError::ShapeMismatch {
            expected: vec![channels.div_ceil(align.max(1)), align],
            actual: vec![groups, align],
        });
    }
    if axis >= ndim - 1 {
        return Err(RealignError::InvalidShape(format!(
            "axis {axis} does not exist in a rank {} tensor",
            ndim - 1
        )));
    }

    if axis != cax {
        // leading axes shift by one behind the group axis, H and W keep their position
        let mapped = if axis < cax { axis + 1 } else { axis };
        let resolved = resolve_indices(indices, axis, aligned.len_of(Axis(mapped)))?;
        debug!(axis, mapped, count = resolved.len(), "gathering aligned data");
        return Ok(aligned.select(Axis(mapped), &resolved));
    }

    let resolved = resolve_indices(indices, axis, channels)?;
    let out_groups = resolved.len().div_ceil(align);

    let mut out_dims = aligned.shape().to_vec();
    out_dims[0] = out_groups;
    checked_len(&out_dims)?;
    debug!(channels = resolved.len(), out_groups, align, "gathering aligned channels");

    let mut output = ArrayD::<f64>::zeros(IxDyn(&out_dims));
    for (i, &c) in resolved.iter().enumerate() {
        let source = aligned
            .index_axis(Axis(0), c / align)
            .index_axis_move(Axis(ndim - 2), c % align);

        output
            .index_axis_mut(Axis(0), i / align)
            .index_axis_move(Axis(ndim - 2), i % align)
            .assign(&source);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{array_from_values, to_aligned};

    fn arange(dims: &[usize]) -> ArrayD<f64> {
        let n = dims.iter().product::<usize>();
        array_from_values((1..=n).map(|v| v as f64).collect(), dims).unwrap()
    }

    // gather on aligned data has to agree with gathering first and aligning after
    fn check_against_chw(dims: &[usize], indices: &[i64], axis: usize, align: usize) {
        let input = arange(dims);
        let cax = channel_axis(dims.len()).unwrap();

        let expected = to_aligned(gather_chw(input.view(), indices, axis).unwrap().view(), align).unwrap();
        let aligned = to_aligned(input.view(), align).unwrap();
        let actual = gather_hwc(aligned.view(), dims[cax], indices, axis).unwrap();

        assert_eq!(actual, expected, "dims {dims:?} axis {axis}");
    }

    #[test]
    fn test_gather_chw_axis0() {
        let input = arange(&[3, 1, 2]);
        let out = gather_chw(input.view(), &[2, 0, 2], 0).unwrap();

        assert_eq!(out.shape(), &[3, 1, 2]);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), vec![5.0, 6.0, 1.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_gather_chw_negative_index_wraps() {
        let input = arange(&[2, 2, 3]);
        let last = gather_chw(input.view(), &[-1], 2).unwrap();
        let explicit = gather_chw(input.view(), &[2], 2).unwrap();

        assert_eq!(last, explicit);
        assert_eq!(last.shape(), &[2, 2, 1]);
        assert_eq!(last.iter().copied().collect::<Vec<_>>(), vec![3.0, 6.0, 9.0, 12.0]);
    }

    #[test]
    fn test_gather_chw_out_of_range() {
        let input = arange(&[2, 2, 3]);

        assert!(matches!(
            gather_chw(input.view(), &[0, 3], 2).unwrap_err(),
            RealignError::IndexOutOfRange { index: 3, axis: 2, len: 3 }
        ));
        assert!(matches!(
            gather_chw(input.view(), &[-4], 2).unwrap_err(),
            RealignError::IndexOutOfRange { index: -4, .. }
        ));
        assert!(gather_chw(input.view(), &[0], 3).is_err());
        assert!(gather_chw(input.view(), &[], 0).is_err());
    }

    #[test]
    fn test_gather_hwc_matches_chw_3d() {
        for axis in 0..3 {
            check_against_chw(&[5, 3, 4], &[2, -1, 0, 2], axis, 4);
        }
        // more gathered channels than one group holds
        check_against_chw(&[3, 2, 2], &[0, 1, 2, 0, 1, 2, -3], 0, 2);
    }

    #[test]
    fn test_gather_hwc_matches_chw_4d() {
        for axis in 0..4 {
            check_against_chw(&[2, 6, 3, 2], &[1, -2, 0], axis, 4);
        }
    }

    #[test]
    fn test_gather_hwc_matches_chw_5d() {
        for axis in 0..5 {
            check_against_chw(&[2, 3, 5, 2, 3], &[1, 0, -1, 1], axis, 2);
        }
    }

    #[test]
    fn test_gather_hwc_keeps_padding_zero() {
        let aligned = to_aligned(arange(&[3, 2, 2]).view(), 4).unwrap();

        // spatial gather keeps the padding channel
        let rows = gather_hwc(aligned.view(), 3, &[1, 1], 1).unwrap();
        assert_eq!(rows.shape(), &[1, 2, 2, 4]);
        assert!(rows.index_axis(Axis(3), 3).iter().all(|&v| v == 0.0));

        // channel gather pads the new channel count
        let picked = gather_hwc(aligned.view(), 3, &[2, 0], 0).unwrap();
        assert_eq!(picked.shape(), &[1, 2, 2, 4]);
        assert_eq!(picked[[0, 0, 0, 0]], 9.0);
        assert_eq!(picked[[0, 0, 0, 1]], 1.0);
        assert!(picked.index_axis(Axis(3), 2).iter().all(|&v| v == 0.0));
        assert!(picked.index_axis(Axis(3), 3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_gather_hwc_rejects_padding_channel() {
        let aligned = to_aligned(arange(&[3, 2, 2]).view(), 4).unwrap();

        // channel 3 exists in memory but is padding
        assert!(matches!(
            gather_hwc(aligned.view(), 3, &[3], 0).unwrap_err(),
            RealignError::IndexOutOfRange { index: 3, axis: 0, len: 3 }
        ));
        assert!(gather_hwc(aligned.view(), 3, &[0], 3).is_err());
        assert!(gather_hwc(aligned.view(), 9, &[0], 0).is_err());
    }
}
