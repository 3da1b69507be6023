//! Floyd–Rivest selection over a [`RecordArray`].
//!
//! After `select(array, k, left, right, axis)` every record in
//! `[left, k)` has an `axis` coordinate `<=` the record at `k`, and every
//! record in `(k, right]` has a coordinate `>=` it. Records are only
//! partitioned, not sorted, and equal coordinates have no tie-break.
//!
//! For windows wider than [`SAMPLE_THRESHOLD`] the window is first narrowed
//! recursively around `k` using the Floyd–Rivest sampling bounds. The
//! arithmetic matches kdbush's `select`, so both produce the same
//! permutation record for record.

use crate::arena::RecordArray;

/// Window width above which the sampling step narrows the window first.
pub const SAMPLE_THRESHOLD: isize = 600;

/// Partition `array[left..=right]` around rank `k` on `axis`.
///
/// Requires `left <= k <= right < array.len()`.
pub fn select<A: RecordArray + ?Sized>(
    array: &mut A,
    k: usize,
    left: usize,
    right: usize,
    axis: usize,
) {
    debug_assert!(left <= k && k <= right && right < array.len());
    select_window(array, k as isize, left as isize, right as isize, axis);
}

fn select_window<A: RecordArray + ?Sized>(
    array: &mut A,
    k: isize,
    mut left: isize,
    mut right: isize,
    axis: usize,
) {
    let len = array.len() as isize;

    while right > left {
        if right - left > SAMPLE_THRESHOLD {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = n.ln();
            let s = 0.5 * (2.0 * z / 3.0).exp();
            let sign = if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 };
            let sd = 0.5 * (z * s * (n - s) / n).sqrt() * sign;
            let kf = k as f64;
            let new_left = left.max((kf - m * s / n + sd).floor() as isize);
            let new_right = right.min((kf + (n - m) * s / n + sd).floor() as isize);
            select_window(array, k, new_left, new_right, axis);
        }

        let t = coord(array, k, axis);
        let mut i = left;
        let mut j = right;

        swap(array, left, k);
        if coord(array, right, axis) > t {
            swap(array, left, right);
        }

        while i < j {
            swap(array, i, j);
            i += 1;
            j -= 1;
            while i < len && coord(array, i, axis) < t {
                i += 1;
            }
            while j >= 0 && coord(array, j, axis) > t {
                j -= 1;
            }
        }

        if coord(array, left, axis) == t {
            swap(array, left, j);
        } else {
            j += 1;
            swap(array, j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            right = j - 1;
        }
    }
}

#[inline]
fn coord<A: RecordArray + ?Sized>(array: &A, index: isize, axis: usize) -> f64 {
    array.coord(index as usize, axis)
}

#[inline]
fn swap<A: RecordArray + ?Sized>(array: &mut A, i: isize, j: isize) {
    array.swap(i as usize, j as usize);
}
