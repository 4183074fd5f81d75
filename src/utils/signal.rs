//! 2-D correlation and convolution kernels
//!
//! `ndarray` has no sliding-window correlation, so the crate carries its own
//! valid cross-correlation and full convolution over 2-D views. These back
//! the convolutional layer's forward and backward passes.

use ndarray::{s, Array2, ArrayView2, Zip};

/// Valid 2-D cross-correlation of `input` with `kernel`.
///
/// The kernel slides only over positions where it fully overlaps the input,
/// so the output shrinks to `(ih - kh + 1, iw - kw + 1)`.
///
/// # Panics
///
/// Panics if the kernel is larger than the input in either dimension.
pub fn correlate2d_valid(input: ArrayView2<f64>, kernel: ArrayView2<f64>) -> Array2<f64> {
    let (ih, iw) = input.dim();
    let (kh, kw) = kernel.dim();
    assert!(
        kh <= ih && kw <= iw,
        "kernel {}x{} does not fit input {}x{}",
        kh,
        kw,
        ih,
        iw
    );

    let mut output = Array2::zeros((ih - kh + 1, iw - kw + 1));
    Zip::from(&mut output)
        .and(input.windows((kh, kw)))
        .for_each(|out, window| {
            *out = window.iter().zip(kernel.iter()).map(|(x, k)| x * k).sum();
        });
    output
}

/// Full 2-D convolution of `input` with `kernel`.
///
/// The output grows by `k - 1` per dimension. Implemented as valid
/// correlation of the zero-padded input with the 180°-rotated kernel.
pub fn convolve2d_full(input: ArrayView2<f64>, kernel: ArrayView2<f64>) -> Array2<f64> {
    let (ih, iw) = input.dim();
    let (kh, kw) = kernel.dim();

    let mut padded = Array2::zeros((ih + 2 * (kh - 1), iw + 2 * (kw - 1)));
    padded
        .slice_mut(s![kh - 1..kh - 1 + ih, kw - 1..kw - 1 + iw])
        .assign(&input);

    let rotated = kernel.slice(s![..;-1, ..;-1]);
    correlate2d_valid(padded.view(), rotated)
}
