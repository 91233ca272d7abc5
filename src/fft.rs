//! Shared FFT helpers: a cached `rustfft` planner, the standard bin-to-
//! frequency table, and the find-peaks contract used by every spectrum-based
//! stage (C6, C7, C8).
//!
//! The bin table mirrors `sample_rate * numpy.fft.fftfreq(n)`: positive
//! frequencies for bins `0..=n/2`, negative (mirror) frequencies beyond that.
//! Downstream stages only ever look at the positive half.

use rustfft::{num_complex::Complex32, FftPlanner};

/// Computes the complex FFT of `signal`, zero-padded or truncated to
/// `fft_size` bins.
pub fn complex_spectrum(planner: &mut FftPlanner<f32>, signal: &[f32], fft_size: usize) -> Vec<Complex32> {
    let fft = planner.plan_fft_forward(fft_size);

    let mut buffer: Vec<Complex32> = signal.iter().take(fft_size).map(|&s| Complex32::new(s, 0.0)).collect();
    buffer.resize(fft_size, Complex32::new(0.0, 0.0));

    fft.process(&mut buffer);

    buffer
}

/// Computes the magnitude spectrum of `signal`, zero-padded or truncated to
/// `fft_size` bins.
pub fn magnitude_spectrum(planner: &mut FftPlanner<f32>, signal: &[f32], fft_size: usize) -> Vec<f32> {
    complex_spectrum(planner, signal, fft_size).into_iter().map(|c| c.norm()).collect()
}

/// Maps FFT bin index `i` (of an `n`-point transform at `sample_rate`) to its
/// frequency in Hz, following the standard centered bin convention (positive
/// frequencies for `i <= n/2`, mirrored negative frequencies afterwards).
pub fn bin_to_freq(i: usize, n: usize, sample_rate: u32) -> f32 {
    let sample_rate = sample_rate as f32;
    let n_f = n as f32;
    if i <= n / 2 {
        i as f32 * sample_rate / n_f
    } else {
        (i as f32 - n_f) * sample_rate / n_f
    }
}

/// Builds the full bin-to-frequency table for an `n`-point transform.
pub fn bin_to_freq_table(n: usize, sample_rate: u32) -> Vec<f32> {
    (0..n).map(|i| bin_to_freq(i, n, sample_rate)).collect()
}

/// Find-peaks contract (spec §9): index `i` is a peak iff `x[i] > x[i-1]`,
/// `x[i] > x[i+1]`, and `x[i] >= threshold`. Plateaus (runs of equal values)
/// are treated as a single peak reported at their leftmost rising edge.
pub fn find_peaks(x: &[f32], threshold: f32) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < x.len() - 1 {
        if x[i] > x[i - 1] {
            // Find the extent of the plateau starting at i.
            let mut j = i;
            while j + 1 < x.len() && x[j + 1] == x[i] {
                j += 1;
            }
            // A genuine local max plateau falls back down on the right.
            if j < x.len() - 1 && x[j + 1] < x[i] && x[i] >= threshold {
                peaks.push(i);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }

    peaks
}
