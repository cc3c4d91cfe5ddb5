//! Quantities of interest over recorded trajectories.
//!
//! A trajectory is a time-ordered slice of frames; each frame holds one
//! vector per microbe, always in the same order. All reducers are pure.

use ndarray::{Array2, Axis};

/// One vector (position or velocity) per microbe, stored as rows.
pub type Frame = Array2<f64>;

/// Mean-squared displacement from the first frame.
///
/// Element `t` is the average over microbes of `|x(t) - x(0)|^2`.
pub fn msd(frames: &[Frame]) -> Vec<f64> {
    let Some(origin) = frames.first() else {
        return Vec::new();
    };
    frames
        .iter()
        .map(|frame| mean_dist_2(origin, frame))
        .collect()
}

/// Time-averaged mean-squared displacement.
///
/// Element `lag` is the average over microbes and over every valid start
/// frame `t` of `|x(t + lag) - x(t)|^2`, for `lag` up to `max_lag` or the
/// trajectory length, whichever is smaller.
pub fn windowed_msd(frames: &[Frame], max_lag: usize) -> Vec<f64> {
    let n_lags = frames.len().min(max_lag + 1);
    (0..n_lags)
        .map(|lag| {
            let n_starts = frames.len() - lag;
            frames
                .iter()
                .zip(&frames[lag..])
                .map(|(start, end)| mean_dist_2(start, end))
                .sum::<f64>()
                / n_starts as f64
        })
        .collect()
}

/// Normalized velocity autocorrelation.
///
/// Element `lag` is the average over microbes and valid start frames of
/// `v(t) · v(t + lag) / |v(t)|^2`. Pairs whose initial velocity vanishes are
/// skipped; a lag with no valid pair yields NaN.
pub fn autocorrelation(frames: &[Frame], max_lag: usize) -> Vec<f64> {
    let n_lags = frames.len().min(max_lag + 1);
    (0..n_lags)
        .map(|lag| {
            let mut sum = 0.0;
            let mut count = 0usize;
            for (start, end) in frames.iter().zip(&frames[lag..]) {
                for (v0, v1) in start.outer_iter().zip(end.outer_iter()) {
                    let norm_2 = v0.dot(&v0);
                    if norm_2 > 0.0 {
                        sum += v0.dot(&v1) / norm_2;
                        count += 1;
                    }
                }
            }
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Undo periodic wrapping of positions in a box of side `extent`.
///
/// Displacements between consecutive frames are assumed to be shorter than
/// half the box, so any larger jump is attributed to a boundary crossing.
pub fn unfold(frames: &[Frame], extent: f64) -> Vec<Frame> {
    let mut unfolded: Vec<Frame> = Vec::with_capacity(frames.len());
    let Some(first) = frames.first() else {
        return unfolded;
    };
    unfolded.push(first.clone());
    for (prev, curr) in frames.iter().zip(&frames[1..]) {
        let mut delta = curr - prev;
        delta.mapv_inplace(|d| d - extent * (d / extent).round());
        let next = &unfolded[unfolded.len() - 1] + &delta;
        unfolded.push(next);
    }
    unfolded
}

fn mean_dist_2(start: &Frame, end: &Frame) -> f64 {
    let n_rows = start.len_of(Axis(0));
    if n_rows == 0 {
        return f64::NAN;
    }
    let diff = end - start;
    diff.iter().map(|d| d * d).sum::<f64>() / n_rows as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn column(vals: &[f64]) -> Vec<Frame> {
        vals.iter().map(|&x| array![[x]]).collect()
    }

    fn ballistic(n_frames: usize) -> Vec<Frame> {
        (0..n_frames)
            .map(|t| array![[t as f64, 0.0], [0.0, -2.0 * t as f64]])
            .collect()
    }

    #[test]
    fn msd_of_ballistic_motion_grows_quadratically() {
        let frames = ballistic(5);
        // Average of t^2 and 4 t^2.
        assert_eq!(msd(&frames), vec![0.0, 2.5, 10.0, 22.5, 40.0]);
        assert_eq!(windowed_msd(&frames, 3), vec![0.0, 2.5, 10.0, 22.5]);
    }

    #[test]
    fn windowed_msd_averages_over_start_times() {
        let frames = column(&[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(msd(&frames), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(windowed_msd(&frames, 10), vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn autocorrelation_detects_reversals() {
        let frames: Vec<Frame> = [1.0, -1.0, 1.0, -1.0]
            .iter()
            .map(|&v| array![[2.0 * v], [0.0]])
            .collect();
        assert_eq!(autocorrelation(&frames, 2), vec![1.0, -1.0, 1.0]);
    }

    #[test]
    fn autocorrelation_of_constant_velocity_is_one() {
        let frames: Vec<Frame> = (0..10).map(|_| array![[0.3, 0.4, 0.0]]).collect();
        let acf = autocorrelation(&frames, 5);
        assert_eq!(acf.len(), 6);
        assert!(acf.iter().all(|&c| (c - 1.0).abs() < 1e-12));
    }

    #[test]
    fn unfold_removes_boundary_jumps() {
        let frames = column(&[8.0, 9.5, 1.0, 2.5, 0.5, 9.0]);
        let unfolded = unfold(&frames, 10.0);
        let xs: Vec<f64> = unfolded.iter().map(|frame| frame[[0, 0]]).collect();
        assert_eq!(xs, vec![8.0, 9.5, 11.0, 12.5, 10.5, 9.0]);
    }

    #[test]
    fn empty_trajectories_give_empty_results() {
        assert!(msd(&[]).is_empty());
        assert!(windowed_msd(&[], 4).is_empty());
        assert!(autocorrelation(&[], 4).is_empty());
        assert!(unfold(&[], 1.0).is_empty());
    }
}
