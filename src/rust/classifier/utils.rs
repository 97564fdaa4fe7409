use ndarray::{Array1, ArrayViewMut1};

/// Numerically stable softmax, applied in place.
pub(crate) fn softmax_in_place(mut row: ArrayViewMut1<f64>) {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    row.mapv_inplace(|x| (x - max).exp());
    let sum = row.sum();
    if sum > 0.0 {
        row /= sum;
    }
}

/// Index of the largest value; the first one wins on ties.
pub(crate) fn argmax(values: &Array1<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, current)) if v <= current => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
