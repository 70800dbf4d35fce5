/// Mean over the non-NaN values, NaN if there are none.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|value| !value.is_nan())
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation over the non-NaN values, NaN if there are none.
pub fn nan_std(values: impl IntoIterator<Item = f64>) -> f64 {
    let kept = values
        .into_iter()
        .filter(|value| !value.is_nan())
        .collect::<Vec<_>>();
    let mean = nan_mean(kept.iter().copied());

    nan_mean(kept.iter().map(|value| (value - mean).powi(2))).sqrt()
}
