use nalgebra::{Matrix3, Vector3};

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    points.iter().sum::<Vector3<f64>>() / points.len() as f64
}

/// RMSD of two point sets after optimal superposition (Kabsch algorithm).
///
/// `mobile[i]` is paired with `reference[i]`; both sets must be the same length.
pub fn superposed_rmsd(reference: &[Vector3<f64>], mobile: &[Vector3<f64>]) -> f64 {
    assert_eq!(
        reference.len(),
        mobile.len(),
        "point sets must have same length"
    );
    if reference.is_empty() {
        return 0.0;
    }

    let centroid_ref = centroid(reference);
    let centroid_mob = centroid(mobile);

    // correlation matrix H = sum(m_i r_i^T) of the centered sets
    let mut h = Matrix3::zeros();
    for (r, m) in reference.iter().zip(mobile) {
        h += (m - centroid_mob) * (r - centroid_ref).transpose();
    }

    let svd = h.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        log::debug!("SVD of correlation matrix failed, falling back to centered RMSD");
        return centered_rmsd(reference, mobile, centroid_ref, centroid_mob);
    };

    // flip the smallest axis if the optimal orthogonal transform is a reflection
    let d = (v_t.transpose() * u.transpose()).determinant().signum();
    let reflection = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    let rotation = v_t.transpose() * reflection * u.transpose();

    let sum_sq = reference
        .iter()
        .zip(mobile)
        .map(|(r, m)| (rotation * (m - centroid_mob) - (r - centroid_ref)).norm_squared())
        .sum::<f64>();

    (sum_sq / reference.len() as f64).sqrt()
}

/// RMSD with centroids aligned but no rotation.
fn centered_rmsd(
    reference: &[Vector3<f64>],
    mobile: &[Vector3<f64>],
    centroid_ref: Vector3<f64>,
    centroid_mob: Vector3<f64>,
) -> f64 {
    let sum_sq = reference
        .iter()
        .zip(mobile)
        .map(|(r, m)| ((m - centroid_mob) - (r - centroid_ref)).norm_squared())
        .sum::<f64>();
    (sum_sq / reference.len() as f64).sqrt()
}

/// RMSD of two point sets in place, without any fitting.
pub fn in_place_rmsd(reference: &[Vector3<f64>], mobile: &[Vector3<f64>]) -> f64 {
    assert_eq!(
        reference.len(),
        mobile.len(),
        "point sets must have same length"
    );
    if reference.is_empty() {
        return 0.0;
    }

    let sum_sq = reference
        .iter()
        .zip(mobile)
        .map(|(r, m)| (m - r).norm_squared())
        .sum::<f64>();
    (sum_sq / reference.len() as f64).sqrt()
}
