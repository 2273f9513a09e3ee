use special::Beta;

/// The inverse CDF of Student's t-distribution.
///
/// `p` is the cumulative probability, and `dof` (aka. "ν") is the degrees
/// of freedom (a parameter of the distribution).
pub fn inv_cdf(p: f64, dof: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&p));
    let x = 2. * p.min(1. - p);
    let a = 0.5 * dof;
    let b = 0.5;
    let y = x.inv_inc_beta(a, b, a.ln_beta(b));
    let y = (dof * (1. - y) / y).sqrt();
    if p > 0.5 {
        y
    } else {
        -y
    }
}

/// The two-sided critical value `t` such that `P(-t < T < t) = level` for
/// `T` Student-distributed with `dof` degrees of freedom.
///
/// No normal approximation is made for large `dof`.
pub fn critical_value(level: f64, dof: f64) -> f64 {
    // Convert `level`, which is two-sided, into `p`, which is one-sided
    let alpha = 1. - level;
    let p = 1. - (alpha / 2.);
    inv_cdf(p, dof)
}
