use rand::Rng;

/// The distributions inter-arrival and service times are drawn from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Variate {
    Exponential { mean: f64 },
    /// The sum of `k` exponential phases
    Erlang { mean: f64, k: u32 },
    /// Two exponential phases with balanced means, picked at random
    HyperExponential { mean: f64, cvar: f64 },
}

impl Variate {
    /// A distribution with the given mean whose coefficient of variation
    /// is roughly `cvar`: Erlang-4 (cvar 0.5) below 0.95, exponential
    /// (cvar 1) below 1.95, hyperexponential above.
    pub fn for_cvar(mean: f64, cvar: f64) -> Variate {
        if cvar < 0.95 {
            Variate::Erlang { mean, k: 4 }
        } else if cvar < 1.95 {
            Variate::Exponential { mean }
        } else {
            Variate::HyperExponential { mean, cvar }
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Variate::Exponential { mean } => mean,
            Variate::Erlang { mean, .. } => mean,
            Variate::HyperExponential { mean, .. } => mean,
        }
    }

    pub fn cvar(&self) -> f64 {
        match *self {
            Variate::Exponential { .. } => 1.,
            Variate::Erlang { k, .. } => 1. / f64::from(k).sqrt(),
            Variate::HyperExponential { cvar, .. } => cvar,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Variate::Exponential { mean } => exponential(rng, mean),
            Variate::Erlang { mean, k } => {
                let phase = mean / f64::from(k);
                (0..k).map(|_| exponential(rng, phase)).sum()
            }
            Variate::HyperExponential { mean, cvar } => {
                let c2 = cvar * cvar;
                let p = 0.5 * (1. + ((c2 - 1.) / (c2 + 1.)).sqrt());
                if rng.gen::<f64>() < p {
                    exponential(rng, mean / (2. * p))
                } else {
                    exponential(rng, mean / (2. * (1. - p)))
                }
            }
        }
    }
}

/// By inversion
fn exponential<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    // gen() is in [0, 1), so the log's argument is never zero
    let u: f64 = rng.gen();
    -mean * (1. - u).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;
    use rand::SeedableRng;
    use simstats::SampleCounter;

    fn moments(v: Variate) -> SampleCounter {
        let mut rng = rand::rngs::StdRng::seed_from_u64(9);
        let mut counter = SampleCounter::new("variate");
        for _ in 0..200_000 {
            counter.count(v.sample(&mut rng));
        }
        counter
    }

    #[test]
    fn selection() {
        assert_eq!(Variate::for_cvar(2., 0.5), Variate::Erlang { mean: 2., k: 4 });
        assert_eq!(Variate::for_cvar(2., 1.), Variate::Exponential { mean: 2. });
        assert_eq!(
            Variate::for_cvar(2., 2.),
            Variate::HyperExponential { mean: 2., cvar: 2. }
        );
    }

    #[test]
    fn sample_moments() {
        for v in [
            Variate::Exponential { mean: 1.25 },
            Variate::Erlang { mean: 1.25, k: 4 },
            Variate::HyperExponential { mean: 1.25, cvar: 2. },
        ] {
            let m = moments(v);
            assert_relative_eq!(m.mean(), v.mean(), max_relative = 0.02);
            let cvar = m.variance().sqrt() / m.mean();
            assert_relative_eq!(cvar, v.cvar(), max_relative = 0.05);
            assert!(m.min().unwrap() >= 0.);
        }
    }
}
