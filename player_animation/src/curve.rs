use rapier3d::prelude::Real;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("curve key {index} is not finite")]
    NonFiniteKey { index: usize },
}

/// Piecewise-linear response over `(time, value)` keys, clamped at both ends.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Vec<[Real; 2]>")]
pub struct ResponseCurve {
    keys: Vec<(Real, Real)>,
}

impl ResponseCurve {
    pub fn new(mut keys: Vec<(Real, Real)>) -> Result<Self, CurveError> {
        if let Some(index) = keys
            .iter()
            .position(|(time, value)| !time.is_finite() || !value.is_finite())
        {
            return Err(CurveError::NonFiniteKey { index });
        }
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { keys })
    }

    pub fn constant(value: Real) -> Self {
        Self {
            keys: vec![(0.0, value)],
        }
    }

    /// Identity ramp over `0..=1`.
    pub fn linear() -> Self {
        Self {
            keys: vec![(0.0, 0.0), (1.0, 1.0)],
        }
    }

    pub fn keys(&self) -> &[(Real, Real)] {
        &self.keys
    }

    pub fn evaluate(&self, time: Real) -> Real {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if time <= first.0 {
            return first.1;
        }
        if time >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if time <= t1 {
                let span = t1 - t0;
                if span <= Real::EPSILON {
                    return v1;
                }
                return v0 + (v1 - v0) * (time - t0) / span;
            }
        }
        last.1
    }
}

impl TryFrom<Vec<[Real; 2]>> for ResponseCurve {
    type Error = CurveError;

    fn try_from(keys: Vec<[Real; 2]>) -> Result<Self, Self::Error> {
        Self::new(keys.into_iter().map(|[time, value]| (time, value)).collect())
    }
}
