//! Linear time-invariant SISO models.
//!
//! Transfer functions are stored as polynomial coefficients in descending
//! powers of `s`, so `[1.0, 2.0, 3.0]` is `s^2 + 2s + 3`.

use std::fmt;
use std::ops::Mul;

use nalgebra::{DMatrix, DVector, RowDVector};
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Continuous-time transfer function `num(s) / den(s)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFunction {
    num: Vec<f64>,
    den: Vec<f64>,
}

impl TransferFunction {
    /// Create a transfer function from descending-power coefficients.
    ///
    /// Leading zeros are stripped. The denominator must be non-zero and the
    /// ratio proper (deg num <= deg den).
    pub fn new(num: impl Into<Vec<f64>>, den: impl Into<Vec<f64>>) -> ControlResult<Self> {
        let num = strip_leading_zeros(num.into());
        let den = strip_leading_zeros(den.into());

        if num.iter().chain(den.iter()).any(|c| !c.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "transfer function coefficients must be finite",
            });
        }
        if den.is_empty() {
            return Err(ControlError::InvalidArg {
                what: "transfer function denominator must be non-zero",
            });
        }
        let num = if num.is_empty() { vec![0.0] } else { num };
        if num.len() > den.len() {
            return Err(ControlError::Improper {
                num_degree: num.len() - 1,
                den_degree: den.len() - 1,
            });
        }
        Ok(Self { num, den })
    }

    /// Static gain `k`.
    pub fn gain(k: f64) -> ControlResult<Self> {
        Self::new(vec![k], vec![1.0])
    }

    pub fn num(&self) -> &[f64] {
        &self.num
    }

    pub fn den(&self) -> &[f64] {
        &self.den
    }

    /// Number of poles (denominator degree).
    pub fn order(&self) -> usize {
        self.den.len() - 1
    }

    /// Value at `s = 0`. Infinite for a pole at the origin.
    pub fn dc_gain(&self) -> f64 {
        let n0 = self.num.last().copied().unwrap_or(0.0);
        let d0 = self.den.last().copied().unwrap_or(0.0);
        n0 / d0
    }

    /// Series connection `self * other`.
    pub fn series(&self, other: &TransferFunction) -> ControlResult<TransferFunction> {
        TransferFunction::new(poly_mul(&self.num, &other.num), poly_mul(&self.den, &other.den))
    }

    /// Closed loop with unity negative feedback: `G / (1 + G)`.
    pub fn feedback_unity(&self) -> ControlResult<TransferFunction> {
        let den = poly_add(&self.den, &self.num);
        if den.iter().all(|c| *c == 0.0) {
            return Err(ControlError::Numeric {
                what: "closed-loop denominator vanished".to_string(),
            });
        }
        let closed = TransferFunction::new(self.num.clone(), den)?;
        if closed.order() < self.order() {
            // den + num lost its leading term; the loop is algebraically singular
            return Err(ControlError::Numeric {
                what: "closed-loop denominator lost its leading coefficient".to_string(),
            });
        }
        Ok(closed)
    }

    /// Controllable canonical state-space realisation.
    pub fn to_state_space(&self) -> StateSpace {
        let n = self.order();
        let lead = self.den[0];
        let a_coef: Vec<f64> = self.den.iter().map(|c| c / lead).collect();

        // numerator padded to n+1 coefficients
        let mut b_coef = vec![0.0; n + 1 - self.num.len()];
        b_coef.extend(self.num.iter().map(|c| c / lead));

        let d = b_coef[0];
        let mut a = DMatrix::zeros(n, n);
        let mut b = DVector::zeros(n);
        let mut c = RowDVector::zeros(n);

        if n > 0 {
            for j in 0..n {
                a[(0, j)] = -a_coef[j + 1];
                c[j] = b_coef[j + 1] - d * a_coef[j + 1];
            }
            for i in 1..n {
                a[(i, i - 1)] = 1.0;
            }
            b[0] = 1.0;
        }

        StateSpace { a, b, c, d }
    }
}

impl Mul for &TransferFunction {
    type Output = ControlResult<TransferFunction>;

    fn mul(self, rhs: &TransferFunction) -> Self::Output {
        self.series(rhs)
    }
}

impl fmt::Display for TransferFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) / ({})", format_poly(&self.num), format_poly(&self.den))
    }
}

/// SISO state-space model `x' = A x + B u`, `y = C x + D u`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpace {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub c: RowDVector<f64>,
    pub d: f64,
}

impl StateSpace {
    /// Number of states.
    pub fn order(&self) -> usize {
        self.a.nrows()
    }

    /// Output for a given state and input.
    pub fn output(&self, x: &DVector<f64>, u: f64) -> f64 {
        if self.order() == 0 {
            return self.d * u;
        }
        (&self.c * x)[0] + self.d * u
    }

    /// Real parts of the poles (eigenvalues of `A`).
    pub fn pole_real_parts(&self) -> Vec<f64> {
        if self.order() == 0 {
            return Vec::new();
        }
        self.a.complex_eigenvalues().iter().map(|p| p.re).collect()
    }

    /// Largest pole magnitude.
    pub fn spectral_radius(&self) -> f64 {
        if self.order() == 0 {
            return 0.0;
        }
        self.a
            .complex_eigenvalues()
            .iter()
            .map(|p| p.norm())
            .fold(0.0, f64::max)
    }
}

fn strip_leading_zeros(mut coefs: Vec<f64>) -> Vec<f64> {
    let first = coefs.iter().position(|c| *c != 0.0).unwrap_or(coefs.len());
    coefs.drain(..first);
    coefs
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, ai) in a.iter().enumerate() {
        for (j, bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// Sum of two polynomials aligned at the constant term.
fn poly_add(a: &[f64], b: &[f64]) -> Vec<f64> {
    let n = a.len().max(b.len());
    let mut out = vec![0.0; n];
    for (i, v) in a.iter().enumerate() {
        out[n - a.len() + i] += v;
    }
    for (i, v) in b.iter().enumerate() {
        out[n - b.len() + i] += v;
    }
    out
}

fn format_poly(coefs: &[f64]) -> String {
    let n = coefs.len();
    let terms: Vec<String> = coefs
        .iter()
        .enumerate()
        .filter(|(_, c)| **c != 0.0)
        .map(|(i, c)| match n - 1 - i {
            0 => format!("{c}"),
            1 => format!("{c} s"),
            p => format!("{c} s^{p}"),
        })
        .collect();
    if terms.is_empty() {
        "0".to_string()
    } else {
        terms.join(" + ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_zeros() {
        let tf = TransferFunction::new(vec![0.0, 0.0, 2.0], vec![0.0, 1.0, 3.0]).unwrap();
        assert_eq!(tf.num(), &[2.0]);
        assert_eq!(tf.den(), &[1.0, 3.0]);
        assert_eq!(tf.order(), 1);
    }

    #[test]
    fn rejects_improper_and_zero_denominator() {
        assert!(matches!(
            TransferFunction::new(vec![1.0, 0.0, 0.0], vec![1.0, 1.0]),
            Err(ControlError::Improper { .. })
        ));
        assert!(TransferFunction::new(vec![1.0], vec![0.0, 0.0]).is_err());
        assert!(TransferFunction::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn series_multiplies_polynomials() {
        let g1 = TransferFunction::new(vec![1.0], vec![1.0, 1.0]).unwrap();
        let g2 = TransferFunction::new(vec![2.0], vec![4.0, 1.0]).unwrap();
        let g = (&g1 * &g2).unwrap();
        assert_eq!(g.num(), &[2.0]);
        assert_eq!(g.den(), &[4.0, 5.0, 1.0]);
        assert_eq!(g.dc_gain(), 2.0);
    }

    #[test]
    fn unity_feedback() {
        // K/(s+1) closed loop -> K/(s+1+K)
        let g = TransferFunction::new(vec![3.0], vec![1.0, 1.0]).unwrap();
        let cl = g.feedback_unity().unwrap();
        assert_eq!(cl.num(), &[3.0]);
        assert_eq!(cl.den(), &[1.0, 4.0]);
        assert!((cl.dc_gain() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn singular_feedback_is_an_error() {
        // (-s) / (s + 1): den + num = 1, loses the leading term
        let g = TransferFunction::new(vec![-1.0, 0.0], vec![1.0, 1.0]).unwrap();
        assert!(g.feedback_unity().is_err());
    }

    #[test]
    fn canonical_realisation_matches_dc_gain() {
        let tf = TransferFunction::new(vec![2.0, 3.0], vec![1.0, 5.0, 6.0]).unwrap();
        let ss = tf.to_state_space();
        assert_eq!(ss.order(), 2);
        assert_eq!(ss.d, 0.0);
        // steady state: x = -A^-1 B, y = C x
        let x = -ss.a.clone().try_inverse().unwrap() * &ss.b;
        let y = ss.output(&x, 1.0);
        assert!((y - tf.dc_gain()).abs() < 1e-12);
    }

    #[test]
    fn biproper_realisation_has_feedthrough() {
        // (2s^2 + 1) / (s^2 + s + 1)
        let tf = TransferFunction::new(vec![2.0, 0.0, 1.0], vec![1.0, 1.0, 1.0]).unwrap();
        let ss = tf.to_state_space();
        assert_eq!(ss.d, 2.0);
        assert_eq!(ss.c[0], -2.0);
        assert_eq!(ss.c[1], -1.0);
    }

    #[test]
    fn static_gain_has_no_states() {
        let ss = TransferFunction::gain(4.0).unwrap().to_state_space();
        assert_eq!(ss.order(), 0);
        assert_eq!(ss.output(&DVector::zeros(0), 2.0), 8.0);
        assert!(ss.pole_real_parts().is_empty());
    }

    #[test]
    fn poles_of_first_order_lag() {
        let ss = TransferFunction::new(vec![1.0], vec![2.0, 1.0])
            .unwrap()
            .to_state_space();
        let poles = ss.pole_real_parts();
        assert_eq!(poles.len(), 1);
        assert!((poles[0] + 0.5).abs() < 1e-12);
    }
}
