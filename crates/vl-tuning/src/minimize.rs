//! Unconstrained minimizers over small parameter vectors.
//!
//! Objectives are plain closures returning `f64`; a NaN cost is treated as
//! `+inf` so a failed evaluation is simply a bad point.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::TuningError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OptimizationMethod {
    /// Downhill simplex, gradient free.
    #[default]
    #[serde(rename = "Nelder-Mead")]
    NelderMead,
    /// Quasi-Newton with a central-difference gradient.
    #[serde(rename = "BFGS")]
    Bfgs,
}

impl OptimizationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NelderMead => "Nelder-Mead",
            Self::Bfgs => "BFGS",
        }
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationMethod {
    type Err = TuningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nelder-mead" | "neldermead" | "nelder_mead" => Ok(Self::NelderMead),
            "bfgs" => Ok(Self::Bfgs),
            _ => Err(TuningError::UnknownMethod {
                name: s.to_string(),
            }),
        }
    }
}

/// Why a minimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationStatus {
    Converged,
    MaxIterations,
    MaxEvaluations,
    /// Backtracking found no decrease along the search direction.
    LineSearchFailed,
    /// The starting point has no finite cost.
    NonFiniteStart,
}

impl TerminationStatus {
    pub fn is_converged(self) -> bool {
        self == Self::Converged
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::MaxIterations => "maximum number of iterations reached",
            Self::MaxEvaluations => "maximum number of function evaluations reached",
            Self::LineSearchFailed => "line search failed",
            Self::NonFiniteStart => "non-finite cost at the starting point",
        };
        f.write_str(s)
    }
}

/// Minimizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerConfig {
    /// Iteration cap; `None` allows 200 per free variable.
    pub max_iterations: Option<usize>,
    /// Objective evaluation cap; `None` allows 200 per free variable.
    pub max_evaluations: Option<usize>,
    /// Simplex size at which Nelder-Mead stops.
    pub xatol: f64,
    /// Spread of simplex costs at which Nelder-Mead stops.
    pub fatol: f64,
    /// Gradient infinity-norm at which BFGS stops.
    pub gtol: f64,
    /// Relative step of the finite-difference gradient.
    pub gradient_step: f64,
    /// Armijo sufficient-decrease constant.
    pub armijo: f64,
    /// Backtracking factor.
    pub line_search_beta: f64,
    pub max_line_search_iters: usize,
}

impl Default for MinimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            max_evaluations: None,
            xatol: 1e-4,
            fatol: 1e-4,
            gtol: 1e-5,
            gradient_step: 1e-6,
            armijo: 1e-4,
            line_search_beta: 0.5,
            max_line_search_iters: 40,
        }
    }
}

impl MinimizerConfig {
    fn iteration_cap(&self, n: usize) -> usize {
        self.max_iterations.unwrap_or(200 * n.max(1))
    }

    fn evaluation_cap(&self, n: usize) -> usize {
        self.max_evaluations.unwrap_or(200 * n.max(1))
    }
}

/// Outcome of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: DVector<f64>,
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub status: TerminationStatus,
}

impl Minimum {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

/// Minimize `f` from `x0` with the given method.
pub fn minimize<F>(
    method: OptimizationMethod,
    f: F,
    x0: DVector<f64>,
    config: &MinimizerConfig,
) -> Minimum
where
    F: FnMut(&DVector<f64>) -> f64,
{
    match method {
        OptimizationMethod::NelderMead => nelder_mead(f, x0, config),
        OptimizationMethod::Bfgs => bfgs(f, x0, config),
    }
}

/// Counts evaluations and maps NaN to `+inf`.
struct Counted<F> {
    f: F,
    calls: usize,
}

impl<F: FnMut(&DVector<f64>) -> f64> Counted<F> {
    fn eval(&mut self, x: &DVector<f64>) -> f64 {
        self.calls += 1;
        let v = (self.f)(x);
        if v.is_nan() { f64::INFINITY } else { v }
    }
}

const NM_REFLECT: f64 = 1.0;
const NM_EXPAND: f64 = 2.0;
const NM_CONTRACT: f64 = 0.5;
const NM_SHRINK: f64 = 0.5;

/// Nelder-Mead simplex search.
///
/// The initial simplex perturbs each coordinate by 5 % (or 0.00025 when it is
/// zero). Stops when both the simplex extent and the cost spread are within
/// `xatol` / `fatol`.
pub fn nelder_mead<F>(f: F, x0: DVector<f64>, config: &MinimizerConfig) -> Minimum
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let n = x0.len();
    let max_iter = config.iteration_cap(n);
    let max_eval = config.evaluation_cap(n);
    let mut obj = Counted { f, calls: 0 };
    if n == 0 {
        let cost = obj.eval(&x0);
        return Minimum {
            x: x0,
            cost,
            iterations: 0,
            evaluations: 1,
            status: TerminationStatus::Converged,
        };
    }

    let mut simplex: Vec<DVector<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for k in 0..n {
        let mut v = x0.clone();
        v[k] = if v[k] != 0.0 { 1.05 * v[k] } else { 0.00025 };
        simplex.push(v);
    }
    let mut costs: Vec<f64> = simplex.iter().map(|v| obj.eval(v)).collect();
    sort_simplex(&mut simplex, &mut costs);

    let mut iterations = 0;
    let mut status = TerminationStatus::MaxIterations;

    while iterations < max_iter {
        if obj.calls >= max_eval {
            status = TerminationStatus::MaxEvaluations;
            break;
        }

        let best = &simplex[0];
        let x_spread = simplex[1..]
            .iter()
            .map(|v| (v - best).amax())
            .fold(0.0, f64::max);
        let f_spread = costs[1..]
            .iter()
            .map(|c| (c - costs[0]).abs())
            .fold(0.0, f64::max);
        if x_spread <= config.xatol && f_spread <= config.fatol {
            status = TerminationStatus::Converged;
            break;
        }

        let worst = simplex[n].clone();
        let f_worst = costs[n];
        let centroid = simplex[..n]
            .iter()
            .fold(DVector::zeros(n), |acc, v| acc + v)
            / n as f64;

        let xr = &centroid * (1.0 + NM_REFLECT) - &worst * NM_REFLECT;
        let fr = obj.eval(&xr);
        let mut shrink = false;

        if fr < costs[0] {
            let xe = &centroid * (1.0 + NM_REFLECT * NM_EXPAND) - &worst * (NM_REFLECT * NM_EXPAND);
            let fe = obj.eval(&xe);
            if fe < fr {
                simplex[n] = xe;
                costs[n] = fe;
            } else {
                simplex[n] = xr;
                costs[n] = fr;
            }
        } else if fr < costs[n - 1] {
            simplex[n] = xr;
            costs[n] = fr;
        } else if fr < f_worst {
            // outside contraction
            let xc = &centroid * (1.0 + NM_CONTRACT * NM_REFLECT)
                - &worst * (NM_CONTRACT * NM_REFLECT);
            let fc = obj.eval(&xc);
            if fc <= fr {
                simplex[n] = xc;
                costs[n] = fc;
            } else {
                shrink = true;
            }
        } else {
            // inside contraction
            let xcc = &centroid * (1.0 - NM_CONTRACT) + &worst * NM_CONTRACT;
            let fcc = obj.eval(&xcc);
            if fcc < f_worst {
                simplex[n] = xcc;
                costs[n] = fcc;
            } else {
                shrink = true;
            }
        }

        if shrink {
            let best = simplex[0].clone();
            for j in 1..=n {
                let shrunk = &best + (&simplex[j] - &best) * NM_SHRINK;
                costs[j] = obj.eval(&shrunk);
                simplex[j] = shrunk;
            }
        }

        iterations += 1;
        sort_simplex(&mut simplex, &mut costs);
    }

    Minimum {
        x: simplex[0].clone(),
        cost: costs[0],
        iterations,
        evaluations: obj.calls,
        status,
    }
}

fn sort_simplex(simplex: &mut Vec<DVector<f64>>, costs: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..costs.len()).collect();
    order.sort_by(|&a, &b| costs[a].total_cmp(&costs[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *costs = order.iter().map(|&i| costs[i]).collect();
}

/// Central-difference gradient with step `h * max(1, |x_j|)`.
fn central_gradient<F>(obj: &mut Counted<F>, x: &DVector<f64>, h: f64) -> DVector<f64>
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let mut g = DVector::zeros(x.len());
    for j in 0..x.len() {
        let dx = h * x[j].abs().max(1.0);
        let mut xp = x.clone();
        xp[j] += dx;
        let mut xm = x.clone();
        xm[j] -= dx;
        g[j] = (obj.eval(&xp) - obj.eval(&xm)) / (2.0 * dx);
    }
    g
}

/// BFGS with an inverse-Hessian update and Armijo backtracking.
pub fn bfgs<F>(f: F, x0: DVector<f64>, config: &MinimizerConfig) -> Minimum
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let n = x0.len();
    let max_iter = config.iteration_cap(n);
    let max_eval = config.evaluation_cap(n);
    let mut obj = Counted { f, calls: 0 };

    let mut x = x0;
    let mut fx = obj.eval(&x);
    if !fx.is_finite() {
        return Minimum {
            x,
            cost: fx,
            iterations: 0,
            evaluations: obj.calls,
            status: TerminationStatus::NonFiniteStart,
        };
    }
    let mut g = central_gradient(&mut obj, &x, config.gradient_step);
    let identity = DMatrix::<f64>::identity(n, n);
    let mut h_inv = identity.clone();

    let mut iterations = 0;
    let status = loop {
        if !g.iter().all(|v| v.is_finite()) {
            break TerminationStatus::LineSearchFailed;
        }
        if g.amax() <= config.gtol {
            break TerminationStatus::Converged;
        }
        if iterations >= max_iter {
            break TerminationStatus::MaxIterations;
        }
        if obj.calls >= max_eval {
            break TerminationStatus::MaxEvaluations;
        }

        let mut p = -(&h_inv * &g);
        let mut slope = p.dot(&g);
        if slope >= 0.0 {
            // not a descent direction; restart from steepest descent
            h_inv = identity.clone();
            p = -g.clone();
            slope = p.dot(&g);
        }

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let candidate = &x + &p * alpha;
            let fc = obj.eval(&candidate);
            if fc.is_finite() && fc <= fx + config.armijo * alpha * slope {
                accepted = Some((candidate, fc));
                break;
            }
            alpha *= config.line_search_beta;
        }
        let Some((x_new, f_new)) = accepted else {
            break TerminationStatus::LineSearchFailed;
        };

        let g_new = central_gradient(&mut obj, &x_new, config.gradient_step);
        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        if sy > 1e-12 {
            let rho = 1.0 / sy;
            let left = &identity - &s * y.transpose() * rho;
            let right = &identity - &y * s.transpose() * rho;
            h_inv = &left * &h_inv * &right + &s * s.transpose() * rho;
        }

        x = x_new;
        fx = f_new;
        g = g_new;
        iterations += 1;
    };

    Minimum {
        x,
        cost: fx,
        iterations,
        evaluations: obj.calls,
        status,
    }
}
