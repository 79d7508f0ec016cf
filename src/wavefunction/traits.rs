//! Wave function traits for VMC calculations.
//!
//! `TrialWfn` is the only capability every sampler needs. `AnalyticWfn` adds
//! the hand-written gradient and Laplacian used by the analytic local energy and
//! by importance sampling. Closures with the right signature implement
//! `TrialWfn` and `Potential` directly.

use crate::types::{Configuration, Position, VarParams};

/// Trial wavefunction ψ(R; params) of `N` particles in `D` dimensions.
pub trait TrialWfn<const D: usize> {
    /// Evaluate the wavefunction at positions `r`.
    fn evaluate(&self, r: &[Position<D>], params: &VarParams) -> f64;

    /// Central-difference gradient ∇ₙψ of a single particle `n`.
    fn numerical_particle_derivative(
        &self,
        r: &[Position<D>],
        params: &VarParams,
        n: usize,
        h: f64,
    ) -> Position<D> {
        let mut work = r.to_vec();
        let mut grad = Position::<D>::zeros();
        for axis in 0..D {
            let x = work[n][axis];
            work[n][axis] = x + h;
            let psi_fwd = self.evaluate(&work, params);
            work[n][axis] = x - h;
            let psi_bwd = self.evaluate(&work, params);
            work[n][axis] = x;
            grad[axis] = (psi_fwd - psi_bwd) / (2.0 * h);
        }
        grad
    }

    /// Numerical gradients using central difference, one vector per particle.
    fn numerical_derivative(
        &self,
        r: &[Position<D>],
        params: &VarParams,
        h: f64,
    ) -> Configuration<D> {
        (0..r.len())
            .map(|n| self.numerical_particle_derivative(r, params, n, h))
            .collect()
    }

    /// Numerical Laplacians using central difference, one value per particle.
    fn numerical_laplacian(&self, r: &[Position<D>], params: &VarParams, h: f64) -> Vec<f64> {
        let psi = self.evaluate(r, params);
        let mut laplacian = vec![0.0; r.len()];
        let mut work = r.to_vec();
        for i in 0..r.len() {
            for axis in 0..D {
                let x = work[i][axis];
                work[i][axis] = x + h;
                let psi_fwd = self.evaluate(&work, params);
                work[i][axis] = x - h;
                let psi_bwd = self.evaluate(&work, params);
                work[i][axis] = x;
                laplacian[i] += (psi_fwd - 2.0 * psi + psi_bwd) / (h * h);
            }
        }
        laplacian
    }
}

/// Trial wavefunction with analytically known derivatives.
pub trait AnalyticWfn<const D: usize>: TrialWfn<D> {
    /// Compute ∇ₙψ for every particle `n`.
    fn derivative(&self, r: &[Position<D>], params: &VarParams) -> Configuration<D>;

    /// Compute ∇ₙ²ψ for every particle `n`.
    fn laplacian(&self, r: &[Position<D>], params: &VarParams) -> Vec<f64>;
}

/// External potential energy V(R).
pub trait Potential<const D: usize> {
    fn potential(&self, r: &[Position<D>]) -> f64;
}

impl<const D: usize, F> TrialWfn<D> for F
where
    F: Fn(&[Position<D>], &VarParams) -> f64,
{
    fn evaluate(&self, r: &[Position<D>], params: &VarParams) -> f64 {
        self(r, params)
    }
}

impl<const D: usize, F> Potential<D> for F
where
    F: Fn(&[Position<D>]) -> f64,
{
    fn potential(&self, r: &[Position<D>]) -> f64 {
        self(r)
    }
}
