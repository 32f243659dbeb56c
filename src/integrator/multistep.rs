//! Multistep predictor-corrector (Gauss-Jackson family)
//!
//! Second-order Störmer-Cowell style integration of r'' = f(t, r, v) using
//! backward differences of the acceleration history:
//!
//! ```text
//! predictor:  v* = vₙ + h Σ γⱼ ∇ʲfₙ        r* = rₙ + h vₙ + h² Σ ρⱼ ∇ʲfₙ
//! corrector:  v  = vₙ + h Σ γ*ⱼ ∇ʲfₙ₊₁    r  = rₙ + h vₙ + h² Σ ρ*ⱼ ∇ʲfₙ₊₁
//! ```
//!
//! The velocity sums are Adams-Bashforth / Adams-Moulton; the position sums
//! are their Nyström counterparts. All four coefficient sets come from
//! integrating the Newton backward-difference basis over one step, so the
//! order is a single constant.
//!
//! # Lifecycle
//!
//! 1. **Startup**: until the difference table holds `ORDER` entries, each
//!    advance is an RK4 step (split into substeps) and the new acceleration
//!    is pushed into the table.
//! 2. **Steady state**: predict, evaluate in predictor mode, then correct and
//!    re-evaluate in corrector mode until the relative state change drops
//!    below the tolerance.
//! 3. **Failure**: if the corrector pass budget runs out, the step is
//!    discarded, `NonConvergence` is returned, and every later advance
//!    returns `Invalidated` until `restart` is called.
//!
//! With a step tolerance set, the first-pass predictor/corrector gap is the
//! local error estimate. The step halves when the estimate exceeds the
//! tolerance and doubles after `ORDER` consecutive quiet steps; either change
//! throws away the table and re-enters startup.

use nalgebra::Vector3;
use satkit::{Duration, Instant};
use serde::Serialize;

use super::rk4::{classical_step, evaluate};
use super::Integrator;
use crate::equations::EquationsOfMotion;
use crate::error::{PropagationError, Result};
use crate::settings::GaussJacksonConfig;
use crate::state::{self, EvaluationMode, OrbitalState, StateVector};

/// Number of backward differences carried (method order)
pub const ORDER: usize = 8;

/// Predictor and corrector coefficients for `ORDER` backward differences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// γⱼ: velocity, explicit
    pub predictor_velocity: [f64; ORDER],
    /// ρⱼ: position, explicit
    pub predictor_position: [f64; ORDER],
    /// γ*ⱼ: velocity, implicit
    pub corrector_velocity: [f64; ORDER],
    /// ρ*ⱼ: position, implicit
    pub corrector_position: [f64; ORDER],
}

impl Coefficients {
    /// Integrate the backward-difference basis polynomials over s ∈ [0, 1]
    ///
    /// Predictor basis (differences at tₙ):   Pⱼ(s) = s(s+1)…(s+j−1)/j!
    /// Corrector basis (differences at tₙ₊₁): Qⱼ(s) = (s−1)s…(s+j−2)/j!
    ///
    /// Velocity weights are ∫Pⱼ, position weights are ∫(1−s)Pⱼ.
    pub fn new() -> Self {
        let (predictor_velocity, predictor_position) = Self::weights(0.0);
        let (corrector_velocity, corrector_position) = Self::weights(-1.0);
        Self {
            predictor_velocity,
            predictor_position,
            corrector_velocity,
            corrector_position,
        }
    }

    /// Weights for the basis Π (s + shift + i) / j!, i = 0..j−1
    fn weights(shift: f64) -> ([f64; ORDER], [f64; ORDER]) {
        let mut velocity = [0.0; ORDER];
        let mut position = [0.0; ORDER];

        // Polynomial coefficients in s, lowest degree first
        let mut poly = [0.0; ORDER];
        poly[0] = 1.0;

        for j in 0..ORDER {
            if j > 0 {
                // poly *= (s + shift + j − 1) / j
                let a = shift + (j - 1) as f64;
                let mut next = [0.0; ORDER];
                for i in 0..=j {
                    let carry = if i > 0 { poly[i - 1] } else { 0.0 };
                    next[i] = (carry + a * poly[i]) / j as f64;
                }
                poly = next;
            }

            for (i, c) in poly.iter().enumerate().take(j + 1) {
                let i = i as f64;
                velocity[j] += c / (i + 1.0);
                position[j] += c / ((i + 1.0) * (i + 2.0));
            }
        }
        (velocity, position)
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::new()
    }
}

/// Backward differences ∇⁰f … ∇ᴺ⁻¹f of the acceleration history
///
/// Fills up one entry per pushed acceleration until `ORDER` entries are held.
#[derive(Debug, Clone, Copy)]
pub struct DifferenceTable {
    nabla: [Vector3<f64>; ORDER],
    len: usize,
}

impl DifferenceTable {
    /// Table seeded with a single acceleration
    pub fn new(f: Vector3<f64>) -> Self {
        let mut nabla = [Vector3::zeros(); ORDER];
        nabla[0] = f;
        Self { nabla, len: 1 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == ORDER
    }

    /// ∇ʲf at the latest point, `None` past the filled entries
    pub fn get(&self, j: usize) -> Option<Vector3<f64>> {
        if j < self.len {
            Some(self.nabla[j])
        } else {
            None
        }
    }

    /// Table one step later, with `f` as the newest acceleration
    pub fn extended(&self, f: Vector3<f64>) -> Self {
        let len = (self.len + 1).min(ORDER);
        let mut nabla = [Vector3::zeros(); ORDER];
        nabla[0] = f;
        for j in 1..len {
            nabla[j] = nabla[j - 1] - self.nabla[j - 1];
        }
        Self { nabla, len }
    }

    /// Σ wⱼ ∇ʲf over the filled entries
    fn weighted_sum(&self, weights: &[f64; ORDER]) -> Vector3<f64> {
        self.nabla[..self.len]
            .iter()
            .zip(weights)
            .fold(Vector3::zeros(), |acc, (d, w)| acc + d * *w)
    }
}

/// Bookkeeping counters, read-only snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MultistepDiagnostics {
    /// Steps accepted since construction
    pub k: usize,
    /// Corrector passes used by the last steady-state step
    pub kc: usize,
    /// Startup steps taken since the table was last reset
    pub ks: usize,
    /// Net step-size changes (doublings minus halvings)
    pub ndub: i32,
    /// Current step (seconds, signed)
    pub ha: f64,
    /// Largest step magnitude allowed (seconds)
    pub hmax: f64,
    /// Last convergence test value
    pub test: f64,
    /// Composer evaluations since construction
    pub evaluations: usize,
}

/// Order-8 multistep predictor-corrector with RK4 startup
pub struct GaussJackson {
    eom: EquationsOfMotion,
    config: GaussJacksonConfig,
    coefficients: Coefficients,

    origin: Instant,
    /// Signed step (TU)
    h: f64,
    /// Elapsed since `origin` (TU)
    elapsed: f64,

    state: StateVector,
    derivative: StateVector,
    table: DifferenceTable,

    k: usize,
    kc: usize,
    ks: usize,
    ndub: i32,
    quiet_steps: usize,
    test: f64,
    evaluations: usize,

    /// Set by a corrector failure, cleared by `restart`
    failed: bool,
}

impl GaussJackson {
    pub fn new(
        eom: EquationsOfMotion,
        config: &GaussJacksonConfig,
        epoch: Instant,
        state: StateVector,
    ) -> Result<Self> {
        OrbitalState::from_vector(&state, epoch).validate()?;
        Self::validate_config(config)?;
        Self::validate_step(config, config.step_seconds)?;

        let h = eom.units().seconds_to_tu(config.step_seconds);
        let derivative = evaluate(&eom, &epoch, 0.0, &state, EvaluationMode::Corrector)?;
        log::debug!(
            "Gauss-Jackson integrator: order {ORDER}, step {} s, {} startup substeps",
            config.step_seconds,
            config.startup_substeps
        );

        Ok(Self {
            eom,
            config: *config,
            coefficients: Coefficients::new(),
            origin: epoch,
            h,
            elapsed: 0.0,
            state,
            derivative,
            table: DifferenceTable::new(state::velocity(&derivative)),
            k: 0,
            kc: 0,
            ks: 0,
            ndub: 0,
            quiet_steps: 0,
            test: 0.0,
            evaluations: 1,
            failed: false,
        })
    }

    fn validate_config(config: &GaussJacksonConfig) -> Result<()> {
        if config.max_corrector_passes == 0 || config.startup_substeps == 0 {
            return Err(PropagationError::unsupported(
                "corrector passes and startup substeps must be at least 1",
            ));
        }
        if !(config.corrector_tolerance > 0.0 && config.corrector_tolerance.is_finite()) {
            return Err(PropagationError::unsupported(format!(
                "corrector tolerance must be positive (got {})",
                config.corrector_tolerance
            )));
        }
        if !(config.min_step_seconds > 0.0 && config.max_step_seconds >= config.min_step_seconds)
        {
            return Err(PropagationError::unsupported(format!(
                "step bounds [{}, {}] s are inconsistent",
                config.min_step_seconds, config.max_step_seconds
            )));
        }
        if let Some(tol) = config.step_tolerance {
            if !(tol > 0.0 && tol.is_finite()) {
                return Err(PropagationError::unsupported(format!(
                    "step tolerance must be positive (got {tol})"
                )));
            }
        }
        Ok(())
    }

    fn validate_step(config: &GaussJacksonConfig, step_seconds: f64) -> Result<()> {
        let magnitude = step_seconds.abs();
        if !step_seconds.is_finite()
            || magnitude < config.min_step_seconds
            || magnitude > config.max_step_seconds
        {
            return Err(PropagationError::unsupported(format!(
                "multistep step {step_seconds} s outside [{}, {}] s",
                config.min_step_seconds, config.max_step_seconds
            )));
        }
        Ok(())
    }

    /// Re-enter startup from the current state with a new step
    ///
    /// Clears the invalidated condition left by a nonconvergence.
    pub fn restart(&mut self, step: Duration) -> Result<()> {
        let step_seconds = step.as_seconds();
        Self::validate_step(&self.config, step_seconds)?;

        self.h = self.eom.units().seconds_to_tu(step_seconds);
        self.reset_table();
        self.failed = false;
        log::debug!("Gauss-Jackson restart at t = {:.6} TU, step {step_seconds} s", self.elapsed);
        Ok(())
    }

    /// Whether the difference table is full and steady-state steps are running
    pub fn startup_complete(&self) -> bool {
        self.table.is_full()
    }

    /// Whether a nonconvergence has invalidated the integrator
    pub fn is_invalidated(&self) -> bool {
        self.failed
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn difference_table(&self) -> &DifferenceTable {
        &self.table
    }

    pub fn diagnostics(&self) -> MultistepDiagnostics {
        MultistepDiagnostics {
            k: self.k,
            kc: self.kc,
            ks: self.ks,
            ndub: self.ndub,
            ha: self.eom.units().tu_to_seconds(self.h),
            hmax: self.config.max_step_seconds,
            test: self.test,
            evaluations: self.evaluations,
        }
    }

    fn reset_table(&mut self) {
        self.table = DifferenceTable::new(state::velocity(&self.derivative));
        self.ks = 0;
        self.quiet_steps = 0;
    }

    fn epoch_at(&self, elapsed: f64) -> Instant {
        self.origin + self.eom.units().duration(elapsed)
    }

    /// RK4 substeps across one full step, then push the new acceleration
    fn startup_step(&mut self) -> Result<()> {
        let substeps = self.config.startup_substeps;
        let start = self.elapsed;
        // Fraction i/n reaches exactly 1 on the last substep, so it ends on start + h
        let at = |i: usize| start + self.h * (i as f64 / substeps as f64);

        let mut y = self.state;
        let mut dy = self.derivative;
        for i in 0..substeps {
            (y, dy) = classical_step(&self.eom, &self.origin, at(i), at(i + 1), &y, &dy)?;
        }
        self.evaluations += 4 * substeps;

        self.elapsed = start + self.h;
        self.state = y;
        self.derivative = dy;
        self.table = self.table.extended(state::velocity(&dy));
        self.ks += 1;
        self.k += 1;
        log::trace!("Gauss-Jackson startup step {} of {}", self.ks, ORDER - 1);
        Ok(())
    }

    /// Position and velocity from a difference table and weight pair
    fn apply(
        &self,
        table: &DifferenceTable,
        velocity_weights: &[f64; ORDER],
        position_weights: &[f64; ORDER],
    ) -> StateVector {
        let h = self.h;
        let r = state::position(&self.state);
        let v = state::velocity(&self.state);

        let v_new = v + table.weighted_sum(velocity_weights) * h;
        let r_new = r + v * h + table.weighted_sum(position_weights) * (h * h);
        state::from_parts(&r_new, &v_new)
    }

    fn steady_step(&mut self) -> Result<()> {
        let t1 = self.elapsed + self.h;
        let c = self.coefficients;

        let predicted = self.apply(&self.table, &c.predictor_velocity, &c.predictor_position);
        let mut xdot = evaluate(
            &self.eom,
            &self.origin,
            t1,
            &predicted,
            EvaluationMode::Predictor,
        )?;
        self.evaluations += 1;

        let mut previous = predicted;
        let mut error_estimate = f64::NAN;
        let mut converged = None;

        for pass in 1..=self.config.max_corrector_passes {
            let nabla = self.table.extended(state::velocity(&xdot));
            let corrected = self.apply(&nabla, &c.corrector_velocity, &c.corrector_position);
            xdot = evaluate(&self.eom, &self.origin, t1, &corrected, EvaluationMode::Corrector)?;
            self.evaluations += 1;

            self.test = (corrected - previous).norm() / corrected.norm();
            if pass == 1 {
                error_estimate = self.test;
            }
            previous = corrected;

            // NaN never compares below the tolerance
            if self.test <= self.config.corrector_tolerance {
                converged = Some(pass);
                break;
            }
        }

        let Some(passes) = converged else {
            self.failed = true;
            self.kc = self.config.max_corrector_passes;
            log::warn!(
                "Gauss-Jackson corrector did not converge at t = {:.6} TU after {} passes (test = {:e})",
                t1,
                self.kc,
                self.test
            );
            return Err(PropagationError::NonConvergence {
                epoch: self.epoch_at(t1),
                passes: self.kc,
                test: self.test,
            });
        };

        self.kc = passes;
        self.elapsed = t1;
        self.state = previous;
        self.derivative = xdot;
        self.table = self.table.extended(state::velocity(&xdot));
        self.k += 1;
        log::trace!("Gauss-Jackson step {} converged in {passes} passes", self.k);

        self.adjust_step(error_estimate);
        Ok(())
    }

    /// Halve or double after an accepted step
    fn adjust_step(&mut self, error_estimate: f64) {
        let Some(tol) = self.config.step_tolerance else {
            return;
        };
        let units = *self.eom.units();
        let magnitude = units.tu_to_seconds(self.h.abs());

        if error_estimate > tol {
            self.quiet_steps = 0;
            if magnitude / 2.0 >= self.config.min_step_seconds {
                self.h /= 2.0;
                self.ndub -= 1;
                self.reset_table();
                log::debug!(
                    "Gauss-Jackson halving step to {} s (estimate {error_estimate:e})",
                    units.tu_to_seconds(self.h)
                );
            }
        } else if error_estimate < tol / f64::powi(2.0, ORDER as i32) {
            self.quiet_steps += 1;
            if self.quiet_steps >= ORDER && magnitude * 2.0 <= self.config.max_step_seconds {
                self.h *= 2.0;
                self.ndub += 1;
                self.reset_table();
                log::debug!(
                    "Gauss-Jackson doubling step to {} s (estimate {error_estimate:e})",
                    units.tu_to_seconds(self.h)
                );
            }
        } else {
            self.quiet_steps = 0;
        }
    }
}

impl Integrator for GaussJackson {
    fn advance(&mut self) -> Result<Instant> {
        if self.failed {
            return Err(PropagationError::Invalidated);
        }

        if self.table.is_full() {
            self.steady_step()?;
        } else {
            self.startup_step()?;
        }
        Ok(self.time())
    }

    fn time(&self) -> Instant {
        self.epoch_at(self.elapsed)
    }

    fn state(&self) -> &StateVector {
        &self.state
    }

    fn derivative(&self) -> &StateVector {
        &self.derivative
    }

    fn name(&self) -> &'static str {
        "Gauss-Jackson (multistep)"
    }

    fn restart(&mut self, step: Duration) -> Result<()> {
        GaussJackson::restart(self, step)
    }
}
