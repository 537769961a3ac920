//! Mandelbrot stability-score simulation
//!
//! The bundled deterministic experiment. Each point `c` of a square grid over
//! a rectangle of the complex plane gets a stability score:
//!
//! - iterate `z <- z² + c` from `z = 0`, at most `max_iterations` times
//! - on the first iteration `t` (0-based) where `|z| > threshold` or `|z|`
//!   is not finite, the score is `100 * (t + 1) / max_iterations`
//! - a point that never escapes scores `100`
//!
//! A score `<= 10` marks an unstable point (outside the set); anything above
//! is considered part of the Mandelbrot set.
//!
//! The simulation is deliberately unoptimised: it exists to produce a result
//! worth recording, not to render fractals quickly.

mod complex;
mod experiment;

pub use complex::Complex;
pub use experiment::MandelbrotExperiment;

use serde::{Deserialize, Serialize};

use crate::experiment::ArtifactRecord;
use crate::{Backend, Error, Result};

/// Default iteration budget per point.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10_000;

/// Default escape threshold on `|z|`.
pub const DEFAULT_THRESHOLD: f64 = 100.0;

/// Scores above this value are inside the set.
pub const STABILITY_CUTOFF: f64 = 10.0;

/// Score a single complex-plane point.
///
/// # Errors
///
/// Returns `InvalidInput` if `max_iterations` is zero or `threshold` is not
/// a positive finite number.
///
/// # Example
///
/// ```rust
/// use repro_store::mandelbrot::{compute_point, Complex};
///
/// // The origin never escapes
/// assert_eq!(compute_point(Complex::ZERO, 100, 100.0)?, 100.0);
/// // c = 10 escapes on the second iteration
/// assert_eq!(compute_point(Complex::new(10.0, 0.0), 10, 100.0)?, 20.0);
/// # Ok::<(), repro_store::Error>(())
/// ```
pub fn compute_point(c: Complex, max_iterations: u32, threshold: f64) -> Result<f64> {
    validate_iteration(max_iterations, threshold)?;
    Ok(score_point(c, max_iterations, threshold))
}

fn score_point(c: Complex, max_iterations: u32, threshold: f64) -> f64 {
    let mut z = Complex::ZERO;
    for t in 0..max_iterations {
        z = z * z + c;
        let modulus = z.modulus();
        if modulus > threshold || !modulus.is_finite() {
            return 100.0 * f64::from(t + 1) / f64::from(max_iterations);
        }
    }
    100.0
}

fn validate_iteration(max_iterations: u32, threshold: f64) -> Result<()> {
    if max_iterations == 0 {
        return Err(Error::InvalidInput(
            "max_iterations must be greater than zero".to_string(),
        ));
    }
    if !(threshold.is_finite() && threshold > 0.0) {
        return Err(Error::InvalidInput(format!(
            "threshold must be a positive finite number, got {threshold}"
        )));
    }
    Ok(())
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Parameters of one Mandelbrot simulation.
///
/// These are exactly the input parameters stored in the experiment record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MandelbrotParams {
    /// Real axis minimum.
    pub re_min: f64,
    /// Real axis maximum.
    pub re_max: f64,
    /// Imaginary axis minimum.
    pub im_min: f64,
    /// Imaginary axis maximum.
    pub im_max: f64,
    /// Number of points along each direction of the grid.
    pub num_points: usize,
    /// Iteration budget per point.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Escape threshold on `|z|`.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl MandelbrotParams {
    /// Grid over `[re_min, re_max] x [im_min, im_max]` with default
    /// iteration budget and threshold.
    #[must_use]
    pub const fn new(re_min: f64, re_max: f64, im_min: f64, im_max: f64, num_points: usize) -> Self {
        Self {
            re_min,
            re_max,
            im_min,
            im_max,
            num_points,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Set the iteration budget.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the escape threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Check every constraint on the parameters.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("re_min", self.re_min),
            ("re_max", self.re_max),
            ("im_min", self.im_min),
            ("im_max", self.im_max),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if self.re_max <= self.re_min {
            return Err(Error::InvalidInput(format!(
                "re_max ({}) must be greater than re_min ({})",
                self.re_max, self.re_min
            )));
        }
        if self.im_max <= self.im_min {
            return Err(Error::InvalidInput(format!(
                "im_max ({}) must be greater than im_min ({})",
                self.im_max, self.im_min
            )));
        }
        if self.num_points == 0 {
            return Err(Error::InvalidInput(
                "num_points must be at least 1".to_string(),
            ));
        }
        if self.num_points.checked_mul(self.num_points).is_none() {
            return Err(Error::InvalidInput(format!(
                "num_points ({}) is too large",
                self.num_points
            )));
        }
        validate_iteration(self.max_iterations, self.threshold)
    }

    /// Total number of grid points.
    #[must_use]
    pub const fn total_points(&self) -> usize {
        self.num_points * self.num_points
    }
}

/// One unit of work: a grid point and its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MandelbrotTask {
    /// Point in the complex plane.
    pub c: Complex,
    /// Index along the real axis.
    pub re_ix: usize,
    /// Index along the imaginary axis.
    pub im_ix: usize,
}

/// `num` evenly spaced samples over `[start, stop]`, both ends included.
///
/// A single sample yields `start`; the last sample is exactly `stop`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut samples: Vec<f64> = (0..num).map(|i| start + i as f64 * step).collect();
            samples[num - 1] = stop;
            samples
        }
    }
}

/// Build the task list for a simulation, ordered by real index then
/// imaginary index.
///
/// # Errors
///
/// Returns `InvalidInput` if the parameters are invalid.
pub fn tasks(params: &MandelbrotParams) -> Result<Vec<MandelbrotTask>> {
    params.validate()?;
    let n = params.num_points;
    let re = linspace(params.re_min, params.re_max, n);
    let im = linspace(params.im_min, params.im_max, n);

    let mut tasks = Vec::with_capacity(params.total_points());
    for (re_ix, &re_value) in re.iter().enumerate() {
        for (im_ix, &im_value) in im.iter().enumerate() {
            tasks.push(MandelbrotTask {
                c: Complex::new(re_value, im_value),
                re_ix,
                im_ix,
            });
        }
    }
    Ok(tasks)
}

/// Result grid, stored row-major with index `[im_ix][re_ix]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MandelbrotGrid {
    num_points: usize,
    scores: Vec<f64>,
}

impl MandelbrotGrid {
    /// Points along each direction.
    #[must_use]
    pub const fn num_points(&self) -> usize {
        self.num_points
    }

    /// Flattened scores.
    #[must_use]
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Score at `(im_ix, re_ix)`.
    #[must_use]
    pub fn get(&self, im_ix: usize, re_ix: usize) -> Option<f64> {
        if im_ix < self.num_points && re_ix < self.num_points {
            self.scores.get(im_ix * self.num_points + re_ix).copied()
        } else {
            None
        }
    }

    /// Number of points considered inside the set.
    #[must_use]
    pub fn stable_count(&self) -> usize {
        self.scores.iter().filter(|&&s| s > STABILITY_CUTOFF).count()
    }

    /// Convert into a `[num_points, num_points]` artifact.
    ///
    /// # Errors
    ///
    /// Propagates artifact construction errors.
    pub fn into_artifact(self, key: &str) -> Result<ArtifactRecord> {
        ArtifactRecord::new(key, vec![self.num_points, self.num_points], self.scores)
    }
}

/// Run the whole simulation.
///
/// Sequential and parallel backends produce identical grids.
///
/// # Errors
///
/// Returns `InvalidInput` for invalid parameters, or `ExperimentFailed` if
/// the worker pool cannot be built.
pub fn simulate(params: &MandelbrotParams, backend: Backend) -> Result<MandelbrotGrid> {
    let tasks = tasks(params)?;
    tracing::debug!(
        tasks = tasks.len(),
        backend = ?backend,
        "evaluating Mandelbrot grid"
    );

    let scores = match backend {
        Backend::Sequential => evaluate_sequential(&tasks, params),
        Backend::Parallel { workers } => evaluate_parallel(&tasks, params, workers)?,
    };

    let n = params.num_points;
    let mut grid = vec![0.0; params.total_points()];
    for (task, score) in tasks.iter().zip(scores) {
        grid[task.im_ix * n + task.re_ix] = score;
    }

    Ok(MandelbrotGrid {
        num_points: n,
        scores: grid,
    })
}

fn evaluate_sequential(tasks: &[MandelbrotTask], params: &MandelbrotParams) -> Vec<f64> {
    tasks
        .iter()
        .map(|task| score_point(task.c, params.max_iterations, params.threshold))
        .collect()
}

#[cfg(feature = "parallel")]
fn evaluate_parallel(
    tasks: &[MandelbrotTask],
    params: &MandelbrotParams,
    workers: Option<usize>,
) -> Result<Vec<f64>> {
    use rayon::prelude::*;

    let run = || -> Vec<f64> {
        tasks
            .par_iter()
            .map(|task| score_point(task.c, params.max_iterations, params.threshold))
            .collect()
    };

    match workers {
        Some(num_threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .map_err(|e| Error::ExperimentFailed(format!("Failed to build worker pool: {e}")))?;
            Ok(pool.install(run))
        }
        None => Ok(run()),
    }
}

#[cfg(not(feature = "parallel"))]
fn evaluate_parallel(
    tasks: &[MandelbrotTask],
    params: &MandelbrotParams,
    _workers: Option<usize>,
) -> Result<Vec<f64>> {
    tracing::warn!("built without the `parallel` feature, evaluating sequentially");
    Ok(evaluate_sequential(tasks, params))
}
