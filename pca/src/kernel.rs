use nalgebra as na;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Error, Shape};

/// Weight between two points as a function of their squared distance.
pub trait Kernel {
	fn evaluate(&self, distance_squared: f64) -> f64;

	/// `points x points` matrix of pairwise weights.
	fn matrix(&self, points: &[na::Point3<f64>]) -> na::DMatrix<f64>
	where
		Self: Sync,
	{
		let rows = points
			.par_iter()
			.map(|a| {
				points
					.iter()
					.map(|b| self.evaluate(na::distance_squared(a, b)))
					.collect::<Vec<_>>()
			})
			.collect::<Vec<_>>();
		na::DMatrix::from_fn(points.len(), points.len(), |row, column| rows[row][column])
	}
}

/// `exp(-d² / (2σ²))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianKernel {
	pub sigma: f64,
}

impl GaussianKernel {
	pub fn new(sigma: f64) -> Result<Self, Error> {
		let kernel = Self { sigma };
		kernel.validate()?;
		Ok(kernel)
	}

	pub(crate) fn validate(&self) -> Result<(), Error> {
		if self.sigma.is_finite() && self.sigma > 0.0 {
			Ok(())
		} else {
			Err(Error::InvalidKernelSigma(self.sigma))
		}
	}
}

impl Kernel for GaussianKernel {
	fn evaluate(&self, distance_squared: f64) -> f64 {
		(-distance_squared / (2.0 * self.sigma * self.sigma)).exp()
	}
}

/// Kernel together with the positions of the sample rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSpace {
	pub kernel: GaussianKernel,
	pub points: Vec<na::Point3<f64>>,
}

impl KernelSpace {
	pub fn matrix(&self) -> na::DMatrix<f64> {
		self.kernel.matrix(&self.points)
	}
}

/// `kernel * sample` with the sample viewed as a `shape` field, flattened row-major again.
pub(crate) fn apply(kernel: &na::DMatrix<f64>, sample: &[f64], shape: Shape) -> Vec<f64> {
	let field = na::DMatrix::from_row_slice(shape.rows, shape.columns, sample);
	let weighted = kernel * field;
	weighted.transpose().as_slice().to_vec()
}
