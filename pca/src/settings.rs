use serde::{Deserialize, Serialize};

use crate::{Error, GaussianKernel};

/// Which symmetric matrix is decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Strategy {
	/// Covariance when there are at least as many samples as values, Gram otherwise.
	#[default]
	Auto,
	/// Explicit `dimension x dimension` scatter matrix.
	Covariance,
	/// `samples x samples` inner products, lifted back to the sample space.
	Gram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Solver {
	/// Symmetric QR from nalgebra, falls back to Jacobi when it does not converge.
	#[default]
	Qr,
	/// Cyclic Jacobi rotations.
	Jacobi,
}

/// Denominator of the variances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Normalization {
	/// Divide by the sample count.
	#[default]
	Population,
	/// Divide by the sample count minus one.
	Sample,
}

impl Normalization {
	pub(crate) fn denominator(self, samples: usize) -> f64 {
		match self {
			Self::Population => samples as f64,
			Self::Sample => samples.saturating_sub(1).max(1) as f64,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Maximum number of modes, all modes with variance if not set.
	pub component_count: Option<usize>,
	pub strategy: Strategy,
	pub solver: Solver,
	pub normalization: Normalization,
	/// Modes with an eigenvalue at or below `tolerance` times the largest one are dropped.
	pub tolerance: f64,
	/// Off-diagonal norm relative to the matrix norm at which Jacobi stops.
	pub convergence_tolerance: f64,
	/// Bound for QR iterations or Jacobi sweeps.
	pub max_iterations: usize,
	/// Kernel PCA over the point set of the dataset.
	pub kernel: Option<GaussianKernel>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			component_count: None,
			strategy: Strategy::Auto,
			solver: Solver::Qr,
			normalization: Normalization::Population,
			tolerance: 1.0e-10,
			convergence_tolerance: 1.0e-12,
			max_iterations: 10_000,
			kernel: None,
		}
	}
}

impl Settings {
	pub fn validate(&self) -> Result<(), Error> {
		if self.component_count == Some(0) {
			return Err(Error::ZeroComponents);
		}
		for tolerance in [self.tolerance, self.convergence_tolerance] {
			if !tolerance.is_finite() || tolerance < 0.0 {
				return Err(Error::InvalidTolerance(tolerance));
			}
		}
		if self.max_iterations == 0 {
			return Err(Error::ZeroIterations);
		}
		if let Some(kernel) = &self.kernel {
			kernel.validate()?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		assert_eq!(Settings::default().validate(), Ok(()));
	}

	#[test]
	fn rejects_invalid_values() {
		let settings = Settings { component_count: Some(0), ..Default::default() };
		assert_eq!(settings.validate(), Err(Error::ZeroComponents));

		let settings = Settings { tolerance: -1.0, ..Default::default() };
		assert_eq!(settings.validate(), Err(Error::InvalidTolerance(-1.0)));

		let settings = Settings { max_iterations: 0, ..Default::default() };
		assert_eq!(settings.validate(), Err(Error::ZeroIterations));

		let settings = Settings { kernel: Some(GaussianKernel { sigma: 0.0 }), ..Default::default() };
		assert_eq!(settings.validate(), Err(Error::InvalidKernelSigma(0.0)));
	}

	#[test]
	fn missing_fields_use_defaults() {
		let settings: Settings = serde_json::from_str(r#"{ "component_count": 3, "solver": "Jacobi" }"#).unwrap();
		assert_eq!(settings.component_count, Some(3));
		assert_eq!(settings.solver, Solver::Jacobi);
		assert_eq!(settings.max_iterations, Settings::default().max_iterations);
	}

	#[test]
	fn sample_normalization_divides_by_one_less() {
		assert_eq!(Normalization::Population.denominator(4), 4.0);
		assert_eq!(Normalization::Sample.denominator(4), 3.0);
	}
}
