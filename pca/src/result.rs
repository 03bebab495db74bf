use serde::{Deserialize, Serialize};

use crate::{kernel, Error, KernelSpace, Shape, Warning};

/// One axis of variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalMode {
	/// Unit length under the inner product of the analysis.
	pub direction: Vec<f64>,
	pub variance: f64,
}

impl PrincipalMode {
	pub fn standard_deviation(&self) -> f64 {
		self.variance.sqrt()
	}
}

/// Inner product the modes are orthonormal under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InnerProduct {
	Euclidean,
	Kernel(KernelSpace),
}

/// Deserialized results are checked for consistent lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredResult")]
pub struct AnalysisResult {
	shape: Shape,
	mean: Vec<f64>,
	modes: Vec<PrincipalMode>,
	total_variance: f64,
	sample_count: usize,
	inner_product: InnerProduct,
	warnings: Vec<Warning>,
}

#[derive(Deserialize)]
struct StoredResult {
	shape: Shape,
	mean: Vec<f64>,
	modes: Vec<PrincipalMode>,
	total_variance: f64,
	sample_count: usize,
	inner_product: InnerProduct,
	warnings: Vec<Warning>,
}

impl TryFrom<StoredResult> for AnalysisResult {
	type Error = Error;

	fn try_from(stored: StoredResult) -> Result<Self, Error> {
		let result = Self::new(
			stored.shape,
			stored.mean,
			stored.modes,
			stored.total_variance,
			stored.sample_count,
			stored.inner_product,
			stored.warnings,
		);
		result.validate()?;
		Ok(result)
	}
}

impl AnalysisResult {
	pub(crate) fn new(
		shape: Shape,
		mean: Vec<f64>,
		modes: Vec<PrincipalMode>,
		total_variance: f64,
		sample_count: usize,
		inner_product: InnerProduct,
		warnings: Vec<Warning>,
	) -> Self {
		Self {
			shape,
			mean,
			modes,
			total_variance,
			sample_count,
			inner_product,
			warnings,
		}
	}

	fn validate(&self) -> Result<(), Error> {
		let inconsistent = |what, expected, found| Error::InconsistentResult { what, expected, found };
		let dimension = self.shape.checked_len().unwrap_or(usize::MAX);
		if self.mean.len() != dimension {
			return Err(inconsistent("mean values", dimension, self.mean.len()));
		}
		if let Some(mode) = self.modes.iter().find(|mode| mode.direction.len() != dimension) {
			return Err(inconsistent("direction values", dimension, mode.direction.len()));
		}
		if let InnerProduct::Kernel(space) = &self.inner_product {
			space.kernel.validate()?;
			if space.points.len() != self.shape.rows {
				return Err(inconsistent("kernel points", self.shape.rows, space.points.len()));
			}
		}
		Ok(())
	}

	pub fn shape(&self) -> Shape {
		self.shape
	}

	pub fn dimension(&self) -> usize {
		self.mean.len()
	}

	pub fn mean(&self) -> &[f64] {
		&self.mean
	}

	/// Sorted by descending variance.
	pub fn modes(&self) -> &[PrincipalMode] {
		&self.modes
	}

	pub fn variances(&self) -> impl Iterator<Item = f64> + '_ {
		self.modes.iter().map(|mode| mode.variance)
	}

	/// Variance of the whole dataset, including modes that were not kept.
	pub fn total_variance(&self) -> f64 {
		self.total_variance
	}

	pub fn sample_count(&self) -> usize {
		self.sample_count
	}

	pub fn inner_product(&self) -> &InnerProduct {
		&self.inner_product
	}

	pub fn warnings(&self) -> &[Warning] {
		&self.warnings
	}

	pub fn is_converged(&self) -> bool {
		!self
			.warnings
			.iter()
			.any(|warning| matches!(warning, Warning::NumericalInstability { .. }))
	}

	/// Share of the total variance per mode, empty without variance.
	pub fn explained_variance_ratio(&self) -> Vec<f64> {
		if self.total_variance <= 0.0 {
			return Vec::new();
		}
		self.variances()
			.map(|variance| variance / self.total_variance)
			.collect()
	}

	pub fn mean_rows(&self) -> std::slice::ChunksExact<'_, f64> {
		self.mean.chunks_exact(self.shape.columns.max(1))
	}

	/// Direction of a mode as one row of values per point.
	pub fn mode_rows(&self, index: usize) -> Option<std::slice::ChunksExact<'_, f64>> {
		self.modes
			.get(index)
			.map(|mode| mode.direction.chunks_exact(self.shape.columns.max(1)))
	}

	/// Coefficients of `sample - mean` for every mode.
	pub fn project(&self, sample: &[f64]) -> Result<Vec<f64>, Error> {
		if sample.len() != self.dimension() {
			return Err(Error::DimensionMismatch { expected: self.dimension(), found: sample.len() });
		}
		let centered = sample
			.iter()
			.zip(&self.mean)
			.map(|(value, mean)| value - mean)
			.collect::<Vec<_>>();
		let weighted = match &self.inner_product {
			InnerProduct::Euclidean => centered,
			InnerProduct::Kernel(space) => kernel::apply(&space.matrix(), &centered, self.shape),
		};
		Ok(self
			.modes
			.iter()
			.map(|mode| dot(&mode.direction, &weighted))
			.collect())
	}

	/// `mean + Σ coefficient * direction`, missing coefficients count as zero.
	pub fn reconstruct(&self, coefficients: &[f64]) -> Result<Vec<f64>, Error> {
		if coefficients.len() > self.modes.len() {
			return Err(Error::TooManyCoefficients { expected: self.modes.len(), found: coefficients.len() });
		}
		let mut sample = self.mean.clone();
		for (mode, &coefficient) in self.modes.iter().zip(coefficients) {
			for (value, direction) in sample.iter_mut().zip(&mode.direction) {
				*value += coefficient * direction;
			}
		}
		Ok(sample)
	}
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
	a.iter().zip(b).map(|(a, b)| a * b).sum()
}
