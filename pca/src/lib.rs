#![doc = include_str!("../readme.md")]

mod dataset;
mod eigen;
mod engine;
mod kernel;
mod result;
mod settings;

pub use dataset::{Dataset, Field, Mesh, Shape};
pub use engine::analyze;
pub use kernel::{GaussianKernel, Kernel, KernelSpace};
pub use result::{AnalysisResult, InnerProduct, PrincipalMode};
pub use settings::{Normalization, Settings, Solver, Strategy};

/// Invalid input. Nothing is computed when one of these is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
	#[error("At least two samples are required, got {0}")]
	NotEnoughSamples(usize),

	#[error("Samples must not be empty")]
	EmptySample,

	#[error("Sample {index} has {found} values, expected {expected}")]
	LengthMismatch { index: usize, expected: usize, found: usize },

	#[error("Sample {index} has shape {found}, expected {expected}")]
	ShapeMismatch { index: usize, expected: Shape, found: Shape },

	#[error("Field has {found} values, which does not match the shape {shape}")]
	FieldSize { shape: Shape, found: usize },

	#[error("Mesh {index} has point data for {found} of {vertices} vertices")]
	PointDataMismatch { index: usize, vertices: usize, found: usize },

	#[error("Mesh {0} has point data of different lengths")]
	RaggedPointData(usize),

	#[error("Sample {index} has a non-finite value at position {position}")]
	NonFinite { index: usize, position: usize },

	#[error("Point set has {found} points, but the samples have {expected} rows")]
	PointCountMismatch { expected: usize, found: usize },

	#[error("Point {0} has a non-finite coordinate")]
	NonFinitePoint(usize),

	#[error("Kernel function is set but no point set is available")]
	MissingPointSet,

	#[error("Kernel sigma must be positive and finite, got {0}")]
	InvalidKernelSigma(f64),

	#[error("Component count must be greater than zero")]
	ZeroComponents,

	#[error("Tolerance must be finite and not negative, got {0}")]
	InvalidTolerance(f64),

	#[error("Iteration count must be greater than zero")]
	ZeroIterations,

	#[error("Expected {expected} values, got {found}")]
	DimensionMismatch { expected: usize, found: usize },

	#[error("Expected at most {expected} coefficients, got {found}")]
	TooManyCoefficients { expected: usize, found: usize },

	#[error("Total variance of the samples is not a finite number ({0})")]
	VarianceOverflow(f64),

	#[error("Stored result has {found} {what}, expected {expected}")]
	InconsistentResult { what: &'static str, expected: usize, found: usize },
}

/// Non-fatal conditions recorded in an [`AnalysisResult`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Warning {
	/// The eigensolver stopped at the iteration bound. The modes are the best
	/// approximation reached so far.
	NumericalInstability { iterations: usize, residual: f64 },
}

impl std::fmt::Display for Warning {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::NumericalInstability { iterations, residual } => write!(
				f,
				"eigensolver did not converge after {} iterations (residual {:.3e})",
				iterations, residual
			),
		}
	}
}
