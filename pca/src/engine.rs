use nalgebra as na;
use rayon::prelude::*;

use crate::{
	eigen, kernel,
	result::{dot, InnerProduct},
	AnalysisResult, Dataset, Error, KernelSpace, PrincipalMode, Settings, Strategy, Warning,
};

/// Principal components of `dataset`.
///
/// Modes are sorted by descending variance. Equal variances keep the order the
/// eigensolver produced them in, and every direction is signed so that its
/// component with the largest magnitude is positive, so identical input always
/// gives identical output.
pub fn analyze(dataset: &Dataset, settings: &Settings) -> Result<AnalysisResult, Error> {
	settings.validate()?;
	let space = match settings.kernel {
		Some(kernel) => {
			let points = dataset.points().ok_or(Error::MissingPointSet)?;
			Some(KernelSpace { kernel, points: points.to_vec() })
		},
		None => None,
	};

	let count = dataset.len();
	let dimension = dataset.dimension();
	let shape = dataset.shape();
	let denominator = settings.normalization.denominator(count);

	let data = dataset.matrix();
	let mean = data.column_mean();
	let mut centered = na::DMatrix::from_fn(dimension, count, |row, column| data[(row, column)] - mean[row]);
	// products of the centered values must neither overflow nor underflow
	let scale = power_of_two_scale(centered.amax());
	centered.unscale_mut(scale);

	let strategy = match (settings.strategy, &space) {
		(_, Some(_)) => Strategy::Gram,
		(Strategy::Auto, None) if dimension <= count => Strategy::Covariance,
		(Strategy::Auto, None) => Strategy::Gram,
		(strategy, None) => strategy,
	};
	log::debug!(
		"Analyzing {} samples with {} values ({}) using {:?}",
		count,
		dimension,
		shape,
		strategy
	);

	let kernel_matrix = space.as_ref().map(KernelSpace::matrix);
	let mut matrix = match (strategy, &kernel_matrix) {
		(Strategy::Covariance, _) => &centered * centered.transpose(),
		(_, None) => centered.tr_mul(&centered),
		(_, Some(kernel_matrix)) => {
			let weighted = centered
				.as_slice()
				.par_chunks_exact(dimension)
				.map(|sample| kernel::apply(kernel_matrix, sample, shape))
				.collect::<Vec<_>>();
			let weighted = na::DMatrix::from_iterator(dimension, count, weighted.into_iter().flatten());
			centered.tr_mul(&weighted)
		},
	};
	symmetrize(&mut matrix);
	let total_variance = matrix.trace() / denominator * scale * scale;
	if !total_variance.is_finite() {
		return Err(Error::VarianceOverflow(total_variance));
	}

	let decomposition = eigen::decompose(
		matrix,
		settings.solver,
		settings.convergence_tolerance,
		settings.max_iterations,
	);
	let mut warnings = Vec::new();
	if !decomposition.converged {
		let warning = Warning::NumericalInstability {
			iterations: settings.max_iterations,
			residual: decomposition.residual,
		};
		log::warn!("{}", warning);
		warnings.push(warning);
	}

	let mut ranked = decomposition
		.values
		.iter()
		.map(|&value| value.max(0.0))
		.enumerate()
		.collect::<Vec<_>>();
	// stable, so ties keep the solver order
	ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
	let largest = ranked.first().map(|&(_, value)| value).unwrap_or(0.0);
	let limit = (count - 1)
		.min(dimension)
		.min(settings.component_count.unwrap_or(usize::MAX));
	let kept = ranked
		.into_iter()
		.take_while(|&(_, value)| largest > 0.0 && value > settings.tolerance * largest)
		.take(limit)
		.collect::<Vec<_>>();

	let modes = kept
		.par_iter()
		.map(|&(index, value)| {
			let eigenvector = decomposition.vectors.column(index);
			let mut direction = match strategy {
				Strategy::Covariance => eigenvector.iter().copied().collect::<Vec<_>>(),
				_ => (&centered * eigenvector).as_slice().to_vec(),
			};
			let norm = match &kernel_matrix {
				Some(kernel_matrix) => dot(&direction, &kernel::apply(kernel_matrix, &direction, shape)).sqrt(),
				None => dot(&direction, &direction).sqrt(),
			};
			if norm > 0.0 {
				direction.iter_mut().for_each(|value| *value /= norm);
			}
			orient(&mut direction);
			PrincipalMode { direction, variance: value / denominator * scale * scale }
		})
		.collect::<Vec<_>>();
	log::debug!(
		"Kept {} of {} modes, total variance {}",
		modes.len(),
		decomposition.values.len(),
		total_variance
	);

	let inner_product = match space {
		Some(space) => InnerProduct::Kernel(space),
		None => InnerProduct::Euclidean,
	};
	Ok(AnalysisResult::new(
		shape,
		mean.as_slice().to_vec(),
		modes,
		total_variance,
		count,
		inner_product,
		warnings,
	))
}

fn symmetrize(matrix: &mut na::DMatrix<f64>) {
	for row in 0..matrix.nrows() {
		for column in (row + 1)..matrix.ncols() {
			let value = 0.5 * (matrix[(row, column)] + matrix[(column, row)]);
			matrix[(row, column)] = value;
			matrix[(column, row)] = value;
		}
	}
}

/// Power of two close to `largest`, so scaling by it is exact.
fn power_of_two_scale(largest: f64) -> f64 {
	if largest > 0.0 && largest.is_finite() {
		2.0f64.powi((largest.log2().ceil() as i32).clamp(-1000, 1000))
	} else {
		1.0
	}
}

/// Flips the direction so that its first component of largest magnitude is positive.
fn orient(direction: &mut [f64]) {
	let mut largest = 0.0;
	let mut negative = false;
	for &value in direction.iter() {
		if value.abs() > largest {
			largest = value.abs();
			negative = value < 0.0;
		}
	}
	if negative {
		direction.iter_mut().for_each(|value| *value = -*value);
	}
}
