use approx::{assert_abs_diff_eq, assert_relative_eq};
use nalgebra as na;
use pca::{analyze, AnalysisResult, Dataset, Error, GaussianKernel, Settings, Solver, Strategy};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn random_samples(count: usize, dimension: usize, seed: u64) -> Vec<Vec<f64>> {
	let mut rng = StdRng::seed_from_u64(seed);
	(0..count)
		.map(|_| (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect())
		.collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
	a.iter().zip(b).map(|(a, b)| a * b).sum()
}

fn trace_of_covariance(samples: &[Vec<f64>]) -> f64 {
	let count = samples.len() as f64;
	let dimension = samples[0].len();
	(0..dimension)
		.map(|i| {
			let mean = samples.iter().map(|sample| sample[i]).sum::<f64>() / count;
			samples.iter().map(|sample| (sample[i] - mean).powi(2)).sum::<f64>() / count
		})
		.sum()
}

fn assert_orthonormal(result: &AnalysisResult) {
	for (i, a) in result.modes().iter().enumerate() {
		assert_relative_eq!(dot(&a.direction, &a.direction), 1.0, epsilon = 1e-10);
		for b in &result.modes()[(i + 1)..] {
			assert_abs_diff_eq!(dot(&a.direction, &b.direction), 0.0, epsilon = 1e-10);
		}
	}
}

fn assert_ranked(result: &AnalysisResult) {
	let variances = result.variances().collect::<Vec<_>>();
	assert!(variances.iter().all(|&variance| variance >= 0.0));
	assert!(variances.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn variances_sum_to_total_variance() {
	for (count, dimension) in [(6, 40), (40, 6), (8, 8)] {
		let samples = random_samples(count, dimension, 1);
		let dataset = Dataset::new(samples.clone()).unwrap();
		let result = analyze(&dataset, &Settings::default()).unwrap();

		assert_eq!(result.modes().len(), (count - 1).min(dimension));
		assert_relative_eq!(result.total_variance(), trace_of_covariance(&samples), epsilon = 1e-10);
		assert_relative_eq!(result.variances().sum::<f64>(), result.total_variance(), epsilon = 1e-10);
		assert_ranked(&result);
		assert_orthonormal(&result);
	}
}

#[test]
fn zero_coefficients_reconstruct_the_mean() {
	let dataset = Dataset::new(random_samples(5, 12, 2)).unwrap();
	let result = analyze(&dataset, &Settings::default()).unwrap();
	let zeros = vec![0.0; result.modes().len()];
	assert_eq!(result.reconstruct(&zeros).unwrap(), result.mean());
}

#[test]
fn repeated_runs_are_identical() {
	let dataset = Dataset::new(random_samples(7, 30, 3)).unwrap();
	let first = analyze(&dataset, &Settings::default()).unwrap();
	let second = analyze(&dataset, &Settings::default()).unwrap();
	assert_eq!(first, second);
}

#[test]
fn thread_count_does_not_change_results() {
	let points = (0..10)
		.map(|i| na::point![i as f64, 0.0, 0.0])
		.collect::<Vec<_>>();
	let dataset = Dataset::from_fields(
		random_samples(6, 30, 4)
			.into_iter()
			.map(|values| pca::Field::new(10, 3, values).unwrap())
			.collect(),
	)
	.unwrap()
	.with_points(points)
	.unwrap();
	let settings = Settings { kernel: Some(GaussianKernel { sigma: 2.0 }), ..Default::default() };

	let run = |threads: usize| {
		rayon::ThreadPoolBuilder::new()
			.num_threads(threads)
			.build()
			.unwrap()
			.install(|| analyze(&dataset, &settings).unwrap())
	};
	assert_eq!(run(1), run(4));
}

#[test]
fn unit_vectors() {
	let dataset = Dataset::new(vec![
		vec![1.0, 0.0, 0.0, 0.0],
		vec![0.0, 1.0, 0.0, 0.0],
		vec![0.0, 0.0, 1.0, 0.0],
	])
	.unwrap();
	let result = analyze(&dataset, &Settings::default()).unwrap();

	for (value, expected) in result.mean().iter().zip([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0]) {
		assert_relative_eq!(*value, expected, epsilon = 1e-15);
	}
	assert_eq!(result.modes().len(), 2);
	assert_orthonormal(&result);
	for mode in result.modes() {
		assert_abs_diff_eq!(mode.direction[3], 0.0, epsilon = 1e-15);
		assert_relative_eq!(mode.variance, 1.0 / 3.0, epsilon = 1e-12);
	}
}

#[test]
fn identical_samples_have_no_modes() {
	let sample = vec![0.5, -2.0, 3.0];
	let dataset = Dataset::new(vec![sample.clone(), sample.clone()]).unwrap();
	let result = analyze(&dataset, &Settings::default()).unwrap();
	assert!(result.modes().is_empty());
	assert_eq!(result.mean(), sample.as_slice());
	assert_eq!(result.total_variance(), 0.0);
	assert!(result.explained_variance_ratio().is_empty());
}

#[test]
fn non_finite_values_are_rejected() {
	let err = Dataset::new(vec![vec![1.0, 2.0], vec![f64::NAN, 0.0], vec![0.0, 0.0]]).unwrap_err();
	assert_eq!(err, Error::NonFinite { index: 1, position: 0 });
}

#[test]
fn strategies_agree() {
	let dataset = Dataset::new(random_samples(9, 7, 5)).unwrap();
	let covariance = Settings { strategy: Strategy::Covariance, ..Default::default() };
	let gram = Settings { strategy: Strategy::Gram, ..Default::default() };
	let covariance = analyze(&dataset, &covariance).unwrap();
	let gram = analyze(&dataset, &gram).unwrap();

	assert_eq!(covariance.modes().len(), gram.modes().len());
	for (a, b) in covariance.modes().iter().zip(gram.modes()) {
		assert_relative_eq!(a.variance, b.variance, epsilon = 1e-10);
		assert_relative_eq!(dot(&a.direction, &b.direction).abs(), 1.0, epsilon = 1e-8);
	}
}

#[test]
fn solvers_agree() {
	let dataset = Dataset::new(random_samples(5, 25, 6)).unwrap();
	let qr = analyze(&dataset, &Settings::default()).unwrap();
	let jacobi = analyze(&dataset, &Settings { solver: Solver::Jacobi, ..Default::default() }).unwrap();
	assert!(jacobi.is_converged());
	for (a, b) in qr.modes().iter().zip(jacobi.modes()) {
		assert_relative_eq!(a.variance, b.variance, epsilon = 1e-10);
		assert_relative_eq!(dot(&a.direction, &b.direction).abs(), 1.0, epsilon = 1e-8);
	}
}

#[test]
fn training_samples_round_trip() {
	let samples = random_samples(6, 15, 7);
	let dataset = Dataset::new(samples.clone()).unwrap();
	let result = analyze(&dataset, &Settings::default()).unwrap();
	for sample in &samples {
		let coefficients = result.project(sample).unwrap();
		let reconstructed = result.reconstruct(&coefficients).unwrap();
		for (a, b) in reconstructed.iter().zip(sample) {
			assert_abs_diff_eq!(a, b, epsilon = 1e-10);
		}
	}
}

#[test]
fn explained_variance_ratios() {
	let dataset = Dataset::new(random_samples(10, 4, 8)).unwrap();
	let result = analyze(&dataset, &Settings::default()).unwrap();
	let ratios = result.explained_variance_ratio();
	assert_eq!(ratios.len(), result.modes().len());
	assert!(ratios.windows(2).all(|pair| pair[0] >= pair[1]));
	assert!(ratios.iter().sum::<f64>() <= 1.0 + 1e-12);
}

#[test]
fn sweep_limit_is_reported() {
	let dataset = Dataset::new(random_samples(12, 6, 9)).unwrap();
	let settings = Settings { solver: Solver::Jacobi, max_iterations: 1, ..Default::default() };
	let result = analyze(&dataset, &settings).unwrap();
	assert!(!result.is_converged());
	assert_eq!(result.warnings().len(), 1);
	assert_ranked(&result);
}

#[test]
fn mesh_translation_is_the_only_mode() {
	let vertices = vec![
		na::point![0.0, 0.0, 0.0],
		na::point![1.0, 0.0, 0.0],
		na::point![0.0, 1.0, 0.0],
	];
	let meshes = [0.0, 1.0, 2.0]
		.into_iter()
		.map(|offset| {
			pca::Mesh::new(vertices.iter().map(|v| v + na::vector![0.0, 0.0, offset]).collect())
				.with_point_data(vec![vec![1.0]; 3])
		})
		.collect::<Vec<_>>();
	let dataset = Dataset::from_meshes(&meshes).unwrap();
	let result = analyze(&dataset, &Settings::default()).unwrap();

	assert_eq!(result.modes().len(), 1);
	let expected = 1.0 / 3.0f64.sqrt();
	for row in result.mode_rows(0).unwrap() {
		assert_abs_diff_eq!(row[0], 0.0, epsilon = 1e-12);
		assert_abs_diff_eq!(row[1], 0.0, epsilon = 1e-12);
		assert_relative_eq!(row[2], expected, epsilon = 1e-12);
		assert_abs_diff_eq!(row[3], 0.0, epsilon = 1e-12);
	}
	// squared offsets from the mean (1, 0, 1) summed over three vertices, per sample
	assert_relative_eq!(result.modes()[0].variance, 2.0, epsilon = 1e-12);
}

#[test]
fn distant_points_reduce_kernel_pca_to_euclidean() {
	let samples = random_samples(5, 8, 10);
	let points = (0..8)
		.map(|i| na::point![10.0 * i as f64, 0.0, 0.0])
		.collect::<Vec<_>>();
	let dataset = Dataset::new(samples).unwrap().with_points(points).unwrap();
	let kernel = Settings { kernel: Some(GaussianKernel { sigma: 0.1 }), ..Default::default() };
	let euclidean = Settings { strategy: Strategy::Gram, ..Default::default() };

	let kernel = analyze(&dataset, &kernel).unwrap();
	let euclidean = analyze(&dataset, &euclidean).unwrap();
	assert!(matches!(kernel.inner_product(), pca::InnerProduct::Kernel(_)));
	assert_eq!(kernel.modes().len(), euclidean.modes().len());
	for (a, b) in kernel.modes().iter().zip(euclidean.modes()) {
		assert_relative_eq!(a.variance, b.variance, epsilon = 1e-12);
	}
}

#[test]
fn kernel_modes_are_orthonormal_under_the_kernel() {
	let points = (0..6)
		.map(|i| na::point![i as f64, (i % 2) as f64, 0.0])
		.collect::<Vec<_>>();
	let samples = random_samples(5, 12, 11);
	let fields = samples
		.iter()
		.map(|values| pca::Field::new(6, 2, values.clone()).unwrap())
		.collect();
	let dataset = Dataset::from_fields(fields).unwrap().with_points(points.clone()).unwrap();
	let kernel = GaussianKernel { sigma: 1.0 };
	let settings = Settings { kernel: Some(kernel), ..Default::default() };
	let result = analyze(&dataset, &settings).unwrap();
	assert_eq!(result.modes().len(), 4);
	assert_ranked(&result);

	let matrix = pca::Kernel::matrix(&kernel, &points);
	let kernel_dot = |a: &[f64], b: &[f64]| {
		let a = na::DMatrix::from_row_slice(6, 2, a);
		let b = na::DMatrix::from_row_slice(6, 2, b);
		a.dot(&(&matrix * b))
	};
	for (i, a) in result.modes().iter().enumerate() {
		assert_relative_eq!(kernel_dot(&a.direction, &a.direction), 1.0, epsilon = 1e-10);
		for b in &result.modes()[(i + 1)..] {
			assert_abs_diff_eq!(kernel_dot(&a.direction, &b.direction), 0.0, epsilon = 1e-10);
		}
	}

	for sample in &samples {
		let coefficients = result.project(sample).unwrap();
		let reconstructed = result.reconstruct(&coefficients).unwrap();
		for (a, b) in reconstructed.iter().zip(sample) {
			assert_abs_diff_eq!(a, b, epsilon = 1e-9);
		}
	}
}

#[test]
fn results_serialize() {
	let dataset = Dataset::new(random_samples(4, 3, 12)).unwrap();
	let result = analyze(&dataset, &Settings::default()).unwrap();
	let json = serde_json::to_string(&result).unwrap();
	let restored: AnalysisResult = serde_json::from_str(&json).unwrap();
	assert_eq!(restored.modes().len(), result.modes().len());
	assert_eq!(restored.shape(), result.shape());
}
