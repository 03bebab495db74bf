pub mod output;
pub mod text;

use std::{fs::File, io::BufReader, path::PathBuf};

use colored::Colorize;
use nalgebra as na;
use rayon::prelude::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Analysis(#[from] pca::Error),

	#[error("{}: {}", .path.display(), .source)]
	Io { path: PathBuf, source: std::io::Error },

	#[error("{}:{}: {}", .path.display(), .line, .message)]
	Parse { path: PathBuf, line: usize, message: String },

	#[error("{}: file contains no values", .0.display())]
	EmptyFile(PathBuf),

	#[error("{}: expected {}, got {}", .path.display(), .expected, .found)]
	UnexpectedShape { path: PathBuf, expected: pca::Shape, found: pca::Shape },

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Bincode(#[from] bincode::Error),

	#[error(transparent)]
	ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(clap::Parser)]
#[command(version, about = "Principal components analysis of scalar, vector and mesh vertex data")]
pub enum Command {
	/// Compute the mean and principal modes of a set of fields
	Analyze(AnalyzeCommand),
	/// Project a field onto the modes of a stored result
	Project(ProjectCommand),
	/// Build a field from mode coefficients
	Synthesize(SynthesizeCommand),
}

#[derive(clap::Args)]
pub struct AnalyzeCommand {
	/// Field files, one sample each, one row of values per point.
	#[arg(required = true)]
	fields: Vec<PathBuf>,

	/// Base name for the output files.
	#[arg(long, short)]
	output: PathBuf,

	/// Point positions with one `x y z` row per field row. Required for kernel PCA.
	#[arg(long)]
	points: Option<PathBuf>,

	/// Store the result with bincode instead of JSON.
	#[arg(long)]
	binary: bool,

	/// Settings as JSON. Command line flags take precedence.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Maximal thread count for multithreading. 0 for the amount of logical cores.
	#[arg(long, default_value_t = 0)]
	max_threads: usize,

	#[command(flatten)]
	settings: Settings,
}

#[derive(clap::Args, Debug, Default)]
pub struct Settings {
	/// Maximum number of principal components.
	#[arg(long)]
	components: Option<usize>,

	/// Decompose the covariance or the Gram matrix.
	#[arg(long, value_enum)]
	strategy: Option<pca::Strategy>,

	/// Symmetric eigensolver.
	#[arg(long, value_enum)]
	solver: Option<pca::Solver>,

	/// Variance denominator.
	#[arg(long, value_enum)]
	normalization: Option<pca::Normalization>,

	/// Relative eigenvalue below which modes are dropped.
	#[arg(long)]
	tolerance: Option<f64>,

	/// Convergence threshold for Jacobi rotations.
	#[arg(long)]
	convergence_tolerance: Option<f64>,

	/// Maximum QR iterations or Jacobi sweeps.
	#[arg(long)]
	max_iterations: Option<usize>,

	/// Sigma of the Gaussian distance kernel. Enables kernel PCA.
	#[arg(long)]
	kernel_sigma: Option<f64>,
}

impl Settings {
	fn apply(&self, mut settings: pca::Settings) -> pca::Settings {
		if let Some(components) = self.components {
			settings.component_count = Some(components);
		}
		if let Some(strategy) = self.strategy {
			settings.strategy = strategy;
		}
		if let Some(solver) = self.solver {
			settings.solver = solver;
		}
		if let Some(normalization) = self.normalization {
			settings.normalization = normalization;
		}
		if let Some(tolerance) = self.tolerance {
			settings.tolerance = tolerance;
		}
		if let Some(tolerance) = self.convergence_tolerance {
			settings.convergence_tolerance = tolerance;
		}
		if let Some(max_iterations) = self.max_iterations {
			settings.max_iterations = max_iterations;
		}
		if let Some(sigma) = self.kernel_sigma {
			settings.kernel = Some(pca::GaussianKernel { sigma });
		}
		settings
	}
}

#[derive(clap::Args)]
pub struct ProjectCommand {
	/// Stored result (.json or .bin).
	#[arg(long, short)]
	result: PathBuf,

	/// Field to project.
	field: PathBuf,
}

#[derive(clap::Args)]
pub struct SynthesizeCommand {
	/// Stored result (.json or .bin).
	#[arg(long, short)]
	result: PathBuf,

	/// Coefficient of the next mode, missing ones are zero.
	#[arg(long = "coefficient", short, allow_negative_numbers = true)]
	coefficients: Vec<f64>,

	/// Output field file.
	#[arg(long, short)]
	output: PathBuf,
}

pub fn run(command: Command) -> Result<(), Error> {
	match command {
		Command::Analyze(command) => analyze(command),
		Command::Project(command) => project(command),
		Command::Synthesize(command) => synthesize(command),
	}
}

fn analyze(command: AnalyzeCommand) -> Result<(), Error> {
	let base = match &command.config {
		Some(path) => {
			let file = File::open(path).map_err(|source| Error::Io { path: path.clone(), source })?;
			serde_json::from_reader(BufReader::new(file))?
		},
		None => pca::Settings::default(),
	};
	let settings = command.settings.apply(base);

	let pool = rayon::ThreadPoolBuilder::new()
		.num_threads(command.max_threads)
		.build()?;
	let result = pool.install(|| -> Result<_, Error> {
		let dataset = load_dataset(&command.fields, command.points.as_ref())?;
		log::info!(
			"Loaded {} fields of shape {} on {} threads",
			dataset.len(),
			dataset.shape(),
			rayon::current_num_threads()
		);
		Ok(pca::analyze(&dataset, &settings)?)
	})?;

	for warning in result.warnings() {
		println!("{} {}", "Warning:".bold().yellow(), warning);
	}

	let path = text::with_suffix(&command.output, if command.binary { ".bin" } else { ".json" });
	output::save(&result, &path)?;
	let mut written = vec![path];
	written.extend(output::write_text(&result, &command.output)?);

	print_summary(&result);
	for path in written {
		println!("{} {}", "Wrote".green(), path.display());
	}
	Ok(())
}

fn load_dataset(paths: &[PathBuf], points: Option<&PathBuf>) -> Result<pca::Dataset, Error> {
	let tables = paths
		.par_iter()
		.map(|path| text::read(path))
		.collect::<Result<Vec<_>, _>>()?;
	let fields = tables
		.into_iter()
		.map(|table| pca::Field::new(table.shape.rows, table.shape.columns, table.values))
		.collect::<Result<Vec<_>, _>>()?;
	let Some(shape) = fields.first().map(pca::Field::shape) else {
		return Err(pca::Error::NotEnoughSamples(0).into());
	};
	if let Some((path, field)) = paths
		.iter()
		.zip(&fields)
		.find(|(_, field)| field.shape() != shape)
	{
		return Err(Error::UnexpectedShape { path: path.clone(), expected: shape, found: field.shape() });
	}

	let dataset = pca::Dataset::from_fields(fields)?;

	match points {
		Some(path) => {
			let table = text::read(path)?;
			let expected = pca::Shape::new(shape.rows, 3);
			if table.shape != expected {
				return Err(Error::UnexpectedShape { path: path.clone(), expected, found: table.shape });
			}
			let points = table
				.rows()
				.map(|row| na::point![row[0], row[1], row[2]])
				.collect();
			Ok(dataset.with_points(points)?)
		},
		None => Ok(dataset),
	}
}

fn print_summary(result: &pca::AnalysisResult) {
	println!(
		"{} samples, {} values each, total variance {:.6e}",
		result.sample_count(),
		result.dimension(),
		result.total_variance()
	);
	println!(
		"{}",
		format!(
			"{:>6} {:>14} {:>14} {:>9} {:>9}",
			"mode", "variance", "deviation", "ratio", "total"
		)
		.bold()
	);
	let mut cumulative = 0.0;
	let ratios = result.explained_variance_ratio();
	for (index, (mode, ratio)) in result.modes().iter().zip(ratios).enumerate() {
		cumulative += ratio;
		println!(
			"{:>6} {:>14.6e} {:>14.6e} {:>8.2}% {:>8.2}%",
			index + 1,
			mode.variance,
			mode.standard_deviation(),
			ratio * 100.0,
			cumulative * 100.0
		);
	}
}

fn project(command: ProjectCommand) -> Result<(), Error> {
	let result = output::load(&command.result)?;
	let table = text::read(&command.field)?;
	if table.shape != result.shape() {
		return Err(Error::UnexpectedShape {
			path: command.field,
			expected: result.shape(),
			found: table.shape,
		});
	}
	for coefficient in result.project(&table.values)? {
		println!("{}", coefficient);
	}
	Ok(())
}

fn synthesize(command: SynthesizeCommand) -> Result<(), Error> {
	let result = output::load(&command.result)?;
	let sample = result.reconstruct(&command.coefficients)?;
	text::write(&command.output, sample.chunks_exact(result.shape().columns.max(1)))?;
	log::info!("Synthesized {} from {} coefficients", command.output.display(), command.coefficients.len());
	Ok(())
}
