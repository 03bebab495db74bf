use nalgebra as na;

use crate::Solver;

/// Eigenpairs of a symmetric matrix, in the order the solver produced them.
#[derive(Debug, Clone)]
pub(crate) struct Decomposition {
	pub(crate) values: na::DVector<f64>,
	/// One unit eigenvector per column.
	pub(crate) vectors: na::DMatrix<f64>,
	pub(crate) converged: bool,
	/// Off-diagonal norm relative to the matrix norm left by Jacobi, zero for QR.
	pub(crate) residual: f64,
}

/// Decomposes a real symmetric matrix.
///
/// A QR run that hits `max_iterations` is repeated once with Jacobi rotations and
/// reported as not converged, whatever the Jacobi run reaches.
pub(crate) fn decompose(
	matrix: na::DMatrix<f64>,
	solver: Solver,
	convergence_tolerance: f64,
	max_iterations: usize,
) -> Decomposition {
	debug_assert!(matrix.is_square());
	if matrix.nrows() == 1 {
		return Decomposition {
			values: matrix.diagonal(),
			vectors: na::DMatrix::identity(1, 1),
			converged: true,
			residual: 0.0,
		};
	}

	match solver {
		Solver::Qr => match na::SymmetricEigen::try_new(matrix.clone(), f64::EPSILON, max_iterations) {
			Some(eigen) => Decomposition {
				values: eigen.eigenvalues,
				vectors: eigen.eigenvectors,
				converged: true,
				residual: 0.0,
			},
			None => {
				log::warn!(
					"Symmetric QR did not converge after {} iterations, retrying with Jacobi rotations",
					max_iterations
				);
				Decomposition {
					converged: false,
					..jacobi(matrix, convergence_tolerance, max_iterations)
				}
			},
		},
		Solver::Jacobi => jacobi(matrix, convergence_tolerance, max_iterations),
	}
}

// cyclic Jacobi, Numerical Recipes 11.1
fn jacobi(mut matrix: na::DMatrix<f64>, tolerance: f64, max_sweeps: usize) -> Decomposition {
	let size = matrix.nrows();
	let norm = matrix.norm();
	let mut vectors = na::DMatrix::identity(size, size);
	let mut residual = off_diagonal(&matrix, norm);
	let mut sweeps = 0;

	while residual > tolerance && sweeps < max_sweeps {
		for p in 0..size {
			for q in (p + 1)..size {
				let apq = matrix[(p, q)];
				if apq == 0.0 {
					continue;
				}
				let theta = (matrix[(q, q)] - matrix[(p, p)]) / (2.0 * apq);
				let t = if theta.abs() > 1.0e150 {
					0.5 / theta
				} else {
					theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
				};
				let c = 1.0 / (t * t + 1.0).sqrt();
				let s = t * c;

				for k in 0..size {
					let (kp, kq) = (matrix[(k, p)], matrix[(k, q)]);
					matrix[(k, p)] = c * kp - s * kq;
					matrix[(k, q)] = s * kp + c * kq;
				}
				for k in 0..size {
					let (pk, qk) = (matrix[(p, k)], matrix[(q, k)]);
					matrix[(p, k)] = c * pk - s * qk;
					matrix[(q, k)] = s * pk + c * qk;
				}
				for k in 0..size {
					let (kp, kq) = (vectors[(k, p)], vectors[(k, q)]);
					vectors[(k, p)] = c * kp - s * kq;
					vectors[(k, q)] = s * kp + c * kq;
				}
				matrix[(p, q)] = 0.0;
				matrix[(q, p)] = 0.0;
			}
		}
		sweeps += 1;
		residual = off_diagonal(&matrix, norm);
	}

	if residual > tolerance {
		log::warn!(
			"Jacobi rotations did not converge after {} sweeps, residual {:e}",
			sweeps,
			residual
		);
	}

	Decomposition {
		values: matrix.diagonal(),
		vectors,
		converged: residual <= tolerance,
		residual,
	}
}

fn off_diagonal(matrix: &na::DMatrix<f64>, norm: f64) -> f64 {
	if norm == 0.0 {
		return 0.0;
	}
	let mut sum = 0.0;
	for row in 0..matrix.nrows() {
		for column in 0..matrix.ncols() {
			if row != column {
				sum += matrix[(row, column)] * matrix[(row, column)];
			}
		}
	}
	sum.sqrt() / norm
}
