use nalgebra as na;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Layout of one sample: `rows` points with `columns` values each, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
	pub rows: usize,
	pub columns: usize,
}

impl Shape {
	pub const fn new(rows: usize, columns: usize) -> Self {
		Self { rows, columns }
	}

	/// Saturates at `usize::MAX`.
	pub const fn len(self) -> usize {
		self.rows.saturating_mul(self.columns)
	}

	pub const fn checked_len(self) -> Option<usize> {
		self.rows.checked_mul(self.columns)
	}

	pub const fn is_empty(self) -> bool {
		self.len() == 0
	}
}

impl std::fmt::Display for Shape {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}x{}", self.rows, self.columns)
	}
}

/// Scalar or vector values sampled at a fixed set of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	shape: Shape,
	values: Vec<f64>,
}

impl Field {
	/// `values` are row-major, one row per point.
	pub fn new(rows: usize, columns: usize, values: Vec<f64>) -> Result<Self, Error> {
		let shape = Shape::new(rows, columns);
		if shape.checked_len() != Some(values.len()) {
			return Err(Error::FieldSize { shape, found: values.len() });
		}
		Ok(Self { shape, values })
	}

	pub fn shape(&self) -> Shape {
		self.shape
	}
}

/// Vertex positions of one mesh, optionally with point data per vertex.
///
/// Meshes of one dataset must share their vertex ordering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
	pub vertices: Vec<na::Point3<f64>>,
	pub point_data: Vec<Vec<f64>>,
}

impl Mesh {
	pub fn new(vertices: Vec<na::Point3<f64>>) -> Self {
		Self { vertices, point_data: Vec::new() }
	}

	pub fn with_point_data(mut self, point_data: Vec<Vec<f64>>) -> Self {
		self.point_data = point_data;
		self
	}

	fn field(&self, index: usize) -> Result<Field, Error> {
		let attributes = if self.point_data.is_empty() {
			0
		} else {
			if self.point_data.len() != self.vertices.len() {
				return Err(Error::PointDataMismatch {
					index,
					vertices: self.vertices.len(),
					found: self.point_data.len(),
				});
			}
			let attributes = self.point_data[0].len();
			if self.point_data.iter().any(|data| data.len() != attributes) {
				return Err(Error::RaggedPointData(index));
			}
			attributes
		};

		let columns = 3 + attributes;
		let mut values = Vec::with_capacity(self.vertices.len() * columns);
		for (vertex, position) in self.vertices.iter().enumerate() {
			values.extend_from_slice(position.coords.as_slice());
			if let Some(data) = self.point_data.get(vertex) {
				values.extend_from_slice(data);
			}
		}
		Field::new(self.vertices.len(), columns, values)
	}
}

/// Aligned samples, one per column of an internal `dimension x len` matrix.
#[derive(Debug, Clone)]
pub struct Dataset {
	data: na::DMatrix<f64>,
	shape: Shape,
	points: Option<Vec<na::Point3<f64>>>,
}

impl Dataset {
	/// Flat samples with shape `dimension x 1`.
	pub fn new(samples: Vec<Vec<f64>>) -> Result<Self, Error> {
		let dimension = samples.first().map(Vec::len).unwrap_or(0);
		Self::with_shape(samples, Shape::new(dimension, 1))
	}

	pub fn from_fields(fields: Vec<Field>) -> Result<Self, Error> {
		let Some(first) = fields.first() else {
			return Err(Error::NotEnoughSamples(0));
		};
		let shape = first.shape;
		if let Some((index, field)) = fields.iter().enumerate().find(|(_, field)| field.shape != shape) {
			return Err(Error::ShapeMismatch { index, expected: shape, found: field.shape });
		}
		Self::with_shape(fields.into_iter().map(|field| field.values).collect(), shape)
	}

	/// Vertex coordinates followed by the point data of each vertex.
	pub fn from_meshes(meshes: &[Mesh]) -> Result<Self, Error> {
		let fields = meshes
			.iter()
			.enumerate()
			.map(|(index, mesh)| mesh.field(index))
			.collect::<Result<Vec<_>, _>>()?;
		Self::from_fields(fields)
	}

	fn with_shape(samples: Vec<Vec<f64>>, shape: Shape) -> Result<Self, Error> {
		if samples.len() < 2 {
			return Err(Error::NotEnoughSamples(samples.len()));
		}
		let dimension = samples[0].len();
		if dimension == 0 {
			return Err(Error::EmptySample);
		}
		if let Some((index, sample)) = samples
			.iter()
			.enumerate()
			.find(|(_, sample)| sample.len() != dimension)
		{
			return Err(Error::LengthMismatch { index, expected: dimension, found: sample.len() });
		}
		let non_finite = samples.par_iter().enumerate().find_map_first(|(index, sample)| {
			sample
				.iter()
				.position(|value| !value.is_finite())
				.map(|position| Error::NonFinite { index, position })
		});
		if let Some(err) = non_finite {
			return Err(err);
		}

		let data = na::DMatrix::from_iterator(dimension, samples.len(), samples.into_iter().flatten());
		Ok(Self { data, shape, points: None })
	}

	/// Attaches the positions the sample rows live on, needed for kernel PCA.
	pub fn with_points(mut self, points: Vec<na::Point3<f64>>) -> Result<Self, Error> {
		if points.len() != self.shape.rows {
			return Err(Error::PointCountMismatch { expected: self.shape.rows, found: points.len() });
		}
		if let Some(index) = points
			.iter()
			.position(|point| point.iter().any(|value| !value.is_finite()))
		{
			return Err(Error::NonFinitePoint(index));
		}
		self.points = Some(points);
		Ok(self)
	}

	pub fn len(&self) -> usize {
		self.data.ncols()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn dimension(&self) -> usize {
		self.data.nrows()
	}

	pub fn shape(&self) -> Shape {
		self.shape
	}

	pub fn points(&self) -> Option<&[na::Point3<f64>]> {
		self.points.as_deref()
	}

	pub fn sample(&self, index: usize) -> Option<&[f64]> {
		self.samples().nth(index)
	}

	pub fn samples(&self) -> std::slice::ChunksExact<'_, f64> {
		self.data.as_slice().chunks_exact(self.dimension())
	}

	pub(crate) fn matrix(&self) -> &na::DMatrix<f64> {
		&self.data
	}
}
