//! Whitespace separated numeric tables, one row per point.
//!
//! Empty lines are skipped and `#` starts a comment.

use std::{
	fs::File,
	io::{BufWriter, Write},
	path::{Path, PathBuf},
};

use crate::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
	pub shape: pca::Shape,
	/// Row-major.
	pub values: Vec<f64>,
}

impl Table {
	pub fn rows(&self) -> std::slice::ChunksExact<'_, f64> {
		self.values.chunks_exact(self.shape.columns)
	}
}

pub fn read(path: &Path) -> Result<Table, Error> {
	let content = std::fs::read_to_string(path).map_err(|source| Error::Io { path: path.into(), source })?;
	parse(&content, path)
}

fn parse(content: &str, path: &Path) -> Result<Table, Error> {
	let mut shape = pca::Shape::new(0, 0);
	let mut values = Vec::new();
	for (index, line) in content.lines().enumerate() {
		let line = match line.find('#') {
			Some(start) => &line[..start],
			None => line,
		}
		.trim();
		if line.is_empty() {
			continue;
		}

		let parse_error = |message: String| Error::Parse { path: path.into(), line: index + 1, message };
		let row = line
			.split_whitespace()
			.map(|token| {
				token
					.parse::<f64>()
					.map_err(|err| parse_error(format!("{:?}: {}", token, err)))
			})
			.collect::<Result<Vec<_>, _>>()?;
		if shape.rows == 0 {
			shape.columns = row.len();
		} else if row.len() != shape.columns {
			return Err(parse_error(format!("expected {} values, got {}", shape.columns, row.len())));
		}
		values.extend(row);
		shape.rows += 1;
	}

	if shape.is_empty() {
		return Err(Error::EmptyFile(path.into()));
	}
	Ok(Table { shape, values })
}

pub fn write<'a>(path: &Path, rows: impl IntoIterator<Item = &'a [f64]>) -> Result<(), Error> {
	write_blocks(path, [rows])
}

/// Writes several tables into one file, separated by empty lines.
pub fn write_blocks<'a, Rows>(path: &Path, blocks: impl IntoIterator<Item = Rows>) -> Result<(), Error>
where
	Rows: IntoIterator<Item = &'a [f64]>,
{
	let io_error = |source: std::io::Error| Error::Io { path: path.into(), source };
	let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
	for (index, block) in blocks.into_iter().enumerate() {
		if index > 0 {
			writeln!(writer).map_err(io_error)?;
		}
		for row in block {
			writeln!(writer, "{}", format_row(row)).map_err(io_error)?;
		}
	}
	writer.flush().map_err(io_error)
}

/// 15 significant digits per value.
pub fn format_row(row: &[f64]) -> String {
	row.iter()
		.map(|value| format!("{:.14e}", value))
		.collect::<Vec<_>>()
		.join(" ")
}

/// `base` with `suffix` appended to its file name.
pub fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
	let mut name = base.as_os_str().to_owned();
	name.push(suffix);
	PathBuf::from(name)
}
