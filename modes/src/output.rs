use std::{
	fs::File,
	io::{BufReader, BufWriter},
	path::{Path, PathBuf},
};

use pca::AnalysisResult;

use crate::{text, Error};

fn is_binary(path: &Path) -> bool {
	path.extension().is_some_and(|extension| extension == "bin")
}

/// Bincode for `.bin` files, pretty JSON otherwise.
pub fn save(result: &AnalysisResult, path: &Path) -> Result<(), Error> {
	let file = File::create(path).map_err(|source| Error::Io { path: path.into(), source })?;
	let writer = BufWriter::new(file);
	if is_binary(path) {
		bincode::serialize_into(writer, result)?;
	} else {
		serde_json::to_writer_pretty(writer, result)?;
	}
	Ok(())
}

pub fn load(path: &Path) -> Result<AnalysisResult, Error> {
	let file = File::open(path).map_err(|source| Error::Io { path: path.into(), source })?;
	let reader = BufReader::new(file);
	let result = if is_binary(path) {
		bincode::deserialize_from(reader)?
	} else {
		serde_json::from_reader(reader)?
	};
	Ok(result)
}

/// Mean, variances and modes as text next to `base`, returns the written files.
pub fn write_text(result: &AnalysisResult, base: &Path) -> Result<Vec<PathBuf>, Error> {
	let mean = text::with_suffix(base, "_mean.txt");
	text::write(&mean, result.mean_rows())?;

	let variances = text::with_suffix(base, "_variances.txt");
	let values = result.variances().collect::<Vec<_>>();
	text::write(&variances, values.chunks(1))?;

	let modes = text::with_suffix(base, "_modes.txt");
	text::write_blocks(&modes, (0..result.modes().len()).filter_map(|index| result.mode_rows(index)))?;

	Ok(vec![mean, variances, modes])
}
