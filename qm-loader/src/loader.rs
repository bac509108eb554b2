use std::path::{Path, PathBuf};
use anyhow::{bail, Result};
use chrono_tz::Tz;
use rayon::prelude::*;
use stopwatch::Stopwatch;
use thiserror::Error;
use tracing::{error, info, warn};
use qm_common::bar::{is_header, BarRow, RowMapper};
use qm_common::config::ParserConfiguration;
use qm_common::error::ParseError;
use qm_common::filename::{FilenameMetadata, FilenameParser};
use qm_common::resolver::{FuturesSymbolResolver, ResolvedSymbol, SymbolOverrides};
use qm_common::{get_csv_files, read_csv, PathDisplay};

#[derive(Debug, Error)]
pub enum LoadError {
	#[error("Failed to load \"{path}\": {source}")]
	File {
		path: String,
		#[source]
		source: ParseError
	},

	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error)
}

// All rows of one input file, parsed and validated
#[derive(Debug)]
pub struct BarFile {
	pub path: PathBuf,
	pub metadata: FilenameMetadata,
	pub resolved: ResolvedSymbol,
	pub bars: Vec<BarRow>
}

#[derive(Debug, Default)]
pub struct LoadSummary {
	pub files: usize,
	pub rows: usize,
	pub skipped: Vec<PathBuf>
}

pub trait BarSink {
	async fn write(&mut self, file: &BarFile) -> Result<usize, LoadError>;
}

// Validates without writing anything
pub struct DryRun;

pub struct CsvLoader {
	parser: FilenameParser,
	resolver: FuturesSymbolResolver,
	time_zone: Tz,
	strict: bool
}

impl CsvLoader {
	pub fn new(configuration: &ParserConfiguration, overrides: SymbolOverrides, strict: bool) -> Result<CsvLoader> {
		let resolver = FuturesSymbolResolver::new(configuration, overrides)?;
		let loader = CsvLoader {
			parser: FilenameParser::new(configuration.delimiter),
			resolver,
			time_zone: configuration.time_zone,
			strict
		};
		Ok(loader)
	}

	pub fn get_input_files(path: &Path) -> Result<Vec<PathBuf>> {
		if path.is_dir() {
			get_csv_files(path)
		} else if path.is_file() {
			Ok(vec![path.to_path_buf()])
		} else {
			bail!("Unable to find input file or directory \"{}\"", path.to_string());
		}
	}

	pub fn parse_file(&self, path: &Path) -> Result<BarFile, ParseError> {
		let filename = path
			.file_name()
			.and_then(|x| x.to_str())
			.unwrap_or_else(|| path.to_string());
		let metadata = self.parser.parse(filename)?;
		let resolved = self.resolver.resolve(&metadata.symbol, metadata.instrument_type)?;
		let mapper = RowMapper::new(&metadata, &resolved, self.time_zone);
		let mut bars = Vec::new();
		let mut first_record = true;
		read_csv(path, |line, record| {
			let skip = first_record && is_header(record);
			first_record = false;
			if !skip {
				bars.push(mapper.map(line, record)?);
			}
			Ok(())
		})?;
		let file = BarFile {
			path: path.to_path_buf(),
			metadata,
			resolved,
			bars
		};
		Ok(file)
	}

	// Files are independent, so they are parsed in parallel while preserving their order
	pub fn parse_files(&self, paths: &[PathBuf]) -> Vec<Result<BarFile, LoadError>> {
		paths
			.par_iter()
			.map(|path| {
				self.parse_file(path)
					.map_err(|source| LoadError::File {
						path: path.to_string().to_string(),
						source
					})
			})
			.collect()
	}

	pub async fn run<S>(&self, paths: &[PathBuf], sink: &mut S) -> Result<LoadSummary, LoadError>
	where
		S: BarSink
	{
		let stopwatch = Stopwatch::start_new();
		let mut summary = LoadSummary::default();
		let chunk_size = rayon::current_num_threads().max(1);
		for chunk in paths.chunks(chunk_size) {
			for result in self.parse_files(chunk) {
				match result {
					Ok(file) => {
						let file_stopwatch = Stopwatch::start_new();
						let rows = sink.write(&file).await?;
						if file.bars.is_empty() {
							warn!("No bars found in \"{}\"", file.path.to_string());
						}
						info!(
							"Loaded {} rows for {} from \"{}\" in {} ms",
							rows,
							file.resolved,
							file.path.to_string(),
							file_stopwatch.elapsed_ms()
						);
						summary.files += 1;
						summary.rows += rows;
					},
					Err(error) => {
						if self.strict {
							return Err(error);
						}
						error!("{error}, skipping file");
						if let LoadError::File { path, .. } = error {
							summary.skipped.push(PathBuf::from(path));
						}
					}
				}
			}
		}
		info!(
			"Loaded {} rows from {} files in {} ms",
			summary.rows,
			summary.files,
			stopwatch.elapsed_ms()
		);
		Ok(summary)
	}
}

impl BarSink for DryRun {
	async fn write(&mut self, file: &BarFile) -> Result<usize, LoadError> {
		Ok(file.bars.len())
	}
}
