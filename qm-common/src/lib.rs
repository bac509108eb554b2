pub mod bar;
pub mod config;
pub mod error;
pub mod filename;
pub mod globex;
pub mod instrument;
pub mod resolver;

use std::{fs, path::Path, path::PathBuf};
use configparser::ini::Ini;
use csv::{ReaderBuilder, StringRecord, Trim};
use anyhow::{anyhow, Context, Error, Result};
use crate::error::ParseError;

pub const CSV_EXTENSION: &str = "csv";

pub trait PathDisplay {
	fn to_string(&self) -> &str;
}

pub fn get_ini(path: &str) -> Result<Ini> {
	let mut config = Ini::new();
	config.load(path)
		.map_err(|error| anyhow!(error))
		.with_context(|| format!("Failed to read configuration file from \"{path}\""))?;
	Ok(config)
}

// Reads a headerless CSV file, passing each record along with its 1-based physical line number
pub fn read_csv<F>(path: &Path, mut on_record: F) -> Result<(), ParseError>
where
	F: FnMut(u64, &StringRecord) -> Result<(), ParseError>
{
	let bytes = fs::read(path)
		.map_err(csv::Error::from)?;
	let line_starts = get_line_starts(&bytes);
	let mut reader = ReaderBuilder::new()
		.has_headers(false)
		.flexible(true)
		.trim(Trim::All)
		.from_reader(bytes.as_slice());
	let mut record = StringRecord::new();
	while reader.read_record(&mut record)? {
		let offset = record.position()
			.map_or(0, |position| position.byte() as usize);
		let line = get_line_number(&bytes, &line_starts, offset);
		on_record(line, &record)?;
	}
	Ok(())
}

fn get_line_starts(bytes: &[u8]) -> Vec<usize> {
	let mut line_starts = vec![0];
	line_starts.extend(bytes
		.iter()
		.enumerate()
		.filter(|(_, x)| **x == b'\n')
		.map(|(i, _)| i + 1));
	line_starts
}

// Record positions may point at the terminator of the previous line or at blank lines preceding the record
fn get_line_number(bytes: &[u8], line_starts: &[usize], offset: usize) -> u64 {
	let start = bytes
		.iter()
		.skip(offset)
		.position(|x| *x != b'\r' && *x != b'\n')
		.map_or(offset, |skipped| offset + skipped);
	line_starts.partition_point(|x| *x <= start) as u64
}

pub fn get_csv_files(directory: &Path) -> Result<Vec<PathBuf>> {
	let entries = fs::read_dir(directory)
		.map_err(Error::msg)
		.with_context(|| anyhow!("Failed to read list of files from \"{}\"", directory.to_string()))?;
	let mut paths: Vec<PathBuf> = entries
		.filter_map(|x| x.ok())
		.map(|x| x.path())
		.filter(|x| x.is_file())
		.filter(|x| x.extension()
			.and_then(|x| x.to_str())
			.map_or(false, |x| x.eq_ignore_ascii_case(CSV_EXTENSION)))
		.collect();
	paths.sort();
	Ok(paths)
}

impl PathDisplay for Path {
	fn to_string(&self) -> &str {
		match self.to_str() {
			Some(string) => string,
			None => "?"
		}
	}
}

impl PathDisplay for PathBuf {
	fn to_string(&self) -> &str {
		self.as_path().to_string()
	}
}
