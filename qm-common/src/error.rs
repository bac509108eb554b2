use thiserror::Error;
use crate::instrument::InstrumentType;

#[derive(Debug, Error)]
pub enum ParseError {
	#[error("Malformed file name \"{filename}\": {reason}")]
	MalformedFilename {
		filename: String,
		reason: String
	},

	#[error("Unknown instrument type \"{token}\" in file name \"{filename}\"")]
	UnknownInstrumentType {
		filename: String,
		token: String
	},

	#[error("Ambiguous symbol \"{symbol}\": it looks like a futures contract but the instrument type is {instrument_type}")]
	AmbiguousSymbol {
		symbol: String,
		instrument_type: InstrumentType
	},

	#[error("Malformed row on line {line}: expected {expected} columns, found {found}")]
	MalformedRow {
		line: u64,
		expected: usize,
		found: usize
	},

	#[error("Invalid value \"{value}\" in column \"{column}\" on line {line}")]
	InvalidNumericField {
		line: u64,
		column: &'static str,
		value: String
	},

	#[error("Invalid timestamp \"{value}\" on line {line}")]
	InvalidTimestamp {
		line: u64,
		value: String
	},

	#[error("Failed to read CSV data: {0}")]
	Csv(#[from] csv::Error)
}

impl ParseError {
	pub fn line(&self) -> Option<u64> {
		match self {
			ParseError::MalformedRow { line, .. } |
			ParseError::InvalidNumericField { line, .. } |
			ParseError::InvalidTimestamp { line, .. } => Some(*line),
			_ => None
		}
	}
}
