use std::path::Path;
use std::str::FromStr;
use crate::error::ParseError;
use crate::instrument::InstrumentType;

pub const DEFAULT_DELIMITER: char = '-';

const TOKEN_NAMES: [&str; 6] = ["symbol", "data source", "exchange", "type", "time frame", "field"];

/*
Metadata encoded in the name of an exported file:
SYMBOL-DATASOURCE-EXCHANGE-TYPE-TIMEFRAME-FIELD.csv
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameMetadata {
	pub symbol: String,
	pub data_source: String,
	pub exchange: String,
	pub instrument_type: InstrumentType,
	pub instrument_token: String,
	pub time_frame: String,
	pub field: String
}

#[derive(Debug, Clone)]
pub struct FilenameParser {
	delimiter: char
}

impl FilenameParser {
	pub fn new(delimiter: char) -> FilenameParser {
		FilenameParser {
			delimiter
		}
	}

	pub fn delimiter(&self) -> char {
		self.delimiter
	}

	pub fn parse(&self, filename: &str) -> Result<FilenameMetadata, ParseError> {
		let malformed = |reason: String| ParseError::MalformedFilename {
			filename: filename.to_string(),
			reason
		};
		let stem = Path::new(filename)
			.file_stem()
			.and_then(|x| x.to_str())
			.ok_or_else(|| malformed("unable to determine file stem".to_string()))?;
		let tokens: Vec<&str> = stem
			.split(self.delimiter)
			.map(|x| x.trim())
			.collect();
		if tokens.len() != TOKEN_NAMES.len() {
			return Err(malformed(format!(
				"expected {} tokens separated by '{}', found {}",
				TOKEN_NAMES.len(),
				self.delimiter,
				tokens.len()
			)));
		}
		if let Some(index) = tokens.iter().position(|x| x.is_empty()) {
			return Err(malformed(format!("empty {} token", TOKEN_NAMES[index])));
		}
		let instrument_token = tokens[3];
		let instrument_type = InstrumentType::from_str(instrument_token)
			.map_err(|_| ParseError::UnknownInstrumentType {
				filename: filename.to_string(),
				token: instrument_token.to_string()
			})?;
		let metadata = FilenameMetadata {
			symbol: tokens[0].to_string(),
			data_source: tokens[1].to_string(),
			exchange: tokens[2].to_string(),
			instrument_type,
			instrument_token: instrument_token.to_string(),
			time_frame: tokens[4].to_string(),
			field: tokens[5].to_string()
		};
		Ok(metadata)
	}
}

impl Default for FilenameParser {
	fn default() -> Self {
		FilenameParser::new(DEFAULT_DELIMITER)
	}
}

impl FilenameMetadata {
	pub fn tokens(&self) -> [&str; 6] {
		[
			self.symbol.as_str(),
			self.data_source.as_str(),
			self.exchange.as_str(),
			self.instrument_token.as_str(),
			self.time_frame.as_str(),
			self.field.as_str()
		]
	}
}
