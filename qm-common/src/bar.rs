use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use csv::StringRecord;
use crate::error::ParseError;
use crate::filename::FilenameMetadata;
use crate::instrument::InstrumentType;
use crate::resolver::ResolvedSymbol;

pub const COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];

const DATE_TIME_FORMATS: [&str; 5] = [
	"%Y-%m-%d %H:%M:%S",
	"%Y-%m-%d %H:%M",
	"%Y-%m-%dT%H:%M:%S",
	"%m/%d/%Y %H:%M:%S",
	"%m/%d/%Y %H:%M"
];

const DATE_FORMATS: [&str; 3] = [
	"%Y-%m-%d",
	"%m/%d/%Y",
	"%Y%m%d"
];

#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
	pub symbol: String,
	pub contract: Option<String>,
	pub data_source: String,
	pub exchange: String,
	pub instrument_type: InstrumentType,
	pub time_frame: String,
	pub field: String,
	pub time: DateTime<Utc>,
	pub open: f64,
	pub high: f64,
	pub low: f64,
	pub close: f64,
	pub volume: f64,
	// Physical line in the source file
	pub line: u64
}

pub struct RowMapper<'a> {
	metadata: &'a FilenameMetadata,
	resolved: &'a ResolvedSymbol,
	time_zone: Tz
}

impl<'a> RowMapper<'a> {
	pub fn new(metadata: &'a FilenameMetadata, resolved: &'a ResolvedSymbol, time_zone: Tz) -> RowMapper<'a> {
		RowMapper {
			metadata,
			resolved,
			time_zone
		}
	}

	pub fn map(&self, line: u64, record: &StringRecord) -> Result<BarRow, ParseError> {
		if record.len() != COLUMNS.len() {
			return Err(ParseError::MalformedRow {
				line,
				expected: COLUMNS.len(),
				found: record.len()
			});
		}
		let time_string = &record[0];
		let time = parse_date_time(time_string)
			.and_then(|x| self.time_zone.from_local_datetime(&x).earliest())
			.map(|x| x.with_timezone(&Utc))
			.ok_or_else(|| ParseError::InvalidTimestamp {
				line,
				value: time_string.to_string()
			})?;
		let get_number = |index: usize| -> Result<f64, ParseError> {
			let value = &record[index];
			match value.parse::<f64>() {
				Ok(number) if number.is_finite() => Ok(number),
				_ => Err(ParseError::InvalidNumericField {
					line,
					column: COLUMNS[index],
					value: value.to_string()
				})
			}
		};
		let bar = BarRow {
			symbol: self.resolved.base_symbol.clone(),
			contract: self.resolved.contract_code.map(|x| x.to_string()),
			data_source: self.metadata.data_source.clone(),
			exchange: self.metadata.exchange.clone(),
			instrument_type: self.metadata.instrument_type,
			time_frame: self.metadata.time_frame.clone(),
			field: self.metadata.field.clone(),
			time,
			open: get_number(1)?,
			high: get_number(2)?,
			low: get_number(3)?,
			close: get_number(4)?,
			volume: get_number(5)?,
			line
		};
		Ok(bar)
	}
}

pub fn parse_date_time(time_string: &str) -> Option<NaiveDateTime> {
	let time_string = time_string.trim();
	DATE_TIME_FORMATS
		.iter()
		.find_map(|format| NaiveDateTime::parse_from_str(time_string, format).ok())
		.or_else(|| DATE_FORMATS
			.iter()
			.find_map(|format| NaiveDate::parse_from_str(time_string, format).ok())
			.and_then(|date| date.and_hms_opt(0, 0, 0)))
}

// Exports may or may not start with a header line such as "Date,Open,High,Low,Close,Volume"
pub fn is_header(record: &StringRecord) -> bool {
	match (record.get(0), record.get(1)) {
		(Some(time), Some(open)) => parse_date_time(time).is_none() && open.trim().parse::<f64>().is_err(),
		_ => false
	}
}
