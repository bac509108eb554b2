use std::collections::HashSet;
use std::str::FromStr;
use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use configparser::ini::Ini;
use strum_macros::{Display, EnumString};
use crate::filename::DEFAULT_DELIMITER;
use crate::globex::{DEFAULT_YEAR_PIVOT, MONTH_CODES, YEAR_PIVOT_RANGE};

pub const DATA_SECTION: &str = "data";

// What to do when the TYPE token and the futures pattern disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AmbiguityPolicy {
	Fail,
	PreferType,
	PreferPattern
}

#[derive(Debug, Clone)]
pub struct ParserConfiguration {
	pub delimiter: char,
	pub month_codes: Vec<char>,
	pub year_pivot: u16,
	pub ambiguity: AmbiguityPolicy,
	pub known_tickers: HashSet<String>,
	pub time_zone: Tz
}

impl Default for ParserConfiguration {
	fn default() -> Self {
		ParserConfiguration {
			delimiter: DEFAULT_DELIMITER,
			month_codes: MONTH_CODES.to_vec(),
			year_pivot: DEFAULT_YEAR_PIVOT,
			ambiguity: AmbiguityPolicy::Fail,
			known_tickers: HashSet::new(),
			time_zone: Tz::UTC
		}
	}
}

impl ParserConfiguration {
	pub fn from_ini(ini: &Ini) -> Result<ParserConfiguration> {
		let defaults = ParserConfiguration::default();
		let delimiter = match ini.get(DATA_SECTION, "delimiter") {
			Some(string) => {
				let mut chars = string.chars();
				match (chars.next(), chars.next()) {
					(Some(delimiter), None) => delimiter,
					_ => bail!("The file name delimiter must be a single character, found \"{string}\"")
				}
			},
			None => defaults.delimiter
		};
		let month_codes = match get_list(ini, "month_codes") {
			Some(codes) => codes
				.iter()
				.map(|x| {
					let mut chars = x.chars();
					match (chars.next(), chars.next()) {
						(Some(code), None) => Ok(code.to_ascii_uppercase()),
						_ => Err(anyhow!("Invalid futures month code \"{x}\""))
					}
				})
				.collect::<Result<Vec<char>>>()?,
			None => defaults.month_codes
		};
		let year_pivot = get_value(ini, DATA_SECTION, "year_pivot")?.unwrap_or(defaults.year_pivot);
		if !YEAR_PIVOT_RANGE.contains(&year_pivot) {
			bail!("Year pivot {year_pivot} is out of range");
		}
		let ambiguity = get_value(ini, DATA_SECTION, "ambiguity")?.unwrap_or(defaults.ambiguity);
		let known_tickers = match get_list(ini, "known_tickers") {
			Some(tickers) => tickers
				.iter()
				.map(|x| x.to_uppercase())
				.collect(),
			None => defaults.known_tickers
		};
		let time_zone = get_value(ini, DATA_SECTION, "time_zone")?.unwrap_or(defaults.time_zone);
		let configuration = ParserConfiguration {
			delimiter,
			month_codes,
			year_pivot,
			ambiguity,
			known_tickers,
			time_zone
		};
		Ok(configuration)
	}
}

pub fn get_value<T>(ini: &Ini, section: &str, key: &str) -> Result<Option<T>>
where
	T: FromStr,
	T::Err: std::fmt::Display
{
	let Some(string) = ini.get(section, key) else {
		return Ok(None);
	};
	let value = string.trim().parse::<T>()
		.map_err(|error| anyhow!("{error}"))
		.with_context(|| format!("Failed to parse value \"{string}\" for key \"{key}\" in section \"{section}\" in configuration file"))?;
	Ok(Some(value))
}

fn get_list(ini: &Ini, key: &str) -> Option<Vec<String>> {
	ini.get(DATA_SECTION, key)
		.map(|x|
			x.split(",")
			.map(|x| x.trim().to_string())
			.filter(|x| !x.is_empty())
			.collect()
		)
}
