use std::cmp::Ordering;
use std::fmt;
use std::ops::RangeInclusive;
use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;

pub const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];
pub const DEFAULT_YEAR_PIVOT: u16 = 2020;
pub const YEAR_PIVOT_RANGE: RangeInclusive<u16> = 1900..=2999;

lazy_static! {
	static ref GLOBEX_REGEX: Regex = Regex::new("^([A-Z]{1,3})([FGHJKMNQUVXZ])([0-9]{1,2})$").unwrap();
}

// Month letter followed by a canonical two-digit year, e.g. H23
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractCode {
	pub month: char,
	pub year: u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobexMatch {
	pub root: String,
	pub month: char,
	pub year_digits: String
}

#[derive(Debug, Clone)]
pub struct GlobexPattern {
	regex: Regex
}

// Maps a month code from the standard set to its calendar month
pub fn month_from_code(code: char) -> Option<u8> {
	MONTH_CODES
		.iter()
		.position(|x| *x == code.to_ascii_uppercase())
		.map(|index| index as u8 + 1)
}

impl GlobexPattern {
	pub fn new(month_codes: &[char]) -> Result<GlobexPattern> {
		if month_codes.is_empty() {
			bail!("At least one futures month code is required");
		}
		if let Some(code) = month_codes.iter().find(|x| !x.is_ascii_uppercase()) {
			bail!("Invalid futures month code '{code}'");
		}
		let mut sorted_codes = month_codes.to_vec();
		sorted_codes.sort();
		sorted_codes.dedup();
		if sorted_codes == MONTH_CODES {
			return Ok(GlobexPattern::default());
		}
		let codes: String = sorted_codes.iter().collect();
		let regex = Regex::new(format!("^([A-Z]{{1,3}})([{codes}])([0-9]{{1,2}})$").as_str())
			.with_context(|| "Failed to build futures symbol pattern")?;
		Ok(GlobexPattern {
			regex
		})
	}

	pub fn captures(&self, symbol: &str) -> Option<GlobexMatch> {
		let captures = self.regex.captures(symbol)?;
		let get_capture = |i: usize| captures[i].to_string();
		let month = captures[2].chars().next()?;
		Some(GlobexMatch {
			root: get_capture(1),
			month,
			year_digits: get_capture(3)
		})
	}

	pub fn is_match(&self, symbol: &str) -> bool {
		self.regex.is_match(symbol)
	}
}

impl Default for GlobexPattern {
	fn default() -> Self {
		GlobexPattern {
			regex: GLOBEX_REGEX.clone()
		}
	}
}

impl ContractCode {
	/*
	Two-digit years are kept as they are.
	A single digit d is mapped to the first year Y >= year_pivot with Y % 10 == d,
	so with a pivot of 2020 "3" becomes 2023 and with a pivot of 2025 it becomes 2033.
	*/
	pub fn new(month: char, year_digits: &str, year_pivot: u16) -> Option<ContractCode> {
		let year = match year_digits.len() {
			1 | 2 => year_digits.parse::<u16>().ok()?,
			_ => return None
		};
		let normalized_year = if year_digits.len() == 1 {
			let mut full_year = (year_pivot - year_pivot % 10).checked_add(year)?;
			if full_year < year_pivot {
				full_year = full_year.checked_add(10)?;
			}
			full_year % 100
		} else {
			year
		};
		let contract_code = ContractCode {
			month: month.to_ascii_uppercase(),
			year: normalized_year as u8
		};
		Some(contract_code)
	}
}

impl fmt::Display for ContractCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{:02}", self.month, self.year)
	}
}

impl Ord for ContractCode {
	fn cmp(&self, other: &Self) -> Ordering {
		self.year
			.cmp(&other.year)
			.then_with(|| month_from_code(self.month).cmp(&month_from_code(other.month)))
	}
}

impl PartialOrd for ContractCode {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
