use std::collections::{HashMap, HashSet};
use std::fmt;
use anyhow::{bail, Result};
use strum_macros::{Display, EnumString};
use crate::config::{AmbiguityPolicy, ParserConfiguration};
use crate::error::ParseError;
use crate::globex::{ContractCode, GlobexMatch, GlobexPattern, YEAR_PIVOT_RANGE};
use crate::instrument::InstrumentType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
	pub base_symbol: String,
	pub contract_code: Option<ContractCode>
}

// Per-symbol answer to a TYPE/pattern disagreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SymbolOverride {
	Future,
	Literal
}

pub type SymbolOverrides = HashMap<String, SymbolOverride>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
	Split,
	Literal,
	Ambiguous
}

pub struct FuturesSymbolResolver {
	pattern: GlobexPattern,
	year_pivot: u16,
	ambiguity: AmbiguityPolicy,
	known_tickers: HashSet<String>,
	overrides: SymbolOverrides
}

impl FuturesSymbolResolver {
	pub fn new(configuration: &ParserConfiguration, overrides: SymbolOverrides) -> Result<FuturesSymbolResolver> {
		if !YEAR_PIVOT_RANGE.contains(&configuration.year_pivot) {
			bail!("Year pivot {} is out of range", configuration.year_pivot);
		}
		let pattern = GlobexPattern::new(&configuration.month_codes)?;
		let resolver = FuturesSymbolResolver {
			pattern,
			year_pivot: configuration.year_pivot,
			ambiguity: configuration.ambiguity,
			known_tickers: configuration.known_tickers.clone(),
			overrides
		};
		Ok(resolver)
	}

	pub fn resolve(&self, symbol: &str, instrument_type: InstrumentType) -> Result<ResolvedSymbol, ParseError> {
		let normalized = symbol.trim().to_uppercase();
		let globex = self.pattern.captures(&normalized);
		let decision = decide(
			instrument_type,
			globex.is_some(),
			self.known_tickers.contains(&normalized),
			self.overrides.get(&normalized).copied(),
			self.ambiguity
		);
		match (decision, globex) {
			(Decision::Split, Some(globex)) => Ok(self.split(globex)),
			(Decision::Ambiguous, _) => Err(ParseError::AmbiguousSymbol {
				symbol: symbol.to_string(),
				instrument_type
			}),
			_ => Ok(ResolvedSymbol::literal(symbol.trim()))
		}
	}

	fn split(&self, globex: GlobexMatch) -> ResolvedSymbol {
		// The pattern guarantees one or two digits
		match ContractCode::new(globex.month, &globex.year_digits, self.year_pivot) {
			Some(contract_code) => ResolvedSymbol {
				base_symbol: globex.root,
				contract_code: Some(contract_code)
			},
			None => ResolvedSymbol::literal(&format!("{}{}{}", globex.root, globex.month, globex.year_digits))
		}
	}
}

/*
TYPE says FUTURE: trust it, split whenever the pattern matches.
Otherwise the pattern is only a heuristic. No match or a known non-futures ticker means both signals agree.
A match on anything else is a disagreement, settled by a per-symbol override or the configured policy.
*/
fn decide(
	instrument_type: InstrumentType,
	pattern_match: bool,
	known_ticker: bool,
	symbol_override: Option<SymbolOverride>,
	ambiguity: AmbiguityPolicy
) -> Decision {
	if !pattern_match {
		return Decision::Literal;
	}
	if instrument_type.is_future() {
		return Decision::Split;
	}
	if known_ticker {
		return Decision::Literal;
	}
	match (symbol_override, ambiguity) {
		(Some(SymbolOverride::Future), _) => Decision::Split,
		(Some(SymbolOverride::Literal), _) => Decision::Literal,
		(None, AmbiguityPolicy::PreferPattern) => Decision::Split,
		(None, AmbiguityPolicy::PreferType) => Decision::Literal,
		(None, AmbiguityPolicy::Fail) => Decision::Ambiguous
	}
}

impl ResolvedSymbol {
	pub fn literal(symbol: &str) -> ResolvedSymbol {
		ResolvedSymbol {
			base_symbol: symbol.to_string(),
			contract_code: None
		}
	}

	pub fn is_contract(&self) -> bool {
		self.contract_code.is_some()
	}
}

impl fmt::Display for ResolvedSymbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.contract_code {
			Some(contract_code) => write!(f, "{}{}", self.base_symbol, contract_code),
			None => write!(f, "{}", self.base_symbol)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::globex::MONTH_CODES;

	fn get_resolver(configuration: ParserConfiguration) -> FuturesSymbolResolver {
		FuturesSymbolResolver::new(&configuration, SymbolOverrides::new()).unwrap()
	}

	fn default_resolver() -> FuturesSymbolResolver {
		get_resolver(ParserConfiguration::default())
	}

	#[test]
	fn splits_future_contracts() {
		let resolved = default_resolver().resolve("ESH23", InstrumentType::Future).unwrap();
		assert_eq!(resolved.base_symbol, "ES");
		assert_eq!(resolved.contract_code.unwrap().to_string(), "H23");
		assert_eq!(resolved.to_string(), "ESH23");
	}

	#[test]
	fn future_without_contract_code_is_base_symbol() {
		let resolved = default_resolver().resolve("ES", InstrumentType::Future).unwrap();
		assert_eq!(resolved, ResolvedSymbol::literal("ES"));
	}

	#[test]
	fn lower_case_symbols_are_normalized() {
		let resolved = default_resolver().resolve("clz4", InstrumentType::Future).unwrap();
		assert_eq!(resolved.base_symbol, "CL");
		assert_eq!(resolved.contract_code.unwrap().to_string(), "Z24");
	}

	#[test]
	fn non_futures_are_left_alone() {
		let resolver = default_resolver();
		for (symbol, instrument_type) in [
			("AAPL", InstrumentType::Stock),
			("EURUSD", InstrumentType::Forex),
			("SPX", InstrumentType::Index),
			("BRK.B", InstrumentType::Stock),
			("ES", InstrumentType::Future)
		] {
			let resolved = resolver.resolve(symbol, instrument_type).unwrap();
			assert_eq!(resolved.base_symbol, symbol);
			assert!(!resolved.is_contract());
			let again = resolver.resolve(&resolved.base_symbol, instrument_type).unwrap();
			assert_eq!(again, resolved);
		}
	}

	#[test]
	fn synthetic_contracts_split_into_root_and_code() {
		let resolver = default_resolver();
		for root in ["E", "ES", "MNQ"] {
			for month in MONTH_CODES {
				for (year, expected) in [("24", "24"), ("7", "27"), ("0", "20")] {
					let symbol = format!("{root}{month}{year}");
					let resolved = resolver.resolve(&symbol, InstrumentType::Future).unwrap();
					assert_eq!(resolved.base_symbol, root);
					assert_eq!(resolved.contract_code.unwrap().to_string(), format!("{month}{expected}"));
				}
			}
		}
	}

	#[test]
	fn disagreement_fails_by_default() {
		let error = default_resolver().resolve("ESH23", InstrumentType::Stock).unwrap_err();
		match error {
			ParseError::AmbiguousSymbol { symbol, instrument_type } => {
				assert_eq!(symbol, "ESH23");
				assert_eq!(instrument_type, InstrumentType::Stock);
			},
			other => panic!("Unexpected error: {other:?}")
		}
	}

	#[test]
	fn known_tickers_are_not_contracts() {
		let mut configuration = ParserConfiguration::default();
		configuration.known_tickers.insert("BAH9".to_string());
		let resolved = get_resolver(configuration).resolve("BAH9", InstrumentType::Stock).unwrap();
		assert_eq!(resolved, ResolvedSymbol::literal("BAH9"));
	}

	#[test]
	fn known_tickers_do_not_override_future_type() {
		let mut configuration = ParserConfiguration::default();
		configuration.known_tickers.insert("ESH23".to_string());
		let resolved = get_resolver(configuration).resolve("ESH23", InstrumentType::Future).unwrap();
		assert_eq!(resolved.base_symbol, "ES");
	}

	#[test]
	fn ambiguity_policies() {
		let mut configuration = ParserConfiguration::default();
		configuration.ambiguity = AmbiguityPolicy::PreferType;
		let resolved = get_resolver(configuration.clone()).resolve("ESH23", InstrumentType::Other).unwrap();
		assert_eq!(resolved, ResolvedSymbol::literal("ESH23"));
		configuration.ambiguity = AmbiguityPolicy::PreferPattern;
		let resolved = get_resolver(configuration).resolve("ESH23", InstrumentType::Other).unwrap();
		assert_eq!(resolved.base_symbol, "ES");
		assert_eq!(resolved.contract_code.unwrap().to_string(), "H23");
	}

	#[test]
	fn overrides_beat_policy() {
		let mut overrides = SymbolOverrides::new();
		overrides.insert("ESH23".to_string(), SymbolOverride::Future);
		overrides.insert("GEZ5".to_string(), SymbolOverride::Literal);
		let resolver = FuturesSymbolResolver::new(&ParserConfiguration::default(), overrides).unwrap();
		let resolved = resolver.resolve("ESH23", InstrumentType::Stock).unwrap();
		assert_eq!(resolved.base_symbol, "ES");
		let resolved = resolver.resolve("GEZ5", InstrumentType::Stock).unwrap();
		assert_eq!(resolved, ResolvedSymbol::literal("GEZ5"));
		assert!(resolver.resolve("CLF24", InstrumentType::Stock).is_err());
	}

	#[test]
	fn year_pivot_is_configurable() {
		let mut configuration = ParserConfiguration::default();
		configuration.year_pivot = 2025;
		let resolver = get_resolver(configuration);
		let resolved = resolver.resolve("ESH3", InstrumentType::Future).unwrap();
		assert_eq!(resolved.contract_code.unwrap().to_string(), "H33");
		let resolved = resolver.resolve("ESH7", InstrumentType::Future).unwrap();
		assert_eq!(resolved.contract_code.unwrap().to_string(), "H27");
	}

	#[test]
	fn rejects_year_pivot_out_of_range() {
		let mut configuration = ParserConfiguration::default();
		configuration.year_pivot = u16::MAX;
		assert!(FuturesSymbolResolver::new(&configuration, SymbolOverrides::new()).is_err());
		configuration.year_pivot = 1899;
		assert!(FuturesSymbolResolver::new(&configuration, SymbolOverrides::new()).is_err());
	}
}
