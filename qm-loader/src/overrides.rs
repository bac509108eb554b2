use std::str::FromStr;
use anyhow::{anyhow, Context, Result};
use configparser::ini::Ini;
use qm_common::resolver::{SymbolOverride, SymbolOverrides};
use crate::ini_file::get_ini_sections;

const RESOLVE_KEY: &str = "resolve";

/*
Per-symbol sections settle disagreements between the TYPE token and the futures pattern:

[ESH23]
resolve = future
*/
pub fn get_symbol_overrides(ini: &Ini) -> Result<SymbolOverrides> {
	let mut overrides = SymbolOverrides::new();
	for (symbol, map) in get_ini_sections(ini) {
		let Some(Some(value)) = map.get(RESOLVE_KEY) else {
			continue;
		};
		let symbol_override = SymbolOverride::from_str(value.trim())
			.map_err(|error| anyhow!("{error}"))
			.with_context(|| format!("Invalid value \"{value}\" for key \"{RESOLVE_KEY}\" in section \"{symbol}\" in configuration file"))?;
		overrides.insert(symbol.to_uppercase(), symbol_override);
	}
	Ok(overrides)
}
