use strum_macros::{Display, EnumString};

// Values of the TYPE token in quote manager export file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum InstrumentType {
	#[strum(to_string = "STOCK", serialize = "STOCKS", serialize = "EQUITY")]
	Stock,
	#[strum(to_string = "FUTURE", serialize = "FUTURES")]
	Future,
	#[strum(to_string = "FOREX", serialize = "FX")]
	Forex,
	#[strum(to_string = "INDEX")]
	Index,
	#[strum(to_string = "OPTION")]
	Option,
	#[strum(to_string = "FUND")]
	Fund,
	#[strum(to_string = "CRYPTO")]
	Crypto,
	#[strum(to_string = "OTHER")]
	Other
}

impl InstrumentType {
	pub fn is_future(&self) -> bool {
		*self == InstrumentType::Future
	}
}
