use std::collections::HashMap;
use configparser::ini::Ini;

pub const DATABASE_SECTION: &str = "database";

pub type IniMap = HashMap<String, HashMap<String, Option<String>>>;

// Everything but the global sections, i.e. one section per symbol
pub fn get_ini_sections(ini: &Ini) -> IniMap {
	let mut config_map = ini.get_map()
		.unwrap_or_default();
	config_map.remove(qm_common::config::DATA_SECTION);
	config_map.remove(DATABASE_SECTION);
	config_map.remove("default");
	config_map
}
