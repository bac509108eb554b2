mod database;
mod ini_file;
mod loader;
mod overrides;

use std::path::{Path, PathBuf};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use configparser::ini::Ini;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use qm_common::config::{get_value, ParserConfiguration, DATA_SECTION};
use qm_common::get_ini;
use database::{BarRepository, DatabaseSettings, DEFAULT_BATCH_SIZE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TABLE, DEFAULT_USER};
use ini_file::DATABASE_SECTION;
use loader::{CsvLoader, DryRun, LoadSummary};
use overrides::get_symbol_overrides;

const DEFAULT_CONFIG: &str = "config/qm-loader.ini";
const PASSWORD_VARIABLE: &str = "PGPASSWORD";

#[derive(Parser, Debug)]
#[command(name = "qm-loader")]
#[command(about = "Inserts quote manager bar exports into a PostgreSQL table.")]
#[command(version)]
struct Arguments {
	/// A CSV file or a directory containing CSV files named SYMBOL-DATASOURCE-EXCHANGE-TYPE-TIMEFRAME-FIELD.csv
	path: PathBuf,

	/// Create the destination table before loading
	#[arg(long)]
	create: bool,

	/// Parse and validate all files without connecting to the database
	#[arg(long)]
	dry_run: bool,

	/// Report and skip files that fail to parse instead of aborting the run
	#[arg(long)]
	lenient: bool,

	/// Configuration file [default: config/qm-loader.ini]
	#[arg(short, long)]
	config: Option<String>,

	/// The hostname of the PostgreSQL server to connect to
	#[arg(short = 'H', long)]
	host: Option<String>,

	/// The port to connect to the PostgreSQL server on
	#[arg(short, long)]
	port: Option<u16>,

	/// The user to connect to the PostgreSQL server with
	#[arg(short, long)]
	user: Option<String>,

	/// The database to use on the PostgreSQL server
	#[arg(short = 'b', long)]
	database: Option<String>,

	/// Destination table
	#[arg(short, long)]
	table: Option<String>
}

struct LoadSettings {
	create_table: bool,
	strict: bool,
	batch_size: usize,
	table: String
}

#[tokio::main]
async fn main() -> Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();
	let arguments = Arguments::parse();
	let ini = load_configuration(arguments.config.as_deref())?;
	let settings = get_load_settings(&arguments, &ini)?;
	let configuration = ParserConfiguration::from_ini(&ini)?;
	let overrides = get_symbol_overrides(&ini)?;
	let loader = CsvLoader::new(&configuration, overrides, settings.strict)?;
	let paths = CsvLoader::get_input_files(&arguments.path)?;
	info!("Found {} input files in \"{}\"", paths.len(), arguments.path.display());
	let summary = if arguments.dry_run {
		if settings.create_table {
			warn!("Dry run, the table will not be created");
		}
		loader.run(&paths, &mut DryRun).await?
	} else {
		let password = get_password(&ini, std::env::var(PASSWORD_VARIABLE).ok(), prompt_password)?;
		let database_settings = get_database_settings(&arguments, &ini, password)?;
		let mut repository = BarRepository::connect(&database_settings, &settings.table, settings.batch_size).await?;
		let result = load(&loader, &paths, &mut repository, settings.create_table).await;
		repository.close().await;
		result?
	};
	if !summary.skipped.is_empty() {
		bail!("Skipped {} of {} files due to errors", summary.skipped.len(), paths.len());
	}
	Ok(())
}

async fn load(loader: &CsvLoader, paths: &[PathBuf], repository: &mut BarRepository, create_table: bool) -> Result<LoadSummary> {
	if create_table {
		repository.create_table().await?;
	}
	let summary = loader.run(paths, repository).await?;
	Ok(summary)
}

// An explicitly requested file must exist, the default one is optional
fn load_configuration(path: Option<&str>) -> Result<Ini> {
	match path {
		Some(path) => {
			if !Path::new(path).exists() {
				bail!("Unable to find configuration file \"{path}\"");
			}
			get_ini(path)
		},
		None => {
			if Path::new(DEFAULT_CONFIG).exists() {
				get_ini(DEFAULT_CONFIG)
			} else {
				Ok(Ini::new())
			}
		}
	}
}

fn get_load_settings(arguments: &Arguments, ini: &Ini) -> Result<LoadSettings> {
	let create_table = arguments.create || get_value(ini, DATA_SECTION, "create_table")?.unwrap_or(false);
	let strict = !arguments.lenient && get_value(ini, DATA_SECTION, "strict")?.unwrap_or(true);
	let batch_size = get_value(ini, DATA_SECTION, "batch_size")?.unwrap_or(DEFAULT_BATCH_SIZE);
	let table = match &arguments.table {
		Some(table) => table.clone(),
		None => ini.get(DATA_SECTION, "table").unwrap_or(DEFAULT_TABLE.to_string())
	};
	let settings = LoadSettings {
		create_table,
		strict,
		batch_size,
		table
	};
	Ok(settings)
}

fn get_database_settings(arguments: &Arguments, ini: &Ini, password: Option<String>) -> Result<DatabaseSettings> {
	let get_string = |key, default: Option<&str>| -> Result<String> {
		ini.get(DATABASE_SECTION, key)
			.or(default.map(|x| x.to_string()))
			.with_context(|| anyhow!("Missing value \"{key}\" in section \"{DATABASE_SECTION}\", pass it on the command line or add it to the configuration file"))
	};
	let host = match &arguments.host {
		Some(host) => host.clone(),
		None => get_string("host", Some(DEFAULT_HOST))?
	};
	let port = match arguments.port {
		Some(port) => port,
		None => get_value(ini, DATABASE_SECTION, "port")?.unwrap_or(DEFAULT_PORT)
	};
	let user = match &arguments.user {
		Some(user) => user.clone(),
		None => get_string("user", Some(DEFAULT_USER))?
	};
	let database = match &arguments.database {
		Some(database) => database.clone(),
		None => get_string("database", None)?
	};
	let settings = DatabaseSettings {
		host,
		port,
		user,
		password,
		database
	};
	Ok(settings)
}

// Environment first, then the configuration file, then the terminal
fn get_password<F>(ini: &Ini, variable: Option<String>, prompt: F) -> Result<Option<String>>
where
	F: FnOnce() -> Result<String>
{
	let password = match variable.or_else(|| ini.get(DATABASE_SECTION, "password")) {
		Some(password) => password,
		None => prompt()?
	};
	if password.is_empty() {
		Ok(None)
	} else {
		Ok(Some(password))
	}
}

fn prompt_password() -> Result<String> {
	rpassword::prompt_password("Password: ")
		.with_context(|| "Failed to read password from terminal")
}

#[cfg(test)]
mod tests {
	use std::fs;
	use super::*;

	fn load(source: &str) -> Ini {
		let mut ini = Ini::new();
		ini.read(source.to_string()).unwrap();
		ini
	}

	fn parse(arguments: &[&str]) -> Arguments {
		let mut command_line = vec!["qm-loader", "data"];
		command_line.extend_from_slice(arguments);
		Arguments::parse_from(command_line)
	}

	fn no_prompt() -> Result<String> {
		panic!("Password prompt was not expected");
	}

	#[test]
	fn defaults_without_configuration() {
		let settings = get_load_settings(&parse(&[]), &Ini::new()).unwrap();
		assert!(!settings.create_table);
		assert!(settings.strict);
		assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
		assert_eq!(settings.table, DEFAULT_TABLE);
	}

	#[test]
	fn configuration_values_apply_without_flags() {
		let ini = load("[data]\ncreate_table = true\nstrict = false\nbatch_size = 50\ntable = market.bars\n");
		let settings = get_load_settings(&parse(&[]), &ini).unwrap();
		assert!(settings.create_table);
		assert!(!settings.strict);
		assert_eq!(settings.batch_size, 50);
		assert_eq!(settings.table, "market.bars");
	}

	#[test]
	fn flags_override_configuration() {
		let ini = load("[data]\ncreate_table = false\nstrict = true\nbatch_size = 50\ntable = market.bars\n");
		let settings = get_load_settings(&parse(&["--create", "--lenient", "--table", "staging"]), &ini).unwrap();
		assert!(settings.create_table);
		assert!(!settings.strict);
		assert_eq!(settings.batch_size, 50);
		assert_eq!(settings.table, "staging");
	}

	#[test]
	fn invalid_configuration_values_are_errors() {
		let ini = load("[data]\nstrict = maybe\n");
		assert!(get_load_settings(&parse(&[]), &ini).is_err());
	}

	#[test]
	fn database_flags_override_configuration() {
		let ini = load("[database]\nhost = db.internal\nport = 6543\nuser = loader\ndatabase = market_data\n");
		let settings = get_database_settings(&parse(&["-H", "localhost", "-p", "7000"]), &ini, None).unwrap();
		assert_eq!(settings.host, "localhost");
		assert_eq!(settings.port, 7000);
		assert_eq!(settings.user, "loader");
		assert_eq!(settings.database, "market_data");
		let settings = get_database_settings(&parse(&["-u", "admin", "-b", "archive"]), &ini, None).unwrap();
		assert_eq!(settings.host, "db.internal");
		assert_eq!(settings.port, 6543);
		assert_eq!(settings.user, "admin");
		assert_eq!(settings.database, "archive");
	}

	#[test]
	fn database_defaults_and_required_name() {
		assert!(get_database_settings(&parse(&[]), &Ini::new(), None).is_err());
		let settings = get_database_settings(&parse(&["-b", "market_data"]), &Ini::new(), Some("secret".to_string())).unwrap();
		assert_eq!(settings.host, DEFAULT_HOST);
		assert_eq!(settings.port, DEFAULT_PORT);
		assert_eq!(settings.user, DEFAULT_USER);
		assert_eq!(settings.password.as_deref(), Some("secret"));
	}

	#[test]
	fn password_sources_in_order() {
		let ini = load("[database]\npassword = from_file\n");
		let password = get_password(&ini, Some("from_environment".to_string()), no_prompt).unwrap();
		assert_eq!(password.as_deref(), Some("from_environment"));
		let password = get_password(&ini, None, no_prompt).unwrap();
		assert_eq!(password.as_deref(), Some("from_file"));
		let password = get_password(&Ini::new(), None, || Ok("typed".to_string())).unwrap();
		assert_eq!(password.as_deref(), Some("typed"));
		let password = get_password(&Ini::new(), None, || Ok(String::new())).unwrap();
		assert!(password.is_none());
	}

	#[test]
	fn explicit_configuration_file_must_exist() {
		assert!(load_configuration(Some("/nonexistent/qm-loader.ini")).is_err());
		let directory = tempfile::tempdir().unwrap();
		let path = directory.path().join("qm-loader.ini");
		fs::write(&path, "[data]\ntable = staging\n").unwrap();
		let ini = load_configuration(path.to_str()).unwrap();
		assert_eq!(ini.get(DATA_SECTION, "table").as_deref(), Some("staging"));
	}

	#[test]
	fn default_configuration_file_is_optional() {
		assert!(load_configuration(None).is_ok());
	}

	#[test]
	fn sample_configuration_keeps_defaults() {
		let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../", "config/qm-loader.ini");
		let ini = load_configuration(Some(path)).unwrap();
		let configuration = ParserConfiguration::from_ini(&ini).unwrap();
		assert_eq!(configuration.time_zone, chrono_tz::Tz::UTC);
		assert_eq!(configuration.year_pivot, 2020);
		let settings = get_load_settings(&parse(&[]), &ini).unwrap();
		assert!(settings.strict);
		assert_eq!(settings.table, DEFAULT_TABLE);
		assert!(!get_symbol_overrides(&ini).unwrap().is_empty());
	}
}
