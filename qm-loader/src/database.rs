use std::time::Duration;
use anyhow::{bail, Result};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use qm_common::bar::BarRow;
use crate::loader::{BarFile, BarSink, LoadError};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_USER: &str = "postgres";
pub const DEFAULT_TABLE: &str = "bars";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

const COLUMNS: [&str; 13] = [
	"symbol",
	"contract",
	"data_source",
	"exchange",
	"instrument_type",
	"time_frame",
	"field",
	"time",
	"open",
	"high",
	"low",
	"close",
	"volume"
];

// PostgreSQL refuses statements with more bind parameters than this
const MAX_BIND_PARAMETERS: usize = 65535;

lazy_static! {
	static ref TABLE_NAME_REGEX: Regex = Regex::new("^[A-Za-z_][A-Za-z0-9_]*(\\.[A-Za-z_][A-Za-z0-9_]*)?$").unwrap();
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
	pub host: String,
	pub port: u16,
	pub user: String,
	pub password: Option<String>,
	pub database: String
}

pub struct BarRepository {
	pool: PgPool,
	table: String,
	batch_size: usize
}

impl DatabaseSettings {
	fn connect_options(&self) -> PgConnectOptions {
		let options = PgConnectOptions::new()
			.host(&self.host)
			.port(self.port)
			.username(&self.user)
			.database(&self.database);
		match &self.password {
			Some(password) => options.password(password),
			None => options
		}
	}
}

impl BarRepository {
	pub async fn connect(settings: &DatabaseSettings, table: &str, batch_size: usize) -> Result<BarRepository> {
		validate_table_name(table)?;
		info!(
			"Connecting to PostgreSQL {}:{} as user \"{}\", database \"{}\"",
			settings.host,
			settings.port,
			settings.user,
			settings.database
		);
		let pool = PgPoolOptions::new()
			.max_connections(1)
			.acquire_timeout(Duration::from_secs(30))
			.connect_with(settings.connect_options())
			.await?;
		let repository = BarRepository {
			pool,
			table: table.to_string(),
			batch_size: clamp_batch_size(batch_size)
		};
		Ok(repository)
	}

	pub async fn create_table(&self) -> Result<(), sqlx::Error> {
		sqlx::query(&create_table_sql(&self.table))
			.execute(&self.pool)
			.await?;
		info!("Created table \"{}\" if it did not exist", self.table);
		Ok(())
	}

	// All batches of a file share one transaction so a file is either fully loaded or not at all
	pub async fn insert_bars(&self, bars: &[BarRow]) -> Result<usize, sqlx::Error> {
		if bars.is_empty() {
			return Ok(0);
		}
		let mut transaction = self.pool.begin().await?;
		let mut inserted = 0;
		for chunk in bars.chunks(self.batch_size) {
			let result = build_insert(&self.table, chunk)
				.build()
				.execute(&mut *transaction)
				.await?;
			inserted += result.rows_affected() as usize;
		}
		transaction.commit().await?;
		debug!("Inserted {} rows into \"{}\"", inserted, self.table);
		Ok(inserted)
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}

impl BarSink for BarRepository {
	async fn write(&mut self, file: &BarFile) -> Result<usize, LoadError> {
		let inserted = self.insert_bars(&file.bars).await?;
		Ok(inserted)
	}
}

pub fn validate_table_name(table: &str) -> Result<()> {
	if !TABLE_NAME_REGEX.is_match(table) {
		bail!("Invalid table name \"{table}\"");
	}
	Ok(())
}

fn clamp_batch_size(batch_size: usize) -> usize {
	batch_size.clamp(1, MAX_BIND_PARAMETERS / COLUMNS.len())
}

fn create_table_sql(table: &str) -> String {
	format!(
		r#"
		CREATE TABLE IF NOT EXISTS {table} (
			symbol TEXT NOT NULL,
			contract TEXT,
			data_source TEXT NOT NULL,
			exchange TEXT NOT NULL,
			instrument_type TEXT NOT NULL,
			time_frame TEXT NOT NULL,
			field TEXT NOT NULL,
			time TIMESTAMPTZ NOT NULL,
			open DOUBLE PRECISION NOT NULL,
			high DOUBLE PRECISION NOT NULL,
			low DOUBLE PRECISION NOT NULL,
			close DOUBLE PRECISION NOT NULL,
			volume DOUBLE PRECISION NOT NULL
		)
		"#
	)
}

fn build_insert<'a>(table: &str, bars: &'a [BarRow]) -> QueryBuilder<'a, Postgres> {
	let columns = COLUMNS.join(", ");
	let mut builder = QueryBuilder::new(format!("INSERT INTO {table} ({columns}) "));
	builder.push_values(bars, |mut row, bar| {
		row
			.push_bind(&bar.symbol)
			.push_bind(&bar.contract)
			.push_bind(&bar.data_source)
			.push_bind(&bar.exchange)
			.push_bind(bar.instrument_type.to_string())
			.push_bind(&bar.time_frame)
			.push_bind(&bar.field)
			.push_bind(bar.time)
			.push_bind(bar.open)
			.push_bind(bar.high)
			.push_bind(bar.low)
			.push_bind(bar.close)
			.push_bind(bar.volume);
	});
	builder
}
