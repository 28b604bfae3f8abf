use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use sift_query::SearchOptions;
use sift_service::SiftService;

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Print the query document a request compiles to, without executing it.
	Compile {
		#[arg(long, short = 'r', value_name = "FILE")]
		request: PathBuf,
	},
	/// Execute a request and print the page of records.
	Run {
		#[arg(long, short = 'r', value_name = "FILE")]
		request: PathBuf,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;
	init_tracing(&config)?;
	let service = SiftService::new(config)?;

	match args.command {
		Command::Compile { request } => {
			let options = read_request(&request)?;
			let (relation, hybrid) = service.relation(&options).await?;
			let output = json!({
				"hybrid": hybrid,
				"document": relation.compiled().to_value(),
			});

			println!("{}", serde_json::to_string_pretty(&output)?);
		},
		Command::Run { request } => {
			let options = read_request(&request)?;
			let outcome = service.search(&options).await?;

			tracing::info!(
				total = outcome.total,
				returned = outcome.records.len(),
				"Search completed."
			);
			println!("{}", serde_json::to_string_pretty(&outcome)?);
		},
	}

	Ok(())
}

pub fn read_request(path: &Path) -> color_eyre::Result<SearchOptions> {
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read request file {}.", path.display()))?;
	let value: Value = serde_json::from_str(&raw)
		.wrap_err_with(|| format!("Request file {} is not valid JSON.", path.display()))?;

	if !value.is_object() {
		return Err(eyre::eyre!("Request file must contain a JSON object."));
	}

	Ok(SearchOptions::from_value(value)?)
}

fn init_tracing(config: &sift_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
	Ok(())
}
