use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = sift_search::Args::parse();
	sift_search::run(args).await
}
