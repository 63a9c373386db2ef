use crate::market::PriceHistory;
use crate::scorer::Scorer;
use crate::store::Store;
use clap::{App, Arg};
use log::{info, Level};
use std::io;
use std::str::FromStr;

mod classifier;
mod config;
mod dates;
mod error;
mod market;
mod payload;
mod scorer;
mod server;
mod store;

fn cmd_line_config() -> String {
    let matches = App::new("stock-sibyl")
        .version("0.1")
        .about("Stock dashboard scoring submitted news for pertinency & market sentiment")
        .author("Sam De Roeck")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("config-file")
                .takes_value(true)
                .help("Configuration file"),
        )
        .get_matches();

    String::from(matches.value_of("config").unwrap_or("config.toml").trim())
}

fn startup_error<E: ToString>(err: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_rt::main]
async fn main() -> io::Result<()> {
    // Fetch configuration
    let config_uri = cmd_line_config();
    let config = config::load_config(&config_uri).map_err(startup_error)?;

    // Initialize logging
    let level = Level::from_str(&config.logging.level).unwrap_or(Level::Info);
    simple_logger::init_with_level(level).map_err(startup_error)?;

    let store = Store::open(&config.storage.path).map_err(startup_error)?;
    info!("Using database {}", config.storage.path.display());

    let classifier = classifier::from_config(&config.classifier).map_err(startup_error)?;
    info!("Using {:?} sentiment classifier", config.classifier.kind);
    let scorer = Scorer::new(classifier, &config.scorer);
    let market = PriceHistory::new(config.market_data.clone()).map_err(startup_error)?;

    info!("Starting server with\n{}", config.server);
    server::run(config.server, config.dashboard, store, scorer, market)?.await
}
