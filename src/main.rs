//! City Weather CLI - Current weather for Swedish cities
//!
//! A prompt-driven terminal tool that prints temperature, wind speed and
//! humidity for a chosen city, caching results on disk between runs.

use std::error::Error;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader};

use cityweather::cache::CacheStore;
use cityweather::cli::{Cli, Mode, Settings};
use cityweather::data::{bootstrap_cities, WeatherClient};
use cityweather::freshness::FreshnessPolicy;
use cityweather::logging;
use cityweather::registry::CityRegistry;
use cityweather::report;

/// Input that ends the interactive loop
const QUIT_COMMAND: &str = "q";

type Policy = FreshnessPolicy<WeatherClient>;

/// Resolves and prints the weather for the named city
///
/// # Returns
/// * `Ok(false)` if no city has that name
/// * `Ok(true)` once the weather has been printed
/// * `Err` if the weather could not be resolved
async fn show_weather(
    registry: &mut CityRegistry,
    policy: &Policy,
    name: &str,
) -> Result<bool, Box<dyn Error>> {
    let Some(record) = registry.find_by_name_mut(name) else {
        return Ok(false);
    };

    println!("\nYou selected: {}", record.name().bold());
    let resolution = policy.resolve(record).await?;
    println!("{}", report::resolution_note(record.name(), resolution).dim());
    print!("{}", report::weather_report(record));
    Ok(true)
}

/// Prompts for cities until the user quits or stdin closes
async fn run_interactive(registry: &mut CityRegistry, policy: &Policy) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", report::city_list(registry));
        print!("{}", "Select a city: ".cyan());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };
        let choice = line.trim();

        if choice == QUIT_COMMAND {
            println!("Goodbye.");
            return Ok(());
        }
        if !show_weather(registry, policy, choice).await? {
            println!("\n{}", "City not found.".yellow());
        }
    }
}

async fn run(settings: Settings) -> Result<ExitCode, Box<dyn Error>> {
    let store = CacheStore::new(&settings.cache_dir);
    let mut registry = CityRegistry::init(&store, &settings.api_url, bootstrap_cities());
    let policy = FreshnessPolicy::with_max_age(store, WeatherClient::new()?, settings.max_age);

    match settings.mode {
        Mode::List => {
            print!("{}", report::city_list(&registry));
            Ok(ExitCode::SUCCESS)
        }
        Mode::Lookup(name) => {
            if show_weather(&mut registry, &policy, &name).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("City not found: {name}");
                Ok(ExitCode::FAILURE)
            }
        }
        Mode::Interactive => {
            run_interactive(&mut registry, &policy).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{} {err}", "error:".red());
            return ExitCode::from(2);
        }
    };

    match run(settings).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err}", "error:".red());
            ExitCode::FAILURE
        }
    }
}
