#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line entry point for site analysis.
//!
//! `site_engine analyze <ADDRESS>` prints a per-radius table (or the JSON
//! report with `--json`), `site_engine serve` starts the API server, and
//! running without a subcommand prompts for what to do.

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use site_engine_pipeline::config::parse_radii_list;
use site_engine_pipeline::events::AnalysisEvent;
use site_engine_pipeline::session::AnalysisSession;
use site_engine_pipeline::{AnalysisReport, AnalysisRequest, SiteAnalyzer};
use site_engine_server::ServerOptions;
use site_engine_server_models::ApiAnalysis;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "site_engine")]
#[command(about = "Demographic and safety analysis around a street address")]
struct Cli {
    /// Subcommand to execute. Prompts interactively when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the area around an address.
    Analyze {
        /// Street address, e.g. "1600 Pennsylvania Ave NW, Washington, DC".
        address: String,

        /// Comma-separated radii in miles (default from configuration).
        #[arg(long)]
        radii: Option<String>,

        /// Print the full report as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Start the API server (`BIND_ADDR` / `PORT`).
    Serve,
}

/// Top-level actions offered when no subcommand is given.
enum Action {
    Analyze,
    Serve,
}

impl Action {
    const ALL: &[Self] = &[Self::Analyze, Self::Serve];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Analyze => "Analyze an address",
            Self::Serve => "Start server",
        }
    }
}

fn parse_radii(value: Option<&str>) -> Result<Option<Vec<f64>>, Box<dyn std::error::Error>> {
    value
        .map(|v| {
            parse_radii_list(v).ok_or_else(|| -> Box<dyn std::error::Error> {
                format!("Invalid radii list: '{v}'").into()
            })
        })
        .transpose()
}

fn print_progress(event: &AnalysisEvent) {
    match event {
        AnalysisEvent::Started { radii, .. } => log::info!("Analyzing radii {radii:?}"),
        AnalysisEvent::Geocoded { label, center } => log::info!(
            "Located {label} ({:.5}, {:.5})",
            center.latitude,
            center.longitude
        ),
        AnalysisEvent::TractsResolved { count } => log::info!("{count} census tracts in range"),
        AnalysisEvent::DemographicsFetched {
            survey_year,
            records,
            failed_counties,
        } => {
            if failed_counties.is_empty() {
                log::info!("ACS {survey_year}: {records} tract records");
            } else {
                log::warn!(
                    "ACS {survey_year}: {records} tract records, missing counties {}",
                    failed_counties.join(", ")
                );
            }
        }
        AnalysisEvent::DataReady { .. } => log::info!("Report ready"),
        AnalysisEvent::Error { message } => log::error!("{message}"),
    }
}

async fn run_analysis(
    analyzer: &SiteAnalyzer,
    request: AnalysisRequest,
) -> Result<AnalysisReport, Box<dyn std::error::Error>> {
    let session = AnalysisSession::new();
    let (tx, mut rx) = mpsc::channel(32);

    let run = async move {
        let tx = tx;
        analyzer.analyze(&request, &session, Some(&tx)).await
    };
    let progress = async {
        while let Some(event) = rx.recv().await {
            print_progress(&event);
        }
    };

    let (result, ()) = tokio::join!(run, progress);
    Ok(result?)
}

fn print_table(analysis: &ApiAnalysis) {
    println!();
    println!("{}", analysis.label);
    println!(
        "ACS {} vs {} | {} tracts",
        analysis.survey_years.current, analysis.survey_years.baseline, analysis.tract_count
    );
    if !analysis.failed_counties.is_empty() {
        println!("Missing county data: {}", analysis.failed_counties.join(", "));
    }
    println!();

    for card in &analysis.kpis {
        println!("  {:<36} {:>12}", card.label, card.value);
    }
    println!();

    println!(
        "{:<8} {:>7} {:>11} {:>8} {:>10} {:>8} {:>11} {:>6} {:>15} {:>6} {:>6}",
        "Radius", "Tracts", "Population", "Growth", "Income", "Growth", "Home value", "Built",
        "Rent / Own", "Veh", "HH"
    );
    for row in &analysis.rows {
        println!(
            "{:<8} {:>7} {:>11} {:>8} {:>10} {:>8} {:>11} {:>6} {:>15} {:>6} {:>6}",
            row.radius_label,
            row.tract_count,
            row.population_near_term,
            row.population_growth,
            row.median_income,
            row.income_growth,
            row.median_home_value,
            row.median_year_built,
            row.rent_vs_own,
            row.vehicles_per_household,
            row.avg_household_size,
        );
    }

    if !analysis.age_chart.is_empty() {
        println!();
        for bar in &analysis.age_chart {
            println!("  {:<10} {:>8}", bar.name, bar.value);
        }
    }

    let intel = &analysis.intel;
    println!();
    println!(
        "Safety: overall {} (violent {}, property {}, other {})",
        intel.intel.grades.overall,
        intel.intel.grades.violent,
        intel.intel.grades.property,
        intel.intel.grades.other
    );
    println!("{}", intel.intel.safety_summary);
}

async fn analyze(
    address: String,
    radii: Option<Vec<f64>>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let analyzer = SiteAnalyzer::from_env()?;
    let request = AnalysisRequest { address, radii };

    let report = run_analysis(&analyzer, request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_table(&ApiAnalysis::from(&report));
    }

    Ok(())
}

async fn analyze_interactive() -> Result<(), Box<dyn std::error::Error>> {
    let address: String = Input::new()
        .with_prompt("Address")
        .validate_with(|input: &String| -> Result<(), String> {
            site_engine_pipeline::validate_address(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    let radii: String = Input::new()
        .with_prompt("Radii in miles (comma-separated)")
        .default("1,3,5".to_string())
        .interact_text()?;

    analyze(address, parse_radii(Some(&radii))?, false).await
}

/// Runs the server on its own actix system so it does not nest inside the
/// tokio runtime of `main`.
async fn serve(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(async move {
            if interactive {
                site_engine_server::interactive::run().await
            } else {
                site_engine_server::serve(ServerOptions::from_env()).await
            }
        })
    })
    .await??;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Analyze {
            address,
            radii,
            json,
        }) => analyze(address, parse_radii(radii.as_deref())?, json).await?,
        Some(Commands::Serve) => serve(false).await?,
        None => {
            println!("Site Engine");
            println!();

            let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

            let idx = Select::new()
                .with_prompt("What would you like to do?")
                .items(&labels)
                .default(0)
                .interact()?;

            match Action::ALL[idx] {
                Action::Analyze => analyze_interactive().await?,
                Action::Serve => serve(true).await?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_radii_flag() {
        assert_eq!(parse_radii(None).unwrap(), None);
        assert_eq!(
            parse_radii(Some("1, 3,5")).unwrap(),
            Some(vec![1.0, 3.0, 5.0])
        );
        assert!(parse_radii(Some("one,two")).is_err());
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["site_engine", "analyze", "1 Main Street", "--radii", "2", "--json"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Analyze { ref address, ref radii, json: true })
                if address == "1 Main Street" && radii.as_deref() == Some("2")
        ));

        let cli = Cli::try_parse_from(["site_engine"]).unwrap();
        assert!(cli.command.is_none());
    }
}
