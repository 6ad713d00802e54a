//! Satellite acquisition CLI.
//!
//! - `profiles`: dump the satellite registry
//! - `search`: resolve bands, plan the output grid and list matching scenes
//! - `save-params`: validate a save configuration and preview artifact paths
//!
//! Exits with status 2 when the query itself is invalid (unknown satellite
//! or band, unsupported capability) and 1 on any other failure.

mod args;
mod report;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use acquisition::{AcquisitionConfig, SpatialPlan};
use catalog::{profile, satellites, BandResolver, CatalogSession, SearchCoordinator};
use sat_common::{AcquisitionError, WithQueryContext};
use storage::{ArtifactName, SaveParams};

use args::{Args, Command, SaveParamsArgs, SearchArgs};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(args: Args) -> Result<()> {
    init_tracing(&args.log_level, args.json_logs)?;

    match args.command {
        Command::Profiles => {
            let profiles: Vec<_> = satellites().map(report::ProfileSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }
        Command::Search(search_args) => search(search_args).await?,
        Command::SaveParams(save_args) => save_params(save_args)?,
    }

    Ok(())
}

/// 2 for invalid query parameters anywhere in the error chain, 1 otherwise.
fn exit_code(error: &anyhow::Error) -> u8 {
    let parameter_error = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<AcquisitionError>())
        .any(AcquisitionError::is_parameter_error);
    if parameter_error {
        2
    } else {
        1
    }
}

/// Logs go to stderr so stdout stays machine readable.
fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

async fn search(args: SearchArgs) -> Result<()> {
    let mut config = AcquisitionConfig::from_env();
    if let Some(max_items) = args.max_items {
        config.max_items = max_items;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let query = args.to_query().context("Invalid query")?;
    let context = query.context();

    let profile = profile(&query.satellite).with_query(&context)?;
    let bands = BandResolver::resolve(profile, query.bands.as_deref()).with_query(&context)?;
    let plan = SpatialPlan::for_query(&query, profile).with_query(&context)?;

    info!(
        satellite = %profile.id,
        bands = bands.len(),
        epsg = %plan.crs,
        width = plan.width,
        height = plan.height,
        "Searching catalog"
    );

    let session = CatalogSession::new(config.request_timeout).context("Failed to build HTTP client")?;
    let coordinator = SearchCoordinator::new(Arc::new(session), config.retry)
        .with_endpoints(config.endpoints.clone())
        .with_page_size(config.page_size)
        .with_max_items(config.max_items);

    let items = coordinator
        .search(&query, profile, &bands)
        .await
        .with_query(&context)?;

    let report = report::SearchReport::new(&context, &bands, &plan, &items);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn save_params(args: SaveParamsArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let params: SaveParams = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse {}", args.file.display()))?;
    params.validate()?;

    let satellite = profile(&args.satellite)?;
    let datetime = args.datetime()?;

    let mut previews = Vec::new();
    for format in params.formats() {
        let labels: Vec<String> = if params.merge_bands {
            vec!["merged".to_string()]
        } else {
            satellite
                .default_bands
                .iter()
                .map(|b| satellite.alias(b).unwrap_or(*b).to_string())
                .collect()
        };
        for label in labels {
            let name = ArtifactName {
                satellite: satellite.id,
                datetime,
                identifier: &args.identifier,
                bands: &label,
                provider: satellite.providers.first().map_or("", |b| b.provider.as_str()),
                format,
            };
            let relative = name.relative_path(params.custom_naming.as_deref())?;
            previews.push(report::ArtifactPreview::new(&params, format, relative));
        }
    }

    let report = report::SaveParamsReport {
        params: &params,
        artifacts: previews,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_common::QueryContext;

    fn context() -> QueryContext {
        QueryContext {
            satellite: "S1MPC".to_string(),
            geometry: "bbox(12.5,55.6,12.6,55.7)".to_string(),
            date_range: None,
            bands: vec!["vv".to_string()],
        }
    }

    #[test]
    fn test_parameter_errors_exit_with_2() {
        let unsupported = Err::<(), _>(AcquisitionError::unsupported(
            "S1MPC",
            "planetary_computer",
            "tile search",
        ))
        .with_query(&context())
        .context("Search failed")
        .unwrap_err();
        assert_eq!(exit_code(&unsupported), 2);

        let unknown = anyhow::Error::from(profile("LANDSAT9").unwrap_err());
        assert_eq!(exit_code(&unknown), 2);
    }

    #[test]
    fn test_other_errors_exit_with_1() {
        let no_data = Err::<(), _>(AcquisitionError::NoDataFound)
            .with_query(&context())
            .unwrap_err();
        assert_eq!(exit_code(&anyhow::Error::from(no_data)), 1);
        assert_eq!(exit_code(&anyhow::anyhow!("--bbox needs 4 numbers, got 3")), 1);
    }
}
