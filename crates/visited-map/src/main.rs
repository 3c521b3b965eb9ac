mod loader;
mod logging;
mod report;
mod settings;

use loader::{LoadError, load_files, sample_places};
use report::Report;
use settings::Settings;
use visited_map_lib::{PlaceCollection, Viewport};

fn run(settings: &Settings) -> Result<Report, LoadError> {
    let records = if settings.place_files.is_empty() {
        tracing::info!("No place files given, using the built-in sample places");
        sample_places()
    } else {
        load_files(&settings.place_files)?
    };

    let mut collection = PlaceCollection::new(settings.config())?;
    let rejected = collection.add_records(records)?;
    if !rejected.is_empty() {
        tracing::warn!("Skipped {} places with invalid coordinates", rejected.len());
    }

    let info = collection.get_info();
    tracing::info!(
        "Loaded {} places ({} shown, {} without a year)",
        info.place_count,
        info.active_count,
        info.yearless_count
    );

    let viewport = Viewport::new(settings.bounds, settings.zoom);
    Ok(Report::build(&collection, &viewport, settings.expand)?)
}

fn main() {
    logging::setup_logging();
    let settings = Settings::from_cli();
    tracing::debug!("Settings: {:?}", settings);

    let report = match run(&settings) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    match report.to_json(settings.pretty) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!("Failed to serialize report: {e}");
            std::process::exit(1);
        }
    }
}
