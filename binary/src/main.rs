use std::{fs, process::ExitCode, time::Instant};

use log::{error, info};
use specpp::{
    discover_places, import_variants_json_from_slice, json_to_config, EventLogActivityProjection,
    SPECppConfig, SPECppError,
};

/// Usage: `binary [variants.json] [config.json]`
///
/// The variants file contains `[[["a", "b"], 10], ...]`. Without arguments a small built-in log is used.
fn main() -> ExitCode {
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .ok();

    match run(std::env::args().skip(1).collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn demo_log() -> EventLogActivityProjection {
    EventLogActivityProjection::from_variants(vec![
        (vec!["register", "check", "decide", "pay"], 20),
        (vec!["register", "decide", "check", "pay"], 12),
        (vec!["register", "check", "decide", "reject"], 6),
        (vec!["register", "decide", "reject"], 3),
    ])
}

fn read(path: &str) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Could not read {}: {}", path, e))
}

fn run(args: Vec<String>) -> Result<(), String> {
    let log = match args.first() {
        Some(path) => import_variants_json_from_slice(&read(path)?).map_err(|e| e.to_string())?,
        None => {
            info!("No variants file given, using built-in log");
            demo_log()
        }
    };
    let config = match args.get(1) {
        Some(path) => {
            let json = String::from_utf8(read(path)?).map_err(|e| e.to_string())?;
            json_to_config(&json).map_err(|e| e.to_string())?
        }
        None => SPECppConfig::default(),
    };

    let now = Instant::now();
    let result = discover_places(&log, config).map_err(|e: SPECppError| e.to_string())?;
    info!(
        "Discovered {} places ({:?}, precision {:.4}) in {:#?}",
        result.places.len(),
        result.termination,
        result.precision,
        now.elapsed()
    );
    for place in &result.labelled_places {
        info!("{:?} -> {:?}", place.preset, place.postset);
    }
    println!("{}", result.to_json().map_err(|e| e.to_string())?);
    Ok(())
}
