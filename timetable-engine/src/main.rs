//! Timetable checker: parses and schedules a timetable file against
//! in-memory route and consist services, printing the resulting train list.
//! Useful for validating timetable files without a full route installation.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use timetable_engine::mock::{MockConsistService, MockRouteService};
use timetable_engine::process::TimetableProcessor;
use timetable_engine::schedule::train::ScheduledTrain;
use timetable_engine::timeofday::format_time_of_day;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = env::args().skip(1);
    let (Some(path), Some(selector)) = (args.next(), args.next()) else {
        eprintln!("usage: timetable-engine <timetable file> <description:train>");
        return ExitCode::FAILURE;
    };

    let routes = MockRouteService::permissive();
    let consists = MockConsistService::permissive();
    let processor = TimetableProcessor::new(&routes, &consists);

    match processor.process(&PathBuf::from(path), &selector) {
        Ok(schedule) => {
            println!("player  {}", summary(&schedule.player));
            for train in &schedule.trains {
                println!("ai      {}", summary(train));
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "timetable processing failed");
            ExitCode::FAILURE
        }
    }
}

fn summary(train: &ScheduledTrain) -> String {
    let start = train
        .start_time
        .map_or_else(|| "--:--:--".to_string(), format_time_of_day);
    let mut line = format!(
        "#{:<4} {:<24} start {} stops {}",
        train.number,
        train.name,
        start,
        train.stops.len()
    );
    if let Some(forms) = train.forms {
        line.push_str(&format!(" forms #{forms}"));
    }
    if let Some(formed_of) = train.formed_of {
        line.push_str(&format!(" formed-of #{formed_of}"));
    }
    if train.forms_static {
        line.push_str(" static");
    }
    line
}
