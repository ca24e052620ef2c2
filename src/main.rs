use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use itertools::Itertools;
use log::{error, info};
use serde::Serialize;

use tracklens::analysis::consistency::DEFAULT_CONSISTENCY_LAPS;
use tracklens::analysis::history::DEFAULT_HISTORY_SESSIONS;
use tracklens::analysis::{
    LapAnalysis, RecordUpdateQueue, SectionRecordStore, TierThresholds, compare_best_and_most_recent,
    compare_sessions, consistency_report, history_report, record_sessions, resolve_boundaries,
};
use tracklens::telemetry::loader::load_sessions_jsonl;
use tracklens::track_map::{TrackScene, render_svg};
use tracklens::ui::{ViewerData, run_viewer};
use tracklens::{AnalysisConfig, Session, TrackDefinition, TrackLensError};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Number of resampling intervals, overrides the saved config
    #[arg(long, global = true)]
    points: Option<usize>,

    /// Write the effective configuration back to the config file
    #[arg(long, global = true)]
    save_config: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Prints the best and most recent laps resampled onto a shared grid
    Compare {
        #[arg(short, long)]
        input: PathBuf,

        /// Session id, defaults to the last session in the file
        #[arg(short, long)]
        session: Option<u64>,

        /// Compares the best laps of every session instead
        #[arg(long)]
        across_sessions: bool,
    },
    /// Computes section times of every lap and rates them against the records
    Sections {
        #[arg(short, long)]
        input: PathBuf,

        /// Track definition with section boundaries, detected from the laps when missing
        #[arg(short, long)]
        track: Option<PathBuf>,

        #[arg(long)]
        tier_excellent: Option<f32>,

        #[arg(long)]
        tier_good: Option<f32>,
    },
    /// Writes the annotated track map of a session's best lap as SVG
    Render {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        track: Option<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long)]
        session: Option<u64>,

        #[arg(long, default_value_t = 800)]
        width: u32,

        #[arg(long, default_value_t = 600)]
        height: u32,
    },
    /// Opens the interactive track map viewer
    View {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        track: Option<PathBuf>,

        #[arg(long)]
        hit_radius: Option<f32>,
    },
    /// Prints lap time consistency over the most recent laps
    Consistency {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        session: Option<u64>,

        #[arg(short, long, default_value_t = DEFAULT_CONSISTENCY_LAPS)]
        laps: usize,
    },
    /// Prints race pace, off-tracks and the best session over the last races on a track
    History {
        #[arg(short, long)]
        input: PathBuf,

        /// Track id, defaults to the track of the last session in the file
        #[arg(short, long)]
        track_id: Option<String>,

        #[arg(short, long, default_value_t = DEFAULT_HISTORY_SESSIONS)]
        sessions: usize,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), TrackLensError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TrackLensError::OutputSerializeError { source: e })?;
    println!("{}", json);
    Ok(())
}

fn select_session(sessions: &[Session], session_id: Option<u64>) -> Result<&Session, TrackLensError> {
    match session_id {
        Some(id) => sessions
            .iter()
            .find(|s| s.info.session_id == id)
            .ok_or_else(|| TrackLensError::InvalidUserInput {
                field: "session".to_string(),
                reason: format!("no session with id {}", id),
            }),
        None => sessions.last().ok_or_else(|| TrackLensError::InvalidUserInput {
            field: "input".to_string(),
            reason: "file contains no sessions".to_string(),
        }),
    }
}

fn load_track(track: Option<&PathBuf>) -> Result<Option<TrackDefinition>, TrackLensError> {
    track.map(|path| TrackDefinition::load(path)).transpose()
}

/// Runs every lap through the record queue in file order
fn analyse_laps(
    sessions: &[Session],
    track: Option<&TrackDefinition>,
    config: &AnalysisConfig,
) -> Result<Vec<LapAnalysis>, TrackLensError> {
    let boundaries = resolve_boundaries(sessions, track);
    let queue = RecordUpdateQueue::spawn(SectionRecordStore::new(), TierThresholds::from(config));
    let analyses = record_sessions(sessions, &boundaries, &queue.handle())?;
    let store = queue.shutdown()?;
    for track_id in sessions.iter().map(|s| s.info.track_id.as_str()).unique() {
        if let Some(records) = store.personal_records(track_id) {
            info!("Best lap on {}: {:?}", track_id, records.best_lap_time);
        }
    }
    Ok(analyses)
}

fn compare_command(
    input: &Path,
    session_id: Option<u64>,
    across_sessions: bool,
    config: &AnalysisConfig,
) -> Result<(), TrackLensError> {
    let sessions = load_sessions_jsonl(input)?;
    let datasets = if across_sessions {
        compare_sessions(&sessions, config.max_compare_entries, config.resample_points)
    } else {
        let session = select_session(&sessions, session_id)?;
        compare_best_and_most_recent(session, config.resample_points)
    };
    print_json(&datasets)
}

fn sections_command(
    input: &Path,
    track: Option<&PathBuf>,
    config: &AnalysisConfig,
) -> Result<(), TrackLensError> {
    let sessions = load_sessions_jsonl(input)?;
    let track = load_track(track)?;
    let analyses = analyse_laps(&sessions, track.as_ref(), config)?;
    print_json(&analyses)
}

fn render_command(
    input: &Path,
    track: Option<&PathBuf>,
    output: &Path,
    session_id: Option<u64>,
    size: (u32, u32),
    config: &AnalysisConfig,
) -> Result<(), TrackLensError> {
    let sessions = load_sessions_jsonl(input)?;
    let track = load_track(track)?;
    let analyses = analyse_laps(&sessions, track.as_ref(), config)?;

    let session = select_session(&sessions, session_id)?;
    let best = session
        .best_lap()
        .ok_or_else(|| TrackLensError::InvalidUserInput {
            field: "session".to_string(),
            reason: format!("session {} has no complete laps", session.info.session_id),
        })?;
    let lap_ref = session.lap_ref(best);
    let sections = analyses
        .iter()
        .find(|a| a.lap == lap_ref)
        .map(|a| a.outcome.sections.clone())
        .unwrap_or_default();
    let map_reference = track
        .as_ref()
        .filter(|t| t.track_id == session.info.track_id)
        .and_then(|t| t.map_reference);
    let scene = TrackScene::from_lap(best, &sections, map_reference)
    .ok_or_else(|| TrackLensError::SvgGenerationError {
        reason: format!("lap {} has no world coordinates", best.lap_number),
    })?;

    let svg = render_svg(scene, size.0, size.1, config)?;
    std::fs::write(output, svg).map_err(|e| TrackLensError::WriterError { source: e })?;
    info!("Track map written to {:?}", output);
    Ok(())
}

fn view_command(
    input: &Path,
    track: Option<&PathBuf>,
    config: AnalysisConfig,
) -> Result<(), TrackLensError> {
    let sessions = load_sessions_jsonl(input)?;
    let track = load_track(track)?;
    let analyses = analyse_laps(&sessions, track.as_ref(), &config)?;
    run_viewer(
        ViewerData {
            sessions,
            track,
            analyses,
        },
        config,
    )
}

fn consistency_command(
    input: &Path,
    session_id: Option<u64>,
    laps: usize,
) -> Result<(), TrackLensError> {
    let sessions = load_sessions_jsonl(input)?;
    let session = select_session(&sessions, session_id)?;
    match consistency_report(session, laps) {
        Some(report) => print_json(&report),
        None => Err(TrackLensError::InvalidUserInput {
            field: "session".to_string(),
            reason: format!("session {} has no complete laps", session.info.session_id),
        }),
    }
}

fn history_command(
    input: &Path,
    track_id: Option<String>,
    max_sessions: usize,
) -> Result<(), TrackLensError> {
    let sessions = load_sessions_jsonl(input)?;
    let track_id = match track_id {
        Some(id) => id,
        None => select_session(&sessions, None)?.info.track_id.clone(),
    };
    match history_report(&sessions, &track_id, max_sessions) {
        Some(report) => print_json(&report),
        None => Err(TrackLensError::InvalidUserInput {
            field: "track_id".to_string(),
            reason: format!("no session on {} has enough complete laps", track_id),
        }),
    }
}

fn run(cli: Args) -> Result<(), TrackLensError> {
    let mut config = AnalysisConfig::from_local_file().unwrap_or_default();
    if let Some(points) = cli.points {
        config.resample_points = points;
    }

    match &cli.command {
        Commands::Sections {
            tier_excellent,
            tier_good,
            ..
        } => {
            if let Some(excellent) = tier_excellent {
                config.tier_excellent = *excellent;
            }
            if let Some(good) = tier_good {
                config.tier_good = *good;
            }
        }
        Commands::View {
            hit_radius: Some(radius),
            ..
        } => config.hit_radius_px = *radius,
        _ => {}
    }
    if config.tier_excellent > config.tier_good {
        return Err(TrackLensError::InvalidUserInput {
            field: "tier_excellent".to_string(),
            reason: format!(
                "{} is above the good threshold {}",
                config.tier_excellent, config.tier_good
            ),
        });
    }
    if cli.save_config {
        config.save()?;
    }

    match cli.command {
        Commands::Compare {
            input,
            session,
            across_sessions,
        } => compare_command(&input, session, across_sessions, &config),
        Commands::Sections { input, track, .. } => sections_command(&input, track.as_ref(), &config),
        Commands::Render {
            input,
            track,
            output,
            session,
            width,
            height,
        } => render_command(
            &input,
            track.as_ref(),
            &output,
            session,
            (width, height),
            &config,
        ),
        Commands::View { input, track, .. } => view_command(&input, track.as_ref(), config),
        Commands::Consistency {
            input,
            session,
            laps,
        } => consistency_command(&input, session, laps),
        Commands::History {
            input,
            track_id,
            sessions,
        } => history_command(&input, track_id, sessions),
    }
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
