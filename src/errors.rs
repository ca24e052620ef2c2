// Error types for tracklens

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum TrackLensError {
    // Errors while loading recorded telemetry
    #[snafu(display("Invalid telemetry file: {path}"))]
    InvalidTelemetryFile { path: String },
    #[snafu(display("Error loading telemetry file"))]
    TelemetryLoaderError { source: io::Error },
    #[snafu(display("Telemetry file contains no sessions: {path}"))]
    EmptyTelemetryFile { path: String },

    // Track definition errors
    #[snafu(display("Error reading track definition"))]
    TrackDefinitionIOError { source: io::Error },
    #[snafu(display("Error parsing track definition"))]
    TrackDefinitionParseError { source: serde_json::Error },
    #[snafu(display("Track definition validation failed: {reason}"))]
    TrackDefinitionValidationError { reason: String },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Output errors
    #[snafu(display("Error writing output file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error serializing analysis output"))]
    OutputSerializeError { source: serde_json::Error },
    #[snafu(display("SVG generation failed: {reason}"))]
    SvgGenerationError { reason: String },

    // Record queue errors
    #[snafu(display("Record update queue is no longer running"))]
    RecordQueueClosed,

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },

    // UI errors
    #[snafu(display("Could not start track viewer: {reason}"))]
    ViewerError { reason: String },
}
