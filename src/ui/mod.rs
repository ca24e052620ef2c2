// Interactive track map viewer built on eframe/egui

mod surface;
mod viewer;

pub use surface::EguiSurface;
pub use viewer::{SessionView, TrackViewerApp, ViewerData, build_session_view, run_viewer};
