use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use egui::{Align, Color32, Layout, RichText, Sense, Ui, containers::CentralPanel};
use egui_plot::{Legend, Line, PlotPoints};
use log::{debug, info};
use uom::si::f32::Velocity;
use uom::si::velocity::{kilometer_per_hour, meter_per_second};

use super::surface::{EguiSurface, color32};
use crate::analysis::{
    AlignedDataset, LapAnalysis, RequestToken, RequestTracker, SectionResult,
    compare_best_and_most_recent,
};
use crate::config::AnalysisConfig;
use crate::errors::TrackLensError;
use crate::telemetry::Session;
use crate::track_map::renderer::tier_color;
use crate::track_map::{RenderContext, SelectionChange, TrackDefinition, TrackScene};

const BEST_COLOR: Color32 = Color32::from_rgb(190, 90, 255);
const RECENT_COLOR: Color32 = Color32::from_rgb(255, 140, 40);

/// Everything the viewer shows, loaded and analysed up front
pub struct ViewerData {
    pub sessions: Vec<Session>,
    pub track: Option<TrackDefinition>,
    pub analyses: Vec<LapAnalysis>,
}

/// Comparison and map of one session
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub session_index: usize,
    pub datasets: Vec<AlignedDataset>,
    pub scene: Option<TrackScene>,
    pub sections: Vec<SectionResult>,
}

/// Best/most recent overlay plus the map scene of the best lap
pub fn build_session_view(
    data: &ViewerData,
    session_index: usize,
    config: &AnalysisConfig,
) -> SessionView {
    let Some(session) = data.sessions.get(session_index) else {
        return SessionView {
            session_index,
            ..Default::default()
        };
    };

    let datasets = compare_best_and_most_recent(session, config.resample_points);
    let (scene, sections) = match session.best_lap() {
        Some(best) => {
            let lap_ref = session.lap_ref(best);
            let sections = data
                .analyses
                .iter()
                .find(|a| a.lap == lap_ref)
                .map(|a| a.outcome.sections.clone())
                .unwrap_or_default();
            let map_reference = data
                .track
                .as_ref()
                .filter(|t| t.track_id == session.info.track_id)
                .and_then(|t| t.map_reference);
            (
                TrackScene::from_lap(best, &sections, map_reference),
                sections,
            )
        }
        None => (None, Vec::new()),
    };

    SessionView {
        session_index,
        datasets,
        scene,
        sections,
    }
}

fn speed_kmh(speed_mps: f32) -> f64 {
    Velocity::new::<meter_per_second>(speed_mps).get::<kilometer_per_hour>() as f64
}

fn session_label(session: &Session) -> String {
    format!(
        "Session {} - {} ({} laps)",
        session.info.session_id,
        session.info.track_id,
        session.laps.len()
    )
}

pub struct TrackViewerApp {
    config: AnalysisConfig,
    data: Arc<ViewerData>,
    selected_session: usize,
    requests: RequestTracker,
    results_tx: Sender<(RequestToken, SessionView)>,
    results_rx: Receiver<(RequestToken, SessionView)>,
    view: Option<SessionView>,
    pending_scene: Option<TrackScene>,
    map: Option<RenderContext<EguiSurface>>,
    map_dirty: bool,
}

impl TrackViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, data: ViewerData, config: AnalysisConfig) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        let mut app = Self {
            config,
            data: Arc::new(data),
            selected_session: 0,
            requests: RequestTracker::new(),
            results_tx,
            results_rx,
            view: None,
            pending_scene: None,
            map: None,
            map_dirty: false,
        };
        app.request_view(&cc.egui_ctx);
        app
    }

    /// Computes the view of the selected session off the UI thread.
    /// A newer selection supersedes results still in flight.
    fn request_view(&mut self, ctx: &egui::Context) {
        let token = self.requests.begin();
        let data = Arc::clone(&self.data);
        let config = self.config.clone();
        let session_index = self.selected_session;
        let tx = self.results_tx.clone();
        let ctx = ctx.clone();
        thread::spawn(move || {
            let view = build_session_view(&data, session_index, &config);
            if tx.send((token, view)).is_ok() {
                ctx.request_repaint();
            }
        });
    }

    fn receive_views(&mut self) {
        while let Ok((token, view)) = self.results_rx.try_recv() {
            if let Some(view) = self.requests.accept(token, view) {
                debug!("Showing session {}", view.session_index);
                self.pending_scene = view.scene.clone();
                if self.pending_scene.is_none() {
                    self.map = None;
                }
                self.view = Some(view);
            }
        }
    }

    fn show_selectors(&mut self, ui: &mut Ui) {
        let previous = self.selected_session;
        let selected_text = self
            .data
            .sessions
            .get(self.selected_session)
            .map(session_label)
            .unwrap_or_default();
        egui::ComboBox::from_label("Session")
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for (i, session) in self.data.sessions.iter().enumerate() {
                    ui.selectable_value(&mut self.selected_session, i, session_label(session));
                }
            });
        if previous != self.selected_session {
            info!("Switching to session {}", self.selected_session);
            self.request_view(ui.ctx());
        }
    }

    fn show_track_map(&mut self, ui: &mut Ui) {
        let size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
        let pixels_per_point = ui.ctx().pixels_per_point();

        if let Some(scene) = self.pending_scene.take() {
            match self.map.as_mut() {
                Some(map) => map.set_scene(scene),
                None => {
                    self.map = Some(RenderContext::new(
                        EguiSurface::new(rect.size(), pixels_per_point),
                        scene,
                        &self.config,
                    ))
                }
            }
            self.map_dirty = true;
        }

        let Some(map) = self.map.as_mut() else {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No position data for this session",
                egui::FontId::default(),
                Color32::LIGHT_GRAY,
            );
            return;
        };

        if !map.surface().matches(rect.size(), pixels_per_point) {
            map.recreate(EguiSurface::new(rect.size(), pixels_per_point));
            self.map_dirty = true;
        }

        let change = match response.hover_pos() {
            Some(pos) => {
                let pointer = map.surface().to_surface(rect.min, pos);
                map.pointer_moved(pointer)
            }
            None => map.pointer_left(),
        };
        if change != SelectionChange::Unchanged {
            self.map_dirty = true;
        }

        if self.map_dirty {
            map.render();
            self.map_dirty = false;
        }
        map.surface().paint(&ui.painter_at(rect), rect.min);
    }

    fn show_speed_overlay(&self, ui: &mut Ui, datasets: &[AlignedDataset]) {
        egui_plot::Plot::new("speed_overlay")
            .legend(Legend::default())
            .include_x(0.)
            .include_x(100.)
            .include_y(0.)
            .show(ui, |plot_ui| {
                for (i, dataset) in datasets.iter().enumerate() {
                    let points = PlotPoints::new(
                        dataset
                            .points
                            .iter()
                            .map(|p| [p.progress as f64 * 100., speed_kmh(p.speed_mps)])
                            .collect(),
                    );
                    let color = if i == 0 { BEST_COLOR } else { RECENT_COLOR };
                    plot_ui.line(Line::new(dataset.label.clone(), points).color(color));
                }
            });
    }

    fn show_sections(&self, ui: &mut Ui, sections: &[SectionResult]) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            for result in sections {
                let delta = result
                    .delta_to_record
                    .map(|d| format!("{:+.3}s", d))
                    .unwrap_or_else(|| "-".to_string());
                ui.label(
                    RichText::new(format!(
                        "{} {} {:.3}s {} {}",
                        result.section.section_id,
                        result.tier.label(),
                        result.section.time,
                        delta,
                        if result.new_record { "*" } else { "" }
                    ))
                    .color(color32(tier_color(result.tier))),
                );
            }
        });
    }
}

impl eframe::App for TrackViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.receive_views();

        egui::TopBottomPanel::top("session_selector")
            .frame(egui::Frame::new().inner_margin(4))
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    self.show_selectors(ui);
                });
            });

        let view = self.view.clone();
        if let Some(view) = view.as_ref() {
            egui::SidePanel::right("sections")
                .default_width(260.)
                .show(ctx, |ui| {
                    ui.heading("Sections");
                    self.show_sections(ui, &view.sections);
                });
            egui::TopBottomPanel::bottom("speed")
                .resizable(true)
                .default_height(220.)
                .show(ctx, |ui| {
                    self.show_speed_overlay(ui, &view.datasets);
                });
        }

        CentralPanel::default().show(ctx, |ui| {
            if self.view.is_none() {
                ui.centered_and_justified(|ui| ui.spinner());
                return;
            }
            self.show_track_map(ui);
        });
    }
}

/// Opens the viewer window and blocks until it is closed
pub fn run_viewer(data: ViewerData, config: AnalysisConfig) -> Result<(), TrackLensError> {
    eframe::run_native(
        "TrackLens",
        eframe::NativeOptions::default(),
        Box::new(move |cc| Ok(Box::new(TrackViewerApp::new(cc, data, config)))),
    )
    .map_err(|e| TrackLensError::ViewerError {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{Lap, SessionInfo, TelemetrySample};
    use crate::track_map::MapReference;

    fn lap_with_coordinates(lap_number: u32, lap_time: f32) -> Lap {
        let samples = (0..50)
            .map(|i| {
                let angle = i as f32 / 50. * std::f32::consts::TAU;
                TelemetrySample {
                    time_offset: i as f32 * 0.2,
                    normalized_position: Some(i as f32 / 49.),
                    world_x: Some(angle.cos() * 300.),
                    world_z: Some(angle.sin() * 200.),
                    speed_mps: 40.,
                    ..Default::default()
                }
            })
            .collect();
        Lap::new(lap_number, lap_time, [None; 3], true, samples)
    }

    #[test]
    fn test_session_view_overlays_best_and_recent() {
        let data = ViewerData {
            sessions: vec![Session {
                info: SessionInfo::default(),
                laps: vec![lap_with_coordinates(1, 80.), lap_with_coordinates(2, 82.)],
            }],
            track: None,
            analyses: Vec::new(),
        };
        let view = build_session_view(&data, 0, &AnalysisConfig::default());
        assert_eq!(view.datasets.len(), 2);
        assert_eq!(view.datasets[0].lap_number, Some(1));
        assert_eq!(view.datasets[1].lap_number, Some(2));
        assert_eq!(view.datasets[0].points.len(), 101);
        let scene = view.scene.unwrap();
        assert_eq!(scene.outline.len(), 50);
        assert!(scene.points.is_empty());
    }

    #[test]
    fn test_map_reference_only_applies_to_its_track() {
        let mut track = TrackDefinition::new("monza");
        track.map_reference = Some(MapReference::Image {
            width: 1000,
            height: 500,
        });
        let session_on = |track_id: &str| Session {
            info: SessionInfo {
                track_id: track_id.to_string(),
                ..Default::default()
            },
            laps: vec![lap_with_coordinates(1, 80.)],
        };
        let data = ViewerData {
            sessions: vec![session_on("monza"), session_on("spa")],
            track: Some(track.clone()),
            analyses: Vec::new(),
        };
        let config = AnalysisConfig::default();

        let monza = build_session_view(&data, 0, &config).scene.unwrap();
        assert_eq!(monza.map_reference, track.map_reference);
        let spa = build_session_view(&data, 1, &config).scene.unwrap();
        assert!(matches!(spa.map_reference, Some(MapReference::WorldBounds(_))));
    }

    #[test]
    fn test_session_view_out_of_range() {
        let data = ViewerData {
            sessions: Vec::new(),
            track: None,
            analyses: Vec::new(),
        };
        let view = build_session_view(&data, 3, &AnalysisConfig::default());
        assert!(view.datasets.is_empty());
        assert!(view.scene.is_none());
    }

    #[test]
    fn test_speed_is_plotted_in_kmh() {
        assert!((speed_kmh(10.) - 36.).abs() < 1e-3);
    }
}
