//! Trajectory viewer for extracted events
//!
//! Draws the track and the cascade points of each event projected on one
//! detector-frame plane. Cascade markers grow with the logarithm of the
//! deposited energy.

use eframe::egui;
use glam::DVec3;
use lepton_bridge_core::{EventResult, ParticleRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plane {
    XY,
    XZ,
    YZ,
}

impl Plane {
    fn project(self, v: DVec3) -> (f64, f64) {
        match self {
            Plane::XY => (v.x, v.y),
            Plane::XZ => (v.x, v.z),
            Plane::YZ => (v.y, v.z),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Plane::XY => "x-y",
            Plane::XZ => "x-z",
            Plane::YZ => "y-z",
        }
    }
}

pub struct ViewerApp {
    results: Vec<EventResult>,
    selected: usize,
    plane: Plane,
    show_track: bool,
    show_cascades: bool,
}

impl ViewerApp {
    pub fn new(results: Vec<EventResult>, _cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            results,
            selected: 0,
            plane: Plane::XZ,
            show_track: true,
            show_cascades: true,
        }
    }

    fn points(&self, event: &EventResult) -> Vec<DVec3> {
        let mut points = vec![event.start.detector, event.end];
        points.extend(event.track_records.iter().map(|r| r.position));
        points.extend(event.cascade_records.iter().map(|r| r.position));
        points
    }
}

/// Maps projected detector coordinates into a screen rectangle, y up.
struct Projection {
    centre: (f64, f64),
    scale: f64,
    screen_centre: egui::Pos2,
}

impl Projection {
    fn fit(points: &[(f64, f64)], rect: egui::Rect) -> Self {
        let mut lo = (f64::MAX, f64::MAX);
        let mut hi = (f64::MIN, f64::MIN);
        for &(u, v) in points {
            lo = (lo.0.min(u), lo.1.min(v));
            hi = (hi.0.max(u), hi.1.max(v));
        }
        if points.is_empty() {
            lo = (0.0, 0.0);
            hi = (0.0, 0.0);
        }
        let span = (hi.0 - lo.0).max(hi.1 - lo.1).max(1.0);
        let side = f64::from(rect.width().min(rect.height())) * 0.9;
        Self {
            centre: ((lo.0 + hi.0) / 2.0, (lo.1 + hi.1) / 2.0),
            scale: side / span,
            screen_centre: rect.center(),
        }
    }

    fn to_screen(&self, (u, v): (f64, f64)) -> egui::Pos2 {
        self.screen_centre
            + egui::vec2(
                ((u - self.centre.0) * self.scale) as f32,
                -((v - self.centre.1) * self.scale) as f32,
            )
    }
}

fn cascade_radius(record: &ParticleRecord) -> f32 {
    (record.particle.energy.max(1.0).log10() as f32 * 0.8).clamp(2.0, 14.0)
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let count = self.results.len();
                egui::ComboBox::from_label("Event")
                    .selected_text(format!("{} / {}", self.selected + 1, count))
                    .show_ui(ui, |ui| {
                        for i in 0..count {
                            ui.selectable_value(&mut self.selected, i, format!("event {}", i + 1));
                        }
                    });

                ui.separator();

                ui.label("Plane:");
                for plane in [Plane::XY, Plane::XZ, Plane::YZ] {
                    ui.radio_value(&mut self.plane, plane, plane.label());
                }

                ui.separator();

                ui.checkbox(&mut self.show_track, "Track");
                ui.checkbox(&mut self.show_cascades, "Cascades");
            });
        });

        let Some(event) = self.results.get(self.selected) else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.label("no events");
            });
            return;
        };

        egui::TopBottomPanel::bottom("summary").show(ctx, |ui| {
            ui.label(format!(
                "{} at {:e} GeV, final {} at {:e} GeV, {} cascades depositing {:e} GeV, track length {:.1} cm",
                event.track_records.first().map_or("primary", |r| r.name.as_str()),
                event.primary_energy,
                event.final_particle.name,
                event.final_energy,
                event.cascade_records.len(),
                event.cascade_total_energy(),
                event.total_length,
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let rect = ui.max_rect();
            let painter = ui.painter();
            let plane = self.plane;

            let projected: Vec<(f64, f64)> = self
                .points(event)
                .into_iter()
                .map(|p| plane.project(p))
                .collect();
            let frame = Projection::fit(&projected, rect);

            // Axis from start to end
            let start = frame.to_screen(plane.project(event.start.detector));
            let end = frame.to_screen(plane.project(event.end));
            painter.line_segment([start, end], egui::Stroke::new(1.0, egui::Color32::DARK_GRAY));

            if self.show_track {
                let track: Vec<egui::Pos2> = event
                    .track_records
                    .iter()
                    .map(|r| frame.to_screen(plane.project(r.position)))
                    .collect();
                for pair in track.windows(2) {
                    painter.line_segment(
                        [pair[0], pair[1]],
                        egui::Stroke::new(2.0, egui::Color32::LIGHT_BLUE),
                    );
                }
                for (pos, record) in track.iter().zip(&event.track_records) {
                    painter.circle_filled(*pos, 3.0, egui::Color32::LIGHT_BLUE);
                    painter.text(
                        *pos + egui::vec2(6.0, 0.0),
                        egui::Align2::LEFT_CENTER,
                        &record.name,
                        egui::FontId::proportional(11.0),
                        egui::Color32::WHITE,
                    );
                }
            }

            if self.show_cascades {
                for record in &event.cascade_records {
                    let pos = frame.to_screen(plane.project(record.position));
                    let radius = cascade_radius(record);
                    painter.circle_filled(pos, radius, egui::Color32::from_rgb(230, 140, 40));
                    painter.circle_stroke(pos, radius, egui::Stroke::new(1.0, egui::Color32::RED));
                }
            }

            painter.circle_stroke(start, 6.0, egui::Stroke::new(2.0, egui::Color32::GREEN));
            painter.text(
                start + egui::vec2(0.0, -10.0),
                egui::Align2::CENTER_BOTTOM,
                "start",
                egui::FontId::default(),
                egui::Color32::GREEN,
            );
            painter.circle_stroke(end, 6.0, egui::Stroke::new(2.0, egui::Color32::YELLOW));
            painter.text(
                end + egui::vec2(0.0, 10.0),
                egui::Align2::CENTER_TOP,
                "end",
                egui::FontId::default(),
                egui::Color32::YELLOW,
            );
        });
    }
}

pub fn show(results: Vec<EventResult>) -> eframe::Result<()> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "lepton-bridge viewer",
        options,
        Box::new(|cc| Ok(Box::new(ViewerApp::new(results, cc)))),
    )
}
