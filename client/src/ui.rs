use common::{CellTag, FieldSnapshot, GamePhase, log};
use eframe::egui;
use tokio::sync::mpsc;

use crate::state::{Intent, ViewSnapshot, ViewState};

const PIXELS_PER_CELL: f32 = 24.0;

fn cell_color(tag: CellTag) -> egui::Color32 {
    match tag {
        CellTag::Empty => egui::Color32::from_rgb(0x20, 0x24, 0x2a),
        CellTag::Head => egui::Color32::from_rgb(0x2e, 0xcc, 0x71),
        CellTag::Body => egui::Color32::from_rgb(0x27, 0xae, 0x60),
        CellTag::Food => egui::Color32::from_rgb(0xe7, 0x4c, 0x3c),
        CellTag::Wall => egui::Color32::from_rgb(0x7f, 0x8c, 0x8d),
    }
}

/// Play/Quit is offered whenever no run is in progress. Before the first
/// successful mount that only makes sense once the mount has failed.
fn needs_modal(view: &ViewSnapshot) -> bool {
    match view.phase {
        Some(phase) => phase != GamePhase::Ongoing,
        None => view.error.is_some(),
    }
}

pub fn window_size_for(field: &FieldSnapshot) -> egui::Vec2 {
    let padding = 40.0;
    egui::vec2(
        field.width() as f32 * PIXELS_PER_CELL + padding,
        field.height() as f32 * PIXELS_PER_CELL + padding + 60.0,
    )
}

/// Draws whatever the game loop last published and turns clicks and key
/// presses into intents. Holds no game state of its own.
pub struct SnakeApp {
    view: ViewState,
    intent_tx: mpsc::UnboundedSender<Intent>,
    window_resized: bool,
}

impl SnakeApp {
    pub fn new(view: ViewState, intent_tx: mpsc::UnboundedSender<Intent>) -> Self {
        Self {
            view,
            intent_tx,
            window_resized: false,
        }
    }

    fn send(&self, intent: Intent) {
        if self.intent_tx.send(intent).is_err() {
            log!("Game loop is gone, dropping intent");
        }
    }

    fn forward_keys(&self, ctx: &egui::Context) {
        let keys: Vec<String> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key, pressed: true, ..
                    } => Some(key.name().to_lowercase()),
                    _ => None,
                })
                .collect()
        });
        for key in keys {
            self.send(Intent::Key(key));
        }
    }

    fn render_field(&self, ui: &mut egui::Ui, field: &FieldSnapshot) {
        let canvas = egui::vec2(
            field.width() as f32 * PIXELS_PER_CELL,
            field.height() as f32 * PIXELS_PER_CELL,
        );
        let (response, painter) = ui.allocate_painter(canvas, egui::Sense::hover());
        let origin = response.rect.min;

        for (y, row) in field.rows().iter().enumerate() {
            for (x, tag) in row.iter().enumerate() {
                let min = origin + egui::vec2(x as f32 * PIXELS_PER_CELL, y as f32 * PIXELS_PER_CELL);
                let rect = egui::Rect::from_min_size(min, egui::vec2(PIXELS_PER_CELL, PIXELS_PER_CELL));
                painter.rect_filled(rect.shrink(1.0), 2.0, cell_color(*tag));
            }
        }
    }

    fn render_modal(&self, ctx: &egui::Context, view: &ViewSnapshot) {
        let (title, play_label) = match view.phase {
            Some(GamePhase::Win) => ("YOU WIN", "Play Again"),
            Some(GamePhase::Lose) => ("YOU LOSE", "Play Again"),
            None => ("Engine unavailable", "Retry"),
            _ => ("Snake", "Play"),
        };

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                if view.phase.is_some_and(|phase| phase.is_finished()) {
                    ui.label(format!("Score: {}", view.score));
                }
                ui.horizontal(|ui| {
                    if ui.button(play_label).clicked() {
                        self.send(Intent::Start);
                    }
                    if ui.button("Quit").clicked() {
                        self.send(Intent::Quit);
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
    }
}

impl eframe::App for SnakeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) {
            self.send(Intent::Quit);
        }

        self.forward_keys(ctx);
        let view = self.view.snapshot();

        if !self.window_resized && !view.field.is_empty() {
            ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(window_size_for(&view.field)));
            self.window_resized = true;
        }

        if let Some(error) = &view.error {
            egui::Window::new("Error")
                .collapsible(false)
                .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 8.0))
                .show(ctx, |ui| {
                    ui.label(error);
                    ui.label("Press Play to try again.");
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(format!("Score: {}", view.score));
            ui.separator();
            match view.phase {
                Some(_) => self.render_field(ui, &view.field),
                None => {
                    ui.label("Connecting to engine...");
                    ui.spinner();
                }
            }
        });

        if needs_modal(&view) {
            self.render_modal(ctx, &view);
        }

        ctx.request_repaint();
    }
}
