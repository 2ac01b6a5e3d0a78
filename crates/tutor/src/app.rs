use crate::actions::Action;
use crate::chat::ChatMessage;
use crate::render::{self, Scene};
use crate::settings::{
    HORIZONTAL_SPACING_RANGE, LEVEL_HEIGHT_RANGE, NODE_RADIUS_RANGE,
    RevealMode, SETTINGS_FILE, START_Y_RANGE, SliderRange,
};
use crate::state::State;
use eframe::egui::{self, Color32, RichText, vec2};
use std::path::PathBuf;

const CHAT_PANEL_WIDTH: f32 = 380.0;
const DRAG_GROWTH_SECONDS: f32 = 0.15;
const USER_BUBBLE: Color32 = Color32::from_rgb(0xDB, 0xEA, 0xFE);
const TUTOR_BUBBLE: Color32 = Color32::from_rgb(0xF3, 0xF4, 0xF6);
const ERROR_BUBBLE: Color32 = Color32::from_rgb(0xFE, 0xE2, 0xE2);

pub struct TutorApp {
    state: State,
}

impl TutorApp {
    pub fn new(state: State) -> Self {
        Self { state }
    }
}

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.pull_background_actions();

        self.chat_panel(ctx);
        self.canvas_panel(ctx);

        // Display error dialog if there's an error message
        if let Some(error) = self.state.store.error_message.clone() {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&error);
                    if ui.button("OK").clicked() {
                        self.state.dispatch(Action::ClearErrorMessage);
                    }
                });
        }

        self.state.flush_actions();
        self.state.flush_effects();

        let store = &self.state.store;
        if store.is_loading || store.audio.is_playing || store.is_listening {
            ctx.request_repaint();
        }
    }
}

// -------------------------------------------------------------------
// Chat panel
// -------------------------------------------------------------------

impl TutorApp {
    fn chat_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("chat_panel")
            .resizable(true)
            .default_width(CHAT_PANEL_WIDTH)
            .show(ctx, |ui| {
                ui.heading("Tutor");
                ui.separator();

                self.controls(ui);
                ui.separator();

                egui::TopBottomPanel::bottom("chat_input")
                    .show_inside(ui, |ui| self.input_row(ui));

                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| self.messages(ui));
            });
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let store = &self.state.store;
        let mut mode = store.settings.reveal.mode;
        let playing = store.audio.is_playing;
        let has_answer = !store.answer.is_empty();

        ui.horizontal(|ui| {
            ui.label("Reveal:");
            ui.selectable_value(&mut mode, RevealMode::Scripted, "Scripted");
            ui.selectable_value(&mut mode, RevealMode::AudioSync, "Follow speech");
        });
        if mode != self.state.store.settings.reveal.mode {
            self.state.dispatch(Action::SetRevealMode { mode });
        }

        ui.horizontal(|ui| {
            if playing {
                if ui.button("⏹ Stop").clicked() {
                    self.state.dispatch(Action::StopSpeech);
                }
            } else if ui
                .add_enabled(has_answer, egui::Button::new("▶ Play answer"))
                .clicked()
            {
                self.state.dispatch(Action::PlayAnswer);
            }
            if ui.button("Clear chat").clicked() {
                self.state.dispatch(Action::ClearHistory);
            }
        });

        egui::CollapsingHeader::new("Profile").show(ui, |ui| {
            self.profile_fields(ui);
        });

        egui::CollapsingHeader::new("View").show(ui, |ui| {
            self.view_settings(ui);
        });
    }

    fn profile_fields(&mut self, ui: &mut egui::Ui) {
        let profile = &self.state.store.profile;
        let mut class = profile.class;
        let mut edits = Vec::new();

        ui.horizontal(|ui| {
            ui.label("Class");
            if ui
                .add(egui::DragValue::new(&mut class).range(1..=12))
                .changed()
            {
                edits.push(("class", class.to_string()));
            }
        });
        for (key, label) in [
            ("name", "Name"),
            ("subject", "Subject"),
            ("language", "Language"),
        ] {
            let mut value = profile.field(key).unwrap_or_default();
            ui.horizontal(|ui| {
                ui.label(label);
                if ui.text_edit_singleline(&mut value).changed() {
                    edits.push((key, value));
                }
            });
        }

        for (key, value) in edits {
            self.state.dispatch(Action::SetProfileField {
                key: key.to_string(),
                value,
            });
        }
    }

    fn view_settings(&mut self, ui: &mut egui::Ui) {
        let mut radius = self.state.store.settings.view.node_radius;
        if slider(ui, &mut radius, NODE_RADIUS_RANGE, "Node radius") {
            self.state.dispatch(Action::SetNodeRadius { radius });
        }

        let mut spacing = *self.state.store.layout.get();
        let mut changed = false;
        changed |= slider(ui, &mut spacing.start_y, START_Y_RANGE, "Top margin");
        changed |= slider(
            ui,
            &mut spacing.level_height,
            LEVEL_HEIGHT_RANGE,
            "Level height",
        );
        changed |= slider(
            ui,
            &mut spacing.horizontal_spacing,
            HORIZONTAL_SPACING_RANGE,
            "Sibling spacing",
        );
        if changed {
            self.state.dispatch(Action::SetLayoutSpacing { spacing });
        }

        if ui.button("Save settings").clicked() {
            self.state.dispatch(Action::SaveSettings {
                path: PathBuf::from(SETTINGS_FILE),
            });
        }
    }

    fn messages(&mut self, ui: &mut egui::Ui) {
        let mut retry = false;
        for message in &self.state.store.messages {
            retry |= message_bubble(ui, message);
        }
        if let Some(typed) = &self.state.store.typed_text {
            bubble(ui, TUTOR_BUBBLE, |ui| {
                ui.label(format!("{typed}▌"));
            });
        }
        if self.state.store.is_loading {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
                ui.label("Thinking…");
            });
        }
        if retry {
            self.state.dispatch(Action::RetryLastMessage);
        }
    }

    fn input_row(&mut self, ui: &mut egui::Ui) {
        let store = &self.state.store;
        let mut input = store.input.clone();
        let can_send = !store.is_loading && !input.trim().is_empty();
        let listening = store.is_listening;

        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let edit = ui.add(
                egui::TextEdit::singleline(&mut input)
                    .hint_text("Ask a question")
                    .desired_width(ui.available_width() - 110.0),
            );
            if edit.changed() {
                self.state.dispatch(Action::SetInput {
                    text: input.clone(),
                });
            }
            let enter = edit.lost_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let mic = if listening { "⏺" } else { "🎤" };
            if ui.button(mic).on_hover_text("Voice input").clicked() {
                self.state.dispatch(if listening {
                    Action::StopListening
                } else {
                    Action::StartListening
                });
            }
            let send = ui.add_enabled(can_send, egui::Button::new("Send"));
            if send.clicked() || (enter && can_send) {
                self.state.dispatch(Action::SendMessage);
            }
        });
        ui.add_space(4.0);
    }
}

fn slider(
    ui: &mut egui::Ui,
    value: &mut f32,
    range: SliderRange,
    text: &str,
) -> bool {
    ui.add(
        egui::Slider::new(value, range.min..=range.max)
            .step_by(range.step as f64)
            .text(text),
    )
    .changed()
}

/// Returns true when the retry button was clicked.
fn message_bubble(ui: &mut egui::Ui, message: &ChatMessage) -> bool {
    let fill = if message.is_error {
        ERROR_BUBBLE
    } else if message.is_from_user() {
        USER_BUBBLE
    } else {
        TUTOR_BUBBLE
    };
    let mut retry = false;
    bubble(ui, fill, |ui| {
        ui.label(RichText::new(&message.content).color(Color32::BLACK));
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(message.formatted_time())
                    .small()
                    .color(Color32::DARK_GRAY),
            );
            if message.can_retry && ui.small_button("Retry").clicked() {
                retry = true;
            }
        });
    });
    retry
}

fn bubble(ui: &mut egui::Ui, fill: Color32, add: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::new()
        .fill(fill)
        .corner_radius(8.0)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add(ui);
        });
    ui.add_space(6.0);
}

// -------------------------------------------------------------------
// Concept map canvas
// -------------------------------------------------------------------

impl TutorApp {
    fn canvas_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(Color32::from_rgb(0xF8, 0xFA, 0xFC)))
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(
                    ui.available_size(),
                    egui::Sense::click_and_drag(),
                );
                self.state.store.interaction.set_canvas(response.rect);
                self.handle_gestures(ui, &response);

                let dragging =
                    self.state.store.interaction.dragged_node().is_some();
                let growth = ctx.animate_bool_with_time(
                    egui::Id::new("drag_growth"),
                    dragging,
                    DRAG_GROWTH_SECONDS,
                );
                let view = &self.state.store.settings.view;
                let drag_scale = 1.0 + (view.drag_growth - 1.0) * growth;

                let sync = self.state.store.sync_snapshot();
                let store = &self.state.store;
                let positions = self.state.cache.positions.get(store);
                let scene = Scene {
                    document: store.document.get(),
                    positions,
                    sync: &sync,
                    camera: &store.interaction,
                    node_radius: view.node_radius,
                    highlight_growth: view.highlight_growth,
                    drag_scale,
                };
                render::paint(ctx, &painter, &scene);

                self.zoom_controls(ctx, response.rect);
            });
    }

    fn handle_gestures(&mut self, ui: &egui::Ui, response: &egui::Response) {
        if response.drag_started() {
            let origin = ui.input(|i| i.pointer.press_origin());
            if let Some(origin) = origin {
                self.state.pointer_down(origin);
            }
        }
        if response.dragged() {
            let delta = response.drag_delta();
            if self.state.store.interaction.dragged_node().is_some() {
                self.state.pointer_move(delta);
            } else {
                self.state.pinch(1.0, delta);
            }
        }
        if response.drag_stopped() {
            self.state.pointer_up();
        }

        if response.hovered() {
            let (zoom, scroll) =
                ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta));
            if zoom != 1.0 || scroll != egui::Vec2::ZERO {
                self.state.pinch(zoom, scroll);
            }
        }
    }

    fn zoom_controls(&mut self, ctx: &egui::Context, canvas: egui::Rect) {
        egui::Area::new(egui::Id::new("zoom_controls"))
            .fixed_pos(canvas.right_top() + vec2(-130.0, 12.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("➕").on_hover_text("Zoom in").clicked() {
                        self.state.dispatch(Action::ZoomIn);
                    }
                    if ui.button("➖").on_hover_text("Zoom out").clicked() {
                        self.state.dispatch(Action::ZoomOut);
                    }
                    if ui.button("⟲").on_hover_text("Reset view").clicked() {
                        self.state.dispatch(Action::ResetView);
                    }
                });
            });
    }
}
