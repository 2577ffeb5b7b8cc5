use eframe::egui;

use crate::ui::state::AppState;

#[derive(Default)]
pub struct ChatAreaActions {
    pub leave: bool,
}

pub fn render(ui: &mut egui::Ui, state: &AppState) -> ChatAreaActions {
    let mut actions = ChatAreaActions::default();

    ui.horizontal(|ui| {
        let title = state
            .counterpart
            .as_ref()
            .map(|c| c.display_name().to_string())
            .unwrap_or_default();
        ui.strong(title);
        if ui.button("Leave").clicked() {
            actions.leave = true;
        }
    });
    ui.separator();

    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .max_height(ui.available_height() - 40.0)
        .show(ui, |ui| {
            for entry in &state.history {
                let theirs = state
                    .counterpart
                    .as_ref()
                    .is_some_and(|counterpart| entry.is_from(counterpart));
                let author = if entry.message.author_name.is_empty() {
                    entry.connection_id.as_str()
                } else {
                    entry.message.author_name.as_str()
                };
                let color = if theirs {
                    egui::Color32::LIGHT_BLUE
                } else {
                    egui::Color32::LIGHT_GREEN
                };
                ui.horizontal_wrapped(|ui| {
                    ui.colored_label(color, format!("{author}:"));
                    ui.label(entry.message.text.as_str());
                });
            }
        });

    actions
}
