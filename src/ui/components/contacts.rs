use eframe::egui;

use crate::common::Connection;
use crate::ui::state::AppState;

#[derive(Default)]
pub struct ContactsActions {
    pub selected: Option<Connection>,
    pub refresh: bool,
}

pub fn render(ui: &mut egui::Ui, state: &AppState) -> ContactsActions {
    let mut actions = ContactsActions::default();

    ui.horizontal(|ui| {
        ui.label("Contacts");
        if ui.add_enabled(!state.busy, egui::Button::new("Refresh")).clicked() {
            actions.refresh = true;
        }
        if state.busy {
            ui.spinner();
        }
    });
    ui.separator();

    if state.contacts.is_empty() {
        ui.label("No contacts available right now");
        return actions;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for contact in &state.contacts {
            ui.horizontal(|ui| {
                ui.colored_label(egui::Color32::GREEN, "●");
                let label = ui.add_enabled(!state.busy, egui::Button::new(contact.display_name()));
                if !contact.user.email.is_empty() {
                    ui.label(egui::RichText::new(&contact.user.email).weak());
                }
                if label.clicked() {
                    actions.selected = Some(contact.clone());
                }
            });
        }
    });

    actions
}
