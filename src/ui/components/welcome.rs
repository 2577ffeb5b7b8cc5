use eframe::egui;

use crate::ui::state::AppState;

/// Form nhận diện khách. Trả về `true` khi người dùng bấm "Start chat".
pub fn render(ui: &mut egui::Ui, state: &mut AppState) -> bool {
    ui.label("Tell us who you are to start chatting.");
    ui.add_space(8.0);

    egui::Grid::new("identity_form")
        .num_columns(2)
        .spacing([8.0, 6.0])
        .show(ui, |ui| {
            ui.label("Name");
            ui.text_edit_singleline(&mut state.name_input);
            ui.end_row();

            ui.label("Email");
            ui.text_edit_singleline(&mut state.email_input);
            ui.end_row();

            ui.label("Telephone");
            ui.text_edit_singleline(&mut state.telephone_input);
            ui.end_row();
        });

    ui.add_space(8.0);
    let mut submit = false;
    ui.horizontal(|ui| {
        let button = ui.add_enabled(!state.busy, egui::Button::new("Start chat"));
        if button.clicked() {
            submit = true;
        }
        if state.busy {
            ui.spinner();
        }
    });

    submit
}
