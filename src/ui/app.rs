use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{SessionCommand, SessionEvent};
use crate::session::Screen;

use super::components::{
    chat_area::{self, ChatAreaActions},
    contacts::{self, ContactsActions},
    input_bar, welcome,
};
use super::state::AppState;

pub struct ChatApp {
    state: AppState,
    command_sender: mpsc::Sender<SessionCommand>,
    event_receiver: mpsc::Receiver<SessionEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<SessionCommand>,
        event_receiver: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        Self {
            state: AppState::new(),
            command_sender,
            event_receiver,
        }
    }

    fn handle_session_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.state.apply(event);
        }
    }

    fn send_command(&mut self, command: SessionCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to chat client: {err}");
        }
    }

    fn render_error(&mut self, ui: &mut egui::Ui) {
        let Some(err) = self.state.error.clone() else {
            return;
        };
        let mut retry = false;
        let mut dismiss = false;
        ui.horizontal(|ui| {
            ui.colored_label(egui::Color32::LIGHT_RED, err.to_string());
            if err.is_connectivity() && ui.button("Retry").clicked() {
                retry = true;
            }
            if ui.small_button("✕").clicked() {
                dismiss = true;
            }
        });
        if retry {
            self.state.dismiss_error();
            self.send_command(SessionCommand::Reconnect);
        } else if dismiss {
            self.state.dismiss_error();
        }
        ui.separator();
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_session_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Chat");
            ui.separator();
            self.render_error(ui);

            match self.state.screen {
                Screen::Identify => {
                    if welcome::render(ui, &mut self.state) {
                        let identity = self.state.identity();
                        self.send_command(SessionCommand::SubmitIdentity(identity));
                    }
                }
                Screen::Directory => {
                    let actions: ContactsActions = contacts::render(ui, &self.state);
                    if let Some(counterpart) = actions.selected {
                        self.send_command(SessionCommand::EnterRoom(counterpart));
                    }
                    if actions.refresh {
                        self.send_command(SessionCommand::RefreshContacts);
                    }
                }
                Screen::Conversation => {
                    let actions: ChatAreaActions = chat_area::render(ui, &self.state);
                    ui.separator();
                    if let Some(content) = input_bar::render(ui, &mut self.state.input_text) {
                        self.send_command(SessionCommand::SendMessage(content));
                    }
                    if actions.leave {
                        self.send_command(SessionCommand::LeaveRoom);
                    }
                }
            }
        });

        ctx.request_repaint();
    }
}
