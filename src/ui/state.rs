use crate::common::{ChatError, ChatHistoryEntry, Connection, Identity, Room, SessionEvent};
use crate::session::Screen;

/// Trạng thái cục bộ của UI. Chỉ thay đổi theo `SessionEvent` từ chat client.
pub struct AppState {
    pub screen: Screen,
    pub busy: bool,
    pub name_input: String,
    pub email_input: String,
    pub telephone_input: String,
    pub contacts: Vec<Connection>,
    pub room: Option<Room>,
    pub counterpart: Option<Connection>,
    pub history: Vec<ChatHistoryEntry>,
    pub input_text: String,
    pub error: Option<ChatError>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Identify,
            busy: false,
            name_input: String::new(),
            email_input: String::new(),
            telephone_input: String::new(),
            contacts: Vec::new(),
            room: None,
            counterpart: None,
            history: Vec::new(),
            input_text: String::new(),
            error: None,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(
            self.name_input.trim(),
            self.email_input.trim(),
            self.telephone_input.trim(),
        )
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ScreenChanged(screen) => {
                self.screen = screen;
                match screen {
                    Screen::Identify => {
                        self.contacts.clear();
                        self.clear_room();
                    }
                    Screen::Directory => self.clear_room(),
                    Screen::Conversation => self.error = None,
                }
            }
            SessionEvent::Busy(busy) => self.busy = busy,
            SessionEvent::ContactsLoaded(contacts) => self.contacts = contacts,
            SessionEvent::RoomOpened {
                room,
                counterpart,
                history,
            } => {
                self.room = Some(room);
                self.counterpart = Some(counterpart);
                self.history = history;
                self.input_text.clear();
            }
            SessionEvent::MessageAppended(entry) => self.history.push(entry),
            SessionEvent::Error(err) => {
                log::warn!("{err}");
                self.error = Some(err);
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    fn clear_room(&mut self) {
        self.room = None;
        self.counterpart = None;
        self.history.clear();
        self.input_text.clear();
    }
}
