use tokio::sync::mpsc;

use crate::common::{SessionCommand, SessionEvent};
use crate::session::{ChatSessionStateMachine, Screen, SendOutcome, Signal};

/// Tác vụ nền sở hữu state machine; UI chỉ nói chuyện với nó qua kênh.
pub struct ChatClient {
    machine: ChatSessionStateMachine,
    event_sender: mpsc::Sender<SessionEvent>,
    command_receiver: mpsc::Receiver<SessionCommand>,
}

impl ChatClient {
    pub fn new(
        machine: ChatSessionStateMachine,
        event_sender: mpsc::Sender<SessionEvent>,
        command_receiver: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        Self {
            machine,
            event_sender,
            command_receiver,
        }
    }

    /// Runs until the UI drops its command sender, then closes the session.
    pub async fn run(mut self) {
        if let Err(err) = self.machine.open().await {
            log::warn!("Initial gateway connection failed: {err}");
            self.notify(SessionEvent::Error(err)).await;
        }
        log::info!("Chat client event loop started");

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                signal = self.machine.next_signal() => {
                    let screen = self.machine.screen();
                    let dropped = matches!(signal, Signal::LinkDropped);
                    if let Some(entry) = self.machine.handle_signal(signal) {
                        self.notify(SessionEvent::MessageAppended(entry)).await;
                    }
                    self.notify_screen_change(screen).await;
                    // Báo lỗi cả khi màn hình không đổi (rơi link ngay ở Identify).
                    if dropped {
                        if let Some(err) = self.machine.last_error() {
                            self.notify(SessionEvent::Error(err.clone())).await;
                        }
                    }
                }
            }
        }

        self.machine.shutdown().await;
        log::info!("Chat client stopped");
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        let before = self.machine.screen();
        self.notify(SessionEvent::Busy(true)).await;

        match command {
            SessionCommand::Reconnect => {
                if let Err(err) = self.machine.reconnect().await {
                    self.notify(SessionEvent::Error(err)).await;
                }
            }
            SessionCommand::SubmitIdentity(identity) => {
                match self.machine.submit_identity(identity).await {
                    Ok(listing) => {
                        self.notify(SessionEvent::ContactsLoaded(listing.contacts))
                            .await;
                        if let Some(warning) = listing.warning {
                            self.notify(SessionEvent::Error(warning)).await;
                        }
                    }
                    Err(err) => self.notify(SessionEvent::Error(err)).await,
                }
            }
            SessionCommand::RefreshContacts => match self.machine.refresh_contacts().await {
                Ok(listing) => {
                    self.notify(SessionEvent::ContactsLoaded(listing.contacts))
                        .await;
                    if let Some(warning) = listing.warning {
                        self.notify(SessionEvent::Error(warning)).await;
                    }
                }
                Err(err) => self.notify(SessionEvent::Error(err)).await,
            },
            SessionCommand::EnterRoom(counterpart) => match self.machine.enter(counterpart).await {
                Ok(entry) => {
                    self.notify(SessionEvent::RoomOpened {
                        room: entry.room,
                        counterpart: entry.counterpart,
                        history: entry.history,
                    })
                    .await;
                }
                Err(err) => self.notify(SessionEvent::Error(err)).await,
            },
            SessionCommand::SendMessage(text) => match self.machine.send(&text).await {
                Ok(SendOutcome::Sent) => {}
                Ok(SendOutcome::IgnoredEmpty) => log::debug!("Ignoring blank message"),
                Err(err) => self.notify(SessionEvent::Error(err)).await,
            },
            SessionCommand::LeaveRoom => self.machine.leave().await,
        }

        self.notify(SessionEvent::Busy(false)).await;
        self.notify_screen_change(before).await;
    }

    async fn notify_screen_change(&self, before: Screen) {
        let after = self.machine.screen();
        if after != before {
            log::info!("Screen {before:?} -> {after:?}");
            self.notify(SessionEvent::ScreenChanged(after)).await;
        }
    }

    async fn notify(&self, event: SessionEvent) {
        if let Err(err) = self.event_sender.send(event).await {
            log::warn!("Failed to notify UI: {err}");
        }
    }
}
