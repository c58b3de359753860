use crate::chat::ChatClient;
use crate::codec;
use crate::event::AppEvent;
use crate::remote::Message;
use crate::session::{LockState, UnlockGate};
use crate::theme::{Theme, ThemeMode};
use chrono::{DateTime, Local, TimeZone, Utc};
use eframe::egui::{self, Align, Align2, Layout, RichText, ScrollArea};
use std::fmt::Display;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const TOAST_LIFETIME: Duration = Duration::from_secs(4);
const REPAINT_INTERVAL: Duration = Duration::from_millis(250);
const MAX_DIAGNOSTICS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    text: String,
    kind: ToastKind,
    expires_at: Instant,
}

#[derive(Default)]
struct ChangePasswordForm {
    open: bool,
    new_password: String,
    confirm_password: String,
    error: Option<String>,
}

pub struct CovenantApp {
    rx: Receiver<AppEvent>,
    client: ChatClient,
    gate: UnlockGate,
    theme: Theme,
    theme_dirty: bool,
    password_hint: Option<String>,
    passphrase_input: String,
    messages: Vec<Message>,
    messages_loaded: bool,
    fetch_error: Option<String>,
    input_buffer: String,
    is_sending: bool,
    is_clearing: bool,
    confirm_clear: bool,
    change_password: ChangePasswordForm,
    is_changing_password: bool,
    toasts: Vec<Toast>,
    diagnostics_log: Vec<String>,
    scroll_to_bottom: bool,
}

impl CovenantApp {
    pub fn new(
        rx: Receiver<AppEvent>,
        client: ChatClient,
        gate: UnlockGate,
        password_hint: Option<String>,
    ) -> Self {
        let mut app = Self {
            rx,
            client,
            gate,
            theme: Theme::default(),
            theme_dirty: true,
            password_hint,
            passphrase_input: String::new(),
            messages: Vec::new(),
            messages_loaded: false,
            fetch_error: None,
            input_buffer: String::new(),
            is_sending: false,
            is_clearing: false,
            confirm_clear: false,
            change_password: ChangePasswordForm::default(),
            is_changing_password: false,
            toasts: Vec::new(),
            diagnostics_log: Vec::new(),
            scroll_to_bottom: false,
        };

        if app.gate.is_unlocked() {
            app.log_diagnostic("restored unlocked session");
            app.start_polling();
        }

        app
    }

    fn log_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics_log
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), message.into()));
        if self.diagnostics_log.len() > MAX_DIAGNOSTICS {
            self.diagnostics_log.remove(0);
        }
    }

    fn toast(&mut self, kind: ToastKind, text: impl Into<String>) {
        self.toasts.push(Toast {
            text: text.into(),
            kind,
            expires_at: Instant::now() + TOAST_LIFETIME,
        });
    }

    fn start_polling(&mut self) {
        match self.gate.context() {
            Some(ctx) => self.client.start_polling(ctx),
            None => warn!("unlocked without a session passphrase; polling not started"),
        }
    }

    fn submit_unlock(&mut self) {
        if let Some(passphrase) = self.gate.submit(&self.passphrase_input) {
            self.client.verify(passphrase);
        }
    }

    fn lock(&mut self) {
        self.client.stop_polling();
        self.gate.lock();
        self.messages.clear();
        self.messages_loaded = false;
        self.fetch_error = None;
        self.input_buffer.clear();
        self.passphrase_input.clear();
        self.confirm_clear = false;
        self.change_password = ChangePasswordForm::default();
        self.is_sending = false;
        self.is_clearing = false;
        self.is_changing_password = false;
        self.log_diagnostic("locked");
    }

    fn submit_message(&mut self) {
        let text = self.input_buffer.trim().to_string();
        if text.is_empty() || self.is_sending {
            return;
        }

        let Some(ctx) = self.gate.context() else {
            self.toast(ToastKind::Error, "Not authenticated");
            return;
        };

        self.is_sending = true;
        self.client.send(ctx, text);
    }

    fn submit_clear(&mut self) {
        let Some(ctx) = self.gate.context() else {
            self.toast(ToastKind::Error, "Not authenticated");
            return;
        };

        self.is_clearing = true;
        self.client.clear(ctx);
    }

    fn submit_change_password(&mut self) {
        let form = &mut self.change_password;
        if form.new_password.trim().is_empty() {
            form.error = Some("Please enter a new password".to_string());
            return;
        }
        if form.new_password != form.confirm_password {
            form.error = Some("Passwords do not match".to_string());
            return;
        }
        form.error = None;
        let new_password = form.new_password.clone();

        let Some(ctx) = self.gate.context() else {
            self.toast(ToastKind::Error, "Not authenticated");
            return;
        };

        self.is_changing_password = true;
        self.client.change_passphrase(ctx, new_password);
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    self.apply_event(event);
                    ctx.request_repaint();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.log_diagnostic("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::VerifyFinished { passphrase, result } => {
                if self.gate.complete(&passphrase, result) {
                    self.log_diagnostic("unlocked");
                    self.start_polling();
                } else if self.gate.state() == LockState::Locked {
                    self.passphrase_input.clear();
                }
            }
            // Results that land after a lock belong to the old session.
            AppEvent::MessagesFetched(_)
            | AppEvent::SendFinished(_)
            | AppEvent::ClearFinished(_)
            | AppEvent::PassphraseChanged { .. }
                if !self.gate.is_unlocked() =>
            {
                self.log_diagnostic("dropped result from a locked session");
            }
            AppEvent::MessagesFetched(result) => {
                match result {
                    Ok(messages) => {
                        if messages.last().map(|m| m.message_id)
                            != self.messages.last().map(|m| m.message_id)
                        {
                            self.scroll_to_bottom = true;
                        }
                        self.messages = messages;
                        self.messages_loaded = true;
                        self.fetch_error = None;
                    }
                    Err(err) => {
                        self.log_diagnostic(format!("fetch failed: {err}"));
                        self.fetch_error = Some(err.to_string());
                    }
                }
            }
            AppEvent::SendFinished(result) => {
                self.is_sending = false;
                match result {
                    Ok(message) => {
                        self.input_buffer.clear();
                        self.scroll_to_bottom = true;
                        self.log_diagnostic(format!("sent message {}", message.message_id));
                    }
                    Err(err) => {
                        self.log_diagnostic(format!("send failed: {err}"));
                        self.toast(ToastKind::Error, "Failed to send message. Please try again.");
                    }
                }
            }
            AppEvent::ClearFinished(result) => {
                self.is_clearing = false;
                self.confirm_clear = false;
                match result {
                    Ok(()) => {
                        info!("chat cleared");
                        self.toast(ToastKind::Success, "Chat cleared successfully");
                    }
                    Err(err) => {
                        self.log_diagnostic(format!("clear failed: {err}"));
                        self.toast(ToastKind::Error, "Failed to clear chat. Please try again.");
                    }
                }
            }
            AppEvent::PassphraseChanged { passphrase, result } => {
                self.is_changing_password = false;
                let outcome = result.and_then(|()| self.gate.replace_passphrase(&passphrase));
                match outcome {
                    Ok(()) => {
                        self.change_password = ChangePasswordForm::default();
                        self.start_polling();
                        self.toast(ToastKind::Success, "Password changed");
                    }
                    Err(err) => {
                        self.log_diagnostic(format!("password change failed: {err}"));
                        self.change_password.error = Some(err.to_string());
                        self.toast(ToastKind::Error, "Failed to change password.");
                    }
                }
            }
        }
    }

    fn render_unlock_screen(&mut self, ctx: &egui::Context) {
        let verifying = self.gate.state() == LockState::Verifying;
        let mut submit = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space((ui.available_height() * 0.25).max(24.0));
            ui.vertical_centered(|ui| {
                self.theme.card_frame().show(ui, |ui| {
                    ui.set_max_width(360.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Covenant Chat");
                        ui.label(
                            RichText::new(
                                "Enter the shared password to access your private conversation",
                            )
                            .color(self.theme.text_muted),
                        );
                        ui.add_space(12.0);

                        if let Some(error) = self.gate.error() {
                            ui.label(RichText::new(error).color(self.theme.danger));
                        }

                        let response = ui.add_enabled(
                            !verifying,
                            egui::TextEdit::singleline(&mut self.passphrase_input)
                                .password(true)
                                .hint_text("Enter password")
                                .desired_width(f32::INFINITY),
                        );
                        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                            submit = true;
                        }

                        ui.add_space(4.0);
                        if verifying {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label("Unlocking...");
                            });
                        } else if ui.button("Unlock Chat").clicked() {
                            submit = true;
                        }

                        if let Some(hint) = &self.password_hint {
                            ui.add_space(12.0);
                            ui.label(
                                RichText::new(format!("Default password: {hint}"))
                                    .small()
                                    .color(self.theme.text_muted),
                            );
                        }
                    });
                });
            });
        });

        if submit && !verifying {
            self.submit_unlock();
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let mut lock_now = false;
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.strong("Covenant Chat");
                    ui.label(
                        RichText::new("Private conversation")
                            .small()
                            .color(self.theme.text_muted),
                    );
                });

                ui.separator();
                if self.client.is_polling() {
                    ui.label(RichText::new("Live").small().color(self.theme.success));
                } else {
                    ui.label(RichText::new("Paused").small().color(self.theme.text_muted));
                }

                if let Some(error) = &self.fetch_error {
                    if !self.messages.is_empty() {
                        ui.label(
                            RichText::new(format!("Sync problem: {error}"))
                                .small()
                                .color(self.theme.danger),
                        );
                    }
                }

                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Lock").on_hover_text("Lock chat").clicked() {
                        lock_now = true;
                    }
                    if ui.button("Clear").on_hover_text("Clear chat").clicked() {
                        self.confirm_clear = true;
                    }
                    if ui.button("Password").on_hover_text("Change password").clicked() {
                        self.change_password.open = true;
                    }
                    let theme_label = match self.theme.mode {
                        ThemeMode::Dark => "Light",
                        ThemeMode::Light => "Dark",
                    };
                    if ui.button(theme_label).on_hover_text("Toggle theme").clicked() {
                        self.theme = Theme::for_mode(self.theme.mode.toggled());
                        self.theme_dirty = true;
                    }
                });
            });
        });

        if lock_now {
            self.lock();
        }
    }

    fn render_composer(&mut self, ctx: &egui::Context) {
        let mut send_now = false;
        egui::TopBottomPanel::bottom("composer")
            .frame(self.theme.composer_frame())
            .show(ctx, |ui| {
                let composer_id = ui.make_persistent_id("composer_input");
                let focused = ui.memory(|memory| memory.has_focus(composer_id));
                // Plain Enter sends; Shift+Enter falls through to the text edit.
                if focused
                    && !self.is_sending
                    && ui.input_mut(|input| {
                        !input.modifiers.shift
                            && input.consume_key(egui::Modifiers::NONE, egui::Key::Enter)
                    })
                {
                    send_now = true;
                }

                ui.horizontal(|ui| {
                    let button_width = 72.0;
                    ui.add_enabled(
                        !self.is_sending,
                        egui::TextEdit::multiline(&mut self.input_buffer)
                            .id(composer_id)
                            .desired_rows(2)
                            .desired_width(ui.available_width() - button_width)
                            .hint_text("Type a message... (Shift+Enter for new line)"),
                    );

                    if self.is_sending {
                        ui.spinner();
                    } else {
                        let clicked = ui
                            .add_enabled(
                                !self.input_buffer.trim().is_empty(),
                                egui::Button::new("Send"),
                            )
                            .clicked();
                        send_now |= clicked;
                    }
                });

                egui::CollapsingHeader::new("Diagnostics")
                    .default_open(false)
                    .show(ui, |ui| {
                        ScrollArea::vertical()
                            .id_salt("diagnostics_log")
                            .max_height(90.0)
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                for entry in &self.diagnostics_log {
                                    ui.label(RichText::new(entry).small().monospace());
                                }
                            });
                    });
            });

        if send_now {
            self.submit_message();
        }
    }

    fn render_transcript(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.messages_loaded && self.fetch_error.is_none() {
                centered_status(ui, |ui| {
                    ui.spinner();
                    ui.label(RichText::new("Loading messages...").color(self.theme.text_muted));
                });
                return;
            }

            if self.messages.is_empty() {
                if self.fetch_error.is_some() {
                    centered_status(ui, |ui| {
                        ui.label(RichText::new("Failed to load messages").color(self.theme.danger));
                        ui.label(
                            RichText::new("Please check your password and try again")
                                .small()
                                .color(self.theme.text_muted),
                        );
                    });
                } else {
                    centered_status(ui, |ui| {
                        ui.label(RichText::new("No messages yet").color(self.theme.text_muted));
                        ui.label(
                            RichText::new("Start the conversation below")
                                .small()
                                .color(self.theme.text_muted),
                        );
                    });
                }
                return;
            }

            let device_id = self.gate.device_id().clone();
            let now = Local::now();
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    let bubble_width = ui.available_width() * 0.75;
                    for message in &self.messages {
                        let decoded = codec::decode(&message.content);
                        let own = codec::is_own(&message.content, &device_id);
                        let layout = if own {
                            Layout::top_down(Align::Max)
                        } else {
                            Layout::top_down(Align::Min)
                        };

                        ui.with_layout(layout, |ui| {
                            ui.label(
                                RichText::new(format!(
                                    "{}  {}",
                                    if own { "You" } else { "Partner" },
                                    format_timestamp(message.timestamp, &now)
                                ))
                                .small()
                                .color(self.theme.text_muted),
                            );
                            self.theme.bubble_frame(own).show(ui, |ui| {
                                ui.set_max_width(bubble_width);
                                ui.add(
                                    egui::Label::new(
                                        RichText::new(&decoded.text)
                                            .color(self.theme.bubble_text_color(own)),
                                    )
                                    .wrap(),
                                );
                            });
                        });
                        ui.add_space(8.0);
                    }

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(Align::BOTTOM));
                    }
                });
            self.scroll_to_bottom = false;
        });
    }

    fn render_clear_dialog(&mut self, ctx: &egui::Context) {
        if !self.confirm_clear {
            return;
        }

        let mut confirm = false;
        let mut cancel = false;
        egui::Window::new("Clear all messages?")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(
                    "This will permanently delete all messages in this chat. This action cannot be undone.",
                );
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.add_enabled(!self.is_clearing, egui::Button::new("Cancel")).clicked() {
                        cancel = true;
                    }
                    if self.is_clearing {
                        ui.spinner();
                        ui.label("Clearing...");
                    } else if ui
                        .button(RichText::new("Clear Chat").color(self.theme.danger))
                        .clicked()
                    {
                        confirm = true;
                    }
                });
            });

        if cancel {
            self.confirm_clear = false;
        }
        if confirm {
            self.submit_clear();
        }
    }

    fn render_change_password_dialog(&mut self, ctx: &egui::Context) {
        if !self.change_password.open {
            return;
        }

        let mut submit = false;
        let mut cancel = false;
        let busy = self.is_changing_password;
        egui::Window::new("Change password")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Both participants will need the new password to unlock.");
                if let Some(error) = &self.change_password.error {
                    ui.label(RichText::new(error).color(self.theme.danger));
                }
                ui.add_enabled(
                    !busy,
                    egui::TextEdit::singleline(&mut self.change_password.new_password)
                        .password(true)
                        .hint_text("New password"),
                );
                ui.add_enabled(
                    !busy,
                    egui::TextEdit::singleline(&mut self.change_password.confirm_password)
                        .password(true)
                        .hint_text("Confirm new password"),
                );
                ui.horizontal(|ui| {
                    if ui.add_enabled(!busy, egui::Button::new("Cancel")).clicked() {
                        cancel = true;
                    }
                    if busy {
                        ui.spinner();
                    } else if ui.button("Change").clicked() {
                        submit = true;
                    }
                });
            });

        if cancel {
            self.change_password = ChangePasswordForm::default();
        }
        if submit {
            self.submit_change_password();
        }
    }

    fn render_toasts(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        self.toasts.retain(|toast| toast.expires_at > now);
        if self.toasts.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("toasts"))
            .anchor(Align2::RIGHT_BOTTOM, [-16.0, -96.0])
            .show(ctx, |ui| {
                for toast in &self.toasts {
                    let color = match toast.kind {
                        ToastKind::Success => self.theme.success,
                        ToastKind::Error => self.theme.danger,
                    };
                    self.theme.card_frame().show(ui, |ui| {
                        ui.label(RichText::new(&toast.text).color(color));
                    });
                }
            });
    }
}

fn centered_status(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.add_space((ui.available_height() * 0.4).max(16.0));
    ui.vertical_centered(add_contents);
}

/// Time of day for messages sent today, month/day/time otherwise.
fn format_timestamp<Tz>(timestamp_nanos: i64, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let sent =
        DateTime::<Utc>::from_timestamp_nanos(timestamp_nanos).with_timezone(&now.timezone());
    if sent.date_naive() == now.date_naive() {
        sent.format("%-I:%M %p").to_string()
    } else {
        sent.format("%b %-d, %-I:%M %p").to_string()
    }
}

impl eframe::App for CovenantApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.theme_dirty {
            self.theme.apply_visuals(ctx);
            self.theme_dirty = false;
        }

        self.drain_events(ctx);

        if self.gate.is_unlocked() {
            self.render_top_bar(ctx);
        }
        // Locking from the top bar changes what the rest of the frame shows.
        if self.gate.is_unlocked() {
            self.render_composer(ctx);
            self.render_transcript(ctx);
            self.render_clear_dialog(ctx);
            self.render_change_password_dialog(ctx);
        } else {
            self.render_unlock_screen(ctx);
        }
        self.render_toasts(ctx);

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}
