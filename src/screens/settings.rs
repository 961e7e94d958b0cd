use iced::widget::{button, column, pick_list, row, text, text_input, vertical_space, Container};
use iced::{Center, Color, Length, Task, Theme};

use crate::app::{App, Message};
use crate::backend::SharedBackend;
use crate::config::theme_to_str;
use crate::data;
use crate::error::report;
use crate::model::Profile;
use crate::notification::Notifications;
use crate::sync::{Optimistic, Revision};

/// Key of the display name in the ledger; there is only the caller's own.
const NAME: &str = "full_name";

#[derive(Debug, Default)]
pub struct SettingsPage {
    pub name_input: String,
    pub names: Optimistic<&'static str, String>,
    pub form_error: Option<String>,
}

impl SettingsPage {
    pub fn new(current_name: &str) -> Self {
        let mut names = Optimistic::default();
        names.reset([(NAME, current_name.to_string())].into_iter().collect());
        SettingsPage {
            name_input: current_name.to_string(),
            names,
            form_error: None,
        }
    }

    /// Name shown in the page header, including an unsaved edit.
    pub fn display_name(&self) -> &str {
        self.names.get(&NAME).map(String::as_str).unwrap_or("")
    }

    pub fn is_saving(&self) -> bool {
        self.names.pending_revision(&NAME).is_some()
    }

    pub fn submit(&mut self) -> Option<(Revision, String)> {
        let name = self.name_input.trim().to_string();
        if name.is_empty() {
            self.form_error = Some("O nome não pode ficar vazio.".to_string());
            return None;
        }
        self.form_error = None;
        Some((self.names.propose(NAME, name.clone()), name))
    }

    pub fn save(revision: Revision, user_id: String, name: String, backend: &SharedBackend) -> Task<Message> {
        Task::perform(data::rename_profile(backend.clone(), user_id, name), move |result| {
            Message::DisplayNameSaved {
                revision,
                result: result.map_err(report("renaming profile")),
            }
        })
    }

    /// Returns the stored profile when the backend accepted the edit.
    pub fn saved(
        &mut self,
        revision: Revision,
        result: Result<Profile, String>,
        notifications: &mut Notifications,
    ) -> Option<Profile> {
        match result {
            Ok(profile) => {
                self.names.confirm(&NAME, revision, profile.display_name().to_string());
                notifications.success("Nome atualizado com sucesso!");
                Some(profile)
            }
            Err(err) => {
                if self.names.reject(&NAME, revision) {
                    self.name_input = self.display_name().to_string();
                }
                notifications.error(format!("Erro ao atualizar o nome: {}", err));
                None
            }
        }
    }
}

pub fn settings_screen<'a>(app: &'a App, page: &'a SettingsPage) -> Container<'a, Message> {
    let theme_names: Vec<&'static str> = Theme::ALL.iter().map(theme_to_str).collect();

    let save = button(if page.is_saving() { "A guardar..." } else { "Guardar" }).padding(10);
    let mut content = column![
        text("Configurações").size(30),
        vertical_space().height(Length::Fixed(20.0)),
        text("Tema").size(20),
        pick_list(theme_names, Some(theme_to_str(&app.theme)), Message::ThemeSelected)
            .placeholder("Escolha um tema"),
        vertical_space().height(Length::Fixed(20.0)),
        text(format!("Nome de exibição: {}", page.display_name())).size(20),
        row![
            text_input("Nome completo", &page.name_input)
                .on_input(Message::DisplayNameChanged)
                .on_submit(Message::DisplayNameSubmitted)
                .padding(10)
                .width(Length::Fixed(350.0)),
            if page.is_saving() { save } else { save.on_press(Message::DisplayNameSubmitted) },
        ]
        .spacing(10),
    ]
    .spacing(15)
    .align_x(Center);

    if let Some(error) = &page.form_error {
        content = content.push(text(error).color(Color::from_rgb8(204, 36, 29)));
    }

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(40)
}
