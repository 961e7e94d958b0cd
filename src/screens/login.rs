use iced::widget::{button, column, text, text_input, vertical_space, Container};
use iced::{Center, Color, Length};

use crate::app::{App, Message};

#[derive(Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub loading: bool,
}

impl LoginForm {
    /// Forgets everything typed, e.g. after signing out.
    pub fn clear(&mut self) {
        *self = LoginForm::default();
    }
}

pub fn login_screen(app: &App) -> Container<Message> {
    let form = &app.login;
    let submit = button(if form.loading { "A entrar..." } else { "Entrar" }).padding(10);

    let mut content = column![
        text("Portal Escolar").size(30),
        text("Faça login para aceder ao portal.").size(16),
        vertical_space().height(Length::Fixed(20.0)),
        text_input("Email", &form.email)
            .on_input(Message::EmailChanged)
            .on_submit(Message::LoginPressed)
            .padding(10)
            .size(18)
            .width(Length::Fixed(350.0)),
        text_input("Senha", &form.password)
            .on_input(Message::PasswordChanged)
            .on_submit(Message::LoginPressed)
            .secure(true)
            .padding(10)
            .size(18)
            .width(Length::Fixed(350.0)),
        if form.loading { submit } else { submit.on_press(Message::LoginPressed) },
    ]
    .spacing(15)
    .width(Length::Fill)
    .align_x(Center);

    if let Some(error) = &form.error {
        content = content.push(text(error).size(16).color(Color::from_rgb8(204, 36, 29)));
    }

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(40)
}

/// Shown while a stored session is checked at startup.
pub fn restoring_screen(_app: &App) -> Container<Message> {
    Container::new(text("A carregar...").size(20))
        .center_x(Length::Fill)
        .center_y(Length::Fill)
}
