use iced::widget::{column, text, vertical_space, Container};
use iced::{Center, Length};

use crate::app::{App, Message};

pub fn placeholder_screen<'a>(_app: &'a App, title: &'static str) -> Container<'a, Message> {
    let content = column![
        text(title).size(30),
        vertical_space().height(Length::Fixed(20.0)),
        text("Em desenvolvimento").size(20),
    ]
    .align_x(Center);

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(40)
}

pub fn welcome_screen(app: &App) -> Container<Message> {
    let greeting = app
        .session
        .as_ref()
        .map(|s| format!("Bem-vindo, {}!", s.greeting_name()))
        .unwrap_or_else(|| "Bem-vindo!".to_string());

    Container::new(
        column![
            text(greeting).size(30),
            text("O seu perfil ainda não tem acesso a nenhuma área do portal.").size(18),
        ]
        .spacing(15)
        .align_x(Center),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .padding(40)
}
