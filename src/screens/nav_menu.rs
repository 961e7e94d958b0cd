use iced::widget::{button, text, vertical_space, Column, Container, Row};
use iced::{Alignment, Element, Length, Renderer, Theme};
use iced_font_awesome::fa_icon_solid;

use crate::app::{App, Message};
use crate::router;

fn icon_button_content<'a>(
    icon_element: impl Into<Element<'a, Message, Theme, Renderer>>,
    label: &'a str,
) -> Row<'a, Message> {
    Row::new()
        .align_y(Alignment::Center)
        .spacing(5)
        .push(icon_element)
        .push(text(label))
}

pub fn nav_menu(app: &App) -> Container<Message> {
    let Some(navigation) = &app.navigation else {
        return Container::new(Column::new());
    };
    let current = navigation.current().path;

    let mut content = Column::new().spacing(10);
    if let Some(session) = &app.session {
        content = content
            .push(text(format!("Olá, {}", session.greeting_name())).size(18))
            .push(text(navigation.role().to_string()).size(14));
    }

    for route in router::routes_for(navigation.role()) {
        let Some(label) = route.label else { continue };
        let entry = button(icon_button_content(
            fa_icon_solid(route.icon).style(move |_| text::base(&app.theme)),
            label,
        ))
        .width(Length::Fill);
        let entry = if route.path == current {
            entry.style(button::primary)
        } else {
            entry.style(button::secondary).on_press(Message::Navigate(route.path))
        };
        content = content.push(entry);
    }

    content = content.push(vertical_space());
    if navigation.history().len() > 1 {
        content = content.push(
            button(icon_button_content(
                fa_icon_solid("arrow-left").style(move |_| text::base(&app.theme)),
                "Voltar",
            ))
            .on_press(Message::GoBack)
            .width(Length::Fill),
        );
    }
    content = content.push(
        button(icon_button_content(
            fa_icon_solid("arrow-right-from-bracket").style(move |_| text::base(&app.theme)),
            "Sair",
        ))
        .on_press(Message::Logout)
        .width(Length::Fill),
    );

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(10)
}
