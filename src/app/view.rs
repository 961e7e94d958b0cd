use iced::widget::container::bordered_box;
use iced::widget::{Column, Container, Row, button, horizontal_space, text};
use iced::{Alignment, Color, Element, Length};

use crate::notification::ToastKind;
use crate::screens::{
    admin_dashboard_screen, attendance_screen, dashboard_screen, grades_screen, guardian_screen,
    login_screen, nav_menu, placeholder_screen, restoring_screen, roster_screen,
    secretaria_dashboard_screen, settings_screen, welcome_screen,
};

use super::state::{PageState, Screen};
use super::{App, Message};

impl App {
    pub fn view(&self) -> Element<Message> {
        match self.screen {
            Screen::Restoring => restoring_screen(self).into(),
            Screen::Login => Column::new()
                .push(self.toasts())
                .push(login_screen(self))
                .into(),
            Screen::Portal => Row::new()
                .spacing(20)
                .push(
                    Container::new(nav_menu(self))
                        .width(Length::Fixed(220.0))
                        .height(Length::Fill)
                        .padding(10),
                )
                .push(
                    Column::new()
                        .width(Length::Fill)
                        .push(self.toasts())
                        .push(self.page_view().width(Length::Fill)),
                )
                .into(),
        }
    }

    fn page_view(&self) -> Container<Message> {
        match &self.page {
            PageState::Welcome => welcome_screen(self),
            PageState::Dashboard(page) => dashboard_screen(self, page),
            PageState::Admin(page) => admin_dashboard_screen(self, page),
            PageState::Attendance(page) => attendance_screen(self, page),
            PageState::SecretariaDashboard(page) => secretaria_dashboard_screen(self, page),
            PageState::Grades(page) => grades_screen(self, page),
            PageState::Guardian(page) => guardian_screen(self, page),
            PageState::Roster(page) => roster_screen(self, page),
            PageState::Settings(page) => settings_screen(self, page),
            PageState::Placeholder(title) => placeholder_screen(self, *title),
        }
    }

    fn toasts(&self) -> Column<Message> {
        self.notifications.iter().fold(Column::new().spacing(5).padding(5), |column, toast| {
            let color = match toast.kind {
                ToastKind::Success => Color::from_rgb8(46, 160, 67),
                ToastKind::Error => Color::from_rgb8(204, 36, 29),
            };
            column.push(
                Container::new(
                    Row::new()
                        .align_y(Alignment::Center)
                        .push(text(&toast.message).color(color))
                        .push(horizontal_space())
                        .push(button("x").on_press(Message::DismissToast(toast.id))),
                )
                .padding(8)
                .width(Length::Fill)
                .style(move |_| bordered_box(&self.theme)),
            )
        })
    }
}
