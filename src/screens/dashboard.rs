use iced::widget::{Column, Container, Text};
use iced::{Color, Length, Task};

use super::attendance_bars;
use crate::app::{App, Message};
use crate::backend::SharedBackend;
use crate::data;
use crate::error::report;
use crate::model::AttendanceSummary;
use crate::sync::{Remote, Ticket};

pub const LOAD_ERROR: &str = "Não foi possível carregar os dados do dashboard.";

/// Professor home: attendance percentage per student.
#[derive(Default)]
pub struct DashboardPage {
    pub chart: Remote<Vec<AttendanceSummary>>,
    pub error: Option<String>,
}

impl DashboardPage {
    pub fn start(&mut self, backend: &SharedBackend) -> Task<Message> {
        self.error = None;
        let ticket = self.chart.begin();
        Task::perform(data::attendance_overview(backend.clone()), move |result| {
            Message::DashboardLoaded(ticket, result.map_err(report("loading dashboard")))
        })
    }

    pub fn loaded(&mut self, ticket: Ticket, result: Result<Vec<AttendanceSummary>, String>) {
        if self.chart.finish(ticket, result).is_err() {
            self.error = Some(LOAD_ERROR.to_string());
        }
    }
}

pub fn dashboard_screen<'a>(_app: &'a App, page: &'a DashboardPage) -> Container<'a, Message> {
    let content = if page.chart.is_loading() {
        Column::new().push(Text::new("Carregando dados do dashboard..."))
    } else if let Some(error) = &page.error {
        Column::new().push(Text::new(error).color(Color::from_rgb8(204, 36, 29)))
    } else {
        Column::new()
            .spacing(20)
            .push(Text::new("Dashboard - Percentual de Presença por Aluno").size(26))
            .push(attendance_bars(page.chart.value()))
    };

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
}
