use iced::widget::container::bordered_box;
use iced::widget::{Column, Container, Row, Text};
use iced::{Length, Task};

use super::attendance_bars;
use crate::app::{App, Message};
use crate::backend::SharedBackend;
use crate::data;
use crate::error::report;
use crate::model::{AdminStats, AttendanceSummary};
use crate::sync::{Remote, Ticket};

/// School-wide numbers plus the attendance chart. The two sources load
/// together and fail separately.
#[derive(Default)]
pub struct AdminDashboardPage {
    pub stats: Remote<AdminStats>,
    pub chart: Remote<Vec<AttendanceSummary>>,
    pub stats_error: Option<String>,
    pub chart_error: Option<String>,
}

impl AdminDashboardPage {
    pub fn start(&mut self, backend: &SharedBackend) -> Task<Message> {
        let stats_ticket = self.stats.begin();
        let chart_ticket = self.chart.begin();
        Task::perform(data::admin_overview(backend.clone()), move |(stats, chart)| {
            Message::AdminOverviewLoaded {
                stats_ticket,
                chart_ticket,
                stats: stats.map_err(report("loading admin stats")),
                chart: chart.map_err(report("loading attendance overview")),
            }
        })
    }

    pub fn loaded(
        &mut self,
        stats_ticket: Ticket,
        chart_ticket: Ticket,
        stats: Result<AdminStats, String>,
        chart: Result<Vec<AttendanceSummary>, String>,
    ) {
        self.stats_error = self.stats.finish(stats_ticket, stats).err();
        self.chart_error = self.chart.finish(chart_ticket, chart).err();
    }
}

fn stat_card<'a>(app: &'a App, title: &'a str, value: i64) -> Container<'a, Message> {
    Container::new(
        Column::new()
            .spacing(5)
            .push(Text::new(title).size(16))
            .push(Text::new(value.to_string()).size(28)),
    )
    .padding(15)
    .width(Length::FillPortion(1))
    .style(move |_| bordered_box(&app.theme))
}

pub fn admin_dashboard_screen<'a>(app: &'a App, page: &'a AdminDashboardPage) -> Container<'a, Message> {
    if page.stats.is_loading() && page.chart.is_loading() {
        return Container::new(Text::new("A carregar o dashboard do administrador...")).padding(20);
    }

    let stats = page.stats.value();
    let mut content = Column::new()
        .spacing(20)
        .push(Text::new("Dashboard do Administrador").size(30))
        .push(
            Row::new()
                .spacing(20)
                .push(stat_card(app, "Total de Alunos", stats.total_alunos))
                .push(stat_card(app, "Total de Turmas", stats.total_turmas)),
        );
    if page.stats_error.is_some() {
        content = content.push(Text::new("Não foi possível carregar as estatísticas.").size(14));
    }

    content = content.push(Text::new("Percentual de Presença Geral").size(22));
    content = if page.chart.is_loading() {
        content.push(Text::new("A carregar..."))
    } else if page.chart_error.is_some() {
        content.push(Text::new("Não foi possível carregar os dados de presença."))
    } else {
        content.push(attendance_bars(page.chart.value()))
    };

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
}
