use iced::widget::container::bordered_box;
use iced::widget::{Column, Container, Row, Text, horizontal_space};
use iced::{Color, Length, Task};

use super::format_date;
use crate::app::{App, Message};
use crate::backend::SharedBackend;
use crate::data;
use crate::error::report;
use crate::model::{AttendanceRecord, AttendanceStatus, GradeEntry, Student};
use crate::notification::Notifications;
use crate::sync::{Remote, Ticket};

pub const RECENT_ITEMS: usize = 5;

const GOOD: Color = Color::from_rgb(0.29, 0.87, 0.50);
const BAD: Color = Color::from_rgb(0.97, 0.44, 0.44);

/// Overview of the student linked to the signed-in guardian (or student).
pub struct GuardianPage {
    pub student: Remote<Option<Student>>,
    pub student_error: bool,
    pub grades: Remote<Vec<GradeEntry>>,
    pub attendance: Remote<Vec<AttendanceRecord>>,
    pub grades_error: bool,
    pub attendance_error: bool,
}

impl Default for GuardianPage {
    fn default() -> Self {
        Self {
            student: Remote::new(None),
            student_error: false,
            grades: Remote::default(),
            attendance: Remote::default(),
            grades_error: false,
            attendance_error: false,
        }
    }
}

impl GuardianPage {
    pub fn start(&mut self, guardian_id: String, backend: &SharedBackend) -> Task<Message> {
        let ticket = self.student.begin();
        Task::perform(data::guardian_student(backend.clone(), guardian_id), move |result| {
            Message::GuardianStudentLoaded(ticket, result.map_err(report("looking up linked student")))
        })
    }

    pub fn student_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Option<Student>, String>,
        backend: &SharedBackend,
        notifications: &mut Notifications,
    ) -> Task<Message> {
        match self.student.finish(ticket, result) {
            Ok(true) => {}
            Ok(false) => return Task::none(),
            Err(_) => {
                self.student_error = true;
                notifications.error("Erro ao carregar os dados do aluno.");
                return Task::none();
            }
        }
        // No linked student: the page explains it, nothing is fetched.
        let Some(student) = self.student.value() else {
            return Task::none();
        };

        let grades_ticket = self.grades.begin();
        let attendance_ticket = self.attendance.begin();
        Task::perform(
            data::student_history(backend.clone(), student.id.clone()),
            move |(grades, attendance)| Message::GuardianHistoryLoaded {
                grades_ticket,
                attendance_ticket,
                grades: grades.map_err(report("loading student grades")),
                attendance: attendance.map_err(report("loading student attendance")),
            },
        )
    }

    pub fn history_loaded(
        &mut self,
        grades_ticket: Ticket,
        attendance_ticket: Ticket,
        grades: Result<Vec<GradeEntry>, String>,
        attendance: Result<Vec<AttendanceRecord>, String>,
        notifications: &mut Notifications,
    ) {
        if self.grades.finish(grades_ticket, grades).is_err() {
            self.grades_error = true;
            notifications.error("Erro ao carregar as notas do aluno.");
        }
        if self.attendance.finish(attendance_ticket, attendance).is_err() {
            self.attendance_error = true;
            notifications.error("Erro ao carregar a frequência do aluno.");
        }
    }

    pub fn summary(&self) -> Summary {
        Summary::of(self.grades.value(), self.attendance.value())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub average: Option<f64>,
    pub absences: usize,
    pub excused: usize,
    pub recent_grades: Vec<GradeEntry>,
    pub recent_attendance: Vec<AttendanceRecord>,
}

impl Summary {
    pub fn of(grades: &[GradeEntry], attendance: &[AttendanceRecord]) -> Self {
        let average = if grades.is_empty() {
            None
        } else {
            Some(grades.iter().map(|g| g.score).sum::<f64>() / grades.len() as f64)
        };

        let mut recent_grades = grades.to_vec();
        recent_grades.sort_by(|a, b| b.date.cmp(&a.date));
        recent_grades.truncate(RECENT_ITEMS);

        let mut recent_attendance = attendance.to_vec();
        recent_attendance.sort_by(|a, b| b.date.cmp(&a.date));
        recent_attendance.truncate(RECENT_ITEMS);

        Summary {
            average,
            absences: attendance
                .iter()
                .filter(|r| r.status == AttendanceStatus::Absent)
                .count(),
            excused: attendance
                .iter()
                .filter(|r| r.status == AttendanceStatus::Excused)
                .count(),
            recent_grades,
            recent_attendance,
        }
    }

    pub fn average_label(&self) -> String {
        match self.average {
            Some(average) => format!("{:.1}", average),
            None => "N/A".to_string(),
        }
    }
}

fn stat_card<'a>(app: &'a App, title: &'a str, value: String) -> Container<'a, Message> {
    Container::new(
        Column::new()
            .spacing(5)
            .push(Text::new(title).size(16))
            .push(Text::new(value).size(28)),
    )
    .padding(15)
    .width(Length::FillPortion(1))
    .style(move |_| bordered_box(&app.theme))
}

pub fn guardian_screen<'a>(app: &'a App, page: &'a GuardianPage) -> Container<'a, Message> {
    let content = if page.student.is_loading() {
        Column::new().push(Text::new("A carregar informações do aluno..."))
    } else if page.student_error {
        Column::new().push(Text::new("Não foi possível carregar os dados do aluno. Tente novamente mais tarde."))
    } else if let Some(student) = page.student.value() {
        student_overview(app, page, student)
    } else {
        Column::new().push(Text::new(
            "Não foi possível encontrar os dados do aluno. Verifique se um aluno foi associado a si no sistema.",
        ))
    };

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
}

fn student_overview<'a>(app: &'a App, page: &'a GuardianPage, student: &'a Student) -> Column<'a, Message> {
    let summary = page.summary();

    let stats = Row::new()
        .spacing(20)
        .push(stat_card(app, "Média Geral", summary.average_label()))
        .push(stat_card(app, "Total de Faltas", summary.absences.to_string()))
        .push(stat_card(app, "Faltas Justificadas", summary.excused.to_string()));

    let mut grades = Column::new().spacing(6).push(Text::new("Últimas Notas Lançadas").size(20));
    if page.grades.is_loading() {
        grades = grades.push(Text::new("A carregar..."));
    } else if page.grades_error {
        grades = grades.push(Text::new("Não foi possível carregar as notas."));
    }
    for grade in summary.recent_grades {
        grades = grades.push(
            Row::new()
                .push(Text::new(grade.subject.clone()))
                .push(horizontal_space())
                .push(
                    Text::new(format!("{:.1}", grade.score))
                        .color(if grade.is_passing() { GOOD } else { BAD }),
                ),
        );
    }

    let mut attendance = Column::new()
        .spacing(6)
        .push(Text::new("Últimos Registos de Frequência").size(20));
    if page.attendance.is_loading() {
        attendance = attendance.push(Text::new("A carregar..."));
    } else if page.attendance_error {
        attendance = attendance.push(Text::new("Não foi possível carregar a frequência."));
    }
    for record in summary.recent_attendance {
        attendance = attendance.push(
            Row::new()
                .push(Text::new(format_date(record.date)))
                .push(horizontal_space())
                .push(
                    Text::new(record.status.to_string()).color(
                        if record.status == AttendanceStatus::Present { GOOD } else { BAD },
                    ),
                ),
        );
    }

    Column::new()
        .spacing(20)
        .push(Text::new("Painel do Responsável").size(30))
        .push(Text::new(format!("Acompanhe aqui o desempenho de {}.", student.name)).size(18))
        .push(stats)
        .push(
            Row::new()
                .spacing(20)
                .push(Container::new(grades).padding(10).width(Length::FillPortion(1)).style(move |_| bordered_box(&app.theme)))
                .push(Container::new(attendance).padding(10).width(Length::FillPortion(1)).style(move |_| bordered_box(&app.theme))),
        )
}
