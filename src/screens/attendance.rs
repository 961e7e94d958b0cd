use std::collections::HashMap;

use chrono::NaiveDate;
use iced::widget::{Button, Column, Container, PickList, Row, Scrollable, Text, checkbox, horizontal_space, text};
use iced::widget::container::bordered_box;
use iced::{Alignment, Length, Task};
use iced_aw::date_picker;
use iced_font_awesome::fa_icon_solid;
use tracing::debug;

use super::{format_date, from_naive};
use crate::app::{App, Message};
use crate::backend::SharedBackend;
use crate::data::{self, ClassSource};
use crate::error::report;
use crate::model::{AttendanceRecord, AttendanceStatus, ClassGroup, Student};
use crate::notification::Notifications;
use crate::sync::{Optimistic, Remote, Revision, Ticket};

pub type Marks = Optimistic<String, AttendanceStatus>;

/// Attendance register: pick a class and a day, then mark each student.
pub struct AttendancePage {
    pub source: ClassSource,
    pub classes: Remote<Vec<ClassGroup>>,
    pub selected: Option<ClassGroup>,
    pub roster: Remote<Vec<Student>>,
    pub date: NaiveDate,
    pub show_picker: bool,
    pub marks: Remote<Marks>,
}

impl AttendancePage {
    pub fn new(source: ClassSource, today: NaiveDate) -> Self {
        Self {
            source,
            classes: Remote::default(),
            selected: None,
            roster: Remote::default(),
            date: today,
            show_picker: false,
            marks: Remote::default(),
        }
    }

    pub fn start(&mut self, backend: &SharedBackend) -> Task<Message> {
        let ticket = self.classes.begin();
        Task::perform(data::classes(backend.clone(), self.source), move |result| {
            Message::AttendanceClassesLoaded(ticket, result.map_err(report("loading classes")))
        })
    }

    pub fn classes_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<ClassGroup>, String>,
        notifications: &mut Notifications,
    ) {
        if self.classes.finish(ticket, result).is_err() {
            notifications.error("Erro ao carregar as turmas.");
        }
    }

    pub fn select_class(&mut self, class: ClassGroup, backend: &SharedBackend) -> Task<Message> {
        let class_id = class.id.clone();
        self.selected = Some(class);
        self.roster.reset(Vec::new());
        self.marks.reset(Marks::default());

        let ticket = self.roster.begin();
        Task::perform(data::class_students(backend.clone(), class_id), move |result| {
            Message::AttendanceRosterLoaded(ticket, result.map_err(report("loading class roster")))
        })
    }

    pub fn roster_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Student>, String>,
        backend: &SharedBackend,
        notifications: &mut Notifications,
    ) -> Task<Message> {
        match self.roster.finish(ticket, result) {
            Ok(true) => self.load_marks(backend),
            Ok(false) => Task::none(),
            Err(_) => {
                notifications.error("Falha ao carregar os alunos da turma.");
                Task::none()
            }
        }
    }

    pub fn choose_date(&mut self) {
        self.show_picker = true;
    }

    pub fn cancel_date(&mut self) {
        self.show_picker = false;
    }

    pub fn date_chosen(&mut self, date: Option<NaiveDate>, backend: &SharedBackend) -> Task<Message> {
        self.show_picker = false;
        let Some(date) = date.filter(|d| *d != self.date) else {
            return Task::none();
        };
        self.date = date;
        self.marks.reset(Marks::default());
        if self.selected.is_some() && !self.roster.is_loading() {
            self.load_marks(backend)
        } else {
            Task::none()
        }
    }

    fn load_marks(&mut self, backend: &SharedBackend) -> Task<Message> {
        let ids: Vec<String> = self.roster.value().iter().map(|s| s.id.clone()).collect();
        let ticket = self.marks.begin();
        Task::perform(data::attendance_for(backend.clone(), self.date, ids), move |result| {
            Message::AttendanceRecordsLoaded(ticket, result.map_err(report("loading attendance")))
        })
    }

    pub fn records_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<AttendanceRecord>, String>,
        notifications: &mut Notifications,
    ) {
        let result = result.map(|records| {
            let mut marks = Marks::default();
            marks.reset(
                records
                    .into_iter()
                    .map(|r| (r.student_id, r.status))
                    .collect::<HashMap<_, _>>(),
            );
            marks
        });
        if self.marks.finish(ticket, result).is_err() {
            notifications.error("Erro ao buscar as frequências.");
        }
    }

    pub fn status_of(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.marks.value().get(&student_id.to_string()).copied()
    }

    /// Checkbox toggle; returns the status that will be written.
    pub fn toggle(&mut self, student_id: String) -> (Revision, AttendanceStatus) {
        let status = AttendanceStatus::toggled(self.status_of(&student_id));
        (self.propose(student_id, status), status)
    }

    pub fn propose(&mut self, student_id: String, status: AttendanceStatus) -> Revision {
        self.marks.value_mut().propose(student_id, status)
    }

    pub fn save(
        &self,
        student_id: String,
        revision: Revision,
        status: AttendanceStatus,
        backend: &SharedBackend,
    ) -> Task<Message> {
        let date = self.date;
        Task::perform(
            data::save_attendance(backend.clone(), student_id.clone(), date, status),
            move |result| Message::AttendanceSaved {
                student_id: student_id.clone(),
                date,
                revision,
                result: result.map_err(report("saving attendance")),
            },
        )
    }

    pub fn saved(
        &mut self,
        student_id: String,
        date: NaiveDate,
        revision: Revision,
        result: Result<AttendanceRecord, String>,
        notifications: &mut Notifications,
    ) {
        if date != self.date {
            debug!("Attendance for {} on {} saved after the day changed", student_id, date);
            if result.is_err() {
                notifications.error(format!("Erro ao salvar a frequência de {}.", format_date(date)));
            }
            return;
        }
        match result {
            Ok(record) => self.marks.value_mut().confirm(&student_id, revision, record.status),
            Err(_) => {
                self.marks.value_mut().reject(&student_id, revision);
                let name = self
                    .roster
                    .value()
                    .iter()
                    .find(|s| s.id == student_id)
                    .map(|s| s.name.as_str())
                    .unwrap_or("aluno");
                notifications.error(format!("Erro ao salvar a frequência de {}.", name));
            }
        }
    }
}

pub fn attendance_screen<'a>(app: &'a App, page: &'a AttendancePage) -> Container<'a, Message> {
    Container::new(attendance_register(app, page))
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
}

/// Registrar home: the attendance register under the registrar heading.
pub fn secretaria_dashboard_screen<'a>(app: &'a App, page: &'a AttendancePage) -> Container<'a, Message> {
    let content = Column::new()
        .spacing(20)
        .push(Text::new("Painel da Secretaria").size(30))
        .push(
            Container::new(attendance_register(app, page))
                .padding(10)
                .style(move |_| bordered_box(&app.theme)),
        );
    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
}

fn attendance_register<'a>(app: &'a App, page: &'a AttendancePage) -> Column<'a, Message> {
    let mut column = Column::new()
        .spacing(20)
        .width(Length::Fill)
        .push(Text::new("Registo de Frequência").size(24));

    if page.classes.is_loading() {
        return column.push(Text::new("A carregar as suas turmas..."));
    }
    if page.classes.value().is_empty() {
        return column.push(Text::new(
            "Não existem turmas associadas a si. Por favor, contacte um administrador.",
        ));
    }

    column = column.push(
        Row::new()
            .spacing(10)
            .align_y(Alignment::Center)
            .push(Text::new("Turma:"))
            .push(
                PickList::new(
                    page.classes.value().as_slice(),
                    page.selected.clone(),
                    Message::AttendanceClassSelected,
                )
                .placeholder("Selecione uma turma"),
            ),
    );

    if page.selected.is_none() {
        return column;
    }

    let date_button = Button::new(
        Row::new()
            .spacing(5)
            .align_y(Alignment::Center)
            .push(fa_icon_solid("calendar").style(move |_| text::base(&app.theme)))
            .push(Text::new(format_date(page.date))),
    )
    .on_press(Message::AttendanceChooseDate);
    column = column.push(
        Row::new()
            .spacing(10)
            .align_y(Alignment::Center)
            .push(Text::new("Data:"))
            .push(date_picker(
                page.show_picker,
                from_naive(page.date),
                date_button,
                Message::AttendanceCancelDate,
                Message::AttendanceSubmitDate,
            )),
    );

    if page.roster.is_loading() {
        return column.push(Text::new("A carregar alunos..."));
    }
    if page.roster.value().is_empty() {
        return column.push(Text::new("Nenhum aluno matriculado nesta turma."));
    }

    let rows = page.roster.value().iter().fold(Column::new().spacing(8), |rows, student| {
        let status = page.status_of(&student.id);
        let id = student.id.clone();
        let chosen = student.id.clone();
        let mut row = Row::new()
            .spacing(10)
            .align_y(Alignment::Center)
            .push(
                checkbox(&student.name, status == Some(AttendanceStatus::Present))
                    .on_toggle(move |_| Message::AttendanceToggled(id.clone())),
            )
            .push(horizontal_space())
            .push(
                PickList::new(AttendanceStatus::ALL, status, move |s| {
                    Message::AttendanceStatusChosen(chosen.clone(), s)
                })
                .placeholder("Sem registo"),
            );
        if page.marks.value().is_pending(&student.id) {
            row = row.push(Text::new("A guardar...").size(12));
        }
        rows.push(row)
    });

    if page.marks.is_loading() {
        column = column.push(Text::new("A carregar frequências...").size(14));
    }
    column.push(Scrollable::new(rows).height(Length::Fill))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            guardian_id: None,
        }
    }

    fn record(id: &str, date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            student_id: id.to_string(),
            date,
            status,
        }
    }

    fn page_with_roster() -> AttendancePage {
        let mut page = AttendancePage::new(ClassSource::Mine, day(8));
        page.selected = Some(ClassGroup {
            id: "1".into(),
            name: "7º A".into(),
        });
        let ticket = page.roster.begin();
        page.roster
            .finish::<String>(ticket, Ok(vec![student("a1", "Ana"), student("a2", "Bia")]))
            .unwrap();
        let ticket = page.marks.begin();
        let mut notes = Notifications::default();
        page.records_loaded(
            ticket,
            Ok(vec![record("a1", day(8), AttendanceStatus::Absent)]),
            &mut notes,
        );
        page
    }

    #[test]
    fn failed_save_restores_previous_marks() {
        let mut page = page_with_roster();
        let mut notes = Notifications::default();

        let (revision, status) = page.toggle("a1".to_string());
        assert_eq!(status, AttendanceStatus::Present);
        assert_eq!(page.status_of("a1"), Some(AttendanceStatus::Present));

        page.saved("a1".into(), day(8), revision, Err("offline".into()), &mut notes);
        assert_eq!(page.status_of("a1"), Some(AttendanceStatus::Absent));
        assert_eq!(notes.iter().count(), 1);

        let (revision, _) = page.toggle("a2".to_string());
        page.saved("a2".into(), day(8), revision, Err("offline".into()), &mut notes);
        assert_eq!(page.status_of("a2"), None);
    }

    #[test]
    fn successful_save_confirms_stored_status() {
        let mut page = page_with_roster();
        let mut notes = Notifications::default();
        let revision = page.propose("a2".into(), AttendanceStatus::Excused);
        page.saved(
            "a2".into(),
            day(8),
            revision,
            Ok(record("a2", day(8), AttendanceStatus::Excused)),
            &mut notes,
        );
        assert_eq!(page.status_of("a2"), Some(AttendanceStatus::Excused));
        assert!(!page.marks.value().is_pending(&"a2".to_string()));
        assert!(notes.is_empty());
    }

    #[test]
    fn stale_records_do_not_replace_newer_day() {
        let mut page = page_with_roster();
        let mut notes = Notifications::default();
        let old = page.marks.begin();
        let new = page.marks.begin();

        page.records_loaded(new, Ok(vec![record("a2", day(9), AttendanceStatus::Present)]), &mut notes);
        page.records_loaded(old, Ok(vec![record("a2", day(8), AttendanceStatus::Absent)]), &mut notes);
        assert_eq!(page.status_of("a2"), Some(AttendanceStatus::Present));
    }

    #[test]
    fn stale_roster_is_ignored() {
        let mut page = AttendancePage::new(ClassSource::All, day(8));
        let mut notes = Notifications::default();
        let first = page.roster.begin();
        let second = page.roster.begin();
        page.roster
            .finish::<String>(second, Ok(vec![student("b1", "Caio")]))
            .unwrap();
        assert!(page.roster.finish::<String>(first, Ok(vec![student("a1", "Ana")])) == Ok(false));
        assert_eq!(page.roster.value()[0].id, "b1");

        page.classes_loaded(Ticket::next(), Err("x".into()), &mut notes);
        assert!(notes.is_empty());
    }

    #[test]
    fn save_for_previous_day_does_not_touch_current_marks() {
        let mut page = page_with_roster();
        let mut notes = Notifications::default();
        let revision = page.propose("a2".into(), AttendanceStatus::Present);
        page.date = day(9);
        page.saved(
            "a2".into(),
            day(8),
            revision,
            Ok(record("a2", day(8), AttendanceStatus::Present)),
            &mut notes,
        );
        assert!(page.marks.value().is_pending(&"a2".to_string()));
        assert!(notes.is_empty());
    }
}
