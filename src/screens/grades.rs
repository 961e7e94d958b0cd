use chrono::NaiveDate;
use iced::widget::{Button, Column, Container, PickList, Row, Scrollable, Text, TextInput, text};
use iced::widget::container::bordered_box;
use iced::{Alignment, Color, Length, Task};
use iced_aw::date_picker;
use iced_font_awesome::fa_icon_solid;
use tracing::debug;

use super::{format_date, from_naive};
use crate::app::{App, Message};
use crate::backend::SharedBackend;
use crate::data::{self, ClassSource};
use crate::error::report;
use crate::model::{ClassGroup, GradeEntry, NewGrade, Student};
use crate::notification::Notifications;
use crate::sync::{Remote, Ticket};

pub struct GradesPage {
    pub source: ClassSource,
    pub classes: Remote<Vec<ClassGroup>>,
    pub selected_class: Option<ClassGroup>,
    pub roster: Remote<Vec<Student>>,
    pub selected_student: Option<Student>,
    pub grades: Remote<Vec<GradeEntry>>,
    pub provisional: Vec<(u64, GradeEntry)>,
    next_provisional: u64,
    pub subject: String,
    pub score: String,
    pub date: NaiveDate,
    pub show_picker: bool,
    pub form_error: Option<String>,
}

impl GradesPage {
    pub fn new(source: ClassSource, today: NaiveDate) -> Self {
        Self {
            source,
            classes: Remote::default(),
            selected_class: None,
            roster: Remote::default(),
            selected_student: None,
            grades: Remote::default(),
            provisional: Vec::new(),
            next_provisional: 0,
            subject: String::new(),
            score: String::new(),
            date: today,
            show_picker: false,
            form_error: None,
        }
    }

    pub fn start(&mut self, backend: &SharedBackend) -> Task<Message> {
        let ticket = self.classes.begin();
        Task::perform(data::classes(backend.clone(), self.source), move |result| {
            Message::GradesClassesLoaded(ticket, result.map_err(report("loading classes")))
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

    /// A new class clears the student and everything loaded for them.
    pub fn select_class(&mut self, class: ClassGroup, backend: &SharedBackend) -> Task<Message> {
        let class_id = class.id.clone();
        self.selected_class = Some(class);
        self.clear_student();
        self.roster.reset(Vec::new());

        let ticket = self.roster.begin();
        Task::perform(data::class_students(backend.clone(), class_id), move |result| {
            Message::GradesRosterLoaded(ticket, result.map_err(report("loading class roster")))
        })
    }

    pub fn roster_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Student>, String>,
        notifications: &mut Notifications,
    ) {
        if self.roster.finish(ticket, result).is_err() {
            notifications.error("Falha ao carregar os alunos da turma.");
        }
    }

    fn clear_student(&mut self) {
        self.selected_student = None;
        self.grades.reset(Vec::new());
        self.provisional.clear();
        self.form_error = None;
    }

    pub fn select_student(&mut self, student: Student, backend: &SharedBackend) -> Task<Message> {
        let student_id = student.id.clone();
        self.clear_student();
        self.selected_student = Some(student);

        let ticket = self.grades.begin();
        Task::perform(data::student_grades(backend.clone(), student_id), move |result| {
            Message::GradesLoaded(ticket, result.map_err(report("loading grades")))
        })
    }

    pub fn grades_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<GradeEntry>, String>,
        notifications: &mut Notifications,
    ) {
        if self.grades.finish(ticket, result).is_err() {
            notifications.error("Erro ao carregar as notas do aluno.");
        }
    }

    pub fn date_chosen(&mut self, date: Option<NaiveDate>) {
        self.show_picker = false;
        if let Some(date) = date {
            self.date = date;
        }
    }

    /// Validates the form and appends the grade before it is stored.
    /// Invalid input never leaves this method.
    pub fn submit(&mut self) -> Option<(u64, NewGrade)> {
        let student_id = self.selected_student.as_ref().map(|s| s.id.as_str());
        match NewGrade::validate(student_id, &self.subject, &self.score, self.date) {
            Ok(grade) => {
                self.form_error = None;
                self.next_provisional += 1;
                self.provisional
                    .push((self.next_provisional, grade.provisional_entry()));
                self.subject.clear();
                self.score.clear();
                Some((self.next_provisional, grade))
            }
            Err(err) => {
                self.form_error = Some(err.to_string());
                None
            }
        }
    }

    pub fn save(provisional: u64, grade: NewGrade, backend: &SharedBackend) -> Task<Message> {
        let student_id = grade.aluno_id.clone();
        Task::perform(data::add_grade(backend.clone(), grade), move |result| {
            Message::GradeSaved {
                student_id: student_id.clone(),
                provisional,
                result: result.map_err(report("adding grade")),
            }
        })
    }

    /// Swaps the provisional entry for the stored row. On failure the entry
    /// goes back into the form it came from.
    pub fn saved(
        &mut self,
        student_id: &str,
        provisional: u64,
        result: Result<GradeEntry, String>,
        notifications: &mut Notifications,
    ) {
        let Some(index) = self.provisional.iter().position(|(id, _)| *id == provisional) else {
            debug!("Grade {} for {} resolved after the view changed", provisional, student_id);
            if result.is_err() {
                notifications.error("Ocorreu um erro ao adicionar a nota.");
            }
            return;
        };
        let (_, entry) = self.provisional.remove(index);
        let still_shown = self.selected_student.as_ref().is_some_and(|s| s.id == student_id);

        match result {
            Ok(stored) if still_shown => self.grades.value_mut().push(stored),
            Ok(_) => debug!("Grade for {} stored after the view changed", student_id),
            Err(_) => {
                if still_shown && self.subject.is_empty() && self.score.is_empty() {
                    self.subject = entry.subject;
                    self.score = entry.score.to_string();
                    self.date = entry.date;
                }
                notifications.error("Ocorreu um erro ao adicionar a nota.");
            }
        }
    }

    pub fn displayed(&self) -> impl Iterator<Item = (&GradeEntry, bool)> {
        self.grades
            .value()
            .iter()
            .map(|g| (g, false))
            .chain(self.provisional.iter().map(|(_, g)| (g, true)))
    }
}

pub fn grades_screen<'a>(app: &'a App, page: &'a GradesPage) -> Container<'a, Message> {
    let mut column = Column::new()
        .spacing(20)
        .width(Length::Fill)
        .push(Text::new("Lançamento de Notas").size(30));

    if page.classes.is_loading() {
        column = column.push(Text::new("A carregar as suas turmas..."));
    } else if page.classes.value().is_empty() {
        column = column.push(Text::new(
            "Não existem turmas associadas a si. Por favor, contacte um administrador.",
        ));
    } else {
        column = column.push(
            Row::new()
                .spacing(10)
                .align_y(Alignment::Center)
                .push(Text::new("Turma:"))
                .push(
                    PickList::new(
                        page.classes.value().as_slice(),
                        page.selected_class.clone(),
                        Message::GradesClassSelected,
                    )
                    .placeholder("Selecione uma turma"),
                ),
        );

        if page.roster.is_loading() {
            column = column.push(Text::new("A carregar alunos..."));
        } else if !page.roster.value().is_empty() {
            column = column.push(
                Row::new()
                    .spacing(10)
                    .align_y(Alignment::Center)
                    .push(Text::new("Aluno:"))
                    .push(
                        PickList::new(
                            page.roster.value().as_slice(),
                            page.selected_student.clone(),
                            Message::GradesStudentSelected,
                        )
                        .placeholder("Selecione um aluno"),
                    ),
            );
        }

        if page.selected_student.is_some() {
            column = column.push(grade_form(app, page)).push(grade_list(app, page));
        }
    }

    Container::new(column)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
}

fn grade_form<'a>(app: &'a App, page: &'a GradesPage) -> Column<'a, Message> {
    let date_button = Button::new(
        Row::new()
            .spacing(5)
            .align_y(Alignment::Center)
            .push(fa_icon_solid("calendar").style(move |_| text::base(&app.theme)))
            .push(Text::new(format_date(page.date))),
    )
    .on_press(Message::GradeChooseDate);

    let mut form = Column::new()
        .spacing(10)
        .push(Text::new("Lançar nova nota para o aluno selecionado").size(20))
        .push(
            Row::new()
                .spacing(10)
                .align_y(Alignment::Center)
                .push(
                    TextInput::new("Matéria (ex: Matemática)", &page.subject)
                        .on_input(Message::GradeSubjectChanged)
                        .padding(10)
                        .width(Length::Fixed(260.0)),
                )
                .push(
                    TextInput::new("Nota (0-10)", &page.score)
                        .on_input(Message::GradeScoreChanged)
                        .on_submit(Message::GradeSubmitted)
                        .padding(10)
                        .width(Length::Fixed(120.0)),
                )
                .push(date_picker(
                    page.show_picker,
                    from_naive(page.date),
                    date_button,
                    Message::GradeCancelDate,
                    Message::GradeSubmitDate,
                ))
                .push(Button::new(Text::new("Adicionar Nota")).on_press(Message::GradeSubmitted)),
        );
    if let Some(error) = &page.form_error {
        form = form.push(Text::new(error).color(Color::from_rgb8(204, 36, 29)));
    }
    form
}

fn grade_list<'a>(app: &'a App, page: &'a GradesPage) -> Container<'a, Message> {
    let mut list = Column::new().spacing(6).push(Text::new("Notas Lançadas").size(20));
    if page.grades.is_loading() {
        list = list.push(Text::new("A carregar notas..."));
    } else if page.displayed().next().is_none() {
        list = list.push(Text::new("Nenhuma nota lançada para este aluno ainda."));
    } else {
        for (grade, pending) in page.displayed() {
            let mut row = Row::new()
                .spacing(10)
                .push(Text::new(format!(
                    "{}: {} - {:.1}",
                    format_date(grade.date),
                    grade.subject,
                    grade.score
                )));
            if pending {
                row = row.push(Text::new("A guardar...").size(12));
            }
            list = list.push(row);
        }
    }
    Container::new(Scrollable::new(list).height(Length::Fill))
        .padding(10)
        .width(Length::Fill)
        .style(move |_| bordered_box(&app.theme))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn page_for(student_id: &str) -> GradesPage {
        let mut page = GradesPage::new(ClassSource::Mine, day(3));
        page.selected_student = Some(Student {
            id: student_id.to_string(),
            name: "Ana".to_string(),
            guardian_id: None,
        });
        page
    }

    #[tokio::test]
    async fn out_of_range_grade_never_reaches_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let mut page = page_for("a1");
        for score in ["11", "-0.5", "abc", ""] {
            page.subject = "Matemática".to_string();
            page.score = score.to_string();
            assert!(page.submit().is_none());
        }
        assert!(page.form_error.is_some());
        assert!(page.provisional.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn stored_grade_replaces_provisional_entry() {
        let backend = Arc::new(MemoryBackend::new().with_table("notas", json!([])));
        let mut page = page_for("a1");
        let mut notes = Notifications::default();
        page.subject = "Geografia".to_string();
        page.score = "7,5".to_string();

        let (id, grade) = page.submit().unwrap();
        assert_eq!(page.displayed().count(), 1);
        assert!(page.subject.is_empty());

        let result = data::add_grade(backend.clone(), grade).await.map_err(|e| e.to_string());
        page.saved("a1", id, result, &mut notes);

        let shown: Vec<_> = page.displayed().collect();
        assert_eq!(shown.len(), 1);
        assert!(!shown[0].1);
        assert!(shown[0].0.id.is_some());
        assert_eq!(backend.calls(), vec!["insert:notas"]);
    }

    #[tokio::test]
    async fn failed_insert_puts_the_grade_back_in_the_form() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail("insert:notas");
        let mut page = page_for("a1");
        let mut notes = Notifications::default();
        page.subject = "Artes".to_string();
        page.score = "8".to_string();
        page.date = day(5);

        let (id, grade) = page.submit().unwrap();
        assert!(page.subject.is_empty());
        page.date = day(3);
        let result = data::add_grade(backend, grade).await.map_err(|e| e.to_string());
        page.saved("a1", id, result, &mut notes);

        assert_eq!(page.displayed().count(), 0);
        assert_eq!(page.subject, "Artes");
        assert_eq!(page.score, "8");
        assert_eq!(page.date, day(5));
        assert_eq!(notes.iter().count(), 1);
    }

    #[test]
    fn failed_insert_keeps_what_was_typed_since() {
        let mut page = page_for("a1");
        let mut notes = Notifications::default();
        page.subject = "Artes".to_string();
        page.score = "8".to_string();
        let (id, _) = page.submit().unwrap();
        page.subject = "Música".to_string();

        page.saved("a1", id, Err("offline".into()), &mut notes);
        assert_eq!(page.subject, "Música");
        assert!(page.score.is_empty());
    }

    #[test]
    fn late_grade_for_other_student_is_not_shown() {
        let mut page = page_for("a1");
        let mut notes = Notifications::default();
        page.subject = "Artes".to_string();
        page.score = "8".to_string();
        let (id, grade) = page.submit().unwrap();
        let stored = GradeEntry {
            id: Some("9".into()),
            ..grade.provisional_entry()
        };

        page.provisional.clear();
        page.selected_student = Some(Student {
            id: "a2".into(),
            name: "Bia".into(),
            guardian_id: None,
        });
        page.saved("a1", id, Ok(stored), &mut notes);
        assert_eq!(page.displayed().count(), 0);
    }

    #[test]
    fn stale_grade_list_is_ignored() {
        let mut page = page_for("a1");
        let mut notes = Notifications::default();
        let old = page.grades.begin();
        let new = page.grades.begin();
        page.grades_loaded(new, Ok(Vec::new()), &mut notes);
        page.grades_loaded(
            old,
            Ok(vec![GradeEntry {
                id: Some("1".into()),
                student_id: Some("a0".into()),
                subject: "X".into(),
                score: 5.0,
                date: day(1),
            }]),
            &mut notes,
        );
        assert_eq!(page.displayed().count(), 0);
    }
}
