use iced::widget::container::bordered_box;
use iced::widget::{Column, Container, PickList, Row, Scrollable, Text};
use iced::{Length, Task};

use crate::app::{App, Message};
use crate::backend::SharedBackend;
use crate::data;
use crate::error::report;
use crate::model::{ClassGroup, Student};
use crate::notification::Notifications;
use crate::sync::{Remote, Ticket};

/// Registrar view of every class and its students.
#[derive(Default)]
pub struct RosterPage {
    pub classes: Remote<Vec<ClassGroup>>,
    pub selected: Option<ClassGroup>,
    pub students: Remote<Vec<Student>>,
}

impl RosterPage {
    pub fn start(&mut self, backend: &SharedBackend) -> Task<Message> {
        let ticket = self.classes.begin();
        Task::perform(data::all_classes(backend.clone()), move |result| {
            Message::RosterClassesLoaded(ticket, result.map_err(report("loading school classes")))
        })
    }

    pub fn classes_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<ClassGroup>, String>,
        notifications: &mut Notifications,
    ) {
        if self.classes.finish(ticket, result).is_err() {
            notifications.error("Erro ao carregar a lista de turmas.");
        }
    }

    pub fn select_class(&mut self, class: ClassGroup, backend: &SharedBackend) -> Task<Message> {
        let class_id = class.id.clone();
        self.selected = Some(class);
        self.students.reset(Vec::new());
        let ticket = self.students.begin();
        Task::perform(data::class_students(backend.clone(), class_id), move |result| {
            Message::RosterStudentsLoaded(ticket, result.map_err(report("loading class roster")))
        })
    }

    pub fn students_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Student>, String>,
        notifications: &mut Notifications,
    ) {
        if self.students.finish(ticket, result).is_err() {
            notifications.error("Falha ao carregar os alunos da turma.");
        }
    }
}

pub fn roster_screen<'a>(app: &'a App, page: &'a RosterPage) -> Container<'a, Message> {
    if page.classes.is_loading() {
        return Container::new(Text::new("A carregar dados da escola...")).padding(20);
    }

    let picker = Column::new()
        .spacing(10)
        .push(Text::new("Selecione uma Turma para ver os Alunos"))
        .push(
            PickList::new(
                page.classes.value().as_slice(),
                page.selected.clone(),
                Message::RosterClassSelected,
            )
            .placeholder(format!("Todas as Turmas ({})", page.classes.value().len())),
        );

    let mut students = Column::new().spacing(8);
    students = match &page.selected {
        None => students
            .push(Text::new("Selecione uma turma").size(20))
            .push(Text::new("Os alunos da turma selecionada aparecerão aqui.").size(14)),
        Some(_) if page.students.is_loading() => students.push(Text::new("A carregar...")),
        Some(_) => page.students.value().iter().fold(
            students.push(Text::new(format!("Alunos na Turma ({})", page.students.value().len())).size(20)),
            |column, student| column.push(Text::new(&student.name)),
        ),
    };

    let content = Column::new()
        .spacing(20)
        .push(Text::new("Painel da Secretaria").size(30))
        .push(Text::new("Gestão de alunos e turmas da escola.").size(16))
        .push(
            Row::new()
                .spacing(20)
                .push(
                    Container::new(picker)
                        .padding(10)
                        .width(Length::FillPortion(1))
                        .style(move |_| bordered_box(&app.theme)),
                )
                .push(
                    Container::new(Scrollable::new(students).height(Length::Fixed(400.0)))
                        .padding(10)
                        .width(Length::FillPortion(1))
                        .style(move |_| bordered_box(&app.theme)),
                ),
        );

    Container::new(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .padding(20)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;

    #[tokio::test]
    async fn failures_raise_error_toasts() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail("select:turmas");
        let mut page = RosterPage::default();
        let mut notes = Notifications::default();

        let ticket = page.classes.begin();
        let result = data::all_classes(backend).await.map_err(|e| e.to_string());
        page.classes_loaded(ticket, result, &mut notes);

        assert!(page.classes.value().is_empty());
        assert!(!page.classes.is_loading());
        assert_eq!(notes.iter().next().map(|t| t.message.as_str()), Some("Erro ao carregar a lista de turmas."));
    }

    #[tokio::test]
    async fn roster_follows_latest_selection() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_table("alunos", json!([{"id": "a1", "nome": "Zé"}, {"id": "a2", "nome": "Lia"}]))
                .with_table(
                    "matriculas",
                    json!([{"turma_id": "t1", "aluno_id": "a1"}, {"turma_id": "t2", "aluno_id": "a2"}]),
                ),
        );
        let mut page = RosterPage::default();
        let mut notes = Notifications::default();

        let first = page.students.begin();
        let second = page.students.begin();
        let t2 = data::class_students(backend.clone(), "t2".into()).await.map_err(|e| e.to_string());
        let t1 = data::class_students(backend, "t1".into()).await.map_err(|e| e.to_string());
        page.students_loaded(second, t2, &mut notes);
        page.students_loaded(first, t1, &mut notes);

        assert_eq!(page.students.value()[0].name, "Lia");
    }
}
