use std::collections::HashSet;

use chrono::NaiveDate;
use futures::future;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::backend::{Filter, Query, SharedBackend, call, call_single, fetch, fetch_single, first_row};
use crate::error::{BackendError, Result};
use crate::model::{
    AdminStats, AttendanceRecord, AttendanceStatus, AttendanceSummary, AttendanceUpsert, ClassGroup,
    GradeEntry, NewGrade, Profile, Role, Student,
};

pub const ATTENDANCE_KEY: &[&str] = &["aluno_id", "data"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassSource {
    Mine,
    All,
}

impl ClassSource {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Professor => ClassSource::Mine,
            _ => ClassSource::All,
        }
    }
}

#[derive(Deserialize)]
struct Enrollment {
    alunos: Student,
}

pub async fn my_classes(backend: SharedBackend) -> Result<Vec<ClassGroup>> {
    call(backend.as_ref(), "get_minhas_turmas").await
}

pub async fn classes(backend: SharedBackend, source: ClassSource) -> Result<Vec<ClassGroup>> {
    match source {
        ClassSource::Mine => my_classes(backend).await,
        ClassSource::All => all_classes(backend).await,
    }
}

pub async fn all_classes(backend: SharedBackend) -> Result<Vec<ClassGroup>> {
    let query = Query::table("turmas")
        .select(&["id", "nome"])
        .order_by("nome", true);
    fetch(backend.as_ref(), &query).await
}

pub async fn class_students(backend: SharedBackend, class_id: String) -> Result<Vec<Student>> {
    let query = Query::table("matriculas")
        .select(&["turma_id"])
        .embed_inner("alunos", "aluno_id", &["id", "nome"])
        .eq("turma_id", &class_id);
    let enrollments: Vec<Enrollment> = fetch(backend.as_ref(), &query).await?;
    let mut seen = HashSet::new();
    let mut students: Vec<Student> = enrollments
        .into_iter()
        .map(|e| e.alunos)
        .filter(|s| seen.insert(s.id.clone()))
        .collect();
    students.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    debug!("Class {} has {} students", class_id, students.len());
    Ok(students)
}

/// Attendance of the given students on one day. No call is made for an
/// empty roster.
pub async fn attendance_for(
    backend: SharedBackend,
    date: NaiveDate,
    student_ids: Vec<String>,
) -> Result<Vec<AttendanceRecord>> {
    if student_ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = Query::table("frequencias")
        .eq("data", date)
        .is_in("aluno_id", student_ids);
    fetch(backend.as_ref(), &query).await
}

/// Records a status for `(student, date)`; repeating it leaves one row.
pub async fn save_attendance(
    backend: SharedBackend,
    student_id: String,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<AttendanceRecord> {
    let row = serde_json::to_value(AttendanceUpsert {
        aluno_id: &student_id,
        data: date,
        status,
    })?;
    let stored = backend.upsert("frequencias", row, ATTENDANCE_KEY).await?;
    first_row("frequencias", stored)
}

pub async fn student_grades(backend: SharedBackend, student_id: String) -> Result<Vec<GradeEntry>> {
    let query = Query::table("notas")
        .eq("aluno_id", student_id)
        .order_by("data", false);
    fetch(backend.as_ref(), &query).await
}

pub async fn add_grade(backend: SharedBackend, grade: NewGrade) -> Result<GradeEntry> {
    let stored = backend.insert("notas", serde_json::to_value(&grade)?).await?;
    let entry: GradeEntry = first_row("notas", stored)?;
    info!("Stored grade {:?} for {}", entry.id, grade.aluno_id);
    Ok(entry)
}

pub async fn attendance_overview(backend: SharedBackend) -> Result<Vec<AttendanceSummary>> {
    call(backend.as_ref(), "get_dashboard_presenca").await
}

pub async fn admin_stats(backend: SharedBackend) -> Result<AdminStats> {
    call_single(backend.as_ref(), "get_admin_stats").await
}

pub async fn admin_overview(
    backend: SharedBackend,
) -> (Result<AdminStats>, Result<Vec<AttendanceSummary>>) {
    future::join(
        admin_stats(backend.clone()),
        attendance_overview(backend),
    )
    .await
}

/// The student linked to a guardian account. No linked row is `None`;
/// failed reads and ambiguous links are errors.
pub async fn guardian_student(backend: SharedBackend, guardian_id: String) -> Result<Option<Student>> {
    let query = Query::table("alunos")
        .select(&["id", "nome", "responsavel_id"])
        .eq("responsavel_id", guardian_id);
    match fetch_single(backend.as_ref(), &query).await {
        Ok(student) => Ok(Some(student)),
        Err(BackendError::NotSingle { count: 0, .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

pub async fn student_history(
    backend: SharedBackend,
    student_id: String,
) -> (Result<Vec<GradeEntry>>, Result<Vec<AttendanceRecord>>) {
    let attendance = Query::table("frequencias")
        .eq("aluno_id", &student_id)
        .order_by("data", false);
    future::join(
        student_grades(backend.clone(), student_id.clone()),
        async move { fetch(backend.as_ref(), &attendance).await },
    )
    .await
}

pub async fn rename_profile(backend: SharedBackend, user_id: String, full_name: String) -> Result<Profile> {
    let updated = backend
        .update(
            "profiles",
            json!({ "full_name": full_name.trim() }),
            &[Filter::eq("id", &user_id)],
        )
        .await?;
    first_row("profiles", updated)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryBackend;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn school() -> Arc<MemoryBackend> {
        Arc::new(
            MemoryBackend::new()
                .with_table(
                    "turmas",
                    json!([{"id": 2, "nome": "8º B"}, {"id": 1, "nome": "7º A"}]),
                )
                .with_table(
                    "alunos",
                    json!([
                        {"id": "a1", "nome": "Rafael", "responsavel_id": "g1"},
                        {"id": "a2", "nome": "ana", "responsavel_id": "g2"},
                        {"id": "a3", "nome": "Bruno", "responsavel_id": null},
                    ]),
                )
                .with_table(
                    "matriculas",
                    json!([
                        {"turma_id": 1, "aluno_id": "a1"},
                        {"turma_id": 1, "aluno_id": "a2"},
                        {"turma_id": 2, "aluno_id": "a3"},
                        {"turma_id": 1, "aluno_id": "fantasma"},
                    ]),
                )
                .with_table(
                    "notas",
                    json!([
                        {"id": 1, "aluno_id": "a1", "materia": "Português", "nota": 8.0, "data": "2024-05-02"},
                        {"id": 2, "aluno_id": "a1", "materia": "Ciências", "nota": 5.5, "data": "2024-05-09"},
                    ]),
                )
                .with_table(
                    "frequencias",
                    json!([
                        {"aluno_id": "a1", "data": "2024-05-06", "presente": false},
                        {"aluno_id": "a1", "data": "2024-05-07", "status": "justificada"},
                    ]),
                )
                .with_table(
                    "profiles",
                    json!([{"id": "u1", "full_name": "Marta", "role": "professor"}]),
                ),
        )
    }

    #[tokio::test]
    async fn classes_are_ordered_by_name() {
        let classes = all_classes(school()).await.unwrap();
        let names: Vec<_> = classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["7º A", "8º B"]);
    }

    #[tokio::test]
    async fn professors_only_see_their_classes() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_rpc("get_minhas_turmas", json!([{"id": 1, "nome": "7º A"}]))
                .with_table("turmas", json!([{"id": 1, "nome": "7º A"}, {"id": 2, "nome": "8º B"}])),
        );
        let mine = classes(backend.clone(), ClassSource::for_role(Role::Professor)).await.unwrap();
        assert_eq!(mine.len(), 1);
        let all = classes(backend.clone(), ClassSource::for_role(Role::Secretaria)).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(backend.calls(), vec!["rpc:get_minhas_turmas", "select:turmas"]);
    }

    #[tokio::test]
    async fn roster_is_sorted_and_skips_dangling_enrollments() {
        let students = class_students(school(), "1".to_string()).await.unwrap();
        let names: Vec<_> = students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ana", "Rafael"]);
    }

    #[tokio::test]
    async fn repeated_enrollment_lists_the_student_once() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_table(
                    "alunos",
                    json!([
                        {"id": "a1", "nome": "Ana", "responsavel_id": null},
                        {"id": "a2", "nome": "Ana", "responsavel_id": null},
                    ]),
                )
                .with_table(
                    "matriculas",
                    json!([
                        {"turma_id": 1, "aluno_id": "a1"},
                        {"turma_id": 1, "aluno_id": "a2"},
                        {"turma_id": 1, "aluno_id": "a1"},
                    ]),
                ),
        );
        let students = class_students(backend, "1".to_string()).await.unwrap();
        let ids: Vec<_> = students.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[tokio::test]
    async fn empty_roster_skips_attendance_query() {
        let backend = school();
        let records = attendance_for(backend.clone(), day(6), Vec::new()).await.unwrap();
        assert!(records.is_empty());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn attendance_upsert_is_idempotent() {
        let backend = school();
        for _ in 0..2 {
            let stored = save_attendance(backend.clone(), "a2".into(), day(6), AttendanceStatus::Present)
                .await
                .unwrap();
            assert_eq!(stored.status, AttendanceStatus::Present);
        }
        let rows: Vec<_> = backend
            .rows("frequencias")
            .into_iter()
            .filter(|r| r["aluno_id"] == "a2")
            .collect();
        assert_eq!(rows.len(), 1);

        let records = attendance_for(backend.clone(), day(6), vec!["a1".into(), "a2".into()])
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn upsert_overwrites_legacy_row() {
        let backend = school();
        save_attendance(backend.clone(), "a1".into(), day(6), AttendanceStatus::Excused)
            .await
            .unwrap();
        let records = attendance_for(backend, day(6), vec!["a1".into()]).await.unwrap();
        assert_eq!(records[0].status, AttendanceStatus::Excused);
    }

    #[tokio::test]
    async fn admin_overview_branches_are_independent() {
        let backend = Arc::new(
            MemoryBackend::new()
                .with_rpc("get_admin_stats", json!([{"total_alunos": 120, "total_turmas": 6}]))
                .with_rpc("get_dashboard_presenca", json!([{"nome": "7º A", "presenca": 92.5}])),
        );
        backend.fail("rpc:get_dashboard_presenca");
        let (stats, chart) = admin_overview(backend.clone()).await;
        assert_eq!(stats.unwrap().total_alunos, 120);
        assert!(chart.is_err());

        backend.recover("rpc:get_dashboard_presenca");
        backend.fail("rpc:get_admin_stats");
        let (stats, chart) = admin_overview(backend).await;
        assert!(stats.is_err());
        assert_eq!(chart.unwrap()[0].percentage, 92.5);
    }

    #[tokio::test]
    async fn guardian_history_reads_both_attendance_shapes() {
        let backend = school();
        let student = guardian_student(backend.clone(), "g1".into()).await.unwrap().unwrap();
        assert_eq!(student.name, "Rafael");

        let (grades, attendance) = student_history(backend, student.id).await;
        let grades = grades.unwrap();
        assert_eq!(grades[0].subject, "Ciências");
        let attendance = attendance.unwrap();
        assert_eq!(attendance[0].status, AttendanceStatus::Excused);
        assert_eq!(attendance[1].status, AttendanceStatus::Absent);
    }

    #[tokio::test]
    async fn guardian_without_student_is_not_an_error() {
        let result = guardian_student(school(), "ninguem".into()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn failed_student_lookup_stays_an_error() {
        let backend = school();
        backend.fail("select:alunos");
        let result = guardian_student(backend, "g1".into()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn grade_insert_returns_stored_row() {
        let backend = school();
        let grade = NewGrade::validate(Some("a2"), "Artes", "9,5", day(10)).unwrap();
        let stored = add_grade(backend.clone(), grade).await.unwrap();
        assert!(stored.id.is_some());
        assert_eq!(stored.score, 9.5);
        assert_eq!(backend.rows("notas").len(), 3);
    }

    #[tokio::test]
    async fn rename_updates_profile() {
        let backend = school();
        let profile = rename_profile(backend.clone(), "u1".into(), "  Marta Souza ".into())
            .await
            .unwrap();
        assert_eq!(profile.display_name(), "Marta Souza");
        assert!(rename_profile(backend, "u404".into(), "X".into()).await.is_err());
    }
}
