use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GradeError;

/// Accepts text or numeric primary keys and keeps them as text.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

fn optional_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "id_string")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(id)| id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Professor,
    Secretaria,
    Responsavel,
    Aluno,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Role::Admin => "Administrador",
                Role::Professor => "Professor",
                Role::Secretaria => "Secretaria",
                Role::Responsavel => "Responsável",
                Role::Aluno => "Aluno",
                Role::Unknown => "Sem perfil",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
}

impl fmt::Display for ClassGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(
        rename = "responsavel_id",
        default,
        deserialize_with = "optional_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub guardian_id: Option<String>,
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "presente")]
    Present,
    #[serde(rename = "ausente")]
    Absent,
    #[serde(rename = "justificada")]
    Excused,
    #[serde(rename = "outro")]
    Other,
}

impl AttendanceStatus {
    pub const ALL: &'static [AttendanceStatus] = &[
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Excused,
        AttendanceStatus::Other,
    ];

    /// Checkbox semantics: present flips to absent, anything else to present.
    pub fn toggled(current: Option<AttendanceStatus>) -> AttendanceStatus {
        match current {
            Some(AttendanceStatus::Present) => AttendanceStatus::Absent,
            _ => AttendanceStatus::Present,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AttendanceStatus::Present => "Presente",
                AttendanceStatus::Absent => "Falta",
                AttendanceStatus::Excused => "Falta justificada",
                AttendanceStatus::Other => "Outro",
            }
        )
    }
}

/// Wire shape of a `frequencias` row. Older rows only carry the boolean
/// `presente` column.
#[derive(Deserialize)]
struct RawAttendance {
    #[serde(deserialize_with = "id_string")]
    aluno_id: String,
    data: NaiveDate,
    #[serde(default)]
    status: Option<AttendanceStatus>,
    #[serde(default)]
    presente: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAttendance")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl TryFrom<RawAttendance> for AttendanceRecord {
    type Error = String;

    fn try_from(raw: RawAttendance) -> Result<Self, Self::Error> {
        let status = match (raw.status, raw.presente) {
            (Some(status), _) => status,
            (None, Some(true)) => AttendanceStatus::Present,
            (None, Some(false)) => AttendanceStatus::Absent,
            (None, None) => {
                return Err(format!(
                    "attendance row for {} on {} has neither status nor presente",
                    raw.aluno_id, raw.data
                ));
            }
        };
        Ok(AttendanceRecord {
            student_id: raw.aluno_id,
            date: raw.data,
            status,
        })
    }
}

/// Body of an attendance upsert keyed by `(aluno_id, data)`.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceUpsert<'a> {
    pub aluno_id: &'a str,
    pub data: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    #[serde(default, deserialize_with = "optional_id_string")]
    pub id: Option<String>,
    #[serde(rename = "aluno_id", default, deserialize_with = "optional_id_string")]
    pub student_id: Option<String>,
    #[serde(rename = "materia")]
    pub subject: String,
    #[serde(rename = "nota")]
    pub score: f64,
    #[serde(rename = "data")]
    pub date: NaiveDate,
}

impl GradeEntry {
    pub const PASSING_SCORE: f64 = 6.0;

    pub fn is_passing(&self) -> bool {
        self.score >= Self::PASSING_SCORE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGrade {
    pub aluno_id: String,
    pub materia: String,
    pub nota: f64,
    pub data: NaiveDate,
}

impl NewGrade {
    pub const MIN_SCORE: f64 = 0.0;
    pub const MAX_SCORE: f64 = 10.0;

    /// Validates the grade form. Accepts `7.5` and `7,5`.
    pub fn validate(
        student_id: Option<&str>,
        subject: &str,
        score_input: &str,
        date: NaiveDate,
    ) -> Result<NewGrade, GradeError> {
        let student_id = student_id.ok_or(GradeError::NoStudent)?;
        let subject = subject.trim();
        let score_input = score_input.trim();
        if subject.is_empty() || score_input.is_empty() {
            return Err(GradeError::MissingField);
        }

        let score: f64 = score_input
            .replace(',', ".")
            .parse()
            .map_err(|_| GradeError::OutOfRange)?;
        if !score.is_finite() || !(Self::MIN_SCORE..=Self::MAX_SCORE).contains(&score) {
            return Err(GradeError::OutOfRange);
        }

        Ok(NewGrade {
            aluno_id: student_id.to_string(),
            materia: subject.to_string(),
            nota: score,
            data: date,
        })
    }

    pub fn provisional_entry(&self) -> GradeEntry {
        GradeEntry {
            id: None,
            student_id: Some(self.aluno_id.clone()),
            subject: self.materia.clone(),
            score: self.nota,
            date: self.data,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub total_alunos: i64,
    #[serde(default)]
    pub total_turmas: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttendanceSummary {
    #[serde(rename = "nome")]
    pub label: String,
    #[serde(rename = "presenca", default)]
    pub percentage: f64,
}
