use std::time::Instant;

use chrono::NaiveDate;
use iced_aw::date_picker::Date;

use crate::backend::AuthUser;
use crate::model::{
    AdminStats, AttendanceRecord, AttendanceStatus, AttendanceSummary, ClassGroup, GradeEntry,
    Profile, Student,
};
use crate::session::Session;
use crate::sync::{Revision, Ticket};

#[derive(Debug, Clone)]
pub enum Message {
    // Session
    SessionRestored(Result<Option<Session>, String>),
    EmailChanged(String),
    PasswordChanged(String),
    LoginPressed,
    LoggedIn(Result<Session, String>),
    AuthChanged(Option<AuthUser>),
    Logout,
    LoggedOut(Result<(), String>),

    // Navigation
    Navigate(&'static str),
    GoBack,

    // Notifications
    Tick(Instant),
    DismissToast(u64),

    // Professor dashboard
    DashboardLoaded(Ticket, Result<Vec<AttendanceSummary>, String>),

    // Admin dashboard
    AdminOverviewLoaded {
        stats_ticket: Ticket,
        chart_ticket: Ticket,
        stats: Result<AdminStats, String>,
        chart: Result<Vec<AttendanceSummary>, String>,
    },

    // Attendance
    AttendanceClassesLoaded(Ticket, Result<Vec<ClassGroup>, String>),
    AttendanceClassSelected(ClassGroup),
    AttendanceRosterLoaded(Ticket, Result<Vec<Student>, String>),
    AttendanceRecordsLoaded(Ticket, Result<Vec<AttendanceRecord>, String>),
    AttendanceChooseDate,
    AttendanceCancelDate,
    AttendanceSubmitDate(Date),
    AttendanceToggled(String),
    AttendanceStatusChosen(String, AttendanceStatus),
    AttendanceSaved {
        student_id: String,
        date: NaiveDate,
        revision: Revision,
        result: Result<AttendanceRecord, String>,
    },

    // Grades
    GradesClassesLoaded(Ticket, Result<Vec<ClassGroup>, String>),
    GradesClassSelected(ClassGroup),
    GradesRosterLoaded(Ticket, Result<Vec<Student>, String>),
    GradesStudentSelected(Student),
    GradesLoaded(Ticket, Result<Vec<GradeEntry>, String>),
    GradeSubjectChanged(String),
    GradeScoreChanged(String),
    GradeChooseDate,
    GradeCancelDate,
    GradeSubmitDate(Date),
    GradeSubmitted,
    GradeSaved {
        student_id: String,
        provisional: u64,
        result: Result<GradeEntry, String>,
    },

    // Guardian dashboard
    GuardianStudentLoaded(Ticket, Result<Option<Student>, String>),
    GuardianHistoryLoaded {
        grades_ticket: Ticket,
        attendance_ticket: Ticket,
        grades: Result<Vec<GradeEntry>, String>,
        attendance: Result<Vec<AttendanceRecord>, String>,
    },

    // Registrar roster
    RosterClassesLoaded(Ticket, Result<Vec<ClassGroup>, String>),
    RosterClassSelected(ClassGroup),
    RosterStudentsLoaded(Ticket, Result<Vec<Student>, String>),

    // Settings
    ThemeSelected(&'static str),
    DisplayNameChanged(String),
    DisplayNameSubmitted,
    DisplayNameSaved {
        revision: Revision,
        result: Result<Profile, String>,
    },
}
