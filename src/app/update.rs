use chrono::Local;
use futures::StreamExt;
use iced::{Subscription, Task, time};
use tracing::{debug, info, warn};

use crate::config::{save_theme, theme_from_str};
use crate::data::ClassSource;
use crate::error::report;
use crate::router::{Navigation, Page, Route};
use crate::screens::admin_dashboard::AdminDashboardPage;
use crate::screens::attendance::AttendancePage;
use crate::screens::dashboard::DashboardPage;
use crate::screens::grades::GradesPage;
use crate::screens::guardian::GuardianPage;
use crate::screens::roster::RosterPage;
use crate::screens::settings::SettingsPage;
use crate::screens::to_naive;
use crate::session::{self, Session, sign_in_error, validate_credentials};

use super::state::{PageState, Screen};
use super::{App, Message};

impl App {
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SessionRestored(result) => match result {
                Ok(Some(session)) => self.enter_portal(session),
                Ok(None) | Err(_) => {
                    self.screen = Screen::Login;
                    Task::none()
                }
            },
            Message::EmailChanged(email) => {
                self.login.email = email;
                Task::none()
            }
            Message::PasswordChanged(password) => {
                self.login.password = password;
                Task::none()
            }
            Message::LoginPressed => {
                if self.login.loading {
                    return Task::none();
                }
                if let Err(problem) = validate_credentials(&self.login.email, &self.login.password) {
                    self.login.error = Some(problem.to_string());
                    return Task::none();
                }
                self.login.error = None;
                self.login.loading = true;
                Task::perform(
                    session::sign_in(
                        self.backend.clone(),
                        self.login.email.clone(),
                        self.login.password.clone(),
                    ),
                    |result| {
                        Message::LoggedIn(result.map_err(|e| {
                            warn!("Sign-in failed: {}", e);
                            sign_in_error(&e)
                        }))
                    },
                )
            }
            Message::LoggedIn(result) => match result {
                Ok(session) => self.enter_portal(session),
                Err(message) if self.screen == Screen::Portal => {
                    self.notifications.error(message);
                    Task::none()
                }
                Err(message) => {
                    self.login.loading = false;
                    self.login.error = Some(message);
                    Task::none()
                }
            },
            Message::AuthChanged(user) => match (user, self.session.as_ref().map(|s| s.user.id.clone())) {
                (None, Some(_)) => {
                    info!("Session ended by the backend");
                    self.leave_portal();
                    Task::none()
                }
                (Some(user), Some(current)) if user.id != current => {
                    info!("Signed-in user changed to {}", user.id);
                    Task::perform(session::from_user(self.backend.clone(), user), |result| {
                        Message::LoggedIn(result.map_err(report("loading profile")))
                    })
                }
                _ => Task::none(),
            },
            Message::Logout => {
                self.leave_portal();
                Task::perform(session::sign_out(self.backend.clone()), |result| {
                    Message::LoggedOut(result.map_err(|e| e.to_string()))
                })
            }
            Message::LoggedOut(result) => {
                if let Err(e) = result {
                    self.notifications.error(format!("Erro ao sair: {}", e));
                }
                Task::none()
            }

            Message::Navigate(path) => {
                let Some(navigation) = &mut self.navigation else {
                    return Task::none();
                };
                if navigation.navigate(path) {
                    let route = navigation.current();
                    self.open_page(route)
                } else {
                    Task::none()
                }
            }
            Message::GoBack => {
                let Some(navigation) = &mut self.navigation else {
                    return Task::none();
                };
                if navigation.go_back() {
                    let route = navigation.current();
                    self.open_page(route)
                } else {
                    Task::none()
                }
            }

            Message::Tick(now) => {
                self.notifications.expire(now);
                Task::none()
            }
            Message::DismissToast(id) => {
                self.notifications.dismiss(id);
                Task::none()
            }
            Message::ThemeSelected(name) => {
                if let Some(theme) = theme_from_str(name) {
                    if let Err(e) = save_theme(&theme) {
                        warn!("Failed to save theme {}: {}", name, e);
                    }
                    self.theme = theme;
                }
                Task::none()
            }

            message => self.update_page(message),
        }
    }

    /// Routes a page message to the page it belongs to. Messages for a page
    /// that is no longer displayed are dropped.
    fn update_page(&mut self, message: Message) -> Task<Message> {
        let App {
            page,
            backend,
            notifications,
            session,
            ..
        } = self;

        match (page, message) {
            (PageState::Dashboard(page), Message::DashboardLoaded(ticket, result)) => {
                page.loaded(ticket, result);
                Task::none()
            }
            (
                PageState::Admin(page),
                Message::AdminOverviewLoaded {
                    stats_ticket,
                    chart_ticket,
                    stats,
                    chart,
                },
            ) => {
                page.loaded(stats_ticket, chart_ticket, stats, chart);
                Task::none()
            }

            (
                PageState::Attendance(page) | PageState::SecretariaDashboard(page),
                message,
            ) => match message {
                Message::AttendanceClassesLoaded(ticket, result) => {
                    page.classes_loaded(ticket, result, notifications);
                    Task::none()
                }
                Message::AttendanceClassSelected(class) => page.select_class(class, backend),
                Message::AttendanceRosterLoaded(ticket, result) => {
                    page.roster_loaded(ticket, result, backend, notifications)
                }
                Message::AttendanceRecordsLoaded(ticket, result) => {
                    page.records_loaded(ticket, result, notifications);
                    Task::none()
                }
                Message::AttendanceChooseDate => {
                    page.choose_date();
                    Task::none()
                }
                Message::AttendanceCancelDate => {
                    page.cancel_date();
                    Task::none()
                }
                Message::AttendanceSubmitDate(date) => page.date_chosen(to_naive(date), backend),
                Message::AttendanceToggled(student_id) => {
                    let (revision, status) = page.toggle(student_id.clone());
                    page.save(student_id, revision, status, backend)
                }
                Message::AttendanceStatusChosen(student_id, status) => {
                    let revision = page.propose(student_id.clone(), status);
                    page.save(student_id, revision, status, backend)
                }
                Message::AttendanceSaved {
                    student_id,
                    date,
                    revision,
                    result,
                } => {
                    page.saved(student_id, date, revision, result, notifications);
                    Task::none()
                }
                other => dropped(other),
            },

            (PageState::Grades(page), message) => match message {
                Message::GradesClassesLoaded(ticket, result) => {
                    page.classes_loaded(ticket, result, notifications);
                    Task::none()
                }
                Message::GradesClassSelected(class) => page.select_class(class, backend),
                Message::GradesRosterLoaded(ticket, result) => {
                    page.roster_loaded(ticket, result, notifications);
                    Task::none()
                }
                Message::GradesStudentSelected(student) => page.select_student(student, backend),
                Message::GradesLoaded(ticket, result) => {
                    page.grades_loaded(ticket, result, notifications);
                    Task::none()
                }
                Message::GradeSubjectChanged(subject) => {
                    page.subject = subject;
                    Task::none()
                }
                Message::GradeScoreChanged(score) => {
                    page.score = score;
                    Task::none()
                }
                Message::GradeChooseDate => {
                    page.show_picker = true;
                    Task::none()
                }
                Message::GradeCancelDate => {
                    page.show_picker = false;
                    Task::none()
                }
                Message::GradeSubmitDate(date) => {
                    page.date_chosen(to_naive(date));
                    Task::none()
                }
                Message::GradeSubmitted => match page.submit() {
                    Some((provisional, grade)) => GradesPage::save(provisional, grade, backend),
                    None => Task::none(),
                },
                Message::GradeSaved {
                    student_id,
                    provisional,
                    result,
                } => {
                    page.saved(&student_id, provisional, result, notifications);
                    Task::none()
                }
                other => dropped(other),
            },

            (PageState::Guardian(page), Message::GuardianStudentLoaded(ticket, result)) => {
                page.student_loaded(ticket, result, backend, notifications)
            }
            (
                PageState::Guardian(page),
                Message::GuardianHistoryLoaded {
                    grades_ticket,
                    attendance_ticket,
                    grades,
                    attendance,
                },
            ) => {
                page.history_loaded(grades_ticket, attendance_ticket, grades, attendance, notifications);
                Task::none()
            }

            (PageState::Roster(page), message) => match message {
                Message::RosterClassesLoaded(ticket, result) => {
                    page.classes_loaded(ticket, result, notifications);
                    Task::none()
                }
                Message::RosterClassSelected(class) => page.select_class(class, backend),
                Message::RosterStudentsLoaded(ticket, result) => {
                    page.students_loaded(ticket, result, notifications);
                    Task::none()
                }
                other => dropped(other),
            },

            (PageState::Settings(page), message) => match message {
                Message::DisplayNameChanged(name) => {
                    page.name_input = name;
                    Task::none()
                }
                Message::DisplayNameSubmitted => {
                    let Some(session) = session else {
                        return Task::none();
                    };
                    match page.submit() {
                        Some((revision, name)) => {
                            SettingsPage::save(revision, session.user.id.clone(), name, backend)
                        }
                        None => Task::none(),
                    }
                }
                Message::DisplayNameSaved { revision, result } => {
                    if let (Some(profile), Some(session)) = (page.saved(revision, result, notifications), session) {
                        session.profile = profile;
                    }
                    Task::none()
                }
                other => dropped(other),
            },

            (_, message) => dropped(message),
        }
    }

    fn enter_portal(&mut self, session: Session) -> Task<Message> {
        info!("Entering portal as {} ({})", session.user.id, session.profile.role);
        let navigation = Navigation::new(session.profile.role);
        let route = navigation.current();
        self.session = Some(session);
        self.navigation = Some(navigation);
        self.screen = Screen::Portal;
        self.login.clear();
        self.open_page(route)
    }

    fn leave_portal(&mut self) {
        self.session = None;
        self.navigation = None;
        self.page = PageState::Welcome;
        self.screen = Screen::Login;
        self.login.clear();
    }

    /// Builds a fresh page for `route` and starts its loads.
    fn open_page(&mut self, route: &'static Route) -> Task<Message> {
        let Some(session) = &self.session else {
            return Task::none();
        };
        debug!("Opening {}", route.path);
        let today = Local::now().date_naive();
        let source = ClassSource::for_role(session.profile.role);
        let backend = &self.backend;

        let (page, task) = match route.page {
            Page::Welcome => (PageState::Welcome, Task::none()),
            Page::Dashboard => {
                let mut page = DashboardPage::default();
                let task = page.start(backend);
                (PageState::Dashboard(page), task)
            }
            Page::AdminDashboard => {
                let mut page = AdminDashboardPage::default();
                let task = page.start(backend);
                (PageState::Admin(page), task)
            }
            Page::Attendance => {
                let mut page = AttendancePage::new(source, today);
                let task = page.start(backend);
                (PageState::Attendance(page), task)
            }
            Page::SecretariaDashboard => {
                let mut page = AttendancePage::new(source, today);
                let task = page.start(backend);
                (PageState::SecretariaDashboard(page), task)
            }
            Page::Grades => {
                let mut page = GradesPage::new(source, today);
                let task = page.start(backend);
                (PageState::Grades(page), task)
            }
            Page::GuardianDashboard => {
                let mut page = GuardianPage::default();
                let task = page.start(session.user.id.clone(), backend);
                (PageState::Guardian(page), task)
            }
            Page::Roster => {
                let mut page = RosterPage::default();
                let task = page.start(backend);
                (PageState::Roster(page), task)
            }
            Page::Settings => (
                PageState::Settings(SettingsPage::new(session.profile.display_name())),
                Task::none(),
            ),
            Page::Placeholder(title) => (PageState::Placeholder(title), Task::none()),
        };
        self.page = page;
        task
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let auth = Subscription::run_with_id(
            "auth-events",
            session::auth_events(self.backend.as_ref()).map(Message::AuthChanged),
        );
        if self.notifications.is_empty() {
            auth
        } else {
            Subscription::batch([auth, time::every(time::Duration::from_millis(500)).map(Message::Tick)])
        }
    }
}

fn dropped(message: Message) -> Task<Message> {
    debug!("Dropping message for a page that is not shown: {:?}", message);
    Task::none()
}
