use iced::{Task, Theme};
use tracing::info;

use crate::backend::SharedBackend;
use crate::notification::Notifications;
use crate::router::Navigation;
use crate::screens::admin_dashboard::AdminDashboardPage;
use crate::screens::attendance::AttendancePage;
use crate::screens::dashboard::DashboardPage;
use crate::screens::grades::GradesPage;
use crate::screens::guardian::GuardianPage;
use crate::screens::login::LoginForm;
use crate::screens::roster::RosterPage;
use crate::screens::settings::SettingsPage;
use crate::session::{self, Session};

use super::Message;

pub struct App {
    pub backend: SharedBackend,
    pub theme: Theme,
    pub screen: Screen,
    pub login: LoginForm,
    pub session: Option<Session>,
    pub navigation: Option<Navigation>,
    pub page: PageState,
    pub notifications: Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Checking for a stored session.
    #[default]
    Restoring,
    Login,
    Portal,
}

/// State of the page behind the current route. Replaced on every
/// navigation, so responses for a page that was left have nowhere to land.
pub enum PageState {
    Welcome,
    Dashboard(DashboardPage),
    Admin(AdminDashboardPage),
    Attendance(AttendancePage),
    SecretariaDashboard(AttendancePage),
    Grades(GradesPage),
    Guardian(GuardianPage),
    Roster(RosterPage),
    Settings(SettingsPage),
    Placeholder(&'static str),
}

impl App {
    pub fn new(backend: SharedBackend, theme: Theme) -> (App, Task<Message>) {
        info!("Starting with theme {}", crate::config::theme_to_str(&theme));
        let restore = Task::perform(session::restore(backend.clone()), |result| {
            Message::SessionRestored(result.map_err(crate::error::report("restoring session")))
        });
        let app = App {
            backend,
            theme,
            screen: Screen::Restoring,
            login: LoginForm::default(),
            session: None,
            navigation: None,
            page: PageState::Welcome,
            notifications: Notifications::default(),
        };
        (app, restore)
    }
}
