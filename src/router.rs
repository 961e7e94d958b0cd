use tracing::debug;

use self::Capability::{Account, FollowStudent, Guest, Registrar, SchoolAdministration, Teaching};
use crate::model::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    SchoolAdministration,
    Teaching,
    Registrar,
    FollowStudent,
    Account,
    /// Only for profiles whose role is not recognised.
    Guest,
}

impl Capability {
    pub fn granted_to(role: Role) -> &'static [Capability] {
        match role {
            Role::Admin => &[Capability::SchoolAdministration, Capability::Account],
            Role::Professor => &[Capability::Teaching, Capability::Account],
            Role::Secretaria => &[Capability::Registrar, Capability::Account],
            Role::Responsavel | Role::Aluno => &[Capability::FollowStudent, Capability::Account],
            Role::Unknown => &[Capability::Guest],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Welcome,
    Dashboard,
    AdminDashboard,
    Attendance,
    Grades,
    GuardianDashboard,
    Roster,
    SecretariaDashboard,
    Settings,
    /// A page that exists in the menu but is not built yet.
    Placeholder(&'static str),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub page: Page,
    pub requires: Capability,
    /// Menu entry; `None` keeps the route reachable but out of the menu.
    pub label: Option<&'static str>,
    pub icon: &'static str,
    pub home: bool,
}

const fn route(
    path: &'static str,
    page: Page,
    requires: Capability,
    label: &'static str,
    icon: &'static str,
) -> Route {
    Route {
        path,
        page,
        requires,
        label: Some(label),
        icon,
        home: false,
    }
}

const fn home(mut route: Route) -> Route {
    route.home = true;
    route
}

const fn hidden(mut route: Route) -> Route {
    route.label = None;
    route
}

pub static ROUTES: &[Route] = &[
    home(route("/admin-dashboard", Page::AdminDashboard, SchoolAdministration, "Dashboard", "chart-column")),
    route("/admin/usuarios", Page::Placeholder("Usuários"), SchoolAdministration, "Usuários", "users"),
    route("/admin/turmas", Page::Placeholder("Turmas"), SchoolAdministration, "Turmas", "school"),
    route("/admin/professores", Page::Placeholder("Professores"), SchoolAdministration, "Professores", "graduation-cap"),
    route("/admin/relatorios/frequencia", Page::Attendance, SchoolAdministration, "Frequência", "user-check"),
    route("/admin/relatorios/notas", Page::Grades, SchoolAdministration, "Notas", "clipboard-list"),
    home(route("/dashboard", Page::Dashboard, Teaching, "Dashboard", "house")),
    route("/turmas", Page::Placeholder("Turmas"), Teaching, "Turmas", "school"),
    route("/frequencia", Page::Attendance, Teaching, "Frequência", "user-check"),
    route("/notas", Page::Grades, Teaching, "Notas", "clipboard-list"),
    route("/disciplinas", Page::Placeholder("Disciplinas"), Teaching, "Disciplinas", "book-open"),
    home(route("/secretaria-dashboard", Page::SecretariaDashboard, Registrar, "Dashboard", "chart-column")),
    hidden(route("/secretaria", Page::Roster, Registrar, "Secretaria", "users")),
    route("/secretaria/alunos", Page::Roster, Registrar, "Alunos", "users"),
    route("/secretaria/matriculas", Page::Placeholder("Matrículas"), Registrar, "Matrículas", "file-lines"),
    route("/secretaria/relatorios", Page::Placeholder("Relatórios"), Registrar, "Relatórios", "clipboard-list"),
    home(route("/responsavel-dashboard", Page::GuardianDashboard, FollowStudent, "Dashboard", "house")),
    route("/responsavel/calendario", Page::Placeholder("Calendário"), FollowStudent, "Calendário", "calendar"),
    route("/responsavel/boletim", Page::Placeholder("Boletim"), FollowStudent, "Boletim", "file-lines"),
    route("/responsavel/frequencia", Page::Placeholder("Frequência"), FollowStudent, "Frequência", "user-check"),
    route("/configuracoes", Page::Settings, Account, "Configurações", "gear"),
    home(route("/dashboard", Page::Welcome, Guest, "Início", "house")),
];

pub fn can_access(role: Role, route: &Route) -> bool {
    Capability::granted_to(role).contains(&route.requires)
}

pub fn routes_for(role: Role) -> impl Iterator<Item = &'static Route> {
    ROUTES.iter().filter(move |r| can_access(role, r))
}

pub fn home_route(role: Role) -> &'static Route {
    routes_for(role)
        .find(|r| r.home)
        .unwrap_or(&ROUTES[ROUTES.len() - 1])
}

/// The route shown for `path`, falling back to the role's home.
pub fn resolve(role: Role, path: &str) -> &'static Route {
    match routes_for(role).find(|r| r.path == path) {
        Some(route) => route,
        None => {
            debug!("{} cannot open {}, redirecting home", role, path);
            home_route(role)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Navigation {
    role: Role,
    current: &'static Route,
    history: Vec<&'static str>,
}

impl Navigation {
    pub fn new(role: Role) -> Self {
        let current = home_route(role);
        Self {
            role,
            current,
            history: vec![current.path],
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn current(&self) -> &'static Route {
        self.current
    }

    pub fn history(&self) -> &[&'static str] {
        &self.history
    }

    /// Opens `path`; returns whether the displayed route changed.
    pub fn navigate(&mut self, path: &str) -> bool {
        let target = resolve(self.role, path);
        if std::ptr::eq(target, self.current) {
            return false;
        }
        self.current = target;
        self.history.push(target.path);
        true
    }

    pub fn go_back(&mut self) -> bool {
        if self.history.len() <= 1 {
            return false;
        }
        self.history.pop();
        let previous = self.history[self.history.len() - 1];
        self.current = resolve(self.role, previous);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 6] = [
        Role::Admin,
        Role::Professor,
        Role::Secretaria,
        Role::Responsavel,
        Role::Aluno,
        Role::Unknown,
    ];

    #[test]
    fn resolved_routes_are_always_permitted() {
        let mut paths: Vec<&str> = ROUTES.iter().map(|r| r.path).collect();
        paths.extend(["", "/", "/nao-existe", "/admin", "/secretaria/"]);
        for role in ROLES {
            for path in &paths {
                let route = resolve(role, path);
                assert!(can_access(role, route), "{:?} reached {}", role, route.path);
            }
        }
    }

    #[test]
    fn forbidden_paths_go_home() {
        assert_eq!(resolve(Role::Professor, "/admin-dashboard").path, "/dashboard");
        assert_eq!(resolve(Role::Aluno, "/notas").path, "/responsavel-dashboard");
        assert_eq!(resolve(Role::Secretaria, "/nao-existe").page, Page::SecretariaDashboard);
        assert_eq!(resolve(Role::Admin, "/frequencia").page, Page::AdminDashboard);
    }

    #[test]
    fn homes_match_roles() {
        assert_eq!(home_route(Role::Admin).page, Page::AdminDashboard);
        assert_eq!(home_route(Role::Professor).page, Page::Dashboard);
        assert_eq!(home_route(Role::Secretaria).page, Page::SecretariaDashboard);
        assert_eq!(home_route(Role::Responsavel).page, Page::GuardianDashboard);
        assert_eq!(home_route(Role::Aluno).page, Page::GuardianDashboard);
        assert_eq!(home_route(Role::Unknown).page, Page::Welcome);
    }

    #[test]
    fn same_path_differs_by_role() {
        assert_eq!(resolve(Role::Professor, "/dashboard").page, Page::Dashboard);
        assert_eq!(resolve(Role::Unknown, "/dashboard").page, Page::Welcome);
        assert_eq!(resolve(Role::Unknown, "/configuracoes").page, Page::Welcome);
    }

    #[test]
    fn every_known_role_has_settings() {
        for role in ROLES.into_iter().filter(|r| *r != Role::Unknown) {
            assert_eq!(resolve(role, "/configuracoes").page, Page::Settings);
        }
    }

    #[test]
    fn navigation_history() {
        let mut nav = Navigation::new(Role::Professor);
        assert!(!nav.navigate("/dashboard"));
        assert!(nav.navigate("/notas"));
        assert!(nav.navigate("/admin-dashboard"));
        assert_eq!(nav.current().path, "/dashboard");
        assert_eq!(nav.history(), &["/dashboard", "/notas", "/dashboard"]);

        assert!(nav.go_back());
        assert_eq!(nav.current().page, Page::Grades);
        assert!(nav.go_back());
        assert!(!nav.go_back());
        assert_eq!(nav.current().path, "/dashboard");
    }
}
