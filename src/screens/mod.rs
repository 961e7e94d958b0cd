pub mod admin_dashboard;
pub mod attendance;
pub mod dashboard;
pub mod grades;
pub mod guardian;
pub mod login;
pub mod nav_menu;
pub mod placeholder;
pub mod roster;
pub mod settings;

pub use admin_dashboard::admin_dashboard_screen;
pub use attendance::{attendance_screen, secretaria_dashboard_screen};
pub use dashboard::dashboard_screen;
pub use grades::grades_screen;
pub use guardian::guardian_screen;
pub use login::{login_screen, restoring_screen};
pub use nav_menu::nav_menu;
pub use placeholder::{placeholder_screen, welcome_screen};
pub use roster::roster_screen;
pub use settings::settings_screen;

use chrono::{Datelike, NaiveDate};
use iced::widget::{Column, Row, Text, progress_bar};
use iced::{Alignment, Length};
use iced_aw::date_picker::Date;

use crate::app::Message;
use crate::model::AttendanceSummary;

pub fn to_naive(date: Date) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(date.year, date.month, date.day)
}

pub fn from_naive(date: NaiveDate) -> Date {
    Date {
        year: date.year(),
        month: date.month(),
        day: date.day(),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Attendance percentages as labelled bars.
pub fn attendance_bars<'a>(rows: &'a [AttendanceSummary]) -> Column<'a, Message> {
    if rows.is_empty() {
        return Column::new().push(Text::new("Sem dados de presença."));
    }
    rows.iter().fold(Column::new().spacing(8), |column, row| {
        column.push(
            Row::new()
                .spacing(10)
                .align_y(Alignment::Center)
                .push(Text::new(&row.label).width(Length::Fixed(200.0)))
                .push(progress_bar(0.0..=100.0, row.percentage as f32).height(Length::Fixed(14.0)))
                .push(Text::new(format!("{:.1}%", row.percentage)).width(Length::Fixed(70.0))),
        )
    })
}
