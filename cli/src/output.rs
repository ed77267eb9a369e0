//! CLI output helpers for consistent, drizzle-kit-like formatting.

use colored::Colorize;

use drizzle_migrations::ChangeClass;

pub fn heading(text: &str) -> String {
    format!("{}", text.bright_cyan())
}

pub fn label(text: &str) -> String {
    format!("{}", text.bright_blue())
}

pub fn muted(text: &str) -> String {
    format!("{}", text.bright_black())
}

pub fn success(text: &str) -> String {
    format!("{}", text.bright_green())
}

pub fn warning(text: &str) -> String {
    format!("{}", text.yellow())
}

pub fn error(text: &str) -> String {
    format!("{}", text.red())
}

pub fn warn_line(text: &str) -> String {
    format!("[{}] {}", "Warning".yellow(), text)
}

pub fn banner_warning(text: &str) -> String {
    format!("{} {}", " Warning ".white().on_bright_black(), text)
}

pub fn status_ok() -> String {
    format!("{}", "OK".green())
}

pub fn status_error() -> String {
    format!("{}", "ERROR".red())
}

pub fn status_warning(text: &str) -> String {
    format!("{}", text.yellow())
}

/// Colored tag for a change class
pub fn class_tag(class: ChangeClass) -> String {
    let text = format!("[{class}]");
    match class {
        ChangeClass::Safe => format!("{}", text.green()),
        ChangeClass::DataAltering => format!("{}", text.yellow()),
        ChangeClass::Destructive => format!("{}", text.red().bold()),
    }
}
