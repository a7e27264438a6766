//! Terminal styling helpers shared by the one-shot commands and the dashboard.

use std::io::{self, IsTerminal};
use std::sync::OnceLock;

use crate::form::{FormSession, SessionState};
use crate::status::LifecyclePhase;

fn colors_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        if std::env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if std::env::var("TERM")
            .map(|term| term.eq_ignore_ascii_case("dumb"))
            .unwrap_or(false)
        {
            return false;
        }

        io::stdout().is_terminal()
    })
}

/// Colours `value` when stdout is a colour-capable terminal.
pub fn paint(value: &str, code: &str) -> String {
    if colors_enabled() {
        ansi(code, value)
    } else {
        value.to_string()
    }
}

/// Unconditional SGR wrapping, for frames that are only ever drawn on a terminal.
pub fn ansi(code: &str, value: &str) -> String {
    format!("\x1b[{code}m{value}\x1b[0m")
}

pub fn pad(value: &str, width: usize) -> String {
    let current = value.chars().count();
    if current >= width {
        value.to_string()
    } else {
        format!("{value}{}", " ".repeat(width - current))
    }
}

pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        return value.to_string();
    }
    if max_len <= 1 {
        return "…".to_string();
    }
    let mut output = value.chars().take(max_len - 1).collect::<String>();
    output.push('…');
    output
}

pub fn label(value: &str) -> String {
    paint(value, "1;36")
}

pub fn phase_code(phase: &LifecyclePhase) -> &'static str {
    match phase {
        LifecyclePhase::Running(_) => "1;32",
        LifecyclePhase::Starting | LifecyclePhase::Stopping => "1;33",
        LifecyclePhase::Stopped(_) => "2;37",
        LifecyclePhase::Unknown => "1;35",
    }
}

/// Phase label followed by its detail text, the way the `Active` facet is shown.
pub fn phase_line(phase: &LifecyclePhase) -> String {
    match phase {
        LifecyclePhase::Running(detail) if !detail.is_empty() => {
            format!("{} {detail}", phase.label())
        }
        LifecyclePhase::Stopped(detail) if !detail.is_empty() => detail.clone(),
        LifecyclePhase::Starting | LifecyclePhase::Stopping => format!("{}…", phase.label()),
        _ => phase.label().to_string(),
    }
}

/// Short marker for a settings row: disabled, saving, unsaved, failed, or clean.
pub fn session_marker(session: &FormSession) -> &'static str {
    if !session.is_enabled() {
        "!"
    } else if session.is_in_flight() {
        "~"
    } else if session.last_error().is_some() {
        "x"
    } else {
        match session.state() {
            SessionState::Dirty => "*",
            SessionState::Clean => " ",
        }
    }
}

/// Renders the operator-facing value of a session, resolving option ids to labels.
pub fn session_value(session: &FormSession) -> String {
    use crate::settings::SettingValue;

    match session.working() {
        None => "-".to_string(),
        Some(SettingValue::Bool(true)) => "on".to_string(),
        Some(SettingValue::Bool(false)) => "off".to_string(),
        Some(SettingValue::Selection(ids)) => ids
            .iter()
            .map(|id| session.field().option_label(id))
            .collect::<Vec<_>>()
            .join(", "),
        Some(SettingValue::Text(id)) if session.field().option(id).is_some() => {
            session.field().option_label(id).to_string()
        }
        Some(value) => value.to_string(),
    }
}
