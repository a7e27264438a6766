use std::cmp::min;
use std::io::{stdout, Write};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use crossterm::cursor;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use tracing::warn;

use crate::backend::ControlPlane;
use crate::errors::DeckError;
use crate::form::FormSession;
use crate::panel::ServicePanel;
use crate::settings::{parse_input, FieldKind, SettingValue};
use crate::status::{classify, LifecyclePhase, ServiceAction, StatusSnapshot};
use crate::ui::{ansi, pad, phase_code, phase_line, session_marker, session_value, truncate};

const SERVICE_ROWS: usize = 5;
const FACET_ROWS: usize = 5;
/// Every line of the frame except the settings area.
const FIXED_LINES: usize = 25;
const MIN_WIDTH: usize = 80;
const MIN_HEIGHT: usize = 30;
const SPINNER: [char; 4] = ['◐', '◓', '◑', '◒'];

pub(crate) async fn run<C: ControlPlane>(plane: &C, refresh_interval: Duration) -> Result<()> {
    let _guard = TerminalGuard::enter()?;

    let mut state = DashboardState::default();
    let mut services = Vec::<ServiceRow>::new();
    let mut panel: Option<ServicePanel> = None;
    let mut next_refresh_at = Instant::now();
    let mut needs_full_clear = true;
    let mut should_exit = false;

    while !should_exit {
        if Instant::now() >= next_refresh_at {
            match refresh(plane, &mut services, &mut panel, &mut state).await {
                Ok(()) => state.clear_error(),
                Err(err) => state.set_error(format!("refresh failed: {err:#}")),
            }
            next_refresh_at = Instant::now() + refresh_interval;
        }

        draw_frame(
            &services,
            panel.as_ref(),
            &state,
            refresh_interval,
            needs_full_clear,
        )?;
        needs_full_clear = false;

        if event::poll(Duration::from_millis(90)).context("failed polling terminal input")? {
            match event::read().context("failed reading terminal input")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match state.handle_key(key.code, services.len(), panel.as_ref()) {
                        Intent::Idle => {}
                        Intent::Quit => should_exit = true,
                        Intent::Refresh => next_refresh_at = Instant::now(),
                        Intent::SwitchService => {
                            // Working copies belong to the service they were made for.
                            panel = None;
                            next_refresh_at = Instant::now();
                        }
                        intent => {
                            if let Some(panel) = panel.as_mut() {
                                if apply_intent(plane, panel, intent, &mut state).await {
                                    next_refresh_at = Instant::now();
                                }
                            }
                        }
                    }
                }
                Event::Resize(_, _) => {
                    needs_full_clear = true;
                }
                _ => {}
            }
        }

        state.prune_flash();
    }

    Ok(())
}

#[derive(Debug, Clone)]
struct ServiceRow {
    name: String,
    phase: LifecyclePhase,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
enum Focus {
    #[default]
    Services,
    Settings,
}

/// What a key press asks the loop to do once the cursor state has been updated.
#[derive(Debug, Clone, PartialEq)]
enum Intent {
    Idle,
    Quit,
    Refresh,
    SwitchService,
    Action(ServiceAction),
    Edit {
        field: String,
        value: Option<SettingValue>,
    },
    Save(String),
    Discard(String),
}

#[derive(Debug, Default)]
struct DashboardState {
    selected: usize,
    focus: Focus,
    field: usize,
    option: usize,
    /// Text being typed into the selected field, if any.
    input: Option<String>,
    flash: Option<FlashMessage>,
}

#[derive(Debug)]
struct FlashMessage {
    text: String,
    level: FlashLevel,
    at: Instant,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FlashLevel {
    Info,
    Error,
}

impl DashboardState {
    fn clamp_selection(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Keeps the cursor on the service the panel shows when the list shifts around it.
    fn follow_service(&mut self, names: &[String], current: Option<&str>) {
        match current.and_then(|service| names.iter().position(|name| name == service)) {
            Some(idx) => self.selected = idx,
            None => self.clamp_selection(names.len()),
        }
    }

    fn reset_settings_cursor(&mut self) {
        self.focus = Focus::Services;
        self.field = 0;
        self.option = 0;
        self.input = None;
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.flash = Some(FlashMessage {
            text: text.into(),
            level: FlashLevel::Info,
            at: Instant::now(),
        });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.flash = Some(FlashMessage {
            text: text.into(),
            level: FlashLevel::Error,
            at: Instant::now(),
        });
    }

    fn clear_error(&mut self) {
        if matches!(
            self.flash.as_ref().map(|message| message.level),
            Some(FlashLevel::Error)
        ) {
            self.flash = None;
        }
    }

    fn prune_flash(&mut self) {
        let should_drop = self
            .flash
            .as_ref()
            .map(|message| message.at.elapsed() > Duration::from_secs(4))
            .unwrap_or(false);
        if should_drop {
            self.flash = None;
        }
    }

    fn handle_key(
        &mut self,
        code: KeyCode,
        service_count: usize,
        panel: Option<&ServicePanel>,
    ) -> Intent {
        if self.input.is_some() {
            return self.handle_input_key(code, panel);
        }
        match self.focus {
            Focus::Services => self.handle_service_key(code, service_count, panel),
            Focus::Settings => self.handle_settings_key(code, panel),
        }
    }

    fn handle_service_key(
        &mut self,
        code: KeyCode,
        service_count: usize,
        panel: Option<&ServicePanel>,
    ) -> Intent {
        match code {
            KeyCode::Char('q') => Intent::Quit,
            KeyCode::Char('g') => Intent::Refresh,
            KeyCode::Up | KeyCode::Char('k') if self.selected > 0 => {
                self.selected -= 1;
                self.reset_settings_cursor();
                Intent::SwitchService
            }
            KeyCode::Down | KeyCode::Char('j') if self.selected + 1 < service_count => {
                self.selected += 1;
                self.reset_settings_cursor();
                Intent::SwitchService
            }
            KeyCode::Char('s') => Intent::Action(ServiceAction::Start),
            KeyCode::Char('x') => Intent::Action(ServiceAction::Stop),
            KeyCode::Char('r') => Intent::Action(ServiceAction::Restart),
            KeyCode::Tab | KeyCode::Enter
                if panel.is_some_and(|panel| !panel.form().is_empty()) =>
            {
                self.focus = Focus::Settings;
                Intent::Idle
            }
            _ => Intent::Idle,
        }
    }

    fn handle_settings_key(&mut self, code: KeyCode, panel: Option<&ServicePanel>) -> Intent {
        let field_count = panel.map_or(0, |panel| panel.form().len());
        let Some(session) = panel.and_then(|panel| panel.form().sessions().get(self.field)) else {
            self.focus = Focus::Services;
            return Intent::Idle;
        };

        match code {
            KeyCode::Char('q') => Intent::Quit,
            KeyCode::Tab | KeyCode::Esc => {
                self.focus = Focus::Services;
                Intent::Idle
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.field > 0 {
                    self.field -= 1;
                    self.option = 0;
                }
                Intent::Idle
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.field + 1 < field_count {
                    self.field += 1;
                    self.option = 0;
                }
                Intent::Idle
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.option = self.option.saturating_sub(1);
                Intent::Idle
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.option + 1 < session.field().initial_values.len() {
                    self.option += 1;
                }
                Intent::Idle
            }
            KeyCode::Char('w') => Intent::Save(session.name().to_string()),
            KeyCode::Char('u') => Intent::Discard(session.name().to_string()),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate(session),
            _ => Intent::Idle,
        }
    }

    /// Enter/Space on a field: open the text editor, flip a toggle, or pick the option under
    /// the cursor.
    fn activate(&mut self, session: &FormSession) -> Intent {
        if !session.is_enabled() {
            if let Some(problem) = session.configuration_error() {
                self.set_error(problem.to_string());
            }
            return Intent::Idle;
        }

        let field = session.name().to_string();
        let option = session.field().initial_values.get(self.option);
        match session.kind() {
            FieldKind::Text => {
                self.input = Some(session.working().map(ToString::to_string).unwrap_or_default());
                Intent::Idle
            }
            FieldKind::Toggle => {
                let current = matches!(session.working(), Some(SettingValue::Bool(true)));
                Intent::Edit {
                    field,
                    value: Some(SettingValue::Bool(!current)),
                }
            }
            FieldKind::SingleSelect => match option {
                Some(option) => Intent::Edit {
                    field,
                    value: Some(SettingValue::text(option.id.as_str())),
                },
                None => Intent::Idle,
            },
            FieldKind::MultiSelect => {
                let Some(option) = option else {
                    return Intent::Idle;
                };
                let mut ids = match session.working() {
                    Some(SettingValue::Selection(ids)) => ids.clone(),
                    _ => Vec::new(),
                };
                match ids.iter().position(|id| *id == option.id) {
                    Some(idx) => {
                        ids.remove(idx);
                    }
                    None => ids.push(option.id.clone()),
                }
                Intent::Edit {
                    field,
                    value: Some(SettingValue::selection(ids)),
                }
            }
        }
    }

    fn handle_input_key(&mut self, code: KeyCode, panel: Option<&ServicePanel>) -> Intent {
        let Some(buffer) = self.input.as_mut() else {
            return Intent::Idle;
        };

        match code {
            KeyCode::Esc => {
                self.input = None;
                Intent::Idle
            }
            KeyCode::Backspace => {
                buffer.pop();
                Intent::Idle
            }
            KeyCode::Char(ch) => {
                buffer.push(ch);
                Intent::Idle
            }
            KeyCode::Enter => {
                let raw = self.input.take().unwrap_or_default();
                let Some(session) =
                    panel.and_then(|panel| panel.form().sessions().get(self.field))
                else {
                    return Intent::Idle;
                };
                match parse_input(session.field(), session.kind(), &raw) {
                    Ok(value) => Intent::Edit {
                        field: session.name().to_string(),
                        value: Some(value),
                    },
                    Err(err) => {
                        self.set_error(err.to_string());
                        Intent::Idle
                    }
                }
            }
            _ => Intent::Idle,
        }
    }
}

/// Runs an intent that needs the selected service. Returns whether the next refresh should
/// happen right away.
async fn apply_intent<C: ControlPlane>(
    plane: &C,
    panel: &mut ServicePanel,
    intent: Intent,
    state: &mut DashboardState,
) -> bool {
    let service = panel.service().to_string();
    match intent {
        Intent::Action(action) => {
            match panel.run_action(plane, action).await {
                Ok(()) => state.set_info(format!("{action} requested for {service}")),
                Err(err) => state.set_error(failure_text(&err)),
            }
            true
        }
        Intent::Edit { field, value } => {
            if let Err(err) = panel.form_mut().edit(&field, value) {
                state.set_error(err.to_string());
            }
            false
        }
        Intent::Save(field) => {
            match panel.save_field(plane, &field).await {
                Ok(true) => state.set_info(format!("saved {field} for {service}")),
                Ok(false) => state.set_info(format!("{field} has no unsaved changes")),
                Err(err) => state.set_error(failure_text(&err)),
            }
            false
        }
        Intent::Discard(field) => {
            if let Err(err) = panel.form_mut().discard(&field) {
                state.set_error(err.to_string());
            }
            false
        }
        Intent::Idle | Intent::Quit | Intent::Refresh | Intent::SwitchService => false,
    }
}

fn failure_text(err: &DeckError) -> String {
    if err.is_retryable() {
        format!("{err} (retry when ready)")
    } else {
        err.to_string()
    }
}

/// Re-reads the service list and every status, and makes sure the panel belongs to the
/// selected service. Settings are only fetched when the panel is (re)created.
async fn refresh<C: ControlPlane>(
    plane: &C,
    services: &mut Vec<ServiceRow>,
    panel: &mut Option<ServicePanel>,
    state: &mut DashboardState,
) -> Result<()> {
    let mut names = plane.services().await?;
    names.sort();

    let mut snapshots = Vec::with_capacity(names.len());
    for name in &names {
        let snapshot = match plane.status(name).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(service = %name, "failed to read status: {err:#}");
                StatusSnapshot::default()
            }
        };
        snapshots.push(snapshot);
    }

    state.follow_service(&names, panel.as_ref().map(ServicePanel::service));
    *services = names
        .iter()
        .zip(&snapshots)
        .map(|(name, snapshot)| ServiceRow {
            name: name.clone(),
            phase: classify(snapshot),
        })
        .collect();

    let Some(selected) = names.get(state.selected) else {
        *panel = None;
        return Ok(());
    };

    if panel.as_ref().map(ServicePanel::service) != Some(selected.as_str()) {
        state.reset_settings_cursor();
        let mut fresh = ServicePanel::new(selected.clone());
        if let Err(err) = fresh.refresh_settings(plane).await {
            state.set_error(format!("failed to load settings of {selected}: {err:#}"));
        }
        *panel = Some(fresh);
    }
    if let Some(panel) = panel.as_mut() {
        panel.apply_snapshot(snapshots.swap_remove(state.selected));
    }

    Ok(())
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed enabling raw mode")?;
        let mut out = stdout();
        execute!(out, EnterAlternateScreen, cursor::Hide)
            .context("failed entering alternate screen")?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut out = stdout();
        let _ = execute!(out, cursor::Show, LeaveAlternateScreen);
    }
}

fn draw_frame(
    services: &[ServiceRow],
    panel: Option<&ServicePanel>,
    state: &DashboardState,
    refresh: Duration,
    clear_all: bool,
) -> Result<()> {
    let (width, height) = terminal::size().context("failed reading terminal size")?;
    let width = width as usize;
    let height = height as usize;

    let mut frame = Vec::<u8>::new();

    if width < MIN_WIDTH || height < MIN_HEIGHT {
        write_line(
            &mut frame,
            &ansi(
                "1;31",
                &format!(
                    "Terminal too small for servicedeck ui. \
                     Resize to at least {MIN_WIDTH}x{MIN_HEIGHT}."
                ),
            ),
        )?;
        return flush_frame(&frame, clear_all);
    }

    let border = |left: &str, right: &str| ansi("1;36", &frame_line(left, right, width, '═'));
    let title = format!(
        " SERVICEDECK  │  {}  │  refresh {}ms  │  {} services ",
        wall_clock_hms(),
        refresh.as_millis(),
        services.len()
    );

    write_line(&mut frame, &border("╔", "╗"))?;
    write_line(&mut frame, &ansi("1;36", &frame_content_line(&title, width)))?;
    write_line(&mut frame, &border("╠", "╣"))?;
    write_line(&mut frame, &frame_content_line(&summary_line(services), width))?;
    write_line(&mut frame, &frame_content_line(&flash_line(state), width))?;
    write_line(&mut frame, &border("╠", "╣"))?;
    for line in service_lines(services, state, width) {
        write_line(&mut frame, &frame_content_line(&line, width))?;
    }
    write_line(&mut frame, &border("╠", "╣"))?;

    let settings_height = height.saturating_sub(FIXED_LINES);
    let (status, settings) = match panel {
        Some(panel) => (
            status_lines(panel),
            settings_lines(panel, state, settings_height),
        ),
        None => (
            vec![" No service selected".to_string()],
            Vec::new(),
        ),
    };
    for line in fill(status, FACET_ROWS + 2) {
        write_line(&mut frame, &frame_content_line(&line, width))?;
    }
    write_line(&mut frame, &border("╠", "╣"))?;
    for line in fill(settings, settings_height) {
        write_line(&mut frame, &frame_content_line(&line, width))?;
    }
    write_line(&mut frame, &border("╠", "╣"))?;
    write_line(
        &mut frame,
        &frame_content_line(&ansi("2;37", &key_hints(state)), width),
    )?;
    write_line(&mut frame, &border("╚", "╝"))?;

    flush_frame(&frame, clear_all)
}

fn flush_frame(frame: &[u8], clear_all: bool) -> Result<()> {
    let mut out = stdout();
    execute!(out, cursor::MoveTo(0, 0)).context("failed moving cursor")?;
    if clear_all {
        execute!(out, Clear(ClearType::All)).context("failed clearing terminal frame")?;
    }
    out.write_all(frame)
        .context("failed writing terminal frame")?;
    execute!(out, Clear(ClearType::FromCursorDown)).context("failed clearing frame tail")?;
    out.flush().context("failed flushing terminal frame")?;
    Ok(())
}

fn fill(mut lines: Vec<String>, height: usize) -> Vec<String> {
    lines.truncate(height);
    lines.resize(height, String::new());
    lines
}

fn summary_line(services: &[ServiceRow]) -> String {
    let count = |wanted: fn(&LifecyclePhase) -> bool| {
        services.iter().filter(|row| wanted(&row.phase)).count()
    };
    let running = count(LifecyclePhase::is_running);
    let moving = count(LifecyclePhase::is_transitional);
    let stopped = count(|phase| matches!(phase, LifecyclePhase::Stopped(_)));
    let unknown = count(|phase| *phase == LifecyclePhase::Unknown);

    format!(
        " {} running   {} transitioning   {} stopped   {} unknown",
        ansi("1;32", &running.to_string()),
        ansi("1;33", &moving.to_string()),
        ansi("2;37", &stopped.to_string()),
        ansi("1;35", &unknown.to_string()),
    )
}

fn flash_line(state: &DashboardState) -> String {
    match state.flash.as_ref() {
        Some(message) if message.level == FlashLevel::Error => {
            ansi("1;31", &format!(" ✖ {}", message.text))
        }
        Some(message) => ansi("1;32", &format!(" ✔ {}", message.text)),
        None => String::new(),
    }
}

fn service_lines(services: &[ServiceRow], state: &DashboardState, width: usize) -> Vec<String> {
    let detail_width = width.saturating_sub(46);
    let mut lines = vec![ansi(
        "1;36",
        &format!(
            "   {} │ {} │ {}",
            pad("SERVICE", 24),
            pad("PHASE", 10),
            "DETAIL"
        ),
    )];

    if services.is_empty() {
        lines.push(" no services reported by the supervisor".to_string());
        return fill(lines, SERVICE_ROWS + 1);
    }

    let start = (state.selected + 1).saturating_sub(SERVICE_ROWS);
    let end = min(services.len(), start + SERVICE_ROWS);
    for (idx, row) in services.iter().enumerate().take(end).skip(start) {
        let selected = idx == state.selected;
        let line = format!(
            " {} {} │ {} │ {}",
            if selected { "▸" } else { " " },
            pad(&truncate(&row.name, 24), 24),
            ansi(phase_code(&row.phase), &pad(row.phase.label(), 10)),
            truncate(row.phase.detail().unwrap_or_default(), detail_width),
        );
        if selected && state.focus == Focus::Services {
            lines.push(ansi("48;5;236", &line));
        } else {
            lines.push(line);
        }
    }

    fill(lines, SERVICE_ROWS + 1)
}

fn action_key(action: ServiceAction) -> char {
    match action {
        ServiceAction::Start => 's',
        ServiceAction::Stop => 'x',
        ServiceAction::Restart => 'r',
    }
}

/// Header line with the phase and controls, a note line, then the other facets.
fn status_lines(panel: &ServicePanel) -> Vec<String> {
    let phase = panel.phase();
    let controls = if let Some(action) = panel.pending_action() {
        ansi("1;33", &format!("{action} requested…"))
    } else if phase.is_transitional() {
        ansi("1;33", &format!("{} {}", spinner(), phase_line(phase)))
    } else {
        let actions = panel.available_actions();
        if actions.is_empty() {
            ansi("2;37", "no actions available")
        } else {
            actions
                .iter()
                .map(|action| format!("[{}] {action}", action_key(action)))
                .collect::<Vec<_>>()
                .join("  ")
        }
    };

    let mut lines = vec![format!(
        " {}  •  {}  •  {}",
        ansi("1;37", panel.service()),
        ansi(phase_code(phase), &phase_line(phase)),
        controls
    )];

    lines.push(match panel.last_action_error() {
        Some(reason) => ansi("1;31", &format!(" last action failed: {reason}")),
        None if panel.snapshot().is_empty() => ansi("2;37", " waiting for status…"),
        None if *phase == LifecyclePhase::Unknown => {
            ansi("2;37", " supervisor reported no Active facet")
        }
        None => String::new(),
    });

    for row in panel
        .status_rows()
        .into_iter()
        .filter(|row| row.phase.is_none())
        .take(FACET_ROWS)
    {
        let value = if row.terminal {
            ansi("1;37;40", &format!(" {} ", row.value))
        } else {
            row.value
        };
        lines.push(format!(" {} {value}", pad(&format!("{}:", truncate(&row.key, 14)), 15)));
    }
    lines
}

fn settings_lines(panel: &ServicePanel, state: &DashboardState, height: usize) -> Vec<String> {
    let form = panel.form();
    let dirty = form.dirty_fields().count();
    let mut lines = vec![ansi(
        "1;36",
        &format!(
            " SETTINGS  {} fields{}",
            form.len(),
            if dirty > 0 {
                format!("  •  {dirty} unsaved")
            } else {
                String::new()
            }
        ),
    )];

    if form.is_empty() {
        lines.push(" no settings reported for this service".to_string());
        return lines;
    }

    let focused = state.focus == Focus::Settings;
    let mut selected_line = 0;
    for (idx, session) in form.sessions().iter().enumerate() {
        let selected = focused && idx == state.field;
        let value = match state.input.as_deref() {
            Some(buffer) if selected => ansi("4", &format!("{buffer}▏")),
            _ => session_value(session),
        };
        let marker = session_marker(session);
        let line = format!(
            " {} {} {} │ {} │ {}",
            if selected { "▸" } else { " " },
            ansi(marker_code(marker), marker),
            pad(&truncate(session.name(), 22), 22),
            pad(&session.kind().to_string(), 12),
            value
        );
        if selected {
            selected_line = lines.len();
            lines.push(ansi("48;5;236", &line));
            lines.extend(session_details(session, state));
        } else {
            lines.push(line);
        }
    }

    // Keep the selected row and its details on screen.
    let overflow = (selected_line + 4).saturating_sub(height);
    if overflow > 0 && overflow < lines.len() {
        let header = lines[0].clone();
        lines.drain(0..=overflow);
        lines.insert(0, header);
    }
    lines
}

fn session_details(session: &FormSession, state: &DashboardState) -> Vec<String> {
    let mut lines = Vec::new();
    if session.kind().needs_options() && session.is_enabled() {
        let chosen = |id: &str| match session.working() {
            Some(SettingValue::Selection(ids)) => ids.iter().any(|item| item == id),
            Some(SettingValue::Text(item)) => item == id,
            _ => false,
        };
        let options = session
            .field()
            .initial_values
            .iter()
            .enumerate()
            .map(|(idx, option)| {
                let mark = if chosen(&option.id) { "●" } else { "○" };
                let text = format!("{mark} {}", option.label);
                if idx == state.option {
                    ansi("7", &text)
                } else {
                    text
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(format!("       {options}"));
    }

    if let Some(problem) = session.configuration_error() {
        lines.push(ansi("1;31", &format!("       {problem}")));
    } else if let Some(reason) = session.last_error() {
        lines.push(ansi("1;31", &format!("       {reason}")));
    } else if session.is_in_flight() {
        lines.push(ansi("1;34", "       saving…"));
    } else if session.is_dirty() {
        let was = session
            .baseline()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        lines.push(ansi(
            "1;33",
            &format!("       unsaved (was {was})  •  w save  •  u discard"),
        ));
    }
    lines
}

fn marker_code(marker: &str) -> &'static str {
    match marker {
        "!" | "x" => "1;31",
        "~" => "1;34",
        "*" => "1;33",
        _ => "0",
    }
}

fn key_hints(state: &DashboardState) -> String {
    if state.input.is_some() {
        return " type a value  •  Enter apply  •  Esc cancel".to_string();
    }
    match state.focus {
        Focus::Services => [
            "j/k select", "s start", "x stop", "r restart", "Tab settings", "g refresh", "q quit",
        ]
        .map(|hint| format!(" {hint} "))
        .join("•"),
        Focus::Settings => [
            "j/k field",
            "h/l option",
            "Enter/Space change",
            "w save",
            "u discard",
            "Tab back",
        ]
        .map(|hint| format!(" {hint} "))
        .join("•"),
    }
}

fn spinner() -> char {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    SPINNER[(millis / 150) as usize % SPINNER.len()]
}

fn frame_line(left: &str, right: &str, width: usize, fill: char) -> String {
    format!(
        "{left}{}{right}",
        fill.to_string().repeat(width.saturating_sub(2))
    )
}

fn write_line(out: &mut impl Write, line: &str) -> Result<()> {
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")?;
    Ok(())
}

fn frame_content_line(content: &str, width: usize) -> String {
    let inner = width.saturating_sub(2);
    let clipped = if visible_len(content) > inner {
        truncate_visible_ansi(content, inner)
    } else {
        content.to_string()
    };
    let clipped_visible = visible_len(&clipped);
    format!(
        "║{clipped}{}║",
        " ".repeat(inner.saturating_sub(clipped_visible))
    )
}

fn visible_len(value: &str) -> usize {
    let mut len = 0usize;
    let mut iter = value.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\x1b' {
            if iter.peek() == Some(&'[') {
                let _ = iter.next();
                for next in iter.by_ref() {
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        len += 1;
    }
    len
}

fn truncate_visible_ansi(value: &str, max_visible: usize) -> String {
    if max_visible == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut visible = 0usize;
    let mut saw_ansi = false;
    let mut iter = value.chars().peekable();

    while let Some(ch) = iter.next() {
        if ch == '\x1b' {
            saw_ansi = true;
            out.push(ch);
            if iter.peek() == Some(&'[') {
                out.push(iter.next().unwrap_or('['));
                for next in iter.by_ref() {
                    out.push(next);
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }

        if visible >= max_visible {
            break;
        }
        out.push(ch);
        visible += 1;
    }

    if saw_ansi {
        out.push_str("\x1b[0m");
    }
    out
}

fn wall_clock_hms() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0);
    let h = (secs / 3600) % 24;
    let m = (secs / 60) % 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
