use std::io::{Stdout, stdout};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

use crate::filter::{FilterCriteria, FilterField};
use crate::models::ListingRecord;
use crate::scroll::ScrollMetrics;
use crate::session::Session;
use crate::store::{Overlay, StoreEvent};

/// Rows per card, including the blank separator.
const CARD_HEIGHT: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    EditFilters { field: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

enum Input {
    Key(KeyEvent),
    Resize,
}

enum Step {
    Input(Input),
    Store(StoreEvent),
    Redraw,
    Quit,
}

struct App {
    session: Session,
    list_state: ListState,
    selected: usize,
    mode: Mode,
    drafts: Vec<String>, // one per FilterField::ALL entry
    viewport_rows: u16,
    last_update: Option<DateTime<Local>>,
}

impl App {
    fn new(session: Session) -> Self {
        Self {
            session,
            list_state: ListState::default(),
            selected: 0,
            mode: Mode::Browse,
            drafts: vec![String::new(); FilterField::ALL.len()],
            viewport_rows: 0,
            last_update: None,
        }
    }

    fn dispatch(&mut self, event: StoreEvent) {
        let before = self.session.state().records().len();
        self.session.dispatch(event);
        if self.session.state().records().len() != before {
            self.last_update = Some(Local::now());
        }
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        let len = self.session.state().filtered_len();
        if len == 0 {
            self.selected = 0;
            self.list_state.select(None);
        } else {
            self.selected = self.selected.min(len - 1);
            self.list_state.select(Some(self.selected));
        }
    }

    fn selected_record(&self) -> Option<&ListingRecord> {
        self.session.state().filtered_at(self.selected)
    }

    fn move_by(&mut self, delta: isize) {
        let len = self.session.state().filtered_len();
        if len == 0 {
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, len as isize - 1) as usize;
        self.list_state.select(Some(self.selected));
    }

    fn page_len(&self) -> isize {
        (self.viewport_rows / CARD_HEIGHT).max(1) as isize
    }

    /// Reports the list geometry, in rows, so the store can decide whether
    /// the next page is needed.
    fn report_scroll(&mut self) {
        let metrics = ScrollMetrics {
            scroll_top: self.list_state.offset() as u32 * CARD_HEIGHT as u32,
            scroll_height: self.session.state().filtered_len() as u32 * CARD_HEIGHT as u32,
            client_height: self.viewport_rows as u32,
        };
        self.dispatch(StoreEvent::Scrolled(metrics));
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        match self.mode {
            Mode::Browse => self.handle_browse_key(key),
            Mode::EditFilters { field } => {
                self.handle_filter_key(field, key);
                Flow::Continue
            }
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Flow {
        let overlay_shown = matches!(self.session.state().overlay(), Overlay::Shown { .. });
        match key.code {
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Esc if overlay_shown => self.dispatch(StoreEvent::CloseDetails),
            KeyCode::Esc => return Flow::Quit,
            KeyCode::Down | KeyCode::Char('j') => self.move_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_by(-1),
            KeyCode::PageDown | KeyCode::Char('J') => self.move_by(self.page_len()),
            KeyCode::PageUp | KeyCode::Char('K') => self.move_by(-self.page_len()),
            KeyCode::Enter => {
                if let Some(id) = self.selected_record().map(|r| r.id.clone()) {
                    self.dispatch(StoreEvent::ViewDetails(id));
                }
            }
            KeyCode::Char('/') => self.mode = Mode::EditFilters { field: 0 },
            KeyCode::Char('x') => {
                self.drafts.iter_mut().for_each(String::clear);
                self.dispatch(StoreEvent::ClearFilters);
            }
            KeyCode::Char('n') => self.dispatch(StoreEvent::AdvancePage),
            _ => {}
        }
        Flow::Continue
    }

    fn handle_filter_key(&mut self, index: usize, key: KeyEvent) {
        let field = FilterField::ALL[index];
        let count = FilterField::ALL.len();
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.mode = Mode::Browse;
                return;
            }
            KeyCode::Tab | KeyCode::Down => {
                self.mode = Mode::EditFilters { field: (index + 1) % count };
                return;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.mode = Mode::EditFilters { field: (index + count - 1) % count };
                return;
            }
            KeyCode::Char(' ') if field == FilterField::Remote => {
                let draft = &mut self.drafts[index];
                *draft = if draft.is_empty() { "yes".to_string() } else { String::new() };
            }
            KeyCode::Backspace if field == FilterField::Remote => self.drafts[index].clear(),
            KeyCode::Char(_) if field == FilterField::Remote => return,
            KeyCode::Char(c) => self.drafts[index].push(c),
            KeyCode::Backspace => {
                if self.drafts[index].pop().is_none() {
                    return;
                }
            }
            _ => return,
        }
        let value = self.drafts[index].clone();
        self.dispatch(StoreEvent::FilterChanged { field, value });
    }
}

/// Owns the terminal while the view is active and restores it on drop,
/// whichever way the browse loop exits.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn spawn_input_reader(tx: UnboundedSender<Input>) {
    std::thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => {
                    let input = match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Input::Key(key),
                        Ok(Event::Resize(_, _)) => Input::Resize,
                        Ok(_) => continue,
                        Err(_) => break,
                    };
                    if tx.send(input).is_err() {
                        break;
                    }
                }
                Ok(false) => {}
                Err(_) => break,
            }
        }
    });
}

pub async fn run_browse(session: Session) -> Result<()> {
    let mut app = App::new(session);
    let mut guard = TerminalGuard::enter()?;

    let (tx, mut input_rx) = unbounded_channel();
    spawn_input_reader(tx);

    app.dispatch(StoreEvent::AdvancePage);

    let result: Result<()> = loop {
        if let Err(e) = guard.terminal.draw(|frame| draw(frame, &mut app)) {
            break Err(e.into());
        }
        app.report_scroll();

        let step = tokio::select! {
            input = input_rx.recv() => match input {
                Some(input) => Step::Input(input),
                None => Step::Quit,
            },
            event = app.session.recv() => match event {
                Some(event) => Step::Store(event),
                None => Step::Redraw,
            },
        };

        match step {
            Step::Input(Input::Key(key)) => {
                if app.handle_key(key) == Flow::Quit {
                    break Ok(());
                }
            }
            Step::Input(Input::Resize) | Step::Redraw => {}
            Step::Store(event) => app.dispatch(event),
            Step::Quit => break Ok(()),
        }
    };

    app.dispatch(StoreEvent::Teardown);
    drop(input_rx);
    drop(guard);
    result
}

fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_filters(frame, app, chunks[0]);
    draw_listings(frame, app, chunks[1]);
    draw_status(frame, app, chunks[2]);

    let help = match app.mode {
        Mode::Browse => " j/k:move  J/K:page  enter:details  /:filters  x:clear  n:next page  q:quit",
        Mode::EditFilters { .. } => " type to filter  tab/shift-tab:field  space:toggle remote  esc:done",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );

    if let Some(record) = app.session.state().detail_record() {
        draw_detail(frame, record);
    }
}

fn draw_filters(frame: &mut Frame, app: &App, area: Rect) {
    let active = match app.mode {
        Mode::EditFilters { field } => Some(field),
        Mode::Browse => None,
    };

    let mut spans = Vec::new();
    for (i, field) in FilterField::ALL.iter().enumerate() {
        let style = if active == Some(i) {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Cyan)
        };
        spans.push(Span::styled(format!("{}:", field.label()), style));
        let value = filter_bar_value(app.session.state().filters(), &app.drafts[i], *field);
        spans.push(Span::raw(format!(" {}  ", value)));
    }

    let bar = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Filters "))
        .wrap(Wrap { trim: true });
    frame.render_widget(bar, area);
}

/// Applied value of a filter. Numeric fields also show the typed text when
/// only part of it, or none, was usable.
fn filter_bar_value(criteria: &FilterCriteria, draft: &str, field: FilterField) -> String {
    let applied = criteria.value(field);
    let typed = draft.trim();
    if field.is_numeric() && !typed.is_empty() && typed != applied {
        if applied.is_empty() {
            return format!("{} (ignored)", typed);
        }
        return format!("{} ({})", applied, typed);
    }
    if applied.is_empty() { "-".to_string() } else { applied }
}

fn draw_listings(frame: &mut Frame, app: &mut App, area: Rect) {
    let state = app.session.state();
    let dimmed = matches!(state.overlay(), Overlay::Shown { .. });
    let width = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = state.filtered().map(|record| card(record, width)).collect();

    let title = format!(" Jobs ({} of {}) ", state.filtered_len(), state.records().len());
    let mut list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    if dimmed {
        list = list.style(Style::default().fg(Color::DarkGray));
    }

    app.viewport_rows = area.height.saturating_sub(2);
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn card(record: &ListingRecord, width: usize) -> ListItem<'static> {
    let mut header = vec![Span::styled(
        titlecase(&record.role),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if !record.company_name.is_empty() {
        header.push(Span::raw(format!(" @ {}", record.company_name)));
    }

    let mut place = titlecase(&record.location);
    if record.is_remote() && !place.to_lowercase().contains("remote") {
        place.push_str(" · remote");
    }

    let salary = record.salary_range().unwrap_or_else(|| "-".to_string());
    let experience = record.experience_range().unwrap_or_else(|| "-".to_string());

    let summary = record
        .description
        .as_deref()
        .map(|d| truncate(&d.replace('\n', " "), width))
        .unwrap_or_default();

    ListItem::new(vec![
        Line::from(header),
        Line::from(Span::styled(place, Style::default().fg(Color::Gray))),
        Line::from(format!("Salary: {}  ✅   Experience: {}", salary, experience)),
        Line::from(Span::styled(summary, Style::default().fg(Color::DarkGray))),
        Line::from(""),
    ])
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let pagination = state.pagination();

    let mut parts = vec![format!(" pages {}", pagination.pages_loaded())];
    if let Some(total) = state.total_count() {
        parts.push(format!("{} available", total));
    }
    if state.is_loading() {
        parts.push(format!("loading page {}...", pagination.page_number));
    } else if pagination.exhausted {
        parts.push("end of listings".to_string());
    }
    if let Some(at) = app.last_update {
        parts.push(format!("updated {}", at.format("%H:%M:%S")));
    }

    let mut spans = vec![Span::raw(parts.join(" | "))];
    if let Some(err) = state.last_error() {
        spans.push(Span::styled(
            format!(" | {} (n to retry)", err),
            Style::default().fg(Color::Red),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_detail(frame: &mut Frame, record: &ListingRecord) {
    let area = centered_rect(70, 70, frame.area());
    let width = area.width.saturating_sub(4).max(20) as usize;

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled(
            titlecase(&record.role),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    if !record.company_name.is_empty() {
        lines.push(Line::from(format!("at {}", record.company_name)));
    }
    lines.push(Line::from(format!("Location: {}", titlecase(&record.location))));
    if let Some(salary) = record.salary_range() {
        lines.push(Line::from(format!("Estimated salary: {}", salary)));
    }
    if let Some(experience) = record.experience_range() {
        lines.push(Line::from(format!("Experience required: {}", experience)));
    }
    if let Some(employees) = &record.employee_count {
        lines.push(Line::from(format!("Employees: {}", employees)));
    }
    if let Some(link) = &record.link {
        lines.push(Line::from(Span::styled(
            format!("Apply: {}", link),
            Style::default().fg(Color::Cyan),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Job description",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    match &record.description {
        Some(text) => {
            for line in textwrap::fill(text, width).lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        None => lines.push(Line::from(Span::styled(
            "(No description provided)",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    let detail = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(" Details (esc to close) "))
        .wrap(Wrap { trim: false });
    frame.render_widget(Clear, area);
    frame.render_widget(detail, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn titlecase(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("backend", 10), "backend");
        assert_eq!(truncate("bengaluru ₹₹₹₹", 8), "benga...");
        assert_eq!(truncate("₹₹₹₹₹₹", 5), "₹₹...");
    }

    #[test]
    fn test_filter_bar_shows_applied_values() {
        let mut criteria = FilterCriteria::default();
        assert_eq!(filter_bar_value(&criteria, "", FilterField::Role), "-");

        criteria.set(FilterField::Role, "  backend ");
        assert_eq!(filter_bar_value(&criteria, "  backend ", FilterField::Role), "backend");

        criteria.set(FilterField::Remote, "yes");
        assert_eq!(filter_bar_value(&criteria, "yes", FilterField::Remote), "yes");

        criteria.set(FilterField::MinExperience, "3+ years");
        assert_eq!(filter_bar_value(&criteria, "3+ years", FilterField::MinExperience), "3 (3+ years)");

        criteria.set(FilterField::MinSalary, "40");
        assert_eq!(filter_bar_value(&criteria, "40", FilterField::MinSalary), "40");

        criteria.set(FilterField::MinSalary, "lots");
        assert_eq!(filter_bar_value(&criteria, "lots", FilterField::MinSalary), "lots (ignored)");
    }

    #[test]
    fn test_titlecase() {
        assert_eq!(titlecase("frontend"), "Frontend");
        assert_eq!(titlecase(""), "");
    }

    #[test]
    fn test_centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(70, 70, area);
        assert_eq!(inner.width, 70);
        assert_eq!(inner.height, 28);
        assert_eq!(inner.x, 15);
    }
}
