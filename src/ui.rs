use crate::model::{grid_cell, month_start_weekday, CalendarStep, Checklist, DayCursor, Task};
use crate::storage::{self, Store};
use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{debug, info};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};

/// Upper bound on live components: the two base panes plus pushed dialogs.
const STACK_CAPACITY: usize = 32;
/// Byte capacity of the dialog input buffer.
const DIALOG_INPUT_MAX: usize = 512;

pub fn run(store: Store) -> Result<()> {
    let mut app = App::new(store, Local::now().date_naive())?;
    let mut terminal = setup_terminal()?;
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

/// Stable handle to a component on the stack. Only the top of the stack is
/// ever popped, so a handle to a surviving component never goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ComponentId(usize);

/// One addressable unit of the UI. The stack owns each variant's state;
/// components refer to each other by `ComponentId`, never by reference.
enum Component {
    Calendar(CalendarPane),
    Tasks(TaskPane),
    Dialog(InputDialog),
}

struct CalendarPane {
    today: NaiveDate,
    cursor: DayCursor,
    tasks: ComponentId,
}

struct TaskPane {
    list: Checklist,
    calendar: ComponentId,
}

struct InputDialog {
    title: String,
    input: String,
    return_to: ComponentId,
}

impl CalendarPane {
    fn new(today: NaiveDate) -> Self {
        CalendarPane {
            today,
            cursor: DayCursor::at(today),
            // Rewired by App::new as soon as the task pane is pushed.
            tasks: ComponentId(0),
        }
    }
}

impl TaskPane {
    fn new(calendar: ComponentId) -> Self {
        TaskPane {
            list: Checklist::new(),
            calendar,
        }
    }
}

impl InputDialog {
    fn new(title: impl Into<String>, return_to: ComponentId) -> Self {
        InputDialog {
            title: title.into(),
            input: String::new(),
            return_to,
        }
    }

    /// Append one character if the buffer stays under its byte cap.
    fn insert_char(&mut self, c: char) {
        if self.input.len() + c.len_utf8() <= DIALOG_INPUT_MAX {
            self.input.push(c);
        }
    }

    /// Remove the last whole character, never a partial byte.
    fn backspace(&mut self) {
        self.input.pop();
    }
}

struct App {
    components: Vec<Component>,
    focused: usize,
    store: Store,
    status: String,
}

impl App {
    fn new(store: Store, today: NaiveDate) -> Result<Self> {
        let mut app = App {
            components: Vec::new(),
            focused: 0,
            store,
            status: String::new(),
        };
        let calendar = app.push(Component::Calendar(CalendarPane::new(today)));
        let tasks = app.push(Component::Tasks(TaskPane::new(calendar)));
        app.calendar_mut(calendar).tasks = tasks;
        app.focused = calendar.0;
        app.reload_tasks(tasks)?;
        app.status = format!("Loaded {}", app.store.day_path(today).display());
        Ok(app)
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.render_all(f))?;
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if self.handle_key(key)? {
                    break;
                }
            }
        }
        Ok(())
    }

    // --- stack / focus router ---

    fn push(&mut self, component: Component) -> ComponentId {
        assert!(
            self.components.len() < STACK_CAPACITY,
            "component stack overflow"
        );
        self.components.push(component);
        self.focused = self.components.len() - 1;
        ComponentId(self.components.len() - 1)
    }

    fn pop(&mut self) {
        assert!(!self.components.is_empty(), "component stack underflow");
        self.components.pop();
        self.focused = self.components.len().saturating_sub(1);
    }

    fn cycle_focus(&mut self) {
        self.focused = (self.focused + 1) % self.components.len();
    }

    fn focused_id(&self) -> ComponentId {
        ComponentId(self.focused)
    }

    fn component(&self, id: ComponentId) -> &Component {
        self.components.get(id.0).expect("stale component id")
    }

    fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        self.components.get_mut(id.0).expect("stale component id")
    }

    fn calendar_mut(&mut self, id: ComponentId) -> &mut CalendarPane {
        match self.component_mut(id) {
            Component::Calendar(pane) => pane,
            _ => panic!("component {:?} is not the calendar", id),
        }
    }

    fn tasks_ref(&self, id: ComponentId) -> &TaskPane {
        match self.component(id) {
            Component::Tasks(pane) => pane,
            _ => panic!("component {:?} is not the task pane", id),
        }
    }

    fn tasks_mut(&mut self, id: ComponentId) -> &mut TaskPane {
        match self.component_mut(id) {
            Component::Tasks(pane) => pane,
            _ => panic!("component {:?} is not the task pane", id),
        }
    }

    fn dialog_ref(&self, id: ComponentId) -> &InputDialog {
        match self.component(id) {
            Component::Dialog(dialog) => dialog,
            _ => panic!("component {:?} is not a dialog", id),
        }
    }

    fn dialog_mut(&mut self, id: ComponentId) -> &mut InputDialog {
        match self.component_mut(id) {
            Component::Dialog(dialog) => dialog,
            _ => panic!("component {:?} is not a dialog", id),
        }
    }

    /// Route one key press. Returns true when the application should exit.
    /// Tab and quit are global, except while a dialog is modal on top.
    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        let focused = self.focused_id();
        let modal = matches!(self.component(focused), Component::Dialog(_));
        if !modal {
            match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Tab => {
                    self.cycle_focus();
                    return Ok(false);
                }
                _ => {}
            }
        }
        match self.component(focused) {
            Component::Calendar(_) => self.handle_calendar_key(focused, key)?,
            Component::Tasks(_) => self.handle_tasks_key(focused, key)?,
            Component::Dialog(_) => self.handle_dialog_key(focused, key)?,
        }
        Ok(false)
    }

    // --- calendar ---

    fn handle_calendar_key(&mut self, id: ComponentId, key: KeyEvent) -> Result<()> {
        let step = match key.code {
            KeyCode::Up | KeyCode::Char('k') => CalendarStep::WeekUp,
            KeyCode::Down | KeyCode::Char('j') => CalendarStep::WeekDown,
            KeyCode::Left | KeyCode::Char('h') => CalendarStep::PrevDay,
            KeyCode::Right | KeyCode::Char('l') => CalendarStep::NextDay,
            _ => return Ok(()),
        };
        let (moved, tasks, date) = {
            let calendar = self.calendar_mut(id);
            let moved = calendar.cursor.step(step);
            (moved, calendar.tasks, calendar.cursor.date())
        };
        if moved {
            debug!("day cursor moved to {}", date);
            self.reload_tasks(tasks)?;
            self.status = date.format("%A, %d %B %Y").to_string();
        }
        Ok(())
    }

    /// Replace the pane's list with whatever is on disk for the day its
    /// calendar currently selects.
    fn reload_tasks(&mut self, id: ComponentId) -> Result<()> {
        let date = self.date_for_tasks(id);
        let list = storage::load_day(&self.store.day_path(date))?;
        self.tasks_mut(id).list = list;
        Ok(())
    }

    fn date_for_tasks(&self, id: ComponentId) -> NaiveDate {
        let calendar = self.tasks_ref(id).calendar;
        match self.component(calendar) {
            Component::Calendar(pane) => pane.cursor.date(),
            _ => panic!("component {:?} is not the calendar", calendar),
        }
    }

    // --- task pane ---

    fn handle_tasks_key(&mut self, id: ComponentId, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.tasks_mut(id).list.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.tasks_mut(id).list.select_next(),
            KeyCode::Char(' ') | KeyCode::Enter => self.tasks_mut(id).list.toggle_active(),
            KeyCode::Char('r') => {
                self.tasks_mut(id).list.remove_active();
                self.status = "Removed task (press s to save)".into();
            }
            KeyCode::Char('c') => {
                self.push(Component::Dialog(InputDialog::new("New task", id)));
            }
            KeyCode::Char('s') => self.save_tasks(id)?,
            KeyCode::Char('t') => self.save_template(id)?,
            KeyCode::Char('p') => self.paste_template(id)?,
            _ => {}
        }
        Ok(())
    }

    fn save_tasks(&mut self, id: ComponentId) -> Result<()> {
        let date = self.date_for_tasks(id);
        let path = self.store.day_path(date);
        storage::save_day(&path, &self.tasks_ref(id).list)?;
        info!("saved {}", path.display());
        self.status = format!("Saved {}", date.format("%Y-%m-%d"));
        Ok(())
    }

    fn save_template(&mut self, id: ComponentId) -> Result<()> {
        let path = self.store.template_path();
        storage::save_day(&path, &self.tasks_ref(id).list)?;
        info!("saved template {}", path.display());
        self.status = "Saved template".into();
        Ok(())
    }

    /// Template paste is a three-step pass: load the template into memory,
    /// persist it as the selected day, then reload from that file, so the
    /// in-memory list mirrors the disk state exactly afterwards.
    fn paste_template(&mut self, id: ComponentId) -> Result<()> {
        let template = storage::load_day(&self.store.template_path())?;
        let date = self.date_for_tasks(id);
        self.tasks_mut(id).list = template;
        storage::save_day(&self.store.day_path(date), &self.tasks_ref(id).list)?;
        self.reload_tasks(id)?;
        info!("pasted template into {}", date);
        self.status = format!("Pasted template into {}", date.format("%Y-%m-%d"));
        Ok(())
    }

    // --- dialog ---

    fn handle_dialog_key(&mut self, id: ComponentId, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.close_dialog(id);
                self.status = "Canceled".into();
            }
            KeyCode::Enter => self.submit_dialog(id),
            KeyCode::Backspace => self.dialog_mut(id).backspace(),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    self.dialog_mut(id).insert_char(c);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Hand the buffer to the return-to pane and close. An empty buffer is
    /// rejected here, before the checklist's non-empty assertion.
    fn submit_dialog(&mut self, id: ComponentId) {
        let (text, return_to) = {
            let dialog = self.dialog_ref(id);
            (dialog.input.trim().to_string(), dialog.return_to)
        };
        if text.is_empty() {
            self.status = "Task text must not be empty".into();
            return;
        }
        self.close_dialog(id);
        debug!("dialog submitted: {:?}", text);
        self.tasks_mut(return_to).list.add(text);
        self.status = "Added task (press s to save)".into();
    }

    /// Pop the dialog and hand focus back to the component it was opened
    /// from, which is the new top of the stack.
    fn close_dialog(&mut self, id: ComponentId) {
        let return_to = self.dialog_ref(id).return_to;
        assert_eq!(
            id.0 + 1,
            self.components.len(),
            "only the top dialog can close"
        );
        self.pop();
        self.focused = return_to.0;
    }

    // --- rendering ---

    fn render_all(&self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(27), Constraint::Min(20)])
            .split(layout[1]);

        // Stack order is draw order: a dialog pushed above the panes
        // overlays them.
        for idx in 0..self.components.len() {
            let focused = idx == self.focused;
            match &self.components[idx] {
                Component::Calendar(pane) => draw_calendar(f, panes[0], pane, focused),
                Component::Tasks(pane) => {
                    let date = self.date_for_tasks(ComponentId(idx));
                    draw_tasks(f, panes[1], pane, date, focused);
                }
                Component::Dialog(dialog) => draw_dialog(f, dialog),
            }
        }

        self.draw_footer(f, layout[2]);
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let calendar = self.base_calendar();
        let title = Line::from(vec![
            Span::styled(
                "daylist ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                calendar.cursor.date().format("%B %Y").to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(self.store.scope_label(), Style::default().fg(Color::Green)),
            Span::raw("  •  "),
            Span::styled(
                self.store.root.display().to_string(),
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let detail = Paragraph::new(self.detail_line()).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray))
                .title("Selected"),
        );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let key_style = Style::default().fg(Color::LightCyan);
        match self.component(self.focused_id()) {
            Component::Calendar(_) => Line::from(vec![
                Span::styled("←↑↓→ / h j k l", key_style),
                Span::raw(" move day  "),
                Span::styled("Tab", key_style),
                Span::raw(" tasks  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]),
            Component::Tasks(_) => Line::from(vec![
                Span::styled("j k", key_style),
                Span::raw(" move  "),
                Span::styled("Space", key_style),
                Span::raw(" toggle  "),
                Span::styled("c", Style::default().fg(Color::LightMagenta)),
                Span::raw(" new  "),
                Span::styled("r", Style::default().fg(Color::LightRed)),
                Span::raw(" remove  "),
                Span::styled("s", Style::default().fg(Color::LightGreen)),
                Span::raw(" save  "),
                Span::styled("t", key_style),
                Span::raw(" template  "),
                Span::styled("p", key_style),
                Span::raw(" paste  "),
                Span::styled("Tab", key_style),
                Span::raw(" calendar  "),
                Span::styled("q", Style::default().fg(Color::LightRed)),
                Span::raw(" quit"),
            ]),
            Component::Dialog(_) => Line::from(vec![
                Span::styled("Enter", key_style),
                Span::raw(" add  "),
                Span::styled("Esc", Style::default().fg(Color::LightRed)),
                Span::raw(" cancel"),
            ]),
        }
    }

    fn detail_line(&self) -> Line<'static> {
        match self.base_tasks().list.active_task() {
            Some(task) => Line::from(vec![
                Span::styled(
                    if task.done { "[x] " } else { "[ ] " },
                    Style::default().fg(Color::Green),
                ),
                Span::styled(
                    task.text.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            None => Line::from("No task selected"),
        }
    }

    fn base_calendar(&self) -> &CalendarPane {
        self.components
            .iter()
            .find_map(|c| match c {
                Component::Calendar(pane) => Some(pane),
                _ => None,
            })
            .expect("calendar component is always present")
    }

    fn base_tasks(&self) -> &TaskPane {
        self.components
            .iter()
            .find_map(|c| match c {
                Component::Tasks(pane) => Some(pane),
                _ => None,
            })
            .expect("task pane component is always present")
    }
}

fn draw_calendar(f: &mut ratatui::Frame<'_>, area: Rect, pane: &CalendarPane, focused: bool) {
    let cursor = &pane.cursor;
    let days = cursor.days_in_month();
    let start = month_start_weekday(cursor.year(), cursor.month());

    let mut lines = Vec::new();
    let headings = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];
    let header: Vec<Span<'static>> = headings
        .iter()
        .map(|h| Span::styled(format!("{:<3}", h), Style::default().fg(Color::Gray)))
        .collect();
    lines.push(Line::from(header));

    let rows = ((start + days + 6) / 7) as usize;
    let mut grid: Vec<Vec<Span<'static>>> = vec![vec![Span::raw("   "); 7]; rows];
    for day in 1..=days {
        let (row, col) = grid_cell(day, start);
        let mut style = Style::default().fg(Color::Gray);
        let is_today = cursor.year() == pane.today.year()
            && cursor.month() == pane.today.month()
            && day == pane.today.day();
        if is_today {
            style = Style::default()
                .fg(Color::LightYellow)
                .add_modifier(Modifier::BOLD);
        }
        if day == cursor.day() {
            style = Style::default()
                .bg(if focused { Color::Cyan } else { Color::Blue })
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD);
        }
        grid[row as usize][col as usize] = Span::styled(format!("{:>2} ", day), style);
    }
    lines.extend(grid.into_iter().map(Line::from));

    let block = Block::default()
        .title(Span::styled(
            "Calendar",
            Style::default()
                .fg(if focused { Color::Cyan } else { Color::Gray })
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused {
            Color::Cyan
        } else {
            Color::DarkGray
        }));
    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    f.render_widget(paragraph, area);
}

fn draw_tasks(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    pane: &TaskPane,
    date: NaiveDate,
    focused: bool,
) {
    let items = if pane.list.is_empty() {
        vec![ListItem::new("(empty)")]
    } else {
        pane.list.tasks().iter().map(task_item).collect()
    };

    let mut state = ListState::default();
    if focused {
        state.select(pane.list.active_index());
    }

    let block = Block::default()
        .title(Span::styled(
            format!("Tasks {} ({})", date.format("%Y-%m-%d"), pane.list.len()),
            Style::default()
                .fg(if focused { Color::Cyan } else { Color::Gray })
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused {
            Color::Cyan
        } else {
            Color::DarkGray
        }));
    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::LightCyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );
    f.render_stateful_widget(list, area, &mut state);
}

fn task_item(task: &Task) -> ListItem<'static> {
    let marker = if task.done { "[x] " } else { "[ ] " };
    let text_style = if task.done {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default().fg(Color::White)
    };
    ListItem::new(Line::from(vec![
        Span::styled(marker, Style::default().fg(Color::Green)),
        Span::styled(task.text.clone(), text_style),
    ]))
}

fn draw_dialog(f: &mut ratatui::Frame<'_>, dialog: &InputDialog) {
    let area = centered_rect(60, 20, f.size());
    let body = vec![
        Line::from(Span::styled(
            format!("{}▌", dialog.input),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter to add • Esc to cancel",
            Style::default().fg(Color::Gray),
        )),
    ];
    let paragraph = Paragraph::new(body)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(Span::styled(
                    dialog.title.clone(),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        );
    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}
