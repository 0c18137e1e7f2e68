use chrono::{Datelike, NaiveDate};

/// One checklist entry. Tasks have no identity beyond their position in the
/// list; display order and file order are the same thing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub text: String,
    pub done: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum ParseLineError {
    #[error("line {0}: missing status separator")]
    MissingSeparator(usize),
    #[error("line {0}: empty task text")]
    EmptyText(usize),
}

impl Task {
    /// A fresh, not-yet-done task. Empty text and embedded newlines are
    /// caller bugs, not runtime conditions.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        assert!(!text.is_empty(), "task text must not be empty");
        assert!(!text.contains('\n'), "task text must not contain a newline");
        Task { text, done: false }
    }

    /// Parse one day-file record, `"<0|1> <text>"`. The line is split at the
    /// first space only, so task text may itself contain spaces; the status
    /// is done exactly when the token is `"1"`.
    pub fn parse_line(line: &str, number: usize) -> Result<Self, ParseLineError> {
        let (status, text) = line
            .split_once(' ')
            .ok_or(ParseLineError::MissingSeparator(number))?;
        if text.is_empty() {
            return Err(ParseLineError::EmptyText(number));
        }
        Ok(Task {
            text: text.to_string(),
            done: status == "1",
        })
    }

    pub fn to_line(&self) -> String {
        format!("{} {}", if self.done { 1 } else { 0 }, self.text)
    }
}

/// An ordered list of tasks with a cursor over them. The cursor is only
/// meaningful while the list is non-empty and always stays inside `0..len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checklist {
    tasks: Vec<Task>,
    active: usize,
}

impl Checklist {
    pub fn new() -> Self {
        Checklist::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Checklist { tasks, active: 0 }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        if self.tasks.is_empty() {
            None
        } else {
            Some(self.active)
        }
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.active_index().map(|idx| &self.tasks[idx])
    }

    /// Append a new not-done task. Empty text is rejected at the dialog;
    /// reaching this with an empty string is a caller bug.
    pub fn add(&mut self, text: impl Into<String>) {
        self.tasks.push(Task::new(text));
    }

    /// Remove the task under the cursor; the tail shifts down one position
    /// and the cursor moves up one unless it is already at the top.
    pub fn remove_active(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        self.tasks.remove(self.active);
        self.active = self.active.saturating_sub(1);
    }

    pub fn toggle_active(&mut self) {
        if let Some(idx) = self.active_index() {
            self.tasks[idx].done = !self.tasks[idx].done;
        }
    }

    pub fn select_prev(&mut self) {
        if self.active > 0 {
            self.active -= 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.active + 1 < self.tasks.len() {
            self.active += 1;
        }
    }
}

/// One clamped movement of the calendar day cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarStep {
    PrevDay,
    NextDay,
    WeekUp,
    WeekDown,
}

/// The calendar's navigable position: a fixed cursor month and a selected
/// day inside it. Navigation moves the day only and clamps at the month's
/// edges rather than wrapping into a neighbouring month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCursor {
    year: i32,
    month: u32,
    day: u32,
}

impl DayCursor {
    pub fn at(date: NaiveDate) -> Self {
        DayCursor {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .expect("cursor day stays within its month")
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    /// Apply one movement. Returns whether the selected day changed; a
    /// movement that would leave `1..=days_in_month` is a no-op.
    pub fn step(&mut self, step: CalendarStep) -> bool {
        let days = self.days_in_month();
        let next = match step {
            CalendarStep::PrevDay => self.day.checked_sub(1),
            CalendarStep::NextDay => Some(self.day + 1),
            CalendarStep::WeekUp => self.day.checked_sub(7),
            CalendarStep::WeekDown => Some(self.day + 7),
        };
        match next {
            Some(day) if (1..=days).contains(&day) => {
                self.day = day;
                true
            }
            _ => false,
        }
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first =
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| panic!("invalid month {month}"));
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("first day of the following month");
    next.signed_duration_since(first).num_days() as u32
}

/// Weekday index of the first day of the month, Monday-based (0 = Monday).
pub fn month_start_weekday(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or_else(|| panic!("invalid month {month}"))
        .weekday()
        .num_days_from_monday()
}

/// Grid cell of a day in a Monday-first month grid: `(row, column)`.
pub fn grid_cell(day: u32, start_weekday: u32) -> (u32, u32) {
    let cell = start_weekday + day - 1;
    (cell / 7, cell % 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn days_in_month_matches_gregorian_table() {
        let lengths = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (idx, expected) in lengths.iter().enumerate() {
            assert_eq!(days_in_month(2023, idx as u32 + 1), *expected);
        }
    }

    #[test]
    fn february_follows_the_leap_year_rule() {
        assert_eq!(days_in_month(2000, 2), 29); // divisible by 400
        assert_eq!(days_in_month(1900, 2), 28); // century, not by 400
        assert_eq!(days_in_month(2024, 2), 29); // plain leap year
        assert_eq!(days_in_month(2023, 2), 28); // common year
    }

    #[test]
    fn month_grid_is_monday_first() {
        // 2024-04-01 is a Monday, 2024-09-01 a Sunday.
        assert_eq!(month_start_weekday(2024, 4), 0);
        assert_eq!(month_start_weekday(2024, 9), 6);
        assert_eq!(grid_cell(1, 0), (0, 0));
        assert_eq!(grid_cell(1, 6), (0, 6));
        assert_eq!(grid_cell(2, 6), (1, 0));
        assert_eq!(grid_cell(8, 0), (1, 0));
    }

    #[test]
    fn cursor_clamps_at_month_edges() {
        let mut cursor = DayCursor::at(date(2024, 2, 1));
        assert!(!cursor.step(CalendarStep::PrevDay));
        assert_eq!(cursor.day(), 1);
        assert!(!cursor.step(CalendarStep::WeekUp));
        assert_eq!(cursor.day(), 1);

        let mut cursor = DayCursor::at(date(2024, 2, 29));
        assert!(!cursor.step(CalendarStep::NextDay));
        assert_eq!(cursor.day(), 29);
        assert!(!cursor.step(CalendarStep::WeekDown));
        assert_eq!(cursor.day(), 29);
    }

    #[test]
    fn cursor_moves_by_day_and_week() {
        let mut cursor = DayCursor::at(date(2024, 2, 15));
        assert!(cursor.step(CalendarStep::NextDay));
        assert_eq!(cursor.day(), 16);
        assert!(cursor.step(CalendarStep::PrevDay));
        assert_eq!(cursor.day(), 15);
        assert!(cursor.step(CalendarStep::WeekUp));
        assert_eq!(cursor.day(), 8);
        assert!(cursor.step(CalendarStep::WeekDown));
        assert_eq!(cursor.day(), 15);
        assert_eq!(cursor.date(), date(2024, 2, 15));
    }

    #[test]
    fn cursor_never_leaves_the_month() {
        let mut cursor = DayCursor::at(date(2023, 2, 26));
        for _ in 0..10 {
            cursor.step(CalendarStep::WeekDown);
            cursor.step(CalendarStep::NextDay);
        }
        assert_eq!(cursor.day(), 28);
        for _ in 0..10 {
            cursor.step(CalendarStep::WeekUp);
            cursor.step(CalendarStep::PrevDay);
        }
        assert_eq!(cursor.day(), 1);
    }

    #[test]
    fn line_round_trip_preserves_text_and_status() {
        let task = Task {
            text: "buy milk and eggs".into(),
            done: true,
        };
        let line = task.to_line();
        assert_eq!(line, "1 buy milk and eggs");
        assert_eq!(Task::parse_line(&line, 1).unwrap(), task);
    }

    #[test]
    fn parse_splits_at_the_first_space_only() {
        let task = Task::parse_line("0 call mom at 5", 1).unwrap();
        assert!(!task.done);
        assert_eq!(task.text, "call mom at 5");
        // Anything but exactly "1" is not done.
        assert!(!Task::parse_line("2 stray status", 1).unwrap().done);
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert!(matches!(
            Task::parse_line("nospace", 3),
            Err(ParseLineError::MissingSeparator(3))
        ));
        assert!(matches!(
            Task::parse_line("0 ", 7),
            Err(ParseLineError::EmptyText(7))
        ));
    }

    #[test]
    #[should_panic(expected = "task text must not be empty")]
    fn adding_empty_text_is_a_caller_bug() {
        Checklist::new().add("");
    }

    #[test]
    fn remove_active_shifts_and_reselects() {
        let mut list = Checklist::from_tasks(vec![
            Task::new("one"),
            Task::new("two"),
            Task::new("three"),
        ]);
        list.select_next();
        assert_eq!(list.active_index(), Some(1));

        list.remove_active();
        let texts: Vec<&str> = list.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["one", "three"]);
        assert_eq!(list.active_index(), Some(0));

        list.remove_active();
        assert_eq!(list.active_index(), Some(0));
        list.remove_active();
        assert_eq!(list.active_index(), None);
        list.remove_active();
        assert!(list.is_empty());
    }

    #[test]
    fn toggle_flips_only_the_active_task() {
        let mut list = Checklist::from_tasks(vec![Task::new("a"), Task::new("b")]);
        list.toggle_active();
        assert!(list.tasks()[0].done);
        assert!(!list.tasks()[1].done);
        list.toggle_active();
        assert!(!list.tasks()[0].done);

        let mut empty = Checklist::new();
        empty.toggle_active();
        assert!(empty.is_empty());
    }

    #[test]
    fn selection_clamps_to_the_list() {
        let mut list = Checklist::from_tasks(vec![Task::new("a"), Task::new("b")]);
        list.select_prev();
        assert_eq!(list.active_index(), Some(0));
        list.select_next();
        list.select_next();
        assert_eq!(list.active_index(), Some(1));
    }
}
