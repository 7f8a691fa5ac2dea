//! The row store: all project state, changed only through [`Action`]s.
//!
//! [`AppState::apply`] is a pure transition. The state clones cheaply
//! because the row map and column layout sit behind `Arc`s that the undo
//! frames share.

mod edits;
mod rows;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::EngineSettings;
use crate::model::{
    ColorInfo, Column, EventData, Frame, ProjectData, Row, RowKind, RowMap, UndoHistory,
};
use crate::schedule::resolver::resolve_in_place;
use crate::schedule::{build_dependency_map, Calendar, DependencyMap};
use crate::snapshot::SnapshotHistory;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// The single message slot shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInfo {
    pub message: String,
    pub severity: Severity,
}

impl MessageInfo {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Every change the store accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Cell edits
    SetDisplayName { id: String, name: String },
    SetColor { id: String, alias: String },
    SetPlannedStart { id: String, date: Option<NaiveDate> },
    SetPlannedEnd { id: String, date: Option<NaiveDate> },
    /// Both ends at once, as when a bar is dragged.
    SetPlannedDates { id: String, start: NaiveDate, end: NaiveDate },
    SetPlannedDays { id: String, days: Option<i64> },
    SetActualDates {
        id: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    SetProgress { id: String, progress: String },
    /// `column` is 1, 2 or 3.
    SetTextColumn { id: String, column: u8, text: String },
    SetIncludeHolidays { id: String, include: bool },
    /// Rule text as typed, e.g. `after,-1,2`.
    SetDependency { id: String, rule: String },
    SetEvents { id: String, events: Vec<EventData> },

    // Structure
    AddRows { kind: RowKind, at: usize, count: usize },
    InsertCopiedRows { at: usize, rows: Vec<Row> },
    DeleteRows { ids: Vec<String> },
    /// Move the rows to sit before the row currently at index `to`.
    MoveRows { ids: Vec<String>, to: usize },
    ConvertDisplayNameOnlyRowsToSeparator { ids: Vec<String> },
    ChangeLevel { ids: Vec<String>, delta: i8 },
    ToggleCollapse { id: String },
    SetAllCollapsed(bool),
    CreateTaskChain { ids: Vec<String> },

    // Calendar
    SetHolidays(Vec<NaiveDate>),
    SetRegularDaysOff(Vec<u32>),

    // Layout and side data
    SetColumns(Vec<Column>),
    SetColors(Vec<ColorInfo>),
    SetColorAlias { index: usize, alias: String },
    SetNotes(serde_json::Value),
    SetTitle(String),

    // History
    Undo,
    Redo,
    PushPastState,
    RemovePastState(usize),
    ImportProject(Box<ProjectData>),

    // Snapshots
    CreateSnapshot { message: String },
    StartViewingPast { id: String },
    ReturnToPresent,
    DeleteSnapshot { id: String },
    RestoreSnapshot { id: String },

    ClearMessage,
}

impl Action {
    fn allowed_while_viewing(&self) -> bool {
        matches!(
            self,
            Action::CreateSnapshot { .. }
                | Action::StartViewingPast { .. }
                | Action::ReturnToPresent
                | Action::DeleteSnapshot { .. }
                | Action::RestoreSnapshot { .. }
                | Action::ClearMessage
        )
    }
}

/// Project state plus undo history, snapshots and the message slot.
#[derive(Debug, Clone)]
pub struct AppState {
    title: String,
    data: Arc<RowMap>,
    columns: Arc<Vec<Column>>,
    calendar: Calendar,
    colors: Vec<ColorInfo>,
    notes: serde_json::Value,
    dependency_map: DependencyMap,
    history: UndoHistory,
    snapshots: SnapshotHistory,
    message_info: Option<MessageInfo>,
    is_saved: bool,
    settings: EngineSettings,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

/// Free-function form of [`AppState::apply`].
pub fn reduce(state: &AppState, action: Action) -> AppState {
    state.apply(action)
}

impl AppState {
    /// An empty project using the configured days off.
    pub fn new(settings: EngineSettings) -> Self {
        let project = ProjectData {
            calendar: Calendar::new([], settings.default_regular_days_off.iter().copied()),
            ..Default::default()
        };
        Self::from_project(project, settings)
    }

    /// Load `project`: renumber rows, resolve dependencies and start a fresh
    /// undo history.
    pub fn from_project(project: ProjectData, settings: EngineSettings) -> Self {
        let data = Arc::new(RowMap::new());
        let columns = Arc::new(Vec::new());
        let history = UndoHistory::with_limit(
            Frame::new(Arc::clone(&data), Arc::clone(&columns)),
            settings.max_undo_frames,
        );
        let mut state = Self {
            title: String::new(),
            data,
            columns,
            calendar: Calendar::default(),
            colors: Vec::new(),
            notes: serde_json::Value::Null,
            dependency_map: DependencyMap::new(),
            history,
            snapshots: SnapshotHistory::new(settings.max_snapshots),
            message_info: None,
            is_saved: true,
            settings,
        };
        state.install(project);
        state.history.reset(state.frame());
        state
    }

    /// Apply `action`, returning the next state.
    ///
    /// Failures never escape: the returned state is this one, unchanged
    /// except for an explanatory message.
    pub fn apply(&self, action: Action) -> AppState {
        match self.try_apply(action) {
            Ok(next) => next,
            Err(e) => {
                let mut unchanged = self.clone();
                unchanged.report(&e);
                unchanged
            }
        }
    }

    /// Like [`AppState::apply`] but hands the error back.
    pub fn try_apply(&self, action: Action) -> Result<AppState> {
        let mut next = self.clone();
        next.dispatch(action)?;
        Ok(next)
    }

    fn dispatch(&mut self, action: Action) -> Result<()> {
        if self.snapshots.is_viewing_past() && !action.allowed_while_viewing() {
            return Err(Error::ViewingPast);
        }

        match action {
            Action::SetDisplayName { id, name } => self.set_display_name(&id, name),
            Action::SetColor { id, alias } => self.set_color(&id, alias),
            Action::SetPlannedStart { id, date } => self.set_planned_start(&id, date),
            Action::SetPlannedEnd { id, date } => self.set_planned_end(&id, date),
            Action::SetPlannedDates { id, start, end } => self.set_planned_dates(&id, start, end),
            Action::SetPlannedDays { id, days } => self.set_planned_days(&id, days),
            Action::SetActualDates { id, start, end } => self.set_actual_dates(&id, start, end),
            Action::SetProgress { id, progress } => self.set_progress(&id, progress),
            Action::SetTextColumn { id, column, text } => self.set_text_column(&id, column, text),
            Action::SetIncludeHolidays { id, include } => self.set_include_holidays(&id, include),
            Action::SetDependency { id, rule } => self.set_dependency(&id, &rule),
            Action::SetEvents { id, events } => self.set_events(&id, events),

            Action::AddRows { kind, at, count } => self.add_rows(kind, at, count),
            Action::InsertCopiedRows { at, rows } => self.insert_copied_rows(at, rows),
            Action::DeleteRows { ids } => self.delete_rows(&ids),
            Action::MoveRows { ids, to } => self.move_rows(&ids, to),
            Action::ConvertDisplayNameOnlyRowsToSeparator { ids } => {
                self.convert_display_name_only_rows(&ids)
            }
            Action::ChangeLevel { ids, delta } => self.change_level(&ids, delta),
            Action::ToggleCollapse { id } => self.toggle_collapse(&id),
            Action::SetAllCollapsed(collapsed) => self.set_all_collapsed(collapsed),
            Action::CreateTaskChain { ids } => self.create_task_chain(&ids),

            Action::SetHolidays(holidays) => {
                let calendar = Calendar::new(holidays, self.calendar.regular_days_off.clone());
                self.set_calendar(calendar)
            }
            Action::SetRegularDaysOff(days) => {
                let calendar = Calendar::new(self.calendar.holidays.clone(), days);
                self.set_calendar(calendar)
            }

            Action::SetColumns(columns) => {
                self.commit_parts(None, Some(columns));
                Ok(())
            }
            Action::SetColors(colors) => self.set_colors(colors),
            Action::SetColorAlias { index, alias } => self.set_color_alias(index, alias),
            Action::SetNotes(notes) => {
                self.notes = notes;
                self.is_saved = false;
                Ok(())
            }
            Action::SetTitle(title) => {
                self.title = title;
                self.is_saved = false;
                Ok(())
            }

            Action::Undo => {
                if let Some(frame) = self.history.undo(self.frame()) {
                    self.restore(frame);
                }
                Ok(())
            }
            Action::Redo => {
                if let Some(frame) = self.history.redo(self.frame()) {
                    self.restore(frame);
                }
                Ok(())
            }
            Action::PushPastState => {
                self.history.record(self.frame());
                Ok(())
            }
            Action::RemovePastState(n) => {
                self.history.remove_recent(n);
                Ok(())
            }
            Action::ImportProject(project) => {
                self.install(*project);
                self.history.reset(self.frame());
                self.is_saved = true;
                self.message_info = Some(MessageInfo::new("Project imported", Severity::Success));
                Ok(())
            }

            Action::CreateSnapshot { message } => {
                let project = self.project();
                self.snapshots.create_snapshot(&message, &project)?;
                self.message_info = Some(MessageInfo::new("Snapshot saved", Severity::Success));
                Ok(())
            }
            Action::StartViewingPast { id } => {
                let live = self.project();
                self.snapshots.start_viewing_past(&id, &live)
            }
            Action::ReturnToPresent => self.return_to_present(),
            Action::DeleteSnapshot { id } => {
                if self.snapshots.is_viewing(&id) {
                    self.return_to_present()?;
                }
                if !self.snapshots.delete_snapshot(&id) {
                    return Err(Error::SnapshotNotFound(id));
                }
                Ok(())
            }
            Action::RestoreSnapshot { id } => self.restore_snapshot(&id),

            Action::ClearMessage => {
                self.message_info = None;
                Ok(())
            }
        }
    }

    fn report(&mut self, err: &Error) {
        let severity = match err {
            Error::ViewingPast => Severity::Warning,
            e if e.is_user_facing() => Severity::Error,
            e => {
                tracing::error!("action abandoned: {}", e);
                Severity::Error
            }
        };
        self.message_info = Some(MessageInfo::new(err.to_string(), severity));
    }

    // -- reads -------------------------------------------------------------

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Live rows, ignoring any snapshot preview.
    pub fn data(&self) -> &RowMap {
        &self.data
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn colors(&self) -> &[ColorInfo] {
        &self.colors
    }

    pub fn notes(&self) -> &serde_json::Value {
        &self.notes
    }

    pub fn dependency_map(&self) -> &DependencyMap {
        &self.dependency_map
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn snapshots(&self) -> &SnapshotHistory {
        &self.snapshots
    }

    pub fn message_info(&self) -> Option<&MessageInfo> {
        self.message_info.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.is_saved
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// The live project, as it would be saved.
    pub fn project(&self) -> ProjectData {
        ProjectData {
            title: self.title.clone(),
            data: (*self.data).clone(),
            columns: (*self.columns).clone(),
            calendar: self.calendar.clone(),
            colors: self.colors.clone(),
            notes: self.notes.clone(),
        }
    }

    /// What should be displayed: the snapshot preview when one is open,
    /// otherwise the live project.
    pub fn project_view(&self) -> ProjectData {
        match self.snapshots.preview() {
            Some(preview) => preview.data.clone(),
            None => self.project(),
        }
    }

    /// Rows to display, preferring the snapshot preview.
    pub fn view_data(&self) -> &RowMap {
        match self.snapshots.preview() {
            Some(preview) => &preview.data.data,
            None => &self.data,
        }
    }

    /// Clones of the given rows in display order, for the clipboard.
    pub fn copy_rows(&self, ids: &[String]) -> Vec<Row> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.data
            .iter()
            .filter(|row| wanted.contains(row.id()))
            .cloned()
            .collect()
    }

    // -- commit plumbing ---------------------------------------------------

    fn frame(&self) -> Frame {
        Frame::new(Arc::clone(&self.data), Arc::clone(&self.columns))
    }

    fn working_copy(&self) -> RowMap {
        (*self.data).clone()
    }

    fn commit(&mut self, data: RowMap) {
        self.commit_parts(Some(data), None);
    }

    /// Record the current frame, then install the new parts.
    fn commit_parts(&mut self, data: Option<RowMap>, columns: Option<Vec<Column>>) {
        self.history.record(self.frame());
        if let Some(data) = data {
            self.dependency_map = build_dependency_map(&data);
            self.data = Arc::new(data);
        }
        if let Some(columns) = columns {
            self.columns = Arc::new(columns);
        }
        self.is_saved = false;
    }

    fn restore(&mut self, frame: Frame) {
        self.dependency_map = build_dependency_map(&frame.data);
        self.data = frame.data;
        self.columns = frame.columns;
        self.is_saved = false;
    }

    /// Replace every piece of project state without touching undo history.
    fn install(&mut self, project: ProjectData) {
        let ProjectData {
            title,
            mut data,
            columns,
            calendar,
            colors,
            notes,
        } = project;
        data.assign_ids();
        self.dependency_map = resolve_in_place(&mut data, &calendar, &[]);
        self.title = title;
        self.data = Arc::new(data);
        self.columns = Arc::new(columns);
        self.calendar = calendar;
        self.colors = colors;
        self.notes = notes;
    }

    fn ensure_room(&self, additional: usize) -> Result<()> {
        let limit = self.settings.max_rows;
        if self.data.len() + additional >= limit {
            return Err(Error::RowLimitExceeded { limit });
        }
        Ok(())
    }

    fn check_length(text: &str, field: &'static str, limit: usize) -> Result<()> {
        if text.chars().count() > limit {
            return Err(Error::TextTooLong { field, limit });
        }
        Ok(())
    }

    // -- snapshots ---------------------------------------------------------

    fn return_to_present(&mut self) -> Result<()> {
        if let Some(live) = self.snapshots.return_to_present()? {
            self.install(live);
        }
        Ok(())
    }

    /// Bring a snapshot back as a new, undoable state.
    fn restore_snapshot(&mut self, id: &str) -> Result<()> {
        let project = self
            .snapshots
            .get(id)
            .ok_or_else(|| Error::SnapshotNotFound(id.to_string()))?
            .project()?;
        if self.snapshots.is_viewing_past() {
            self.return_to_present()?;
        }

        let ProjectData {
            title,
            mut data,
            columns,
            calendar,
            colors,
            notes,
        } = project;
        data.assign_ids();
        resolve_in_place(&mut data, &calendar, &[]);
        self.commit_parts(Some(data), Some(columns));
        self.title = title;
        self.calendar = calendar;
        self.colors = colors;
        self.notes = notes;
        self.message_info = Some(MessageInfo::new("Snapshot restored", Severity::Success));
        Ok(())
    }
}
