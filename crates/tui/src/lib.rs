use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use querydeck_adapters::export::{export_table, ExportFormat};
use querydeck_adapters::http::HttpBackendError;
use querydeck_adapters::pipeline_from_config;
use querydeck_core::config::AppConfig;
use querydeck_core::connection_registry::{ConnectionRegistry, UnknownDatastoreKind};
use querydeck_core::history::{EntryStatus, HistoryEntry, HistoryLog, SubmissionId};
use querydeck_core::journal::{FileHistoryJournal, JournalError, JournalRecord};
use querydeck_core::query_pipeline::{
    ConsoleState, PendingSubmission, PipelineError, QueryBackend, QueryPipeline,
    DEFAULT_EDITOR_TEXT,
};
use querydeck_core::schema_draft::SchemaDraft;
use querydeck_core::table::display_cell;
use querydeck_core::workflow::{AppView, ScheduledTransition};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::{Frame, Terminal};
use serde_json::Value;
use thiserror::Error;

const TICK_RATE: Duration = Duration::from_millis(120);
const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("query backend unavailable: {0}")]
    Backend(#[from] HttpBackendError),
    #[error("history journal unavailable: {0}")]
    Journal(#[from] JournalError),
    #[error("configured connection rejected: {0}")]
    Connections(#[from] UnknownDatastoreKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectField {
    Kind,
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditorFocus {
    Query,
    History,
    Table,
}

impl EditorFocus {
    fn next(self) -> Self {
        match self {
            Self::Query => Self::History,
            Self::History => Self::Table,
            Self::Table => Self::Query,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::History => "history",
            Self::Table => "table",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Navigation,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    Submit,
    Input(char),
    Newline,
    Backspace,
    NextFocus,
    Navigate(DirectionKey),
    AddConnection,
    RemoveConnection,
    ResetDraft,
    CycleDatastore,
    Export(ExportFormat),
    Tick,
}

#[derive(Debug)]
struct Completion {
    id: SubmissionId,
    result: Result<Value, PipelineError>,
}

#[derive(Debug)]
struct TuiApp {
    view: AppView,
    registry: ConnectionRegistry,
    connection_cursor: usize,
    connect_field: ConnectField,
    schema: SchemaDraft,
    schema_error: Option<String>,
    editor_text: String,
    editor_focus: EditorFocus,
    console: ConsoleState,
    history_cursor: usize,
    table_cursor: usize,
    active_datastore: usize,
    transition: Option<ScheduledTransition>,
    transition_delay: Duration,
    outbox: Vec<PendingSubmission>,
    journal: Option<FileHistoryJournal>,
    export_dir: PathBuf,
    spinner: usize,
    show_help: bool,
    should_quit: bool,
    status_line: String,
}

impl TuiApp {
    fn new(config: &AppConfig) -> Result<Self, UnknownDatastoreKind> {
        let registry = ConnectionRegistry::from_seeds(&config.connections)?;
        Ok(Self {
            view: AppView::Landing,
            registry,
            connection_cursor: 0,
            connect_field: ConnectField::Value,
            schema: SchemaDraft::default(),
            schema_error: None,
            editor_text: DEFAULT_EDITOR_TEXT.to_string(),
            editor_focus: EditorFocus::Query,
            console: ConsoleState::new(config.history_capacity),
            history_cursor: 0,
            table_cursor: 0,
            active_datastore: 0,
            transition: None,
            transition_delay: config.transition_delay(),
            outbox: Vec::new(),
            journal: None,
            export_dir: PathBuf::from("."),
            spinner: 0,
            show_help: false,
            should_quit: false,
            status_line: "Press Enter to get started".to_string(),
        })
    }

    fn input_mode(&self) -> InputMode {
        match self.view {
            AppView::Landing => InputMode::Navigation,
            AppView::Connect => {
                if self.connect_field == ConnectField::Value && !self.registry.is_empty() {
                    InputMode::Text
                } else {
                    InputMode::Navigation
                }
            }
            AppView::Schema => InputMode::Text,
            AppView::Editor => {
                if self.editor_focus == EditorFocus::Query {
                    InputMode::Text
                } else {
                    InputMode::Navigation
                }
            }
        }
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => self.show_help = !self.show_help,
            Msg::Tick => self.on_tick(Instant::now()),
            _ if self.transition.is_some() => {
                self.status_line = "Please wait...".to_string();
            }
            Msg::Submit => self.submit(),
            Msg::Input(ch) => self.insert_char(ch),
            Msg::Newline => self.insert_char('\n'),
            Msg::Backspace => self.backspace(),
            Msg::NextFocus => self.next_focus(),
            Msg::Navigate(direction) => self.navigate(direction),
            Msg::AddConnection => self.add_connection(),
            Msg::RemoveConnection => self.remove_connection(),
            Msg::ResetDraft => self.reset_draft(),
            Msg::CycleDatastore => self.cycle_datastore(),
            Msg::Export(format) => self.export(format),
        }
    }

    fn on_tick(&mut self, now: Instant) {
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();

        if let Some(target) = self.transition.and_then(|scheduled| scheduled.poll(now)) {
            self.transition = None;
            self.view = target;
            self.status_line = format!("Now in {}", target.title());
        }
    }

    fn submit(&mut self) {
        match self.view {
            AppView::Landing => {
                self.view = AppView::Connect;
                self.status_line = "Ctrl+N adds a connection".to_string();
            }
            AppView::Connect => match self.registry.submit(self.transition_delay) {
                Ok(transition) => {
                    self.transition = Some(transition.schedule(Instant::now()));
                    self.status_line = "Connecting...".to_string();
                }
                Err(error) => self.status_line = error.to_string(),
            },
            AppView::Schema => {
                self.schema_error = None;
                match self.schema.submit(self.transition_delay) {
                    Ok(transition) => {
                        self.transition = Some(transition.schedule(Instant::now()));
                        self.status_line = "Applying schema...".to_string();
                    }
                    Err(error) => {
                        let (line, column) = error.location();
                        tracing::info!(line, column, "schema draft rejected");
                        self.status_line = format!("{error} (line {line}, column {column})");
                        self.schema_error = Some(error.to_string());
                    }
                }
            }
            AppView::Editor => self.run_query(),
        }
    }

    fn run_query(&mut self) {
        if self.editor_text.trim().is_empty() {
            self.status_line = "Write a query first".to_string();
            return;
        }
        let pending = self.console.begin_submission(self.editor_text.clone());
        self.history_cursor = self.console.history.len().saturating_sub(1);
        self.status_line = format!("Running query {}...", pending.id);
        self.outbox.push(pending);
    }

    fn complete(&mut self, completion: &Completion) {
        let outcome = self
            .console
            .complete_submission(completion.id, &completion.result);
        if self.console.take_scroll_request() {
            self.history_cursor = self.console.history.len().saturating_sub(1);
        }
        if outcome.table_updated {
            self.table_cursor = 0;
        }

        self.status_line = match outcome.status {
            EntryStatus::Error => format!("Query {} failed", outcome.id),
            _ if outcome.table_updated => format!(
                "Query {} returned {} rows",
                outcome.id,
                self.console.table.as_ref().map_or(0, |table| table.row_count())
            ),
            _ => format!("Query {} completed", outcome.id),
        };

        if let (Some(journal), Some(entry)) = (&self.journal, self.console.history.get(outcome.id)) {
            if let Err(error) = journal.append(&JournalRecord::from_entry(entry)) {
                tracing::warn!(%error, "failed to journal history entry");
            }
        }
    }

    fn insert_char(&mut self, ch: char) {
        match self.view {
            AppView::Connect => {
                if ch == '\n' {
                    self.submit();
                    return;
                }
                if let Some(id) = self.selected_connection_id() {
                    let mut value = self
                        .registry
                        .descriptor(id)
                        .map(|descriptor| descriptor.value.clone())
                        .unwrap_or_default();
                    value.push(ch);
                    self.registry.update(id, value);
                }
            }
            AppView::Schema => self.schema.text_mut().push(ch),
            AppView::Editor => self.editor_text.push(ch),
            AppView::Landing => {}
        }
    }

    fn backspace(&mut self) {
        match self.view {
            AppView::Connect => {
                if let Some(id) = self.selected_connection_id() {
                    let mut value = self
                        .registry
                        .descriptor(id)
                        .map(|descriptor| descriptor.value.clone())
                        .unwrap_or_default();
                    value.pop();
                    self.registry.update(id, value);
                }
            }
            AppView::Schema => {
                self.schema.text_mut().pop();
            }
            AppView::Editor => {
                self.editor_text.pop();
            }
            AppView::Landing => {}
        }
    }

    fn next_focus(&mut self) {
        match self.view {
            AppView::Connect => {
                self.connect_field = match self.connect_field {
                    ConnectField::Kind => ConnectField::Value,
                    ConnectField::Value => ConnectField::Kind,
                };
            }
            AppView::Editor => {
                self.editor_focus = self.editor_focus.next();
                self.status_line = format!("Focus: {}", self.editor_focus.label());
            }
            AppView::Landing | AppView::Schema => {}
        }
    }

    fn navigate(&mut self, direction: DirectionKey) {
        match self.view {
            AppView::Connect => self.navigate_connections(direction),
            AppView::Editor => match self.editor_focus {
                EditorFocus::History => {
                    self.history_cursor =
                        step_cursor(self.history_cursor, self.console.history.len(), direction);
                }
                EditorFocus::Table => {
                    let rows = self.console.table.as_ref().map_or(0, |table| table.row_count());
                    self.table_cursor = step_cursor(self.table_cursor, rows, direction);
                }
                EditorFocus::Query => {}
            },
            AppView::Landing | AppView::Schema => {}
        }
    }

    fn navigate_connections(&mut self, direction: DirectionKey) {
        let Some(id) = self.selected_connection_id() else {
            return;
        };
        match (self.connect_field, direction) {
            (ConnectField::Kind, DirectionKey::Left | DirectionKey::Right) => {
                if let Some(kind) = self.registry.descriptor(id).map(|descriptor| descriptor.kind) {
                    self.registry.set_kind(id, kind.next());
                }
            }
            (_, DirectionKey::Up | DirectionKey::Down) => {
                self.connection_cursor =
                    step_cursor(self.connection_cursor, self.registry.len(), direction);
            }
            (ConnectField::Value, _) => {}
        }
    }

    fn selected_connection_id(&self) -> Option<u64> {
        self.registry
            .descriptors()
            .get(self.connection_cursor)
            .map(|descriptor| descriptor.id)
    }

    fn add_connection(&mut self) {
        if self.view != AppView::Connect {
            return;
        }
        let id = self.registry.add();
        self.connection_cursor = self.registry.len() - 1;
        self.connect_field = ConnectField::Value;
        self.status_line = format!("Added connection {id}");
    }

    fn remove_connection(&mut self) {
        if self.view != AppView::Connect {
            return;
        }
        let Some(id) = self.selected_connection_id() else {
            return;
        };
        if self.registry.remove(id) {
            self.connection_cursor = self
                .connection_cursor
                .min(self.registry.len().saturating_sub(1));
            self.active_datastore = 0;
            self.status_line = format!("Removed connection {id}");
        }
    }

    fn reset_draft(&mut self) {
        if self.view == AppView::Schema {
            self.schema = SchemaDraft::default();
            self.schema_error = None;
            self.status_line = "Schema reset to template".to_string();
        }
    }

    fn cycle_datastore(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        self.active_datastore = (self.active_datastore + 1) % self.registry.len();
        self.status_line = format!("Datastore: {}", self.active_datastore_label());
    }

    fn active_datastore_label(&self) -> String {
        self.registry
            .descriptors()
            .get(self.active_datastore)
            .map_or_else(
                || "none".to_string(),
                |descriptor| {
                    if descriptor.value.is_empty() {
                        format!("{} #{}", descriptor.kind, descriptor.id)
                    } else {
                        format!("{} {}", descriptor.kind, descriptor.value)
                    }
                },
            )
    }

    fn export(&mut self, format: ExportFormat) {
        let Some(table) = &self.console.table else {
            self.status_line = "No table to export".to_string();
            return;
        };
        let path = self
            .export_dir
            .join(format!("querydeck-results.{}", format.extension()));
        self.status_line = match export_table(&path, table, format) {
            Ok(rows) => format!("Exported {rows} rows to {}", path.display()),
            Err(error) => {
                tracing::warn!(%error, "export failed");
                format!("Export failed: {error}")
            }
        };
    }
}

fn step_cursor(cursor: usize, len: usize, direction: DirectionKey) -> usize {
    if len == 0 {
        return 0;
    }
    match direction {
        DirectionKey::Up | DirectionKey::Left => cursor.saturating_sub(1),
        DirectionKey::Down | DirectionKey::Right => (cursor + 1).min(len - 1),
    }
}

struct SubmissionExecutor {
    runtime: tokio::runtime::Runtime,
    pipeline: QueryPipeline<dyn QueryBackend>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl SubmissionExecutor {
    fn new(pipeline: QueryPipeline<dyn QueryBackend>) -> Result<Self, TuiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;
        let (sender, receiver) = mpsc::channel();
        Ok(Self {
            runtime,
            pipeline,
            sender,
            receiver,
        })
    }

    fn dispatch(&self, pending: PendingSubmission) {
        let pipeline = self.pipeline.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let result = pipeline.execute(&pending.prompt).await;
            if sender
                .send(Completion {
                    id: pending.id,
                    result,
                })
                .is_err()
            {
                tracing::debug!(submission = %pending.id, "event loop gone before completion");
            }
        });
    }

    fn drain(&self) -> Vec<Completion> {
        self.receiver.try_iter().collect()
    }
}

pub fn run(config: AppConfig) -> Result<(), TuiError> {
    let executor = SubmissionExecutor::new(pipeline_from_config(&config)?)?;
    let mut app = TuiApp::new(&config)?;
    if config.journal {
        app.journal = Some(FileHistoryJournal::load_default()?);
    }
    if let Ok(dir) = std::env::current_dir() {
        app.export_dir = dir;
    }

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &mut app, &executor);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut TuiApp,
    executor: &SubmissionExecutor,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| render(frame, app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key, app.input_mode()) {
                        app.handle(message);
                    }
                }
            }
        }

        for pending in app.outbox.drain(..) {
            executor.dispatch(pending);
        }
        for completion in executor.drain() {
            app.complete(&completion);
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.handle(Msg::Tick);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    match app.view {
        AppView::Landing => render_landing(frame, chunks[1]),
        AppView::Connect => render_connect(frame, app, chunks[1]),
        AppView::Schema => render_schema(frame, app, chunks[1]),
        AppView::Editor => render_editor(frame, app, chunks[1]),
    }
    render_footer(frame, app, chunks[2]);

    if app.show_help {
        render_help_popup(frame);
    }
}

fn render_header(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let query_state = if app.console.is_running() {
        format!(
            "running {} ({})",
            SPINNER_FRAMES[app.spinner],
            app.console.in_flight()
        )
    } else {
        "idle".to_string()
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.view.title()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(format!("Datastore: {}", app.active_datastore_label())),
        Span::raw(" | "),
        Span::raw(format!("Query: {query_state}")),
        Span::raw(" | "),
        Span::raw(format!(
            "{} queries executed",
            app.console.history.total_submitted()
        )),
    ]))
    .block(Block::default().borders(Borders::ALL).title("querydeck"));
    frame.render_widget(header, area);
}

fn render_landing(frame: &mut Frame<'_>, area: Rect) {
    let body = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "Query your data in plain language",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("1. Register the datastores you want to work with"),
        Line::from("2. Describe the schema as JSON"),
        Line::from("3. Write a query and read the results"),
        Line::from(""),
        Line::from("Press Enter to connect"),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Welcome"));
    frame.render_widget(body, area);
}

fn render_connect(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let mut lines = vec![
        Line::from("Ctrl+N: add  Ctrl+D: remove  Tab: switch field  Left/Right: type  Enter: connect"),
        Line::from(""),
    ];

    if app.registry.is_empty() {
        lines.push(Line::from("No connections yet. Press Ctrl+N to add one."));
    }

    for (index, descriptor) in app.registry.descriptors().iter().enumerate() {
        let selected = index == app.connection_cursor;
        let marker = if selected { ">" } else { " " };
        let kind_style = if selected && app.connect_field == ConnectField::Kind {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let value = if descriptor.value.is_empty() {
            Span::styled("Connection string...", Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(descriptor.value.clone())
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{marker} ")),
            Span::styled(format!("[{:<10}]", descriptor.kind.label()), kind_style),
            Span::raw(" "),
            value,
        ]));
    }

    if app.transition.is_some() {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("{} Connecting...", SPINNER_FRAMES[app.spinner])));
    }

    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Connections ({})", app.registry.len())),
    );
    frame.render_widget(body, area);
}

fn render_schema(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(1)])
        .split(area);

    let editor = Paragraph::new(app.schema.text().to_string())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Schema (JSON)"),
        );
    frame.render_widget(editor, chunks[0]);

    let info = match &app.schema_error {
        Some(error) => Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(format!(
            "{} characters | Ctrl+S: continue  Ctrl+R: reset template",
            app.schema.char_count()
        )),
    };
    frame.render_widget(Paragraph::new(info), chunks[1]);
}

fn render_editor(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    let editor_lines = app
        .editor_text
        .split('\n')
        .enumerate()
        .map(|(index, line)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>3} ", index + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(line.to_string()),
            ])
        })
        .collect::<Vec<_>>();
    let editor = Paragraph::new(editor_lines).block(focus_block(
        "query",
        app.editor_focus == EditorFocus::Query,
    ));
    frame.render_widget(editor, left[0]);

    render_table(frame, app, left[1]);
    render_history(frame, app, columns[1]);
}

fn render_table(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let block = focus_block("results", app.editor_focus == EditorFocus::Table);
    let Some(table) = &app.console.table else {
        frame.render_widget(Paragraph::new("No tabular results yet").block(block), area);
        return;
    };

    let header = Row::new(
        table
            .columns
            .iter()
            .map(|column| Cell::from(column.clone()))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = table
        .rows
        .iter()
        .map(|row| Row::new(row.iter().map(display_cell).map(Cell::from).collect::<Vec<_>>()))
        .collect::<Vec<_>>();
    let widths = vec![Constraint::Fill(1); table.columns.len().max(1)];

    let widget = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = TableState::default();
    if app.editor_focus == EditorFocus::Table {
        state.select(Some(app.table_cursor));
    }
    frame.render_stateful_widget(widget, area, &mut state);
}

fn render_history(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let focused = app.editor_focus == EditorFocus::History;
    let height = usize::from(area.height.saturating_sub(2));
    let cursor = app
        .history_cursor
        .min(app.console.history.len().saturating_sub(1));
    let start = history_window_start(&app.console.history, cursor, height);
    let mut lines = Vec::new();
    for entry in app.console.history.visible_entries(start, cursor + 1 - start) {
        lines.extend(history_lines(entry));
    }
    if lines.is_empty() {
        lines.push(Line::from("No queries yet. Ctrl+S runs the editor."));
    }

    let console = Paragraph::new(lines).block(focus_block(
        &format!("console ({} results)", app.console.history.len()),
        focused,
    ));
    frame.render_widget(console, area);
}

// The window ends on `cursor` and reaches back as far as whole entries fit.
fn history_window_start(history: &HistoryLog, cursor: usize, height: usize) -> usize {
    let mut start = cursor;
    let mut used = 0;
    for (index, entry) in history
        .iter()
        .enumerate()
        .take(cursor + 1)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
    {
        used += history_entry_height(entry);
        if used > height && index != cursor {
            break;
        }
        start = index;
    }
    start
}

fn history_entry_height(entry: &HistoryEntry) -> usize {
    2 + entry.query.lines().count() + entry.result.lines().count()
}

fn history_lines(entry: &HistoryEntry) -> Vec<Line<'static>> {
    let (marker, color) = match entry.status {
        EntryStatus::Pending => ("…", Color::Yellow),
        EntryStatus::Success => ("●", Color::Green),
        EntryStatus::Error => ("●", Color::Red),
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(entry.timestamp.clone(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(marker, Style::default().fg(color)),
        Span::raw(format!(" {}", entry.id)),
    ])];
    lines.extend(
        entry
            .query
            .lines()
            .map(|line| Line::styled(format!("  {line}"), Style::default().fg(Color::Gray))),
    );
    lines.extend(entry.result.lines().map(|line| Line::from(format!("  {line}"))));
    lines.push(Line::from(""));
    lines
}

fn focus_block(title: &str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title.to_string())
}

fn render_footer(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let hints = match app.view {
        AppView::Landing => "Enter: start | q: quit | ?: help",
        AppView::Connect => "Ctrl+N add | Ctrl+D remove | Enter connect | Ctrl+Q quit",
        AppView::Schema => "Ctrl+S continue | Ctrl+R reset | Ctrl+Q quit",
        AppView::Editor => {
            "Ctrl+S run | Tab focus | Ctrl+B datastore | Ctrl+E csv | Ctrl+X json | Ctrl+Q quit"
        }
    };
    let footer = Paragraph::new(vec![
        Line::from(hints),
        Line::from(format!("Status: {}", app.status_line)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Keys"));
    frame.render_widget(footer, area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Global keymap"),
        Line::from("Ctrl+Q: quit (q outside text fields)"),
        Line::from("F1: toggle help (? outside text fields)"),
        Line::from("Enter / Ctrl+S: continue or run query"),
        Line::from("Tab: switch field or editor focus"),
        Line::from("Arrows or hjkl: navigation"),
        Line::from("Ctrl+N / Ctrl+D: add / remove connection"),
        Line::from("Ctrl+R: reset schema template"),
        Line::from("Ctrl+B: cycle active datastore"),
        Line::from("Ctrl+E / Ctrl+X: export table as CSV / JSON"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(key: KeyEvent, mode: InputMode) -> Option<Msg> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('q') => Some(Msg::Quit),
            KeyCode::Char('s') => Some(Msg::Submit),
            KeyCode::Char('n') => Some(Msg::AddConnection),
            KeyCode::Char('d') => Some(Msg::RemoveConnection),
            KeyCode::Char('r') => Some(Msg::ResetDraft),
            KeyCode::Char('b') => Some(Msg::CycleDatastore),
            KeyCode::Char('e') => Some(Msg::Export(ExportFormat::Csv)),
            KeyCode::Char('x') => Some(Msg::Export(ExportFormat::Json)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::F(1) => return Some(Msg::ToggleHelp),
        KeyCode::F(5) => return Some(Msg::Submit),
        KeyCode::Tab => return Some(Msg::NextFocus),
        KeyCode::Up => return Some(Msg::Navigate(DirectionKey::Up)),
        KeyCode::Down => return Some(Msg::Navigate(DirectionKey::Down)),
        KeyCode::Left => return Some(Msg::Navigate(DirectionKey::Left)),
        KeyCode::Right => return Some(Msg::Navigate(DirectionKey::Right)),
        _ => {}
    }

    match mode {
        InputMode::Text => match key.code {
            KeyCode::Enter => Some(Msg::Newline),
            KeyCode::Backspace => Some(Msg::Backspace),
            KeyCode::Char(ch) => Some(Msg::Input(ch)),
            _ => None,
        },
        InputMode::Navigation => match key.code {
            KeyCode::Enter => Some(Msg::Submit),
            KeyCode::Char('q') => Some(Msg::Quit),
            KeyCode::Char('?') => Some(Msg::ToggleHelp),
            KeyCode::Char('k') => Some(Msg::Navigate(DirectionKey::Up)),
            KeyCode::Char('j') => Some(Msg::Navigate(DirectionKey::Down)),
            KeyCode::Char('h') => Some(Msg::Navigate(DirectionKey::Left)),
            KeyCode::Char('l') => Some(Msg::Navigate(DirectionKey::Right)),
            _ => None,
        },
    }
}
