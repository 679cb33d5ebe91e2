use std::collections::VecDeque;
use std::io::{self, Stdout};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Widget, Wrap,
};

use crate::builds::LoadStage;
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::error::{Error, Result};
use crate::events::{ChannelSink, UiEvent};
use crate::nav::{SECTION_BUILDS, View};
use crate::remote::{self, HttpBackend, Inbound, ThreadedRemote};
use crate::sanitize::{sanitize_message, sanitize_name};

const MAX_ACTIVITY_LINES: usize = 200;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

enum InputMode {
    Normal,
    EditEnv { name: String, buffer: String },
    ConfirmDelete { build: String },
}

struct App {
    dash: Dashboard,
    inbound_rx: mpsc::Receiver<Inbound>,
    ui_rx: mpsc::Receiver<UiEvent>,

    backend: HttpBackend,
    download_dir: PathBuf,
    download_tx: mpsc::Sender<(String, Result<PathBuf>)>,
    download_rx: mpsc::Receiver<(String, Result<PathBuf>)>,
    downloads_in_flight: usize,

    terminal_url: String,
    build_list: ListState,
    env_list: ListState,
    input: InputMode,
    alerts: VecDeque<String>,
    activity: VecDeque<String>,
    last_report: Option<(String, String)>,
    env_requested: bool,
    tick: usize,
}

impl App {
    fn new(cfg: &DashboardConfig) -> Result<Self> {
        let backend = HttpBackend::new(&cfg.server)?;
        let terminal_url = remote::terminal_url(&cfg.server.base_url, cfg.terminal.port)?;

        let (inbound_tx, inbound_rx) = mpsc::channel::<Inbound>();
        let (ui_tx, ui_rx) = mpsc::channel::<UiEvent>();
        let (download_tx, download_rx) = mpsc::channel();

        let remote = Arc::new(ThreadedRemote::new(backend.clone(), inbound_tx));
        let sink = Arc::new(ChannelSink::new(ui_tx));
        let dash = Dashboard::new(remote.clone(), remote, sink);

        Ok(Self {
            dash,
            inbound_rx,
            ui_rx,
            backend,
            download_dir: cfg.download.dir.clone(),
            download_tx,
            download_rx,
            downloads_in_flight: 0,
            terminal_url,
            build_list: ListState::default(),
            env_list: ListState::default(),
            input: InputMode::Normal,
            alerts: VecDeque::new(),
            activity: VecDeque::new(),
            last_report: None,
            env_requested: false,
            tick: 0,
        })
    }

    fn push_activity(&mut self, line: impl Into<String>) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        push_bounded(
            &mut self.activity,
            format!("{stamp} {}", line.into()),
            MAX_ACTIVITY_LINES,
        );
    }

    fn drain_events(&mut self) {
        while let Ok(inbound) = self.inbound_rx.try_recv() {
            self.dash.handle(inbound);
        }
        while let Ok(ev) = self.ui_rx.try_recv() {
            self.on_ui_event(ev);
        }
        while let Ok((build, res)) = self.download_rx.try_recv() {
            self.downloads_in_flight = self.downloads_in_flight.saturating_sub(1);
            match res {
                Ok(path) => {
                    self.push_activity(format!("downloaded {build} to {}", path.display()))
                }
                Err(e) => self.alerts.push_back(sanitize_message(&e.to_string())),
            }
        }
    }

    fn on_ui_event(&mut self, ev: UiEvent) {
        match ev {
            UiEvent::ViewChanged { view } => self.on_view_entered(view),
            UiEvent::SectionToggled { .. } | UiEvent::BusyChanged { .. } => {}
            UiEvent::BuildsReplaced { builds } => {
                let selected = self.build_list.selected().unwrap_or(0);
                if builds.is_empty() {
                    self.build_list.select(None);
                } else {
                    self.build_list.select(Some(selected.min(builds.len() - 1)));
                }
                self.push_activity(format!("{} cached builds", builds.len()));
            }
            UiEvent::ReportDisplayed { build, url, .. } => {
                self.push_activity(format!("rendering {} ({url})", sanitize_name(&build)));
            }
            UiEvent::ReportReady { build, url } => {
                self.push_activity(format!("report ready: {}", sanitize_name(&build)));
                self.last_report = Some((build, url));
            }
            UiEvent::BuildDeleted { build } => {
                self.push_activity(format!("deleted {}", sanitize_name(&build)));
                if self
                    .last_report
                    .as_ref()
                    .is_some_and(|(b, _)| *b == build)
                {
                    self.last_report = None;
                }
            }
            UiEvent::EnvRendered { rows } => {
                self.env_list
                    .select(if rows.is_empty() { None } else { Some(0) });
                self.push_activity(format!("environment loaded ({} vars)", rows.len()));
            }
            UiEvent::EnvSubmitted { names } => {
                self.push_activity(format!("environment submitted: {}", names.join(", ")));
            }
            UiEvent::Alert { message } => {
                self.push_activity(format!("alert: {message}"));
                self.alerts.push_back(message);
            }
        }
    }

    fn on_view_entered(&mut self, view: View) {
        match view {
            View::ReportViewer => {
                if self.dash.builds().builds().is_empty()
                    && !self.dash.busy()
                    && !self.dash.nav().section_visible(SECTION_BUILDS)
                {
                    self.dash.show_section(SECTION_BUILDS);
                }
            }
            View::EnvEditor => {
                if !self.env_requested {
                    self.env_requested = true;
                    self.dash.fetch_env();
                }
            }
            View::Terminal => {}
        }
    }

    fn selected_build(&self) -> Option<String> {
        let i = self.build_list.selected()?;
        self.dash.builds().builds().get(i).map(|b| b.name.clone())
    }

    fn selected_env(&self) -> Option<(String, String)> {
        let i = self.env_list.selected()?;
        self.dash
            .env()
            .rows()
            .get(i)
            .map(|r| (r.name.clone(), r.value.as_text().to_string()))
    }

    fn move_selection(state: &mut ListState, len: usize, delta: isize) {
        if len == 0 {
            state.select(None);
            return;
        }
        let cur = state.selected().unwrap_or(0) as isize;
        let next = (cur + delta).clamp(0, len as isize - 1);
        state.select(Some(next as usize));
    }

    fn start_download(&mut self, build: String) {
        let backend = self.backend.clone();
        let dir = self.download_dir.clone();
        let tx = self.download_tx.clone();
        self.downloads_in_flight += 1;
        self.push_activity(format!("downloading {}", sanitize_name(&build)));
        std::thread::spawn(move || {
            let res = backend.download_report(&build, &dir);
            let _ = tx.send((build, res));
        });
    }

    fn handle_key(&mut self, code: KeyCode, mods: KeyModifiers) -> Result<bool> {
        if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
            return Ok(true);
        }

        // Blocking notification: nothing else reacts until it is dismissed.
        if !self.alerts.is_empty() {
            if matches!(code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.alerts.pop_front();
            }
            return Ok(false);
        }

        match &mut self.input {
            InputMode::EditEnv { name, buffer } => {
                match code {
                    KeyCode::Esc => self.input = InputMode::Normal,
                    KeyCode::Enter => {
                        let (name, text) = (name.clone(), buffer.clone());
                        self.dash.set_env_text(&name, &text);
                        self.input = InputMode::Normal;
                    }
                    KeyCode::Backspace => {
                        buffer.pop();
                    }
                    KeyCode::Char(c) if !c.is_control() => buffer.push(c),
                    _ => {}
                }
                return Ok(false);
            }
            InputMode::ConfirmDelete { build } => {
                match code {
                    KeyCode::Char('y') | KeyCode::Enter => {
                        let build = build.clone();
                        self.dash.delete_report(&build);
                        self.input = InputMode::Normal;
                    }
                    KeyCode::Char('n') | KeyCode::Esc => self.input = InputMode::Normal,
                    _ => {}
                }
                return Ok(false);
            }
            InputMode::Normal => {}
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Tab | KeyCode::Right => {
                self.dash.next_view();
                return Ok(false);
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.dash.prev_view();
                return Ok(false);
            }
            KeyCode::Char('1') => {
                self.dash.activate(View::Terminal);
                return Ok(false);
            }
            KeyCode::Char('2') => {
                self.dash.activate(View::ReportViewer);
                return Ok(false);
            }
            KeyCode::Char('3') => {
                self.dash.activate(View::EnvEditor);
                return Ok(false);
            }
            _ => {}
        }

        match self.dash.nav().active() {
            View::Terminal => {}
            View::ReportViewer => self.handle_reports_key(code),
            View::EnvEditor => self.handle_setup_key(code),
        }
        Ok(false)
    }

    fn handle_reports_key(&mut self, code: KeyCode) {
        let builds_visible = self.dash.nav().section_visible(SECTION_BUILDS);
        let len = self.dash.builds().builds().len();
        match code {
            KeyCode::Char('b') => self.dash.toggle_section(SECTION_BUILDS),
            KeyCode::Esc if self.dash.busy() => {
                if self.dash.cancel_load() {
                    self.push_activity("report load cancelled");
                }
            }
            KeyCode::Char('R') => {
                self.dash.refresh_builds();
            }
            _ if !builds_visible => {}
            KeyCode::Down | KeyCode::Char('j') => Self::move_selection(&mut self.build_list, len, 1),
            KeyCode::Up | KeyCode::Char('k') => Self::move_selection(&mut self.build_list, len, -1),
            KeyCode::Enter => {
                if let Some(b) = self.selected_build() {
                    self.dash.load_report(&b, false);
                }
            }
            KeyCode::Char('r') => {
                if let Some(b) = self.selected_build() {
                    self.dash.load_report(&b, true);
                }
            }
            KeyCode::Char('d') => {
                if let Some(build) = self.selected_build() {
                    self.input = InputMode::ConfirmDelete { build };
                }
            }
            KeyCode::Char('D') => {
                if let Some(b) = self.selected_build() {
                    self.start_download(b);
                }
            }
            _ => {}
        }
    }

    fn handle_setup_key(&mut self, code: KeyCode) {
        let len = self.dash.env().rows().len();
        match code {
            KeyCode::Down | KeyCode::Char('j') => Self::move_selection(&mut self.env_list, len, 1),
            KeyCode::Up | KeyCode::Char('k') => Self::move_selection(&mut self.env_list, len, -1),
            KeyCode::Char('f') => {
                self.dash.fetch_env();
            }
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some((name, current)) = self.selected_env() {
                    self.input = InputMode::EditEnv {
                        name,
                        buffer: current,
                    };
                }
            }
            KeyCode::Char('s') => {
                if self.dash.submit_env().is_none() {
                    self.push_activity("nothing to submit");
                }
            }
            _ => {}
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(2),
            ])
            .split(f.area());

        self.draw_header(f, chunks[0]);
        match self.dash.nav().active() {
            View::Terminal => self.draw_terminal(f, chunks[1]),
            View::ReportViewer => self.draw_reports(f, chunks[1]),
            View::EnvEditor => self.draw_setup(f, chunks[1]),
        }
        self.draw_footer(f, chunks[2]);
        self.draw_modal(f);
    }

    fn draw_header(&self, f: &mut ratatui::Frame, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(30), Constraint::Length(34)])
            .split(area);

        let titles: Vec<&str> = View::ALL.iter().map(|v| v.title()).collect();
        let tabs = Tabs::new(titles)
            .select(self.dash.nav().active().index())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .divider("|")
            .block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(tabs, cols[0]);

        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let busy = if self.dash.busy() {
            Span::styled(
                format!("{} loading ", SPINNER[self.tick % SPINNER.len()]),
                Style::default().fg(Color::Yellow),
            )
        } else {
            Span::raw("")
        };
        let line = Line::from(vec![
            busy,
            Span::styled(now, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(Text::from(line)).block(Block::default().borders(Borders::BOTTOM));
        f.render_widget(p, cols[1]);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame, area: Rect) {
        let hint = match self.dash.nav().active() {
            View::Terminal => "[Tab/1-3] Views  [q] Quit",
            View::ReportViewer => {
                "[b] Builds  [j/k] Move  [Enter] Open  [r] Rebuild  [d] Delete  [D] Download  [R] Refresh  [Esc] Cancel load  [q] Quit"
            }
            View::EnvEditor => "[j/k] Move  [Enter/e] Edit  [s] Submit  [f] Reload  [q] Quit",
        };
        let p = Paragraph::new(hint)
            .style(Style::default().fg(Color::Gray))
            .block(Block::default().borders(Borders::TOP));
        f.render_widget(p, area);
    }

    fn draw_terminal(&self, f: &mut ratatui::Frame, area: Rect) {
        let text = Text::from(vec![
            Line::from(vec![
                Span::styled("Live terminal: ", Style::default().fg(Color::Yellow)),
                Span::raw(self.terminal_url.clone()),
            ]),
            Line::from(""),
            Line::from("Open this address in a browser to attach to the test harness shell."),
        ]);
        let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(
            Block::default()
                .title("Terminal")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        );
        f.render_widget(p, area);
    }

    fn draw_reports(&mut self, f: &mut ratatui::Frame, area: Rect) {
        let report_area = if self.dash.nav().section_visible(SECTION_BUILDS) {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
                .split(area);
            self.draw_build_list(f, cols[0]);
            cols[1]
        } else {
            area
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(3)])
            .split(report_area);
        f.render_widget(
            Paragraph::new(self.render_report_status())
                .wrap(Wrap { trim: false })
                .block(
                    Block::default()
                        .title("Report")
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded),
                ),
            rows[0],
        );
        f.render_widget(
            Paragraph::new(self.render_activity(rows[1].height.saturating_sub(2) as usize)).block(
                Block::default()
                    .title("Activity")
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            ),
            rows[1],
        );
    }

    fn draw_build_list(&mut self, f: &mut ratatui::Frame, area: Rect) {
        let deleting: Vec<&str> = self.dash.builds().deletes_in_flight().collect();
        let items: Vec<ListItem> = self
            .dash
            .builds()
            .builds()
            .iter()
            .map(|b| {
                let mut spans = vec![Span::raw(b.display_name())];
                if deleting.contains(&b.name.as_str()) {
                    spans.push(Span::styled(" (deleting)", Style::default().fg(Color::Red)));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();
        let title = if self.dash.builds().list_in_flight() {
            "Builds (refreshing)"
        } else {
            "Builds"
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::LightYellow))
            .highlight_symbol("> ");
        f.render_stateful_widget(list, area, &mut self.build_list);
    }

    fn render_report_status(&self) -> Text<'static> {
        let mut lines = Vec::new();
        match self.dash.builds().pending_load() {
            Some(p) => {
                let action = if p.rebuild { "rebuilding" } else { "loading" };
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{} {action} ", SPINNER[self.tick % SPINNER.len()]),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(sanitize_name(&p.build)),
                ]));
                match &p.stage {
                    LoadStage::Requested => lines.push(Line::from("waiting for the report server")),
                    LoadStage::Rendering { url, .. } => {
                        lines.push(Line::from(format!("fetching {url}")))
                    }
                }
                lines.push(Line::from("[Esc] cancel"));
            }
            None => match &self.last_report {
                Some((build, url)) => {
                    lines.push(Line::from(vec![
                        Span::styled("ready ", Style::default().fg(Color::Green)),
                        Span::raw(sanitize_name(build)),
                    ]));
                    let full = remote::resolve_url(self.backend.base_url(), url)
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| url.clone());
                    lines.push(Line::from(full));
                }
                None => lines.push(Line::from("no report loaded; [b] to pick a build")),
            },
        }
        if self.downloads_in_flight > 0 {
            lines.push(Line::from(format!(
                "{} download(s) in progress",
                self.downloads_in_flight
            )));
        }
        Text::from(lines)
    }

    fn render_activity(&self, height: usize) -> Text<'static> {
        let skip = self.activity.len().saturating_sub(height);
        Text::from(
            self.activity
                .iter()
                .skip(skip)
                .map(|l| Line::from(l.clone()))
                .collect::<Vec<_>>(),
        )
    }

    fn draw_setup(&mut self, f: &mut ratatui::Frame, area: Rect) {
        let rows = self.dash.env().rows();
        let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
        let items: Vec<ListItem> = rows
            .iter()
            .map(|r| {
                let marker = if r.changed() { "*" } else { " " };
                let value = if r.value.is_set() {
                    Span::raw(sanitize_name(r.value.as_text()))
                } else {
                    Span::styled("<unset>", Style::default().fg(Color::DarkGray))
                };
                ListItem::new(Line::from(vec![
                    Span::styled(marker, Style::default().fg(Color::Yellow)),
                    Span::raw(format!(" {:<width$}  ", sanitize_name(&r.name))),
                    value,
                ]))
            })
            .collect();
        let title = if self.dash.env().fetching() {
            "Environment (loading)"
        } else {
            "Environment"
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::LightYellow))
            .highlight_symbol("> ");
        f.render_stateful_widget(list, area, &mut self.env_list);
    }

    fn draw_modal(&self, f: &mut ratatui::Frame) {
        if let Some(msg) = self.alerts.front() {
            let mut lines: Vec<Line> = msg.lines().map(|l| Line::from(l.to_string())).collect();
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "enter=dismiss",
                Style::default().fg(Color::Gray),
            )));
            draw_dialog(f, "Error", Text::from(lines), Color::Red);
            return;
        }
        match &self.input {
            InputMode::Normal => {}
            InputMode::EditEnv { name, buffer } => {
                let text = Text::from(vec![
                    Line::from(vec![
                        Span::styled("Variable: ", Style::default().fg(Color::Yellow)),
                        Span::raw(sanitize_name(name)),
                    ]),
                    Line::from("empty or \"null\" leaves it unchanged  enter=save  esc=cancel"),
                    Line::from(""),
                    Line::from(buffer.clone()),
                ]);
                draw_dialog(f, "Edit Variable", text, Color::DarkGray);
            }
            InputMode::ConfirmDelete { build } => {
                let text = Text::from(vec![
                    Line::from(format!("Delete cached report {}?", sanitize_name(build))),
                    Line::from(""),
                    Line::from("y/enter=delete  n/esc=keep"),
                ]);
                draw_dialog(f, "Delete", text, Color::DarkGray);
            }
        }
    }
}

fn draw_dialog(f: &mut ratatui::Frame, title: &str, text: Text<'_>, bg: Color) {
    let area = centered_rect(70, 30, f.area());
    let shadow = shadow_rect(area, f.area());
    f.render_widget(
        Fill {
            style: Style::default()
                .bg(Color::Black)
                .add_modifier(Modifier::DIM),
        },
        shadow,
    );
    f.render_widget(Clear, area);
    let p = Paragraph::new(text)
        .style(Style::default().fg(Color::White).bg(bg))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_type(BorderType::Double),
        );
    f.render_widget(p, area);
}

pub fn run_tui(cfg: &DashboardConfig) -> Result<()> {
    let mut app = App::new(cfg)?;
    app.dash.activate(View::ReportViewer);

    let mut stdout = io::stdout();
    enable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
    execute!(stdout, EnterAlternateScreen, Hide).map_err(|e| Error::msg(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| Error::msg(e.to_string()))?;
    terminal
        .clear()
        .map_err(|e| Error::msg(format!("tui clear failed: {e}")))?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show).ok();
    result
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mut app: App) -> Result<()> {
    let tick = Duration::from_millis(100);
    loop {
        app.drain_events();
        app.tick = app.tick.wrapping_add(1);

        let mut draw_panicked = false;
        let draw_result = terminal.draw(|f| {
            if catch_unwind(AssertUnwindSafe(|| app.draw(f))).is_err() {
                draw_panicked = true;
            }
        });
        if draw_panicked {
            tracing::error!("draw panicked; clearing terminal");
            let _ = terminal.clear();
            continue;
        }
        if let Err(e) = draw_result {
            tracing::error!("draw failed: {e}");
            let _ = terminal.clear();
            continue;
        }

        if event::poll(tick).map_err(|e| Error::msg(e.to_string()))? {
            if let Event::Key(k) = event::read().map_err(|e| Error::msg(e.to_string()))? {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(k.code, k.modifiers)? {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn push_bounded(q: &mut VecDeque<String>, v: String, max: usize) {
    if q.len() >= max {
        q.pop_front();
    }
    q.push_back(v);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r)[1];
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical)[1]
}

fn shadow_rect(inner: Rect, bounds: Rect) -> Rect {
    let max_x = bounds.x.saturating_add(bounds.width);
    let max_y = bounds.y.saturating_add(bounds.height);
    let x = inner.x.saturating_add(1).min(max_x.saturating_sub(1));
    let y = inner.y.saturating_add(1).min(max_y.saturating_sub(1));
    Rect {
        x,
        y,
        width: inner.width.min(max_x.saturating_sub(x)),
        height: inner.height.min(max_y.saturating_sub(y)),
    }
}

struct Fill {
    style: Style,
}

impl Widget for Fill {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for y in area.y..area.y.saturating_add(area.height) {
            for x in area.x..area.x.saturating_add(area.width) {
                buf[(x, y)].set_char(' ').set_style(self.style);
            }
        }
    }
}
