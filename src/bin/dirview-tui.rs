use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use std::io::{self, stdout, Stdout};
use std::time::{Duration, Instant};

use dirview::cli::{init_logging, Cli, LogSink};
use dirview::folder_view::{status_line, FolderView};
use dirview::path_codec::{display_text_to_path, path_to_display_text};
use dirview::tree::{DisplayTree, NodeKind, VisibleRow};

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Minimum time between redraws while a scan is running.
const SCAN_REDRAW_INTERVAL: Duration = Duration::from_millis(33);

struct App {
    view: FolderView,
    selected: usize,
    path_input: String,
    input_mode: bool,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    fn new(view: FolderView) -> Self {
        Self {
            view,
            selected: 0,
            path_input: String::new(),
            input_mode: false,
            status: None,
            should_quit: false,
        }
    }

    fn rows(&self) -> Vec<VisibleRow> {
        self.view.tree().visible_rows()
    }

    fn start_open(&mut self) {
        if !self.view.is_open_enabled() {
            return;
        }

        let text = self.path_input.trim();
        if text.is_empty() {
            self.status = Some("Open cancelled".to_string());
            return;
        }

        let path = display_text_to_path(text);
        if !path.is_dir() {
            self.status = Some(format!("Not a folder: {}", text));
            return;
        }

        match self.view.begin_open(path) {
            Ok(()) => self.status = None,
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    /// Run a pending open, redrawing the partial tree as entries arrive.
    fn run_pending_open(&mut self, terminal: &mut Term) -> io::Result<()> {
        let Some(pending) = self.view.pending_path() else {
            return Ok(());
        };
        let scanning = path_to_display_text(pending);

        let mut entries = 0u64;
        let mut last_pass = Instant::now();
        let mut quit_requested = false;
        let mut draw_error: Option<io::Error> = None;

        self.view.finish_open(&mut |tree: &DisplayTree| {
            entries += 1;
            if draw_error.is_some() || last_pass.elapsed() < SCAN_REDRAW_INTERVAL {
                return;
            }
            last_pass = Instant::now();

            if let Err(err) = drain_scan_events(&mut quit_requested) {
                draw_error = Some(err);
                return;
            }
            let status = format!("Scanning {} ... {} entries", scanning, entries);
            if let Err(err) = terminal.draw(|frame| draw_scanning(frame, tree, &status)) {
                draw_error = Some(err);
            }
        });

        self.selected = 0;
        self.status = None;
        if quit_requested {
            self.should_quit = true;
        }
        match draw_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
            self.should_quit = true;
            return;
        }

        if self.input_mode {
            match key.code {
                KeyCode::Enter => {
                    self.input_mode = false;
                    self.start_open();
                }
                KeyCode::Esc => {
                    self.input_mode = false;
                    self.status = Some("Open cancelled".to_string());
                }
                KeyCode::Backspace => {
                    self.path_input.pop();
                }
                KeyCode::Char(ch) => {
                    self.path_input.push(ch);
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('o') | KeyCode::Char('/') => {
                if self.view.is_open_enabled() {
                    self.path_input = self
                        .view
                        .root_path()
                        .map(path_to_display_text)
                        .unwrap_or_default();
                    self.input_mode = true;
                }
            }
            KeyCode::Char('r') => {
                if let Some(root) = self.view.root_path().map(|p| p.to_path_buf()) {
                    if let Err(err) = self.view.begin_open(root) {
                        self.status = Some(err.to_string());
                    }
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                let count = self.rows().len();
                if self.selected + 1 < count {
                    self.selected += 1;
                }
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.rows().len().saturating_sub(1),
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle_selected(),
            KeyCode::Right | KeyCode::Char('l') => self.expand_selected(),
            KeyCode::Left | KeyCode::Char('h') => self.collapse_selected(),
            _ => {}
        }
    }

    fn toggle_selected(&mut self) {
        let Some(row) = self.rows().get(self.selected).cloned() else {
            return;
        };
        if row.kind == NodeKind::Folder {
            self.view.tree_mut().toggle(row.handle);
        }
    }

    fn expand_selected(&mut self) {
        let Some(row) = self.rows().get(self.selected).cloned() else {
            return;
        };
        if row.kind == NodeKind::Folder {
            self.view.tree_mut().set_expanded(row.handle, true);
        }
    }

    /// Collapse the selected folder, or jump to the parent of anything else.
    fn collapse_selected(&mut self) {
        let rows = self.rows();
        let Some(row) = rows.get(self.selected) else {
            return;
        };

        if row.kind == NodeKind::Folder && row.expanded {
            self.view.tree_mut().set_expanded(row.handle, false);
            return;
        }

        if let Some(parent) = self.view.tree().parent(row.handle) {
            if let Some(index) = rows.iter().position(|r| r.handle == parent) {
                self.selected = index;
            }
        }
    }
}

/// Handle terminal input that arrives mid-scan.
///
/// The open control is disabled for the whole scan, so only quit requests
/// are remembered; resizes are picked up by the next draw.
fn drain_scan_events(quit_requested: &mut bool) -> io::Result<()> {
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
            if ctrl_c || key.code == KeyCode::Char('q') {
                *quit_requested = true;
            }
        }
    }
    Ok(())
}

fn row_line(row: &VisibleRow) -> Line<'static> {
    let marker = match (row.kind, row.has_children, row.expanded) {
        (NodeKind::Folder, true, true) => "▾ ",
        (NodeKind::Folder, true, false) => "▸ ",
        _ => "  ",
    };
    let style = match row.kind {
        NodeKind::Folder => Style::default().fg(Color::Rgb(120, 170, 230)).add_modifier(Modifier::BOLD),
        NodeKind::File => Style::default().fg(Color::White),
    };

    Line::from(vec![
        Span::raw("  ".repeat(row.depth)),
        Span::styled(marker, Style::default().fg(Color::Gray)),
        Span::raw(format!("{} ", row.kind.icon())),
        Span::styled(row.label.clone(), style),
    ])
}

fn tree_list(rows: &[VisibleRow], title: &str) -> List<'static> {
    let items: Vec<ListItem> = rows.iter().map(|row| ListItem::new(row_line(row))).collect();
    List::new(items)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::Rgb(50, 60, 80)).add_modifier(Modifier::BOLD))
}

fn split_main(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::vertical([Constraint::Min(3), Constraint::Length(3), Constraint::Length(1)]).split(area);
    (rows[0], rows[1], rows[2])
}

fn draw_scanning(frame: &mut Frame, tree: &DisplayTree, status: &str) {
    let (tree_area, status_area, help_area) = split_main(frame.area());

    frame.render_widget(tree_list(&tree.visible_rows(), " Directory Tree Viewer "), tree_area);
    frame.render_widget(
        Paragraph::new(status.to_string())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().title(" Status ").borders(Borders::ALL)),
        status_area,
    );
    frame.render_widget(
        Paragraph::new("Open disabled while scanning   q: quit when done").style(Style::default().fg(Color::DarkGray)),
        help_area,
    );
}

fn draw_ui(frame: &mut Frame, app: &App) {
    let (tree_area, status_area, help_area) = split_main(frame.area());

    let rows = app.rows();
    let mut state = ListState::default().with_selected(if rows.is_empty() { None } else { Some(app.selected) });
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new("No folder open. Press o to open one.")
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().title(" Directory Tree Viewer ").borders(Borders::ALL)),
            tree_area,
        );
    } else {
        frame.render_stateful_widget(tree_list(&rows, " Directory Tree Viewer "), tree_area, &mut state);
    }

    let status = if app.input_mode {
        Paragraph::new(app.path_input.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().title(" Open Folder (Enter: open, Esc: cancel) ").borders(Borders::ALL))
    } else {
        let text = app.status.clone().unwrap_or_else(|| status_line(&app.view));
        Paragraph::new(text).block(Block::default().title(" Status ").borders(Borders::ALL))
    };
    frame.render_widget(status, status_area);

    frame.render_widget(
        Paragraph::new("↑/↓: move   Enter: toggle   ←/→: collapse/expand   o: open folder   r: rescan   q: quit")
            .style(Style::default().fg(Color::DarkGray)),
        help_area,
    );
}

fn run_app(terminal: &mut Term, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|frame| draw_ui(frame, app))?;

        // The disabled state is on screen; now scan.
        if !app.view.is_open_enabled() {
            app.run_pending_open(terminal)?;
            continue;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
                _ => {}
            }
        }
    }

    Ok(())
}

fn main() -> dirview::Result<()> {
    let cli = Cli::parse();
    // Raw mode owns the terminal; only log when sent to a file.
    init_logging(&cli, "info", LogSink::FileOnly)?;

    let mut view = FolderView::new();
    view.begin_startup(cli.start_path())?;
    let mut app = App::new(view);

    enable_raw_mode()?;
    crossterm::execute!(stdout(), EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let app_result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app_result?;
    Ok(())
}
