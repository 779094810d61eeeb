use clap::Parser;
use eframe::egui;
use std::path::PathBuf;
use std::time::Duration;

use dirview::cli::{init_logging, Cli, LogSink};
use dirview::folder_view::{status_line, FolderView, OpenProgress};
use dirview::path_codec::path_to_display_text;
use dirview::tree::{DisplayTree, NodeHandle, NodeKind};
use dirview::ViewerError;

const WINDOW_TITLE: &str = "Directory Tree Viewer";

/// Scan time per frame; the rest of the frame goes to input and painting.
const SCAN_SLICE: Duration = Duration::from_millis(12);

fn main() -> dirview::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli, "warn", LogSink::Stderr)?;
    let start_path = cli.start_path();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_position([900.0, 600.0])
            .with_inner_size([800.0, 600.0])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            configure_style(&cc.egui_ctx);
            Box::new(DirViewApp::new(start_path))
        }),
    )
    .map_err(|e| ViewerError::Gui(e.to_string()))?;

    Ok(())
}

fn configure_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 4.0);
    style.spacing.button_padding = egui::vec2(16.0, 6.0);
    ctx.set_style(style);
}

struct DirViewApp {
    view: FolderView,
    /// Set once the busy state of a pending open has been on screen.
    busy_painted: bool,
}

impl DirViewApp {
    fn new(start_path: Option<PathBuf>) -> Self {
        let mut view = FolderView::new();
        if let Err(err) = view.begin_startup(start_path) {
            tracing::warn!(%err, "startup folder not opened");
        }
        Self {
            view,
            busy_painted: false,
        }
    }

    fn is_busy(&self) -> bool {
        !self.view.is_open_enabled()
    }

    /// Scan one slice per frame once the disabled button and wait cursor
    /// have been shown, keeping the event loop turning until the tree is built.
    fn advance_pending_open(&mut self, ctx: &egui::Context) {
        if !self.is_busy() {
            return;
        }

        if !self.busy_painted {
            self.busy_painted = true;
            ctx.request_repaint();
            return;
        }

        match self.view.step_open(SCAN_SLICE) {
            OpenProgress::Scanning { .. } => ctx.request_repaint(),
            OpenProgress::Finished(_) | OpenProgress::Idle => self.busy_painted = false,
        }
    }

    fn pick_folder(&mut self) {
        let mut dialog = rfd::FileDialog::new().set_title("Select a folder to open");
        if let Some(root) = self.view.root_path() {
            dialog = dialog.set_directory(root);
        }

        // Cancel leaves the current tree alone.
        let Some(path) = dialog.pick_folder() else {
            return;
        };

        if let Err(err) = self.view.begin_open(path) {
            tracing::warn!(%err, "open request ignored");
        }
    }

    fn show_tree(&self, ui: &mut egui::Ui) {
        let tree = self.view.tree();
        let Some(root) = tree.root() else {
            return;
        };
        show_node(ui, tree, root, self.view.generation());
    }
}

fn show_node(ui: &mut egui::Ui, tree: &DisplayTree, node: NodeHandle, generation: u64) {
    let Some(data) = tree.get(node) else {
        return;
    };
    let text = format!("{} {}", data.kind.icon(), data.label);

    match data.kind {
        NodeKind::Folder => {
            egui::CollapsingHeader::new(text)
                .id_source((generation, node))
                .default_open(data.expanded)
                .show(ui, |ui| {
                    for child in tree.children(node) {
                        show_node(ui, tree, child, generation);
                    }
                });
        }
        NodeKind::File => {
            ui.label(text);
        }
    }
}

impl eframe::App for DirViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.advance_pending_open(ctx);

        if self.is_busy() {
            ctx.set_cursor_icon(egui::CursorIcon::Wait);
        }

        egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.vertical_centered(|ui| {
                let button = ui.add_enabled(!self.is_busy(), egui::Button::new("Open Folder..."));
                if button.clicked() {
                    self.pick_folder();
                }
            });

            ui.horizontal(|ui| {
                if let Some(pending) = self.view.pending_path() {
                    ui.spinner();
                    let entries = self.view.scanned_entries().unwrap_or(0);
                    ui.label(format!("Scanning {} ... {} entries", path_to_display_text(pending), entries));
                } else {
                    ui.label(status_line(&self.view));
                }
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                egui::ScrollArea::both()
                    .auto_shrink([false, false])
                    .show(ui, |ui| self.show_tree(ui));
            });
        });
    }
}
