use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use eframe::egui;
use log::{debug, info, warn};
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};

use crate::config::{Config, MIN_INTERVAL_MS};
use crate::page::{Document, ScrollRequest};
use crate::page::markup::{self, Page, PageMeta};
use crate::render::{self, ImageCache};
use crate::runtime::EventLoop;
use crate::slideshow::{DEFAULT_ARROW_CORRECTION, DEFAULT_INTERVAL, Settings};
use crate::theme::Theme;

/// Longest stretch of virtual time a single frame may advance. A window that
/// was hidden or suspended rotates once on return instead of catching up.
const MAX_FRAME_STEP: Duration = Duration::from_secs(1);
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

struct Toast {
    message: String,
    start: Instant,
}

impl Toast {
    fn new(message: String) -> Self {
        Self {
            message,
            start: Instant::now(),
        }
    }

    fn opacity(&self) -> f32 {
        let elapsed = self.start.elapsed().as_secs_f32();
        let duration = 2.0;
        let fade_start = 1.5;
        if elapsed < fade_start {
            1.0
        } else if elapsed < duration {
            1.0 - (elapsed - fade_start) / (duration - fade_start)
        } else {
            0.0
        }
    }

    fn is_expired(&self) -> bool {
        self.start.elapsed().as_secs_f32() >= 2.0
    }
}

/// Values given on the command line. They win over the page and the config.
#[derive(Debug, Clone, Copy, Default)]
struct Overrides {
    interval_ms: Option<u64>,
    paused: bool,
}

/// Controller settings for a page: command line first, then the page's
/// frontmatter, then the config file, then built-in defaults.
fn resolve_settings(overrides: &Overrides, meta: &PageMeta, config: &Config) -> Settings {
    let interval = overrides
        .interval_ms
        .or(meta.interval)
        .or(config.interval_ms())
        .map(|ms| {
            if ms < MIN_INTERVAL_MS {
                warn!("Interval of {ms} ms is too short, using {MIN_INTERVAL_MS} ms");
            }
            Duration::from_millis(ms.max(MIN_INTERVAL_MS))
        })
        .unwrap_or(DEFAULT_INTERVAL);
    Settings {
        interval,
        arrow_correction: config
            .arrow_correction()
            .unwrap_or(DEFAULT_ARROW_CORRECTION),
        ..Settings::default()
    }
}

fn resolve_theme(meta: &PageMeta, config: &Config) -> Theme {
    Theme::from_name(meta.theme.as_deref().or(config.theme()).unwrap_or("light"))
}

struct Watch {
    _debouncer: Debouncer<RecommendedWatcher>,
    changes: mpsc::Receiver<Vec<PathBuf>>,
}

/// Watch the page's directory. Editors often replace a file instead of
/// writing it in place, which a watch on the file itself would miss.
fn watch(file: &Path, ctx: egui::Context) -> anyhow::Result<Watch> {
    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(RELOAD_DEBOUNCE, move |result: DebounceEventResult| {
        match result {
            Ok(events) => {
                let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                if tx.send(paths).is_ok() {
                    ctx.request_repaint();
                }
            }
            Err(e) => warn!("File watcher error: {e}"),
        }
    })?;
    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    debouncer
        .watcher()
        .watch(dir, RecursiveMode::NonRecursive)?;
    debug!("Watching {} for changes", dir.display());
    Ok(Watch {
        _debouncer: debouncer,
        changes: rx,
    })
}

struct ShowApp {
    file: PathBuf,
    config: Config,
    overrides: Overrides,
    events: EventLoop,
    theme: Theme,
    images: ImageCache,
    watch: Option<Watch>,
    last_tick: Instant,
    toast: Option<Toast>,
    last_esc: Option<Instant>,
}

impl ShowApp {
    fn new(
        ctx: &egui::Context,
        file: PathBuf,
        page: Page,
        config: Config,
        overrides: Overrides,
    ) -> Self {
        let theme = resolve_theme(&page.meta, &config);
        let watch = match watch(&file, ctx.clone()) {
            Ok(watch) => Some(watch),
            Err(e) => {
                warn!("Live reload disabled: {e:#}");
                None
            }
        };
        let mut app = Self {
            file,
            config,
            overrides,
            events: EventLoop::new(Document::new()),
            theme,
            images: ImageCache::new(),
            watch,
            last_tick: Instant::now(),
            toast: None,
            last_esc: None,
        };
        app.install(ctx, page);
        app
    }

    /// Swap in a freshly parsed page and attach its slideshows.
    fn install(&mut self, ctx: &egui::Context, page: Page) {
        let settings = resolve_settings(&self.overrides, &page.meta, &self.config);
        let paths: Vec<PathBuf> = page.image_paths().into_iter().map(PathBuf::from).collect();
        self.images.preload(ctx, &paths);

        self.events.shutdown();
        let mut events = EventLoop::new(page.document);
        let attached = events.ready(&settings);
        if self.overrides.paused || self.config.start_paused() {
            events.pause_all();
        }
        info!(
            "Showing {} with {attached} slideshow(s), interval {} ms",
            self.file.display(),
            settings.interval.as_millis()
        );
        self.events = events;
        self.last_tick = Instant::now();
    }

    fn poll_changes(&mut self, ctx: &egui::Context) {
        let Some(watch) = &self.watch else { return };
        let page_name = self.file.file_name();
        let mut page_changed = false;
        let mut other_changed = false;
        while let Ok(paths) = watch.changes.try_recv() {
            for path in paths {
                if path.file_name() == page_name {
                    page_changed = true;
                } else {
                    other_changed = true;
                }
            }
        }

        if other_changed {
            debug!("Files next to the page changed, dropping cached images");
            self.images.clear();
        }
        if page_changed {
            self.reload(ctx);
        }
    }

    fn reload(&mut self, ctx: &egui::Context) {
        match markup::load(&self.file) {
            Ok(page) => {
                self.install(ctx, page);
                self.toast = Some(Toast::new("Reloaded".to_string()));
            }
            Err(e) => {
                warn!("Keeping the previous page: {e:#}");
                self.toast = Some(Toast::new(format!("Reload failed: {e:#}")));
            }
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.toast = Some(Toast::new(format!("Theme: {}", self.theme.name)));
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        // Viewport commands go out after the input closure returns.
        let mut viewport_cmds: Vec<egui::ViewportCommand> = Vec::new();

        ctx.input(|i| {
            if i.key_pressed(egui::Key::Q) {
                viewport_cmds.push(egui::ViewportCommand::Close);
                return;
            }

            if i.key_pressed(egui::Key::Escape) {
                if let Some(last) = self.last_esc {
                    if last.elapsed().as_secs_f32() < 1.0 {
                        viewport_cmds.push(egui::ViewportCommand::Close);
                        return;
                    }
                }
                self.last_esc = Some(Instant::now());
                self.toast = Some(Toast::new("Press Esc again to exit".to_string()));
                return;
            }

            if i.key_pressed(egui::Key::F) {
                viewport_cmds.push(egui::ViewportCommand::Fullscreen(
                    !i.viewport().fullscreen.unwrap_or(false),
                ));
                return;
            }

            if i.key_pressed(egui::Key::D) {
                self.toggle_theme();
            }
        });

        for cmd in viewport_cmds {
            ctx.send_viewport_cmd(cmd);
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context) {
        let (clicked, hover) = ctx.input(|i| (i.pointer.primary_clicked(), i.pointer.hover_pos()));
        let Some(pos) = hover else { return };

        let document = self.events.document();
        let interactive = document
            .hit_test(pos.x, pos.y)
            .is_some_and(|target| document.is_interactive(target));
        if interactive {
            ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
        }
        if !clicked {
            return;
        }
        let before = document.mutation_count();
        if self.events.click_at(pos.x, pos.y)
            && self.events.document().mutation_count() != before
        {
            ctx.request_repaint();
        }
    }

    fn draw_toast(&self, ui: &egui::Ui, rect: egui::Rect) {
        let Some(toast) = &self.toast else { return };
        let opacity = toast.opacity();
        if opacity <= 0.0 {
            return;
        }
        let color = Theme::with_opacity(self.theme.foreground, opacity * 0.9);
        let background = Theme::with_opacity(self.theme.button_background, opacity * 0.9);
        let galley = ui.painter().layout_no_wrap(
            toast.message.clone(),
            egui::FontId::proportional(18.0),
            color,
        );
        let padding = 14.0;
        let toast_rect = egui::Rect::from_min_size(
            egui::pos2(
                rect.center().x - galley.rect.width() / 2.0 - padding,
                rect.bottom() - 80.0,
            ),
            egui::vec2(
                galley.rect.width() + padding * 2.0,
                galley.rect.height() + padding * 2.0,
            ),
        );
        ui.painter().rect_filled(toast_rect, 8.0, background);
        ui.painter().galley(
            egui::pos2(toast_rect.left() + padding, toast_rect.top() + padding),
            galley,
            color,
        );
        ui.ctx().request_repaint();
    }
}

impl eframe::App for ShowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_changes(ctx);

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).min(MAX_FRAME_STEP);
        self.last_tick = now;
        self.events.advance(elapsed);

        self.handle_keys(ctx);

        if self.toast.as_ref().is_some_and(|t| t.is_expired()) {
            self.toast = None;
        }

        let bg = self.theme.background;
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(bg).inner_margin(0.0))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        render::paint_page(
                            ui,
                            self.events.document_mut(),
                            &self.theme,
                            &self.images,
                        );
                        if let Some(ScrollRequest::Bottom) =
                            self.events.document_mut().take_scroll_request()
                        {
                            let content = ui.min_rect();
                            let end = egui::Rect::from_min_max(
                                egui::pos2(content.left(), content.bottom() - 1.0),
                                content.max,
                            );
                            ui.scroll_to_rect(end, Some(egui::Align::BOTTOM));
                        }
                    });
                self.draw_toast(ui, rect);
            });

        self.handle_pointer(ctx);

        if let Some(due) = self.events.next_due_in() {
            ctx.request_repaint_after(due);
        }
    }
}

pub fn run(
    file: PathBuf,
    windowed: bool,
    paused: bool,
    interval_ms: Option<u64>,
) -> anyhow::Result<()> {
    let file = file.canonicalize().unwrap_or(file);
    let page = markup::load(&file)?;
    if page.slideshow_count() == 0 {
        warn!("{} has no slideshow block", file.display());
    }

    let title = page.meta.title.clone().unwrap_or_else(|| {
        format!(
            "trailshow \u{2014} {}",
            file.file_name().unwrap_or_default().to_string_lossy()
        )
    });

    let config = Config::load_or_default();
    let overrides = Overrides {
        interval_ms,
        paused,
    };

    let viewport = if windowed {
        egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title(&title)
    } else {
        egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_title(&title)
    };

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            Ok(Box::new(ShowApp::new(
                &cc.egui_ctx,
                file,
                page,
                config,
                overrides,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
