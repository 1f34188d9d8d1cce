pub mod image_cache;

use std::path::Path;

use eframe::egui::{self, Color32, FontId, Pos2, Stroke, pos2, vec2};

use crate::page::{Document, ElementId, Rect, css_url};
use crate::slideshow::icons::Icon;
use crate::slideshow::{
    ACTIVE_SLIDE_CLASS, ACTIVE_THUMB_CLASS, ARROW_CLASS, HOLDER_CLASS, LABEL_CLASS, ROOT_CLASS,
    SLIDE_CLASS, THUMB_CLASS, TOGGLE_CLASS,
};
use crate::theme::Theme;
pub use image_cache::ImageCache;

const PAGE_MARGIN: f32 = 40.0;
const MIN_CONTENT_WIDTH: f32 = 240.0;
const MAX_CONTENT_WIDTH: f32 = 1100.0;
const BLOCK_GAP: f32 = 20.0;
const STAGE_ASPECT: f32 = 9.0 / 16.0;
const CORNER_RADIUS: f32 = 6.0;

const THUMB_SIZE: f32 = 64.0;
const MIN_THUMB_SIZE: f32 = 24.0;
const THUMB_GAP: f32 = 12.0;

/// Twice the default arrow correction, so the tip sits on the thumb center.
const ARROW_WIDTH: f32 = 18.0;
const ARROW_HEIGHT: f32 = 10.0;
/// Strip above the thumbnails the arrow travels in.
const ARROW_BAND: f32 = 16.0;

const BUTTON_HEIGHT: f32 = 34.0;
const BUTTON_PADDING: f32 = 12.0;
const ICON_SIZE: f32 = 16.0;

fn to_page_rect(r: egui::Rect) -> Rect {
    Rect::new(r.left(), r.top(), r.width(), r.height())
}

/// Lay the page out top to bottom and paint it. Every element's box is
/// written back into the document, so hit testing and arrow placement work
/// against what is on screen this frame.
pub fn paint_page(ui: &mut egui::Ui, doc: &mut Document, theme: &Theme, images: &ImageCache) {
    let available = ui.available_width();
    let width = (available - 2.0 * PAGE_MARGIN).clamp(MIN_CONTENT_WIDTH, MAX_CONTENT_WIDTH);
    let left = ui.max_rect().left() + ((available - width) / 2.0).max(0.0);

    ui.add_space(PAGE_MARGIN);
    for child in children(doc, doc.body()) {
        let Some(element) = doc.element(child) else {
            continue;
        };
        let tag = element.tag().to_string();
        let is_slideshow = element.has_class(ROOT_CLASS);

        match tag.as_str() {
            "p" => paint_text(ui, doc, child, left, width, theme.body_size, theme.foreground),
            "div" if is_slideshow => paint_slideshow(ui, doc, child, left, width, theme, images),
            _ => match heading_level(&tag) {
                Some(level) => paint_text(
                    ui,
                    doc,
                    child,
                    left,
                    width,
                    theme.heading_size(level),
                    theme.heading_color,
                ),
                None => continue,
            },
        }
        ui.add_space(BLOCK_GAP);
    }
    ui.add_space(PAGE_MARGIN);
}

fn heading_level(tag: &str) -> Option<u8> {
    tag.strip_prefix('h')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=6).contains(n))
}

fn children(doc: &Document, id: ElementId) -> Vec<ElementId> {
    doc.element(id)
        .map(|e| e.children().to_vec())
        .unwrap_or_default()
}

/// Reserve a full-width row in the layout and return it.
fn allocate_row(ui: &mut egui::Ui, height: f32) -> egui::Rect {
    let (rect, _) =
        ui.allocate_exact_size(vec2(ui.available_width(), height), egui::Sense::hover());
    rect
}

fn paint_text(
    ui: &mut egui::Ui,
    doc: &mut Document,
    id: ElementId,
    left: f32,
    width: f32,
    size: f32,
    color: Color32,
) {
    let text = doc
        .element(id)
        .and_then(|e| e.text())
        .unwrap_or_default()
        .to_string();
    let galley = ui
        .painter()
        .layout(text, FontId::proportional(size), color, width);
    let row = allocate_row(ui, galley.rect.height());
    let rect = egui::Rect::from_min_size(pos2(left, row.top()), galley.rect.size());
    ui.painter().galley(rect.min, galley, color);
    doc.set_rect(id, to_page_rect(rect));
}

fn paint_slideshow(
    ui: &mut egui::Ui,
    doc: &mut Document,
    root: ElementId,
    left: f32,
    width: f32,
    theme: &Theme,
    images: &ImageCache,
) {
    let visible = ui.clip_rect().height();
    let stage_height = (width * STAGE_ASPECT).min(visible * 0.7).max(120.0);
    let row = allocate_row(ui, stage_height);
    let stage = egui::Rect::from_min_size(pos2(left, row.top()), vec2(width, stage_height));
    ui.painter()
        .rect_filled(stage, CORNER_RADIUS, theme.stage_background);

    for slide in doc.query_selector_all(root, SLIDE_CLASS) {
        doc.set_rect(slide, to_page_rect(stage));
        if doc.has_class(slide, ACTIVE_SLIDE_CLASS) {
            paint_slide(ui, doc, slide, stage, theme, images);
        }
    }

    let mut bounds = stage;
    if let Some(holder) = doc.query_selector(root, HOLDER_CLASS) {
        ui.add_space(BLOCK_GAP / 2.0);
        bounds = bounds.union(paint_trail(ui, doc, holder, left, width, theme, images));
    }
    doc.set_rect(root, to_page_rect(bounds));
}

fn paint_slide(
    ui: &egui::Ui,
    doc: &Document,
    slide: ElementId,
    stage: egui::Rect,
    theme: &Theme,
    images: &ImageCache,
) {
    let painter = ui.painter_at(stage);
    let path = doc.background_image(slide).and_then(css_url);

    match path
        .as_deref()
        .and_then(|p| images.get(ui.ctx(), Path::new(p)))
    {
        Some(texture) => {
            let uv = cover_uv(stage, texture.size_vec2());
            painter.image(texture.id(), stage, uv, Color32::WHITE);
        }
        None => {
            let message = match &path {
                Some(p) => format!("Image not found\n{p}"),
                None => "No image".to_string(),
            };
            painter.text(
                stage.center(),
                egui::Align2::CENTER_CENTER,
                message,
                FontId::proportional(theme.body_size),
                Theme::with_opacity(theme.foreground, 0.6),
            );
        }
    }

    if let Some(caption) = doc.attribute(slide, "aria-label") {
        let padding = 12.0;
        let galley = painter.layout(
            caption.to_string(),
            FontId::proportional(theme.body_size),
            Color32::WHITE,
            stage.width() - 2.0 * padding,
        );
        let band = egui::Rect::from_min_max(
            pos2(stage.left(), stage.bottom() - galley.rect.height() - 2.0 * padding),
            stage.max,
        );
        painter.rect_filled(band, 0.0, Theme::with_opacity(Color32::BLACK, 0.55));
        painter.galley(
            pos2(band.left() + padding, band.top() + padding),
            galley,
            Color32::WHITE,
        );
    }
}

/// Thumbnails left to right, then the autoplay button, with the arrow in a
/// strip above them. Returns the holder's box.
fn paint_trail(
    ui: &mut egui::Ui,
    doc: &mut Document,
    holder: ElementId,
    left: f32,
    width: f32,
    theme: &Theme,
    images: &ImageCache,
) -> egui::Rect {
    let items = children(doc, holder);
    let thumbs: Vec<ElementId> = items
        .iter()
        .copied()
        .filter(|id| doc.has_class(*id, THUMB_CLASS))
        .collect();
    let toggle = items
        .iter()
        .copied()
        .find(|id| doc.has_class(*id, TOGGLE_CLASS));
    let arrow = items.iter().copied().find(|id| doc.has_class(*id, ARROW_CLASS));

    let label = toggle
        .and_then(|t| doc.query_selector(t, LABEL_CLASS))
        .and_then(|l| doc.element(l))
        .and_then(|e| e.text())
        .unwrap_or_default()
        .to_string();
    let label_galley = ui.painter().layout_no_wrap(
        label,
        FontId::proportional(theme.body_size * 0.85),
        theme.button_foreground,
    );
    let button_width = match toggle {
        Some(_) => 3.0 * BUTTON_PADDING + ICON_SIZE + label_galley.rect.width(),
        None => 0.0,
    };

    let size = thumb_size(thumbs.len(), width - button_width - 2.0 * THUMB_GAP);
    let row_height = ARROW_BAND + size.max(BUTTON_HEIGHT);
    let row = allocate_row(ui, row_height);
    let holder_rect = egui::Rect::from_min_size(pos2(left, row.top()), vec2(width, row_height));
    doc.set_rect(holder, to_page_rect(holder_rect));

    let band_top = holder_rect.top() + ARROW_BAND;
    let band_center = band_top + size.max(BUTTON_HEIGHT) / 2.0;
    let mut x = left;
    for thumb in &thumbs {
        let cell = egui::Rect::from_min_size(pos2(x, band_center - size / 2.0), vec2(size, size));
        paint_thumb(ui, doc, *thumb, cell, theme, images);
        doc.set_rect(*thumb, to_page_rect(cell));
        x += size + THUMB_GAP;
    }

    if let Some(arrow) = arrow {
        paint_arrow(ui, doc, arrow, holder_rect, theme);
    }

    if let Some(toggle) = toggle {
        let button_left = if thumbs.is_empty() { left } else { x + THUMB_GAP };
        let button = egui::Rect::from_min_size(
            pos2(button_left, band_center - BUTTON_HEIGHT / 2.0),
            vec2(button_width, BUTTON_HEIGHT),
        );
        paint_toggle(ui, doc, toggle, button, label_galley, theme);
    }

    holder_rect
}

/// Thumbnail side that fits `count` thumbnails into `room`, within bounds.
fn thumb_size(count: usize, room: f32) -> f32 {
    if count == 0 {
        return THUMB_SIZE;
    }
    let n = count as f32;
    ((room - THUMB_GAP * (n - 1.0)) / n).clamp(MIN_THUMB_SIZE, THUMB_SIZE)
}

/// Corners of the diamond inscribed in `cell`: top, right, bottom, left.
fn rhombus(cell: egui::Rect) -> [Pos2; 4] {
    let c = cell.center();
    [
        pos2(c.x, cell.top()),
        pos2(cell.right(), c.y),
        pos2(c.x, cell.bottom()),
        pos2(cell.left(), c.y),
    ]
}

fn paint_thumb(
    ui: &egui::Ui,
    doc: &Document,
    thumb: ElementId,
    cell: egui::Rect,
    theme: &Theme,
    images: &ImageCache,
) {
    let active = doc.has_class(thumb, ACTIVE_THUMB_CLASS);
    let points = rhombus(cell);
    let texture = doc
        .background_image(thumb)
        .and_then(css_url)
        .and_then(|p| images.get(ui.ctx(), Path::new(p.as_ref())));

    match texture {
        Some(texture) => {
            let uv = cover_uv(cell, texture.size_vec2());
            let tint = if active {
                Color32::WHITE
            } else {
                Theme::with_opacity(Color32::WHITE, 0.6)
            };
            let mut mesh = egui::Mesh::with_texture(texture.id());
            for (pos, uv) in points.iter().zip(rhombus(uv)) {
                mesh.vertices.push(egui::epaint::Vertex {
                    pos: *pos,
                    uv,
                    color: tint,
                });
            }
            mesh.add_triangle(0, 1, 2);
            mesh.add_triangle(0, 2, 3);
            ui.painter().add(egui::Shape::mesh(mesh));
        }
        None => {
            ui.painter().add(egui::Shape::convex_polygon(
                points.to_vec(),
                theme.stage_background,
                Stroke::NONE,
            ));
        }
    }

    if active {
        ui.painter().add(egui::Shape::closed_line(
            points.to_vec(),
            Stroke::new(2.5, theme.accent),
        ));
    }
}

fn paint_arrow(
    ui: &egui::Ui,
    doc: &mut Document,
    arrow: ElementId,
    holder: egui::Rect,
    theme: &Theme,
) {
    let offset = doc.element(arrow).and_then(|e| e.style().translate_x);
    let top = holder.top() + (ARROW_BAND - ARROW_HEIGHT) / 2.0;
    let rect = egui::Rect::from_min_size(
        pos2(holder.left() + offset.unwrap_or(0.0), top),
        vec2(ARROW_WIDTH, ARROW_HEIGHT),
    );
    doc.set_rect(arrow, to_page_rect(rect));

    // Not placed until the first layout has settled.
    if offset.is_none() {
        return;
    }
    ui.painter().add(egui::Shape::convex_polygon(
        vec![rect.left_top(), rect.right_top(), rect.center_bottom()],
        theme.accent,
        Stroke::NONE,
    ));
}

fn paint_toggle(
    ui: &egui::Ui,
    doc: &mut Document,
    toggle: ElementId,
    button: egui::Rect,
    label: std::sync::Arc<egui::Galley>,
    theme: &Theme,
) {
    let pressed = doc.attribute(toggle, "aria-pressed") == Some("true");
    let painter = ui.painter();
    painter.rect_filled(button, CORNER_RADIUS, theme.button_background);
    let stroke = if pressed {
        Stroke::new(2.0, theme.accent)
    } else {
        Stroke::new(1.0, Theme::with_opacity(theme.button_foreground, 0.3))
    };
    painter.rect_stroke(button, CORNER_RADIUS, stroke, egui::StrokeKind::Inside);
    doc.set_rect(toggle, to_page_rect(button));

    let icon_rect = egui::Rect::from_min_size(
        pos2(
            button.left() + BUTTON_PADDING,
            button.center().y - ICON_SIZE / 2.0,
        ),
        vec2(ICON_SIZE, ICON_SIZE),
    );
    let label_rect = egui::Rect::from_min_size(
        pos2(
            icon_rect.right() + BUTTON_PADDING,
            button.center().y - label.rect.height() / 2.0,
        ),
        label.rect.size(),
    );

    for child in children(doc, toggle) {
        if doc.has_class(child, LABEL_CLASS) {
            doc.set_rect(child, to_page_rect(label_rect));
            continue;
        }
        let icon = doc.attribute(child, "data-icon").and_then(Icon::from_name);
        if let Some(icon) = icon {
            for polygon in icon.polygons() {
                let points = polygon
                    .iter()
                    .map(|[x, y]| {
                        pos2(
                            icon_rect.left() + x * icon_rect.width(),
                            icon_rect.top() + y * icon_rect.height(),
                        )
                    })
                    .collect();
                painter.add(egui::Shape::convex_polygon(
                    points,
                    theme.button_foreground,
                    Stroke::NONE,
                ));
            }
        }
        doc.set_rect(child, to_page_rect(icon_rect));
        for glyph in children(doc, child) {
            doc.set_rect(glyph, to_page_rect(icon_rect));
        }
    }

    painter.galley(label_rect.min, label, theme.button_foreground);
}

/// Portion of an image, in texture coordinates, that covers `target`
/// without distortion, centered. Mirrors `background-size: cover`.
fn cover_uv(target: egui::Rect, image: egui::Vec2) -> egui::Rect {
    let full = egui::Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
    if target.width() <= 0.0 || target.height() <= 0.0 || image.x <= 0.0 || image.y <= 0.0 {
        return full;
    }
    let target_aspect = target.width() / target.height();
    let image_aspect = image.x / image.y;
    if image_aspect > target_aspect {
        let margin = (1.0 - target_aspect / image_aspect) / 2.0;
        egui::Rect::from_min_max(pos2(margin, 0.0), pos2(1.0 - margin, 1.0))
    } else {
        let margin = (1.0 - image_aspect / target_aspect) / 2.0;
        egui::Rect::from_min_max(pos2(0.0, margin), pos2(1.0, 1.0 - margin))
    }
}
