pub mod icons;

#[cfg(test)]
mod tests;

use std::time::Duration;

use log::debug;

use crate::page::{Document, ElementId, ListenerId, ScrollRequest};
use crate::runtime::timers::{TimerHandle, TimerQueue};
use crate::runtime::{Action, Binding, ControllerId, Propagation};
use icons::Icon;

pub const ROOT_CLASS: &str = "slideshow";
pub const SLIDE_CLASS: &str = "slide";
pub const ACTIVE_SLIDE_CLASS: &str = "active";
pub const HOLDER_CLASS: &str = "rhombus-trails";
pub const THUMB_CLASS: &str = "thumb";
pub const ACTIVE_THUMB_CLASS: &str = "active-thumb";
pub const ARROW_CLASS: &str = "thumb-arrow";
pub const TOGGLE_CLASS: &str = "autoplay-toggle";
pub const LABEL_CLASS: &str = "autoplay-label";
pub const TOGGLE_LABEL: &str = "Autoplay";

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(4000);
/// Half the width of the arrow glyph, so its tip lands on the thumb center.
pub const DEFAULT_ARROW_CORRECTION: f32 = 9.0;
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub interval: Duration,
    pub arrow_correction: f32,
    pub settle_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            arrow_correction: DEFAULT_ARROW_CORRECTION,
            settle_delay: SETTLE_DELAY,
        }
    }
}

/// Drives one slideshow root: active slide, thumbnail trail, arrow
/// indicator and the autoplay button.
///
/// Invariants once attached:
/// - with at least one slide, exactly the slide and the thumbnail at
///   `current` carry their active class;
/// - `timer` is `Some` iff rotation is scheduled, and the old handle is
///   always cleared before a new one is stored;
/// - the button's `aria-pressed` equals `!paused`.
#[derive(Debug)]
pub struct SlideshowController {
    id: ControllerId,
    root: ElementId,
    holder: ElementId,
    slides: Vec<ElementId>,
    thumbs: Vec<ElementId>,
    arrow: ElementId,
    toggle: ElementId,
    icon: ElementId,
    glyph: ElementId,
    current: usize,
    paused: bool,
    timer: Option<TimerHandle>,
    settle_timer: Option<TimerHandle>,
    listeners: Vec<(ElementId, ListenerId)>,
    settings: Settings,
}

impl SlideshowController {
    /// Build the thumbnails, arrow and button inside `root`'s holder and
    /// start rotating. `None` without touching anything when the root has no
    /// thumbnail holder.
    pub fn attach(
        id: ControllerId,
        root: ElementId,
        doc: &mut Document,
        timers: &mut TimerQueue,
        settings: Settings,
    ) -> Option<Self> {
        let Some(holder) = doc.query_selector(root, HOLDER_CLASS) else {
            debug!("Slideshow {root:?} has no .{HOLDER_CLASS} holder, leaving it alone");
            return None;
        };
        let slides = doc.query_selector_all(root, SLIDE_CLASS);
        let mut listeners = Vec::new();

        let mut thumbs = Vec::with_capacity(slides.len());
        for (i, &slide) in slides.iter().enumerate() {
            let thumb = doc.create_element("div");
            let image = doc.background_image(slide).map(str::to_string);
            doc.set_background_image(thumb, image.as_deref());
            doc.add_class(thumb, THUMB_CLASS);
            if i == 0 {
                doc.add_class(thumb, ACTIVE_THUMB_CLASS);
            }
            let binding = Binding {
                owner: id,
                action: Action::ShowSlide(i),
            };
            if let Some(listener) = doc.add_listener(thumb, binding) {
                listeners.push((thumb, listener));
            }
            doc.append_child(holder, thumb);
            thumbs.push(thumb);
        }

        let arrow = doc.create_element("div");
        doc.add_class(arrow, ARROW_CLASS);
        doc.set_attribute(arrow, "aria-hidden", "true");
        doc.set_pointer_events_none(arrow);
        doc.append_child(holder, arrow);

        let toggle = doc.create_element("button");
        doc.add_class(toggle, TOGGLE_CLASS);
        doc.set_attribute(toggle, "type", "button");
        let icon = doc.create_element("svg");
        doc.set_attribute(icon, "viewBox", icons::VIEW_BOX);
        doc.set_attribute(icon, "aria-hidden", "true");
        let glyph = doc.create_element("path");
        doc.append_child(icon, glyph);
        doc.append_child(toggle, icon);
        let label = doc.create_element("span");
        doc.add_class(label, LABEL_CLASS);
        doc.set_text(label, TOGGLE_LABEL);
        doc.append_child(toggle, label);
        let binding = Binding {
            owner: id,
            action: Action::ToggleAutoplay,
        };
        if let Some(listener) = doc.add_listener(toggle, binding) {
            listeners.push((toggle, listener));
        }
        doc.append_child(holder, toggle);

        let mut controller = Self {
            id,
            root,
            holder,
            slides,
            thumbs,
            arrow,
            toggle,
            icon,
            glyph,
            current: 0,
            paused: false,
            timer: None,
            settle_timer: None,
            listeners,
            settings,
        };

        for (i, &slide) in controller.slides.iter().enumerate() {
            if i == 0 {
                doc.add_class(slide, ACTIVE_SLIDE_CLASS);
            } else {
                doc.remove_class(slide, ACTIVE_SLIDE_CLASS);
            }
        }
        controller.refresh_toggle(doc);
        controller.settle_timer = Some(timers.set_timeout(
            controller.settings.settle_delay,
            controller.binding(Action::SettleLayout),
        ));
        controller.start_auto_transition(doc, timers);

        debug!(
            "Attached slideshow {:?} at {:?} with {} slides",
            controller.id,
            controller.root,
            controller.slides.len()
        );
        Some(controller)
    }

    fn binding(&self, action: Action) -> Binding {
        Binding {
            owner: self.id,
            action,
        }
    }

    /// Run one of this controller's named handlers.
    pub fn handle(
        &mut self,
        action: Action,
        doc: &mut Document,
        timers: &mut TimerQueue,
    ) -> Propagation {
        match action {
            Action::ShowSlide(index) => {
                self.show_slide(index, doc);
                self.pause_auto_transition(doc, timers);
                Propagation::Continue
            }
            Action::ToggleAutoplay => {
                self.toggle_autoplay(doc, timers);
                Propagation::Stop
            }
            Action::Advance => {
                self.advance(doc);
                Propagation::Continue
            }
            Action::SettleLayout => {
                self.settle_timer = None;
                doc.request_scroll(ScrollRequest::Bottom);
                self.position_arrow(doc);
                Propagation::Continue
            }
        }
    }

    /// Make slide `index` (and its thumbnail) the active one and move the
    /// arrow over it. Showing the current slide again changes nothing.
    pub fn show_slide(&mut self, index: usize, doc: &mut Document) {
        if index >= self.slides.len() {
            debug!(
                "Ignoring slide {index} for {:?}, it has {} slides",
                self.id,
                self.slides.len()
            );
            return;
        }
        doc.remove_class(self.slides[self.current], ACTIVE_SLIDE_CLASS);
        doc.remove_class(self.thumbs[self.current], ACTIVE_THUMB_CLASS);

        self.current = index;
        doc.add_class(self.slides[self.current], ACTIVE_SLIDE_CLASS);
        doc.add_class(self.thumbs[self.current], ACTIVE_THUMB_CLASS);
        self.position_arrow(doc);
    }

    fn advance(&mut self, doc: &mut Document) {
        if self.paused || self.slides.is_empty() {
            return;
        }
        let next = (self.current + 1) % self.slides.len();
        self.show_slide(next, doc);
    }

    /// Replace any scheduled rotation with a fresh interval.
    pub fn start_auto_transition(&mut self, doc: &mut Document, timers: &mut TimerQueue) {
        self.cancel_rotation(timers);
        self.timer = Some(timers.set_interval(
            self.settings.interval,
            self.binding(Action::Advance),
        ));
        self.refresh_toggle(doc);
    }

    pub fn pause_auto_transition(&mut self, doc: &mut Document, timers: &mut TimerQueue) {
        self.paused = true;
        self.cancel_rotation(timers);
        self.refresh_toggle(doc);
    }

    pub fn toggle_autoplay(&mut self, doc: &mut Document, timers: &mut TimerQueue) {
        if self.paused {
            self.paused = false;
            self.start_auto_transition(doc, timers);
        } else {
            self.paused = true;
            self.cancel_rotation(timers);
        }
        self.refresh_toggle(doc);
    }

    fn cancel_rotation(&mut self, timers: &mut TimerQueue) {
        if let Some(handle) = self.timer.take() {
            timers.clear(handle);
        }
    }

    /// Center the arrow over the active thumbnail, relative to the holder's
    /// left edge.
    pub fn position_arrow(&self, doc: &mut Document) {
        let Some(&thumb) = self.thumbs.get(self.current) else {
            return;
        };
        if !doc.contains(thumb) || !doc.contains(self.arrow) {
            return;
        }
        let holder = doc.bounding_rect(self.holder);
        let offset = doc.bounding_rect(thumb).center_x() - holder.left;
        doc.set_translate_x(self.arrow, offset - self.settings.arrow_correction);
    }

    fn refresh_toggle(&self, doc: &mut Document) {
        let icon = Icon::for_paused(self.paused);
        doc.set_attribute(self.icon, "data-icon", icon.name());
        doc.set_attribute(self.glyph, "d", icon.path_data());
        let pressed = if self.paused { "false" } else { "true" };
        doc.set_attribute(self.toggle, "aria-pressed", pressed);
    }

    /// Stop rotating and unregister every listener. The elements stay.
    pub fn detach(&mut self, doc: &mut Document, timers: &mut TimerQueue) {
        self.cancel_rotation(timers);
        if let Some(handle) = self.settle_timer.take() {
            timers.clear(handle);
        }
        for (element, listener) in self.listeners.drain(..) {
            doc.remove_listener(element, listener);
        }
        debug!("Detached slideshow {:?}", self.id);
    }
}

#[cfg(test)]
impl SlideshowController {
    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn holder(&self) -> ElementId {
        self.holder
    }

    pub fn slides(&self) -> &[ElementId] {
        &self.slides
    }

    pub fn thumbnails(&self) -> &[ElementId] {
        &self.thumbs
    }

    pub fn arrow(&self) -> ElementId {
        self.arrow
    }

    pub fn toggle(&self) -> ElementId {
        self.toggle
    }

    pub fn icon(&self) -> ElementId {
        self.icon
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_scheduled(&self) -> bool {
        self.timer.is_some()
    }
}
