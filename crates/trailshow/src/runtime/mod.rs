pub mod timers;

use std::time::Duration;

use log::{debug, trace};

use crate::page::{Document, ElementId};
use crate::slideshow::{ROOT_CLASS, Settings, SlideshowController};
use timers::TimerQueue;

/// Position of a controller inside its [`EventLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub usize);

/// The named handlers a controller exposes to the page and the timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Thumbnail click: jump to the slide and pause.
    ShowSlide(usize),
    /// Autoplay button click.
    ToggleAutoplay,
    /// Autoplay interval firing.
    Advance,
    /// One-shot pass once the first layout has settled.
    SettleLayout,
}

/// Stable handler identity stored on listeners and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub owner: ControllerId,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Single-threaded dispatcher: owns the page, the timers and every
/// controller attached to the page. Each event runs to completion before the
/// next one is looked at.
pub struct EventLoop {
    document: Document,
    timers: TimerQueue,
    controllers: Vec<SlideshowController>,
}

impl EventLoop {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            timers: TimerQueue::new(),
            controllers: Vec::new(),
        }
    }

    /// The page is ready: attach one controller per slideshow root.
    /// Returns how many were attached.
    pub fn ready(&mut self, settings: &Settings) -> usize {
        let roots = self
            .document
            .query_selector_all(self.document.body(), ROOT_CLASS);
        if roots.is_empty() {
            debug!("No slideshow on this page");
        }
        for root in roots {
            let id = ControllerId(self.controllers.len());
            if let Some(controller) = SlideshowController::attach(
                id,
                root,
                &mut self.document,
                &mut self.timers,
                settings.clone(),
            ) {
                self.controllers.push(controller);
            }
        }
        self.controllers.len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    #[cfg(test)]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    #[cfg(test)]
    pub fn controllers(&self) -> &[SlideshowController] {
        &self.controllers
    }

    /// Deliver a click to `target` and bubble it up through its ancestors.
    /// Returns true if any listener ran.
    pub fn click(&mut self, target: ElementId) -> bool {
        let mut handled = false;
        for element in self.document.bubble_path(target) {
            let mut stopped = false;
            for binding in self.document.listeners(element) {
                handled = true;
                if self.dispatch(binding) == Propagation::Stop {
                    stopped = true;
                }
            }
            if stopped {
                break;
            }
        }
        handled
    }

    /// Hit test a point in host coordinates and click whatever is there.
    pub fn click_at(&mut self, x: f32, y: f32) -> bool {
        match self.document.hit_test(x, y) {
            Some(target) => self.click(target),
            None => false,
        }
    }

    /// Advance virtual time, firing due timers in order. Returns the number
    /// of firings.
    pub fn advance(&mut self, elapsed: Duration) -> usize {
        let until = self.timers.now() + elapsed;
        let mut fired = 0;
        while let Some((handle, binding)) = self.timers.pop_due(until) {
            trace!("Timer {handle:?} fired for {binding:?}");
            self.dispatch(binding);
            fired += 1;
        }
        self.timers.settle(until);
        fired
    }

    pub fn next_due_in(&self) -> Option<Duration> {
        self.timers
            .next_due()
            .map(|due| due.saturating_sub(self.timers.now()))
    }

    /// Run an operation on one controller with the page and timers it
    /// works against.
    #[cfg(test)]
    pub fn operate<R>(
        &mut self,
        id: ControllerId,
        f: impl FnOnce(&mut SlideshowController, &mut Document, &mut TimerQueue) -> R,
    ) -> Option<R> {
        let controller = self.controllers.get_mut(id.0)?;
        Some(f(controller, &mut self.document, &mut self.timers))
    }

    /// Explicit pause on every controller.
    pub fn pause_all(&mut self) {
        for controller in &mut self.controllers {
            controller.pause_auto_transition(&mut self.document, &mut self.timers);
        }
    }

    /// Detach every controller: timers cancelled, listeners removed.
    pub fn shutdown(&mut self) {
        for controller in &mut self.controllers {
            controller.detach(&mut self.document, &mut self.timers);
        }
        self.controllers.clear();
    }

    fn dispatch(&mut self, binding: Binding) -> Propagation {
        match self.controllers.get_mut(binding.owner.0) {
            Some(controller) => {
                controller.handle(binding.action, &mut self.document, &mut self.timers)
            }
            None => Propagation::Continue,
        }
    }
}
