use std::time::Duration;

use super::*;
use crate::page::Rect;
use crate::runtime::EventLoop;

const THUMB_WIDTH: f32 = 60.0;
const THUMB_GAP: f32 = 12.0;
const HOLDER_LEFT: f32 = 100.0;

/// A page with one slideshow root holding `count` slides and an empty
/// thumbnail holder, built the way page markup would lay it out.
fn page_with_slides(count: usize) -> Document {
    let mut doc = Document::new();
    let root = doc.create_element("div");
    doc.add_class(root, ROOT_CLASS);
    doc.append_child(doc.body(), root);
    for i in 0..count {
        let slide = doc.create_element("div");
        doc.add_class(slide, SLIDE_CLASS);
        doc.set_background_image(slide, Some(&format!("url('slide-{i}.jpg')")));
        doc.append_child(root, slide);
    }
    let holder = doc.create_element("div");
    doc.add_class(holder, HOLDER_CLASS);
    doc.append_child(root, holder);
    doc
}

/// Fake host layout: thumbnails in a row, button after them.
fn lay_out(events: &mut EventLoop) {
    let controller = &events.controllers()[0];
    let holder = controller.holder();
    let thumbs = controller.thumbnails().to_vec();
    let toggle = controller.toggle();
    let arrow = controller.arrow();
    let doc = events.document_mut();
    doc.set_rect(holder, Rect::new(HOLDER_LEFT, 500.0, 800.0, 90.0));
    let mut x = HOLDER_LEFT;
    for thumb in thumbs {
        doc.set_rect(thumb, Rect::new(x, 520.0, THUMB_WIDTH, THUMB_WIDTH));
        x += THUMB_WIDTH + THUMB_GAP;
    }
    doc.set_rect(toggle, Rect::new(x, 530.0, 120.0, 40.0));
    doc.set_rect(arrow, Rect::new(HOLDER_LEFT, 500.0, 18.0, 12.0));
}

fn started(count: usize) -> EventLoop {
    let mut events = EventLoop::new(page_with_slides(count));
    assert_eq!(events.ready(&Settings::default()), 1);
    lay_out(&mut events);
    events
}

fn controller(events: &EventLoop) -> &SlideshowController {
    &events.controllers()[0]
}

fn rotation_timers(events: &EventLoop) -> usize {
    events
        .timers()
        .count_where(|b| b.action == Action::Advance)
}

/// Indices of active slides and active thumbnails.
fn active(events: &EventLoop) -> (Vec<usize>, Vec<usize>) {
    let c = controller(events);
    let doc = events.document();
    let slides = c
        .slides()
        .iter()
        .enumerate()
        .filter(|(_, id)| doc.has_class(**id, ACTIVE_SLIDE_CLASS))
        .map(|(i, _)| i)
        .collect();
    let thumbs = c
        .thumbnails()
        .iter()
        .enumerate()
        .filter(|(_, id)| doc.has_class(**id, ACTIVE_THUMB_CLASS))
        .map(|(i, _)| i)
        .collect();
    (slides, thumbs)
}

fn pressed(events: &EventLoop) -> Option<String> {
    events
        .document()
        .attribute(controller(events).toggle(), "aria-pressed")
        .map(str::to_string)
}

fn icon(events: &EventLoop) -> Option<Icon> {
    events
        .document()
        .attribute(controller(events).icon(), "data-icon")
        .and_then(Icon::from_name)
}

fn assert_pressed_matches(events: &EventLoop) {
    let expected = (!controller(events).is_paused()).to_string();
    assert_eq!(pressed(events).as_deref(), Some(expected.as_str()));
}

fn tick(events: &mut EventLoop) {
    events.advance(DEFAULT_INTERVAL);
}

fn with_controller(
    events: &mut EventLoop,
    f: impl FnOnce(&mut SlideshowController, &mut Document, &mut TimerQueue),
) {
    events
        .operate(ControllerId(0), f)
        .expect("controller 0 is attached");
}

#[test]
fn test_attach_builds_trail() {
    let events = started(3);
    let c = controller(&events);
    let doc = events.document();

    assert_eq!(c.thumbnails().len(), 3);
    for (i, &thumb) in c.thumbnails().iter().enumerate() {
        assert!(doc.has_class(thumb, THUMB_CLASS));
        assert_eq!(
            doc.background_image(thumb),
            Some(format!("url('slide-{i}.jpg')").as_str())
        );
        assert_eq!(doc.element(thumb).unwrap().parent(), Some(c.holder()));
    }

    let arrow = doc.element(c.arrow()).unwrap();
    assert!(arrow.has_class(ARROW_CLASS));
    assert_eq!(arrow.attribute("aria-hidden"), Some("true"));
    assert!(arrow.style().pointer_events_none);
    assert!(doc.listeners(c.arrow()).is_empty());

    let toggle = doc.element(c.toggle()).unwrap();
    assert_eq!(toggle.tag(), "button");
    assert_eq!(toggle.attribute("type"), Some("button"));
    let label = doc.query_selector(c.toggle(), LABEL_CLASS).unwrap();
    assert_eq!(doc.element(label).unwrap().text(), Some(TOGGLE_LABEL));

    // Holder order: thumbnails, arrow, button.
    let children = doc.element(c.holder()).unwrap().children();
    assert_eq!(children.len(), 5);
    assert_eq!(children[3], c.arrow());
    assert_eq!(children[4], c.toggle());
}

#[test]
fn test_initial_state_is_running() {
    let events = started(3);
    assert_eq!(active(&events), (vec![0], vec![0]));
    assert!(!controller(&events).is_paused());
    assert!(controller(&events).is_scheduled());
    assert_eq!(rotation_timers(&events), 1);
    assert_eq!(pressed(&events).as_deref(), Some("true"));
    assert_eq!(icon(&events), Some(Icon::Pause));
}

#[test]
fn test_attach_normalizes_active_slide() {
    let mut doc = page_with_slides(3);
    let slides = doc.query_selector_all(doc.body(), SLIDE_CLASS);
    doc.add_class(slides[2], ACTIVE_SLIDE_CLASS);
    let mut events = EventLoop::new(doc);
    events.ready(&Settings::default());
    assert_eq!(active(&events), (vec![0], vec![0]));
}

#[test]
fn test_missing_root_is_a_no_op() {
    let mut doc = Document::new();
    let p = doc.create_element("p");
    doc.set_text(p, "No slideshow here");
    doc.append_child(doc.body(), p);
    let before = doc.mutation_count();

    let mut events = EventLoop::new(doc);
    assert_eq!(events.ready(&Settings::default()), 0);
    assert_eq!(events.document().mutation_count(), before);
    assert!(events.timers().is_empty());
}

#[test]
fn test_root_without_holder_is_a_no_op() {
    let mut doc = Document::new();
    let root = doc.create_element("div");
    doc.add_class(root, ROOT_CLASS);
    doc.append_child(doc.body(), root);
    let slide = doc.create_element("div");
    doc.add_class(slide, SLIDE_CLASS);
    doc.append_child(root, slide);
    let before = doc.mutation_count();

    let mut events = EventLoop::new(doc);
    assert_eq!(events.ready(&Settings::default()), 0);
    assert_eq!(events.document().mutation_count(), before);
    assert!(events.timers().is_empty());
}

#[test]
fn test_show_slide_marks_exactly_one() {
    let mut events = started(4);
    for i in [2, 0, 3, 1, 3] {
        with_controller(&mut events, |c, doc, _| c.show_slide(i, doc));
        assert_eq!(active(&events), (vec![i], vec![i]));
        assert_eq!(controller(&events).current(), i);
    }
}

#[test]
fn test_show_current_slide_is_idempotent() {
    let mut events = started(3);
    let snapshot = |events: &EventLoop| {
        let c = controller(events);
        let doc = events.document();
        let classes: Vec<Vec<String>> = c
            .slides()
            .iter()
            .chain(c.thumbnails())
            .map(|&id| doc.element(id).unwrap().classes().to_vec())
            .collect();
        (classes, doc.element(c.arrow()).unwrap().style().clone())
    };

    with_controller(&mut events, |c, doc, _| c.show_slide(1, doc));
    let once = snapshot(&events);
    with_controller(&mut events, |c, doc, _| c.show_slide(1, doc));
    assert_eq!(snapshot(&events), once);
    assert_eq!(active(&events), (vec![1], vec![1]));
}

#[test]
fn test_show_slide_out_of_range_is_ignored() {
    let mut events = started(3);
    let before = events.document().mutation_count();
    with_controller(&mut events, |c, doc, _| c.show_slide(3, doc));
    assert_eq!(events.document().mutation_count(), before);
    assert_eq!(active(&events), (vec![0], vec![0]));
}

#[test]
fn test_start_twice_keeps_one_timer() {
    let mut events = started(3);
    with_controller(&mut events, |c, doc, timers| {
        c.start_auto_transition(doc, timers);
        c.start_auto_transition(doc, timers);
    });
    assert_eq!(rotation_timers(&events), 1);

    // Only one advance per interval, not one per start call.
    tick(&mut events);
    assert_eq!(controller(&events).current(), 1);
}

#[test]
fn test_repeated_pause_leaves_no_timer() {
    let mut events = started(3);
    for _ in 0..3 {
        with_controller(&mut events, |c, doc, timers| {
            c.pause_auto_transition(doc, timers)
        });
        assert!(controller(&events).is_paused());
        assert!(!controller(&events).is_scheduled());
        assert_eq!(rotation_timers(&events), 0);
        assert_pressed_matches(&events);
    }
    events.advance(Duration::from_secs(60));
    assert_eq!(controller(&events).current(), 0);
}

#[test]
fn test_pressed_flag_tracks_paused() {
    let mut events = started(3);
    assert_pressed_matches(&events);

    let toggle = controller(&events).toggle();
    events.click(toggle);
    assert_pressed_matches(&events);
    assert_eq!(pressed(&events).as_deref(), Some("false"));
    assert_eq!(icon(&events), Some(Icon::Play));

    events.click(toggle);
    assert_pressed_matches(&events);
    assert_eq!(icon(&events), Some(Icon::Pause));

    let thumb = controller(&events).thumbnails()[1];
    events.click(thumb);
    assert_pressed_matches(&events);

    tick(&mut events);
    assert_pressed_matches(&events);
}

#[test]
fn test_end_to_end_rotation_and_interaction() {
    let mut events = started(3);
    assert_eq!(active(&events).0, vec![0]);

    let mut seen = vec![controller(&events).current()];
    for _ in 0..3 {
        tick(&mut events);
        seen.push(controller(&events).current());
    }
    assert_eq!(seen, vec![0, 1, 2, 0]);

    let thumb = controller(&events).thumbnails()[2];
    assert!(events.click(thumb));
    assert_eq!(active(&events), (vec![2], vec![2]));
    assert!(controller(&events).is_paused());
    assert_eq!(rotation_timers(&events), 0);
    assert_eq!(icon(&events), Some(Icon::Play));
    assert_eq!(pressed(&events).as_deref(), Some("false"));

    events.advance(Duration::from_secs(20));
    assert_eq!(controller(&events).current(), 2);

    let toggle = controller(&events).toggle();
    assert!(events.click(toggle));
    assert!(!controller(&events).is_paused());
    assert_eq!(rotation_timers(&events), 1);
    assert_eq!(controller(&events).current(), 2);

    tick(&mut events);
    assert_eq!(active(&events), (vec![0], vec![0]));
}

#[test]
fn test_resume_restarts_full_interval() {
    let mut events = started(3);
    events.advance(Duration::from_millis(3000));
    let toggle = controller(&events).toggle();
    events.click(toggle);
    events.click(toggle);
    events.advance(Duration::from_millis(3999));
    assert_eq!(controller(&events).current(), 0);
    events.advance(Duration::from_millis(1));
    assert_eq!(controller(&events).current(), 1);
}

#[test]
fn test_toggle_click_does_not_bubble() {
    let mut events = started(3);
    let holder = controller(&events).holder();
    let toggle = controller(&events).toggle();
    // An ancestor listener that would jump to slide 2 if the click reached it.
    events.document_mut().add_listener(
        holder,
        Binding {
            owner: ControllerId(0),
            action: Action::ShowSlide(2),
        },
    );

    events.click(toggle);
    assert_eq!(controller(&events).current(), 0);
    assert!(controller(&events).is_paused());

    // A thumbnail click does bubble.
    let thumb = controller(&events).thumbnails()[1];
    events.click(thumb);
    assert_eq!(controller(&events).current(), 2);
}

#[test]
fn test_click_at_hits_thumbnail_not_arrow() {
    let mut events = started(3);
    events.advance(SETTLE_DELAY);
    let second = events
        .document()
        .bounding_rect(controller(&events).thumbnails()[1]);
    assert!(events.click_at(second.center_x(), second.top + 5.0));
    assert_eq!(controller(&events).current(), 1);

    // The arrow sits over the holder but never takes the click.
    let arrow = events.document().bounding_rect(controller(&events).arrow());
    assert!(!events.click_at(arrow.left + 1.0, arrow.top + 1.0));
}

#[test]
fn test_arrow_offset_follows_active_thumbnail() {
    let mut events = started(3);
    let arrow = controller(&events).arrow();
    let translate = |events: &EventLoop| {
        events
            .document()
            .element(arrow)
            .unwrap()
            .style()
            .translate_x
    };

    // Nothing positioned until layout has settled.
    assert_eq!(translate(&events), None);
    events.advance(SETTLE_DELAY);
    assert_eq!(
        translate(&events),
        Some(THUMB_WIDTH / 2.0 - DEFAULT_ARROW_CORRECTION)
    );

    let thumb = controller(&events).thumbnails()[2];
    events.click(thumb);
    let center = 2.0 * (THUMB_WIDTH + THUMB_GAP) + THUMB_WIDTH / 2.0;
    assert_eq!(translate(&events), Some(center - DEFAULT_ARROW_CORRECTION));
    assert_eq!(
        events
            .document()
            .element(arrow)
            .unwrap()
            .style()
            .transform()
            .as_deref(),
        Some("translateX(165px)")
    );
}

#[test]
fn test_settle_pass_requests_scroll_once() {
    let mut events = started(2);
    assert_eq!(events.document_mut().take_scroll_request(), None);
    events.advance(SETTLE_DELAY);
    assert_eq!(
        events.document_mut().take_scroll_request(),
        Some(ScrollRequest::Bottom)
    );
    events.advance(Duration::from_secs(30));
    assert_eq!(events.document_mut().take_scroll_request(), None);
}

#[test]
fn test_zero_slides_still_builds_controls() {
    let mut events = EventLoop::new(page_with_slides(0));
    assert_eq!(events.ready(&Settings::default()), 1);
    let c = controller(&events);
    assert!(c.thumbnails().is_empty());
    assert!(events.document().contains(c.toggle()));
    assert_eq!(events.advance(Duration::from_secs(10)), 3);
    assert_eq!(controller(&events).current(), 0);
}

#[test]
fn test_custom_interval() {
    let mut events = EventLoop::new(page_with_slides(3));
    let settings = Settings {
        interval: Duration::from_millis(1500),
        ..Settings::default()
    };
    events.ready(&settings);
    events.advance(Duration::from_millis(3000));
    assert_eq!(controller(&events).current(), 2);
}

#[test]
fn test_detach_removes_listeners_and_timers() {
    let mut events = started(3);
    with_controller(&mut events, |c, doc, timers| c.detach(doc, timers));
    assert!(events.timers().is_empty());
    assert_eq!(events.document().listener_count(), 0);
    assert!(!controller(&events).is_scheduled());

    // Elements stay on the page but no longer react.
    let thumb = controller(&events).thumbnails()[2];
    assert!(events.document().contains(thumb));
    assert!(!events.click(thumb));
    events.advance(Duration::from_secs(30));
    assert_eq!(controller(&events).current(), 0);
}
