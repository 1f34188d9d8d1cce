pub mod markup;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::runtime::Binding;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*url\(\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)"|([^'"\s)]+))\s*\)\s*$"#,
    )
    .unwrap()
});

/// Index of an element in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// Identifies one registered listener so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Axis-aligned box in logical pixels, the same space the host paints in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.left + self.width / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        !self.is_empty() && x >= self.left && x < self.right() && y >= self.top && y < self.bottom()
    }
}

/// The inline style properties the page model understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub background_image: Option<String>,
    pub translate_x: Option<f32>,
    pub pointer_events_none: bool,
}

impl Style {
    /// CSS text of the transform, e.g. `translateX(42px)`.
    #[cfg(test)]
    pub fn transform(&self) -> Option<String> {
        self.translate_x.map(|x| format!("translateX({x}px)"))
    }
}

/// Extract the target of a `url(...)` value such as `url('images/a.jpg')`.
/// Backslash escapes inside a quoted target are resolved.
pub fn css_url(value: &str) -> Option<Cow<'_, str>> {
    let caps = CSS_URL.captures(value)?;
    if let Some(bare) = caps.get(3) {
        return Some(Cow::Borrowed(bare.as_str()));
    }
    let quoted = caps.get(1).or_else(|| caps.get(2))?.as_str();
    if !quoted.contains('\\') {
        return Some(Cow::Borrowed(quoted));
    }
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    Some(Cow::Owned(out))
}

/// Wrap a path as a `url(...)` value that [`css_url`] reads back unchanged,
/// whatever quotes or backslashes the path contains.
pub fn css_url_value(path: &str) -> String {
    if !path.contains('\\') {
        if !path.contains('\'') {
            return format!("url('{path}')");
        }
        if !path.contains('"') {
            return format!("url(\"{path}\")");
        }
    }
    let escaped = path.replace('\\', "\\\\").replace('"', "\\\"");
    format!("url(\"{escaped}\")")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollRequest {
    /// Reveal the end of the page.
    Bottom,
}

#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: Style,
    text: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    rect: Rect,
    listeners: Vec<(ListenerId, Binding)>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            style: Style::default(),
            text: None,
            parent: None,
            children: Vec::new(),
            rect: Rect::default(),
            listeners: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[cfg(test)]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    #[cfg(test)]
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}

/// A retained, DOM-like element tree.
///
/// Every change a page script could observe (structure, classes, attributes,
/// inline style, text, listeners) bumps [`Document::mutation_count`].
/// Geometry written back by the host layout does not, since it is not a
/// change to the page itself.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
    next_listener: u64,
    mutations: u64,
    scroll_request: Option<ScrollRequest>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            elements: vec![Element::new("body")],
            next_listener: 0,
            mutations: 0,
            scroll_request: None,
        }
    }

    pub fn body(&self) -> ElementId {
        ElementId(0)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        id.0 < self.elements.len()
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.elements.push(Element::new(tag));
        self.mutations += 1;
        ElementId(self.elements.len() - 1)
    }

    /// Append `child` as the last child of `parent`, moving it if it already
    /// has a parent.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        if let Some(old) = self.elements[child.0].parent {
            self.elements[old.0].children.retain(|&c| c != child);
        }
        self.elements[child.0].parent = Some(parent);
        self.elements[parent.0].children.push(child);
        self.mutations += 1;
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(el) = self.elements.get_mut(id.0) {
            if !el.has_class(class) {
                el.classes.push(class.to_string());
                self.mutations += 1;
            }
        }
    }

    pub fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(el) = self.elements.get_mut(id.0) {
            let before = el.classes.len();
            el.classes.retain(|c| c != class);
            if el.classes.len() != before {
                self.mutations += 1;
            }
        }
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(el) = self.elements.get_mut(id.0) {
            if el.attribute(name) != Some(value) {
                el.attributes.insert(name.to_string(), value.to_string());
                self.mutations += 1;
            }
        }
    }

    pub fn set_text(&mut self, id: ElementId, text: &str) {
        if let Some(el) = self.elements.get_mut(id.0) {
            if el.text.as_deref() != Some(text) {
                el.text = Some(text.to_string());
                self.mutations += 1;
            }
        }
    }

    pub fn background_image(&self, id: ElementId) -> Option<&str> {
        self.element(id)
            .and_then(|e| e.style.background_image.as_deref())
    }

    pub fn set_background_image(&mut self, id: ElementId, value: Option<&str>) {
        if let Some(el) = self.elements.get_mut(id.0) {
            if el.style.background_image.as_deref() != value {
                el.style.background_image = value.map(str::to_string);
                self.mutations += 1;
            }
        }
    }

    pub fn set_translate_x(&mut self, id: ElementId, x: f32) {
        if let Some(el) = self.elements.get_mut(id.0) {
            if el.style.translate_x != Some(x) {
                el.style.translate_x = Some(x);
                self.mutations += 1;
            }
        }
    }

    pub fn set_pointer_events_none(&mut self, id: ElementId) {
        if let Some(el) = self.elements.get_mut(id.0) {
            if !el.style.pointer_events_none {
                el.style.pointer_events_none = true;
                self.mutations += 1;
            }
        }
    }

    /// Current box of an element as last reported by the host layout.
    pub fn bounding_rect(&self, id: ElementId) -> Rect {
        self.element(id).map(|e| e.rect).unwrap_or_default()
    }

    pub fn set_rect(&mut self, id: ElementId, rect: Rect) {
        if let Some(el) = self.elements.get_mut(id.0) {
            el.rect = rect;
        }
    }

    /// Descendants of `scope` in document order, `scope` itself excluded.
    pub fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let Some(el) = self.element(scope) else {
            return out;
        };
        let mut stack: Vec<ElementId> = el.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.elements[id.0].children.iter().rev().copied());
        }
        out
    }

    /// First descendant of `scope` carrying `class`.
    pub fn query_selector(&self, scope: ElementId, class: &str) -> Option<ElementId> {
        self.descendants(scope)
            .into_iter()
            .find(|&id| self.has_class(id, class))
    }

    /// All descendants of `scope` carrying `class`, in document order.
    pub fn query_selector_all(&self, scope: ElementId, class: &str) -> Vec<ElementId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.has_class(id, class))
            .collect()
    }

    pub fn add_listener(&mut self, id: ElementId, binding: Binding) -> Option<ListenerId> {
        let el = self.elements.get_mut(id.0)?;
        let listener = ListenerId(self.next_listener);
        self.next_listener += 1;
        el.listeners.push((listener, binding));
        self.mutations += 1;
        Some(listener)
    }

    pub fn remove_listener(&mut self, id: ElementId, listener: ListenerId) -> bool {
        let Some(el) = self.elements.get_mut(id.0) else {
            return false;
        };
        let before = el.listeners.len();
        el.listeners.retain(|(l, _)| *l != listener);
        let removed = el.listeners.len() != before;
        if removed {
            self.mutations += 1;
        }
        removed
    }

    pub fn listeners(&self, id: ElementId) -> Vec<Binding> {
        self.element(id)
            .map(|e| e.listeners.iter().map(|(_, b)| *b).collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.elements.iter().map(|e| e.listeners.len()).sum()
    }

    /// The target followed by each of its ancestors up to the body.
    pub fn bubble_path(&self, target: ElementId) -> Vec<ElementId> {
        let mut path = Vec::new();
        let mut cursor = self.contains(target).then_some(target);
        while let Some(id) = cursor {
            path.push(id);
            cursor = self.elements[id.0].parent;
        }
        path
    }

    /// Topmost element under the point. Later elements in document order
    /// paint over earlier ones; `pointer-events: none` elements are skipped.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<ElementId> {
        self.descendants(self.body())
            .into_iter()
            .rev()
            .find(|&id| {
                let el = &self.elements[id.0];
                !el.style.pointer_events_none && el.rect.contains(x, y)
            })
    }

    /// True when any element from `target` upwards has a listener.
    pub fn is_interactive(&self, target: ElementId) -> bool {
        self.bubble_path(target)
            .into_iter()
            .any(|id| !self.elements[id.0].listeners.is_empty())
    }

    pub fn request_scroll(&mut self, request: ScrollRequest) {
        self.scroll_request = Some(request);
    }

    pub fn take_scroll_request(&mut self) -> Option<ScrollRequest> {
        self.scroll_request.take()
    }
}
