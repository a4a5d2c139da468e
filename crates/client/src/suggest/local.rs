//! Search box autocomplete over candidates embedded in the page.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::dom::{Document, ElementId, EventKind, ListenerId, Selector, Target, TimerId};
use crate::render;

pub const FORM_ID: &str = "storeSearchForm";
pub const INPUT_ID: &str = "storeSearchInput";
pub const CONTAINER_ID: &str = "searchSuggestionList";
pub const LIST_ID: &str = "searchSuggestionItems";
pub const DATA_ID: &str = "tiendaSuggestionData";

const READY_ATTRIBUTE: &str = "data-tienda-suggestions";
const OPTION_ATTRIBUTE: &str = "data-suggestion-button";
const HIGHLIGHT_CLASS: &str = "bg-zinc-100";

/// Delay between the input losing focus and the box hiding, long enough for
/// a click on a suggestion to land first.
pub const BLUR_HIDE_DELAY_MS: u64 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionOptions {
    pub min_characters: usize,
    pub max_results: usize,
}

impl Default for SuggestionOptions {
    fn default() -> Self {
        Self {
            min_characters: 1,
            max_results: 20,
        }
    }
}

/// Parse the embedded JSON array. Entries are trimmed, blanks dropped and
/// repeats removed, keeping first occurrences.
#[must_use]
pub fn parse_candidates(raw: &str) -> Vec<String> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(error = %e, "Invalid suggestion data");
            return Vec::new();
        }
    };

    let mut candidates: Vec<String> = Vec::new();
    for value in values {
        let Some(text) = value.as_str().map(str::trim) else {
            continue;
        };
        if !text.is_empty() && !candidates.iter().any(|c| c == text) {
            candidates.push(text.to_string());
        }
    }
    candidates
}

/// Candidates containing every whitespace-separated token of `term`,
/// compared case-insensitively.
#[must_use]
pub fn filter_candidates(candidates: &[String], term: &str, options: SuggestionOptions) -> Vec<String> {
    let term = term.trim().to_lowercase();
    if term.chars().count() < options.min_characters {
        return Vec::new();
    }
    let tokens: Vec<&str> = term.split_whitespace().collect();

    candidates
        .iter()
        .filter(|candidate| {
            let haystack = candidate.to_lowercase();
            tokens.iter().all(|token| haystack.contains(token))
        })
        .take(options.max_results)
        .cloned()
        .collect()
}

#[derive(Debug)]
struct BoxState {
    form: ElementId,
    input: ElementId,
    container: ElementId,
    list: ElementId,
    candidates: Vec<String>,
    options: SuggestionOptions,
    highlighted: Cell<Option<usize>>,
    blur_timer: Cell<Option<TimerId>>,
}

impl BoxState {
    fn show(&self, doc: &Document) {
        doc.remove_class(self.container, "hidden");
        doc.set_attribute(self.input, "aria-expanded", "true");
    }

    fn hide(&self, doc: &Document) {
        doc.add_class(self.container, "hidden");
        doc.set_attribute(self.input, "aria-expanded", "false");
        self.highlighted.set(None);
    }

    fn clear(&self, doc: &Document) {
        doc.clear_children(self.list);
        self.hide(doc);
    }

    fn render(&self, doc: &Document) {
        let matches = filter_candidates(&self.candidates, &doc.value(self.input), self.options);
        if matches.is_empty() {
            self.clear(doc);
            return;
        }
        doc.clear_children(self.list);
        self.highlighted.set(None);
        for value in &matches {
            doc.append(self.list, &render::suggestion_option(value));
        }
        self.show(doc);
    }

    fn option_buttons(&self, doc: &Document) -> Vec<ElementId> {
        doc.query_all(self.list, &Selector::attr(OPTION_ATTRIBUTE))
    }

    fn move_highlight(&self, doc: &Document, forward: bool) -> bool {
        let buttons = self.option_buttons(doc);
        let len = buttons.len();
        if len == 0 {
            return false;
        }
        let next = match (self.highlighted.get(), forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        for (index, button) in buttons.iter().enumerate() {
            let selected = index == next;
            doc.set_attribute(*button, "aria-selected", if selected { "true" } else { "false" });
            doc.toggle_class(*button, HIGHLIGHT_CLASS, selected);
        }
        self.highlighted.set(Some(next));
        true
    }

    fn highlighted_value(&self, doc: &Document) -> Option<String> {
        let index = self.highlighted.get()?;
        let button = *self.option_buttons(doc).get(index)?;
        doc.attribute(button, "data-suggestion-value")
    }

    fn select(&self, doc: &Document, value: &str) {
        doc.set_value(self.input, value);
        self.clear(doc);
        doc.submit(self.form);
    }

    fn cancel_blur(&self, doc: &Document) {
        if let Some(timer) = self.blur_timer.take() {
            doc.clear_timeout(timer);
        }
    }
}

/// A bound search suggestion box.
#[derive(Debug)]
pub struct SuggestionBox {
    state: Rc<BoxState>,
    listeners: Vec<ListenerId>,
}

impl SuggestionBox {
    /// Bind with default options.
    pub fn mount(doc: &Document) -> Option<Self> {
        Self::mount_with(doc, SuggestionOptions::default())
    }

    /// Bind the search form's input. Returns `None` when an element is
    /// missing or the input is already bound.
    pub fn mount_with(doc: &Document, options: SuggestionOptions) -> Option<Self> {
        let form = doc.element_by_id(FORM_ID)?;
        let input = doc.element_by_id(INPUT_ID)?;
        let container = doc.element_by_id(CONTAINER_ID)?;
        let list = doc.element_by_id(LIST_ID)?;
        if doc.attribute(input, READY_ATTRIBUTE).as_deref() == Some("ready") {
            return None;
        }

        let candidates = doc
            .element_by_id(DATA_ID)
            .map(|data| parse_candidates(&doc.text_content(data)))
            .unwrap_or_default();
        debug!(candidates = candidates.len(), "Binding search suggestions");
        doc.set_attribute(input, READY_ATTRIBUTE, "ready");

        let state = Rc::new(BoxState {
            form,
            input,
            container,
            list,
            candidates,
            options,
            highlighted: Cell::new(None),
            blur_timer: Cell::new(None),
        });
        let mut listeners = Vec::new();

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(input, EventKind::Input, move |doc, _| s.render(doc)));

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(input, EventKind::Focus, move |doc, _| {
            s.cancel_blur(doc);
            let term = doc.value(s.input);
            if term.trim().chars().count() >= s.options.min_characters {
                s.render(doc);
            }
        }));

        let weak: Weak<BoxState> = Rc::downgrade(&state);
        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(input, EventKind::Blur, move |doc, _| {
            s.cancel_blur(doc);
            let weak = weak.clone();
            let timer = doc.set_timeout(BLUR_HIDE_DELAY_MS, move |doc| {
                if let Some(state) = weak.upgrade() {
                    state.blur_timer.set(None);
                    state.hide(doc);
                }
            });
            s.blur_timer.set(Some(timer));
        }));

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(Target::Document, EventKind::PointerDown, move |doc, event| {
            let inside = event
                .target_element()
                .is_some_and(|el| doc.contains(s.container, el) || doc.contains(s.input, el));
            if !inside {
                s.hide(doc);
            }
        }));

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(list, EventKind::Click, move |doc, event| {
            let Some(target) = event.target_element() else {
                return;
            };
            let Some(button) = doc.closest(target, &Selector::attr(OPTION_ATTRIBUTE)) else {
                return;
            };
            let value = doc.attribute(button, "data-suggestion-value").unwrap_or_default();
            event.prevent_default();
            s.select(doc, &value);
        }));

        let s = Rc::clone(&state);
        listeners.push(doc.add_listener(input, EventKind::KeyDown, move |doc, event| {
            match event.key() {
                Some("ArrowDown") => {
                    if s.move_highlight(doc, true) {
                        event.prevent_default();
                    }
                }
                Some("ArrowUp") => {
                    if s.move_highlight(doc, false) {
                        event.prevent_default();
                    }
                }
                Some("Enter") => {
                    if let Some(value) = s.highlighted_value(doc) {
                        event.prevent_default();
                        s.select(doc, &value);
                    }
                }
                Some("Escape") => s.clear(doc),
                _ => {}
            }
        }));

        Some(Self { state, listeners })
    }

    #[must_use]
    pub fn input(&self) -> ElementId {
        self.state.input
    }

    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.state.candidates.len()
    }

    /// Unbind: clear the list, release the ready marker and drop listeners.
    pub fn teardown(self, doc: &Document) {
        for listener in &self.listeners {
            doc.remove_listener(*listener);
        }
        self.state.cancel_blur(doc);
        self.state.clear(doc);
        doc.remove_attribute(self.state.input, READY_ATTRIBUTE);
    }
}
