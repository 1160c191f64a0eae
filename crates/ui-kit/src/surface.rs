//! Render target abstraction
//!
//! A [`Surface`] is a flat map of anchor ids to elements. Writers address
//! elements by id; writing to an id that does not exist is a silent no-op
//! reported as `false`.

use indexmap::{IndexMap, IndexSet};
use monitor_core::format::html_escape;
use monitor_core::ExportedFile;
use parking_lot::RwLock;
use serde_json::Value;

/// Root element every surface starts with
pub const BODY: &str = "body";

pub trait Surface: Send + Sync + 'static {
    fn has_anchor(&self, id: &str) -> bool;

    /// Replace the inner markup of `id`
    fn set_html(&self, id: &str, html: &str) -> bool;

    /// Replace the inner text of `id`; the text is escaped
    fn set_text(&self, id: &str, text: &str) -> bool;

    /// Add (`on = true`) or remove a CSS class
    fn set_class(&self, id: &str, class: &str, on: bool) -> bool;

    fn set_style(&self, id: &str, property: &str, value: &str) -> bool;

    /// Append a new child element `id` under `parent`
    fn mount(&self, parent: &str, id: &str, html: &str) -> bool;

    /// Remove `id` and its descendants
    fn remove(&self, id: &str) -> bool;

    fn scroll_to_top(&self, id: &str) -> bool;

    /// Draw (or redraw) a chart from its JSON config
    fn draw_chart(&self, id: &str, config: &Value) -> bool;

    fn clear_chart(&self, id: &str) -> bool;

    /// Hand a generated file to the user
    fn offer_download(&self, file: &ExportedFile);
}

#[derive(Debug, Clone, Default)]
struct Element {
    parent: Option<String>,
    html: String,
    classes: IndexSet<String>,
    styles: IndexMap<String, String>,
    chart: Option<Value>,
    scroll_resets: usize,
}

/// Headless surface that keeps every element in memory
#[derive(Debug)]
pub struct MemorySurface {
    elements: RwLock<IndexMap<String, Element>>,
    downloads: RwLock<Vec<ExportedFile>>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        let mut elements = IndexMap::new();
        elements.insert(BODY.to_string(), Element::default());
        Self {
            elements: RwLock::new(elements),
            downloads: RwLock::new(Vec::new()),
        }
    }

    /// Surface with the given anchors mounted directly under the body
    pub fn with_anchors<I, S>(anchors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let surface = Self::new();
        surface.add_anchors(anchors);
        surface
    }

    pub fn add_anchors<I, S>(&self, anchors: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut elements = self.elements.write();
        for anchor in anchors {
            elements
                .entry(anchor.as_ref().to_string())
                .or_insert_with(|| Element {
                    parent: Some(BODY.to_string()),
                    ..Element::default()
                });
        }
    }

    pub fn html(&self, id: &str) -> Option<String> {
        self.elements.read().get(id).map(|el| el.html.clone())
    }

    pub fn has_class(&self, id: &str, class: &str) -> bool {
        self.elements
            .read()
            .get(id)
            .map_or(false, |el| el.classes.contains(class))
    }

    pub fn style(&self, id: &str, property: &str) -> Option<String> {
        self.elements
            .read()
            .get(id)
            .and_then(|el| el.styles.get(property).cloned())
    }

    pub fn chart(&self, id: &str) -> Option<Value> {
        self.elements.read().get(id).and_then(|el| el.chart.clone())
    }

    /// Direct children of `parent`, in mount order
    pub fn children(&self, parent: &str) -> Vec<String> {
        self.elements
            .read()
            .iter()
            .filter(|(_, el)| el.parent.as_deref() == Some(parent))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn scroll_resets(&self, id: &str) -> usize {
        self.elements.read().get(id).map_or(0, |el| el.scroll_resets)
    }

    pub fn downloads(&self) -> Vec<ExportedFile> {
        self.downloads.read().clone()
    }

    /// Serialise the element tree as an HTML document
    pub fn render_document(&self, title: &str) -> String {
        let elements = self.elements.read();
        let mut body = String::new();
        render_children(&elements, BODY, &mut body);
        format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}</body>\n</html>\n",
            html_escape(title),
            body
        )
    }

    fn with_element<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Element),
    {
        match self.elements.write().get_mut(id) {
            Some(element) => {
                f(element);
                true
            }
            None => false,
        }
    }
}

fn render_children(elements: &IndexMap<String, Element>, parent: &str, out: &mut String) {
    for (id, element) in elements.iter().filter(|(_, el)| el.parent.as_deref() == Some(parent)) {
        let mut attrs = format!(" id=\"{}\"", html_escape(id));
        if !element.classes.is_empty() {
            let classes: Vec<&str> = element.classes.iter().map(String::as_str).collect();
            attrs.push_str(&format!(" class=\"{}\"", html_escape(&classes.join(" "))));
        }
        if !element.styles.is_empty() {
            let styles: Vec<String> = element.styles.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            attrs.push_str(&format!(" style=\"{}\"", html_escape(&styles.join("; "))));
        }

        match &element.chart {
            Some(chart) => {
                attrs.push_str(&format!(" data-chart=\"{}\"", html_escape(&chart.to_string())));
                out.push_str(&format!("<canvas{attrs}></canvas>\n"));
            }
            None => {
                out.push_str(&format!("<div{attrs}>{}", element.html));
                render_children(elements, id, out);
                out.push_str("</div>\n");
            }
        }
    }
}

impl Surface for MemorySurface {
    fn has_anchor(&self, id: &str) -> bool {
        self.elements.read().contains_key(id)
    }

    fn set_html(&self, id: &str, html: &str) -> bool {
        self.with_element(id, |el| el.html = html.to_string())
    }

    fn set_text(&self, id: &str, text: &str) -> bool {
        self.with_element(id, |el| el.html = html_escape(text))
    }

    fn set_class(&self, id: &str, class: &str, on: bool) -> bool {
        self.with_element(id, |el| {
            if on {
                el.classes.insert(class.to_string());
            } else {
                el.classes.shift_remove(class);
            }
        })
    }

    fn set_style(&self, id: &str, property: &str, value: &str) -> bool {
        self.with_element(id, |el| {
            el.styles.insert(property.to_string(), value.to_string());
        })
    }

    fn mount(&self, parent: &str, id: &str, html: &str) -> bool {
        let mut elements = self.elements.write();
        if !elements.contains_key(parent) {
            return false;
        }
        elements.insert(
            id.to_string(),
            Element {
                parent: Some(parent.to_string()),
                html: html.to_string(),
                ..Element::default()
            },
        );
        true
    }

    fn remove(&self, id: &str) -> bool {
        if id == BODY {
            return false;
        }
        let mut elements = self.elements.write();
        if elements.shift_remove(id).is_none() {
            return false;
        }
        let mut orphaned = vec![id.to_string()];
        while let Some(parent) = orphaned.pop() {
            let children: Vec<String> = elements
                .iter()
                .filter(|(_, el)| el.parent.as_deref() == Some(parent.as_str()))
                .map(|(child, _)| child.clone())
                .collect();
            for child in children {
                elements.shift_remove(&child);
                orphaned.push(child);
            }
        }
        true
    }

    fn scroll_to_top(&self, id: &str) -> bool {
        self.with_element(id, |el| el.scroll_resets += 1)
    }

    fn draw_chart(&self, id: &str, config: &Value) -> bool {
        self.with_element(id, |el| el.chart = Some(config.clone()))
    }

    fn clear_chart(&self, id: &str) -> bool {
        self.with_element(id, |el| el.chart = None)
    }

    fn offer_download(&self, file: &ExportedFile) {
        self.downloads.write().push(file.clone());
    }
}
