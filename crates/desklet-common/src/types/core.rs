use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a monitor as reported by the external layout system.
pub type MonitorIndex = u32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Width and height of a surface's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// How a widget is materialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    /// Content-bearing widget rendered from web content.
    #[default]
    Html,
    /// Reserved for native widgets.
    Gtk,
    /// Internal shell affordance; never persisted or selectable.
    Chrome,
}

impl WidgetKind {
    /// Content-bearing kinds require network-content consent.
    pub fn is_content_bearing(self) -> bool {
        matches!(self, WidgetKind::Html)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WidgetKind::Html => "html",
            WidgetKind::Gtk => "gtk",
            WidgetKind::Chrome => "chrome",
        };
        f.write_str(s)
    }
}
