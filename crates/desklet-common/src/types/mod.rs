mod core;

pub use self::core::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_clone_and_equality() {
        let r = Rect::new(10.0, 20.0, 800.0, 600.0);
        let r2 = r;
        assert_eq!(r, r2);
    }

    #[test]
    fn rect_serialization() {
        let r = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        let json = serde_json::to_string(&r).unwrap();
        let deserialized: Rect = serde_json::from_str(&json).unwrap();
        assert_eq!(r, deserialized);
    }

    #[test]
    fn widget_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&WidgetKind::Html).unwrap(), "\"html\"");
        assert_eq!(serde_json::to_string(&WidgetKind::Gtk).unwrap(), "\"gtk\"");
        assert_eq!(
            serde_json::to_string(&WidgetKind::Chrome).unwrap(),
            "\"chrome\""
        );
        let kind: WidgetKind = serde_json::from_str("\"gtk\"").unwrap();
        assert_eq!(kind, WidgetKind::Gtk);
    }

    #[test]
    fn only_html_is_content_bearing() {
        assert!(WidgetKind::Html.is_content_bearing());
        assert!(!WidgetKind::Gtk.is_content_bearing());
        assert!(!WidgetKind::Chrome.is_content_bearing());
    }

    #[test]
    fn widget_kind_default_is_html() {
        assert_eq!(WidgetKind::default(), WidgetKind::Html);
        assert_eq!(WidgetKind::default().to_string(), "html");
    }

    #[test]
    fn extent_new() {
        let e = Extent::new(1920.0, 1080.0);
        assert!((e.width - 1920.0).abs() < f64::EPSILON);
        assert!((e.height - 1080.0).abs() < f64::EPSILON);
    }
}
