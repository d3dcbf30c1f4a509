//! Android XML layouts.

use std::collections::BTreeSet;

use super::xml::{parse_document, XmlElement};
use crate::domain::ValidatorResult;

pub const TOOL: &str = "xml-parser+layout-rules";

const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

const ROOT_CONTAINERS: [&str; 6] = [
    "LinearLayout",
    "ConstraintLayout",
    "RelativeLayout",
    "FrameLayout",
    "ScrollView",
    "CoordinatorLayout",
];

const WIDGETS: [&str; 7] = [
    "TextView", "Switch", "Button", "SeekBar", "CheckBox", "EditText", "ImageView",
];

/// `androidx.constraintlayout.widget.ConstraintLayout` → `ConstraintLayout`.
fn short_name(tag: &str) -> &str {
    let local = tag.rsplit(':').next().unwrap_or(tag);
    local.rsplit('.').next().unwrap_or(local)
}

/// Prefixes bound to the android namespace anywhere in the document.
fn android_prefixes<'a>(elements: &[&'a XmlElement]) -> BTreeSet<&'a str> {
    elements
        .iter()
        .flat_map(|e| e.attributes.iter())
        .filter(|(_, uri)| uri == ANDROID_NS)
        .filter_map(|(key, _)| key.strip_prefix("xmlns:"))
        .collect()
}

/// Value of `<prefix>:id` for any prefix bound to the android namespace.
fn android_id<'a>(element: &'a XmlElement, prefixes: &BTreeSet<&str>) -> Option<&'a str> {
    element.attributes.iter().find_map(|(key, value)| {
        let (prefix, local) = key.split_once(':')?;
        (local == "id" && prefixes.contains(prefix)).then_some(value.as_str())
    })
}

pub fn validate(xml: &str, accept_at: f64) -> ValidatorResult {
    let root = match parse_document(xml) {
        Ok(root) => root,
        Err(e) => {
            return ValidatorResult::fail(0.1, vec![format!("XML parse error: {}", e)], TOOL);
        }
    };

    let mut errors = Vec::new();
    let mut score = 0.35;

    let root_tag = short_name(&root.name);
    if ROOT_CONTAINERS.contains(&root_tag) {
        score += 0.20;
    } else {
        errors.push(format!("Unusual root element <{}>", root_tag));
    }

    let elements = root.descendants();
    let mut prefixes = android_prefixes(&elements);
    prefixes.insert("android");
    let ids: Vec<&str> = elements
        .iter()
        .filter_map(|e| android_id(e, &prefixes))
        .collect();
    if ids.is_empty() {
        errors.push("No android:id attributes found".to_string());
    } else {
        score += 0.20;
        let bad: Vec<&str> = ids
            .iter()
            .copied()
            .filter(|id| !id.starts_with("@+id/") && !id.starts_with("@id/"))
            .take(2)
            .collect();
        if !bad.is_empty() {
            errors.push(format!(
                "android:id should use '@+id/name' format, bad: {:?}",
                bad
            ));
        }
    }

    let tags: BTreeSet<&str> = elements.iter().map(|e| short_name(&e.name)).collect();
    let widget_count = elements
        .iter()
        .filter(|e| WIDGETS.contains(&short_name(&e.name)))
        .count();
    if WIDGETS.iter().any(|w| tags.contains(w)) {
        score += 0.15;
    } else {
        errors.push("No standard widget elements found".to_string());
    }

    if !android_prefixes(&[&root]).is_empty() {
        score += 0.10;
    } else {
        errors.push("Missing android namespace declaration".to_string());
    }

    let ok = score >= accept_at;
    ValidatorResult::new(ok, score, errors, TOOL)
        .with_detail(format!("ids={}, widgets={}", ids.len(), widget_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<androidx.constraintlayout.widget.ConstraintLayout
    xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent"
    android:layout_height="match_parent">

    <TextView
        android:id="@+id/speed_label"
        android:text="Speed" />

    <Switch
        android:id="@+id/adas_toggle" />
</androidx.constraintlayout.widget.ConstraintLayout>
"#;

    #[test]
    fn test_complete_layout() {
        let r = validate(LAYOUT, 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
        assert_eq!(r.detail.as_deref(), Some("ids=2, widgets=2"));
    }

    #[test]
    fn test_bad_id_format() {
        let r = validate(&LAYOUT.replace("@+id/speed_label", "speed_label"), 0.75);
        assert!(r.errors.iter().any(|e| e.contains("speed_label")));
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn test_unusual_root_and_no_namespace() {
        let r = validate("<GridView><Button android:id=\"@+id/b\"/></GridView>", 0.75);
        assert!(!r.ok);
        assert!(r.errors.iter().any(|e| e == "Unusual root element <GridView>"));
        assert!(r.errors.iter().any(|e| e == "Missing android namespace declaration"));
        assert_eq!(r.score, 0.7);
    }

    #[test]
    fn test_ids_under_rebound_prefix() {
        let xml = r#"<LinearLayout xmlns:a="http://schemas.android.com/apk/res/android">
    <Button a:id="@+id/go" />
    <TextView a:id="@+id/label" />
</LinearLayout>"#;
        let r = validate(xml, 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
        assert_eq!(r.detail.as_deref(), Some("ids=2, widgets=2"));
    }

    #[test]
    fn test_foreign_prefix_id_is_ignored() {
        let xml = r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    xmlns:app="http://schemas.android.com/apk/res-auto">
    <Button app:id="@+id/go" />
</LinearLayout>"#;
        let r = validate(xml, 0.75);
        assert!(r.errors.iter().any(|e| e == "No android:id attributes found"));
        assert_eq!(r.detail.as_deref(), Some("ids=0, widgets=1"));
    }

    #[test]
    fn test_parse_error() {
        let r = validate("<LinearLayout>", 0.75);
        assert_eq!(r.score, 0.1);
        assert!(!r.ok);
    }
}
