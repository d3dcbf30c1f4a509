//! VINTF service manifest plus its init script.
//!
//! Both halves travel in one artifact, separated by [`INIT_RC_MARKER`].

use super::xml::parse_document;
use crate::domain::ValidatorResult;

pub const TOOL: &str = "xml-parser+vintf-rules";

/// Line separating the manifest XML from the init script.
pub const INIT_RC_MARKER: &str = "# --- init.rc ---";

const TRANSPORTS: [&str; 3] = ["hwbinder", "passthrough", "binder"];

/// Split into `(xml, init_rc)`, both trimmed; the script may be empty.
pub fn split_sections(content: &str) -> (&str, &str) {
    match content.split_once(INIT_RC_MARKER) {
        Some((xml, rc)) => (xml.trim(), rc.trim()),
        None => (content.trim(), ""),
    }
}

fn init_script_complete(rc: &str) -> bool {
    !rc.is_empty() && rc.contains("service ") && (rc.contains("class hal") || rc.contains("user "))
}

pub fn validate(content: &str, accept_at: f64) -> ValidatorResult {
    let (xml, rc) = split_sections(content);
    if xml.is_empty() {
        return ValidatorResult::fail(0.0, vec!["No XML content".to_string()], TOOL);
    }

    let root = match parse_document(xml) {
        Ok(root) => root,
        Err(e) => {
            return ValidatorResult::fail(0.1, vec![format!("XML parse error: {}", e)], TOOL);
        }
    };

    let mut errors = Vec::new();
    let mut score = 0.35;

    let hal = root.find("hal");
    if hal.is_some() {
        score += 0.20;
    } else {
        errors.push("Missing <hal> element".to_string());
    }

    match hal.and_then(|h| h.child("name")).filter(|n| !n.text().is_empty()) {
        Some(_) => score += 0.15,
        None => errors.push("Missing <name> inside <hal>".to_string()),
    }

    match root.find("transport") {
        Some(transport) => {
            score += 0.10;
            if !TRANSPORTS.contains(&transport.text()) {
                errors.push(format!("Unknown transport: '{}'", transport.text()));
            }
        }
        None => errors.push("Missing <transport> element".to_string()),
    }

    if init_script_complete(rc) {
        score += 0.20;
    } else {
        errors.push(format!(
            "Missing or incomplete init.rc section after '{}'",
            INIT_RC_MARKER
        ));
    }

    // Missing elements cost credit but do not veto acceptance on their own.
    let ok = score >= accept_at;
    let hal_count = root.descendants().iter().filter(|e| e.local_name() == "hal").count();
    ValidatorResult::new(ok, score, errors, TOOL).with_detail(format!(
        "hal entries={}, init.rc={}",
        hal_count,
        if rc.is_empty() { "absent" } else { "present" }
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"<manifest version="1.0" type="device">
    <hal format="aidl">
        <name>android.hardware.automotive.vehicle</name>
        <transport>hwbinder</transport>
        <fqname>IVehicle/default</fqname>
    </hal>
</manifest>
# --- init.rc ---
service vendor.vehicle-hal /vendor/bin/hw/android.hardware.automotive.vehicle-service
    class hal
    user vehicle_network
"#;

    #[test]
    fn test_complete_manifest() {
        let r = validate(COMPLETE, 0.75);
        assert!(r.ok, "{:?}", r.errors);
        assert_eq!(r.score, 1.0);
        assert_eq!(r.detail.as_deref(), Some("hal entries=1, init.rc=present"));
    }

    #[test]
    fn test_parse_error() {
        let r = validate("<manifest><hal></manifest>", 0.75);
        assert!(!r.ok);
        assert_eq!(r.score, 0.1);
        assert!(r.errors[0].starts_with("XML parse error: "));
    }

    #[test]
    fn test_missing_init_script_still_scores_xml() {
        let (xml, _) = split_sections(COMPLETE);
        let r = validate(xml, 0.75);
        assert_eq!(r.score, 0.8);
        assert!(r.ok);
        assert_eq!(r.errors.len(), 1);
    }

    #[test]
    fn test_unknown_transport() {
        let r = validate(&COMPLETE.replace(">hwbinder<", ">socket<"), 0.75);
        assert!(r.errors.iter().any(|e| e == "Unknown transport: 'socket'"));
    }

    #[test]
    fn test_split_sections() {
        assert_eq!(split_sections("<a/>"), ("<a/>", ""));
        let (xml, rc) = split_sections("<a/>\n# --- init.rc ---\nservice x /bin/x\n");
        assert_eq!(xml, "<a/>");
        assert_eq!(rc, "service x /bin/x");
    }

    #[test]
    fn test_blank_xml_half() {
        let r = validate("# --- init.rc ---\nservice x /bin/x\n", 0.75);
        assert_eq!(r.score, 0.0);
        assert_eq!(r.errors, vec!["No XML content".to_string()]);
    }
}
