//! Field lookup over loosely shaped vendor records.
//!
//! Vendors populate different keys for the same attribute depending on API
//! version and endpoint. Each attribute is read through a [`FieldList`]: an
//! ordered list of candidate keys, first usable value wins. Keeping the
//! order as data lets each list be tested on its own.

use serde_json::Value;

/// Ordered candidate keys for one attribute. A key may be a dotted path
/// (`"cdp.deviceId"`) into nested objects.
pub type FieldList = &'static [&'static str];

/// Extension trait for reading fields from a vendor record.
pub trait RecordExt {
    /// Resolves a dotted path to a value, if every segment is present.
    fn get_path(&self, path: &str) -> Option<&Value>;

    /// Gets a field as text.
    ///
    /// Strings are trimmed and empty strings count as absent. Numbers are
    /// rendered in decimal. Null, booleans, arrays and objects are absent.
    fn get_text(&self, path: &str) -> Option<String>;

    /// Returns the first field in `fields` that has a text value.
    fn first_text(&self, fields: FieldList) -> Option<String>;

    /// Like [`first_text`](Self::first_text), returning `default` if no field matched.
    fn first_text_or(&self, fields: FieldList, default: &str) -> String {
        self.first_text(fields)
            .unwrap_or_else(|| default.to_string())
    }
}

impl RecordExt for Value {
    fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(self, |value, segment| value.as_object()?.get(segment))
    }

    fn get_text(&self, path: &str) -> Option<String> {
        match self.get_path(path)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn first_text(&self, fields: FieldList) -> Option<String> {
        fields.iter().find_map(|field| self.get_text(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NAME_FIELDS: FieldList = &["name", "description", "mac"];

    #[test]
    fn test_first_text_respects_order() {
        let record = json!({"mac": "aa:bb:cc:dd:ee:ff", "description": "lobby"});
        assert_eq!(record.first_text(NAME_FIELDS).as_deref(), Some("lobby"));

        let record = json!({"name": "core", "description": "lobby"});
        assert_eq!(record.first_text(NAME_FIELDS).as_deref(), Some("core"));
    }

    #[test]
    fn test_empty_and_null_are_absent() {
        let record = json!({"name": "  ", "description": null, "mac": "aa"});
        assert_eq!(record.first_text(NAME_FIELDS).as_deref(), Some("aa"));
        assert_eq!(json!({}).first_text(NAME_FIELDS), None);
    }

    #[test]
    fn test_numbers_render_as_text() {
        let record = json!({"vlan": 10, "switchport": "3"});
        assert_eq!(record.get_text("vlan").as_deref(), Some("10"));
        assert_eq!(record.get_text("switchport").as_deref(), Some("3"));
    }

    #[test]
    fn test_dotted_paths() {
        let record = json!({"cdp": {"deviceId": "core-sw"}, "source": "x"});
        assert_eq!(record.get_text("cdp.deviceId").as_deref(), Some("core-sw"));
        assert_eq!(record.get_text("lldp.systemName"), None);
        // Traversing into a scalar is absent, not a panic
        assert_eq!(record.get_text("source.serial"), None);
    }

    #[test]
    fn test_non_text_values_are_absent() {
        let record = json!({"a": true, "b": [1], "c": {"d": 1}});
        assert_eq!(record.get_text("a"), None);
        assert_eq!(record.get_text("b"), None);
        assert_eq!(record.get_text("c"), None);
        assert_eq!(record.first_text_or(&["a", "b"], "Unknown"), "Unknown");
    }

    #[test]
    fn test_non_object_record() {
        assert_eq!(Value::Null.get_text("name"), None);
        assert_eq!(json!("string").get_text("name"), None);
    }
}
