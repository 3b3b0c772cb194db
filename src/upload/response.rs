//! Upload response shaping.

use super::{Formatter, UploadResult};
use serde_json::{Map, Value, json};

/// Render an upload result in the requested response shape.
///
/// `editor` mimics the single-file upload widget: an array with the first
/// stored name (empty when the submission carried no files). `groups`
/// returns the full asset map plus markup and any extra form fields.
pub fn render(result: &UploadResult, formatter: Formatter) -> Value {
    match formatter {
        Formatter::Editor => {
            let files: Vec<&str> = result.stored.first().map(String::as_str).into_iter().collect();
            json!({ "files": files })
        }
        Formatter::Groups => {
            let mut assets = Map::new();
            for (original, stored) in &result.assets {
                assets.insert(original.clone(), Value::String(stored.clone()));
            }

            let mut body = Map::new();
            body.insert("assets".to_string(), Value::Object(assets));
            if let Some(markup) = &result.markup {
                body.insert("markup".to_string(), Value::String(markup.clone()));
            }
            for (name, value) in &result.fields {
                body.insert(name.clone(), Value::String(value.clone()));
            }
            Value::Object(body)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
