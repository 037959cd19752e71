//! Overlaying one config layer onto the layers below it.

use serde_json::Value;

/// Overlay `layer` onto `merged`, returning the dotted keys the layer set.
///
/// Sections merge key by key; any other value, arrays included, replaces what
/// the lower layers had.
pub(super) fn overlay_layer(merged: &mut Value, layer: &Value) -> Vec<String> {
    let mut overridden = Vec::new();
    overlay_at(merged, layer, "", &mut overridden);
    overridden
}

fn overlay_at(merged: &mut Value, layer: &Value, prefix: &str, overridden: &mut Vec<String>) {
    match (merged, layer) {
        (Value::Object(target), Value::Object(entries)) => {
            for (key, value) in entries {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match target.get_mut(key) {
                    Some(existing) => overlay_at(existing, value, &path, overridden),
                    None => {
                        target.insert(key.clone(), value.clone());
                        overridden.push(path);
                    }
                }
            }
        }
        (slot, value) => {
            *slot = value.clone();
            overridden.push(prefix.to_string());
        }
    }
}
