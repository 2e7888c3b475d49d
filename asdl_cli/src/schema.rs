//! `asdl schema` (§6): prints a JSON description of a config file's shape
//! so editors and external tooling can validate `.asdlrc`, backend
//! configs, and view-profile configs without reading this crate's source.

use crate::args::SchemaKind;
use serde_json::{json, Value};

/// Renders the schema for `kind` as JSON text, pretty-printed unless
/// `compact` is set.
#[must_use]
pub fn render_schema(kind: SchemaKind, compact: bool) -> String {
    let value = schema_value(kind);
    if compact {
        serde_json::to_string(&value).expect("schema values always serialize")
    } else {
        serde_json::to_string_pretty(&value).expect("schema values always serialize")
    }
}

fn schema_value(kind: SchemaKind) -> Value {
    match kind {
        SchemaKind::Asdlrc => json!({
            "title": "AsdlrcConfig",
            "type": "object",
            "properties": {
                "lib_roots": {"type": "array", "items": {"type": "string"}, "default": []},
                "backend_config": {"type": ["string", "null"]},
                "env": {"type": "object", "additionalProperties": {"type": "string"}},
            },
        }),
        SchemaKind::BackendConfig => json!({
            "title": "BackendConfig",
            "type": "object",
            "required": ["backend", "system_devices"],
            "properties": {
                "backend": {"type": "string"},
                "system_devices": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "object",
                        "required": ["template"],
                        "properties": {"template": {"type": "string"}},
                    },
                },
                "bracketed_numeric_rendering": {"type": "boolean", "default": false},
            },
        }),
        SchemaKind::ViewConfig => json!({
            "title": "ViewConfig",
            "type": "object",
            "required": ["profiles"],
            "properties": {
                "profiles": {
                    "type": "object",
                    "additionalProperties": {
                        "type": "object",
                        "properties": {
                            "view_order": {
                                "type": "object",
                                "additionalProperties": {"type": "array", "items": {"type": "string"}},
                            },
                            "rules": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "required": ["match", "view"],
                                    "properties": {
                                        "id": {"type": ["string", "null"]},
                                        "match": {
                                            "type": "object",
                                            "properties": {
                                                "path": {"type": ["string", "null"]},
                                                "inst": {"type": ["string", "null"]},
                                                "module": {"type": ["string", "null"]},
                                            },
                                        },
                                        "view": {"type": "string"},
                                    },
                                },
                            },
                        },
                    },
                },
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_config_schema_lists_required_fields() {
        let rendered = render_schema(SchemaKind::BackendConfig, true);
        assert!(rendered.contains("\"backend\""));
        assert!(rendered.contains("\"system_devices\""));
    }

    #[test]
    fn compact_output_has_no_newlines() {
        let rendered = render_schema(SchemaKind::Asdlrc, true);
        assert!(!rendered.contains('\n'));
    }
}
