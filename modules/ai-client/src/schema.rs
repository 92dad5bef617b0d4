use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// Trait for types that can be extracted via a forced tool call.
///
/// Automatically implemented for any type that implements
/// `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate the tool `input_schema` for this type.
    ///
    /// The raw schemars output is tightened before use:
    /// 1. `additionalProperties: false` on all object schemas
    /// 2. ALL properties listed in `required`, even nullable ones
    /// 3. Fully inlined schemas (no `$ref` references)
    fn tool_schema() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        fix_object_schemas(&mut value);
        inline_refs(&mut value);

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn fix_object_schemas(value: &mut serde_json::Value) {
    if let serde_json::Value::Object(map) = value {
        if map.get("type") == Some(&serde_json::Value::String("object".to_string())) {
            map.insert(
                "additionalProperties".to_string(),
                serde_json::Value::Bool(false),
            );

            if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                let all_keys: Vec<serde_json::Value> = props
                    .keys()
                    .map(|k| serde_json::Value::String(k.clone()))
                    .collect();
                map.insert("required".to_string(), serde_json::Value::Array(all_keys));
            }
        }

        for (_, v) in map.iter_mut() {
            fix_object_schemas(v);
        }
    } else if let serde_json::Value::Array(arr) = value {
        for item in arr.iter_mut() {
            fix_object_schemas(item);
        }
    }
}

fn inline_refs(value: &mut serde_json::Value) {
    let definitions = if let serde_json::Value::Object(map) = value {
        map.get("definitions").cloned()
    } else {
        None
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(ref_path)) = map.get("$ref").cloned() {
                if ref_path.starts_with("#/definitions/") {
                    let type_name = ref_path.trim_start_matches("#/definitions/");
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }
            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}
