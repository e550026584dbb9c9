//! CloudFormation intrinsic functions.
//!
//! Only the handful the stack builder emits are modelled. Values stay plain
//! `serde_json::Value`s so they slot straight into resource properties.

use serde_json::{json, Value};

/// `{"Ref": id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Base64": value}`
pub fn base64(value: impl Into<Value>) -> Value {
    json!({ "Fn::Base64": value.into() })
}

/// Collect the logical ids a value refers to through `Ref` or `Fn::GetAtt`.
///
/// Pseudo parameters (`AWS::Region`, `AWS::StackName`, ...) are skipped.
pub fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(id)) = map.get("Ref") {
                    if !id.starts_with("AWS::") && !out.contains(id) {
                        out.push(id.clone());
                    }
                    return;
                }
                if let Some(target) = map.get("Fn::GetAtt") {
                    let id = match target {
                        Value::Array(parts) => parts.first().and_then(Value::as_str),
                        Value::String(dotted) => dotted.split('.').next(),
                        _ => None,
                    };
                    if let Some(id) = id {
                        if !out.iter().any(|seen| seen == id) {
                            out.push(id.to_string());
                        }
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}
