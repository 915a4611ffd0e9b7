//! Schema Tree Loading
//!
//! Walks a JSON-Schema document depth-first through `anyOf`/`oneOf`/`allOf`,
//! local `$ref`s, `items` and `properties`, recording one node per hop.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::error::{Result, VegaError};
use crate::schema::{SchemaNode, SchemaType, SimplePath};

/// Combinator keywords whose members are walked as children
const COMBINATORS: [&str; 3] = ["anyOf", "oneOf", "allOf"];

/// A node waiting to be visited
struct Pending<'a> {
    schema: &'a Value,
    pointer: String,
    full_path: Vec<String>,
    simple_path: SimplePath,
}

/// Walk `document` and return every descendant node in discovery order
pub fn load_descendants(document: &Value) -> Result<Vec<SchemaNode>> {
    let mut nodes = Vec::new();
    let mut stack = vec![Pending {
        schema: document,
        pointer: String::new(),
        full_path: Vec::new(),
        simple_path: SimplePath::default(),
    }];

    while let Some(state) = stack.pop() {
        let children = children(document, &state)?;

        if !state.full_path.is_empty() {
            nodes.push(extract_node(&state)?);
        }

        // Reversed so the first child is visited next
        stack.extend(children.into_iter().rev());
    }

    Ok(nodes)
}

fn children<'a>(document: &'a Value, state: &Pending<'a>) -> Result<Vec<Pending<'a>>> {
    let Some(object) = state.schema.as_object() else {
        return Ok(Vec::new());
    };
    let mut children = Vec::new();

    for keyword in COMBINATORS {
        if let Some(members) = object.get(keyword).and_then(Value::as_array) {
            for (i, member) in members.iter().enumerate() {
                children.push(Pending {
                    schema: member,
                    pointer: format!("{}/{}/{}", state.pointer, keyword, i),
                    full_path: extend(&state.full_path, format!("{}[{}]", keyword, i)),
                    simple_path: state.simple_path.clone(),
                });
            }
        }
    }

    if let Some(reference) = object.get("$ref").and_then(Value::as_str) {
        // A ref already on the current path would recurse forever
        if !state.full_path.iter().any(|hop| hop == reference) {
            let pointer = reference.strip_prefix('#').ok_or_else(|| {
                VegaError::MalformedSchema(format!("non-local $ref {}", reference))
            })?;
            let target = document.pointer(pointer).ok_or_else(|| {
                VegaError::MalformedSchema(format!("unresolvable $ref {}", reference))
            })?;
            children.push(Pending {
                schema: target,
                pointer: pointer.to_string(),
                full_path: extend(&state.full_path, reference.to_string()),
                simple_path: state.simple_path.clone(),
            });
        }
    }

    match object.get("items") {
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                children.push(Pending {
                    schema: item,
                    pointer: format!("{}/items/{}", state.pointer, i),
                    full_path: extend(&state.full_path, format!("items[{}]", i)),
                    simple_path: state.simple_path.clone(),
                });
            }
        }
        Some(item) => children.push(Pending {
            schema: item,
            pointer: format!("{}/items", state.pointer),
            full_path: extend(&state.full_path, "items".to_string()),
            simple_path: state.simple_path.clone(),
        }),
        None => {}
    }

    if let Some(properties) = object.get("properties").and_then(Value::as_object) {
        let mut keys: Vec<&String> = properties.keys().collect();
        keys.sort();
        for key in keys {
            children.push(Pending {
                schema: &properties[key.as_str()],
                pointer: format!("{}/properties/{}", state.pointer, escape_pointer(key)),
                full_path: extend(&state.full_path, key.clone()),
                simple_path: state.simple_path.child(key.clone()),
            });
        }
    }

    Ok(children)
}

fn extract_node(state: &Pending<'_>) -> Result<SchemaNode> {
    let declared = state.schema.get("type");
    let types = match declared {
        None => vec![SchemaType::NoType],
        Some(Value::String(t)) => vec![parse_type(t, state)?],
        Some(Value::Array(ts)) => {
            let mut types = Vec::with_capacity(ts.len());
            for t in ts {
                let name = t.as_str().ok_or_else(|| malformed_type(state))?;
                types.push(parse_type(name, state)?);
            }
            if types.is_empty() {
                return Err(malformed_type(state));
            }
            types
        }
        Some(_) => return Err(malformed_type(state)),
    };

    let enums = state.schema.get("enum").and_then(Value::as_array).map(|values| {
        values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<BTreeSet<_>>()
    });

    Ok(SchemaNode {
        types,
        enums,
        simple_path: state.simple_path.clone(),
        full_path: state.full_path.clone(),
        pointer: state.pointer.clone(),
        typed: declared.is_some(),
    })
}

fn parse_type(name: &str, state: &Pending<'_>) -> Result<SchemaType> {
    SchemaType::from_json_type(name).ok_or_else(|| {
        VegaError::MalformedSchema(format!(
            "unknown type {:?} at {}",
            name,
            state.full_path.join(".")
        ))
    })
}

fn malformed_type(state: &Pending<'_>) -> VegaError {
    VegaError::MalformedSchema(format!(
        "unreadable type keyword at {}",
        state.full_path.join(".")
    ))
}

fn extend(path: &[String], hop: String) -> Vec<String> {
    let mut next = path.to_vec();
    next.push(hop);
    next
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
