use crate::error::ProviderError;
use crate::provider::{ProviderResult, Side, TypeProvider};
use serde_json::{json, Map, Value};

/// Plain text edited with positional insert/delete components.
///
/// An op is an array of `{"p": pos, "i": text}` and `{"p": pos, "d": text}`
/// components applied in order. Positions count characters. Cursors are
/// either a single position or an `[anchor, head]` pair.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainText;

impl PlainText {
    pub const NAME: &'static str = "text";
    pub const URI: &'static str = "urn:lapis:types:plain-text";

    pub fn insert(p: usize, text: &str) -> Value {
        json!([{"p": p, "i": text}])
    }

    pub fn delete(p: usize, text: &str) -> Value {
        json!([{"p": p, "d": text}])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Component {
    Insert { p: usize, text: String },
    Delete { p: usize, text: String },
}

impl Component {
    fn parse(raw: &Value) -> ProviderResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ProviderError::new("Text component must be an object"))?;
        let p = obj
            .get("p")
            .and_then(Value::as_u64)
            .ok_or_else(|| ProviderError::new("Text component needs a position"))?;
        let component = match (obj.get("i").and_then(Value::as_str), obj.get("d").and_then(Value::as_str)) {
            (Some(text), None) => Component::Insert {
                p: position(p, text, "Insert position out of range")?,
                text: text.to_string(),
            },
            (None, Some(text)) => Component::Delete {
                p: position(p, text, "Delete range out of range")?,
                text: text.to_string(),
            },
            _ => return Err(ProviderError::new("Text component needs exactly one of i or d")),
        };
        Ok(component)
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        match self {
            Component::Insert { p, text } => {
                obj.insert("p".into(), (*p).into());
                obj.insert("i".into(), text.as_str().into());
            }
            Component::Delete { p, text } => {
                obj.insert("p".into(), (*p).into());
                obj.insert("d".into(), text.as_str().into());
            }
        }
        Value::Object(obj)
    }
}

/// A component position whose end, `p + len(text)`, fits in `usize`.
/// Transforms only ever add other components' lengths to it, so they
/// saturate instead of checking.
fn position(p: u64, text: &str, message: &str) -> ProviderResult<usize> {
    usize::try_from(p)
        .ok()
        .filter(|p| p.checked_add(char_len(text)).is_some())
        .ok_or_else(|| ProviderError::new(message))
}

fn parse_op(op: &Value) -> ProviderResult<Vec<Component>> {
    op.as_array()
        .ok_or_else(|| ProviderError::new("Text op must be an array"))?
        .iter()
        .map(Component::parse)
        .collect()
}

fn op_value(components: &[Component]) -> Value {
    Value::Array(components.iter().map(Component::to_value).collect())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_index(s: &str, char_index: usize) -> usize {
    s.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn apply_component(doc: &mut String, component: &Component) -> ProviderResult<()> {
    let len = char_len(doc);
    match component {
        Component::Insert { p, text } => {
            if *p > len {
                return Err(ProviderError::new("Insert position out of range"));
            }
            let at = byte_index(doc, *p);
            doc.insert_str(at, text);
        }
        Component::Delete { p, text } => {
            let end = p.saturating_add(char_len(text));
            if end > len {
                return Err(ProviderError::new("Delete range out of range"));
            }
            let (from, to) = (byte_index(doc, *p), byte_index(doc, end));
            if &doc[from..to] != text {
                return Err(ProviderError::new("Delete component does not match"));
            }
            doc.replace_range(from..to, "");
        }
    }
    Ok(())
}

/// Rewrite `c` to apply after `o`.
fn transform_component(c: &Component, o: &Component, side: Side) -> Vec<Component> {
    match (c, o) {
        (Component::Insert { p, text }, Component::Insert { p: q, text: other }) => {
            let shift = *q < *p || (*q == *p && side == Side::Left);
            let p = if shift { p.saturating_add(char_len(other)) } else { *p };
            vec![Component::Insert {
                p,
                text: text.clone(),
            }]
        }
        (Component::Insert { p, text }, Component::Delete { p: q, text: other }) => {
            let end = q.saturating_add(char_len(other));
            let p = if *p <= *q {
                *p
            } else if *p >= end {
                p - char_len(other)
            } else {
                *q
            };
            vec![Component::Insert {
                p,
                text: text.clone(),
            }]
        }
        (Component::Delete { p, text }, Component::Insert { p: q, text: other }) => {
            let inserted = char_len(other);
            let end = p.saturating_add(char_len(text));
            if *q <= *p {
                vec![Component::Delete {
                    p: p.saturating_add(inserted),
                    text: text.clone(),
                }]
            } else if *q >= end {
                vec![c.clone()]
            } else {
                // The insert lands inside the deleted range; keep it.
                let split = byte_index(text, q - p);
                vec![
                    Component::Delete {
                        p: *p,
                        text: text[..split].to_string(),
                    },
                    Component::Delete {
                        p: p.saturating_add(inserted),
                        text: text[split..].to_string(),
                    },
                ]
            }
        }
        (Component::Delete { p, text }, Component::Delete { p: q, text: other }) => {
            let (start, end) = (*p, p.saturating_add(char_len(text)));
            let (other_start, other_end) = (*q, q.saturating_add(char_len(other)));
            if end <= other_start {
                vec![c.clone()]
            } else if start >= other_end {
                vec![Component::Delete {
                    p: start - char_len(other),
                    text: text.clone(),
                }]
            } else {
                let kept: String = text
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| {
                        let at = start.saturating_add(*i);
                        at < other_start || at >= other_end
                    })
                    .map(|(_, ch)| ch)
                    .collect();
                if kept.is_empty() {
                    Vec::new()
                } else {
                    vec![Component::Delete {
                        p: start.min(other_start),
                        text: kept,
                    }]
                }
            }
        }
    }
}

/// Transform two component lists against each other, returning
/// `(ops after others, others after ops)`.
fn transform_lists(
    ops: &[Component],
    others: &[Component],
    side: Side,
) -> (Vec<Component>, Vec<Component>) {
    match (ops, others) {
        ([], _) | (_, []) => (ops.to_vec(), others.to_vec()),
        ([c], [o]) => (
            transform_component(c, o, side),
            transform_component(o, c, side.flip()),
        ),
        ([first, rest @ ..], _) if !rest.is_empty() => {
            let (first, others) = transform_lists(std::slice::from_ref(first), others, side);
            let (mut rest, others) = transform_lists(rest, &others, side);
            let mut out = first;
            out.append(&mut rest);
            (out, others)
        }
        (_, [first, rest @ ..]) => {
            let (ops, mut first) = transform_lists(ops, std::slice::from_ref(first), side);
            let (ops, mut rest) = transform_lists(&ops, rest, side);
            first.append(&mut rest);
            (ops, first)
        }
    }
}

fn transform_position(mut cursor: usize, components: &[Component], is_own_op: bool) -> usize {
    for component in components {
        match component {
            Component::Insert { p, text } => {
                if *p < cursor || (*p == cursor && is_own_op) {
                    cursor = cursor.saturating_add(char_len(text));
                }
            }
            Component::Delete { p, text } => {
                if cursor > *p {
                    cursor -= cursor.min(p.saturating_add(char_len(text))) - p;
                }
            }
        }
    }
    cursor
}

impl TypeProvider for PlainText {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn uri(&self) -> &str {
        Self::URI
    }

    fn create(&self, initial: Option<&Value>) -> ProviderResult<Value> {
        match initial {
            None | Some(Value::Null) => Ok(Value::String(String::new())),
            Some(Value::String(text)) => Ok(Value::String(text.clone())),
            Some(_) => Err(ProviderError::new("Initial data must be a string")),
        }
    }

    fn apply(&self, snapshot: &Value, op: &Value) -> ProviderResult<Value> {
        let mut doc = snapshot
            .as_str()
            .ok_or_else(|| ProviderError::new("Snapshot must be a string"))?
            .to_string();
        for component in parse_op(op)? {
            apply_component(&mut doc, &component)?;
        }
        Ok(Value::String(doc))
    }

    fn transform(&self, op: &Value, other: &Value, side: Side) -> ProviderResult<Value> {
        let (op, _) = transform_lists(&parse_op(op)?, &parse_op(other)?, side);
        Ok(op_value(&op))
    }

    fn decompose(&self, op: &Value) -> Option<Vec<Value>> {
        let components = op.as_array()?;
        Some(
            components
                .iter()
                .map(|component| Value::Array(vec![component.clone()]))
                .collect(),
        )
    }

    fn supports_cursor(&self) -> bool {
        true
    }

    fn transform_cursor(&self, cursor: &Value, op: &Value, is_own_op: bool) -> ProviderResult<Value> {
        let components = parse_op(op)?;
        let position = |value: &Value| {
            value
                .as_u64()
                .and_then(|p| usize::try_from(p).ok())
                .map(|p| transform_position(p, &components, is_own_op))
                .ok_or_else(|| ProviderError::new("Cursor must be a position or [anchor, head]"))
        };
        match cursor {
            Value::Array(range) if range.len() == 2 => {
                Ok(json!([position(&range[0])?, position(&range[1])?]))
            }
            other => Ok(json!(position(other)?)),
        }
    }
}
