use crate::error::ProviderError;
use crate::provider::{ProviderResult, Side, TypeProvider};
use serde_json::{json, Map, Value};

/// Object documents edited one top-level key at a time.
///
/// Registered under the `json0` name and URI; ops use the json0 object
/// component shape `{"p": [key], "oi": new, "od": old}` restricted to
/// top-level keys. On a same-key conflict the component on the `Left` side
/// yields to the one it is transformed against.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyValue;

impl KeyValue {
    pub const NAME: &'static str = "json0";
    pub const URI: &'static str = "http://sharejs.org/types/JSONv0";

    pub fn set(key: &str, value: Value) -> Value {
        json!([{"p": [key], "oi": value}])
    }

    pub fn remove(key: &str, old: Value) -> Value {
        json!([{"p": [key], "od": old}])
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Component {
    key: String,
    oi: Option<Value>,
    od: Option<Value>,
}

impl Component {
    fn parse(raw: &Value) -> ProviderResult<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ProviderError::new("Component must be an object"))?;
        let key = match obj.get("p").and_then(Value::as_array).map(Vec::as_slice) {
            Some([Value::String(key)]) => key.clone(),
            _ => return Err(ProviderError::new("Only top-level keys are supported")),
        };
        Ok(Self {
            key,
            oi: obj.get("oi").cloned(),
            od: obj.get("od").cloned(),
        })
    }

    fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("p".into(), json!([self.key]));
        if let Some(oi) = &self.oi {
            obj.insert("oi".into(), oi.clone());
        }
        if let Some(od) = &self.od {
            obj.insert("od".into(), od.clone());
        }
        Value::Object(obj)
    }

    fn is_noop(&self) -> bool {
        self.oi.is_none() && self.od.is_none()
    }
}

fn parse_op(op: &Value) -> ProviderResult<Vec<Component>> {
    op.as_array()
        .ok_or_else(|| ProviderError::new("Op must be an array"))?
        .iter()
        .map(Component::parse)
        .collect()
}

impl TypeProvider for KeyValue {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn uri(&self) -> &str {
        Self::URI
    }

    fn create(&self, initial: Option<&Value>) -> ProviderResult<Value> {
        match initial {
            None | Some(Value::Null) => Ok(Value::Object(Map::new())),
            Some(Value::Object(obj)) => Ok(Value::Object(obj.clone())),
            Some(_) => Err(ProviderError::new("Initial data must be an object")),
        }
    }

    fn apply(&self, snapshot: &Value, op: &Value) -> ProviderResult<Value> {
        let mut doc = snapshot
            .as_object()
            .cloned()
            .ok_or_else(|| ProviderError::new("Snapshot must be an object"))?;
        for component in parse_op(op)? {
            match component.oi {
                Some(value) => {
                    doc.insert(component.key, value);
                }
                None => {
                    doc.remove(&component.key);
                }
            }
        }
        Ok(Value::Object(doc))
    }

    fn transform(&self, op: &Value, other: &Value, side: Side) -> ProviderResult<Value> {
        let mut components = parse_op(op)?;
        for applied in parse_op(other)? {
            components = components
                .into_iter()
                .filter_map(|mut component| {
                    if component.key != applied.key {
                        return Some(component);
                    }
                    if side == Side::Left {
                        return None;
                    }
                    // The key now holds whatever the applied component left there.
                    component.od = applied.oi.clone();
                    (!component.is_noop()).then_some(component)
                })
                .collect();
        }
        Ok(Value::Array(components.iter().map(Component::to_value).collect()))
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
}
