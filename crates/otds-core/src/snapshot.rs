//! Document snapshots.
//!
//! A snapshot always carries a version. Type and data travel together as
//! [`Content`]: a document exists exactly when its content is present.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The typed payload of an existing document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Canonical URI of the document's type.
    #[serde(rename = "type")]
    pub type_uri: String,
    /// Type-owned payload.
    pub data: Value,
}

impl Content {
    pub fn new(type_uri: impl Into<String>, data: Value) -> Self {
        Self {
            type_uri: type_uri.into(),
            data,
        }
    }
}

/// Creation and modification times, in milliseconds since the epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctime: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<i64>,
}

/// A versioned document snapshot owned by the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotWire", into = "SnapshotWire")]
pub struct Snapshot {
    /// Number of operations applied so far.
    pub v: u64,
    /// Type and data, absent when the document does not exist.
    pub content: Option<Content>,
    /// Timestamps, removed when the document is deleted.
    pub m: Option<Metadata>,
}

impl Snapshot {
    /// A document that has never been created, at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// A non-existent document at a given version.
    pub fn at_version(v: u64) -> Self {
        Self {
            v,
            ..Self::default()
        }
    }

    /// An existing document.
    pub fn with_content(v: u64, type_uri: impl Into<String>, data: Value) -> Self {
        Self {
            v,
            content: Some(Content::new(type_uri, data)),
            m: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.content.is_some()
    }

    pub fn type_uri(&self) -> Option<&str> {
        self.content.as_ref().map(|c| c.type_uri.as_str())
    }

    pub fn data(&self) -> Option<&Value> {
        self.content.as_ref().map(|c| &c.data)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Flat wire form `{v, type?, data?, m?}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SnapshotWire {
    #[serde(default)]
    v: u64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    type_uri: Option<String>,
    // Kept apart from `Option<Value>` so a null payload still round-trips.
    #[serde(default, skip_serializing_if = "MaybeData::is_absent")]
    data: MaybeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    m: Option<Metadata>,
}

#[derive(Clone, Debug, Default)]
enum MaybeData {
    #[default]
    Absent,
    Present(Value),
}

impl MaybeData {
    fn is_absent(&self) -> bool {
        matches!(self, MaybeData::Absent)
    }
}

impl Serialize for MaybeData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MaybeData::Absent => serializer.serialize_none(),
            MaybeData::Present(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for MaybeData {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(MaybeData::Present)
    }
}

impl TryFrom<SnapshotWire> for Snapshot {
    type Error = String;

    fn try_from(wire: SnapshotWire) -> Result<Self, Self::Error> {
        let content = match (wire.type_uri, wire.data) {
            (Some(type_uri), MaybeData::Present(data)) => Some(Content { type_uri, data }),
            (Some(type_uri), MaybeData::Absent) => Some(Content {
                type_uri,
                data: Value::Null,
            }),
            (None, MaybeData::Absent) => None,
            (None, MaybeData::Present(_)) => {
                return Err("snapshot has data but no type".to_string())
            }
        };
        Ok(Snapshot {
            v: wire.v,
            content,
            m: wire.m,
        })
    }
}

impl From<Snapshot> for SnapshotWire {
    fn from(snapshot: Snapshot) -> Self {
        let (type_uri, data) = match snapshot.content {
            Some(content) => (Some(content.type_uri), MaybeData::Present(content.data)),
            None => (None, MaybeData::Absent),
        };
        SnapshotWire {
            v: snapshot.v,
            type_uri,
            data,
            m: snapshot.m,
        }
    }
}
