//! Minimal reference type providers.
//!
//! These exist so the engine, the store and the stress harness have real
//! types to drive. They are deliberately small: [`PlainText`] edits a string
//! by character position and [`KeyValue`] sets and removes top-level keys
//! of an object.

mod key_value;
mod plain_text;

pub use key_value::KeyValue;
pub use plain_text::PlainText;

use crate::registry::TypeRegistry;

/// Registry holding both fixture types.
pub fn registry() -> TypeRegistry {
    TypeRegistry::builder()
        .register(PlainText)
        .register(KeyValue)
        .alias("text-plain", PlainText::URI)
        .build()
}
