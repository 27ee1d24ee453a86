//! Projection of keyed record lists into maps.

use serde_json::{Map, Value};

/// Error type for [`list_to_map`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("record {index} is not an object")]
    NotAnObject { index: usize },

    #[error("record {index} has no key field '{key}'")]
    MissingKey { index: usize, key: String },

    #[error("record {index} has no field '{field}'")]
    MissingField { index: usize, field: String },
}

/// What each map entry holds.
pub enum Projection {
    /// The whole record
    Whole,
    /// One field's value
    Field(String),
    /// A sub-record with the named fields
    Fields(Vec<String>),
    /// A sub-record with fields renamed `(old, new)`
    Rename(Vec<(String, String)>),
    /// The result of a function applied to the record
    With(Box<dyn Fn(&Value) -> Value>),
}

/// Map each record's `key` field to its projection.
///
/// `None` passes through as `Ok(None)`. Keys that are not strings are
/// stringified; later records win on duplicate keys.
pub fn list_to_map(
    records: Option<&[Value]>,
    key: &str,
    projection: &Projection,
) -> Result<Option<Map<String, Value>>, RecordError> {
    let Some(records) = records else {
        return Ok(None);
    };
    let mut map = Map::new();
    for (index, record) in records.iter().enumerate() {
        let Value::Object(fields) = record else {
            return Err(RecordError::NotAnObject { index });
        };
        let map_key = match fields.get(key) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(RecordError::MissingKey {
                    index,
                    key: key.to_string(),
                })
            }
        };
        let field = |name: &str| {
            fields
                .get(name)
                .cloned()
                .ok_or_else(|| RecordError::MissingField {
                    index,
                    field: name.to_string(),
                })
        };
        let projected = match projection {
            Projection::Whole => record.clone(),
            Projection::Field(name) => field(name.as_str())?,
            Projection::Fields(names) => Value::Object(
                names
                    .iter()
                    .map(|name| Ok((name.clone(), field(name.as_str())?)))
                    .collect::<Result<_, RecordError>>()?,
            ),
            Projection::Rename(pairs) => Value::Object(
                pairs
                    .iter()
                    .map(|(old, new)| Ok((new.clone(), field(old.as_str())?)))
                    .collect::<Result<_, RecordError>>()?,
            ),
            Projection::With(project) => project(record),
        };
        map.insert(map_key, projected);
    }
    Ok(Some(map))
}
