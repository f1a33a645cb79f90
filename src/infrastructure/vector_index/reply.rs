//! Decoding of `FT.SEARCH` replies (RESP2 layout)
//!
//! `[total, key1, [field, value, ...], key2, [field, value, ...], ...]`

use redis::Value;

use crate::domain::{DomainError, IndexMatch};

pub(super) const ANSWER_FIELD: &str = "answer";
pub(super) const TAG_FIELD: &str = "tag";
pub(super) const SCORE_FIELD: &str = "score";

/// Turn a search reply into matches, nearest first
pub(super) fn parse_search_reply(reply: Value) -> Result<Vec<IndexMatch>, DomainError> {
    let items = match reply {
        Value::Array(items) => items,
        other => {
            return Err(DomainError::index_read(format!(
                "Unexpected FT.SEARCH reply: {:?}",
                other
            )));
        }
    };

    let mut items = items.into_iter();

    match items.next() {
        Some(Value::Int(_)) => {}
        other => {
            return Err(DomainError::index_read(format!(
                "FT.SEARCH reply missing result count: {:?}",
                other
            )));
        }
    }

    let mut matches = Vec::new();

    while let Some(key) = items.next() {
        let key = text(&key)
            .ok_or_else(|| DomainError::index_read("FT.SEARCH reply has a non-text key"))?;

        let fields = match items.next() {
            Some(Value::Array(fields)) => fields,
            _ => {
                return Err(DomainError::index_read(format!(
                    "FT.SEARCH reply has no fields for {}",
                    key
                )));
            }
        };

        matches.push(parse_document(key, &fields)?);
    }

    // Servers without SORTBY return range results in no particular order
    matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    Ok(matches)
}

fn parse_document(key: String, fields: &[Value]) -> Result<IndexMatch, DomainError> {
    let mut answer = None;
    let mut tag = None;
    let mut distance = None;

    for pair in fields.chunks(2) {
        let [name, value] = pair else {
            break;
        };

        match text(name).as_deref() {
            Some(ANSWER_FIELD) => answer = text(value),
            Some(TAG_FIELD) => tag = text(value),
            Some(SCORE_FIELD) => {
                distance = text(value).and_then(|s| s.trim().parse::<f32>().ok());
            }
            _ => {}
        }
    }

    let distance = distance.ok_or_else(|| {
        DomainError::index_read(format!("Document {} has no usable score", key))
    })?;

    Ok(IndexMatch {
        key,
        answer,
        tag,
        distance,
    })
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Double(d) => Some(d.to_string()),
        _ => None,
    }
}
