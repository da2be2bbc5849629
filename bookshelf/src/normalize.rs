//! Turns the API's inconsistent response envelopes into canonical values.
//!
//! A payload is accepted in three shapes, tried in this order:
//!
//! 1. bare: the body is the expected array or object,
//! 2. `{ "data": ... }`,
//! 3. `{ "data": { "data": ... } }`.
//!
//! List endpoints tolerate anything else by yielding an empty list. The two
//! wrapped shapes are logged so that a backend drifting between them shows up
//! in the logs without breaking any view.

use crate::model::Paginated;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Envelope {
    Bare,
    Data,
    NestedData
}

/// Every candidate payload in priority order, with the envelope it came from
/// and the object that directly wraps it (if any).
fn candidates(raw: &Value) -> Vec<(Envelope, &Value, Option<&Map<String, Value>>)> {
    let mut found = vec![(Envelope::Bare, raw, None)];
    if let Some(outer) = raw.as_object() {
        if let Some(data) = outer.get("data") {
            found.push((Envelope::Data, data, Some(outer)));
            if let Some(inner) = data.as_object() {
                if let Some(nested) = inner.get("data") {
                    found.push((Envelope::NestedData, nested, Some(inner)));
                }
            }
        }
    }
    found
}

fn note_envelope(endpoint: &str, envelope: Envelope) {
    match envelope {
        Envelope::Bare => {}
        Envelope::Data => debug!(endpoint, "unwrapped `data` envelope"),
        Envelope::NestedData => warn!(endpoint, "unwrapped nested `data.data` envelope")
    }
}

/// Finds the item array and which envelope held it.
pub fn unwrap_list(raw: &Value) -> Option<(&Vec<Value>, Envelope)> {
    candidates(raw)
        .into_iter()
        .find_map(|(envelope, value, _)| value.as_array().map(|items| (items, envelope)))
}

fn decode_items<T: DeserializeOwned>(endpoint: &str, items: &[Value]) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match T::deserialize(item) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(endpoint, index, error = %e, "skipping malformed item");
                None
            }
        })
        .collect()
}

/// Normalizes a list response. Never fails.
pub fn normalize_list<T: DeserializeOwned>(endpoint: &str, raw: &Value) -> Vec<T> {
    match unwrap_list(raw) {
        Some((items, envelope)) => {
            note_envelope(endpoint, envelope);
            decode_items(endpoint, items)
        }
        None => {
            warn!(endpoint, "response has no recognisable list, using an empty one");
            Vec::new()
        }
    }
}

/// Normalizes a single-entity response: the first candidate that decodes as
/// `T` wins. `None` when nothing matches.
pub fn normalize_entity<T: DeserializeOwned>(endpoint: &str, raw: &Value) -> Option<T> {
    let entity = candidates(raw)
        .into_iter()
        .filter(|(_, value, _)| value.is_object())
        .find_map(|(envelope, value, _)| {
            T::deserialize(value).ok().map(|entity| (entity, envelope))
        });

    match entity {
        Some((entity, envelope)) => {
            note_envelope(endpoint, envelope);
            Some(entity)
        }
        None => {
            warn!(endpoint, "response has no recognisable entity");
            None
        }
    }
}

/// Coerces a pagination field to a positive integer.
///
/// Numbers and numeric strings are accepted. Zero, negatives and anything
/// non-numeric count as absent.
pub fn coerce_count(value: Option<&Value>) -> Option<u64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None
    };
    if number.is_finite() && number >= 1.0 {
        Some(number.trunc() as u64)
    } else {
        None
    }
}

/// Pagination metadata, each field defaulted on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub count: u64
}

impl PageMeta {
    /// Reads `total`/`page`/`pages`/`count` from the first object in `sources`
    /// that carries each one, then applies the defaults.
    pub fn coerce(sources: &[&Map<String, Value>], len: usize) -> Self {
        let field = |name: &str| {
            sources
                .iter()
                .find_map(|source| coerce_count(source.get(name)))
        };
        let clamp_u32 = |n: u64| n.min(u64::from(u32::MAX)) as u32;

        PageMeta {
            total: field("total").unwrap_or(len as u64),
            page: field("page").map(clamp_u32).unwrap_or(1),
            pages: field("pages").map(clamp_u32).unwrap_or(1),
            count: field("count").unwrap_or(len as u64)
        }
    }
}

/// Normalizes a paginated list response. Never fails.
///
/// Metadata is looked up on the object holding the item array first and then
/// on the envelopes around it.
pub fn normalize_page<T: DeserializeOwned>(endpoint: &str, raw: &Value) -> Paginated<T> {
    let found = candidates(raw)
        .into_iter()
        .enumerate()
        .find(|(_, (_, value, _))| value.is_array());

    let (items, sources) = match found {
        Some((position, (envelope, value, _))) => {
            note_envelope(endpoint, envelope);
            let items = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
            let all = candidates(raw);
            // innermost wrapper first
            let sources: Vec<&Map<String, Value>> = all[..=position]
                .iter()
                .rev()
                .filter_map(|(_, _, wrapper)| *wrapper)
                .collect();
            (decode_items::<T>(endpoint, items), sources)
        }
        None => {
            warn!(endpoint, "response has no recognisable page, using an empty one");
            (Vec::new(), Vec::new())
        }
    };

    let meta = PageMeta::coerce(&sources, items.len());
    Paginated {
        items,
        total: meta.total,
        page: meta.page,
        pages: meta.pages,
        count: meta.count
    }
}
