//! Lenient field decoders for server payloads.
//!
//! The ticket backend is not strict about JSON types: ids arrive as numbers or
//! numeric strings, booleans as `true` or `"true"`, participant lists as bare ids
//! or `{ "id": .. }` objects. These helpers normalize all of that at the boundary.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseId {
    Num(i64),
    Text(String),
}

impl LooseId {
    fn value(self) -> Option<i64> {
        match self {
            Self::Num(n) => Some(n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Participant {
    Id(LooseId),
    Object { id: LooseId },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    // Many first: a `Value` scalar would otherwise swallow whole arrays.
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(v) => vec![v],
            Self::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseBool {
    Bool(bool),
    Num(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Int(i64),
    Float(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

pub(crate) fn id<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    LooseId::deserialize(d)?
        .value()
        .ok_or_else(|| serde::de::Error::custom("expected a numeric id"))
}

pub(crate) fn opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(Option::<LooseId>::deserialize(d)?.and_then(LooseId::value))
}

/// A single id or a list of ids; unparseable entries are dropped.
pub(crate) fn id_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
    Ok(Option::<OneOrMany<LooseId>>::deserialize(d)?
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(LooseId::value)
        .collect())
}

/// Participant list. `null` stays absent so the filter can tell "unknown" from "empty".
pub(crate) fn participant_ids<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Vec<i64>>, D::Error> {
    let Some(list) = Option::<Vec<Participant>>::deserialize(d)? else {
        return Ok(None);
    };
    Ok(Some(
        list.into_iter()
            .filter_map(|p| match p {
                Participant::Id(id) | Participant::Object { id } => id.value(),
            })
            .collect(),
    ))
}

pub(crate) fn loose_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(opt_loose_bool(d)?.unwrap_or(false))
}

/// Counters are never negative locally; bad server values clamp to zero.
pub(crate) fn non_negative<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let raw = Option::<i64>::deserialize(d)?.unwrap_or(0);
    Ok(raw.clamp(0, u32::MAX as i64) as u32)
}

pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(StringOrNumber::deserialize(d)?.into_string())
}

pub(crate) fn opt_string_or_number<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(d)?.map(StringOrNumber::into_string))
}

/// Filter values: one scalar or a list, each stringified (`null` becomes `"null"`).
pub(crate) fn opt_value_list<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Vec<String>>, D::Error> {
    Ok(Option::<OneOrMany<serde_json::Value>>::deserialize(d)?.map(|values| {
        values
            .into_vec()
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect()
    }))
}

pub(crate) fn opt_id_list<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Vec<i64>>, D::Error> {
    Ok(Option::<OneOrMany<LooseId>>::deserialize(d)?
        .map(|ids| ids.into_vec().into_iter().filter_map(LooseId::value).collect()))
}

pub(crate) fn opt_loose_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<LooseBool>::deserialize(d)?.map(|b| match b {
        LooseBool::Bool(b) => b,
        LooseBool::Num(n) => n != 0,
        LooseBool::Text(s) => s.eq_ignore_ascii_case("true") || s == "1",
    }))
}
