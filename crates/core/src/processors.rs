//! Value processors, coercers, parsers, and serializers shared by schemas.
//!
//! Everything here is a plain function matching one of the slots a
//! [`FieldSpec`](crate::FieldSpec) declares, so schemas can compose them
//! freely. Processors that cannot produce a usable value return `None`,
//! which drops the value rather than storing garbage.

use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value as Json};
use url::Url;

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Input processor: normalize whitespace in text values.
///
/// Text that collapses to nothing is dropped; non-text values pass
/// through untouched.
pub fn normalize_space(value: Value) -> Option<Value> {
    match value {
        Value::Text(s) => {
            let collapsed = collapse_whitespace(&s);
            if collapsed.is_empty() { None } else { Some(Value::Text(collapsed)) }
        }
        other => Some(other),
    }
}

/// Input processor: render scalar values as text.
pub fn stringify(value: Value) -> Option<Value> {
    match value {
        Value::Text(_) | Value::List(_) | Value::Object(_) => Some(value),
        Value::Integer(n) => Some(Value::Text(n.to_string())),
        Value::Float(n) => Some(Value::Text(n.to_string())),
        Value::Bool(b) => Some(Value::Text(b.to_string())),
        Value::DateTime(dt) => Some(Value::Text(dt.to_rfc3339())),
        Value::Null => None,
    }
}

/// Expands protocol-relative URLs; everything else is returned as given.
pub fn normalize_url(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("http://{rest}"),
        None => url.to_string(),
    }
}

/// Parses an absolute URL, requiring a host.
pub fn parse_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return None;
    }
    Some(parsed)
}

/// Input processor: keep only well-formed absolute http(s) URLs.
///
/// Protocol-relative URLs are expanded first; anything that does not
/// parse with a host and an http or https scheme is dropped.
pub fn validate_http_url(value: Value) -> Option<Value> {
    match value {
        Value::Text(s) => {
            let url = parse_url(&normalize_url(&s))?;
            if !matches!(url.scheme(), "http" | "https") {
                return None;
            }
            Some(Value::Text(url.to_string()))
        }
        other => Some(other),
    }
}

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y", "%B %d, %Y"];

/// Best-effort datetime parsing.
///
/// Tries RFC 3339 and RFC 2822 first, then a set of common naive
/// date-time and date layouts. Naive values are taken as UTC; date-only
/// values become midnight UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }

    None
}

/// Parses an integer out of text, ignoring group separators.
pub fn parse_int(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
        .collect();
    if cleaned.is_empty() { None } else { cleaned.parse().ok() }
}

/// Coercer for datetime fields.
///
/// Text goes through [`parse_date`]; integers are taken as Unix epoch
/// seconds.
pub fn coerce_date(value: &Value) -> Option<Value> {
    match value {
        Value::DateTime(_) => Some(value.clone()),
        Value::Text(s) => parse_date(s).map(Value::DateTime),
        Value::Integer(n) => Utc.timestamp_opt(*n, 0).single().map(Value::DateTime),
        _ => None,
    }
}

/// Coercer for integer fields.
pub fn coerce_int(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(_) => Some(value.clone()),
        Value::Float(n) => Some(Value::Integer(*n as i64)),
        Value::Text(s) => parse_int(s).map(Value::Integer),
        Value::Bool(b) => Some(Value::Integer(i64::from(*b))),
        _ => None,
    }
}

/// Coercer for geo location fields: builds a `{lat, lon}` object.
///
/// Accepts objects keyed `lat`/`lon` (or `latitude`/`longitude`, numbers
/// or numeric strings) and `"lat;lon"` / `"lat,lon"` text as emitted by
/// `geo.position` meta tags.
pub fn coerce_geo(value: &Value) -> Option<Value> {
    let (lat, lon) = match value {
        Value::Object(map) => (
            geo_number(map.get("lat").or_else(|| map.get("latitude")))?,
            geo_number(map.get("lon").or_else(|| map.get("longitude")))?,
        ),
        Value::Text(s) => {
            let (lat, lon) = s.split_once(';').or_else(|| s.split_once(','))?;
            (lat.trim().parse().ok()?, lon.trim().parse().ok()?)
        }
        _ => return None,
    };

    let mut out = Map::new();
    out.insert("lat".to_string(), Json::from(lat));
    out.insert("lon".to_string(), Json::from(lon));
    Some(Value::Object(out))
}

fn geo_number(json: Option<&Json>) -> Option<f64> {
    match json? {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Fallback parser: decode JSON embedded in a string value.
pub fn parse_json_value(raw: &Json) -> Result<Value, String> {
    match raw {
        Json::String(s) => {
            let decoded: Json = serde_json::from_str(s).map_err(|err| err.to_string())?;
            Ok(Value::from_json(&decoded))
        }
        other => Ok(Value::from_json(other)),
    }
}

/// Fallback parser for list fields; scalar results are wrapped.
pub fn parse_json_list(raw: &Json) -> Result<Value, String> {
    match parse_json_value(raw)? {
        list @ Value::List(_) => Ok(list),
        Value::Null => Ok(Value::List(Vec::new())),
        scalar => Ok(Value::List(vec![scalar])),
    }
}

/// Fallback parser for object fields.
pub fn parse_json_object(raw: &Json) -> Result<Value, String> {
    match parse_json_value(raw)? {
        object @ Value::Object(_) => Ok(object),
        other => Err(format!("expected a JSON object, got {}", type_label(&other))),
    }
}

fn type_label(value: &Value) -> String {
    match value.field_type() {
        Some(field_type) => field_type.to_string(),
        None => "null".to_string(),
    }
}

/// Serializer for datetime fields: RFC 3339 text or null.
pub fn serialize_date(value: &Value) -> Json {
    match value {
        Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
        Value::Text(s) => match parse_date(s) {
            Some(dt) => Json::String(dt.to_rfc3339()),
            None => Json::Null,
        },
        _ => Json::Null,
    }
}

/// Output processor: drop falsy entries and duplicates, preserving order.
///
/// A list that clears to nothing is dropped entirely, which omits the
/// field from serialized output.
pub fn clear_list(value: Value) -> Option<Value> {
    match value {
        Value::List(items) => {
            let mut cleared: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if item.is_truthy() && !cleared.contains(&item) {
                    cleared.push(item);
                }
            }
            if cleared.is_empty() { None } else { Some(Value::List(cleared)) }
        }
        other => Some(other),
    }
}
