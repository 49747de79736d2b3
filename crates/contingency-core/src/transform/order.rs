//! Ordering of identification numbers.
//!
//! Numeric ids compare by value (any length, leading zeros ignored),
//! numbers sort before text, text compares lexicographically, and
//! missing values sort last.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum IdKey<'a> {
    /// Digits without leading zeros ("" for zero)
    Number(&'a str),
    Text(&'a str),
    Missing,
}

fn key(value: Option<&str>) -> IdKey<'_> {
    let value = match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return IdKey::Missing,
    };
    if value.bytes().all(|b| b.is_ascii_digit()) {
        IdKey::Number(value.trim_start_matches('0'))
    } else {
        IdKey::Text(value)
    }
}

pub fn compare_ids(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (key(a), key(b)) {
        (IdKey::Number(x), IdKey::Number(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (IdKey::Number(_), _) => Ordering::Less,
        (_, IdKey::Number(_)) => Ordering::Greater,
        (IdKey::Text(x), IdKey::Text(y)) => x.cmp(y),
        (IdKey::Text(_), IdKey::Missing) => Ordering::Less,
        (IdKey::Missing, IdKey::Text(_)) => Ordering::Greater,
        (IdKey::Missing, IdKey::Missing) => Ordering::Equal,
    }
}
