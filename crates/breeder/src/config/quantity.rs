//! Serde helpers for `uom` quantities written as unit-bearing strings.
//!
//! Values take the form `"<number> <unit>"`, where the unit is an
//! abbreviation (`"h"`, `"m/s"`), a singular name (`"hour"`), or a plural
//! name (`"square meters"`).

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, de};

pub(crate) fn deserialize<'de, D, Q>(deserializer: D) -> Result<Q, D::Error>
where
    D: Deserializer<'de>,
    Q: FromStr,
    Q::Err: Display,
{
    let s = String::deserialize(deserializer)?;
    parse(&s)
}

pub(crate) fn deserialize_vec<'de, D, Q>(deserializer: D) -> Result<Vec<Q>, D::Error>
where
    D: Deserializer<'de>,
    Q: FromStr,
    Q::Err: Display,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|s| parse(s))
        .collect()
}

fn parse<Q, E>(s: &str) -> Result<Q, E>
where
    Q: FromStr,
    Q::Err: Display,
    E: de::Error,
{
    s.parse::<Q>()
        .map_err(|e| E::custom(format!("failed to parse quantity {s:?}: {e}")))
}
