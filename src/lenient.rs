//! Serde helpers for form fields that clients send as either JSON numbers
//! or numeric strings.

use serde::{Deserialize, Deserializer};

/// `12`, `12.5` and `"12"` all read as numbers. A string that does not
/// parse, an empty string or `null` reads as `None`.
pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<NumberOrText>::deserialize(d)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        None => None,
    })
}
