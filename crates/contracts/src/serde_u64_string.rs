//! Serialize u64 fields (seeds, replay hashes) as decimal strings so JSON
//! consumers never lose precision past 2^53. Accepts either form on input.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(value)
}

struct U64OrString;

impl Visitor<'_> for U64OrString {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a u64 or its decimal string form")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        Ok(value)
    }

    fn visit_str<E: de::Error>(self, raw: &str) -> Result<u64, E> {
        raw.parse::<u64>().map_err(de::Error::custom)
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(U64OrString)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Carrier {
        #[serde(with = "super")]
        seed: u64,
    }

    #[test]
    fn encodes_as_string_and_accepts_both_forms() {
        let encoded = serde_json::to_string(&Carrier { seed: u64::MAX }).expect("serialize");
        assert_eq!(encoded, format!("{{\"seed\":\"{}\"}}", u64::MAX));

        let from_string: Carrier = serde_json::from_str(&encoded).expect("string form");
        assert_eq!(from_string.seed, u64::MAX);

        let from_number: Carrier = serde_json::from_str(r#"{"seed":42}"#).expect("numeric form");
        assert_eq!(from_number.seed, 42);
    }
}
