//! Typed row structs for the two OpenAIRE line-record shapes.
//!
//! Decoding fails soft: a line missing a required field is a decode error
//! the caller skips and counts, never a panic or an aborted scan.

use serde::{Deserialize, Deserializer};

/// Relation types kept at extraction time. Deliberately wider than
/// [`AGGREGATE_REL_TYPES`]: the extracted parts serve other consumers too.
pub const EXTRACT_REL_TYPES: [&str; 6] = [
    "Cites",
    "IsCitedBy",
    "IsReferencedBy",
    "References",
    "IsSupplementedBy",
    "IsSupplementTo",
];

/// Relation types kept when loading parts back for aggregation.
pub const AGGREGATE_REL_TYPES: [&str; 3] = ["Cites", "References", "IsSupplementedBy"];

/// Deserialize null as empty string (for optional String fields)
fn null_to_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|opt| opt.unwrap_or_default())
}

/// OpenAIRE serializes trust as a JSON string ("0.9"); some records use a
/// bare number. Accept both without an intermediate Value allocation.
fn trust_to_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TrustVisitor;

    impl serde::de::Visitor<'_> for TrustVisitor {
        type Value = Option<f64>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number, a numeric string, or null")
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v as f64))
        }

        fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<Self::Value, E> {
            Ok(s.trim().parse().ok())
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(TrustVisitor)
}

#[derive(Debug, Deserialize)]
pub struct RelTypeName {
    pub name: String, // required
}

/// Minimal relation decode used by the extraction filter. The three
/// fields are required; anything else on the line is ignored because
/// in-scope lines are copied verbatim, not re-serialized.
#[derive(Debug, Deserialize)]
pub struct RelationProbe {
    #[serde(rename = "relType")]
    pub rel_type: RelTypeName,
    pub source: String,
    pub target: String,
}

impl RelationProbe {
    pub fn decode(line: &str) -> Option<Self> {
        sonic_rs::from_str(line).ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct RelationProvenance {
    #[serde(default, deserialize_with = "null_to_empty")]
    pub provenance: String, // optional
    #[serde(default, deserialize_with = "trust_to_f64")]
    pub trust: Option<f64>,
}

/// Full relation decode used when loading extracted parts back for
/// aggregation.
#[derive(Debug, Deserialize)]
pub struct RelationRecord {
    #[serde(rename = "relType")]
    pub rel_type: RelTypeName,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub provenance: Option<RelationProvenance>,
    #[serde(default)]
    pub validated: Option<bool>,
}

impl RelationRecord {
    pub fn decode(line: &str) -> Option<Self> {
        sonic_rs::from_str(line).ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct PidEntry {
    #[serde(default, deserialize_with = "null_to_empty")]
    pub scheme: String,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub value: String,
}

/// Entity line shape from the non-relation shards.
#[derive(Debug, Deserialize)]
pub struct EntityRecord {
    pub id: String, // required
    #[serde(rename = "type")]
    pub entity_type: String, // required
    #[serde(default)]
    pub pid: Vec<PidEntry>,
}

impl EntityRecord {
    pub fn decode(line: &str) -> Option<Self> {
        sonic_rs::from_str(line).ok()
    }

    /// DOIs attached to this entity (pid entries with scheme `doi`).
    pub fn dois(&self) -> impl Iterator<Item = &str> {
        self.pid
            .iter()
            .filter(|p| p.scheme == "doi" && !p.value.is_empty())
            .map(|p| p.value.as_str())
    }
}
