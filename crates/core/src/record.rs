//! Job-posting records.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::ops::Index;

use crate::error::{Error, Result};
use crate::pair::{JobPair, PairKey};

/// Required field naming the employer.
pub const COMPANY_FIELD: &str = "company";

/// Required field naming the position.
pub const TITLE_FIELD: &str = "title";

/// Output field carrying the numeric level.
pub const SENIORITY_FIELD: &str = "seniority";

/// Output field carrying the textual label.
pub const SENIORITY_LEVEL_FIELD: &str = "seniority_level";

static NULL: Value = Value::Null;

/// One job posting.
///
/// The whole line is kept as one ordered JSON object, so every field other
/// than the two seniority fields is written back exactly as it was read:
/// same key order, same number text. `company` and `title` are checked to
/// be strings on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPosting {
    fields: Map<String, Value>,
}

impl JobPosting {
    pub fn new(company: impl Into<String>, title: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(COMPANY_FIELD.to_string(), Value::String(company.into()));
        fields.insert(TITLE_FIELD.to_string(), Value::String(title.into()));
        Self { fields }
    }

    /// Wraps a decoded object, requiring string `company` and `title`.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self> {
        for name in [COMPANY_FIELD, TITLE_FIELD] {
            match fields.get(name) {
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(Error::invalid_record(format!(
                        "field '{}' must be a string, got {}",
                        name, other
                    )))
                }
                None => {
                    return Err(Error::invalid_record(format!(
                        "missing field '{}'",
                        name
                    )))
                }
            }
        }
        Ok(Self { fields })
    }

    /// Adds or replaces a field. `company` and `title` keep their values.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }

    /// Sets `name`; an existing key keeps its position. Returns `false` and
    /// changes nothing when the value would break `company` or `title`.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        let value = value.into();
        if (name == COMPANY_FIELD || name == TITLE_FIELD) && !value.is_string() {
            return false;
        }
        self.fields.insert(name, value);
        true
    }

    /// Decodes one JSON line.
    pub fn from_json_line(line: &[u8]) -> Result<Self> {
        let fields: Map<String, Value> =
            serde_json::from_slice(line).map_err(|e| Error::invalid_record(e.to_string()))?;
        Self::from_map(fields)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.fields)?)
    }

    pub fn company(&self) -> &str {
        self.str_field(COMPANY_FIELD)
    }

    pub fn title(&self) -> &str {
        self.str_field(TITLE_FIELD)
    }

    fn str_field(&self, name: &str) -> &str {
        self.fields.get(name).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All fields in input order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn pair(&self) -> JobPair {
        JobPair::new(self.company(), self.title())
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.company(), self.title())
    }

    /// Numeric seniority, if the record has been augmented.
    pub fn seniority(&self) -> Option<i64> {
        self.fields.get(SENIORITY_FIELD).and_then(Value::as_i64)
    }

    pub fn seniority_level(&self) -> Option<&str> {
        self.fields.get(SENIORITY_LEVEL_FIELD).and_then(Value::as_str)
    }
}

/// Missing fields index as `null`, like [`Value`].
impl Index<&str> for JobPosting {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }
}

impl Serialize for JobPosting {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JobPosting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = Map::deserialize(deserializer)?;
        Self::from_map(fields).map_err(de::Error::custom)
    }
}
