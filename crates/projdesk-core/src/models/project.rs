use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire format of `deadline_date`, minute precision, no timezone
pub const DEADLINE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// One selectable status or priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub name: String,
}

/// Response of `/status_priority/`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPriority {
    #[serde(default)]
    pub project_statuses: Vec<Choice>,
    #[serde(default)]
    pub priority_labels: Vec<Choice>,
}

impl StatusPriority {
    pub fn status(&self, id: i64) -> Option<&Choice> {
        self.project_statuses.iter().find(|c| c.id == id)
    }

    pub fn priority(&self, id: i64) -> Option<&Choice> {
        self.priority_labels.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    #[serde(with = "deadline_format")]
    pub deadline_date: NaiveDateTime,
    pub status: i64,
    pub priority: i64,
}

/// Project as returned by `/create_project/`.
/// The server returns varying subsets of these, so every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline_date: Option<String>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub priority: Option<Value>,
}

mod deadline_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DEADLINE_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(DEADLINE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, DEADLINE_FORMAT).map_err(serde::de::Error::custom)
    }
}
