use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Timestamp = DateTime<Utc>;

pub const LIST_ALL: &str = "all";
pub const LIST_TODAY: &str = "today";
pub const LIST_IMPORTANT: &str = "important";
pub const LIST_PLANNED: &str = "planned";
pub const LIST_ASSIGNED: &str = "assigned";
pub const LIST_OUTDOOR: &str = "outdoor";

pub const DEFAULT_LIST_ICON: &str = "List";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    None,
    Daily,
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub important: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<Timestamp>,
    #[serde(default)]
    pub reminder: Option<Timestamp>,
    #[serde(default, deserialize_with = "deserialize_repeat")]
    pub repeat: Option<Repeat>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub is_outdoor: bool,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    // Read by the "assigned" list; nothing assigns tasks yet.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub assigned: bool,
    pub created_at: Timestamp,
    #[serde(default)]
    pub position: i64,
}

/// Input for creating a task. Every field except `title` is optional and
/// falls back to the documented default when the task is built:
///
/// - `important`: false
/// - `priority`: medium
/// - `due_date`, `reminder`, `repeat`, `list_id`: none
/// - `notes`, `location`: empty
/// - `steps`: empty
/// - `is_outdoor`: false
/// - `position`: 0
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub important: bool,
    pub priority: Option<Priority>,
    pub due_date: Option<Timestamp>,
    pub reminder: Option<Timestamp>,
    #[serde(deserialize_with = "deserialize_repeat")]
    pub repeat: Option<Repeat>,
    pub notes: String,
    pub steps: Vec<Step>,
    pub is_outdoor: bool,
    pub location: String,
    pub list_id: Option<String>,
    pub position: Option<i64>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub name: String,
    pub icon: String,
}

impl List {
    fn system(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }

    /// The lists every store starts with. Their membership is computed from task
    /// fields, except `outdoor` which behaves like a custom list id.
    pub fn system_lists() -> Vec<List> {
        vec![
            Self::system(LIST_ALL, "All Tasks", "CheckCircleOutline"),
            Self::system(LIST_TODAY, "Today", "Today"),
            Self::system(LIST_IMPORTANT, "Important", "Star"),
            Self::system(LIST_PLANNED, "Planned", "CalendarMonth"),
            Self::system(LIST_ASSIGNED, "Assigned to me", "Person"),
            Self::system(LIST_OUTDOOR, "Outdoor Tasks", "WbSunny"),
        ]
    }

    pub fn is_system(&self) -> bool {
        is_system_list(&self.id)
    }
}

pub fn is_system_list(id: &str) -> bool {
    matches!(
        id,
        LIST_ALL | LIST_TODAY | LIST_IMPORTANT | LIST_PLANNED | LIST_ASSIGNED | LIST_OUTDOOR
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    pub temperature: i64,
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub location: String,
    pub humidity: f64,
    pub wind_speed: f64,
    pub coordinates: Coordinates,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

/// Older stores wrote an empty string when no repeat was picked.
pub(crate) fn deserialize_repeat<'de, D>(deserializer: D) -> Result<Option<Repeat>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => match s.trim() {
            "none" => Ok(Some(Repeat::None)),
            "daily" => Ok(Some(Repeat::Daily)),
            "weekly" => Ok(Some(Repeat::Weekly)),
            "monthly" => Ok(Some(Repeat::Monthly)),
            other => Err(D::Error::custom(format!("unknown repeat rule: {other}"))),
        },
        other => Err(D::Error::custom(format!("invalid repeat value: {other}"))),
    }
}
