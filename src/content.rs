use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::errors::{ContentError, ContentResult};
use crate::services::{FieldMap, Record};

pub const INDUSTRIES: [&str; 7] = [
    "Tollywood",
    "Bollywood",
    "Kollywood",
    "Sandalwood",
    "Hollywood",
    "Mollywood",
    "Pan India",
];

pub const NEWS_CATEGORIES: [&str; 12] = [
    "Tollywood",
    "Bollywood",
    "Kollywood",
    "Sandalwood",
    "Hollywood",
    "Mollywood",
    "Pan India",
    "Sports",
    "Cricket",
    "Technology",
    "Politics",
    "Finance",
];

/// `(id, display name)` of the streaming platforms a movie can list.
pub const OTT_PLATFORMS: [(&str, &str); 7] = [
    ("netflix", "Netflix"),
    ("prime", "Amazon Prime"),
    ("hotstar", "Disney+ Hotstar"),
    ("zee5", "ZEE5"),
    ("sonyliv", "SonyLIV"),
    ("aha", "Aha"),
    ("jiocinema", "JioCinema"),
];

/// Identity and display name of another record, copied by value when it was picked.
///
/// This is a snapshot: renaming the referenced record later does not touch copies already
/// embedded elsewhere, and nothing checks that the referenced record still exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub name: String,
}

impl Reference {
    /// Captures `record` under the display name held in `name_field`. Records without that
    /// field yield `None`.
    pub fn snapshot(record: &Record, name_field: &str) -> Option<Self> {
        Some(Self {
            id: record.id.clone(),
            name: record.str_field(name_field)?.to_string(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub name: String,
    pub genre: String,
    pub industry: String,
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub trailer_url: String,
    #[serde(default)]
    pub is_top_box_office: bool,
    #[serde(default)]
    pub ott_platforms: Vec<String>,
    #[serde(default)]
    pub cast: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Movie {
    /// Adds a cast member unless one with the same id is already listed.
    pub fn add_cast(&mut self, member: Reference) -> bool {
        if self.cast.iter().any(|existing| existing.id == member.id) {
            return false;
        }
        self.cast.push(member);
        true
    }

    pub fn remove_cast(&mut self, id: &str) {
        self.cast.retain(|member| member.id != id);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Celebrity {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub author: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub is_promotion: bool,
    #[serde(default)]
    pub is_weekly_magazine: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub title: String,
    pub author: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_promotion: bool,
    #[serde(default)]
    pub is_weekly_magazine: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Serializes a typed document into the field map a store write expects.
pub fn to_fields<T: Serialize>(document: &T) -> ContentResult<FieldMap> {
    match serde_json::to_value(document) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(ContentError::Validation("document must be an object".into())),
        Err(err) => Err(ContentError::Validation(err.to_string())),
    }
}

/// Reads a stored record back into its typed form.
pub fn decode<T: DeserializeOwned>(record: &Record) -> ContentResult<T> {
    serde_json::from_value(Value::Object(record.fields.clone()))
        .map_err(|err| ContentError::Validation(format!("record {}: {err}", record.id)))
}
