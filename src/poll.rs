use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{ContentError, ContentResult};
use crate::services::FieldMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub votes: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub question: String,
    pub options: Vec<PollOption>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PollStatus {
    Scheduled,
    Active,
    Ended,
}

impl Poll {
    pub fn status(&self, now: DateTime<Utc>) -> PollStatus {
        if now < self.start_time {
            PollStatus::Scheduled
        } else if now > self.end_time {
            PollStatus::Ended
        } else {
            PollStatus::Active
        }
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| option.votes).sum()
    }

    pub fn percentage_of(&self, option_id: &str) -> u32 {
        let total = self.total_votes();
        self.options
            .iter()
            .find(|option| option.id == option_id)
            .map_or(0, |option| percentage(option.votes, total))
    }
}

/// Share of `total` rounded to the nearest whole percent; 0 when nobody has voted.
pub fn percentage(votes: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (votes as f64 / total as f64 * 100.0).round() as u32
}

/// Drops blank options and fills missing ids with the 1-based position among the kept ones.
pub fn normalize_options(options: Vec<PollOption>) -> Vec<PollOption> {
    options
        .into_iter()
        .filter(|option| !option.text.trim().is_empty())
        .enumerate()
        .map(|(index, mut option)| {
            if option.id.is_empty() {
                option.id = (index + 1).to_string();
            }
            option
        })
        .collect()
}

/// At least two options with non-blank text are required to save a poll.
pub fn validate_options(fields: &FieldMap) -> ContentResult<()> {
    let filled = fields
        .get("options")
        .and_then(Value::as_array)
        .map_or(0, |options| {
            options
                .iter()
                .filter(|option| {
                    option
                        .get("text")
                        .and_then(Value::as_str)
                        .is_some_and(|text| !text.trim().is_empty())
                })
                .count()
        });
    if filled < 2 {
        return Err(ContentError::Validation(
            "Please add at least 2 options".into(),
        ));
    }
    Ok(())
}

/// Rewrites `options` in a poll payload through [`normalize_options`].
pub fn normalize_payload(fields: &mut FieldMap) -> ContentResult<()> {
    let Some(raw) = fields.remove("options") else {
        return Ok(());
    };
    let options: Vec<PollOption> = serde_json::from_value(raw)
        .map_err(|err| ContentError::Validation(format!("invalid poll options: {err}")))?;
    let normalized = serde_json::to_value(normalize_options(options))
        .map_err(|err| ContentError::Validation(err.to_string()))?;
    fields.insert("options".into(), normalized);
    Ok(())
}

/// Votes cast from this client, at most one per poll. Nothing is persisted.
#[derive(Clone, Debug, Default)]
pub struct Ballot {
    choices: HashMap<String, String>,
}

impl Ballot {
    /// Records a vote and returns false when this poll was already voted on.
    pub fn vote(&mut self, poll_id: &str, option_id: &str) -> bool {
        if self.choices.contains_key(poll_id) {
            return false;
        }
        self.choices.insert(poll_id.to_string(), option_id.to_string());
        true
    }

    pub fn choice(&self, poll_id: &str) -> Option<&str> {
        self.choices.get(poll_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn option(id: &str, text: &str, votes: u64) -> PollOption {
        PollOption {
            id: id.into(),
            text: text.into(),
            votes,
            ..PollOption::default()
        }
    }

    #[test]
    fn status_follows_the_window() {
        let now = Utc::now();
        let poll = Poll {
            question: "Best debut?".into(),
            options: vec![],
            start_time: now + Duration::hours(1),
            end_time: now + Duration::hours(2),
        };
        assert_eq!(poll.status(now), PollStatus::Scheduled);
        assert_eq!(poll.status(now + Duration::minutes(90)), PollStatus::Active);
        assert_eq!(poll.status(now + Duration::hours(3)), PollStatus::Ended);
    }

    #[test]
    fn percentages_round_and_survive_zero_votes() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        let now = Utc::now();
        let poll = Poll {
            question: "q".into(),
            options: vec![option("1", "A", 3), option("2", "B", 1)],
            start_time: now,
            end_time: now,
        };
        assert_eq!(poll.total_votes(), 4);
        assert_eq!(poll.percentage_of("1"), 75);
        assert_eq!(poll.percentage_of("9"), 0);
    }

    #[test]
    fn blank_options_are_dropped_and_ids_assigned() {
        let normalized = normalize_options(vec![
            option("", "Kalki", 0),
            option("", "   ", 0),
            option("1719000000000", "Pushpa 2", 0),
            option("", "Coolie", 0),
        ]);
        let ids: Vec<_> = normalized.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1719000000000", "3"]);
    }

    #[test]
    fn two_filled_options_are_required() {
        let one = json!({ "options": [{ "text": "A" }, { "text": " " }] });
        assert!(validate_options(one.as_object().unwrap()).is_err());
        let two = json!({ "options": [{ "text": "A" }, { "text": "B" }] });
        assert!(validate_options(two.as_object().unwrap()).is_ok());
    }

    #[test]
    fn one_vote_per_poll() {
        let mut ballot = Ballot::default();
        assert!(ballot.vote("p1", "1"));
        assert!(!ballot.vote("p1", "2"));
        assert_eq!(ballot.choice("p1"), Some("1"));
    }
}
