use crate::services::Record;

/// Case-insensitive substring match over the cached records. An empty query keeps
/// everything; records whose search fields are missing or not strings never match.
/// Relative order is preserved and the store is never consulted.
pub fn filter_records(records: &[Record], query: &str, fields: &[&str]) -> Vec<Record> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| matches(record, &needle, fields))
        .cloned()
        .collect()
}

fn matches(record: &Record, needle: &str, fields: &[&str]) -> bool {
    fields.iter().any(|field| {
        record
            .str_field(field)
            .is_some_and(|value| value.to_lowercase().contains(needle))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::FieldMap;
    use chrono::Utc;
    use serde_json::json;

    fn record(id: &str, fields: serde_json::Value) -> Record {
        Record {
            id: id.into(),
            created_at: Utc::now(),
            updated_at: None,
            fields: fields.as_object().cloned().unwrap_or_else(FieldMap::new),
        }
    }

    #[test]
    fn matches_case_insensitively_in_order() {
        let records = vec![
            record("1", json!({ "title": "Pushpa 2 trailer" })),
            record("2", json!({ "title": "Coolie update" })),
            record("3", json!({ "title": "PUSHPA collections" })),
        ];
        let hits = filter_records(&records, "pushpa", &["title"]);
        let ids: Vec<_> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn empty_query_returns_everything() {
        let records = vec![record("1", json!({})), record("2", json!({ "title": 4 }))];
        assert_eq!(filter_records(&records, "", &["title"]).len(), 2);
    }

    #[test]
    fn missing_or_non_string_fields_never_match() {
        let records = vec![
            record("1", json!({})),
            record("2", json!({ "title": 42 })),
            record("3", json!({ "email": "a@b.c", "username": "critic" })),
        ];
        assert!(filter_records(&records, "4", &["title"]).is_empty());
        let hits = filter_records(&records, "crit", &["email", "username"]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");
    }
}
