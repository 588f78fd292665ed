use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::collections::Collection;
use crate::services::{
    DocumentStore, FieldMap, PageQuery, PrefixQuery, Record, StoreError, StoreResult,
    strip_reserved,
};
use crate::surreal::{self as sql, SurrealClient};

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// `DocumentStore` over a SurrealDB database, one table per collection.
#[derive(Clone)]
pub struct SurrealStore {
    client: SurrealClient,
}

impl SurrealStore {
    pub fn new(client: SurrealClient) -> Self {
        Self { client }
    }

    fn to_records(rows: Vec<Value>) -> StoreResult<Vec<Record>> {
        rows.into_iter().map(Self::to_record).collect()
    }

    fn to_record(row: Value) -> StoreResult<Record> {
        serde_json::from_value(row)
            .map_err(|err| StoreError::Backend(format!("malformed row: {err}")))
    }
}

/// Field names are spliced into SurrealQL, so only plain identifiers are accepted.
fn identifier(field: &str) -> StoreResult<&str> {
    let mut chars = field.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(field)
    } else {
        Err(StoreError::Rejected(format!("invalid field name {field:?}")))
    }
}

#[async_trait]
impl DocumentStore for SurrealStore {
    async fn query_page(
        &self,
        collection: Collection,
        query: &PageQuery,
    ) -> StoreResult<Vec<Record>> {
        let after = query.after.as_ref().map(|cursor| {
            (
                cursor
                    .created_at()
                    .to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
                cursor.id().to_string(),
            )
        });
        let rows = sql::select_page(&self.client, collection.as_str(), query.limit, after).await?;
        Self::to_records(rows)
    }

    async fn query_prefix(
        &self,
        collection: Collection,
        query: &PrefixQuery,
    ) -> StoreResult<Vec<Record>> {
        let field = identifier(&query.field)?;
        let rows = sql::select_prefix(
            &self.client,
            collection.as_str(),
            field,
            query.prefix.clone(),
            query.upper_bound(),
            query.limit,
        )
        .await?;
        Self::to_records(rows)
    }

    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Record>> {
        let field = identifier(field)?;
        let rows = sql::select_eq(&self.client, collection.as_str(), field, value.clone()).await?;
        Self::to_records(rows)
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        sql::select_one(&self.client, collection.as_str(), id)
            .await?
            .map(Self::to_record)
            .transpose()
    }

    async fn create(&self, collection: Collection, mut fields: FieldMap) -> StoreResult<Record> {
        strip_reserved(&mut fields);
        let id = sql::insert(&self.client, collection.as_str(), Value::Object(fields))
            .await?
            .ok_or_else(|| StoreError::Rejected(format!("{collection}: create returned nothing")))?;
        debug!(collection = %collection, id = %id, "record created");
        self.get(collection, &id)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("{collection}/{id} vanished after create")))
    }

    async fn patch(
        &self,
        collection: Collection,
        id: &str,
        mut fields: FieldMap,
    ) -> StoreResult<Record> {
        strip_reserved(&mut fields);
        let not_found = || StoreError::NotFound {
            collection: collection.as_str().into(),
            id: id.into(),
        };
        if self.get(collection, id).await?.is_none() {
            return Err(not_found());
        }
        sql::merge(&self.client, collection.as_str(), id, Value::Object(fields)).await?;
        self.get(collection, id).await?.ok_or_else(not_found)
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        sql::remove(&self.client, collection.as_str(), id).await?;
        Ok(())
    }

    async fn count(&self, collection: Collection) -> StoreResult<u64> {
        Ok(sql::count(&self.client, collection.as_str()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_plain_identifiers_reach_queries() {
        assert_eq!(identifier("name"), Ok("name"));
        assert_eq!(identifier("_score2"), Ok("_score2"));
        assert!(identifier("name; DELETE movies").is_err());
        assert!(identifier("2name").is_err());
        assert!(identifier("").is_err());
    }

    #[test]
    fn rows_decode_into_records() {
        let row = serde_json::json!({
            "id": "k1x9",
            "createdAt": "2025-01-10T08:30:00.123456Z",
            "title": "Coolie first look"
        });
        let record = SurrealStore::to_record(row).unwrap();
        assert_eq!(record.id, "k1x9");
        assert!(record.updated_at.is_none());
        assert_eq!(record.str_field("title"), Some("Coolie first look"));
    }
}
