use serde::Deserialize;
use serde_json::Value;
use surrealdb::{
    Surreal,
    engine::remote::http::{Client, Http},
    opt::auth::Root,
};
use tracing::info;

use crate::collections::Collection;
use crate::config::SurrealConfig;

pub type SurrealClient = Surreal<Client>;

/// Columns every read returns: the stored fields, the bare record key as `id` and both
/// timestamps rendered as RFC 3339 strings.
const PROJECTION: &str = "*, meta::id(id) AS id, <string> createdAt AS createdAt, \
     (IF updatedAt THEN <string> updatedAt ELSE NONE END) AS updatedAt";

/// The HTTP engine takes `host:port`; a scheme in the configured endpoint is dropped.
fn normalize_endpoint(raw: &str) -> &str {
    let ep = raw.trim();
    ep.strip_prefix("http://")
        .or_else(|| ep.strip_prefix("https://"))
        .unwrap_or(ep)
        .trim_end_matches('/')
}

pub async fn connect(config: &SurrealConfig) -> Result<SurrealClient, surrealdb::Error> {
    let endpoint = normalize_endpoint(&config.endpoint);
    info!(
        endpoint,
        namespace = %config.namespace,
        database = %config.database,
        "connecting to SurrealDB (HTTP)"
    );
    let client = Surreal::new::<Http>(endpoint).await?;
    client
        .signin(Root {
            username: &config.username,
            password: &config.password,
        })
        .await?;
    client
        .use_ns(&config.namespace)
        .use_db(&config.database)
        .await?;
    ensure_schema(&client).await?;
    Ok(client)
}

/// `createdAt` is filled by the database on insert and can never be written afterwards.
pub async fn ensure_schema(client: &SurrealClient) -> Result<(), surrealdb::Error> {
    let statements: String = Collection::ALL
        .iter()
        .map(|collection| {
            format!(
                "DEFINE FIELD IF NOT EXISTS createdAt ON TABLE {table} \
                 TYPE datetime DEFAULT time::now() READONLY;\n",
                table = collection.as_str()
            )
        })
        .collect();
    client.query(statements).await?.check()?;
    Ok(())
}

/// Newest first, ties broken by record id, optionally strictly after a cursor.
pub async fn select_page(
    client: &SurrealClient,
    table: &str,
    limit: usize,
    after: Option<(String, String)>,
) -> Result<Vec<Value>, surrealdb::Error> {
    let (after_at, after_id) = after.unzip();
    let sql = format!(
        "SELECT {PROJECTION} FROM (
            SELECT * FROM type::table($table)
            WHERE $after_at IS NONE
               OR createdAt < <datetime>$after_at
               OR (createdAt = <datetime>$after_at AND id < type::thing($table, $after_id))
            ORDER BY createdAt DESC, id DESC
            LIMIT $limit
        );"
    );
    let mut response = client
        .query(sql)
        .bind(("table", table.to_owned()))
        .bind(("after_at", after_at))
        .bind(("after_id", after_id))
        .bind(("limit", limit))
        .await?;
    response.take(0)
}

/// Range scan `[prefix, upper)` on `field`, ascending. `field` must be a plain identifier.
pub async fn select_prefix(
    client: &SurrealClient,
    table: &str,
    field: &str,
    prefix: String,
    upper: String,
    limit: usize,
) -> Result<Vec<Value>, surrealdb::Error> {
    let sql = format!(
        "SELECT {PROJECTION} FROM (
            SELECT * FROM type::table($table)
            WHERE {field} >= $prefix AND {field} < $upper
            ORDER BY {field} ASC
            LIMIT $limit
        );"
    );
    let mut response = client
        .query(sql)
        .bind(("table", table.to_owned()))
        .bind(("prefix", prefix))
        .bind(("upper", upper))
        .bind(("limit", limit))
        .await?;
    response.take(0)
}

/// Every record whose `field` equals `value`, newest first.
pub async fn select_eq(
    client: &SurrealClient,
    table: &str,
    field: &str,
    value: Value,
) -> Result<Vec<Value>, surrealdb::Error> {
    let sql = format!(
        "SELECT {PROJECTION} FROM (
            SELECT * FROM type::table($table)
            WHERE {field} = $value
            ORDER BY createdAt DESC, id DESC
        );"
    );
    let mut response = client
        .query(sql)
        .bind(("table", table.to_owned()))
        .bind(("value", value))
        .await?;
    response.take(0)
}

pub async fn select_one(
    client: &SurrealClient,
    table: &str,
    id: &str,
) -> Result<Option<Value>, surrealdb::Error> {
    let mut response = client
        .query(format!("SELECT {PROJECTION} FROM type::thing($table, $id);"))
        .bind(("table", table.to_owned()))
        .bind(("id", id.to_owned()))
        .await?;
    response.take(0)
}

/// Inserts a record and returns its generated key.
pub async fn insert(
    client: &SurrealClient,
    table: &str,
    fields: Value,
) -> Result<Option<String>, surrealdb::Error> {
    #[derive(Deserialize)]
    struct Created {
        id: String,
    }

    let mut response = client
        .query("CREATE type::table($table) CONTENT $fields RETURN meta::id(id) AS id;")
        .bind(("table", table.to_owned()))
        .bind(("fields", fields))
        .await?;
    let created: Option<Created> = response.take(0)?;
    Ok(created.map(|row| row.id))
}

/// Merges `fields` into an existing record and stamps `updatedAt`.
pub async fn merge(
    client: &SurrealClient,
    table: &str,
    id: &str,
    fields: Value,
) -> Result<(), surrealdb::Error> {
    client
        .query(
            "UPDATE type::thing($table, $id) MERGE $fields;
             UPDATE type::thing($table, $id) SET updatedAt = time::now();",
        )
        .bind(("table", table.to_owned()))
        .bind(("id", id.to_owned()))
        .bind(("fields", fields))
        .await?
        .check()?;
    Ok(())
}

pub async fn remove(client: &SurrealClient, table: &str, id: &str) -> Result<(), surrealdb::Error> {
    client
        .query("DELETE type::thing($table, $id);")
        .bind(("table", table.to_owned()))
        .bind(("id", id.to_owned()))
        .await?
        .check()?;
    Ok(())
}

pub async fn count(client: &SurrealClient, table: &str) -> Result<u64, surrealdb::Error> {
    #[derive(Deserialize)]
    struct CountRow {
        count: u64,
    }

    let mut response = client
        .query("SELECT count() AS count FROM type::table($table) GROUP ALL;")
        .bind(("table", table.to_owned()))
        .await?;
    let row: Option<CountRow> = response.take(0)?;
    Ok(row.map_or(0, |row| row.count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_scheme_is_stripped() {
        assert_eq!(normalize_endpoint("http://127.0.0.1:8000/"), "127.0.0.1:8000");
        assert_eq!(normalize_endpoint(" db.local:8000 "), "db.local:8000");
    }
}
