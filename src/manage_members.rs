use serde_json::json;

use crate::auth::Role;
use crate::collections::Collection;
use crate::controller::CollectionController;
use crate::errors::{ContentError, ContentResult};
use crate::services::{DocumentStore, FieldMap, Record};

/// Users screen controller.
pub fn users_controller<S: DocumentStore>(store: S) -> CollectionController<S> {
    CollectionController::new(store, Collection::Users)
}

pub async fn promote_to_admin<S: DocumentStore>(
    users: &CollectionController<S>,
    id: &str,
) -> ContentResult<Record> {
    set_role(users, id, Role::Admin, "User promoted to admin").await
}

pub async fn demote_to_user<S: DocumentStore>(
    users: &CollectionController<S>,
    id: &str,
) -> ContentResult<Record> {
    set_role(users, id, Role::User, "Admin privileges removed").await
}

/// Flips `isBlocked` on a cached user.
pub async fn toggle_block<S: DocumentStore>(
    users: &CollectionController<S>,
    id: &str,
) -> ContentResult<Record> {
    let user = users.record(id).ok_or_else(|| ContentError::NotFound {
        collection: Collection::Users,
        id: id.to_string(),
    })?;
    let blocked = user.bool_field("isBlocked");
    let message = if blocked { "User unblocked" } else { "User blocked" };
    users
        .patch_in_place(id, fields(json!({ "isBlocked": !blocked })), message)
        .await
}

async fn set_role<S: DocumentStore>(
    users: &CollectionController<S>,
    id: &str,
    role: Role,
    message: &str,
) -> ContentResult<Record> {
    users
        .patch_in_place(id, fields(json!({ "role": role })), message)
        .await
}

fn fields(value: serde_json::Value) -> FieldMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    #[tokio::test]
    async fn role_changes_apply_in_place() {
        let store = InMemoryStore::new();
        let user = store.seed(
            Collection::Users,
            json!({ "email": "critic@example.com", "role": "user", "isBlocked": false }),
        );
        let users = users_controller(store.clone());
        users.fetch_first_page().await.unwrap();

        promote_to_admin(&users, &user.id).await.unwrap();
        assert_eq!(users.record(&user.id).unwrap().str_field("role"), Some("admin"));
        demote_to_user(&users, &user.id).await.unwrap();
        assert_eq!(users.record(&user.id).unwrap().str_field("role"), Some("user"));
    }

    #[tokio::test]
    async fn block_toggles_both_ways() {
        let store = InMemoryStore::new();
        let user = store.seed(Collection::Users, json!({ "email": "a@b.c" }));
        let users = users_controller(store);
        users.fetch_first_page().await.unwrap();

        toggle_block(&users, &user.id).await.unwrap();
        assert!(users.record(&user.id).unwrap().bool_field("isBlocked"));
        assert_eq!(users.notifier().last().unwrap().message, "User blocked");
        toggle_block(&users, &user.id).await.unwrap();
        assert!(!users.record(&user.id).unwrap().bool_field("isBlocked"));
    }

    #[tokio::test]
    async fn failed_toggle_leaves_the_cache() {
        let store = InMemoryStore::new();
        let user = store.seed(Collection::Users, json!({ "email": "a@b.c", "isBlocked": false }));
        let users = users_controller(store.clone());
        users.fetch_first_page().await.unwrap();
        store.set_offline(true);

        assert!(toggle_block(&users, &user.id).await.is_err());
        assert!(!users.record(&user.id).unwrap().bool_field("isBlocked"));
        assert_eq!(users.notifier().last().unwrap().message, "Failed to save user");
    }
}
