use serde::Serialize;
use tracing::{debug, error};

use crate::collections::Collection;
use crate::controller::collection::CollectionController;
use crate::controller::form::{EditForm, FormMode};
use crate::errors::{ContentError, ContentResult};
use crate::logging::{AuditAction, audit};
use crate::services::{DocumentStore, FieldMap, Record};

/// The editor's answer to a [`DeletePrompt`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// A pending delete waiting for the editor to confirm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeletePrompt {
    pub collection: Collection,
    pub id: String,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

impl<S: DocumentStore> CollectionController<S> {
    /// Validates and stores a new record, then reloads page one. On failure the form keeps
    /// the entered values.
    pub async fn create(&self, fields: FieldMap) -> ContentResult<Record> {
        let collection = self.collection();
        let payload = self.check(self.schema.prepare_create(fields))?;
        let record = match self.store.create(collection, payload).await {
            Ok(record) => record,
            Err(source) => {
                return Err(self.fail_write(ContentError::persistence(collection)(source)));
            }
        };
        audit(AuditAction::Create, collection, &record.id);
        self.notifier
            .success(format!("{} added successfully", self.schema.label));
        self.lock().form.close();
        self.reload().await;
        Ok(record)
    }

    /// Patches only the supplied fields and stamps `updatedAt`, then reloads page one.
    pub async fn update(&self, id: &str, fields: FieldMap) -> ContentResult<Record> {
        let collection = self.collection();
        let payload = self.check(self.schema.prepare_update(fields))?;
        let record = match self.store.patch(collection, id, payload).await {
            Ok(record) => record,
            Err(source) => {
                return Err(self.fail_write(ContentError::persistence(collection)(source)));
            }
        };
        audit(AuditAction::Update, collection, id);
        self.notifier
            .success(format!("{} updated successfully", self.schema.label));
        self.lock().form.close();
        self.reload().await;
        Ok(record)
    }

    /// First half of a delete: builds the confirmation question for a cached record.
    pub fn prompt_delete(&self, id: &str) -> ContentResult<DeletePrompt> {
        let record = self.record(id).ok_or_else(|| ContentError::NotFound {
            collection: self.collection(),
            id: id.to_string(),
        })?;
        let title = record.str_field(self.schema.title_field).unwrap_or(id);
        Ok(DeletePrompt {
            collection: self.collection(),
            id: id.to_string(),
            message: format!("Are you sure you want to delete \"{title}\"?"),
        })
    }

    /// Second half of a delete. Nothing is sent unless the prompt was confirmed; on success
    /// the record is dropped from the cache without a reload.
    pub async fn delete(
        &self,
        prompt: DeletePrompt,
        confirmation: Confirmation,
    ) -> ContentResult<DeleteOutcome> {
        if confirmation == Confirmation::Cancelled {
            debug!(collection = %prompt.collection, id = %prompt.id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        let collection = self.collection();
        if prompt.collection != collection {
            return Err(ContentError::Validation(format!(
                "prompt for {} used on {collection}",
                prompt.collection
            )));
        }
        if let Err(source) = self.store.delete(collection, &prompt.id).await {
            return Err(self.fail_write(ContentError::persistence(collection)(source)));
        }
        self.lock().records.retain(|record| record.id != prompt.id);
        audit(AuditAction::Delete, collection, &prompt.id);
        self.notifier
            .success(format!("{} deleted successfully", self.schema.label));
        Ok(DeleteOutcome::Deleted)
    }

    /// Patches a record and swaps the stored result into the cache at the same position.
    /// Used for quick toggles where a full reload would lose the editor's scroll position.
    pub async fn patch_in_place(
        &self,
        id: &str,
        fields: FieldMap,
        success_message: &str,
    ) -> ContentResult<Record> {
        let collection = self.collection();
        let payload = self.check(self.schema.prepare_update(fields))?;
        let record = match self.store.patch(collection, id, payload).await {
            Ok(record) => record,
            Err(source) => {
                return Err(self.fail_write(ContentError::persistence(collection)(source)));
            }
        };
        if let Some(cached) = self
            .lock()
            .records
            .iter_mut()
            .find(|cached| cached.id == record.id)
        {
            *cached = record.clone();
        }
        audit(AuditAction::Patch, collection, id);
        self.notifier.success(success_message);
        Ok(record)
    }

    pub fn open_create_form(&self, defaults: FieldMap) {
        self.lock().form.open_create(defaults);
    }

    pub fn open_edit_form(&self, id: &str) -> ContentResult<()> {
        let mut state = self.lock();
        let record = state
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| ContentError::NotFound {
                collection: self.collection(),
                id: id.to_string(),
            })?;
        state.form.open_edit(&record);
        Ok(())
    }

    pub fn set_form_field(&self, key: &str, value: impl Into<serde_json::Value>) {
        self.lock().form.set(key, value);
    }

    /// Runs `f` against the open form, e.g. to attach a typeahead selection.
    pub fn with_form<R>(&self, f: impl FnOnce(&mut EditForm) -> R) -> R {
        f(&mut self.lock().form)
    }

    pub fn form(&self) -> EditForm {
        self.lock().form.clone()
    }

    pub fn close_form(&self) {
        self.lock().form.close();
    }

    /// Sends the open form as a create or an update depending on how it was opened.
    pub async fn submit_form(&self) -> ContentResult<Record> {
        let (mode, fields) = {
            let state = self.lock();
            let mode = state
                .form
                .mode()
                .cloned()
                .ok_or_else(|| ContentError::Validation("no form is open".into()))?;
            (mode, state.form.fields().clone())
        };
        match mode {
            FormMode::Create => self.create(fields).await,
            FormMode::Edit(id) => self.update(&id, fields).await,
        }
    }

    fn check(&self, prepared: ContentResult<FieldMap>) -> ContentResult<FieldMap> {
        prepared.inspect_err(|err| self.notifier.error(err.user_message()))
    }

    fn fail_write(&self, err: ContentError) -> ContentError {
        error!(collection = %self.collection(), error = %err, "write failed");
        self.notifier.error(err.user_message());
        err
    }

    /// Reload after a successful write. A failed reload has already been reported and
    /// does not undo the write.
    async fn reload(&self) {
        if let Err(err) = self.reload_first_page().await {
            debug!(collection = %self.collection(), error = %err, "reload after write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn submit_without_an_open_form_is_rejected() {
        let controller = CollectionController::new(InMemoryStore::new(), Collection::News);
        assert!(matches!(
            controller.submit_form().await,
            Err(ContentError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn edit_form_submits_an_update() {
        let store = InMemoryStore::new();
        let record = store.seed(
            Collection::Celebrities,
            json!({ "name": "Prabhas", "role": "Actor" }),
        );
        let controller = CollectionController::new(store.clone(), Collection::Celebrities);
        controller.fetch_first_page().await.unwrap();
        controller.open_edit_form(&record.id).unwrap();
        controller.set_form_field("role", "Producer");
        controller.submit_form().await.unwrap();

        assert!(!controller.form().is_open());
        let cached = controller.record(&record.id).unwrap();
        assert_eq!(cached.str_field("role"), Some("Producer"));
        assert_eq!(cached.str_field("name"), Some("Prabhas"));
    }

    #[tokio::test]
    async fn prompt_names_the_record() {
        let store = InMemoryStore::new();
        let record = store.seed(Collection::Polls, json!({ "question": "Best debut?" }));
        let controller = CollectionController::new(store, Collection::Polls);
        controller.fetch_first_page().await.unwrap();
        let prompt = controller.prompt_delete(&record.id).unwrap();
        assert_eq!(prompt.message, "Are you sure you want to delete \"Best debut?\"?");
        assert!(controller.prompt_delete("missing").is_err());
    }

    #[tokio::test]
    async fn patch_in_place_keeps_position() {
        let store = InMemoryStore::new();
        let older = store.seed(Collection::Users, json!({ "email": "a@x.io", "role": "user" }));
        store.seed(Collection::Users, json!({ "email": "b@x.io", "role": "user" }));
        let controller = CollectionController::new(store.clone(), Collection::Users);
        controller.fetch_first_page().await.unwrap();
        let reads = store.read_count();

        controller
            .patch_in_place(&older.id, fields(json!({ "role": "admin" })), "User promoted")
            .await
            .unwrap();

        assert_eq!(store.read_count(), reads);
        let records = controller.records();
        assert_eq!(records[1].id, older.id);
        assert_eq!(records[1].str_field("role"), Some("admin"));
        assert_eq!(controller.notifier().last().unwrap().message, "User promoted");
    }
}
