use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::collections::Collection;
use crate::content::{INDUSTRIES, Reference};
use crate::controller::CollectionController;
use crate::controller::mutation::{Confirmation, DeleteOutcome, DeletePrompt};
use crate::errors::{ContentError, ContentResult};
use crate::notify::Notifier;
use crate::services::{DocumentStore, FieldMap, Record};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nominee {
    pub id: String,
    pub celebrity_id: String,
    pub celebrity_name: String,
    pub movie_id: String,
    pub movie_name: String,
    #[serde(default)]
    pub votes: u64,
}

/// Award categories of one industry at a time, each carrying its nominee list inline.
///
/// Listing and writes go through a [`CollectionController`] scoped to the selected
/// industry. Switching industry detaches that controller and binds a new one.
pub struct AwardsBoard<S: DocumentStore> {
    industry: String,
    categories: CollectionController<S>,
}

impl<S: DocumentStore> AwardsBoard<S> {
    pub fn new(store: S, notifier: Notifier) -> Self {
        let industry = INDUSTRIES[0].to_string();
        Self {
            categories: scoped(store, notifier, &industry),
            industry,
        }
    }

    pub fn industry(&self) -> &str {
        &self.industry
    }

    pub fn notifier(&self) -> &Notifier {
        self.categories.notifier()
    }

    pub fn categories(&self) -> Vec<Record> {
        self.categories.records()
    }

    pub fn category(&self, id: &str) -> Option<Record> {
        self.categories.record(id)
    }

    pub async fn select_industry(&mut self, industry: &str) -> ContentResult<usize> {
        if !INDUSTRIES.contains(&industry) {
            return Err(ContentError::Validation(format!("unknown industry {industry}")));
        }
        if industry != self.industry {
            self.categories.detach();
            self.categories = scoped(
                self.categories.store().clone(),
                self.categories.notifier().clone(),
                industry,
            );
            self.industry = industry.to_string();
        }
        self.refresh().await
    }

    /// Reloads every category of the selected industry, newest first. On failure the
    /// previous list stays.
    pub async fn refresh(&self) -> ContentResult<usize> {
        self.categories.fetch_first_page().await?;
        Ok(self.categories.len())
    }

    /// New categories belong to the selected industry and start without nominees.
    pub async fn create_category(&self, mut fields: FieldMap) -> ContentResult<Record> {
        fields.insert("industry".into(), Value::from(self.industry.as_str()));
        fields.insert("nominees".into(), json!([]));
        self.categories.create(fields).await
    }

    /// Nominees are managed through [`add_nominee`](Self::add_nominee) and
    /// [`remove_nominee`](Self::remove_nominee) and are never overwritten here.
    pub async fn update_category(&self, id: &str, mut fields: FieldMap) -> ContentResult<Record> {
        fields.remove("nominees");
        fields.remove("industry");
        self.categories.update(id, fields).await
    }

    pub fn prompt_delete(&self, id: &str) -> ContentResult<DeletePrompt> {
        self.categories.prompt_delete(id)
    }

    pub async fn delete_category(
        &self,
        prompt: DeletePrompt,
        confirmation: Confirmation,
    ) -> ContentResult<DeleteOutcome> {
        self.categories.delete(prompt, confirmation).await
    }

    /// Appends a nominee pairing a celebrity with the movie they are nominated for. Both
    /// references are required.
    pub async fn add_nominee(
        &self,
        category_id: &str,
        celebrity: Option<&Reference>,
        movie: Option<&Reference>,
    ) -> ContentResult<Nominee> {
        let (Some(celebrity), Some(movie)) = (celebrity, movie) else {
            let err = ContentError::Validation("Please select both celebrity and movie".into());
            self.notifier().error(err.user_message());
            return Err(err);
        };
        let mut nominees = nominees_of(&self.loaded(category_id)?);
        let nominee = Nominee {
            id: next_nominee_id(&nominees),
            celebrity_id: celebrity.id.clone(),
            celebrity_name: celebrity.name.clone(),
            movie_id: movie.id.clone(),
            movie_name: movie.name.clone(),
            votes: 0,
        };
        nominees.push(nominee.clone());
        self.save_nominees(category_id, nominees, "Nominee added successfully")
            .await?;
        Ok(nominee)
    }

    pub async fn remove_nominee(
        &self,
        category_id: &str,
        nominee_id: &str,
        confirmation: Confirmation,
    ) -> ContentResult<DeleteOutcome> {
        if confirmation == Confirmation::Cancelled {
            debug!(category = category_id, nominee = nominee_id, "nominee removal cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }
        let mut nominees = nominees_of(&self.loaded(category_id)?);
        nominees.retain(|nominee| nominee.id != nominee_id);
        self.save_nominees(category_id, nominees, "Nominee removed successfully")
            .await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn save_nominees(
        &self,
        category_id: &str,
        nominees: Vec<Nominee>,
        success: &str,
    ) -> ContentResult<Record> {
        let mut fields = FieldMap::new();
        fields.insert("nominees".into(), json!(nominees));
        self.categories
            .patch_in_place(category_id, fields, success)
            .await
    }

    fn loaded(&self, id: &str) -> ContentResult<Record> {
        self.category(id).ok_or_else(|| ContentError::NotFound {
            collection: Collection::AwardCategories,
            id: id.to_string(),
        })
    }
}

fn scoped<S: DocumentStore>(
    store: S,
    notifier: Notifier,
    industry: &str,
) -> CollectionController<S> {
    CollectionController::new(store, Collection::AwardCategories)
        .with_notifier(notifier)
        .with_scope("industry", industry)
}

fn nominees_of(category: &Record) -> Vec<Nominee> {
    category
        .field("nominees")
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Millisecond timestamp, bumped past any id already present in the category.
fn next_nominee_id(existing: &[Nominee]) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    while existing
        .iter()
        .any(|nominee| nominee.id == candidate.to_string())
    {
        candidate += 1;
    }
    candidate.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;

    fn category_fields(name: &str) -> FieldMap {
        json!({
            "name": name,
            "startTime": "2025-01-01T00:00:00Z",
            "endTime": "2025-02-01T00:00:00Z"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn reference(id: &str, name: &str) -> Reference {
        Reference {
            id: id.into(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn categories_are_scoped_to_the_industry() {
        let store = InMemoryStore::new();
        let mut board = AwardsBoard::new(store.clone(), Notifier::new());
        board.create_category(category_fields("Best Actor")).await.unwrap();
        board.select_industry("Bollywood").await.unwrap();
        assert!(board.categories().is_empty());
        board.select_industry("Tollywood").await.unwrap();
        assert_eq!(board.categories().len(), 1);
        assert_eq!(board.categories()[0].field("nominees"), Some(&json!([])));
    }

    #[tokio::test]
    async fn nominee_needs_both_references() {
        let store = InMemoryStore::new();
        let notifier = Notifier::new();
        let board = AwardsBoard::new(store.clone(), notifier.clone());
        let category = board.create_category(category_fields("Best Film")).await.unwrap();
        let writes = store.write_count();

        let celeb = reference("c1", "Prabhas");
        let err = board
            .add_nominee(&category.id, Some(&celeb), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Validation(_)));
        assert_eq!(store.write_count(), writes);
        assert_eq!(
            notifier.last().unwrap().message,
            "Please select both celebrity and movie"
        );
    }

    #[tokio::test]
    async fn nominees_are_added_and_removed() {
        let store = InMemoryStore::new();
        let board = AwardsBoard::new(store.clone(), Notifier::new());
        let category = board.create_category(category_fields("Best Actor")).await.unwrap();
        let celeb = reference("c1", "Prabhas");
        let movie = reference("m1", "Kalki 2898 AD");

        let first = board
            .add_nominee(&category.id, Some(&celeb), Some(&movie))
            .await
            .unwrap();
        let second = board
            .add_nominee(&category.id, Some(&celeb), Some(&movie))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(nominees_of(&board.category(&category.id).unwrap()).len(), 2);

        board
            .remove_nominee(&category.id, &first.id, Confirmation::Confirmed)
            .await
            .unwrap();
        let left = nominees_of(&board.category(&category.id).unwrap());
        assert_eq!(left, vec![second]);
    }

    #[tokio::test]
    async fn delete_rejects_a_prompt_from_another_collection() {
        let store = InMemoryStore::new_with_sample();
        let notifier = Notifier::new();
        let board = AwardsBoard::new(store.clone(), notifier.clone());
        let category = board.create_category(category_fields("Best Director")).await.unwrap();
        let writes = store.write_count();

        let foreign = DeletePrompt {
            collection: Collection::Movies,
            id: category.id.clone(),
            message: "Are you sure you want to delete \"Best Director\"?".into(),
        };
        let err = board
            .delete_category(foreign, Confirmation::Confirmed)
            .await
            .unwrap_err();

        assert!(matches!(err, ContentError::Validation(_)));
        assert_eq!(store.write_count(), writes);
        assert!(board.category(&category.id).is_some());

        let prompt = board.prompt_delete(&category.id).unwrap();
        board
            .delete_category(prompt, Confirmation::Confirmed)
            .await
            .unwrap();
        assert!(board.categories().is_empty());
        assert_eq!(notifier.last().unwrap().message, "Category deleted successfully");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_loaded_categories() {
        let store = InMemoryStore::new();
        let notifier = Notifier::new();
        let board = AwardsBoard::new(store.clone(), notifier.clone());
        let created = board.create_category(category_fields("Best Music")).await.unwrap();
        assert_eq!(board.categories().len(), 1);

        store.set_offline(true);
        let err = board.refresh().await.unwrap_err();

        assert!(matches!(err, ContentError::Fetch { .. }));
        assert_eq!(board.categories()[0].id, created.id);
        assert_eq!(store.snapshot(Collection::AwardCategories).len(), 1);
        assert_eq!(notifier.last().unwrap().level, crate::notify::NoticeLevel::Error);
    }
}
