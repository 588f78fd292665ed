use serde::Serialize;
use tracing::warn;

use crate::collections::{AdminScreen, Collection};
use crate::services::DocumentStore;

/// Collections shown on the dashboard, in display order.
pub const OVERVIEW_COLLECTIONS: [Collection; 10] = [
    Collection::Movies,
    Collection::News,
    Collection::Blogs,
    Collection::Celebrities,
    Collection::Users,
    Collection::Polls,
    Collection::Reviews,
    Collection::Comments,
    Collection::Feedback,
    Collection::PromotionInquiries,
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionCount {
    pub collection: Collection,
    pub count: u64,
}

/// Record count per dashboard collection. A count that fails is shown as zero.
pub async fn overview<S: DocumentStore>(store: &S) -> Vec<CollectionCount> {
    let mut counts = Vec::with_capacity(OVERVIEW_COLLECTIONS.len());
    for collection in OVERVIEW_COLLECTIONS {
        let count = match store.count(collection).await {
            Ok(count) => count,
            Err(err) => {
                warn!(collection = %collection, error = %err, "count failed, reporting 0");
                0
            }
        };
        counts.push(CollectionCount { collection, count });
    }
    counts
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub screen: AdminScreen,
    pub title: &'static str,
    pub path: &'static str,
}

pub fn admin_menu() -> Vec<MenuEntry> {
    AdminScreen::ALL
        .into_iter()
        .map(|screen| MenuEntry {
            screen,
            title: screen.title(),
            path: screen.path(),
        })
        .collect()
}
