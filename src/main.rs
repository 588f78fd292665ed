use std::error::Error;

use serde_json::json;
use tracing::info;

use movie_reporter::{
    collections::Collection,
    config::AppConfig,
    controller::{CollectionController, Confirmation},
    logging::init_tracing,
    notify::Notifier,
    services::InMemoryStore,
    typeahead::ReferencePicker,
};

/// Walks one editing session against the sample content: page through news, add a movie
/// with a cast member picked by typeahead, then delete the movie again.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = AppConfig::from_env();
    let store = InMemoryStore::new_with_sample();
    let notifier = Notifier::new();

    let news = CollectionController::new(store.clone(), Collection::News)
        .with_page_size(config.page_size)
        .with_notifier(notifier.clone());
    news.fetch_first_page().await?;
    info!(loaded = news.len(), has_more = news.has_more(), "news screen");
    news.detach();

    let movies = CollectionController::new(store.clone(), Collection::Movies)
        .with_page_size(config.page_size)
        .with_notifier(notifier.clone());
    movies.fetch_first_page().await?;

    let mut cast_picker =
        ReferencePicker::with_config(store.clone(), Collection::Celebrities, config.typeahead);
    cast_picker.set_query("Pr").await?;
    let picked = cast_picker
        .candidates()
        .first()
        .map(|candidate| candidate.id.clone())
        .and_then(|id| cast_picker.select(&id));

    movies.open_create_form(
        json!({
            "name": "Salaar Part 2",
            "genre": "Action",
            "industry": "Tollywood",
            "releaseDate": "2026-04-10T00:00:00Z",
            "description": ""
        })
        .as_object()
        .cloned()
        .unwrap_or_default(),
    );
    if let Some(member) = &picked {
        movies.with_form(|form| form.push_reference("cast", member));
    }
    movies.with_form(|form| form.toggle_list_item("ottPlatforms", "netflix"));
    let created = movies.submit_form().await?;
    info!(id = %created.id, cached = movies.len(), "movie added");

    let prompt = movies.prompt_delete(&created.id)?;
    println!("{}", prompt.message);
    movies.delete(prompt, Confirmation::Confirmed).await?;

    for notice in notifier.drain() {
        println!("[{:?}] {}", notice.level, notice.message);
    }
    Ok(())
}
