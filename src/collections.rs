use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::{ContentError, ContentResult};
use crate::poll;
use crate::services::{FieldMap, strip_reserved};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Movies,
    Celebrities,
    News,
    Blogs,
    Polls,
    AwardCategories,
    Users,
    Reviews,
    Comments,
    Feedback,
    PromotionInquiries,
}

impl Collection {
    pub const ALL: [Collection; 11] = [
        Collection::Movies,
        Collection::Celebrities,
        Collection::News,
        Collection::Blogs,
        Collection::Polls,
        Collection::AwardCategories,
        Collection::Users,
        Collection::Reviews,
        Collection::Comments,
        Collection::Feedback,
        Collection::PromotionInquiries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Movies => "movies",
            Collection::Celebrities => "celebrities",
            Collection::News => "news",
            Collection::Blogs => "blogs",
            Collection::Polls => "polls",
            Collection::AwardCategories => "awardCategories",
            Collection::Users => "users",
            Collection::Reviews => "reviews",
            Collection::Comments => "comments",
            Collection::Feedback => "feedback",
            Collection::PromotionInquiries => "promotionInquiries",
        }
    }

    pub fn schema(self) -> &'static CollectionSchema {
        match self {
            Collection::Movies => &MOVIES,
            Collection::Celebrities => &CELEBRITIES,
            Collection::News => &NEWS,
            Collection::Blogs => &BLOGS,
            Collection::Polls => &POLLS,
            Collection::AwardCategories => &AWARD_CATEGORIES,
            Collection::Users => &USERS,
            Collection::Reviews => &REVIEWS,
            Collection::Comments => &COMMENTS,
            Collection::Feedback => &FEEDBACK,
            Collection::PromotionInquiries => &PROMOTION_INQUIRIES,
        }
    }

    /// Collections the public site reads from.
    pub fn is_public(self) -> bool {
        matches!(
            self,
            Collection::Movies
                | Collection::Celebrities
                | Collection::News
                | Collection::Blogs
                | Collection::Polls
        )
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| ContentError::UnknownCollection(s.to_string()))
    }
}

/// Static description of how a screen treats one collection.
#[derive(Debug)]
pub struct CollectionSchema {
    pub collection: Collection,
    /// Singular noun used in notifications ("News article added successfully").
    pub label: &'static str,
    /// Field shown in delete prompts and matched by typeahead lookups.
    pub title_field: &'static str,
    /// Fields the local filter matches against.
    pub search_fields: &'static [&'static str],
    pub required_fields: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

impl CollectionSchema {
    /// Checks required fields before any store call. On create every required field must
    /// be present and non-blank; on update only the required fields the patch touches are
    /// checked.
    pub fn validate(&self, fields: &FieldMap, mode: WriteMode) -> ContentResult<()> {
        for &field in self.required_fields {
            match (mode, fields.get(field)) {
                (WriteMode::Update, None) => {}
                (_, Some(value)) if !is_blank(value) => {}
                _ => return Err(ContentError::missing_field(field)),
            }
        }
        if self.collection == Collection::Polls
            && (mode == WriteMode::Create || fields.contains_key("options"))
        {
            poll::validate_options(fields)?;
        }
        Ok(())
    }

    /// Validated payload for a create call. Blank optional fields are dropped so they are
    /// absent on the stored record rather than holding placeholder text.
    pub fn prepare_create(&self, mut fields: FieldMap) -> ContentResult<FieldMap> {
        strip_reserved(&mut fields);
        self.validate(&fields, WriteMode::Create)?;
        self.normalize(&mut fields)?;
        fields.retain(|key, value| {
            self.required_fields.contains(&key.as_str()) || !is_blank(value)
        });
        Ok(fields)
    }

    /// Validated payload for a partial update. Blank optional fields are kept so an editor
    /// can clear them.
    pub fn prepare_update(&self, mut fields: FieldMap) -> ContentResult<FieldMap> {
        strip_reserved(&mut fields);
        self.validate(&fields, WriteMode::Update)?;
        self.normalize(&mut fields)?;
        Ok(fields)
    }

    fn normalize(&self, fields: &mut FieldMap) -> ContentResult<()> {
        match self.collection {
            Collection::Polls => poll::normalize_payload(fields),
            _ => Ok(()),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

static MOVIES: CollectionSchema = CollectionSchema {
    collection: Collection::Movies,
    label: "Movie",
    title_field: "name",
    search_fields: &["name"],
    required_fields: &["name", "genre", "industry", "releaseDate"],
};

static CELEBRITIES: CollectionSchema = CollectionSchema {
    collection: Collection::Celebrities,
    label: "Celebrity",
    title_field: "name",
    search_fields: &["name"],
    required_fields: &["name", "role"],
};

static NEWS: CollectionSchema = CollectionSchema {
    collection: Collection::News,
    label: "News article",
    title_field: "title",
    search_fields: &["title"],
    required_fields: &["title", "author", "content"],
};

static BLOGS: CollectionSchema = CollectionSchema {
    collection: Collection::Blogs,
    label: "Blog post",
    title_field: "title",
    search_fields: &["title"],
    required_fields: &["title", "author", "content"],
};

static POLLS: CollectionSchema = CollectionSchema {
    collection: Collection::Polls,
    label: "Poll",
    title_field: "question",
    search_fields: &["question"],
    required_fields: &["question", "startTime", "endTime"],
};

static AWARD_CATEGORIES: CollectionSchema = CollectionSchema {
    collection: Collection::AwardCategories,
    label: "Category",
    title_field: "name",
    search_fields: &["name"],
    required_fields: &["name", "industry", "startTime", "endTime"],
};

static USERS: CollectionSchema = CollectionSchema {
    collection: Collection::Users,
    label: "User",
    title_field: "email",
    search_fields: &["email", "username"],
    required_fields: &["email"],
};

static REVIEWS: CollectionSchema = CollectionSchema {
    collection: Collection::Reviews,
    label: "Review",
    title_field: "movieName",
    search_fields: &["content", "movieName", "userEmail"],
    required_fields: &[],
};

static COMMENTS: CollectionSchema = CollectionSchema {
    collection: Collection::Comments,
    label: "Comment",
    title_field: "articleTitle",
    search_fields: &["content", "articleTitle", "userEmail"],
    required_fields: &[],
};

static FEEDBACK: CollectionSchema = CollectionSchema {
    collection: Collection::Feedback,
    label: "Feedback",
    title_field: "name",
    search_fields: &["name", "email", "message"],
    required_fields: &[],
};

static PROMOTION_INQUIRIES: CollectionSchema = CollectionSchema {
    collection: Collection::PromotionInquiries,
    label: "Promotion inquiry",
    title_field: "name",
    search_fields: &["name", "email", "company", "promotionType"],
    required_fields: &[],
};

/// The back-office screens. Each owns one controller per collection it lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminScreen {
    Movies,
    News,
    Blogs,
    Celebrities,
    Polls,
    Awards,
    Users,
    Feedback,
    Promotions,
    Moderation,
}

impl AdminScreen {
    pub const ALL: [AdminScreen; 10] = [
        AdminScreen::Movies,
        AdminScreen::News,
        AdminScreen::Blogs,
        AdminScreen::Celebrities,
        AdminScreen::Polls,
        AdminScreen::Awards,
        AdminScreen::Users,
        AdminScreen::Feedback,
        AdminScreen::Promotions,
        AdminScreen::Moderation,
    ];

    pub fn collections(self) -> &'static [Collection] {
        match self {
            AdminScreen::Movies => &[Collection::Movies],
            AdminScreen::News => &[Collection::News],
            AdminScreen::Blogs => &[Collection::Blogs],
            AdminScreen::Celebrities => &[Collection::Celebrities],
            AdminScreen::Polls => &[Collection::Polls],
            AdminScreen::Awards => &[Collection::AwardCategories],
            AdminScreen::Users => &[Collection::Users],
            AdminScreen::Feedback => &[Collection::Feedback],
            AdminScreen::Promotions => &[Collection::PromotionInquiries],
            AdminScreen::Moderation => &[Collection::Reviews, Collection::Comments],
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AdminScreen::Movies => "Movies Management",
            AdminScreen::News => "News Management",
            AdminScreen::Blogs => "Blogs Management",
            AdminScreen::Celebrities => "Celebrities Management",
            AdminScreen::Polls => "Polls Management",
            AdminScreen::Awards => "Awards Management",
            AdminScreen::Users => "User Management",
            AdminScreen::Feedback => "Feedback",
            AdminScreen::Promotions => "Promotion Inquiries",
            AdminScreen::Moderation => "Content Moderation",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            AdminScreen::Movies => "/admin/movies",
            AdminScreen::News => "/admin/news",
            AdminScreen::Blogs => "/admin/blogs",
            AdminScreen::Celebrities => "/admin/celebrities",
            AdminScreen::Polls => "/admin/polls",
            AdminScreen::Awards => "/admin/awards",
            AdminScreen::Users => "/admin/users",
            AdminScreen::Feedback => "/admin/feedback",
            AdminScreen::Promotions => "/admin/promotions",
            AdminScreen::Moderation => "/admin/moderation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn collection_names_parse_back() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
            assert_eq!(collection.schema().collection, collection);
        }
        assert!("boards".parse::<Collection>().is_err());
    }

    #[test]
    fn create_requires_every_required_field() {
        let schema = Collection::News.schema();
        let err = schema
            .prepare_create(fields(json!({ "title": "Foo", "author": "  " })))
            .unwrap_err();
        assert_eq!(err, ContentError::missing_field("author"));
    }

    #[test]
    fn create_drops_blank_optional_fields() {
        let schema = Collection::News.schema();
        let prepared = schema
            .prepare_create(fields(json!({
                "title": "Foo",
                "author": "Desk",
                "content": "Body",
                "excerpt": "",
                "scheduledAt": null,
                "isPromotion": false
            })))
            .unwrap();
        assert!(!prepared.contains_key("excerpt"));
        assert!(!prepared.contains_key("scheduledAt"));
        assert_eq!(prepared.get("isPromotion"), Some(&json!(false)));
    }

    #[test]
    fn update_checks_only_touched_required_fields() {
        let schema = Collection::Movies.schema();
        assert!(schema
            .prepare_update(fields(json!({ "description": "" })))
            .is_ok());
        assert!(schema.prepare_update(fields(json!({ "name": "" }))).is_err());
    }

    #[test]
    fn screens_cover_ten_panels() {
        assert_eq!(AdminScreen::ALL.len(), 10);
        assert_eq!(
            AdminScreen::Moderation.collections(),
            &[Collection::Reviews, Collection::Comments]
        );
    }
}
