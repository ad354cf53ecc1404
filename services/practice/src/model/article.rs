//! Blog article records and partial-update payloads.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Key namespace for article records in the key-value store.
pub const ARTICLE_PREFIX: &str = "blog_article_";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub read_time: String,
    pub author: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

/// Article fields supplied by an editor. On create, `title` and `content` are
/// required; on update every provided field overwrites the stored one.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArticleFields {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub read_time: Option<String>,
    pub author: Option<String>,
    pub published: Option<bool>,
}

impl ArticleFields {
    /// Overwrite `article` with every field present in `self`.
    ///
    /// Identity and timestamps (`id`, `author_id`, `created_at`, `updated_at`)
    /// are left to the caller.
    pub fn apply_to(self, article: &mut Article) {
        if let Some(title) = self.title {
            article.title = title;
        }
        if let Some(excerpt) = self.excerpt {
            article.excerpt = excerpt;
        }
        if let Some(content) = self.content {
            article.content = content;
        }
        if let Some(category) = self.category {
            article.category = category;
        }
        if let Some(image) = self.image {
            article.image = image;
        }
        if let Some(read_time) = self.read_time {
            article.read_time = read_time;
        }
        if let Some(author) = self.author {
            article.author = author;
        }
        if let Some(published) = self.published {
            article.published = published;
        }
    }
}
