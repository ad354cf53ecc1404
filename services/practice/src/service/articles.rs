//! Blog article CRUD.
//!
//! Reads are public. Writes require the caller to resolve to admin through
//! the allowlist. Listing returns every stored article, published or not,
//! newest `created_at` first.
use super::{ServiceError, ServiceResult, required};
use crate::auth::policy::AdminAllowlist;
use crate::auth::principal::Identity;
use crate::model::{ARTICLE_PREFIX, Article, ArticleFields};
use crate::store::{Collection, KvStore};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct ArticleService {
    articles: Collection<Article>,
    allowlist: AdminAllowlist,
}

impl ArticleService {
    pub fn new(store: Arc<dyn KvStore>, allowlist: AdminAllowlist) -> Self {
        Self {
            articles: Collection::new(store, ARTICLE_PREFIX),
            allowlist,
        }
    }

    fn require_admin<'a>(&self, identity: Option<&'a Identity>) -> ServiceResult<&'a Identity> {
        match identity {
            Some(identity) if self.allowlist.resolve_role(Some(identity)).is_admin() => {
                Ok(identity)
            }
            _ => Err(ServiceError::Forbidden(
                "only an admin can manage articles".to_string(),
            )),
        }
    }

    pub async fn list_articles(&self) -> ServiceResult<Vec<Article>> {
        let mut articles = self.articles.list().await?;
        articles.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(articles)
    }

    pub async fn get_article(&self, article_id: &str) -> ServiceResult<Article> {
        self.articles
            .get(article_id)
            .await?
            .ok_or_else(|| not_found(article_id))
    }

    pub async fn create_article(
        &self,
        identity: Option<&Identity>,
        mut fields: ArticleFields,
    ) -> ServiceResult<Article> {
        let identity = self.require_admin(identity)?;
        let title = required("title", fields.title.take())?;
        let content = required("content", fields.content.take())?;
        let now = Utc::now();
        let mut article = Article {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            excerpt: String::new(),
            content,
            category: String::new(),
            image: String::new(),
            read_time: String::new(),
            author: identity.display_name(),
            author_id: identity.id.clone(),
            created_at: now,
            updated_at: now,
            published: true,
        };
        fields.apply_to(&mut article);
        self.articles.put(&article.id, &article).await?;
        tracing::info!(article_id = %article.id, "article created");
        Ok(article)
    }

    pub async fn update_article(
        &self,
        identity: Option<&Identity>,
        article_id: &str,
        fields: ArticleFields,
    ) -> ServiceResult<Article> {
        self.require_admin(identity)?;
        if let Some(title) = fields.title.as_deref() {
            required("title", Some(title.to_string()))?;
        }
        if let Some(content) = fields.content.as_deref() {
            required("content", Some(content.to_string()))?;
        }
        let mut article = self.get_article(article_id).await?;
        fields.apply_to(&mut article);
        article.updated_at = Utc::now();
        self.articles.put(&article.id, &article).await?;
        tracing::info!(article_id = %article.id, "article updated");
        Ok(article)
    }

    pub async fn delete_article(
        &self,
        identity: Option<&Identity>,
        article_id: &str,
    ) -> ServiceResult<()> {
        self.require_admin(identity)?;
        self.get_article(article_id).await?;
        self.articles.remove(article_id).await?;
        tracing::info!(article_id, "article deleted");
        Ok(())
    }
}

fn not_found(article_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("article {article_id} not found"))
}
