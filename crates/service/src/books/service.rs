use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::books::domain::{current_year, sanitize, validate_book, Book, BookPayload};
use crate::books::store::CollectionStore;
use crate::errors::{FieldError, ServiceError};

/// Aggregated collection statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub total_books: usize,
    pub books_by_year: BTreeMap<i32, usize>,
    pub top_authors: Vec<AuthorCount>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AuthorCount {
    pub author: String,
    pub count: usize,
}

/// Business operations over the book collection.
///
/// Every operation loads the full snapshot from the injected store, applies
/// its logic and, when mutating, writes the full snapshot back. Nothing is
/// cached between calls and there is no locking: concurrent mutations race
/// on the read-modify-write cycle, last writer wins.
#[derive(Clone)]
pub struct BookService {
    store: Arc<dyn CollectionStore>,
}

impl BookService {
    pub fn new(store: Arc<dyn CollectionStore>) -> Self {
        Self { store }
    }

    /// 列出全部图书
    pub async fn list(&self) -> Result<Vec<Book>, ServiceError> {
        Ok(self.store.load().await?.books)
    }

    /// 创建新图书：id 取当前毫秒时间戳（不做碰撞检查）
    pub async fn create(&self, payload: BookPayload) -> Result<Book, ServiceError> {
        let book = Book {
            id: Utc::now().timestamp_millis().to_string(),
            title: payload.title.as_deref().map(sanitize).unwrap_or_default(),
            author: payload.author.as_deref().map(sanitize).unwrap_or_default(),
            isbn: payload.isbn.clone().unwrap_or_default(),
            published_year: payload.published_year.unwrap_or_default(),
        };
        validate_book(&book).map_err(ServiceError::Validation)?;

        let mut collection = self.store.load().await?;
        collection.books.push(book.clone());
        self.store.save(&collection).await?;
        Ok(book)
    }

    /// 更新指定图书：缺失字段保留原值，合并结果按创建规则校验
    pub async fn update(&self, id: &str, payload: BookPayload) -> Result<Book, ServiceError> {
        let mut collection = self.store.load().await?;
        let slot = collection
            .books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| ServiceError::not_found("book"))?;

        let merged = payload.merged_over(slot);
        validate_book(&merged).map_err(ServiceError::Validation)?;
        *slot = merged.clone();

        self.store.save(&collection).await?;
        Ok(merged)
    }

    /// 删除指定图书，返回被删除的记录
    pub async fn delete(&self, id: &str) -> Result<Book, ServiceError> {
        let mut collection = self.store.load().await?;
        let idx = collection
            .books
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| ServiceError::not_found("book"))?;
        let removed = collection.books.remove(idx);
        self.store.save(&collection).await?;
        Ok(removed)
    }

    /// 检索：标题/作者忽略大小写，ISBN 为原样子串；保持原有顺序
    pub async fn search(&self, query: &str) -> Result<Vec<Book>, ServiceError> {
        let needle = query.to_lowercase();
        let collection = self.store.load().await?;
        Ok(collection
            .books
            .into_iter()
            .filter(|b| {
                b.title.to_lowercase().contains(&needle)
                    || b.author.to_lowercase().contains(&needle)
                    || b.isbn.contains(query)
            })
            .collect())
    }

    /// 随机推荐最多 3 本（洗牌取前缀，不可复现）
    pub async fn recommendations(&self) -> Result<Vec<Book>, ServiceError> {
        let mut books = self.store.load().await?.books;
        books.shuffle(&mut rand::thread_rng());
        books.truncate(3);
        Ok(books)
    }

    /// 汇总统计：总数、按年份计数、前 5 作者、生成时间
    pub async fn stats(&self) -> Result<BookStats, ServiceError> {
        let books = self.store.load().await?.books;

        let mut books_by_year: BTreeMap<i32, usize> = BTreeMap::new();
        let mut author_counts: HashMap<String, usize> = HashMap::new();
        for book in &books {
            *books_by_year.entry(book.published_year).or_default() += 1;
            *author_counts.entry(book.author.clone()).or_default() += 1;
        }

        let mut top_authors: Vec<AuthorCount> = author_counts
            .into_iter()
            .map(|(author, count)| AuthorCount { author, count })
            .collect();
        // tie order among equal counts is not a contract
        top_authors.sort_by(|a, b| b.count.cmp(&a.count));
        top_authors.truncate(5);

        Ok(BookStats {
            total_books: books.len(),
            books_by_year,
            top_authors,
            generated_at: Utc::now(),
        })
    }

    /// 按十年区间 [decade, decade+10) 筛选
    pub async fn by_decade(&self, decade: i32) -> Result<Vec<Book>, ServiceError> {
        let year = current_year();
        if decade < 1000 || decade > year {
            return Err(ServiceError::Validation(vec![FieldError::new(
                "decade",
                format!("decade must be an integer between 1000 and {year}"),
            )]));
        }
        let collection = self.store.load().await?;
        Ok(collection
            .books
            .into_iter()
            .filter(|b| b.published_year >= decade && b.published_year < decade + 10)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::domain::BookCollection;
    use crate::test_support::MemoryStore;

    fn book(id: &str, title: &str, author: &str, isbn: &str, year: i32) -> Book {
        Book {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            published_year: year,
        }
    }

    fn payload(title: &str, author: &str, isbn: &str, year: i32) -> BookPayload {
        BookPayload {
            title: Some(title.into()),
            author: Some(author.into()),
            isbn: Some(isbn.into()),
            published_year: Some(year),
        }
    }

    async fn seeded(books: Vec<Book>) -> BookService {
        let store = MemoryStore::shared();
        store.seed(BookCollection { books }).await;
        BookService::new(store)
    }

    #[tokio::test]
    async fn create_assigns_id_and_appends() {
        let svc = seeded(vec![]).await;
        let created = svc
            .create(payload("Dune", "Frank Herbert", "9780441013593", 1965))
            .await
            .expect("create ok");
        assert!(!created.id.is_empty());
        assert_eq!(created.title, "Dune");

        let listed = svc.list().await.expect("list ok");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], created);
    }

    #[tokio::test]
    async fn create_sanitizes_markup_in_text_fields() {
        let svc = seeded(vec![]).await;
        let created = svc
            .create(payload("  <b>Dune</b>  ", "Frank & Herbert", "9780441013593", 1965))
            .await
            .expect("create ok");
        assert_eq!(created.title, "&lt;b&gt;Dune&lt;/b&gt;");
        assert_eq!(created.author, "Frank &amp; Herbert");
    }

    #[tokio::test]
    async fn create_rejects_invalid_input_without_persisting() {
        let svc = seeded(vec![]).await;

        let err = svc
            .create(payload("Dune", "Frank Herbert", "abc", current_year() + 1))
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["isbn", "publishedYear"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // missing fields are itemized too
        let err = svc.create(BookPayload::default()).await.unwrap_err();
        match err {
            ServiceError::Validation(errors) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation error, got {other:?}"),
        }

        assert!(svc.list().await.expect("list ok").is_empty());
    }

    #[tokio::test]
    async fn update_merges_partial_fields() {
        let svc = seeded(vec![book("1", "Dune", "Frank Herbert", "9780441013593", 1965)]).await;

        let patch = BookPayload { title: Some("Dune Messiah".into()), ..Default::default() };
        let updated = svc.update("1", patch).await.expect("update ok");
        assert_eq!(updated.id, "1");
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.author, "Frank Herbert");
        assert_eq!(updated.published_year, 1965);

        let listed = svc.list().await.expect("list ok");
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test]
    async fn update_rejects_invalid_merged_record() {
        let svc = seeded(vec![book("1", "Dune", "Frank Herbert", "9780441013593", 1965)]).await;
        let patch = BookPayload { published_year: Some(current_year() + 1), ..Default::default() };
        assert!(matches!(svc.update("1", patch).await, Err(ServiceError::Validation(_))));

        // the stored record is untouched
        let listed = svc.list().await.expect("list ok");
        assert_eq!(listed[0].published_year, 1965);
    }

    #[tokio::test]
    async fn update_unknown_id_leaves_collection_unchanged() {
        let svc = seeded(vec![book("1", "Dune", "Frank Herbert", "9780441013593", 1965)]).await;
        let patch = BookPayload { title: Some("Other".into()), ..Default::default() };
        assert!(matches!(svc.update("404", patch).await, Err(ServiceError::NotFound(_))));
        assert_eq!(svc.list().await.expect("list ok").len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_record_and_rejects_unknown_id() {
        let svc = seeded(vec![
            book("1", "Dune", "Frank Herbert", "9780441013593", 1965),
            book("2", "Neuromancer", "William Gibson", "9780441569595", 1984),
        ])
        .await;

        let removed = svc.delete("1").await.expect("delete ok");
        assert_eq!(removed.title, "Dune");
        assert_eq!(svc.list().await.expect("list ok").len(), 1);

        assert!(matches!(svc.delete("1").await, Err(ServiceError::NotFound(_))));
        assert_eq!(svc.list().await.expect("list ok").len(), 1);
    }

    #[tokio::test]
    async fn search_matches_title_author_and_isbn() {
        let svc = seeded(vec![
            book("1", "Dune", "Frank Herbert", "9780441013593", 1965),
            book("2", "Neuromancer", "William Gibson", "9780441569595", 1984),
            book("3", "Dune Messiah", "Frank Herbert", "9780593098233", 1969),
        ])
        .await;

        // case-insensitive author match, original order
        let hits = svc.search("frank herbert").await.expect("search ok");
        assert_eq!(hits.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["1", "3"]);

        // case-insensitive title substring
        let hits = svc.search("NEURO").await.expect("search ok");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");

        // direct isbn substring
        let hits = svc.search("0441569595").await.expect("search ok");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "2");

        assert!(svc.search("tolkien").await.expect("search ok").is_empty());
    }

    #[tokio::test]
    async fn recommendations_returns_at_most_three_distinct_records() {
        let svc = seeded(vec![
            book("1", "Dune", "Frank Herbert", "9780441013593", 1965),
            book("2", "Neuromancer", "William Gibson", "9780441569595", 1984),
            book("3", "Dune Messiah", "Frank Herbert", "9780593098233", 1969),
            book("4", "Hyperion", "Dan Simmons", "9780553283686", 1989),
        ])
        .await;

        let picks = svc.recommendations().await.expect("recommendations ok");
        assert_eq!(picks.len(), 3);
        let mut ids: Vec<&str> = picks.iter().map(|b| b.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        // smaller collections are returned whole
        let svc = seeded(vec![book("1", "Dune", "Frank Herbert", "9780441013593", 1965)]).await;
        assert_eq!(svc.recommendations().await.expect("recommendations ok").len(), 1);
    }

    #[tokio::test]
    async fn stats_counts_years_and_top_authors() {
        let svc = seeded(vec![]).await;
        let empty = svc.stats().await.expect("stats ok");
        assert_eq!(empty.total_books, 0);
        assert!(empty.books_by_year.is_empty());
        assert!(empty.top_authors.is_empty());

        let svc = seeded(vec![
            book("1", "Dune", "Frank Herbert", "9780441013593", 1965),
            book("2", "Dune Messiah", "Frank Herbert", "9780593098233", 1969),
            book("3", "Neuromancer", "William Gibson", "9780441569595", 1984),
            book("4", "Count Zero", "William Gibson", "9780575036963", 1984),
            book("5", "Children of Dune", "Frank Herbert", "9780593098240", 1976),
        ])
        .await;

        let stats = svc.stats().await.expect("stats ok");
        assert_eq!(stats.total_books, 5);
        assert_eq!(stats.books_by_year.get(&1984), Some(&2));
        assert_eq!(stats.books_by_year.get(&1965), Some(&1));
        assert_eq!(stats.top_authors.len(), 2);
        assert_eq!(stats.top_authors[0].author, "Frank Herbert");
        assert_eq!(stats.top_authors[0].count, 3);
    }

    #[tokio::test]
    async fn stats_keeps_only_top_five_authors() {
        let books = (0..7)
            .map(|i| book(&i.to_string(), "Title", &format!("Author {i}"), "9780441013593", 1990))
            .collect();
        let svc = seeded(books).await;
        let stats = svc.stats().await.expect("stats ok");
        assert_eq!(stats.total_books, 7);
        assert_eq!(stats.top_authors.len(), 5);
    }

    #[tokio::test]
    async fn by_decade_uses_half_open_interval() {
        let svc = seeded(vec![
            book("1", "Dune", "Frank Herbert", "9780441013593", 1965),
            book("2", "Neuromancer", "William Gibson", "9780441569595", 1984),
            book("3", "A 1990 book", "Someone", "9780000000000", 1990),
            book("4", "A 1999 book", "Someone", "9780000000001", 1999),
            book("5", "A 2000 book", "Someone", "9780000000002", 2000),
        ])
        .await;

        let nineties = svc.by_decade(1990).await.expect("by_decade ok");
        assert_eq!(nineties.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["3", "4"]);

        let sixties = svc.by_decade(1960).await.expect("by_decade ok");
        assert_eq!(sixties.len(), 1);
        assert_eq!(sixties[0].title, "Dune");

        assert!(svc.by_decade(1970).await.expect("by_decade ok").is_empty());
    }

    #[tokio::test]
    async fn by_decade_rejects_out_of_range_values() {
        let svc = seeded(vec![]).await;
        assert!(matches!(svc.by_decade(999).await, Err(ServiceError::Validation(_))));
        assert!(matches!(svc.by_decade(-10).await, Err(ServiceError::Validation(_))));
        assert!(matches!(svc.by_decade(current_year() + 10).await, Err(ServiceError::Validation(_))));
        assert!(svc.by_decade(1000).await.is_ok());
    }
}
