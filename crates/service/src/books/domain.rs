use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// 图书记录结构：集合内唯一 id 由服务端按创建时刻的毫秒时间戳生成
/// - isbn: 10 到 17 位数字或连字符
/// - published_year: 1000 到当前年份（线路字段名为 publishedYear）
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub published_year: i32,
}

/// The persisted snapshot: one ordered sequence of books under a `books` key.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookCollection {
    pub books: Vec<Book>,
}

/// 创建/更新输入模型：不包含 id，由服务端生成；更新时缺失字段保留原值
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
}

impl BookPayload {
    /// Apply the provided fields over an existing record; text fields are
    /// sanitized, absent fields keep their previous value. The record id is
    /// never touched.
    pub fn merged_over(&self, existing: &Book) -> Book {
        Book {
            id: existing.id.clone(),
            title: self
                .title
                .as_deref()
                .map(sanitize)
                .unwrap_or_else(|| existing.title.clone()),
            author: self
                .author
                .as_deref()
                .map(sanitize)
                .unwrap_or_else(|| existing.author.clone()),
            isbn: self.isbn.clone().unwrap_or_else(|| existing.isbn.clone()),
            published_year: self.published_year.unwrap_or(existing.published_year),
        }
    }
}

/// Trim and escape markup-significant characters; the escaped form is what
/// gets stored.
pub(crate) fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// 统一校验：标题、作者、ISBN、出版年份
pub fn validate_book(book: &Book) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if book.title.is_empty() {
        errors.push(FieldError::new("title", "title must be a non-empty string"));
    }
    if book.author.is_empty() {
        errors.push(FieldError::new("author", "author must be a non-empty string"));
    }
    if !is_valid_isbn(&book.isbn) {
        errors.push(FieldError::new("isbn", "isbn must be 10 to 17 digits or hyphens"));
    }
    let year = current_year();
    if book.published_year < 1000 || book.published_year > year {
        errors.push(FieldError::new(
            "publishedYear",
            format!("publishedYear must be an integer between 1000 and {year}"),
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_isbn(isbn: &str) -> bool {
    (10..=17).contains(&isbn.len()) && isbn.chars().all(|c| c.is_ascii_digit() || c == '-')
}

pub fn current_year() -> i32 {
    Utc::now().year()
}
