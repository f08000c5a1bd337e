//! Post and category models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Post category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Announcements.
    Notice,
    /// Free discussion.
    Free,
    /// Questions and answers.
    Qna,
    /// Everything else.
    Etc,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Category; 4] = [
        Category::Notice,
        Category::Free,
        Category::Qna,
        Category::Etc,
    ];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Notice => "NOTICE",
            Category::Free => "FREE",
            Category::Qna => "QNA",
            Category::Etc => "ETC",
        }
    }

    /// Built-in display label.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Notice => "공지",
            Category::Free => "자유",
            Category::Qna => "Q&A",
            Category::Etc => "기타",
        }
    }

    /// Built-in labels for every category.
    pub fn default_labels() -> BTreeMap<Category, String> {
        Self::ALL
            .iter()
            .map(|c| (*c, c.label().to_string()))
            .collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOTICE" => Ok(Category::Notice),
            "FREE" => Ok(Category::Free),
            "QNA" => Ok(Category::Qna),
            "ETC" => Ok(Category::Etc),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// A board post as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Title.
    pub title: String,
    /// Body text. List responses may omit it.
    #[serde(default)]
    pub content: String,
    /// Category, as sent by the detail endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Category, as sent by the list endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_category: Option<Category>,
    /// Creation timestamp.
    pub created_at: String,
    /// Attached image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Owning board ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<i64>,
}

impl Post {
    /// Category from whichever field the server filled in.
    pub fn category(&self) -> Option<Category> {
        self.category.or(self.board_category)
    }
}

/// One page of posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    /// Posts on this page.
    pub content: Vec<Post>,
    /// Total number of pages.
    pub total_pages: u32,
    /// Total number of posts.
    pub total_elements: u64,
    /// Page size.
    pub size: u32,
    /// Zero-based page number.
    pub number: u32,
}

/// Fields for creating or editing a post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRequest {
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Category.
    pub category: Category,
}

impl PostRequest {
    /// Create a post request.
    pub fn new(title: impl Into<String>, content: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category,
        }
    }
}
