use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

/// Feed modes served by the engine. Each variant is bound to exactly one
/// candidate-selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Home,
    Following,
    Trending,
    Discover,
}

impl FeedType {
    pub const ALL: [FeedType; 4] = [
        FeedType::Home,
        FeedType::Following,
        FeedType::Trending,
        FeedType::Discover,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Following => "following",
            Self::Trending => "trending",
            Self::Discover => "discover",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" | "personal" => Ok(Self::Home),
            "following" => Ok(Self::Following),
            "trending" => Ok(Self::Trending),
            "discover" => Ok(Self::Discover),
            other => Err(AppError::Validation(format!(
                "Invalid feed type '{}'. Must be one of: home, following, trending, discover",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Friends,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friends => "friends",
            Self::Private => "private",
        }
    }

    /// Unrecognised stored values are treated as the most restrictive.
    pub fn from_db(value: &str) -> Self {
        match value {
            "public" => Self::Public,
            "friends" => Self::Friends,
            _ => Self::Private,
        }
    }
}

/// Read-only view of a post owned by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub shares_count: u64,
    #[serde(default)]
    pub views_count: u64,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub is_promoted: bool,
}

impl Post {
    /// `likes + 2·comments + 3·shares`
    pub fn engagement_score(&self) -> f64 {
        self.likes_count as f64 + 2.0 * self.comments_count as f64 + 3.0 * self.shares_count as f64
    }

    pub fn has_any_tag<'a, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        tags.into_iter().any(|tag| self.hashtags.contains(tag))
    }
}

/// Why an item was selected for the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedReason {
    YourPost,
    Following,
    Suggested,
    Trending,
    Discover,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub post: Post,
    pub score: f64,
    pub reason: FeedReason,
    pub time_ago: String,
    pub is_promoted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
}

/// Ranked list stored per `(user_id, feed_type)`. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedFeed {
    pub user_id: Uuid,
    pub feed_type: FeedType,
    pub items: Vec<FeedItem>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedFeed {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }

    /// Slice `[offset, offset + limit)`, clamped to the stored list.
    pub fn page(&self, offset: usize, limit: usize) -> Vec<FeedItem> {
        page_of(&self.items, offset, limit)
    }
}

pub fn page_of(items: &[FeedItem], offset: usize, limit: usize) -> Vec<FeedItem> {
    if offset >= items.len() {
        return Vec::new();
    }
    let end = offset.saturating_add(limit).min(items.len());
    items[offset..end].to_vec()
}

/// Engagement kinds. Unknown kinds are kept verbatim and score as a view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionType {
    View,
    Like,
    Comment,
    Share,
    Save,
    Hide,
    Report,
    Other(String),
}

impl InteractionType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Share => "share",
            Self::Save => "save",
            Self::Hide => "hide",
            Self::Report => "report",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Base interaction score before the dwell-time bonus.
    pub fn base_score(&self) -> f64 {
        match self {
            Self::View => 1.0,
            Self::Like => 5.0,
            Self::Comment => 10.0,
            Self::Share => 15.0,
            Self::Save => 8.0,
            Self::Hide | Self::Report | Self::Other(_) => 1.0,
        }
    }
}

impl From<String> for InteractionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "view" => Self::View,
            "like" => Self::Like,
            "comment" => Self::Comment,
            "share" => Self::Share,
            "save" => Self::Save,
            "hide" => Self::Hide,
            "report" => Self::Report,
            _ => Self::Other(value),
        }
    }
}

impl From<InteractionType> for String {
    fn from(value: InteractionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSource {
    Feed,
    Profile,
    Search,
    Trending,
    Discover,
    Notification,
}

impl InteractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Profile => "profile",
            Self::Search => "search",
            Self::Trending => "trending",
            Self::Discover => "discover",
            Self::Notification => "notification",
        }
    }
}

impl FromStr for InteractionSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(Self::Feed),
            "profile" => Ok(Self::Profile),
            "search" => Ok(Self::Search),
            "trending" => Ok(Self::Trending),
            "discover" => Ok(Self::Discover),
            "notification" => Ok(Self::Notification),
            other => Err(AppError::Validation(format!(
                "Invalid source '{}'. Must be one of: feed, profile, search, trending, discover, notification",
                other
            ))),
        }
    }
}

/// Append-only engagement record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInteraction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub interaction_type: InteractionType,
    pub interaction_score: f64,
    pub time_spent_seconds: u64,
    pub source: InteractionSource,
    pub created_at: DateTime<Utc>,
}
