//! Records persisted by the storage backends and the views assembled from them.
//!
//! Records only carry scalar fields. Sets (likes, followers, blocks, ...) and ordered lists (a user's
//! posts, a post's root comments, a comment's replies) live in separate keys so every relation change is
//! a single atomic add/remove in the store.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::errors::GraphError;
use crate::media::MediaRef;

pub type UserId = String;
pub type PostId = String;
pub type CommentId = String;
pub type AudioId = String;

/// A persisted entity addressed by `collection` + id.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn entity_id(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// Authenticated caller supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn user(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
        }
    }

    pub fn admin(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    #[default]
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = GraphError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(GraphError::invalid(format!("unknown post status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UserRecord {
    const COLLECTION: &'static str = "users";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub owner_id: UserId,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub image_ref: Option<MediaRef>,
    #[serde(default)]
    pub video_ref: Option<MediaRef>,
    #[serde(default)]
    pub audio_id: Option<AudioId>,
    #[serde(default)]
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for PostRecord {
    const COLLECTION: &'static str = "posts";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl PostRecord {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub fn media_refs(&self) -> impl Iterator<Item = &MediaRef> {
        self.image_ref.iter().chain(self.video_ref.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub text: String,
    /// `None` for root comments.
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CommentRecord {
    const COLLECTION: &'static str = "comments";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl CommentRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRecord {
    pub id: AudioId,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    pub audio_ref: MediaRef,
    #[serde(default)]
    pub image_ref: Option<MediaRef>,
    pub created_at: DateTime<Utc>,
}

impl Entity for AudioRecord {
    const COLLECTION: &'static str = "audio";

    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// Unordered id sets. Every mutation is an idempotent add/remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// user -> users following them
    Followers,
    /// user -> users they follow
    Followings,
    /// user -> users waiting for approval to follow them; reverse set is the requests a user sent
    FollowRequests,
    /// user -> users they blocked; reverse set is `blocked_by`
    BlockedUsers,
    /// user -> liked posts
    Liked,
    /// user -> saved posts
    Saved,
    /// user -> liked comments
    LikeComment,
    /// user -> posts they are tagged on
    TaggedPosts,
    /// user -> comments and replies they wrote
    AuthoredComments,
    /// post -> users who liked it
    PostLikes,
    /// post -> tagged users
    TaggedFriends,
    /// post -> every comment (roots, replies, orphans) written under it
    PostThread,
    /// comment -> users who liked it
    CommentLikes,
    /// global scope -> every post id
    PostIndex,
    /// audio -> posts using it
    AudioPosts,
}

impl Relation {
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Followers => "followers",
            Self::Followings => "followings",
            Self::FollowRequests => "follow_requests",
            Self::BlockedUsers => "blocked_users",
            Self::Liked => "liked",
            Self::Saved => "saved",
            Self::LikeComment => "like_comment",
            Self::TaggedPosts => "tagged_posts",
            Self::AuthoredComments => "authored_comments",
            Self::PostLikes => "post_likes",
            Self::TaggedFriends => "tagged_friends",
            Self::PostThread => "post_thread",
            Self::CommentLikes => "comment_likes",
            Self::PostIndex => "post_index",
            Self::AudioPosts => "audio_posts",
        }
    }

    /// Relations whose reverse lookup ("who has me in their set") is kept by the store.
    pub fn tracks_reverse(&self) -> bool {
        matches!(self, Self::BlockedUsers | Self::FollowRequests)
    }
}

/// Owner scope of [`Relation::PostIndex`].
pub const GLOBAL_SCOPE: &str = "all";

/// Insertion-ordered id lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sequence {
    UserPosts,
    PostComments,
    CommentReplies,
}

impl Sequence {
    pub fn alias(&self) -> &'static str {
        match self {
            Self::UserPosts => "user_posts",
            Self::PostComments => "post_comments",
            Self::CommentReplies => "comment_replies",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Username,
}

impl UniqueField {
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Username => "username",
        }
    }
}

/// Minimal public identity attached to feed items, comment nodes and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}

impl UserSummary {
    pub fn from_record(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }

    /// Placeholder for an author whose record no longer exists.
    pub fn unknown(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            username: String::new(),
        }
    }
}

/// Profile view with relation counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserRecord,
    pub followers: usize,
    pub followings: usize,
    pub posts: usize,
}

/// A post with its relation sets resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    #[serde(flatten)]
    pub record: PostRecord,
    pub owner: UserSummary,
    pub likes: BTreeSet<UserId>,
    pub tagged_friends: BTreeSet<UserId>,
    pub comments: Vec<CommentId>,
}

impl Post {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn status(&self) -> PostStatus {
        self.record.status
    }
}

/// Outcome of an idempotent flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

impl ToggleOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowOutcome {
    Followed,
    Unfollowed,
    Requested,
    RequestCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockOutcome {
    Blocked,
    Unblocked,
}
