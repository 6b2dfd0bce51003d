//! feedgraph core library.
//!
//! Social graph and feed interaction engine: posts and drafts, likes, saves, tagging, comment trees,
//! follows and blocks, the visibility rules applied to every read path, and real-time notification
//! fan-out. Storage goes through [`GraphStore`] (Redis or in-memory), uploaded files through
//! [`MediaStore`], and notifications through a [`NotificationChannel`].

pub mod comments;
pub mod config;
pub mod engagement;
pub mod errors;
pub mod graph;
pub mod id;
pub mod identity;
pub mod keys;
pub mod media;
pub mod notify;
pub mod payload;
pub mod posts;
pub mod store;
pub mod types;
pub mod visibility;

pub use comments::{CommentNode, relative_age};
pub use config::{Backend, ConfigError, Settings};
pub use errors::*;
pub use graph::SocialGraph;
pub use identity::{NewUser, ProfilePatch};
pub use media::{DiskMediaStore, MediaKind, MediaRef, MediaResolver, MediaStore, MediaUpload, MemoryMediaStore};
pub use notify::{
    ChannelHandle, DeliveryError, Dispatcher, NotificationChannel, NotificationEvent, NotificationHub,
    NotificationKind, Subscription,
};
pub use payload::{PostForm, TaggedFriendsPayload};
pub use posts::{NewAudio, NewPost, PostPatch};
pub use store::{GraphStore, MemoryStore, RedisStore};
pub use types::*;

pub use redis::aio::ConnectionManager;
