//! The [`SocialGraph`] facade.
//!
//! Operations are spread over the `identity`, `posts`, `engagement`, `comments` and `visibility`
//! modules as separate `impl` blocks; this module holds the wiring and the lookups they share.

use std::sync::Arc;

use log::{debug, warn};

use crate::errors::{GraphError, GraphResult};
use crate::id::is_valid_entity_id;
use crate::media::{MediaResolver, MediaStore};
use crate::notify::{Dispatcher, NotificationChannel, NotificationEvent, NotificationKind};
use crate::store::GraphStore;
use crate::types::{
    AudioRecord, CommentRecord, Entity, Post, PostRecord, Relation, Sequence, UserRecord, UserSummary,
};

pub struct SocialGraph<S, M> {
    pub(crate) store: S,
    pub(crate) media: MediaResolver<M>,
    pub(crate) dispatcher: Dispatcher,
}

impl<S: GraphStore, M: MediaStore> SocialGraph<S, M> {
    pub fn new(store: S, media: M, channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            store,
            media: MediaResolver::new(media),
            dispatcher: Dispatcher::new(channel),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn media(&self) -> &MediaResolver<M> {
        &self.media
    }

    pub(crate) fn require_id(entity: &'static str, id: &str) -> GraphResult<()> {
        if is_valid_entity_id(id) {
            Ok(())
        } else {
            Err(GraphError::invalid(format!("invalid {entity} id '{id}'")))
        }
    }

    async fn load<T: Entity>(&self, entity: &'static str, id: &str) -> GraphResult<T> {
        Self::require_id(entity, id)?;
        self.store
            .get::<T>(id)
            .await?
            .ok_or_else(|| GraphError::not_found(entity, id))
    }

    pub(crate) async fn load_user(&self, id: &str) -> GraphResult<UserRecord> {
        self.load("user", id).await
    }

    pub(crate) async fn load_post(&self, id: &str) -> GraphResult<PostRecord> {
        self.load("post", id).await
    }

    pub(crate) async fn load_comment(&self, id: &str) -> GraphResult<CommentRecord> {
        self.load("comment", id).await
    }

    pub(crate) async fn load_audio(&self, id: &str) -> GraphResult<AudioRecord> {
        self.load("audio", id).await
    }

    /// Summary of `id`, or a placeholder if the user record is gone.
    pub(crate) async fn summary_of(&self, id: &str) -> GraphResult<UserSummary> {
        Ok(match self.store.get::<UserRecord>(id).await? {
            Some(user) => UserSummary::from_record(&user),
            None => UserSummary::unknown(id),
        })
    }

    /// `true` when `owner` has `viewer` in its block list.
    pub(crate) async fn has_blocked(&self, owner: &str, viewer: &str) -> GraphResult<bool> {
        self.store.is_member(Relation::BlockedUsers, owner, viewer).await
    }

    pub(crate) async fn ensure_not_blocked(&self, owner: &str, caller: &str) -> GraphResult<()> {
        if owner != caller && self.has_blocked(owner, caller).await? {
            return Err(GraphError::forbidden("you have been blocked by this user"));
        }
        Ok(())
    }

    /// Drafts exist only for their owner; anyone else sees them as missing.
    pub(crate) async fn ensure_engageable(&self, post: &PostRecord, caller: &str) -> GraphResult<()> {
        if !post.is_published() && post.owner_id != caller {
            return Err(GraphError::not_found("post", &post.id));
        }
        self.ensure_not_blocked(&post.owner_id, caller).await
    }

    pub(crate) async fn assemble_post(&self, record: PostRecord) -> GraphResult<Post> {
        let owner = self.summary_of(&record.owner_id).await?;
        let likes = self.store.members(Relation::PostLikes, &record.id).await?;
        let tagged_friends = self.store.members(Relation::TaggedFriends, &record.id).await?;
        let comments = self.store.sequence(Sequence::PostComments, &record.id).await?;
        Ok(Post {
            record,
            owner,
            likes,
            tagged_friends,
            comments,
        })
    }

    /// Hands an event to the dispatcher once the mutation has committed.
    pub(crate) async fn notify(
        &self,
        kind: NotificationKind,
        actor_id: &str,
        recipient_id: &str,
        target_id: &str,
        message: &str,
    ) {
        if actor_id == recipient_id {
            return;
        }
        let actor = match self.summary_of(actor_id).await {
            Ok(actor) => actor,
            Err(err) => {
                warn!("could not load actor {actor_id} for notification: {err}");
                UserSummary::unknown(actor_id)
            }
        };
        debug!("notify {recipient_id}: {kind:?} on {target_id} by {actor_id}");
        self.dispatcher
            .dispatch(NotificationEvent::new(kind, actor, recipient_id, target_id, message));
    }
}
