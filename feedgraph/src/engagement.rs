//! Likes and saves. Every flip is a single set add/remove whose return value decides the outcome,
//! so concurrent duplicate toggles converge instead of double counting.

use log::debug;

use crate::errors::GraphResult;
use crate::graph::SocialGraph;
use crate::media::MediaStore;
use crate::notify::NotificationKind;
use crate::store::GraphStore;
use crate::types::{PostRecord, Principal, Relation, ToggleOutcome, UserSummary};

const LIKED_POST_MESSAGE: &str = "Liked your post";
const UNLIKED_POST_MESSAGE: &str = "Unliked your post";

impl<S: GraphStore, M: MediaStore> SocialGraph<S, M> {
    async fn engageable_post(&self, caller: &Principal, post_id: &str) -> GraphResult<PostRecord> {
        let post = self.load_post(post_id).await?;
        self.ensure_engageable(&post, &caller.id).await?;
        Ok(post)
    }

    async fn add_like(&self, caller: &Principal, post: &PostRecord) -> GraphResult<bool> {
        let added = self.store.add_member(Relation::PostLikes, &post.id, &caller.id).await?;
        self.store.add_member(Relation::Liked, &caller.id, &post.id).await?;
        if added {
            self.notify(NotificationKind::Like, &caller.id, &post.owner_id, &post.id, LIKED_POST_MESSAGE)
                .await;
        }
        Ok(added)
    }

    async fn drop_like(&self, caller: &Principal, post: &PostRecord) -> GraphResult<bool> {
        let removed = self.store.remove_member(Relation::PostLikes, &post.id, &caller.id).await?;
        self.store.remove_member(Relation::Liked, &caller.id, &post.id).await?;
        Ok(removed)
    }

    pub async fn toggle_like(&self, caller: &Principal, post_id: &str) -> GraphResult<ToggleOutcome> {
        let post = self.engageable_post(caller, post_id).await?;
        let outcome = if self.drop_like(caller, &post).await? {
            ToggleOutcome::Removed
        } else {
            self.add_like(caller, &post).await?;
            ToggleOutcome::Added
        };
        debug!("{} like on {post_id}: {outcome:?}", caller.id);
        Ok(outcome)
    }

    /// Idempotent like; `true` when the like was newly added.
    pub async fn like_post(&self, caller: &Principal, post_id: &str) -> GraphResult<bool> {
        let post = self.engageable_post(caller, post_id).await?;
        self.add_like(caller, &post).await
    }

    /// Idempotent unlike; `true` when a like was actually removed.
    pub async fn unlike_post(&self, caller: &Principal, post_id: &str) -> GraphResult<bool> {
        let post = self.engageable_post(caller, post_id).await?;
        let removed = self.drop_like(caller, &post).await?;
        if removed {
            self.notify(NotificationKind::Dislike, &caller.id, &post.owner_id, &post.id, UNLIKED_POST_MESSAGE)
                .await;
        }
        Ok(removed)
    }

    pub async fn post_likers(&self, post_id: &str) -> GraphResult<Vec<UserSummary>> {
        let post = self.load_post(post_id).await?;
        let likers = self.store.members(Relation::PostLikes, &post.id).await?;
        self.summaries(likers).await
    }

    pub async fn toggle_save(&self, caller: &Principal, post_id: &str) -> GraphResult<ToggleOutcome> {
        let post = self.engageable_post(caller, post_id).await?;
        if self.store.remove_member(Relation::Saved, &caller.id, &post.id).await? {
            return Ok(ToggleOutcome::Removed);
        }
        self.store.add_member(Relation::Saved, &caller.id, &post.id).await?;
        Ok(ToggleOutcome::Added)
    }
}
