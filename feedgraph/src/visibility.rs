//! Read paths. Every multi-post listing drops drafts, dangling ids and posts whose owner blocked the
//! viewer, and returns the survivors newest-first.

use std::collections::BTreeSet;

use crate::errors::{GraphError, GraphResult};
use crate::graph::SocialGraph;
use crate::media::MediaStore;
use crate::store::GraphStore;
use crate::types::{GLOBAL_SCOPE, Post, PostRecord, PostStatus, Principal, Relation, Sequence};

impl<S: GraphStore, M: MediaStore> SocialGraph<S, M> {
    async fn visible_posts(&self, viewer: &Principal, ids: impl IntoIterator<Item = String>) -> GraphResult<Vec<Post>> {
        let blockers = self.blocked_by(&viewer.id).await?;
        let mut seen = BTreeSet::new();
        let mut records = Vec::new();
        for id in ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(record) = self.store.get::<PostRecord>(&id).await? else {
                continue;
            };
            if record.is_published() && !blockers.contains(&record.owner_id) {
                records.push(record);
            }
        }
        self.assemble_newest_first(records).await
    }

    async fn assemble_newest_first(&self, mut records: Vec<PostRecord>) -> GraphResult<Vec<Post>> {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let mut posts = Vec::with_capacity(records.len());
        for record in records {
            posts.push(self.assemble_post(record).await?);
        }
        Ok(posts)
    }

    /// Single post. Drafts are only visible to their owner.
    pub async fn get_post(&self, viewer: &Principal, post_id: &str) -> GraphResult<Post> {
        let record = self.load_post(post_id).await?;
        self.ensure_engageable(&record, &viewer.id).await?;
        self.assemble_post(record).await
    }

    pub async fn global_feed(&self, viewer: &Principal) -> GraphResult<Vec<Post>> {
        let ids = self.store.members(Relation::PostIndex, GLOBAL_SCOPE).await?;
        self.visible_posts(viewer, ids).await
    }

    /// Posts of every user the viewer follows.
    pub async fn following_feed(&self, viewer: &Principal) -> GraphResult<Vec<Post>> {
        let mut ids = Vec::new();
        for followed in self.store.members(Relation::Followings, &viewer.id).await? {
            ids.extend(self.store.sequence(Sequence::UserPosts, &followed).await?);
        }
        self.visible_posts(viewer, ids).await
    }

    /// Posts using `audio_id`. An unknown audio id yields an empty feed.
    pub async fn audio_feed(&self, viewer: &Principal, audio_id: &str) -> GraphResult<Vec<Post>> {
        Self::require_id("audio", audio_id)?;
        let ids = self.store.members(Relation::AudioPosts, audio_id).await?;
        self.visible_posts(viewer, ids).await
    }

    pub async fn tagged_feed(&self, viewer: &Principal) -> GraphResult<Vec<Post>> {
        let ids = self.store.members(Relation::TaggedPosts, &viewer.id).await?;
        self.visible_posts(viewer, ids).await
    }

    pub async fn saved_posts(&self, viewer: &Principal) -> GraphResult<Vec<Post>> {
        let ids = self.store.members(Relation::Saved, &viewer.id).await?;
        self.visible_posts(viewer, ids).await
    }

    pub async fn liked_posts(&self, viewer: &Principal) -> GraphResult<Vec<Post>> {
        let ids = self.store.members(Relation::Liked, &viewer.id).await?;
        self.visible_posts(viewer, ids).await
    }

    /// Published posts of `target_id`. Private profiles are readable by their owner and followers only.
    pub async fn profile_posts(&self, viewer: &Principal, target_id: &str) -> GraphResult<Vec<Post>> {
        let target = self.load_user(target_id).await?;
        if viewer.id != target.id {
            if self.has_blocked(&target.id, &viewer.id).await? {
                return Err(GraphError::forbidden("you have been blocked by this user"));
            }
            if target.is_private && !self.store.is_member(Relation::Followers, &target.id, &viewer.id).await? {
                return Err(GraphError::forbidden("this account is private"));
            }
        }

        let mut records = Vec::new();
        for id in self.store.sequence(Sequence::UserPosts, &target.id).await? {
            if let Some(record) = self.store.get::<PostRecord>(&id).await?
                && record.is_published()
            {
                records.push(record);
            }
        }
        self.assemble_newest_first(records).await
    }

    /// The caller's own drafts.
    pub async fn drafts(&self, caller: &Principal) -> GraphResult<Vec<Post>> {
        let mut records = Vec::new();
        for id in self.store.sequence(Sequence::UserPosts, &caller.id).await? {
            if let Some(record) = self.store.get::<PostRecord>(&id).await?
                && record.status == PostStatus::Draft
            {
                records.push(record);
            }
        }
        self.assemble_newest_first(records).await
    }
}
