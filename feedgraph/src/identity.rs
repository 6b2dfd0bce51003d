//! Users and the follow / follow-request / block relationships between them.

use std::collections::BTreeSet;

use chrono::Utc;
use log::{debug, warn};
use serde::Deserialize;

use crate::errors::{GraphError, GraphResult};
use crate::graph::SocialGraph;
use crate::id::generate_entity_id;
use crate::media::MediaStore;
use crate::store::GraphStore;
use crate::types::{
    BlockOutcome, CommentRecord, FollowOutcome, PostRecord, Principal, Relation, Role, Sequence, UniqueField, UserId, UserProfile,
    UserRecord, UserSummary,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub role: Role,
}

impl NewUser {
    pub fn named(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }
}

/// Partial profile update. `None` leaves a field untouched; an empty bio clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

fn normalize_username(raw: &str) -> GraphResult<(String, String)> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(GraphError::EmptyInput { field: "username" });
    }
    Ok((username.to_string(), username.to_lowercase()))
}

fn normalize_bio(raw: Option<String>) -> Option<String> {
    raw.map(|bio| bio.trim().to_string()).filter(|bio| !bio.is_empty())
}

impl<S: GraphStore, M: MediaStore> SocialGraph<S, M> {
    pub async fn register_user(&self, new_user: NewUser) -> GraphResult<UserRecord> {
        let (username, claim) = normalize_username(&new_user.username)?;
        let id = generate_entity_id();
        if self
            .store
            .claim_unique(UniqueField::Username, &claim, &id)
            .await?
            .is_some()
        {
            return Err(GraphError::Conflict {
                field: "username",
                value: username,
            });
        }

        let now = Utc::now();
        let user = UserRecord {
            id,
            username,
            bio: normalize_bio(new_user.bio),
            is_private: new_user.is_private,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.store.put(&user).await {
            self.release_username(&claim, &user.id).await;
            return Err(err);
        }
        debug!("registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> GraphResult<UserRecord> {
        self.load_user(user_id).await
    }

    pub async fn user_summary(&self, user_id: &str) -> GraphResult<UserSummary> {
        Ok(UserSummary::from_record(&self.load_user(user_id).await?))
    }

    pub async fn profile(&self, user_id: &str) -> GraphResult<UserProfile> {
        let user = self.load_user(user_id).await?;
        let followers = self.store.members(Relation::Followers, user_id).await?.len();
        let followings = self.store.members(Relation::Followings, user_id).await?.len();
        let posts = self.store.sequence(Sequence::UserPosts, user_id).await?.len();
        Ok(UserProfile {
            user,
            followers,
            followings,
            posts,
        })
    }

    pub async fn update_profile(
        &self,
        caller: &Principal,
        user_id: &str,
        patch: ProfilePatch,
    ) -> GraphResult<UserRecord> {
        let mut user = self.load_user(user_id).await?;
        if caller.id != user.id {
            return Err(GraphError::forbidden("you can only update your own profile"));
        }

        let mut swapped_claim = None;
        if let Some(raw) = patch.username.as_deref() {
            let (username, claim) = normalize_username(raw)?;
            let previous_claim = user.username.to_lowercase();
            if claim != previous_claim {
                if self
                    .store
                    .claim_unique(UniqueField::Username, &claim, &user.id)
                    .await?
                    .is_some()
                {
                    return Err(GraphError::Conflict {
                        field: "username",
                        value: username,
                    });
                }
                swapped_claim = Some((previous_claim, claim));
            }
            user.username = username;
        }
        if let Some(bio) = patch.bio {
            user.bio = normalize_bio(Some(bio));
        }
        if let Some(is_private) = patch.is_private {
            user.is_private = is_private;
        }
        user.updated_at = Utc::now();

        match self.store.put(&user).await {
            Ok(()) => {
                if let Some((previous, _)) = &swapped_claim {
                    self.release_username(previous, &user.id).await;
                }
                Ok(user)
            }
            Err(err) => {
                if let Some((_, claimed)) = &swapped_claim {
                    self.release_username(claimed, &user.id).await;
                }
                Err(err)
            }
        }
    }

    /// Cleanup after the outcome is already decided; a stale claim only blocks that name.
    async fn release_username(&self, claim: &str, user_id: &str) {
        if let Err(err) = self.store.release_unique(UniqueField::Username, claim, user_id).await {
            warn!("could not release username '{claim}' held by {user_id}: {err}");
        }
    }

    /// Removes an account together with its posts and comments, and drops it from every like,
    /// tag, follow, request and block set that references it. Allowed for the account itself and
    /// for admins. The user record goes last so an interrupted delete can be retried.
    pub async fn delete_user(&self, caller: &Principal, user_id: &str) -> GraphResult<()> {
        let user = self.load_user(user_id).await?;
        if caller.id != user.id && !caller.is_admin() {
            return Err(GraphError::forbidden("you can only delete your own account"));
        }

        for post_id in self.store.sequence(Sequence::UserPosts, &user.id).await? {
            if let Some(post) = self.store.get::<PostRecord>(&post_id).await? {
                self.purge_post(&post).await?;
            }
        }
        self.store.clear_sequence(Sequence::UserPosts, &user.id).await?;

        for comment_id in self.store.members(Relation::AuthoredComments, &user.id).await? {
            if let Some(comment) = self.store.get::<CommentRecord>(&comment_id).await? {
                self.detach_comment(&comment).await?;
            }
        }
        self.store.clear_relation(Relation::AuthoredComments, &user.id).await?;

        // (set on the user, mirrored set on the other side)
        for (own, mirrored) in [
            (Relation::Liked, Relation::PostLikes),
            (Relation::LikeComment, Relation::CommentLikes),
            (Relation::TaggedPosts, Relation::TaggedFriends),
            (Relation::Followers, Relation::Followings),
            (Relation::Followings, Relation::Followers),
        ] {
            for other in self.store.members(own, &user.id).await? {
                self.store.remove_member(mirrored, &other, &user.id).await?;
            }
            self.store.clear_relation(own, &user.id).await?;
        }
        self.store.clear_relation(Relation::Saved, &user.id).await?;

        for relation in [Relation::FollowRequests, Relation::BlockedUsers] {
            for owner in self.store.reverse_members(relation, &user.id).await? {
                self.store.remove_member(relation, &owner, &user.id).await?;
            }
            self.store.clear_relation(relation, &user.id).await?;
        }

        self.store
            .release_unique(UniqueField::Username, &user.username.to_lowercase(), &user.id)
            .await?;
        self.store.remove::<UserRecord>(&user.id).await?;
        debug!("deleted user {} ({})", user.username, user.id);
        Ok(())
    }

    /// Follows, unfollows, requests or cancels a request depending on the current state.
    pub async fn toggle_follow(&self, caller: &Principal, target_id: &str) -> GraphResult<FollowOutcome> {
        if caller.id == target_id {
            return Err(GraphError::invalid("you cannot follow yourself"));
        }
        let target = self.load_user(target_id).await?;
        self.load_user(&caller.id).await?;
        if self.has_blocked(&target.id, &caller.id).await? || self.has_blocked(&caller.id, &target.id).await? {
            return Err(GraphError::forbidden("follow is not allowed between blocked users"));
        }

        if self.store.remove_member(Relation::Followings, &caller.id, &target.id).await? {
            self.store.remove_member(Relation::Followers, &target.id, &caller.id).await?;
            debug!("{} unfollowed {}", caller.id, target.id);
            return Ok(FollowOutcome::Unfollowed);
        }

        if target.is_private {
            if self.store.remove_member(Relation::FollowRequests, &target.id, &caller.id).await? {
                return Ok(FollowOutcome::RequestCancelled);
            }
            self.store.add_member(Relation::FollowRequests, &target.id, &caller.id).await?;
            return Ok(FollowOutcome::Requested);
        }

        self.store.add_member(Relation::Followings, &caller.id, &target.id).await?;
        self.store.add_member(Relation::Followers, &target.id, &caller.id).await?;
        debug!("{} followed {}", caller.id, target.id);
        Ok(FollowOutcome::Followed)
    }

    pub async fn approve_follow_request(&self, owner: &Principal, requester_id: &str) -> GraphResult<()> {
        Self::require_id("user", requester_id)?;
        if !self.store.remove_member(Relation::FollowRequests, &owner.id, requester_id).await? {
            return Err(GraphError::not_found("follow request", requester_id));
        }
        self.store.add_member(Relation::Followers, &owner.id, requester_id).await?;
        self.store.add_member(Relation::Followings, requester_id, &owner.id).await?;
        Ok(())
    }

    pub async fn reject_follow_request(&self, owner: &Principal, requester_id: &str) -> GraphResult<()> {
        Self::require_id("user", requester_id)?;
        if !self.store.remove_member(Relation::FollowRequests, &owner.id, requester_id).await? {
            return Err(GraphError::not_found("follow request", requester_id));
        }
        Ok(())
    }

    pub async fn pending_follow_requests(&self, owner: &Principal) -> GraphResult<Vec<UserSummary>> {
        let ids = self.store.members(Relation::FollowRequests, &owner.id).await?;
        self.summaries(ids).await
    }

    /// Blocking severs follows and pending requests in both directions. Likes, comments and saves
    /// already made stay in place.
    pub async fn toggle_block(&self, caller: &Principal, target_id: &str) -> GraphResult<BlockOutcome> {
        if caller.id == target_id {
            return Err(GraphError::invalid("you cannot block yourself"));
        }
        let target = self.load_user(target_id).await?;

        if self.store.remove_member(Relation::BlockedUsers, &caller.id, &target.id).await? {
            debug!("{} unblocked {}", caller.id, target.id);
            return Ok(BlockOutcome::Unblocked);
        }
        self.store.add_member(Relation::BlockedUsers, &caller.id, &target.id).await?;

        for (owner, member) in [(&caller.id, &target.id), (&target.id, &caller.id)] {
            self.store.remove_member(Relation::Followings, owner, member).await?;
            self.store.remove_member(Relation::Followers, member, owner).await?;
            self.store.remove_member(Relation::FollowRequests, owner, member).await?;
        }
        debug!("{} blocked {}", caller.id, target.id);
        Ok(BlockOutcome::Blocked)
    }

    /// Users whose block list contains `viewer_id`.
    pub async fn blocked_by(&self, viewer_id: &str) -> GraphResult<BTreeSet<UserId>> {
        self.store.reverse_members(Relation::BlockedUsers, viewer_id).await
    }

    pub async fn blocked_users(&self, caller: &Principal) -> GraphResult<Vec<UserSummary>> {
        let ids = self.store.members(Relation::BlockedUsers, &caller.id).await?;
        self.summaries(ids).await
    }

    pub async fn followers(&self, user_id: &str) -> GraphResult<Vec<UserSummary>> {
        self.load_user(user_id).await?;
        let ids = self.store.members(Relation::Followers, user_id).await?;
        self.summaries(ids).await
    }

    pub async fn followings(&self, user_id: &str) -> GraphResult<Vec<UserSummary>> {
        self.load_user(user_id).await?;
        let ids = self.store.members(Relation::Followings, user_id).await?;
        self.summaries(ids).await
    }

    /// Summaries of existing users; ids without a record are skipped.
    pub(crate) async fn summaries(&self, ids: impl IntoIterator<Item = String>) -> GraphResult<Vec<UserSummary>> {
        let mut summaries = Vec::new();
        for id in ids {
            if let Some(user) = self.store.get::<UserRecord>(&id).await? {
                summaries.push(UserSummary::from_record(&user));
            }
        }
        Ok(summaries)
    }
}
