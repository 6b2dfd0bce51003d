//! Comments, replies and the comment tree.
//!
//! Comments live in an arena keyed by id. A post keeps the ordered list of its root comments, each
//! comment keeps the ordered list of its replies, and the post's thread set holds every comment ever
//! written under it so a post purge reaches orphaned replies too.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::errors::{GraphError, GraphResult};
use crate::graph::SocialGraph;
use crate::id::generate_entity_id;
use crate::media::MediaStore;
use crate::notify::NotificationKind;
use crate::store::GraphStore;
use crate::types::{
    CommentId, CommentRecord, PostRecord, Principal, Relation, Sequence, ToggleOutcome, UserSummary,
};

const COMMENTED_MESSAGE: &str = "commented on your post.";
const LIKED_COMMENT_MESSAGE: &str = "Liked your comment";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentNode {
    pub id: CommentId,
    pub author: UserSummary,
    pub text: String,
    pub parent_id: Option<CommentId>,
    pub depth: usize,
    pub created_at: DateTime<Utc>,
    /// Compact age label such as `now`, `42s`, `5m`, `3h`, `3d`, `2mo`, `1y`.
    pub age: String,
    pub like_count: usize,
    pub liked_by_viewer: bool,
    pub replies: Vec<CommentNode>,
}

/// Compact label for the time elapsed between `created` and `now`.
pub fn relative_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created).num_seconds().max(0);
    if seconds < 1 {
        return "now".to_string();
    }
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h");
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{days}d");
    }
    if days < 365 {
        return format!("{}mo", days / 30);
    }
    format!("{}y", days / 365)
}

fn comment_text(raw: &str) -> GraphResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GraphError::EmptyInput { field: "comment" });
    }
    Ok(text.to_string())
}

struct FlatNode {
    record: CommentRecord,
    depth: usize,
    children: Vec<usize>,
}

impl<S: GraphStore, M: MediaStore> SocialGraph<S, M> {
    async fn write_comment(
        &self,
        post: &PostRecord,
        caller: &Principal,
        text: String,
        parent_id: Option<CommentId>,
    ) -> GraphResult<CommentRecord> {
        let now = Utc::now();
        let comment = CommentRecord {
            id: generate_entity_id(),
            post_id: post.id.clone(),
            author_id: caller.id.clone(),
            text,
            parent_id,
            created_at: now,
            updated_at: now,
        };
        self.store.put(&comment).await?;
        self.store.add_member(Relation::PostThread, &post.id, &comment.id).await?;
        self.store
            .add_member(Relation::AuthoredComments, &comment.author_id, &comment.id)
            .await?;
        match &comment.parent_id {
            Some(parent_id) => {
                self.store
                    .push_sequence(Sequence::CommentReplies, parent_id, &comment.id)
                    .await?
            }
            None => {
                self.store
                    .push_sequence(Sequence::PostComments, &post.id, &comment.id)
                    .await?
            }
        }
        Ok(comment)
    }

    pub async fn add_comment(&self, caller: &Principal, post_id: &str, text: &str) -> GraphResult<CommentRecord> {
        let text = comment_text(text)?;
        let post = self.load_post(post_id).await?;
        self.ensure_engageable(&post, &caller.id).await?;

        let comment = self.write_comment(&post, caller, text, None).await?;
        debug!("{} commented {} on post {}", caller.id, comment.id, post.id);
        self.notify(NotificationKind::Comment, &caller.id, &post.owner_id, &post.id, COMMENTED_MESSAGE)
            .await;
        Ok(comment)
    }

    /// Replies notify nobody.
    pub async fn add_reply(&self, caller: &Principal, parent_id: &str, text: &str) -> GraphResult<CommentRecord> {
        let text = comment_text(text)?;
        let parent = self.load_comment(parent_id).await?;
        let post = self.load_post(&parent.post_id).await?;
        self.ensure_engageable(&post, &caller.id).await?;

        let reply = self.write_comment(&post, caller, text, Some(parent.id)).await?;
        debug!("{} replied {} under {parent_id}", caller.id, reply.id);
        Ok(reply)
    }

    pub async fn edit_comment(&self, caller: &Principal, comment_id: &str, text: &str) -> GraphResult<CommentRecord> {
        let text = comment_text(text)?;
        let mut comment = self.load_comment(comment_id).await?;
        if comment.author_id != caller.id {
            return Err(GraphError::forbidden("only the author can edit this comment"));
        }
        comment.text = text;
        comment.updated_at = Utc::now();
        self.store.put(&comment).await?;
        Ok(comment)
    }

    pub async fn toggle_comment_like(&self, caller: &Principal, comment_id: &str) -> GraphResult<ToggleOutcome> {
        let comment = self.load_comment(comment_id).await?;
        let post = self.load_post(&comment.post_id).await?;
        self.ensure_engageable(&post, &caller.id).await?;

        if self.store.remove_member(Relation::CommentLikes, &comment.id, &caller.id).await? {
            self.store.remove_member(Relation::LikeComment, &caller.id, &comment.id).await?;
            return Ok(ToggleOutcome::Removed);
        }
        self.store.add_member(Relation::CommentLikes, &comment.id, &caller.id).await?;
        self.store.add_member(Relation::LikeComment, &caller.id, &comment.id).await?;
        self.notify(
            NotificationKind::Like,
            &caller.id,
            &comment.author_id,
            &comment.id,
            LIKED_COMMENT_MESSAGE,
        )
        .await;
        Ok(ToggleOutcome::Added)
    }

    pub async fn comment_likers(&self, comment_id: &str) -> GraphResult<Vec<UserSummary>> {
        let comment = self.load_comment(comment_id).await?;
        let likers = self.store.members(Relation::CommentLikes, &comment.id).await?;
        self.summaries(likers).await
    }

    /// Deletes a root comment. Its replies stay in the thread as unreachable orphans.
    pub async fn delete_comment(&self, caller: &Principal, comment_id: &str) -> GraphResult<()> {
        let comment = self.load_comment(comment_id).await?;
        if !comment.is_root() {
            return Err(GraphError::invalid("comment is a reply; delete it as a reply"));
        }
        if comment.author_id != caller.id {
            return Err(GraphError::forbidden("only the author can delete this comment"));
        }
        self.detach_comment(&comment).await?;
        debug!("deleted comment {comment_id}");
        Ok(())
    }

    /// Deletes a reply. Allowed for its author and for admins.
    pub async fn delete_reply(&self, caller: &Principal, reply_id: &str) -> GraphResult<()> {
        let reply = self.load_comment(reply_id).await?;
        if reply.is_root() {
            return Err(GraphError::invalid("comment is not a reply"));
        }
        if reply.author_id != caller.id && !caller.is_admin() {
            return Err(GraphError::forbidden("only the author or an admin can delete this reply"));
        }
        self.detach_comment(&reply).await?;
        debug!("deleted reply {reply_id}");
        Ok(())
    }

    /// Unlinks a comment from its parent list and its post's thread, then purges it.
    pub(crate) async fn detach_comment(&self, comment: &CommentRecord) -> GraphResult<()> {
        match &comment.parent_id {
            Some(parent_id) => {
                self.store
                    .remove_from_sequence(Sequence::CommentReplies, parent_id, &comment.id)
                    .await?;
            }
            None => {
                self.store
                    .remove_from_sequence(Sequence::PostComments, &comment.post_id, &comment.id)
                    .await?;
            }
        }
        self.store.remove_member(Relation::PostThread, &comment.post_id, &comment.id).await?;
        self.purge_comment(&comment.id).await
    }

    /// Removes a comment record with its like sets and reply list.
    pub(crate) async fn purge_comment(&self, comment_id: &str) -> GraphResult<()> {
        if let Some(comment) = self.store.get::<CommentRecord>(comment_id).await? {
            self.store
                .remove_member(Relation::AuthoredComments, &comment.author_id, comment_id)
                .await?;
        }
        for user_id in self.store.members(Relation::CommentLikes, comment_id).await? {
            self.store.remove_member(Relation::LikeComment, &user_id, comment_id).await?;
        }
        self.store.clear_relation(Relation::CommentLikes, comment_id).await?;
        self.store.clear_sequence(Sequence::CommentReplies, comment_id).await?;
        self.store.remove::<CommentRecord>(comment_id).await?;
        Ok(())
    }

    /// Root comments newest-first, replies in the order they were written.
    pub async fn build_comment_tree(&self, viewer: &Principal, post_id: &str) -> GraphResult<Vec<CommentNode>> {
        let post = self.load_post(post_id).await?;
        self.ensure_engageable(&post, &viewer.id).await?;

        let mut roots = self.store.sequence(Sequence::PostComments, &post.id).await?;
        roots.reverse();

        let mut visited: HashSet<CommentId> = HashSet::new();
        let mut flat: Vec<FlatNode> = Vec::new();
        let mut root_indices = Vec::new();
        let mut queue: VecDeque<(CommentId, usize, Option<usize>)> =
            roots.into_iter().map(|id| (id, 0, None)).collect();

        while let Some((id, depth, parent)) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let Some(record) = self.store.get::<CommentRecord>(&id).await? else {
                continue;
            };
            if record.post_id != post.id {
                continue;
            }
            let index = flat.len();
            match parent {
                Some(parent) => flat[parent].children.push(index),
                None => root_indices.push(index),
            }
            for reply_id in self.store.sequence(Sequence::CommentReplies, &id).await? {
                queue.push_back((reply_id, depth + 1, Some(index)));
            }
            flat.push(FlatNode {
                record,
                depth,
                children: Vec::new(),
            });
        }

        let now = Utc::now();
        let mut authors: HashMap<String, UserSummary> = HashMap::new();
        let mut built: Vec<Option<CommentNode>> = Vec::with_capacity(flat.len());
        built.resize_with(flat.len(), || None);

        // Children always sit after their parent, so building back to front sees them first.
        for (index, node) in flat.into_iter().enumerate().rev() {
            let author = match authors.get(&node.record.author_id) {
                Some(author) => author.clone(),
                None => {
                    let author = self.summary_of(&node.record.author_id).await?;
                    authors.insert(node.record.author_id.clone(), author.clone());
                    author
                }
            };
            let likes = self.store.members(Relation::CommentLikes, &node.record.id).await?;
            let replies = node
                .children
                .iter()
                .filter_map(|child| built[*child].take())
                .collect();
            built[index] = Some(CommentNode {
                age: relative_age(node.record.created_at, now),
                like_count: likes.len(),
                liked_by_viewer: likes.contains(&viewer.id),
                id: node.record.id,
                author,
                text: node.record.text,
                parent_id: node.record.parent_id,
                depth: node.depth,
                created_at: node.record.created_at,
                replies,
            });
        }

        Ok(root_indices
            .into_iter()
            .filter_map(|index| built[index].take())
            .collect())
    }
}
