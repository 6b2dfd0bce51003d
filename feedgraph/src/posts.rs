//! Post lifecycle: create, update, delete, the draft/published state machine, and the audio
//! tracks posts may reference.

use std::collections::BTreeSet;

use chrono::Utc;
use log::{debug, warn};

use crate::errors::{GraphError, GraphResult};
use crate::graph::SocialGraph;
use crate::id::{generate_entity_id, is_valid_entity_id};
use crate::media::{MediaKind, MediaRef, MediaStore, MediaUpload};
use crate::store::GraphStore;
use crate::types::{
    AudioRecord, GLOBAL_SCOPE, Post, PostRecord, PostStatus, Principal, Relation, Sequence, UserId,
    UserRecord,
};

#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub caption: Option<String>,
    pub image: Option<MediaUpload>,
    pub video: Option<MediaUpload>,
    pub audio_id: Option<String>,
    pub tagged_friends: Vec<String>,
    /// Defaults to published.
    pub status: Option<PostStatus>,
}

impl NewPost {
    pub fn caption(caption: impl Into<String>) -> Self {
        Self {
            caption: Some(caption.into()),
            ..Self::default()
        }
    }

    pub fn as_draft(mut self) -> Self {
        self.status = Some(PostStatus::Draft);
        self
    }
}

/// Caption, image and video replacement. Status is changed through publish / remove-draft only.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    /// `Some("")` clears the caption.
    pub caption: Option<String>,
    pub image: Option<MediaUpload>,
    pub video: Option<MediaUpload>,
}

#[derive(Debug, Clone)]
pub struct NewAudio {
    pub name: String,
    pub artists: Vec<String>,
    pub track: MediaUpload,
    pub cover: Option<MediaUpload>,
}

fn normalize_caption(raw: Option<String>) -> Option<String> {
    raw.map(|caption| caption.trim().to_string())
        .filter(|caption| !caption.is_empty())
}

impl<S: GraphStore, M: MediaStore> SocialGraph<S, M> {
    pub async fn create_post(&self, owner: &Principal, new_post: NewPost) -> GraphResult<Post> {
        self.load_user(&owner.id).await?;
        let caption = normalize_caption(new_post.caption);
        if caption.is_none() && new_post.image.is_none() && new_post.video.is_none() {
            return Err(GraphError::EmptyInput { field: "post" });
        }

        let mut uploads = Vec::new();
        if let Some(image) = &new_post.image {
            uploads.push((MediaKind::PostImage, image));
        }
        if let Some(video) = &new_post.video {
            uploads.push((MediaKind::PostVideo, video));
        }
        let staged = self.media.stage(&uploads).await?;
        let mut staged_refs = staged.iter().cloned();
        let image_ref = new_post.image.as_ref().and_then(|_| staged_refs.next());
        let video_ref = new_post.video.as_ref().and_then(|_| staged_refs.next());

        let audio_id = match self.check_audio_reference(new_post.audio_id).await {
            Ok(audio_id) => audio_id,
            Err(err) => {
                self.media.discard(&staged).await;
                return Err(err);
            }
        };
        let tagged = match self.normalize_tags(&owner.id, &new_post.tagged_friends).await {
            Ok(tagged) => tagged,
            Err(err) => {
                self.media.discard(&staged).await;
                return Err(err);
            }
        };

        let now = Utc::now();
        let record = PostRecord {
            id: generate_entity_id(),
            owner_id: owner.id.clone(),
            caption,
            image_ref,
            video_ref,
            audio_id,
            status: new_post.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = self.persist_new_post(&record, &tagged).await {
            if let Err(cleanup) = self.purge_post(&record).await {
                warn!("failed to roll back post {}: {cleanup}", record.id);
            }
            return Err(err);
        }
        debug!("created {} post {} for {}", record.status, record.id, record.owner_id);
        self.assemble_post(record).await
    }

    async fn check_audio_reference(&self, audio_id: Option<String>) -> GraphResult<Option<String>> {
        let Some(audio_id) = audio_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        if !is_valid_entity_id(&audio_id) || !self.store.exists::<AudioRecord>(&audio_id).await? {
            return Err(GraphError::InvalidReference {
                entity: "audio",
                id: audio_id,
            });
        }
        Ok(Some(audio_id))
    }

    /// Deduplicates tagged ids and drops the owner, malformed ids and unknown users.
    async fn normalize_tags(&self, owner_id: &str, raw: &[String]) -> GraphResult<BTreeSet<UserId>> {
        let mut tagged = BTreeSet::new();
        for id in raw.iter().map(|id| id.trim()) {
            if id == owner_id || !is_valid_entity_id(id) || tagged.contains(id) {
                continue;
            }
            if self.store.exists::<UserRecord>(id).await? {
                tagged.insert(id.to_string());
            }
        }
        Ok(tagged)
    }

    async fn persist_new_post(&self, record: &PostRecord, tagged: &BTreeSet<UserId>) -> GraphResult<()> {
        self.store.put(record).await?;
        self.store.push_sequence(Sequence::UserPosts, &record.owner_id, &record.id).await?;
        self.store.add_member(Relation::PostIndex, GLOBAL_SCOPE, &record.id).await?;
        if let Some(audio_id) = &record.audio_id {
            self.store.add_member(Relation::AudioPosts, audio_id, &record.id).await?;
        }
        for user_id in tagged {
            self.store.add_member(Relation::TaggedFriends, &record.id, user_id).await?;
            self.store.add_member(Relation::TaggedPosts, user_id, &record.id).await?;
        }
        Ok(())
    }

    async fn owned_post(&self, caller: &Principal, post_id: &str) -> GraphResult<PostRecord> {
        let post = self.load_post(post_id).await?;
        if post.owner_id != caller.id {
            return Err(GraphError::forbidden("only the owner can modify this post"));
        }
        Ok(post)
    }

    /// New media is stored before the record is written; the replaced files are released only after
    /// the write has committed.
    pub async fn update_post(&self, caller: &Principal, post_id: &str, patch: PostPatch) -> GraphResult<Post> {
        let mut post = self.owned_post(caller, post_id).await?;

        if let Some(caption) = patch.caption {
            post.caption = normalize_caption(Some(caption));
        }
        let keeps_media = post.image_ref.is_some() || post.video_ref.is_some();
        let adds_media = patch.image.is_some() || patch.video.is_some();
        if post.caption.is_none() && !keeps_media && !adds_media {
            return Err(GraphError::EmptyInput { field: "post" });
        }

        let mut uploads = Vec::new();
        if let Some(image) = &patch.image {
            uploads.push((MediaKind::PostImage, image));
        }
        if let Some(video) = &patch.video {
            uploads.push((MediaKind::PostVideo, video));
        }
        let staged = self.media.stage(&uploads).await?;
        let mut staged_refs = staged.iter().cloned();

        let mut replaced: Vec<MediaRef> = Vec::new();
        if patch.image.is_some() {
            replaced.extend(std::mem::replace(&mut post.image_ref, staged_refs.next()));
        }
        if patch.video.is_some() {
            replaced.extend(std::mem::replace(&mut post.video_ref, staged_refs.next()));
        }
        post.updated_at = Utc::now();

        if let Err(err) = self.store.put(&post).await {
            self.media.discard(&staged).await;
            return Err(err);
        }
        self.media.discard(&replaced).await;
        debug!("updated post {}", post.id);
        self.assemble_post(post).await
    }

    pub async fn delete_post(&self, caller: &Principal, post_id: &str) -> GraphResult<()> {
        let post = self.owned_post(caller, post_id).await?;
        self.purge_post(&post).await?;
        debug!("deleted post {post_id}");
        Ok(())
    }

    /// Moves a draft to published. Publishing an already published post is rejected.
    pub async fn publish_post(&self, caller: &Principal, post_id: &str) -> GraphResult<Post> {
        let mut post = self.owned_post(caller, post_id).await?;
        if post.status != PostStatus::Draft {
            return Err(GraphError::InvalidStateTransition {
                from: post.status,
                action: "publish",
            });
        }
        post.status = PostStatus::Published;
        post.updated_at = Utc::now();
        self.store.put(&post).await?;
        debug!("published post {post_id}");
        self.assemble_post(post).await
    }

    /// Permanently deletes a draft together with its media.
    pub async fn remove_draft(&self, caller: &Principal, post_id: &str) -> GraphResult<()> {
        let post = self.owned_post(caller, post_id).await?;
        if post.status != PostStatus::Draft {
            return Err(GraphError::InvalidStateTransition {
                from: post.status,
                action: "remove draft",
            });
        }
        self.purge_post(&post).await?;
        debug!("removed draft {post_id}");
        Ok(())
    }

    /// Cascade shared by delete, remove-draft and failed creation. Children go first and the post
    /// record last, so an interrupted purge can be retried.
    pub(crate) async fn purge_post(&self, post: &PostRecord) -> GraphResult<()> {
        for reference in post.media_refs() {
            self.media.release_quietly(reference).await;
        }

        for comment_id in self.store.members(Relation::PostThread, &post.id).await? {
            self.purge_comment(&comment_id).await?;
        }
        self.store.clear_relation(Relation::PostThread, &post.id).await?;
        self.store.clear_sequence(Sequence::PostComments, &post.id).await?;

        for user_id in self.store.members(Relation::PostLikes, &post.id).await? {
            self.store.remove_member(Relation::Liked, &user_id, &post.id).await?;
        }
        self.store.clear_relation(Relation::PostLikes, &post.id).await?;

        for user_id in self.store.members(Relation::TaggedFriends, &post.id).await? {
            self.store.remove_member(Relation::TaggedPosts, &user_id, &post.id).await?;
        }
        self.store.clear_relation(Relation::TaggedFriends, &post.id).await?;

        self.store.remove_member(Relation::PostIndex, GLOBAL_SCOPE, &post.id).await?;
        if let Some(audio_id) = &post.audio_id {
            self.store.remove_member(Relation::AudioPosts, audio_id, &post.id).await?;
        }
        self.store
            .remove_from_sequence(Sequence::UserPosts, &post.owner_id, &post.id)
            .await?;
        self.store.remove::<PostRecord>(&post.id).await?;
        Ok(())
    }

    pub async fn register_audio(&self, new_audio: NewAudio) -> GraphResult<AudioRecord> {
        let name = new_audio.name.trim().to_string();
        if name.is_empty() {
            return Err(GraphError::EmptyInput { field: "audio name" });
        }

        let mut uploads = vec![(MediaKind::AudioTrack, &new_audio.track)];
        if let Some(cover) = &new_audio.cover {
            uploads.push((MediaKind::AudioCover, cover));
        }
        let staged = self.media.stage(&uploads).await?;
        let mut staged_refs = staged.iter().cloned();
        let Some(audio_ref) = staged_refs.next() else {
            return Err(GraphError::Other {
                message: "audio track was not stored".into(),
            });
        };

        let audio = AudioRecord {
            id: generate_entity_id(),
            name,
            artists: new_audio
                .artists
                .into_iter()
                .map(|artist| artist.trim().to_string())
                .filter(|artist| !artist.is_empty())
                .collect(),
            audio_ref,
            image_ref: staged_refs.next(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.store.put(&audio).await {
            self.media.discard(&staged).await;
            return Err(err);
        }
        debug!("registered audio {} ({})", audio.name, audio.id);
        Ok(audio)
    }

    pub async fn get_audio(&self, audio_id: &str) -> GraphResult<AudioRecord> {
        self.load_audio(audio_id).await
    }
}
