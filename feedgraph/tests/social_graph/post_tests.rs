use super::support::*;

#[tokio::test]
async fn create_post_requires_caption_or_media() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;

    let err = fixture
        .graph
        .create_post(&owner, NewPost::default())
        .await
        .expect_err("empty post rejected");
    assert!(matches!(err, GraphError::EmptyInput { field: "post" }));

    let err = fixture
        .graph
        .create_post(&owner, NewPost::caption("   "))
        .await
        .expect_err("blank caption rejected");
    assert!(matches!(err, GraphError::EmptyInput { .. }));

    let image_only = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                image: Some(image("sunset.png")),
                ..NewPost::default()
            },
        )
        .await
        .expect("image-only post");
    assert!(image_only.record.caption.is_none());
    let image_ref = image_only.record.image_ref.as_ref().expect("image ref");
    assert!(image_ref.as_str().starts_with("/public/post_images/"));
    assert!(image_ref.as_str().ends_with(".png"));
    assert!(fixture.media.contains(image_ref));
}

#[tokio::test]
async fn create_post_for_unknown_owner_is_not_found() {
    let fixture = TestGraph::new();
    let ghost = Principal::user(generate_entity_id());

    let err = fixture
        .graph
        .create_post(&ghost, NewPost::caption("hello"))
        .await
        .expect_err("unknown owner");
    assert!(matches!(err, GraphError::NotFound { entity: "user", .. }));
}

#[tokio::test]
async fn unknown_audio_reference_releases_staged_media() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;

    for audio_id in [generate_entity_id(), "bad-id".to_string()] {
        let err = fixture
            .graph
            .create_post(
                &owner,
                NewPost {
                    caption: Some("with sound".into()),
                    image: Some(image("cover.jpg")),
                    audio_id: Some(audio_id.clone()),
                    ..NewPost::default()
                },
            )
            .await
            .expect_err("unknown audio rejected");
        assert!(matches!(err, GraphError::InvalidReference { entity: "audio", .. }));
        assert!(fixture.media.is_empty(), "staged image for {audio_id} was not released");
    }

    let posts = fixture.graph.profile_posts(&owner, &owner.id).await.expect("profile posts");
    assert!(posts.is_empty());
}

#[tokio::test]
async fn failed_record_write_leaves_no_post_and_no_media() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;

    fixture.store.fail_record_writes(true);
    let err = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                caption: Some("doomed".into()),
                image: Some(image("a.png")),
                video: Some(MediaUpload::new("clip.mp4", vec![0u8; 16])),
                ..NewPost::default()
            },
        )
        .await
        .expect_err("write failure surfaces");
    assert!(matches!(err, GraphError::Other { .. }));
    fixture.store.fail_record_writes(false);

    assert!(fixture.media.is_empty());
    let everyone = fixture.graph.global_feed(&owner).await.expect("global feed");
    assert!(everyone.is_empty());
    let profile = fixture.graph.profile(&owner.id).await.expect("profile");
    assert_eq!(profile.posts, 0);
}

#[tokio::test]
async fn posts_with_audio_appear_in_the_audio_feed() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let audio = fixture
        .graph
        .register_audio(NewAudio {
            name: " Night Drive ".into(),
            artists: vec!["Kavi".into(), "  ".into()],
            track: MediaUpload::new("track.mp3", vec![1, 2, 3]),
            cover: Some(image("cover.png")),
        })
        .await
        .expect("register audio");
    assert_eq!(audio.name, "Night Drive");
    assert_eq!(audio.artists, vec!["Kavi".to_string()]);
    assert!(audio.audio_ref.as_str().starts_with("/public/audio/"));
    assert!(
        audio
            .image_ref
            .as_ref()
            .is_some_and(|cover| cover.as_str().starts_with("/public/audio_image/"))
    );

    let post = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                caption: Some("dance".into()),
                audio_id: Some(audio.id.clone()),
                ..NewPost::default()
            },
        )
        .await
        .expect("post with audio");
    fixture.post(&owner, "quiet").await;

    let feed = fixture.graph.audio_feed(&owner, &audio.id).await.expect("audio feed");
    assert_eq!(ids(&feed), vec![post.id().to_string()]);
}

#[tokio::test]
async fn tagged_friends_are_deduplicated_and_validated() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let friend_id = generate_entity_id();
    let raw_tags = || vec![friend_id.clone(), friend_id.clone(), owner.id.clone(), "bad-id".to_string()];

    let untagged = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                tagged_friends: raw_tags(),
                ..NewPost::caption("before signup")
            },
        )
        .await
        .expect("post with unknown tags");
    assert!(untagged.tagged_friends.is_empty());

    let registered = fixture
        .graph
        .register_user(NewUser::named("ben"))
        .await
        .expect("register friend");
    let friend = Principal::user(registered.id.clone());
    let raw_tags = vec![friend.id.clone(), friend.id.clone(), owner.id.clone(), "bad-id".to_string()];
    let tagged = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                tagged_friends: raw_tags,
                ..NewPost::caption("after signup")
            },
        )
        .await
        .expect("post with tags");
    assert_eq!(tagged.tagged_friends.len(), 1);
    assert!(tagged.tagged_friends.contains(&friend.id));

    let feed = fixture.graph.tagged_feed(&friend).await.expect("tagged feed");
    assert_eq!(ids(&feed), vec![tagged.id().to_string()]);
}

#[tokio::test]
async fn update_post_swaps_media_after_commit() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let post = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                image: Some(image("old.png")),
                ..NewPost::caption("first")
            },
        )
        .await
        .expect("create post");
    let old_ref = post.record.image_ref.clone().expect("old image");

    let updated = fixture
        .graph
        .update_post(
            &owner,
            post.id(),
            PostPatch {
                caption: Some(" second ".into()),
                image: Some(image("new.png")),
                ..PostPatch::default()
            },
        )
        .await
        .expect("update post");
    let new_ref = updated.record.image_ref.clone().expect("new image");

    assert_eq!(updated.record.caption.as_deref(), Some("second"));
    assert_ne!(old_ref, new_ref);
    assert!(!fixture.media.contains(&old_ref));
    assert!(fixture.media.contains(&new_ref));
    assert_eq!(fixture.media.len(), 1);
}

#[tokio::test]
async fn failed_update_keeps_the_previous_media() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let post = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                image: Some(image("keep.png")),
                ..NewPost::caption("first")
            },
        )
        .await
        .expect("create post");
    let old_ref = post.record.image_ref.clone().expect("image");

    fixture.store.fail_record_writes(true);
    fixture
        .graph
        .update_post(
            &owner,
            post.id(),
            PostPatch {
                image: Some(image("replacement.png")),
                ..PostPatch::default()
            },
        )
        .await
        .expect_err("update fails");
    fixture.store.fail_record_writes(false);

    assert!(fixture.media.contains(&old_ref));
    assert_eq!(fixture.media.len(), 1);
    let stored = fixture.graph.get_post(&owner, post.id()).await.expect("post still readable");
    assert_eq!(stored.record.image_ref, Some(old_ref));
}

#[tokio::test]
async fn only_the_owner_can_modify_a_post() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let other = fixture.user("ben").await;
    let post = fixture.post(&owner, "mine").await;

    let err = fixture
        .graph
        .update_post(
            &other,
            post.id(),
            PostPatch {
                caption: Some("yours now".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect_err("non-owner update");
    assert!(matches!(err, GraphError::Forbidden { .. }));

    let err = fixture.graph.delete_post(&other, post.id()).await.expect_err("non-owner delete");
    assert!(matches!(err, GraphError::Forbidden { .. }));

    let err = fixture
        .graph
        .update_post(
            &owner,
            post.id(),
            PostPatch {
                caption: Some("".into()),
                ..PostPatch::default()
            },
        )
        .await
        .expect_err("clearing the only content");
    assert!(matches!(err, GraphError::EmptyInput { .. }));
}

#[tokio::test]
async fn publish_moves_a_draft_exactly_once() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let viewer = fixture.user("ben").await;
    let draft = fixture.draft(&owner, "wip").await;
    assert_eq!(draft.status(), PostStatus::Draft);

    let hidden = fixture.graph.global_feed(&viewer).await.expect("global feed");
    assert!(hidden.is_empty());

    let published = fixture.graph.publish_post(&owner, draft.id()).await.expect("publish draft");
    assert_eq!(published.status(), PostStatus::Published);

    let err = fixture
        .graph
        .publish_post(&owner, draft.id())
        .await
        .expect_err("second publish");
    assert!(matches!(
        err,
        GraphError::InvalidStateTransition {
            from: PostStatus::Published,
            action: "publish"
        }
    ));

    let feed = fixture.graph.global_feed(&viewer).await.expect("global feed");
    assert_eq!(ids(&feed), vec![draft.id().to_string()]);
}

#[tokio::test]
async fn remove_draft_only_accepts_drafts() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let published = fixture.post(&owner, "live").await;
    let draft = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                image: Some(image("draft.png")),
                ..NewPost::caption("wip").as_draft()
            },
        )
        .await
        .expect("create draft");

    let err = fixture
        .graph
        .remove_draft(&owner, published.id())
        .await
        .expect_err("published post is not a draft");
    assert!(matches!(err, GraphError::InvalidStateTransition { .. }));

    fixture.graph.remove_draft(&owner, draft.id()).await.expect("remove draft");
    assert!(fixture.media.is_empty());
    let err = fixture.graph.get_post(&owner, draft.id()).await.expect_err("draft gone");
    assert!(matches!(err, GraphError::NotFound { .. }));
    assert!(fixture.graph.drafts(&owner).await.expect("drafts").is_empty());
}

#[tokio::test]
async fn delete_post_cascades_to_comments_likes_and_tags() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let fan = fixture.user("ben").await;
    let post = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                image: Some(image("gone.png")),
                tagged_friends: vec![fan.id.clone()],
                ..NewPost::caption("short lived")
            },
        )
        .await
        .expect("create post");

    let comment = fixture.graph.add_comment(&fan, post.id(), "nice").await.expect("comment");
    let reply = fixture.graph.add_reply(&owner, &comment.id, "thanks").await.expect("reply");
    fixture.graph.toggle_comment_like(&owner, &comment.id).await.expect("like comment");
    fixture.graph.toggle_like(&fan, post.id()).await.expect("like post");
    fixture.graph.toggle_save(&fan, post.id()).await.expect("save post");

    fixture.graph.delete_post(&owner, post.id()).await.expect("delete post");

    let profile = fixture.graph.profile(&owner.id).await.expect("profile");
    assert_eq!(profile.posts, 0);
    assert!(fixture.media.is_empty());
    for comment_id in [&comment.id, &reply.id] {
        let exists = fixture.store.exists::<CommentRecord>(comment_id).await.expect("exists");
        assert!(!exists, "comment {comment_id} survived the post");
    }
    let liked_comments = fixture
        .store
        .members(Relation::LikeComment, &owner.id)
        .await
        .expect("liked comments");
    assert!(liked_comments.is_empty());
    for author in [&fan.id, &owner.id] {
        let authored = fixture
            .store
            .members(Relation::AuthoredComments, author)
            .await
            .expect("authored comments");
        assert!(authored.is_empty());
    }
    assert!(fixture.graph.liked_posts(&fan).await.expect("liked").is_empty());
    assert!(fixture.graph.tagged_feed(&fan).await.expect("tagged").is_empty());
    assert!(fixture.graph.saved_posts(&fan).await.expect("saved").is_empty());

    let err = fixture.graph.get_post(&fan, post.id()).await.expect_err("post gone");
    assert!(matches!(err, GraphError::NotFound { .. }));
}
