use super::support::*;

#[tokio::test]
async fn private_profile_opens_to_approved_followers() {
    let fixture = TestGraph::new();
    let owner = fixture.private_user("ava").await;
    let viewer = fixture.user("ben").await;

    let older = fixture.post(&owner, "older").await;
    let newer = fixture.post(&owner, "newer").await;
    fixture.draft(&owner, "unfinished").await;
    fixture.backdate_post(older.id(), Duration::hours(2)).await;
    fixture.backdate_post(newer.id(), Duration::hours(1)).await;

    let err = fixture
        .graph
        .profile_posts(&viewer, &owner.id)
        .await
        .expect_err("private profile");
    assert!(matches!(err, GraphError::Forbidden { .. }));

    let outcome = fixture.graph.toggle_follow(&viewer, &owner.id).await.expect("request");
    assert_eq!(outcome, FollowOutcome::Requested);
    let still_closed = fixture.graph.profile_posts(&viewer, &owner.id).await;
    assert!(matches!(still_closed, Err(GraphError::Forbidden { .. })));

    fixture
        .graph
        .approve_follow_request(&owner, &viewer.id)
        .await
        .expect("approve");
    let posts = fixture.graph.profile_posts(&viewer, &owner.id).await.expect("profile posts");
    assert_eq!(ids(&posts), vec![newer.id().to_string(), older.id().to_string()]);
    assert!(posts.iter().all(|post| post.status() == PostStatus::Published));

    let own = fixture.graph.profile_posts(&owner, &owner.id).await.expect("own profile");
    assert_eq!(own.len(), 2);
}

#[tokio::test]
async fn profile_posts_are_closed_to_blocked_viewers() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let viewer = fixture.user("ben").await;
    fixture.post(&owner, "public").await;

    assert_eq!(fixture.graph.profile_posts(&viewer, &owner.id).await.expect("posts").len(), 1);
    fixture.graph.toggle_block(&owner, &viewer.id).await.expect("block");
    let err = fixture.graph.profile_posts(&viewer, &owner.id).await.expect_err("blocked");
    assert!(matches!(err, GraphError::Forbidden { .. }));
}

#[tokio::test]
async fn global_feed_hides_drafts_and_blockers() {
    let fixture = TestGraph::new();
    let ava = fixture.user("ava").await;
    let ben = fixture.user("ben").await;
    let cleo = fixture.user("cleo").await;

    let from_ava = fixture.post(&ava, "ava").await;
    let from_ben = fixture.post(&ben, "ben").await;
    fixture.draft(&ben, "ben draft").await;
    fixture.backdate_post(from_ava.id(), Duration::minutes(10)).await;

    let feed = fixture.graph.global_feed(&cleo).await.expect("feed");
    assert_eq!(ids(&feed), vec![from_ben.id().to_string(), from_ava.id().to_string()]);

    fixture.graph.toggle_block(&ben, &cleo.id).await.expect("block");
    let feed = fixture.graph.global_feed(&cleo).await.expect("feed");
    assert_eq!(ids(&feed), vec![from_ava.id().to_string()]);

    // Blocking is one-directional: the blocker still sees the blocked user's posts.
    let feed = fixture.graph.global_feed(&ben).await.expect("feed");
    assert_eq!(feed.len(), 2);
}

#[tokio::test]
async fn following_feed_collects_posts_of_followed_users() {
    let fixture = TestGraph::new();
    let reader = fixture.user("ava").await;
    let followed = fixture.user("ben").await;
    let ignored = fixture.user("cleo").await;

    let wanted = fixture.post(&followed, "followed").await;
    fixture.post(&ignored, "not followed").await;
    assert!(fixture.graph.following_feed(&reader).await.expect("feed").is_empty());

    let outcome = fixture.graph.toggle_follow(&reader, &followed.id).await.expect("follow");
    assert_eq!(outcome, FollowOutcome::Followed);
    let feed = fixture.graph.following_feed(&reader).await.expect("feed");
    assert_eq!(ids(&feed), vec![wanted.id().to_string()]);
}

#[tokio::test]
async fn dangling_saved_and_liked_references_are_skipped() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let reader = fixture.user("ben").await;
    let kept = fixture.post(&owner, "kept").await;
    let gone = fixture.post(&owner, "gone").await;

    for post in [&kept, &gone] {
        fixture.graph.toggle_save(&reader, post.id()).await.expect("save");
        fixture.graph.toggle_like(&reader, post.id()).await.expect("like");
    }
    // Simulate a reference left behind by an interrupted cleanup.
    fixture
        .store
        .remove::<PostRecord>(gone.id())
        .await
        .expect("remove record");

    let saved = fixture.graph.saved_posts(&reader).await.expect("saved");
    assert_eq!(ids(&saved), vec![kept.id().to_string()]);
    let liked = fixture.graph.liked_posts(&reader).await.expect("liked");
    assert_eq!(ids(&liked), vec![kept.id().to_string()]);
}

#[tokio::test]
async fn drafts_are_visible_only_to_their_owner() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let other = fixture.user("ben").await;
    let draft = fixture.draft(&owner, "secret").await;
    fixture.draft(&other, "someone else's").await;
    fixture.post(&owner, "public").await;

    let drafts = fixture.graph.drafts(&owner).await.expect("drafts");
    assert_eq!(ids(&drafts), vec![draft.id().to_string()]);

    fixture.graph.get_post(&owner, draft.id()).await.expect("owner reads draft");
    let err = fixture.graph.get_post(&other, draft.id()).await.expect_err("hidden draft");
    assert!(matches!(err, GraphError::NotFound { .. }));
}

#[tokio::test]
async fn audio_feed_validates_the_audio_id() {
    let fixture = TestGraph::new();
    let viewer = fixture.user("ava").await;

    let err = fixture.graph.audio_feed(&viewer, "???").await.expect_err("malformed id");
    assert!(matches!(err, GraphError::InvalidArgument { .. }));

    let empty = fixture
        .graph
        .audio_feed(&viewer, &generate_entity_id())
        .await
        .expect("unknown audio");
    assert!(empty.is_empty());
}

#[tokio::test]
async fn tagged_feed_drops_posts_from_owners_who_block_the_viewer() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let friend = fixture.user("ben").await;
    let tagged = fixture
        .graph
        .create_post(
            &owner,
            NewPost {
                tagged_friends: vec![friend.id.clone()],
                ..NewPost::caption("with ben")
            },
        )
        .await
        .expect("tagged post");
    assert_eq!(
        ids(&fixture.graph.tagged_feed(&friend).await.expect("tagged feed")),
        vec![tagged.id().to_string()]
    );

    fixture.graph.toggle_block(&owner, &friend.id).await.expect("block");
    assert!(fixture.graph.tagged_feed(&friend).await.expect("tagged feed").is_empty());

    fixture.graph.toggle_block(&owner, &friend.id).await.expect("unblock");
    assert_eq!(fixture.graph.tagged_feed(&friend).await.expect("tagged feed").len(), 1);
}
