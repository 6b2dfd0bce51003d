use super::support::*;

#[tokio::test]
async fn usernames_are_unique_ignoring_case() {
    let fixture = TestGraph::new();
    let user: UserRecord = fixture
        .graph
        .register_user(NewUser::named("  Ava "))
        .await
        .expect("register");
    assert_eq!(user.username, "Ava");

    let err = fixture
        .graph
        .register_user(NewUser::named("ava"))
        .await
        .expect_err("duplicate username");
    assert!(matches!(err, GraphError::Conflict { field: "username", .. }));

    let err = fixture
        .graph
        .register_user(NewUser::named("   "))
        .await
        .expect_err("blank username");
    assert!(matches!(err, GraphError::EmptyInput { field: "username" }));
}

#[tokio::test]
async fn renaming_releases_the_previous_username() {
    let fixture = TestGraph::new();
    let ava = fixture.user("ava").await;
    let ben = fixture.user("ben").await;

    let err = fixture
        .graph
        .update_profile(
            &ben,
            &ava.id,
            ProfilePatch {
                bio: Some("hijacked".into()),
                ..ProfilePatch::default()
            },
        )
        .await
        .expect_err("other user's profile");
    assert!(matches!(err, GraphError::Forbidden { .. }));

    let err = fixture
        .graph
        .update_profile(
            &ava,
            &ava.id,
            ProfilePatch {
                username: Some("BEN".into()),
                ..ProfilePatch::default()
            },
        )
        .await
        .expect_err("taken username");
    assert!(matches!(err, GraphError::Conflict { .. }));

    let renamed = fixture
        .graph
        .update_profile(
            &ava,
            &ava.id,
            ProfilePatch {
                username: Some("ava_2".into()),
                bio: Some(" hello ".into()),
                is_private: Some(true),
            },
        )
        .await
        .expect("rename");
    assert_eq!(renamed.username, "ava_2");
    assert_eq!(renamed.bio.as_deref(), Some("hello"));
    assert!(renamed.is_private);

    fixture
        .graph
        .register_user(NewUser::named("ava"))
        .await
        .expect("old name is free again");
}

#[tokio::test]
async fn following_a_public_user_toggles() {
    let fixture = TestGraph::new();
    let ava = fixture.user("ava").await;
    let ben = fixture.user("ben").await;

    let err = fixture.graph.toggle_follow(&ava, &ava.id).await.expect_err("self follow");
    assert!(matches!(err, GraphError::InvalidArgument { .. }));

    let missing = fixture.graph.toggle_follow(&ava, &generate_entity_id()).await;
    assert!(matches!(missing, Err(GraphError::NotFound { .. })));

    let outcome = fixture.graph.toggle_follow(&ava, &ben.id).await.expect("follow");
    assert_eq!(outcome, FollowOutcome::Followed);
    let followers = fixture.graph.followers(&ben.id).await.expect("followers");
    assert_eq!(followers.iter().map(|user| user.id.as_str()).collect::<Vec<_>>(), vec![ava.id.as_str()]);
    let profile = fixture.graph.profile(&ava.id).await.expect("profile");
    assert_eq!(profile.followings, 1);

    let outcome = fixture.graph.toggle_follow(&ava, &ben.id).await.expect("unfollow");
    assert_eq!(outcome, FollowOutcome::Unfollowed);
    assert!(fixture.graph.followings(&ava.id).await.expect("followings").is_empty());
}

#[tokio::test]
async fn follow_requests_can_be_cancelled_or_rejected() {
    let fixture = TestGraph::new();
    let owner = fixture.private_user("ava").await;
    let requester = fixture.user("ben").await;

    let outcome = fixture.graph.toggle_follow(&requester, &owner.id).await.expect("request");
    assert_eq!(outcome, FollowOutcome::Requested);
    let pending = fixture.graph.pending_follow_requests(&owner).await.expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].username, "ben");

    let outcome = fixture.graph.toggle_follow(&requester, &owner.id).await.expect("cancel");
    assert_eq!(outcome, FollowOutcome::RequestCancelled);
    assert!(fixture.graph.pending_follow_requests(&owner).await.expect("pending").is_empty());

    fixture.graph.toggle_follow(&requester, &owner.id).await.expect("request again");
    fixture
        .graph
        .reject_follow_request(&owner, &requester.id)
        .await
        .expect("reject");
    assert!(fixture.graph.followers(&owner.id).await.expect("followers").is_empty());

    let err = fixture
        .graph
        .approve_follow_request(&owner, &requester.id)
        .await
        .expect_err("nothing pending");
    assert!(matches!(err, GraphError::NotFound { entity: "follow request", .. }));
}

#[tokio::test]
async fn blocking_severs_follows_in_both_directions() {
    let fixture = TestGraph::new();
    let ava = fixture.user("ava").await;
    let ben = fixture.user("ben").await;
    fixture.graph.toggle_follow(&ava, &ben.id).await.expect("ava follows ben");
    fixture.graph.toggle_follow(&ben, &ava.id).await.expect("ben follows ava");

    let err = fixture.graph.toggle_block(&ava, &ava.id).await.expect_err("self block");
    assert!(matches!(err, GraphError::InvalidArgument { .. }));

    assert_eq!(
        fixture.graph.toggle_block(&ava, &ben.id).await.expect("block"),
        BlockOutcome::Blocked
    );
    for user in [&ava, &ben] {
        let profile = fixture.graph.profile(&user.id).await.expect("profile");
        assert_eq!((profile.followers, profile.followings), (0, 0));
    }

    let blocked = fixture.graph.blocked_users(&ava).await.expect("blocked users");
    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].id, ben.id);
    let blockers = fixture.graph.blocked_by(&ben.id).await.expect("blocked by");
    assert!(blockers.contains(&ava.id));

    let err = fixture.graph.toggle_follow(&ben, &ava.id).await.expect_err("blocked follow");
    assert!(matches!(err, GraphError::Forbidden { .. }));
    let err = fixture.graph.toggle_follow(&ava, &ben.id).await.expect_err("blocker follow");
    assert!(matches!(err, GraphError::Forbidden { .. }));

    fixture.graph.toggle_block(&ava, &ben.id).await.expect("unblock");
    assert!(fixture.graph.blocked_by(&ben.id).await.expect("blocked by").is_empty());
    assert_eq!(
        fixture.graph.toggle_follow(&ben, &ava.id).await.expect("follow again"),
        FollowOutcome::Followed
    );
}

#[tokio::test]
async fn user_lookups_validate_ids() {
    let fixture = TestGraph::new();
    let err = fixture.graph.get_user("nope").await.expect_err("malformed id");
    assert!(matches!(err, GraphError::InvalidArgument { .. }));

    let err = fixture.graph.get_user(&generate_entity_id()).await.expect_err("missing user");
    assert!(matches!(err, GraphError::NotFound { entity: "user", .. }));

    let ava = fixture.user("ava").await;
    let summary = fixture.graph.user_summary(&ava.id).await.expect("summary");
    assert_eq!(summary.username, "ava");
}

#[tokio::test]
async fn rename_succeeds_when_the_old_claim_cannot_be_released() {
    let fixture = TestGraph::new();
    let ava = fixture.user("ava").await;

    fixture.store.fail_unique_releases(true);
    let renamed = fixture
        .graph
        .update_profile(
            &ava,
            &ava.id,
            ProfilePatch {
                username: Some("ava_2".into()),
                ..ProfilePatch::default()
            },
        )
        .await
        .expect("rename despite release failure");
    assert_eq!(renamed.username, "ava_2");
    fixture.store.fail_unique_releases(false);

    let stored = fixture.graph.get_user(&ava.id).await.expect("load user");
    assert_eq!(stored.username, "ava_2");
    // The stale claim keeps the old name reserved.
    let err = fixture
        .graph
        .register_user(NewUser::named("ava"))
        .await
        .expect_err("old name still claimed");
    assert!(matches!(err, GraphError::Conflict { .. }));
}

#[tokio::test]
async fn failed_registration_reports_the_write_error() {
    let fixture = TestGraph::new();
    fixture.store.fail_record_writes(true);
    fixture.store.fail_unique_releases(true);

    let err = fixture
        .graph
        .register_user(NewUser::named("ava"))
        .await
        .expect_err("write fails");
    assert!(err.is_internal());
    assert!(err.to_string().contains("rejected write"), "got {err}");

    fixture.store.fail_record_writes(false);
    fixture.store.fail_unique_releases(false);
    fixture
        .graph
        .register_user(NewUser::named("ben"))
        .await
        .expect("store recovered");
}

#[tokio::test]
async fn only_the_account_itself_or_an_admin_can_delete_it() {
    let fixture = TestGraph::new();
    let ava = fixture.user("ava").await;
    let ben = fixture.user("ben").await;

    let err = fixture.graph.delete_user(&ava, &ben.id).await.expect_err("foreign delete");
    assert!(matches!(err, GraphError::Forbidden { .. }));

    let admin = Principal::admin(generate_entity_id());
    fixture.graph.delete_user(&admin, &ben.id).await.expect("admin delete");
    fixture.graph.delete_user(&ava, &ava.id).await.expect("self delete");

    let err = fixture.graph.get_user(&ava.id).await.expect_err("gone");
    assert!(matches!(err, GraphError::NotFound { entity: "user", .. }));
    let err = fixture.graph.delete_user(&ava, &ava.id).await.expect_err("already deleted");
    assert!(matches!(err, GraphError::NotFound { .. }));
    let err = fixture.graph.delete_user(&ava, "bad-id").await.expect_err("malformed id");
    assert!(matches!(err, GraphError::InvalidArgument { .. }));
}

#[tokio::test]
async fn deleting_a_user_removes_every_trace_of_them() {
    let fixture = TestGraph::new();
    let ava = fixture.user("ava").await;
    let carl = fixture.private_user("carl").await;
    let dana = fixture.user("dana").await;
    let ava_post = fixture.post(&ava, "hello").await;
    let ava_comment = fixture
        .graph
        .add_comment(&ava, ava_post.id(), "first")
        .await
        .expect("ava comment");
    let baseline = fixture.store.key_count();

    let ben = fixture.user("ben").await;
    fixture.graph.toggle_follow(&ben, &ava.id).await.expect("follow");
    fixture.graph.toggle_follow(&ben, &carl.id).await.expect("request");
    fixture.graph.toggle_follow(&ava, &ben.id).await.expect("follow back");
    fixture.graph.toggle_block(&dana, &ben.id).await.expect("dana blocks ben");
    fixture.graph.toggle_block(&ben, &dana.id).await.expect("ben blocks dana");
    fixture.graph.like_post(&ben, ava_post.id()).await.expect("like");
    fixture.graph.toggle_save(&ben, ava_post.id()).await.expect("save");
    let ben_comment = fixture
        .graph
        .add_comment(&ben, ava_post.id(), "nice")
        .await
        .expect("ben comment");
    fixture
        .graph
        .add_reply(&ben, &ava_comment.id, "agreed")
        .await
        .expect("ben reply");
    fixture
        .graph
        .toggle_comment_like(&ben, &ava_comment.id)
        .await
        .expect("ben likes comment");
    fixture
        .graph
        .toggle_comment_like(&ava, &ben_comment.id)
        .await
        .expect("ava likes comment");
    let ben_post = fixture
        .graph
        .create_post(
            &ben,
            NewPost {
                tagged_friends: vec![ava.id.clone()],
                ..NewPost::caption("with ava")
            },
        )
        .await
        .expect("ben post");
    fixture.graph.like_post(&ava, ben_post.id()).await.expect("ava like");
    fixture
        .graph
        .add_comment(&ava, ben_post.id(), "great")
        .await
        .expect("ava comment on ben post");
    assert!(fixture.store.key_count() > baseline);

    fixture.graph.delete_user(&ben, &ben.id).await.expect("delete");

    assert_eq!(fixture.store.key_count(), baseline);
    let profile = fixture.graph.profile(&ava.id).await.expect("profile");
    assert_eq!((profile.followers, profile.followings, profile.posts), (0, 0, 1));
    assert!(fixture.graph.pending_follow_requests(&carl).await.expect("requests").is_empty());
    assert!(fixture.graph.blocked_users(&dana).await.expect("blocked").is_empty());
    assert!(fixture.graph.post_likers(ava_post.id()).await.expect("likers").is_empty());
    assert!(fixture.graph.tagged_feed(&ava).await.expect("tagged").is_empty());
    assert!(fixture.graph.liked_posts(&ava).await.expect("liked").is_empty());

    let tree = fixture.graph.build_comment_tree(&ava, ava_post.id()).await.expect("tree");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, ava_comment.id);
    assert!(tree[0].replies.is_empty());
    assert_eq!(tree[0].like_count, 0);

    let err = fixture.graph.get_post(&ava, ben_post.id()).await.expect_err("post gone");
    assert!(matches!(err, GraphError::NotFound { .. }));
    fixture
        .graph
        .register_user(NewUser::named("ben"))
        .await
        .expect("username is free again");
}
