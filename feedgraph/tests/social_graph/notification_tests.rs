use super::support::*;

#[tokio::test]
async fn likes_reach_the_online_owner() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let fan = fixture.user("ben").await;
    let post = fixture.post(&owner, "hello").await;
    let mut inbox = fixture.hub.connect(owner.id.clone());

    fixture.graph.toggle_like(&fan, post.id()).await.expect("like");

    let event = inbox.try_recv().expect("like notification");
    assert_eq!(event.kind, NotificationKind::Like);
    assert_eq!(event.actor_id, fan.id);
    assert_eq!(event.actor.username, "ben");
    assert_eq!(event.recipient_id, owner.id);
    assert_eq!(event.target_id, post.id());
    assert_eq!(event.message, "Liked your post");
    assert!(inbox.try_recv().is_none());

    let json = event.to_json().expect("serialize event");
    assert!(json.contains(r#""type":"like""#));
}

#[tokio::test]
async fn self_engagement_is_not_notified() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let post = fixture.post(&owner, "hello").await;
    let mut inbox = fixture.hub.connect(owner.id.clone());

    fixture.graph.toggle_like(&owner, post.id()).await.expect("self like");
    let comment = fixture.graph.add_comment(&owner, post.id(), "me").await.expect("self comment");
    fixture.graph.toggle_comment_like(&owner, &comment.id).await.expect("self comment like");

    assert!(inbox.drain().is_empty());
}

#[tokio::test]
async fn unlike_emits_a_dislike_only_when_a_like_was_removed() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let fan = fixture.user("ben").await;
    let post = fixture.post(&owner, "hello").await;
    let mut inbox = fixture.hub.connect(owner.id.clone());

    assert!(!fixture.graph.unlike_post(&fan, post.id()).await.expect("noop unlike"));
    assert!(inbox.drain().is_empty());

    fixture.graph.like_post(&fan, post.id()).await.expect("like");
    fixture.graph.like_post(&fan, post.id()).await.expect("like again");
    fixture.graph.unlike_post(&fan, post.id()).await.expect("unlike");

    let kinds: Vec<NotificationKind> = inbox.drain().into_iter().map(|event| event.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::Like, NotificationKind::Dislike]);
}

#[tokio::test]
async fn comments_notify_the_post_owner_but_replies_do_not() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let fan = fixture.user("ben").await;
    let post = fixture.post(&owner, "hello").await;
    let mut owner_inbox = fixture.hub.connect(owner.id.clone());
    let mut fan_inbox = fixture.hub.connect(fan.id.clone());

    let comment = fixture.graph.add_comment(&fan, post.id(), "nice").await.expect("comment");
    let event = owner_inbox.try_recv().expect("comment notification");
    assert_eq!(event.kind, NotificationKind::Comment);
    assert_eq!(event.message, "commented on your post.");

    fixture.graph.add_reply(&owner, &comment.id, "thanks").await.expect("reply");
    assert!(fan_inbox.drain().is_empty());

    fixture.graph.toggle_comment_like(&owner, &comment.id).await.expect("comment like");
    let event = fan_inbox.try_recv().expect("comment like notification");
    assert_eq!(event.kind, NotificationKind::Like);
    assert_eq!(event.target_id, comment.id);
    assert_eq!(event.message, "Liked your comment");
}

#[tokio::test]
async fn offline_recipients_are_skipped_without_failing_the_action() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let fan = fixture.user("ben").await;
    let post = fixture.post(&owner, "hello").await;

    fixture.graph.toggle_like(&fan, post.id()).await.expect("like while offline");

    let mut inbox = fixture.hub.connect(owner.id.clone());
    assert!(inbox.try_recv().is_none(), "offline events are not queued");

    let connection_id = inbox.connection_id;
    assert!(fixture.hub.disconnect(&owner.id, connection_id));
    assert_eq!(fixture.hub.online_count(), 0);
    fixture.graph.toggle_like(&fan, post.id()).await.expect("unlike after disconnect");
    assert!(inbox.try_recv().is_none());
}

#[tokio::test]
async fn a_new_connection_replaces_the_previous_one() {
    let fixture = TestGraph::new();
    let owner = fixture.user("ava").await;
    let fan = fixture.user("ben").await;
    let post = fixture.post(&owner, "hello").await;

    let mut stale = fixture.hub.connect(owner.id.clone());
    let mut fresh = fixture.hub.connect(owner.id.clone());
    assert!(!fixture.hub.disconnect(&owner.id, stale.connection_id));
    assert_eq!(fixture.hub.online_count(), 1);

    fixture.graph.like_post(&fan, post.id()).await.expect("like");
    assert!(stale.try_recv().is_none());
    assert!(fresh.try_recv().is_some());
}
