//! Comment thread tests.
//!
//! Run with: `cargo test --test comments_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

mod common;

use common::{client, create_event, fixture, organizer};
use evently_testing::properties::comment_content;
use proptest::collection::vec;
use proptest::prelude::*;
use ticketing::{CommentId, EventId, Role, Session, TicketingError, UserId};

#[tokio::test]
async fn test_reply_is_nested_under_its_comment() {
    let f = fixture();
    let event_id = create_event(&f.app, &organizer("olga"), "Rust Meetup", 10).await;
    let ana = client("ana");

    let comment_id = f.app.comments.add_comment(&ana, &event_id, "hello").await.unwrap();
    f.app
        .comments
        .add_reply(&client("ben"), &event_id, &comment_id, "hi")
        .await
        .unwrap();

    let thread = f.app.comments.thread(&event_id).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].id, comment_id);
    assert_eq!(thread[0].body.content, "hello");
    assert_eq!(thread[0].body.replies.len(), 1);
    assert_eq!(thread[0].body.replies[0].content, "hi");
    assert_eq!(thread[0].body.replies[0].username, "ben");
}

#[tokio::test]
async fn test_thread_is_newest_first() {
    let f = fixture();
    let event_id = create_event(&f.app, &organizer("olga"), "Rust Meetup", 10).await;
    let ana = client("ana");

    let first = f.app.comments.add_comment(&ana, &event_id, "first").await.unwrap();
    let second = f.app.comments.add_comment(&ana, &event_id, "second").await.unwrap();
    f.app.comments.add_reply(&ana, &event_id, &first, "bump").await.unwrap();
    let third = f.app.comments.add_comment(&ana, &event_id, "third").await.unwrap();

    let thread = f.app.comments.thread(&event_id).await.unwrap();
    let ids: Vec<_> = thread.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec![third, second, first]);
    assert!(thread.windows(2).all(|w| w[0].body.timestamp > w[1].body.timestamp));
}

#[tokio::test]
async fn test_replies_keep_duplicates_in_order() {
    let f = fixture();
    let event_id = create_event(&f.app, &organizer("olga"), "Rust Meetup", 10).await;
    let ana = client("ana");
    let comment_id = f.app.comments.add_comment(&ana, &event_id, "question").await.unwrap();

    for text in ["+1", "+1", "answered"] {
        f.app.comments.add_reply(&ana, &event_id, &comment_id, text).await.unwrap();
    }

    let thread = f.app.comments.thread(&event_id).await.unwrap();
    let replies: Vec<_> = thread[0].body.replies.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(replies, vec!["+1", "+1", "answered"]);
}

#[tokio::test]
async fn test_blank_username_posts_as_anonymous() {
    let f = fixture();
    let event_id = create_event(&f.app, &organizer("olga"), "Rust Meetup", 10).await;
    let nameless = Session::new(UserId::new("u9"), "  ", Role::Client);

    f.app.comments.add_comment(&nameless, &event_id, "who am I?").await.unwrap();

    let thread = f.app.comments.thread(&event_id).await.unwrap();
    assert_eq!(thread[0].body.username, "Anonymous");
    assert_eq!(thread[0].body.user_id.as_str(), "u9");
}

#[tokio::test]
async fn test_invalid_comments_are_rejected() {
    let f = fixture();
    let event_id = create_event(&f.app, &organizer("olga"), "Rust Meetup", 10).await;
    let ana = client("ana");

    let blank = f.app.comments.add_comment(&ana, &event_id, "   ").await;
    assert!(matches!(blank, Err(TicketingError::Validation(_))));

    let unknown_event = f
        .app
        .comments
        .add_comment(&ana, &EventId::new("missing"), "hello")
        .await;
    assert!(matches!(unknown_event, Err(TicketingError::NotFound { entity: "event", .. })));

    let unknown_comment = f
        .app
        .comments
        .add_reply(&ana, &event_id, &CommentId::new("missing"), "hi")
        .await;
    assert!(matches!(
        unknown_comment,
        Err(TicketingError::NotFound { entity: "comment", .. })
    ));

    assert!(f.app.comments.thread(&event_id).await.unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_replies_never_create_comments(replies in vec(comment_content(), 0..8)) {
        tokio_test::block_on(async {
            let f = fixture();
            let event_id = create_event(&f.app, &organizer("olga"), "Prop Event", 10).await;
            let ana = client("ana");
            let comment_id = f.app.comments.add_comment(&ana, &event_id, "root").await.unwrap();

            for text in &replies {
                f.app.comments.add_reply(&ana, &event_id, &comment_id, text).await.unwrap();
            }

            let thread = f.app.comments.thread(&event_id).await.unwrap();
            assert_eq!(thread.len(), 1);
            assert_eq!(thread[0].body.replies.len(), replies.len());
        });
    }
}
