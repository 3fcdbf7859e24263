use application::chat::ChatConversation;
use domain::{Message, SessionConfig};
use tests::{Reply, ScriptedProvider};

#[tokio::test]
async fn test_failed_chat_turn_leaves_history_intact() {
    let provider = ScriptedProvider::new(vec![
        Reply::text(&["hello ", "there"]),
        Reply::broken(&["par"], "stream reset"),
        Reply::unreachable(),
        Reply::text(&["second try"]),
    ]);
    let mut chat = ChatConversation::new(SessionConfig::default()).unwrap();

    let response = chat
        .send(&provider, "hi")
        .await
        .unwrap()
        .drain(|_| {})
        .await
        .unwrap();
    chat.finish(response).unwrap();
    let before = chat.history().to_vec();

    let err = chat
        .send(&provider, "and?")
        .await
        .unwrap()
        .drain(|_| {})
        .await
        .unwrap_err();
    assert_eq!(err.partial_text(), Some("par"));
    chat.abandon();
    assert_eq!(chat.history(), before.as_slice());

    let err = chat.send(&provider, "and?").await.err().unwrap();
    assert!(err.is_unreachable());
    assert_eq!(chat.history(), before.as_slice());

    let response = chat
        .send(&provider, "and?")
        .await
        .unwrap()
        .drain(|_| {})
        .await
        .unwrap();
    chat.finish(response).unwrap();
    assert_eq!(chat.history().len(), 5);
    assert_eq!(chat.history()[3], Message::user("and?"));
    assert_eq!(chat.history()[4], Message::assistant("second try"));
    assert_eq!(provider.requests()[3].messages.len(), 4);
}
