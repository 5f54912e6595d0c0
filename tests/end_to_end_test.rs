mod helpers;

use secondbrain::memory::notes::NoteStore;
use secondbrain::memory::types::combined_text;

const Q1: &str = "What is React state management?";
const R1: &str = "React components keep state with hooks such as useState and useReducer.";
const Q2: &str = "Tell me more about hooks";

#[tokio::test]
async fn react_conversation_builds_notes_and_recalls_context() {
    let db = helpers::shared_db();
    let embedder = helpers::ScriptedEmbedder::new();
    let judge = helpers::ScriptedJudge::new();

    embedder.script(&combined_text(Q1, R1), helpers::test_embedding(0));
    embedder.script(Q2, helpers::embedding_at(0, 0.82));
    judge.extract(
        Q1,
        "React State Management",
        "React state is managed with hooks like useState.",
        &["React", "State Management"],
    );

    let service = helpers::service(&db, embedder.clone(), judge.clone());

    // Turn 1
    assert_eq!(service.augment(Q1).await, "", "nothing stored yet");
    let turn1 = service.record_turn(Q1, R1).await.unwrap();
    assert!(turn1.embedding.is_some());

    // Turn 2 retrieves turn 1
    let ctx = service.retrieve(Q2).await.expect("turn 1 should be relevant");
    assert_eq!(ctx.interaction_id, turn1.id);
    assert!((ctx.similarity - 0.82).abs() < 1e-4);
    assert_eq!(ctx.text, combined_text(Q1, R1));
    assert_eq!(ctx.topic, Q1);

    let preamble = service.augment(Q2).await;
    assert!(preamble.contains("similarity: 0.82"));
    assert!(preamble.contains(R1));

    service.shutdown().await;

    // Notes from turn 1
    let notes = helpers::note_store(&db);
    let primary = notes.get("react_state_management").unwrap().expect("primary note");
    assert_eq!(primary.title, "React State Management");
    assert!(!primary.is_placeholder);
    assert!(primary.content.starts_with("# React State Management\n\nReact state is managed"));
    assert_eq!(primary.related, vec!["react", "state_management"]);
    assert_eq!(primary.raw_contexts.len(), 1);

    for key in ["react", "state_management"] {
        let placeholder = notes.get(key).unwrap().expect("placeholder note");
        assert!(placeholder.is_placeholder);
        assert_eq!(placeholder.related, vec!["react_state_management"]);
    }
    assert_eq!(notes.keys().unwrap().len(), 3);
    assert_eq!(
        notes.backlinks("react_state_management").unwrap(),
        vec!["react", "state_management"]
    );
}

#[tokio::test]
async fn weak_match_is_not_injected() {
    let db = helpers::shared_db();
    let embedder = helpers::ScriptedEmbedder::new();
    let judge = helpers::ScriptedJudge::new();

    embedder.script(&combined_text(Q1, R1), helpers::test_embedding(0));
    embedder.script("Unrelated", helpers::embedding_at(0, 0.65));

    let service = helpers::service(&db, embedder, judge);
    service.record_turn(Q1, R1).await.unwrap();

    assert!(service.retrieve("Unrelated").await.is_none());
    assert_eq!(service.augment("Unrelated").await, "");
}
