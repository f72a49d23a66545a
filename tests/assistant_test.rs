mod common;

use chrono::{Local, TimeZone};
use common::{factory, text_round, ScriptedBackend};
use futures::StreamExt;
use stu::{
    AssistantFactory, AssistantFlags, ChatMessage, Error, ReplyEvent, ToolSelection, ToolSettings,
};

#[test]
fn test_instructions_mention_tools_only_when_present() {
    let factory = factory(ScriptedBackend::new(vec![]));
    let now = Local::now();

    let plain = factory.build_for(&ToolSelection::none()).unwrap();
    let text = plain.instructions(now);
    assert!(text.starts_with(stu::DEFAULT_DESCRIPTION));
    assert!(text.contains("## Instructions"));
    assert!(text.contains("markdown"));
    assert!(!text.contains("access to tools"));
    assert!(!text.contains("current time"));

    let tooled = factory.build_for(&ToolSelection::default()).unwrap();
    assert!(tooled.instructions(now).contains("access to tools"));
}

#[test]
fn test_instructions_carry_the_time_when_enabled() {
    let factory = AssistantFactory::new(
        ScriptedBackend::new(vec![]),
        "llama3",
        ToolSettings::default(),
    );
    let assistant = factory.build_for(&ToolSelection::none()).unwrap();
    assert_eq!(assistant.flags(), AssistantFlags::default());

    let now = Local.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap();
    assert!(assistant
        .instructions(now)
        .contains("The current time is 2024-05-17 09:30:00"));
}

#[test]
fn test_build_messages_order() {
    let factory = factory(ScriptedBackend::new(vec![]));
    let assistant = factory.build_for(&ToolSelection::none()).unwrap();
    let history = vec![ChatMessage::user("hello"), ChatMessage::assistant("Hi!")];

    let messages = assistant.build_messages("and now?", &history, Local::now());

    let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert_eq!(messages[3].content, "and now?");
}

#[test]
fn test_empty_model_is_rejected() {
    let factory = AssistantFactory::new(ScriptedBackend::new(vec![]), " ", ToolSettings::default());
    let err = factory.build_for(&ToolSelection::none()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn test_run_yields_fragments_then_finished() {
    let backend = ScriptedBackend::new(vec![text_round(&["a", "", "b"])]);
    let factory = factory(backend.clone());
    let mut assistant = factory.build_for(&ToolSelection::none()).unwrap();

    let events: Vec<ReplyEvent> = assistant
        .run("hi", &[])
        .map(|event| event.unwrap())
        .collect()
        .await;

    // Empty content chunks produce no fragment.
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], ReplyEvent::Fragment("a".to_string()));
    assert_eq!(events[1], ReplyEvent::Fragment("b".to_string()));
    match &events[2] {
        ReplyEvent::Finished(summary) => assert_eq!(summary.usage.output_tokens, 3),
        other => panic!("expected the final event, got {:?}", other),
    }

    let request = &backend.requests()[0];
    assert_eq!(request.model, "llama3");
    assert!(request.stream);
}

#[tokio::test]
async fn test_dropping_the_reply_stops_it() {
    let backend = ScriptedBackend::new(vec![text_round(&["first", "second"])]);
    let factory = factory(backend.clone());
    let mut assistant = factory.build_for(&ToolSelection::none()).unwrap();

    {
        let mut reply = assistant.run("hi", &[]);
        let first = reply.next().await.unwrap().unwrap();
        assert_eq!(first, ReplyEvent::Fragment("first".to_string()));
    }
    assert_eq!(backend.requests().len(), 1);

    // The next reply starts from a new request; nothing of the dropped one
    // is delivered.
    backend.push(text_round(&["again"]));
    let events: Vec<ReplyEvent> = assistant
        .run("hi", &[])
        .map(|event| event.unwrap())
        .collect()
        .await;

    assert_eq!(backend.requests().len(), 2);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0], ReplyEvent::Fragment("again".to_string()));
    assert!(matches!(events[1], ReplyEvent::Finished(_)));
    let finished = events
        .iter()
        .filter(|event| matches!(event, ReplyEvent::Finished(_)))
        .count();
    assert_eq!(finished, 1);
}
