use verdict_model::{ErrorKind, Message, ResponseFormat, Role};
use verdict_test_model::{PresetEvent, PresetResponse, TestModelProvider};

use crate::{AgentBuilder, AgentType, Error};

#[tokio::test]
async fn test_simple_message() {
    let model_provider = TestModelProvider::default();
    model_provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("what can I do for you?".to_owned()),
    ]));

    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_agent_type(AgentType::GenericResponder)
        .build()
        .unwrap();
    let reply = agent.ask("Hello", None).await.unwrap();
    assert_eq!(reply, "Hi, what can I do for you?");

    let messages = agent.history().messages();
    assert_eq!(messages, [Message::user("Hello"), Message::assistant(reply)]);

    let req = &model_provider.requests()[0];
    assert_eq!(req.messages[0], *agent.system_prompt());
    assert_eq!(req.format, ResponseFormat::Text);
    assert_eq!(req.temperature, Some(0.8));
}

#[tokio::test]
async fn test_history_and_options() {
    let model_provider = TestModelProvider::with_replies([
        r#"{"steps": ["buy flour", "bake"]}"#,
    ]);
    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_agent_type(AgentType::Planner)
        .with_format(ResponseFormat::Json)
        .with_temperature(0.1)
        .with_additional_instructions("Use at most three steps.")
        .build()
        .unwrap();
    assert!(
        agent
            .system_prompt()
            .content()
            .ends_with("Use at most three steps.")
    );

    let earlier = [Message::user("I want bread."), Message::assistant("Okay.")];
    agent.ask("Make a plan.", Some(&earlier)).await.unwrap();

    let req = &model_provider.requests()[0];
    let roles: Vec<_> = req.messages.iter().map(Message::role).collect();
    assert_eq!(
        roles,
        [Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(req.format, ResponseFormat::Json);
    assert_eq!(req.temperature, Some(0.1));
    // The supplied history is sent but not recorded.
    assert_eq!(agent.history().len(), 2);
}

#[tokio::test]
async fn test_ask_with_images() {
    let model_provider = TestModelProvider::with_replies(["A cat on a mat."]);
    let mut agent = AgentBuilder::with_model_provider(model_provider.clone())
        .with_custom_system_prompt("Describe images.")
        .build()
        .unwrap();
    let reply = agent
        .ask_with_images("What is this?", ["cat.png"], None)
        .await
        .unwrap();
    assert_eq!(reply, "A cat on a mat.");

    let req = &model_provider.requests()[0];
    assert_eq!(req.messages[0].content(), "Describe images.");
    assert_eq!(req.messages[1].images(), Some(&["cat.png".to_owned()][..]));
    assert_eq!(agent.history().messages()[0].images().map(<[_]>::len), Some(1));
}

#[tokio::test]
async fn test_model_failure() {
    let model_provider = TestModelProvider::default();
    model_provider
        .add_response(PresetResponse::failure(ErrorKind::RateLimitExceeded));
    let mut agent = AgentBuilder::with_model_provider(model_provider)
        .with_agent_type(AgentType::Summarizer)
        .build()
        .unwrap();
    assert!(agent.ask("Summarize this.", None).await.is_none());
    assert!(matches!(
        agent.try_ask("Summarize this.", None).await,
        Err(Error::Model(_))
    ));
    assert!(agent.history().is_empty());
}

#[test]
fn test_missing_system_prompt() {
    let result = AgentBuilder::with_model_provider(TestModelProvider::default())
        .with_temperature(0.5)
        .build();
    assert!(matches!(result, Err(Error::MissingConfiguration(_))));
}

#[test]
fn test_prompt() {
    let agent = AgentBuilder::with_model_provider(TestModelProvider::default())
        .with_agent_type(AgentType::Validator)
        .with_custom_system_prompt("Say yes. {additional_instructions}")
        .with_additional_instructions("Or no.")
        .build()
        .unwrap();
    let prompts = agent.prompt("Is 2 + 2 = 4?");
    assert_eq!(prompts[0], Message::system("Say yes. Or no."));
    assert_eq!(prompts[1], Message::user("Is 2 + 2 = 4?"));
}
