//! End-to-end tests for tutoring sessions
//!
//! These tests drive a `SessionManager` through complete conversations with
//! scripted oracles, alongside the practice scheduler and calendar export.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use lingo_export::{CalendarGenerator, CalendarPlan, PlannedDay};
use lingo_tutor::{
    Analysis, Config, ConfigChange, Day, FeedbackEvent, Language, Level, PracticeKind,
    PracticeScheduler, Rejection, Role, ScriptedAnswer, ScriptedOracle, SessionEvent,
    SessionManager, SessionStatus, TransportKind, FALLBACK_REPLY,
};

const SEEN_ANALYSIS: &str = r#"```json
{
  "grammarErrors": [
    {"error": "I seen", "correction": "I saw", "explanation": "Use simple past tense"}
  ],
  "positiveAspects": ["Good sentence structure"],
  "overallFeedback": "Nice!",
  "suggestedImprovement": "Irregular verbs"
}
```"#;

const TWO_ERRORS: &str = r#"{
  "grammarErrors": [
    {"error": "a apple", "correction": "an apple", "explanation": "Use 'an' before vowel sounds"},
    {"error": "I eat", "correction": "I ate", "explanation": "Past event"}
  ],
  "positiveAspects": ["Clear meaning", "Good word order"],
  "overallFeedback": "Almost there",
  "suggestedImprovement": "Articles"
}"#;

fn session(answers: Vec<ScriptedAnswer>) -> (SessionManager, Arc<ScriptedOracle>) {
    let oracle = Arc::new(ScriptedOracle::new(answers));
    let session = SessionManager::new(oracle.clone(), &Config::default());
    (session, oracle)
}

#[tokio::test]
async fn test_full_conversation() {
    let (session, oracle) = session(vec![
        ScriptedAnswer::reply(SEEN_ANALYSIS),
        ScriptedAnswer::reply("Oh, who did you see?"),
        ScriptedAnswer::reply(TWO_ERRORS),
        ScriptedAnswer::reply("Apples are great! Do you cook?"),
    ]);

    let first = session.submit("I seen him yesterday").await;
    let first = first.report().expect("first turn should complete");
    assert_eq!(first.tutor_message.text, "Oh, who did you see?");

    let second = session.submit("I eat a apple").await;
    let second = second.report().expect("second turn should complete");
    assert_eq!(second.feedback.len(), 4);
    assert!(second.feedback[0].is_correction());
    assert!(second.feedback[1].is_correction());
    assert_eq!(second.feedback[2].message(), "Clear meaning");
    assert_eq!(second.feedback[3].message(), "Good word order");

    let stats = session.stats().await;
    assert_eq!(stats.message_count, 2);
    assert_eq!(stats.grammar_correction_count, 3);

    let roles: Vec<Role> = session.transcript().await.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::Tutor, Role::User, Role::Tutor, Role::User, Role::Tutor]
    );

    // Two oracle calls per turn, analysis first
    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[0].starts_with("Analyze this English message from a B1 level learner"));
    assert!(prompts[1].contains("Student said: \"I seen him yesterday\""));
    assert_eq!(oracle.remaining(), 0);
}

#[tokio::test]
async fn test_offline_session_always_completes() {
    let session = SessionManager::new(Arc::new(ScriptedOracle::unavailable()), &Config::default());

    for utterance in ["Hello", "How are you?", "Goodbye"] {
        let outcome = session.submit(utterance).await;
        let report = outcome.report().expect("turn should complete");
        assert_eq!(report.analysis, Some(Analysis::fallback()));
        assert_eq!(report.tutor_message.text, FALLBACK_REPLY);
    }

    let stats = session.stats().await;
    assert_eq!(stats.message_count, 3);
    assert_eq!(stats.grammar_correction_count, 0);
    assert_eq!(session.transcript().await.len(), 7);
}

#[tokio::test]
async fn test_transient_failures_then_recovery() {
    let (session, _) = session(vec![
        ScriptedAnswer::Fail(TransportKind::RateLimit),
        ScriptedAnswer::Fail(TransportKind::Server),
        ScriptedAnswer::reply(SEEN_ANALYSIS),
        ScriptedAnswer::reply("Much better"),
    ]);

    session.submit("first try").await;
    assert_eq!(
        session.feedback().await,
        vec![FeedbackEvent::Positive {
            message: "Good effort!".to_string()
        }]
    );

    let outcome = session.submit("I seen him").await;
    assert_eq!(
        outcome.report().map(|r| r.tutor_message.text.as_str()),
        Some("Much better")
    );
    assert_eq!(session.stats().await.grammar_correction_count, 1);
}

#[tokio::test]
async fn test_concurrent_submissions_single_flight() {
    let (session, oracle) = session(vec![
        ScriptedAnswer::Delayed(Duration::from_millis(100), SEEN_ANALYSIS.to_string()),
        ScriptedAnswer::reply("Only one"),
    ]);
    let session = Arc::new(session);

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.submit("I seen him").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(session.status().await, SessionStatus::Busy);
    let in_flight = session.transcript().await;
    assert_eq!(in_flight.len(), 2);
    assert_eq!(in_flight[1].role, Role::User);
    assert_eq!(in_flight[1].text, "I seen him");

    let rejected = session.submit("Second").await;
    assert_eq!(rejected.rejection(), Some(Rejection::Busy));

    let completed = first.await.expect("turn task panicked");
    assert!(completed.report().is_some());
    assert_eq!(session.status().await, SessionStatus::Idle);
    assert_eq!(session.transcript().await.len(), 3);
    assert_eq!(oracle.prompts().len(), 2);
}

#[tokio::test]
async fn test_language_switch_mid_conversation() {
    let (session, oracle) = session(vec![
        ScriptedAnswer::reply(SEEN_ANALYSIS),
        ScriptedAnswer::reply("Ok"),
        ScriptedAnswer::reply(TWO_ERRORS),
        ScriptedAnswer::reply("Muy bien"),
    ]);

    session.submit("I seen him").await;
    let change = session.set_language(Language::Spanish).await;
    assert!(matches!(change, ConfigChange::Applied(_)));
    session.set_level(Level::A2).await;

    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert!(transcript[0].text.contains("Spanish at a A2 level"));

    session.submit("Yo como manzana").await;
    let prompts = oracle.prompts();
    assert!(prompts[2].contains("Spanish message from a A2 level learner"));
    assert!(prompts[3].contains("friendly Spanish tutor for a A2 student"));
    assert_eq!(session.stats().await.message_count, 2);
}

#[tokio::test]
async fn test_event_stream_for_turn_and_reset() {
    let (session, _) = session(vec![
        ScriptedAnswer::reply(SEEN_ANALYSIS),
        ScriptedAnswer::reply("Nice"),
    ]);
    let mut events = session.subscribe();

    session.submit("I seen him").await;
    session.start_quick_practice(PracticeKind::Grammar).await.ok();
    session.set_level(Level::C2).await;

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }

    let stats_event = received
        .iter()
        .find_map(|e| match e {
            SessionEvent::StatsUpdated(stats) => Some(*stats),
            _ => None,
        })
        .expect("stats event");
    assert_eq!(stats_event.grammar_correction_count, 1);

    assert!(matches!(
        received.last(),
        Some(SessionEvent::TranscriptReset {
            level: Level::C2,
            ..
        })
    ));

    let json = serde_json::to_value(&received[0]).unwrap();
    assert_eq!(json["event"], "turn_started");
    assert_eq!(json["payload"]["utterance"], "I seen him");
}

#[test]
fn test_monday_plan_toggling() {
    let mut scheduler = PracticeScheduler::new();

    scheduler.toggle_task(Day::Monday, 0, true).unwrap();
    scheduler.toggle_task(Day::Monday, 1, true).unwrap();
    assert!(!scheduler.is_completed(Day::Monday));

    scheduler.toggle_task(Day::Monday, 2, true).unwrap();
    assert!(scheduler.is_completed(Day::Monday));

    scheduler.toggle_task(Day::Monday, 1, false).unwrap();
    assert!(!scheduler.is_completed(Day::Monday));
    assert!(Day::ALL
        .iter()
        .filter(|&&d| d != Day::Monday)
        .all(|&d| !scheduler.is_completed(d)));
}

#[test]
fn test_export_default_week() {
    let scheduler = PracticeScheduler::new();
    let plan = scheduler
        .week()
        .iter()
        .fold(CalendarPlan::new(Language::French.name()), |plan, (day, s)| {
            plan.day(PlannedDay::new(
                day.weekday(),
                s.activity.as_str(),
                s.tasks.iter().map(String::as_str),
            ))
        });

    let anchor = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let generated_at = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
    let ics = CalendarGenerator::new(&plan)
        .generate(anchor, generated_at)
        .unwrap();

    assert_eq!(ics.matches("BEGIN:VEVENT").count(), 7);
    assert!(ics.contains("SUMMARY:French class Practice"));
    assert!(ics.contains("SUMMARY:French light Practice"));
    // 2025-01-01 is a Wednesday; its week starts on 2024-12-30
    assert!(ics.contains("DTSTART;VALUE=DATE:20241230"));
    assert!(ics.contains("DTSTART;VALUE=DATE:20250105"));
    assert!(ics.contains("DESCRIPTION:Casual chat - 15 mins\\, Plan week\\, Relax"));

    let monday = ics.find("20241230").unwrap();
    let sunday = ics.find("20250105").unwrap();
    assert!(monday < sunday);
}
