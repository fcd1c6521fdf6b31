//! E2E tests for question answering and the engine lifecycle:
//! first request → background build → ready engine → resync swap.

mod helpers;

use axum::http::StatusCode;

use helpers::TestHarness;

#[tokio::test]
async fn first_question_starts_build_then_answers() {
    let h = TestHarness::with_sample_data();

    let (status, json) = h.ask("what are your hours on Sunday").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["intent"], "qa_initializing");

    let engine = h.wait_for_engine("ready").await;
    assert_eq!(engine["indexed_rows"], 3);

    let (status, json) = h.ask("what are your hours on Sunday").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intent"], "qa");
    let matches = json["matches"].as_array().unwrap();
    assert_eq!(matches[0]["row"], 4);
    assert!(matches[0]["text"].as_str().unwrap().contains("Sunday"));
    assert!(h.index_path().exists());
}

#[tokio::test]
async fn answer_prompt_carries_row_tags() {
    let h = TestHarness::with_sample_data();
    h.make_ready().await;
    h.chat.push_reply("We are closed on Sundays [Row 4].");

    let (_, json) = h.ask("what are your hours on Sunday").await;
    assert_eq!(json["answer"], "We are closed on Sundays [Row 4].");

    let (system, user, temperature) = h.chat.last_call().unwrap();
    assert!(system.contains("I don't know") || system.contains("don't know"));
    assert!(user.contains("[Row 4]"));
    assert!(user.contains("Question: what are your hours on Sunday"));
    assert!((temperature - 0.2).abs() < f32::EPSILON);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_questions_trigger_one_build() {
    let h = std::sync::Arc::new(TestHarness::with_sample_data());
    h.embedder.hold();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.ask("are you open on Saturday?").await
        }));
    }
    for handle in handles {
        let (status, json) = handle.await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["intent"], "qa_initializing");
    }
    assert_eq!(h.state.engine.builds_started(), 1);

    h.embedder.release();
    h.wait_for_engine("ready").await;
    let (status, _) = h.ask("are you open on Saturday?").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.state.engine.builds_started(), 1);
}

#[tokio::test]
async fn engine_reports_building_then_ready() {
    let h = TestHarness::with_sample_data();
    let (_, json) = h.engine().await;
    assert_eq!(json["state"], "unbuilt");

    h.embedder.hold();
    let (status, json) = h.sync(false).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "accepted");

    let (_, json) = h.engine().await;
    assert_eq!(json["state"], "building");
    let (status, json) = h.sync(false).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "already_building");

    h.embedder.release();
    let json = h.wait_for_engine("ready").await;
    assert_eq!(json["indexed_rows"], 3);
}

#[tokio::test]
async fn resync_picks_up_new_rows() {
    let h = TestHarness::with_sample_data();
    h.make_ready().await;

    h.store.set_tab(
        "Business Hours",
        &[
            &["Day", "Open", "Close", "Notes"],
            &["Monday", "10:00", "18:00", ""],
            &["Tuesday", "10:00", "18:00", ""],
            &["Saturday", "09:00", "14:00", "Open studio only"],
            &["Sunday", "Closed", "Closed", "Closed all day on Sundays"],
        ],
    );
    let (status, json) = h.sync(true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["synced_rows"], 4);

    let (_, json) = h.ask("what are your hours on Sunday").await;
    assert_eq!(json["matches"][0]["row"], 5);
}

#[tokio::test]
async fn failed_resync_keeps_artifact_and_engine() {
    let h = TestHarness::with_sample_data();
    h.make_ready().await;
    let before = std::fs::read(h.index_path()).unwrap();

    h.embedder.set_failing(true);
    let (status, json) = h.sync(true).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().starts_with("sync failed"));

    assert_eq!(std::fs::read(h.index_path()).unwrap(), before);
    let (_, json) = h.engine().await;
    assert_eq!(json["state"], "ready");
    assert_eq!(json["indexed_rows"], 3);
}
