mod common;

use std::time::Duration;

use command_handlers::{CommandCtx, ErrorCategory};
use serde_json::json;
use tokio::time::Instant;
use uia_core_types::SessionId;

use common::{Harness, PACKAGE};

fn ctx() -> CommandCtx {
    CommandCtx::new(Some(SessionId("session-1".into())))
}

#[tokio::test(start_paused = true)]
async fn scenario_a_short_id_resolves_on_first_attempt() {
    let harness = Harness::new();
    let response = harness
        .router
        .dispatch(
            "find",
            ctx(),
            json!({"strategy": "id", "selector": "login_button", "timeout": 2000}),
        )
        .await;

    assert!(response.is_ok(), "{response:?}");
    assert_eq!(response.session_id.as_deref(), Some("session-1"));
    assert_eq!(
        response.value["resourceId"],
        json!(format!("{PACKAGE}:id/login_button"))
    );
    assert_eq!(response.value["contentDesc"], json!("Log in"));
    assert_eq!(response.value["enabled"], json!(true));
    assert!(response.value["elementId"]
        .as_str()
        .is_some_and(|id| id.starts_with("node-")));
    assert_eq!(harness.tree.refresh_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_missing_element_is_not_found_after_three_attempts() {
    let harness = Harness::new();
    let started = Instant::now();
    let response = harness
        .router
        .dispatch(
            "find",
            ctx(),
            json!({"strategy": "id", "selector": "missing", "timeout": 1000}),
        )
        .await;

    assert_eq!(response.status, ErrorCategory::NotFound.code());
    assert_eq!(response.error_code(), Some("no such element"));
    assert_eq!(response.value["origin"], json!("find"));
    assert_eq!(harness.tree.refresh_count(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn scenario_c_unknown_strategy_fails_without_any_lookup() {
    let harness = Harness::new();
    let started = Instant::now();
    let response = harness
        .router
        .dispatch("find", ctx(), json!({"strategy": "xyz", "selector": "anything"}))
        .await;

    assert_eq!(response.error_code(), Some("invalid argument"));
    assert_eq!(harness.tree.refresh_count(), 0);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_click_on_invalidated_node_is_stale() {
    let harness = Harness::redrawing_before_reads();
    let response = harness
        .router
        .dispatch(
            "click",
            ctx(),
            json!({"strategy": "accessibility id", "selector": "Log in"}),
        )
        .await;

    assert_eq!(response.error_code(), Some("stale element reference"));
    assert!(harness.device.taps().is_empty());
}
