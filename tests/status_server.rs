//! Status server against a booted lifecycle.

use serde_json::Value;
use tokio::net::TcpListener;

use boot_lifecycle::admin;
use boot_lifecycle::lifecycle::Shutdown;

mod common;

use common::{Recorder, RecordingHook, BASE_DIR};

#[tokio::test]
async fn test_status_and_timings_endpoints() {
    let lifecycle = common::lifecycle(10_000);
    let log = Recorder::new();
    let hook_log = log.clone();
    lifecycle
        .add_boot_hook(format!("{}/app/web.rs", BASE_DIR), move |_| {
            RecordingHook::new("web", &hook_log)
        })
        .unwrap();

    lifecycle.init().unwrap();
    lifecycle.trigger_config_will_load().unwrap();
    lifecycle.ready().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(admin::serve(listener, lifecycle.clone(), shutdown.clone()));
    lifecycle.trigger_server_did_ready().unwrap().await.unwrap();

    let client = reqwest::Client::new();

    let res = client.get(format!("http://{}/status", addr)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["state"], "ready");
    assert_eq!(status["ready"], true);
    assert_eq!(status["application"], "demo");
    assert_eq!(status["gates"][0]["phase"], "load");
    assert_eq!(status["gates"][1]["resolved"], true);
    assert_eq!(status["teardown_callbacks"], 1);

    let res = client.get(format!("http://{}/timings", addr)).send().await.unwrap();
    let timings: Value = res.json().await.unwrap();
    let names: Vec<&str> = timings
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names[0], "Application Start");
    assert!(names.contains(&"Did Load in app/web.rs:didLoad"));

    assert!(shutdown.trigger());
    server.await.unwrap().unwrap();
    assert!(log.position("web:serverDidReady").is_some());
}

#[tokio::test]
async fn test_status_unavailable_before_ready() {
    let lifecycle = common::lifecycle(10_000);
    let _pending = lifecycle.ready_callback("slow plugin");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(admin::serve(listener, lifecycle.clone(), shutdown.clone()));

    let res = reqwest::get(format!("http://{}/status", addr)).await.unwrap();
    assert_eq!(res.status(), 503);
    let status: Value = res.json().await.unwrap();
    assert_eq!(status["state"], "created");
    assert_eq!(status["gates"][0]["pending"], serde_json::json!(["slow plugin"]));
    assert_eq!(status["gates"][0]["started"], false);

    shutdown.trigger();
    server.await.unwrap().unwrap();
}
