use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use command_handlers::CommandResponse;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;
use tokio_test::assert_ok;
use uia_driver::{Config, LineTransport, LocalRuntime, ServeSummary, TransportError};

fn fixture() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/login_screen.json")
}

struct Client {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    server: JoinHandle<Result<ServeSummary, TransportError>>,
}

impl Client {
    async fn start(config: Config) -> (Self, Arc<LocalRuntime>) {
        let runtime = Arc::new(assert_ok!(LocalRuntime::load(fixture(), &config).await));
        let (input, server_input) = tokio::io::duplex(4096);
        let (server_output, output) = tokio::io::duplex(4096);
        let transport = LineTransport::new(runtime.router.clone(), runtime.lifecycle.listener_token());
        let server = tokio::spawn(async move {
            transport
                .serve(BufReader::new(server_input), server_output)
                .await
        });
        let client = Self {
            input,
            output: BufReader::new(output).lines(),
            server,
        };
        (client, runtime)
    }

    async fn send(&mut self, line: Value) {
        self.send_raw(&line.to_string()).await;
    }

    async fn send_raw(&mut self, line: &str) {
        assert_ok!(self.input.write_all(format!("{line}\n").as_bytes()).await);
    }

    async fn receive(&mut self) -> CommandResponse {
        let line = assert_ok!(self.output.next_line().await).expect("response line");
        assert_ok!(serde_json::from_str(&line))
    }
}

#[tokio::test]
async fn answers_each_line_and_stops_on_stop() {
    let (mut client, runtime) = Client::start(Config::default()).await;

    client
        .send(json!({
            "command": "click",
            "sessionId": "s-1",
            "payload": {"strategy": "id", "selector": "login_button"}
        }))
        .await;
    let clicked = client.receive().await;
    assert!(clicked.is_ok(), "{clicked:?}");
    assert_eq!(clicked.session_id.as_deref(), Some("s-1"));
    assert_eq!(clicked.value["text"], json!("Sign in"));
    assert_eq!(runtime.device.taps(), vec![(540, 1080)]);

    client.send(json!({"command": "stop", "sessionId": "s-1"})).await;
    let stopped = client.receive().await;
    assert!(stopped.is_ok());
    assert_eq!(stopped.value, json!(""));

    let summary = assert_ok!(assert_ok!(client.server.await));
    assert_eq!(summary, ServeSummary {
            received: 2,
            rejected: 0,
            peak_in_flight: 1,
        });
    assert!(runtime.lifecycle.server_token().is_cancelled());
    assert!(assert_ok!(client.output.next_line().await).is_none());
}

#[tokio::test]
async fn malformed_lines_are_rejected_without_ending_the_loop() {
    let (mut client, _runtime) = Client::start(Config::default()).await;

    client.send_raw("this is not json").await;
    let rejected = client.receive().await;
    assert_eq!(rejected.error_code(), Some("invalid argument"));
    assert!(rejected.session_id.is_none());

    client.send(json!({"command": "wake"})).await;
    assert!(client.receive().await.is_ok());

    drop(client.input);
    let summary = assert_ok!(assert_ok!(client.server.await));
    assert_eq!(summary, ServeSummary {
            received: 2,
            rejected: 1,
            peak_in_flight: 1,
        });
}

#[tokio::test]
async fn finished_requests_are_reaped_while_serving() {
    let (mut client, _runtime) = Client::start(Config::default()).await;

    for _ in 0..50 {
        client.send(json!({"command": "wake"})).await;
        assert!(client.receive().await.is_ok());
    }

    drop(client.input);
    let summary = assert_ok!(assert_ok!(client.server.await));
    assert_eq!(summary.received, 50);
    assert_eq!(summary.peak_in_flight, 1);
}

#[tokio::test(start_paused = true)]
async fn responses_arrive_in_completion_order() {
    let (mut client, _runtime) = Client::start(Config::default()).await;

    client
        .send(json!({
            "command": "find",
            "payload": {"strategy": "id", "selector": "missing", "timeout": 1000}
        }))
        .await;
    client
        .send(json!({
            "command": "find",
            "payload": {"strategy": "xpath", "selector": "//android.widget.EditText[2]"}
        }))
        .await;

    let first = client.receive().await;
    assert_eq!(
        first.value["resourceId"],
        json!("com.example.shop:id/password")
    );
    let second = client.receive().await;
    assert_eq!(second.error_code(), Some("no such element"));
}

#[tokio::test]
async fn configured_timeout_applies_to_requests_without_one() {
    let mut config = Config::default();
    config.locator.default_timeout_ms = 0;
    let (mut client, runtime) = Client::start(config).await;

    client
        .send(json!({"command": "find", "payload": {"strategy": "id", "selector": "missing"}}))
        .await;
    let response = tokio::time::timeout(Duration::from_secs(5), client.receive())
        .await
        .expect("no response within the default-timeout window");
    assert_eq!(response.error_code(), Some("no such element"));
    assert_eq!(runtime.tree.refresh_count(), 1);
}
