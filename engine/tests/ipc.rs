mod common;

use std::{sync::Arc, time::Duration};

use client::{ClientError, IpcClient};
use common::{Call, RecordingPlatform};
use engine::communication::ipc::serve_connection;
use shared_std::{
    commands::CommandType,
    ipc::{read_message, write_frame, FrameError, IpcResponse, ResponseKind, MAX_MESSAGE_SIZE},
    models::AppEntry,
    settings::PowerBridgeSettings,
};
use tokio::{
    io::{AsyncWriteExt, DuplexStream},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

struct Harness {
    platform: Arc<RecordingPlatform>,
    client_end: DuplexStream,
    server: JoinHandle<Result<(), FrameError>>,
    _dir: tempfile::TempDir,
}

async fn start(settings: PowerBridgeSettings) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(RecordingPlatform::default());
    let api = common::service_api(&platform, settings, &dir).await;

    let (client_end, server_end) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(serve_connection(server_end, api, CancellationToken::new()));

    Harness {
        platform,
        client_end,
        server,
        _dir: dir,
    }
}

#[tokio::test]
async fn execute_command_runs_through_the_executor() {
    let harness = start(PowerBridgeSettings::default()).await;
    let mut client = IpcClient::new(harness.client_end);

    client.execute_command(CommandType::Shutdown).await.unwrap();

    assert_eq!(
        harness.platform.calls(),
        vec![Call::Shutdown(vec!["/s".into(), "/t".into(), "0".into()])]
    );
}

#[tokio::test]
async fn failed_command_is_an_error_response() {
    let harness = start(PowerBridgeSettings::default()).await;
    let mut client = IpcClient::new(harness.client_end);

    // no MAC configured
    let result = client.execute_command(CommandType::WakeOnLan).await;

    assert!(matches!(result, Err(ClientError::Remote { .. })));

    // the connection survives a failed request
    client.get_status().await.unwrap();
}

#[tokio::test]
async fn oversized_frame_closes_the_connection() {
    let mut harness = start(PowerBridgeSettings::default()).await;

    let length = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
    harness.client_end.write_all(&length).await.unwrap();

    // the body is never sent; the server must give up on the header alone
    let result = tokio::time::timeout(Duration::from_secs(5), harness.server)
        .await
        .expect("server kept waiting for the body")
        .unwrap();

    assert!(matches!(result, Err(FrameError::InvalidLength(n)) if n == MAX_MESSAGE_SIZE + 1));
}

#[tokio::test]
async fn malformed_json_gets_an_error_response() {
    let mut harness = start(PowerBridgeSettings::default()).await;

    write_frame(&mut harness.client_end, br#"{"correlationId":"c-1","type":"reboot-everything"}"#)
        .await
        .unwrap();
    let response: IpcResponse = read_message(&mut harness.client_end).await.unwrap().unwrap();

    assert!(!response.success);
    assert_eq!(response.correlation_id, "c-1");
    assert!(matches!(response.kind, ResponseKind::Error { .. }));
    assert!(response.error_message.is_some());

    // still serving
    let mut client = IpcClient::new(harness.client_end);
    client.get_apps().await.unwrap();
}

#[tokio::test]
async fn apps_can_be_saved_listed_and_deleted() {
    let harness = start(PowerBridgeSettings::default()).await;
    let mut client = IpcClient::new(harness.client_end);

    let saved = client
        .save_app(AppEntry {
            name: "Steam".to_string(),
            path: r"C:\Program Files (x86)\Steam\steam.exe".to_string(),
            arguments: "-bigpicture".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(!saved.id.is_empty());

    let apps = client.get_apps().await.unwrap();
    assert_eq!(apps, vec![saved.clone()]);

    assert!(client.delete_app(&saved.id).await.unwrap());
    assert!(!client.delete_app(&saved.id).await.unwrap());
    assert!(client.get_apps().await.unwrap().is_empty());
}

#[tokio::test]
async fn oversized_response_is_replaced_with_an_error() {
    let harness = start(PowerBridgeSettings::default()).await;
    let mut client = IpcClient::new(harness.client_end);

    // each save fits in a frame, the list of all three does not
    for name in ["one", "two", "three"] {
        client
            .save_app(AppEntry {
                name: name.to_string(),
                path: "tool.exe".to_string(),
                arguments: "x".repeat(400_000),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    match client.get_apps().await {
        Err(ClientError::Remote { message, .. }) => {
            assert!(message.contains("maximum message size"))
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // still serving
    client.get_status().await.unwrap();
    assert!(!harness.server.is_finished());
}

#[tokio::test]
async fn invalid_app_is_rejected() {
    let harness = start(PowerBridgeSettings::default()).await;
    let mut client = IpcClient::new(harness.client_end);

    let result = client
        .save_app(AppEntry {
            name: "   ".to_string(),
            path: "notepad.exe".to_string(),
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(ClientError::Remote { .. })));
}

#[tokio::test]
async fn status_reflects_the_settings() {
    let mut settings = common::settings_with_secret("abc123xyz");
    settings.http.port = 5123;
    settings.http.default_command = CommandType::Lock;
    let harness = start(settings).await;
    let mut client = IpcClient::new(harness.client_end);

    let status = client.get_status().await.unwrap();

    assert_eq!(status.http_port, 5123);
    assert!(status.secret_configured);
    assert!(!status.wake_on_lan_configured);
    assert_eq!(status.default_command, CommandType::Lock);
    assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn stats_are_reported() {
    let harness = start(PowerBridgeSettings::default()).await;
    let mut client = IpcClient::new(harness.client_end);

    let stats = client.get_stats().await.unwrap();

    assert!(stats.total_memory_bytes > 0);
    assert!(stats.used_memory_bytes <= stats.total_memory_bytes);
}

#[tokio::test]
async fn client_disconnect_ends_the_connection_cleanly() {
    let harness = start(PowerBridgeSettings::default()).await;
    drop(harness.client_end);

    let result = tokio::time::timeout(Duration::from_secs(5), harness.server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
