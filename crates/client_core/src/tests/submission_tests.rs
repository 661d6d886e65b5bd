use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

#[derive(Debug)]
struct ReceivedPart {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct UploadServerState {
    tx: Arc<Mutex<Option<oneshot::Sender<Vec<ReceivedPart>>>>>,
    status: StatusCode,
    body: &'static str,
}

async fn handle_upload(
    State(state): State<UploadServerState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(ReceivedPart {
            field: name,
            file_name,
            content_type,
            bytes,
        });
    }
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(parts);
    }
    (
        state.status,
        [("content-type", "application/json")],
        state.body,
    )
}

async fn spawn_upload_server(
    status: StatusCode,
    body: &'static str,
) -> anyhow::Result<(String, oneshot::Receiver<Vec<ReceivedPart>>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = UploadServerState {
        tx: Arc::new(Mutex::new(Some(tx))),
        status,
        body,
    };
    let app = Router::new()
        .route("/upload", post(handle_upload))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), rx))
}

fn sample_upload() -> VideoUpload {
    VideoUpload {
        file_name: "interview.mp4".into(),
        mime_type: "video/mp4".into(),
        bytes: Arc::from(&b"\x00\x00\x00\x18ftypmp42"[..]),
    }
}

#[test]
fn progress_advances_by_step_and_stops_at_cap() {
    let policy = ProgressPolicy::default();
    let mut value = 0;
    let mut seen = Vec::new();
    for _ in 0..12 {
        value = policy.advance(value);
        seen.push(value);
    }
    assert_eq!(&seen[..9], &[10, 20, 30, 40, 50, 60, 70, 80, 90]);
    assert!(seen[9..].iter().all(|v| *v == 90));
}

#[test]
fn progress_never_moves_backwards_past_cap() {
    let policy = ProgressPolicy {
        interval: Duration::from_millis(50),
        step: 15,
        cap: 40,
    };
    assert_eq!(policy.advance(30), 40);
    assert_eq!(policy.advance(55), 55);
    assert_eq!(policy.advance(250), 250);
}

#[tokio::test(start_paused = true)]
async fn ticker_fires_on_interval_until_cancelled() {
    let ticks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ticks);
    let ticker = ProgressTicker::start(ProgressPolicy::default(), move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        }
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0, "first tick waits one interval");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 3);

    ticker.cancel().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 3, "no tick after cancel");
}

#[tokio::test(start_paused = true)]
async fn ticker_finishes_when_callback_stops() {
    let ticks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ticks);
    let ticker = ProgressTicker::start(ProgressPolicy::default(), move || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(ticker.is_finished());
    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    ticker.cancel().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_ticker_aborts_it() {
    let ticks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ticks);
    let ticker = ProgressTicker::start(ProgressPolicy::default(), move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        }
    });
    drop(ticker);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn uploads_single_video_part_and_parses_verdict() {
    let (server_url, parts_rx) = spawn_upload_server(
        StatusCode::OK,
        r#"{"is_deepfake":false,"confidence":0.8,"score":0.2,"frames_analyzed":15,
            "details":{"color_variance":41.2,"edge_density":0.11,"symmetry":12.0,"consistency":3.5}}"#,
    )
    .await
    .expect("spawn server");
    let service = HttpAnalysisService::new(&server_url).expect("service");
    assert_eq!(service.endpoint().path(), "/upload");

    let upload = sample_upload();
    let response = service.analyze(upload.clone()).await.expect("analyze");
    assert_eq!(response.is_deepfake, Some(false));
    assert_eq!(response.frames_analyzed, Some(15));
    assert_eq!(
        response.details.and_then(|details| details.symmetry),
        Some(12.0)
    );

    let parts = parts_rx.await.expect("parts");
    assert_eq!(parts.len(), 1);
    let part = &parts[0];
    assert_eq!(part.field, "video");
    assert_eq!(part.file_name.as_deref(), Some("interview.mp4"));
    assert_eq!(part.content_type.as_deref(), Some("video/mp4"));
    assert_eq!(part.bytes, upload.bytes.to_vec());
}

#[tokio::test]
async fn error_body_on_client_error_status_is_returned_as_response() {
    let (server_url, _parts_rx) = spawn_upload_server(
        StatusCode::BAD_REQUEST,
        r#"{"error":"Invalid file type. Allowed: mp4, avi, mov, mkv, webm"}"#,
    )
    .await
    .expect("spawn server");
    let service = HttpAnalysisService::new(&server_url).expect("service");

    let response = service.analyze(sample_upload()).await.expect("analyze");
    assert_eq!(
        response.service_error(),
        Some("Invalid file type. Allowed: mp4, avi, mov, mkv, webm")
    );
}

#[tokio::test]
async fn non_json_error_page_is_a_transport_failure() {
    let (server_url, _parts_rx) =
        spawn_upload_server(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .await
            .expect("spawn server");
    let service = HttpAnalysisService::new(&server_url).expect("service");

    let err = service
        .analyze(sample_upload())
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("502"), "unexpected error: {err}");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = HttpAnalysisService::new(&format!("http://{addr}")).expect("service");
    let err = service
        .analyze(sample_upload())
        .await
        .expect_err("must fail");
    assert!(
        err.to_string().contains("failed to reach analysis service"),
        "unexpected error: {err}"
    );
}

#[test]
fn custom_upload_path_is_joined_onto_server_url() {
    let service = HttpAnalysisService::with_upload_path("http://127.0.0.1:5000", "/api/analyze")
        .expect("service");
    assert_eq!(
        service.endpoint().as_str(),
        "http://127.0.0.1:5000/api/analyze"
    );
}

#[test]
fn rejects_invalid_server_url() {
    assert!(HttpAnalysisService::new("not a url").is_err());
}
