use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::sleep;

use rotor_sync::{
    spawn_session, Command, EndpointConfig, LinkState, SessionObserver, SessionState,
};

const RECONNECT: Duration = Duration::from_millis(200);

#[derive(Default)]
struct Observed {
    links: Vec<(LinkState, Instant)>,
    headings: Vec<f64>,
    captured: usize,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Observed>>);

impl SessionObserver for Recorder {
    fn link_changed(&mut self, state: LinkState) {
        self.0.lock().expect("lock").links.push((state, Instant::now()));
    }

    fn snapshot_applied(&mut self, session: &SessionState) {
        let mut observed = self.0.lock().expect("lock");
        if let Some(snapshot) = session.snapshot() {
            observed.headings.extend(snapshot.autopilot.selected_heading);
        }
        observed.captured = session.capture().line_count();
    }
}

impl Recorder {
    async fn wait_until(&self, what: &str, condition: impl Fn(&Observed) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if condition(&*self.0.lock().expect("lock")) {
                return;
            }
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            sleep(Duration::from_millis(10)).await;
        }
    }
}

#[derive(Clone, Default)]
struct Controller {
    connections: Arc<AtomicUsize>,
    recording: Arc<AtomicBool>,
}

async fn send_json(socket: &mut WebSocket, value: Value) -> bool {
    socket.send(WsMessage::Text(value.to_string())).await.is_ok()
}

async fn hold_open(mut socket: WebSocket) {
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn flaky_push(ws: WebSocketUpgrade, State(controller): State<Controller>) -> impl IntoResponse {
    ws.on_upgrade(move |mut socket| async move {
        let attempt = controller.connections.fetch_add(1, Ordering::SeqCst);
        if attempt == 0 {
            send_json(
                &mut socket,
                json!({"sensors": {"cyclicX": 4000}, "autopilot": {"selectedHeading": 10}}),
            )
            .await;
            let _ = socket.send(WsMessage::Text("{oops".into())).await;
            send_json(
                &mut socket,
                json!({"axes": [100, 200, 300], "autopilot": {"selectedHeading": 20}}),
            )
            .await;
            let _ = socket.send(WsMessage::Close(None)).await;
            return;
        }
        send_json(&mut socket, json!({"autopilot": {"selectedHeading": 30}})).await;
        hold_open(socket).await;
    })
}

async fn recording_push(ws: WebSocketUpgrade, State(controller): State<Controller>) -> impl IntoResponse {
    ws.on_upgrade(move |mut socket| async move {
        let mut line = 0u32;
        loop {
            let frame = if controller.recording.load(Ordering::SeqCst) {
                line += 1;
                json!({"sensors": {}, "telemetry": format!("t={}", line - 1)})
            } else {
                json!({"sensors": {}})
            };
            if !send_json(&mut socket, frame).await {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
}

async fn telemetry(State(controller): State<Controller>, Json(body): Json<Value>) -> Json<Value> {
    let enabled = body["enabled"].as_bool().unwrap_or(false);
    controller.recording.store(enabled, Ordering::SeqCst);
    Json(json!({ "enabled": enabled }))
}

async fn start_controller(router: Router<Controller>) -> (SocketAddr, Controller) {
    let controller = Controller::default();
    let router = router
        .route("/api/telemetry", post(telemetry))
        .with_state(controller.clone());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind controller listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    (addr, controller)
}

fn endpoint(addr: SocketAddr) -> EndpointConfig {
    EndpointConfig::new("localhost")
        .expect("config")
        .with_ports(addr.port(), addr.port())
        .with_reconnect_delay(RECONNECT)
}

#[test_timeout::tokio_timeout_test(20)]
async fn session_survives_server_close_and_bad_frames() {
    let (addr, controller) = start_controller(Router::new().route("/", get(flaky_push))).await;
    let recorder = Recorder::default();
    let session = spawn_session(&endpoint(addr), recorder.clone()).expect("session");

    recorder
        .wait_until("second connection", |observed| {
            observed.headings.contains(&30.0)
        })
        .await;

    session.handle.shutdown();
    let state = session.engine.await.expect("engine");
    session.link.await.expect("link task");

    assert_eq!(controller.connections.load(Ordering::SeqCst), 2);
    assert_eq!(state.applied_frames(), 3);
    assert_eq!(state.dropped_frames(), 1);
    assert_eq!(state.link(), LinkState::Open);

    let observed = recorder.0.lock().expect("lock");
    assert_eq!(observed.headings, vec![10.0, 20.0, 30.0]);
    let links: Vec<_> = observed.links.iter().map(|(state, _)| *state).collect();
    assert_eq!(
        links,
        vec![
            LinkState::Open,
            LinkState::Closed,
            LinkState::Connecting,
            LinkState::Open
        ]
    );
    let closed_at = observed.links[1].1;
    let redial_at = observed.links[2].1;
    assert!(redial_at.duration_since(closed_at) >= RECONNECT);
}

#[test_timeout::tokio_timeout_test(20)]
async fn recording_captures_lines_after_acknowledgement() {
    let (addr, _) = start_controller(Router::new().route("/", get(recording_push))).await;
    let recorder = Recorder::default();
    let session = spawn_session(&endpoint(addr), recorder.clone()).expect("session");

    recorder
        .wait_until("open link", |observed| {
            observed.links.iter().any(|(state, _)| *state == LinkState::Open)
        })
        .await;
    assert!(session
        .handle
        .command(Command::SetTelemetryRecording(true)));
    recorder
        .wait_until("captured lines", |observed| observed.captured >= 3)
        .await;

    session.handle.shutdown();
    let state = session.engine.await.expect("engine");

    let contents = state.capture().contents();
    assert!(contents.ends_with('\n'));
    let numbers: Vec<u32> = contents
        .lines()
        .map(|line| {
            line.strip_prefix("t=")
                .and_then(|n| n.parse().ok())
                .unwrap_or_else(|| panic!("unexpected captured line {line:?}"))
        })
        .collect();
    assert!(numbers.len() >= 3);
    assert!(numbers.windows(2).all(|pair| pair[1] == pair[0] + 1));
}
