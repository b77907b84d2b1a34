// Shared fakes for integration tests: a local guest book API and a camera.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Multipart, State};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use guestbook::camera::{CameraDevice, CameraError, StreamRequest, VideoStream};
use guestbook::still::Raster;
use image::Rgba;
use reqwest::Url;
use serde_json::Value;

// One multipart part as received by the server.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ReceivedPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

// One request as received by the server.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: Method,
    pub path: String,
    pub parts: Vec<ReceivedPart>,
}

impl ReceivedRequest {
    pub fn part(&self, name: &str) -> Option<&ReceivedPart> {
        self.parts.iter().find(|part| part.name == name)
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|part| part.name.as_str()).collect()
    }
}

#[derive(Clone)]
struct ApiState {
    status: StatusCode,
    body: Value,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

// A guest book API bound to an ephemeral port that answers every request
// with a fixed status and JSON body.
pub struct FakeApi {
    base_url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl FakeApi {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ApiState {
            status,
            body,
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/api/public/guestbook", post(record_submission))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral test port");
        let addr = listener.local_addr().expect("get local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server failed");
        });

        Self {
            base_url: format!("http://{addr}/api"),
            requests,
        }
    }

    // Base URL to configure the client with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("{}/public/guestbook", self.base_url)).expect("valid endpoint")
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record_submission(
    State(state): State<ApiState>,
    method: Method,
    uri: axum::http::Uri,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.expect("field bytes").to_vec();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }

    state.requests.lock().unwrap().push(ReceivedRequest {
        method,
        path: uri.path().to_string(),
        parts,
    });
    (state.status, Json(state.body))
}

// The backend echoes the stored entry inside a `data` envelope.
pub fn accepted_body(purpose: &str) -> Value {
    serde_json::json!({
        "data": {
            "id": 101,
            "name": "Jane Doe",
            "origin": "Acme Corp",
            "purpose": purpose,
            "reason": "Dropping off hardware",
            "selfie_image": "/uploads/guestbook/selfie.png",
            "signature_image": "/uploads/guestbook/signature.png",
            "created_at": "2024-05-01T08:30:00Z"
        },
        "message": "Guest book created"
    })
}

#[derive(Default)]
struct CameraCounters {
    opened: usize,
    live: usize,
}

// A camera producing solid frames, counting streams that were never stopped.
#[derive(Clone, Default)]
pub struct FakeCamera {
    counters: Arc<Mutex<CameraCounters>>,
}

impl FakeCamera {
    pub fn live_streams(&self) -> usize {
        self.counters.lock().unwrap().live
    }

    pub fn opened(&self) -> usize {
        self.counters.lock().unwrap().opened
    }
}

#[async_trait]
impl CameraDevice for FakeCamera {
    fn name(&self) -> &str {
        "fake"
    }

    async fn open(&self, request: StreamRequest) -> Result<Box<dyn VideoStream>, CameraError> {
        assert_eq!(request, StreamRequest::selfie());
        let mut counters = self.counters.lock().unwrap();
        counters.opened += 1;
        counters.live += 1;
        Ok(Box::new(FakeStream {
            counters: Arc::clone(&self.counters),
            stopped: false,
        }))
    }
}

struct FakeStream {
    counters: Arc<Mutex<CameraCounters>>,
    stopped: bool,
}

#[async_trait]
impl VideoStream for FakeStream {
    fn resolution(&self) -> (u32, u32) {
        (32, 24)
    }

    async fn play(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    fn grab_frame(&mut self) -> Result<Raster, CameraError> {
        Ok(Raster::filled(32, 24, Rgba([0x90, 0x60, 0x30, 0xff])))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.lock().unwrap().live -= 1;
        }
    }
}
