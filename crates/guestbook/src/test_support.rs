//! In-memory fakes shared by unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::Rgba;

use crate::camera::{CameraDevice, CameraError, StreamRequest, VideoStream};
use crate::entry::{GuestEntry, GuestbookRecord};
use crate::still::Raster;
use crate::transport::{self, GuestbookTransport, TransportError};

#[derive(Debug, Default)]
struct Script {
    deny_next: bool,
    block_next_playback: bool,
    fail_next_frame: bool,
    opened: usize,
    live: usize,
    max_live: usize,
    requests: Vec<StreamRequest>,
}

/// A camera that hands out solid-color frames and counts live streams.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedCamera {
    width: u32,
    height: u32,
    script: Arc<Mutex<Script>>,
}

impl ScriptedCamera {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub(crate) fn deny_next(&self) {
        self.script.lock().unwrap().deny_next = true;
    }

    pub(crate) fn block_next_playback(&self) {
        self.script.lock().unwrap().block_next_playback = true;
    }

    pub(crate) fn fail_next_frame(&self) {
        self.script.lock().unwrap().fail_next_frame = true;
    }

    /// Streams opened and not yet stopped.
    pub(crate) fn live_streams(&self) -> usize {
        self.script.lock().unwrap().live
    }

    pub(crate) fn max_live_streams(&self) -> usize {
        self.script.lock().unwrap().max_live
    }

    /// Successful opens.
    pub(crate) fn opened(&self) -> usize {
        self.script.lock().unwrap().opened
    }

    pub(crate) fn requests(&self) -> Vec<StreamRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl CameraDevice for ScriptedCamera {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(&self, request: StreamRequest) -> Result<Box<dyn VideoStream>, CameraError> {
        let mut script = self.script.lock().unwrap();
        script.requests.push(request);
        if std::mem::take(&mut script.deny_next) {
            return Err(CameraError::PermissionDenied);
        }

        script.opened += 1;
        script.live += 1;
        script.max_live = script.max_live.max(script.live);
        Ok(Box::new(ScriptedStream {
            width: self.width,
            height: self.height,
            stopped: false,
            script: Arc::clone(&self.script),
        }))
    }
}

// No Drop impl: a stream the widget forgets to stop stays counted as live.
struct ScriptedStream {
    width: u32,
    height: u32,
    stopped: bool,
    script: Arc<Mutex<Script>>,
}

#[async_trait]
impl VideoStream for ScriptedStream {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn play(&mut self) -> Result<(), CameraError> {
        if std::mem::take(&mut self.script.lock().unwrap().block_next_playback) {
            return Err(CameraError::PlaybackBlocked("autoplay refused".to_string()));
        }
        Ok(())
    }

    fn grab_frame(&mut self) -> Result<Raster, CameraError> {
        if std::mem::take(&mut self.script.lock().unwrap().fail_next_frame) {
            return Err(CameraError::Frame("no frame decoded yet".to_string()));
        }
        Ok(Raster::filled(
            self.width,
            self.height,
            Rgba([0x20, 0x80, 0xc0, 0xff]),
        ))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.script.lock().unwrap().live -= 1;
        }
    }
}

/// A record the fake backend echoes back.
pub(crate) fn sample_record() -> GuestbookRecord {
    GuestbookRecord {
        id: Some("42".to_string()),
        name: "Jane Doe".to_string(),
        origin: "Acme Corp".to_string(),
        purpose: "IT Staff".to_string(),
        reason: Some("Dropping off hardware".to_string()),
        selfie_image: "/uploads/selfie.png".to_string(),
        signature_image: "/uploads/signature.png".to_string(),
        created_at: Some("2024-05-01T08:30:00+07:00".to_string()),
    }
}

type Reply = Option<Result<GuestbookRecord, TransportError>>;

/// A transport that records every entry and answers from a script.
///
/// With no scripted reply, `submit` never completes.
#[derive(Debug)]
pub(crate) struct RecordingTransport {
    reply: Mutex<Reply>,
    entries: Mutex<Vec<GuestEntry>>,
}

impl RecordingTransport {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply: Mutex::new(reply),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn accepting(record: GuestbookRecord) -> Self {
        Self::with_reply(Some(Ok(record)))
    }

    pub(crate) fn failing(err: TransportError) -> Self {
        Self::with_reply(Some(Err(err)))
    }

    pub(crate) fn pending() -> Self {
        Self::with_reply(None)
    }

    pub(crate) fn respond_with(&self, reply: Result<GuestbookRecord, TransportError>) {
        *self.reply.lock().unwrap() = Some(reply);
    }

    pub(crate) fn calls(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub(crate) fn last_entry(&self) -> Option<GuestEntry> {
        self.entries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GuestbookTransport for RecordingTransport {
    async fn submit(&self, entry: &GuestEntry) -> transport::Result<GuestbookRecord> {
        self.entries.lock().unwrap().push(entry.clone());
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Some(reply) => reply,
            None => std::future::pending().await,
        }
    }
}
