//! Joystick WebSocket session
//!
//! One session per connected touch client. The client streams its touch and
//! pointer events plus the on-screen rectangle of the joystick base; the
//! session runs them through a [`Joystick`] and turns the resulting vectors
//! into D-pad presses on the selected device.
//!
//! All joystick work is synchronous inside [`JoystickSession`]; the async
//! loop in [`run`] only moves frames and keys around.

use axum::extract::ws::{Message, WebSocket};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, JoystickConfig, NavigationConfig};
use crate::devices::DeviceRegistry;
use crate::input::{InputEvent, Phase, TouchPoint};
use crate::joystick::{Joystick, JoystickError, JoystickHost, JoystickListener, Rect, StickVector};
use crate::mapping::{DPadDirection, MediaAction, NavButton, NavigationMapper, RemoteKey};

/// How often held directions are checked for auto-repeat
const TICK_INTERVAL: Duration = Duration::from_millis(25);

/// Frame sent by the touch client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Current bounding box of the joystick base, client pixels
    Layout { rect: Rect },
    TouchStart { touches: Vec<TouchPoint> },
    TouchMove { touches: Vec<TouchPoint> },
    TouchEnd { touches: Vec<TouchPoint> },
    TouchCancel { touches: Vec<TouchPoint> },
    PointerDown { id: i64, x: f64, y: f64 },
    PointerMove { id: i64, x: f64, y: f64 },
    PointerUp { id: i64, x: f64, y: f64 },
    PointerCancel { id: i64, x: f64, y: f64 },
    /// D-pad widget press
    Dpad { direction: DPadDirection },
    /// Media bar press
    Media { action: MediaAction },
    /// Navigation row press
    Nav { button: NavButton },
}

impl ClientMessage {
    /// The input event carried by this frame (None for layout and button frames)
    pub fn into_input(self) -> Option<InputEvent> {
        let event = match self {
            ClientMessage::Layout { .. }
            | ClientMessage::Dpad { .. }
            | ClientMessage::Media { .. }
            | ClientMessage::Nav { .. } => return None,
            ClientMessage::TouchStart { touches } => InputEvent::new(Phase::Start, touches),
            ClientMessage::TouchMove { touches } => InputEvent::new(Phase::Move, touches),
            ClientMessage::TouchEnd { touches } => InputEvent::new(Phase::End, touches),
            ClientMessage::TouchCancel { touches } => InputEvent::new(Phase::Cancel, touches),
            ClientMessage::PointerDown { id, x, y } => InputEvent::pointer(Phase::Start, id, x, y),
            ClientMessage::PointerMove { id, x, y } => InputEvent::pointer(Phase::Move, id, x, y),
            ClientMessage::PointerUp { id, x, y } => InputEvent::pointer(Phase::End, id, x, y),
            ClientMessage::PointerCancel { id, x, y } => {
                InputEvent::pointer(Phase::Cancel, id, x, y)
            }
        };
        Some(event)
    }
}

/// Frame sent back to the touch client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionFeedback {
    /// Emitted joystick vector, for drawing the knob
    Vector { x: f64, y: f64 },
    Stop,
    /// A key was dispatched to the device
    Key { key: RemoteKey },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid message: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Joystick settings captured when a session opens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub joystick: JoystickConfig,
    pub navigation: NavigationConfig,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            joystick: config.joystick,
            navigation: config.navigation,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Remote view of the joystick element.
///
/// Moves and ends are only routed to the joystick while a gesture holds the
/// capture, mirroring document-level listeners that exist only for the
/// duration of a gesture.
#[derive(Debug)]
struct SessionSurface {
    rect: Rect,
    capturing: bool,
}

impl JoystickHost for SessionSurface {
    fn bounds(&self) -> Rect {
        self.rect
    }

    fn begin_capture(&mut self) {
        self.capturing = true;
    }

    fn end_capture(&mut self) {
        self.capturing = false;
    }
}

/// Forwards joystick output to the navigation mapper and queues feedback
#[derive(Debug)]
struct SessionListener {
    mapper: NavigationMapper,
    outbox: Vec<SessionFeedback>,
}

impl JoystickListener for SessionListener {
    fn on_move(&mut self, vector: StickVector) {
        self.outbox.push(SessionFeedback::Vector {
            x: vector.x,
            y: vector.y,
        });
        self.mapper.on_move(vector);
    }

    fn on_stop(&mut self) {
        self.outbox.push(SessionFeedback::Stop);
        self.mapper.on_stop();
    }
}

/// Result of feeding one frame to a session
#[derive(Debug, Default, PartialEq)]
pub struct SessionOutput {
    pub feedback: Vec<SessionFeedback>,
    /// Keys due for dispatch, in order
    pub keys: Vec<RemoteKey>,
}

/// Synchronous joystick state of one client connection
pub struct JoystickSession {
    joystick: Joystick<SessionSurface, SessionListener>,
}

impl JoystickSession {
    pub fn new(settings: &SessionSettings) -> Result<Self, JoystickError> {
        let size = settings.joystick.size;
        let surface = SessionSurface {
            // Until the client reports its layout, assume the base sits at the origin
            rect: Rect::new(0.0, 0.0, size, size),
            capturing: false,
        };
        let listener = SessionListener {
            mapper: NavigationMapper::new(&settings.navigation),
            outbox: Vec::new(),
        };

        Ok(Self {
            joystick: Joystick::new(&settings.joystick, surface, listener)?,
        })
    }

    /// Parse and apply one text frame
    pub fn handle_text(&mut self, text: &str, now: Instant) -> Result<SessionOutput, MessageError> {
        let message: ClientMessage = serde_json::from_str(text)?;
        Ok(self.handle_message(message, now))
    }

    pub fn handle_message(&mut self, message: ClientMessage, now: Instant) -> SessionOutput {
        let mut keys = Vec::new();

        match message {
            ClientMessage::Layout { rect } => {
                debug!("Joystick layout {:?}", rect);
                self.joystick.host_mut().rect = rect;
            }
            ClientMessage::Dpad { direction } => keys.push(direction.into()),
            ClientMessage::Media { action } => keys.push(action.into()),
            ClientMessage::Nav { button } => keys.push(button.into()),
            other => {
                if let Some(event) = other.into_input() {
                    self.route(&event);
                }
            }
        }

        keys.extend(self.joystick.listener_mut().mapper.poll(now));

        SessionOutput {
            feedback: std::mem::take(&mut self.joystick.listener_mut().outbox),
            keys,
        }
    }

    /// Auto-repeat check between frames
    pub fn tick(&mut self, now: Instant) -> Option<RemoteKey> {
        self.joystick.listener_mut().mapper.poll(now)
    }

    /// Tear the joystick down, returning the final feedback (a stop if a
    /// gesture was still active)
    pub fn close(&mut self) -> Vec<SessionFeedback> {
        self.joystick.teardown();
        std::mem::take(&mut self.joystick.listener_mut().outbox)
    }

    pub fn is_active(&self) -> bool {
        self.joystick.is_active()
    }

    fn route(&mut self, event: &InputEvent) {
        if event.phase != Phase::Start && !self.joystick.host().capturing {
            return;
        }
        self.joystick.handle(event);
    }
}

/// Drive one WebSocket connection until the client goes away
pub async fn run(
    mut socket: WebSocket,
    devices: Arc<DeviceRegistry>,
    ip: String,
    settings: SessionSettings,
) {
    let mut session = match JoystickSession::new(&settings) {
        Ok(session) => session,
        Err(e) => {
            warn!("Cannot open joystick session for {}: {}", ip, e);
            let _ = send_feedback(&mut socket, &SessionFeedback::Error { message: e.to_string() }).await;
            return;
        }
    };

    info!("🕹️  Joystick session opened for {}", ip);

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(key) = session.tick(Instant::now()) {
                    if !dispatch_key(&mut socket, &devices, &ip, key).await {
                        break;
                    }
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        let output = match session.handle_text(&text, Instant::now()) {
                            Ok(output) => output,
                            Err(e) => {
                                debug!("Rejected frame from client: {}", e);
                                SessionOutput {
                                    feedback: vec![SessionFeedback::Error { message: e.to_string() }],
                                    keys: Vec::new(),
                                }
                            }
                        };

                        if !deliver(&mut socket, &devices, &ip, output).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary and pong frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    session.close();
    info!("🕹️  Joystick session closed for {}", ip);
}

/// Send feedback frames, then dispatch the keys. Returns false once the socket is gone.
async fn deliver(
    socket: &mut WebSocket,
    devices: &DeviceRegistry,
    ip: &str,
    output: SessionOutput,
) -> bool {
    for feedback in &output.feedback {
        if !send_feedback(socket, feedback).await {
            return false;
        }
    }

    for key in output.keys {
        if !dispatch_key(socket, devices, ip, key).await {
            return false;
        }
    }

    true
}

async fn dispatch_key(socket: &mut WebSocket, devices: &DeviceRegistry, ip: &str, key: RemoteKey) -> bool {
    let feedback = match devices.send_key(ip, key).await {
        Ok(()) => SessionFeedback::Key { key },
        Err(e) => {
            warn!("Joystick key {} for {} failed: {}", key, ip, e);
            SessionFeedback::Error { message: e.to_string() }
        }
    };
    send_feedback(socket, &feedback).await
}

async fn send_feedback(socket: &mut WebSocket, feedback: &SessionFeedback) -> bool {
    let text = match serde_json::to_string(feedback) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to encode session feedback: {}", e);
            return true;
        }
    };

    socket.send(Message::Text(text.into())).await.is_ok()
}
