//! In-process duplex channel between the host and the render surface.
//!
//! Each direction is an unbounded queue, so one-way messages arrive in send
//! order. Requests carry their own reply slot; the receiving side runs each
//! request on its own task, so replies can complete out of issue order.

use crate::error::{HandlerResult, IpcError};
use crate::message::{Message, Request, RequestName, Response, Side};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

enum Envelope {
    Request {
        body: Request,
        reply: oneshot::Sender<Result<Response, IpcError>>,
    },
    Message(Message),
}

/// Receiving side of a context. Implementations match exhaustively on
/// [`Request`] and [`Message`].
pub trait Handler: Send + Sync + 'static {
    const SIDE: Side;

    fn handle(&self, request: Request) -> impl Future<Output = HandlerResult<Response>> + Send;

    /// Called in arrival order. Errors are logged here and never reach the
    /// sender.
    fn on_message(&self, message: Message) -> HandlerResult<()>;
}

#[derive(Clone)]
pub struct Sender {
    tx: mpsc::UnboundedSender<Envelope>,
    timeout: Duration,
}

pub struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

pub struct Endpoint {
    sender: Sender,
    inbox: Inbox,
}

/// Create a connected pair. Whatever one endpoint sends, the other's inbox
/// receives.
pub fn channel() -> (Endpoint, Endpoint) {
    let (to_first, first_rx) = mpsc::unbounded_channel();
    let (to_second, second_rx) = mpsc::unbounded_channel();
    (
        Endpoint {
            sender: Sender::new(to_second),
            inbox: Inbox { rx: first_rx },
        },
        Endpoint {
            sender: Sender::new(to_first),
            inbox: Inbox { rx: second_rx },
        },
    )
}

impl Endpoint {
    pub fn split(self) -> (Sender, Inbox) {
        (self.sender, self.inbox)
    }
}

impl Sender {
    fn new(tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            tx,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue a request and wait for its reply, bounded by the sender's
    /// timeout. No retry is attempted.
    pub async fn request(&self, request: Request) -> Result<Response, IpcError> {
        let name = request.name();
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(Envelope::Request {
                body: request,
                reply,
            })
            .map_err(|_| IpcError::Disconnected(name))?;

        match tokio::time::timeout(self.timeout, reply_rx).await {
            Err(_) => Err(IpcError::Timeout {
                name,
                after: self.timeout,
            }),
            Ok(Err(_)) => Err(IpcError::Disconnected(name)),
            Ok(Ok(result)) => result,
        }
    }

    /// Send a one-way message. Delivery is at most once; a closed peer is
    /// only logged.
    pub fn send(&self, message: Message) {
        let name = message.name();
        if self.tx.send(Envelope::Message(message)).is_err() {
            log::warn!("dropped '{name}': peer is gone");
        }
    }

    /// Issue a request given in wire form and return the wire-form response.
    pub async fn request_wire(&self, name: &str, payload: Value) -> Result<Value, IpcError> {
        let request = decode_request(name, payload)?;
        let request_name = request.name();
        let response = self.request(request).await?;
        serde_json::to_value(response).map_err(|source| IpcError::Payload {
            name: request_name.to_string(),
            source,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Decode `{name, payload}` into a [`Request`]. Names outside the catalog
/// fail with [`IpcError::NoHandler`]. A `null` or empty-object payload counts
/// as no payload, which is what argument-less requests expect.
pub fn decode_request(name: &str, payload: Value) -> Result<Request, IpcError> {
    if RequestName::parse(name).is_none() {
        return Err(IpcError::NoHandler(name.to_string()));
    }

    let mut wire = serde_json::Map::new();
    wire.insert("name".to_string(), Value::String(name.to_string()));
    let empty = match &payload {
        Value::Null => true,
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    };
    if !empty {
        wire.insert("payload".to_string(), payload);
    }

    serde_json::from_value(Value::Object(wire)).map_err(|source| IpcError::Payload {
        name: name.to_string(),
        source,
    })
}

impl Inbox {
    /// Drive the handler until every sender for this inbox is dropped.
    pub async fn serve<H: Handler>(mut self, handler: Arc<H>) {
        while let Some(envelope) = self.rx.recv().await {
            match envelope {
                Envelope::Request { body, reply } => {
                    let name = body.name();
                    if name.target() != H::SIDE {
                        log::warn!("{:?} received '{name}', which it does not serve", H::SIDE);
                        let _ = reply.send(Err(IpcError::NoHandler(name.to_string())));
                        continue;
                    }

                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        let result = handler
                            .handle(body)
                            .await
                            .map_err(|message| IpcError::Handler { name, message });
                        if let Err(e) = &result {
                            log::debug!("'{name}' failed: {e}");
                        }
                        if reply.send(result).is_err() {
                            log::debug!("caller of '{name}' went away before the reply");
                        }
                    });
                }
                Envelope::Message(message) => {
                    let name = message.name();
                    if let Err(e) = handler.on_message(message) {
                        log::error!("'{name}' handler failed: {e}");
                    }
                }
            }
        }
        log::debug!("{:?} inbox closed", H::SIDE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FileContent;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct EchoHost {
        messages: Mutex<Vec<Message>>,
        gate: Notify,
    }

    impl Handler for EchoHost {
        const SIDE: Side = Side::Host;

        async fn handle(&self, request: Request) -> HandlerResult<Response> {
            match request {
                Request::ReadFile { path } if path == "slow.md" => {
                    self.gate.notified().await;
                    Ok(Response::Unit)
                }
                Request::ReadFile { path } if path == "hang.md" => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Response::Unit)
                }
                Request::ReadFile { path } => Ok(Response::File(FileContent {
                    content: format!("contents of {path}"),
                    canonical_path: PathBuf::from("/docs").join(&path),
                    directory: PathBuf::from("/docs"),
                })),
                Request::CopyToClipboard { .. } => Err("clipboard unavailable".to_string()),
                _ => Ok(Response::Unit),
            }
        }

        fn on_message(&self, message: Message) -> HandlerResult<()> {
            if let Message::ShowError { message } = &message {
                return Err(format!("refusing {message}"));
            }
            self.messages
                .lock()
                .expect("messages lock")
                .push(message);
            Ok(())
        }
    }

    fn start() -> (Sender, Arc<EchoHost>) {
        let (host, surface) = channel();
        let (_host_sender, host_inbox) = host.split();
        let (surface_sender, _surface_inbox) = surface.split();
        let handler = Arc::new(EchoHost::default());
        tokio::spawn(host_inbox.serve(Arc::clone(&handler)));
        (surface_sender, handler)
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let (sender, _) = start();
        let response = sender
            .request(Request::ReadFile {
                path: "a.md".to_string(),
            })
            .await
            .expect("response");
        match response {
            Response::File(file) => assert_eq!(file.content, "contents of a.md"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handler_error_reaches_caller() {
        let (sender, _) = start();
        let err = sender
            .request(Request::CopyToClipboard {
                text: "x".to_string(),
            })
            .await
            .expect_err("handler error");
        assert!(matches!(err, IpcError::Handler { name: RequestName::CopyToClipboard, .. }));
        assert_eq!(err.user_message(), "clipboard unavailable");
    }

    #[tokio::test]
    async fn test_wrong_side_has_no_handler() {
        let (sender, _) = start();
        let err = sender.request(Request::ExportPdf).await.expect_err("no handler");
        assert!(matches!(err, IpcError::NoHandler(name) if name == "exportPDF"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_times_out() {
        let (sender, _) = start();
        let sender = sender.with_timeout(Duration::from_secs(2));
        let err = sender
            .request(Request::ReadFile {
                path: "hang.md".to_string(),
            })
            .await
            .expect_err("timeout");
        assert!(matches!(err, IpcError::Timeout { name: RequestName::ReadFile, .. }));
    }

    #[tokio::test]
    async fn test_replies_may_complete_out_of_order() {
        let (sender, handler) = start();

        let slow_sender = sender.clone();
        let slow = tokio::spawn(async move {
            slow_sender
                .request(Request::ReadFile {
                    path: "slow.md".to_string(),
                })
                .await
        });
        tokio::task::yield_now().await;

        let fast = sender
            .request(Request::ReadFile {
                path: "fast.md".to_string(),
            })
            .await;
        assert!(fast.is_ok());
        assert!(!slow.is_finished());

        handler.gate.notify_one();
        let slow = slow.await.expect("join");
        assert!(matches!(slow, Ok(Response::Unit)));
    }

    #[tokio::test]
    async fn test_messages_arrive_in_send_order() {
        let (sender, handler) = start();
        for title in ["one", "two", "three"] {
            sender.send(Message::SetWindowTitle {
                title: title.to_string(),
            });
        }
        sender.send(Message::ShowError {
            message: "boom".to_string(),
        });
        // A request behind the messages flushes them through the inbox.
        sender.request(Request::GetSavedFont).await.expect("flush");

        let messages = handler.messages.lock().expect("messages lock");
        let titles: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                Message::SetWindowTitle { title } => Some(title.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(titles, ["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_closed_peer_disconnects_request() {
        let (host, surface) = channel();
        drop(host);
        let (sender, _inbox) = surface.split();
        let err = sender
            .request(Request::GetInitialFile)
            .await
            .expect_err("disconnected");
        assert!(matches!(err, IpcError::Disconnected(RequestName::GetInitialFile)));
    }

    #[test]
    fn test_decode_request_rejects_unknown_name() {
        let err = decode_request("rmRf", json!({})).expect_err("unknown");
        assert!(matches!(err, IpcError::NoHandler(name) if name == "rmRf"));
    }

    #[test]
    fn test_decode_request_reads_payload() {
        let request = decode_request("saveSize", json!({ "size": 18 })).expect("decode");
        assert_eq!(
            request,
            Request::SaveSize {
                size: crate::Size::new(18)
            }
        );
        let request = decode_request("getInitialFile", Value::Null).expect("decode");
        assert_eq!(request, Request::GetInitialFile);
    }

    #[test]
    fn test_decode_request_accepts_empty_object_for_unit_requests() {
        for (name, expected) in [
            ("getInitialFile", Request::GetInitialFile),
            ("showOpenDialog", Request::ShowOpenDialog),
            ("isMdAssociated", Request::IsMdAssociated),
            ("getSavedFont", Request::GetSavedFont),
            ("getSavedSize", Request::GetSavedSize),
            ("exportPDF", Request::ExportPdf),
        ] {
            let request = decode_request(name, json!({})).expect(name);
            assert_eq!(request, expected);
        }
        // Requests that need arguments still reject an empty payload.
        let err = decode_request("readFile", json!({})).expect_err("missing path");
        assert!(matches!(err, IpcError::Payload { .. }));
    }

    #[test]
    fn test_decode_request_reports_bad_payload() {
        let err = decode_request("readFile", json!({ "nope": 1 })).expect_err("bad payload");
        assert!(matches!(err, IpcError::Payload { .. }));
    }
}
