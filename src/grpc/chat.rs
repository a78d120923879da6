use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, warn};

use super::pb::chat_server::Chat;
use super::pb::ChatMessage;

const ROOM_CAPACITY: usize = 256;
const CHANNEL_SIZE: usize = 32;

/// A single chat room shared by every `SendMessage` call.
///
/// Each call subscribes to the room before its response is returned, then
/// relays what the client sends into the room and what the room carries back
/// to the client, the sender's own messages included.
pub struct ChatRoom {
    room: broadcast::Sender<ChatMessage>,
}

impl ChatRoom {
    pub fn new() -> Self {
        let (room, _) = broadcast::channel(ROOM_CAPACITY);
        Self { room }
    }
}

impl Default for ChatRoom {
    fn default() -> Self {
        Self::new()
    }
}

#[tonic::async_trait]
impl Chat for ChatRoom {
    type SendMessageStream = ReceiverStream<Result<ChatMessage, Status>>;

    async fn send_message(
        &self,
        request: Request<Streaming<ChatMessage>>,
    ) -> Result<Response<Self::SendMessageStream>, Status> {
        let mut incoming = request.into_inner();
        let mut listener = self.room.subscribe();
        let room = self.room.clone();
        let (tx, rx) = mpsc::channel(CHANNEL_SIZE);

        tokio::spawn(async move {
            // a client may stop sending and keep listening
            let mut sending = true;
            loop {
                tokio::select! {
                    message = incoming.next(), if sending => match message {
                        Some(Ok(message)) => {
                            debug!(username = %message.username, "Chat message");
                            // we are subscribed ourselves, so there is always a receiver
                            let _ = room.send(message);
                        }
                        Some(Err(status)) => {
                            debug!("Chat client stream failed: {}", status);
                            break;
                        }
                        None => sending = false,
                    },
                    received = listener.recv() => match received {
                        Ok(message) => {
                            if tx.send(Ok(message)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Chat client fell behind, {} messages dropped", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = tx.closed() => break,
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
