use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{future, SinkExt, StreamExt};

use tinykube_core::protocol::{Heartbeat, StreamFrame};

use super::server::GatewayState;

/// WebSocket upgrade handler for the heartbeat stream.
pub async fn heartbeats_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

/// Decoded view of one inbound message.
#[derive(Debug, PartialEq)]
enum Inbound {
    Heartbeat(Heartbeat),
    /// Anything that does not end the stream but carries no heartbeat.
    Skip,
    /// The agent asked to close, the socket closed, or it failed.
    End,
}

fn decode(msg: Result<Message, axum::Error>) -> Inbound {
    let text = match msg {
        Ok(Message::Text(text)) => text,
        Ok(Message::Close(_)) | Err(_) => return Inbound::End,
        Ok(_) => return Inbound::Skip,
    };

    match serde_json::from_str::<StreamFrame>(text.as_str()) {
        Ok(StreamFrame::Heartbeat(heartbeat)) => Inbound::Heartbeat(heartbeat),
        Ok(StreamFrame::Close) => Inbound::End,
        Err(e) => {
            tracing::warn!("Failed to parse heartbeat frame: {}", e);
            Inbound::Skip
        }
    }
}

/// Service one heartbeat stream, then send the terminal acknowledgement.
async fn handle_socket(socket: WebSocket, peer: SocketAddr, state: Arc<GatewayState>) {
    let (mut ws_sender, ws_receiver) = socket.split();

    let heartbeats = ws_receiver
        .take_until(state.shutdown.clone().cancelled_owned())
        .map(decode)
        .take_while(|inbound| future::ready(*inbound != Inbound::End))
        .filter_map(|inbound| {
            future::ready(match inbound {
                Inbound::Heartbeat(heartbeat) => Some(heartbeat),
                _ => None,
            })
        });

    let ack = state
        .service
        .stream_heartbeats(&peer.to_string(), heartbeats)
        .await;

    // The agent may already be gone; nothing to do if these fail.
    if let Ok(json) = serde_json::to_string(&ack) {
        let _ = ws_sender.send(Message::Text(json.into())).await;
    }
    let _ = ws_sender.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(json: &str) -> Result<Message, axum::Error> {
        Ok(Message::Text(json.to_string().into()))
    }

    #[test]
    fn test_decode_heartbeat() {
        let inbound = decode(text(
            r#"{"type":"heartbeat","node_name":"worker-1","now_unix_ms":5}"#,
        ));
        assert_eq!(inbound, Inbound::Heartbeat(Heartbeat::new("worker-1", 5)));
    }

    #[test]
    fn test_decode_close_frames() {
        assert_eq!(decode(text(r#"{"type":"close"}"#)), Inbound::End);
        assert_eq!(decode(Ok(Message::Close(None))), Inbound::End);
    }

    #[test]
    fn test_decode_socket_error_ends_stream() {
        let err = axum::Error::new(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert_eq!(decode(Err(err)), Inbound::End);
    }

    #[test]
    fn test_decode_skips_garbage() {
        assert_eq!(decode(text("not json")), Inbound::Skip);
        assert_eq!(decode(Ok(Message::Ping(axum::body::Bytes::new()))), Inbound::Skip);
    }
}
