//! [`FrameChannel`] over an axum WebSocket.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use wskeyid_handshake::{Frame, FrameChannel, TransportError};

pub struct WsChannel {
    socket: WebSocket,
}

impl WsChannel {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }

    /// Send a close frame. Errors are ignored; the peer may already be gone.
    pub async fn close(mut self, code: u16, reason: &'static str) {
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };
        let _ = self.socket.send(Message::Close(Some(frame))).await;
    }
}

impl FrameChannel for WsChannel {
    async fn recv(&mut self) -> Result<Frame, TransportError> {
        match self.socket.recv().await {
            Some(Ok(message)) => into_frame(message),
            Some(Err(e)) => Err(TransportError::other(e)),
            None => Err(TransportError::Closed),
        }
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        self.socket
            .send(into_message(frame))
            .await
            .map_err(TransportError::other)
    }
}

fn into_frame(message: Message) -> Result<Frame, TransportError> {
    Ok(match message {
        Message::Text(text) => Frame::Text(text.to_string()),
        Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
        Message::Ping(bytes) => Frame::Ping(bytes.to_vec()),
        Message::Pong(bytes) => Frame::Pong(bytes.to_vec()),
        Message::Close(_) => return Err(TransportError::Closed),
    })
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
        Frame::Ping(bytes) => Message::Ping(bytes.into()),
        Frame::Pong(bytes) => Message::Pong(bytes.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_mapping() {
        let frame = into_frame(Message::Text("{\"type\":\"X\"}".into())).unwrap();
        assert_eq!(frame, Frame::Text("{\"type\":\"X\"}".into()));

        let frame = into_frame(Message::Binary(vec![1, 2, 3].into())).unwrap();
        assert_eq!(frame.data(), Some(&[1u8, 2, 3][..]));

        assert!(matches!(
            into_frame(Message::Close(None)),
            Err(TransportError::Closed)
        ));

        match into_message(Frame::Text("hi".into())) {
            Message::Text(text) => assert_eq!(text.as_str(), "hi"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            into_message(Frame::Pong(vec![9])),
            Message::Pong(bytes) if bytes[..] == [9u8]
        ));
    }
}
