//! Message codec for IPC framing

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::messages::{ClientMessage, ServerMessage};

/// Maximum message size (1 MB)
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Codec for ClientMessage (encoding) and ServerMessage (decoding)
/// Used by the recording client
pub struct ClientCodec;

impl ClientCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ClientCodec {
    type Item = ServerMessage;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src)
    }
}

impl Encoder<ClientMessage> for ClientCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ClientMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst)
    }
}

/// Codec for ServerMessage (encoding) and ClientMessage (decoding)
/// Used by the detection service
pub struct ServerCodec;

impl ServerCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = ClientMessage;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src)
    }
}

impl Encoder<ServerMessage> for ServerCodec {
    type Error = CodecError;

    fn encode(&mut self, item: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, dst)
    }
}

/// Decode a length-prefixed message
fn decode_message<T: serde::de::DeserializeOwned>(
    src: &mut BytesMut,
) -> Result<Option<T>, CodecError> {
    // Need at least 4 bytes for length prefix
    if src.len() < 4 {
        return Ok(None);
    }

    // Peek at length without consuming
    let len = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

    // Validate message size
    if len > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    // Check if we have the full message
    if src.len() < 4 + len {
        // Reserve space for the rest of the message
        src.reserve(4 + len - src.len());
        return Ok(None);
    }

    // Consume length prefix
    src.advance(4);

    // Extract message bytes
    let data = src.split_to(len);

    // Deserialize
    let msg: T = bincode::deserialize(&data)?;
    Ok(Some(msg))
}

/// Encode a length-prefixed message
fn encode_message<T: serde::Serialize>(item: &T, dst: &mut BytesMut) -> Result<(), CodecError> {
    let data = bincode::serialize(item)?;

    if data.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            size: data.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    dst.reserve(4 + data.len());
    dst.put_u32(data.len() as u32);
    dst.put_slice(&data);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ErrorCode;
    use crate::types::WirePattern;
    use uuid::Uuid;

    fn wire() -> WirePattern {
        WirePattern {
            sides: vec![1, 1, 4],
            pauses: vec![225_158_691, 222_741_885],
        }
    }

    #[test]
    fn test_client_message_roundtrip() {
        let mut codec = ClientCodec::new();
        let mut server_codec = ServerCodec::new();

        let msg = ClientMessage::Connect {
            client_id: Uuid::new_v4(),
            protocol_version: 1,
        };

        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();

        let decoded = server_codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_server_message_roundtrip() {
        let mut codec = ServerCodec::new();
        let mut client_codec = ClientCodec::new();

        let msg = ServerMessage::Match {
            subscription_id: 3,
            pattern: wire(),
        };

        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();

        let decoded = client_codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_partial_message() {
        let mut codec = ClientCodec::new();
        let mut server_codec = ServerCodec::new();

        let msg = ClientMessage::WatchForMatch {
            subscription_id: 1,
            pattern: wire(),
        };

        let mut buf = BytesMut::new();
        codec.encode(msg, &mut buf).unwrap();

        // Split buffer to simulate partial read
        let mut partial = buf.split_to(6);

        // Should return None for partial message
        assert!(server_codec.decode(&mut partial).unwrap().is_none());

        // Add rest of message
        partial.unsplit(buf);

        // Now should decode
        assert!(server_codec.decode(&mut partial).unwrap().is_some());
    }

    #[test]
    fn test_two_messages_in_one_buffer() {
        let mut codec = ServerCodec::new();
        let mut client_codec = ClientCodec::new();

        let mut buf = BytesMut::new();
        codec.encode(ServerMessage::Pong, &mut buf).unwrap();
        codec.encode(ServerMessage::Unsubscribed, &mut buf).unwrap();

        assert_eq!(
            client_codec.decode(&mut buf).unwrap(),
            Some(ServerMessage::Pong)
        );
        assert_eq!(
            client_codec.decode(&mut buf).unwrap(),
            Some(ServerMessage::Unsubscribed)
        );
        assert!(client_codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_message_too_large_on_decode() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();

        // Write a length that exceeds MAX_MESSAGE_SIZE
        let huge_size: u32 = (MAX_MESSAGE_SIZE + 1) as u32;
        buf.put_u32(huge_size);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::MessageTooLarge { .. })));
    }

    #[test]
    fn test_garbage_body_is_an_error() {
        let mut codec = ServerCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(4);
        buf.put_slice(&[0xff, 0xff, 0xff, 0xff]);

        assert!(matches!(codec.decode(&mut buf), Err(CodecError::Bincode(_))));
    }

    #[test]
    fn test_all_client_message_variants() {
        let mut codec = ClientCodec::new();
        let mut server_codec = ServerCodec::new();

        let messages = vec![
            ClientMessage::Connect {
                client_id: Uuid::new_v4(),
                protocol_version: 1,
            },
            ClientMessage::BeginRecording {
                from_timestamp: 1_000,
            },
            ClientMessage::RequestTapsInWindow {
                from_timestamp: 1_000,
                until_timestamp: 9_000,
            },
            ClientMessage::WatchForMatch {
                subscription_id: 2,
                pattern: WirePattern::default(),
            },
            ClientMessage::Unsubscribe,
            ClientMessage::Ping,
        ];

        for msg in messages {
            let mut buf = BytesMut::new();
            codec.encode(msg.clone(), &mut buf).unwrap();
            let decoded = server_codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(msg, decoded);
        }
    }

    #[test]
    fn test_all_server_message_variants() {
        let mut codec = ServerCodec::new();
        let mut client_codec = ClientCodec::new();

        let messages = vec![
            ServerMessage::Connected {
                server_version: "0.1.0".to_string(),
                protocol_version: 1,
            },
            ServerMessage::RecordingStarted {
                from_timestamp: 1_000,
            },
            ServerMessage::TapsInWindow { pattern: wire() },
            ServerMessage::Watching { subscription_id: 2 },
            ServerMessage::Match {
                subscription_id: 2,
                pattern: wire(),
            },
            ServerMessage::Unsubscribed,
            ServerMessage::Error {
                code: ErrorCode::MalformedPattern,
                message: "bad".to_string(),
            },
            ServerMessage::Pong,
        ];

        for msg in messages {
            let mut buf = BytesMut::new();
            codec.encode(msg.clone(), &mut buf).unwrap();
            let decoded = client_codec.decode(&mut buf).unwrap().unwrap();
            assert_eq!(msg, decoded);
        }
    }
}
