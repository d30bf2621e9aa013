//! HTTP streaming client for the completion endpoint
//!
//! POSTs the conversation as `{"messages": [...]}` and exposes the
//! streamed plain-text response body as a sequence of decoded fragments
//! in arrival order.

use crate::config::ProviderConfig;
use crate::error::{ParlanceError, Result};
use crate::provider::{CompletionClient, FragmentStream, OutboundMessage};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Canned reply synthesized locally when a message carries image content.
/// The endpoint is never contacted in that case.
pub const IMAGE_UNSUPPORTED_NOTICE: &str = "I'm a text-based AI and cannot process images directly. \
However, you can describe the image to me, and I'll do my best to help! For example, you can say \
'This is a photo of a sunset over mountains' and I'll respond based on your description.";

/// Request body for the completion endpoint
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [OutboundMessage],
}

/// HTTP implementation of [`CompletionClient`]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
}

impl HttpCompletionClient {
    /// Create a new client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("parlance/0.2.0")
            .build()
            .map_err(|e| ParlanceError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn stream_completion(&self, messages: &[OutboundMessage]) -> Result<FragmentStream> {
        if messages.iter().any(|m| m.content.has_image()) {
            tracing::debug!("image content detected, synthesizing local reply");
            return Ok(Box::pin(futures::stream::once(async {
                Ok(IMAGE_UNSUPPORTED_NOTICE.to_string())
            })));
        }

        tracing::debug!(endpoint = %self.endpoint, count = messages.len(), "sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { messages })
            .send()
            .await
            .map_err(|e| ParlanceError::Provider(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ParlanceError::Provider(format!(
                "Completion endpoint returned {}",
                status
            ))
            .into());
        }

        Ok(decode_fragments(response.bytes_stream()))
    }
}

/// Decode a byte stream into text fragments in arrival order
///
/// Partial UTF-8 sequences at chunk boundaries are carried over to the
/// next chunk rather than emitted as replacement characters.
fn decode_fragments<S>(byte_stream: S) -> FragmentStream
where
    S: futures::Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
{
    let stream = byte_stream
        .scan(Vec::new(), |pending: &mut Vec<u8>, chunk| {
            let item = match chunk {
                Ok(bytes) => {
                    pending.extend_from_slice(&bytes);
                    let text = take_decoded(pending);
                    if text.is_empty() {
                        None
                    } else {
                        Some(Ok(text))
                    }
                }
                Err(e) => Some(Err(
                    ParlanceError::Provider(format!("Stream read failed: {}", e)).into(),
                )),
            };
            futures::future::ready(Some(item))
        })
        .filter_map(futures::future::ready);

    Box::pin(stream)
}

/// Drain the decodable prefix of `buf`, leaving any incomplete trailing
/// UTF-8 sequence in place. Invalid byte sequences become replacement
/// characters so a bad chunk cannot wedge the stream.
fn take_decoded(buf: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(buf) {
            Ok(s) => {
                out.push_str(s);
                buf.clear();
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&buf[..valid]));
                match e.error_len() {
                    Some(len) => {
                        out.push('\u{FFFD}');
                        buf.drain(..valid + len);
                    }
                    None => {
                        // Incomplete sequence at the tail: keep for next chunk.
                        buf.drain(..valid);
                        break;
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_decoded_handles_complete_utf8() {
        let mut buf = "Hello, world".as_bytes().to_vec();
        assert_eq!(take_decoded(&mut buf), "Hello, world");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_take_decoded_carries_partial_sequence() {
        // "é" is 0xC3 0xA9; split it across chunks.
        let mut buf = vec![b'h', b'i', 0xC3];
        assert_eq!(take_decoded(&mut buf), "hi");
        assert_eq!(buf, vec![0xC3]);

        buf.push(0xA9);
        assert_eq!(take_decoded(&mut buf), "é");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_take_decoded_replaces_invalid_bytes() {
        let mut buf = vec![b'a', 0xFF, b'b'];
        let out = take_decoded(&mut buf);
        assert_eq!(out, "a\u{FFFD}b");
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_decode_fragments_preserves_arrival_order() {
        let chunks: Vec<reqwest::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"Hel")),
            Ok(Bytes::from_static(b"lo, ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let mut stream = decode_fragments(futures::stream::iter(chunks));

        let mut collected = String::new();
        while let Some(fragment) = stream.next().await {
            collected.push_str(&fragment.unwrap());
        }
        assert_eq!(collected, "Hello, world");
    }

    #[tokio::test]
    async fn test_image_message_short_circuits_without_network() {
        // Endpoint is unroutable; any network attempt would fail loudly.
        let config = ProviderConfig {
            endpoint: "http://192.0.2.1:1/chat".to_string(),
            timeout_seconds: 1,
        };
        let client = HttpCompletionClient::new(&config).unwrap();

        let messages = vec![OutboundMessage {
            role: "user".to_string(),
            content: crate::provider::OutboundContent::Rich {
                text: None,
                image: Some("data:image/png;base64,xyz".to_string()),
            },
        }];

        let mut stream = client.stream_completion(&messages).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, IMAGE_UNSUPPORTED_NOTICE);
        assert!(stream.next().await.is_none());
    }
}
