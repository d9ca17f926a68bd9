//! Streaming `/api/chat`: newline-delimited JSON fragments.

use super::client::{ChatRequest, ChatResponse, OllamaClient, TransportError};
use futures::StreamExt;
use tracing::{debug, trace};

impl OllamaClient {
    /// Stream a chat response, handing each content fragment to `on_chunk`.
    ///
    /// Returns the concatenated content once the server reports `done` or
    /// closes the body.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, TransportError> {
        let mut request = request.clone();
        request.stream = true;
        request.tools = None;

        let resp = self
            .http
            .post(self.url("/api/chat"))
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut body = resp.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut full = String::new();

        while let Some(bytes) = body.next().await {
            pending.extend_from_slice(&bytes?);
            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                if feed_line(&line, &mut full, on_chunk) {
                    debug!("Stream finished ({} chars)", full.len());
                    return Ok(full);
                }
            }
        }

        // Last fragment without a trailing newline.
        if !pending.is_empty() {
            feed_line(&pending, &mut full, on_chunk);
        }
        Ok(full)
    }
}

/// Handle one raw line; returns true when the server marked the stream done.
fn feed_line(
    line: &[u8],
    full: &mut String,
    on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
) -> bool {
    let line = String::from_utf8_lossy(line);
    match parse_stream_line(&line) {
        Some(fragment) => {
            let content = fragment.content();
            if !content.is_empty() {
                full.push_str(content);
                on_chunk(content);
            }
            fragment.done
        }
        None => false,
    }
}

/// Parse one NDJSON line. Blank and malformed lines are skipped.
pub fn parse_stream_line(line: &str) -> Option<ChatResponse> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            trace!("Skipping malformed stream line: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_fragment() {
        let fragment =
            parse_stream_line(r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#)
                .unwrap();
        assert_eq!(fragment.content(), "Hel");
        assert!(!fragment.done);
    }

    #[test]
    fn skips_blank_and_garbage_lines() {
        assert!(parse_stream_line("   ").is_none());
        assert!(parse_stream_line("{not json").is_none());
    }

    #[test]
    fn feed_line_accumulates_and_reports_done() {
        let mut full = String::new();
        let mut seen = Vec::new();
        let mut on_chunk = |c: &str| seen.push(c.to_string());

        let done = feed_line(br#"{"message":{"content":"Hi "}}"#, &mut full, &mut on_chunk);
        assert!(!done);
        let done = feed_line(
            br#"{"message":{"content":"there"},"done":true}"#,
            &mut full,
            &mut on_chunk,
        );
        assert!(done);

        assert_eq!(full, "Hi there");
        assert_eq!(seen, vec!["Hi ".to_string(), "there".to_string()]);
    }
}
