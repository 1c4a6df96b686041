use crate::core::error::TchatError;
use crate::providers::{Fragment, FragmentStream};
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, trace};

/// Turns the lines of a server-sent-event body into fragments.
pub trait StreamDecoder: Send + 'static {
    fn decode_line(&mut self, line: &str) -> Result<Vec<Fragment>, TchatError>;

    /// True once the provider has signalled end-of-turn.
    fn is_done(&self) -> bool {
        false
    }

    /// Flush anything still buffered when the body ends.
    fn finish(&mut self) -> Result<Vec<Fragment>, TchatError> {
        Ok(Vec::new())
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    auth_header: Option<(String, String)>,
    extra_headers: HashMap<String, String>,
    query_params: Vec<(String, String)>,
}

impl HttpClient {
    pub fn new(
        client: Client,
        base_url: String,
        auth_header: Option<(String, String)>,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            extra_headers: extra_headers.unwrap_or_default(),
            query_params: Vec::new(),
        }
    }

    pub fn add_query_param(&mut self, key: &str, value: String) {
        self.query_params.push((key.to_string(), value));
    }

    /// POST a JSON payload. Non-2xx responses become `TchatError::Provider`
    /// carrying the status and the response body.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Response, TchatError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "provider request");

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .query(&self.query_params);

        if let Some((key, value)) = &self.auth_header {
            request = request.header(key, value);
        }
        for (key, value) in &self.extra_headers {
            request = request.header(key, value);
        }

        let response = request.json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TchatError::Provider(format!(
                "{} returned {}: {}",
                path,
                status,
                body.trim()
            )));
        }
        Ok(response)
    }

    /// Decode a streamed response on a producer task. The returned stream
    /// reads from a channel of capacity one, so the producer never runs more
    /// than one fragment ahead of the consumer.
    pub fn stream_response<D: StreamDecoder>(&self, response: Response, decoder: D) -> FragmentStream {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(produce_fragments(response, decoder, tx));
        ReceiverStream::new(rx).boxed()
    }
}

type FragmentSender = mpsc::Sender<Result<Fragment, TchatError>>;

async fn produce_fragments<D: StreamDecoder>(response: Response, mut decoder: D, tx: FragmentSender) {
    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut produced = false;

    'read: while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(e.into())).await;
                return;
            }
        };
        buffer.extend_from_slice(&chunk);

        while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            trace!(line = %line.trim_end(), "stream line");
            if !forward(&tx, decoder.decode_line(line.trim_end()), &mut produced).await {
                return;
            }
            if decoder.is_done() {
                break 'read;
            }
        }
    }

    if !buffer.is_empty() && !decoder.is_done() {
        let line = String::from_utf8_lossy(&buffer).to_string();
        if !forward(&tx, decoder.decode_line(line.trim_end()), &mut produced).await {
            return;
        }
    }

    if !forward(&tx, decoder.finish(), &mut produced).await {
        return;
    }

    if !produced {
        let _ = tx
            .send(Err(TchatError::Provider(
                "Provider returned an empty response".to_string(),
            )))
            .await;
    }
}

/// Returns false when the producer should stop: the decoder failed or the
/// consumer went away.
async fn forward(
    tx: &FragmentSender,
    decoded: Result<Vec<Fragment>, TchatError>,
    produced: &mut bool,
) -> bool {
    match decoded {
        Ok(fragments) => {
            for fragment in fragments {
                *produced = true;
                if tx.send(Ok(fragment)).await.is_err() {
                    return false;
                }
            }
            true
        }
        Err(e) => {
            *produced = true;
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

/// Strip the `data:` prefix of an SSE line. Comments, event names and blank
/// keep-alive lines return `None`.
pub fn sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?.trim();
    if data.is_empty() { None } else { Some(data) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Emits every data line as text.
    struct EchoDecoder;

    impl StreamDecoder for EchoDecoder {
        fn decode_line(&mut self, line: &str) -> Result<Vec<Fragment>, TchatError> {
            Ok(sse_data(line)
                .map(|d| vec![Fragment::Text(d.to_string())])
                .unwrap_or_default())
        }
    }

    async fn collect(stream: FragmentStream) -> Vec<Result<Fragment, TchatError>> {
        stream.collect().await
    }

    #[test]
    fn sse_data_skips_non_data_lines() {
        assert_eq!(sse_data("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(sse_data(": keep-alive"), None);
        assert_eq!(sse_data("event: ping"), None);
        assert_eq!(sse_data("data:   "), None);
    }

    #[tokio::test]
    async fn streams_lines_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("data: one\n\ndata: two\n\ndata: three"),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(Client::new(), server.uri(), None, None);
        let response = client.post("stream", &serde_json::json!({})).await.unwrap();
        let items = collect(client.stream_response(response, EchoDecoder)).await;

        let texts: Vec<String> = items
            .into_iter()
            .map(|r| match r.unwrap() {
                Fragment::Text(t) => t,
                other => panic!("unexpected fragment {:?}", other),
            })
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn empty_body_is_an_error_not_an_empty_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(": ping\n\n"))
            .mount(&server)
            .await;

        let client = HttpClient::new(Client::new(), server.uri(), None, None);
        let response = client.post("stream", &serde_json::json!({})).await.unwrap();
        let items = collect(client.stream_response(response, EchoDecoder)).await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(TchatError::Provider(_))));
    }

    #[tokio::test]
    async fn non_success_status_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = HttpClient::new(Client::new(), server.uri(), None, None);
        let err = client
            .post("chat/completions", &serde_json::json!({}))
            .await
            .unwrap_err();
        match err {
            TchatError::Provider(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("bad key"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
