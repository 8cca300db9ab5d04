//! In-process fake backend for client tests.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use tiny_http::{Header, Response, Server};

/// A request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Serves a fixed script of `(status, body)` replies, one per request, then stops.
pub struct MockBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockBackend {
    pub fn start(replies: Vec<(u16, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for (status, body) in replies {
                let Ok(mut request) = server.recv() else {
                    return;
                };

                let mut bytes = Vec::new();
                let _ = request.as_reader().read_to_end(&mut bytes);
                recorded.lock().unwrap().push(Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|h| (h.field.to_string(), h.value.to_string()))
                        .collect(),
                    body: bytes,
                });

                let content_type =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let response = Response::from_string(body)
                    .with_status_code(status)
                    .with_header(content_type);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            handle: Some(handle),
        }
    }

    /// Envelope reply helper.
    pub fn envelope(code: i64, msg: &str, data: serde_json::Value) -> String {
        serde_json::json!({ "code": code, "msg": msg, "data": data }).to_string()
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait until every scripted reply has been served.
    pub fn finish(mut self) -> Vec<Recorded> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        self.requests()
    }
}
