#![allow(dead_code)]

use serde_json::json;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

/// Canned-response HTTP server standing in for the persistence or
/// recognition service. Routes are `(method, path)` keyed; query strings are
/// ignored for matching but kept in the hit log. Unrouted paths get a 404,
/// which is how tests exercise the degrade-to-empty paths.
pub struct FixtureServer {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

impl FixtureServer {
    pub fn start(routes: Vec<(&str, &str, serde_json::Value)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture server");
        let addr = listener.local_addr().expect("fixture addr");
        let table: HashMap<String, String> = routes
            .into_iter()
            .map(|(method, path, body)| (format!("{} {}", method, path), body.to_string()))
            .collect();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let hit_log = Arc::clone(&hits);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut buf: Vec<u8> = Vec::new();
                let mut tmp = [0u8; 4096];
                while header_end(&buf).is_none() {
                    match stream.read(&mut tmp) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&tmp[..n]),
                    }
                }
                let Some(body_start) = header_end(&buf) else { continue };
                let head = String::from_utf8_lossy(&buf[..body_start]).to_string();
                let content_length = head
                    .lines()
                    .find_map(|l| {
                        l.to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                let mut body_read = buf.len() - body_start;
                while body_read < content_length {
                    match stream.read(&mut tmp) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => body_read += n,
                    }
                }

                let request_line = head.lines().next().unwrap_or_default();
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default();
                let target = parts.next().unwrap_or_default();
                let path = target.split('?').next().unwrap_or_default();
                hit_log
                    .lock()
                    .expect("hit log")
                    .push(format!("{} {}", method, target));

                let (status, body) = match table.get(&format!("{} {}", method, path)) {
                    Some(body) => ("200 OK", body.clone()),
                    None => ("404 Not Found", "{\"error\":\"not found\"}".to_string()),
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        FixtureServer {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().expect("hit log").clone()
    }
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rollcalld");
    let mut child = Command::new(exe)
        .env_remove("ROLLCALL_API_BASE_URL")
        .env_remove("ROLLCALL_RECOGNIZER_URL")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rollcalld");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

pub fn error_code(value: &serde_json::Value) -> String {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

pub fn configure(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    api_base_url: &str,
    recognizer_url: &str,
) {
    let _ = request_ok(
        stdin,
        reader,
        "cfg",
        "services.configure",
        json!({ "apiBaseUrl": api_base_url, "recognizerUrl": recognizer_url }),
    );
}
