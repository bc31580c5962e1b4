mod export;
mod ipc;
mod remote;
mod session;

use std::io::{self, BufRead, Write};

/// Endpoints can come from the environment so the shell can skip the
/// `services.configure` round-trip. Both vars must be set to count.
fn remote_from_env() -> Option<remote::Remote> {
    let api_base_url = std::env::var("ROLLCALL_API_BASE_URL").ok()?;
    let recognizer_url = std::env::var("ROLLCALL_RECOGNIZER_URL").ok()?;
    match remote::Remote::new(remote::ServiceEndpoints {
        api_base_url,
        recognizer_url,
    }) {
        Ok(r) => Some(r),
        Err(e) => {
            log::warn!("ignoring endpoint env vars: {e:#}");
            None
        }
    }
}

fn main() {
    // stdout carries the IPC stream; all logging goes to stderr.
    env_logger::init();

    let mut state = ipc::AppState {
        remote: remote_from_env(),
        capture: None,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back; the error text may contain quotes, so
                // the envelope goes through the serializer like any reply.
                let envelope = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", envelope);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
