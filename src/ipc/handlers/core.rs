use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::remote::{Remote, ServiceEndpoints};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "apiBaseUrl": state.remote.as_ref().map(|r| r.endpoints().api_base_url.clone()),
            "recognizerUrl": state.remote.as_ref().map(|r| r.endpoints().recognizer_url.clone()),
            "captureActive": state.capture.is_some(),
        }),
    )
}

fn handle_services_configure(state: &mut AppState, req: &Request) -> serde_json::Value {
    let api_base_url = match helpers::required_str(req, "apiBaseUrl") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let recognizer_url = match helpers::required_str(req, "recognizerUrl") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if api_base_url.trim().is_empty() || recognizer_url.trim().is_empty() {
        return err(&req.id, "bad_params", "endpoint urls must not be empty", None);
    }

    match Remote::new(ServiceEndpoints {
        api_base_url: api_base_url.clone(),
        recognizer_url: recognizer_url.clone(),
    }) {
        Ok(remote) => {
            state.remote = Some(remote);
            ok(
                &req.id,
                json!({ "apiBaseUrl": api_base_url, "recognizerUrl": recognizer_url }),
            )
        }
        Err(e) => err(&req.id, "configure_failed", format!("{e:?}"), None),
    }
}

fn handle_services_ping(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match remote.health() {
        Ok(body) => ok(&req.id, json!({ "reachable": true, "health": body })),
        Err(e) => {
            log::warn!("persistence service ping failed: {e:#}");
            ok(
                &req.id,
                json!({ "reachable": false, "message": e.to_string() }),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "services.configure" => Some(handle_services_configure(state, req)),
        "services.ping" => Some(handle_services_ping(state, req)),
        _ => None,
    }
}
