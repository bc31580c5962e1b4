use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, CaptureSession, Request};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use uuid::Uuid;

fn handle_capture_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(resp) = helpers::remote(state, req) {
        return resp;
    }
    let class_id = match helpers::required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Some(active) = &state.capture {
        return err(
            &req.id,
            "capture_active",
            "a capture session is already running",
            Some(json!({ "sessionId": active.session_id, "classId": active.class_id })),
        );
    }

    let session_id = Uuid::new_v4().to_string();
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    state.capture = Some(CaptureSession {
        class_id: class_id.clone(),
        session_id: session_id.clone(),
        started_at: started_at.clone(),
    });

    ok(
        &req.id,
        json!({
            "classId": class_id,
            "sessionId": session_id,
            "startedAt": started_at,
        }),
    )
}

/// One captured frame: recognition service first, then the persistence
/// service records the recognized students against the active session. The
/// two hops fail with distinct codes so the UI can tell which collaborator
/// is down.
fn handle_capture_frame(state: &mut AppState, req: &Request) -> serde_json::Value {
    let image_path = match helpers::required_str(req, "imagePath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(active) = &state.capture else {
        return err(&req.id, "no_capture", "start a capture session first", None);
    };
    let (class_id, session_id, started_at) = (
        active.class_id.clone(),
        active.session_id.clone(),
        active.started_at.clone(),
    );
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let recognized = match remote.recognize_frame(&image_path) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "recognition_failed", e.to_string(), None),
    };
    let saved = match remote.submit_batch(&class_id, &session_id, &started_at, &recognized) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "recognized": recognized,
            "saved": saved,
            "sessionId": session_id,
        }),
    )
}

fn handle_capture_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    match &state.capture {
        Some(active) => ok(
            &req.id,
            json!({
                "active": true,
                "classId": active.class_id,
                "sessionId": active.session_id,
                "startedAt": active.started_at,
            }),
        ),
        None => ok(&req.id, json!({ "active": false })),
    }
}

/// End the run. With `markAbsent` (the default), every rostered student
/// without a record in this session gets an absent row stamped with the
/// session's start instant. The session is finished either way.
fn handle_capture_stop(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(active) = state.capture.take() else {
        return err(&req.id, "no_capture", "no capture session running", None);
    };
    let mark_absent = req
        .params
        .get("markAbsent")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);

    if !mark_absent {
        return ok(
            &req.id,
            json!({ "sessionId": active.session_id, "absences": [] }),
        );
    }

    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match remote.mark_absences(&active.class_id, &active.session_id, &active.started_at) {
        Ok(absences) => ok(
            &req.id,
            json!({ "sessionId": active.session_id, "absences": absences }),
        ),
        Err(e) => err(
            &req.id,
            "persistence_failed",
            e.to_string(),
            Some(json!({ "sessionId": active.session_id })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "capture.start" => Some(handle_capture_start(state, req)),
        "capture.frame" => Some(handle_capture_frame(state, req)),
        "capture.status" => Some(handle_capture_status(state, req)),
        "capture.stop" => Some(handle_capture_stop(state, req)),
        _ => None,
    }
}
