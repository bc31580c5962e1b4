use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::session;
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let classes = match remote.list_classes() {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };

    // Roster counts are best-effort: a class whose roster fetch fails still
    // renders, with a zero count, instead of aborting the whole view.
    let classes_json: Vec<serde_json::Value> = classes
        .iter()
        .map(|c| {
            let roster_count = match remote.roster(&c.id) {
                Ok(roster) => roster.len(),
                Err(e) => {
                    log::warn!("roster fetch failed for class {}: {e:#}", c.id);
                    0
                }
            };
            json!({
                "id": c.id,
                "name": c.name,
                "code": c.code,
                "description": c.description,
                "rosterCount": roster_count,
            })
        })
        .collect();

    ok(&req.id, json!({ "classes": classes_json }))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let name = match helpers::required_str(req, "name") {
        Ok(v) => v.trim().to_string(),
        Err(resp) => return resp,
    };
    let code = match helpers::required_str(req, "code") {
        Ok(v) => v.trim().to_string(),
        Err(resp) => return resp,
    };
    if name.is_empty() || code.is_empty() {
        return err(&req.id, "bad_params", "name and code must not be empty", None);
    }
    let description = helpers::optional_str(&req.params, "description");

    match remote.create_class(&name, &code, description.as_deref()) {
        Ok(class) => ok(&req.id, json!({ "class": class })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let class_id = match helpers::required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut patch = serde_json::Map::new();
    for key in ["name", "code", "description"] {
        if let Some(v) = req.params.get(key).and_then(|v| v.as_str()) {
            patch.insert(key.to_string(), json!(v));
        }
    }
    if patch.is_empty() {
        return err(&req.id, "bad_params", "nothing to update", None);
    }

    match remote.update_class(&class_id, &serde_json::Value::Object(patch)) {
        Ok(class) => ok(&req.id, json!({ "class": class })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let class_id = match helpers::required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match remote.delete_class(&class_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

fn handle_roster_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let class_id = match helpers::required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let roster = match remote.roster(&class_id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };
    // Candidates for the add-student picker: everyone not already enrolled.
    let students = match remote.list_students() {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };
    let enrolled: std::collections::HashSet<&str> =
        roster.iter().map(|s| s.external_id.as_str()).collect();
    let candidates: Vec<_> = students
        .into_iter()
        .filter(|s| !enrolled.contains(s.external_id.as_str()))
        .collect();

    ok(
        &req.id,
        json!({ "roster": roster, "candidates": candidates }),
    )
}

fn handle_roster_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let class_id = match helpers::required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let external_id = match helpers::required_str(req, "studentExternalId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match remote.add_to_roster(&class_id, &external_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

fn handle_roster_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let class_id = match helpers::required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let external_id = match helpers::required_str(req, "studentExternalId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match remote.remove_from_roster(&class_id, &external_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

/// Attendance dialog for one class: grouped sessions, the active record set
/// for the current session filter, and the roster ratio.
fn handle_attendance_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let class_id = match helpers::required_str(req, "classId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let direction = match helpers::sort_direction(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let selected = helpers::optional_str(&req.params, "sessionId");

    let records = match remote.attendance_by_class(&class_id, None) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };
    // Roster failure degrades the ratio to "not applicable", not an error.
    let roster_size = match remote.roster(&class_id) {
        Ok(roster) => Some(roster.len()),
        Err(e) => {
            log::warn!("roster fetch failed for class {}: {e:#}", class_id);
            None
        }
    };

    let agg = session::aggregate(&records, direction, selected.as_deref(), roster_size);

    let session_options: Vec<serde_json::Value> = agg
        .sessions
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "startedAt": s.started_at,
                "recordCount": s.records.len(),
            })
        })
        .collect();
    let ratio_label = match (roster_size, agg.ratio_percent) {
        (Some(n), Some(pct)) if n > 0 => {
            format!("{}/{} ({}%)", agg.unique_present, n, pct)
        }
        _ => "N/A".to_string(),
    };

    ok(
        &req.id,
        json!({
            "sessions": session_options,
            "records": agg.records,
            "uniqueAttendees": agg.unique_present,
            "rosterCount": roster_size,
            "ratioPercent": agg.ratio_percent,
            "ratioLabel": ratio_label,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        "classes.rosterOpen" => Some(handle_roster_open(state, req)),
        "classes.rosterAdd" => Some(handle_roster_add(state, req)),
        "classes.rosterRemove" => Some(handle_roster_remove(state, req)),
        "classes.attendanceOpen" => Some(handle_attendance_open(state, req)),
        _ => None,
    }
}
