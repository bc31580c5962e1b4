use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::remote::StudentFields;
use crate::session;
use serde_json::json;

fn fields_from_params(req: &Request) -> Result<StudentFields, serde_json::Value> {
    let external_id = helpers::required_str(req, "externalId")?;
    let first_name = helpers::required_str(req, "firstName")?;
    let last_name = helpers::required_str(req, "lastName")?;
    if external_id.trim().is_empty() {
        return Err(err(&req.id, "bad_params", "externalId must not be empty", None));
    }
    Ok(StudentFields {
        external_id,
        first_name,
        last_name,
        email: helpers::optional_str(&req.params, "email").unwrap_or_default(),
        photo_path: helpers::optional_str(&req.params, "photoPath"),
    })
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    match remote.list_students() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let fields = match fields_from_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match remote.create_student(&fields) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let student_id = match helpers::required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let fields = match fields_from_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match remote.update_student(&student_id, &fields) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let student_id = match helpers::required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match remote.delete_student(&student_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "persistence_failed", e.to_string(), None),
    }
}

/// Attendance history for one student across classes, newest first, with
/// the student's sessions grouped for the side list.
fn handle_attendance_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let student_id = match helpers::required_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let direction = match helpers::sort_direction(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let records = match remote.attendance_by_student(&student_id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };
    let agg = session::aggregate(&records, direction, None, None);

    ok(
        &req.id,
        json!({
            "records": agg.records,
            "sessions": agg.sessions,
            "presentCount": agg.unique_present,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.attendanceOpen" => Some(handle_attendance_open(state, req)),
        _ => None,
    }
}
