mod support;

use serde_json::json;
use support::{configure, error_code, request, request_ok, spawn_sidecar, FixtureServer};

fn start_api() -> FixtureServer {
    FixtureServer::start(vec![
        (
            "GET",
            "/api/classes",
            json!([{ "id": "c1", "name": "Biology", "code": "BIO-101", "description": "Intro" }]),
        ),
        (
            "POST",
            "/api/classes",
            json!({ "id": "c2", "name": "Chemistry", "code": "CHE-101" }),
        ),
        (
            "GET",
            "/api/classes/c1/roster",
            json!([
                { "id": "A", "externalId": "EXT-A", "firstName": "Ada", "lastName": "L", "email": "a@x" }
            ]),
        ),
        ("POST", "/api/classes/c1/roster/EXT-B", json!({})),
        ("DELETE", "/api/classes/c1/roster/EXT-A", json!({})),
        (
            "GET",
            "/api/students",
            json!([
                { "id": "A", "externalId": "EXT-A", "firstName": "Ada", "lastName": "L", "email": "a@x" },
                { "id": "B", "externalId": "EXT-B", "firstName": "Ben", "lastName": "K", "email": "b@x" }
            ]),
        ),
        (
            "POST",
            "/api/students",
            json!({ "id": "C", "externalId": "EXT-C", "firstName": "Cy", "lastName": "M", "email": "c@x" }),
        ),
        ("DELETE", "/api/students/A", json!({})),
    ])
}

#[test]
fn class_list_carries_roster_counts() {
    let api = start_api();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    configure(
        &mut stdin,
        &mut reader,
        &format!("{}/api", api.base_url),
        &api.base_url,
    );

    let list = request_ok(&mut stdin, &mut reader, "1", "classes.list", json!({}));
    let classes = list["classes"].as_array().expect("classes");
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0]["code"], json!("BIO-101"));
    assert_eq!(classes[0]["rosterCount"], json!(1));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classes.create",
        json!({ "name": "Chemistry", "code": "CHE-101" }),
    );
    assert_eq!(created["class"]["id"], json!("c2"));

    let bad = request(
        &mut stdin,
        &mut reader,
        "3",
        "classes.create",
        json!({ "name": "  ", "code": "X" }),
    );
    assert_eq!(error_code(&bad), "bad_params");

    let _ = child.kill();
}

#[test]
fn roster_open_offers_only_unenrolled_candidates() {
    let api = start_api();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    configure(
        &mut stdin,
        &mut reader,
        &format!("{}/api", api.base_url),
        &api.base_url,
    );

    let open = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classes.rosterOpen",
        json!({ "classId": "c1" }),
    );
    assert_eq!(open["roster"].as_array().expect("roster").len(), 1);
    let candidates = open["candidates"].as_array().expect("candidates");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["externalId"], json!("EXT-B"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classes.rosterAdd",
        json!({ "classId": "c1", "studentExternalId": "EXT-B" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classes.rosterRemove",
        json!({ "classId": "c1", "studentExternalId": "EXT-A" }),
    );
    let hits = api.hits();
    assert!(hits.iter().any(|h| h == "POST /api/classes/c1/roster/EXT-B"));
    assert!(hits.iter().any(|h| h == "DELETE /api/classes/c1/roster/EXT-A"));

    let _ = child.kill();
}

#[test]
fn student_create_requires_identity_fields() {
    let api = start_api();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    configure(
        &mut stdin,
        &mut reader,
        &format!("{}/api", api.base_url),
        &api.base_url,
    );

    let list = request_ok(&mut stdin, &mut reader, "1", "students.list", json!({}));
    assert_eq!(list["students"].as_array().expect("students").len(), 2);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "externalId": "EXT-C", "firstName": "Cy", "lastName": "M", "email": "c@x" }),
    );
    assert_eq!(created["student"]["externalId"], json!("EXT-C"));

    let missing = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "firstName": "No", "lastName": "Id" }),
    );
    assert_eq!(error_code(&missing), "bad_params");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.delete",
        json!({ "studentId": "A" }),
    );
    assert!(api.hits().iter().any(|h| h == "DELETE /api/students/A"));

    let _ = child.kill();
}
