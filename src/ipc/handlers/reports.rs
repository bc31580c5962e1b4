use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::remote::{Class, Remote};
use crate::session::{self, AttendanceRecord};
use serde_json::json;
use std::collections::HashMap;

fn target_classes(remote: &Remote, selected: Option<&str>) -> anyhow::Result<Vec<Class>> {
    let classes = remote.list_classes()?;
    Ok(match selected {
        Some(id) if id != session::ALL_SESSIONS => {
            classes.into_iter().filter(|c| c.id == id).collect()
        }
        _ => classes,
    })
}

/// Fetch attendance for every target class, swallowing per-class failures so
/// one unreachable class never blanks the whole report.
fn collect_records(remote: &Remote, classes: &[Class]) -> Vec<AttendanceRecord> {
    let mut all = Vec::new();
    for class in classes {
        match remote.attendance_by_class(&class.id, None) {
            Ok(mut records) => all.append(&mut records),
            Err(e) => log::warn!("attendance fetch failed for class {}: {e:#}", class.id),
        }
    }
    all
}

fn roster_counts(remote: &Remote, classes: &[Class]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for class in classes {
        let count = match remote.roster(&class.id) {
            Ok(roster) => roster.len(),
            Err(e) => {
                log::warn!("roster fetch failed for class {}: {e:#}", class.id);
                0
            }
        };
        counts.insert(class.id.clone(), count);
    }
    counts
}

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let direction = match helpers::sort_direction(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let selected_class = helpers::optional_str(&req.params, "classId");

    let classes = match target_classes(remote, selected_class.as_deref()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };
    let records = collect_records(remote, &classes);
    let rosters = roster_counts(remote, &classes);

    // Per-class record counts in first-encounter order.
    let mut by_class: Vec<(String, String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in &records {
        let i = *index.entry(r.class_id.clone()).or_insert_with(|| {
            by_class.push((r.class_id.clone(), r.class_name.clone(), 0));
            by_class.len() - 1
        });
        by_class[i].2 += 1;
    }
    let by_class_json: Vec<serde_json::Value> = by_class
        .iter()
        .map(|(id, name, count)| json!({ "classId": id, "name": name, "count": count }))
        .collect();

    let agg = session::aggregate(&records, direction, None, None);

    // Average attendance pools roster and unique-present sums across the
    // target classes before dividing, rather than averaging per-class rates.
    let mut roster_sum = 0usize;
    let mut attended_sum = 0usize;
    for class in &classes {
        roster_sum += rosters.get(&class.id).copied().unwrap_or(0);
        let class_records: Vec<AttendanceRecord> = records
            .iter()
            .filter(|r| r.class_id == class.id)
            .cloned()
            .collect();
        attended_sum += session::unique_present_count(&class_records);
    }
    let average_attendance = session::ratio_percent(attended_sum, roster_sum);

    ok(
        &req.id,
        json!({
            "total": records.len(),
            "byClass": by_class_json,
            "sessions": agg.sessions,
            "averageAttendance": average_attendance,
        }),
    )
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let remote = match helpers::remote(state, req) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let out_path = match helpers::required_str(req, "outPath") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let selected_class = helpers::optional_str(&req.params, "classId");

    let classes = match target_classes(remote, selected_class.as_deref()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "persistence_failed", e.to_string(), None),
    };
    let records = collect_records(remote, &classes);
    if records.is_empty() {
        return err(&req.id, "no_data", "no attendance data to export", None);
    }

    let csv = export::attendance_csv(&records);
    if let Err(e) = std::fs::write(&out_path, csv) {
        return err(
            &req.id,
            "write_failed",
            e.to_string(),
            Some(json!({ "path": out_path })),
        );
    }

    ok(&req.id, json!({ "path": out_path, "rows": records.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.summary" => Some(handle_summary(state, req)),
        "reports.exportCsv" => Some(handle_export_csv(state, req)),
        _ => None,
    }
}
