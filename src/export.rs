use crate::session::AttendanceRecord;

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Flat report export, one row per attendance record. Confidence is kept as
/// the raw [0,1] value so spreadsheets can format it.
pub fn attendance_csv(rows: &[AttendanceRecord]) -> String {
    let mut csv = String::from(
        "Class Name,Class Id,Student Name,Student External ID,Timestamp,Status,Confidence,Session\n",
    );
    for r in rows {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_quote(&r.class_name),
            csv_quote(&r.class_id),
            csv_quote(&r.student_name),
            csv_quote(&r.student_external_id),
            csv_quote(&r.timestamp),
            csv_quote(&r.status.to_lowercase()),
            r.confidence,
            csv_quote(&r.session_id),
        ));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_commas_and_quotes() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn export_has_header_and_one_line_per_record() {
        let row = AttendanceRecord {
            id: "r1".to_string(),
            student_id: "s1".to_string(),
            student_external_id: "EXT1".to_string(),
            student_name: "Doe, Jane".to_string(),
            class_id: "c1".to_string(),
            class_name: "Biology".to_string(),
            timestamp: "2026-03-01T09:05:00".to_string(),
            confidence: 0.87,
            status: "PRESENT".to_string(),
            position: None,
            session_id: "sess-1".to_string(),
            session_started_at: "2026-03-01T09:00:00".to_string(),
        };
        let csv = attendance_csv(&[row]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Class Name,Class Id"));
        assert!(lines[1].contains("\"Doe, Jane\""));
        assert!(lines[1].contains("present"));
        assert!(lines[1].contains("sess-1"));
    }
}
