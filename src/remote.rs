use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::session::AttendanceRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentFields {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Local path of a portrait to upload alongside the fields.
    pub photo_path: Option<String>,
}

/// One recognizer hit. The recognition service names its fields in
/// snake_case, unlike the persistence service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizedStudent {
    pub student_id: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub position: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    recognized: Vec<RecognizedStudent>,
}

#[derive(Debug, Serialize)]
struct BatchPayload<'a> {
    recognized: &'a [RecognizedStudent],
}

#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub api_base_url: String,
    pub recognizer_url: String,
}

/// Blocking client for the two external collaborators: the persistence
/// service (classes, students, rosters, attendance) and the recognition
/// service (frame -> recognized subjects). Holds no state beyond the
/// endpoints; every call is a fresh request.
pub struct Remote {
    http: Client,
    endpoints: ServiceEndpoints,
}

impl Remote {
    pub fn new(endpoints: ServiceEndpoints) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self { http, endpoints })
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api_base_url.trim_end_matches('/'), path)
    }

    fn recognizer(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.recognizer_url.trim_end_matches('/'), path)
    }

    pub fn health(&self) -> Result<serde_json::Value> {
        let resp = self
            .http
            .get(self.api("/health"))
            .send()
            .context("health request")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    // ---- classes -----------------------------------------------------

    pub fn list_classes(&self) -> Result<Vec<Class>> {
        let resp = self
            .http
            .get(self.api("/classes"))
            .send()
            .context("list classes")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn create_class(&self, name: &str, code: &str, description: Option<&str>) -> Result<Class> {
        let body = serde_json::json!({
            "name": name,
            "code": code,
            "description": description,
        });
        let resp = self
            .http
            .post(self.api("/classes"))
            .json(&body)
            .send()
            .context("create class")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn update_class(&self, class_id: &str, patch: &serde_json::Value) -> Result<Class> {
        let resp = self
            .http
            .put(self.api(&format!("/classes/{}", class_id)))
            .json(patch)
            .send()
            .context("update class")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn delete_class(&self, class_id: &str) -> Result<()> {
        self.http
            .delete(self.api(&format!("/classes/{}", class_id)))
            .send()
            .context("delete class")?
            .error_for_status()?;
        Ok(())
    }

    // ---- roster ------------------------------------------------------

    pub fn roster(&self, class_id: &str) -> Result<Vec<Student>> {
        let resp = self
            .http
            .get(self.api(&format!("/classes/{}/roster", class_id)))
            .send()
            .context("fetch roster")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn add_to_roster(&self, class_id: &str, student_external_id: &str) -> Result<()> {
        self.http
            .post(self.api(&format!("/classes/{}/roster/{}", class_id, student_external_id)))
            .send()
            .context("add to roster")?
            .error_for_status()?;
        Ok(())
    }

    pub fn remove_from_roster(&self, class_id: &str, student_external_id: &str) -> Result<()> {
        self.http
            .delete(self.api(&format!("/classes/{}/roster/{}", class_id, student_external_id)))
            .send()
            .context("remove from roster")?
            .error_for_status()?;
        Ok(())
    }

    // ---- students ----------------------------------------------------

    pub fn list_students(&self) -> Result<Vec<Student>> {
        let resp = self
            .http
            .get(self.api("/students"))
            .send()
            .context("list students")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    fn student_form(fields: &StudentFields) -> Result<multipart::Form> {
        let mut form = multipart::Form::new()
            .text("externalId", fields.external_id.clone())
            .text("firstName", fields.first_name.clone())
            .text("lastName", fields.last_name.clone())
            .text("email", fields.email.clone());
        if let Some(path) = &fields.photo_path {
            let bytes = std::fs::read(path).with_context(|| format!("read photo {}", path))?;
            let file_name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "photo".to_string());
            form = form.part("photo", multipart::Part::bytes(bytes).file_name(file_name));
        }
        Ok(form)
    }

    pub fn create_student(&self, fields: &StudentFields) -> Result<Student> {
        let resp = self
            .http
            .post(self.api("/students"))
            .multipart(Self::student_form(fields)?)
            .send()
            .context("create student")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn update_student(&self, student_id: &str, fields: &StudentFields) -> Result<Student> {
        let resp = self
            .http
            .put(self.api(&format!("/students/{}", student_id)))
            .multipart(Self::student_form(fields)?)
            .send()
            .context("update student")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn delete_student(&self, student_id: &str) -> Result<()> {
        self.http
            .delete(self.api(&format!("/students/{}", student_id)))
            .send()
            .context("delete student")?
            .error_for_status()?;
        Ok(())
    }

    // ---- attendance --------------------------------------------------

    pub fn attendance_by_class(
        &self,
        class_id: &str,
        session_id: Option<&str>,
    ) -> Result<Vec<AttendanceRecord>> {
        let mut req = self
            .http
            .get(self.api(&format!("/attendance/class/{}", class_id)));
        if let Some(sid) = session_id {
            req = req.query(&[("sessionId", sid)]);
        }
        let resp = req.send().context("fetch class attendance")?.error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn attendance_by_class_today(&self, class_id: &str) -> Result<Vec<AttendanceRecord>> {
        let resp = self
            .http
            .get(self.api(&format!("/attendance/class/{}/today", class_id)))
            .send()
            .context("fetch today's attendance")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    pub fn attendance_by_student(&self, student_id: &str) -> Result<Vec<AttendanceRecord>> {
        let resp = self
            .http
            .get(self.api(&format!("/attendance/student/{}", student_id)))
            .send()
            .context("fetch student attendance")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    /// Hop one of the frame chain: send a captured frame to the recognition
    /// service. Returns whatever subjects it saw, possibly none.
    pub fn recognize_frame(&self, image_path: &str) -> Result<Vec<RecognizedStudent>> {
        let bytes =
            std::fs::read(image_path).with_context(|| format!("read frame {}", image_path))?;
        let file_name = Path::new(image_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "frame.jpg".to_string());
        let form = multipart::Form::new()
            .part("image", multipart::Part::bytes(bytes).file_name(file_name));
        let resp = self
            .http
            .post(self.recognizer("/recognize"))
            .multipart(form)
            .send()
            .context("recognize frame")?
            .error_for_status()?;
        let parsed: RecognizeResponse = resp.json()?;
        Ok(parsed.recognized)
    }

    /// Hop two: hand the recognized subjects to the persistence service,
    /// which records at most one present row per student per session.
    pub fn submit_batch(
        &self,
        class_id: &str,
        session_id: &str,
        session_started_at: &str,
        recognized: &[RecognizedStudent],
    ) -> Result<Vec<AttendanceRecord>> {
        let resp = self
            .http
            .post(self.api("/attendance/batch"))
            .query(&[
                ("classId", class_id),
                ("sessionId", session_id),
                ("sessionStartedAt", session_started_at),
            ])
            .json(&BatchPayload { recognized })
            .send()
            .context("submit attendance batch")?
            .error_for_status()?;
        Ok(resp.json()?)
    }

    /// Stamp absent rows for every rostered student without a record in the
    /// given session.
    pub fn mark_absences(
        &self,
        class_id: &str,
        session_id: &str,
        session_started_at: &str,
    ) -> Result<Vec<AttendanceRecord>> {
        let resp = self
            .http
            .post(self.api("/attendance/mark-absent"))
            .query(&[
                ("classId", class_id),
                ("sessionId", session_id),
                ("sessionStartedAt", session_started_at),
            ])
            .send()
            .context("mark absences")?
            .error_for_status()?;
        Ok(resp.json()?)
    }
}
