use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::remote::Remote;
use crate::session::SortDirection;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

pub fn remote<'a>(state: &'a AppState, req: &Request) -> Result<&'a Remote, serde_json::Value> {
    state.remote.as_ref().ok_or_else(|| {
        err(
            &req.id,
            "not_configured",
            "configure service endpoints first",
            None,
        )
    })
}

pub fn sort_direction(req: &Request) -> Result<SortDirection, serde_json::Value> {
    match req
        .params
        .get("sortDirection")
        .and_then(|v| v.as_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        None | Some("desc") => Ok(SortDirection::Desc),
        Some("asc") => Ok(SortDirection::Asc),
        Some(other) => Err(err(
            &req.id,
            "bad_params",
            "sortDirection must be asc or desc",
            Some(serde_json::json!({ "sortDirection": other })),
        )),
    }
}
