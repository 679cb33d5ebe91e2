//! Backend calls and the response shapes the dashboard relies on.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

pub const PATH_LIST_BUILDS: &str = "/get_builds";
pub const PATH_LOAD_REPORT: &str = "/get_allure";
pub const PATH_DELETE_REPORT: &str = "/delete_allure";
pub const PATH_DOWNLOAD_REPORT: &str = "/download_allure";
pub const PATH_GET_ENV: &str = "/get_env";
pub const PATH_SET_ENV: &str = "/set_env";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListBuilds,
    LoadReport { build: String, rebuild: bool },
    DeleteReport { build: String },
    GetEnv,
    SetEnv { values: BTreeMap<String, String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl ApiCall {
    pub fn method(&self) -> Method {
        match self {
            ApiCall::SetEnv { .. } => Method::Post,
            _ => Method::Get,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            ApiCall::ListBuilds => PATH_LIST_BUILDS,
            ApiCall::LoadReport { .. } => PATH_LOAD_REPORT,
            ApiCall::DeleteReport { .. } => PATH_DELETE_REPORT,
            ApiCall::GetEnv => PATH_GET_ENV,
            ApiCall::SetEnv { .. } => PATH_SET_ENV,
        }
    }

    /// Query parameters. The backend only recognizes `True`/`true` as a rebuild.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            ApiCall::LoadReport { build, rebuild } => vec![
                ("build_name", build.clone()),
                (
                    "rebuild",
                    if *rebuild { "True" } else { "False" }.to_string(),
                ),
            ],
            ApiCall::DeleteReport { build } => vec![("build_name", build.clone())],
            _ => Vec::new(),
        }
    }

    /// Report generation is slow; it gets the long timeout.
    pub fn is_long_running(&self) -> bool {
        matches!(self, ApiCall::LoadReport { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApiCall::ListBuilds => "list_builds",
            ApiCall::LoadReport { .. } => "load_report",
            ApiCall::DeleteReport { .. } => "delete_report",
            ApiCall::GetEnv => "get_env",
            ApiCall::SetEnv { .. } => "set_env",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListBuildsBody {
    data: Vec<Value>,
}

/// Build names in response order. Non-string entries make the whole
/// response malformed.
pub fn decode_build_names(body: &Value) -> Result<Vec<String>> {
    let parsed = ListBuildsBody::deserialize(body)
        .map_err(|e| Error::malformed(format!("build list: {e}")))?;
    parsed
        .data
        .into_iter()
        .map(|v| match v {
            Value::String(s) => Ok(s),
            other => Err(Error::malformed(format!(
                "build list entry is not a string: {other}"
            ))),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    success: Option<Value>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    msg: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status<T> {
    Ok(T),
    Failed(Option<String>),
}

fn decode_status(body: &Value, what: &str) -> Result<StatusBody> {
    if !body.is_object() {
        return Err(Error::malformed(format!("{what}: expected a JSON object")));
    }
    StatusBody::deserialize(body).map_err(|e| Error::malformed(format!("{what}: {e}")))
}

fn message_of(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl StatusBody {
    // Anything but a literal `true` is a failure.
    fn succeeded(&self) -> bool {
        matches!(self.success, Some(Value::Bool(true)))
    }

    // The report endpoint reports failures under `msg`, the others under `data`.
    fn failure_message(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(message_of)
            .or_else(|| self.msg.as_ref().and_then(message_of))
    }
}

pub fn decode_load_report(body: &Value) -> Result<Status<String>> {
    let st = decode_status(body, "load report")?;
    if !st.succeeded() {
        return Ok(Status::Failed(st.failure_message()));
    }
    match st.url {
        Some(url) if !url.trim().is_empty() => Ok(Status::Ok(url)),
        _ => Err(Error::malformed("load report: success without url")),
    }
}

pub fn decode_delete_report(body: &Value) -> Result<Status<()>> {
    let st = decode_status(body, "delete report")?;
    if st.succeeded() {
        Ok(Status::Ok(()))
    } else {
        Ok(Status::Failed(st.failure_message()))
    }
}

/// Raw environment mapping. Values are strings or null on the wire.
pub fn decode_env(body: &Value) -> Result<Status<BTreeMap<String, Option<String>>>> {
    let st = decode_status(body, "get env")?;
    if !st.succeeded() {
        return Ok(Status::Failed(st.failure_message()));
    }
    let Some(Value::Object(map)) = st.data else {
        return Err(Error::malformed("get env: data is not an object"));
    };
    let mut out = BTreeMap::new();
    for (k, v) in map {
        let v = match v {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        };
        out.insert(k, v);
    }
    Ok(Status::Ok(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_report_query_encodes_rebuild_flag() {
        let call = ApiCall::LoadReport {
            build: "run-1".into(),
            rebuild: true,
        };
        assert_eq!(call.path(), "/get_allure");
        assert_eq!(
            call.query(),
            vec![
                ("build_name", "run-1".to_string()),
                ("rebuild", "True".to_string())
            ]
        );
        assert!(call.is_long_running());
        assert_eq!(ApiCall::SetEnv { values: BTreeMap::new() }.method(), Method::Post);
    }

    #[test]
    fn build_names_keep_response_order() {
        let names = decode_build_names(&json!({"success": true, "data": ["run-2", "run-1"]}))
            .expect("decode");
        assert_eq!(names, vec!["run-2", "run-1"]);
    }

    #[test]
    fn build_list_without_data_is_malformed() {
        assert!(decode_build_names(&json!({"success": true})).is_err());
        assert!(decode_build_names(&json!({"data": ["a", 3]})).is_err());
        assert!(decode_build_names(&json!(["a"])).is_err());
    }

    #[test]
    fn load_report_failure_reads_data_then_msg() {
        assert_eq!(
            decode_load_report(&json!({"success": false, "data": "engine busy"})).expect("decode"),
            Status::Failed(Some("engine busy".into()))
        );
        assert_eq!(
            decode_load_report(&json!({"success": false, "msg": "Error while generating"}))
                .expect("decode"),
            Status::Failed(Some("Error while generating".into()))
        );
        assert_eq!(
            decode_load_report(&json!({"success": "yes"})).expect("decode"),
            Status::Failed(None)
        );
    }

    #[test]
    fn load_report_success_needs_url() {
        assert_eq!(
            decode_load_report(&json!({"success": true, "url": "/reports/run-1/index.html"}))
                .expect("decode"),
            Status::Ok("/reports/run-1/index.html".into())
        );
        assert!(decode_load_report(&json!({"success": true})).is_err());
    }

    #[test]
    fn env_values_keep_nulls() {
        let st = decode_env(&json!({"success": true, "data": {"A": "1", "B": null}}))
            .expect("decode");
        let Status::Ok(map) = st else {
            panic!("expected ok");
        };
        assert_eq!(map.get("A"), Some(&Some("1".to_string())));
        assert_eq!(map.get("B"), Some(&None));
    }
}
