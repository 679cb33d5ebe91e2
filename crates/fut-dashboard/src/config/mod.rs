use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use toml::Value;

use crate::error::{Error, Result};

pub const ENV_URL: &str = "FUT_DASHBOARD_URL";
pub const ENV_TERMINAL_PORT: &str = "FUT_DASHBOARD_TERMINAL_PORT";

fn default_base_url() -> String {
    "http://127.0.0.1:5000".into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

// Report generation runs allure synchronously inside the request.
fn default_report_timeout_secs() -> u64 {
    900
}

fn default_terminal_port() -> u16 {
    57575
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("fut-dashboard.log")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_report_timeout_secs")]
    pub report_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            report_timeout_secs: default_report_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.report_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    #[serde(default = "default_terminal_port")]
    pub port: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            port: default_terminal_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    #[serde(default = "default_download_dir")]
    pub dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
            file: default_log_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub server: ServerConfig,
    pub terminal: TerminalConfig,
    pub download: DownloadConfig,
    pub log: LogConfig,
}

impl DashboardConfig {
    /// Applies `FUT_DASHBOARD_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|k| std::env::var(k).ok())
    }

    pub fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = get(ENV_URL).map(|s| s.trim().to_string())
            && !url.is_empty()
        {
            self.server.base_url = url;
        }
        if let Some(raw) = get(ENV_TERMINAL_PORT) {
            self.terminal.port = raw.trim().parse().map_err(|e| {
                Error::msg(format!("invalid {ENV_TERMINAL_PORT} value '{raw}': {e}"))
            })?;
        }
        Ok(())
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base_tbl), Value::Table(overlay_tbl)) => {
            for (k, v) in overlay_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge_values(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

fn resolve_ref_path(from_file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        p
    } else {
        from_file.parent().unwrap_or_else(|| Path::new(".")).join(p)
    }
}

fn take_refs(path: &Path, tbl: &mut toml::value::Table) -> Result<(Option<String>, Vec<String>)> {
    let extends = match tbl.remove("extends") {
        None => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            return Err(Error::msg(format!(
                "invalid extends in {} (expected string)",
                path.display()
            )));
        }
    };
    let mut imports = Vec::new();
    match tbl.remove("imports") {
        None => {}
        Some(Value::Array(arr)) => {
            for v in arr {
                let Some(s) = v.as_str() else {
                    return Err(Error::msg(format!(
                        "invalid imports entry in {} (expected string)",
                        path.display()
                    )));
                };
                if !s.trim().is_empty() {
                    imports.push(s.trim().to_string());
                }
            }
        }
        Some(_) => {
            return Err(Error::msg(format!(
                "invalid imports in {} (expected array)",
                path.display()
            )));
        }
    }
    Ok((extends, imports))
}

// `extends` is the base; `imports` layer over it; the file's own keys win.
fn load_value_inner(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !stack.insert(canonical.clone()) {
        return Err(Error::msg(format!(
            "config include cycle detected at {}",
            canonical.display()
        )));
    }

    let data = fs::read_to_string(path)
        .map_err(|e| Error::msg(format!("failed to read config {}: {e}", path.display())))?;
    let mut value: Value = toml::from_str(&data)
        .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;

    let (extends, imports) = match value.as_table_mut() {
        Some(tbl) => take_refs(path, tbl)?,
        None => (None, Vec::new()),
    };

    let mut out = Value::Table(Default::default());
    if let Some(ext) = extends {
        out = load_value_inner(&resolve_ref_path(path, &ext), stack)?;
    }
    for imp in imports {
        let loaded = load_value_inner(&resolve_ref_path(path, &imp), stack)?;
        merge_values(&mut out, loaded);
    }
    merge_values(&mut out, value);

    stack.remove(&canonical);
    Ok(out)
}

pub fn load(path: &Path) -> Result<DashboardConfig> {
    let mut stack = HashSet::<PathBuf>::new();
    let value = load_value_inner(path, &mut stack)?;
    value
        .try_into()
        .map_err(|e| Error::msg(format!("invalid config {}: {e}", path.display())))
}

/// Loads `path` if given (it must exist), otherwise `fut-dashboard.toml` when
/// present in the working directory, otherwise defaults. Environment
/// overrides are applied on top.
pub fn load_or_default(path: Option<&Path>) -> Result<DashboardConfig> {
    let mut cfg = match path {
        Some(p) => load(p)?,
        None => {
            let local = Path::new("fut-dashboard.toml");
            if local.is_file() {
                load(local)?
            } else {
                DashboardConfig::default()
            }
        }
    };
    cfg.apply_env()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).expect("write config");
        p
    }

    #[test]
    fn defaults_match_original_service() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(cfg.terminal.port, 57575);
        assert_eq!(cfg.server.request_timeout(), Duration::from_secs(30));
        assert!(!cfg.log.json);
    }

    #[test]
    fn extends_and_imports_merge_with_local_keys_winning() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "base.toml",
            "[server]\nbase_url = \"http://base:5000\"\nrequest_timeout_secs = 5\n",
        );
        write(dir.path(), "log.toml", "[log]\njson = true\nfilter = \"debug\"\n");
        let top = write(
            dir.path(),
            "top.toml",
            "extends = \"base.toml\"\nimports = [\"log.toml\"]\n[log]\nfilter = \"warn\"\n",
        );

        let cfg = load(&top).expect("load");
        assert_eq!(cfg.server.base_url, "http://base:5000");
        assert_eq!(cfg.server.request_timeout_secs, 5);
        assert_eq!(cfg.server.report_timeout_secs, 900);
        assert!(cfg.log.json);
        assert_eq!(cfg.log.filter, "warn");
    }

    #[test]
    fn include_cycles_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "a.toml", "extends = \"b.toml\"\n");
        let b = write(dir.path(), "b.toml", "extends = \"a.toml\"\n");
        let err = load(&b).expect_err("cycle");
        assert!(err.to_string().contains("cycle"), "{err}");
    }

    #[test]
    fn env_overrides_url_and_port() {
        let mut cfg = DashboardConfig::default();
        cfg.apply_env_from(|k| match k {
            ENV_URL => Some("http://fut:8080 ".into()),
            ENV_TERMINAL_PORT => Some("6000".into()),
            _ => None,
        })
        .expect("apply env");
        assert_eq!(cfg.server.base_url, "http://fut:8080");
        assert_eq!(cfg.terminal.port, 6000);

        let err = cfg
            .apply_env_from(|k| (k == ENV_TERMINAL_PORT).then(|| "x".to_string()))
            .expect_err("bad port");
        assert!(err.to_string().contains(ENV_TERMINAL_PORT));
    }
}
