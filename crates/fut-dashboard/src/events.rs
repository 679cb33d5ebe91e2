use std::sync::Mutex;
use std::sync::mpsc;

use crate::builds::Build;
use crate::env::EnvRow;
use crate::nav::View;
use crate::remote::{DisplayToken, resolve_url};

/// What the controllers tell the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ViewChanged {
        view: View,
    },
    SectionToggled {
        section: String,
        visible: bool,
    },
    BuildsReplaced {
        builds: Vec<Build>,
    },
    BusyChanged {
        busy: bool,
    },
    /// A URL was handed to the display sink.
    ReportDisplayed {
        build: String,
        url: String,
        token: DisplayToken,
    },
    ReportReady {
        build: String,
        url: String,
    },
    BuildDeleted {
        build: String,
    },
    EnvRendered {
        rows: Vec<EnvRow>,
    },
    EnvSubmitted {
        names: Vec<String>,
    },
    /// Blocking notification; the frontend must show it until acknowledged.
    Alert {
        message: String,
    },
}

pub trait UiSink: Send + Sync {
    fn emit(&self, ev: UiEvent);
}

pub struct ChannelSink {
    tx: Mutex<mpsc::Sender<UiEvent>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<UiEvent>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl UiSink for ChannelSink {
    fn emit(&self, ev: UiEvent) {
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(ev);
        }
    }
}

/// Line-oriented sink for the headless commands. Report URLs are printed
/// resolved against the backend base URL.
pub struct StdoutSink {
    base_url: String,
    alerts: Mutex<Vec<String>>,
}

impl StdoutSink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            alerts: Mutex::new(Vec::new()),
        }
    }

    pub fn take_alerts(&self) -> Vec<String> {
        self.alerts
            .lock()
            .map(|mut a| std::mem::take(&mut *a))
            .unwrap_or_default()
    }

    fn report_line(&self, tag: &str, build: &str, url: &str) -> String {
        match resolve_url(&self.base_url, url) {
            Ok(full) => format!("{tag}: {build} => {full}"),
            Err(_) => format!("{tag}: {build} => {url}"),
        }
    }
}

impl UiSink for StdoutSink {
    fn emit(&self, ev: UiEvent) {
        match ev {
            UiEvent::BuildsReplaced { builds } => {
                for b in builds {
                    println!("{}", b.display_name());
                }
            }
            UiEvent::ReportDisplayed { build, url, .. } => {
                println!("{}", self.report_line("LOADING", &build, &url));
            }
            UiEvent::ReportReady { build, url } => {
                println!("{}", self.report_line("READY", &build, &url));
            }
            UiEvent::BuildDeleted { build } => println!("DELETED: {build}"),
            UiEvent::EnvRendered { rows } => {
                for r in rows {
                    println!("{}={}", r.name, r.value.as_text());
                }
            }
            UiEvent::EnvSubmitted { names } => println!("SUBMITTED: {}", names.join(", ")),
            UiEvent::Alert { message } => {
                eprintln!("ERROR: {message}");
                if let Ok(mut a) = self.alerts.lock() {
                    a.push(message);
                }
            }
            UiEvent::ViewChanged { .. }
            | UiEvent::SectionToggled { .. }
            | UiEvent::BusyChanged { .. } => {}
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_report_lines_carry_resolved_urls() {
        let sink = StdoutSink::new("http://10.0.0.2:5000");
        assert_eq!(
            sink.report_line("READY", "run-1", "/reports/run-1/index.html"),
            "READY: run-1 => http://10.0.0.2:5000/reports/run-1/index.html"
        );
        assert_eq!(
            sink.report_line("READY", "run-1", "http://other/r.html"),
            "READY: run-1 => http://other/r.html"
        );
    }

    #[test]
    fn alerts_are_collected_once() {
        let sink = StdoutSink::new("http://h");
        sink.emit(UiEvent::Alert {
            message: "engine busy".into(),
        });
        assert_eq!(sink.take_alerts(), vec!["engine busy".to_string()]);
        assert!(sink.take_alerts().is_empty());
    }
}
