use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::{self, ApiCall, Status};
use crate::events::{UiEvent, UiSink};
use crate::remote::{RemoteCall, Reply, Ticket, TicketSeq};
use crate::sanitize::sanitize_message;

/// Sentinel the backend and the original editor use for "not set".
pub const NULL_SENTINEL: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnvValue {
    #[default]
    Unset,
    Value(String),
}

impl EnvValue {
    /// Text-field input: empty and `"null"` mean "leave unchanged".
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() || text == NULL_SENTINEL {
            EnvValue::Unset
        } else {
            EnvValue::Value(text.to_string())
        }
    }

    pub fn from_wire(v: Option<String>) -> Self {
        match v {
            Some(s) => Self::from_text(&s),
            None => EnvValue::Unset,
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            EnvValue::Unset => "",
            EnvValue::Value(v) => v,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, EnvValue::Value(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvRow {
    pub name: String,
    /// Value as last fetched from the server.
    pub seeded: EnvValue,
    pub value: EnvValue,
}

impl EnvRow {
    pub fn changed(&self) -> bool {
        self.value != self.seeded
    }
}

pub struct EnvEditorController {
    remote: Arc<dyn RemoteCall>,
    sink: Arc<dyn UiSink>,
    seq: Arc<TicketSeq>,
    rows: Vec<EnvRow>,
    fetch_ticket: Option<Ticket>,
    submits: BTreeMap<Ticket, BTreeMap<String, String>>,
}

impl EnvEditorController {
    pub fn new(remote: Arc<dyn RemoteCall>, sink: Arc<dyn UiSink>, seq: Arc<TicketSeq>) -> Self {
        Self {
            remote,
            sink,
            seq,
            rows: Vec::new(),
            fetch_ticket: None,
            submits: BTreeMap::new(),
        }
    }

    pub fn rows(&self) -> &[EnvRow] {
        &self.rows
    }

    pub fn fetching(&self) -> bool {
        self.fetch_ticket.is_some()
    }

    pub fn submitting(&self) -> bool {
        !self.submits.is_empty()
    }

    pub fn fetch_and_render(&mut self) -> Ticket {
        let ticket = self.seq.ticket();
        self.fetch_ticket = Some(ticket);
        self.remote.dispatch(ticket, ApiCall::GetEnv);
        ticket
    }

    /// Edits a row from text input. Returns false for unknown names.
    pub fn set_text(&mut self, name: &str, text: &str) -> bool {
        match self.rows.iter_mut().find(|r| r.name == name) {
            Some(row) => {
                row.value = EnvValue::from_text(text);
                true
            }
            None => false,
        }
    }

    /// Every row that carries a value. Unset rows are never sent: unset
    /// means "leave unchanged", not "clear".
    pub fn submit_payload(&self) -> BTreeMap<String, String> {
        self.rows
            .iter()
            .filter_map(|r| match &r.value {
                EnvValue::Value(v) => Some((r.name.clone(), v.clone())),
                EnvValue::Unset => None,
            })
            .collect()
    }

    /// Posts every set row. No-op (and no network call) when nothing
    /// would be sent.
    pub fn submit(&mut self) -> Option<Ticket> {
        let values = self.submit_payload();
        if values.is_empty() {
            tracing::debug!("environment submit skipped, no row is set");
            return None;
        }
        let ticket = self.seq.ticket();
        tracing::info!(count = values.len(), ticket = ticket.0, "submitting environment");
        self.submits.insert(ticket, values.clone());
        self.remote.dispatch(ticket, ApiCall::SetEnv { values });
        Some(ticket)
    }

    pub fn handle_reply(&mut self, reply: Reply) {
        match reply.call {
            ApiCall::GetEnv => self.on_fetch_reply(reply.ticket, reply.outcome),
            ApiCall::SetEnv { .. } => self.on_submit_reply(reply.ticket, reply.outcome),
            other => {
                tracing::warn!(call = other.label(), "env controller got unrelated reply");
            }
        }
    }

    fn on_fetch_reply(&mut self, ticket: Ticket, outcome: crate::Result<serde_json::Value>) {
        if self.fetch_ticket != Some(ticket) {
            tracing::debug!(ticket = ticket.0, "ignoring superseded env fetch");
            return;
        }
        self.fetch_ticket = None;

        let decoded = match outcome.and_then(|body| api::decode_env(&body)) {
            Ok(d) => d,
            Err(e) => {
                self.rows.clear();
                self.sink.emit(UiEvent::Alert {
                    message: sanitize_message(&e.to_string()),
                });
                return;
            }
        };
        match decoded {
            Status::Ok(map) => {
                self.rows = map
                    .into_iter()
                    .map(|(name, v)| {
                        let v = EnvValue::from_wire(v);
                        EnvRow {
                            name,
                            seeded: v.clone(),
                            value: v,
                        }
                    })
                    .collect();
                tracing::debug!(count = self.rows.len(), "environment rendered");
                self.sink.emit(UiEvent::EnvRendered {
                    rows: self.rows.clone(),
                });
            }
            Status::Failed(msg) => {
                self.rows.clear();
                self.sink.emit(UiEvent::Alert {
                    message: sanitize_message(
                        msg.as_deref().unwrap_or("failed to read environment"),
                    ),
                });
            }
        }
    }

    // The ack body is opaque; only transport failures are reported.
    fn on_submit_reply(&mut self, ticket: Ticket, outcome: crate::Result<serde_json::Value>) {
        let Some(sent) = self.submits.remove(&ticket) else {
            return;
        };
        match outcome {
            Err(e) if e.kind() == crate::error::ErrorKind::Unavailable => {
                tracing::warn!(ticket = ticket.0, "environment submit failed: {e}");
                self.sink.emit(UiEvent::Alert {
                    message: sanitize_message(&e.to_string()),
                });
            }
            _ => {
                for row in self.rows.iter_mut() {
                    if let Some(v) = sent.get(&row.name) {
                        row.seeded = EnvValue::Value(v.clone());
                    }
                }
                self.sink.emit(UiEvent::EnvSubmitted {
                    names: sent.into_keys().collect(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::Error;
    use crate::events::testing::RecordingSink;

    #[derive(Default)]
    struct FakeRemote {
        calls: Mutex<Vec<(Ticket, ApiCall)>>,
    }

    impl RemoteCall for FakeRemote {
        fn dispatch(&self, ticket: Ticket, call: ApiCall) {
            self.calls.lock().expect("calls lock").push((ticket, call));
        }
    }

    fn controller() -> (Arc<FakeRemote>, Arc<RecordingSink>, EnvEditorController) {
        let remote = Arc::new(FakeRemote::default());
        let sink = Arc::new(RecordingSink::default());
        let ctl = EnvEditorController::new(
            remote.clone(),
            sink.clone(),
            Arc::new(TicketSeq::default()),
        );
        (remote, sink, ctl)
    }

    fn fetched(body: serde_json::Value) -> (Arc<FakeRemote>, Arc<RecordingSink>, EnvEditorController) {
        let (remote, sink, mut ctl) = controller();
        let t = ctl.fetch_and_render();
        ctl.handle_reply(Reply {
            ticket: t,
            call: ApiCall::GetEnv,
            outcome: Ok(body),
        });
        remote.calls.lock().expect("calls lock").clear();
        (remote, sink, ctl)
    }

    #[test]
    fn text_sentinels_map_to_unset() {
        assert_eq!(EnvValue::from_text(""), EnvValue::Unset);
        assert_eq!(EnvValue::from_text("null"), EnvValue::Unset);
        assert_eq!(EnvValue::from_text("NULL"), EnvValue::Value("NULL".into()));
        assert_eq!(EnvValue::from_wire(None), EnvValue::Unset);
    }

    #[test]
    fn fetch_renders_one_row_per_key() {
        let (_, sink, ctl) = fetched(json!({
            "success": true,
            "data": {"DUT_CFG_FOLDER": "PP203X", "REF_CFG_FOLDER": null}
        }));
        let names: Vec<_> = ctl.rows().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["DUT_CFG_FOLDER", "REF_CFG_FOLDER"]);
        assert_eq!(ctl.rows()[0].value, EnvValue::Value("PP203X".into()));
        assert_eq!(ctl.rows()[1].value, EnvValue::Unset);
        assert!(matches!(sink.events().last(), Some(UiEvent::EnvRendered { .. })));
    }

    #[test]
    fn fetch_failure_alerts_and_renders_nothing() {
        let (_, sink, ctl) = fetched(json!({"success": false, "data": "no env file"}));
        assert!(ctl.rows().is_empty());
        assert_eq!(sink.alerts(), vec!["no env file".to_string()]);
    }

    #[test]
    fn submit_with_only_unset_rows_makes_no_call() {
        let (remote, _, mut ctl) = fetched(json!({"success": true, "data": {"A": "1", "B": ""}}));
        ctl.set_text("A", "null");
        ctl.set_text("B", "");
        assert_eq!(ctl.submit(), None);
        assert!(remote.calls.lock().expect("calls lock").is_empty());
    }

    #[test]
    fn submit_sends_fetched_values_without_edits() {
        let (remote, _, mut ctl) =
            fetched(json!({"success": true, "data": {"A": "1", "B": "", "C": "null"}}));
        assert!(ctl.submit().is_some());

        let calls = remote.calls.lock().expect("calls lock").clone();
        assert_eq!(calls.len(), 1);
        let mut expected = BTreeMap::new();
        expected.insert("A".to_string(), "1".to_string());
        assert_eq!(calls[0].1, ApiCall::SetEnv { values: expected });
    }

    #[test]
    fn submit_carries_every_set_row() {
        let (remote, sink, mut ctl) =
            fetched(json!({"success": true, "data": {"A": null, "B": "x", "C": "y", "D": "z"}}));
        assert!(ctl.set_text("A", "1"));
        ctl.set_text("B", "");
        ctl.set_text("C", "null");
        assert!(!ctl.set_text("MISSING", "1"));

        let t = ctl.submit().expect("submit dispatched");
        let calls = remote.calls.lock().expect("calls lock").clone();
        assert_eq!(calls.len(), 1);
        let mut expected = BTreeMap::new();
        expected.insert("A".to_string(), "1".to_string());
        expected.insert("D".to_string(), "z".to_string());
        assert_eq!(calls[0].1, ApiCall::SetEnv { values: expected.clone() });

        ctl.handle_reply(Reply {
            ticket: t,
            call: ApiCall::SetEnv { values: expected },
            outcome: Ok(json!({})),
        });
        assert!(!ctl.rows()[0].changed());
        assert!(sink.events().contains(&UiEvent::EnvSubmitted {
            names: vec!["A".into(), "D".into()]
        }));
    }

    #[test]
    fn submit_transport_failure_alerts_and_keeps_changes() {
        let (_, sink, mut ctl) = fetched(json!({"success": true, "data": {"A": "1"}}));
        ctl.set_text("A", "2");
        let t = ctl.submit().expect("submit");
        ctl.handle_reply(Reply {
            ticket: t,
            call: ApiCall::SetEnv {
                values: ctl.submit_payload(),
            },
            outcome: Err(Error::unavailable("connection refused")),
        });
        assert!(ctl.rows()[0].changed());
        assert_eq!(
            sink.alerts(),
            vec!["service unavailable: connection refused".to_string()]
        );
    }
}
