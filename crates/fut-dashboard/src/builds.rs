//! Cached build list and the report load lifecycle.
//!
//! The controller owns the displayed list and the busy flag. Every request it
//! issues carries a [`Ticket`]; replies are matched against what is still
//! pending so that late completions from superseded work are dropped instead
//! of clobbering newer state:
//!
//! - only one report load is pending at a time, a new `load` replaces it;
//! - busy is set when a load is dispatched and cleared by its failure or by
//!   the display sink's content-loaded signal for that exact assignment;
//! - a list reply older than the last applied one is ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::api::{self, ApiCall, Status};
use crate::error::Error;
use crate::events::{UiEvent, UiSink};
use crate::remote::{DisplaySink, DisplayToken, RemoteCall, Reply, Ticket, TicketSeq};
use crate::sanitize::{sanitize_message, sanitize_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    pub name: String,
}

impl Build {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn display_name(&self) -> String {
        sanitize_name(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStage {
    /// Waiting for the backend to serve or generate the report.
    Requested,
    /// URL handed to the display sink; waiting for its content-loaded signal.
    Rendering { url: String, token: DisplayToken },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub ticket: Ticket,
    pub build: String,
    pub rebuild: bool,
    pub stage: LoadStage,
}

pub struct BuildCacheController {
    remote: Arc<dyn RemoteCall>,
    display: Arc<dyn DisplaySink>,
    sink: Arc<dyn UiSink>,
    seq: Arc<TicketSeq>,

    builds: Vec<Build>,
    list_applied: Option<Ticket>,
    list_in_flight: BTreeSet<Ticket>,

    pending_load: Option<PendingLoad>,
    pending_deletes: BTreeMap<Ticket, String>,
}

impl BuildCacheController {
    pub fn new(
        remote: Arc<dyn RemoteCall>,
        display: Arc<dyn DisplaySink>,
        sink: Arc<dyn UiSink>,
        seq: Arc<TicketSeq>,
    ) -> Self {
        Self {
            remote,
            display,
            sink,
            seq,
            builds: Vec::new(),
            list_applied: None,
            list_in_flight: BTreeSet::new(),
            pending_load: None,
            pending_deletes: BTreeMap::new(),
        }
    }

    pub fn builds(&self) -> &[Build] {
        &self.builds
    }

    pub fn busy(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn pending_load(&self) -> Option<&PendingLoad> {
        self.pending_load.as_ref()
    }

    pub fn list_in_flight(&self) -> bool {
        !self.list_in_flight.is_empty()
    }

    pub fn deletes_in_flight(&self) -> impl Iterator<Item = &str> {
        self.pending_deletes.values().map(String::as_str)
    }

    pub fn refresh_list(&mut self) -> Ticket {
        let ticket = self.seq.ticket();
        self.list_in_flight.insert(ticket);
        self.remote.dispatch(ticket, ApiCall::ListBuilds);
        ticket
    }

    /// Serves the cached report for `build`, or regenerates it when
    /// `rebuild` is set. Any load still pending is superseded.
    pub fn load(&mut self, build: &str, rebuild: bool) -> Ticket {
        if let Some(prev) = self.pending_load.take() {
            tracing::info!(
                build = %prev.build,
                ticket = prev.ticket.0,
                "superseding pending report load"
            );
        }
        let ticket = self.seq.ticket();
        self.pending_load = Some(PendingLoad {
            ticket,
            build: build.to_string(),
            rebuild,
            stage: LoadStage::Requested,
        });
        self.sink.emit(UiEvent::BusyChanged { busy: true });
        tracing::info!(build, rebuild, ticket = ticket.0, "requesting report");
        self.remote.dispatch(
            ticket,
            ApiCall::LoadReport {
                build: build.to_string(),
                rebuild,
            },
        );
        ticket
    }

    /// Drops the pending load, if any. Its late completions are ignored.
    pub fn cancel_load(&mut self) -> bool {
        let Some(prev) = self.pending_load.take() else {
            return false;
        };
        tracing::info!(build = %prev.build, ticket = prev.ticket.0, "report load cancelled");
        self.sink.emit(UiEvent::BusyChanged { busy: false });
        true
    }

    pub fn delete(&mut self, build: &str) -> Ticket {
        let ticket = self.seq.ticket();
        self.pending_deletes.insert(ticket, build.to_string());
        tracing::info!(build, ticket = ticket.0, "requesting report deletion");
        self.remote.dispatch(
            ticket,
            ApiCall::DeleteReport {
                build: build.to_string(),
            },
        );
        ticket
    }

    pub fn handle_reply(&mut self, reply: Reply) {
        match reply.call {
            ApiCall::ListBuilds => self.on_list_reply(reply.ticket, reply.outcome),
            ApiCall::LoadReport { .. } => self.on_load_reply(reply.ticket, reply.outcome),
            ApiCall::DeleteReport { .. } => self.on_delete_reply(reply.ticket, reply.outcome),
            other => {
                tracing::warn!(call = other.label(), "build controller got unrelated reply");
            }
        }
    }

    /// Display sink signal for the URL assigned under `token`.
    pub fn content_loaded(&mut self, token: DisplayToken, error: Option<String>) {
        let matches = matches!(
            &self.pending_load,
            Some(PendingLoad { stage: LoadStage::Rendering { token: t, .. }, .. }) if *t == token
        );
        if !matches {
            tracing::debug!(token = token.0, "ignoring stale content-loaded signal");
            return;
        }
        let Some(done) = self.pending_load.take() else {
            return;
        };
        let LoadStage::Rendering { url, .. } = done.stage else {
            return;
        };
        self.sink.emit(UiEvent::BusyChanged { busy: false });
        match error {
            None => {
                tracing::info!(build = %done.build, url = %url, "report ready");
                self.sink.emit(UiEvent::ReportReady {
                    build: done.build,
                    url,
                });
            }
            Some(e) => {
                self.alert(format!("failed to display report {url}: {e}"));
            }
        }
    }

    fn on_list_reply(&mut self, ticket: Ticket, outcome: crate::Result<serde_json::Value>) {
        self.list_in_flight.remove(&ticket);
        let names = match outcome.and_then(|body| api::decode_build_names(&body)) {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(ticket = ticket.0, "build list refresh failed: {e}");
                return;
            }
        };
        if self.list_applied.is_some_and(|applied| applied > ticket) {
            tracing::debug!(ticket = ticket.0, "ignoring out-of-date build list");
            return;
        }
        self.list_applied = Some(ticket);
        self.builds = names.into_iter().map(Build::new).collect();
        tracing::debug!(count = self.builds.len(), "build list replaced");
        self.sink.emit(UiEvent::BuildsReplaced {
            builds: self.builds.clone(),
        });
    }

    fn on_load_reply(&mut self, ticket: Ticket, outcome: crate::Result<serde_json::Value>) {
        let Some(pending) = self.pending_load.as_mut() else {
            tracing::debug!(ticket = ticket.0, "ignoring load reply with nothing pending");
            return;
        };
        if pending.ticket != ticket || pending.stage != LoadStage::Requested {
            tracing::debug!(ticket = ticket.0, "ignoring superseded load reply");
            return;
        }

        let decoded = outcome.and_then(|body| api::decode_load_report(&body));
        match decoded {
            Ok(Status::Ok(url)) => {
                let token = self.seq.display_token();
                pending.stage = LoadStage::Rendering {
                    url: url.clone(),
                    token,
                };
                let build = pending.build.clone();
                tracing::info!(build = %build, url = %url, "loading report");
                self.sink.emit(UiEvent::ReportDisplayed {
                    build,
                    url: url.clone(),
                    token,
                });
                self.display.show(token, &url);
            }
            Ok(Status::Failed(msg)) => {
                let build = pending.build.clone();
                self.finish_failed_load();
                self.alert(msg.unwrap_or_else(|| format!("failed to load report for {build}")));
            }
            Err(e) => {
                tracing::warn!(ticket = ticket.0, "report load failed: {e}");
                self.finish_failed_load();
                self.alert(e.to_string());
            }
        }
    }

    fn finish_failed_load(&mut self) {
        self.pending_load = None;
        self.sink.emit(UiEvent::BusyChanged { busy: false });
    }

    fn on_delete_reply(&mut self, ticket: Ticket, outcome: crate::Result<serde_json::Value>) {
        let Some(build) = self.pending_deletes.remove(&ticket) else {
            tracing::debug!(ticket = ticket.0, "ignoring unknown delete reply");
            return;
        };
        let body = match outcome {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(build = %build, "delete failed: {e}");
                self.alert(e.to_string());
                return;
            }
        };
        match api::decode_delete_report(&body) {
            Ok(Status::Ok(())) => {
                tracing::info!(build = %build, "report deleted");
                self.sink.emit(UiEvent::BuildDeleted { build });
                self.refresh_list();
            }
            Ok(Status::Failed(msg)) => {
                self.alert(msg.unwrap_or_else(|| format!("failed to delete {build}")));
            }
            Err(e) => log_malformed("delete", &e),
        }
    }

    fn alert(&self, message: String) {
        self.sink.emit(UiEvent::Alert {
            message: sanitize_message(&message),
        });
    }
}

fn log_malformed(what: &str, e: &Error) {
    tracing::warn!(what, "ignoring response: {e}");
}
