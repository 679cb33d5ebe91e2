use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use fut_dashboard::api::ApiCall;
use fut_dashboard::dashboard::Dashboard;
use fut_dashboard::events::{UiEvent, UiSink};
use fut_dashboard::nav::{SECTION_BUILDS, View};
use fut_dashboard::remote::{DisplaySink, DisplayToken, Inbound, RemoteCall, Reply, Ticket};

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(Ticket, ApiCall)>>,
    shown: Mutex<Vec<(DisplayToken, String)>>,
    events: Mutex<Vec<UiEvent>>,
}

impl Recorder {
    fn calls(&self) -> Vec<(Ticket, ApiCall)> {
        self.calls.lock().expect("calls").clone()
    }

    fn last_call(&self) -> (Ticket, ApiCall) {
        self.calls().last().cloned().expect("at least one call")
    }

    fn count(&self, pred: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls().iter().filter(|(_, c)| pred(c)).count()
    }

    fn shown(&self) -> Vec<(DisplayToken, String)> {
        self.shown.lock().expect("shown").clone()
    }

    fn alerts(&self) -> Vec<String> {
        self.events
            .lock()
            .expect("events")
            .iter()
            .filter_map(|e| match e {
                UiEvent::Alert { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl RemoteCall for Recorder {
    fn dispatch(&self, ticket: Ticket, call: ApiCall) {
        self.calls.lock().expect("calls").push((ticket, call));
    }
}

impl DisplaySink for Recorder {
    fn show(&self, token: DisplayToken, url: &str) {
        self.shown.lock().expect("shown").push((token, url.to_string()));
    }
}

impl UiSink for Recorder {
    fn emit(&self, ev: UiEvent) {
        self.events.lock().expect("events").push(ev);
    }
}

fn dashboard() -> (Arc<Recorder>, Dashboard) {
    let rec = Arc::new(Recorder::default());
    let dash = Dashboard::new(rec.clone(), rec.clone(), rec.clone());
    (rec, dash)
}

fn answer(dash: &mut Dashboard, (ticket, call): (Ticket, ApiCall), body: Value) {
    dash.handle(Inbound::Reply(Reply {
        ticket,
        call,
        outcome: Ok(body),
    }));
}

fn build_names(dash: &Dashboard) -> Vec<String> {
    dash.builds()
        .builds()
        .iter()
        .map(|b| b.name.clone())
        .collect()
}

#[test]
fn showing_builds_section_refreshes_every_time() {
    let (rec, mut dash) = dashboard();
    dash.activate(View::ReportViewer);
    dash.show_section(SECTION_BUILDS);
    answer(&mut dash, rec.last_call(), json!({"data": ["run-1", "run-2"]}));
    assert_eq!(build_names(&dash), vec!["run-1", "run-2"]);

    dash.hide_section(SECTION_BUILDS);
    dash.show_section(SECTION_BUILDS);
    assert_eq!(rec.count(|c| *c == ApiCall::ListBuilds), 2);
}

#[test]
fn load_navigates_before_the_result_is_known() {
    let (rec, mut dash) = dashboard();
    dash.show_section(SECTION_BUILDS);
    assert_eq!(dash.nav().active(), View::Terminal);

    dash.load_report("run-1", false);
    assert_eq!(dash.nav().active(), View::ReportViewer);
    assert!(!dash.nav().section_visible(SECTION_BUILDS));
    assert!(dash.busy());

    answer(
        &mut dash,
        rec.last_call(),
        json!({"success": false, "data": "engine busy"}),
    );
    assert!(!dash.busy());
    assert_eq!(rec.alerts(), vec!["engine busy".to_string()]);
    // No automatic navigation back to the list.
    assert_eq!(dash.nav().active(), View::ReportViewer);
    assert!(!dash.nav().section_visible(SECTION_BUILDS));
}

#[test]
fn rebuild_busy_until_display_signals_loaded() {
    let (rec, mut dash) = dashboard();
    dash.load_report("run-1", true);
    let call = rec.last_call();
    assert_eq!(
        call.1,
        ApiCall::LoadReport {
            build: "run-1".into(),
            rebuild: true
        }
    );
    answer(
        &mut dash,
        call,
        json!({"success": true, "url": "/reports/run-1/index.html"}),
    );

    let shown = rec.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].1, "/reports/run-1/index.html");
    assert!(dash.busy());

    dash.handle(Inbound::ContentLoaded {
        token: shown[0].0,
        error: None,
    });
    assert!(!dash.busy());

    // A duplicate signal for the same assignment changes nothing.
    dash.handle(Inbound::ContentLoaded {
        token: shown[0].0,
        error: None,
    });
    assert!(!dash.busy());
}

#[test]
fn repeated_cached_loads_never_request_rebuild() {
    let (rec, mut dash) = dashboard();
    for _ in 0..2 {
        dash.load_report("run-1", false);
        answer(
            &mut dash,
            rec.last_call(),
            json!({"success": true, "url": "/static/reports/run-1/index.html"}),
        );
        let token = rec.shown().last().map(|s| s.0).expect("shown");
        dash.handle(Inbound::ContentLoaded { token, error: None });
    }
    assert_eq!(
        rec.count(|c| matches!(c, ApiCall::LoadReport { rebuild: false, .. })),
        2
    );
    assert_eq!(
        rec.count(|c| matches!(c, ApiCall::LoadReport { rebuild: true, .. })),
        0
    );
}

#[test]
fn late_reply_from_superseded_load_is_ignored() {
    let (rec, mut dash) = dashboard();
    dash.load_report("run-1", false);
    let first = rec.last_call();
    dash.load_report("run-2", false);
    let second = rec.last_call();

    answer(&mut dash, second, json!({"success": true, "url": "/r2"}));
    answer(&mut dash, first, json!({"success": true, "url": "/r1"}));

    let shown = rec.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].1, "/r2");
    dash.handle(Inbound::ContentLoaded {
        token: shown[0].0,
        error: None,
    });
    assert!(!dash.busy());
}

#[test]
fn delete_success_triggers_one_refresh_and_failure_none() {
    let (rec, mut dash) = dashboard();
    dash.delete_report("run-1");
    answer(&mut dash, rec.last_call(), json!({"success": true}));
    assert_eq!(rec.count(|c| *c == ApiCall::ListBuilds), 1);
    answer(&mut dash, rec.last_call(), json!({"data": ["run-2"]}));
    assert_eq!(build_names(&dash), vec!["run-2"]);

    dash.delete_report("run-2");
    answer(
        &mut dash,
        rec.last_call(),
        json!({"success": false, "data": "permission denied"}),
    );
    assert_eq!(rec.count(|c| *c == ApiCall::ListBuilds), 1);
    assert_eq!(build_names(&dash), vec!["run-2"]);
    assert_eq!(rec.alerts(), vec!["permission denied".to_string()]);
}

#[test]
fn env_replies_route_to_env_editor() {
    let (rec, mut dash) = dashboard();
    dash.fetch_env();
    answer(
        &mut dash,
        rec.last_call(),
        json!({"success": true, "data": {"A": null, "B": "", "C": "null"}}),
    );
    assert_eq!(dash.env().rows().len(), 3);

    dash.set_env_text("A", "1");
    dash.set_env_text("B", "");
    dash.set_env_text("C", "null");
    dash.submit_env().expect("one submit");

    let (_, call) = rec.last_call();
    let ApiCall::SetEnv { values } = call else {
        panic!("expected a set env call");
    };
    assert_eq!(values.len(), 1);
    assert_eq!(values.get("A").map(String::as_str), Some("1"));
}

#[test]
fn fetched_env_submits_set_rows_without_edits() {
    let (rec, mut dash) = dashboard();
    dash.fetch_env();
    answer(
        &mut dash,
        rec.last_call(),
        json!({"success": true, "data": {"A": "1", "B": "", "C": "null"}}),
    );
    dash.submit_env().expect("one submit");

    assert_eq!(rec.count(|c| matches!(c, ApiCall::SetEnv { .. })), 1);
    let (_, call) = rec.last_call();
    let ApiCall::SetEnv { values } = call else {
        panic!("expected a set env call");
    };
    assert_eq!(values.len(), 1);
    assert_eq!(values.get("A").map(String::as_str), Some("1"));
}
