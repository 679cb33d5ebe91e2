use std::sync::Arc;

use crate::api::ApiCall;
use crate::builds::BuildCacheController;
use crate::env::EnvEditorController;
use crate::events::{UiEvent, UiSink};
use crate::nav::{NavigationState, SECTION_BUILDS, View};
use crate::remote::{DisplaySink, Inbound, RemoteCall, Ticket, TicketSeq};

/// Owns the view state and both controllers, and routes background
/// completions to whichever of them issued the request.
pub struct Dashboard {
    nav: NavigationState,
    builds: BuildCacheController,
    env: EnvEditorController,
    sink: Arc<dyn UiSink>,
}

impl Dashboard {
    pub fn new(
        remote: Arc<dyn RemoteCall>,
        display: Arc<dyn DisplaySink>,
        sink: Arc<dyn UiSink>,
    ) -> Self {
        let seq = Arc::new(TicketSeq::default());
        Self {
            nav: NavigationState::default(),
            builds: BuildCacheController::new(
                remote.clone(),
                display,
                sink.clone(),
                seq.clone(),
            ),
            env: EnvEditorController::new(remote, sink.clone(), seq),
            sink,
        }
    }

    pub fn nav(&self) -> &NavigationState {
        &self.nav
    }

    pub fn builds(&self) -> &BuildCacheController {
        &self.builds
    }

    pub fn env(&self) -> &EnvEditorController {
        &self.env
    }

    pub fn busy(&self) -> bool {
        self.builds.busy()
    }

    pub fn activate(&mut self, view: View) {
        if self.nav.activate(view) {
            self.sink.emit(UiEvent::ViewChanged { view });
        }
    }

    pub fn next_view(&mut self) {
        let view = self.nav.next();
        self.sink.emit(UiEvent::ViewChanged { view });
    }

    pub fn prev_view(&mut self) {
        let view = self.nav.prev();
        self.sink.emit(UiEvent::ViewChanged { view });
    }

    /// Shows a section. The builds section re-fetches its list on every show.
    pub fn show_section(&mut self, section: &str) {
        if self.nav.show(section) {
            self.sink.emit(UiEvent::SectionToggled {
                section: section.to_string(),
                visible: true,
            });
        }
        if section == SECTION_BUILDS {
            self.builds.refresh_list();
        }
    }

    pub fn hide_section(&mut self, section: &str) {
        if self.nav.hide(section) {
            self.sink.emit(UiEvent::SectionToggled {
                section: section.to_string(),
                visible: false,
            });
        }
    }

    pub fn toggle_section(&mut self, section: &str) {
        if self.nav.section_visible(section) {
            self.hide_section(section);
        } else {
            self.show_section(section);
        }
    }

    pub fn refresh_builds(&mut self) -> Ticket {
        self.builds.refresh_list()
    }

    /// Switches to the report viewer before the result is known, then
    /// requests the report.
    pub fn load_report(&mut self, build: &str, rebuild: bool) -> Ticket {
        self.hide_section(SECTION_BUILDS);
        self.activate(View::ReportViewer);
        self.builds.load(build, rebuild)
    }

    pub fn cancel_load(&mut self) -> bool {
        self.builds.cancel_load()
    }

    pub fn delete_report(&mut self, build: &str) -> Ticket {
        self.builds.delete(build)
    }

    pub fn fetch_env(&mut self) -> Ticket {
        self.env.fetch_and_render()
    }

    pub fn set_env_text(&mut self, name: &str, text: &str) -> bool {
        self.env.set_text(name, text)
    }

    pub fn submit_env(&mut self) -> Option<Ticket> {
        self.env.submit()
    }

    pub fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Reply(reply) => match reply.call {
                ApiCall::ListBuilds | ApiCall::LoadReport { .. } | ApiCall::DeleteReport { .. } => {
                    self.builds.handle_reply(reply)
                }
                ApiCall::GetEnv | ApiCall::SetEnv { .. } => self.env.handle_reply(reply),
            },
            Inbound::ContentLoaded { token, error } => self.builds.content_loaded(token, error),
        }
    }
}
