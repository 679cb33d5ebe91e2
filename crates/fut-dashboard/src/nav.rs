use std::collections::BTreeSet;
use std::fmt;

/// Collapsible list of cached builds inside the report viewer.
pub const SECTION_BUILDS: &str = "builds_nav";
/// Collapsible environment table inside the setup view.
pub const SECTION_SETUP: &str = "setup_nav";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Terminal,
    ReportViewer,
    EnvEditor,
}

impl View {
    pub const ALL: [View; 3] = [View::Terminal, View::ReportViewer, View::EnvEditor];

    pub fn title(self) -> &'static str {
        match self {
            View::Terminal => "Terminal",
            View::ReportViewer => "Reports",
            View::EnvEditor => "Setup",
        }
    }

    pub fn index(self) -> usize {
        match self {
            View::Terminal => 0,
            View::ReportViewer => 1,
            View::EnvEditor => 2,
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    active: View,
    visible_sections: BTreeSet<String>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            active: View::Terminal,
            visible_sections: BTreeSet::new(),
        }
    }
}

impl NavigationState {
    pub fn active(&self) -> View {
        self.active
    }

    pub fn is_visible(&self, view: View) -> bool {
        self.active == view
    }

    /// Returns false when `view` was already active.
    pub fn activate(&mut self, view: View) -> bool {
        if self.active == view {
            return false;
        }
        self.active = view;
        true
    }

    pub fn next(&mut self) -> View {
        let i = (self.active.index() + 1) % View::ALL.len();
        self.active = View::ALL[i];
        self.active
    }

    pub fn prev(&mut self) -> View {
        let i = (self.active.index() + View::ALL.len() - 1) % View::ALL.len();
        self.active = View::ALL[i];
        self.active
    }

    pub fn section_visible(&self, section: &str) -> bool {
        self.visible_sections.contains(section)
    }

    /// Returns false when the section was already shown.
    pub fn show(&mut self, section: &str) -> bool {
        self.visible_sections.insert(section.to_string())
    }

    /// Returns false when the section was already hidden.
    pub fn hide(&mut self, section: &str) -> bool {
        self.visible_sections.remove(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_view_is_visible() {
        let mut nav = NavigationState::default();
        assert!(nav.activate(View::EnvEditor));
        assert!(!nav.activate(View::EnvEditor));
        let visible: Vec<_> = View::ALL.into_iter().filter(|v| nav.is_visible(*v)).collect();
        assert_eq!(visible, vec![View::EnvEditor]);
    }

    #[test]
    fn sections_toggle_independently_of_views() {
        let mut nav = NavigationState::default();
        assert!(nav.show(SECTION_BUILDS));
        assert!(!nav.show(SECTION_BUILDS));
        nav.show(SECTION_SETUP);
        nav.activate(View::ReportViewer);
        assert!(nav.hide(SECTION_BUILDS));
        assert!(!nav.section_visible(SECTION_BUILDS));
        assert!(nav.section_visible(SECTION_SETUP));
        assert!(!nav.hide(SECTION_BUILDS));
    }

    #[test]
    fn tab_cycling_wraps() {
        let mut nav = NavigationState::default();
        assert_eq!(nav.prev(), View::EnvEditor);
        assert_eq!(nav.next(), View::Terminal);
        assert_eq!(nav.next(), View::ReportViewer);
    }
}
