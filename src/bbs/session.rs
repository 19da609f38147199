use chrono::{DateTime, Local};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ScreenConfig;
use crate::mecca::{HaltReason, RunOutcome, RunReport};

/// Represents one caller connected to the BBS
#[derive(Debug, Clone)]
pub struct Session {
    pub node: u32,
    pub peer: String,
    pub username: Option<String>,
    pub user_level: u16,
    pub login_time: DateTime<Local>,
    pub last_activity: DateTime<Local>,
    /// Session length limit in minutes.
    pub time_limit: u32,
    pub ansi: bool,
    pub help_level: String,
    pub state: ScreenState,
}

/// Screen a session is on. Each maps to a configured template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenState {
    Connect,
    Login,
    MainMenu,
    Disconnected,
}

impl ScreenState {
    /// Template for this screen, or `None` once disconnected.
    pub fn template<'a>(&self, screens: &'a ScreenConfig) -> Option<&'a str> {
        match self {
            ScreenState::Connect => Some(screens.connect.as_str()),
            ScreenState::Login => Some(screens.login.as_str()),
            ScreenState::MainMenu => Some(screens.main_menu.as_str()),
            ScreenState::Disconnected => None,
        }
    }
}

impl Session {
    pub fn new(node: u32, peer: String, time_limit: u32) -> Self {
        let now = Local::now();
        Session {
            node,
            peer,
            username: None,
            user_level: 0,
            login_time: now,
            last_activity: now,
            time_limit,
            ansi: true,
            help_level: "regular".to_string(),
            state: ScreenState::Connect,
        }
    }

    /// Log in a user
    pub fn login(&mut self, username: String, user_level: u16) {
        info!("User {} logged in on node {} from {}", username, self.node, self.peer);
        self.username = Some(username);
        self.user_level = user_level;
    }

    /// Log out the user
    pub fn logout(&mut self) {
        if let Some(ref username) = self.username {
            info!("User {} logged out from node {}", username, self.node);
        }
        self.username = None;
        self.user_level = 0;
        self.state = ScreenState::Disconnected;
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    /// Get the username, or "Guest" if not logged in
    pub fn display_name(&self) -> String {
        self.username.clone().unwrap_or_else(|| "Guest".to_string())
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Local::now();
    }

    /// Move to the next screen given how the current screen's template ended.
    /// The login screen's response becomes the user name.
    pub fn advance(&mut self, report: &RunReport, default_level: u16) -> ScreenState {
        self.update_activity();
        let next = match (self.state, &report.outcome) {
            (_, RunOutcome::Aborted(_)) => ScreenState::Disconnected,
            (_, RunOutcome::Halted(HaltReason::Hangup | HaltReason::Quit)) => {
                ScreenState::Disconnected
            }
            (ScreenState::Connect, _) => ScreenState::Login,
            (ScreenState::Login, _) => {
                match report.response.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
                    Some(name) => self.login(name.to_string(), default_level),
                    None => {
                        debug!("node {} left login without a name, continuing as guest", self.node)
                    }
                }
                ScreenState::MainMenu
            }
            (ScreenState::MainMenu | ScreenState::Disconnected, _) => ScreenState::Disconnected,
        };
        debug!("node {}: {:?} -> {:?}", self.node, self.state, next);
        if next == ScreenState::Disconnected {
            self.logout();
        } else {
            self.state = next;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mecca::RunError;

    fn report(outcome: RunOutcome, response: Option<&str>) -> RunReport {
        RunReport { outcome, response: response.map(str::to_string) }
    }

    #[test]
    fn walks_connect_login_menu() {
        let mut session = Session::new(1, "10.0.0.2:1234".into(), 60);
        assert_eq!(session.advance(&report(RunOutcome::Completed, None), 30), ScreenState::Login);
        let named = report(RunOutcome::Completed, Some(" Ada \r"));
        assert_eq!(session.advance(&named, 30), ScreenState::MainMenu);
        assert_eq!(session.display_name(), "Ada");
        assert_eq!(session.user_level, 30);
        let done = report(RunOutcome::Completed, None);
        assert_eq!(session.advance(&done, 30), ScreenState::Disconnected);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn hangup_and_abort_disconnect() {
        let mut session = Session::new(1, "10.0.0.2:1234".into(), 60);
        assert_eq!(
            session.advance(&report(RunOutcome::Halted(HaltReason::Hangup), None), 30),
            ScreenState::Disconnected
        );
        let mut session = Session::new(2, "10.0.0.3:1234".into(), 60);
        session.advance(&report(RunOutcome::Completed, None), 30);
        assert_eq!(
            session.advance(&report(RunOutcome::Aborted(RunError::InputClosed), Some("x")), 30),
            ScreenState::Disconnected
        );
        assert_eq!(session.display_name(), "Guest");
    }

    #[test]
    fn screens_map_to_templates() {
        let screens = ScreenConfig::default();
        assert_eq!(ScreenState::Login.template(&screens), Some("misc/login"));
        assert_eq!(ScreenState::Disconnected.template(&screens), None);
    }
}
