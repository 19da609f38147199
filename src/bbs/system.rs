//! Live BBS facts served to templates.

use chrono::{DateTime, Local};

use crate::config::BbsConfig;
use crate::mecca::{BbsContext, Field};
use super::session::Session;

/// Snapshot of system and caller facts for one template run.
#[derive(Debug, Clone)]
pub struct SessionContext {
    system_name: String,
    sysop_name: String,
    location: String,
    user: Option<String>,
    node: u32,
    peer: String,
    level: u16,
    login_time: DateTime<Local>,
    session_limit: u32,
    ansi: bool,
    help_level: String,
    last_user: Option<String>,
    system_calls: u64,
}

impl SessionContext {
    pub fn new(bbs: &BbsConfig, session: &Session) -> Self {
        SessionContext {
            system_name: bbs.name.clone(),
            sysop_name: bbs.sysop.clone(),
            location: bbs.location.clone(),
            user: session.username.clone(),
            node: session.node,
            peer: session.peer.clone(),
            level: session.user_level,
            login_time: session.login_time,
            session_limit: session.time_limit,
            ansi: session.ansi,
            help_level: session.help_level.clone(),
            last_user: None,
            system_calls: 0,
        }
    }

    /// Name of the previous caller and the running call count.
    pub fn with_history(mut self, last_user: Option<String>, system_calls: u64) -> Self {
        self.last_user = last_user;
        self.system_calls = system_calls;
        self
    }

    fn is_local(&self) -> bool {
        self.peer.starts_with("127.") || self.peer.starts_with("[::1]")
    }

    fn minutes_online(&self) -> i64 {
        (Local::now() - self.login_time).num_minutes().max(0)
    }
}

impl BbsContext for SessionContext {
    fn field(&self, field: Field) -> Option<String> {
        let value = match field {
            Field::SystemName => self.system_name.clone(),
            Field::SysopName => self.sysop_name.clone(),
            Field::UserName | Field::RealName => self.user.clone()?,
            Field::FirstName => self.user.as_deref()?.split_whitespace().next()?.to_string(),
            Field::City => self.location.clone(),
            Field::Date => Local::now().format("%d %b %y").to_string(),
            Field::Time => Local::now().format("%H:%M:%S").to_string(),
            Field::NodeNumber => self.node.to_string(),
            Field::IpAddress => self.peer.clone(),
            Field::LastUser => self.last_user.clone()?,
            Field::MinutesOnline => self.minutes_online().to_string(),
            Field::MinutesRemaining => {
                (self.session_limit as i64 - self.minutes_online()).max(0).to_string()
            }
            Field::TimeOff => {
                let off = self.login_time + chrono::Duration::minutes(self.session_limit as i64);
                off.format("%H:%M").to_string()
            }
            Field::SystemCalls => self.system_calls.to_string(),
            Field::PrivilegeLevel => self.level.to_string(),
            Field::HelpLevel => self.help_level.clone(),
            Field::Graphics => String::from(if self.ansi { "ansi" } else { "tty" }),
            Field::Locality => String::from(if self.is_local() { "local" } else { "remote" }),
            Field::Phone
            | Field::LastCall
            | Field::UserCalls
            | Field::Uploads
            | Field::Downloads
            | Field::Ratio
            | Field::MessageArea
            | Field::FileArea => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn serves_config_and_session_facts() {
        let config = Config::default();
        let mut session = Session::new(3, "10.0.0.7:4000".to_string(), 60);
        session.login("Ada Lovelace".to_string(), 40);
        let ctx = SessionContext::new(&config.bbs, &session);

        assert_eq!(ctx.field(Field::SystemName), Some(config.bbs.name.clone()));
        assert_eq!(ctx.field(Field::FirstName).as_deref(), Some("Ada"));
        assert_eq!(ctx.field(Field::NodeNumber).as_deref(), Some("3"));
        assert_eq!(ctx.field(Field::PrivilegeLevel).as_deref(), Some("40"));
        assert_eq!(ctx.field(Field::Locality).as_deref(), Some("remote"));
        assert_eq!(ctx.field(Field::Phone), None);
    }

    #[test]
    fn guest_has_no_user_name() {
        let config = Config::default();
        let session = Session::new(1, "127.0.0.1:5000".to_string(), 60);
        let ctx = SessionContext::new(&config.bbs, &session);
        assert_eq!(ctx.field(Field::UserName), None);
        assert_eq!(ctx.field(Field::Locality).as_deref(), Some("local"));
        assert_eq!(ctx.field(Field::MinutesRemaining).as_deref(), Some("60"));
    }
}
