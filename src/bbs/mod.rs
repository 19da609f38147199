//! BBS (Bulletin Board System) module
//!
//! This module contains the session shell around the template engine:
//! - TCP server and per-caller tasks
//! - Session screen flow (connect, login, main menu)
//! - Live system facts for templates
//! - Privilege class table

pub mod roles;
pub mod server;
pub mod session;
pub mod system;

pub use server::BbsServer;
pub use session::{ScreenState, Session};
pub use system::SessionContext;
