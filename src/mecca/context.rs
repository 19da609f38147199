//! Read-only access to live BBS facts for informational and gate instructions.

use std::collections::HashMap;

/// Logical fields a template can ask the BBS about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SystemName,
    SysopName,
    UserName,
    FirstName,
    RealName,
    City,
    Phone,
    Date,
    Time,
    NodeNumber,
    IpAddress,
    LastCall,
    LastUser,
    MinutesOnline,
    MinutesRemaining,
    TimeOff,
    UserCalls,
    SystemCalls,
    Uploads,
    Downloads,
    Ratio,
    MessageArea,
    FileArea,
    /// Numeric privilege level of the current user.
    PrivilegeLevel,
    /// `novice`, `regular` or `expert`.
    HelpLevel,
    /// `ansi` when the terminal takes color sequences, `tty` otherwise.
    Graphics,
    /// `local` for console sessions, `remote` for network callers.
    Locality,
}

/// Query capability the interpreter consumes. Each call is an independent snapshot.
pub trait BbsContext: Send + Sync {
    fn field(&self, field: Field) -> Option<String>;
}

/// Map backed context, handy for tooling and tests.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    values: HashMap<Field, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }
}

impl BbsContext for FieldMap {
    fn field(&self, field: Field) -> Option<String> {
        self.values.get(&field).cloned()
    }
}
