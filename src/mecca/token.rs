//! Instruction kinds, the name vocabulary and the arity table.
//!
//! The name → kind mapping lives here; the kind → handler mapping lives in
//! [`crate::mecca::interpreter`]. Both are plain tables so they can be tested
//! independently.

use std::fmt;

/// Every instruction the template language knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Literal text between brackets.
    String,
    /// Position marker declared with `[/name]` or `[label name]`.
    Label,

    // Colors
    Black,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Brown,
    Gray,
    DarkGray,
    LightBlue,
    LightGreen,
    LightCyan,
    LightRed,
    LightMagenta,
    Yellow,
    White,
    Bg,
    On,
    Blink,
    Bright,
    Dim,
    Fg,
    Load,
    Save,
    Steady,

    // Cursor control and video
    Bell,
    Bs,
    Cleol,
    Cleos,
    Cls,
    Cr,
    Down,
    Left,
    Lf,
    Locate,
    Tab,
    Right,
    SysopBell,
    Up,

    // Informational
    AlistFile,
    AlistMsg,
    City,
    Date,
    Dl,
    ExpiryDate,
    ExpiryTime,
    FileCarea,
    FileCname,
    FileDarea,
    FileSarea,
    Fname,
    First,
    Ip,
    LastCall,
    LastUser,
    Length,
    Minutes,
    MsgCarea,
    MsgCmsg,
    MsgCname,
    MsgDarea,
    MsgHmsg,
    MsgNummsg,
    MsgSarea,
    NetBalance,
    NetCredit,
    NetDebit,
    NetDl,
    NodeNum,
    Phone,
    Ratio,
    RealName,
    Remain,
    Response,
    SysCall,
    SysName,
    SysopName,
    Time,
    TimeOff,
    Ul,
    User,
    UserCall,

    // Questionnaire
    AnsOpt,
    AnsReq,
    Choice,
    LeaveComment,
    Menu,
    Open,
    Post,
    Readln,
    Sopen,
    Store,
    Write,

    // Privilege level
    Acs,
    Access,
    AcsFile,
    AccessFile,
    PrivAbbrev,
    PrivDesc,
    PrivDown,
    PrivLevel,
    PrivUp,
    SetPriv,

    // Lock and key
    IfKey,
    NotKey,
    KeyOn,
    KeyOff,

    // Conditional and flow control
    B1200,
    B2400,
    B9600,
    Col80,
    Color,
    EndColor,
    EndRip,
    Expert,
    Exit,
    FileNew,
    Goto,
    Hotkeys,
    IfEntered,
    IfExist,
    IfFse,
    IfFsr,
    IfLang,
    IfTask,
    IfTime,
    InCity,
    IsLocal,
    IsRemote,
    Jump,
    LabelDecl,
    Maxed,
    MsgAttr,
    MsgConf,
    MsgEcho,
    MsgFileAttach,
    MsgLocal,
    MsgMatrix,
    MsgNext,
    MsgNoMsgs,
    MsgNoNew,
    MsgNoRead,
    MsgPrior,
    NoKeypress,
    NoColor,
    NoRip,
    NoStacked,
    NotOnToday,
    Novice,
    Permanent,
    Regular,
    Rip,
    RipHasFile,
    Tagged,
    Top,

    // Multinode
    Apb,
    ChatAvail,
    ChatNotAvail,
    WhoIsOn,

    // RIPscrip graphics
    RipDisplay,
    RipPath,
    RipSend,
    TextSize,

    // Miscellaneous
    CkOff,
    CkOn,
    ClearStacked,
    Comment,
    Copy,
    Delete,
    Display,
    Dos,
    Enter,
    Hangup,
    IbmChars,
    Include,
    KeyPoke,
    Language,
    Link,
    Log,
    MenuCmd,
    MenuPath,
    Mex,
    More,
    MoreOff,
    MoreOn,
    MsgCheckMail,
    NewFiles,
    OnExit,
    Pause,
    Quit,
    Quote,
    Repeat,
    RepeatSeq,
    TagRead,
    TagWrite,
    Tune,
    XternDos,
    XternErlvl,
    XternRun,
}

/// How many following bracket words an instruction consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// `comment`: swallow bracket words up to the next literal, emit nothing.
    Discard,
    /// `repeatseq`: one bracket word, one literal, one bracket word.
    Sequence,
}

/// Name → kind table. Lookups are case-insensitive.
static VOCABULARY: &[(&str, Kind)] = &[
    ("black", Kind::Black),
    ("blue", Kind::Blue),
    ("green", Kind::Green),
    ("cyan", Kind::Cyan),
    ("red", Kind::Red),
    ("magenta", Kind::Magenta),
    ("brown", Kind::Brown),
    ("gray", Kind::Gray),
    ("grey", Kind::Gray),
    ("darkgray", Kind::DarkGray),
    ("darkgrey", Kind::DarkGray),
    ("lightblue", Kind::LightBlue),
    ("lightgreen", Kind::LightGreen),
    ("lightcyan", Kind::LightCyan),
    ("lightred", Kind::LightRed),
    ("lightmagenta", Kind::LightMagenta),
    ("yellow", Kind::Yellow),
    ("white", Kind::White),
    ("bg", Kind::Bg),
    ("on", Kind::On),
    ("blink", Kind::Blink),
    ("bright", Kind::Bright),
    ("dim", Kind::Dim),
    ("fg", Kind::Fg),
    ("load", Kind::Load),
    ("save", Kind::Save),
    ("steady", Kind::Steady),
    ("bell", Kind::Bell),
    ("bs", Kind::Bs),
    ("cleol", Kind::Cleol),
    ("cleos", Kind::Cleos),
    ("cls", Kind::Cls),
    ("cr", Kind::Cr),
    ("down", Kind::Down),
    ("left", Kind::Left),
    ("lf", Kind::Lf),
    ("locate", Kind::Locate),
    ("tab", Kind::Tab),
    ("right", Kind::Right),
    ("sysopbell", Kind::SysopBell),
    ("up", Kind::Up),
    ("alist_file", Kind::AlistFile),
    ("alist_msg", Kind::AlistMsg),
    ("city", Kind::City),
    ("date", Kind::Date),
    ("dl", Kind::Dl),
    ("expiry_date", Kind::ExpiryDate),
    ("expiry_time", Kind::ExpiryTime),
    ("file_carea", Kind::FileCarea),
    ("file_cname", Kind::FileCname),
    ("file_darea", Kind::FileDarea),
    ("file_sarea", Kind::FileSarea),
    ("fname", Kind::Fname),
    ("first", Kind::First),
    ("ip", Kind::Ip),
    ("lastcall", Kind::LastCall),
    ("lastuser", Kind::LastUser),
    ("length", Kind::Length),
    ("minutes", Kind::Minutes),
    ("msg_carea", Kind::MsgCarea),
    ("msg_cmsg", Kind::MsgCmsg),
    ("msg_cname", Kind::MsgCname),
    ("msg_darea", Kind::MsgDarea),
    ("msg_hmsg", Kind::MsgHmsg),
    ("msg_nummsg", Kind::MsgNummsg),
    ("msg_sarea", Kind::MsgSarea),
    ("netbalance", Kind::NetBalance),
    ("netcredit", Kind::NetCredit),
    ("netdebit", Kind::NetDebit),
    ("netdl", Kind::NetDl),
    ("node_num", Kind::NodeNum),
    ("phone", Kind::Phone),
    ("ratio", Kind::Ratio),
    ("realname", Kind::RealName),
    ("remain", Kind::Remain),
    ("response", Kind::Response),
    ("syscall", Kind::SysCall),
    ("sys_name", Kind::SysName),
    ("sysop_name", Kind::SysopName),
    ("time", Kind::Time),
    ("timeoff", Kind::TimeOff),
    ("ul", Kind::Ul),
    ("user", Kind::User),
    ("usercall", Kind::UserCall),
    ("ansopt", Kind::AnsOpt),
    ("ansreq", Kind::AnsReq),
    ("choice", Kind::Choice),
    ("leave_comment", Kind::LeaveComment),
    ("menu", Kind::Menu),
    ("open", Kind::Open),
    ("post", Kind::Post),
    ("readln", Kind::Readln),
    ("sopen", Kind::Sopen),
    ("store", Kind::Store),
    ("write", Kind::Write),
    ("acs", Kind::Acs),
    ("access", Kind::Access),
    ("acsfile", Kind::AcsFile),
    ("accessfile", Kind::AccessFile),
    ("priv_abbrev", Kind::PrivAbbrev),
    ("priv_desc", Kind::PrivDesc),
    ("priv_down", Kind::PrivDown),
    ("priv_level", Kind::PrivLevel),
    ("priv_up", Kind::PrivUp),
    ("setpriv", Kind::SetPriv),
    ("ifkey", Kind::IfKey),
    ("notkey", Kind::NotKey),
    ("keyon", Kind::KeyOn),
    ("keyoff", Kind::KeyOff),
    ("1200", Kind::B1200),
    ("2400", Kind::B2400),
    ("9600", Kind::B9600),
    ("col80", Kind::Col80),
    ("color", Kind::Color),
    ("colour", Kind::Color),
    ("endcolor", Kind::EndColor),
    ("endcolour", Kind::EndColor),
    ("endrip", Kind::EndRip),
    ("expert", Kind::Expert),
    ("exit", Kind::Exit),
    ("filenew", Kind::FileNew),
    ("goto", Kind::Goto),
    ("hotkeys", Kind::Hotkeys),
    ("ifentered", Kind::IfEntered),
    ("ifexist", Kind::IfExist),
    ("iffse", Kind::IfFse),
    ("iffsr", Kind::IfFsr),
    ("iflang", Kind::IfLang),
    ("iftask", Kind::IfTask),
    ("iftime", Kind::IfTime),
    ("incity", Kind::InCity),
    ("islocal", Kind::IsLocal),
    ("isremote", Kind::IsRemote),
    ("jump", Kind::Jump),
    ("label", Kind::LabelDecl),
    ("maxed", Kind::Maxed),
    ("msg_attr", Kind::MsgAttr),
    ("msg_conf", Kind::MsgConf),
    ("msg_echo", Kind::MsgEcho),
    ("msg_fileattach", Kind::MsgFileAttach),
    ("msg_local", Kind::MsgLocal),
    ("msg_matrix", Kind::MsgMatrix),
    ("msg_next", Kind::MsgNext),
    ("msg_nomsgs", Kind::MsgNoMsgs),
    ("msg_nonew", Kind::MsgNoNew),
    ("msg_noread", Kind::MsgNoRead),
    ("msg_prior", Kind::MsgPrior),
    ("no_keypress", Kind::NoKeypress),
    ("nocolor", Kind::NoColor),
    ("nocolour", Kind::NoColor),
    ("norip", Kind::NoRip),
    ("nostacked", Kind::NoStacked),
    ("notontoday", Kind::NotOnToday),
    ("novice", Kind::Novice),
    ("permanent", Kind::Permanent),
    ("regular", Kind::Regular),
    ("rip", Kind::Rip),
    ("riphasfile", Kind::RipHasFile),
    ("tagged", Kind::Tagged),
    ("top", Kind::Top),
    ("apb", Kind::Apb),
    ("chat_avail", Kind::ChatAvail),
    ("chat_notavail", Kind::ChatNotAvail),
    ("who_is_on", Kind::WhoIsOn),
    ("ripdisplay", Kind::RipDisplay),
    ("rippath", Kind::RipPath),
    ("ripsend", Kind::RipSend),
    ("textsize", Kind::TextSize),
    ("ckoff", Kind::CkOff),
    ("ckon", Kind::CkOn),
    ("clear_stacked", Kind::ClearStacked),
    ("comment", Kind::Comment),
    ("copy", Kind::Copy),
    ("delete", Kind::Delete),
    ("display", Kind::Display),
    ("dos", Kind::Dos),
    ("enter", Kind::Enter),
    ("hangup", Kind::Hangup),
    ("ibmchars", Kind::IbmChars),
    ("include", Kind::Include),
    ("key_poke", Kind::KeyPoke),
    ("language", Kind::Language),
    ("link", Kind::Link),
    ("log", Kind::Log),
    ("menu_cmd", Kind::MenuCmd),
    ("menupath", Kind::MenuPath),
    ("mex", Kind::Mex),
    ("more", Kind::More),
    ("moreoff", Kind::MoreOff),
    ("moreon", Kind::MoreOn),
    ("msg_checkmail", Kind::MsgCheckMail),
    ("newfiles", Kind::NewFiles),
    ("onexit", Kind::OnExit),
    ("pause", Kind::Pause),
    ("quit", Kind::Quit),
    ("quote", Kind::Quote),
    ("repeat", Kind::Repeat),
    ("repeatseq", Kind::RepeatSeq),
    ("tag_read", Kind::TagRead),
    ("tag_write", Kind::TagWrite),
    ("tune", Kind::Tune),
    ("xtern_dos", Kind::XternDos),
    ("xtern_erlvl", Kind::XternErlvl),
    ("xtern_run", Kind::XternRun),
];

impl Kind {
    /// Resolve a bracket word to its instruction kind, ignoring case.
    pub fn from_name(word: &str) -> Option<Kind> {
        VOCABULARY
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(word))
            .map(|(_, kind)| *kind)
    }

    /// Canonical source name. `String` and `Label` have no bracket name.
    pub fn name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Label => "/label",
            other => VOCABULARY
                .iter()
                .find(|(_, kind)| *kind == other)
                .map(|(name, _)| *name)
                .unwrap_or("unknown"),
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Kind::Fg
            | Kind::Acs
            | Kind::Access
            | Kind::AcsFile
            | Kind::AccessFile
            | Kind::SetPriv
            | Kind::Goto
            | Kind::Jump
            | Kind::LabelDecl
            | Kind::MsgAttr
            | Kind::Copy
            | Kind::Include
            | Kind::MenuCmd => Arity::Fixed(1),
            Kind::Locate | Kind::TextSize => Arity::Fixed(2),
            Kind::Comment => Arity::Discard,
            Kind::RepeatSeq => Arity::Sequence,
            _ => Arity::Fixed(0),
        }
    }

    /// The sixteen foreground color kinds.
    pub fn is_color(self) -> bool {
        matches!(
            self,
            Kind::Black
                | Kind::Blue
                | Kind::Green
                | Kind::Cyan
                | Kind::Red
                | Kind::Magenta
                | Kind::Brown
                | Kind::Gray
                | Kind::DarkGray
                | Kind::LightBlue
                | Kind::LightGreen
                | Kind::LightCyan
                | Kind::LightRed
                | Kind::LightMagenta
                | Kind::Yellow
                | Kind::White
        )
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One compiled unit: literal text or a named directive with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: Kind,
    pub args: Vec<String>,
    /// Source word as written; the text itself for `String`, the label name for `Label`.
    pub raw_name: String,
}

impl Instruction {
    pub fn new(kind: Kind, raw_name: impl Into<String>, args: Vec<String>) -> Self {
        Self { kind, args, raw_name: raw_name.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Kind::String, text, Vec::new())
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::new(Kind::Label, name, Vec::new())
    }

    pub fn arg(&self, idx: usize) -> &str {
        self.args.get(idx).map(String::as_str).unwrap_or("")
    }
}
