//! Per-session execution of compiled templates.
//!
//! An [`Execution`] is an explicit state machine: [`Execution::advance`] steps
//! the program counter until the template finishes, suspends on an input
//! instruction, or uses up its step budget. The caller delivers input with
//! [`Execution::deliver`] and calls `advance` again. [`Interpreter::run`] is the
//! async driver that wires this to a byte stream pair.
//!
//! The program counter lives here, never in the shared [`CompiledTemplate`], so
//! any number of sessions can run the same template at once.

use std::sync::Arc;

use log::{debug, trace, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use super::charset::Charset;
use super::color::{self, Color};
use super::context::{BbsContext, Field};
use super::error::{CompileError, InstructionError, RunError};
use super::template::{CompiledTemplate, TemplateStore};
use super::token::{Instruction, Kind};
use crate::bbs::roles;
use crate::logutil::{escape_log, preview_bytes};
use crate::metrics;

/// Maximum nesting of `[include]` frames.
pub const INCLUDE_DEPTH_LIMIT: usize = 8;

/// Instructions executed per [`Execution::advance`] call before yielding.
pub const STEP_BUDGET: usize = 4096;

/// Largest repeat count `[repeatseq]` will honor.
pub const REPEAT_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    Exit,
    Quit,
    Hangup,
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Halted(HaltReason),
    Aborted(RunError),
}

/// What a suspended execution is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `[readln]`: a full line.
    Line,
    /// `[menu]`, `[choice]`: the first key of the line.
    Key,
    /// `[ansreq]`: a non-empty line; blank lines keep waiting.
    Required,
    /// `[enter]`: any line, discarded.
    Enter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecState {
    Running,
    Suspended(InputKind),
    /// Waiting for the named `[include]` target to be loaded.
    Including(String),
    Finished(RunOutcome),
}

/// Result of one [`Execution::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Suspended(InputKind),
    /// Step budget used up; call `advance` again after yielding to the scheduler.
    Yielded,
    /// The named template is not in the store. Load it and hand it to
    /// [`Execution::enter`], or abort.
    Including(String),
    Finished(RunOutcome),
}

/// Predicates evaluated by gate instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// User privilege must be at least the instruction argument.
    Privilege,
    /// Context field must (or must not) equal the given value.
    Fact { field: Field, value: &'static str, negate: bool },
}

impl Predicate {
    const fn fact(field: Field, value: &'static str) -> Self {
        Predicate::Fact { field, value, negate: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeText {
    Abbrev,
    Description,
}

/// Kind → handler table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Text,
    Control,
    SaveColor,
    LoadColor,
    Query(Field),
    Privilege(PrivilegeText),
    Response,
    Branch,
    Top,
    Marker,
    RepeatSequence,
    Gate(Predicate),
    Input(InputKind),
    Include,
    Halt(HaltReason),
}

/// Handler for `kind`, or `None` when the instruction is not implemented.
pub fn handler_for(kind: Kind) -> Option<Handler> {
    use Handler::*;
    let handler = match kind {
        Kind::String => Text,
        k if k.is_color() => Control,
        Kind::Fg
        | Kind::Blink
        | Kind::Bright
        | Kind::Dim
        | Kind::Steady
        | Kind::Bell
        | Kind::Bs
        | Kind::Cleol
        | Kind::Cleos
        | Kind::Cls
        | Kind::Cr
        | Kind::Lf
        | Kind::Tab
        | Kind::Up
        | Kind::Down
        | Kind::Left
        | Kind::Right
        | Kind::Locate => Control,
        Kind::Save => SaveColor,
        Kind::Load => LoadColor,

        Kind::SysName => Query(Field::SystemName),
        Kind::SysopName => Query(Field::SysopName),
        Kind::User => Query(Field::UserName),
        Kind::Fname => Query(Field::FirstName),
        Kind::RealName => Query(Field::RealName),
        Kind::City => Query(Field::City),
        Kind::Phone => Query(Field::Phone),
        Kind::Date => Query(Field::Date),
        Kind::Time => Query(Field::Time),
        Kind::NodeNum => Query(Field::NodeNumber),
        Kind::Ip => Query(Field::IpAddress),
        Kind::LastCall => Query(Field::LastCall),
        Kind::LastUser => Query(Field::LastUser),
        Kind::Minutes => Query(Field::MinutesOnline),
        Kind::Remain => Query(Field::MinutesRemaining),
        Kind::TimeOff => Query(Field::TimeOff),
        Kind::UserCall => Query(Field::UserCalls),
        Kind::SysCall => Query(Field::SystemCalls),
        Kind::Ul => Query(Field::Uploads),
        Kind::Dl => Query(Field::Downloads),
        Kind::Ratio => Query(Field::Ratio),
        Kind::MsgCarea => Query(Field::MessageArea),
        Kind::FileCarea => Query(Field::FileArea),
        Kind::PrivLevel => Query(Field::PrivilegeLevel),
        Kind::PrivAbbrev => Privilege(PrivilegeText::Abbrev),
        Kind::PrivDesc => Privilege(PrivilegeText::Description),
        Kind::Response => Response,

        Kind::Goto | Kind::Jump => Branch,
        Kind::Top => Top,
        Kind::Label => Marker,
        Kind::RepeatSeq => RepeatSequence,

        Kind::Acs | Kind::Access | Kind::AcsFile | Kind::AccessFile => Gate(Predicate::Privilege),
        Kind::Color => Gate(Predicate::fact(Field::Graphics, "ansi")),
        Kind::NoColor => {
            Gate(Predicate::Fact { field: Field::Graphics, value: "ansi", negate: true })
        }
        Kind::Expert => Gate(Predicate::fact(Field::HelpLevel, "expert")),
        Kind::Regular => Gate(Predicate::fact(Field::HelpLevel, "regular")),
        Kind::Novice => Gate(Predicate::fact(Field::HelpLevel, "novice")),
        Kind::IsLocal => Gate(Predicate::fact(Field::Locality, "local")),
        Kind::IsRemote => Gate(Predicate::fact(Field::Locality, "remote")),

        Kind::Readln => Input(InputKind::Line),
        Kind::Menu | Kind::Choice => Input(InputKind::Key),
        Kind::AnsReq => Input(InputKind::Required),
        Kind::Enter => Input(InputKind::Enter),

        Kind::Include => Include,
        Kind::Exit => Halt(HaltReason::Exit),
        Kind::Quit => Halt(HaltReason::Quit),
        Kind::Hangup => Halt(HaltReason::Hangup),
        _ => return None,
    };
    Some(handler)
}

/// How the counter moves after an instruction.
enum Flow {
    Next,
    Jump(usize),
    /// An include frame was pushed; the parent counter is already advanced.
    Entered,
    Load(String),
    Suspend(InputKind),
    ExitFrame,
    Halt(HaltReason),
    Abort(RunError),
}

struct Frame {
    template: Arc<CompiledTemplate>,
    pc: usize,
}

/// Execution state of one run. Owned by exactly one session.
pub struct Execution {
    frames: Vec<Frame>,
    store: Arc<TemplateStore>,
    context: Arc<dyn BbsContext>,
    charset: Charset,
    state: ExecState,
    current_color: Option<Color>,
    saved_color: Option<Color>,
    response: Option<String>,
    suppress_line: bool,
}

impl Execution {
    pub fn new(
        template: Arc<CompiledTemplate>,
        store: Arc<TemplateStore>,
        context: Arc<dyn BbsContext>,
        charset: Charset,
    ) -> Self {
        Execution {
            frames: vec![Frame { template, pc: 0 }],
            store,
            context,
            charset,
            state: ExecState::Running,
            current_color: None,
            saved_color: None,
            response: None,
            suppress_line: false,
        }
    }

    pub fn state(&self) -> &ExecState {
        &self.state
    }

    /// Program counter of the innermost frame.
    pub fn program_counter(&self) -> Option<usize> {
        self.frames.last().map(|f| f.pc)
    }

    /// Last input captured by a `readln`/`menu`/`choice`/`ansreq` instruction.
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        match &self.state {
            ExecState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Run instructions, appending output to `out`, until the run suspends,
    /// finishes, or exhausts [`STEP_BUDGET`].
    pub fn advance(&mut self, out: &mut Vec<u8>) -> Status {
        match &self.state {
            ExecState::Suspended(kind) => return Status::Suspended(*kind),
            ExecState::Including(name) => return Status::Including(name.clone()),
            ExecState::Finished(outcome) => return Status::Finished(outcome.clone()),
            ExecState::Running => {}
        }

        for _ in 0..STEP_BUDGET {
            let Some(frame) = self.frames.last() else {
                return Status::Finished(self.finish(RunOutcome::Completed));
            };
            if frame.pc >= frame.template.len() {
                self.pop_frame();
                if self.frames.is_empty() {
                    return Status::Finished(self.finish(RunOutcome::Completed));
                }
                continue;
            }
            let template = Arc::clone(&frame.template);
            let pc = frame.pc;
            let instruction = &template.instructions()[pc];

            let flow = if self.suppress_line {
                self.skip(instruction, out)
            } else {
                match self.step(&template, instruction, out) {
                    Ok(flow) => flow,
                    Err(e) => {
                        warn!(
                            "template {} instruction {} at {}: {}",
                            template.name(),
                            instruction.kind,
                            pc,
                            e
                        );
                        Flow::Next
                    }
                }
            };

            match flow {
                Flow::Next => self.set_pc(pc + 1),
                Flow::Jump(target) => self.set_pc(target),
                Flow::Entered => {}
                Flow::Load(name) => {
                    trace!("template {} waiting for include {}", template.name(), name);
                    self.state = ExecState::Including(name.clone());
                    return Status::Including(name);
                }
                Flow::Suspend(kind) => {
                    self.set_pc(pc + 1);
                    self.state = ExecState::Suspended(kind);
                    trace!(
                        "template {} suspended at {} waiting for {:?}",
                        template.name(),
                        pc,
                        kind
                    );
                    return Status::Suspended(kind);
                }
                Flow::ExitFrame => {
                    self.pop_frame();
                    if self.frames.is_empty() {
                        return Status::Finished(self.finish(RunOutcome::Halted(HaltReason::Exit)));
                    }
                }
                Flow::Halt(reason) => {
                    return Status::Finished(self.finish(RunOutcome::Halted(reason)));
                }
                Flow::Abort(err) => return Status::Finished(self.finish(RunOutcome::Aborted(err))),
            }
        }
        Status::Yielded
    }

    /// Push a template requested by [`Status::Including`] and resume.
    pub fn enter(&mut self, template: Arc<CompiledTemplate>) {
        let ExecState::Including(name) = &self.state else {
            warn!("template {} entered outside an include: {:?}", template.name(), self.state);
            return;
        };
        debug!("including template {} (requested as {})", template.name(), name);
        self.frames.push(Frame { template, pc: 0 });
        self.state = ExecState::Running;
    }

    /// Deliver one line of input to a suspended execution.
    pub fn deliver(&mut self, line: &str) {
        let ExecState::Suspended(kind) = self.state else {
            warn!("input delivered to an execution that is not waiting: {:?}", self.state);
            return;
        };
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        trace!("delivered {:?} input '{}'", kind, escape_log(line));
        match kind {
            InputKind::Line => self.response = Some(line.to_string()),
            InputKind::Key => self.response = Some(line.trim().chars().take(1).collect()),
            InputKind::Required => {
                if line.trim().is_empty() {
                    return;
                }
                self.response = Some(line.to_string());
            }
            InputKind::Enter => {}
        }
        self.state = ExecState::Running;
    }

    /// Abort the run. No effect once the run has finished.
    pub fn abort(&mut self, err: RunError) -> RunOutcome {
        if let ExecState::Finished(outcome) = &self.state {
            return outcome.clone();
        }
        self.finish(RunOutcome::Aborted(err))
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        match &outcome {
            RunOutcome::Completed => metrics::inc_runs_completed(),
            RunOutcome::Halted(_) => metrics::inc_runs_halted(),
            RunOutcome::Aborted(e) => {
                warn!("template run aborted: {}", e);
                metrics::inc_runs_aborted();
            }
        }
        debug!("template run finished: {:?}", outcome);
        self.state = ExecState::Finished(outcome.clone());
        outcome
    }

    /// A hidden line never outlives the frame its gate ran in.
    fn pop_frame(&mut self) {
        self.frames.pop();
        self.suppress_line = false;
    }

    fn set_pc(&mut self, pc: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc = pc;
        }
    }

    fn emit(&self, text: &str, out: &mut Vec<u8>) {
        self.charset.encode_into(text, out);
    }

    /// A failed gate hides everything up to and including the next newline,
    /// whether it comes from literal text or an `[lf]`.
    fn skip(&mut self, instruction: &Instruction, out: &mut Vec<u8>) -> Flow {
        match instruction.kind {
            Kind::String => {
                if let Some(idx) = instruction.raw_name.find('\n') {
                    self.suppress_line = false;
                    self.emit(&instruction.raw_name[idx + 1..], out);
                }
            }
            Kind::Lf => self.suppress_line = false,
            _ => {}
        }
        Flow::Next
    }

    fn step(
        &mut self,
        template: &CompiledTemplate,
        instruction: &Instruction,
        out: &mut Vec<u8>,
    ) -> Result<Flow, InstructionError> {
        let Some(handler) = handler_for(instruction.kind) else {
            warn!("template {}: instruction {} unimplemented", template.name(), instruction.kind);
            metrics::inc_unimplemented();
            return Ok(Flow::Next);
        };

        match handler {
            Handler::Text => self.emit(&instruction.raw_name, out),
            Handler::Control => {
                let bytes = color::resolve(instruction.kind, &instruction.args)?;
                if let Some(selected) = color::color_of(instruction.kind, &instruction.args)? {
                    self.current_color = Some(selected);
                }
                out.extend_from_slice(&bytes);
            }
            Handler::SaveColor => self.saved_color = self.current_color,
            Handler::LoadColor => {
                if let Some(saved) = self.saved_color {
                    self.current_color = Some(saved);
                    out.extend_from_slice(saved.foreground());
                }
            }
            Handler::Query(field) => {
                let value =
                    self.context.field(field).ok_or(InstructionError::FieldUnavailable(field))?;
                self.emit(&value, out);
            }
            Handler::Privilege(text) => {
                let level = self.privilege()?;
                let value = match text {
                    PrivilegeText::Abbrev => roles::role_abbrev(level),
                    PrivilegeText::Description => roles::role_name(level),
                };
                self.emit(value, out);
            }
            Handler::Response => {
                if let Some(response) = &self.response {
                    self.emit(response, out);
                }
            }
            Handler::Branch => {
                let label = instruction.arg(0);
                return Ok(match template.label(label) {
                    Some(target) => Flow::Jump(target),
                    None => Flow::Abort(RunError::UnresolvedLabel {
                        template: template.name().to_string(),
                        label: label.to_string(),
                    }),
                });
            }
            Handler::Top => return Ok(Flow::Jump(0)),
            Handler::Marker => {}
            Handler::RepeatSequence => self.repeat_sequence(instruction, out)?,
            Handler::Gate(predicate) => {
                if !self.gate_passes(predicate, instruction) {
                    trace!(
                        "gate {} failed in {}, hiding rest of line",
                        instruction.kind,
                        template.name()
                    );
                    self.suppress_line = true;
                }
            }
            Handler::Input(kind) => return Ok(Flow::Suspend(kind)),
            Handler::Include => return self.include(instruction),
            Handler::Halt(HaltReason::Exit) => return Ok(Flow::ExitFrame),
            Handler::Halt(reason) => return Ok(Flow::Halt(reason)),
        }
        Ok(Flow::Next)
    }

    fn privilege(&self) -> Result<u16, InstructionError> {
        let raw = self
            .context
            .field(Field::PrivilegeLevel)
            .ok_or(InstructionError::FieldUnavailable(Field::PrivilegeLevel))?;
        roles::parse_level(&raw).ok_or(InstructionError::InvalidArgument {
            instruction: "priv_level".into(),
            value: raw,
        })
    }

    /// Privilege gates fail closed: an unreadable level hides the line.
    fn gate_passes(&self, predicate: Predicate, instruction: &Instruction) -> bool {
        match predicate {
            Predicate::Privilege => {
                let wanted = instruction.arg(0);
                let Some(required) = roles::parse_level(wanted) else {
                    warn!(
                        "{} gate has invalid level '{}', hiding line",
                        instruction.kind,
                        escape_log(wanted)
                    );
                    return false;
                };
                let level = self.privilege().unwrap_or_else(|e| {
                    debug!("privilege unknown ({}), treating as {}", e, roles::LEVEL_TWIT);
                    roles::LEVEL_TWIT
                });
                level >= required
            }
            Predicate::Fact { field, value, negate } => {
                let actual = self.context.field(field).unwrap_or_default();
                actual.eq_ignore_ascii_case(value) != negate
            }
        }
    }

    fn repeat_sequence(
        &self,
        instruction: &Instruction,
        out: &mut Vec<u8>,
    ) -> Result<(), InstructionError> {
        let invalid = |idx: usize| InstructionError::InvalidArgument {
            instruction: "repeatseq".into(),
            value: instruction.arg(idx).to_string(),
        };
        let number = |idx: usize| instruction.arg(idx).parse::<usize>().map_err(|_| invalid(idx));
        let (length, repeat) = (number(0)?, number(2)?);
        if repeat > REPEAT_LIMIT {
            return Err(invalid(2));
        }
        let payload = instruction.arg(1);
        let split = payload.char_indices().nth(length).map(|(idx, _)| idx).unwrap_or(payload.len());
        let (sequence, rest) = payload.split_at(split);
        for _ in 0..repeat {
            self.emit(sequence, out);
        }
        self.emit(rest, out);
        Ok(())
    }

    fn include(&mut self, instruction: &Instruction) -> Result<Flow, InstructionError> {
        if self.frames.len() >= INCLUDE_DEPTH_LIMIT {
            return Err(InstructionError::IncludeDepth(INCLUDE_DEPTH_LIMIT));
        }
        if let Some(parent) = self.frames.last_mut() {
            parent.pc += 1;
        }
        let template = match self.store.lookup(instruction.arg(0)) {
            Ok(template) => template,
            Err(_) => return Ok(Flow::Load(instruction.arg(0).to_string())),
        };
        debug!("including template {}", template.name());
        self.frames.push(Frame { template, pc: 0 });
        Ok(Flow::Entered)
    }
}

/// Hangup signal. A suspended run races its input against it; a busy run
/// checks it each time it yields.
#[derive(Debug, Clone, Default)]
pub struct Hangup(Option<watch::Receiver<bool>>);

impl Hangup {
    /// A signal that never fires; only end of input ends a wait.
    pub fn never() -> Self {
        Hangup(None)
    }

    pub fn channel() -> (watch::Sender<bool>, Hangup) {
        let (tx, rx) = watch::channel(false);
        (tx, Hangup(Some(rx)))
    }

    pub fn from_receiver(rx: watch::Receiver<bool>) -> Self {
        Hangup(Some(rx))
    }

    fn is_set(&self) -> bool {
        self.0.as_ref().is_some_and(|rx| *rx.borrow())
    }

    async fn triggered(&mut self) {
        let Some(rx) = self.0.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without hanging up
                return std::future::pending().await;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub response: Option<String>,
}

impl RunReport {
    fn aborted(err: RunError) -> Self {
        RunReport { outcome: RunOutcome::Aborted(err), response: None }
    }
}

/// Shared entry point: a template store plus output settings.
#[derive(Clone)]
pub struct Interpreter {
    store: Arc<TemplateStore>,
    charset: Charset,
}

impl Interpreter {
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Interpreter { store, charset: Charset::default() }
    }

    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    pub fn compile(&self, name: &str, source: &str) -> Result<(), CompileError> {
        self.store.compile(name, source).map(|_| ())
    }

    /// Create an execution for an already compiled template.
    pub fn start(&self, name: &str, context: Arc<dyn BbsContext>) -> Result<Execution, RunError> {
        let template = self.store.lookup(name)?;
        Ok(Execution::new(template, Arc::clone(&self.store), context, self.charset))
    }

    /// Run `name` to completion against the attached input and output.
    ///
    /// Input is read a line at a time while the run is suspended. End of input
    /// or the hangup signal firing during a wait aborts the run.
    pub async fn run<R, W>(
        &self,
        name: &str,
        context: Arc<dyn BbsContext>,
        mut input: R,
        mut output: W,
        mut hangup: Hangup,
    ) -> RunReport
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let template = match self.store.get_or_load(name).await {
            Ok(template) => template,
            Err(e) => {
                warn!("cannot run {}: {}", name, e);
                metrics::inc_runs_aborted();
                return RunReport::aborted(e);
            }
        };
        debug!("running template {}", template.name());
        let mut exec = Execution::new(template, Arc::clone(&self.store), context, self.charset);
        let mut buf = Vec::with_capacity(1024);
        let mut line = Vec::with_capacity(128);

        loop {
            let status = exec.advance(&mut buf);
            if !buf.is_empty() {
                trace!("writing {} bytes: {}", buf.len(), preview_bytes(&buf));
                let written = match output.write_all(&buf).await {
                    Ok(()) => output.flush().await,
                    Err(e) => Err(e),
                };
                buf.clear();
                if let Err(e) = written {
                    exec.abort(RunError::Output(e.to_string()));
                    break;
                }
            }
            match status {
                Status::Finished(_) => break,
                Status::Yielded => {
                    if hangup.is_set() {
                        exec.abort(RunError::Cancelled);
                    } else {
                        tokio::task::yield_now().await;
                    }
                }
                Status::Including(name) => match self.store.get_or_load(&name).await {
                    Ok(template) => exec.enter(template),
                    Err(e) => {
                        exec.abort(e);
                    }
                },
                Status::Suspended(_) => {
                    line.clear();
                    tokio::select! {
                        read = input.read_until(b'\n', &mut line) => match read {
                            Ok(0) => { exec.abort(RunError::InputClosed); }
                            Ok(_) => exec.deliver(&String::from_utf8_lossy(&line)),
                            Err(e) => {
                                debug!("input error while suspended: {}", e);
                                exec.abort(RunError::InputClosed);
                            }
                        },
                        _ = hangup.triggered() => { exec.abort(RunError::Cancelled); }
                    }
                }
            }
        }

        RunReport {
            outcome: exec.outcome().cloned().unwrap_or(RunOutcome::Completed),
            response: exec.response.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mecca::context::FieldMap;

    fn execution(source: &str, context: FieldMap) -> Execution {
        let store = Arc::new(TemplateStore::new());
        let interpreter = Interpreter::new(Arc::clone(&store));
        interpreter.compile("t", source).unwrap();
        interpreter.start("t", Arc::new(context)).unwrap()
    }

    fn drain(exec: &mut Execution) -> (Status, Vec<u8>) {
        let mut out = Vec::new();
        let status = exec.advance(&mut out);
        (status, out)
    }

    #[test]
    fn handler_table_covers_categories() {
        assert_eq!(handler_for(Kind::String), Some(Handler::Text));
        assert_eq!(handler_for(Kind::White), Some(Handler::Control));
        assert_eq!(handler_for(Kind::Fg), Some(Handler::Control));
        assert_eq!(handler_for(Kind::SysName), Some(Handler::Query(Field::SystemName)));
        assert_eq!(handler_for(Kind::Goto), Some(Handler::Branch));
        assert_eq!(handler_for(Kind::Readln), Some(Handler::Input(InputKind::Line)));
        assert_eq!(handler_for(Kind::Hangup), Some(Handler::Halt(HaltReason::Hangup)));
        assert_eq!(handler_for(Kind::Bg), None);
        assert_eq!(handler_for(Kind::Tune), None);
    }

    #[test]
    fn goto_skips_to_label() {
        let mut exec =
            execution("text [fg white]text [goto jump]text [/jump]text", FieldMap::new());
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Finished(RunOutcome::Completed));
        let mut expected = b"text ".to_vec();
        expected.extend_from_slice(Color::White.foreground());
        expected.extend_from_slice(b"text text");
        assert_eq!(out, expected);
    }

    #[test]
    fn unresolved_label_aborts() {
        let mut exec = execution("a[goto nowhere]b", FieldMap::new());
        let (status, out) = drain(&mut exec);
        assert_eq!(out, b"a");
        let Status::Finished(RunOutcome::Aborted(RunError::UnresolvedLabel { label, .. })) = &status
        else {
            panic!("expected unresolved label, got {:?}", status);
        };
        assert_eq!(label, "nowhere");
    }

    #[test]
    fn suspend_and_resume_on_readln() {
        let mut exec = execution("Name? [readln]Hi [response]!", FieldMap::new());
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Suspended(InputKind::Line));
        assert_eq!(out, b"Name? ");
        assert_eq!(exec.state(), &ExecState::Suspended(InputKind::Line));

        exec.deliver("Ada\r\n");
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Finished(RunOutcome::Completed));
        assert_eq!(out, b"Hi Ada!");
    }

    #[test]
    fn ansreq_keeps_waiting_on_blank_line() {
        let mut exec = execution("[ansreq]ok", FieldMap::new());
        drain(&mut exec);
        exec.deliver("   \r\n");
        assert_eq!(exec.state(), &ExecState::Suspended(InputKind::Required));
        exec.deliver("yes\n");
        assert_eq!(drain(&mut exec).1, b"ok");
        assert_eq!(exec.response(), Some("yes"));
    }

    #[test]
    fn menu_keeps_first_key() {
        let mut exec = execution("[menu]", FieldMap::new());
        drain(&mut exec);
        exec.deliver(" yes\n");
        assert_eq!(exec.response(), Some("y"));
    }

    #[test]
    fn abort_while_suspended() {
        let mut exec = execution("[readln]never", FieldMap::new());
        drain(&mut exec);
        assert_eq!(exec.abort(RunError::Cancelled), RunOutcome::Aborted(RunError::Cancelled));
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Finished(RunOutcome::Aborted(RunError::Cancelled)));
        assert!(out.is_empty());
    }

    #[test]
    fn repeat_sequence_emits_payload() {
        let mut exec = execution("[repeatseq 2]-=tail[3]", FieldMap::new());
        assert_eq!(drain(&mut exec).1, b"-=-=-=tail");
    }

    #[test]
    fn comment_writes_nothing() {
        let mut exec = execution("[comment anything here]", FieldMap::new());
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Finished(RunOutcome::Completed));
        assert!(out.is_empty());
    }

    #[test]
    fn failed_privilege_gate_hides_rest_of_line() {
        let ctx = FieldMap::new().with(Field::PrivilegeLevel, "30");
        let mut exec = execution("[acs sysop]secret [sys_name]\nvisible [acs normal]shown\n", ctx);
        assert_eq!(drain(&mut exec).1, b"visible shown\n");
    }

    #[test]
    fn fact_gate_uses_context() {
        let ctx = FieldMap::new().with(Field::Graphics, "tty");
        let mut exec = execution("[color]ansi only\n[nocolor]plain\n", ctx);
        assert_eq!(drain(&mut exec).1, b"plain\n");
    }

    #[test]
    fn missing_field_is_recoverable() {
        let mut exec = execution("[city]after", FieldMap::new());
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Finished(RunOutcome::Completed));
        assert_eq!(out, b"after");
    }

    #[test]
    fn save_and_load_restore_color() {
        let mut exec = execution("[white save]x[red]y[load]z", FieldMap::new());
        let mut expected = Vec::new();
        expected.extend_from_slice(Color::White.foreground());
        expected.push(b'x');
        expected.extend_from_slice(Color::Red.foreground());
        expected.push(b'y');
        expected.extend_from_slice(Color::White.foreground());
        expected.push(b'z');
        assert_eq!(drain(&mut exec).1, expected);
    }

    #[test]
    fn exit_in_include_returns_to_parent() {
        let store = Arc::new(TemplateStore::new());
        let interpreter = Interpreter::new(Arc::clone(&store));
        interpreter.compile("inner", "in[exit]never").unwrap();
        interpreter.compile("outer", "a[include inner]b[quit]c").unwrap();
        let mut exec = interpreter.start("outer", Arc::new(FieldMap::new())).unwrap();
        let (status, out) = drain(&mut exec);
        assert_eq!(out, b"ainb");
        assert_eq!(status, Status::Finished(RunOutcome::Halted(HaltReason::Quit)));
    }

    #[test]
    fn missing_include_waits_for_load() {
        let mut exec = execution("a[include ghost]b", FieldMap::new());
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Including("ghost".into()));
        assert_eq!(out, b"a");
        assert_eq!(drain(&mut exec).0, Status::Including("ghost".into()));

        let loaded = Arc::new(CompiledTemplate::compile("ghost", "boo ").unwrap());
        exec.enter(loaded);
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Finished(RunOutcome::Completed));
        assert_eq!(out, b"boo b");
    }

    #[test]
    fn lf_ends_hidden_line() {
        let ctx = FieldMap::new().with(Field::PrivilegeLevel, "30");
        let mut exec = execution("[acs sysop]secret[cr][lf]visible", ctx);
        assert_eq!(drain(&mut exec).1, b"visible");
    }

    #[test]
    fn unreadable_gate_level_hides_line() {
        let ctx = FieldMap::new().with(Field::PrivilegeLevel, "30");
        let mut exec = execution("[acs sysp]secret\nshown", ctx);
        assert_eq!(drain(&mut exec).1, b"shown");
    }

    #[test]
    fn hidden_line_ends_with_included_template() {
        let store = Arc::new(TemplateStore::new());
        let interpreter = Interpreter::new(Arc::clone(&store));
        interpreter.compile("inner", "in[acs sysop]secret").unwrap();
        interpreter.compile("exits", "[acs sysop]secret[exit]").unwrap();
        interpreter.compile("outer", "[include inner] after[include exits] done").unwrap();
        let ctx = FieldMap::new().with(Field::PrivilegeLevel, "30");
        let mut exec = interpreter.start("outer", Arc::new(ctx)).unwrap();
        assert_eq!(drain(&mut exec).1, b"in after done");
    }

    #[test]
    fn oversized_repeat_count_is_skipped() {
        let mut exec = execution("a[repeatseq 4]four[4000000000]b", FieldMap::new());
        let (status, out) = drain(&mut exec);
        assert_eq!(status, Status::Finished(RunOutcome::Completed));
        assert_eq!(out, b"ab");
    }

    #[test]
    fn tight_loop_yields() {
        let mut exec = execution("[/spin][goto spin]", FieldMap::new());
        assert_eq!(drain(&mut exec).0, Status::Yielded);
        assert_eq!(drain(&mut exec).0, Status::Yielded);
    }

    #[test]
    fn two_executions_keep_their_own_counters() {
        let store = Arc::new(TemplateStore::new());
        let interpreter = Interpreter::new(Arc::clone(&store));
        interpreter.compile("t", "one[readln]two[readln]three").unwrap();
        let mut a = interpreter.start("t", Arc::new(FieldMap::new())).unwrap();
        let mut b = interpreter.start("t", Arc::new(FieldMap::new())).unwrap();
        drain(&mut a);
        a.deliver("x");
        drain(&mut a);
        drain(&mut b);
        assert_eq!(a.program_counter(), Some(4));
        assert_eq!(b.program_counter(), Some(2));
    }
}
