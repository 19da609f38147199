use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::config::Config;
use crate::mecca::{Hangup, Interpreter, TemplateStore};
use crate::metrics;
use super::session::{ScreenState, Session};
use super::system::SessionContext;

const BUSY_MESSAGE: &[u8] = b"All nodes are busy, please call back later.\r\n";

#[derive(Debug, Default)]
struct CallLog {
    active: AtomicUsize,
    next_node: AtomicU32,
    calls: AtomicU64,
    last_user: Mutex<Option<String>>,
}

/// Main BBS server: accepts callers and walks each through the screen templates
#[derive(Clone)]
pub struct BbsServer {
    config: Arc<Config>,
    interpreter: Interpreter,
    calls: Arc<CallLog>,
}

impl BbsServer {
    /// Create a new BBS server instance
    pub async fn new(config: Config) -> Result<Self> {
        let store = Arc::new(TemplateStore::with_root(&config.mecca.template_root));
        if config.mecca.preload {
            let (compiled, failed) = store.load_all().await.map_err(|e| {
                anyhow!("Failed to read template root {}: {}", config.mecca.template_root, e)
            })?;
            info!("Preloaded {} templates ({} failed)", compiled, failed);
        }
        let interpreter = Interpreter::new(store).with_charset(config.mecca.charset);
        Ok(BbsServer {
            config: Arc::new(config),
            interpreter,
            calls: Arc::new(CallLog::default()),
        })
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn active_sessions(&self) -> usize {
        self.calls.active.load(Ordering::Relaxed)
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.bind)
            .await
            .map_err(|e| anyhow!("Failed to bind {}: {}", self.config.server.bind, e))?;
        info!(
            "BBS '{}' (sysop {}) listening on {}",
            self.config.bbs.name, self.config.bbs.sysop, self.config.server.bind
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
        });
        self.serve(listener, shutdown_rx).await
    }

    /// Accept loop. Setting `shutdown` hangs up every live session and returns.
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let hangup = Hangup::from_receiver(shutdown.clone());
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => self.accept(stream, peer.to_string(), hangup.clone()),
                    Err(e) => warn!("accept error: {}", e),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        self.shutdown();
        Ok(())
    }

    fn accept(&self, mut stream: TcpStream, peer: String, hangup: Hangup) {
        let limit = self.config.server.max_sessions;
        if self.calls.active.fetch_add(1, Ordering::SeqCst) >= limit {
            self.calls.active.fetch_sub(1, Ordering::SeqCst);
            warn!("Rejecting {}: all {} nodes busy", peer, limit);
            tokio::spawn(async move {
                let _ = stream.write_all(BUSY_MESSAGE).await;
                let _ = stream.shutdown().await;
            });
            return;
        }
        let server = self.clone();
        tokio::spawn(async move {
            let session = server.serve_connection(stream, peer, hangup).await;
            server.calls.active.fetch_sub(1, Ordering::SeqCst);
            debug!("node {} closed ({})", session.node, session.display_name());
        });
    }

    /// Run one caller through connect, login and main menu screens.
    pub async fn serve_connection<S>(&self, stream: S, peer: String, hangup: Hangup) -> Session
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let node = self.calls.next_node.fetch_add(1, Ordering::SeqCst) + 1;
        let calls = self.calls.calls.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Node {}: connection from {}", node, peer);

        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);
        let mut session = Session::new(node, peer, self.config.server.session_timeout);

        while let Some(template) = session.state.template(&self.config.mecca.screens) {
            let last_user = self.calls.last_user.lock().unwrap_or_else(|p| p.into_inner()).clone();
            let context =
                SessionContext::new(&self.config.bbs, &session).with_history(last_user, calls);
            let report = self
                .interpreter
                .run(template, Arc::new(context), &mut reader, &mut writer, hangup.clone())
                .await;
            let was_guest = !session.is_logged_in();
            let next = session.advance(&report, self.config.bbs.default_level);
            if next == ScreenState::Disconnected {
                break;
            }
            if was_guest && session.is_logged_in() {
                let mut last_user = self.calls.last_user.lock().unwrap_or_else(|p| p.into_inner());
                *last_user = session.username.clone();
            }
        }

        if let Err(e) = writer.shutdown().await {
            debug!("node {}: shutdown error: {}", node, e);
        }
        session
    }

    /// Show BBS status and template statistics
    pub async fn show_status(&self) -> Result<()> {
        println!("=== MeccaBBS Status ===");
        println!("BBS Name: {}", self.config.bbs.name);
        println!("Sysop: {}", self.config.bbs.sysop);
        println!("Location: {}", self.config.bbs.location);
        println!("Listen Address: {}", self.config.server.bind);
        println!("Max Sessions: {}", self.config.server.max_sessions);

        let store = self.interpreter.store();
        match store.load_all().await {
            Ok((compiled, failed)) => {
                println!("Template Root: {}", self.config.mecca.template_root);
                println!("Templates: {} compiled, {} failed", compiled, failed);
            }
            Err(e) => {
                error!("Cannot read template root {}: {}", self.config.mecca.template_root, e)
            }
        }
        for screen in [ScreenState::Connect, ScreenState::Login, ScreenState::MainMenu] {
            if let Some(name) = screen.template(&self.config.mecca.screens) {
                let state = if store.contains(name) { "ok" } else { "MISSING" };
                println!("Screen {:?}: {} [{}]", screen, name, state);
            }
        }
        Ok(())
    }

    fn shutdown(&self) {
        info!("Shutting down BBS server ({} sessions active)", self.active_sessions());
        let m = metrics::snapshot();
        info!(
            "metrics: compiled={} compile_failures={} completed={} halted={} aborted={} \
             unimplemented={}",
            m.templates_compiled,
            m.compile_failures,
            m.runs_completed,
            m.runs_halted,
            m.runs_aborted,
            m.unimplemented
        );
        info!("BBS server shutdown complete");
    }
}
