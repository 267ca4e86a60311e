//! The session server event loop.
//!
//! A single task owns every session, the ban list and the execution slot.
//! It waits on new connections, session frames, run completions and
//! liveness ticks, and handles each to completion before the next. Macro
//! runs happen on the blocking pool and report back through the event
//! channel.

use crate::{
    AppError, AppResult,
    config::ServerConfig,
    server::{
        AuthDecision, Authorizer, ClientRequest, ExecutionResult, ExecutionSlot, Message,
        RunToken, ServerEvent, ServerMessage, Session, SessionId, liveness, parse_layout,
        session,
    },
};

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    net::{IpAddr, SocketAddr},
    panic::Location,
    sync::Arc,
    time::Instant,
};

use error_location::ErrorLocation;
use macro_relay_core::{
    CoreResult, EnigoInjector, ExecutionHandle, ExecutionOutcome, InputInjector, Macro,
    MacroExecutor, MacroStore,
};
use serde_json::Value;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tracing::{debug, error, info, instrument, warn};

/// Builds the injector a macro run plays against. Called on the run's own
/// blocking thread.
pub(crate) type InjectorFactory =
    Arc<dyn Fn() -> CoreResult<Box<dyn InputInjector>> + Send + Sync>;

/// Injector factory for the real desktop.
pub(crate) fn enigo_injector_factory() -> InjectorFactory {
    Arc::new(|| {
        let injector = EnigoInjector::new()?;
        Ok(Box::new(injector) as Box<dyn InputInjector>)
    })
}

/// A bound, not yet running, session server.
pub(crate) struct Server {
    listener: TcpListener,
    state: ServerState,
    events_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    /// Bind the first free port in `port .. port + max_attempts`.
    #[instrument(skip(store, authorizer, injectors))]
    pub(crate) async fn bind(
        config: ServerConfig,
        store: MacroStore,
        authorizer: Arc<dyn Authorizer>,
        injectors: InjectorFactory,
    ) -> AppResult<Self> {
        let attempts = config.max_attempts.max(1);

        for offset in 0..attempts {
            let Some(port) = config.port.checked_add(offset) else {
                break;
            };

            match TcpListener::bind((config.bind_address.as_str(), port)).await {
                Ok(listener) => {
                    info!(address = %config.bind_address, port, "Listening");
                    let (events, events_rx) = mpsc::unbounded_channel();
                    return Ok(Self {
                        listener,
                        state: ServerState {
                            config,
                            store,
                            authorizer,
                            injectors,
                            sessions: HashMap::new(),
                            banned: HashSet::new(),
                            slot: ExecutionSlot::new(),
                            events,
                        },
                        events_rx,
                    });
                }
                Err(e) => warn!(address = %config.bind_address, port, error = %e, "Cannot listen"),
            }
        }

        Err(AppError::BindFailed {
            reason: format!(
                "Could not bind {} on any of {} ports starting at {}",
                config.bind_address, attempts, config.port
            ),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    pub(crate) fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` completes, then stop the running macro and
    /// close every session.
    pub(crate) async fn run<F>(self, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            mut state,
            mut events_rx,
        } = self;

        let monitor =
            liveness::spawn_monitor(state.config.liveness_interval(), state.events.clone());

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => state.accept(stream, addr).await,
                    Err(e) => warn!(error = %e, "Accept failed"),
                },

                Some(event) = events_rx.recv() => state.handle_event(event),
            }
        }

        monitor.abort();
        state.shutdown();
        drop(listener);

        info!("Server closed");

        Ok(())
    }
}

struct ServerState {
    config: ServerConfig,
    store: MacroStore,
    authorizer: Arc<dyn Authorizer>,
    injectors: InjectorFactory,
    sessions: HashMap<SessionId, Session>,
    banned: HashSet<IpAddr>,
    slot: ExecutionSlot,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl ServerState {
    #[instrument(skip(self, stream))]
    async fn accept(&mut self, stream: TcpStream, addr: SocketAddr) {
        info!("Client connected");

        if self.banned.contains(&addr.ip()) {
            warn!("Banned client tried to connect, rejecting");
            session::reject(stream).await;
            return;
        }

        if self.config.auth_mode {
            let authorizer = Arc::clone(&self.authorizer);
            let decision = match tokio::task::spawn_blocking(move || authorizer.decide(addr)).await
            {
                Ok(decision) => decision,
                Err(e) => {
                    error!(error = %e, "Authorizer failed, denying");
                    AuthDecision::Deny
                }
            };

            match decision {
                AuthDecision::Approve => {}
                AuthDecision::Deny => {
                    info!("Connection denied");
                    session::reject(stream).await;
                    return;
                }
                AuthDecision::Ban => {
                    info!(ip = %addr.ip(), "Address banned");
                    self.banned.insert(addr.ip());
                    session::reject(stream).await;
                    return;
                }
            }
        }

        let mut session = Session::spawn(stream, addr, self.events.clone());
        session.authorized = true;

        if let Err(e) = session.send(&ServerMessage::HelloAccept) {
            warn!(error = %e, "Failed to greet session");
            session.close();
            return;
        }

        info!(session_id = %session.id, "Session accepted");
        self.sessions.insert(session.id, session);
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Frame { session, line } => self.on_frame(session, &line),
            ServerEvent::Closed { session, reason } => self.teardown(session, &reason),
            ServerEvent::ExecutionFinished {
                token,
                macro_id,
                result,
            } => self.on_execution_finished(token, macro_id, result),
            ServerEvent::LivenessTick => self.evict_stale(Instant::now()),
        }
    }

    fn on_frame(&mut self, id: SessionId, line: &str) {
        let Some(session) = self.sessions.get(&id) else {
            debug!(session_id = %id, "Frame for a closed session");
            return;
        };

        if self.banned.contains(&session.addr.ip()) {
            warn!(session_id = %id, addr = %session.addr, "Message from banned client");
            self.teardown(id, "address banned");
            return;
        }

        if !session.authorized {
            warn!(session_id = %id, "Message from unauthorized session ignored");
            return;
        }

        if line.trim().is_empty() {
            return;
        }

        let message = match Message::decode(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(session_id = %id, error = %e, "Undecodable message");
                self.teardown(id, "decode error");
                return;
            }
        };

        debug!(session_id = %id, kind = %message.kind, "Message received");

        if let Err(e) = self.dispatch(id, ClientRequest::from(message)) {
            warn!(session_id = %id, error = %e, "Failed to handle message");
            self.teardown(id, "handler error");
        }
    }

    fn dispatch(&mut self, id: SessionId, request: ClientRequest) -> AppResult<()> {
        match request {
            ClientRequest::Heartbeat => {
                self.reply(id, &ServerMessage::Pong)?;
                if let Some(session) = self.sessions.get_mut(&id) {
                    session.touch(Instant::now());
                }
                Ok(())
            }
            ClientRequest::RequestMacros => {
                let list = self.store.list_all()?;
                self.reply(id, &ServerMessage::MacroList(list))
            }
            ClientRequest::RequestMacrosUpdate => {
                let list = self.store.list_all()?;
                self.reply(id, &ServerMessage::UpdateMacroList(list))
            }
            ClientRequest::ExecuteMacro { macro_id } => self.execute_macro(id, macro_id),
            ClientRequest::StopMacro => self.stop_macro(id),
            ClientRequest::SetLayout { layout } => self.set_layout(id, &layout),
            ClientRequest::Unknown { kind } => {
                debug!(session_id = %id, %kind, "Ignoring unknown message type");
                Ok(())
            }
        }
    }

    #[instrument(skip(self))]
    fn execute_macro(&mut self, id: SessionId, macro_id: String) -> AppResult<()> {
        let (token, handle) = match self.slot.try_occupy(&macro_id) {
            Ok(grant) => grant,
            Err(running) => {
                info!(%running, "Another macro is already running");
                return self.reply(id, &ServerMessage::MacroAlreadyRunning(running));
            }
        };

        let definition = match self.store.load(&macro_id) {
            Ok(definition) => definition,
            Err(e) => {
                self.slot.release(token);
                warn!(error = %e, "Requested macro not found");
                return self.reply(id, &ServerMessage::Error(format!("Macro {} not found", macro_id)));
            }
        };

        self.spawn_execution(token, handle, macro_id.clone(), definition);
        info!(run_id = %token, "Macro started");
        self.broadcast(&ServerMessage::MacroStarted(macro_id), None);

        Ok(())
    }

    /// Run on the blocking pool and report the result as an event.
    fn spawn_execution(
        &self,
        token: RunToken,
        handle: ExecutionHandle,
        macro_id: String,
        definition: Macro,
    ) {
        let mut executor = MacroExecutor::new(definition)
            .with_store(self.store.clone())
            .with_handle(handle);
        let injectors = Arc::clone(&self.injectors);
        let events = self.events.clone();

        let run = tokio::task::spawn_blocking(move || {
            let mut injector = injectors()?;
            executor.execute(&mut *injector)
        });

        tokio::spawn(async move {
            let result: ExecutionResult = run.await.map_err(|e| e.to_string());
            if events
                .send(ServerEvent::ExecutionFinished {
                    token,
                    macro_id,
                    result,
                })
                .is_err()
            {
                debug!(run_id = %token, "Event loop gone before run finished");
            }
        });
    }

    fn stop_macro(&mut self, id: SessionId) -> AppResult<()> {
        match self.slot.stop_current() {
            Some(macro_id) => {
                info!(%macro_id, "Macro stopped on request");
                self.broadcast(&ServerMessage::MacroStopped(macro_id), None);
                Ok(())
            }
            None => self.reply(id, &ServerMessage::Error("No macro running".to_string())),
        }
    }

    #[instrument(skip(self, layout))]
    fn set_layout(&mut self, id: SessionId, layout: &Value) -> AppResult<()> {
        let entries = match parse_layout(layout) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Invalid layout data");
                return self.reply(id, &ServerMessage::Error("Invalid layout data".to_string()));
            }
        };

        let mut updated = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.store.load(&entry.macro_id) {
                Ok(mut definition) => {
                    definition.position = entry.position;
                    updated.push(definition);
                }
                Err(e) => {
                    warn!(macro_id = %entry.macro_id, error = %e, "Layout entry skipped");
                    self.reply(
                        id,
                        &ServerMessage::Error(format!("Macro {} not found", entry.macro_id)),
                    )?;
                }
            }
        }

        let mut saved = 0;
        for definition in &updated {
            match self.store.save_metadata(definition) {
                Ok(()) => saved += 1,
                Err(e) => {
                    warn!(macro_id = %definition.id(), error = %e, "Layout position not saved");
                    self.reply(
                        id,
                        &ServerMessage::Error(format!("Macro {} not saved", definition.id())),
                    )?;
                }
            }
        }

        info!(count = saved, "Layout has been set");

        let list = self.store.list_all()?;
        self.broadcast(&ServerMessage::UpdateMacroList(list), Some(id));

        Ok(())
    }

    #[instrument(skip(self, result))]
    fn on_execution_finished(&mut self, token: RunToken, macro_id: String, result: ExecutionResult) {
        match result {
            Ok(Ok(ExecutionOutcome::Success)) => {
                info!("Macro finished");
                self.broadcast(&ServerMessage::MacroEnded(macro_id), None);
            }
            Ok(Ok(ExecutionOutcome::Stopped)) => {
                debug!("Stopped run finished, clients already notified");
            }
            Ok(Err(e)) => {
                error!(error = %e, "Macro run failed");
                self.broadcast(&ServerMessage::MacroEnded(macro_id), None);
            }
            Err(reason) => {
                error!(%reason, "Macro worker died");
                self.broadcast(&ServerMessage::MacroEnded(macro_id), None);
            }
        }

        self.slot.release(token);
    }

    fn evict_stale(&mut self, now: Instant) {
        let timeout = self.config.heartbeat_timeout();
        for id in liveness::stale_sessions(self.sessions.values(), now, timeout) {
            info!(session_id = %id, "Session timed out");
            self.teardown(id, "heartbeat timeout");
        }
    }

    #[track_caller]
    fn reply(&self, id: SessionId, message: &ServerMessage) -> AppResult<()> {
        match self.sessions.get(&id) {
            Some(session) => session.send(message),
            None => Ok(()),
        }
    }

    /// Send to every session except `except`. Sessions that cannot be
    /// written to are torn down.
    fn broadcast(&mut self, message: &ServerMessage, except: Option<SessionId>) {
        let failed: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|session| Some(session.id) != except)
            .filter_map(|session| match session.send(message) {
                Ok(()) => None,
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Broadcast failed");
                    Some(session.id)
                }
            })
            .collect();

        for id in failed {
            self.teardown(id, "send failed");
        }
    }

    /// Remove a session. Unknown ids are ignored.
    fn teardown(&mut self, id: SessionId, reason: &str) {
        if let Some(session) = self.sessions.remove(&id) {
            info!(session_id = %id, addr = %session.addr, %reason, "Session closed");
            session.close();
        }
    }

    fn shutdown(&mut self) {
        if let Some(macro_id) = self.slot.stop_current() {
            info!(%macro_id, "Stopping running macro");
            self.broadcast(&ServerMessage::MacroStopped(macro_id), None);
        }

        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.teardown(id, "server shutting down");
        }
    }
}
