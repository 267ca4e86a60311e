#![allow(clippy::unwrap_used, clippy::panic)]

use crate::{
    AppResult,
    config::ServerConfig,
    server::{AuthDecision, Authorizer, InjectorFactory, Message, Server},
};

use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use macro_relay_core::{
    CoreResult, InputInjector, KeyRef, KeyboardInjector, Macro, MacroStore, MouseButton,
    MouseInjector,
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Injector that accepts every action and does nothing.
pub(crate) struct NullInjector;

impl KeyboardInjector for NullInjector {
    fn key(&mut self, _key: KeyRef, _press: bool) -> CoreResult<()> {
        Ok(())
    }

    fn text(&mut self, _text: &str) -> CoreResult<()> {
        Ok(())
    }
}

impl MouseInjector for NullInjector {
    fn move_to(&mut self, _x: i32, _y: i32) -> CoreResult<()> {
        Ok(())
    }

    fn move_by(&mut self, _dx: i32, _dy: i32) -> CoreResult<()> {
        Ok(())
    }

    fn button(&mut self, _button: MouseButton, _press: bool) -> CoreResult<()> {
        Ok(())
    }

    fn scroll(&mut self, _dx: i32, _dy: i32) -> CoreResult<()> {
        Ok(())
    }
}

pub(crate) fn null_injectors() -> InjectorFactory {
    Arc::new(|| Ok(Box::new(NullInjector) as Box<dyn InputInjector>))
}

/// Authorizer that replays scripted answers, then approves.
pub(crate) struct ScriptedAuthorizer {
    answers: Mutex<VecDeque<AuthDecision>>,
    asked: AtomicUsize,
}

impl ScriptedAuthorizer {
    pub(crate) fn new(answers: impl IntoIterator<Item = AuthDecision>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: AtomicUsize::new(0),
        })
    }

    pub(crate) fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Authorizer for ScriptedAuthorizer {
    fn decide(&self, _addr: SocketAddr) -> AuthDecision {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(AuthDecision::Approve)
    }
}

pub(crate) fn test_config() -> ServerConfig {
    ServerConfig {
        bind_address: "127.0.0.1".to_string(),
        port: 0,
        max_attempts: 1,
        ..ServerConfig::default()
    }
}

pub(crate) struct TestServer {
    pub(crate) addr: SocketAddr,
    pub(crate) _store_dir: TempDir,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<AppResult<()>>,
}

impl TestServer {
    pub(crate) async fn start(config: ServerConfig, macros: &[Macro]) -> Self {
        Self::start_with(config, macros, ScriptedAuthorizer::new([])).await
    }

    pub(crate) async fn start_with(
        config: ServerConfig,
        macros: &[Macro],
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self::launch(config, macros, authorizer, null_injectors()).await
    }

    pub(crate) async fn start_with_injectors(
        config: ServerConfig,
        macros: &[Macro],
        injectors: InjectorFactory,
    ) -> Self {
        Self::launch(config, macros, ScriptedAuthorizer::new([]), injectors).await
    }

    async fn launch(
        config: ServerConfig,
        macros: &[Macro],
        authorizer: Arc<dyn Authorizer>,
        injectors: InjectorFactory,
    ) -> Self {
        let store_dir = TempDir::new().unwrap();
        let store = MacroStore::open(store_dir.path()).unwrap();
        for definition in macros {
            store.save(definition, true).unwrap();
        }

        let server = Server::bind(config, store, authorizer, injectors)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run(async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            _store_dir: store_dir,
            shutdown,
            task,
        }
    }

    pub(crate) async fn stop(self) -> AppResult<()> {
        let _ = self.shutdown.send(());
        self.task.await.unwrap()
    }
}

pub(crate) struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub(crate) async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    /// Connect and consume the `hello/accept` greeting.
    pub(crate) async fn accepted(addr: SocketAddr) -> Self {
        let mut client = Self::connect(addr).await;
        let hello = client.recv().await.unwrap();
        assert_eq!(hello.kind, "hello");
        assert_eq!(hello.data, "accept");
        client
    }

    pub(crate) async fn send(&mut self, kind: &str, data: Value) {
        let line = Message::new(kind, data).encode().unwrap();
        self.send_raw(&line).await;
    }

    pub(crate) async fn send_raw(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.unwrap();
    }

    /// Next message, or `None` once the server closed the connection.
    pub(crate) async fn recv(&mut self) -> Option<Message> {
        match timeout(RECV_TIMEOUT, self.lines.next_line()).await {
            Ok(Ok(Some(line))) => Some(Message::decode(&line).unwrap()),
            Ok(Ok(None)) | Ok(Err(_)) => None,
            Err(_) => panic!("no message within {:?}", RECV_TIMEOUT),
        }
    }

    /// Read until the server closes the connection. Returns how many lines
    /// arrived first, or `None` if it stays open past `window`.
    pub(crate) async fn lines_until_closed(&mut self, window: Duration) -> Option<usize> {
        let lines = &mut self.lines;
        let drain = async move {
            let mut count = 0;
            while let Ok(Some(_)) = lines.next_line().await {
                count += 1;
            }
            count
        };
        timeout(window, drain).await.ok()
    }

    /// Whether nothing arrives within `window`.
    pub(crate) async fn is_silent_for(&mut self, window: Duration) -> bool {
        timeout(window, self.lines.next_line()).await.is_err()
    }
}
