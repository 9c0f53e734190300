// ── Controller abstraction ──
//
// Lifecycle management for one ACE host. A single engine task owns all
// mutation: push events, consumer requests, reconciliation pulls and
// debounced slot writes are queued and handled one at a time.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use acectl_api::{AceClient, PushEvent, PushHandle, SlotUpdate};

use crate::command::request::RequestEnvelope;
use crate::command::{AceCommand, CommandDispatcher, ReconcileRequest, Request, RequestOutcome};
use crate::config::ControllerConfig;
use crate::debounce::{DebounceRegistry, Fired};
use crate::error::CoreError;
use crate::extract::{StateFact, TextExtractor};
use crate::feed_assist::FeedAssistCoordinator;
use crate::model::{AceState, Rgb};
use crate::notice::Notice;
use crate::store::{StatusStore, is_status_payload};

const REQUEST_CHANNEL_SIZE: usize = 64;
const NOTICE_CHANNEL_SIZE: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Push channel dropped; the next attempt follows after the fixed delay.
    Reconnecting,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Reads go straight to the
/// [`StatusStore`]; everything that talks to the host goes through
/// [`execute`](Self::execute).
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: Arc<AceClient>,
    store: Arc<StatusStore>,
    connection: Arc<watch::Sender<ConnectionState>>,
    notices: broadcast::Sender<Notice>,
    request_tx: mpsc::Sender<RequestEnvelope>,
    /// Parked engine while not connected.
    engine: Mutex<Option<Engine>>,
    /// Running engine; hands the engine back when it stops.
    task: Mutex<Option<JoinHandle<Engine>>>,
    push: Mutex<Option<PushHandle>>,
    cancel: CancellationToken,
    /// Child token for the current connection, replaced on reconnect.
    cancel_child: Mutex<CancellationToken>,
}

impl Controller {
    /// Build a controller. Does NOT connect; call [`connect()`](Self::connect).
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let client = Arc::new(AceClient::new(config.url.clone(), &config.transport())?);
        let store = Arc::new(StatusStore::new(config.slot_count));
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        let connection = Arc::new(connection);
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        let (request_tx, request_rx) = mpsc::channel(REQUEST_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        let engine = Engine::new(
            &config,
            Arc::clone(&client),
            Arc::clone(&store),
            notices.clone(),
            Arc::clone(&connection),
            request_rx,
        );

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                store,
                connection,
                notices,
                request_tx,
                engine: Mutex::new(Some(engine)),
                task: Mutex::new(None),
                push: Mutex::new(None),
                cancel,
                cancel_child: Mutex::new(cancel_child),
            }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.inner.store
    }

    /// Current canonical state.
    pub fn status(&self) -> Arc<AceState> {
        self.inner.store.snapshot()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Arc<AceState>> {
        self.inner.store.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.subscribe()
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Pull an initial snapshot, open the push channel (if enabled) and
    /// start the engine.
    ///
    /// With push disabled an unreachable host is an error. With push
    /// enabled it is not: the push channel keeps retrying and every
    /// successful (re)connect pulls a fresh snapshot.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        let config = &self.inner.config;
        let ws_url = if config.push_enabled {
            Some(self.inner.client.websocket_url()?)
        } else {
            None
        };

        let Some(engine) = self.inner.engine.lock().await.take() else {
            return Err(CoreError::Internal("engine was lost by a previous run".into()));
        };

        self.inner.connection.send_replace(ConnectionState::Connecting);
        info!(url = %config.url, "connecting to ACE host");

        if let Err(e) = pull_status(&self.inner.client, &self.inner.store).await {
            if ws_url.is_none() {
                *self.inner.engine.lock().await = Some(engine);
                self.inner.connection.send_replace(ConnectionState::Disconnected);
                return Err(e);
            }
            warn!(error = %e, "initial status pull failed, waiting for push channel");
            let _ = self.inner.notices.send(Notice::StatusLoadFailed {
                message: e.to_string(),
            });
        }

        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let push_rx = match ws_url {
            Some(url) => {
                let handle = PushHandle::connect(
                    url,
                    config.reconnect(),
                    config.api_key.clone(),
                    child.clone(),
                );
                let rx = handle.subscribe();
                *self.inner.push.lock().await = Some(handle);
                Some(rx)
            }
            None => {
                self.inner.connection.send_replace(ConnectionState::Connected);
                None
            }
        };

        *task = Some(tokio::spawn(engine.run(push_rx, child)));
        debug!("engine started");
        Ok(())
    }

    /// Stop the engine and the push channel. Pending debounced edits are
    /// written before the engine exits. The controller can connect again.
    pub async fn disconnect(&self) {
        // Taken before cancelling: no request can be queued past this point.
        let task = self.inner.task.lock().await.take();
        self.inner.cancel_child.lock().await.cancel();

        if let Some(handle) = self.inner.push.lock().await.take() {
            handle.shutdown();
        }

        if let Some(task) = task {
            match task.await {
                Ok(engine) => *self.inner.engine.lock().await = Some(engine),
                Err(e) => warn!(error = %e, "engine task ended abnormally"),
            }
        }

        self.inner.connection.send_replace(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    // ── Requests ─────────────────────────────────────────────────

    /// Queue a request for the engine and wait for its outcome.
    ///
    /// A request still queued when [`disconnect`](Self::disconnect) stops
    /// the engine resolves to [`CoreError::ControllerDisconnected`].
    pub async fn execute(&self, request: Request) -> Result<RequestOutcome, CoreError> {
        let (reply, rx) = oneshot::channel();
        {
            // Held across the send so disconnect cannot slip in between.
            let task = self.inner.task.lock().await;
            if task.is_none() {
                return Err(CoreError::ControllerDisconnected);
            }
            self.inner
                .request_tx
                .send(RequestEnvelope { request, reply })
                .await
                .map_err(|_| CoreError::ControllerDisconnected)?;
        }

        rx.await.map_err(|_| CoreError::ControllerDisconnected)
    }

    /// Send one command.
    pub async fn command(&self, command: AceCommand) -> Result<RequestOutcome, CoreError> {
        self.execute(Request::Command(command)).await
    }

    /// Pull a fresh snapshot and announce it.
    pub async fn refresh(&self) -> Result<RequestOutcome, CoreError> {
        self.execute(Request::Refresh).await
    }

    /// Run `f` against a connected controller without the push channel,
    /// then disconnect. Suited to single CLI invocations.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.push_enabled = false;

        let controller = Controller::new(cfg)?;
        controller.connect().await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }
}

/// Fetch the status endpoint and merge it.
///
/// A payload without any status field is ignored with a warning.
async fn pull_status(client: &AceClient, store: &StatusStore) -> Result<(), CoreError> {
    let payload: Value = client.fetch_status().await?;
    if !is_status_payload(&payload) {
        warn!("pulled payload carries no status fields, ignoring");
        return Ok(());
    }
    store.apply_snapshot(&payload)?;
    Ok(())
}

// ── Engine ───────────────────────────────────────────────────────

/// The single actor that mutates engine state.
struct Engine {
    client: Arc<AceClient>,
    store: Arc<StatusStore>,
    dispatcher: CommandDispatcher,
    extractor: TextExtractor,
    debounce: DebounceRegistry<u8, i64>,
    notices: broadcast::Sender<Notice>,
    connection: Arc<watch::Sender<ConnectionState>>,
    requests: mpsc::Receiver<RequestEnvelope>,
    reconcile_rx: mpsc::UnboundedReceiver<ReconcileRequest>,
    fired_rx: mpsc::UnboundedReceiver<Fired<u8>>,
}

impl Engine {
    fn new(
        config: &ControllerConfig,
        client: Arc<AceClient>,
        store: Arc<StatusStore>,
        notices: broadcast::Sender<Notice>,
        connection: Arc<watch::Sender<ConnectionState>>,
        requests: mpsc::Receiver<RequestEnvelope>,
    ) -> Self {
        let (reconcile_tx, reconcile_rx) = mpsc::unbounded_channel();
        let (debounce, fired_rx) = DebounceRegistry::new(config.debounce_delay);
        let dispatcher = CommandDispatcher::new(
            Arc::clone(&client),
            notices.clone(),
            reconcile_tx,
            config.reconcile_delay,
            config.slot_count,
        );

        Self {
            client,
            store,
            dispatcher,
            extractor: TextExtractor::builtin(),
            debounce,
            notices,
            connection,
            requests,
            reconcile_rx,
            fired_rx,
        }
    }

    /// Handle events until cancelled, then hand the engine back.
    async fn run(
        mut self,
        mut push: Option<broadcast::Receiver<Arc<PushEvent>>>,
        cancel: CancellationToken,
    ) -> Self {
        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                Some(envelope) = self.requests.recv() => {
                    let outcome = self.handle_request(envelope.request).await;
                    let _ = envelope.reply.send(outcome);
                }

                event = recv_push(&mut push) => match event {
                    Ok(event) => self.on_push(&event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "push events dropped, resynchronizing");
                        self.refresh(false).await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("push channel ended");
                        push = None;
                    }
                },

                Some(request) = self.reconcile_rx.recv() => {
                    debug!(command = %request.command, "reconciling after command");
                    self.refresh(false).await;
                }

                Some(fired) = self.fired_rx.recv() => {
                    if let Some(temperature) = self.debounce.claim(&fired) {
                        self.write_slot_temperature(fired.key, temperature).await;
                    }
                }
            }
        }

        for (index, temperature) in self.debounce.drain() {
            debug!(slot = index, "flushing pending temperature edit");
            self.write_slot_temperature(index, temperature).await;
        }

        // Dropping the reply senders fails the waiting callers.
        let mut abandoned = 0_usize;
        while self.requests.try_recv().is_ok() {
            abandoned += 1;
        }
        if abandoned > 0 {
            debug!(abandoned, "dropped requests queued at shutdown");
        }
        self
    }

    // ── Push events ──────────────────────────────────────────────

    async fn on_push(&self, event: &PushEvent) {
        match event {
            PushEvent::Connected => {
                self.connection.send_replace(ConnectionState::Connected);
                self.notify(Notice::Connected);
                self.refresh(false).await;
            }
            PushEvent::Disconnected { reason } => {
                self.connection.send_replace(ConnectionState::Reconnecting);
                self.notify(Notice::Disconnected {
                    reason: reason.clone(),
                });
            }
            PushEvent::Status(payload) => {
                if let Err(e) = self.store.apply_snapshot(payload) {
                    warn!(error = %e, "discarding pushed status");
                }
            }
            PushEvent::LogLine(line) => {
                let mut resync = false;
                for fact in self.extractor.extract(line) {
                    match fact {
                        StateFact::ResyncRequested => resync = true,
                        other => self.store.apply_fact(&other),
                    }
                }
                if resync {
                    self.refresh(false).await;
                }
            }
        }
    }

    // ── Requests ─────────────────────────────────────────────────

    async fn handle_request(&mut self, request: Request) -> RequestOutcome {
        let coordinator = FeedAssistCoordinator::new(&self.dispatcher, &self.store);
        match request {
            Request::Command(AceCommand::ChangeTool { tool }) => {
                RequestOutcome::Command(coordinator.change_tool(tool).await)
            }
            Request::Command(AceCommand::EnableFeedAssist { index }) => {
                RequestOutcome::FeedAssist(coordinator.enable(index).await)
            }
            Request::Command(AceCommand::DisableFeedAssist { index }) => {
                RequestOutcome::FeedAssist(coordinator.disable(index).await)
            }
            Request::Command(command) => {
                RequestOutcome::Command(self.dispatcher.dispatch(&command).await)
            }
            Request::ToggleFeedAssist { index } => {
                RequestOutcome::FeedAssist(coordinator.toggle(index).await)
            }
            Request::DisableAllFeedAssist => {
                RequestOutcome::FeedAssist(coordinator.disable_all().await)
            }
            Request::SetSlotColor { index, color } => self.set_slot_color(index, color).await,
            Request::SetSlotMaterial { index, material } => {
                let mut update = SlotUpdate::new(i64::from(index));
                update.material = Some(material);
                self.update_slot(index, &update).await
            }
            Request::SetSlotTemperature { index, temperature } => {
                if let Err(outcome) = self.check_slot(index) {
                    return outcome;
                }
                self.debounce.schedule(index, temperature);
                RequestOutcome::SlotUpdateQueued { index }
            }
            Request::Refresh => match self.refresh(true).await {
                Ok(()) => RequestOutcome::Refreshed,
                Err(message) => RequestOutcome::RefreshFailed { message },
            },
        }
    }

    async fn set_slot_color(&self, index: u8, color: Rgb) -> RequestOutcome {
        let mut update = SlotUpdate::new(i64::from(index));
        update.color = Some(color.0);
        self.update_slot(index, &update).await
    }

    async fn write_slot_temperature(&self, index: u8, temperature: i64) {
        let mut update = SlotUpdate::new(i64::from(index));
        update.temp = Some(temperature);
        self.update_slot(index, &update).await;
    }

    fn check_slot(&self, index: u8) -> Result<(), RequestOutcome> {
        if index < self.store.slot_count() {
            return Ok(());
        }
        let message = format!(
            "slot index {index} out of range (0-{})",
            self.store.slot_count().saturating_sub(1)
        );
        self.notify(Notice::ValidationFailed {
            command: "update_slot".into(),
            message: message.clone(),
        });
        Err(RequestOutcome::SlotUpdateFailed { index, message })
    }

    /// Write a slot edit; on success pull the status it changed.
    async fn update_slot(&self, index: u8, update: &SlotUpdate) -> RequestOutcome {
        if let Err(outcome) = self.check_slot(index) {
            return outcome;
        }

        match self.client.update_slot(update).await {
            Ok(()) => {
                info!(slot = index, "slot updated");
                self.notify(Notice::SlotUpdated { index });
                self.refresh(false).await;
                RequestOutcome::SlotUpdated { index }
            }
            Err(e) => {
                warn!(slot = index, error = %e, "slot update failed");
                let message = e.to_string();
                self.notify(Notice::SlotUpdateFailed {
                    index,
                    message: message.clone(),
                });
                RequestOutcome::SlotUpdateFailed { index, message }
            }
        }
    }

    /// Pull and merge. A failed pull always yields one notice; a
    /// successful one is announced only when asked.
    async fn refresh(&self, announce: bool) -> Result<(), String> {
        match pull_status(&self.client, &self.store).await {
            Ok(()) => {
                if announce {
                    self.notify(Notice::StatusRefreshed);
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "status pull failed");
                let message = e.to_string();
                self.notify(Notice::StatusLoadFailed {
                    message: message.clone(),
                });
                Err(message)
            }
        }
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }
}

async fn recv_push(
    push: &mut Option<broadcast::Receiver<Arc<PushEvent>>>,
) -> Result<Arc<PushEvent>, RecvError> {
    match push {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn engine_against(server: &MockServer) -> (Engine, broadcast::Receiver<Notice>) {
        let config = ControllerConfig {
            url: Url::parse(&server.uri()).unwrap(),
            ..ControllerConfig::default()
        };
        let client = Arc::new(AceClient::new(config.url.clone(), &config.transport()).unwrap());
        let store = Arc::new(StatusStore::new(config.slot_count));
        let (notices, notice_rx) = broadcast::channel(16);
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        let (_request_tx, request_rx) = mpsc::channel(1);
        let engine = Engine::new(
            &config,
            client,
            store,
            notices,
            Arc::new(connection),
            request_rx,
        );
        (engine, notice_rx)
    }

    #[tokio::test]
    async fn log_lines_update_state() {
        let server = MockServer::start().await;
        let (engine, _) = engine_against(&server).await;

        engine
            .on_push(&PushEvent::LogLine("// ace_filament_pos set to toolhead".into()))
            .await;
        engine.on_push(&PushEvent::LogLine("Tool 2 load".into())).await;

        let state = engine.store.snapshot();
        assert_eq!(state.device.filament_position, "toolhead");
        assert_eq!(state.device.current_slot_index, 2);
    }

    #[tokio::test]
    async fn slot_echo_triggers_pull() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/server/ace/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {"status": "ready", "slots": [{"index": 0, "type": "ASA"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let (engine, _) = engine_against(&server).await;

        engine
            .on_push(&PushEvent::LogLine("Slot 0 set: type=ASA".into()))
            .await;

        assert_eq!(engine.store.snapshot().slots[0].material, "ASA");
    }

    #[tokio::test]
    async fn connect_event_marks_connected_and_pulls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/server/ace/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "busy"})))
            .expect(1)
            .mount(&server)
            .await;
        let (engine, mut notices) = engine_against(&server).await;

        engine.on_push(&PushEvent::Connected).await;

        assert_eq!(*engine.connection.borrow(), ConnectionState::Connected);
        assert_eq!(notices.recv().await.unwrap(), Notice::Connected);
        assert_eq!(
            engine.store.snapshot().device.status,
            crate::model::DeviceState::Busy
        );
    }

    #[tokio::test]
    async fn each_disconnect_is_announced() {
        let server = MockServer::start().await;
        let (engine, mut notices) = engine_against(&server).await;

        for _ in 0..2 {
            engine
                .on_push(&PushEvent::Disconnected {
                    reason: "connection refused".into(),
                })
                .await;
        }

        assert_eq!(*engine.connection.borrow(), ConnectionState::Reconnecting);
        for _ in 0..2 {
            assert!(matches!(
                notices.recv().await.unwrap(),
                Notice::Disconnected { .. }
            ));
        }
    }

    #[tokio::test]
    async fn non_status_pull_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/server/ace/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"klippy": "ready"}})))
            .mount(&server)
            .await;
        let (engine, _) = engine_against(&server).await;
        let before = engine.store.snapshot();

        assert!(engine.refresh(false).await.is_ok());
        assert_eq!(*engine.store.snapshot(), *before);
    }

    #[tokio::test]
    async fn failed_pull_emits_one_notice() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/server/ace/status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let (engine, mut notices) = engine_against(&server).await;

        assert!(engine.refresh(true).await.is_err());
        assert!(matches!(
            notices.recv().await.unwrap(),
            Notice::StatusLoadFailed { .. }
        ));
        assert!(notices.try_recv().is_err());
    }
}
