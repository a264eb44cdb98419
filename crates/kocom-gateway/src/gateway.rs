//! Bus reader, command sender and the public gateway handle.

use crate::config::GatewayConfig;
use crate::events::GatewayEvent;
use crate::pending::Waiters;
use crate::registry::{Registry, Upsert};
use crate::{GatewayError, GatewayResult};
use kocom_common::{DeviceKey, DeviceState, Platform};
use kocom_metrics::{metric_defs, CommandLabels};
use kocom_packet::{FrameBuffer, FrameStats, Packet};
use kocom_protocol::{Action, ActionArgs, Command, LearnedFacts, ProtocolResult, Translator};
use kocom_transport::{Connector, EndpointConnector, Transport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

/// Poll period while waiting for the line to go quiet.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Who asked for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A caller of [`Gateway::submit_action`]; retried and counted.
    User,
    /// The query sweep; one attempt, never counted as a failure.
    Discovery,
}

/// How one queued command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// A state report matched the expectation.
    Confirmed,
    /// Sent (or attempted) without a matching report.
    Unconfirmed,
    /// Could not be encoded; nothing reached the bus.
    Rejected,
}

struct QueuedCommand {
    key: DeviceKey,
    action: String,
    args: ActionArgs,
    origin: Origin,
    reply: oneshot::Sender<bool>,
}

/// State shared by the gateway handle and its tasks.
struct Shared<C: Connector> {
    config: GatewayConfig,
    transport: Transport<C>,
    translator: Mutex<Translator>,
    registry: Mutex<Registry>,
    waiters: Mutex<Waiters>,
    events: broadcast::Sender<GatewayEvent>,
    queue: mpsc::Sender<QueuedCommand>,
    stopped: AtomicBool,
}

/// Handle to a running gateway.
///
/// Owns a reader task that turns bus traffic into registry updates, and a
/// sender task that drains a bounded command queue: each command waits for
/// a quiet line, is written, and is retried until a state report confirms
/// it or attempts run out.
pub struct Gateway<C: Connector = EndpointConnector> {
    shared: Arc<Shared<C>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Gateway<EndpointConnector> {
    /// Start a gateway on the configured endpoint.
    pub async fn from_config(config: GatewayConfig) -> GatewayResult<Self> {
        let connector = config.connector();
        Self::start(config, connector).await
    }
}

impl<C: Connector> Gateway<C> {
    /// Connect and spawn the reader and sender tasks.
    ///
    /// A failed first connect is not an error: the reader keeps retrying
    /// with backoff.
    pub async fn start(config: GatewayConfig, connector: C) -> GatewayResult<Self> {
        config.validate()?;

        let transport =
            Transport::new(connector, config.backoff()).with_write_timeout(config.write_timeout());
        if let Err(e) = transport.open().await {
            warn!(
                endpoint = %transport.connector().describe(),
                error = %e,
                "initial connect failed, retrying in background"
            );
        }

        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let (events, _) = broadcast::channel(config.event_capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let translator = Translator::new().with_confirm_timeout(config.confirm_timeout());

        let shared = Arc::new(Shared {
            config,
            transport,
            translator: Mutex::new(translator),
            registry: Mutex::new(Registry::new()),
            waiters: Mutex::new(Waiters::new()),
            events,
            queue: queue_tx,
            stopped: AtomicBool::new(false),
        });

        let mut tasks = vec![
            tokio::spawn(reader_loop(shared.clone(), shutdown_rx.clone())),
            tokio::spawn(sender_loop(shared.clone(), queue_rx, shutdown_rx.clone())),
        ];
        if shared.config.discovery.enabled {
            tasks.push(tokio::spawn(discovery_task(shared.clone(), shutdown_rx)));
        }

        info!(
            endpoint = %shared.transport.connector().describe(),
            connected = shared.transport.is_connected(),
            "gateway started"
        );

        Ok(Gateway {
            shared,
            shutdown,
            tasks: Mutex::new(tasks),
        })
    }

    /// Queue an action and wait for its outcome.
    ///
    /// Returns `true` only when a state report confirmed the effect. A full
    /// queue, an encode error, exhausted retries and shutdown all yield
    /// `false`.
    pub async fn submit_action(&self, key: DeviceKey, action: &str, args: ActionArgs) -> bool {
        let labels = CommandLabels::new(key.device_type.as_str(), action).to_labels();
        if self.shared.stopped.load(Ordering::SeqCst) {
            metrics::counter!(metric_defs::COMMANDS_REJECTED.name, &labels).increment(1);
            return false;
        }

        let (reply, outcome) = oneshot::channel();
        let item = QueuedCommand {
            key,
            action: action.to_string(),
            args,
            origin: Origin::User,
            reply,
        };
        if let Err(e) = self.shared.queue.try_send(item) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(%key, action, "send queue full, command rejected");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    debug!(%key, action, "send queue closed, command rejected");
                }
            }
            metrics::counter!(metric_defs::COMMANDS_REJECTED.name, &labels).increment(1);
            return false;
        }
        metrics::counter!(metric_defs::COMMANDS_SUBMITTED.name, &labels).increment(1);

        outcome.await.unwrap_or(false)
    }

    /// Query every configured discovery target once.
    ///
    /// Returns how many answered.
    pub async fn sweep(&self) -> usize {
        self.shared.sweep().await
    }

    /// Registered state for an identity.
    pub fn current_state(&self, key: &DeviceKey) -> Option<DeviceState> {
        self.shared.registry.lock().get(key, false).cloned()
    }

    /// Registered states exposed as `platform`.
    pub fn all_states_for_platform(&self, platform: Platform) -> Vec<DeviceState> {
        self.shared.registry.lock().all_by_platform(platform)
    }

    /// Every registered state, ordered by identity.
    pub fn all_states(&self) -> Vec<DeviceState> {
        let mut states: Vec<_> = self.shared.registry.lock().states().cloned().collect();
        states.sort_by_key(|s| s.key);
        states
    }

    /// Receive [`GatewayEvent`]s from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.shared.events.subscribe()
    }

    /// Feed a stored frame through the live decode path.
    ///
    /// States whose unique id equals `force_unique_id` are registered even
    /// when they would normally stay in the shadow table. Returns the number
    /// of decoded states.
    pub fn replay_frame(&self, raw: &[u8], force_unique_id: Option<&str>) -> GatewayResult<usize> {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return Err(GatewayError::Stopped);
        }
        let packet = Packet::from_bytes_checked(raw)?;
        debug!(frame = %packet, force = ?force_unique_id, "replaying frame");
        Ok(self.shared.dispatch(&packet, force_unique_id))
    }

    /// Register a state that was only seen in the shadow table.
    pub fn promote(&self, key: &DeviceKey) -> bool {
        let promoted = self.shared.registry.lock().promote(key).cloned();
        match promoted {
            Some(state) => {
                info!(key = %state.key, "shadow device promoted");
                self.shared.publish(GatewayEvent::NewDevice(state));
                true
            }
            None => false,
        }
    }

    /// Copy of everything learned from traffic so far.
    pub fn learned_facts(&self) -> LearnedFacts {
        self.shared.translator.lock().snapshot()
    }

    /// Merge persisted facts into the translator.
    pub fn restore_learned_facts(&self, facts: LearnedFacts) {
        self.shared.translator.lock().restore(facts);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.transport.is_connected()
    }

    /// Successful reconnects since start.
    pub fn reconnect_count(&self) -> u64 {
        self.shared.transport.reconnect_count()
    }

    /// The configuration the gateway runs with.
    pub fn config(&self) -> &GatewayConfig {
        &self.shared.config
    }

    /// Stop both tasks and close the transport.
    ///
    /// Queued and in-flight commands resolve `false`. Calling it again is a
    /// no-op.
    pub async fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("stopping gateway");
        let _ = self.shutdown.send(true);

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "gateway task failed");
            }
        }

        self.shared.waiters.lock().clear();
        self.shared.transport.close().await;
        info!("gateway stopped");
    }
}

impl<C: Connector> Shared<C> {
    /// Decode a frame and apply every resulting state.
    fn dispatch(&self, packet: &Packet, force_unique_id: Option<&str>) -> usize {
        let updates = self.translator.lock().decode(packet);
        let count = updates.len();
        for update in updates {
            let forced = force_unique_id.is_some_and(|uid| uid == update.state.key.unique_id());
            self.apply(update.state, update.allow_insert || forced);
        }
        count
    }

    fn apply(&self, state: DeviceState, allow_insert: bool) {
        let (outcome, devices) = {
            let mut registry = self.registry.lock();
            let outcome = registry.upsert(state.clone(), allow_insert);
            (outcome, registry.len())
        };

        match outcome {
            Upsert::Inserted => {
                info!(key = %state.key, platform = %state.platform, value = %state.value, "new device");
                metrics::gauge!(metric_defs::REGISTRY_DEVICES.name).set(devices as f64);
                self.publish(GatewayEvent::NewDevice(state.clone()));
            }
            Upsert::Changed => {
                debug!(key = %state.key, value = %state.value, "device updated");
                self.publish(GatewayEvent::DeviceUpdated(state.clone()));
            }
            Upsert::Unchanged | Upsert::Shadowed => {}
        }

        // Unregistered and unchanged reports still confirm commands.
        self.waiters.lock().notify(&state);
    }

    fn publish(&self, event: GatewayEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// One reader step: reconnect, or take one chunk off the bus.
    async fn read_once(&self, buffer: &mut FrameBuffer) {
        if !self.transport.is_connected() {
            match self.transport.reconnect().await {
                Ok(()) => {
                    buffer.clear();
                    metrics::counter!(metric_defs::TRANSPORT_RECONNECTS.name)
                        .absolute(self.transport.reconnect_count());
                }
                Err(e) => debug!(error = %e, "reconnect attempt failed"),
            }
            return;
        }

        let chunk = match self
            .transport
            .receive(self.config.read_budget, self.config.poll_interval())
            .await
        {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "bus read failed, reconnecting");
                return;
            }
        };
        if chunk.is_empty() {
            return;
        }

        buffer.push(&chunk);
        while let Some(packet) = buffer.next_frame() {
            self.dispatch(&packet, None);
        }
        record_frame_stats(buffer.stats());
    }

    fn encode(&self, item: &QueuedCommand) -> ProtocolResult<Command> {
        let action = Action::parse(&item.action, &item.args)?;
        let translator = self.translator.lock();
        let registry = self.registry.lock();
        translator.encode(item.key, &action, &*registry)
    }

    /// Send one queued command and wait for its confirmation.
    async fn execute(&self, item: &QueuedCommand) -> Outcome {
        let labels = CommandLabels::new(item.key.device_type.as_str(), item.action.as_str()).to_labels();
        let key = item.key;
        let action = item.action.as_str();

        let command = match self.encode(item) {
            Ok(command) => command,
            Err(e) => {
                warn!(%key, action, error = %e, "command could not be encoded");
                metrics::counter!(metric_defs::COMMANDS_FAILED.name, &labels).increment(1);
                return Outcome::Rejected;
            }
        };

        let attempts = match item.origin {
            Origin::User => self.config.retry_max,
            Origin::Discovery => 1,
        };
        let started = Instant::now();

        for attempt in 1..=attempts {
            if attempt > 1 {
                sleep(self.config.retry_gap()).await;
            }
            self.wait_for_idle().await;

            if !self.transport.is_connected() {
                debug!(%key, action, attempt, "not connected, attempt skipped");
                continue;
            }

            // Registered before the write so a fast reply is not missed.
            let (id, confirmed) = self.waiters.lock().register(command.expectation.clone());
            if let Err(e) = self.transport.send(command.packet.as_bytes()).await {
                self.waiters.lock().remove(id);
                warn!(%key, action, attempt, error = %e, "send failed");
                continue;
            }
            metrics::counter!(metric_defs::COMMAND_ATTEMPTS.name, &labels).increment(1);
            debug!(%key, action, attempt, frame = %command.packet, "command sent");

            match timeout(command.expectation.timeout, confirmed).await {
                Ok(Ok(state)) => {
                    let latency = started.elapsed();
                    debug!(%key, action, attempt, value = %state.value, "command confirmed");
                    metrics::counter!(metric_defs::COMMANDS_SUCCEEDED.name, &labels).increment(1);
                    metrics::histogram!(metric_defs::CONFIRM_LATENCY.name, &labels)
                        .record(latency.as_secs_f64() * 1000.0);
                    return Outcome::Confirmed;
                }
                Ok(Err(_)) => {
                    debug!(%key, action, "confirmation wait cancelled");
                    break;
                }
                Err(_) => {
                    self.waiters.lock().remove(id);
                    if attempt < attempts {
                        warn!(%key, action, attempt, attempts, "no confirmation, retrying");
                    }
                }
            }
        }

        match item.origin {
            Origin::User => error!(%key, action, attempts, "command failed"),
            Origin::Discovery => debug!(%key, "no answer to discovery query"),
        }
        metrics::counter!(metric_defs::COMMANDS_FAILED.name, &labels).increment(1);
        Outcome::Unconfirmed
    }

    /// Wait until the line has been quiet for the idle gap, or give up.
    async fn wait_for_idle(&self) {
        let gap = self.config.idle_gap();
        let limit = self.config.idle_wait_max();
        let started = Instant::now();
        while self.transport.idle_since() < gap {
            if started.elapsed() >= limit {
                debug!(waited_ms = started.elapsed().as_millis() as u64, "line still busy, sending anyway");
                return;
            }
            sleep(IDLE_POLL).await;
        }
    }

    async fn sweep(&self) -> usize {
        let targets = self.config.discovery.targets();
        info!(targets = targets.len(), "discovery sweep");

        let mut outcomes = Vec::with_capacity(targets.len());
        for key in targets {
            let (reply, outcome) = oneshot::channel();
            let item = QueuedCommand {
                key,
                action: "query".to_string(),
                args: ActionArgs::new(),
                origin: Origin::Discovery,
                reply,
            };
            if self.queue.send(item).await.is_err() {
                break;
            }
            outcomes.push(outcome);
        }

        let mut answered = 0;
        for outcome in outcomes {
            if outcome.await.unwrap_or(false) {
                answered += 1;
            }
        }
        answered
    }
}

fn record_frame_stats(stats: FrameStats) {
    metrics::counter!(metric_defs::FRAMES_DECODED.name).absolute(stats.frames_decoded);
    metrics::counter!(metric_defs::FRAMING_ERRORS.name).absolute(stats.framing_errors);
    metrics::counter!(metric_defs::CHECKSUM_ERRORS.name).absolute(stats.checksum_errors);
}

async fn reader_loop<C: Connector>(shared: Arc<Shared<C>>, mut shutdown: watch::Receiver<bool>) {
    let mut buffer = FrameBuffer::new();
    debug!("reader loop started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = shared.read_once(&mut buffer) => {}
        }
    }
    debug!("reader loop stopped");
}

async fn sender_loop<C: Connector>(
    shared: Arc<Shared<C>>,
    mut queue: mpsc::Receiver<QueuedCommand>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut failures = 0u32;
    debug!("sender loop started");
    loop {
        let item = tokio::select! {
            _ = shutdown.changed() => break,
            item = queue.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        // Dropping the item on shutdown resolves its caller with `false`.
        let outcome = tokio::select! {
            _ = shutdown.changed() => break,
            outcome = shared.execute(&item) => outcome,
        };
        let origin = item.origin;
        let _ = item.reply.send(outcome == Outcome::Confirmed);

        // Discovery misses and unencodable commands say nothing about the link.
        if origin == Origin::Discovery {
            continue;
        }
        match outcome {
            Outcome::Confirmed => {
                failures = 0;
                continue;
            }
            Outcome::Rejected => continue,
            Outcome::Unconfirmed => failures += 1,
        }
        if failures >= shared.config.failure_threshold {
            warn!(failures, "consecutive command failures, forcing reconnect");
            failures = 0;
            tokio::select! {
                _ = shutdown.changed() => break,
                result = shared.transport.reconnect() => {
                    if let Err(e) = result {
                        warn!(error = %e, "forced reconnect failed");
                    }
                }
            }
        }
    }
    // Queued commands are dropped with the receiver and resolve `false`.
    queue.close();
    debug!("sender loop stopped");
}

async fn discovery_task<C: Connector>(shared: Arc<Shared<C>>, mut shutdown: watch::Receiver<bool>) {
    tokio::select! {
        _ = shutdown.changed() => {}
        answered = shared.sweep() => info!(answered, "discovery sweep finished"),
    }
}
