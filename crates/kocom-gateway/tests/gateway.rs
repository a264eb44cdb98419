//! Gateway behaviour against an in-memory bus.

use kocom_common::{DeviceKey, DeviceType, Platform, Value};
use kocom_gateway::{DiscoveryConfig, Gateway, GatewayConfig, GatewayError, GatewayEvent};
use kocom_packet::{Address, Packet, CMD_QUERY, CMD_STATE, PACKET_LEN};
use kocom_protocol::ActionArgs;
use kocom_transport::{MemoryBus, MemoryConnector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout, Instant};

const LIGHT: u8 = 0x0E;
const THERMOSTAT: u8 = 0x36;

fn config() -> GatewayConfig {
    GatewayConfig::default()
        .with_idle_gap(Duration::ZERO, Duration::from_millis(50))
        .with_retries(3, Duration::from_millis(20))
        .with_confirm_timeout(Duration::from_millis(200))
        .with_backoff(Duration::from_millis(10), Duration::from_millis(100))
}

fn report(code: u8, room: u8, payload: [u8; 8]) -> Packet {
    Packet::build(Address::WALLPAD, Address::new(code, room), CMD_STATE, payload)
}

fn light_key(room: u8, index: u8) -> DeviceKey {
    DeviceKey::primary(DeviceType::Light, room, index)
}

async fn start(config: GatewayConfig) -> (Gateway<MemoryConnector>, MemoryBus, DuplexStream) {
    let (connector, mut bus) = MemoryConnector::new();
    let gateway = Gateway::start(config, connector).await.unwrap();
    let peer = bus.accept().await.unwrap();
    (gateway, bus, peer)
}

async fn read_frame(peer: &mut DuplexStream) -> Packet {
    let mut raw = [0u8; PACKET_LEN];
    peer.read_exact(&mut raw).await.unwrap();
    Packet::from_bytes_checked(&raw).unwrap()
}

async fn next_event(events: &mut broadcast::Receiver<GatewayEvent>) -> GatewayEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no event")
        .unwrap()
}

/// Answer every command frame with a state report carrying its payload.
fn spawn_echo(mut peer: DuplexStream) -> Arc<AtomicUsize> {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    tokio::spawn(async move {
        let mut raw = [0u8; PACKET_LEN];
        while peer.read_exact(&mut raw).await.is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
            let Ok(command) = Packet::from_bytes_checked(&raw) else {
                continue;
            };
            let device = command.dest();
            let payload = if command.command() == CMD_QUERY {
                [0xFF, 0, 0, 0, 0, 0, 0, 0]
            } else {
                command.payload()
            };
            let answer = Packet::build(Address::WALLPAD, device, CMD_STATE, payload);
            if peer.write_all(answer.as_bytes()).await.is_err() {
                break;
            }
        }
    });
    seen
}

/// Count command frames without answering.
fn spawn_silent(mut peer: DuplexStream) -> Arc<AtomicUsize> {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    tokio::spawn(async move {
        let mut raw = [0u8; PACKET_LEN];
        while peer.read_exact(&mut raw).await.is_ok() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    seen
}

#[tokio::test(start_paused = true)]
async fn test_light_report_registers_one_device() {
    let (gateway, _bus, mut peer) = start(config()).await;
    let mut events = gateway.subscribe();

    let frame = report(LIGHT, 1, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
    peer.write_all(frame.as_bytes()).await.unwrap();

    let event = next_event(&mut events).await;
    assert!(event.is_new());
    assert_eq!(*event.key(), light_key(1, 0));
    assert_eq!(event.state().value, Value::Bool(true));
    assert_eq!(event.state().platform, Platform::Light);
    assert_eq!(event.state().raw_frame.as_deref(), Some(&frame.as_bytes()[..]));

    let lights = gateway.all_states_for_platform(Platform::Light);
    assert_eq!(lights.len(), 1);
    assert!(gateway.current_state(&light_key(1, 1)).is_none());

    // Same report again: no event.
    peer.write_all(frame.as_bytes()).await.unwrap();
    sleep(Duration::from_millis(200)).await;
    assert!(events.try_recv().is_err());

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_report_split_across_writes() {
    let (gateway, _bus, mut peer) = start(config()).await;
    let mut events = gateway.subscribe();

    let frame = report(LIGHT, 2, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
    peer.write_all(&frame.as_bytes()[..1]).await.unwrap();
    sleep(Duration::from_millis(120)).await;
    peer.write_all(&frame.as_bytes()[1..]).await.unwrap();

    assert_eq!(*next_event(&mut events).await.key(), light_key(2, 0));
    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_command_confirmed_by_report() {
    let (gateway, _bus, peer) = start(config()).await;
    let frames = spawn_echo(peer);

    assert!(gateway.submit_action(light_key(1, 0), "turn_on", ActionArgs::new()).await);
    assert_eq!(frames.load(Ordering::SeqCst), 1);
    let state = gateway.current_state(&light_key(1, 0)).unwrap();
    assert_eq!(state.value, Value::Bool(true));

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_sibling_channels_survive_command() {
    let (gateway, _bus, mut peer) = start(config()).await;
    let mut events = gateway.subscribe();

    // Channel 5 on, 3 off: only channel 5 registers, 3 is shadowed.
    peer.write_all(report(LIGHT, 1, [0, 0, 0, 0, 0, 0xFF, 0, 0]).as_bytes())
        .await
        .unwrap();
    assert_eq!(*next_event(&mut events).await.key(), light_key(1, 5));

    let submit = {
        let gateway = &gateway;
        async move { gateway.submit_action(light_key(1, 3), "turn_on", ActionArgs::new()).await }
    };
    let bus_side = async {
        let command = read_frame(&mut peer).await;
        assert_eq!(command.payload(), [0, 0, 0, 0xFF, 0, 0xFF, 0, 0]);
        let answer = Packet::build(Address::WALLPAD, command.dest(), CMD_STATE, command.payload());
        peer.write_all(answer.as_bytes()).await.unwrap();
    };
    let (confirmed, ()) = tokio::join!(submit, bus_side);
    assert!(confirmed);

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_command_retries_then_fails() {
    let (gateway, _bus, peer) = start(config()).await;
    let frames = spawn_silent(peer);

    let started = Instant::now();
    assert!(!gateway.submit_action(light_key(1, 0), "turn_on", ActionArgs::new()).await);
    assert_eq!(frames.load(Ordering::SeqCst), 3);
    // Three confirmation windows plus two retry gaps.
    assert!(started.elapsed() >= Duration::from_millis(640));

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_encode_error_fails_without_bus_traffic() {
    let (gateway, _bus, peer) = start(config()).await;
    let frames = spawn_silent(peer);

    let mut args = ActionArgs::new();
    args.insert("target_temp".to_string(), Value::Float(22.0));
    assert!(!gateway.submit_action(light_key(1, 0), "set_temperature", args).await);
    assert!(!gateway.submit_action(light_key(1, 0), "explode", ActionArgs::new()).await);
    assert!(!gateway.submit_action(light_key(1, 9), "turn_on", ActionArgs::new()).await);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(frames.load(Ordering::SeqCst), 0);
    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_full_queue_rejects_immediately() {
    let config = config()
        .with_queue_capacity(2)
        .with_confirm_timeout(Duration::from_secs(5));
    let (gateway, _bus, peer) = start(config).await;
    let _frames = spawn_silent(peer);
    let gateway = Arc::new(gateway);

    let started = Instant::now();
    let handles: Vec<_> = (0..10u8)
        .map(|room| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                let ok = gateway
                    .submit_action(light_key(room, 0), "turn_on", ActionArgs::new())
                    .await;
                (ok, started.elapsed())
            })
        })
        .collect();

    let mut rejected = 0;
    for handle in handles {
        let (ok, elapsed) = handle.await.unwrap();
        assert!(!ok);
        if elapsed.is_zero() {
            rejected += 1;
        }
    }
    // One in flight plus a full queue at most.
    assert!(rejected >= 7, "only {rejected} rejected");

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_resolves_pending_commands() {
    let config = config().with_confirm_timeout(Duration::from_secs(10));
    let (gateway, _bus, peer) = start(config).await;
    let _frames = spawn_silent(peer);
    let gateway = Arc::new(gateway);

    let started = Instant::now();
    let handles: Vec<_> = (1..=3u8)
        .map(|room| {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway
                    .submit_action(light_key(room, 0), "turn_on", ActionArgs::new())
                    .await
            })
        })
        .collect();

    sleep(Duration::from_millis(50)).await;
    gateway.stop().await;

    for handle in handles {
        assert!(!handle.await.unwrap());
    }
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!gateway.is_connected());

    // Stopped gateways refuse new work.
    assert!(!gateway.submit_action(light_key(1, 0), "turn_on", ActionArgs::new()).await);
    let frame = report(LIGHT, 1, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
    assert!(matches!(gateway.replay_frame(frame.as_bytes(), None), Err(GatewayError::Stopped)));
    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_report_before_registration_does_not_confirm() {
    let config = config().with_retries(1, Duration::from_millis(20));
    let (gateway, _bus, mut peer) = start(config).await;
    let mut events = gateway.subscribe();

    // Light is already off before the command is submitted.
    peer.write_all(report(LIGHT, 1, [0, 0, 0, 0, 0, 0, 0, 0]).as_bytes())
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());

    let submit = gateway.submit_action(light_key(1, 0), "turn_off", ActionArgs::new());
    let bus_side = async {
        read_frame(&mut peer).await;
    };
    let (confirmed, ()) = tokio::join!(submit, bus_side);
    assert!(!confirmed);

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unsolicited_report_after_send_confirms() {
    let config = config().with_retries(1, Duration::from_millis(20));
    let (gateway, _bus, mut peer) = start(config).await;

    let submit = gateway.submit_action(light_key(1, 0), "turn_off", ActionArgs::new());
    let bus_side = async {
        read_frame(&mut peer).await;
        // A periodic report that happens to show the requested state.
        peer.write_all(report(LIGHT, 1, [0, 0xFF, 0, 0, 0, 0, 0, 0]).as_bytes())
            .await
            .unwrap();
    };
    let (confirmed, ()) = tokio::join!(submit, bus_side);
    assert!(confirmed);

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_after_peer_closes() {
    let (gateway, mut bus, peer) = start(config()).await;
    let mut events = gateway.subscribe();
    drop(peer);

    let mut peer = timeout(Duration::from_secs(5), bus.accept())
        .await
        .expect("no reconnect")
        .unwrap();

    peer.write_all(report(LIGHT, 3, [0xFF, 0, 0, 0, 0, 0, 0, 0]).as_bytes())
        .await
        .unwrap();
    assert_eq!(*next_event(&mut events).await.key(), light_key(3, 0));
    assert!(gateway.is_connected());
    assert!(gateway.reconnect_count() >= 1);

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_failures_force_reconnect() {
    let config = config()
        .with_retries(1, Duration::from_millis(20))
        .with_failure_threshold(2);
    let (gateway, mut bus, peer) = start(config).await;
    let _frames = spawn_silent(peer);

    assert!(!gateway.submit_action(light_key(1, 0), "turn_on", ActionArgs::new()).await);
    assert!(bus.try_accept().is_none());
    assert!(!gateway.submit_action(light_key(1, 0), "turn_on", ActionArgs::new()).await);

    let fresh = timeout(Duration::from_secs(5), bus.accept()).await.expect("no reconnect");
    assert!(fresh.is_some());

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_encode_errors_do_not_force_reconnect() {
    let config = config()
        .with_retries(1, Duration::from_millis(20))
        .with_failure_threshold(2);
    let (gateway, mut bus, peer) = start(config).await;
    let frames = spawn_silent(peer);

    // The valve can only be closed from the bus.
    let valve = DeviceKey::primary(DeviceType::GasValve, 0, 0);
    for _ in 0..3 {
        assert!(!gateway.submit_action(valve, "turn_on", ActionArgs::new()).await);
    }

    sleep(Duration::from_millis(500)).await;
    assert!(bus.try_accept().is_none());
    assert_eq!(gateway.reconnect_count(), 0);
    assert!(gateway.is_connected());
    assert_eq!(frames.load(Ordering::SeqCst), 0);

    // One unconfirmed command is still below the threshold.
    assert!(!gateway.submit_action(light_key(1, 0), "turn_on", ActionArgs::new()).await);
    sleep(Duration::from_millis(500)).await;
    assert!(bus.try_accept().is_none());

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_replay_forces_registration() {
    let (gateway, _bus, _peer) = start(config()).await;
    let mut events = gateway.subscribe();

    let frame = report(LIGHT, 1, [0; 8]);
    let target = light_key(1, 0);
    assert_eq!(gateway.replay_frame(frame.as_bytes(), None).unwrap(), 8);
    assert!(gateway.current_state(&target).is_none());

    gateway
        .replay_frame(frame.as_bytes(), Some(&target.unique_id()))
        .unwrap();
    let state = gateway.current_state(&target).unwrap();
    assert_eq!(state.value, Value::Bool(false));
    assert!(next_event(&mut events).await.is_new());
    assert!(gateway.current_state(&light_key(1, 1)).is_none());

    assert!(gateway.promote(&light_key(1, 2)));
    assert_eq!(*next_event(&mut events).await.key(), light_key(1, 2));
    assert!(!gateway.promote(&light_key(1, 2)));

    let mut corrupt = frame.to_vec();
    corrupt[12] ^= 0x01;
    assert!(matches!(
        gateway.replay_frame(&corrupt, None),
        Err(GatewayError::InvalidFrame(_))
    ));

    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_learned_facts_survive_restart() {
    let (gateway, _bus, _peer) = start(config()).await;
    let frame = report(THERMOSTAT, 2, [0x11, 0x00, 21 | 0x80, 0, 22, 0, 0, 0]);
    gateway.replay_frame(frame.as_bytes(), None).unwrap();

    let key = DeviceKey::primary(DeviceType::Thermostat, 2, 0);
    let facts = gateway.learned_facts();
    assert_eq!(facts.thermostat(&key.unique_id()).map(|f| f.temp_step()), Some(0.5));
    gateway.stop().await;

    let (restarted, _bus, _peer) = start(config()).await;
    restarted.restore_learned_facts(facts.clone());
    assert_eq!(restarted.learned_facts(), facts);

    // A whole-degree report keeps the learned half-degree step.
    let whole = report(THERMOSTAT, 2, [0x11, 0x00, 22, 0, 22, 0, 0, 0]);
    restarted.replay_frame(whole.as_bytes(), None).unwrap();
    let climate = restarted.current_state(&key).unwrap();
    assert_eq!(climate.attribute("temp_step"), Some(&Value::Float(0.5)));
    restarted.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_discovery_sweep_on_start() {
    let discovery = DiscoveryConfig {
        enabled: true,
        light: vec![1, 2],
        outlet: vec![],
        thermostat: vec![],
        airconditioner: vec![],
        ventilation: vec![],
        gasvalve: vec![],
        elevator: vec![],
    };
    let (connector, mut bus) = MemoryConnector::new();
    let gateway = Gateway::start(config().with_discovery(discovery), connector)
        .await
        .unwrap();
    let mut events = gateway.subscribe();
    let frames = spawn_echo(bus.accept().await.unwrap());

    let mut found = vec![*next_event(&mut events).await.key(), *next_event(&mut events).await.key()];
    found.sort();
    assert_eq!(found, vec![light_key(1, 0), light_key(2, 0)]);

    assert_eq!(gateway.sweep().await, 2);
    assert_eq!(frames.load(Ordering::SeqCst), 4);
    gateway.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_discovery_timeouts_do_not_force_reconnect() {
    let discovery = DiscoveryConfig {
        enabled: false,
        light: (0..=9).collect(),
        outlet: vec![],
        thermostat: vec![],
        airconditioner: vec![],
        ventilation: vec![],
        gasvalve: vec![],
        elevator: vec![],
    };
    let config = config().with_discovery(discovery).with_failure_threshold(2);
    let (gateway, mut bus, peer) = start(config).await;
    let frames = spawn_silent(peer);

    assert_eq!(gateway.sweep().await, 0);
    // One attempt per target.
    assert_eq!(frames.load(Ordering::SeqCst), 10);
    assert!(bus.try_accept().is_none());
    assert_eq!(gateway.reconnect_count(), 0);

    gateway.stop().await;
}
