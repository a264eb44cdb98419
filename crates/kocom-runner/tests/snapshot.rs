//! Snapshot capture, persistence and restore.

use kocom_common::{DeviceKey, DeviceType, Value};
use kocom_gateway::{Gateway, GatewayConfig};
use kocom_packet::{Address, Packet, CMD_STATE};
use kocom_runner::Snapshot;
use kocom_transport::{MemoryBus, MemoryConnector};

async fn gateway() -> (Gateway<MemoryConnector>, MemoryBus) {
    let (connector, bus) = MemoryConnector::new();
    let gateway = Gateway::start(GatewayConfig::default(), connector).await.unwrap();
    (gateway, bus)
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_restores_devices_and_facts() {
    let (first, _bus) = gateway().await;
    let lights = Packet::build(Address::WALLPAD, Address::new(0x0E, 1), CMD_STATE, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
    let thermostat = Packet::build(
        Address::WALLPAD,
        Address::new(0x36, 2),
        CMD_STATE,
        [0x11, 0x00, 21 | 0x80, 0, 22, 0, 0, 0],
    );
    first.replay_frame(lights.as_bytes(), None).unwrap();
    first.replay_frame(thermostat.as_bytes(), None).unwrap();

    let snapshot = Snapshot::capture(&first);
    let light = DeviceKey::primary(DeviceType::Light, 1, 0);
    assert_eq!(snapshot.frames.get(&light.unique_id()), Some(&lights.to_hex()));
    assert!(!snapshot.learned.is_empty());
    first.stop().await;

    let path = std::env::temp_dir().join(format!("kocom-snapshot-{}.json", std::process::id()));
    snapshot.save(&path).unwrap();
    let loaded = Snapshot::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, snapshot);

    let (second, _bus) = gateway().await;
    assert_eq!(loaded.restore(&second), loaded.frames.len());
    assert_eq!(second.current_state(&light).map(|s| s.value), Some(Value::Bool(true)));
    assert!(second.current_state(&DeviceKey::primary(DeviceType::Light, 1, 1)).is_none());
    assert_eq!(second.learned_facts(), snapshot.learned);
    second.stop().await;
}

#[test]
fn test_missing_snapshot_is_empty() {
    let path = std::env::temp_dir().join("kocom-snapshot-does-not-exist.json");
    let snapshot = Snapshot::load(path).unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_bad_frames_are_skipped() {
    let (gateway, _bus) = gateway().await;
    let mut snapshot = Snapshot::default();
    snapshot.frames.insert("1-1_0-0".to_string(), "not hex".to_string());
    snapshot.frames.insert("1-2_0-0".to_string(), "aa55".to_string());
    assert_eq!(snapshot.restore(&gateway), 0);
    assert!(gateway.all_states().is_empty());
    gateway.stop().await;
}
