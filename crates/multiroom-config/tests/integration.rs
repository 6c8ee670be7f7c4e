//! Integration tests for multiroom-config.
//!
//! These tests verify end-to-end functionality across modules: files on
//! disk through to a wired-up orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use multiroom_config::{
    ConfigError, RoomConfig, StateFile, Topology, topology_issues, validate_topology,
};
use multiroom_core::{
    DeviceId, DeviceSnapshot, LoopbackBus, PowerState, RoutingOrchestrator, SourceResolver,
};
use tempfile::TempDir;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("topologies")
        .join(name)
}

/// The bundled example topology loads, validates, and builds.
#[test]
fn test_bundled_topology_is_valid() {
    let topology = Topology::load(bundled("house.toml")).expect("house.toml should load");
    assert_eq!(topology.name, "House");
    assert!(
        topology_issues(&topology).is_empty(),
        "{:?}",
        topology_issues(&topology)
    );

    let graph = topology.build_graph().unwrap();
    assert_eq!(graph.edge_count(), 6);
    let sinks = topology.virtual_sinks();
    let ids: Vec<_> = sinks.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(
        ids,
        ["virtual_living_room", "virtual_audio_living_room", "virtual_den"]
    );
}

/// Recorded states resolve through the bundled topology.
#[test]
fn test_bundled_states_resolve() {
    let topology = Topology::load(bundled("house.toml")).unwrap();
    let states = StateFile::load(bundled("house_states.toml")).unwrap();
    let graph = topology.build_graph().unwrap();
    let store = states.to_store();

    let resolver = SourceResolver::new(&graph);
    assert_eq!(
        resolver.resolve_source(&DeviceId::new("media_player.living_room_tv"), &store),
        Some(DeviceId::new("media_player.apple_tv"))
    );
    // The den TV is off, so it resolves to nothing.
    assert_eq!(
        resolver.resolve_source(&DeviceId::new("media_player.den_tv"), &store),
        None
    );
}

/// Save and reload a topology through a temp directory.
#[test]
fn test_topology_save_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("den.toml");

    let topology = Topology::new("Den")
        .with_edge("tv", "HDMI1", "console")
        .with_room(RoomConfig::new("Den").with_video("tv"));
    topology.save(&path).unwrap();

    let loaded = Topology::load(&path).unwrap();
    assert_eq!(loaded, topology);
    assert_eq!(validate_topology(&loaded), Ok(()));
}

/// Missing and malformed files produce the matching error variants.
#[test]
fn test_load_errors() {
    let temp_dir = TempDir::new().unwrap();

    let missing = Topology::load(temp_dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));

    let bad = temp_dir.path().join("bad.toml");
    std::fs::write(&bad, "[[edges]]\nsink = 1\n").unwrap();
    assert!(matches!(
        Topology::load(&bad),
        Err(ConfigError::TomlParse(_))
    ));
}

/// A topology, a state file, and the loopback bus drive a full selection.
#[test]
fn test_topology_drives_orchestrator() {
    let topology = Topology::load(bundled("house.toml")).unwrap();
    let graph = Arc::new(topology.build_graph().unwrap());
    let store = Arc::new(StateFile::load(bundled("house_states.toml")).unwrap().to_store());
    let bus = Arc::new(LoopbackBus::new(Arc::clone(&store)));

    let orchestrator = RoutingOrchestrator::new(graph, Arc::clone(&store), Arc::clone(&bus));
    for sink in topology.virtual_sinks() {
        orchestrator.register(sink).unwrap();
    }

    let den = DeviceId::new("virtual_den");
    orchestrator.select_source_by_name(&den, "Blu-ray").unwrap();
    assert_eq!(
        bus.accepted(),
        [
            "turn_on(media_player.bluray)",
            "turn_on(media_player.den_tv)",
            "select_source(media_player.den_tv, HDMI3)",
        ]
    );

    let tv = store.get(&DeviceId::new("media_player.den_tv")).unwrap();
    assert_eq!(tv.power, PowerState::On);
    assert_eq!(tv.current_input(), Some("HDMI3"));
}

/// Capturing a store writes a file that loads back identically.
#[test]
fn test_state_file_save_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("states.toml");

    let file = StateFile::new()
        .with_device(
            "media_player.tv",
            DeviceSnapshot::new(PowerState::On)
                .with_input("HDMI1")
                .with_name("TV"),
        )
        .with_device("media_player.avr", DeviceSnapshot::new(PowerState::Off).unavailable());
    file.save(&path).unwrap();

    let loaded = StateFile::load(&path).unwrap();
    assert_eq!(loaded, file);
    assert_eq!(StateFile::from_store(&loaded.to_store()), file);
}
