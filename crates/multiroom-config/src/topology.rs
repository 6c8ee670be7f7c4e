//! Topology file format.
//!
//! A topology describes the physical wiring (which device feeds which, on
//! which input) and the rooms exposed as virtual sinks. It is read once at
//! startup and turned into a [`RoutingGraph`] plus a list of
//! [`VirtualSink`]s; nothing in it is written back at runtime.

use std::collections::BTreeMap;
use std::path::Path;

use multiroom_core::{RoutingGraph, VirtualSink};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One explicit wiring triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EdgeConfig {
    /// Device that receives the signal.
    pub sink: String,
    /// Input value `sink` must select.
    pub selector: String,
    /// Device that produces the signal.
    pub source: String,
}

impl EdgeConfig {
    /// Creates an edge triple.
    pub fn new(
        sink: impl Into<String>,
        selector: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            sink: sink.into(),
            selector: selector.into(),
            source: source.into(),
        }
    }
}

/// A group of players sharing one input map.
///
/// Every player gets an edge from every source, on the source's selector.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwitchConfig {
    /// Players that share the input map.
    pub players: Vec<String>,
    /// Selector → source device.
    #[serde(default)]
    pub sources: BTreeMap<String, String>,
}

/// A room exposed as a virtual sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomConfig {
    /// Area name, e.g. `Living Room`.
    pub area: String,
    /// Players that render audio.
    #[serde(default)]
    pub audio: Vec<String>,
    /// Players that render video.
    #[serde(default)]
    pub video: Vec<String>,
    /// Also expose an audio-only virtual sink.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub audio_only: bool,
}

impl RoomConfig {
    /// Creates a room with no players.
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            area: area.into(),
            audio: Vec::new(),
            video: Vec::new(),
            audio_only: false,
        }
    }

    /// Adds an audio player.
    pub fn with_audio(mut self, player: impl Into<String>) -> Self {
        self.audio.push(player.into());
        self
    }

    /// Adds a video player.
    pub fn with_video(mut self, player: impl Into<String>) -> Self {
        self.video.push(player.into());
        self
    }

    /// Also expose an audio-only sink.
    pub fn with_audio_only(mut self) -> Self {
        self.audio_only = true;
        self
    }

    /// Id of the room's virtual sink: `virtual_<slug>`.
    pub fn sink_id(&self) -> String {
        format!("virtual_{}", slugify(&self.area))
    }

    /// Id of the audio-only sink: `virtual_audio_<slug>`.
    pub fn audio_sink_id(&self) -> String {
        format!("virtual_audio_{}", slugify(&self.area))
    }

    /// The virtual sinks this room expands to.
    pub fn sinks(&self) -> Vec<VirtualSink> {
        let mut sinks = vec![
            VirtualSink::new(self.sink_id(), self.area.clone())
                .with_audio(self.audio.iter().map(String::as_str))
                .with_video(self.video.iter().map(String::as_str)),
        ];
        if self.audio_only {
            sinks.push(
                VirtualSink::new(self.audio_sink_id(), format!("{} Audio", self.area))
                    .with_audio(self.audio.iter().map(String::as_str)),
            );
        }
        sinks
    }
}

/// Topology file.
///
/// # TOML Format
///
/// ```toml
/// name = "House"
///
/// [[edges]]
/// sink = "media_player.receiver"
/// selector = "HDMI1"
/// source = "media_player.apple_tv"
///
/// [[switches]]
/// players = ["media_player.tv"]
/// [switches.sources]
/// HDMI1 = "media_player.receiver"
///
/// [[rooms]]
/// area = "Living Room"
/// audio = ["media_player.receiver"]
/// video = ["media_player.tv"]
/// audio_only = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topology {
    /// Name of the topology.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Explicit wiring triples, in order.
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,

    /// Shared input maps.
    #[serde(default)]
    pub switches: Vec<SwitchConfig>,

    /// Rooms exposed as virtual sinks.
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
}

impl Topology {
    /// Creates an empty topology.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            edges: Vec::new(),
            switches: Vec::new(),
            rooms: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an explicit edge.
    pub fn with_edge(
        mut self,
        sink: impl Into<String>,
        selector: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        self.edges.push(EdgeConfig::new(sink, selector, source));
        self
    }

    /// Adds a switch group.
    pub fn with_switch(mut self, switch: SwitchConfig) -> Self {
        self.switches.push(switch);
        self
    }

    /// Adds a room.
    pub fn with_room(mut self, room: RoomConfig) -> Self {
        self.rooms.push(room);
        self
    }

    /// Load a topology from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let topology: Topology = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), name = %topology.name, "topology_loaded");
        Ok(topology)
    }

    /// Load a topology from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the topology to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the topology to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// All wiring triples in build order: explicit edges, then each switch's
    /// players crossed with its sources in selector order.
    pub fn links(&self) -> Vec<EdgeConfig> {
        let mut links = self.edges.clone();
        for switch in &self.switches {
            for player in &switch.players {
                for (selector, source) in &switch.sources {
                    links.push(EdgeConfig::new(player, selector, source));
                }
            }
        }
        links
    }

    /// Builds the routing graph.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Graph`] for the first link the graph rejects.
    pub fn build_graph(&self) -> Result<RoutingGraph, ConfigError> {
        let mut graph = RoutingGraph::new();
        for link in self.links() {
            graph.add_edge(link.source, link.sink, link.selector)?;
        }
        tracing::debug!(
            topology = %self.name,
            devices = graph.node_count(),
            edges = graph.edge_count(),
            "graph_built"
        );
        Ok(graph)
    }

    /// Virtual sinks for every room, in file order.
    pub fn virtual_sinks(&self) -> Vec<VirtualSink> {
        self.rooms.iter().flat_map(RoomConfig::sinks).collect()
    }

    /// Looks up a room by area name or sink id.
    pub fn room(&self, key: &str) -> Option<&RoomConfig> {
        self.rooms
            .iter()
            .find(|r| r.area == key || r.sink_id() == key || slugify(&r.area) == key)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Lowercases `name` and joins its alphanumeric runs with `_`.
///
/// ```rust
/// use multiroom_config::slugify;
///
/// assert_eq!(slugify("Living Room"), "living_room");
/// assert_eq!(slugify("  Kid's Bedroom #2 "), "kid_s_bedroom_2");
/// ```
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
