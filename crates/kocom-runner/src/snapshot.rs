//! Persisted gateway state.
//!
//! A snapshot keeps the last raw frame per registered unique id plus the
//! learned facts. Restoring replays each frame with its unique id forced to
//! register, so devices come back exactly as they were announced.

use crate::{RunnerError, RunnerResult};
use kocom_gateway::Gateway;
use kocom_protocol::LearnedFacts;
use kocom_transport::Connector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Frames and learned facts saved between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Hex-encoded raw frame per unique id.
    #[serde(default)]
    pub frames: BTreeMap<String, String>,
    #[serde(default)]
    pub learned: LearnedFacts,
}

impl Snapshot {
    /// Read a snapshot file. A missing file is an empty snapshot.
    pub fn load(path: impl AsRef<Path>) -> RunnerResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no snapshot yet");
                Ok(Snapshot::default())
            }
            Err(source) => Err(RunnerError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> RunnerResult<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| RunnerError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Capture registered devices and learned facts from a gateway.
    pub fn capture<C: Connector>(gateway: &Gateway<C>) -> Self {
        let frames = gateway
            .all_states()
            .into_iter()
            .filter_map(|state| {
                let raw = state.raw_frame?;
                Some((state.key.unique_id(), hex::encode(raw)))
            })
            .collect();
        Snapshot {
            frames,
            learned: gateway.learned_facts(),
        }
    }

    /// Reinstate learned facts, then replay every stored frame.
    ///
    /// Returns the number of frames replayed; bad frames are skipped.
    pub fn restore<C: Connector>(&self, gateway: &Gateway<C>) -> usize {
        gateway.restore_learned_facts(self.learned.clone());

        let mut replayed = 0;
        for (unique_id, frame) in &self.frames {
            let raw = match hex::decode(frame) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(unique_id = %unique_id, error = %e, "skipping undecodable frame");
                    continue;
                }
            };
            match gateway.replay_frame(&raw, Some(unique_id)) {
                Ok(_) => replayed += 1,
                Err(e) => warn!(unique_id = %unique_id, error = %e, "skipping stored frame"),
            }
        }
        info!(replayed, "snapshot restored");
        replayed
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.learned.is_empty()
    }
}
