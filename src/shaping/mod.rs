//! Per-agent reward shaping and observation augmentation.
//!
//! A [`Postprocessor`] sits between one agent and the simulation. It
//! augments each observation with derived spatial and skill features,
//! records outgoing actions, and adds weighted bonus terms to the base
//! reward on every live tick.

pub mod action;
pub mod config;
pub mod episode;
pub mod error;
pub mod events;
pub mod maps;
pub mod observation;
pub mod postprocessor;
pub mod query;
pub mod reward;
pub mod types;

pub use action::ActionVector;
pub use config::ShapingConfig;
pub use episode::{shannon_entropy, EpisodeState, MoveHistory};
pub use error::ShapingError;
pub use events::{unique_event_count, EventCode, EventRecord, TickEvents};
pub use maps::{DistanceMap, ThreatMap};
pub use observation::{
    ActionTargets, EntityLayout, Observation, ObservationShape, TileLayout, TILE_EXTRA_COLUMNS,
};
pub use postprocessor::{Postprocessor, PostprocessorFactory, ShapedStep};
pub use query::{AgentSnapshot, AgentView, RealmView};
pub use reward::{EpisodeTotals, RewardBreakdown, RewardShaper};
pub use types::{CombatSkill, EntityId, ItemType, Material, Position};
