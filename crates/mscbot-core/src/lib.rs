//! mscbot-core: proposal state-aggregation and room-scheduling engine.
//!
//! The engine consumes an already-materialized [`proposal::Snapshot`] of
//! tracked proposals (it never fetches over the network itself) and
//! exposes three entry points to the surrounding process
//! ([`engine::Engine::on_message`], [`engine::Engine::on_tick`],
//! [`engine::Engine::on_reconfigure_room`]). Rendering chat markup and
//! speaking the tracker's or chat protocol's wire format are the
//! collaborators' jobs.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod proposal;
pub mod schedule;
pub mod store;
pub mod taxonomy;

pub use aggregate::{Aggregator, ResultSet, View};
pub use config::{BotConfig, load_config};
pub use engine::{ChatSink, Engine, Reply, SendOutcome, TickReport};
pub use error::{ErrorCode, StoreError};
pub use proposal::{FcpInfo, Proposal, Snapshot, Stage};
pub use store::{RoomConfig, RoomStore};
