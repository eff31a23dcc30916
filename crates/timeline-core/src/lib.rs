//! Activity event construction and fan-out delivery for Timeline.
//!
//! When a domain entity is created, updated or destroyed, this crate turns
//! the moment into one immutable [`ActivityEvent`] and writes it to every
//! interested feed: the global log, the actor's activity and posts logs,
//! and each follower's activity log.
//!
//! ```text
//! BindingTable::fire ──> Tracker::track ──> EventBuilder::build
//!                                     └──> RecipientResolver::resolve
//!                                     └──> FanoutWriter::deliver ──> LogStore
//! ```
//!
//! # Modules
//!
//! - [`entity`] -- The [`Entity`] trait domain models implement.
//! - [`snapshot`] -- Capturing entity identity at event time.
//! - [`builder`] -- [`EventBuilder`] and extra field readers.
//! - [`resolver`] -- [`RecipientResolver`] and follower sources.
//! - [`fanout`] -- [`FanoutWriter`] and per-recipient [`DeliveryReport`]s.
//! - [`tracker`] -- The assembled [`Tracker`] pipeline.
//! - [`binding`] -- Typed lifecycle bindings ([`BindingTable`]).
//! - [`config`] -- Configuration loading from `timeline-config.yaml`.
//!
//! [`ActivityEvent`]: timeline_types::ActivityEvent

pub mod binding;
pub mod builder;
pub mod config;
pub mod entity;
pub mod fanout;
pub mod resolver;
pub mod snapshot;
pub mod tracker;

pub use binding::{Binding, BindingError, BindingTable, Lifecycle};
pub use builder::{BuildError, EventBuilder, ExtraField, Participants};
pub use config::{ConfigError, TimelineConfig};
pub use entity::{AccessError, Entity};
pub use fanout::{DeliveryError, DeliveryReport, FanoutWriter, RecipientOutcome};
pub use resolver::{FollowerSource, RecipientResolver, ResolveError};
pub use snapshot::{Role, snapshot, snapshot_of};
pub use tracker::{TrackError, TrackRequest, Tracker};
