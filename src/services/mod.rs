//! Status synchronization services
//!
//! Leaves first: the upstream client fetches, the cache remembers, the
//! aggregator picks the best answer, the hub fans it out and the scheduler
//! drives the whole thing on a fixed interval.

pub mod broadcast_hub;
pub mod poll_scheduler;
pub mod snapshot_aggregator;
pub mod status_cache;
pub mod upstream_client;

pub use broadcast_hub::{
    BroadcastHub, DeliveryFailure, HeartbeatReport, OutboundMessage, PublishReport,
    SubscriberConnection, SubscriberHandle,
};
pub use poll_scheduler::{PollScheduler, SchedulerState};
pub use snapshot_aggregator::{SnapshotAggregator, UpstreamTarget};
pub use status_cache::StatusCache;
pub use upstream_client::{FiveMStatusClient, PlayerClassifier, StatusSource};
