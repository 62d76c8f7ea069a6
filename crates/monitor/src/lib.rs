pub mod integrations;
pub mod message_store;
pub mod metadata;
pub mod overview;
pub mod preview;
pub mod station;

pub use integrations::IntegrationsCache;
pub use message_store::{BrokerMessageStore, MessageStore, MessageSummary};
pub use metadata::MetadataStore;
pub use overview::{MainOverview, OverviewComposer};
pub use station::{ConsumerGroupView, DlsSummary, StationOverviewResponse};
