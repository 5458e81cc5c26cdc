pub mod messages;
pub mod setting;
pub mod snapshot;
pub mod status_payload;
pub mod upstream;

pub use messages::{ClientMessage, ServerMessage};
pub use setting::{Setting, UpsertSettingRequest};
pub use snapshot::{PlayerBreakdown, SnapshotOrigin, StatusSnapshot};
pub use status_payload::{PayloadStatus, StatusPayload};
