/// Real-time room/message fan-out layer.
///
/// Architecture:
/// - Protocol: JSON event envelope decode/encode and ack replies
/// - Registry: in-memory connection and room membership bookkeeping
/// - Broadcast: fan-out seam (self / room / everyone)
/// - Events: chat event handlers over the persistence services
/// - Transport: WebSocket endpoint, identity attachment, read/write loops
pub mod broadcast;
pub mod context;
pub mod events;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use events::ChatServer;
pub use registry::RoomRegistry;
