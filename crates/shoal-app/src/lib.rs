//! Application plumbing for the shoal canvas: the simulation worker, its
//! message bus, the record feed, and the per-frame orchestrator.

pub mod bus;
pub mod feed;
pub mod frame;
pub mod worker;

pub use bus::{SimRequest, SlotReader, SlotWriter, create_sim_bus, reply_slot};
pub use feed::{InMemoryFeed, TroutFeed, TroutPage, load_all};
pub use frame::{FOLLOW_ZOOM, FrameOrchestrator, FrameReport};
pub use worker::{SimHandle, SimWorker, WorkerError};
