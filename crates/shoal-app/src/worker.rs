//! The simulation worker thread: exclusive owner of the [`TroutWorld`],
//! driven entirely by messages from the orchestrator.

use std::thread::JoinHandle;

use crossfire::TrySendError;
use thiserror::Error;
use tracing::{debug, warn};

use shoal_core::{SimConfig, SimStats, TroutWorld, VisibleSnapshot, WorldError};

use crate::bus::{
    RequestReceiver, RequestSender, SimRequest, SlotReader, SlotWriter, create_sim_bus, reply_slot,
};

/// Capacity of the request queue; bursts beyond it are dropped with a warning
/// rather than blocking the frame loop.
const REQUEST_QUEUE_CAPACITY: usize = 256;

/// Errors raised when launching the simulation worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Factory for the background simulation thread.
pub struct SimWorker;

impl SimWorker {
    /// Spawn the worker with its own world and return the handle used to
    /// talk to it.
    pub fn spawn(config: SimConfig) -> Result<SimHandle, WorkerError> {
        let world = TroutWorld::new(config)?;
        let (requests, receiver) = create_sim_bus(REQUEST_QUEUE_CAPACITY);
        let (visible_writer, visible_reader) = reply_slot();
        let (stats_writer, stats_reader) = reply_slot();

        let thread = std::thread::Builder::new()
            .name("shoal-sim".to_owned())
            .spawn(move || run_worker(world, receiver, visible_writer, stats_writer))?;

        Ok(SimHandle {
            requests: Some(requests),
            visible: visible_reader,
            stats: stats_reader,
            thread: Some(thread),
        })
    }
}

/// Handle to the running simulation worker. Requests are fire-and-forget;
/// replies are read from latest-wins mailboxes, so a reply may correspond to
/// an earlier request than the most recently sent one.
pub struct SimHandle {
    requests: Option<RequestSender>,
    visible: SlotReader<VisibleSnapshot>,
    stats: SlotReader<SimStats>,
    thread: Option<JoinHandle<()>>,
}

impl SimHandle {
    /// Enqueue a request. Returns false (dropping the message) when the
    /// queue is full or the worker is gone.
    pub fn send(&self, request: SimRequest) -> bool {
        let Some(requests) = self.requests.as_ref() else {
            return false;
        };
        match requests.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                warn!(?request, "simulation queue full; dropping message");
                false
            }
            Err(TrySendError::Disconnected(request)) => {
                warn!(?request, "simulation worker gone; dropping message");
                false
            }
        }
    }

    /// Latest visibility snapshot, if a new one arrived since the last take.
    #[must_use]
    pub fn latest_visible(&self) -> Option<VisibleSnapshot> {
        self.visible.take()
    }

    /// Latest population counters, if new ones arrived since the last take.
    #[must_use]
    pub fn latest_stats(&self) -> Option<SimStats> {
        self.stats.take()
    }

    /// Stop the worker and wait for it to exit. Closing the request channel
    /// ends the worker loop; any in-flight messages are discarded.
    pub fn shutdown(&mut self) {
        self.requests = None;
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    mut world: TroutWorld,
    requests: RequestReceiver,
    visible: SlotWriter<VisibleSnapshot>,
    stats: SlotWriter<SimStats>,
) {
    let mut last_visible = 0_usize;
    while let Ok(request) = requests.recv() {
        match request {
            SimRequest::Init {
                world_width,
                world_height,
            } => {
                if let Err(error) = world.configure(world_width, world_height) {
                    warn!(%error, "ignoring invalid world configuration");
                }
            }
            SimRequest::Load(records) => {
                let inserted = world.load(&records);
                debug!(inserted, total = world.len(), "loaded agent batch");
                stats.publish(world.stats(last_visible));
            }
            SimRequest::Update(record) => world.upsert(&record),
            SimRequest::Remove(id) => {
                world.remove(&id);
            }
            SimRequest::SetViewport(bounds) => world.set_viewport(bounds),
            SimRequest::Tick { delta_ms } => {
                world.tick(delta_ms);
                let snapshot = world.visible();
                last_visible = snapshot.len();
                visible.publish(snapshot);
            }
        }
    }
    debug!("simulation worker stopped");
}
