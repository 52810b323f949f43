//! Message types and channels connecting the orchestrator to the simulation
//! worker. Requests ride a bounded queue; replies land in single-slot
//! latest-wins mailboxes so a slow consumer never builds a backlog.

use crossfire::{MRx, MTx, TrySendError, detect_backoff_cfg, mpmc};
use serde::{Deserialize, Serialize};
use shoal_core::{Aabb, TroutRecord};

/// Requests accepted by the simulation worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimRequest {
    /// (Re)configure world extents; must precede agent loads and resets the
    /// population.
    Init { world_width: f32, world_height: f32 },
    /// Idempotent bulk insert; known ids are left untouched.
    Load(Vec<TroutRecord>),
    /// Update tier/scale of a known agent, or insert it when unknown.
    Update(TroutRecord),
    /// Delete an agent; no-op for unknown ids.
    Remove(String),
    /// Viewport used by the next tick's visibility query.
    SetViewport(Aabb),
    /// Advance simulation time; triggers a visibility reply.
    Tick { delta_ms: f64 },
}

pub type RequestSender = MTx<SimRequest>;
pub type RequestReceiver = MRx<SimRequest>;

/// Create the bounded request channel feeding the simulation worker.
pub fn create_sim_bus(capacity: usize) -> (RequestSender, RequestReceiver) {
    detect_backoff_cfg();
    mpmc::bounded_blocking(capacity)
}

/// Producer half of a latest-wins mailbox.
pub struct SlotWriter<T> {
    tx: MTx<T>,
    rx: MRx<T>,
}

/// Consumer half of a latest-wins mailbox.
pub struct SlotReader<T> {
    rx: MRx<T>,
}

/// Create a single-slot mailbox: the writer displaces any unconsumed value,
/// so the reader always observes the most recent publication and backlog is
/// bounded at one entry.
pub fn reply_slot<T: Send + Unpin>() -> (SlotWriter<T>, SlotReader<T>) {
    let (tx, rx) = mpmc::bounded_blocking(1);
    (
        SlotWriter {
            tx,
            rx: rx.clone(),
        },
        SlotReader { rx },
    )
}

impl<T: Send + Unpin + 'static> SlotWriter<T> {
    /// Publish a value, discarding the stale occupant if the slot is full.
    /// Values sent after the reader is gone are silently dropped.
    pub fn publish(&self, value: T) {
        match self.tx.try_send(value) {
            Ok(()) => {}
            Err(TrySendError::Full(value)) => {
                let _ = self.rx.try_recv();
                let _ = self.tx.try_send(value);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl<T> SlotReader<T> {
    /// Take the latest published value, if one is waiting.
    #[must_use]
    pub fn take(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keeps_only_the_latest_value() {
        let (writer, reader) = reply_slot::<u32>();
        writer.publish(1);
        writer.publish(2);
        writer.publish(3);
        assert_eq!(reader.take(), Some(3));
        assert_eq!(reader.take(), None);
    }

    #[test]
    fn slot_is_empty_until_published() {
        let (_writer, reader) = reply_slot::<u32>();
        assert_eq!(reader.take(), None);
    }

    #[test]
    fn request_bus_carries_messages_in_order() {
        let (tx, rx) = create_sim_bus(8);
        assert!(tx.try_send(SimRequest::Tick { delta_ms: 16.0 }).is_ok());
        assert!(
            tx.try_send(SimRequest::Init {
                world_width: 100.0,
                world_height: 100.0,
            })
            .is_ok()
        );
        assert!(matches!(
            rx.try_recv(),
            Ok(SimRequest::Tick { .. })
        ));
        assert!(matches!(rx.try_recv(), Ok(SimRequest::Init { .. })));
    }
}
