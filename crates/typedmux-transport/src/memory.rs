//! In-process frame transport.
//!
//! [`MemoryTransport::pair`] returns two connected ends. Each direction is a
//! mutex-guarded queue with a condvar, so a blocked receive wakes on either a
//! new frame or a close.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{FrameTransport, Shutdown, ShutdownHandle};

#[derive(Default)]
struct Lane {
    state: Mutex<LaneState>,
    ready: Condvar,
}

#[derive(Default)]
struct LaneState {
    frames: VecDeque<Bytes>,
    /// No more frames will be pushed. Frames already queued stay readable.
    write_closed: bool,
    /// The reading end is gone. Queued frames are dropped.
    read_closed: bool,
}

impl Lane {
    fn lock(&self) -> MutexGuard<'_, LaneState> {
        // Pushes and pops never leave the queue half-updated, so poisoning is ignored.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, frame: Bytes) -> Result<()> {
        let mut state = self.lock();
        if state.write_closed || state.read_closed {
            return Err(TransportError::ConnectionClosed);
        }
        state.frames.push_back(frame);
        self.ready.notify_one();
        Ok(())
    }

    fn pop(&self) -> Result<Bytes> {
        let mut state = self.lock();
        loop {
            if state.read_closed {
                return Err(TransportError::ConnectionClosed);
            }
            if let Some(frame) = state.frames.pop_front() {
                return Ok(frame);
            }
            if state.write_closed {
                return Err(TransportError::ConnectionClosed);
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    fn close_writer(&self) {
        self.lock().write_closed = true;
        self.ready.notify_all();
    }

    fn close_reader(&self) {
        let mut state = self.lock();
        state.read_closed = true;
        state.frames.clear();
        drop(state);
        self.ready.notify_all();
    }
}

/// One end of an in-memory frame channel.
pub struct MemoryTransport {
    inbound: Arc<Lane>,
    outbound: Arc<Lane>,
}

impl MemoryTransport {
    /// Two connected ends: frames sent on one are received on the other.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Lane::default());
        let b_to_a = Arc::new(Lane::default());
        (
            Self {
                inbound: Arc::clone(&b_to_a),
                outbound: Arc::clone(&a_to_b),
            },
            Self {
                inbound: a_to_b,
                outbound: b_to_a,
            },
        )
    }

    /// Frames delivered to this end and not yet received.
    pub fn pending(&self) -> usize {
        self.inbound.lock().frames.len()
    }
}

impl FrameTransport for MemoryTransport {
    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.outbound.push(Bytes::copy_from_slice(frame))
    }

    fn receive_frame(&mut self) -> Result<Bytes> {
        self.inbound.pop()
    }

    fn close(&mut self) -> Result<()> {
        shut(&self.inbound, &self.outbound);
        debug!("closed memory transport");
        Ok(())
    }

    fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        Ok(ShutdownHandle::new(MemoryShutdown {
            inbound: Arc::clone(&self.inbound),
            outbound: Arc::clone(&self.outbound),
        }))
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        shut(&self.inbound, &self.outbound);
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("pending", &self.pending())
            .finish()
    }
}

struct MemoryShutdown {
    inbound: Arc<Lane>,
    outbound: Arc<Lane>,
}

impl Shutdown for MemoryShutdown {
    fn shutdown(&self) -> Result<()> {
        shut(&self.inbound, &self.outbound);
        Ok(())
    }
}

fn shut(inbound: &Lane, outbound: &Lane) {
    inbound.close_reader();
    outbound.close_writer();
}
