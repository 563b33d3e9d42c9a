//! Typed dynamic multiplexing over one frame connection.
//!
//! Several independent consumers, each interested in a different message
//! type, share a single [`Connection`]. Frames tagged with a type fingerprint
//! are routed to the consumer that asks for that type; frames that arrive
//! before anyone asks wait in a per-fingerprint FIFO queue.
//!
//! # Example
//!
//! ```
//! use typedmux_conn::{Connection, Mode};
//! use typedmux_transport::MemoryTransport;
//!
//! let (left, right) = MemoryTransport::pair();
//! let mut sender = Connection::new("left", left, Mode::Tagged);
//! let mut receiver = Connection::new("right", right, Mode::Tagged);
//!
//! sender.send_tagged(&42i64).unwrap();
//! sender.send_tagged(&"hi".to_string()).unwrap();
//!
//! // The String consumer runs first; the i64 waits in the queue.
//! assert_eq!(receiver.expect_tagged::<String>().unwrap(), "hi");
//! assert_eq!(receiver.expect_tagged::<i64>().unwrap(), 42);
//! ```

pub mod connection;
pub mod connector;
pub mod error;
#[cfg(unix)]
pub mod listener;
pub mod queue;

pub use connection::{Connection, ConnectionConfig, Incoming, Mode};
pub use connector::run_scoped;
#[cfg(unix)]
pub use connector::{open_connection, open_connection_with_config, with_connection};
pub use error::{ConnError, Result};
#[cfg(unix)]
pub use listener::ConnectionListener;
pub use queue::{PendingQueues, DEFAULT_MAX_PENDING_PER_TYPE, DEFAULT_MAX_PENDING_TOTAL};
