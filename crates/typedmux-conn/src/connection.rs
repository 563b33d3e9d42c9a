//! A single frame connection shared by independent typed consumers.
//!
//! Receiving is driven by whichever consumer calls an `expect*` method. A
//! typed consumer ([`Connection::expect_tagged`]) first checks the pending
//! queue for its fingerprint; if that is empty it pulls frames off the
//! transport, returning the first one tagged with its fingerprint and
//! deferring every other tagged frame to the queue of its own fingerprint.
//! Frames of one type are therefore always delivered in arrival order, no
//! matter which consumer happened to pull them.
//!
//! The connection is single-reader: every operation takes `&mut self`.
//! Consumers on different threads need an outer lock around the connection.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, trace, warn};
use typedmux_frame::{payload, Fingerprint, Message, TaggedFrame};
use typedmux_transport::{FrameTransport, ShutdownHandle, TransportConfig};

use crate::error::{ConnError, Result};
use crate::queue::{PendingQueues, DEFAULT_MAX_PENDING_PER_TYPE, DEFAULT_MAX_PENDING_TOTAL};

/// Whether plain receives keep tagged frames they cannot use.
///
/// In `Tagged` mode, [`Connection::expect`] and [`Connection::expect_text`]
/// move a non-matching tagged frame into the pending queue table. In
/// `Untagged` mode they discard it. [`Connection::expect_tagged`] defers
/// mismatched tagged frames in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tagged,
    Untagged,
}

/// Connection behavior settings.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Frames deferred per fingerprint before receives fail with `QueueFull`.
    pub max_pending_per_type: usize,
    /// Frames deferred across all fingerprints before receives fail with `QueueFull`.
    pub max_pending_total: usize,
    /// Settings for transports opened by the connector and listener.
    pub transport: TransportConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_pending_per_type: DEFAULT_MAX_PENDING_PER_TYPE,
            max_pending_total: DEFAULT_MAX_PENDING_TOTAL,
            transport: TransportConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn with_max_pending_per_type(mut self, limit: usize) -> Self {
        self.max_pending_per_type = limit;
        self
    }

    pub fn with_max_pending_total(mut self, limit: usize) -> Self {
        self.max_pending_total = limit;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

/// Result of [`Connection::expect_either`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming<T> {
    /// The frame decoded as the requested type.
    Value(T),
    /// The frame did not decode; its raw bytes.
    Raw(Bytes),
}

/// One open session over a frame transport.
///
/// Owns the transport and the pending queue table. [`Connection::close`]
/// must be called at most once; dropping an open connection closes it.
pub struct Connection<T: FrameTransport> {
    origin: String,
    mode: Mode,
    transport: Option<T>,
    pending: PendingQueues,
}

impl<T: FrameTransport> Connection<T> {
    /// Wrap an open transport with default configuration.
    pub fn new(origin: impl Into<String>, transport: T, mode: Mode) -> Self {
        Self::with_config(origin, transport, mode, &ConnectionConfig::default())
    }

    /// Wrap an open transport with explicit configuration.
    pub fn with_config(
        origin: impl Into<String>,
        transport: T,
        mode: Mode,
        config: &ConnectionConfig,
    ) -> Self {
        let origin = origin.into();
        debug!(%origin, ?mode, "connection opened");
        Self {
            origin,
            mode,
            transport: Some(transport),
            pending: PendingQueues::with_limits(
                config.max_pending_per_type,
                config.max_pending_total,
            ),
        }
    }

    /// Endpoint or peer identifier this connection was opened with.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_tagged(&self) -> bool {
        self.mode == Mode::Tagged
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Deferred frames waiting for `fingerprint`.
    pub fn pending_len(&self, fingerprint: &Fingerprint) -> usize {
        self.pending.len(fingerprint)
    }

    /// Deferred frames waiting for message type `M`.
    pub fn pending_for<M: Message>(&self) -> usize {
        self.pending.len(&M::fingerprint())
    }

    /// Deferred frames across all fingerprints.
    pub fn pending_total(&self) -> usize {
        self.pending.total()
    }

    /// Close the transport and release the pending queue table.
    ///
    /// A second call fails with [`ConnError::ConnectionClosed`].
    pub fn close(&mut self) -> Result<()> {
        let mut transport = self.transport.take().ok_or(ConnError::ConnectionClosed)?;
        let dropped = self.pending.total();
        self.pending.clear();
        debug!(origin = %self.origin, dropped, "closing connection");
        transport.close()?;
        Ok(())
    }

    /// Handle for forcing the transport closed from another thread.
    ///
    /// A receive blocked inside an `expect*` call then fails with
    /// [`ConnError::ConnectionClosed`].
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let transport = self.transport.as_ref().ok_or(ConnError::ConnectionClosed)?;
        Ok(transport.shutdown_handle()?)
    }

    /// Append a payload to its fingerprint's pending queue.
    ///
    /// `payload` is the body with the tag header already stripped, as
    /// [`TaggedFrame::extract`] yields it. Queueing a whole tagged frame
    /// makes the later `expect_tagged` fail with
    /// [`ConnError::IntegrityFault`].
    pub fn queue_frame(&mut self, fingerprint: Fingerprint, payload: Bytes) -> Result<()> {
        self.ensure_open()?;
        self.pending.push(fingerprint, payload)
    }

    /// Take the oldest pending payload for `fingerprint`, if any.
    pub fn pop_queue(&mut self, fingerprint: &Fingerprint) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        Ok(self.pending.pop(fingerprint))
    }

    /// Send one raw frame.
    pub fn send_bytes(&mut self, frame: &[u8]) -> Result<()> {
        self.transport_mut()?.send_frame(frame)?;
        Ok(())
    }

    /// Send text as one UTF-8 frame.
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_bytes(&payload::encode_text(text))
    }

    /// Send a bincode-encoded value as one untagged frame.
    pub fn send<V: Serialize + ?Sized>(&mut self, value: &V) -> Result<()> {
        self.ensure_open()?;
        let bytes = payload::encode(value)?;
        self.send_bytes(&bytes)
    }

    /// Send a value prefixed with its type's fingerprint.
    pub fn send_tagged<M: Message>(&mut self, value: &M) -> Result<()> {
        self.ensure_open()?;
        let frame = TaggedFrame::new(M::fingerprint(), payload::encode(value)?).encode()?;
        self.send_bytes(&frame)
    }

    /// Next frame from the transport, whatever it contains.
    ///
    /// Does not look at the pending queue table.
    pub fn expect_bytes(&mut self) -> Result<Bytes> {
        self.receive()
    }

    /// Next frame that is valid UTF-8.
    ///
    /// Other frames are dropped, except that tagged frames are deferred on a
    /// [`Mode::Tagged`] connection.
    pub fn expect_text(&mut self) -> Result<String> {
        loop {
            let frame = self.receive()?;
            let text = self.accept_or_route(frame, |bytes| payload::decode_text(bytes).ok())?;
            if let Some(text) = text {
                return Ok(text);
            }
        }
    }

    /// Next frame that decodes as `V`.
    ///
    /// Lossy: frames that do not decode are dropped, except that tagged
    /// frames are deferred on a [`Mode::Tagged`] connection.
    pub fn expect<V: DeserializeOwned>(&mut self) -> Result<V> {
        loop {
            let frame = self.receive()?;
            if let Some(value) = self.accept_or_route(frame, payload::try_decode::<V>)? {
                return Ok(value);
            }
        }
    }

    /// Next frame, decoded as `V` if possible and raw otherwise.
    ///
    /// Never defers anything to the pending queue table.
    pub fn expect_either<V: DeserializeOwned>(&mut self) -> Result<Incoming<V>> {
        let frame = self.receive()?;
        Ok(match payload::try_decode::<V>(&frame) {
            Some(value) => Incoming::Value(value),
            None => Incoming::Raw(frame),
        })
    }

    /// Next frame tagged with `M`'s fingerprint, in arrival order.
    ///
    /// Serves the pending queue first. Otherwise pulls frames from the
    /// transport: frames tagged for other types are deferred to their own
    /// queues, untagged frames are dropped. Blocks until a matching frame
    /// arrives or the transport fails.
    ///
    /// A matching frame that fails to decode is an
    /// [`ConnError::IntegrityFault`].
    pub fn expect_tagged<M: Message>(&mut self) -> Result<M> {
        self.ensure_open()?;
        let wanted = M::fingerprint();
        loop {
            if let Some(payload) = self.pending.pop(&wanted) {
                trace!(origin = %self.origin, fingerprint = %wanted, "served from pending queue");
                return decode_matched::<M>(wanted, &payload);
            }

            let frame = self.receive()?;
            match TaggedFrame::extract(&frame) {
                Some(tagged) if tagged.fingerprint == wanted => {
                    return decode_matched::<M>(wanted, &tagged.payload);
                }
                Some(tagged) => self.defer(tagged)?,
                None => debug!(
                    origin = %self.origin,
                    size = frame.len(),
                    expecting = %wanted,
                    "dropping untagged frame"
                ),
            }
        }
    }

    fn accept_or_route<V>(
        &mut self,
        frame: Bytes,
        decode: impl FnOnce(&[u8]) -> Option<V>,
    ) -> Result<Option<V>> {
        if let Some(value) = decode(&frame) {
            return Ok(Some(value));
        }
        if self.mode == Mode::Tagged {
            if let Some(tagged) = TaggedFrame::extract(&frame) {
                self.defer(tagged)?;
                return Ok(None);
            }
        }
        debug!(
            origin = %self.origin,
            size = frame.len(),
            "dropping frame that does not decode as the requested type"
        );
        Ok(None)
    }

    fn defer(&mut self, tagged: TaggedFrame) -> Result<()> {
        debug!(
            origin = %self.origin,
            fingerprint = %tagged.fingerprint,
            size = tagged.payload.len(),
            "deferring tagged frame"
        );
        self.pending.push(tagged.fingerprint, tagged.payload)
    }

    fn receive(&mut self) -> Result<Bytes> {
        Ok(self.transport_mut()?.receive_frame()?)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.transport.is_none() {
            return Err(ConnError::ConnectionClosed);
        }
        Ok(())
    }

    fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(ConnError::ConnectionClosed)
    }
}

fn decode_matched<M: Message>(fingerprint: Fingerprint, bytes: &[u8]) -> Result<M> {
    payload::decode::<M>(bytes).map_err(|source| {
        let descriptor = M::descriptor().into_owned();
        error!(%fingerprint, %descriptor, error = %source, "fingerprint-matched frame failed to decode");
        ConnError::IntegrityFault {
            fingerprint,
            descriptor,
            source,
        }
    })
}

impl<T: FrameTransport> Drop for Connection<T> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            if let Err(err) = self.close() {
                warn!(origin = %self.origin, error = %err, "implicit close failed");
            }
        }
    }
}

impl<T: FrameTransport> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("origin", &self.origin)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .field("pending", &self.pending.total())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use serde::Deserialize;
    use typedmux_frame::impl_message;
    use typedmux_transport::MemoryTransport;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Alpha(u32);

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Beta {
        name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Gamma(bool);

    impl_message!(
        Alpha => "test.Alpha",
        Beta => "test.Beta",
        Gamma => "test.Gamma",
    );

    fn beta(name: &str) -> Beta {
        Beta {
            name: name.to_string(),
        }
    }

    fn connected(mode: Mode) -> (Connection<MemoryTransport>, MemoryTransport) {
        let (local, remote) = MemoryTransport::pair();
        (Connection::new("memory", local, mode), remote)
    }

    fn tagged<M: Message>(value: &M) -> Bytes {
        TaggedFrame::new(M::fingerprint(), payload::encode(value).unwrap())
            .encode()
            .unwrap()
    }

    #[test]
    fn accessors_reflect_construction() {
        let (conn, _remote) = connected(Mode::Tagged);
        assert_eq!(conn.origin(), "memory");
        assert_eq!(conn.mode(), Mode::Tagged);
        assert!(conn.is_tagged());
        assert!(!conn.is_closed());

        let (conn, _remote) = connected(Mode::Untagged);
        assert!(!conn.is_tagged());
    }

    #[test]
    fn each_consumer_only_sees_its_own_type() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(&tagged(&Alpha(1))).unwrap();
        remote.send_frame(&tagged(&beta("b1"))).unwrap();
        remote.send_frame(&tagged(&Alpha(2))).unwrap();
        remote.send_frame(&tagged(&beta("b2"))).unwrap();
        remote.send_frame(&tagged(&Gamma(true))).unwrap();

        assert_eq!(conn.expect_tagged::<Beta>().unwrap(), beta("b1"));
        assert_eq!(conn.expect_tagged::<Beta>().unwrap(), beta("b2"));
        assert_eq!(conn.pending_for::<Alpha>(), 2);
        assert_eq!(conn.pending_for::<Gamma>(), 0);

        assert_eq!(conn.expect_tagged::<Gamma>().unwrap(), Gamma(true));
        assert_eq!(conn.expect_tagged::<Alpha>().unwrap(), Alpha(1));
        assert_eq!(conn.expect_tagged::<Alpha>().unwrap(), Alpha(2));
        assert_eq!(conn.pending_total(), 0);
    }

    #[test]
    fn queued_frames_come_back_in_arrival_order() {
        let (mut conn, mut remote) = connected(Mode::Untagged);
        remote.send_frame(&tagged(&Alpha(10))).unwrap();
        remote.send_frame(&tagged(&Alpha(20))).unwrap();
        remote.send_frame(&tagged(&Gamma(false))).unwrap();

        assert_eq!(conn.expect_tagged::<Gamma>().unwrap(), Gamma(false));
        assert_eq!(conn.expect_tagged::<Alpha>().unwrap(), Alpha(10));
        assert_eq!(conn.expect_tagged::<Alpha>().unwrap(), Alpha(20));
    }

    #[test]
    fn int_waits_in_queue_while_string_is_served() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(&tagged(&42i64)).unwrap();
        remote.send_frame(&tagged(&"hi".to_string())).unwrap();

        assert_eq!(conn.expect_tagged::<String>().unwrap(), "hi");
        assert_eq!(conn.pending_for::<i64>(), 1);
        assert_eq!(conn.expect_tagged::<i64>().unwrap(), 42);
        assert_eq!(remote.pending(), 0);
    }

    #[test]
    fn undecodable_untagged_frame_is_gone() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(&[0xFF, 0xFF, 0xFF]).unwrap();
        remote
            .send_frame(&payload::encode(&"ok".to_string()).unwrap())
            .unwrap();
        remote.close().unwrap();

        assert_eq!(conn.expect::<String>().unwrap(), "ok");
        assert_eq!(conn.pending_total(), 0);
        assert!(matches!(
            conn.expect::<String>(),
            Err(ConnError::ConnectionClosed)
        ));
    }

    #[test]
    fn frame_declaring_a_huge_length_is_skipped() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote
            .send_frame(&[0xFD, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F])
            .unwrap();
        remote
            .send_frame(&payload::encode(&"ok".to_string()).unwrap())
            .unwrap();

        assert_eq!(conn.expect::<String>().unwrap(), "ok");
        assert_eq!(conn.pending_total(), 0);
    }

    #[test]
    fn tagged_connection_captures_tagged_frames_during_plain_expect() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(&tagged(&Alpha(7))).unwrap();
        remote.send_frame(&payload::encode(&5u64).unwrap()).unwrap();

        assert_eq!(conn.expect::<u64>().unwrap(), 5);
        assert_eq!(conn.pending_for::<Alpha>(), 1);

        remote.close().unwrap();
        assert_eq!(conn.expect_tagged::<Alpha>().unwrap(), Alpha(7));
    }

    #[test]
    fn untagged_connection_discards_tagged_frames_during_plain_expect() {
        let (mut conn, mut remote) = connected(Mode::Untagged);
        remote.send_frame(&tagged(&Alpha(7))).unwrap();
        remote.send_frame(&payload::encode(&5u64).unwrap()).unwrap();

        assert_eq!(conn.expect::<u64>().unwrap(), 5);
        assert_eq!(conn.pending_total(), 0);

        remote.close().unwrap();
        assert!(matches!(
            conn.expect_tagged::<Alpha>(),
            Err(ConnError::ConnectionClosed)
        ));
    }

    #[test]
    fn expect_tagged_defers_in_untagged_mode_too() {
        let (mut conn, mut remote) = connected(Mode::Untagged);
        remote.send_frame(&tagged(&Alpha(1))).unwrap();
        remote.send_frame(&tagged(&Gamma(true))).unwrap();

        assert_eq!(conn.expect_tagged::<Gamma>().unwrap(), Gamma(true));
        assert_eq!(conn.pending_for::<Alpha>(), 1);
    }

    #[test]
    fn expect_tagged_drops_untagged_frames() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(b"plain chatter").unwrap();
        remote.send_frame(&tagged(&Alpha(3))).unwrap();

        assert_eq!(conn.expect_tagged::<Alpha>().unwrap(), Alpha(3));
        assert_eq!(conn.pending_total(), 0);
        assert_eq!(remote.pending(), 0);
    }

    #[test]
    fn expect_text_skips_invalid_utf8() {
        let (mut conn, mut remote) = connected(Mode::Untagged);
        remote.send_frame(&[0xC3, 0x28]).unwrap();
        remote.send_frame("hello".as_bytes()).unwrap();

        assert_eq!(conn.expect_text().unwrap(), "hello");
    }

    #[test]
    fn expect_text_defers_tagged_frames_on_tagged_connection() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote
            .send_frame(&TaggedFrame::new(Alpha::fingerprint(), vec![0xFF]).encode().unwrap())
            .unwrap();
        remote.send_frame(b"text").unwrap();

        assert_eq!(conn.expect_text().unwrap(), "text");
        assert_eq!(conn.pending_for::<Alpha>(), 1);
    }

    #[test]
    fn expect_either_surfaces_undecodable_frames() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(&payload::encode(&7u16).unwrap()).unwrap();
        remote.send_frame(b"").unwrap();
        remote.send_frame(&tagged(&Alpha(9))).unwrap();

        assert_eq!(conn.expect_either::<u16>().unwrap(), Incoming::Value(7));
        assert_eq!(
            conn.expect_either::<u16>().unwrap(),
            Incoming::Raw(Bytes::new())
        );
        let third = conn.expect_either::<u16>().unwrap();
        assert!(matches!(third, Incoming::Raw(_)));
        assert_eq!(conn.pending_total(), 0);
    }

    #[test]
    fn expect_bytes_bypasses_the_queue() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(&tagged(&Alpha(1))).unwrap();
        remote.send_frame(&tagged(&Gamma(true))).unwrap();
        remote.send_frame(b"raw").unwrap();

        conn.expect_tagged::<Gamma>().unwrap();
        assert_eq!(conn.pending_for::<Alpha>(), 1);
        assert_eq!(conn.expect_bytes().unwrap().as_ref(), b"raw");
        assert_eq!(conn.pending_for::<Alpha>(), 1);
    }

    #[test]
    fn send_family_writes_one_frame_each() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        conn.send_tagged(&Alpha(3)).unwrap();
        conn.send(&"x".to_string()).unwrap();
        conn.send_text("plain").unwrap();
        conn.send_bytes(&[1, 2, 3]).unwrap();

        let first = remote.receive_frame().unwrap();
        let tagged = TaggedFrame::extract(&first).unwrap();
        assert_eq!(tagged.fingerprint, Alpha::fingerprint());
        assert_eq!(payload::decode::<Alpha>(&tagged.payload).unwrap(), Alpha(3));

        let second = remote.receive_frame().unwrap();
        assert_eq!(payload::decode::<String>(&second).unwrap(), "x");
        assert_eq!(remote.receive_frame().unwrap().as_ref(), b"plain");
        assert_eq!(remote.receive_frame().unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(conn.pending_total(), 0);
    }

    #[test]
    fn mismatched_payload_under_matching_fingerprint_is_integrity_fault() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        let wrong = payload::encode(&"not a u32 at all".to_string()).unwrap();
        remote
            .send_frame(&TaggedFrame::new(Alpha::fingerprint(), wrong).encode().unwrap())
            .unwrap();

        let err = conn.expect_tagged::<Alpha>().unwrap_err();
        assert!(matches!(
            err,
            ConnError::IntegrityFault { ref descriptor, .. } if descriptor == "test.Alpha"
        ));
    }

    #[test]
    fn integrity_fault_from_queued_frame() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote
            .send_frame(&TaggedFrame::new(Alpha::fingerprint(), vec![]).encode().unwrap())
            .unwrap();
        remote.send_frame(&tagged(&Gamma(true))).unwrap();

        conn.expect_tagged::<Gamma>().unwrap();
        let err = conn.expect_tagged::<Alpha>().unwrap_err();
        assert!(matches!(err, ConnError::IntegrityFault { fingerprint, .. } if fingerprint == Alpha::fingerprint()));
    }

    #[test]
    fn queue_bound_fails_the_receive() {
        let (local, mut remote) = MemoryTransport::pair();
        let config = ConnectionConfig::default().with_max_pending_per_type(1);
        let mut conn = Connection::with_config("memory", local, Mode::Tagged, &config);

        remote.send_frame(&tagged(&Alpha(1))).unwrap();
        remote.send_frame(&tagged(&Alpha(2))).unwrap();
        remote.send_frame(&tagged(&Gamma(true))).unwrap();

        let err = conn.expect_tagged::<Gamma>().unwrap_err();
        assert!(matches!(err, ConnError::QueueFull { limit: 1, .. }));
        assert_eq!(conn.pending_for::<Alpha>(), 1);
    }

    #[test]
    fn queue_frame_and_pop_queue_are_fifo() {
        let (mut conn, _remote) = connected(Mode::Tagged);
        let fp = Alpha::fingerprint();
        conn.queue_frame(fp, Bytes::from_static(b"one")).unwrap();
        conn.queue_frame(fp, Bytes::from_static(b"two")).unwrap();

        assert_eq!(conn.pending_len(&fp), 2);
        assert_eq!(conn.pop_queue(&fp).unwrap().unwrap().as_ref(), b"one");
        assert_eq!(conn.pop_queue(&fp).unwrap().unwrap().as_ref(), b"two");
        assert!(conn.pop_queue(&fp).unwrap().is_none());
    }

    #[test]
    fn queueing_a_whole_tagged_frame_is_an_integrity_fault() {
        let (mut conn, _remote) = connected(Mode::Tagged);
        conn.queue_frame(Alpha::fingerprint(), tagged(&Alpha(1))).unwrap();

        let err = conn.expect_tagged::<Alpha>().unwrap_err();
        assert!(matches!(err, ConnError::IntegrityFault { .. }));
    }

    #[test]
    fn closed_connection_rejects_everything() {
        let (mut conn, mut remote) = connected(Mode::Tagged);
        remote.send_frame(&tagged(&Alpha(1))).unwrap();
        remote.send_frame(&tagged(&Gamma(true))).unwrap();
        conn.expect_tagged::<Gamma>().unwrap();
        assert_eq!(conn.pending_for::<Alpha>(), 1);

        conn.close().unwrap();
        assert!(conn.is_closed());
        assert_eq!(conn.pending_total(), 0);

        assert!(matches!(conn.send_text("x"), Err(ConnError::ConnectionClosed)));
        assert!(matches!(conn.send_tagged(&Alpha(2)), Err(ConnError::ConnectionClosed)));
        assert!(matches!(
            conn.send(&"x".to_string()),
            Err(ConnError::ConnectionClosed)
        ));
        assert!(matches!(conn.expect_bytes(), Err(ConnError::ConnectionClosed)));
        assert!(matches!(conn.expect_text(), Err(ConnError::ConnectionClosed)));
        assert!(matches!(conn.expect::<String>(), Err(ConnError::ConnectionClosed)));
        assert!(matches!(
            conn.expect_either::<u16>(),
            Err(ConnError::ConnectionClosed)
        ));
        assert!(matches!(
            conn.expect_tagged::<Alpha>(),
            Err(ConnError::ConnectionClosed)
        ));
        assert!(matches!(
            conn.queue_frame(Alpha::fingerprint(), Bytes::new()),
            Err(ConnError::ConnectionClosed)
        ));
        assert!(matches!(
            conn.pop_queue(&Alpha::fingerprint()),
            Err(ConnError::ConnectionClosed)
        ));
        assert!(matches!(conn.shutdown_handle(), Err(ConnError::ConnectionClosed)));
        assert!(matches!(conn.close(), Err(ConnError::ConnectionClosed)));
    }

    #[test]
    fn remote_sees_close() {
        let (mut conn, mut remote) = connected(Mode::Untagged);
        conn.close().unwrap();
        assert!(remote.receive_frame().unwrap_err().is_connection_closed());
    }

    #[test]
    fn drop_closes_the_transport() {
        let (conn, mut remote) = connected(Mode::Untagged);
        drop(conn);
        assert!(remote.receive_frame().unwrap_err().is_connection_closed());
    }

    #[test]
    fn shutdown_handle_unblocks_waiting_consumer() {
        let (conn, _remote) = connected(Mode::Tagged);
        let handle = conn.shutdown_handle().unwrap();

        let waiter = thread::spawn(move || {
            let mut conn = conn;
            conn.expect_tagged::<Alpha>()
        });
        thread::sleep(Duration::from_millis(30));
        handle.shutdown().unwrap();

        let result = waiter.join().expect("waiter should not panic");
        assert!(matches!(result, Err(ConnError::ConnectionClosed)));
    }

    #[test]
    fn two_connections_talk_to_each_other() {
        let (left, right) = MemoryTransport::pair();
        let mut client = Connection::new("client", left, Mode::Tagged);
        let mut server = Connection::new("server", right, Mode::Tagged);

        let server_thread = thread::spawn(move || -> Result<()> {
            let joined: Beta = server.expect_tagged()?;
            server.send_tagged(&Alpha(joined.name.len() as u32))?;
            server.send_tagged(&Gamma(true))?;
            Ok(())
        });

        client.send_tagged(&beta("four")).unwrap();
        assert_eq!(client.expect_tagged::<Gamma>().unwrap(), Gamma(true));
        assert_eq!(client.expect_tagged::<Alpha>().unwrap(), Alpha(4));
        server_thread.join().unwrap().unwrap();
    }
}
