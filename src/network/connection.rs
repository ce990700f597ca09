//! One live socket and its three workers.
//!
//! A [`Connection`] is created by the supervisor only after dial and
//! registration succeed, so nothing outside ever sees a half-built one.
//! It owns:
//! - the **listener**, which decodes lines into the inbound queue
//! - the **speaker**, which drains the outbound queue onto the socket
//! - the **keepalive**, which PINGs on an interval and waits for the PONG
//!
//! Any worker may request a disconnect; the supervisor then cancels all
//! three and drops the socket halves.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use slirc_wire::{IrcCodec, Message, ProtocolError};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, trace, warn};

use super::stream::BotStream;
use crate::telemetry::spans;

/// Consecutive read failures tolerated before the listener gives up.
pub const MAX_READ_FAILURES: u32 = 3;
/// Flush attempts per message before the speaker gives up.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;
/// Linear backoff step between flush attempts.
pub const WRITE_BACKOFF: Duration = Duration::from_millis(250);

pub type Transport = Framed<BotStream, IrcCodec>;

/// Why a worker asked for the connection to be torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the socket.
    Eof,
    /// Reads kept failing.
    ReadFailed(String),
    /// A message could not be flushed after all retries.
    WriteFailed(String),
    /// No PONG within the keepalive timeout.
    PingTimeout,
    /// The server sent ERROR.
    ServerError(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => f.write_str("connection closed by server"),
            Self::ReadFailed(e) => write!(f, "read failed: {e}"),
            Self::WriteFailed(e) => write!(f, "write failed: {e}"),
            Self::PingTimeout => f.write_str("ping timeout"),
            Self::ServerError(e) => write!(f, "server error: {e}"),
        }
    }
}

/// The outbound queue's consuming end, shared across connection generations.
///
/// Messages the speaker could not write are pushed back to the front, so
/// the next connection sends them first.
pub struct Outbox {
    rx: mpsc::Receiver<Message>,
    unsent: VecDeque<Message>,
}

impl Outbox {
    pub fn new(rx: mpsc::Receiver<Message>) -> Self {
        Self {
            rx,
            unsent: VecDeque::new(),
        }
    }

    /// Next message to write, requeued ones first.
    pub async fn next(&mut self) -> Option<Message> {
        match self.unsent.pop_front() {
            Some(msg) => Some(msg),
            None => self.rx.recv().await,
        }
    }

    /// Put a message back at the head of the queue.
    pub fn requeue(&mut self, msg: Message) {
        self.unsent.push_front(msg);
    }

    pub fn pending(&self) -> usize {
        self.unsent.len()
    }
}

/// Queue ends that outlive any single connection.
#[derive(Clone)]
pub struct Channels {
    /// Producer end of the inbound queue (consumed by the dispatcher).
    pub inbound: mpsc::Sender<Message>,
    /// Producer end of the outbound queue (used by keepalive).
    pub outbound: mpsc::Sender<Message>,
    /// Consumer end of the outbound queue.
    pub outbox: Arc<Mutex<Outbox>>,
    /// Consumer end of the PONG-observed signal.
    pub pong: Arc<Mutex<mpsc::Receiver<()>>>,
}

/// Keepalive parameters.
#[derive(Debug, Clone)]
pub struct Keepalive {
    pub nickname: String,
    pub interval: Duration,
    pub timeout: Duration,
}

/// A live, registered connection.
pub struct Connection {
    generation: u64,
    cancel: CancellationToken,
    disconnect_rx: mpsc::Receiver<DisconnectReason>,
    workers: Vec<JoinHandle<()>>,
}

impl Connection {
    /// Split the transport and start the three workers.
    pub fn spawn(
        transport: Transport,
        generation: u64,
        channels: &Channels,
        keepalive: Keepalive,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (disconnect_tx, disconnect_rx) = mpsc::channel(1);
        let (sink, stream) = transport.split();
        let span = spans::connection(generation);

        let workers = vec![
            tokio::spawn(
                listener(
                    stream,
                    channels.inbound.clone(),
                    disconnect_tx.clone(),
                    cancel.clone(),
                )
                .instrument(span.clone()),
            ),
            tokio::spawn(
                speaker(
                    sink,
                    channels.outbox.clone(),
                    disconnect_tx.clone(),
                    cancel.clone(),
                )
                .instrument(span.clone()),
            ),
            tokio::spawn(
                keepalive_loop(
                    keepalive,
                    channels.outbound.clone(),
                    channels.pong.clone(),
                    disconnect_tx,
                    cancel.clone(),
                )
                .instrument(span),
            ),
        ];

        Self {
            generation,
            cancel,
            disconnect_rx,
            workers,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for a worker to request a disconnect.
    ///
    /// Returns `None` when `shutdown` fires first.
    pub async fn wait(&mut self, shutdown: &CancellationToken) -> Option<DisconnectReason> {
        tokio::select! {
            _ = shutdown.cancelled() => None,
            reason = self.disconnect_rx.recv() => {
                // Every sender lives in a worker; all gone means all exited.
                Some(reason.unwrap_or(DisconnectReason::Eof))
            }
        }
    }

    /// Stop all workers and wait for them; the socket closes with them.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(generation = self.generation, error = %e, "Connection worker failed");
            }
        }
    }
}

fn request_disconnect(tx: &mpsc::Sender<DisconnectReason>, reason: DisconnectReason) {
    // Capacity 1: the first reason wins, later ones are redundant.
    let _ = tx.try_send(reason);
}

fn is_chatter(msg: &Message) -> bool {
    msg.is_command("PING") || msg.is_command("PONG")
}

/// Read lines, decode them and push them onto the inbound queue.
async fn listener<S>(
    mut stream: S,
    inbound: mpsc::Sender<Message>,
    disconnect: mpsc::Sender<DisconnectReason>,
    cancel: CancellationToken,
) where
    S: Stream<Item = Result<Result<Message, ProtocolError>, ProtocolError>> + Unpin,
{
    let mut failures = 0u32;
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(Ok(msg))) => {
                failures = 0;
                if is_chatter(&msg) {
                    trace!(line = %msg, "[>]");
                } else {
                    debug!(line = %msg, "[>]");
                }
                if msg.is_command("ERROR") {
                    warn!(reason = %msg.trailing, "Server sent ERROR");
                    request_disconnect(&disconnect, DisconnectReason::ServerError(msg.trailing));
                    return;
                }
                if inbound.send(msg).await.is_err() {
                    debug!("Inbound queue closed, listener exiting");
                    return;
                }
            }
            Some(Ok(Err(e))) => {
                debug!(error = %e, "Dropping malformed line");
            }
            Some(Err(e)) => {
                failures += 1;
                warn!(error = %e, failures, "Read error");
                if failures >= MAX_READ_FAILURES {
                    request_disconnect(&disconnect, DisconnectReason::ReadFailed(e.to_string()));
                    return;
                }
            }
            None => {
                info!("Server closed the connection");
                request_disconnect(&disconnect, DisconnectReason::Eof);
                return;
            }
        }
    }
}

/// Drain the outbound queue onto the socket, one message at a time.
async fn speaker<K>(
    mut sink: K,
    outbox: Arc<Mutex<Outbox>>,
    disconnect: mpsc::Sender<DisconnectReason>,
    cancel: CancellationToken,
) where
    K: Sink<Message, Error = ProtocolError> + Unpin,
{
    let mut outbox = outbox.lock().await;
    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => return,
            msg = outbox.next() => match msg {
                Some(msg) => msg,
                None => {
                    debug!("Outbound queue closed, speaker exiting");
                    return;
                }
            },
        };

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                outbox.requeue(msg);
                return;
            }
            outcome = write_with_retry(&mut sink, &msg) => outcome,
        };

        match outcome {
            Ok(()) => {
                if is_chatter(&msg) {
                    trace!(line = %msg, "[<]");
                } else {
                    debug!(line = %msg, "[<]");
                }
            }
            Err(e) => {
                warn!(error = %e, line = %msg, "Write failed, requeueing");
                outbox.requeue(msg);
                request_disconnect(&disconnect, DisconnectReason::WriteFailed(e));
                return;
            }
        }
    }
}

/// Buffer one message and flush it, retrying with linear backoff.
async fn write_with_retry<K>(sink: &mut K, msg: &Message) -> Result<(), String>
where
    K: Sink<Message, Error = ProtocolError> + Unpin,
{
    if let Err(e) = sink.feed(msg.clone()).await {
        // Encoding failures (illegal control characters) will never succeed.
        if e.is_line_error() {
            warn!(error = %e, "Dropping unencodable message");
            return Ok(());
        }
        return Err(e.to_string());
    }

    let mut attempt = 1;
    loop {
        match sink.flush().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= MAX_WRITE_ATTEMPTS => return Err(e.to_string()),
            Err(e) => {
                debug!(error = %e, attempt, "Flush failed, retrying");
                tokio::time::sleep(WRITE_BACKOFF * attempt).await;
                attempt += 1;
            }
        }
    }
}

/// PING on a fixed interval and wait for the dispatcher's PONG signal.
async fn keepalive_loop(
    keepalive: Keepalive,
    outbound: mpsc::Sender<Message>,
    pong: Arc<Mutex<mpsc::Receiver<()>>>,
    disconnect: mpsc::Sender<DisconnectReason>,
    cancel: CancellationToken,
) {
    let mut pong = pong.lock().await;
    let start = tokio::time::Instant::now() + keepalive.interval;
    let mut ticker = tokio::time::interval_at(start, keepalive.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        // Acks that arrived after an earlier timeout belong to no one now.
        while pong.try_recv().is_ok() {}

        // Queueing the PING and receiving the PONG share one deadline, so a
        // stalled outbound queue counts against the peer too.
        let deadline = tokio::time::Instant::now() + keepalive.timeout;
        let ping = Message::ping(&keepalive.nickname);
        let queued = tokio::select! {
            _ = cancel.cancelled() => return,
            queued = tokio::time::timeout_at(deadline, outbound.send(ping)) => queued,
        };
        match queued {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return,
            Err(_) => {
                warn!(timeout = ?keepalive.timeout, "Outbound queue stalled, PING not sent");
                request_disconnect(&disconnect, DisconnectReason::PingTimeout);
                return;
            }
        }

        let waited = tokio::select! {
            _ = cancel.cancelled() => return,
            waited = tokio::time::timeout_at(deadline, pong.recv()) => waited,
        };

        match waited {
            Ok(Some(())) => trace!("Keepalive acknowledged"),
            Ok(None) => return,
            Err(_) => {
                warn!(timeout = ?keepalive.timeout, "No PONG within keepalive timeout");
                request_disconnect(&disconnect, DisconnectReason::PingTimeout);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures_util::stream;

    fn keepalive() -> Keepalive {
        Keepalive {
            nickname: "bot".into(),
            interval: Duration::from_secs(12),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn outbox_prefers_requeued_messages() {
        let (tx, rx) = mpsc::channel(4);
        let mut outbox = Outbox::new(rx);
        tx.send(Message::privmsg("#c", "second")).await.unwrap();
        outbox.requeue(Message::privmsg("#c", "first"));
        assert_eq!(outbox.pending(), 1);

        assert_eq!(outbox.next().await.unwrap().trailing, "first");
        assert_eq!(outbox.next().await.unwrap().trailing, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_timeout_signals_once() {
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let (_pong_tx, pong_rx) = mpsc::channel(1);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(keepalive_loop(
            keepalive(),
            out_tx,
            Arc::new(Mutex::new(pong_rx)),
            dc_tx,
            cancel.clone(),
        ));

        let ping = out_rx.recv().await.unwrap();
        assert_eq!(ping.to_string(), "PING bot ");

        assert_eq!(dc_rx.recv().await, Some(DisconnectReason::PingTimeout));
        task.await.unwrap();
        // Worker exited and dropped its sender: no duplicate signal.
        assert_eq!(dc_rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_pong_resets_cycle() {
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let (pong_tx, pong_rx) = mpsc::channel(1);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(keepalive_loop(
            keepalive(),
            out_tx,
            Arc::new(Mutex::new(pong_rx)),
            dc_tx,
            cancel.clone(),
        ));

        for _ in 0..3 {
            out_rx.recv().await.unwrap();
            pong_tx.try_send(()).unwrap();
        }
        assert!(dc_rx.try_recv().is_err());

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(dc_rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn late_pong_does_not_satisfy_next_cycle() {
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let (pong_tx, pong_rx) = mpsc::channel(1);
        let pong_rx = Arc::new(Mutex::new(pong_rx));
        let cancel = CancellationToken::new();

        // First connection: PING goes unanswered.
        let (dc_tx, mut dc_rx) = mpsc::channel(1);
        let first = tokio::spawn(keepalive_loop(
            keepalive(),
            out_tx.clone(),
            pong_rx.clone(),
            dc_tx,
            cancel.clone(),
        ));
        out_rx.recv().await.unwrap();
        assert_eq!(dc_rx.recv().await, Some(DisconnectReason::PingTimeout));
        first.await.unwrap();

        // The PONG shows up late; the non-blocking send still succeeds.
        pong_tx.try_send(()).unwrap();
        // A second late signal is dropped rather than blocking the dispatcher.
        assert!(pong_tx.try_send(()).is_err());

        // Next connection: the stale ack must not count.
        let (dc_tx, mut dc_rx) = mpsc::channel(1);
        let second = tokio::spawn(keepalive_loop(
            keepalive(),
            out_tx,
            pong_rx,
            dc_tx,
            cancel.clone(),
        ));
        out_rx.recv().await.unwrap();
        assert_eq!(dc_rx.recv().await, Some(DisconnectReason::PingTimeout));
        second.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_times_out_when_outbound_queue_is_full() {
        let (out_tx, _out_rx) = mpsc::channel(1);
        out_tx.try_send(Message::privmsg("#c", "backlog")).unwrap();
        let (_pong_tx, pong_rx) = mpsc::channel(1);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let started = tokio::time::Instant::now();
        let task = tokio::spawn(keepalive_loop(
            keepalive(),
            out_tx,
            Arc::new(Mutex::new(pong_rx)),
            dc_tx,
            cancel.clone(),
        ));

        assert_eq!(dc_rx.recv().await, Some(DisconnectReason::PingTimeout));
        assert!(started.elapsed() >= Duration::from_secs(12 + 5));
        task.await.unwrap();
        assert_eq!(dc_rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_cancel_unblocks_stalled_enqueue() {
        let (out_tx, _out_rx) = mpsc::channel(1);
        out_tx.try_send(Message::privmsg("#c", "backlog")).unwrap();
        let (_pong_tx, pong_rx) = mpsc::channel(1);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(keepalive_loop(
            keepalive(),
            out_tx,
            Arc::new(Mutex::new(pong_rx)),
            dc_tx,
            cancel.clone(),
        ));

        // Past the first tick, inside the timeout: the PING is stuck queueing.
        tokio::time::sleep(Duration::from_secs(13)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("keepalive ignored cancellation")
            .unwrap();
        assert_eq!(dc_rx.recv().await, None);
    }

    fn read_error() -> ProtocolError {
        ProtocolError::from(io::Error::from(io::ErrorKind::ConnectionReset))
    }

    fn line(text: &str) -> Result<Result<Message, ProtocolError>, ProtocolError> {
        Ok(Ok(text.parse().unwrap()))
    }

    #[tokio::test]
    async fn listener_gives_up_after_consecutive_read_errors() {
        let frames = stream::iter(vec![
            line(":n!u@h PRIVMSG #c :before"),
            Err(read_error()),
            Err(read_error()),
            Err(read_error()),
            line(":n!u@h PRIVMSG #c :never read"),
        ]);
        let (in_tx, mut in_rx) = mpsc::channel(4);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);

        listener(frames, in_tx, dc_tx, CancellationToken::new()).await;

        assert!(matches!(dc_rx.recv().await, Some(DisconnectReason::ReadFailed(_))));
        assert_eq!(dc_rx.recv().await, None);
        assert_eq!(in_rx.recv().await.unwrap().trailing, "before");
        assert!(in_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn listener_read_error_count_resets_on_success() {
        let frames = stream::iter(vec![
            Err(read_error()),
            Err(read_error()),
            line(":n!u@h PRIVMSG #c :recovered"),
            Err(read_error()),
            Err(read_error()),
            Ok(Err(ProtocolError::IllegalControlChar('\0'))),
        ]);
        let (in_tx, mut in_rx) = mpsc::channel(4);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);

        listener(frames, in_tx, dc_tx, CancellationToken::new()).await;

        assert_eq!(in_rx.recv().await.unwrap().trailing, "recovered");
        assert_eq!(dc_rx.recv().await, Some(DisconnectReason::Eof));
    }

    #[derive(Default)]
    struct SinkLog {
        flushes: u32,
        written: Vec<String>,
    }

    /// Accepts every message but fails the first `failures` flushes.
    struct FlakySink {
        failures: u32,
        buffered: Vec<Message>,
        log: Arc<parking_lot::Mutex<SinkLog>>,
    }

    impl FlakySink {
        fn new(failures: u32) -> (Self, Arc<parking_lot::Mutex<SinkLog>>) {
            let log = Arc::new(parking_lot::Mutex::new(SinkLog::default()));
            let sink = Self {
                failures,
                buffered: Vec::new(),
                log: log.clone(),
            };
            (sink, log)
        }
    }

    impl Sink<Message> for FlakySink {
        type Error = ProtocolError;

        fn poll_ready(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, item: Message) -> Result<(), Self::Error> {
            self.get_mut().buffered.push(item);
            Ok(())
        }

        fn poll_flush(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            let this = self.get_mut();
            let mut log = this.log.lock();
            log.flushes += 1;
            if this.failures > 0 {
                this.failures -= 1;
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe).into()));
            }
            log.written.extend(this.buffered.drain(..).map(|m| m.trailing));
            Poll::Ready(Ok(()))
        }

        fn poll_close(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
        ) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn speaker_requeues_after_exhausting_flush_attempts() {
        let (tx, rx) = mpsc::channel(4);
        let outbox = Arc::new(Mutex::new(Outbox::new(rx)));
        tx.send(Message::privmsg("#c", "first")).await.unwrap();
        tx.send(Message::privmsg("#c", "second")).await.unwrap();
        let (sink, log) = FlakySink::new(u32::MAX);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);

        let started = tokio::time::Instant::now();
        speaker(sink, outbox.clone(), dc_tx, CancellationToken::new()).await;

        assert!(matches!(dc_rx.recv().await, Some(DisconnectReason::WriteFailed(_))));
        assert_eq!(dc_rx.recv().await, None);
        assert_eq!(log.lock().flushes, MAX_WRITE_ATTEMPTS);
        assert!(log.lock().written.is_empty());
        // Linear backoff between attempts: 1x then 2x the step.
        assert!(started.elapsed() >= WRITE_BACKOFF * 3);

        // The next generation sends the failed message first.
        let mut outbox = outbox.lock().await;
        assert_eq!(outbox.pending(), 1);
        assert_eq!(outbox.next().await.unwrap().trailing, "first");
        assert_eq!(outbox.next().await.unwrap().trailing, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn speaker_recovers_from_transient_flush_failure() {
        let (tx, rx) = mpsc::channel(4);
        let outbox = Arc::new(Mutex::new(Outbox::new(rx)));
        tx.send(Message::privmsg("#c", "hello")).await.unwrap();
        let (sink, log) = FlakySink::new(MAX_WRITE_ATTEMPTS - 1);
        let (dc_tx, mut dc_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(speaker(sink, outbox.clone(), dc_tx, cancel.clone()));
        for _ in 0..100 {
            if !log.lock().written.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(log.lock().written, vec!["hello"]);
        assert_eq!(log.lock().flushes, MAX_WRITE_ATTEMPTS);

        cancel.cancel();
        task.await.unwrap();
        assert_eq!(dc_rx.recv().await, None);
        assert_eq!(outbox.lock().await.pending(), 0);
    }

    #[test]
    fn disconnect_reason_display() {
        assert_eq!(DisconnectReason::PingTimeout.to_string(), "ping timeout");
        assert_eq!(
            DisconnectReason::ServerError("bye".into()).to_string(),
            "server error: bye"
        );
    }
}
