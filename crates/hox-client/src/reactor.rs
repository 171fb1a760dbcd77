//! The background task that owns the TCP connection.
//!
//! One loop iteration waits for whichever comes first: a command, the
//! socket becoming readable, or the poll interval elapsing. It handles that
//! wake-up and then runs [`Reactor::check_for_work`], which sends `LOGIN`
//! on a fresh connection and carries out a requested disconnect (sending
//! `LOGOUT` first when logged in).
//!
//! Nothing outside this task touches the socket or the inbound buffer.

use std::io;

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, info, trace, warn};

use hox_core::frame::FrameCodec;
use hox_core::request::Request;

use crate::config::{ClientConfig, Credentials};
use crate::transport::{ConnectionState, LifecycleCode, TransportCommand, TransportEvent};

const READ_CHUNK: usize = 4096;

/// Why the loop woke up.
enum Wake {
    Command(Option<TransportCommand>),
    Readable(io::Result<()>),
    Tick,
}

/// How a drain of the socket ended.
enum ReadOutcome {
    Drained,
    Eof,
    Failed(io::Error),
}

pub(crate) struct Reactor {
    config: ClientConfig,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: ConnectionState,
    stream: Option<TcpStream>,
    credentials: Option<Credentials>,
    disconnect_requested: bool,
    inbound: BytesMut,
    codec: FrameCodec,
}

impl Reactor {
    pub(crate) fn new(
        config: ClientConfig,
        commands: mpsc::UnboundedReceiver<TransportCommand>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            config,
            commands,
            events,
            state: ConnectionState::None,
            stream: None,
            credentials: None,
            disconnect_requested: false,
            inbound: BytesMut::with_capacity(READ_CHUNK),
            codec: FrameCodec::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let wake = match &self.stream {
                Some(stream) => tokio::select! {
                    cmd = self.commands.recv() => Wake::Command(cmd),
                    ready = stream.readable() => Wake::Readable(ready),
                    _ = sleep(self.config.poll_interval) => Wake::Tick,
                },
                None => Wake::Command(self.commands.recv().await),
            };

            match wake {
                Wake::Command(Some(command)) => self.handle_command(command).await,
                Wake::Command(None) => break,
                Wake::Readable(Ok(())) => self.read_available(),
                Wake::Readable(Err(e)) => self.fail(e),
                Wake::Tick => trace!("poll tick"),
            }

            self.check_for_work().await;

            if self.events.is_closed() {
                debug!("event receiver dropped, stopping transport");
                break;
            }
        }

        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        debug!("transport task finished");
    }

    // -- commands -----------------------------------------------------------

    async fn handle_command(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::Connect(credentials) => {
                if self.state != ConnectionState::None {
                    debug!(state = ?self.state, "connect ignored, already connecting or connected");
                    return;
                }
                self.credentials = Some(credentials);
                self.connect().await;
            }
            TransportCommand::Disconnect => {
                if self.stream.is_none() {
                    debug!("disconnect ignored, no connection");
                    return;
                }
                self.disconnect_requested = true;
            }
            TransportCommand::Send(request) => {
                if self.stream.is_none() {
                    warn!(op = request.op(), "no connection, request dropped");
                    return;
                }
                self.write_request(&request).await;
            }
        }
    }

    async fn connect(&mut self) {
        self.state = ConnectionState::Connecting;
        let address = self.config.address();
        info!(%address, "connecting");

        let resolved = match lookup_host(&address).await {
            Ok(mut addrs) => addrs.next(),
            Err(e) => {
                warn!(%address, error = %e, "address lookup failed");
                None
            }
        };
        let Some(addr) = resolved else {
            self.state = ConnectionState::None;
            self.emit(TransportEvent::Lifecycle(LifecycleCode::UnresolvedAddress));
            return;
        };

        match timeout(self.config.connect_timeout, TcpStream::connect(addr)).await {
            Err(_) => {
                warn!(%addr, timeout = ?self.config.connect_timeout, "connect timed out");
                self.state = ConnectionState::None;
                self.emit(TransportEvent::Lifecycle(LifecycleCode::ConnectTimeout));
            }
            Ok(Err(e)) => {
                warn!(%addr, error = %e, "connect failed");
                self.state = ConnectionState::None;
                self.emit(TransportEvent::Lifecycle(LifecycleCode::IoError));
            }
            Ok(Ok(stream)) => {
                info!(%addr, "connected");
                self.stream = Some(stream);
                self.inbound.clear();
                self.codec.reset();
                self.disconnect_requested = false;
                self.state = ConnectionState::Connected;
                self.emit(TransportEvent::Lifecycle(LifecycleCode::Connected));
            }
        }
    }

    // -- periodic work ------------------------------------------------------

    async fn check_for_work(&mut self) {
        if self.stream.is_none() {
            return;
        }

        if self.state == ConnectionState::Connected
            && let Some(credentials) = &self.credentials
        {
            let login = Request::Login {
                version: self.config.app_version.clone(),
                password: credentials.password.clone(),
            };
            if self.write_request(&login).await {
                self.state = ConnectionState::Authenticated;
            }
        }

        if self.disconnect_requested && self.stream.is_some() {
            if self.state == ConnectionState::Authenticated {
                self.write_request(&Request::Logout).await;
            }
            if let Some(mut stream) = self.stream.take() {
                let _ = stream.shutdown().await;
                info!("disconnected");
                self.close_with(LifecycleCode::Disconnected);
            }
        }
    }

    // -- I/O ----------------------------------------------------------------

    /// Render and fully write one request. Returns whether it was written.
    async fn write_request(&mut self, request: &Request) -> bool {
        let pid = self
            .credentials
            .as_ref()
            .map(|c| c.pid.as_str())
            .unwrap_or_default();
        let line = request.render(pid);

        let mut out = BytesMut::new();
        if let Err(e) = self.codec.encode(line, &mut out) {
            warn!(error = %e, "failed to encode request");
            return false;
        }
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        debug!(op = request.op(), "send");
        let written = stream.write_all(&out).await;
        match written {
            Ok(()) => true,
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    /// Read until the socket would block, then hand over every complete
    /// frame. An orderly EOF closes the connection after delivery.
    fn read_available(&mut self) {
        let Some(stream) = self.stream.as_ref() else {
            return;
        };

        let outcome = loop {
            self.inbound.reserve(READ_CHUNK);
            match stream.try_read_buf(&mut self.inbound) {
                Ok(0) => break ReadOutcome::Eof,
                Ok(n) => trace!(bytes = n, "read"),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break ReadOutcome::Drained,
                Err(e) => break ReadOutcome::Failed(e),
            }
        };

        self.deliver_frames();

        match outcome {
            ReadOutcome::Drained => {}
            ReadOutcome::Eof => {
                info!("connection closed by server");
                self.close_with(LifecycleCode::Closed);
            }
            ReadOutcome::Failed(e) => self.fail(e),
        }
    }

    fn deliver_frames(&mut self) {
        loop {
            match self.codec.decode(&mut self.inbound) {
                Ok(Some(frame)) => {
                    debug!(%frame, "recv");
                    self.emit(TransportEvent::Frame(frame));
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "frame decode failed");
                    break;
                }
            }
        }
    }

    // -- teardown -----------------------------------------------------------

    fn fail(&mut self, error: io::Error) {
        warn!(error = %error, "connection error");
        self.close_with(LifecycleCode::IoError);
    }

    fn close_with(&mut self, code: LifecycleCode) {
        self.stream = None;
        self.state = ConnectionState::None;
        self.disconnect_requested = false;
        self.inbound.clear();
        self.codec.reset();
        self.emit(TransportEvent::Lifecycle(code));
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            trace!("event receiver gone");
        }
    }
}
