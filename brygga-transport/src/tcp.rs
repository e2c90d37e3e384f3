//! Single-client TCP transport with newline-delimited messages.
//!
//! The accept/read loop polls with short timeouts and checks a terminate
//! flag between attempts, so `stop` takes effect within one poll window.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{MessageCallback, Transport};

const ACCEPT_POLL: Duration = Duration::from_millis(100);
const READ_POLL: Duration = Duration::from_millis(250);

pub struct TcpTransport {
    port: u16,
    terminate: Arc<AtomicBool>,
    conn: Arc<Mutex<Option<TcpStream>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    server: Mutex<Option<JoinHandle<()>>>,
}

impl TcpTransport {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            terminate: Arc::new(AtomicBool::new(false)),
            conn: Arc::new(Mutex::new(None)),
            local_addr: Mutex::new(None),
            server: Mutex::new(None),
        }
    }

    /// Bound address once started; useful when the port was 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    fn serve(
        listener: TcpListener,
        terminate: Arc<AtomicBool>,
        conn: Arc<Mutex<Option<TcpStream>>>,
        on_message: MessageCallback,
    ) {
        while !terminate.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    info!(%peer, "scope client connected");
                    Self::pump_client(stream, &terminate, &conn, &on_message);
                    *conn.lock() = None;
                    debug!(%peer, "scope client gone");
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => {
                    error!("accept failed: {e}");
                    break;
                }
            }
        }
        debug!("transport server stopped");
    }

    fn pump_client(
        stream: TcpStream,
        terminate: &AtomicBool,
        conn: &Mutex<Option<TcpStream>>,
        on_message: &MessageCallback,
    ) {
        if let Err(e) = stream.set_nonblocking(false) {
            error!("failed to configure client socket: {e}");
            return;
        }
        if let Err(e) = stream.set_read_timeout(Some(READ_POLL)) {
            error!("failed to set read timeout: {e}");
            return;
        }
        match stream.try_clone() {
            Ok(writer) => *conn.lock() = Some(writer),
            Err(e) => {
                error!("failed to clone client socket: {e}");
                return;
            }
        }

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        while !terminate.load(Ordering::Relaxed) {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break, // client closed the connection
                Ok(_) => {
                    let message = line.trim_end_matches(['\r', '\n']);
                    if !message.is_empty() {
                        on_message(message.to_string());
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => {
                    warn!("client read failed: {e}");
                    break;
                }
            }
        }
    }
}

impl Transport for TcpTransport {
    fn start(&self, on_message: MessageCallback) -> bool {
        let listener = match TcpListener::bind(("0.0.0.0", self.port)) {
            Ok(listener) => listener,
            Err(e) => {
                error!(port = self.port, "failed to bind transport: {e}");
                return false;
            }
        };
        if let Err(e) = listener.set_nonblocking(true) {
            error!("failed to configure listener: {e}");
            return false;
        }
        *self.local_addr.lock() = listener.local_addr().ok();

        let terminate = Arc::clone(&self.terminate);
        let conn = Arc::clone(&self.conn);
        let handle = thread::Builder::new()
            .name("brygga-transport".into())
            .spawn(move || Self::serve(listener, terminate, conn, on_message));
        match handle {
            Ok(handle) => {
                *self.server.lock() = Some(handle);
                true
            }
            Err(e) => {
                error!("failed to spawn transport thread: {e}");
                false
            }
        }
    }

    fn send(&self, message: &str) -> bool {
        let mut guard = self.conn.lock();
        let Some(stream) = guard.as_mut() else {
            warn!("send with no connected client");
            return false;
        };
        let ok = stream
            .write_all(message.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .and_then(|_| stream.flush());
        match ok {
            Ok(()) => true,
            Err(e) => {
                warn!("send failed: {e}");
                *guard = None;
                false
            }
        }
    }

    fn stop(&self) {
        self.terminate.store(true, Ordering::Relaxed);
        if let Some(stream) = self.conn.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        let handle = self.server.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
