//! Asynchronous duplex socket transport (spec §4.3, §4.4).
//!
//! Each direction of a connection (inbound bytes from the peer, outbound
//! bytes to the peer) is a fixed-size ring buffer serviced by its own
//! background thread: a `ReaderDaemon` keeps pulling bytes off the wire
//! into the inbound ring whenever there's room, a `WriterDaemon` keeps
//! draining the outbound ring onto the wire whenever there's data. The
//! application only ever touches `Socket::read`/`write`/`flush` — both
//! calls block until the ring can satisfy them in full, trading a copy
//! into/out of the ring for never blocking directly on the kernel socket
//! from the application thread.
//!
//! The reader's "room available" side and the writer's "bytes queued"
//! side are tracked with [`Loose`](crate::nsemaphore::Loose) semaphores so
//! that [`Socket::flush`] can force a short write out immediately rather
//! than waiting for a full batch to accumulate; the two sides the
//! application waits on directly (`read`'s data count, `write`'s space
//! count) are [`Strict`](crate::nsemaphore::Strict), since the app always
//! needs the exact number of bytes it asked for.

use std::io::Write as _;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::{FromRawFd, RawFd};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::circular::Buffer;
use crate::error::{ExchangeError, Result};
use crate::nsemaphore::{Loose, Strict};

/// Common interface the two semaphore flavors present to the daemon loops,
/// so `ReaderDaemon`/`WriterDaemon` can be written once and instantiated
/// for either direction.
trait WaitSemaphore: Send + Sync {
    fn wait(&self, n: usize);
    fn load(&self) -> usize;
    fn post(&self, n: usize);
    fn consume(&self, n: usize);
    fn terminate(&self);
}

impl WaitSemaphore for Strict {
    fn wait(&self, n: usize) {
        Strict::wait(self, n)
    }
    fn load(&self) -> usize {
        Strict::load(self)
    }
    fn post(&self, n: usize) {
        Strict::post(self, n)
    }
    fn consume(&self, n: usize) {
        Strict::consume(self, n)
    }
    fn terminate(&self) {
        Strict::terminate(self)
    }
}

impl WaitSemaphore for Loose {
    fn wait(&self, n: usize) {
        let _ = Loose::wait(self, n);
    }
    fn load(&self) -> usize {
        Loose::load(self)
    }
    fn post(&self, n: usize) {
        Loose::post(self, n)
    }
    fn consume(&self, n: usize) {
        Loose::consume(self, n)
    }
    fn terminate(&self) {
        Loose::terminate(self)
    }
}

/// A ring's write cursor, mod `N`, plus the semaphore tracking how much of
/// the ring is currently usable from this side.
struct Interval<S, const N: usize> {
    cursor: AtomicUsize,
    sem: S,
}

impl<S, const N: usize> Interval<S, N> {
    fn offset(&self) -> usize {
        self.cursor.load(Ordering::SeqCst) % N
    }

    fn advance(&self, n: usize) {
        self.cursor.fetch_add(n, Ordering::SeqCst);
    }
}

struct ReaderState<const N: usize> {
    buffer: Mutex<Buffer<N>>,
    data: Interval<Strict, N>,
    space: Interval<Loose, N>,
}

struct WriterState<const N: usize> {
    buffer: Mutex<Buffer<N>>,
    data: Interval<Loose, N>,
    space: Interval<Strict, N>,
}

fn reader_daemon_body<const N: usize>(
    mut stream: TcpStream,
    state: Arc<ReaderState<N>>,
    flush_threshold: usize,
) {
    loop {
        WaitSemaphore::wait(&state.space.sem, flush_threshold);
        let offset = state.space.offset();
        let len = WaitSemaphore::load(&state.space.sem).min(N);
        if len == 0 {
            return;
        }
        let ret = match state.buffer.lock().unwrap().read_from(&mut stream, offset, len) {
            Ok(0) | Err(_) => {
                // Peer gone: wake whatever is blocked on either side of this
                // ring rather than leaving it parked forever.
                WaitSemaphore::terminate(&state.data.sem);
                WaitSemaphore::terminate(&state.space.sem);
                return;
            }
            Ok(ret) => ret,
        };
        state.space.advance(ret);
        WaitSemaphore::consume(&state.space.sem, ret);
        WaitSemaphore::post(&state.data.sem, ret);
    }
}

fn writer_daemon_body<const N: usize>(
    mut stream: TcpStream,
    state: Arc<WriterState<N>>,
    flush_threshold: usize,
) {
    loop {
        WaitSemaphore::wait(&state.data.sem, flush_threshold);
        let offset = state.data.offset();
        let len = WaitSemaphore::load(&state.data.sem).min(N);
        if len == 0 {
            return;
        }
        let ret = match state.buffer.lock().unwrap().write_to(&mut stream, offset, len) {
            Ok(0) | Err(_) => {
                WaitSemaphore::terminate(&state.space.sem);
                WaitSemaphore::terminate(&state.data.sem);
                return;
            }
            Ok(ret) => ret,
        };
        state.data.advance(ret);
        WaitSemaphore::consume(&state.data.sem, ret);
        WaitSemaphore::post(&state.space.sem, ret);
    }
}

/// A connected, ring-buffered duplex socket. `N` is the capacity in bytes
/// of each direction's ring (spec's `SOCKET_BUFFER_SIZE`).
pub struct Socket<const N: usize> {
    stream: TcpStream,
    reader_state: Arc<ReaderState<N>>,
    writer_state: Arc<WriterState<N>>,
    reader_thread: Option<JoinHandle<()>>,
    writer_thread: Option<JoinHandle<()>>,
    closed: bool,
}

impl<const N: usize> Socket<N> {
    /// Connect to `host:port` and start the reader/writer daemon threads.
    pub fn connect(host: &str, port: &str, flush_threshold: usize) -> Result<Self> {
        let addr = resolve_one(host, port)?;
        let stream = TcpStream::connect(addr).map_err(ExchangeError::Socket)?;
        Self::from_stream(stream, flush_threshold)
    }

    fn from_stream(stream: TcpStream, flush_threshold: usize) -> Result<Self> {
        stream.set_nodelay(true).map_err(ExchangeError::Socket)?;
        let reader_state = Arc::new(ReaderState {
            buffer: Mutex::new(Buffer::new()),
            data: Interval {
                cursor: AtomicUsize::new(0),
                sem: Strict::new(0),
            },
            space: Interval {
                cursor: AtomicUsize::new(0),
                sem: Loose::new(N),
            },
        });
        let writer_state = Arc::new(WriterState {
            buffer: Mutex::new(Buffer::new()),
            data: Interval {
                cursor: AtomicUsize::new(0),
                sem: Loose::new(0),
            },
            space: Interval {
                cursor: AtomicUsize::new(0),
                sem: Strict::new(N),
            },
        });

        let reader_thread = {
            let stream = stream.try_clone().map_err(ExchangeError::Socket)?;
            let state = Arc::clone(&reader_state);
            thread::spawn(move || reader_daemon_body(stream, state, flush_threshold))
        };
        let writer_thread = {
            let stream = stream.try_clone().map_err(ExchangeError::Socket)?;
            let state = Arc::clone(&writer_state);
            thread::spawn(move || writer_daemon_body(stream, state, flush_threshold))
        };

        Ok(Socket {
            stream,
            reader_state,
            writer_state,
            reader_thread: Some(reader_thread),
            writer_thread: Some(writer_thread),
            closed: false,
        })
    }

    fn from_accepted(stream: TcpStream, flush_threshold: usize) -> Result<Self> {
        Self::from_stream(stream, flush_threshold)
    }

    /// Block until `buf.len()` bytes have arrived, then fill `buf` with
    /// them. Returns `Err(ConnectionLost)` if the peer disconnects before
    /// that many bytes ever arrive.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len();
        if len == 0 {
            return Ok(0);
        }
        self.reader_state.data.sem.wait(len);
        let available = self.reader_state.data.sem.load();
        if available < len {
            return Err(ExchangeError::ConnectionLost);
        }
        let offset = self.reader_state.data.offset();
        self.reader_state.data.sem.consume(len);
        self.reader_state.data.advance(len);
        self.reader_state.buffer.lock().unwrap().read(buf, offset, len);
        self.reader_state.space.sem.post(len);
        Ok(len)
    }

    /// Block until there's room for all of `buf` in the outbound ring, then
    /// queue it. Does not guarantee the bytes have reached the peer — call
    /// [`flush`](Self::flush) to force that.
    ///
    /// A write larger than the ring's own capacity can never be queued, so
    /// it instead grabs the ring exclusively (waits for it to drain
    /// completely) and writes straight to the socket, bypassing the buffer.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let len = buf.len();
        if len == 0 {
            return Ok(0);
        }
        if len > N {
            return self.write_direct(buf);
        }
        self.writer_state.space.sem.wait(len);
        let available = self.writer_state.space.sem.load();
        if available < len {
            return Err(ExchangeError::ConnectionLost);
        }
        let offset = self.writer_state.space.offset();
        self.writer_state.space.sem.consume(len);
        self.writer_state.space.advance(len);
        self.writer_state.buffer.lock().unwrap().write(buf, offset, len);
        self.writer_state.data.sem.post(len);
        Ok(len)
    }

    /// Wait for the writer ring to be entirely empty, then write `buf`
    /// directly to the fd, bypassing the ring and its daemon thread. Used
    /// only for writes too large for the ring to ever hold at once.
    fn write_direct(&self, buf: &[u8]) -> Result<usize> {
        self.writer_state.space.sem.wait(N);
        let available = self.writer_state.space.sem.load();
        if available < N {
            return Err(ExchangeError::ConnectionLost);
        }
        self.writer_state.space.sem.consume(N);
        let mut stream = self.stream.try_clone().map_err(ExchangeError::Socket)?;
        let mut written = 0;
        while written < buf.len() {
            match stream.write(&buf[written..]) {
                Ok(0) => {
                    self.writer_state.space.sem.post(N);
                    return Err(ExchangeError::ConnectionLost);
                }
                Ok(n) => written += n,
                Err(err) => {
                    self.writer_state.space.sem.post(N);
                    return Err(ExchangeError::Socket(err));
                }
            }
        }
        self.writer_state.space.sem.post(N);
        Ok(written)
    }

    /// Wake the writer daemon even if fewer than `SOCKET_FLUSH_THRESHOLD`
    /// bytes are queued, so whatever is pending goes out now.
    pub fn flush(&self) {
        self.writer_state.data.sem.flush();
    }

    /// Whether a subsequent `read` call would return immediately.
    pub fn read_ready(&self) -> bool {
        self.reader_state.data.sem.load() > 0
    }

    /// Shut down the connection and join the daemon threads. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.reader_state.data.sem.terminate();
        self.reader_state.space.sem.terminate();
        self.writer_state.data.sem.terminate();
        self.writer_state.space.sem.terminate();
        if let Some(t) = self.reader_thread.take() {
            let _ = t.join();
        }
        if let Some(t) = self.writer_thread.take() {
            let _ = t.join();
        }
    }
}

impl<const N: usize> Drop for Socket<N> {
    fn drop(&mut self) {
        self.close();
    }
}

/// A bound, listening socket that hands off accepted connections as
/// [`Socket`]s.
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind and listen on `host:port`.
    ///
    /// Goes through raw `libc` calls rather than [`TcpListener::bind`]
    /// because `SO_REUSEADDR` must be set *before* `bind`, which the safe
    /// std API has no hook for.
    pub fn bind(host: &str, port: &str) -> Result<Self> {
        let addr = resolve_one(host, port)?;
        let fd = bind_and_listen(addr).map_err(ExchangeError::Socket)?;
        let inner = unsafe { TcpListener::from_raw_fd(fd) };
        Ok(Listener { inner })
    }

    /// Accept one connection and start its daemon threads.
    pub fn accept<const N: usize>(&self, flush_threshold: usize) -> Result<(Socket<N>, SocketAddr)> {
        let (stream, addr) = self.inner.accept().map_err(ExchangeError::Socket)?;
        let socket = Socket::from_accepted(stream, flush_threshold)?;
        Ok((socket, addr))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(ExchangeError::Socket)
    }
}

fn resolve_one(host: &str, port: &str) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| ExchangeError::AddressResolution {
            host: host.to_string(),
            port: port.to_string(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| ExchangeError::AddressResolution {
            host: host.to_string(),
            port: port.to_string(),
            reason: "no addresses returned".to_string(),
        })
}

fn bind_and_listen(addr: SocketAddr) -> std::io::Result<RawFd> {
    unsafe {
        let domain = match addr {
            SocketAddr::V4(_) => libc::AF_INET,
            SocketAddr::V6(_) => libc::AF_INET6,
        };
        let fd = libc::socket(domain, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let on: libc::c_int = 1;
        let ret = libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &on as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }
        let (sockaddr, len) = sockaddr_bytes(&addr);
        let ret = libc::bind(fd, sockaddr.as_ptr() as *const libc::sockaddr, len);
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }
        let ret = libc::listen(fd, 128);
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(err);
        }
        Ok(fd)
    }
}

fn sockaddr_bytes(addr: &SocketAddr) -> (Vec<u8>, libc::socklen_t) {
    match addr {
        SocketAddr::V4(v4) => unsafe {
            let mut sin: libc::sockaddr_in = std::mem::zeroed();
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_port = v4.port().to_be();
            sin.sin_addr = libc::in_addr {
                s_addr: u32::from_ne_bytes(v4.ip().octets()),
            };
            let bytes = std::slice::from_raw_parts(
                &sin as *const libc::sockaddr_in as *const u8,
                std::mem::size_of::<libc::sockaddr_in>(),
            )
            .to_vec();
            (bytes, std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t)
        },
        SocketAddr::V6(v6) => unsafe {
            let mut sin6: libc::sockaddr_in6 = std::mem::zeroed();
            sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sin6.sin6_port = v6.port().to_be();
            sin6.sin6_addr = libc::in6_addr {
                s6_addr: v6.ip().octets(),
            };
            sin6.sin6_scope_id = v6.scope_id();
            let bytes = std::slice::from_raw_parts(
                &sin6 as *const libc::sockaddr_in6 as *const u8,
                std::mem::size_of::<libc::sockaddr_in6>(),
            )
            .to_vec();
            (bytes, std::mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t)
        },
    }
}
