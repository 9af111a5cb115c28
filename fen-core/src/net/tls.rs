//! TLS transport: blocking connect and handshake, non-blocking steady state.
//!
//! One process-wide client config (system trust roots, verification on);
//! per-connection streams own their socket. The handshake runs on a
//! blocking socket; once the caller is done with request/response setup it
//! flips the socket to non-blocking and reads surface `WouldBlock`.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use tracing::debug;

use crate::config::constants::REST_CONNECT_TIMEOUT_MS;

static TLS_CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

/// Build (once) the process-wide client config from the system trust store.
fn client_config() -> Result<Arc<ClientConfig>> {
    if let Some(cfg) = TLS_CONFIG.get() {
        return Ok(cfg.clone());
    }
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs()
        .context("tls: cannot load system trust roots")?;
    let (added, _ignored) = roots.add_parsable_certificates(native);
    if added == 0 {
        bail!("tls: system trust store is empty");
    }
    let cfg = Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    );
    Ok(TLS_CONFIG.get_or_init(|| cfg).clone())
}

fn set_keepalive(sock: &TcpStream) -> std::io::Result<()> {
    let one: libc::c_int = 1;
    let rc = unsafe {
        libc::setsockopt(
            sock.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_KEEPALIVE,
            &one as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// A TLS connection over TCP.
pub struct TlsStream {
    stream: StreamOwned<ClientConnection, TcpStream>,
    host: String,
}

impl TlsStream {
    /// Resolve, connect (5 s timeout, TCP_NODELAY + SO_KEEPALIVE), and run
    /// the TLS handshake to completion. The socket is left blocking; call
    /// [`set_nonblocking`](Self::set_nonblocking) once setup traffic is done.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let timeout = Duration::from_millis(REST_CONNECT_TIMEOUT_MS);
        let addrs: Vec<_> = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("tls: cannot resolve {}:{}", host, port))?
            .collect();

        let mut last_err = anyhow!("tls: no addresses for {}", host);
        let mut sock = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(s) => {
                    sock = Some(s);
                    break;
                }
                Err(e) => last_err = anyhow!("tls: connect {} failed: {}", addr, e),
            }
        }
        let sock = sock.ok_or(last_err)?;

        sock.set_nodelay(true).context("tls: TCP_NODELAY failed")?;
        set_keepalive(&sock).context("tls: SO_KEEPALIVE failed")?;

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| anyhow!("tls: invalid server name {}", host))?;
        let conn = ClientConnection::new(client_config()?, server_name)
            .context("tls: client connection setup failed")?;
        let mut stream = StreamOwned::new(conn, sock);

        // Blocking socket: drive the handshake synchronously.
        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .with_context(|| format!("tls: handshake with {} failed", host))?;
        }
        debug!("tls: handshake complete with {}:{}", host, port);

        Ok(Self {
            stream,
            host: host.to_string(),
        })
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> std::io::Result<()> {
        self.stream.sock.set_nonblocking(nonblocking)
    }

    /// Read decrypted bytes. On a non-blocking socket this returns
    /// `WouldBlock` when neither buffered plaintext nor socket data is
    /// available; `Ok(0)` means the peer closed.
    #[inline]
    pub fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf)
    }

    /// Write the whole buffer, pumping TLS records to the socket. Brief
    /// `WouldBlock` stalls are retried; a stall past the deadline is an
    /// error (the connection is wedged, not slow).
    pub fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        // Plaintext goes into the connection buffer in one shot; frames we
        // send are far below rustls's buffer limit.
        self.stream.conn.writer().write_all(buf)?;

        let deadline = Instant::now() + Duration::from_secs(5);
        while self.stream.conn.wants_write() {
            match self.stream.conn.write_tls(&mut self.stream.sock) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "tls: write stalled",
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn raw_fd(&self) -> RawFd {
        self.stream.sock.as_raw_fd()
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}
