use std::net::{TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{read_some, Chunk, TraceSource, TRANSFER_SIZE};

/// Default trace server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default trace server port (orbuculum's SWO output port).
pub const DEFAULT_PORT: u16 = 3443;

/// Split a `host[:port]` server specification.
///
/// A missing or zero port falls back to [`DEFAULT_PORT`]; an empty host falls
/// back to [`DEFAULT_HOST`].
pub fn parse_server(spec: &str) -> Result<(String, u16)> {
    let (host, port) = match spec.split_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| TransportError::InvalidAddress(spec.to_string()))?;
            (host, port)
        }
        None => (spec, DEFAULT_PORT),
    };

    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    let port = if port == 0 { DEFAULT_PORT } else { port };
    Ok((host.to_string(), port))
}

/// Trace source reading from a TCP connection.
///
/// Reads block without a timeout; a stalled peer stalls the caller.
pub struct TcpSource {
    stream: TcpStream,
    buf: Box<[u8]>,
    peer: String,
}

impl TcpSource {
    /// Resolve `host` and connect to the first address that accepts.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let candidates: Vec<_> = (host, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve {
                host: host.to_string(),
            })?
            .collect();
        if candidates.is_empty() {
            return Err(TransportError::Resolve {
                host: host.to_string(),
            });
        }

        let mut last_err = None;
        for candidate in candidates {
            match TcpStream::connect(candidate) {
                Ok(stream) => {
                    info!(%addr, resolved = %candidate, "connected to trace server");
                    return Ok(Self::from_stream(stream, addr));
                }
                Err(err) => {
                    debug!(%candidate, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr,
            source: last_err
                .unwrap_or_else(|| std::io::Error::other("no address accepted the connection")),
        })
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, peer: impl Into<String>) -> Self {
        Self {
            stream,
            buf: vec![0u8; TRANSFER_SIZE].into_boxed_slice(),
            peer: peer.into(),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }
}

impl TraceSource for TcpSource {
    fn next_chunk(&mut self) -> Result<Chunk<'_>> {
        let n = read_some(&mut self.stream, &mut self.buf)?;
        if n == 0 {
            debug!(peer = %self.peer, "connection closed by peer");
            return Ok(Chunk::End);
        }
        Ok(Chunk::Data(&self.buf[..n]))
    }

    fn describe(&self) -> String {
        format!("tcp {}", self.peer)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn parse_host_and_port() {
        assert_eq!(
            parse_server("probe.local:2332").unwrap(),
            ("probe.local".to_string(), 2332)
        );
    }

    #[test]
    fn parse_host_only_uses_default_port() {
        assert_eq!(
            parse_server("probe.local").unwrap(),
            ("probe.local".to_string(), DEFAULT_PORT)
        );
    }

    #[test]
    fn parse_zero_port_uses_default() {
        assert_eq!(
            parse_server("probe.local:0").unwrap(),
            ("probe.local".to_string(), DEFAULT_PORT)
        );
    }

    #[test]
    fn parse_empty_host_uses_default() {
        assert_eq!(
            parse_server(":4000").unwrap(),
            (DEFAULT_HOST.to_string(), 4000)
        );
    }

    #[test]
    fn parse_rejects_bad_port() {
        assert!(matches!(
            parse_server("host:notaport"),
            Err(TransportError::InvalidAddress(_))
        ));
    }

    #[test]
    fn reads_until_peer_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(&[0x0E, 0x0F, 0x10]).unwrap();
        });

        let mut source = TcpSource::connect("127.0.0.1", port).unwrap();
        server.join().unwrap();

        let mut received = Vec::new();
        loop {
            match source.next_chunk().unwrap() {
                Chunk::Data(bytes) => received.extend_from_slice(bytes),
                Chunk::End => break,
                Chunk::Empty => unreachable!("tcp sources never report empty"),
            }
        }
        assert_eq!(received, vec![0x0E, 0x0F, 0x10]);
    }

    #[test]
    fn connect_refused_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = TcpSource::connect("127.0.0.1", port).err().unwrap();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
