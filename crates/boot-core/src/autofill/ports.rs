use std::{collections::HashSet, net::TcpListener};

use crate::BootError;

/// Give up after this many consecutive already-used answers from the OS.
const MAX_ATTEMPTS: usize = 1000;

/// Hands out ephemeral ports, never the same one twice.
///
/// A port is found by binding `host:0` and releasing it immediately; the number is then
/// remembered so a second request cannot be answered with it before its owner binds it.
#[derive(Debug, Default)]
pub struct PortAllocator {
    used: HashSet<u16>,
}

impl PortAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A free port on `host` that this allocator has not returned before.
    pub fn next(&mut self, host: &str) -> Result<u16, BootError> {
        for _ in 0..MAX_ATTEMPTS {
            let port = available_port(host)?;
            if self.used.insert(port) {
                return Ok(port);
            }
        }
        Err(BootError::Port {
            host: host.to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "no unused ephemeral port returned",
            ),
        })
    }

    /// Mark `port` as taken without probing it.
    pub fn reserve(&mut self, port: u16) {
        self.used.insert(port);
    }

    pub fn used(&self) -> usize {
        self.used.len()
    }
}

fn available_port(host: &str) -> Result<u16, BootError> {
    let port_err = |source| BootError::Port {
        host: host.to_string(),
        source,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let listener = TcpListener::bind((host, 0)).map_err(port_err)?;
    let port = listener.local_addr().map_err(port_err)?.port();
    Ok(port)
}
