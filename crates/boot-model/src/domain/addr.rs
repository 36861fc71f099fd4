use crate::ModelError;

/// Split `host:port` (or `[v6]:port`) into its host and port parts.
///
/// Either side may be empty (`":0"` → `("", "0")`), but the colon is required and a
/// non-empty port must be a number in `0..=65535`.
pub fn split_host_port(addr: &str) -> Result<(String, String), ModelError> {
    let invalid = |reason| ModelError::InvalidAddress {
        addr: addr.to_string(),
        reason,
    };

    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| invalid("missing ']'"))?;
        let port = tail.strip_prefix(':').ok_or_else(|| invalid("missing port"))?;
        (host, port)
    } else {
        let (host, port) = addr.rsplit_once(':').ok_or_else(|| invalid("missing port"))?;
        if host.contains(':') {
            return Err(invalid("too many colons"));
        }
        (host, port)
    };

    if !port.is_empty() && port.parse::<u16>().is_err() {
        return Err(invalid("invalid port"));
    }
    Ok((host.to_string(), port.to_string()))
}

/// Inverse of [`split_host_port`]; IPv6 hosts are bracketed.
pub fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
