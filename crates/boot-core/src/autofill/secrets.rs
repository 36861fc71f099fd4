use rand::{RngCore, rngs::OsRng};

use crate::BootError;

/// `chars` lowercase hex characters drawn from the OS random source.
///
/// An unavailable random source is an error, never an empty or weak secret.
pub fn random_hex(chars: usize) -> Result<String, BootError> {
    let mut buf = vec![0u8; chars.div_ceil(2)];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| BootError::Random(e.to_string()))?;
    let mut out = hex::encode(buf);
    out.truncate(chars);
    Ok(out)
}
