// Oxygen - core/wire.rs
//
// Bit-exact payload encoders for the socket executors. Pure byte
// transformations; the drivers in app::drivers own the sockets.
//
// MacSploit frame:
//   [0..8)   zero
//   [8..12)  u32 little-endian = script length + 1
//   [12..16) zero
//   script bytes, then a single NUL
//
// Opiumware payload:
//   zlib(DEFLATE, default level) of "OpiumwareScript " ++ script bytes

use crate::util::constants::{
    MACSPLOIT_HEADER_LEN, MACSPLOIT_LENGTH_OFFSET, OPIUMWARE_SCRIPT_PREFIX,
};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Build the 16-byte MacSploit header for a script of `script_len` bytes.
///
/// Fails with `InvalidInput` when `script_len + 1` does not fit in a `u32`.
pub fn macsploit_header(script_len: usize) -> io::Result<[u8; MACSPLOIT_HEADER_LEN]> {
    let declared = script_len
        .checked_add(1)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("script of {script_len} bytes exceeds the 32-bit length field"),
            )
        })?;

    let mut header = [0u8; MACSPLOIT_HEADER_LEN];
    header[MACSPLOIT_LENGTH_OFFSET..MACSPLOIT_LENGTH_OFFSET + 4]
        .copy_from_slice(&declared.to_le_bytes());
    Ok(header)
}

/// Encode a complete MacSploit frame: header ++ script ++ [0x00].
pub fn encode_macsploit(script: &[u8]) -> io::Result<Vec<u8>> {
    let header = macsploit_header(script.len())?;
    let mut frame = Vec::with_capacity(MACSPLOIT_HEADER_LEN + script.len() + 1);
    frame.extend_from_slice(&header);
    frame.extend_from_slice(script);
    frame.push(0);
    Ok(frame)
}

/// Encode an Opiumware payload: the prefixed script, zlib-compressed.
pub fn encode_opiumware(script: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(OPIUMWARE_SCRIPT_PREFIX.as_bytes())?;
    encoder.write_all(script)?;
    encoder.finish()
}
