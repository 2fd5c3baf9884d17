//! Session emulation: fabricated responses for exec and shell requests.
//!
//! The emulators never run anything. They answer with random bytes sized
//! relative to what the client sent, which reads as garbage output from a
//! busy machine and keeps unattended scanners engaged.

pub mod exec;
pub mod shell;

use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// Number of junk bytes to emit for an input of `base` bytes.
///
/// Uniformly distributed in `[base, 4 * base)`; zero input gets zero junk.
pub fn junk_len(base: usize) -> usize {
    if base == 0 {
        return 0;
    }
    base + OsRng.gen_range(0..3 * base)
}

/// Appends `junk_len(base)` random bytes to `out`.
pub fn write_junk(base: usize, out: &mut Vec<u8>) {
    let n = junk_len(base);
    let start = out.len();
    out.resize(start + n, 0);
    OsRng.fill_bytes(&mut out[start..]);
}
