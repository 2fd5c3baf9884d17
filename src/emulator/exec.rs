//! One-shot exec emulation.

/// Fabricates the full output for an exec request whose command text was
/// `command_len` bytes: random junk sized on the command length, then a
/// single newline. An empty command yields just the newline.
pub fn fabricate_output(command_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(command_len * 4 + 1);
    super::write_junk(command_len, &mut out);
    out.push(b'\n');
    out
}
