//! Small utilities shared by every codec crate in the workspace.
//!
//! This mirrors the role `zenit_utils` plays for the rendering engine this
//! toolkit's structure is borrowed from: a grab-bag of tiny, dependency-free
//! helpers that every other crate in the workspace pulls in.

pub mod packed;
pub mod seekable_take;

pub use packed::{PackedData, PackedReadExt, PackedWriteExt};
pub use seekable_take::{SeekableTake, SeekableTakeExt};

/// Alias used pervasively across this workspace's public APIs.
pub type AnyResult<T = (), E = anyhow::Error> = Result<T, E>;

/// Turns any `anyhow`-compatible error into an `Ok` discard; used at points
/// where a function needs to unify the success type of several fallible
/// branches into `()`.
pub fn ok() -> AnyResult {
    Ok(())
}

/// Rounds `n` up to the next multiple of `alignment`.
///
/// `alignment` must be a power of two.
///
/// ```
/// assert_eq!(mt_utils::align(0, 16), 0);
/// assert_eq!(mt_utils::align(1, 16), 16);
/// assert_eq!(mt_utils::align(16, 16), 16);
/// assert_eq!(mt_utils::align(17, 16), 32);
/// ```
pub fn align(n: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (n + alignment - 1) & !(alignment - 1)
}

/// Packs up to 4 ASCII bytes of `s` into a little-endian `u32`, matching how
/// four-character-code tags are stored on the wire in most of this toolkit's
/// binary formats (e.g. `"DBPF"`, `"DATA"`).
///
/// ```
/// assert_eq!(mt_utils::string_as_u32("DATA"), 0x41544144);
/// ```
pub const fn string_as_u32(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut out = 0u32;
    let mut i = 0;
    while i < bytes.len() && i < 4 {
        out |= (bytes[i] as u32) << (i * 8);
        i += 1;
    }
    out
}
