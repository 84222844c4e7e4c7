//! External encoder boundary.
//!
//! Everything that spawns `ffmpeg`/`ffprobe` lives here; the assembly stages only build argument
//! lists and hand them to an [`invoker::Encoder`].

/// Encoder trait and the system `ffmpeg` implementation.
pub mod invoker;
/// `ffprobe`-based stream and duration probing.
pub mod probe;
