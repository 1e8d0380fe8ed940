//! Archive protection through block checksums and single-strip XOR parity.
//!
//! [`encode::generate`] writes a digest sidecar and a regen file next to the
//! archive, [`verify::verify`] re-checks the whole-file digest, and
//! [`repair::regenerate`] finds corrupted checksum blocks and restores them
//! by bit-flip search against the stored parity.

pub mod checksum;
pub mod combinations;
pub mod digest;
pub mod encode;
pub mod error;
pub mod format;
pub mod layout;
pub mod parity;
pub mod patch;
pub mod progress;
pub mod repair;
pub mod verify;

pub use digest::DigestAlgorithm;
pub use encode::{generate, GenerateConfig, GenerateReport};
pub use error::{Error, Result};
pub use format::{inspect, InspectReport};
pub use layout::Layout;
pub use repair::{regenerate, RegenReport, RegenerateConfig};
pub use verify::{verify, VerifyReport};
