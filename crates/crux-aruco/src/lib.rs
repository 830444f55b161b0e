//! ArUco marker dictionaries, detection and decoding.
//!
//! This crate focuses on:
//! - embedded built-in dictionaries (compiled into the binary),
//! - matching observed marker codes against those dictionaries,
//! - finding dark square candidates in a grayscale image and decoding them,
//! - synthesizing marker bitmaps (printing, tests).
//!
//! It does **not** blur, pad or pick a "best" marker; that policy lives in
//! `crux-marker`.

pub mod builtins;
mod candidates;
mod decode;
mod detect;
mod dictionary;
mod draw;
mod matcher;
mod threshold;

pub use candidates::{find_square_candidates, CandidateParams, QuadCandidate};
pub use decode::{decode_quad, DecodeConfig, QuadDecode};
pub use detect::{detect_markers, ArucoDetectParams, ArucoMarkerDetection};
pub use dictionary::Dictionary;
pub use draw::draw_marker;
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use threshold::local_mean_dark_mask;
