//! Relocation of uploaded images embedded in post bodies.
//!
//! Reference discovery sits behind [`ReferencePattern`] so the copy pass and the link
//! rewrite pass can be tested against the regex patterns independently.

mod patterns;
mod relocate;

pub use patterns::{
  ReferencePattern, UploadPattern, UploadReference, absolute_upload_pattern, bare_upload_pattern,
};
pub use relocate::{AssetRelocator, RelocatedBody};
