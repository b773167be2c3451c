//! Commonly used types for the firehose block streaming service.
//!
//! This crate has no I/O: it describes the block references handed out by a block tracker and the
//! bundle arithmetic used to pick an aligned replay point in the historical block store.

#![doc(issue_tracker_base_url = "https://github.com/streamingfast/firehose-core/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod block;
mod bundle;

pub use block::{BlockRef, BlockRefTarget};
pub use bundle::{
    bundle_start, previous_bundle, same_bundle, DEFAULT_BUNDLE_SIZE,
    DEFAULT_FIRST_STREAMABLE_BLOCK,
};
