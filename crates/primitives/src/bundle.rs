//! Bundle arithmetic.
//!
//! The historical block store keeps blocks in contiguous, aligned bundles. Any replay point handed
//! to the historical source has to sit on a bundle boundary.

/// Number of blocks per bundle in the historical block store.
pub const DEFAULT_BUNDLE_SIZE: u64 = 100;

/// First block number that can be streamed when the protocol does not define one.
pub const DEFAULT_FIRST_STREAMABLE_BLOCK: u64 = 0;

/// Returns the first block of the bundle containing `block`.
///
/// `bundle_size` must be non zero.
pub const fn bundle_start(block: u64, bundle_size: u64) -> u64 {
    block / bundle_size * bundle_size
}

/// Returns `true` if both blocks fall inside the same bundle.
///
/// `bundle_size` must be non zero.
pub const fn same_bundle(a: u64, b: u64, bundle_size: u64) -> bool {
    a / bundle_size == b / bundle_size
}

/// Rewinds `block` to the boundary of the bundle preceding it.
///
/// Blocks within the first bundle width are returned unchanged since there is nothing to rewind
/// to. Otherwise the result is `block - bundle_size` rounded down to a bundle boundary, clamped up
/// to `first_streamable_block`.
///
/// `bundle_size` must be non zero.
pub const fn previous_bundle(block: u64, bundle_size: u64, first_streamable_block: u64) -> u64 {
    if block <= bundle_size {
        return block
    }

    let rewound = bundle_start(block - bundle_size, bundle_size);
    if rewound < first_streamable_block {
        return first_streamable_block
    }
    rewound
}
