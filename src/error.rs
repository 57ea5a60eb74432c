// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use crate::pixel_formats::PixelFormat;
use crate::region::Box3;
use std::fmt::Display;

/// Errors produced by pixel transfer operations.
///
/// Every variant is reported before any native call that would leave the
/// context in a corrupted state; no operation is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// A source or destination box does not lie within the buffer's extent.
    OutOfRange { requested: Box3, extent: Box3 },
    /// Compressed data was not consecutive, or not in the buffer's exact
    /// storage format. Compressed transfers cannot repack sub-rectangles.
    CompressedTransferLayout,
    /// A download was requested for less than the buffer's whole extent.
    PartialDownload {
        requested: (u32, u32, u32),
        extent: (u32, u32, u32),
    },
    /// The format has no transfer layout the driver accepts from client
    /// memory. Callers normally never see this: the generic blit paths
    /// convert such data before it reaches `upload`.
    NoNativeTransferFormat(PixelFormat),
    /// The operation is not meaningful for this buffer variant.
    Unsupported(&'static str),
    /// A native resource could not be created. Not independently modeled;
    /// the driver's message is propagated unchanged.
    Driver(String),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferError::OutOfRange { requested, extent } => {
                write!(f, "box {:?} out of range for extent {:?}", requested, extent)
            }
            TransferError::CompressedTransferLayout => {
                write!(f, "compressed images must be consecutive, in the storage format")
            }
            TransferError::PartialDownload { requested, extent } => write!(
                f,
                "only download of the entire buffer is supported (requested {:?} of {:?})",
                requested, extent
            ),
            TransferError::NoNativeTransferFormat(format) => {
                write!(f, "no native transfer format for {:?}", format)
            }
            TransferError::Unsupported(what) => write!(f, "{}", what),
            TransferError::Driver(e) => write!(f, "{}", e),
        }
    }
}
