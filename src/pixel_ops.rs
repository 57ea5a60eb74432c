// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! CPU-side pixel conversion and scaling, as a collaborator seam.
//!
//! The transfer engine needs two whole-image operations it does not
//! implement itself: bulk format conversion and filtered resampling. Both
//! are supplied by the embedding engine through [`PixelOps`]; the filter
//! math is deliberately out of this crate.

use crate::TransferError;
use crate::region::{PixelView, PixelViewMut};

/// Resampling filter kinds the transfer paths request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Point sampling. Exact, cheapest.
    Nearest,
    /// Linear filtering; the default for CPU-side blit scaling.
    Bilinear,
}

/// Bulk CPU pixel operations consumed by the transfer engine.
///
/// Implementations may assume `src` and `dst` do not alias; the engine
/// always hands them distinct allocations.
pub trait PixelOps {
    /// Converts every pixel of `src` into `dst`'s format. Extents of the
    /// two views are equal when called from this crate.
    fn convert(&self, src: &PixelView<'_>, dst: &mut PixelViewMut<'_>) -> Result<(), TransferError>;

    /// Resizes `src` into `dst` with the given filter, converting formats
    /// as a side effect when they differ.
    fn scale(
        &self,
        src: &PixelView<'_>,
        dst: &mut PixelViewMut<'_>,
        filter: Filter,
    ) -> Result<(), TransferError>;
}
