// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The pixel region model: 3D boxes and pixel-data views.
//!
//! Coordinates follow the raster convention:
//!
//! ```text
//!            x
//!       0 ────────▶
//!       │ ┌───────┐
//!     y │ │       │      z (front → back) selects the depth slice
//!       │ │       │
//!       ▼ └───────┘
//! ```
//!
//! A [`Box3`] is a half-open region: `left..right`, `top..bottom`,
//! `front..back`. A [`PixelView`] pairs a box-shaped extent with a pixel
//! format, row/slice pitches (in pixels) and a byte slice; the mutable
//! variant [`PixelViewMut`] is how every CPU-side write happens. Views are
//! pure value semantics plus one aliasing operation, [`PixelView::sub_volume`],
//! which offsets into the same memory; writes through a mutable sub-view
//! are visible in the parent.

use crate::pixel_formats::PixelFormat;

/// A half-open 3D pixel region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Box3 {
    pub left: u32,
    pub top: u32,
    pub front: u32,
    pub right: u32,
    pub bottom: u32,
    pub back: u32,
}

impl Box3 {
    /// A 2D box on the first depth slice.
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Box3 {
            left,
            top,
            front: 0,
            right,
            bottom,
            back: 1,
        }
    }

    pub const fn with_depth(
        left: u32,
        top: u32,
        front: u32,
        right: u32,
        bottom: u32,
        back: u32,
    ) -> Self {
        Box3 {
            left,
            top,
            front,
            right,
            bottom,
            back,
        }
    }

    /// The whole region of a `width`×`height`×`depth` buffer.
    pub const fn from_extent(width: u32, height: u32, depth: u32) -> Self {
        Box3 {
            left: 0,
            top: 0,
            front: 0,
            right: width,
            bottom: height,
            back: depth,
        }
    }

    pub const fn width(&self) -> u32 {
        self.right - self.left
    }

    pub const fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub const fn depth(&self) -> u32 {
        self.back - self.front
    }

    /// Strict subset test: true iff `other` lies entirely within `self`.
    pub const fn contains(&self, other: &Box3) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.front >= self.front
            && other.right <= self.right
            && other.bottom <= self.bottom
            && other.back <= self.back
            && other.left <= other.right
            && other.top <= other.bottom
            && other.front <= other.back
    }

    /// True iff `other` spans the same width/height/depth (position ignored).
    pub const fn same_extent(&self, other: &Box3) -> bool {
        self.width() == other.width()
            && self.height() == other.height()
            && self.depth() == other.depth()
    }
}

/// Computes the byte offset of a box origin and the byte length of the
/// region it spans, given parent pitches. Shared by the two view types.
fn sub_volume_span(
    parent_format: PixelFormat,
    row_pitch: u32,
    slice_pitch: u32,
    region: &Box3,
) -> (usize, usize) {
    let bpp = parent_format
        .bytes_per_pixel()
        .expect("pitched views require an uncompressed format") as usize;
    let offset = (region.front as usize * slice_pitch as usize
        + region.top as usize * row_pitch as usize
        + region.left as usize)
        * bpp;
    let len = if region.width() == 0 || region.height() == 0 || region.depth() == 0 {
        0
    } else {
        ((region.depth() as usize - 1) * slice_pitch as usize
            + (region.height() as usize - 1) * row_pitch as usize
            + region.width() as usize)
            * bpp
    };
    (offset, len)
}

macro_rules! view_accessors {
    () => {
        pub const fn width(&self) -> u32 {
            self.width
        }

        pub const fn height(&self) -> u32 {
            self.height
        }

        pub const fn depth(&self) -> u32 {
            self.depth
        }

        pub const fn format(&self) -> PixelFormat {
            self.format
        }

        /// Row pitch in pixels.
        pub const fn row_pitch(&self) -> u32 {
            self.row_pitch
        }

        /// Slice pitch in pixels.
        pub const fn slice_pitch(&self) -> u32 {
            self.slice_pitch
        }

        pub const fn extent(&self) -> Box3 {
            Box3::from_extent(self.width, self.height, self.depth)
        }

        /// True iff the pitches match the dimensions exactly, i.e. the data
        /// is one gap-free run of bytes. Compressed transfers require this.
        pub const fn is_consecutive(&self) -> bool {
            self.row_pitch == self.width && self.slice_pitch == self.width * self.height
        }

        /// Byte size of the region when consecutive.
        pub fn consecutive_len(&self) -> usize {
            self.format.memory_size(self.width, self.height, self.depth)
        }
    };
}

/// A read-only view of pixel memory.
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    width: u32,
    height: u32,
    depth: u32,
    row_pitch: u32,
    slice_pitch: u32,
    format: PixelFormat,
    data: &'a [u8],
}

impl<'a> PixelView<'a> {
    /// A tightly packed view: pitches equal the dimensions.
    pub fn packed(width: u32, height: u32, depth: u32, format: PixelFormat, data: &'a [u8]) -> Self {
        assert!(
            data.len() >= format.memory_size(width, height, depth),
            "data slice too small for {}x{}x{} {:?}",
            width,
            height,
            depth,
            format
        );
        PixelView {
            width,
            height,
            depth,
            row_pitch: width,
            slice_pitch: width * height,
            format,
            data,
        }
    }

    /// A view with explicit pitches (in pixels). Pitches must be at least
    /// the tight-packed row/slice sizes.
    pub fn with_pitches(
        width: u32,
        height: u32,
        depth: u32,
        format: PixelFormat,
        row_pitch: u32,
        slice_pitch: u32,
        data: &'a [u8],
    ) -> Self {
        assert!(row_pitch >= width && slice_pitch >= width * height);
        PixelView {
            width,
            height,
            depth,
            row_pitch,
            slice_pitch,
            format,
            data,
        }
    }

    view_accessors!();

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// A view of `region` aliasing the same memory, origin folded into the
    /// slice, pitches inherited from `self`.
    ///
    /// # Panics
    ///
    /// Region containment and an uncompressed format are preconditions;
    /// violating them is a programming error, not a recoverable one.
    pub fn sub_volume(&self, region: Box3) -> PixelView<'a> {
        assert!(
            self.extent().contains(&region),
            "sub-volume {:?} not contained in {:?}",
            region,
            self.extent()
        );
        let (offset, len) = sub_volume_span(self.format, self.row_pitch, self.slice_pitch, &region);
        PixelView {
            width: region.width(),
            height: region.height(),
            depth: region.depth(),
            row_pitch: self.row_pitch,
            slice_pitch: self.slice_pitch,
            format: self.format,
            data: &self.data[offset..offset + len],
        }
    }
}

/// A mutable view of pixel memory.
#[derive(Debug)]
pub struct PixelViewMut<'a> {
    width: u32,
    height: u32,
    depth: u32,
    row_pitch: u32,
    slice_pitch: u32,
    format: PixelFormat,
    data: &'a mut [u8],
}

impl<'a> PixelViewMut<'a> {
    pub fn packed(
        width: u32,
        height: u32,
        depth: u32,
        format: PixelFormat,
        data: &'a mut [u8],
    ) -> Self {
        assert!(
            data.len() >= format.memory_size(width, height, depth),
            "data slice too small for {}x{}x{} {:?}",
            width,
            height,
            depth,
            format
        );
        PixelViewMut {
            width,
            height,
            depth,
            row_pitch: width,
            slice_pitch: width * height,
            format,
            data,
        }
    }

    pub fn with_pitches(
        width: u32,
        height: u32,
        depth: u32,
        format: PixelFormat,
        row_pitch: u32,
        slice_pitch: u32,
        data: &'a mut [u8],
    ) -> Self {
        assert!(row_pitch >= width && slice_pitch >= width * height);
        PixelViewMut {
            width,
            height,
            depth,
            row_pitch,
            slice_pitch,
            format,
            data,
        }
    }

    view_accessors!();

    pub fn data(&mut self) -> &mut [u8] {
        self.data
    }

    /// Reborrow as a read-only view.
    pub fn as_view(&self) -> PixelView<'_> {
        PixelView {
            width: self.width,
            height: self.height,
            depth: self.depth,
            row_pitch: self.row_pitch,
            slice_pitch: self.slice_pitch,
            format: self.format,
            data: self.data,
        }
    }

    /// Mutable counterpart of [`PixelView::sub_volume`]; writes through the
    /// returned view land in this view's memory.
    pub fn sub_volume_mut(&mut self, region: Box3) -> PixelViewMut<'_> {
        assert!(
            self.extent().contains(&region),
            "sub-volume {:?} not contained in {:?}",
            region,
            self.extent()
        );
        let (offset, len) = sub_volume_span(self.format, self.row_pitch, self.slice_pitch, &region);
        PixelViewMut {
            width: region.width(),
            height: region.height(),
            depth: region.depth(),
            row_pitch: self.row_pitch,
            slice_pitch: self.slice_pitch,
            format: self.format,
            data: &mut self.data[offset..offset + len],
        }
    }
}

/// Owned, tightly packed pixel storage.
///
/// This is the shadow/temporary buffer used by the slow transfer paths.
/// It is always created for a concrete purpose inside one operation and
/// dropped on the way out; nothing in the crate holds one across calls.
#[derive(Debug)]
pub struct PixelVolume {
    width: u32,
    height: u32,
    depth: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelVolume {
    /// Allocates zeroed storage for the full extent.
    pub fn new(width: u32, height: u32, depth: u32, format: PixelFormat) -> Self {
        PixelVolume {
            width,
            height,
            depth,
            format,
            data: vec![0; format.memory_size(width, height, depth)],
        }
    }

    pub fn view(&self) -> PixelView<'_> {
        PixelView::packed(self.width, self.height, self.depth, self.format, &self.data)
    }

    pub fn view_mut(&mut self) -> PixelViewMut<'_> {
        PixelViewMut::packed(
            self.width,
            self.height,
            self.depth,
            self.format,
            &mut self.data,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_formats::PixelFormat;

    #[test]
    fn contains_is_exact_on_the_boundary() {
        let extent = Box3::from_extent(16, 16, 2);
        assert!(extent.contains(&Box3::new(0, 0, 16, 16)));
        assert!(extent.contains(&Box3::with_depth(4, 4, 0, 8, 8, 2)));
        assert!(extent.contains(&Box3::from_extent(16, 16, 2)));
        assert!(!extent.contains(&Box3::new(0, 0, 17, 16)));
        assert!(!extent.contains(&Box3::with_depth(0, 0, 1, 16, 16, 3)));
        assert!(!extent.contains(&Box3::new(8, 8, 4, 4))); // inverted box
    }

    #[test]
    fn zero_extent_contains_nothing() {
        let empty = Box3::from_extent(0, 0, 0);
        assert!(!empty.contains(&Box3::new(0, 0, 1, 1)));
    }

    #[test]
    fn consecutive_iff_pitches_match_dimensions() {
        let data = vec![0u8; 8 * 64 * 4];
        let packed = PixelView::packed(4, 8, 1, PixelFormat::Rgba8, &data);
        assert!(packed.is_consecutive());
        let pitched = PixelView::with_pitches(4, 8, 1, PixelFormat::Rgba8, 8, 64, &data[..]);
        assert!(!pitched.is_consecutive());
    }

    #[test]
    fn sub_volume_writes_land_in_the_parent() {
        // 4x4 single-channel so offsets are easy to eyeball
        let mut data = vec![0u8; 16];
        let mut parent = PixelViewMut::packed(4, 4, 1, PixelFormat::L8, &mut data);
        {
            let mut sub = parent.sub_volume_mut(Box3::new(1, 2, 3, 4));
            assert_eq!(sub.width(), 2);
            assert_eq!(sub.height(), 2);
            assert_eq!(sub.row_pitch(), 4); // parent pitch inherited
            let bytes = sub.data();
            bytes[0] = 0xaa; // (1,2)
            bytes[4 + 1] = 0xbb; // one parent row down: (2,3)
        }
        assert_eq!(data[2 * 4 + 1], 0xaa);
        assert_eq!(data[3 * 4 + 2], 0xbb);
    }

    #[test]
    fn sub_volume_of_sub_volume_composes() {
        let data = vec![0u8; 8 * 8 * 4];
        let view = PixelView::packed(8, 8, 1, PixelFormat::Rgba8, &data);
        let outer = view.sub_volume(Box3::new(2, 2, 8, 8));
        let inner = outer.sub_volume(Box3::new(1, 1, 2, 2));
        // (2+1, 2+1) in the root, times 4 bytes
        let expected = (3 * 8 + 3) * 4;
        let root = view.data().as_ptr() as usize;
        assert_eq!(inner.data().as_ptr() as usize - root, expected);
    }

    #[test]
    #[should_panic(expected = "not contained")]
    fn sub_volume_out_of_bounds_is_a_logic_error() {
        let data = vec![0u8; 16];
        let view = PixelView::packed(2, 2, 1, PixelFormat::Rgba8, &data);
        let _ = view.sub_volume(Box3::new(0, 0, 3, 1));
    }

    #[test]
    fn volume_is_sized_to_the_format() {
        let vol = PixelVolume::new(4, 4, 2, PixelFormat::Rgba8);
        assert_eq!(vol.view().data().len(), 4 * 4 * 2 * 4);
        let dxt = PixelVolume::new(8, 8, 1, PixelFormat::Dxt1);
        assert_eq!(dxt.view().data().len(), 2 * 2 * 8);
    }
}
