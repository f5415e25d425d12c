use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::error::{HarnessError, HarnessResult};

/// Host page size the output region is aligned to
pub const PAGE_ALIGN: usize = 4096;

/// Page-aligned, zero-initialised array of f32 cells
///
/// Owns its allocation and frees it in `Drop`, so the region is released on
/// every exit path of the harness.
pub struct PageAlignedCells {
    ptr: NonNull<f32>,
    len: usize,
    layout: Layout,
}

impl PageAlignedCells {
    pub fn new(len: usize) -> HarnessResult<Self> {
        let bytes = len * std::mem::size_of::<f32>();
        let allocation_error = || HarnessError::Allocation {
            bytes,
            align: PAGE_ALIGN,
        };

        if bytes == 0 {
            return Err(allocation_error());
        }

        let layout = Layout::from_size_align(bytes, PAGE_ALIGN).map_err(|_| allocation_error())?;

        // SAFETY: layout has a non-zero size (checked above)
        // - alloc_zeroed returns either null or a block valid for `layout`
        // - all-zero bits are a valid f32 (0.0), so every cell is initialised
        let raw = unsafe { alloc_zeroed(layout) } as *mut f32;
        let ptr = NonNull::new(raw).ok_or_else(allocation_error)?;

        log::debug!(
            "[PageAlignedCells] Allocated {} cells ({} bytes, {}-byte aligned)",
            len,
            bytes,
            PAGE_ALIGN
        );

        Ok(Self { ptr, len, layout })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const f32 {
        self.ptr.as_ptr()
    }

    pub fn as_slice(&self) -> &[f32] {
        // SAFETY: ptr is valid for len initialised cells while self lives
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        // SAFETY: ptr is valid for len initialised cells and we hold &mut self
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for PageAlignedCells {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with alloc_zeroed using self.layout
        unsafe {
            dealloc(self.ptr.as_ptr() as *mut u8, self.layout);
        }
    }
}

// Safety: PageAlignedCells owns its data and only hands out borrows tied to &self / &mut self
unsafe impl Send for PageAlignedCells {}
unsafe impl Sync for PageAlignedCells {}

impl std::fmt::Debug for PageAlignedCells {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageAlignedCells")
            .field("len", &self.len)
            .field("ptr", &self.ptr)
            .finish()
    }
}
