use crate::utils::sys::{align_up, get_page_size};
use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::fmt;
use std::ptr::NonNull;

/// An owned I/O buffer handed to the kernel by value.
///
/// A descriptor takes ownership of its `IoBuf` when it is built and the
/// matching [`Completion`](crate::Completion) gives it back, so the memory
/// cannot be touched or freed while the kernel may still access it.
///
/// The buffer tracks a fixed `capacity` (what the kernel may write into) and a
/// `len` (bytes holding valid data). Reads and receives set `len` to the number
/// of bytes transferred.
pub struct IoBuf {
    ptr: NonNull<u8>,
    layout: Layout,
    len: usize,
}

// SAFETY: `IoBuf` uniquely owns its allocation, like `Vec<u8>`.
unsafe impl Send for IoBuf {}
unsafe impl Sync for IoBuf {}

impl IoBuf {
    /// Zeroed buffer with room for `capacity` bytes and no valid data.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::alloc(capacity, 1)
    }

    /// Zeroed page-aligned buffer whose capacity is `capacity` rounded up to
    /// a whole number of pages. Required for `O_DIRECT` transfers.
    pub fn page_aligned(capacity: usize) -> Self {
        let page = get_page_size();
        Self::alloc(align_up(capacity.max(1), page), page)
    }

    /// Buffer holding a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut buf = Self::with_capacity(data.len());
        buf.fill_from(data);
        buf
    }

    /// Page-aligned copy of `data`, zero-padded to a whole number of pages.
    /// The padding counts as valid data so the full aligned length is written.
    pub fn page_aligned_from(data: &[u8]) -> Self {
        let mut buf = Self::page_aligned(data.len());
        buf.fill_from(data);
        buf.len = buf.capacity();
        buf
    }

    fn alloc(capacity: usize, align: usize) -> Self {
        let layout = match Layout::from_size_align(capacity, align) {
            Ok(layout) => layout,
            Err(_) => panic!("invalid buffer layout: capacity={capacity}, align={align}"),
        };

        let ptr = if capacity == 0 {
            // Never dereferenced, zero-length slices only.
            NonNull::dangling()
        } else {
            NonNull::new(unsafe { alloc_zeroed(layout) })
                .unwrap_or_else(|| handle_alloc_error(layout))
        };

        Self {
            ptr,
            layout,
            len: 0,
        }
    }

    fn fill_from(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= self.capacity());
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.as_ptr(), data.len());
        }
        self.len = data.len();
    }

    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Marks the first `len` bytes as valid.
    ///
    /// # Safety
    ///
    /// `len` must not exceed the capacity and the first `len` bytes must have
    /// been written, which holds for the byte count of a successful read.
    pub(crate) unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity());
        self.len = len;
    }
}

impl Drop for IoBuf {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
        }
    }
}

impl Default for IoBuf {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl AsRef<[u8]> for IoBuf {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<&[u8]> for IoBuf {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl From<&str> for IoBuf {
    fn from(data: &str) -> Self {
        Self::from_slice(data.as_bytes())
    }
}

impl From<Vec<u8>> for IoBuf {
    fn from(data: Vec<u8>) -> Self {
        Self::from_slice(&data)
    }
}

impl fmt::Debug for IoBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoBuf")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("align", &self.alignment())
            .finish()
    }
}
