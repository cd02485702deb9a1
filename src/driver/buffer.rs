//! Caller-owned buffer views for in-flight transfers.
//!
//! The engine never copies transfer data. A view records the caller's
//! pointer, the transfer length and a cursor; it is loaded when a transfer
//! starts and cleared (length to zero) on completion, error or abort. The
//! cursor survives clearing so callers can inspect how many units actually
//! moved.

use core::ptr;

/// View over a caller-owned transmit buffer.
pub(crate) struct TxView {
    ptr: *const u8,
    len: usize,
    pos: usize,
}

impl TxView {
    pub(crate) const fn new() -> Self {
        Self {
            ptr: ptr::null(),
            len: 0,
            pos: 0,
        }
    }

    /// Bind a new transfer region and rewind the cursor.
    pub(crate) fn load(&mut self, ptr: *const u8, len: usize) {
        self.ptr = ptr;
        self.len = len;
        self.pos = 0;
    }

    /// Take the next unit to transmit, advancing the cursor.
    pub(crate) fn next_unit(&mut self) -> Option<u8> {
        if self.pos >= self.len || self.ptr.is_null() {
            return None;
        }
        // SAFETY: ptr..ptr+len is valid for reads for the duration of the
        // transfer per the caller contract, and pos < len was just checked.
        let unit = unsafe { *self.ptr.add(self.pos) };
        self.pos += 1;
        Some(unit)
    }

    /// Check whether the cursor reached the transfer length.
    #[inline]
    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.len
    }

    /// Check whether a transfer region is currently bound.
    #[inline]
    pub(crate) fn in_flight(&self) -> bool {
        self.len != 0
    }

    /// Units moved so far (survives `clear`).
    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.pos
    }

    /// Mark the whole region transferred. Used when the data moved out of
    /// band (DMA) and the cursor was never stepped.
    pub(crate) fn finish(&mut self) {
        self.pos = self.len;
    }

    /// Drop the view (length to zero). The cursor is preserved for
    /// post-transfer inspection.
    pub(crate) fn clear(&mut self) {
        self.ptr = ptr::null();
        self.len = 0;
    }

    /// Full reset including the cursor, for init/deinit.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

/// View over a caller-owned receive buffer.
pub(crate) struct RxView {
    ptr: *mut u8,
    len: usize,
    pos: usize,
}

impl RxView {
    pub(crate) const fn new() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
            pos: 0,
        }
    }

    /// Bind a new transfer region and rewind the cursor.
    pub(crate) fn load(&mut self, ptr: *mut u8, len: usize) {
        self.ptr = ptr;
        self.len = len;
        self.pos = 0;
    }

    /// Store one received unit at the cursor, advancing it. Units arriving
    /// past the end of the region are dropped.
    pub(crate) fn store(&mut self, unit: u8) {
        if self.pos >= self.len || self.ptr.is_null() {
            return;
        }
        // SAFETY: ptr..ptr+len is valid for writes for the duration of the
        // transfer per the caller contract, and pos < len was just checked.
        unsafe { *self.ptr.add(self.pos) = unit };
        self.pos += 1;
    }

    /// Check whether the cursor reached the transfer length.
    #[inline]
    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.len
    }

    /// Check whether a transfer region is currently bound.
    #[inline]
    pub(crate) fn in_flight(&self) -> bool {
        self.len != 0
    }

    /// Units moved so far (survives `clear`).
    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.pos
    }

    /// Mark the whole region transferred. Used when the data moved out of
    /// band (DMA) and the cursor was never stepped.
    pub(crate) fn finish(&mut self) {
        self.pos = self.len;
    }

    /// Drop the view (length to zero). The cursor is preserved for
    /// post-transfer inspection.
    pub(crate) fn clear(&mut self) {
        self.ptr = ptr::null_mut();
        self.len = 0;
    }

    /// Full reset including the cursor, for init/deinit.
    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
