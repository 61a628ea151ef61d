//! Shared helpers for the CRT table and app-type entry points.

use std::ffi::c_int;

use wincrt_core::startup::AppType;

/// Largest table the range walkers accept. Anything longer is treated as a
/// corrupt `[first, last)` pair.
pub const MAX_TABLE_SLOTS: usize = 1 << 16;

/// `_PVFV`: optional `void (*)(void)` table slot.
pub type Pvfv = Option<extern "C" fn()>;
/// `_PIFV`: optional `int (*)(void)` table slot.
pub type Pifv = Option<extern "C" fn() -> c_int>;

/// Number of slots in `[first, last)`, or `None` for null, inverted, or
/// oversized ranges.
#[must_use]
pub fn table_len<T>(first: *const T, last: *const T) -> Option<usize> {
    if first.is_null() || last.is_null() || last < first {
        return None;
    }
    let size = std::mem::size_of::<T>();
    if size == 0 {
        return None;
    }
    let bytes = (last as usize) - (first as usize);
    if bytes % size != 0 {
        return None;
    }
    let len = bytes / size;
    (len <= MAX_TABLE_SLOTS).then_some(len)
}

/// View `[first, last)` as a slice. Invalid ranges yield an empty slice.
///
/// # Safety
///
/// For a range accepted by [`table_len`], every slot in it must be readable
/// and initialized for `'a`.
pub unsafe fn table_slice<'a, T>(first: *const T, last: *const T) -> &'a [T] {
    match table_len(first, last) {
        // SAFETY: caller guarantees the accepted range is readable for 'a.
        Some(len) => unsafe { std::slice::from_raw_parts(first, len) },
        None => &[],
    }
}

/// Map a raw `__set_app_type` argument. Unknown values fall back to console.
#[must_use]
pub fn app_type_from_raw(raw: c_int) -> AppType {
    AppType::from_raw(raw).unwrap_or(AppType::Console)
}
