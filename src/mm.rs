/*
 * Physical page allocator: a single monotonically increasing cursor into
 * the `__free_ram` .. `__free_ram_end` window the linker script reserves.
 * There is no free operation in this core.
 *
 * Author: Giuseppe Capasso <capassog97@gmail.com>
 */
use spin::Mutex;

pub const PAGE_SIZE: usize = 4096;

unsafe extern "C" {
    static __free_ram: u8;
    static __free_ram_end: u8;
}

static CURSOR: Mutex<Option<usize>> = Mutex::new(None);

/// Pure bump-allocation step: given the current cursor (or `None` for
/// "not yet initialized", defaulting to `window_start`) and a window
/// bound, returns the base address to hand out and the cursor's new
/// value, or `None` if the request does not fit. Kept separate from
/// `alloc_pages` so it can be exercised on the host without the linker
/// symbols or the zero-fill side effect.
fn bump(cursor: Option<usize>, window_start: usize, window_end: usize, size: usize) -> Option<(usize, usize)> {
    let base = cursor.unwrap_or(window_start);
    if base + size > window_end {
        return None;
    }
    Some((base, base + size))
}

/// Returns the base physical address of `n` contiguous, freshly-zeroed
/// pages. Panics if the free-RAM window is exhausted.
pub fn alloc_pages(n: usize) -> usize {
    let mut cursor = CURSOR.lock();
    let window_start = &raw const __free_ram as usize;
    let window_end = &raw const __free_ram_end as usize;
    let size = n * PAGE_SIZE;

    let (base, next) = match bump(*cursor, window_start, window_end, size) {
        Some(result) => result,
        None => crate::PANIC!("out of memory"),
    };

    unsafe {
        core::ptr::write_bytes(base as *mut u8, 0, size);
    }
    *cursor = Some(next);
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_allocation_starts_at_window_start() {
        assert_eq!(bump(None, 0x1000, 0x10000, PAGE_SIZE), Some((0x1000, 0x1000 + PAGE_SIZE)));
    }

    #[test]
    fn successive_allocations_are_contiguous() {
        let (a0, cursor) = bump(None, 0, 0x10000, PAGE_SIZE).unwrap();
        let (a1, cursor) = bump(Some(cursor), 0, 0x10000, 2 * PAGE_SIZE).unwrap();
        let (a2, _) = bump(Some(cursor), 0, 0x10000, 3 * PAGE_SIZE).unwrap();
        assert_eq!(a1, a0 + PAGE_SIZE);
        assert_eq!(a2, a1 + 2 * PAGE_SIZE);
    }

    #[test]
    fn exhausted_window_returns_none() {
        assert_eq!(bump(Some(0xff00), 0, 0x10000, PAGE_SIZE), None);
    }
}
