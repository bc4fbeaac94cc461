//! # Boot Services Pool Allocator
//!
//! Backs Rust's global allocator with UEFI pool allocations so the few heap
//! users in the loader (file metadata, mostly) work without a hand-rolled
//! heap.
//!
//! # Notes
//! - Valid only while boot services are active; after `ExitBootServices` the
//!   loader performs no allocation at all.
//! - Pool memory is only 8-byte aligned, so each request is padded: the block
//!   handed out is aligned up within a larger pool allocation, and the pool's
//!   own pointer is stashed in the word right below the block so `dealloc`
//!   can find it again.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{NonNull, null_mut};
use uefi::boot;
use uefi::boot::MemoryType;

/// One `usize` below every handed-out block: the pool pointer to free.
const HEADER: usize = size_of::<usize>();

pub struct UefiPoolAllocator;

#[cfg(target_os = "uefi")]
#[global_allocator]
static GLOBAL_ALLOC: UefiPoolAllocator = UefiPoolAllocator;

unsafe impl GlobalAlloc for UefiPoolAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // At least word alignment, so the header word itself stays aligned.
        let align = layout.align().max(align_of::<usize>());
        let Some(total) = layout
            .size()
            .max(1)
            .checked_add(HEADER)
            .and_then(|v| v.checked_add(align))
        else {
            return null_mut();
        };

        // LOADER_DATA keeps the pool region classified as ours in the map.
        let Ok(pool) = boot::allocate_pool(MemoryType::LOADER_DATA, total) else {
            return null_mut();
        };
        let pool = pool.as_ptr();

        // Leave room for the header, then round up to the requested
        // alignment. `total` reserves slack for both.
        let block = (pool as usize + HEADER).next_multiple_of(align) as *mut u8;
        unsafe {
            block.cast::<usize>().sub(1).write(pool as usize);
        }
        block
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if ptr.is_null() {
            return;
        }

        let pool = unsafe { ptr.cast::<usize>().sub(1).read() } as *mut u8;

        // SAFETY: `pool` came out of `allocate_pool` and was recorded by
        // `alloc` in the header word.
        let _ = unsafe { boot::free_pool(NonNull::new_unchecked(pool)) };
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let block = unsafe { self.alloc(layout) };
        if !block.is_null() {
            unsafe { block.write_bytes(0, layout.size()) };
        }
        block
    }
}
