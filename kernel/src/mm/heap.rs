/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 * Copyright (c) Berkus Decker <berkus+vesper@metta.systems>
 */

//! The kernel heap: backs every `alloc::{vec, collections, boxed}` use in
//! this crate (run queues, vnode/buffer hash tables, msgid tables, ...).
//! A `buddy_alloc::BuddyAlloc` behind a `NullLock<Lazy<_>>`, wired up as
//! `#[global_allocator]` rather than kept as a special-purpose DMA pool,
//! since the heap and a DMA-safe pool are the same kind of consumer of
//! physical memory.

use crate::sync::{Mutex, NullLock};
use buddy_alloc::{BuddyAlloc, BuddyAllocParam};
use core::alloc::{GlobalAlloc, Layout};
use once_cell::unsync::Lazy;

/// Backing extent for the kernel heap, carved out of the kernel's own
/// virtual range ahead of any address-space-specific mappings. Static for
/// now; a future pass can grow it from the page allocator on demand.
const HEAP_START: usize = 0x0020_0000;
const HEAP_END: usize = 0x005F_FFFF;

struct KernelHeap {
    inner: NullLock<Lazy<BuddyAlloc>>,
}

// SAFETY: single core, BKL-equivalent exclusion is provided by `NullLock`
// masking IRQs around the allocator call.
unsafe impl Sync for KernelHeap {}

unsafe impl GlobalAlloc for KernelHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.inner
            .lock(|heap| heap.malloc(layout.size()))
            .cast()
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.inner.lock(|heap| heap.free(ptr.cast()))
    }
}

#[global_allocator]
static KERNEL_HEAP: KernelHeap = KernelHeap {
    inner: NullLock::new(Lazy::new(|| unsafe {
        BuddyAlloc::new(BuddyAllocParam::new(
            HEAP_START as *const u8,
            HEAP_END - HEAP_START,
            64,
        ))
    })),
};

#[alloc_error_handler]
fn alloc_error(layout: Layout) -> ! {
    panic!("kernel heap exhausted: {:?}", layout)
}
