//! 不需要调用方记住尺寸的对齐分配器。
//!
//! 分配时在返回的指针之前放置一个 [`Layout`] 头，释放时读回。

use std::{
    alloc::{alloc, dealloc, Layout},
    mem::{align_of, size_of},
    ptr::NonNull,
};

const HEADER: usize = size_of::<Layout>();

/// 分配 `size` 字节、至少按 `alignment` 对齐的内存。
///
/// 对齐不足 `usize` 时按 `usize` 对齐；对齐不是 2 的幂或尺寸溢出时返回 [`None`]。
pub fn allocate(size: usize, alignment: usize) -> Option<NonNull<u8>> {
    let align = alignment.max(align_of::<usize>()).max(align_of::<Layout>());
    if !align.is_power_of_two() {
        return None;
    }
    let offset = HEADER.next_multiple_of(align);
    let layout = Layout::from_size_align(offset.checked_add(size)?, align).ok()?;

    let base = unsafe { alloc(layout) };
    if base.is_null() {
        return None;
    }
    unsafe {
        let ptr = base.add(offset);
        ptr.sub(HEADER).cast::<Layout>().write_unaligned(layout);
        Some(NonNull::new_unchecked(ptr))
    }
}

/// 释放 [`allocate`] 分配的内存。
///
/// # Safety
///
/// `ptr` 必须来自 [`allocate`]，且未被释放过。
pub unsafe fn deallocate(ptr: NonNull<u8>) {
    let ptr = ptr.as_ptr();
    let layout = ptr.sub(HEADER).cast::<Layout>().read_unaligned();
    let offset = HEADER.next_multiple_of(layout.align());
    dealloc(ptr.sub(offset), layout)
}
