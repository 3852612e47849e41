mod common;
mod config;
mod context;
mod info;
mod interop;
mod members;
mod property;
mod queues;
mod svm;

#[cfg(test)]
mod test_utils;

pub use common::*;
pub use config::Config;
pub use context::Context;
pub use info::{CommandIntercept, ContextFlags, Handle, Info, InterceptFn};
pub use interop::{ExternalBinding, ExternalKind, GlEnv};
pub use property::{keys, platform_id, DisplayKind, Property, PropertyIter};
pub use queues::{DeviceQueue, DeviceQueueInfo, DeviceQueues};
pub use svm::SvmFlags;

use std::{
    ptr::{addr_eq, from_ref, NonNull},
    sync::Arc,
};

/// 设备的硬件类别。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DeviceClass {
    Cpu,
    Gpu,
    Other,
}

/// 计算设备的能力契约。
///
/// 设备由外部驱动实现，上下文只通过这个特质消费设备的能力。
/// 设备通过 [`Arc`] 共享所有权，上下文在整个生命周期内持有每个成员设备的一份引用。
pub trait Device: Send + Sync {
    /// 设备的硬件类别。
    fn class(&self) -> DeviceClass;

    /// 设备是否接管所在上下文的主机内存分配。
    #[inline]
    fn is_custom_host_allocator(&self) -> bool {
        false
    }

    /// 设备是否支持共享虚拟内存。
    #[inline]
    fn supports_unified_memory(&self) -> bool {
        false
    }

    /// 划分出这个子设备的父设备。
    #[inline]
    fn parent(&self) -> Option<&Arc<dyn Device>> {
        None
    }

    /// 判断 `other` 是否由这个设备（直接或间接）划分得到。
    fn is_ancestor_of(&self, other: &dyn Device) -> bool {
        let mut node = other.parent();
        while let Some(parent) = node {
            if addr_eq(Arc::as_ptr(parent), self as *const Self) {
                return true;
            }
            node = parent.parent();
        }
        false
    }

    /// 将设备绑定到外部图形设备。`validate_only` 为真时只检查可行性。
    #[inline]
    fn bind_external_device(&self, _binding: &ExternalBinding, _validate_only: bool) -> bool {
        false
    }

    /// 解除与外部图形设备的绑定。
    #[inline]
    fn unbind_external_device(&self, _binding: &ExternalBinding, _validate_only: bool) {}

    /// 分配主机可见内存。
    #[inline]
    fn host_alloc(&self, size: usize, alignment: usize, _atomics: bool) -> Option<NonNull<u8>> {
        aligned::allocate(size, alignment)
    }

    /// 释放 [`Device::host_alloc`] 分配的内存。
    ///
    /// # Safety
    ///
    /// `ptr` 必须来自同一设备的 [`Device::host_alloc`]，且未被释放过。
    #[inline]
    unsafe fn host_free(&self, ptr: NonNull<u8>) {
        aligned::deallocate(ptr)
    }

    /// 在设备上分配共享虚拟内存。
    #[inline]
    fn svm_alloc(
        &self,
        _context: &Context,
        _size: usize,
        _alignment: usize,
        _flags: SvmFlags,
    ) -> Option<NonNull<u8>> {
        None
    }

    /// 释放设备上的共享虚拟内存。
    ///
    /// # Safety
    ///
    /// `ptr` 必须来自同一设备的 [`Device::svm_alloc`]，且未被释放过。
    #[inline]
    unsafe fn svm_free(&self, _ptr: NonNull<u8>) {}

    /// 设备端队列的最大数量。
    fn max_on_device_queues(&self) -> usize;
}

/// 设备的身份，即设备对象的地址。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DeviceId(usize);

impl DeviceId {
    #[inline]
    pub fn of(dev: &dyn Device) -> Self {
        Self(from_ref(dev).cast::<()>() as usize)
    }
}
