#![deny(warnings)]

use context::{
    aligned, Context, Device, DeviceClass, ExternalBinding, ExternalKind, SvmFlags,
};
use log::debug;
use std::{ptr::NonNull, sync::Arc, thread::available_parallelism};

/// 主机处理器。
///
/// 主机内存对所有线程可见，因此总是支持共享虚拟内存。
/// 可以按计算单元划分为子设备。
pub struct Cpu {
    parent: Option<Arc<dyn Device>>,
    units: usize,
    max_queues: usize,
}

impl Cpu {
    pub const DEFAULT_MAX_QUEUES: usize = 4;

    /// 使用全部可用的计算单元。
    pub fn new() -> Arc<Self> {
        let units = available_parallelism().map_or(1, |n| n.get());
        Self::with_units(units, Self::DEFAULT_MAX_QUEUES)
    }

    pub fn with_units(units: usize, max_queues: usize) -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            units,
            max_queues,
        })
    }

    #[inline]
    pub fn units(&self) -> usize {
        self.units
    }

    /// 把计算单元平均划分为 `n` 个子设备，余下的单元不分配。
    pub fn partition(self: &Arc<Self>, n: usize) -> Option<Vec<Arc<Self>>> {
        if n == 0 || n > self.units {
            return None;
        }
        let units = self.units / n;
        debug!("partition {} units into {n} x {units}", self.units);

        let parent: Arc<dyn Device> = self.clone();
        Some(
            (0..n)
                .map(|_| {
                    Arc::new(Self {
                        parent: Some(parent.clone()),
                        units,
                        max_queues: self.max_queues,
                    })
                })
                .collect(),
        )
    }
}

impl Device for Cpu {
    #[inline]
    fn class(&self) -> DeviceClass {
        DeviceClass::Cpu
    }

    #[inline]
    fn supports_unified_memory(&self) -> bool {
        true
    }

    #[inline]
    fn parent(&self) -> Option<&Arc<dyn Device>> {
        self.parent.as_ref()
    }

    /// 主机只能通过映射共享 GL 对象，不支持 Direct3D。
    fn bind_external_device(&self, binding: &ExternalBinding, _validate_only: bool) -> bool {
        matches!(binding.kind, Some(ExternalKind::GlContext) | None)
    }

    #[inline]
    fn svm_alloc(
        &self,
        _context: &Context,
        size: usize,
        alignment: usize,
        _flags: SvmFlags,
    ) -> Option<NonNull<u8>> {
        aligned::allocate(size, alignment)
    }

    #[inline]
    unsafe fn svm_free(&self, ptr: NonNull<u8>) {
        aligned::deallocate(ptr)
    }

    #[inline]
    fn max_on_device_queues(&self) -> usize {
        self.max_queues
    }
}
