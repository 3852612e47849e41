use crate::{aligned, Context, Device, DeviceClass};
use log::warn;
use std::{
    ops::{BitOr, BitOrAssign},
    ptr::NonNull,
    sync::Arc,
};

/// 共享虚拟内存的分配选项，原样传递给设备。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
#[repr(transparent)]
pub struct SvmFlags(u64);

impl SvmFlags {
    pub const READ_WRITE: Self = Self(1 << 0);
    pub const WRITE_ONLY: Self = Self(1 << 1);
    pub const READ_ONLY: Self = Self(1 << 2);
    pub const FINE_GRAIN_BUFFER: Self = Self(1 << 10);
    pub const ATOMICS: Self = Self(1 << 11);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SvmFlags {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SvmFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

impl Context {
    /// 分配在所有成员 GPU 上地址一致的共享虚拟内存。
    ///
    /// 首个支持共享虚拟内存的设备是 CPU 时直接分配对齐的主机内存；
    /// 既不是 CPU 也不是 GPU 时无法分配。
    /// 否则依次在每个 GPU 上分配，首个 GPU 返回的地址作为基准，
    /// 任一设备分配失败或地址不一致时释放已分配的部分并返回 [`None`]。
    ///
    /// 各设备的分配是依次进行的，失败时已成功的分配在释放之前对其他线程可见。
    pub fn svm_alloc(&self, size: usize, alignment: usize, flags: SvmFlags) -> Option<NonNull<u8>> {
        let primary = self.members.svm().next()?;
        match primary.class() {
            DeviceClass::Cpu => return aligned::allocate(size, alignment),
            DeviceClass::Gpu => {}
            DeviceClass::Other => {
                warn!("svm allocation is not supported on the primary device");
                return None;
            }
        }

        let mut allocated = Vec::<(&Arc<dyn Device>, NonNull<u8>)>::new();
        for dev in self.svm_gpus() {
            let Some(ptr) = dev.svm_alloc(self, size, alignment, flags) else {
                warn!("svm allocation of {size} bytes failed on device {}", allocated.len());
                release(allocated);
                return None;
            };
            allocated.push((dev, ptr));
            let reference = allocated[0].1;
            if ptr != reference {
                warn!("svm address mismatch: {ptr:p} != {reference:p}");
                release(allocated);
                return None;
            }
        }
        allocated.first().map(|&(_, ptr)| ptr)
    }

    /// 释放 [`Context::svm_alloc`] 分配的共享虚拟内存。
    ///
    /// # Safety
    ///
    /// `ptr` 必须来自同一上下文的 [`Context::svm_alloc`]，且未被释放过。
    pub unsafe fn svm_free(&self, ptr: NonNull<u8>) {
        let Some(primary) = self.members.svm().next() else {
            warn!("svm free on a context without svm devices");
            return;
        };
        match primary.class() {
            DeviceClass::Cpu => {
                aligned::deallocate(ptr);
                return;
            }
            DeviceClass::Gpu => {}
            DeviceClass::Other => {
                warn!("svm free on a context whose primary device cannot allocate svm");
                return;
            }
        }
        for dev in self.svm_gpus() {
            dev.svm_free(ptr)
        }
    }

    fn svm_gpus(&self) -> impl Iterator<Item = &Arc<dyn Device>> + '_ {
        self.members
            .svm()
            .filter(|dev| dev.class() == DeviceClass::Gpu)
    }
}

fn release(allocated: Vec<(&Arc<dyn Device>, NonNull<u8>)>) {
    for (dev, ptr) in allocated {
        unsafe { dev.svm_free(ptr) }
    }
}
