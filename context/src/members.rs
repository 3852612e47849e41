use crate::{Device, DeviceClass};
use std::{
    ptr::{addr_eq, from_ref},
    sync::Arc,
};

/// 上下文的成员设备。构造后不再改变。
pub(crate) struct Members {
    devices: Box<[Arc<dyn Device>]>,
    custom_host_alloc: Option<usize>,
    svm: Box<[usize]>,
}

impl Members {
    pub fn new(devices: &[Arc<dyn Device>]) -> Self {
        let mut custom_host_alloc = None;
        let mut svm = Vec::new();
        for (i, dev) in devices.iter().enumerate() {
            if dev.is_custom_host_allocator() {
                assert!(
                    custom_host_alloc.is_none(),
                    "Only one custom host allocator is allowed per context"
                );
                custom_host_alloc = Some(i)
            }
            if dev.supports_unified_memory() {
                svm.push(i)
            }
        }
        // 多设备共享虚拟内存以首个设备为准，首个设备必须是 GPU
        if svm.len() > 1 && devices[svm[0]].class() == DeviceClass::Cpu {
            let last = svm.len() - 1;
            svm.swap(0, last)
        }

        Self {
            devices: devices.into(),
            custom_host_alloc,
            svm: svm.into(),
        }
    }

    #[inline]
    pub fn devices(&self) -> &[Arc<dyn Device>] {
        &self.devices
    }

    #[inline]
    pub fn custom_host_alloc(&self) -> Option<&Arc<dyn Device>> {
        self.custom_host_alloc.map(|i| &self.devices[i])
    }

    /// 支持共享虚拟内存的设备，首个设备代表分配路径。
    #[inline]
    pub fn svm(&self) -> impl Iterator<Item = &Arc<dyn Device>> + '_ {
        self.svm.iter().map(|&i| &self.devices[i])
    }

    pub fn contains(&self, dev: &dyn Device) -> bool {
        self.devices
            .iter()
            .any(|it| addr_eq(Arc::as_ptr(it), from_ref(dev)) || it.is_ancestor_of(dev))
    }
}
