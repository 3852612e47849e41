use crate::{Device, DeviceId};
use log::debug;
use std::{
    collections::HashMap,
    ptr::addr_eq,
    sync::{Arc, MutexGuard, Weak},
};

/// 设备端任务队列。队列的创建和执行由上下文之外的代码负责。
pub trait DeviceQueue: Send + Sync {}

/// 一个设备上的设备端队列记录。
#[derive(Default, Debug)]
pub struct DeviceQueueInfo {
    count: usize,
    default: Option<Weak<dyn DeviceQueue>>,
}

impl DeviceQueueInfo {
    /// 存活的设备端队列数量。
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// 默认设备端队列。
    #[inline]
    pub fn default_queue(&self) -> Option<Arc<dyn DeviceQueue>> {
        self.default.as_ref()?.upgrade()
    }

    fn is_default(&self, queue: &Arc<dyn DeviceQueue>) -> bool {
        self.default
            .as_ref()
            .is_some_and(|default| addr_eq(default.as_ptr(), Arc::as_ptr(queue)))
    }
}

pub(crate) type Registry = HashMap<DeviceId, DeviceQueueInfo>;

/// 持有上下文队列表锁的访问器。
///
/// 在同一个访问器上先检查容量再添加队列，两步之间不会被其他线程插入。
pub struct DeviceQueues<'a>(pub(crate) MutexGuard<'a, Registry>);

impl DeviceQueues<'_> {
    /// 设备上是否还能创建设备端队列。
    pub fn is_possible(&mut self, dev: &dyn Device) -> bool {
        self.entry(dev).count < dev.max_on_device_queues()
    }

    /// 登记一个设备端队列，`make_default` 时设为设备的默认队列。
    pub fn add(&mut self, dev: &dyn Device, queue: &Arc<dyn DeviceQueue>, make_default: bool) {
        let info = self.entry(dev);
        info.count += 1;
        if make_default {
            info.default = Some(Arc::downgrade(queue))
        }
        debug!("device queue added, {} on device", info.count)
    }

    /// 容量允许时登记一个设备端队列。
    pub fn try_add(
        &mut self,
        dev: &dyn Device,
        queue: &Arc<dyn DeviceQueue>,
        make_default: bool,
    ) -> bool {
        let possible = self.is_possible(dev);
        if possible {
            self.add(dev, queue, make_default)
        }
        possible
    }

    /// 注销一个设备端队列，如果它是默认队列则清除默认队列。
    pub fn remove(&mut self, dev: &dyn Device, queue: &Arc<dyn DeviceQueue>) {
        let info = self.entry(dev);
        assert_ne!(info.count, 0, "The device queue map is empty!");
        info.count -= 1;
        if info.is_default(queue) {
            info.default = None
        }
        debug!("device queue removed, {} on device", info.count)
    }

    /// 设备的默认设备端队列。
    pub fn default_queue(&self, dev: &dyn Device) -> Option<Arc<dyn DeviceQueue>> {
        self.0.get(&DeviceId::of(dev))?.default_queue()
    }

    #[inline]
    pub fn info(&self, dev: &dyn Device) -> Option<&DeviceQueueInfo> {
        self.0.get(&DeviceId::of(dev))
    }

    #[inline]
    fn entry(&mut self, dev: &dyn Device) -> &mut DeviceQueueInfo {
        self.0.entry(DeviceId::of(dev)).or_default()
    }
}
