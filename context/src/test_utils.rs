use crate::{Context, Device, DeviceClass, ExternalBinding, SvmFlags};
use std::{
    ptr::NonNull,
    sync::{Arc, Mutex},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    Bind(ExternalBinding, bool),
    Unbind(ExternalBinding, bool),
    HostAlloc(usize, usize, bool),
    HostFree(usize),
    SvmAlloc(usize, usize),
    SvmFree(usize),
}

/// 按脚本响应的设备，记录上下文对它的每次调用。
///
/// 返回的地址只用于比较，不可解引用。
pub struct MockDevice {
    class: DeviceClass,
    svm: bool,
    svm_addr: Option<usize>,
    custom_host_alloc: bool,
    max_queues: usize,
    parent: Option<Arc<dyn Device>>,
    bind_ok: bool,
    events: Mutex<Vec<Event>>,
}

const HOST_ADDR: usize = 0x50_0000;

impl MockDevice {
    fn new(class: DeviceClass) -> Self {
        Self {
            class,
            svm: false,
            svm_addr: None,
            custom_host_alloc: false,
            max_queues: 0,
            parent: None,
            bind_ok: true,
            events: Default::default(),
        }
    }

    pub fn gpu() -> Self {
        Self::new(DeviceClass::Gpu)
    }

    pub fn cpu() -> Self {
        Self::new(DeviceClass::Cpu)
    }

    pub fn other() -> Self {
        Self::new(DeviceClass::Other)
    }

    /// 支持共享虚拟内存，但分配总是失败。
    pub fn svm(self) -> Self {
        Self { svm: true, ..self }
    }

    /// 支持共享虚拟内存，分配总是返回 `addr`。
    pub fn svm_at(self, addr: usize) -> Self {
        Self {
            svm: true,
            svm_addr: Some(addr),
            ..self
        }
    }

    pub fn custom_host_alloc(self) -> Self {
        Self {
            custom_host_alloc: true,
            ..self
        }
    }

    pub fn max_queues(self, max_queues: usize) -> Self {
        Self { max_queues, ..self }
    }

    pub fn child_of(self, parent: Arc<dyn Device>) -> Self {
        Self {
            parent: Some(parent),
            ..self
        }
    }

    pub fn bind_fails(self) -> Self {
        Self {
            bind_ok: false,
            ..self
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event)
    }
}

#[inline]
pub fn dyn_(dev: &Arc<MockDevice>) -> Arc<dyn Device> {
    dev.clone()
}

impl Device for MockDevice {
    fn class(&self) -> DeviceClass {
        self.class
    }

    fn is_custom_host_allocator(&self) -> bool {
        self.custom_host_alloc
    }

    fn supports_unified_memory(&self) -> bool {
        self.svm
    }

    fn parent(&self) -> Option<&Arc<dyn Device>> {
        self.parent.as_ref()
    }

    fn bind_external_device(&self, binding: &ExternalBinding, validate_only: bool) -> bool {
        self.record(Event::Bind(*binding, validate_only));
        self.bind_ok
    }

    fn unbind_external_device(&self, binding: &ExternalBinding, validate_only: bool) {
        self.record(Event::Unbind(*binding, validate_only))
    }

    fn host_alloc(&self, size: usize, alignment: usize, atomics: bool) -> Option<NonNull<u8>> {
        self.record(Event::HostAlloc(size, alignment, atomics));
        NonNull::new(HOST_ADDR as _)
    }

    unsafe fn host_free(&self, ptr: NonNull<u8>) {
        self.record(Event::HostFree(ptr.as_ptr() as _))
    }

    fn svm_alloc(
        &self,
        _context: &Context,
        size: usize,
        alignment: usize,
        _flags: SvmFlags,
    ) -> Option<NonNull<u8>> {
        self.record(Event::SvmAlloc(size, alignment));
        NonNull::new(self.svm_addr? as _)
    }

    unsafe fn svm_free(&self, ptr: NonNull<u8>) {
        self.record(Event::SvmFree(ptr.as_ptr() as _))
    }

    fn max_on_device_queues(&self) -> usize {
        self.max_queues
    }
}
