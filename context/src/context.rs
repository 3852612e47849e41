use crate::{
    aligned,
    info::Info,
    interop::{self, GlEnv},
    members::Members,
    out_of_host_memory,
    queues::{DeviceQueue, DeviceQueues, Registry},
    Config, ContextError, Device,
};
use log::debug;
use std::{
    mem::size_of,
    ptr::NonNull,
    sync::{Arc, Mutex},
};

/// 计算上下文。
///
/// 把一组设备绑定为一个执行上下文，仲裁主机内存和共享虚拟内存的分配，
/// 记录每个设备上的设备端队列，并管理与外部图形上下文的绑定。
pub struct Context {
    info: Info,
    pub(crate) members: Members,
    properties: Option<Box<[isize]>>,
    gl_env: Option<GlEnv>,
    queues: Mutex<Registry>,
}

impl Context {
    /// 以环境变量中的配置创建上下文。
    #[inline]
    pub fn new(
        devices: &[Arc<dyn Device>],
        properties: Option<&[isize]>,
    ) -> Result<Self, ContextError> {
        Self::with_config(devices, properties, &Config::from_env())
    }

    /// 创建上下文。
    ///
    /// 属性表解析失败时不会持有任何设备。
    /// 外部设备绑定失败时，已构造的部分在返回前析构，所有设备都被释放并解绑。
    pub fn with_config(
        devices: &[Arc<dyn Device>],
        properties: Option<&[isize]>,
        config: &Config,
    ) -> Result<Self, ContextError> {
        let info = Info::parse(properties)?;
        let properties = match properties {
            Some(raw) => Some(copy_properties(raw, info.properties_size)?),
            None => None,
        };

        let mut ctx = Self {
            info,
            members: Members::new(devices),
            properties,
            gl_env: None,
            queues: Default::default(),
        };
        ctx.gl_env = interop::bind(ctx.members.devices(), &ctx.info, config)?;

        debug!(
            "context created on {} devices, flags {:#x}",
            devices.len(),
            ctx.info.flags.bits()
        );
        Ok(ctx)
    }

    #[inline]
    pub fn info(&self) -> &Info {
        &self.info
    }

    #[inline]
    pub fn devices(&self) -> &[Arc<dyn Device>] {
        self.members.devices()
    }

    /// 支持共享虚拟内存的设备，首个设备决定分配路径。
    #[inline]
    pub fn svm_devices(&self) -> impl Iterator<Item = &Arc<dyn Device>> + '_ {
        self.members.svm()
    }

    #[inline]
    pub fn custom_host_alloc_device(&self) -> Option<&Arc<dyn Device>> {
        self.members.custom_host_alloc()
    }

    /// 创建时传入的属性表的副本，包括结尾键。
    #[inline]
    pub fn properties(&self) -> Option<&[isize]> {
        self.properties.as_deref()
    }

    #[inline]
    pub fn gl_env(&self) -> Option<&GlEnv> {
        self.gl_env.as_ref()
    }

    /// `dev` 是成员设备或成员设备的子设备。
    #[inline]
    pub fn contains_device(&self, dev: &dyn Device) -> bool {
        self.members.contains(dev)
    }

    /// 分配主机可见内存，有接管主机分配的设备时由它分配。
    pub fn host_alloc(&self, size: usize, alignment: usize, atomics: bool) -> Option<NonNull<u8>> {
        match self.members.custom_host_alloc() {
            Some(dev) => dev.host_alloc(size, alignment, atomics),
            None => aligned::allocate(size, alignment),
        }
    }

    /// 释放 [`Context::host_alloc`] 分配的内存。
    ///
    /// # Safety
    ///
    /// `ptr` 必须来自同一上下文的 [`Context::host_alloc`]，且未被释放过。
    pub unsafe fn host_free(&self, ptr: NonNull<u8>) {
        match self.members.custom_host_alloc() {
            Some(dev) => dev.host_free(ptr),
            None => aligned::deallocate(ptr),
        }
    }

    /// 锁定设备端队列表。
    #[inline]
    pub fn device_queues(&self) -> DeviceQueues {
        DeviceQueues(self.queues.lock().unwrap())
    }

    #[inline]
    pub fn is_dev_queue_possible(&self, dev: &dyn Device) -> bool {
        self.device_queues().is_possible(dev)
    }

    #[inline]
    pub fn add_device_queue(
        &self,
        dev: &dyn Device,
        queue: &Arc<dyn DeviceQueue>,
        make_default: bool,
    ) {
        self.device_queues().add(dev, queue, make_default)
    }

    #[inline]
    pub fn try_add_device_queue(
        &self,
        dev: &dyn Device,
        queue: &Arc<dyn DeviceQueue>,
        make_default: bool,
    ) -> bool {
        self.device_queues().try_add(dev, queue, make_default)
    }

    #[inline]
    pub fn remove_device_queue(&self, dev: &dyn Device, queue: &Arc<dyn DeviceQueue>) {
        self.device_queues().remove(dev, queue)
    }

    #[inline]
    pub fn def_device_queue(&self, dev: &dyn Device) -> Option<Arc<dyn DeviceQueue>> {
        self.device_queues().default_queue(dev)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        interop::unbind(self.members.devices(), &self.info);
        self.gl_env = None;
        debug!("context released {} devices", self.members.devices().len());
    }
}

fn copy_properties(raw: &[isize], size: usize) -> Result<Box<[isize]>, ContextError> {
    let len = size / size_of::<isize>();
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| out_of_host_memory(format!("properties copy: {e}")))?;
    buf.extend_from_slice(&raw[..len]);
    Ok(buf.into_boxed_slice())
}
