mod gl;

pub use gl::GlEnv;

use crate::{
    info::{ContextFlags, Handle, Info},
    invalid_gl_share_group, invalid_value, keys, Config, ContextError, Device,
};
use log::{debug, warn};
use std::sync::Arc;

/// 外部图形设备的类型。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ExternalKind {
    GlContext,
    D3D10,
    D3D11,
    D3D9,
    D3D9Ex,
    Dxva,
}

impl ExternalKind {
    /// 选中这个类型的属性键。
    #[inline]
    pub const fn key(self) -> isize {
        match self {
            Self::GlContext => keys::GL_CONTEXT,
            Self::D3D10 => keys::D3D10_DEVICE,
            Self::D3D11 => keys::D3D11_DEVICE,
            Self::D3D9 => keys::ADAPTER_D3D9,
            Self::D3D9Ex => keys::ADAPTER_D3D9EX,
            Self::Dxva => keys::ADAPTER_DXVA,
        }
    }

    #[inline]
    pub const fn flag(self) -> ContextFlags {
        match self {
            Self::GlContext => ContextFlags::GL_DEVICE,
            Self::D3D10 => ContextFlags::D3D10_DEVICE,
            Self::D3D11 => ContextFlags::D3D11_DEVICE,
            Self::D3D9 => ContextFlags::D3D9_DEVICE,
            Self::D3D9Ex => ContextFlags::D3D9EX_DEVICE,
            Self::Dxva => ContextFlags::DXVA_DEVICE,
        }
    }

    #[inline]
    pub(crate) const fn is_available(self) -> bool {
        match self {
            Self::GlContext => true,
            _ => cfg!(windows),
        }
    }
}

/// 传递给设备的外部绑定参数。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ExternalBinding {
    pub kind: Option<ExternalKind>,
    pub device: Option<Handle>,
    pub context: Option<Handle>,
}

impl From<&Info> for ExternalBinding {
    #[inline]
    fn from(info: &Info) -> Self {
        Self {
            kind: info.kind,
            device: info.device,
            context: info.context,
        }
    }
}

/// 将所有设备绑定到属性表指定的外部设备，需要时加载 GL 环境。
pub(crate) fn bind(
    devices: &[Arc<dyn Device>],
    info: &Info,
    config: &Config,
) -> Result<Option<GlEnv>, ContextError> {
    const VALIDATE_ONLY: bool = false;

    if !info.flags.intersects(ContextFlags::EXTERNAL_DEVICES) {
        return Ok(None);
    }

    let binding = ExternalBinding::from(info);
    let failed = devices
        .iter()
        .filter(|dev| !dev.bind_external_device(&binding, VALIDATE_ONLY))
        .count();

    let gl = info.flags.contains(ContextFlags::GL_DEVICE);
    if failed > 0 {
        warn!(
            "{failed} of {} devices failed to bind {:?} (key {:#x})",
            devices.len(),
            binding.kind,
            binding.kind.map_or(keys::GL_CONTEXT, ExternalKind::key)
        );
        return Err(if gl {
            invalid_gl_share_group("failed to bind GL context")
        } else {
            invalid_value(format!("failed to bind {:?}", binding.kind))
        });
    }
    debug!("{} devices bound to {:?}", devices.len(), binding.kind);

    if gl {
        GlEnv::load(config, &binding).map(Some)
    } else {
        Ok(None)
    }
}

/// 解除所有设备与外部设备的绑定，不检查结果。
pub(crate) fn unbind(devices: &[Arc<dyn Device>], info: &Info) {
    const VALIDATE_ONLY: bool = false;

    if !info.flags.intersects(ContextFlags::UNBIND_ON_RELEASE) {
        return;
    }

    let binding = ExternalBinding::from(info);
    for dev in devices {
        dev.unbind_external_device(&binding, VALIDATE_ONLY)
    }
}
