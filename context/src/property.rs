use crate::{
    info::{CommandIntercept, Handle},
    interop::ExternalKind,
    invalid_property, ContextError,
};

/// 属性表中可识别的键。
pub mod keys {
    pub const PLATFORM: isize = 0x1084;
    pub const INTEROP_USER_SYNC: isize = 0x1085;

    pub const GL_CONTEXT: isize = 0x2008;
    pub const GLX_DISPLAY: isize = 0x200A;
    pub const WGL_HDC: isize = 0x200B;
    pub const CGL_SHAREGROUP: isize = 0x200C;

    pub const D3D10_DEVICE: isize = 0x4014;
    pub const D3D11_DEVICE: isize = 0x401D;
    pub const ADAPTER_D3D9: isize = 0x2025;
    pub const ADAPTER_D3D9EX: isize = 0x2026;
    pub const ADAPTER_DXVA: isize = 0x2027;

    pub const COMMAND_INTERCEPT_CALLBACK: isize = 0x403D;
    pub const OFFLINE_DEVICES: isize = 0x403F;
}

/// 运行时的平台标识。
pub fn platform_id() -> isize {
    static PLATFORM: u8 = 0;
    &PLATFORM as *const u8 as isize
}

/// 携带 OpenGL 设备句柄的窗口系统。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DisplayKind {
    Glx,
    Wgl,
}

impl DisplayKind {
    #[inline]
    pub(crate) const fn is_available(self) -> bool {
        match self {
            Self::Glx => cfg!(target_os = "linux"),
            Self::Wgl => cfg!(windows),
        }
    }
}

/// 解码后的一条属性。
///
/// 句柄和回调为空时解码仍然成功，由 [`Info`](crate::Info) 决定空值是否合法。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Property {
    Platform(isize),
    InteropUserSync(isize),
    OfflineDevices(isize),
    CommandIntercept(Option<CommandIntercept>),
    GlContext(Option<Handle>),
    GlDisplay(DisplayKind, Option<Handle>),
    CglShareGroup(Option<Handle>),
    External(ExternalKind, Option<Handle>),
}

impl Property {
    pub fn decode(key: isize, value: isize) -> Result<Self, ContextError> {
        use keys::*;
        let handle = Handle::new(value);
        Ok(match key {
            PLATFORM => Self::Platform(value),
            INTEROP_USER_SYNC => Self::InteropUserSync(value),
            OFFLINE_DEVICES => Self::OfflineDevices(value),
            COMMAND_INTERCEPT_CALLBACK => Self::CommandIntercept(CommandIntercept::new(value)),
            GL_CONTEXT => Self::GlContext(handle),
            GLX_DISPLAY => Self::GlDisplay(DisplayKind::Glx, handle),
            WGL_HDC => Self::GlDisplay(DisplayKind::Wgl, handle),
            CGL_SHAREGROUP => Self::CglShareGroup(handle),
            D3D10_DEVICE => Self::External(ExternalKind::D3D10, handle),
            D3D11_DEVICE => Self::External(ExternalKind::D3D11, handle),
            ADAPTER_D3D9 => Self::External(ExternalKind::D3D9, handle),
            ADAPTER_D3D9EX => Self::External(ExternalKind::D3D9Ex, handle),
            ADAPTER_DXVA => Self::External(ExternalKind::Dxva, handle),
            _ => return Err(invalid_property(format!("unknown property key {key:#x}"))),
        })
    }
}

/// 按顺序解码以 0 键结尾的属性表。
///
/// 遇到 0 键停止；遇到无法识别的键或表在结尾键之前耗尽时产生一个错误并停止。
pub struct PropertyIter<'a> {
    raw: &'a [isize],
    done: bool,
}

impl<'a> PropertyIter<'a> {
    #[inline]
    pub fn new(raw: &'a [isize]) -> Self {
        Self { raw, done: false }
    }
}

impl Iterator for PropertyIter<'_> {
    type Item = Result<Property, ContextError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let raw = self.raw;
        match raw {
            [0, ..] => {
                self.done = true;
                None
            }
            &[key, value, ref tail @ ..] => {
                self.raw = tail;
                let ans = Property::decode(key, value);
                self.done = ans.is_err();
                Some(ans)
            }
            _ => {
                self.done = true;
                Some(Err(invalid_property("property list is not terminated")))
            }
        }
    }
}
