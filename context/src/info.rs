use crate::{
    interop::ExternalKind,
    invalid_gl_share_group, invalid_value,
    property::{platform_id, Property, PropertyIter},
    unsupported_platform, ContextError,
};
use std::{
    ffi::c_void,
    mem::{size_of, transmute},
    num::NonZeroUsize,
    ops::{BitOr, BitOrAssign},
};

/// 外部图形 API 的不透明句柄。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct Handle(NonZeroUsize);

impl Handle {
    #[inline]
    pub fn new(raw: isize) -> Option<Self> {
        NonZeroUsize::new(raw as usize).map(Self)
    }

    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0.get()
    }

    #[inline]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0.get() as _
    }
}

/// 命令拦截回调的签名。
pub type InterceptFn = unsafe extern "C" fn(event: *mut c_void, status: *mut i32) -> i32;

/// 属性表传入的命令拦截回调。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct CommandIntercept(NonZeroUsize);

impl CommandIntercept {
    #[inline]
    pub fn new(raw: isize) -> Option<Self> {
        NonZeroUsize::new(raw as usize).map(Self)
    }

    #[inline]
    pub fn from_fn(f: InterceptFn) -> Self {
        Self(NonZeroUsize::new(f as usize).unwrap())
    }

    /// # Safety
    ///
    /// 属性表的提供者必须保证这个地址是一个签名为 [`InterceptFn`] 的函数。
    #[inline]
    pub unsafe fn as_fn(self) -> InterceptFn {
        transmute::<usize, InterceptFn>(self.0.get())
    }
}

/// 属性表请求的互操作和行为选项。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
#[repr(transparent)]
pub struct ContextFlags(u32);

impl ContextFlags {
    pub const GL_DEVICE: Self = Self(1 << 0);
    pub const D3D10_DEVICE: Self = Self(1 << 1);
    pub const D3D11_DEVICE: Self = Self(1 << 2);
    pub const INTEROP_USER_SYNC: Self = Self(1 << 3);
    pub const D3D9_DEVICE: Self = Self(1 << 4);
    pub const D3D9EX_DEVICE: Self = Self(1 << 5);
    pub const DXVA_DEVICE: Self = Self(1 << 6);
    pub const OFFLINE_DEVICES: Self = Self(1 << 7);
    pub const COMMAND_INTERCEPT: Self = Self(1 << 8);

    /// 要求绑定外部设备的选项。
    pub const EXTERNAL_DEVICES: Self = Self(
        Self::GL_DEVICE.0
            | Self::D3D10_DEVICE.0
            | Self::D3D11_DEVICE.0
            | Self::D3D9_DEVICE.0
            | Self::D3D9EX_DEVICE.0
            | Self::DXVA_DEVICE.0,
    );
    /// 释放上下文时需要解绑外部设备的选项。
    pub const UNBIND_ON_RELEASE: Self =
        Self(Self::GL_DEVICE.0 | Self::D3D10_DEVICE.0 | Self::D3D11_DEVICE.0);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for ContextFlags {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ContextFlags {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0
    }
}

/// 从属性表解析出的上下文描述。
#[derive(Clone, Default, Debug)]
pub struct Info {
    pub flags: ContextFlags,
    /// 选中的外部设备类型。
    pub kind: Option<ExternalKind>,
    /// 外部设备句柄。
    pub device: Option<Handle>,
    /// 外部上下文句柄。
    pub context: Option<Handle>,
    /// 属性表包括结尾键在内的字节数。
    pub properties_size: usize,
    pub command_intercept: Option<CommandIntercept>,
}

impl Info {
    /// 解析属性表。`None` 表示没有属性。
    pub fn parse(properties: Option<&[isize]>) -> Result<Self, ContextError> {
        let mut info = Self::default();
        let Some(properties) = properties else {
            return Ok(info);
        };

        let mut count = 0;
        for property in PropertyIter::new(properties) {
            info.apply(property?)?;
            count += 1;
        }
        info.properties_size = (count * 2 + 1) * size_of::<isize>();
        Ok(info)
    }

    fn apply(&mut self, property: Property) -> Result<(), ContextError> {
        match property {
            Property::InteropUserSync(value) => {
                if value == 1 {
                    self.flags |= ContextFlags::INTEROP_USER_SYNC
                }
            }
            Property::Platform(value) => {
                if value != 0 && value != platform_id() {
                    return Err(invalid_value(format!("unknown platform {value:#x}")));
                }
            }
            Property::OfflineDevices(value) => {
                if value != 1 {
                    return Err(invalid_value(format!(
                        "offline devices expects 1, got {value}"
                    )));
                }
                self.flags |= ContextFlags::OFFLINE_DEVICES
            }
            Property::CommandIntercept(callback) => {
                let Some(callback) = callback else {
                    return Err(invalid_value("command intercept callback is null"));
                };
                self.command_intercept = Some(callback);
                self.flags |= ContextFlags::COMMAND_INTERCEPT
            }
            Property::GlContext(handle) => {
                let Some(handle) = handle else {
                    return Err(invalid_gl_share_group("GL context is null"));
                };
                self.kind = Some(ExternalKind::GlContext);
                self.context = Some(handle);
                self.flags |= ContextFlags::GL_DEVICE
            }
            Property::GlDisplay(display, handle) => {
                let Some(handle) = handle else {
                    return Err(invalid_gl_share_group(format!("{display:?} display is null")));
                };
                if !display.is_available() {
                    return Err(unsupported_platform(format!(
                        "{display:?} display on this platform"
                    )));
                }
                self.device = Some(handle);
                self.flags |= ContextFlags::GL_DEVICE
            }
            Property::CglShareGroup(_) => {
                return Err(unsupported_platform("CGL share group"));
            }
            Property::External(kind, handle) => {
                let Some(handle) = handle else {
                    return Err(invalid_value(format!("{kind:?} device is null")));
                };
                if !kind.is_available() {
                    return Err(unsupported_platform(format!("{kind:?} on this platform")));
                }
                self.kind = Some(kind);
                self.device = Some(handle);
                self.flags |= kind.flag()
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{CommandIntercept, ContextFlags, Info};
    use crate::{keys::*, platform_id, ContextErrorKind, ExternalKind, Handle};
    use std::{ffi::c_void, mem::size_of};

    fn kind_of(raw: &[isize]) -> ContextErrorKind {
        Info::parse(Some(raw)).unwrap_err().kind
    }

    #[test]
    fn test_handle() {
        assert!(Handle::new(0).is_none());
        let handle = Handle::new(0x40).unwrap();
        assert_eq!(handle.as_raw(), 0x40);
        assert_eq!(handle.as_ptr::<c_void>() as usize, 0x40);
    }

    #[test]
    fn test_null() {
        let info = Info::parse(None).unwrap();
        assert!(info.flags.is_empty());
        assert_eq!(info.properties_size, 0);
        assert_eq!(info.kind, None);
        assert_eq!(info.command_intercept, None);
    }

    #[test]
    fn test_empty_list() {
        let info = Info::parse(Some(&[0][..])).unwrap();
        assert!(info.flags.is_empty());
        assert_eq!(info.properties_size, size_of::<isize>());
    }

    #[test]
    fn test_unknown_key_anywhere() {
        let valid = [INTEROP_USER_SYNC, 1, OFFLINE_DEVICES, 1, PLATFORM, 0];
        for pos in 0..=valid.len() / 2 {
            let mut raw = valid[..pos * 2].to_vec();
            raw.extend([0x7fff, 1]);
            raw.extend_from_slice(&valid[pos * 2..]);
            raw.push(0);
            assert_eq!(kind_of(&raw), ContextErrorKind::InvalidProperty);
        }
    }

    #[test]
    fn test_gl_context() {
        assert_eq!(
            kind_of(&[GL_CONTEXT, 0, 0]),
            ContextErrorKind::InvalidGlShareGroupReference
        );

        let info = Info::parse(Some(&[GL_CONTEXT, 0x1234, 0][..])).unwrap();
        assert_eq!(info.flags, ContextFlags::GL_DEVICE);
        assert_eq!(info.kind, Some(ExternalKind::GlContext));
        assert_eq!(info.context, Handle::new(0x1234));
        assert_eq!(info.device, None);
        assert_eq!(info.properties_size, 3 * size_of::<isize>());
    }

    #[test]
    fn test_gl_display() {
        assert_eq!(
            kind_of(&[GLX_DISPLAY, 0, 0]),
            ContextErrorKind::InvalidGlShareGroupReference
        );
        assert_eq!(
            kind_of(&[WGL_HDC, 0, 0]),
            ContextErrorKind::InvalidGlShareGroupReference
        );

        let raw = [GL_CONTEXT, 0x10, GLX_DISPLAY, 0x20, 0];
        if cfg!(target_os = "linux") {
            let info = Info::parse(Some(&raw[..])).unwrap();
            assert_eq!(info.flags, ContextFlags::GL_DEVICE);
            assert_eq!(info.kind, Some(ExternalKind::GlContext));
            assert_eq!(info.device, Handle::new(0x20));
            assert_eq!(info.context, Handle::new(0x10));
        } else {
            assert_eq!(kind_of(&raw), ContextErrorKind::UnsupportedPlatform);
        }
    }

    #[test]
    fn test_cgl_unsupported() {
        assert_eq!(
            kind_of(&[CGL_SHAREGROUP, 0x10, 0]),
            ContextErrorKind::UnsupportedPlatform
        );
    }

    #[test]
    fn test_d3d_null_handle() {
        for key in [
            D3D10_DEVICE,
            D3D11_DEVICE,
            ADAPTER_D3D9,
            ADAPTER_D3D9EX,
            ADAPTER_DXVA,
        ] {
            assert_eq!(kind_of(&[key, 0, 0]), ContextErrorKind::InvalidValue);
        }
    }

    #[test]
    fn test_d3d_device() {
        let raw = [D3D11_DEVICE, 0x40, 0];
        if cfg!(windows) {
            let info = Info::parse(Some(&raw[..])).unwrap();
            assert_eq!(info.flags, ContextFlags::D3D11_DEVICE);
            assert_eq!(info.kind, Some(ExternalKind::D3D11));
            assert_eq!(info.device, Handle::new(0x40));
        } else {
            assert_eq!(kind_of(&raw), ContextErrorKind::UnsupportedPlatform);
        }
    }

    #[test]
    fn test_platform() {
        assert!(Info::parse(Some(&[PLATFORM, 0, 0][..])).is_ok());
        assert!(Info::parse(Some(&[PLATFORM, platform_id(), 0][..])).is_ok());
        assert_eq!(
            kind_of(&[PLATFORM, platform_id() + 1, 0]),
            ContextErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_offline_devices() {
        let info = Info::parse(Some(&[OFFLINE_DEVICES, 1, 0][..])).unwrap();
        assert_eq!(info.flags, ContextFlags::OFFLINE_DEVICES);
        for value in [0, 2, -1] {
            assert_eq!(
                kind_of(&[OFFLINE_DEVICES, value, 0]),
                ContextErrorKind::InvalidValue
            );
        }
    }

    #[test]
    fn test_interop_user_sync() {
        let info = Info::parse(Some(&[INTEROP_USER_SYNC, 1, 0][..])).unwrap();
        assert_eq!(info.flags, ContextFlags::INTEROP_USER_SYNC);
        let info = Info::parse(Some(&[INTEROP_USER_SYNC, 0, 0][..])).unwrap();
        assert!(info.flags.is_empty());
        assert_eq!(info.properties_size, 3 * size_of::<isize>());
    }

    #[test]
    fn test_command_intercept() {
        unsafe extern "C" fn intercept(_event: *mut c_void, status: *mut i32) -> i32 {
            *status = 7;
            0
        }

        let callback = CommandIntercept::from_fn(intercept);
        let raw = [COMMAND_INTERCEPT_CALLBACK, intercept as usize as isize, 0];
        let info = Info::parse(Some(&raw[..])).unwrap();
        assert!(info.flags.contains(ContextFlags::COMMAND_INTERCEPT));
        assert_eq!(info.command_intercept, Some(callback));

        let mut status = 0;
        let intercept = unsafe { info.command_intercept.unwrap().as_fn() };
        let ret = unsafe { intercept(std::ptr::null_mut(), &mut status) };
        assert_eq!((ret, status), (0, 7));

        assert_eq!(
            kind_of(&[COMMAND_INTERCEPT_CALLBACK, 0, 0]),
            ContextErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_flags() {
        let flags = ContextFlags::GL_DEVICE | ContextFlags::OFFLINE_DEVICES;
        assert!(flags.contains(ContextFlags::GL_DEVICE));
        assert!(!flags.contains(ContextFlags::UNBIND_ON_RELEASE));
        assert!(flags.intersects(ContextFlags::UNBIND_ON_RELEASE));
        assert!(flags.intersects(ContextFlags::EXTERNAL_DEVICES));
        assert!(!ContextFlags::INTEROP_USER_SYNC.intersects(ContextFlags::EXTERNAL_DEVICES));
    }
}
