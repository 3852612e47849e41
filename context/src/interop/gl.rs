use super::ExternalBinding;
use crate::{info::Handle, Config, ContextError};

#[cfg(use_gl)]
pub use loaded::GlEnv;

#[cfg(not(use_gl))]
pub use disabled::GlEnv;

#[cfg(use_gl)]
mod loaded {
    use super::{Config, ContextError, ExternalBinding, Handle};
    use crate::invalid_gl_share_group;
    use libloading::Library;
    use log::info;
    use std::{ffi::c_void, fmt};

    type GetCurrentContext = unsafe extern "system" fn() -> *mut c_void;
    type GetError = unsafe extern "system" fn() -> u32;
    type Flush = unsafe extern "system" fn();

    #[cfg(windows)]
    const GET_CURRENT_CONTEXT: &[u8] = b"wglGetCurrentContext\0";
    #[cfg(not(windows))]
    const GET_CURRENT_CONTEXT: &[u8] = b"glXGetCurrentContext\0";

    /// 与上下文绑定的 OpenGL 环境。
    ///
    /// 持有加载的 OpenGL 动态库和解析出的入口。
    pub struct GlEnv {
        device: Option<Handle>,
        context: Handle,
        get_current_context: GetCurrentContext,
        get_error: GetError,
        flush: Flush,
        finish: Flush,
        _library: Library,
    }

    impl GlEnv {
        pub(crate) fn load(
            config: &Config,
            binding: &ExternalBinding,
        ) -> Result<Self, ContextError> {
            let Some(context) = binding.context else {
                return Err(invalid_gl_share_group("GL context handle is missing"));
            };

            let paths = config.gl_libraries();
            let library = paths
                .iter()
                .find_map(|path| unsafe { Library::new(path) }.ok())
                .ok_or_else(|| {
                    invalid_gl_share_group(format!("failed to load any of {paths:?}"))
                })?;

            let get_current_context =
                unsafe { symbol::<GetCurrentContext>(&library, GET_CURRENT_CONTEXT) }?;
            let get_error = unsafe { symbol::<GetError>(&library, b"glGetError\0") }?;
            let flush = unsafe { symbol::<Flush>(&library, b"glFlush\0") }?;
            let finish = unsafe { symbol::<Flush>(&library, b"glFinish\0") }?;

            info!("GL environment loaded for context {:#x}", context.as_raw());
            Ok(Self {
                device: binding.device,
                context,
                get_current_context,
                get_error,
                flush,
                finish,
                _library: library,
            })
        }

        /// 外部设备句柄（GLX display 或 WGL HDC）。
        #[inline]
        pub fn device(&self) -> Option<Handle> {
            self.device
        }

        #[inline]
        pub fn context(&self) -> Handle {
            self.context
        }

        /// 绑定的 GL 上下文是否是调用线程的当前上下文。
        pub fn is_current(&self) -> bool {
            unsafe { (self.get_current_context)() == self.context.as_ptr::<c_void>() }
        }

        #[inline]
        pub fn error(&self) -> u32 {
            unsafe { (self.get_error)() }
        }

        #[inline]
        pub fn flush(&self) {
            unsafe { (self.flush)() }
        }

        #[inline]
        pub fn finish(&self) {
            unsafe { (self.finish)() }
        }
    }

    impl fmt::Debug for GlEnv {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.debug_struct("GlEnv")
                .field("device", &self.device)
                .field("context", &self.context)
                .finish_non_exhaustive()
        }
    }

    unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, ContextError> {
        library.get::<T>(name).map(|f| *f).map_err(|e| {
            let name = String::from_utf8_lossy(&name[..name.len() - 1]);
            invalid_gl_share_group(format!("{name}: {e}"))
        })
    }
}

#[cfg(not(use_gl))]
mod disabled {
    use super::{Config, ContextError, ExternalBinding, Handle};
    use crate::unsupported_platform;

    /// 与上下文绑定的 OpenGL 环境。未启用 `gl-interop` 时不可构造。
    #[derive(Debug)]
    pub enum GlEnv {}

    impl GlEnv {
        pub(crate) fn load(
            _config: &Config,
            _binding: &ExternalBinding,
        ) -> Result<Self, ContextError> {
            Err(unsupported_platform("built without gl-interop"))
        }

        #[inline]
        pub fn device(&self) -> Option<Handle> {
            match *self {}
        }

        #[inline]
        pub fn context(&self) -> Handle {
            match *self {}
        }

        #[inline]
        pub fn is_current(&self) -> bool {
            match *self {}
        }

        #[inline]
        pub fn error(&self) -> u32 {
            match *self {}
        }

        #[inline]
        pub fn flush(&self) {
            match *self {}
        }

        #[inline]
        pub fn finish(&self) {
            match *self {}
        }
    }
}
