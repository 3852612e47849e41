use std::{env::var_os, path::PathBuf};

/// 上下文的运行时配置。
#[derive(Clone, Default, Debug)]
pub struct Config {
    /// 替代平台默认 OpenGL 动态库的路径。
    pub gl_library: Option<PathBuf>,
}

#[cfg(windows)]
const DEFAULT_GL_LIBRARIES: &[&str] = &["OpenGL32.dll"];
#[cfg(not(windows))]
const DEFAULT_GL_LIBRARIES: &[&str] = &["libGL.so.1", "libGL.so"];

impl Config {
    pub const GL_LIBRARY_ENV: &'static str = "CONTEXT_GL_LIBRARY";

    /// 从环境变量读取配置，未设置的项取默认值。
    pub fn from_env() -> Self {
        Self {
            gl_library: var_os(Self::GL_LIBRARY_ENV).map(PathBuf::from),
        }
    }

    /// 依次尝试加载的 OpenGL 动态库。
    pub fn gl_libraries(&self) -> Vec<PathBuf> {
        match &self.gl_library {
            Some(path) => vec![path.clone()],
            None => DEFAULT_GL_LIBRARIES.iter().map(PathBuf::from).collect(),
        }
    }
}

#[test]
fn test_gl_libraries() {
    let default = Config::default().gl_libraries();
    assert!(!default.is_empty());

    let config = Config {
        gl_library: Some("/opt/mesa/libGL.so".into()),
    };
    assert_eq!(config.gl_libraries(), [PathBuf::from("/opt/mesa/libGL.so")]);
}

#[test]
fn test_from_env() {
    std::env::set_var(Config::GL_LIBRARY_ENV, "custom-gl");
    let config = Config::from_env();
    std::env::remove_var(Config::GL_LIBRARY_ENV);
    assert_eq!(config.gl_library, Some(PathBuf::from("custom-gl")));
}
