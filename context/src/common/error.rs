use std::{error::Error, fmt};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ContextErrorKind {
    InvalidProperty,
    InvalidValue,
    InvalidGlShareGroupReference,
    OutOfHostMemory,
    UnsupportedPlatform,
}

#[derive(Clone, Debug)]
pub struct ContextError {
    pub kind: ContextErrorKind,
    pub info: String,
}

impl fmt::Display for ContextError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.info)
    }
}

impl Error for ContextError {}

pub(super) mod functions {
    use super::{ContextError, ContextErrorKind::*};

    macro_rules! builder {
        ($ty:ident: $name:ident $kind:expr) => {
            #[inline]
            pub fn $name(info: impl Into<String>) -> $ty {
                $ty {
                    kind: $kind,
                    info: info.into(),
                }
            }
        };
    }

    builder!(ContextError: invalid_property       InvalidProperty             );
    builder!(ContextError: invalid_value          InvalidValue                );
    builder!(ContextError: invalid_gl_share_group InvalidGlShareGroupReference);
    builder!(ContextError: out_of_host_memory     OutOfHostMemory             );
    builder!(ContextError: unsupported_platform   UnsupportedPlatform         );
}

#[test]
fn test_display() {
    use functions::invalid_value;

    let e = invalid_value("offline devices expects 1, got 2");
    assert_eq!(e.kind, ContextErrorKind::InvalidValue);
    assert_eq!(
        e.to_string(),
        "InvalidValue: offline devices expects 1, got 2"
    );
}
