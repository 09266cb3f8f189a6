//! Types that can be assigned from text.

use std::any::Any;
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Conf, ConfError, ConfErrorKind, Configurable, Converter, Target};

/// A type that can live in a member slot.
///
/// Every method has a default, so an empty `impl Value for MyType {}` makes a
/// type assignable through registered converters and named factories only.
pub trait Value: Any + Send + Sized {
    /// Structural conversion from text, used when no converter is registered.
    fn parse(text: &str) -> Result<Self, ConfErrorKind> {
        Err(ConfErrorKind::NoConversion {
            value: text.to_string(),
            type_name: std::any::type_name::<Self>(),
        })
    }

    /// A default instance, used to fill sequence gaps and create intermediates.
    fn construct() -> Option<Self> {
        None
    }

    /// The members of this value, if it is a configurable object.
    fn as_target(&mut self) -> Option<&mut dyn Target> {
        None
    }

    /// Short usage hint, such as `int` or `true/false`.
    fn kind() -> Option<Cow<'static, str>> {
        None
    }

    /// Convert `text` through the conversion chain of `conf`.
    fn convert(
        conf: &Conf,
        text: &str,
        converter: Option<&Arc<dyn Converter>>,
    ) -> Result<Self, ConfError> {
        conf.convert_with(text, converter)
    }
}

impl<T: Configurable> Value for T {
    fn construct() -> Option<Self> {
        Some(T::default())
    }

    fn as_target(&mut self) -> Option<&mut dyn Target> {
        Some(self)
    }
}

/// `None` until assigned; nested keys create the inner value on demand.
impl<T: Value> Value for Option<T> {
    fn parse(text: &str) -> Result<Self, ConfErrorKind> {
        T::parse(text).map(Some)
    }

    fn construct() -> Option<Self> {
        Some(None)
    }

    fn as_target(&mut self) -> Option<&mut dyn Target> {
        if self.is_none() {
            *self = T::construct();
        }
        self.as_mut()?.as_target()
    }

    fn kind() -> Option<Cow<'static, str>> {
        T::kind()
    }

    fn convert(
        conf: &Conf,
        text: &str,
        converter: Option<&Arc<dyn Converter>>,
    ) -> Result<Self, ConfError> {
        T::convert(conf, text, converter).map(Some)
    }
}

macro_rules! impl_value_from_str {
    ($kind:literal => $($ty:ty),+) => {
        $(
            impl Value for $ty {
                fn parse(text: &str) -> Result<Self, ConfErrorKind> {
                    text.trim()
                        .parse()
                        .map_err(|_| ConfErrorKind::invalid(text, $kind))
                }

                fn construct() -> Option<Self> {
                    Some(Self::default())
                }

                fn kind() -> Option<Cow<'static, str>> {
                    Some(Cow::Borrowed($kind))
                }
            }
        )+
    };
}

impl_value_from_str!("int" => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_value_from_str!("num" => f32, f64);

impl Value for bool {
    fn parse(text: &str) -> Result<Self, ConfErrorKind> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if text.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ConfErrorKind::invalid(text, "true/false"))
        }
    }

    fn construct() -> Option<Self> {
        Some(false)
    }

    fn kind() -> Option<Cow<'static, str>> {
        Some(Cow::Borrowed("true/false"))
    }
}

impl Value for char {
    fn parse(text: &str) -> Result<Self, ConfErrorKind> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConfErrorKind::invalid(text, "a single character")),
        }
    }

    fn construct() -> Option<Self> {
        Some('\0')
    }
}

impl Value for String {
    fn parse(text: &str) -> Result<Self, ConfErrorKind> {
        Ok(text.to_string())
    }

    fn construct() -> Option<Self> {
        Some(String::new())
    }

    fn kind() -> Option<Cow<'static, str>> {
        Some(Cow::Borrowed("str"))
    }
}

impl Value for PathBuf {
    fn parse(text: &str) -> Result<Self, ConfErrorKind> {
        Ok(PathBuf::from(text))
    }

    fn construct() -> Option<Self> {
        Some(PathBuf::new())
    }
}
