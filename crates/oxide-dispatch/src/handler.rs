//! Handler normalization.
//!
//! Routes accept several handler forms: context functions, functions
//! rendering a string, fixed text or bytes, displayable values and
//! numbers. Each form is resolved once, at registration, into a
//! [`HandlerSource`] and then into the canonical [`Handler`].
//!
//! ```
//! use oxide_dispatch::{Context, Formatted, HandlerSource, IntoHandler};
//!
//! assert!(matches!("hello".into_source(), HandlerSource::Text(_)));
//! assert!(matches!(42u32.into_source(), HandlerSource::Unsigned(42)));
//! assert!(matches!(Formatted('x').into_source(), HandlerSource::Cached(_)));
//! assert!(matches!(
//!     (|ctx: &mut Context| ctx.write_str("hi")).into_source(),
//!     HandlerSource::Func(_)
//! ));
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;

/// The canonical unit of dispatch.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Receives the context and the payload of a panicking handler.
pub type PanicHandler = Arc<dyn Fn(&mut Context, Box<dyn Any + Send>) + Send + Sync>;

/// A function producing the response body on every request.
pub type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

/// A handler argument, classified.
#[derive(Clone)]
pub enum HandlerSource {
    /// A context function, used as-is.
    Func(Handler),
    /// Called on every request; the returned string is the body.
    Render(RenderFn),
    /// Fixed text captured at registration.
    Text(Arc<[u8]>),
    /// Fixed bytes.
    Bytes(Arc<[u8]>),
    /// Textual form of a value, computed once at registration.
    Cached(Arc<[u8]>),
    /// Signed integer, formatted as decimal on every request.
    Signed(i64),
    /// Unsigned integer, formatted as decimal on every request.
    Unsigned(u64),
    /// Float, formatted fixed-point with six decimals on every request.
    Float(f64),
}

impl HandlerSource {
    /// Captures the `Display` output of `value` once.
    pub fn display(value: &impl fmt::Display) -> Self {
        Self::Cached(value.to_string().into_bytes().into())
    }

    /// Classifies a dynamically typed handler argument.
    ///
    /// Returns `None` when `value` is none of the supported forms; the
    /// caller reports that as a registration error.
    pub fn from_any(value: Box<dyn Any + Send + Sync>) -> Option<Self> {
        macro_rules! try_as {
            ($value:ident, $($ty:ty => $conv:expr),+ $(,)?) => {
                $(
                    let $value = match $value.downcast::<$ty>() {
                        Ok(v) => return Some($conv(*v)),
                        Err(other) => other,
                    };
                )+
            };
        }

        try_as!(value,
            HandlerSource => |s| s,
            Handler => HandlerSource::Func,
            RenderFn => HandlerSource::Render,
            String => |s: String| s.into_source(),
            &'static str => |s: &'static str| s.into_source(),
            Vec<u8> => |b: Vec<u8>| b.into_source(),
            &'static [u8] => |b: &'static [u8]| b.into_source(),
            i8 => |v: i8| v.into_source(),
            i16 => |v: i16| v.into_source(),
            i32 => |v: i32| v.into_source(),
            i64 => |v: i64| v.into_source(),
            isize => |v: isize| v.into_source(),
            u8 => |v: u8| v.into_source(),
            u16 => |v: u16| v.into_source(),
            u32 => |v: u32| v.into_source(),
            u64 => |v: u64| v.into_source(),
            usize => |v: usize| v.into_source(),
            f32 => |v: f32| v.into_source(),
            f64 => |v: f64| v.into_source(),
        );
        let _ = value;
        None
    }

    /// Builds the canonical handler.
    pub fn into_handler(self) -> Handler {
        match self {
            Self::Func(handler) => handler,
            Self::Render(render) => Arc::new(move |ctx: &mut Context| ctx.write_str(&render())),
            Self::Text(bytes) | Self::Bytes(bytes) | Self::Cached(bytes) => {
                Arc::new(move |ctx: &mut Context| ctx.write_bytes(&bytes))
            }
            Self::Signed(v) => Arc::new(move |ctx: &mut Context| ctx.write_str(&v.to_string())),
            Self::Unsigned(v) => Arc::new(move |ctx: &mut Context| ctx.write_str(&v.to_string())),
            Self::Float(v) => Arc::new(move |ctx: &mut Context| ctx.write_str(&format!("{v:.6}"))),
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Func(_) => "func",
            Self::Render(_) => "render",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Cached(_) => "cached",
            Self::Signed(_) => "signed",
            Self::Unsigned(_) => "unsigned",
            Self::Float(_) => "float",
        }
    }
}

impl fmt::Debug for HandlerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed(v) => write!(f, "Signed({v})"),
            Self::Unsigned(v) => write!(f, "Unsigned({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            other => write!(f, "{}(..)", other.kind()),
        }
    }
}

/// Wraps any `Display` value so it can be registered as a handler.
///
/// The value is formatted once, when the route is registered.
#[derive(Debug, Clone)]
pub struct Formatted<T>(pub T);

/// Marker types selecting an [`IntoHandler`] implementation.
pub mod marker {
    /// `Fn(&mut Context)`.
    #[derive(Debug)]
    pub enum ContextFn {}
    /// `Fn() -> String`.
    #[derive(Debug)]
    pub enum RenderFn {}
    /// Any value that is not a function.
    #[derive(Debug)]
    pub enum Value {}
}

/// Conversion of a handler argument into a [`HandlerSource`].
///
/// `M` only disambiguates the blanket implementations for closures; it is
/// always inferred.
pub trait IntoHandler<M> {
    /// Classifies `self`.
    fn into_source(self) -> HandlerSource;
}

impl<F> IntoHandler<marker::ContextFn> for F
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    fn into_source(self) -> HandlerSource {
        HandlerSource::Func(Arc::new(self))
    }
}

impl<F> IntoHandler<marker::RenderFn> for F
where
    F: Fn() -> String + Send + Sync + 'static,
{
    fn into_source(self) -> HandlerSource {
        HandlerSource::Render(Arc::new(self))
    }
}

impl IntoHandler<marker::Value> for HandlerSource {
    fn into_source(self) -> HandlerSource {
        self
    }
}

impl IntoHandler<marker::Value> for Handler {
    fn into_source(self) -> HandlerSource {
        HandlerSource::Func(self)
    }
}

impl IntoHandler<marker::Value> for RenderFn {
    fn into_source(self) -> HandlerSource {
        HandlerSource::Render(self)
    }
}

impl IntoHandler<marker::Value> for &'static str {
    fn into_source(self) -> HandlerSource {
        HandlerSource::Text(self.as_bytes().into())
    }
}

impl IntoHandler<marker::Value> for String {
    fn into_source(self) -> HandlerSource {
        HandlerSource::Text(self.into_bytes().into())
    }
}

impl IntoHandler<marker::Value> for Vec<u8> {
    fn into_source(self) -> HandlerSource {
        HandlerSource::Bytes(self.into())
    }
}

impl IntoHandler<marker::Value> for &'static [u8] {
    fn into_source(self) -> HandlerSource {
        HandlerSource::Bytes(self.into())
    }
}

impl<T: fmt::Display> IntoHandler<marker::Value> for Formatted<T> {
    fn into_source(self) -> HandlerSource {
        HandlerSource::display(&self.0)
    }
}

macro_rules! numeric_source {
    ($variant:ident as $wide:ty: $($ty:ty),+) => {
        $(
            impl IntoHandler<marker::Value> for $ty {
                fn into_source(self) -> HandlerSource {
                    HandlerSource::$variant(<$wide>::from(self))
                }
            }
        )+
    };
}

numeric_source!(Signed as i64: i8, i16, i32, i64);
numeric_source!(Unsigned as u64: u8, u16, u32, u64);
numeric_source!(Float as f64: f32, f64);

impl IntoHandler<marker::Value> for isize {
    fn into_source(self) -> HandlerSource {
        let wide = i64::try_from(self).unwrap_or(if self < 0 { i64::MIN } else { i64::MAX });
        HandlerSource::Signed(wide)
    }
}

impl IntoHandler<marker::Value> for usize {
    fn into_source(self) -> HandlerSource {
        HandlerSource::Unsigned(u64::try_from(self).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run(handler: &Handler) -> String {
        let mut ctx = Context::new(Request::get("/"));
        handler(&mut ctx);
        ctx.into_response().body_string().unwrap()
    }

    struct Counted<'a>(&'a AtomicUsize);

    impl fmt::Display for Counted<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.fetch_add(1, Ordering::SeqCst);
            f.write_str("counted")
        }
    }

    #[test]
    fn test_text_and_bytes() {
        assert_eq!(run(&"hello".into_source().into_handler()), "hello");
        assert_eq!(run(&String::from("owned").into_source().into_handler()), "owned");
        assert_eq!(run(&b"raw".to_vec().into_source().into_handler()), "raw");
        let slice: &'static [u8] = b"slice";
        assert_eq!(run(&slice.into_source().into_handler()), "slice");
    }

    #[test]
    fn test_numbers_format() {
        assert_eq!(run(&(-7i32).into_source().into_handler()), "-7");
        assert_eq!(run(&42usize.into_source().into_handler()), "42");
        assert_eq!(run(&1.5f64.into_source().into_handler()), "1.500000");
        assert_eq!(run(&0.25f32.into_source().into_handler()), "0.250000");
    }

    #[test]
    fn test_pointer_sized_numbers_widen() {
        assert!(matches!((-3isize).into_source(), HandlerSource::Signed(-3)));
        assert!(matches!(usize::MAX.into_source(), HandlerSource::Unsigned(_)));
        assert_eq!(run(&(-3isize).into_source().into_handler()), "-3");
        assert_eq!(run(&9u8.into_source().into_handler()), "9");
    }

    #[test]
    fn test_render_called_per_request() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let handler = (|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            "rendered".to_string()
        })
        .into_source()
        .into_handler();
        assert_eq!(run(&handler), "rendered");
        assert_eq!(run(&handler), "rendered");
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_display_cached_once() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let handler = Formatted(Counted(&CALLS)).into_source().into_handler();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        for _ in 0..3 {
            assert_eq!(run(&handler), "counted");
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_func_used_as_is() {
        let handler: Handler = Arc::new(|ctx: &mut Context| ctx.set_status(201));
        let normalized = handler.clone().into_source().into_handler();
        assert!(Arc::ptr_eq(&handler, &normalized));
    }

    #[test]
    fn test_from_any() {
        assert!(matches!(
            HandlerSource::from_any(Box::new("static")),
            Some(HandlerSource::Text(_))
        ));
        assert!(matches!(
            HandlerSource::from_any(Box::new(3u8)),
            Some(HandlerSource::Unsigned(3))
        ));
        assert!(matches!(
            HandlerSource::from_any(Box::new(2.0f32)),
            Some(HandlerSource::Float(_))
        ));
        let handler: Handler = Arc::new(|_: &mut Context| {});
        assert!(matches!(
            HandlerSource::from_any(Box::new(handler)),
            Some(HandlerSource::Func(_))
        ));
        assert!(HandlerSource::from_any(Box::new(vec![1u32, 2])).is_none());
        assert!(HandlerSource::from_any(Box::new(())).is_none());
    }
}
