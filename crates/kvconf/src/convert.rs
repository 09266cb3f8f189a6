//! Converter resolution, caching and the conversion fallback chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{Conf, ConfError, ConfErrorKind, TypeRef, Value};

/// Turns text into a typed value.
///
/// Converters receive the [`Conf`] being applied, so a converter may build its
/// value from other pairs of the same text.
pub trait Converter: Send + Sync + 'static {
    fn convert(&self, text: &str, conf: &Conf) -> Result<Box<dyn Any + Send>, ConfError>;
}

/// The default converter: [`Value::parse`].
pub struct Structural<T>(PhantomData<fn() -> T>);

impl<T> Structural<T> {
    pub fn new() -> Self {
        Structural(PhantomData)
    }
}

impl<T> Default for Structural<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value> Converter for Structural<T> {
    fn convert(&self, text: &str, _conf: &Conf) -> Result<Box<dyn Any + Send>, ConfError> {
        let value = T::parse(text)?;
        Ok(Box::new(value))
    }
}

struct FnConverter<T, F> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> Converter for FnConverter<T, F>
where
    T: Value,
    F: Fn(&str, &Conf) -> Result<T, ConfError> + Send + Sync + 'static,
{
    fn convert(&self, text: &str, conf: &Conf) -> Result<Box<dyn Any + Send>, ConfError> {
        let value = (self.f)(text, conf)?;
        Ok(Box::new(value))
    }
}

/// Wrap a closure as a converter producing `T`.
pub fn converter_fn<T, F>(f: F) -> Arc<dyn Converter>
where
    T: Value,
    F: Fn(&str, &Conf) -> Result<T, ConfError> + Send + Sync + 'static,
{
    Arc::new(FnConverter {
        f,
        _marker: PhantomData,
    })
}

/// Per-type converter table.
///
/// Overrides registered with [`register`](Self::register) always win; other
/// types get their [`Structural`] converter on first use. Entries are never
/// evicted.
#[derive(Default)]
pub struct ConverterCache {
    by_value: RwLock<HashMap<TypeId, Arc<dyn Converter>>>,
    by_converter: RwLock<HashMap<TypeId, Arc<dyn Converter>>>,
}

impl ConverterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `converter` for every conversion to `T`. The last registration wins.
    pub fn register<T: Value>(&self, converter: Arc<dyn Converter>) {
        debug!("registering converter for {}", std::any::type_name::<T>());
        self.by_value.write().insert(TypeId::of::<T>(), converter);
    }

    /// The converter for `T`.
    pub fn resolve<T: Value>(&self) -> Arc<dyn Converter> {
        let id = TypeId::of::<T>();
        if let Some(converter) = self.by_value.read().get(&id) {
            return converter.clone();
        }
        trace!("resolving structural converter for {}", std::any::type_name::<T>());
        self.by_value
            .write()
            .entry(id)
            .or_insert_with(|| Arc::new(Structural::<T>::new()))
            .clone()
    }

    /// The shared instance of converter type `C`.
    pub fn instance<C: Converter + Default>(&self) -> Arc<dyn Converter> {
        self.instance_of(TypeId::of::<C>(), make_converter::<C>)
    }

    pub(crate) fn instance_of(
        &self,
        id: TypeId,
        make: fn() -> Arc<dyn Converter>,
    ) -> Arc<dyn Converter> {
        if let Some(converter) = self.by_converter.read().get(&id) {
            return converter.clone();
        }
        self.by_converter.write().entry(id).or_insert_with(make).clone()
    }

    /// Number of types with a resolved or registered converter.
    pub fn len(&self) -> usize {
        self.by_value.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn make_converter<C: Converter + Default>() -> Arc<dyn Converter> {
    Arc::new(C::default())
}

/// What a conversion is being asked for.
pub(crate) struct Request<'a> {
    pub text: &'a str,
    pub type_id: TypeId,
    pub type_name: &'static str,
}

impl<'a> Request<'a> {
    pub fn of<T: Value>(text: &'a str) -> Self {
        Self {
            text,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

enum Outcome {
    Converted(Box<dyn Any + Send>),
    Declined,
    Failed(ConfError),
}

type Fallback = fn(&Conf, &Request<'_>) -> Outcome;

/// Tried in order after the converter fails.
const FALLBACKS: &[Fallback] = &[type_reference, named_instance];

/// A `TypeRef` target is resolved by name, and must resolve.
fn type_reference(conf: &Conf, request: &Request<'_>) -> Outcome {
    if request.type_id != TypeId::of::<TypeRef>() {
        return Outcome::Declined;
    }
    match conf.engine().types().resolve(request.text) {
        Some(type_ref) => Outcome::Converted(Box::new(type_ref)),
        None => Outcome::Failed(ConfError::new(ConfErrorKind::UnknownType {
            name: request.text.trim().to_string(),
        })),
    }
}

/// The text names a registered factory producing the target type.
fn named_instance(conf: &Conf, request: &Request<'_>) -> Outcome {
    match conf.engine().types().create_erased(request.text, request.type_id) {
        Some(value) => Outcome::Converted(value),
        None => Outcome::Declined,
    }
}

pub(crate) fn convert_erased(
    conf: &Conf,
    request: &Request<'_>,
    converter: &dyn Converter,
) -> Result<Box<dyn Any + Send>, ConfError> {
    debug!("converting {:?} to {}", request.text, request.type_name);
    let error = match converter.convert(request.text, conf) {
        Ok(value) => return Ok(value),
        Err(error) => error,
    };
    for fallback in FALLBACKS {
        match fallback(conf, request) {
            Outcome::Converted(value) => return Ok(value),
            Outcome::Failed(error) => return Err(error),
            Outcome::Declined => {}
        }
    }
    debug!("no conversion of {:?} to {}: {}", request.text, request.type_name, error);
    Err(error)
}

pub(crate) fn downcast<T: Value>(value: Box<dyn Any + Send>) -> Result<T, ConfError> {
    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| {
            ConfError::new(ConfErrorKind::TypeMismatch {
                expected: std::any::type_name::<T>(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;
    use facet_testhelpers::test;

    fn conf(source: &str) -> Conf {
        Arc::new(Engine::new()).load(source)
    }

    #[test]
    fn test_resolve_is_memoized() {
        let cache = ConverterCache::new();
        assert!(cache.is_empty());
        let first = cache.resolve::<u32>();
        let second = cache.resolve::<u32>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_registered_converter_wins() {
        let conf = conf("");
        assert_eq!(conf.convert::<u32>("12"), Ok(12));
        conf.engine()
            .converters()
            .register::<u32>(converter_fn::<u32, _>(|text, _| Ok(text.len() as u32)));
        assert_eq!(conf.convert::<u32>("12"), Ok(2));
        conf.engine()
            .converters()
            .register::<u32>(converter_fn::<u32, _>(|_, _| Ok(7)));
        assert_eq!(conf.convert::<u32>("12"), Ok(7));
    }

    #[test]
    fn test_wrong_product_is_a_mismatch() {
        let conf = conf("");
        conf.engine()
            .converters()
            .register::<u8>(converter_fn::<String, _>(|text, _| Ok(text.to_string())));
        let error = conf.convert::<u8>("1").unwrap_err();
        assert!(matches!(error.kind, ConfErrorKind::TypeMismatch { expected: "u8" }));
    }

    #[test]
    fn test_type_reference() {
        let conf = conf("");
        conf.engine().types().register("Big Number", || 1_000_000_u64);
        let type_ref = conf.convert::<TypeRef>("bignumber").unwrap();
        assert_eq!(type_ref.name(), "Big Number");
        assert!(type_ref.produces::<u64>());

        let error = conf.convert::<TypeRef>("Small Number").unwrap_err();
        assert_eq!(
            error.kind,
            ConfErrorKind::UnknownType {
                name: "Small Number".into()
            }
        );
    }

    #[test]
    fn test_named_instance_after_failed_conversion() {
        let conf = conf("");
        conf.engine().types().register("lots", || 1_000_u32);
        assert_eq!(conf.convert::<u32>("LOTS"), Ok(1_000));
        assert_eq!(conf.convert::<u32>("5"), Ok(5));
        assert_eq!(
            conf.convert::<u32>("few").unwrap_err().kind,
            ConfErrorKind::invalid("few", "int")
        );
    }

    #[test]
    fn test_convert_for_key() {
        let conf = conf("port = 80\nname = web");
        assert_eq!(conf.convert_for_key::<u16>("PORT"), Ok(80));
        assert_eq!(conf.convert_for_key::<u16>("8080"), Ok(8080));
        assert_eq!(conf.convert_for_key::<u16>("missing"), Ok(0));
        assert!(conf.convert_for_key::<TypeRef>("missing").is_err());

        let error = conf.convert_for_key::<u16>("name").unwrap_err();
        assert_eq!(error.key.as_deref(), Some("name"));
    }
}
