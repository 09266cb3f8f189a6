//! Member descriptions of configurable types.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use facet::{Facet, Shape};
use kvconf_tokenizer::normalize_name;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::access::{Access, FieldAccess, ListAccess, MapAccess};
use crate::convert::make_converter;
use crate::reflect::{open_shape, open_typed, reflected_members};
use crate::{Converter, ConverterCache, MapLike, Value};

/// Longest a sequence member grows through an index, unless the member sets
/// its own [`max_len`](Member::max_len).
pub const DEFAULT_MAX_LEN: usize = 65_536;

/// A type whose members can be set from key/value pairs.
///
/// ```rust,ignore
/// impl Configurable for Kid {
///     fn describe(members: &mut Members<Self>) {
///         members.field("Mom", |kid| &mut kid.mom);
///         members.field("Pet", |kid| &mut kid.pet).alias("Animal");
///     }
/// }
/// ```
///
/// Types deriving `Facet` can read their members from the shape instead,
/// with [`Members::reflect`] or the [`configurable!`](crate::configurable) macro.
pub trait Configurable: Default + Send + 'static {
    /// Register the settable members.
    fn describe(members: &mut Members<Self>);

    /// The key used by [`Conf::configure_default`](crate::Conf::configure_default).
    fn name() -> Cow<'static, str> {
        Cow::Borrowed(short_type_name(std::any::type_name::<Self>()))
    }
}

fn short_type_name(name: &'static str) -> &'static str {
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

/// A configurable object behind a reference.
pub trait Target: Any + Send {
    fn description(&self, cache: &DescriptorCache) -> Arc<Description>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Configurable> Target for T {
    fn description(&self, cache: &DescriptorCache) -> Arc<Description> {
        cache.describe::<T>()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Collects the members of `T` during [`Configurable::describe`].
pub struct Members<T> {
    members: Vec<Member>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: Configurable> Members<T> {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add `member`, replacing an earlier one with the same name.
    fn insert(&mut self, member: Member) -> &mut Member {
        let existing = self
            .members
            .iter()
            .position(|other| other.normalized[0] == member.normalized[0]);
        let index = match existing {
            Some(index) => {
                trace!("{} replaces an earlier member", member.name());
                self.members[index] = member;
                index
            }
            None => {
                self.members.push(member);
                self.members.len() - 1
            }
        };
        &mut self.members[index]
    }

    fn push(&mut self, name: &str, access: Box<dyn Access>) -> &mut Member {
        self.insert(Member::new(name, access))
    }

    /// A scalar or nested object member.
    pub fn field<F: Value>(&mut self, name: &str, get: fn(&mut T) -> &mut F) -> &mut Member {
        self.push(name, Box::new(FieldAccess { get }))
    }

    /// A sequence member: `name[0] = ...` sets elements, `name = a, b` appends.
    pub fn list<E: Value>(&mut self, name: &str, get: fn(&mut T) -> &mut Vec<E>) -> &mut Member {
        self.push(name, Box::new(ListAccess { get }))
    }

    /// A mapping member: `name[key] = ...` upserts entries.
    pub fn map<M: MapLike>(&mut self, name: &str, get: fn(&mut T) -> &mut M) -> &mut Member {
        self.push(name, Box::new(MapAccess { get }))
    }
}

impl<T: Configurable + Facet<'static>> Members<T> {
    /// Add a member for every field of `T`'s shape that has a text form.
    ///
    /// Fields named by earlier calls are left alone, and members added
    /// afterwards replace reflected ones, so the builder methods override.
    pub fn reflect(&mut self) -> &mut Self {
        for member in reflected_members(T::SHAPE, open_typed::<T>) {
            if self.members.iter().any(|other| other.normalized[0] == member.normalized[0]) {
                trace!("keeping declared member {}", member.name());
                continue;
            }
            self.members.push(member);
        }
        self
    }
}

#[derive(Clone)]
enum ConverterSource {
    Shared(Arc<dyn Converter>),
    Cached(TypeId, fn() -> Arc<dyn Converter>),
}

/// One settable member of a configurable type.
pub struct Member {
    names: Vec<String>,
    normalized: Vec<String>,
    required: bool,
    position: Option<usize>,
    converter: Option<ConverterSource>,
    separator: char,
    max_len: usize,
    kind: Option<Cow<'static, str>>,
    access: Box<dyn Access>,
}

impl Member {
    pub(crate) fn new(name: &str, access: Box<dyn Access>) -> Self {
        Self {
            names: vec![name.trim().to_string()],
            normalized: vec![normalize_name(name)],
            required: false,
            position: None,
            converter: None,
            separator: ',',
            max_len: DEFAULT_MAX_LEN,
            kind: None,
            access,
        }
    }

    /// Another name the member answers to.
    pub fn alias(&mut self, name: &str) -> &mut Self {
        self.names.push(name.trim().to_string());
        self.normalized.push(normalize_name(name));
        self
    }

    pub fn required(&mut self) -> &mut Self {
        self.required = true;
        self
    }

    /// Order in which bare command-line values are assigned.
    pub fn position(&mut self, order: usize) -> &mut Self {
        self.position = Some(order);
        self
    }

    /// Convert values with a shared instance of `C`.
    pub fn converter<C: Converter + Default>(&mut self) -> &mut Self {
        self.converter = Some(ConverterSource::Cached(
            TypeId::of::<C>(),
            make_converter::<C>,
        ));
        self
    }

    /// Convert values with `converter`.
    pub fn converter_with(&mut self, converter: Arc<dyn Converter>) -> &mut Self {
        self.converter = Some(ConverterSource::Shared(converter));
        self
    }

    /// Separator for the list-items form. Defaults to `,`.
    pub fn separator(&mut self, separator: char) -> &mut Self {
        self.separator = separator;
        self
    }

    /// Longest a sequence grows through an index. Defaults to [`DEFAULT_MAX_LEN`].
    pub fn max_len(&mut self, max_len: usize) -> &mut Self {
        self.max_len = max_len;
        self
    }

    /// Override the usage hint.
    pub fn kind(&mut self, kind: impl Into<Cow<'static, str>>) -> &mut Self {
        self.kind = Some(kind.into());
        self
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn order(&self) -> Option<usize> {
        self.position
    }

    pub fn is_collection(&self) -> bool {
        self.access.is_collection()
    }

    pub fn list_separator(&self) -> char {
        self.separator
    }

    pub fn max_len_limit(&self) -> usize {
        self.max_len
    }

    /// Short usage hint such as `int` or `,<num>`.
    pub fn kind_hint(&self) -> Option<Cow<'static, str>> {
        self.kind
            .clone()
            .or_else(|| self.access.kind(self.separator))
    }

    /// Whether `name` (already normalized) is one of this member's names.
    pub fn matches(&self, name: &str) -> bool {
        self.normalized.iter().any(|n| n == name)
    }

    pub(crate) fn access(&self) -> &dyn Access {
        self.access.as_ref()
    }

    pub(crate) fn converter_for(&self, cache: &ConverterCache) -> Option<Arc<dyn Converter>> {
        match self.converter.as_ref()? {
            ConverterSource::Shared(converter) => Some(converter.clone()),
            ConverterSource::Cached(id, make) => Some(cache.instance_of(*id, *make)),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("names", &self.names)
            .field("required", &self.required)
            .field("position", &self.position)
            .field("collection", &self.is_collection())
            .finish_non_exhaustive()
    }
}

/// The members of one type.
#[derive(Debug)]
pub struct Description {
    type_name: &'static str,
    members: Vec<Member>,
}

impl Description {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// The member answering to a normalized name. The first declared wins.
    pub fn find(&self, normalized: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.matches(normalized))
    }

    /// Positional members in order.
    pub fn positional(&self) -> Vec<&Member> {
        let mut positional = self
            .members
            .iter()
            .filter(|member| member.position.is_some())
            .collect::<Vec<_>>();
        positional.sort_by_key(|member| member.position);
        positional
    }
}

/// Descriptions per type, built on first use.
#[derive(Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeId, Arc<Description>>>,
    shapes: RwLock<HashMap<&'static Shape, Arc<Description>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn describe<T: Configurable>(&self) -> Arc<Description> {
        let id = TypeId::of::<T>();
        if let Some(description) = self.entries.read().get(&id) {
            return description.clone();
        }
        let mut members = Members::<T>::new();
        T::describe(&mut members);
        debug!(
            "described {} with {} members",
            std::any::type_name::<T>(),
            members.members.len()
        );
        let description = Arc::new(Description {
            type_name: std::any::type_name::<T>(),
            members: members.members,
        });
        self.entries.write().entry(id).or_insert(description).clone()
    }

    /// The reflected members of a value reached through another reflected value.
    pub fn describe_shape(&self, shape: &'static Shape) -> Arc<Description> {
        if let Some(description) = self.shapes.read().get(shape) {
            return description.clone();
        }
        let members = reflected_members(shape, open_shape);
        debug!("reflected {} with {} members", shape.type_identifier, members.len());
        let description = Arc::new(Description {
            type_name: shape.type_identifier,
            members,
        });
        self.shapes.write().entry(shape).or_insert(description).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len() + self.shapes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[derive(Default)]
    #[allow(dead_code)]
    struct Gauge {
        size: u32,
        tags: Vec<String>,
        flag: bool,
    }

    impl Configurable for Gauge {
        fn describe(members: &mut Members<Self>) {
            members.field("Size", |p| &mut p.size).required().position(1);
            members.list("Tags", |p| &mut p.tags).alias("Labels").separator('|');
            members.field("Flag", |p| &mut p.flag).position(0).kind("on/off");
        }
    }

    #[test]
    fn test_describe_is_cached() {
        let cache = DescriptorCache::new();
        let first = cache.describe::<Gauge>();
        let second = cache.describe::<Gauge>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.type_name(), std::any::type_name::<Gauge>());
    }

    #[test]
    fn test_find_by_alias() {
        let description = DescriptorCache::new().describe::<Gauge>();
        assert_eq!(description.find("labels").unwrap().name(), "Tags");
        assert_eq!(description.find("tags").unwrap().names(), ["Tags", "Labels"]);
        assert!(description.find("Tags").is_none());
        assert!(description.find("missing").is_none());
    }

    #[test]
    fn test_member_details() {
        let description = DescriptorCache::new().describe::<Gauge>();
        let names = description
            .positional()
            .iter()
            .map(|member| member.name())
            .collect::<Vec<_>>();
        assert_eq!(names, ["Flag", "Size"]);

        let size = description.find("size").unwrap();
        assert!(size.is_required());
        assert!(!size.is_collection());
        assert_eq!(size.kind_hint().as_deref(), Some("int"));

        let tags = description.find("tags").unwrap();
        assert!(tags.is_collection());
        assert_eq!(tags.list_separator(), '|');
        assert_eq!(tags.kind_hint().as_deref(), Some("|"));

        assert_eq!(description.find("flag").unwrap().kind_hint().as_deref(), Some("on/off"));
    }

    #[test]
    fn test_default_name() {
        assert_eq!(Gauge::name(), "Gauge");
        assert_eq!(short_type_name("a::b::Holder<c::D>"), "Holder");
    }
}
