//! Type-erased member accessors.

use std::any::Any;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use facet_reflect::Poke;
use kvconf_tokenizer::KeyIndex;
use tracing::trace;

use crate::{Conf, ConfError, ConfErrorKind, Member, Target, Value};

/// Context for assigning one member.
pub(crate) struct Assign<'a> {
    pub conf: &'a Conf,
    pub member: &'a Member,
}

impl Assign<'_> {
    /// Convert `text` with the member's converter, if it has one.
    pub fn convert<F: Value>(&self, text: &str) -> Result<F, ConfError> {
        let converter = self.member.converter_for(self.conf.engine().converters());
        F::convert(self.conf, text, converter.as_ref())
    }
}

/// The object a member is read from.
pub(crate) enum Slot<'t> {
    /// A [`Configurable`](crate::Configurable) value.
    Any(&'t mut dyn Any),
    /// A value known only by its facet shape.
    Shape(Poke<'t, 'static>),
}

/// Where a nested key leads.
pub(crate) enum Node<'t> {
    Object(&'t mut dyn Target),
    Shape(Poke<'t, 'static>),
}

pub(crate) trait Access: Send + Sync {
    /// `member = text`
    fn assign(&self, target: Slot<'_>, cx: &Assign<'_>, text: &str) -> Result<(), ConfError>;

    /// `member[index] = text`
    fn assign_at(
        &self,
        target: Slot<'_>,
        cx: &Assign<'_>,
        index: &KeyIndex,
        text: &str,
    ) -> Result<(), ConfError>;

    /// The object addressed by `member` or `member[index]`, created on demand.
    fn nested<'t>(
        &self,
        target: Slot<'t>,
        cx: &Assign<'_>,
        index: Option<&KeyIndex>,
    ) -> Result<Option<Node<'t>>, ConfError>;

    fn is_collection(&self) -> bool;

    fn kind(&self, separator: char) -> Option<Cow<'static, str>>;
}

pub(crate) fn mismatch(expected: &'static str) -> ConfError {
    ConfError::new(ConfErrorKind::TypeMismatch { expected })
}

pub(crate) fn owner<T: 'static>(target: Slot<'_>) -> Result<&mut T, ConfError> {
    match target {
        Slot::Any(any) => any
            .downcast_mut::<T>()
            .ok_or_else(|| mismatch(std::any::type_name::<T>())),
        Slot::Shape(_) => Err(mismatch(std::any::type_name::<T>())),
    }
}

fn missing_default<E: Value>() -> ConfError {
    ConfError::new(ConfErrorKind::MissingDefault {
        type_name: std::any::type_name::<E>(),
    })
}

fn default_of<E: Value>() -> Result<E, ConfError> {
    E::construct().ok_or_else(missing_default::<E>)
}

fn within(position: usize, max: usize) -> Result<(), ConfError> {
    if position >= max {
        return Err(ConfErrorKind::IndexOutOfRange {
            index: position,
            max,
        }
        .into());
    }
    Ok(())
}

/// Append the separated items of `text` to `list`.
pub(crate) fn extend_items<E: Value>(
    list: &mut Vec<E>,
    cx: &Assign<'_>,
    text: &str,
) -> Result<(), ConfError> {
    let separator = cx.member.list_separator();
    let mut items = Vec::new();
    for item in text.split(separator).map(str::trim).filter(|item| !item.is_empty()) {
        items.push(cx.convert::<E>(item)?);
    }
    if let Some(last) = (list.len() + items.len()).checked_sub(1) {
        within(last, cx.member.max_len_limit())?;
    }
    list.extend(items);
    Ok(())
}

/// Store `value` at `position`, filling the gap with defaults.
pub(crate) fn set_position<E: Value>(
    list: &mut Vec<E>,
    position: usize,
    value: E,
    max: usize,
) -> Result<(), ConfError> {
    within(position, max)?;
    if position < list.len() {
        list[position] = value;
        return Ok(());
    }
    while list.len() < position {
        list.push(default_of::<E>()?);
    }
    list.push(value);
    Ok(())
}

/// The element at `position`, growing the list with defaults.
pub(crate) fn slot<E: Value>(
    list: &mut Vec<E>,
    position: usize,
    max: usize,
) -> Result<&mut E, ConfError> {
    within(position, max)?;
    while list.len() <= position {
        list.push(default_of::<E>()?);
    }
    Ok(&mut list[position])
}

/// `|<int>` style hint for a list of `kind`.
pub(crate) fn list_kind(kind: Option<Cow<'static, str>>, separator: char) -> Cow<'static, str> {
    match kind {
        Some(kind) if kind != "str" => Cow::Owned(format!("{separator}<{kind}>")),
        _ => Cow::Owned(separator.to_string()),
    }
}

pub(crate) struct FieldAccess<T, F> {
    pub get: fn(&mut T) -> &mut F,
}

impl<T: Send + 'static, F: Value> Access for FieldAccess<T, F> {
    fn assign(&self, target: Slot<'_>, cx: &Assign<'_>, text: &str) -> Result<(), ConfError> {
        let value = cx.convert::<F>(text)?;
        *(self.get)(owner::<T>(target)?) = value;
        Ok(())
    }

    fn assign_at(
        &self,
        _target: Slot<'_>,
        cx: &Assign<'_>,
        index: &KeyIndex,
        _text: &str,
    ) -> Result<(), ConfError> {
        trace!("ignoring index [{}] on {}", index.original(), cx.member.name());
        Ok(())
    }

    fn nested<'t>(
        &self,
        target: Slot<'t>,
        cx: &Assign<'_>,
        index: Option<&KeyIndex>,
    ) -> Result<Option<Node<'t>>, ConfError> {
        if let Some(index) = index {
            trace!("ignoring index [{}] on {}", index.original(), cx.member.name());
            return Ok(None);
        }
        Ok((self.get)(owner::<T>(target)?).as_target().map(Node::Object))
    }

    fn is_collection(&self) -> bool {
        false
    }

    fn kind(&self, _separator: char) -> Option<Cow<'static, str>> {
        F::kind()
    }
}

pub(crate) struct ListAccess<T, E> {
    pub get: fn(&mut T) -> &mut Vec<E>,
}

impl<T: Send + 'static, E: Value> Access for ListAccess<T, E> {
    fn assign(&self, target: Slot<'_>, cx: &Assign<'_>, text: &str) -> Result<(), ConfError> {
        extend_items((self.get)(owner::<T>(target)?), cx, text)
    }

    fn assign_at(
        &self,
        target: Slot<'_>,
        cx: &Assign<'_>,
        index: &KeyIndex,
        text: &str,
    ) -> Result<(), ConfError> {
        let Some(position) = index.position() else {
            trace!("ignoring index [{}] on list {}", index.original(), cx.member.name());
            return Ok(());
        };
        let value = cx.convert::<E>(text)?;
        let list = (self.get)(owner::<T>(target)?);
        set_position(list, position, value, cx.member.max_len_limit())
    }

    fn nested<'t>(
        &self,
        target: Slot<'t>,
        cx: &Assign<'_>,
        index: Option<&KeyIndex>,
    ) -> Result<Option<Node<'t>>, ConfError> {
        let Some(position) = index.and_then(KeyIndex::position) else {
            trace!("list {} needs a numeric index", cx.member.name());
            return Ok(None);
        };
        let list = (self.get)(owner::<T>(target)?);
        Ok(slot(list, position, cx.member.max_len_limit())?
            .as_target()
            .map(Node::Object))
    }

    fn is_collection(&self) -> bool {
        true
    }

    fn kind(&self, separator: char) -> Option<Cow<'static, str>> {
        Some(list_kind(E::kind(), separator))
    }
}

/// A mapping member: indices upsert entries by converted key.
pub trait MapLike: Send + 'static {
    type Key: Value;
    type Item: Value;

    fn upsert(&mut self, key: Self::Key, item: Self::Item);

    /// The entry for `key`, inserting `make()` if absent.
    fn entry_mut(
        &mut self,
        key: Self::Key,
        make: impl FnOnce() -> Option<Self::Item>,
    ) -> Option<&mut Self::Item>;
}

impl<K: Value + Eq + Hash, V: Value, S> MapLike for HashMap<K, V, S>
where
    S: std::hash::BuildHasher + Send + 'static,
{
    type Key = K;
    type Item = V;

    fn upsert(&mut self, key: K, item: V) {
        self.insert(key, item);
    }

    fn entry_mut(&mut self, key: K, make: impl FnOnce() -> Option<V>) -> Option<&mut V> {
        match self.entry(key) {
            std::collections::hash_map::Entry::Occupied(entry) => Some(entry.into_mut()),
            std::collections::hash_map::Entry::Vacant(entry) => Some(entry.insert(make()?)),
        }
    }
}

impl<K: Value + Ord, V: Value> MapLike for BTreeMap<K, V> {
    type Key = K;
    type Item = V;

    fn upsert(&mut self, key: K, item: V) {
        self.insert(key, item);
    }

    fn entry_mut(&mut self, key: K, make: impl FnOnce() -> Option<V>) -> Option<&mut V> {
        match self.entry(key) {
            std::collections::btree_map::Entry::Occupied(entry) => Some(entry.into_mut()),
            std::collections::btree_map::Entry::Vacant(entry) => Some(entry.insert(make()?)),
        }
    }
}

pub(crate) struct MapAccess<T, M> {
    pub get: fn(&mut T) -> &mut M,
}

impl<T: Send + 'static, M: MapLike> Access for MapAccess<T, M> {
    fn assign(&self, _target: Slot<'_>, cx: &Assign<'_>, _text: &str) -> Result<(), ConfError> {
        trace!("map {} needs an index", cx.member.name());
        Ok(())
    }

    fn assign_at(
        &self,
        target: Slot<'_>,
        cx: &Assign<'_>,
        index: &KeyIndex,
        text: &str,
    ) -> Result<(), ConfError> {
        let key = cx.conf.convert::<M::Key>(index.normalized())?;
        let item = cx.convert::<M::Item>(text)?;
        (self.get)(owner::<T>(target)?).upsert(key, item);
        Ok(())
    }

    fn nested<'t>(
        &self,
        target: Slot<'t>,
        cx: &Assign<'_>,
        index: Option<&KeyIndex>,
    ) -> Result<Option<Node<'t>>, ConfError> {
        let Some(index) = index else {
            trace!("map {} needs an index", cx.member.name());
            return Ok(None);
        };
        let key = cx.conf.convert::<M::Key>(index.normalized())?;
        let map = (self.get)(owner::<T>(target)?);
        let item = map
            .entry_mut(key, <M::Item as Value>::construct)
            .ok_or_else(missing_default::<M::Item>)?;
        Ok(item.as_target().map(Node::Object))
    }

    fn is_collection(&self) -> bool {
        true
    }

    fn kind(&self, _separator: char) -> Option<Cow<'static, str>> {
        <M::Item as Value>::kind()
    }
}
