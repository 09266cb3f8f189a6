//! A parsed text bound to an engine.

use std::sync::Arc;

use kvconf_tokenizer::KeyPath;
use tracing::trace;

use crate::convert::{Request, convert_erased, downcast};
use crate::populate::Populator;
use crate::{Block, ConfError, Configurable, Converter, Engine, Target, Value};

/// Pairs of one text, ready to be applied to objects.
#[derive(Debug, Clone)]
pub struct Conf {
    engine: Arc<Engine>,
    block: Block,
}

impl Conf {
    pub fn new(engine: Arc<Engine>, block: Block) -> Self {
        Self { engine, block }
    }

    /// Parse `source` with a fresh engine.
    pub fn parse(source: &str) -> Self {
        Self::from_block(Block::parse(source))
    }

    pub fn from_block(block: Block) -> Self {
        Self::new(Arc::new(Engine::new()), block)
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Apply the pairs under `key` to `target`.
    ///
    /// With `key = "cont"`, `cont.Nums[0] = 1` sets `Nums[0]`. An empty key
    /// applies every pair as written. Pairs apply in source order, so the
    /// last assignment to a member wins.
    pub fn configure<T: Configurable>(&self, mut target: T, key: &str) -> Result<T, ConfError> {
        self.configure_in_place(&mut target, key)?;
        Ok(target)
    }

    /// Like [`configure`](Self::configure), on a borrowed target.
    ///
    /// On error, the pairs before the failing one stay applied.
    pub fn configure_in_place(&self, target: &mut dyn Target, key: &str) -> Result<(), ConfError> {
        let Some(prefix) = KeyPath::parse(key) else {
            trace!("{:?} is not a key; nothing to configure", key);
            return Ok(());
        };
        Populator::new(self).populate(target, &prefix)
    }

    /// Configure with the type's own name as key.
    pub fn configure_default<T: Configurable>(&self, target: T) -> Result<T, ConfError> {
        self.configure(target, &T::name())
    }

    /// Build one value per index of `key[...]`, in order of first appearance.
    pub fn configure_all<T: Value>(
        &self,
        factory: impl Fn(&str) -> T,
        key: &str,
    ) -> Result<Vec<T>, ConfError> {
        let entries = self.configure_map(factory, key)?;
        Ok(entries.into_iter().map(|(_, value)| value).collect())
    }

    /// Build one value per index of `key[...]`, paired with its index.
    ///
    /// `key[i].rest = v` applies `rest = v` to the value for `i`, created with
    /// `factory(i)` on first use; `key[i] = v` converts `v` itself.
    pub fn configure_map<T: Value>(
        &self,
        factory: impl Fn(&str) -> T,
        key: &str,
    ) -> Result<Vec<(String, T)>, ConfError> {
        self.configure_map_by(factory, key, |a, b| a == b)
    }

    /// Like [`configure_map`](Self::configure_map), grouping indices that
    /// `same_index` considers equal. The first spelling of an index is kept.
    pub fn configure_map_by<T: Value>(
        &self,
        factory: impl Fn(&str) -> T,
        key: &str,
        same_index: impl Fn(&str, &str) -> bool,
    ) -> Result<Vec<(String, T)>, ConfError> {
        let Some(prefix) = KeyPath::parse(key) else {
            return Ok(Vec::new());
        };
        let Some((last, parents)) = prefix.parts().split_last() else {
            return Ok(Vec::new());
        };

        let populator = Populator::new(self);
        let mut groups: Vec<(String, Option<T>)> = Vec::new();
        for item in self.block.items() {
            let parts = item.key().parts();
            if parts.len() <= parents.len() {
                continue;
            }
            let (head, tail) = parts.split_at(parents.len());
            if !head.iter().zip(parents).all(|(a, b)| a.matches(b)) {
                continue;
            }
            let Some((part, rest)) = tail.split_first() else {
                continue;
            };
            if part.normalized() != last.normalized() {
                continue;
            }
            let Some(index) = part.indices().first() else {
                continue;
            };

            let group = groups
                .iter()
                .position(|(i, _)| same_index(i, index.normalized()));
            let slot = match group {
                Some(slot) => slot,
                None => {
                    groups.push((index.normalized().to_string(), None));
                    groups.len() - 1
                }
            };
            let (name, value) = &mut groups[slot];
            if rest.is_empty() {
                let converted = self
                    .convert::<T>(item.original_value())
                    .map_err(|error| error.at(item.original_key(), item.value_span()))?;
                *value = Some(converted);
                continue;
            }
            match value.get_or_insert_with(|| factory(name)).as_target() {
                Some(target) => populator.apply_item(target, rest, item)?,
                None => trace!("{:?} does not lead to an object", item.original_key()),
            }
        }

        Ok(groups
            .into_iter()
            .filter_map(|(index, value)| Some((index, value?)))
            .collect())
    }

    /// Convert the value of the last item for `key`, if there is one.
    pub fn item_value<T: Value>(&self, key: &str) -> Result<Option<T>, ConfError> {
        let Some(item) = self.block.get(key) else {
            return Ok(None);
        };
        self.convert(item.original_value())
            .map(Some)
            .map_err(|error| error.at(item.original_key(), item.value_span()))
    }

    /// Convert `text` to `T`.
    pub fn convert<T: Value>(&self, text: &str) -> Result<T, ConfError> {
        T::convert(self, text, None)
    }

    /// Convert `text` to `T`, with `converter` in place of the type's own.
    ///
    /// When the converter fails, a `TypeRef` target resolves `text` as a
    /// registered type name, and any other target is instantiated from a
    /// factory registered as `text`. If neither applies, the converter's error
    /// is returned.
    pub fn convert_with<T: Value>(
        &self,
        text: &str,
        converter: Option<&Arc<dyn Converter>>,
    ) -> Result<T, ConfError> {
        let converter = match converter {
            Some(converter) => converter.clone(),
            None => self.engine.converters().resolve::<T>(),
        };
        let value = convert_erased(self, &Request::of::<T>(text), converter.as_ref())?;
        downcast(value)
    }

    /// Convert the value for `key`, or failing that `key` itself.
    ///
    /// Without an item for `key`, the key text is converted; if that fails,
    /// the type's default is returned when it has one.
    pub fn convert_for_key<T: Value>(&self, key: &str) -> Result<T, ConfError> {
        if let Some(value) = self.item_value(key)? {
            return Ok(value);
        }
        match self.convert::<T>(key) {
            Ok(value) => Ok(value),
            Err(error) => T::construct().ok_or(error),
        }
    }
}
