//! Applying pairs to an object graph.

use kvconf_tokenizer::{KeyPart, KeyPath};
use tracing::{debug, trace};

use crate::access::{Assign, Node, Slot};
use crate::{Conf, ConfError, Item, Target};

pub(crate) struct Populator<'c> {
    conf: &'c Conf,
}

impl<'c> Populator<'c> {
    pub fn new(conf: &'c Conf) -> Self {
        Self { conf }
    }

    /// Apply every item under `prefix`, in order, with the prefix removed.
    pub fn populate(&self, target: &mut dyn Target, prefix: &KeyPath) -> Result<(), ConfError> {
        for item in self.conf.block().items() {
            let key = item.key();
            if key.is_empty() {
                trace!("ignoring {:?}: no key", item.original_value());
                continue;
            }
            if key.len() <= prefix.len() || !key.starts_with(prefix) {
                continue;
            }
            self.apply_item(target, &key.parts()[prefix.len()..], item)?;
        }
        Ok(())
    }

    /// Apply one item through `parts`, a suffix of its key.
    pub fn apply_item(
        &self,
        target: &mut dyn Target,
        parts: &[KeyPart],
        item: &Item,
    ) -> Result<(), ConfError> {
        self.apply(Node::Object(target), parts, item.original_value())
            .map_err(|error| error.at(item.original_key(), item.value_span()))
    }

    fn apply(&self, node: Node<'_>, parts: &[KeyPart], text: &str) -> Result<(), ConfError> {
        let Some((part, rest)) = parts.split_first() else {
            return Ok(());
        };
        let descriptors = self.conf.engine().descriptors();
        let (description, object) = match node {
            Node::Object(target) => {
                let description = target.description(descriptors);
                (description, Slot::Any(target.as_any_mut()))
            }
            Node::Shape(poke) => (descriptors.describe_shape(poke.shape()), Slot::Shape(poke)),
        };
        let Some(member) = description.find(part.normalized()) else {
            trace!("ignoring unknown key {:?} on {}", part.original(), description.type_name());
            return Ok(());
        };
        let index = part.indices().first();
        if part.indices().len() > 1 {
            trace!("ignoring extra indices on {:?}", part.original());
        }

        let cx = Assign {
            conf: self.conf,
            member,
        };
        if rest.is_empty() {
            debug!("assigning {}.{}", description.type_name(), member.name());
            return match index {
                Some(index) => member.access().assign_at(object, &cx, index, text),
                None => member.access().assign(object, &cx, text),
            };
        }
        match member.access().nested(object, &cx, index)? {
            Some(nested) => self.apply(nested, rest, text),
            None => {
                trace!("{:?} does not lead to an object", part.original());
                Ok(())
            }
        }
    }
}
