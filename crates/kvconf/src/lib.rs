#![doc = include_str!("../README.md")]

extern crate self as kvconf;

facet::define_attr_grammar! {
    ns "kvconf";
    crate_path ::kvconf;

    /// Field attributes read by [`Members::reflect`].
    pub enum Attr {
        /// `#[facet(kvconf::required)]`: the key must be present.
        Required,
        /// `#[facet(kvconf::positional)]`: takes the next bare command-line value,
        /// in field order.
        Positional,
        /// `#[facet(kvconf::separator = '|')]`: separator for the list-items form.
        Separator(Option<char>),
        /// `#[facet(kvconf::kind = "path")]`: usage hint.
        Kind(Option<&'static str>),
    }
}

mod error;
pub use error::{ConfError, ConfErrorKind};

mod diagnostic;

mod value;
pub use value::Value;

mod convert;
pub use convert::{Converter, ConverterCache, Structural, converter_fn};

mod registry;
pub use registry::{TypeRef, TypeRegistry};

mod access;
pub use access::MapLike;

mod describe;
pub use describe::{
    Configurable, DEFAULT_MAX_LEN, DescriptorCache, Description, Member, Members, Target,
};

mod reflect;

mod block;
pub use block::{Block, Item};

mod engine;
pub use engine::Engine;

mod populate;

mod conf;
pub use conf::Conf;

pub use kvconf_tokenizer::{KeyPath, Span, normalize};

#[cfg(test)]
mod tests;
