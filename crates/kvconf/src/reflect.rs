//! Members read from facet shapes.

use std::borrow::Cow;

use facet::{Facet, Field, Shape, Type, UserType};
use facet_path::{Path, PathStep};
use facet_reflect::Poke;
use kvconf_tokenizer::KeyIndex;
use tracing::{debug, trace};

use crate::access::{
    Access, Assign, Node, Slot, extend_items, list_kind, mismatch, owner, set_position,
};
use crate::{Attr, ConfError, Member, Value};

/// Opens the value a reflected member belongs to.
pub(crate) type Open = for<'t> fn(Slot<'t>) -> Result<Poke<'t, 'static>, ConfError>;

/// Opens a `Configurable` value of type `R`, or passes a reflected one through.
pub(crate) fn open_typed<R: Facet<'static> + 'static>(
    slot: Slot<'_>,
) -> Result<Poke<'_, 'static>, ConfError> {
    match slot {
        Slot::Shape(poke) => Ok(poke),
        typed => Ok(Poke::new(owner::<R>(typed)?)),
    }
}

pub(crate) fn open_shape(slot: Slot<'_>) -> Result<Poke<'_, 'static>, ConfError> {
    match slot {
        Slot::Shape(poke) => Ok(poke),
        Slot::Any(_) => Err(mismatch("a reflected value")),
    }
}

/// Members for the fields of `shape` that can be set from text.
pub(crate) fn reflected_members(shape: &'static Shape, open: Open) -> Vec<Member> {
    let Type::User(UserType::Struct(def)) = shape.ty else {
        debug!("{} is not a struct; no members", shape.type_identifier);
        return Vec::new();
    };

    let mut members = Vec::new();
    let mut positional = 0;
    for (index, field) in def.fields.iter().enumerate() {
        if field.should_skip_deserializing() {
            continue;
        }
        let Some(handler) = Handler::for_shape(field.shape()) else {
            debug!(
                "skipping {}.{}: {} has no text form",
                shape.type_identifier,
                field.name,
                field.shape().type_identifier
            );
            continue;
        };
        let access = FieldPath {
            root: shape,
            field: index as u32,
            open,
            handler,
        };
        let mut member = Member::new(field.effective_name(), Box::new(access));
        if let Some(alias) = field.alias {
            member.alias(alias);
        }
        apply_attrs(&mut member, field, &mut positional);
        members.push(member);
    }
    members
}

fn apply_attrs(member: &mut Member, field: &Field, positional: &mut usize) {
    let attrs = field.attributes.iter().filter(|attr| attr.ns == Some("kvconf"));
    for attr in attrs {
        match attr.get_as::<Attr>() {
            Some(Attr::Required) => {
                member.required();
            }
            Some(Attr::Positional) => {
                member.position(*positional);
                *positional += 1;
            }
            Some(Attr::Separator(Some(separator))) => {
                member.separator(*separator);
            }
            Some(Attr::Kind(Some(kind))) => {
                member.kind(*kind);
            }
            _ => trace!("ignoring kvconf::{} on {}", attr.key, field.name),
        }
    }
}

type AssignFn = fn(Poke<'_, 'static>, &Assign<'_>, &str) -> Result<(), ConfError>;
type AssignAtFn = fn(Poke<'_, 'static>, &Assign<'_>, usize, &str) -> Result<(), ConfError>;
type KindFn = fn() -> Option<Cow<'static, str>>;

/// How a field of a given shape takes text.
enum Handler {
    Value {
        assign: AssignFn,
        kind: KindFn,
    },
    List {
        extend: AssignFn,
        set: AssignAtFn,
        kind: KindFn,
    },
    Struct,
}

fn reflect_error(shape: &'static Shape, error: impl std::fmt::Display) -> ConfError {
    debug!("reflecting {}: {}", shape.type_identifier, error);
    mismatch(shape.type_identifier)
}

fn assign_value<F: Value + Facet<'static>>(
    mut poke: Poke<'_, 'static>,
    cx: &Assign<'_>,
    text: &str,
) -> Result<(), ConfError> {
    let value = cx.convert::<F>(text)?;
    poke.set(value).map_err(|error| reflect_error(F::SHAPE, error))
}

fn extend_list<E: Value + Facet<'static>>(
    mut poke: Poke<'_, 'static>,
    cx: &Assign<'_>,
    text: &str,
) -> Result<(), ConfError> {
    let list = poke
        .get_mut::<Vec<E>>()
        .map_err(|error| reflect_error(<Vec<E>>::SHAPE, error))?;
    extend_items(list, cx, text)
}

fn set_list<E: Value + Facet<'static>>(
    mut poke: Poke<'_, 'static>,
    cx: &Assign<'_>,
    position: usize,
    text: &str,
) -> Result<(), ConfError> {
    let value = cx.convert::<E>(text)?;
    let list = poke
        .get_mut::<Vec<E>>()
        .map_err(|error| reflect_error(<Vec<E>>::SHAPE, error))?;
    set_position(list, position, value, cx.member.max_len_limit())
}

impl Handler {
    fn value<F: Value + Facet<'static>>() -> Self {
        Handler::Value {
            assign: assign_value::<F>,
            kind: <F as Value>::kind,
        }
    }

    fn list<E: Value + Facet<'static>>() -> Self {
        Handler::List {
            extend: extend_list::<E>,
            set: set_list::<E>,
            kind: <E as Value>::kind,
        }
    }

    fn for_shape(shape: &'static Shape) -> Option<Self> {
        macro_rules! scalars {
            ($($ty:ty),+) => {
                $(
                    if shape == <$ty as Facet<'static>>::SHAPE {
                        return Some(Self::value::<$ty>());
                    }
                    if shape == <Option<$ty> as Facet<'static>>::SHAPE {
                        return Some(Self::value::<Option<$ty>>());
                    }
                    if shape == <Vec<$ty> as Facet<'static>>::SHAPE {
                        return Some(Self::list::<$ty>());
                    }
                )+
            };
        }
        scalars!(
            u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, bool, char, String
        );

        match shape.ty {
            Type::User(UserType::Struct(_)) => Some(Handler::Struct),
            _ => None,
        }
    }
}

/// A struct field reached by its index in the owner's shape.
struct FieldPath {
    root: &'static Shape,
    field: u32,
    open: Open,
    handler: Handler,
}

impl FieldPath {
    fn poke<'t>(&self, target: Slot<'t>) -> Result<Poke<'t, 'static>, ConfError> {
        let owner = (self.open)(target)?;
        if owner.shape() != self.root {
            return Err(mismatch(self.root.type_identifier));
        }
        let mut path = Path::new(self.root);
        path.push(PathStep::Field(self.field));
        owner
            .at_path_mut(&path)
            .map_err(|error| reflect_error(self.root, error))
    }
}

impl Access for FieldPath {
    fn assign(&self, target: Slot<'_>, cx: &Assign<'_>, text: &str) -> Result<(), ConfError> {
        match &self.handler {
            Handler::Value { assign, .. } => assign(self.poke(target)?, cx, text),
            Handler::List { extend, .. } => extend(self.poke(target)?, cx, text),
            Handler::Struct => {
                trace!("{} needs a nested key", cx.member.name());
                Ok(())
            }
        }
    }

    fn assign_at(
        &self,
        target: Slot<'_>,
        cx: &Assign<'_>,
        index: &KeyIndex,
        text: &str,
    ) -> Result<(), ConfError> {
        let (Handler::List { set, .. }, Some(position)) = (&self.handler, index.position()) else {
            trace!("ignoring index [{}] on {}", index.original(), cx.member.name());
            return Ok(());
        };
        set(self.poke(target)?, cx, position, text)
    }

    fn nested<'t>(
        &self,
        target: Slot<'t>,
        cx: &Assign<'_>,
        index: Option<&KeyIndex>,
    ) -> Result<Option<Node<'t>>, ConfError> {
        match (&self.handler, index) {
            (Handler::Struct, None) => Ok(Some(Node::Shape(self.poke(target)?))),
            _ => {
                trace!("{} does not lead to an object", cx.member.name());
                Ok(None)
            }
        }
    }

    fn is_collection(&self) -> bool {
        matches!(self.handler, Handler::List { .. })
    }

    fn kind(&self, separator: char) -> Option<Cow<'static, str>> {
        match &self.handler {
            Handler::Value { kind, .. } => kind(),
            Handler::List { kind, .. } => Some(list_kind(kind(), separator)),
            Handler::Struct => None,
        }
    }
}

/// Implement [`Configurable`](crate::Configurable) from a type's facet shape.
///
/// ```rust,ignore
/// #[derive(Facet, Default)]
/// struct CopyJob {
///     #[facet(kvconf::positional, kvconf::required)]
///     source: String,
///     #[facet(alias = "dst")]
///     destination: String,
/// }
///
/// kvconf::configurable!(CopyJob);
/// ```
///
/// A block after the type adds builder calls on top of the reflected members:
/// `configurable!(CopyJob, |members| { members.field("Mode", |c| &mut c.mode); })`.
#[macro_export]
macro_rules! configurable {
    ($ty:ty) => {
        $crate::configurable!($ty, |_members| {});
    };
    ($ty:ty, |$members:ident| $body:block) => {
        impl $crate::Configurable for $ty {
            fn describe($members: &mut $crate::Members<Self>) {
                $members.reflect();
                $body
            }
        }
    };
}
