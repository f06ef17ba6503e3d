use core::fmt::{self, Display};

/// Static type of an expression.
///
/// Composite types reference their components through the arena of the
/// [`TypeManager`](super::manager::TypeManager) that built them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type<'a> {
    // Primitives.
    Int,
    Double,
    Str,
    Bool,

    // Accepts any value.
    Any,
    // The trailing "error" result of a host function.
    Error,
    // Result of a call that produces nothing.
    Void,

    // Collections.
    Sequence(&'a Type<'a>),
    Array(&'a Type<'a>, usize),
    Mapping(&'a Type<'a>, &'a Type<'a>),

    // Named struct-like type. Fields and methods are sorted by name.
    // Methods are declared without their receiver parameter.
    Record {
        name: &'a str,
        fields: &'a [(&'a str, &'a Type<'a>)],
        methods: &'a [(&'a str, &'a Type<'a>)],
    },

    Function {
        params: &'a [&'a Type<'a>],
        results: &'a [&'a Type<'a>],
        variadic: bool,
    },

    // One level of indirection.
    Ref(&'a Type<'a>),
}

/// Kinds the operator tables are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Double,
    Str,
    Bool,
}

impl<'a> Type<'a> {
    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            Type::Int => Some(Primitive::Int),
            Type::Double => Some(Primitive::Double),
            Type::Str => Some(Primitive::Str),
            Type::Bool => Some(Primitive::Bool),
            _ => None,
        }
    }

    /// Strips exactly one level of [`Type::Ref`].
    pub fn without_ref(&'a self) -> &'a Type<'a> {
        match self {
            Type::Ref(target) => target,
            _ => self,
        }
    }

    /// Whether `null` is a valid value of this type.
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            Type::Any
                | Type::Error
                | Type::Void
                | Type::Ref(_)
                | Type::Function { .. }
                | Type::Sequence(_)
                | Type::Mapping(_, _)
        )
    }

    pub fn field(&self, name: &str) -> Option<&'a Type<'a>> {
        match self {
            Type::Record { fields, .. } => lookup_sorted(fields, name),
            _ => None,
        }
    }

    /// Signature of a record method, without the receiver.
    pub fn method(&self, name: &str) -> Option<&'a Type<'a>> {
        match self {
            Type::Record { methods, .. } => lookup_sorted(methods, name),
            _ => None,
        }
    }

    /// A function whose last declared result is `error`.
    pub fn returns_error(&self) -> bool {
        match self {
            Type::Function { results, .. } => matches!(results.last(), Some(Type::Error)),
            _ => false,
        }
    }

    /// Directional compatibility: can a value of `self` be used where
    /// `target` is required.
    pub fn assignable_to(&self, target: &Type<'a>) -> bool {
        match (self, target) {
            (_, Type::Any) => true,
            (Type::Sequence(a), Type::Sequence(b)) => a.assignable_to(b),
            (Type::Array(a, n), Type::Array(b, m)) => n == m && a.assignable_to(b),
            (Type::Mapping(ka, va), Type::Mapping(kb, vb)) => {
                ka.assignable_to(kb) && va.assignable_to(vb)
            }
            (Type::Ref(a), Type::Ref(b)) => a.assignable_to(b),
            (
                Type::Record { .. },
                Type::Record {
                    fields, methods, ..
                },
            ) => {
                fields.iter().all(|(name, want)| {
                    self.field(name)
                        .is_some_and(|have| have.assignable_to(want))
                }) && methods.iter().all(|(name, want)| {
                    self.method(name).is_some_and(|have| have == *want)
                })
            }
            _ => self == target,
        }
    }
}

fn lookup_sorted<'a>(entries: &[(&'a str, &'a Type<'a>)], name: &str) -> Option<&'a Type<'a>> {
    entries
        .binary_search_by(|(entry, _)| entry.cmp(&name))
        .ok()
        .map(|i| entries[i].1)
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[&Type<'_>]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", ty)?;
    }
    Ok(())
}

impl Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::Str => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Any => write!(f, "any"),
            Type::Error => write!(f, "error"),
            Type::Void => write!(f, "void"),
            Type::Sequence(elem) => write!(f, "[]{}", elem),
            Type::Array(elem, len) => write!(f, "[{}]{}", len, elem),
            Type::Mapping(key, elem) => write!(f, "map[{}]{}", key, elem),
            Type::Ref(target) => write!(f, "*{}", target),
            Type::Record { name, fields, .. } if name.is_empty() => {
                write!(f, "struct {{")?;
                for (i, (field, ty)) in fields.iter().enumerate() {
                    let sep = if i == 0 { " " } else { "; " };
                    write!(f, "{}{} {}", sep, field, ty)?;
                }
                write!(f, " }}")
            }
            Type::Record { name, .. } => write!(f, "{}", name),
            Type::Function {
                params,
                results,
                variadic,
            } => {
                write!(f, "func(")?;
                match params.split_last() {
                    Some((last, rest)) if *variadic => {
                        write_list(f, rest)?;
                        if !rest.is_empty() {
                            f.write_str(", ")?;
                        }
                        write!(f, "...{}", last)?;
                    }
                    _ => write_list(f, params)?,
                }
                write!(f, ")")?;
                match results {
                    [] => Ok(()),
                    [single] => write!(f, " {}", single),
                    _ => {
                        write!(f, " (")?;
                        write_list(f, results)?;
                        write!(f, ")")
                    }
                }
            }
        }
    }
}
