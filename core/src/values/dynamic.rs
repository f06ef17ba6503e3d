use super::error::ValueError;
use super::function::{Function, FunctionRef};
use crate::types::{Type, TypeManager};
use ecow::EcoString;
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error produced by a host callable.
pub type HostError = Arc<dyn std::error::Error + Send + Sync>;

/// Convenience for hosts that only have a message to report.
pub fn host_error(message: impl Into<String>) -> HostError {
    Arc::from(Box::<dyn std::error::Error + Send + Sync>::from(message.into()))
}

/// A runtime value.
///
/// Primitive variants carry their type implicitly. Composite variants carry
/// the declared type they were built with, so a record value knows its
/// record type and a sequence knows whether it is a `[]T` or a `[N]T`.
#[derive(Clone)]
pub enum Value<'t> {
    Null,
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(EcoString),
    Sequence(Sequence<'t>),
    Mapping(Mapping<'t>),
    Record(Record<'t>),
    Function(FunctionRef<'t>),
    Ref(Reference<'t>),
    Error(HostError),
}

/// A view over shared elements. Slicing produces a new view and never
/// copies the elements.
#[derive(Clone)]
pub struct Sequence<'t> {
    ty: &'t Type<'t>,
    items: Arc<[Value<'t>]>,
    offset: usize,
    len: usize,
    cap: usize,
}

#[derive(Clone)]
pub struct Mapping<'t> {
    ty: &'t Type<'t>,
    entries: Arc<HashMap<MapKey, Value<'t>>>,
}

/// Hashable projection of the values allowed as mapping keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Double(u64),
    Bool(bool),
    Str(EcoString),
}

#[derive(Clone)]
pub struct Record<'t>(Arc<RecordData<'t>>);

struct RecordData<'t> {
    ty: &'t Type<'t>,
    // Aligned with the sorted fields of `ty`.
    fields: Vec<Value<'t>>,
    // Aligned with the sorted methods of `ty`. Entries are absent on
    // zero-valued records.
    methods: Vec<Option<FunctionRef<'t>>>,
}

#[derive(Clone)]
pub struct Reference<'t> {
    ty: &'t Type<'t>,
    target: Arc<Value<'t>>,
}

impl<'t> Value<'t> {
    // ============================================================================
    // Construction
    // ============================================================================
    //
    // Primitive constructors cannot fail. Composite constructors validate
    // their contents against the declared type.

    pub fn int(value: i64) -> Self {
        Value::Int(value)
    }

    pub fn double(value: f64) -> Self {
        Value::Double(value)
    }

    pub fn bool(value: bool) -> Self {
        Value::Bool(value)
    }

    pub fn str(value: &str) -> Self {
        Value::Str(EcoString::from(value))
    }

    pub fn function(func: impl Function<'t> + 't) -> Self {
        Value::Function(Arc::new(func))
    }

    pub fn error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Value::Error(Arc::new(err))
    }

    /// Build a `[]T` or `[N]T` value.
    pub fn sequence(ty: &'t Type<'t>, items: Vec<Value<'t>>) -> Result<Self, ValueError> {
        let elem = match ty {
            Type::Sequence(elem) => elem,
            Type::Array(elem, len) => {
                if items.len() != *len {
                    return Err(ValueError::LengthMismatch {
                        ty: ty.to_string(),
                        expected: *len,
                        found: items.len(),
                    });
                }
                elem
            }
            _ => {
                return Err(ValueError::NotASequenceType { ty: ty.to_string() });
            }
        };
        for (index, item) in items.iter().enumerate() {
            if !item.conforms_to(elem) {
                return Err(ValueError::ElementTypeMismatch {
                    index,
                    expected: elem.to_string(),
                    found: item.dynamic_type().to_string(),
                });
            }
        }
        Ok(Value::Sequence(Sequence::new(ty, items)))
    }

    pub fn mapping(
        ty: &'t Type<'t>,
        entries: Vec<(Value<'t>, Value<'t>)>,
    ) -> Result<Self, ValueError> {
        let Type::Mapping(key_ty, elem_ty) = ty else {
            return Err(ValueError::NotAMappingType { ty: ty.to_string() });
        };
        let mut map = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            if !key.conforms_to(key_ty) {
                return Err(ValueError::KeyTypeMismatch {
                    expected: key_ty.to_string(),
                    found: key.dynamic_type().to_string(),
                });
            }
            if !value.conforms_to(elem_ty) {
                return Err(ValueError::ElementTypeMismatch {
                    index: map.len(),
                    expected: elem_ty.to_string(),
                    found: value.dynamic_type().to_string(),
                });
            }
            let key = MapKey::from_value(&key).ok_or_else(|| ValueError::UnhashableKey {
                found: key.dynamic_type().to_string(),
            })?;
            map.insert(key, value);
        }
        Ok(Value::Mapping(Mapping {
            ty,
            entries: Arc::new(map),
        }))
    }

    /// Start building a value of record type `ty`.
    pub fn record(ty: &'t Type<'t>) -> RecordBuilder<'t> {
        RecordBuilder::new(ty)
    }

    /// A reference to `target`, typed `*T` where `T` is the target's type.
    pub fn reference(types: &'t TypeManager<'t>, target: Value<'t>) -> Self {
        let ty = types.reference(target.dynamic_type());
        Value::Ref(Reference {
            ty,
            target: Arc::new(target),
        })
    }

    /// A reference with an explicit `*T` type; the target may be null.
    pub fn reference_as(ty: &'t Type<'t>, target: Value<'t>) -> Result<Self, ValueError> {
        match ty {
            Type::Ref(inner) if target.conforms_to(inner) => Ok(Value::Ref(Reference {
                ty,
                target: Arc::new(target),
            })),
            _ => Err(ValueError::ReferenceTypeMismatch {
                ty: ty.to_string(),
                target: target.dynamic_type().to_string(),
            }),
        }
    }

    /// The default value of `ty`: numeric zero, `false`, the empty string,
    /// an empty collection, a record of zero fields, or `null`.
    pub fn zero(ty: &'t Type<'t>) -> Self {
        match ty {
            Type::Int => Value::Int(0),
            Type::Double => Value::Double(0.0),
            Type::Bool => Value::Bool(false),
            Type::Str => Value::Str(EcoString::new()),
            Type::Sequence(_) => Value::Sequence(Sequence::new(ty, Vec::new())),
            Type::Array(elem, len) => {
                let items = (0..*len).map(|_| Value::zero(*elem)).collect();
                Value::Sequence(Sequence::new(ty, items))
            }
            Type::Mapping(_, _) => Value::Mapping(Mapping {
                ty,
                entries: Arc::new(HashMap::new()),
            }),
            Type::Record {
                fields, methods, ..
            } => Value::Record(Record(Arc::new(RecordData {
                ty,
                fields: fields.iter().map(|(_, field_ty)| Value::zero(*field_ty)).collect(),
                methods: vec![None; methods.len()],
            }))),
            Type::Any
            | Type::Error
            | Type::Void
            | Type::Function { .. }
            | Type::Ref(_) => Value::Null,
        }
    }

    // ============================================================================
    // Typing
    // ============================================================================

    /// The type this value was built with. `null` reports `any`.
    pub fn dynamic_type(&self) -> &'t Type<'t> {
        match self {
            Value::Null => &Type::Any,
            Value::Int(_) => &Type::Int,
            Value::Double(_) => &Type::Double,
            Value::Bool(_) => &Type::Bool,
            Value::Str(_) => &Type::Str,
            Value::Error(_) => &Type::Error,
            Value::Sequence(seq) => seq.ty,
            Value::Mapping(map) => map.ty,
            Value::Record(record) => record.0.ty,
            Value::Function(func) => func.ty(),
            Value::Ref(reference) => reference.ty,
        }
    }

    /// Runtime counterpart of [`Type::assignable_to`].
    pub fn conforms_to(&self, ty: &Type<'_>) -> bool {
        match self {
            Value::Null => ty.is_nullable(),
            _ => self.dynamic_type().assignable_to(ty),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    // ============================================================================
    // Access
    // ============================================================================

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence<'t>> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping<'t>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record<'t>> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionRef<'t>> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&HostError> {
        match self {
            Value::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Follows one level of indirection; other values are returned as is.
    pub fn deref(&self) -> &Value<'t> {
        match self {
            Value::Ref(reference) => &reference.target,
            _ => self,
        }
    }
}

impl<'t> Sequence<'t> {
    pub(crate) fn new(ty: &'t Type<'t>, items: Vec<Value<'t>>) -> Self {
        let len = items.len();
        Self {
            ty,
            items: Arc::from(items),
            offset: 0,
            len,
            cap: len,
        }
    }

    pub fn ty(&self) -> &'t Type<'t> {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Elements reachable by re-slicing past `len`.
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn as_slice(&self) -> &[Value<'t>] {
        &self.items[self.offset..self.offset + self.len]
    }

    pub fn get(&self, index: usize) -> Option<&Value<'t>> {
        self.as_slice().get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value<'t>> {
        self.as_slice().iter()
    }

    /// A `[low:high:max]` view typed `ty`.
    ///
    /// Callers validate `low <= high <= max <= cap`; out-of-range bounds
    /// return `None`.
    pub fn slice(&self, ty: &'t Type<'t>, low: usize, high: usize, max: usize) -> Option<Self> {
        if low > high || high > max || max > self.cap {
            return None;
        }
        Some(Self {
            ty,
            items: Arc::clone(&self.items),
            offset: self.offset + low,
            len: high - low,
            cap: max - low,
        })
    }
}

impl<'t> Mapping<'t> {
    pub fn ty(&self) -> &'t Type<'t> {
        self.ty
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value<'t>) -> Option<&Value<'t>> {
        MapKey::from_value(key).and_then(|key| self.entries.get(&key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value<'t>)> {
        self.entries.iter()
    }
}

impl MapKey {
    pub fn from_value(value: &Value<'_>) -> Option<Self> {
        match value {
            Value::Int(i) => Some(MapKey::Int(*i)),
            // -0.0 and 0.0 are the same key.
            Value::Double(d) if *d == 0.0 => Some(MapKey::Double(0)),
            Value::Double(d) => Some(MapKey::Double(d.to_bits())),
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Str(s) => Some(MapKey::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value<'t>(&self) -> Value<'t> {
        match self {
            MapKey::Int(i) => Value::Int(*i),
            MapKey::Double(bits) => Value::Double(f64::from_bits(*bits)),
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

impl<'t> Record<'t> {
    pub fn ty(&self) -> &'t Type<'t> {
        self.0.ty
    }

    pub fn field(&self, name: &str) -> Option<&Value<'t>> {
        let Type::Record { fields, .. } = self.0.ty else {
            return None;
        };
        let index = fields.binary_search_by(|(field, _)| field.cmp(&name)).ok()?;
        self.0.fields.get(index)
    }

    /// The implementation of `name`, expecting the receiver as its first
    /// argument.
    pub fn method(&self, name: &str) -> Option<&FunctionRef<'t>> {
        let Type::Record { methods, .. } = self.0.ty else {
            return None;
        };
        let index = methods.binary_search_by(|(method, _)| method.cmp(&name)).ok()?;
        self.0.methods.get(index)?.as_ref()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'t str, &Value<'t>)> {
        let names: &'t [(&'t str, &'t Type<'t>)] = match self.0.ty {
            Type::Record { fields, .. } => fields,
            _ => &[],
        };
        names.iter().map(|(name, _)| *name).zip(self.0.fields.iter())
    }

    fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<'t> Reference<'t> {
    pub fn ty(&self) -> &'t Type<'t> {
        self.ty
    }

    pub fn target(&self) -> &Value<'t> {
        &self.target
    }
}

/// Builder for record values.
///
/// Every declared field must be set. Method implementations receive the
/// receiver as their first argument, so their signature is the declared
/// method signature with one extra leading parameter.
pub struct RecordBuilder<'t> {
    ty: &'t Type<'t>,
    fields: Vec<(String, Value<'t>)>,
    methods: Vec<(String, FunctionRef<'t>)>,
}

impl<'t> RecordBuilder<'t> {
    fn new(ty: &'t Type<'t>) -> Self {
        Self {
            ty,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, value: Value<'t>) -> Self {
        self.fields.push((name.to_string(), value));
        self
    }

    pub fn method(mut self, name: &str, func: impl Function<'t> + 't) -> Self {
        self.methods.push((name.to_string(), Arc::new(func)));
        self
    }

    pub fn build(self) -> Result<Value<'t>, ValueError> {
        let Type::Record {
            fields: declared_fields,
            methods: declared_methods,
            ..
        } = self.ty
        else {
            return Err(ValueError::NotARecordType {
                ty: self.ty.to_string(),
            });
        };
        let record_name = self.ty.to_string();

        let mut fields: Vec<Option<Value<'t>>> = vec![None; declared_fields.len()];
        for (name, value) in self.fields {
            let Ok(index) = declared_fields.binary_search_by(|(field, _)| field.cmp(&name.as_str()))
            else {
                return Err(ValueError::UnknownField {
                    record: record_name,
                    field: name,
                });
            };
            let expected = declared_fields[index].1;
            if !value.conforms_to(expected) {
                return Err(ValueError::FieldTypeMismatch {
                    field: name,
                    expected: expected.to_string(),
                    found: value.dynamic_type().to_string(),
                });
            }
            fields[index] = Some(value);
        }
        let fields = fields
            .into_iter()
            .zip(declared_fields.iter())
            .map(|(value, (name, _))| {
                value.ok_or_else(|| ValueError::MissingField {
                    record: record_name.clone(),
                    field: name.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut methods: Vec<Option<FunctionRef<'t>>> = vec![None; declared_methods.len()];
        for (name, func) in self.methods {
            let Ok(index) =
                declared_methods.binary_search_by(|(method, _)| method.cmp(&name.as_str()))
            else {
                return Err(ValueError::UnknownMethod {
                    record: record_name,
                    method: name,
                });
            };
            let declared = declared_methods[index].1;
            if !implements_method(func.ty(), declared) {
                return Err(ValueError::MethodTypeMismatch {
                    method: name,
                    expected: declared.to_string(),
                    found: func.ty().to_string(),
                });
            }
            methods[index] = Some(func);
        }
        if let Some(missing) = methods.iter().position(Option::is_none) {
            return Err(ValueError::MissingMethod {
                record: record_name,
                method: declared_methods[missing].0.to_string(),
            });
        }

        Ok(Value::Record(Record(Arc::new(RecordData {
            ty: self.ty,
            fields,
            methods,
        }))))
    }
}

/// `implementation` takes a receiver followed by the parameters of
/// `declared`, and returns the same results.
fn implements_method<'t>(implementation: &Type<'t>, declared: &Type<'t>) -> bool {
    match (implementation, declared) {
        (
            Type::Function {
                params: impl_params,
                results: impl_results,
                variadic: impl_variadic,
            },
            Type::Function {
                params,
                results,
                variadic,
            },
        ) => {
            impl_variadic == variadic
                && impl_params.len() == params.len() + 1
                && impl_params[1..] == params[..]
                && impl_results == results
        }
        _ => false,
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => {
                a.ptr_eq(b) || (a.0.ty == b.0.ty && a.0.fields == b.0.fields)
            }
            // Everything else compares by identity.
            (Value::Sequence(a), Value::Sequence(b)) => {
                Arc::ptr_eq(&a.items, &b.items) && a.offset == b.offset && a.len == b.len
            }
            (Value::Mapping(a), Value::Mapping(b)) => Arc::ptr_eq(&a.entries, &b.entries),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => Arc::ptr_eq(&a.target, &b.target),
            (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Double(d) => write!(f, "Double({})", d),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Str(s) => write!(f, "Str({:?})", s.as_str()),
            Value::Error(e) => write!(f, "Error({:?})", e.to_string()),
            Value::Function(func) => write!(f, "Function({})", func.ty()),
            _ => write!(f, "{}({})", self.dynamic_type(), self),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s),
            Value::Error(e) => write!(f, "{}", e),
            Value::Function(func) => write!(f, "<{}>", func.ty()),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, item) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                // Sorted for stable output.
                let mut entries: Vec<String> = map
                    .iter()
                    .map(|(key, value)| format!("{}:{}", key.to_value(), value))
                    .collect();
                entries.sort();
                write!(f, "map[{}]", entries.join(" "))
            }
            Value::Record(record) => {
                write!(f, "{{")?;
                for (i, (_, value)) in record.fields().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "}}")
            }
            Value::Ref(reference) => write!(f, "&{}", reference.target),
        }
    }
}
