use crate::types::types::Type;
use bumpalo::Bump;
use core::cell::RefCell;
use hashbrown::{DefaultHashBuilder, HashMap};

/// Builds and interns types in an arena.
///
/// Structurally equal types built through the same manager share a single
/// allocation. The manager is single-threaded; the types it hands out are
/// plain shared references and can be read from any thread.
pub struct TypeManager<'a> {
    // Arena holding all types from this TypeManager.
    arena: &'a Bump,
    interned_strs: RefCell<HashMap<&'a str, &'a str, DefaultHashBuilder, &'a Bump>>,
    interned: RefCell<HashMap<Type<'a>, &'a Type<'a>, DefaultHashBuilder, &'a Bump>>,
}

impl<'a> TypeManager<'a> {
    pub fn new(arena: &'a Bump) -> &'a Self {
        arena.alloc(Self {
            arena,
            interned_strs: RefCell::new(HashMap::new_in(arena)),
            interned: RefCell::new(HashMap::new_in(arena)),
        })
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub(crate) fn intern_str(&self, s: &str) -> &'a str {
        if let Some(&interned_str) = self.interned_strs.borrow().get(s) {
            return interned_str;
        }
        let arena_str = self.arena.alloc_str(s);
        self.interned_strs.borrow_mut().insert(arena_str, arena_str);
        arena_str
    }

    fn intern(&self, ty: Type<'a>) -> &'a Type<'a> {
        if let Some(&interned_ty) = self.interned.borrow().get(&ty) {
            return interned_ty;
        }
        let arena_ty = self.arena.alloc(ty);
        self.interned.borrow_mut().insert(ty, arena_ty);
        arena_ty
    }

    fn intern_slice(&self, types: &[&'a Type<'a>]) -> &'a [&'a Type<'a>] {
        self.arena.alloc_slice_copy(types)
    }

    fn intern_members(
        &self,
        members: &[(&str, &'a Type<'a>)],
    ) -> &'a [(&'a str, &'a Type<'a>)] {
        let mut sorted: Vec<(&'a str, &'a Type<'a>)> = members
            .iter()
            .map(|&(name, ty)| (self.intern_str(name), ty))
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted.dedup_by(|a, b| a.0 == b.0);
        self.arena.alloc_slice_copy(&sorted)
    }

    // Factory methods for types.
    pub fn int(&self) -> &'a Type<'a> {
        self.intern(Type::Int)
    }
    pub fn double(&self) -> &'a Type<'a> {
        self.intern(Type::Double)
    }
    pub fn str(&self) -> &'a Type<'a> {
        self.intern(Type::Str)
    }
    pub fn bool(&self) -> &'a Type<'a> {
        self.intern(Type::Bool)
    }
    pub fn any(&self) -> &'a Type<'a> {
        self.intern(Type::Any)
    }
    pub fn error(&self) -> &'a Type<'a> {
        self.intern(Type::Error)
    }
    pub fn void(&self) -> &'a Type<'a> {
        self.intern(Type::Void)
    }

    pub fn sequence(&self, elem_ty: &'a Type<'a>) -> &'a Type<'a> {
        self.intern(Type::Sequence(elem_ty))
    }

    pub fn array(&self, elem_ty: &'a Type<'a>, len: usize) -> &'a Type<'a> {
        self.intern(Type::Array(elem_ty, len))
    }

    pub fn mapping(&self, key_ty: &'a Type<'a>, elem_ty: &'a Type<'a>) -> &'a Type<'a> {
        self.intern(Type::Mapping(key_ty, elem_ty))
    }

    pub fn reference(&self, target: &'a Type<'a>) -> &'a Type<'a> {
        self.intern(Type::Ref(target))
    }

    pub fn function(
        &self,
        params: &[&'a Type<'a>],
        results: &[&'a Type<'a>],
    ) -> &'a Type<'a> {
        self.intern(Type::Function {
            params: self.intern_slice(params),
            results: self.intern_slice(results),
            variadic: false,
        })
    }

    /// A function whose last parameter collects the remaining arguments.
    pub fn variadic_function(
        &self,
        params: &[&'a Type<'a>],
        results: &[&'a Type<'a>],
    ) -> &'a Type<'a> {
        self.intern(Type::Function {
            params: self.intern_slice(params),
            results: self.intern_slice(results),
            variadic: true,
        })
    }

    /// A named record. Later duplicates of a field or method name are dropped.
    pub fn record(
        &self,
        name: &str,
        fields: &[(&str, &'a Type<'a>)],
        methods: &[(&str, &'a Type<'a>)],
    ) -> &'a Type<'a> {
        self.intern(Type::Record {
            name: self.intern_str(name),
            fields: self.intern_members(fields),
            methods: self.intern_members(methods),
        })
    }

    /// The type of `method` once bound to a receiver of type `receiver`:
    /// the receiver becomes the first parameter.
    pub fn method_type(&self, receiver: &'a Type<'a>, method: &'a Type<'a>) -> &'a Type<'a> {
        match method {
            Type::Function {
                params,
                results,
                variadic,
            } => {
                let mut with_receiver = Vec::with_capacity(params.len() + 1);
                with_receiver.push(receiver);
                with_receiver.extend_from_slice(params);
                self.intern(Type::Function {
                    params: self.intern_slice(&with_receiver),
                    results,
                    variadic: *variadic,
                })
            }
            _ => method,
        }
    }
}
