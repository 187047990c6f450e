//! Bound classes: the host-visible type record and its builder.

use std::any::{type_name, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;

use super::enums::{EnumBuilder, EnumOptions, EnumType, NativeEnum};
use crate::config::Options;
use crate::errors::{BindError, BindResult, ErrorKind};
use crate::ffi::{upcast_mut, upcast_ref, Handle, Inherits, NativeClass, Upcast, UpcastMut};
use crate::interop::{
    registry, CallArgs, CallFrame, Extras, FromValue, Function, FunctionKind, IntoValue,
    Invoker, NativeFn, NativeMethod, Overload, Signature, TypeHint,
};
use crate::logging::log_registration;
use crate::objects::Value;

/// Attribute stored in a class namespace
#[derive(Clone)]
pub enum Member {
    Method(Arc<Function>),
    Property(Arc<Property>),
    Attr(Value),
}

pub struct Property {
    name: String,
    doc: Option<String>,
    getter: Arc<Function>,
    setter: Option<Arc<Function>>,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn getter(&self) -> &Arc<Function> {
        &self.getter
    }

    pub(crate) fn get(&self, receiver: &Handle) -> BindResult<Value> {
        self.getter.call(&CallFrame::method(receiver), &CallArgs::new())
    }

    pub(crate) fn set(&self, receiver: &Handle, value: Value) -> BindResult<()> {
        let setter = self.setter.as_ref().ok_or_else(|| {
            BindError::new(ErrorKind::ReadOnlyAttribute { attr: self.name.clone() })
        })?;
        setter.call(&CallFrame::method(receiver), &CallArgs::new().arg(value))?;
        Ok(())
    }
}

pub(crate) struct BaseLink {
    pub(crate) ty: Arc<TypeObject>,
    pub(crate) upcast: Upcast,
    pub(crate) upcast_mut: UpcastMut,
}

/// Runtime record of a bound class
pub struct TypeObject {
    name: String,
    module: String,
    doc: Option<String>,
    native: TypeId,
    native_name: &'static str,
    base: Option<BaseLink>,
    dynamic_attr: bool,
    members: DashMap<String, Member>,
}

impl TypeObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// `example.Pet`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn native_type_id(&self) -> TypeId {
        self.native
    }

    pub fn native_type_name(&self) -> &'static str {
        self.native_name
    }

    pub fn base(&self) -> Option<&Arc<TypeObject>> {
        self.base.as_ref().map(|link| &link.ty)
    }

    pub(crate) fn base_link(&self) -> Option<&BaseLink> {
        self.base.as_ref()
    }

    /// This type followed by its bases, most-derived first
    pub fn mro(&self) -> impl Iterator<Item = &TypeObject> {
        std::iter::successors(Some(self), |ty| ty.base.as_ref().map(|link| &*link.ty))
    }

    pub fn is_subtype_of(&self, other: &TypeObject) -> bool {
        self.mro().any(|ty| ty.native == other.native)
    }

    /// Instances carry an attribute table if any class in the MRO asks for one
    pub fn has_dynamic_attr(&self) -> bool {
        self.mro().any(|ty| ty.dynamic_attr)
    }

    /// Member defined directly on this class
    pub fn own_member(&self, name: &str) -> Option<Member> {
        self.members.get(name).map(|m| m.value().clone())
    }

    /// Member looked up along the MRO
    pub fn lookup(&self, name: &str) -> Option<Member> {
        self.mro().find_map(|ty| ty.own_member(name))
    }

    /// Names defined directly on this class, sorted
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.members.iter().map(|m| m.key().clone()).collect();
        names.sort();
        names
    }

    pub(crate) fn set_member(&self, name: &str, member: Member) {
        self.members.insert(name.to_string(), member);
    }

    /// Call the class: run one of its own constructors
    pub(crate) fn construct(ty: &Arc<TypeObject>, args: &CallArgs) -> BindResult<Value> {
        match ty.own_member("__init__") {
            Some(Member::Method(init)) => init.call(&CallFrame::constructor(ty), args),
            _ => Err(BindError::new(ErrorKind::NoConstructor { ty: ty.qualified_name() })),
        }
    }
}

impl std::fmt::Debug for TypeObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<class '{}'>", self.qualified_name())
    }
}

/// Registration options for a class, the counterpart of `class_` extras
pub struct ClassOptions<T: NativeClass> {
    doc: Option<String>,
    dynamic_attr: bool,
    base: Option<(TypeId, &'static str, Upcast, UpcastMut)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: NativeClass> Default for ClassOptions<T> {
    fn default() -> Self {
        Self {
            doc: None,
            dynamic_attr: false,
            base: None,
            _marker: PhantomData,
        }
    }
}

impl<T: NativeClass> ClassOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow arbitrary attributes on instances
    pub fn dynamic_attr(mut self) -> Self {
        self.dynamic_attr = true;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Declare `B` as the bound base class of `T`
    pub fn extends<B: NativeClass>(mut self) -> Self
    where
        T: Inherits<B>,
    {
        self.base = Some((
            TypeId::of::<B>(),
            type_name::<B>(),
            upcast_ref::<T, B> as Upcast,
            upcast_mut::<T, B> as UpcastMut,
        ));
        self
    }
}

/// Builder returned by `Module::class`, mirroring `class_<T>`
pub struct ClassBuilder<T: NativeClass> {
    ty: Arc<TypeObject>,
    options: Options,
    _marker: PhantomData<fn() -> T>,
}

impl<T: NativeClass> ClassBuilder<T> {
    pub(crate) fn register(
        name: &str,
        options: &Options,
        class_options: ClassOptions<T>,
    ) -> BindResult<Self> {
        let registry = registry();
        let base = match class_options.base {
            Some((id, base_name, upcast, upcast_mut)) => {
                let ty = registry.class(id).ok_or_else(|| {
                    BindError::new(ErrorKind::UnregisteredType {
                        native: base_name.to_string(),
                    })
                })?;
                Some(BaseLink { ty, upcast, upcast_mut })
            }
            None => None,
        };

        let ty = Arc::new(TypeObject {
            name: name.to_string(),
            module: options.module_name.clone(),
            doc: class_options.doc,
            native: TypeId::of::<T>(),
            native_name: type_name::<T>(),
            base,
            dynamic_attr: class_options.dynamic_attr,
            members: DashMap::new(),
        });
        registry.register_class(ty.clone())?;
        log_registration("class", name);

        Ok(Self {
            ty,
            options: options.clone(),
            _marker: PhantomData,
        })
    }

    pub fn type_object(&self) -> &Arc<TypeObject> {
        &self.ty
    }

    fn receiver_hint() -> Option<TypeHint> {
        Some(TypeHint::native::<T>())
    }

    /// Add an overload to `name`, creating the function on first use
    fn add_function(&self, name: &str, kind: FunctionKind, overload: Overload) {
        match self.ty.own_member(name) {
            Some(Member::Method(existing)) if existing.kind() == kind => {
                existing.add_overload(overload);
            }
            _ => {
                let function = Function::new(name, kind, self.options.clone());
                function.add_overload(overload);
                self.ty.set_member(name, Member::Method(Arc::new(function)));
            }
        }
    }

    /// Bind a constructor
    pub fn def_init<F, M>(&self, init: F, extras: impl Extras) -> BindResult<&Self>
    where
        F: NativeFn<M, Output = T>,
    {
        let extras = extras.collect();
        let signature = Signature::build(
            "__init__",
            Self::receiver_hint(),
            F::params(),
            TypeHint::None,
            extras.args,
        )?;

        let invoker: Invoker = Box::new(move |frame: &CallFrame<'_>, args: Vec<Value>| {
            let class = frame.class?;
            let native = init.invoke(&args)?;
            let handle = Handle::new(class.clone(), Some(class.clone()), None, Box::new(native));
            Some(Ok(Value::Object(handle)))
        });

        self.add_function(
            "__init__",
            FunctionKind::Constructor,
            Overload { signature, doc: extras.doc, invoker },
        );
        log_registration("constructor", &self.ty.name);
        Ok(self)
    }

    /// Bind a method; binding the same name again adds an overload
    pub fn def<F, M>(&self, name: &str, method: F, extras: impl Extras) -> BindResult<&Self>
    where
        F: NativeMethod<T, M>,
        F::Output: IntoValue,
    {
        let extras = extras.collect();
        let signature = Signature::build(
            name,
            Self::receiver_hint(),
            F::params(),
            <F::Output as IntoValue>::type_hint(),
            extras.args,
        )?;

        let invoker: Invoker = Box::new(move |frame: &CallFrame<'_>, args: Vec<Value>| {
            let receiver = frame.receiver?;
            Some(method.invoke(receiver, &args)?.and_then(IntoValue::into_value))
        });

        self.add_function(name, FunctionKind::Method, Overload { signature, doc: extras.doc, invoker });
        log_registration("method", name);
        Ok(self)
    }

    /// Field exposed for reading and writing
    pub fn def_readwrite<V, G, S>(&self, name: &str, get: G, get_mut: S, extras: impl Extras) -> BindResult<&Self>
    where
        V: FromValue + IntoValue + Clone + Send + Sync + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        S: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let extras = extras.collect();
        let getter = self.field_getter::<V, G>(name, get)?;

        let setter_sig = Signature::build(
            name,
            Self::receiver_hint(),
            vec![<V as FromValue>::type_hint()],
            TypeHint::None,
            Vec::new(),
        )?;
        let setter_invoker: Invoker = Box::new(move |frame: &CallFrame<'_>, args: Vec<Value>| {
            let receiver = frame.receiver?;
            let value = V::from_value(args.first()?)?;
            Some(receiver.with_mut(|native: &mut T| *get_mut(native) = value).map(|_| Value::None))
        });
        let setter = Function::new(name, FunctionKind::Setter, self.options.clone());
        setter.add_overload(Overload { signature: setter_sig, doc: None, invoker: setter_invoker });

        self.install_property(name, extras.doc, getter, Some(setter));
        Ok(self)
    }

    /// Field exposed for reading only
    pub fn def_readonly<V, G>(&self, name: &str, get: G, extras: impl Extras) -> BindResult<&Self>
    where
        V: IntoValue + Clone + Send + Sync + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
    {
        let extras = extras.collect();
        let getter = self.field_getter::<V, G>(name, get)?;
        self.install_property(name, extras.doc, getter, None);
        Ok(self)
    }

    fn field_getter<V, G>(&self, name: &str, get: G) -> BindResult<Function>
    where
        V: IntoValue + Clone + Send + Sync + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
    {
        let signature = Signature::build(name, Self::receiver_hint(), Vec::new(), V::type_hint(), Vec::new())?;
        let invoker: Invoker = Box::new(move |frame: &CallFrame<'_>, _args: Vec<Value>| {
            let receiver = frame.receiver?;
            Some(receiver.with_ref(|native: &T| get(native).clone()).and_then(IntoValue::into_value))
        });
        let getter = Function::new(name, FunctionKind::Getter, self.options.clone());
        getter.add_overload(Overload { signature, doc: None, invoker });
        Ok(getter)
    }

    /// Computed property routed through a getter and a setter method
    pub fn def_property<G, S, MG, MS>(&self, name: &str, getter: G, setter: S, extras: impl Extras) -> BindResult<&Self>
    where
        G: NativeMethod<T, MG>,
        G::Output: IntoValue,
        S: NativeMethod<T, MS>,
        S::Output: IntoValue,
    {
        if !G::params().is_empty() || S::params().len() != 1 {
            return Err(BindError::new(ErrorKind::PropertyArity { property: name.to_string() }));
        }
        let extras = extras.collect();
        let getter = self.accessor(name, FunctionKind::Getter, getter)?;
        let setter = self.accessor(name, FunctionKind::Setter, setter)?;
        self.install_property(name, extras.doc, getter, Some(setter));
        Ok(self)
    }

    /// Computed property without a setter
    pub fn def_property_readonly<G, MG>(&self, name: &str, getter: G, extras: impl Extras) -> BindResult<&Self>
    where
        G: NativeMethod<T, MG>,
        G::Output: IntoValue,
    {
        if !G::params().is_empty() {
            return Err(BindError::new(ErrorKind::PropertyArity { property: name.to_string() }));
        }
        let extras = extras.collect();
        let getter = self.accessor(name, FunctionKind::Getter, getter)?;
        self.install_property(name, extras.doc, getter, None);
        Ok(self)
    }

    fn accessor<F, M>(&self, name: &str, kind: FunctionKind, method: F) -> BindResult<Function>
    where
        F: NativeMethod<T, M>,
        F::Output: IntoValue,
    {
        let signature = Signature::build(
            name,
            Self::receiver_hint(),
            F::params(),
            <F::Output as IntoValue>::type_hint(),
            Vec::new(),
        )?;
        let invoker: Invoker = Box::new(move |frame: &CallFrame<'_>, args: Vec<Value>| {
            let receiver = frame.receiver?;
            Some(method.invoke(receiver, &args)?.and_then(IntoValue::into_value))
        });
        let function = Function::new(name, kind, self.options.clone());
        function.add_overload(Overload { signature, doc: None, invoker });
        Ok(function)
    }

    fn install_property(&self, name: &str, doc: Option<String>, getter: Function, setter: Option<Function>) {
        let property = Property {
            name: name.to_string(),
            doc,
            getter: Arc::new(getter),
            setter: setter.map(Arc::new),
        };
        self.ty.set_member(name, Member::Property(Arc::new(property)));
        log_registration("property", name);
    }

    /// Class-level attribute
    pub fn attr(&self, name: &str, value: impl IntoValue) -> BindResult<&Self> {
        self.ty.set_member(name, Member::Attr(value.into_value()?));
        Ok(self)
    }

    /// Enumeration nested in this class's namespace
    pub fn enum_<E: NativeEnum>(&self, name: &str, options: EnumOptions) -> BindResult<EnumBuilder<'_, E>> {
        let scope = self.ty.qualified_name();
        let enum_type = EnumType::register::<E>(name, &scope, options)?;
        self.ty.set_member(name, Member::Attr(Value::EnumType(enum_type.clone())));
        Ok(EnumBuilder::new(enum_type, &*self.ty))
    }
}
