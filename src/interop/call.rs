//! Function records, argument annotations and overload dispatch.
//!
//! A [`Function`] is a host-visible callable holding one or more overloads.
//! Each overload pairs a [`Signature`] with a type-erased invoker. A call
//! binds positional and keyword arguments against each signature in
//! declaration order and runs the first overload whose arguments all load.

use std::sync::Arc;

use parking_lot::RwLock;

use super::marshal::{CallArgs, FromValue};
use super::types::TypeHint;
use crate::bindings::TypeObject;
use crate::config::Options;
use crate::errors::{BindError, BindResult, ErrorKind};
use crate::ffi::{Handle, NativeClass};
use crate::logging::{log_dispatch, log_dispatch_failure};
use crate::objects::Value;

// ============================================================================
// Argument annotations
// ============================================================================

/// A named parameter, optionally carrying a default value
#[derive(Debug, Clone)]
pub struct Arg {
    name: String,
    default: Option<Value>,
}

impl Arg {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Value used when the caller omits this parameter
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Name a parameter: `arg("i")`
pub fn arg(name: &str) -> Arg {
    Arg::new(name)
}

/// Literal-suffix spelling of [`arg`]: `"i".a()`
pub trait ArgLiteral {
    fn a(self) -> Arg;
}

impl ArgLiteral for &str {
    fn a(self) -> Arg {
        Arg::new(self)
    }
}

/// Everything attached to a binding besides the callable itself
#[derive(Debug, Clone, Default)]
pub struct FunctionExtras {
    pub(crate) doc: Option<String>,
    pub(crate) args: Vec<Arg>,
}

/// A single annotation: a docstring or an [`Arg`]
pub trait Extra {
    fn apply(self, extras: &mut FunctionExtras);
}

impl Extra for &str {
    fn apply(self, extras: &mut FunctionExtras) {
        extras.doc = Some(self.to_string());
    }
}

impl Extra for String {
    fn apply(self, extras: &mut FunctionExtras) {
        extras.doc = Some(self);
    }
}

impl Extra for Arg {
    fn apply(self, extras: &mut FunctionExtras) {
        extras.args.push(self);
    }
}

/// One annotation or a tuple of them
pub trait Extras {
    fn collect(self) -> FunctionExtras;
}

impl Extras for () {
    fn collect(self) -> FunctionExtras {
        FunctionExtras::default()
    }
}

impl<E: Extra> Extras for E {
    fn collect(self) -> FunctionExtras {
        let mut extras = FunctionExtras::default();
        self.apply(&mut extras);
        extras
    }
}

macro_rules! impl_extras_tuple {
    ($($e:ident),+) => {
        impl<$($e: Extra),+> Extras for ($($e,)+) {
            #[allow(non_snake_case)]
            fn collect(self) -> FunctionExtras {
                let mut extras = FunctionExtras::default();
                let ($($e,)+) = self;
                $($e.apply(&mut extras);)+
                extras
            }
        }
    };
}

impl_extras_tuple!(E1);
impl_extras_tuple!(E1, E2);
impl_extras_tuple!(E1, E2, E3);
impl_extras_tuple!(E1, E2, E3, E4);

// ============================================================================
// Signatures
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Param {
    pub(crate) name: Option<String>,
    pub(crate) hint: TypeHint,
    pub(crate) default: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub(crate) receiver: Option<TypeHint>,
    pub(crate) params: Vec<Param>,
    pub(crate) output: TypeHint,
}

impl Signature {
    /// Pair parameter types with the annotations given at registration.
    ///
    /// Without annotations the parameters stay unnamed (`arg0`, `arg1`, ...)
    /// and can only be passed positionally.
    pub(crate) fn build(
        function: &str,
        receiver: Option<TypeHint>,
        hints: Vec<TypeHint>,
        output: TypeHint,
        args: Vec<Arg>,
    ) -> BindResult<Self> {
        if !args.is_empty() && args.len() != hints.len() {
            return Err(BindError::new(ErrorKind::InvalidAnnotations {
                function: function.to_string(),
                expected: hints.len(),
                found: args.len(),
            }));
        }

        let params: Vec<Param> = if args.is_empty() {
            hints
                .into_iter()
                .map(|hint| Param { name: None, hint, default: None })
                .collect()
        } else {
            hints
                .into_iter()
                .zip(args)
                .map(|(hint, arg)| Param {
                    name: Some(arg.name),
                    hint,
                    default: arg.default,
                })
                .collect()
        };

        let mut seen_default = false;
        for param in &params {
            if param.default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(BindError::new(ErrorKind::DefaultOrdering {
                    function: function.to_string(),
                    param: param.name.clone().unwrap_or_default(),
                }));
            }
        }

        Ok(Self { receiver, params, output })
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Match a call against this signature, producing one value per parameter
    pub(crate) fn bind(&self, call: &CallArgs) -> Option<Vec<Value>> {
        if call.positional.len() > self.params.len() {
            return None;
        }

        let mut slots: Vec<Option<Value>> = vec![None; self.params.len()];
        for (slot, value) in slots.iter_mut().zip(call.positional.iter()) {
            *slot = Some(value.clone());
        }

        for (name, value) in &call.keywords {
            let index = self
                .params
                .iter()
                .position(|p| p.name.as_deref() == Some(name.as_str()))?;
            if slots[index].is_some() {
                return None;
            }
            slots[index] = Some(value.clone());
        }

        slots
            .into_iter()
            .zip(&self.params)
            .map(|(slot, param)| slot.or_else(|| param.default.clone()))
            .collect()
    }

    /// `(self: example.Pet, name: str) -> None`
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.params.len() + 1);
        if let Some(receiver) = self.receiver {
            parts.push(format!("self: {}", receiver.render()));
        }
        for (i, param) in self.params.iter().enumerate() {
            let name = param.name.clone().unwrap_or_else(|| format!("arg{}", i));
            let mut part = format!("{}: {}", name, param.hint.render());
            if let Some(default) = &param.default {
                part.push_str(" = ");
                part.push_str(&default.repr().unwrap_or_else(|_| "...".to_string()));
            }
            parts.push(part);
        }
        format!("({}) -> {}", parts.join(", "), self.output.render())
    }
}

// ============================================================================
// Native callables
// ============================================================================

/// Receiver marker for methods taking `&T`
pub struct Ref;

/// Receiver marker for methods taking `&mut T`
pub struct Mut;

/// A free native function of any supported arity.
///
/// `Marker` is the argument tuple; it only exists so that closures of
/// different arities get distinct implementations.
pub trait NativeFn<Marker>: Send + Sync + 'static {
    type Output;

    fn params() -> Vec<TypeHint>;

    /// Load every argument, then call. `None` when an argument does not load.
    fn invoke(&self, args: &[Value]) -> Option<Self::Output>;
}

/// A native method taking `&T` or `&mut T` as receiver
pub trait NativeMethod<T, Marker>: Send + Sync + 'static {
    type Output;

    fn params() -> Vec<TypeHint>;

    fn invoke(&self, this: &Handle, args: &[Value]) -> Option<BindResult<Self::Output>>;
}

macro_rules! impl_native_callables {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> NativeFn<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            $($arg: FromValue,)*
        {
            type Output = R;

            fn params() -> Vec<TypeHint> {
                vec![$(<$arg as FromValue>::type_hint()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, args: &[Value]) -> Option<R> {
                let mut values = args.iter();
                $(let $arg = <$arg as FromValue>::from_value(values.next()?)?;)*
                Some(self($($arg),*))
            }
        }

        impl<T, F, R, $($arg,)*> NativeMethod<T, (Ref, $($arg,)*)> for F
        where
            T: NativeClass,
            F: Fn(&T, $($arg),*) -> R + Send + Sync + 'static,
            $($arg: FromValue,)*
        {
            type Output = R;

            fn params() -> Vec<TypeHint> {
                vec![$(<$arg as FromValue>::type_hint()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, this: &Handle, args: &[Value]) -> Option<BindResult<R>> {
                let mut values = args.iter();
                $(let $arg = <$arg as FromValue>::from_value(values.next()?)?;)*
                Some(this.with_ref(|native: &T| self(native, $($arg),*)))
            }
        }

        impl<T, F, R, $($arg,)*> NativeMethod<T, (Mut, $($arg,)*)> for F
        where
            T: NativeClass,
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            $($arg: FromValue,)*
        {
            type Output = R;

            fn params() -> Vec<TypeHint> {
                vec![$(<$arg as FromValue>::type_hint()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn invoke(&self, this: &Handle, args: &[Value]) -> Option<BindResult<R>> {
                let mut values = args.iter();
                $(let $arg = <$arg as FromValue>::from_value(values.next()?)?;)*
                Some(this.with_mut(|native: &mut T| self(native, $($arg),*)))
            }
        }
    };
}

impl_native_callables!();
impl_native_callables!(A1);
impl_native_callables!(A1, A2);
impl_native_callables!(A1, A2, A3);

// ============================================================================
// Functions and dispatch
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Method,
    Constructor,
    Getter,
    Setter,
}

impl FunctionKind {
    fn takes_receiver(self) -> bool {
        matches!(self, Self::Method | Self::Getter | Self::Setter)
    }
}

/// Context a call runs in: the bound receiver, or the class being constructed
#[derive(Default)]
pub struct CallFrame<'a> {
    pub(crate) receiver: Option<&'a Handle>,
    pub(crate) class: Option<&'a Arc<TypeObject>>,
}

impl<'a> CallFrame<'a> {
    pub fn function() -> Self {
        Self::default()
    }

    pub fn method(receiver: &'a Handle) -> Self {
        Self { receiver: Some(receiver), class: None }
    }

    pub fn constructor(class: &'a Arc<TypeObject>) -> Self {
        Self { receiver: None, class: Some(class) }
    }
}

/// Type-erased overload body. Returns `None` when the arguments don't load.
pub(crate) type Invoker =
    Box<dyn Fn(&CallFrame<'_>, Vec<Value>) -> Option<BindResult<Value>> + Send + Sync>;

pub(crate) struct Overload {
    pub(crate) signature: Signature,
    pub(crate) doc: Option<String>,
    pub(crate) invoker: Invoker,
}

/// A host-visible callable: one name, one or more overloads
pub struct Function {
    name: String,
    kind: FunctionKind,
    options: Options,
    overloads: RwLock<Vec<Arc<Overload>>>,
}

impl Function {
    pub(crate) fn new(name: impl Into<String>, kind: FunctionKind, options: Options) -> Self {
        Self {
            name: name.into(),
            kind,
            options,
            overloads: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn add_overload(&self, overload: Overload) {
        self.overloads.write().push(Arc::new(overload));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn overload_count(&self) -> usize {
        self.overloads.read().len()
    }

    /// Rendered signatures in declaration order, without the function name
    pub fn signatures(&self) -> Vec<String> {
        self.overloads.read().iter().map(|o| o.signature.render()).collect()
    }

    /// Dispatch a host call to the first overload that accepts it
    pub fn call(&self, frame: &CallFrame<'_>, args: &CallArgs) -> BindResult<Value> {
        // Unbound method called through the class: `Pet.getName(p)`
        if self.kind.takes_receiver() && frame.receiver.is_none() {
            if let Some((Value::Object(receiver), rest)) = args.split_first() {
                return self.call(&CallFrame::method(&receiver), &rest);
            }
            return Err(self.incompatible(frame, args));
        }

        // Snapshot so natives may call back into this function
        let overloads: Vec<Arc<Overload>> = self.overloads.read().clone();
        for (index, overload) in overloads.iter().enumerate() {
            let Some(bound) = overload.signature.bind(args) else {
                continue;
            };
            let argc = bound.len();
            if let Some(result) = (overload.invoker)(frame, bound) {
                log_dispatch(&self.name, index, argc);
                return result;
            }
        }
        log_dispatch_failure(&self.name, overloads.len());

        Err(self.incompatible(frame, args))
    }

    fn incompatible(&self, frame: &CallFrame<'_>, args: &CallArgs) -> BindError {
        let signatures = self.signatures();

        let mut shown: Vec<String> = Vec::new();
        if let Some(receiver) = frame.receiver {
            shown.push(repr_or_placeholder(&Value::Object(receiver.clone())));
        }
        shown.extend(args.positional.iter().map(repr_or_placeholder));
        let mut invoked_with = shown.join(", ");
        if !args.keywords.is_empty() {
            let kwargs: Vec<String> = args
                .keywords
                .iter()
                .map(|(name, value)| format!("{}={}", name, repr_or_placeholder(value)))
                .collect();
            invoked_with.push_str("; kwargs: ");
            invoked_with.push_str(&kwargs.join(", "));
        }

        BindError::new(ErrorKind::IncompatibleArguments {
            function: self.name.clone(),
            constructor: self.kind == FunctionKind::Constructor,
            signatures,
            invoked_with,
        })
    }

    /// Docstring as the host shows it: generated signatures plus user docs
    pub fn doc(&self) -> String {
        let overloads = self.overloads.read();
        let show_sigs = self.options.show_function_signatures;
        let show_docs = self.options.show_user_defined_docstrings;
        let mut out = String::new();

        if overloads.len() == 1 {
            let overload = &overloads[0];
            if show_sigs {
                out.push_str(&self.name);
                out.push_str(&overload.signature.render());
                out.push('\n');
            }
            if let (true, Some(doc)) = (show_docs, &overload.doc) {
                if show_sigs {
                    out.push('\n');
                }
                out.push_str(doc);
                out.push('\n');
            }
            return out;
        }

        if show_sigs {
            out.push_str(&format!("{}(*args, **kwargs)\nOverloaded function.\n\n", self.name));
        }
        for (i, overload) in overloads.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if show_sigs {
                out.push_str(&format!("{}. {}{}\n", i + 1, self.name, overload.signature.render()));
            }
            if let (true, Some(doc)) = (show_docs, &overload.doc) {
                if show_sigs {
                    out.push('\n');
                }
                out.push_str(doc);
                out.push('\n');
            }
        }
        out
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("overloads", &self.overload_count())
            .finish()
    }
}

fn repr_or_placeholder(value: &Value) -> String {
    value
        .repr()
        .unwrap_or_else(|_| format!("<{} object>", value.qualified_type_name()))
}
