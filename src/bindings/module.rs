//! Host modules: a named namespace of functions, types and attributes.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::class::{ClassBuilder, ClassOptions, Member, TypeObject};
use super::enums::{EnumBuilder, EnumOptions, EnumType, NativeEnum};
use super::Scope;
use crate::config::Options;
use crate::errors::{AttributeOwner, BindError, BindResult};
use crate::ffi::NativeClass;
use crate::interop::{
    CallArgs, CallFrame, Extras, Function, FunctionKind, IntoValue, Invoker, NativeFn, Overload,
    Signature,
};
use crate::logging::{log_attribute_miss, log_registration};
use crate::objects::Value;

pub struct Module {
    name: String,
    doc: RwLock<Option<String>>,
    options: Options,
    attrs: DashMap<String, Value>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self::with_options(Options::for_module(name))
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            name: options.module_name.clone(),
            doc: RwLock::new(None),
            options,
            attrs: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_doc(&self, doc: impl Into<String>) {
        *self.doc.write() = Some(doc.into());
    }

    pub fn doc(&self) -> Option<String> {
        self.doc.read().clone()
    }

    /// Bind a free function; binding the same name again adds an overload
    pub fn def<F, M>(&self, name: &str, function: F, extras: impl Extras) -> BindResult<&Self>
    where
        F: NativeFn<M>,
        F::Output: IntoValue,
    {
        let extras = extras.collect();
        let signature = Signature::build(
            name,
            None,
            F::params(),
            <F::Output as IntoValue>::type_hint(),
            extras.args,
        )?;
        let invoker: Invoker = Box::new(move |_frame: &CallFrame<'_>, args: Vec<Value>| {
            Some(function.invoke(&args)?.into_value())
        });
        let overload = Overload { signature, doc: extras.doc, invoker };

        match self.function(name) {
            Some(existing) => existing.add_overload(overload),
            None => {
                let function = Function::new(name, FunctionKind::Function, self.options.clone());
                function.add_overload(overload);
                self.attrs
                    .insert(name.to_string(), Value::Function(Arc::new(function)));
            }
        }
        log_registration("function", name);
        Ok(self)
    }

    /// Bound free function registered under `name`
    pub fn function(&self, name: &str) -> Option<Arc<Function>> {
        match self.attrs.get(name).as_deref() {
            Some(Value::Function(f)) => Some(f.clone()),
            _ => None,
        }
    }

    /// `m.attr("the_answer") = 42`
    pub fn add_attr(&self, name: &str, value: impl IntoValue) -> BindResult<&Self> {
        self.attrs.insert(name.to_string(), value.into_value()?);
        log_registration("attribute", name);
        Ok(self)
    }

    pub fn class<T: NativeClass>(&self, name: &str, options: ClassOptions<T>) -> BindResult<ClassBuilder<T>> {
        let builder = ClassBuilder::register(name, &self.options, options)?;
        self.attrs
            .insert(name.to_string(), Value::Type(builder.type_object().clone()));
        Ok(builder)
    }

    pub fn enum_<E: NativeEnum>(&self, name: &str, options: EnumOptions) -> BindResult<EnumBuilder<'_, E>> {
        let ty = EnumType::register::<E>(name, &self.name, options)?;
        self.attrs.insert(name.to_string(), Value::EnumType(ty.clone()));
        Ok(EnumBuilder::new(ty, self))
    }

    pub fn getattr(&self, name: &str) -> BindResult<Value> {
        match name {
            "__name__" => return Ok(Value::Str(self.name.clone())),
            "__doc__" => return Ok(self.doc().map(Value::Str).unwrap_or(Value::None)),
            _ => {}
        }
        match self.attrs.get(name) {
            Some(value) => Ok(value.clone()),
            None => {
                log_attribute_miss(&self.name, name);
                Err(BindError::missing_attribute(
                    AttributeOwner::Module(self.name.clone()),
                    name,
                ))
            }
        }
    }

    pub fn setattr(&self, name: &str, value: impl Into<Value>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    /// `example.add(1, 2)`
    pub fn call(&self, name: &str, args: impl Into<CallArgs>) -> BindResult<Value> {
        self.getattr(name)?.call(args)
    }

    /// Attribute names, sorted
    pub fn dir(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attrs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Render the module the way `help(example)` shows it
    pub fn help(&self) -> String {
        let mut classes = Vec::new();
        let mut functions = Vec::new();
        let mut data = Vec::new();
        for name in self.dir() {
            let Some(value) = self.attrs.get(&name).map(|v| v.clone()) else {
                continue;
            };
            match value {
                Value::Type(ty) => classes.push(ty),
                Value::Function(f) => functions.push(f),
                Value::EnumType(_) | Value::Module(_) => {}
                other => data.push((name, other)),
            }
        }

        let mut out = format!("Help on module {}:\n\nNAME\n", self.name);
        match self.doc() {
            Some(doc) => out.push_str(&format!("    {} - {}\n", self.name, doc)),
            None => out.push_str(&format!("    {}\n", self.name)),
        }

        if !classes.is_empty() {
            out.push_str("\nCLASSES\n");
            for ty in &classes {
                render_class(&mut out, ty);
            }
        }

        if !functions.is_empty() {
            out.push_str("\nFUNCTIONS\n");
            for function in &functions {
                for line in function.doc().lines() {
                    out.push_str(&indent(line, "    "));
                }
                out.push('\n');
            }
        }

        if !data.is_empty() {
            out.push_str("\nDATA\n");
            for (name, value) in &data {
                let repr = value.repr().unwrap_or_else(|_| "...".to_string());
                out.push_str(&format!("    {} = {}\n", name, repr));
            }
        }
        out
    }
}

impl Scope for Module {
    fn export(&self, name: &str, value: Value) {
        self.attrs.insert(name.to_string(), value);
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<module '{}'>", self.name)
    }
}

fn indent(line: &str, prefix: &str) -> String {
    if line.is_empty() {
        format!("{}\n", prefix.trim_end())
    } else {
        format!("{}{}\n", prefix, line)
    }
}

fn render_class(out: &mut String, ty: &TypeObject) {
    match ty.base() {
        Some(base) => out.push_str(&format!("    class {}({})\n", ty.name(), base.qualified_name())),
        None => out.push_str(&format!("    class {}(pybind11_object)\n", ty.name())),
    }
    if let Some(doc) = ty.doc() {
        out.push_str(&format!("     |  {}\n     |\n", doc));
    }

    let mut properties = Vec::new();
    for name in ty.member_names() {
        match ty.own_member(&name) {
            Some(Member::Method(method)) => {
                for line in method.doc().lines() {
                    out.push_str(&indent(line, "     |  "));
                }
                out.push_str("     |\n");
            }
            Some(Member::Property(property)) => properties.push(property),
            Some(Member::Attr(value)) => {
                let repr = value.repr().unwrap_or_else(|_| "...".to_string());
                out.push_str(&format!("     |  {} = {}\n     |\n", name, repr));
            }
            None => {}
        }
    }

    if !properties.is_empty() {
        out.push_str("     |  ----------------------------------------------------------------------\n");
        out.push_str("     |  Data descriptors defined here:\n     |\n");
        for property in properties {
            out.push_str(&format!("     |  {}\n", property.name()));
            if let Some(doc) = property.doc() {
                out.push_str(&format!("     |      {}\n", doc));
            }
            out.push_str("     |\n");
        }
    }
    out.push('\n');
}
