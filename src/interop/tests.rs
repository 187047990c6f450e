//! Test suite for marshaling, signatures and dispatch

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::call::Overload;
use super::*;
use crate::bindings::{ClassOptions, EnumOptions, Module, NativeEnum};
use crate::config::Options;
use crate::errors::{BindError, ErrorKind, ExceptionKind};
use crate::ffi::{Inherits, NativeClass, Owned};
use crate::objects::{BinaryOp, Value};

// ============================================================================
// Fixture natives
// ============================================================================

#[derive(Debug, Default)]
struct Counter {
    count: i64,
    label: String,
}

impl NativeClass for Counter {}

/// Only ever built by `test_native_dropped_once_with_last_handle`
static TALLY_DROPS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Tally;

impl Drop for Tally {
    fn drop(&mut self) {
        TALLY_DROPS.fetch_add(1, Ordering::SeqCst);
    }
}

impl NativeClass for Tally {}

#[derive(Debug, Default)]
struct Widget {
    id: i64,
}

impl NativeClass for Widget {}

#[derive(Debug, Default)]
struct Gadget {
    widget: Widget,
}

impl NativeClass for Gadget {}

impl Inherits<Widget> for Gadget {
    fn base(&self) -> &Widget {
        &self.widget
    }

    fn base_mut(&mut self) -> &mut Widget {
        &mut self.widget
    }
}

#[derive(Debug, Default)]
struct Gizmo {
    gadget: Gadget,
}

impl NativeClass for Gizmo {}

impl Inherits<Gadget> for Gizmo {
    fn base(&self) -> &Gadget {
        &self.gadget
    }

    fn base_mut(&mut self) -> &mut Gadget {
        &mut self.gadget
    }
}

/// Subclass of `Widget` with no class binding of its own
#[derive(Debug)]
struct Hidden {
    widget: Widget,
}

impl NativeClass for Hidden {}

impl Inherits<Widget> for Hidden {
    fn base(&self) -> &Widget {
        &self.widget
    }

    fn base_mut(&mut self) -> &mut Widget {
        &mut self.widget
    }
}

/// Never registered
#[derive(Debug)]
struct Stray;

impl NativeClass for Stray {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flag {
    Read = 1,
    Write = 2,
}

impl NativeEnum for Flag {
    fn discriminant(self) -> i64 {
        self as i64
    }

    fn from_discriminant(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            _ => None,
        }
    }
}

static FIXTURE: Lazy<Arc<Module>> = Lazy::new(|| match build_fixture() {
    Ok(module) => Arc::new(module),
    Err(err) => panic!("fixture module failed to build: {}", err),
});

fn build_fixture() -> Result<Module, BindError> {
    let m = Module::new("fixture");

    m.def("pick", |i: i64| format!("int {}", i), ())?;
    m.def("pick", |s: String| format!("str {}", s), ())?;
    m.def("pick", |b: bool| format!("bool {}", b), ())?;
    m.def("scale", |x: i64, factor: i64| x * factor, (arg("x"), arg("factor").default(2)))?;
    m.def("narrow", |x: i32| x, ())?;
    m.def("stray", || Owned::new(Stray), ())?;
    m.def("hidden", || Owned::<Widget>::from_derived(Hidden { widget: Widget { id: 4 } }), ())?;

    m.class::<Counter>("Counter", ClassOptions::new().doc("Counts things."))?
        .def_init(|| Counter::default(), ())?
        .def_init(|count: i64| Counter { count, label: String::new() }, "count".a())?
        .def("bump", |c: &mut Counter| c.count += 1, ())?
        .def("bump", |c: &mut Counter, by: i64| c.count += by, "by".a())?
        .def_readwrite("label", |c: &Counter| &c.label, |c: &mut Counter| &mut c.label, ())?
        .def_readonly("count", |c: &Counter| &c.count, "Current count.")?
        .attr("limit", 10)?;

    m.class::<Tally>("Tally", ClassOptions::new())?.def_init(|| Tally, ())?;

    m.class::<Widget>("Widget", ClassOptions::new().dynamic_attr())?
        .def_init(|id: i64| Widget { id }, "id".a())?
        .def("ident", |w: &Widget| w.id, ())?
        .def("reset", |w: &mut Widget| w.id = 0, ())?
        .def_property_readonly("double", |w: &Widget| w.id * 2, ())?;
    m.class::<Gadget>("Gadget", ClassOptions::new().extends::<Widget>())?
        .def_init(|id: i64| Gadget { widget: Widget { id } }, "id".a())?;
    m.class::<Gizmo>("Gizmo", ClassOptions::new().extends::<Gadget>())?
        .def_init(|| Gizmo::default(), ())?
        .def("renumber", |g: &mut Gizmo, id: i64| g.gadget.widget.id = id, "id".a())?;

    m.enum_::<Flag>("Flag", EnumOptions::new().arithmetic())?
        .value("Read", Flag::Read)
        .value("Write", Flag::Write)
        .export_values();
    m.def("has_write", |f: Flag| f == Flag::Write, ())?;

    Ok(m)
}

fn fixture() -> Value {
    Value::Module(FIXTURE.clone())
}

// ============================================================================
// Signatures
// ============================================================================

#[test]
fn test_signature_annotation_count_checked() {
    let err = Signature::build(
        "f",
        None,
        vec![TypeHint::Int, TypeHint::Int],
        TypeHint::Int,
        vec![arg("i")],
    )
    .unwrap_err();
    assert_eq!(err.exception(), ExceptionKind::ImportError);
    assert!(matches!(err.kind, ErrorKind::InvalidAnnotations { expected: 2, found: 1, .. }));
}

#[test]
fn test_signature_default_ordering_checked() {
    let err = Signature::build(
        "f",
        None,
        vec![TypeHint::Int, TypeHint::Int],
        TypeHint::Int,
        vec![arg("i").default(0), arg("j")],
    )
    .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DefaultOrdering { ref param, .. } if param == "j"));
}

#[test]
fn test_signature_bind_rules() {
    let sig = Signature::build(
        "f",
        None,
        vec![TypeHint::Int, TypeHint::Int],
        TypeHint::Int,
        vec![arg("i"), arg("j").default(7)],
    )
    .unwrap();

    let bound = sig.bind(&CallArgs::new().arg(1)).unwrap();
    assert_eq!(bound, vec![Value::Int(1), Value::Int(7)]);

    let bound = sig.bind(&CallArgs::new().kwarg("j", 3).kwarg("i", 4)).unwrap();
    assert_eq!(bound, vec![Value::Int(4), Value::Int(3)]);

    assert!(sig.bind(&CallArgs::new()).is_none());
    assert!(sig.bind(&CallArgs::new().arg(1).arg(2).arg(3)).is_none());
    assert!(sig.bind(&CallArgs::new().arg(1).kwarg("i", 2)).is_none());
    assert!(sig.bind(&CallArgs::new().kwarg("k", 2)).is_none());
}

#[test]
fn test_unnamed_parameters_reject_keywords() {
    let sig = Signature::build("f", None, vec![TypeHint::Int], TypeHint::Int, Vec::new()).unwrap();
    assert!(sig.bind(&CallArgs::new().kwarg("arg0", 1)).is_none());
    assert_eq!(sig.render(), "(arg0: int) -> int");
}

#[test]
fn test_signature_render_defaults() {
    let sig = Signature::build(
        "f",
        None,
        vec![TypeHint::Str, TypeHint::Int],
        TypeHint::None,
        vec![arg("name").default("x"), arg("n").default(0)],
    )
    .unwrap();
    assert_eq!(sig.render(), "(name: str = 'x', n: int = 0) -> None");
}

#[test]
fn test_unregistered_hint_renders_rust_path() {
    let rendered = TypeHint::native::<Stray>().render();
    assert!(rendered.ends_with("Stray"));
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_overloads_tried_in_order() {
    let m = fixture();
    assert_eq!(m.call_method("pick", [Value::Int(3)]).unwrap(), Value::from("int 3"));
    assert_eq!(m.call_method("pick", [Value::from("a")]).unwrap(), Value::from("str a"));
    // bool loads as an integer, so the first overload wins
    assert_eq!(m.call_method("pick", [Value::Bool(true)]).unwrap(), Value::from("int 1"));
}

#[test]
fn test_overload_mismatch_lists_signatures() {
    let err = fixture().call_method("pick", [Value::None]).unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(
        err.kind.to_string(),
        "pick(): incompatible function arguments. The following argument types are supported:\n    \
         1. (arg0: int) -> str\n    \
         2. (arg0: str) -> str\n    \
         3. (arg0: bool) -> str\n\n\
         Invoked with: None"
    );
}

#[test]
fn test_keyword_arguments_and_defaults() {
    let m = fixture();
    assert_eq!(m.call_method("scale", [Value::Int(4)]).unwrap(), Value::Int(8));
    assert_eq!(
        m.call_method("scale", CallArgs::new().arg(4).kwarg("factor", 3)).unwrap(),
        Value::Int(12)
    );

    let err = m
        .call_method("scale", CallArgs::new().kwarg("y", 1))
        .unwrap_err();
    assert!(err.to_string().ends_with("Invoked with: ; kwargs: y=1"));
}

#[test]
fn test_narrow_integers_reject_overflow() {
    let m = fixture();
    assert_eq!(m.call_method("narrow", [Value::Int(-5)]).unwrap(), Value::Int(-5));
    let err = m.call_method("narrow", [Value::Int(1 << 40)]).unwrap_err();
    assert!(err.is_type_error());
}

#[test]
fn test_function_doc_respects_options() {
    let quiet = Options::default().disable_function_signatures();
    let f = Function::new("twice", FunctionKind::Function, quiet);
    let sig = Signature::build("twice", None, vec![TypeHint::Int], TypeHint::Int, Vec::new()).unwrap();
    f.add_overload(Overload {
        signature: sig,
        doc: Some("Double it.".to_string()),
        invoker: Box::new(|_frame: &CallFrame<'_>, args: Vec<Value>| {
            let x = i64::from_value(args.first()?)?;
            Some(Ok(Value::Int(x * 2)))
        }),
    });

    assert_eq!(f.doc(), "Double it.\n");
    assert_eq!(f.call(&CallFrame::function(), &CallArgs::new().arg(21)).unwrap(), Value::Int(42));
}

#[test]
fn test_unregistered_return_type() {
    let err = fixture().call_method("stray", ()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnregisteredType { .. }));
    assert!(err.to_string().starts_with("TypeError: Unable to convert function return value"));
}

// ============================================================================
// Classes and handles
// ============================================================================

#[test]
fn test_constructor_overloads_and_methods() {
    let counter_ty = fixture().getattr("Counter").unwrap();

    let c = counter_ty.call(()).unwrap();
    c.call_method("bump", ()).unwrap();
    c.call_method("bump", CallArgs::new().kwarg("by", 5)).unwrap();
    assert_eq!(c.getattr("count").unwrap(), Value::Int(6));

    let c = counter_ty.call([Value::Int(10)]).unwrap();
    assert_eq!(c.getattr("count").unwrap(), Value::Int(10));

    let err = counter_ty.call([Value::from("ten")]).unwrap_err();
    assert!(err.to_string().contains("__init__(): incompatible constructor arguments"));
}

#[test]
fn test_readonly_property_rejects_assignment() {
    let c = fixture().getattr("Counter").unwrap().call(()).unwrap();
    let err = c.setattr("count", 3).unwrap_err();
    assert!(err.is_attribute_error());
    assert!(err.to_string().contains("can't set attribute"));
}

#[test]
fn test_readwrite_field_type_checked() {
    let c = fixture().getattr("Counter").unwrap().call(()).unwrap();
    c.setattr("label", "hits").unwrap();
    assert_eq!(c.getattr("label").unwrap(), Value::from("hits"));
    assert!(c.setattr("label", 3).unwrap_err().is_type_error());
}

#[test]
fn test_no_dynamic_attributes_without_opt_in() {
    let c = fixture().getattr("Counter").unwrap().call(()).unwrap();
    let err = c.setattr("extra", 1).unwrap_err();
    assert_eq!(
        err.to_string(),
        "AttributeError: 'fixture.Counter' object has no attribute 'extra'"
    );
}

#[test]
fn test_class_attribute_visible_on_instances() {
    let counter_ty = fixture().getattr("Counter").unwrap();
    assert_eq!(counter_ty.getattr("limit").unwrap(), Value::Int(10));
    let c = counter_ty.call(()).unwrap();
    assert_eq!(c.getattr("limit").unwrap(), Value::Int(10));
    assert_eq!(counter_ty.getattr("__doc__").unwrap(), Value::from("Counts things."));
}

#[test]
fn test_unbound_method_through_class() {
    let counter_ty = fixture().getattr("Counter").unwrap();
    let c = counter_ty.call([Value::Int(1)]).unwrap();
    counter_ty.call_method("bump", [c.clone()]).unwrap();
    assert_eq!(c.getattr("count").unwrap(), Value::Int(2));
}

#[test]
fn test_native_dropped_once_with_last_handle() {
    let t = fixture().getattr("Tally").unwrap().call(()).unwrap();
    let handle = t.as_handle().unwrap().clone();
    assert_eq!(handle.refcount(), 2);
    assert_eq!(TALLY_DROPS.load(Ordering::SeqCst), 0);

    drop(t);
    assert_eq!(handle.refcount(), 1);
    assert_eq!(TALLY_DROPS.load(Ordering::SeqCst), 0);

    drop(handle);
    assert_eq!(TALLY_DROPS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_multi_level_upcast() {
    let m = fixture();
    let gizmo = m.getattr("Gizmo").unwrap().call(()).unwrap();
    gizmo.call_method("renumber", [Value::Int(9)]).unwrap();

    assert_eq!(gizmo.call_method("ident", ()).unwrap(), Value::Int(9));
    assert_eq!(gizmo.getattr("double").unwrap(), Value::Int(18));

    let widget_ty = m.getattr("Widget").unwrap();
    let Value::Type(widget_ty) = widget_ty else {
        panic!("Widget is not a type");
    };
    assert!(gizmo.is_instance_of(&widget_ty));
    assert!(gizmo.as_handle().unwrap().holds::<Widget>());
    assert!(!gizmo.as_handle().unwrap().holds::<Counter>());
}

#[test]
fn test_unbound_subclass_keeps_declared_base() {
    let w = fixture().call_method("hidden", ()).unwrap();
    assert_eq!(w.getattr("__class__").unwrap().getattr("__name__").unwrap(), Value::from("Widget"));

    assert_eq!(w.call_method("ident", ()).unwrap(), Value::Int(4));
    assert_eq!(w.getattr("double").unwrap(), Value::Int(8));
    w.call_method("reset", ()).unwrap();
    assert_eq!(w.call_method("ident", ()).unwrap(), Value::Int(0));

    let handle = w.as_handle().unwrap();
    assert!(handle.holds::<Widget>());
    assert!(handle.holds::<Hidden>());
    assert!(!handle.holds::<Gadget>());
}

#[test]
fn test_dynamic_attributes_inherited() {
    let gadget = fixture().getattr("Gadget").unwrap().call([Value::Int(1)]).unwrap();
    gadget.setattr("color", "red").unwrap();
    assert_eq!(gadget.getattr("color").unwrap(), Value::from("red"));
}

#[test]
fn test_self_mismatch_on_foreign_receiver() {
    let m = fixture();
    let counter = m.getattr("Counter").unwrap().call(()).unwrap();
    let ident = m.getattr("Widget").unwrap().getattr("ident").unwrap();
    let err = ident.call([counter]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::SelfMismatch { .. }));
}

// ============================================================================
// Enums
// ============================================================================

#[test]
fn test_arithmetic_enum() {
    let m = fixture();
    let read = m.getattr("Read").unwrap();
    let write = m.getattr("Flag").unwrap().getattr("Write").unwrap();

    assert_eq!(read.binary_op(BinaryOp::Or, &write).unwrap(), Value::Int(3));
    assert_eq!(write.binary_op(BinaryOp::Sub, &Value::Int(1)).unwrap(), Value::Int(1));
    assert_eq!(m.call_method("has_write", [write]).unwrap(), Value::Bool(true));
    assert!(m.call_method("has_write", [Value::Int(2)]).is_err());
}

#[test]
fn test_enum_from_integer() {
    let flag_ty = fixture().getattr("Flag").unwrap();
    let read = flag_ty.call([Value::Int(1)]).unwrap();
    assert_eq!(read.repr().unwrap(), "<Flag.Read: 1>");
    assert_eq!(flag_ty.call([Value::Int(7)]).unwrap().str().unwrap(), "Flag.???");
    assert!(flag_ty.call([Value::from("Read")]).is_err());
}
