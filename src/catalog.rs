//! The `example` module: a tour of the binding surface.
//!
//! Free functions with positional, named and defaulted parameters, module
//! attributes, a class with constructors, methods, properties, a custom
//! repr, dynamic attributes and a nested enum, single inheritance, and
//! factory functions showing static versus polymorphic type recovery.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::bindings::{ClassOptions, EnumOptions, Module, NativeEnum};
use crate::errors::BindResult;
use crate::ffi::{Inherits, NativeClass, Owned};
use crate::interop::{arg, cast, ArgLiteral};

pub fn add(i: i32, j: i32) -> i32 {
    i.wrapping_add(j)
}

/// Same as [`add`]; bound with `i = 0, j = 0` defaults
pub fn add_def(i: i32, j: i32) -> i32 {
    i.wrapping_add(j)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Dog = 0,
    Cat = 1,
}

impl NativeEnum for Kind {
    fn discriminant(self) -> i64 {
        self as i64
    }

    fn from_discriminant(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Dog),
            1 => Some(Self::Cat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pet {
    pub name: String,
    pub owner: String,
    pub kind: Option<Kind>,
    pub age: Option<i32>,
}

impl Pet {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_owner(name, "")
    }

    pub fn with_owner(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            kind: None,
            age: None,
        }
    }

    pub fn with_kind(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_age(&mut self, age: i32) {
        self.age = Some(age);
    }
}

impl NativeClass for Pet {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dog {
    pet: Pet,
}

impl Dog {
    pub fn new(name: impl Into<String>) -> Self {
        Self { pet: Pet::new(name) }
    }

    pub fn bark(&self) -> &'static str {
        "woof!"
    }
}

impl NativeClass for Dog {}

impl Inherits<Pet> for Dog {
    fn base(&self) -> &Pet {
        &self.pet
    }

    fn base_mut(&mut self) -> &mut Pet {
        &mut self.pet
    }
}

/// Carries no state; only its polymorphic marker matters
#[derive(Debug, Default)]
pub struct PolymorphicPet;

impl NativeClass for PolymorphicPet {
    const POLYMORPHIC: bool = true;
}

#[derive(Debug, Default)]
pub struct PolymorphicDog {
    base: PolymorphicPet,
}

impl PolymorphicDog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bark(&self) -> &'static str {
        "woof!"
    }
}

impl NativeClass for PolymorphicDog {
    const POLYMORPHIC: bool = true;
}

impl Inherits<PolymorphicPet> for PolymorphicDog {
    fn base(&self) -> &PolymorphicPet {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PolymorphicPet {
        &mut self.base
    }
}

/// Native object handed out as a `Pet`; the host never learns it is a `Dog`
pub fn pet_store() -> Owned<Pet> {
    Owned::from_derived(Dog::new("Rocky"))
}

/// Native object handed out as a `PolymorphicPet`, recovered as its concrete type
pub fn pet_store2() -> Owned<PolymorphicPet> {
    Owned::from_derived(PolymorphicDog::new())
}

static MODULE: OnceCell<Arc<Module>> = OnceCell::new();

/// The process-wide `example` module, built on first use
pub fn module() -> BindResult<Arc<Module>> {
    MODULE
        .get_or_try_init(|| init_module().map(Arc::new))
        .cloned()
}

/// Build the `example` module.
///
/// Native types register once per process: a second call fails with a
/// duplicate registration error. Use [`module`] for the shared instance.
pub fn init_module() -> BindResult<Module> {
    let m = Module::new("example");
    m.set_doc("An example module.");

    m.def("add1", add, "A function to add two integers.")?;
    m.def("add2", add, ("A function to add two integers.", arg("i"), arg("j")))?;
    m.def("add3", add, (arg("i"), arg("j")))?;
    m.def("add4", add, ("i".a(), "j".a()))?;
    m.def(
        "add5",
        add_def,
        (
            "A function to add two integers with def. params.",
            arg("i").default(0),
            arg("j").default(0),
        ),
    )?;
    m.def(
        "add6",
        add_def,
        (
            "A function to add two integers with def. params.",
            "i".a().default(0),
            "j".a().default(0),
        ),
    )?;

    m.add_attr("the_answer", 42)?;
    let world = cast("World")?;
    m.add_attr("what", world)?;

    let pet = m.class::<Pet>("Pet", ClassOptions::new().dynamic_attr())?;
    pet.def_init(|name: String| Pet::new(name), "name".a())?
        .def("setName", |p: &mut Pet, name: String| p.set_name(name), ("Set pet name.", "name".a()))?
        .def("getName", |p: &Pet| p.name().to_string(), "Get pet name.")?
        .def(
            "__repr__",
            |p: &Pet| format!("<example.Pet named '{}' owned by '{}'>", p.name, p.owner),
            "Return repr(self).",
        )?
        .def_readwrite("owner", |p: &Pet| &p.owner, |p: &mut Pet| &mut p.owner, "Owner name.")?
        .def_property(
            "name",
            |p: &Pet| p.name().to_string(),
            |p: &mut Pet, name: String| p.set_name(name),
            "Pet name.",
        )?
        .def_readonly("age", |p: &Pet| &p.age, "Pet age, None until set.")?
        .def_readonly("kind", |p: &Pet| &p.kind, "Pet kind, None unless given.")?;

    m.class::<Dog>("Dog", ClassOptions::new().extends::<Pet>())?
        .def_init(|name: String| Dog::new(name), "name".a())?
        .def("bark", |d: &Dog| d.bark(), "Bark like a dog.")?;

    m.def("pet_store", pet_store, ())?;

    m.class::<PolymorphicPet>("PolymorphicPet", ClassOptions::new())?;
    m.class::<PolymorphicDog>("PolymorphicDog", ClassOptions::new().extends::<PolymorphicPet>())?
        .def_init(PolymorphicDog::new, ())?
        .def("bark", |d: &PolymorphicDog| d.bark(), ())?;

    m.def("pet_store2", pet_store2, ())?;

    pet.def("set", |p: &mut Pet, age: i32| p.set_age(age), ("Set the pet's age", "age".a()))?
        .def("set", |p: &mut Pet, name: String| p.set_name(name), ("Set the pet's name", "name".a()))?;

    pet.def_init(
        |name: String, kind: Kind| Pet::with_kind(name, kind),
        ("name".a(), "kind".a()),
    )?;
    pet.enum_::<Kind>("Kind", EnumOptions::new())?
        .value("Dog", Kind::Dog)
        .value("Cat", Kind::Cat)
        .export_values();

    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExceptionKind;
    use crate::objects::Value;

    #[test]
    fn test_add_wraps() {
        assert_eq!(add(1, 2), 3);
        assert_eq!(add_def(-4, 4), 0);
        assert_eq!(add(i32::MAX, 1), i32::MIN);
    }

    #[test]
    fn test_pet_natives() {
        let mut pet = Pet::with_kind("Rocky", Kind::Dog);
        assert_eq!(pet.name(), "Rocky");
        assert_eq!(pet.owner, "");
        assert_eq!(pet.age, None);

        pet.set_age(5);
        pet.set_name("Molly");
        assert_eq!((pet.name(), pet.age), ("Molly", Some(5)));
    }

    #[test]
    fn test_kind_discriminants() {
        assert_eq!(Kind::Dog.discriminant(), 0);
        assert_eq!(Kind::Cat.discriminant(), 1);
        assert_eq!(Kind::from_discriminant(1), Some(Kind::Cat));
        assert_eq!(Kind::from_discriminant(2), None);
    }

    #[test]
    fn test_factories_hold_derived() {
        assert_eq!(pet_store().concrete_type_id(), std::any::TypeId::of::<Dog>());
        assert_eq!(
            pet_store2().concrete_type_id(),
            std::any::TypeId::of::<PolymorphicDog>()
        );
    }

    #[test]
    fn test_second_registration_fails() {
        module().unwrap();
        let err = init_module().unwrap_err();
        assert_eq!(err.exception(), ExceptionKind::ImportError);
        assert!(err.to_string().contains("is already registered!"));
    }

    #[test]
    fn test_module_is_cached() {
        let a = module().unwrap();
        let b = module().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.getattr("the_answer").unwrap(), Value::Int(42));
    }
}
