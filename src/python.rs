//! CPython extension module `example`, built with the `python` feature.
//!
//! The same catalog as `catalog::init_module`, expressed with PyO3. PyO3
//! has no overload sets, so overloaded natives take `&PyAny` and dispatch
//! on the extracted type in declaration order.

use pyo3::exceptions::{PyAttributeError, PyImportError, PyTypeError};
use pyo3::prelude::*;
use pyo3::types::PyTuple;

use crate::catalog::{self, Kind, Pet, PolymorphicDog};
use crate::errors::{BindError, ErrorKind, ExceptionKind};
use crate::ffi::Inherits;

impl From<BindError> for PyErr {
    fn from(err: BindError) -> PyErr {
        let message = err.kind.to_string();
        match err.exception() {
            ExceptionKind::TypeError => PyTypeError::new_err(message),
            ExceptionKind::AttributeError => PyAttributeError::new_err(message),
            ExceptionKind::ImportError => PyImportError::new_err(message),
        }
    }
}

/// A function to add two integers.
#[pyfunction]
#[pyo3(signature = (arg0, arg1, /))]
fn add1(arg0: i32, arg1: i32) -> i32 {
    catalog::add(arg0, arg1)
}

/// A function to add two integers.
#[pyfunction]
#[pyo3(signature = (i, j))]
fn add2(i: i32, j: i32) -> i32 {
    catalog::add(i, j)
}

#[pyfunction]
#[pyo3(signature = (i, j))]
fn add3(i: i32, j: i32) -> i32 {
    catalog::add(i, j)
}

#[pyfunction]
#[pyo3(signature = (i, j))]
fn add4(i: i32, j: i32) -> i32 {
    catalog::add(i, j)
}

/// A function to add two integers with def. params.
#[pyfunction]
#[pyo3(signature = (i = 0, j = 0))]
fn add5(i: i32, j: i32) -> i32 {
    catalog::add_def(i, j)
}

/// A function to add two integers with def. params.
#[pyfunction]
#[pyo3(signature = (i = 0, j = 0))]
fn add6(i: i32, j: i32) -> i32 {
    catalog::add_def(i, j)
}

#[pyclass(name = "Kind", module = "example")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PyKind {
    Dog = 0,
    Cat = 1,
}

impl From<Kind> for PyKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Dog => Self::Dog,
            Kind::Cat => Self::Cat,
        }
    }
}

impl From<PyKind> for Kind {
    fn from(kind: PyKind) -> Self {
        match kind {
            PyKind::Dog => Self::Dog,
            PyKind::Cat => Self::Cat,
        }
    }
}

#[pyclass(name = "Pet", module = "example", subclass, dict)]
struct PyPet {
    inner: Pet,
}

#[pymethods]
impl PyPet {
    /// `Pet(name)` or `Pet(name, kind)`; `kind` must be a `Pet.Kind`.
    #[new]
    #[pyo3(signature = (name, *rest))]
    fn new(name: &PyAny, rest: &PyTuple) -> PyResult<Self> {
        if let Ok(name) = name.extract::<String>() {
            match rest.len() {
                0 => return Ok(Self { inner: Pet::new(name) }),
                1 => {
                    if let Ok(kind) = rest.get_item(0)?.extract::<PyKind>() {
                        return Ok(Self { inner: Pet::with_kind(name, kind.into()) });
                    }
                }
                _ => {}
            }
        }

        let mut invoked_with = vec![name.repr()?.to_string()];
        for value in rest.iter() {
            invoked_with.push(value.repr()?.to_string());
        }
        Err(BindError::new(ErrorKind::IncompatibleArguments {
            function: "__init__".to_string(),
            constructor: true,
            signatures: vec![
                "(self: example.Pet, name: str) -> None".to_string(),
                "(self: example.Pet, name: str, kind: example.Pet.Kind) -> None".to_string(),
            ],
            invoked_with: invoked_with.join(", "),
        })
        .into())
    }

    /// Set pet name.
    #[pyo3(name = "setName")]
    fn set_name(&mut self, name: String) {
        self.inner.set_name(name);
    }

    /// Get pet name.
    #[pyo3(name = "getName")]
    fn get_name(&self) -> String {
        self.inner.name().to_string()
    }

    /// Set the pet's age, or the pet's name when given text.
    fn set(&mut self, value: &PyAny) -> PyResult<()> {
        if let Ok(age) = value.extract::<i32>() {
            self.inner.set_age(age);
            return Ok(());
        }
        if let Ok(name) = value.extract::<String>() {
            self.inner.set_name(name);
            return Ok(());
        }
        Err(BindError::new(ErrorKind::IncompatibleArguments {
            function: "set".to_string(),
            constructor: false,
            signatures: vec![
                "(self: example.Pet, age: int) -> None".to_string(),
                "(self: example.Pet, name: str) -> None".to_string(),
            ],
            invoked_with: value.repr()?.to_string(),
        })
        .into())
    }

    /// Return repr(self).
    fn __repr__(&self) -> String {
        format!(
            "<example.Pet named '{}' owned by '{}'>",
            self.inner.name, self.inner.owner
        )
    }

    /// Owner name.
    #[getter]
    fn owner(&self) -> String {
        self.inner.owner.clone()
    }

    #[setter]
    fn set_owner(&mut self, owner: String) {
        self.inner.owner = owner;
    }

    /// Pet name.
    #[getter]
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    #[setter(name)]
    fn set_name_property(&mut self, name: String) {
        self.inner.set_name(name);
    }

    #[getter]
    fn age(&self) -> Option<i32> {
        self.inner.age
    }

    #[getter]
    fn kind(&self) -> Option<PyKind> {
        self.inner.kind.map(PyKind::from)
    }

    #[classattr]
    #[pyo3(name = "Kind")]
    fn kind_type(py: Python<'_>) -> PyObject {
        py.get_type::<PyKind>().into_py(py)
    }

    #[classattr]
    #[pyo3(name = "Dog")]
    fn dog_kind() -> PyKind {
        PyKind::Dog
    }

    #[classattr]
    #[pyo3(name = "Cat")]
    fn cat_kind() -> PyKind {
        PyKind::Cat
    }
}

#[pyclass(name = "Dog", module = "example", extends = PyPet)]
struct PyDog;

#[pymethods]
impl PyDog {
    #[new]
    fn new(name: String) -> (Self, PyPet) {
        let dog = catalog::Dog::new(name);
        (Self, PyPet { inner: dog.base().clone() })
    }

    /// Bark like a dog.
    fn bark(&self) -> &'static str {
        "woof!"
    }
}

#[pyclass(name = "PolymorphicPet", module = "example", subclass)]
struct PyPolymorphicPet;

#[pyclass(name = "PolymorphicDog", module = "example", extends = PyPolymorphicPet)]
struct PyPolymorphicDog;

#[pymethods]
impl PyPolymorphicDog {
    #[new]
    fn new() -> (Self, PyPolymorphicPet) {
        (Self, PyPolymorphicPet)
    }

    fn bark(&self) -> &'static str {
        PolymorphicDog::new().bark()
    }
}

/// Returns a `Dog` behind its `Pet` base; Python only sees the `Pet` part
#[pyfunction]
fn pet_store() -> PyPet {
    let dog = catalog::Dog::new("Rocky");
    PyPet { inner: dog.base().clone() }
}

/// Returns a `PolymorphicDog` declared as `PolymorphicPet`; Python sees the dog
#[pyfunction]
fn pet_store2(py: Python<'_>) -> PyResult<Py<PyPolymorphicDog>> {
    let init = PyClassInitializer::from(PyPolymorphicPet).add_subclass(PyPolymorphicDog);
    Py::new(py, init)
}

#[pymodule]
fn example(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    crate::logging::init();

    m.add("__doc__", "An example module.")?;
    m.add_function(wrap_pyfunction!(add1, m)?)?;
    m.add_function(wrap_pyfunction!(add2, m)?)?;
    m.add_function(wrap_pyfunction!(add3, m)?)?;
    m.add_function(wrap_pyfunction!(add4, m)?)?;
    m.add_function(wrap_pyfunction!(add5, m)?)?;
    m.add_function(wrap_pyfunction!(add6, m)?)?;

    m.add("the_answer", 42)?;
    m.add("what", "World")?;

    m.add_class::<PyPet>()?;
    m.add_class::<PyDog>()?;
    m.add_function(wrap_pyfunction!(pet_store, m)?)?;

    m.add_class::<PyPolymorphicPet>()?;
    m.add_class::<PyPolymorphicDog>()?;
    m.add_function(wrap_pyfunction!(pet_store2, m)?)?;

    Ok(())
}

#[cfg(all(test, feature = "embed"))]
mod tests {
    use super::*;
    use pyo3::py_run;

    fn with_example(f: impl FnOnce(Python<'_>, &PyModule)) {
        Python::with_gil(|py| {
            let m = PyModule::new(py, "example").unwrap();
            example(py, m).unwrap();
            f(py, m);
        });
    }

    #[test]
    fn test_functions() {
        with_example(|py, example| {
            py_run!(
                py,
                example,
                r#"
assert example.add1(1, 2) == 3
assert example.add2(i=3, j=4) == 7
assert example.add5() == 0
assert example.add6(j=2) == 2
assert example.the_answer == 42
assert example.what == "World"
assert example.__doc__ == "An example module."
try:
    example.add1(i=1, j=2)
    raise AssertionError("positional-only")
except TypeError:
    pass
"#
            );
        });
    }

    #[test]
    fn test_pet_surface() {
        with_example(|py, example| {
            py_run!(
                py,
                example,
                r#"
p = example.Pet("Rocky")
assert p.getName() == "Rocky"
p.setName("Molly")
assert p.name == "Molly"
p.owner = "alice"
assert repr(p) == "<example.Pet named 'Molly' owned by 'alice'>"

p.set(5)
assert p.age == 5
p.set("Rex")
assert p.name == "Rex" and p.age == 5
try:
    p.set(None)
    raise AssertionError("set(None)")
except TypeError:
    pass

try:
    p.age = 3
    raise AssertionError("age is read-only")
except AttributeError:
    pass

p.nickname = "Rocko"
assert p.nickname == "Rocko"
assert "nickname" in p.__dict__
"#
            );
        });
    }

    #[test]
    fn test_constructor_overloads() {
        with_example(|py, example| {
            py_run!(
                py,
                example,
                r#"
Kind = example.Pet.Kind
p = example.Pet("Rocky", Kind.Dog)
assert p.kind == Kind.Dog
assert example.Pet("Molly").kind is None
assert Kind.Dog == 0 and Kind.Cat == 1
assert example.Pet.Dog == Kind.Dog

for args in [("x", None), ("x", 0), (1,), ("x", Kind.Dog, 2)]:
    try:
        example.Pet(*args)
        raise AssertionError(args)
    except TypeError as e:
        assert "incompatible constructor arguments" in str(e)
"#
            );
        });
    }

    #[test]
    fn test_factories_and_inheritance() {
        with_example(|py, example| {
            py_run!(
                py,
                example,
                r#"
d = example.Dog("Rex")
assert d.bark() == "woof!"
assert d.getName() == "Rex"
assert isinstance(d, example.Pet)

p = example.pet_store()
assert type(p) is example.Pet
assert p.getName() == "Rocky"
assert not hasattr(p, "bark")

q = example.pet_store2()
assert type(q) is example.PolymorphicDog
assert isinstance(q, example.PolymorphicPet)
assert q.bark() == "woof!"

try:
    example.PolymorphicPet()
    raise AssertionError("no constructor")
except TypeError:
    pass
"#
            );
        });
    }
}
