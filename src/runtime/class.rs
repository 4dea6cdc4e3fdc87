//! Classes, methods, instances and method invocation.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::{Context, ObjectHandle, Scope};
use crate::ast::Statement;
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::Flow;

/// Name bound to the receiver inside a method body.
pub const SELF_NAME: &str = "self";
/// Constructor protocol method.
pub const INIT_METHOD: &str = "__init__";
/// String-conversion protocol method.
pub const STR_METHOD: &str = "__str__";
/// Addition protocol method.
pub const ADD_METHOD: &str = "__add__";
/// Equality protocol method.
pub const EQ_METHOD: &str = "__eq__";
/// Ordering protocol method.
pub const LT_METHOD: &str = "__lt__";

/// A method descriptor: a name, an ordered parameter list and a body
/// statement. The body is conventionally a `Statement::MethodBody` so that a
/// `return` inside it resolves to the method's result.
#[derive(Debug, Clone)]
pub struct Method {
    name: String,
    params: Vec<String>,
    body: Statement,
}

impl Method {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Statement) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn body(&self) -> &Statement {
        &self.body
    }
}

/// A named class descriptor: an ordered method table and an optional parent.
///
/// Classes live behind `Rc` and are shared by instances and AST nodes for
/// the program's whole run. The table is filled while the class definition
/// is built ([`Class::define_method`] lets a method body reference its own
/// class, as a constructor-calling `__add__` does) and is never mutated
/// once the definition has executed. Methods are keyed by `(name, arity)`
/// and those keys are expected to be distinct within one class; resolution
/// takes the first match walking from the class itself up the parent chain.
#[derive(Debug)]
pub struct Class {
    name: String,
    parent: Option<Rc<Class>>,
    methods: RefCell<Vec<Rc<Method>>>,
}

impl Class {
    pub fn new(name: impl Into<String>, methods: Vec<Method>, parent: Option<Rc<Class>>) -> Self {
        Self {
            name: name.into(),
            parent,
            methods: RefCell::new(methods.into_iter().map(Rc::new).collect()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Class>> {
        self.parent.as_ref()
    }

    /// Appends a method to the table. Definition-phase only.
    pub fn define_method(&self, method: Method) {
        self.methods.borrow_mut().push(Rc::new(method));
    }

    /// Finds the first method named `name` taking exactly `arity`
    /// parameters, walking the parent chain. A name match with a different
    /// parameter count is skipped, so overloads on arity coexist.
    pub fn resolve(&self, name: &str, arity: usize) -> Option<Rc<Method>> {
        let local = self
            .methods
            .borrow()
            .iter()
            .find(|method| method.name() == name && method.arity() == arity)
            .cloned();
        local.or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| parent.resolve(name, arity))
        })
    }

    pub fn has_method(&self, name: &str, arity: usize) -> bool {
        self.resolve(name, arity).is_some()
    }
}

/// A mutable object: a shared class pointer plus a field map.
///
/// Fields live in a `RefCell` because instances are reached through shared
/// handles while their fields mutate. The class pointer always outlives the
/// instance.
pub struct ClassInstance {
    class: Rc<Class>,
    fields: RefCell<HashMap<String, ObjectHandle>>,
}

impl ClassInstance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn fields(&self) -> Ref<'_, HashMap<String, ObjectHandle>> {
        self.fields.borrow()
    }

    pub fn fields_mut(&self) -> RefMut<'_, HashMap<String, ObjectHandle>> {
        self.fields.borrow_mut()
    }

    /// Reads one field, sharing the stored handle.
    pub fn field(&self, name: &str) -> Option<ObjectHandle> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: ObjectHandle) {
        self.fields.borrow_mut().insert(name.into(), value);
    }
}

impl fmt::Debug for ClassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow on purpose: fields may cycle back to this instance.
        write!(f, "ClassInstance({})", self.class.name())
    }
}

/// Invokes `method_name` on `instance` with positional `args`.
///
/// Resolution failure and a non-instance receiver are runtime errors;
/// callers wanting permissive dispatch test `has_method` (or the handle
/// kind) first. The body runs in a fresh flat scope holding `self` and the
/// parameters; there is no lexical capture of the calling scope. A return
/// signal surviving the body becomes the call result here, so it can never
/// leak into the caller's frames.
pub fn call_method(
    instance: &ObjectHandle,
    method_name: &str,
    args: Vec<ObjectHandle>,
    ctx: &mut Context,
) -> Result<ObjectHandle, RuntimeError> {
    let receiver = instance.as_instance().ok_or_else(|| {
        RuntimeError::TypeError(format!(
            "cannot call method '{method_name}' on {}",
            instance.type_name()
        ))
    })?;
    let class = receiver.class();
    let method = class
        .resolve(method_name, args.len())
        .ok_or_else(|| RuntimeError::MethodNotFound {
            class: class.name().to_string(),
            name: method_name.to_string(),
            arity: args.len(),
        })?;
    trace!(
        class = class.name(),
        method = method_name,
        arity = args.len(),
        "dispatching method"
    );

    ctx.enter_call()?;
    let mut scope = Scope::new();
    scope.set(SELF_NAME, instance.clone());
    for (param, arg) in method.params().iter().zip(args) {
        scope.set(param.clone(), arg);
    }
    let result = method.body().execute(&mut scope, ctx);
    ctx.exit_call();

    match result? {
        Flow::Value(value) => Ok(value),
        Flow::Return(value) => Ok(value),
    }
}
