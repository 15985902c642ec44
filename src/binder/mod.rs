//! Binder module - implementation method tables and handler construction.
//!
//! An [`Implementation`] pairs a service value with an explicit table of its
//! methods, keyed by operation name. Each entry is built from a typed closure
//! (or a plain method path) and remembers its [`Shape`].
//!
//! During [`Registry::register_contract`](crate::Registry::register_contract)
//! every contract operation is looked up in the table and bound into a
//! [`Handler`]. Whether the handler forwards the request is decided here, once,
//! from the method's shape.
//!
//! # Example
//!
//! ```ignore
//! let exams = Implementation::new(ExamService::default())
//!     .unary("FindExamById", ExamService::find_exam_by_id)
//!     .supplier("FindAllExams", ExamService::find_all_exams);
//!
//! registry.register_contract("Exam", &exam_contract(), &exams)?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::contract::{Operation, Shape};
use crate::error::{BoxError, RegistryError};
use crate::handler::{Context, Handler, HandlerResult, Payload};

type WithRequest<S, R> = Arc<dyn Fn(&S, &Context, Payload) -> Result<R, BoxError> + Send + Sync>;
type WithoutRequest<S, R> = Arc<dyn Fn(&S, &Context) -> Result<R, BoxError> + Send + Sync>;

/// A method of an implementation, erased to payloads but tagged with its shape.
pub enum Method<S> {
    /// Takes a request, returns a response.
    Unary(WithRequest<S, Payload>),
    /// Takes no request, returns a response.
    Supplier(WithoutRequest<S, Payload>),
    /// Takes a request, returns nothing.
    Consumer(WithRequest<S, ()>),
    /// Takes no request, returns nothing.
    Action(WithoutRequest<S, ()>),
}

impl<S> Method<S> {
    /// Shape of this method.
    pub fn shape(&self) -> Shape {
        match self {
            Self::Unary(_) => Shape::Unary,
            Self::Supplier(_) => Shape::Supplier,
            Self::Consumer(_) => Shape::Consumer,
            Self::Action(_) => Shape::Action,
        }
    }
}

impl<S> Clone for Method<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Unary(f) => Self::Unary(Arc::clone(f)),
            Self::Supplier(f) => Self::Supplier(Arc::clone(f)),
            Self::Consumer(f) => Self::Consumer(Arc::clone(f)),
            Self::Action(f) => Self::Action(Arc::clone(f)),
        }
    }
}

impl<S> fmt::Debug for Method<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Method").field(&self.shape()).finish()
    }
}

/// A service value plus the table of methods it exposes.
pub struct Implementation<S> {
    target: Arc<S>,
    methods: HashMap<String, Method<S>>,
}

impl<S: Send + Sync + 'static> Implementation<S> {
    /// Create an empty method table for `target`.
    pub fn new(target: S) -> Self {
        Self::from_arc(Arc::new(target))
    }

    /// Create an empty method table for an already shared `target`.
    pub fn from_arc(target: Arc<S>) -> Self {
        Self {
            target,
            methods: HashMap::new(),
        }
    }

    /// Add a request/response method.
    ///
    /// The request payload is downcast to `Req`; a payload of another type
    /// fails the call with [`PayloadMismatch`](crate::PayloadMismatch).
    pub fn unary<Req, Resp, E, F>(self, name: &str, method: F) -> Self
    where
        Req: Any + Send,
        Resp: Any + Send,
        E: Into<BoxError> + 'static,
        F: Fn(&S, &Context, Req) -> Result<Resp, E> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Method::Unary(Arc::new(move |target: &S, ctx: &Context, req: Payload| -> HandlerResult {
                let req = req.downcast::<Req>()?;
                method(target, ctx, req).map(Payload::new).map_err(Into::into)
            })),
        )
    }

    /// Add a request/response method that works on the raw payload.
    pub fn unary_raw<F>(self, name: &str, method: F) -> Self
    where
        F: Fn(&S, &Context, Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(name, Method::Unary(Arc::new(method)))
    }

    /// Add a method that takes no request.
    pub fn supplier<Resp, E, F>(self, name: &str, method: F) -> Self
    where
        Resp: Any + Send,
        E: Into<BoxError> + 'static,
        F: Fn(&S, &Context) -> Result<Resp, E> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Method::Supplier(Arc::new(move |target: &S, ctx: &Context| -> HandlerResult {
                method(target, ctx).map(Payload::new).map_err(Into::into)
            })),
        )
    }

    /// Add a method that returns no response.
    pub fn consumer<Req, E, F>(self, name: &str, method: F) -> Self
    where
        Req: Any + Send,
        E: Into<BoxError> + 'static,
        F: Fn(&S, &Context, Req) -> Result<(), E> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Method::Consumer(Arc::new(move |target: &S, ctx: &Context, req: Payload| -> Result<(), BoxError> {
                let req = req.downcast::<Req>()?;
                method(target, ctx, req).map_err(Into::into)
            })),
        )
    }

    /// Add a method with neither request nor response.
    pub fn action<E, F>(self, name: &str, method: F) -> Self
    where
        E: Into<BoxError> + 'static,
        F: Fn(&S, &Context) -> Result<(), E> + Send + Sync + 'static,
    {
        self.insert(
            name,
            Method::Action(Arc::new(move |target: &S, ctx: &Context| -> Result<(), BoxError> {
                method(target, ctx).map_err(Into::into)
            })),
        )
    }

    /// Add a prebuilt method. A later entry with the same name replaces the
    /// earlier one.
    pub fn insert(mut self, name: &str, method: Method<S>) -> Self {
        self.methods.insert(name.to_string(), method);
        self
    }
}

impl<S> Implementation<S> {
    /// Look up a method by exact name.
    pub fn method(&self, name: &str) -> Option<&Method<S>> {
        self.methods.get(name)
    }

    /// The shared service value.
    pub fn target(&self) -> &Arc<S> {
        &self.target
    }

    /// Number of methods in the table.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<S> fmt::Debug for Implementation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("Implementation")
            .field("target", &std::any::type_name::<S>())
            .field("methods", &names)
            .finish()
    }
}

/// Bind `method` of `target` into a handler for the operation `op`.
///
/// Fails when the method's shape differs from the one the contract declares.
pub(crate) fn bind<S: Send + Sync + 'static>(
    key: &str,
    op: &Operation,
    target: &Arc<S>,
    method: &Method<S>,
) -> Result<Handler, RegistryError> {
    if method.shape() != op.shape {
        return Err(RegistryError::SignatureMismatch {
            key: key.to_string(),
            expected: op.shape,
            found: method.shape(),
        });
    }

    let target = Arc::clone(target);
    let handler: Handler = match method.clone() {
        Method::Unary(f) => Arc::new(move |ctx: &Context, req: Payload| f(&*target, ctx, req)),
        Method::Supplier(f) => Arc::new(move |ctx: &Context, _req: Payload| f(&*target, ctx)),
        Method::Consumer(f) => Arc::new(move |ctx: &Context, req: Payload| {
            f(&*target, ctx, req).map(|()| Payload::empty())
        }),
        Method::Action(f) => Arc::new(move |ctx: &Context, _req: Payload| {
            f(&*target, ctx).map(|()| Payload::empty())
        }),
    };
    Ok(handler)
}
