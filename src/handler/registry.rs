//! Handler registry for dispatching calls by routing key.
//!
//! The registry maps `Service.Operation` keys to handlers. Writers take the
//! exclusive lock; `call` holds the shared lock only long enough to clone the
//! handler out, so handlers run in parallel and may call back into the
//! registry.
//!
//! # Example
//!
//! ```ignore
//! use irpc::{Context, Payload, Registry, RegistryConfig};
//!
//! let registry = Registry::new(RegistryConfig::DEFAULT);
//! registry.register_contract("Exam", &exam_contract, &exam_impl)?;
//! registry.validate_impl("Exam", &exam_contract)?;
//!
//! let res = registry.call(&Context::background(), "Exam.FindExamById", Payload::new(req))?;
//! ```

use std::any::Any;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Context, Handler, HandlerResult, Payload};
use crate::binder::{bind, Implementation};
use crate::config::RegistryConfig;
use crate::contract::{routing_key, ContractDescriptor, Shape};
use crate::error::{CallError, RegistryError, Result};
use crate::schema::RegistrySchema;

/// Entry for a registered key.
struct Entry {
    /// The handler function.
    handler: Handler,
    /// Shape the handler was bound with (`None` for direct registrations).
    shape: Option<Shape>,
}

/// Registry mapping routing keys to handlers.
pub struct Registry {
    handlers: RwLock<HashMap<String, Entry>>,
    config: RegistryConfig,
}

impl Registry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The configuration this registry was built with.
    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Register a handler closure under `key`.
    ///
    /// Fails with [`RegistryError::DuplicateKey`] if the key is taken and
    /// overriding is disabled; the earlier handler then stays in place.
    pub fn register<F>(&self, key: impl Into<String>, handler: F) -> Result<()>
    where
        F: Fn(&Context, Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(key, Arc::new(handler))
    }

    /// Register an already built handler under `key`.
    pub fn register_handler(&self, key: impl Into<String>, handler: Handler) -> Result<()> {
        let key = key.into();
        let mut handlers = self.handlers.write();
        self.store(&mut handlers, key, Entry { handler, shape: None })
    }

    /// Insert `handler` under `key` unconditionally, ignoring the override
    /// policy. Returns the handler previously stored there.
    pub fn insert(&self, key: impl Into<String>, handler: Handler) -> Option<Handler> {
        let key = key.into();
        tracing::debug!("Inserted handler {}", key);
        self.handlers
            .write()
            .insert(key, Entry { handler, shape: None })
            .map(|old| old.handler)
    }

    /// Bind every operation of `contract` to `implementation` and register the
    /// handlers under `service.Operation`.
    ///
    /// Operations are processed in declared order. On failure, operations
    /// already registered by this call stay registered.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::MissingMethod`] - an operation has no method and
    ///   partial registration is disabled
    /// - [`RegistryError::DuplicateKey`] - a key is taken and overriding is
    ///   disabled
    /// - [`RegistryError::SignatureMismatch`] - the method's shape differs from
    ///   the operation's
    pub fn register_contract<S: Send + Sync + 'static>(
        &self,
        service: &str,
        contract: &ContractDescriptor,
        implementation: &Implementation<S>,
    ) -> Result<()> {
        let mut handlers = self.handlers.write();
        let stored = self.bind_contract(&mut handlers, service, contract, implementation)?;

        tracing::debug!(
            "Registered contract {:?} as {} ({} of {} operations)",
            contract.name(),
            service,
            stored,
            contract.len()
        );
        Ok(())
    }

    /// Bind and store each operation in declared order. Returns how many were
    /// stored; skipped operations are not counted.
    fn bind_contract<S: Send + Sync + 'static>(
        &self,
        handlers: &mut HashMap<String, Entry>,
        service: &str,
        contract: &ContractDescriptor,
        implementation: &Implementation<S>,
    ) -> Result<usize> {
        let mut stored = 0;

        for op in contract.operations() {
            let Some(method) = implementation.method(&op.name) else {
                if self.config.allow_partial {
                    tracing::debug!("Skipping {}.{}: not implemented", service, op.name);
                    continue;
                }
                return Err(RegistryError::MissingMethod {
                    service: service.to_string(),
                    operation: op.name.clone(),
                });
            };

            let key = routing_key(service, &op.name);
            self.check_vacant(handlers, &key)?;

            let handler = bind(&key, op, implementation.target(), method)?;
            let entry = Entry {
                handler,
                shape: Some(op.shape),
            };

            // Vacant, or overriding is allowed: checked above under this guard
            match handlers.entry(key) {
                MapEntry::Vacant(slot) => {
                    tracing::debug!("Registered handler {}", slot.key());
                    slot.insert(entry);
                }
                MapEntry::Occupied(mut slot) => {
                    tracing::debug!("Overriding handler {}", slot.key());
                    slot.insert(entry);
                }
            }
            stored += 1;
        }

        Ok(stored)
    }

    /// Check that every operation of `contract` has a handler under `service`.
    ///
    /// Fails with [`RegistryError::MissingHandler`] naming the first missing
    /// key, in declared order.
    pub fn validate_impl(&self, service: &str, contract: &ContractDescriptor) -> Result<()> {
        let handlers = self.handlers.read();

        for op in contract.operations() {
            let key = routing_key(service, &op.name);
            if !handlers.contains_key(&key) {
                return Err(RegistryError::MissingHandler(key));
            }
        }
        Ok(())
    }

    /// Dispatch a call to the handler registered under `key`.
    ///
    /// The handler runs outside the registry lock. Its result is returned
    /// unchanged; a handler error comes back as [`CallError::Handler`].
    pub fn call(
        &self,
        ctx: &Context,
        key: &str,
        request: Payload,
    ) -> std::result::Result<Payload, CallError> {
        let handler = self.get_handler(key).ok_or_else(|| {
            tracing::debug!("Handler not found: {}", key);
            CallError::HandlerNotFound(key.to_string())
        })?;

        tracing::trace!("Dispatching {}", key);
        handler(ctx, request).map_err(CallError::Handler)
    }

    /// Call with a typed request and downcast the response to `Resp`.
    pub fn invoke<Resp: Any>(
        &self,
        ctx: &Context,
        key: &str,
        request: impl Any + Send,
    ) -> std::result::Result<Resp, CallError> {
        self.call(ctx, key, Payload::new(request))?
            .downcast::<Resp>()
            .map_err(CallError::Response)
    }

    /// Get the handler registered under `key`.
    pub fn get_handler(&self, key: &str) -> Option<Handler> {
        self.handlers.read().get(key).map(|e| Arc::clone(&e.handler))
    }

    /// Whether a handler is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.handlers.read().contains_key(key)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.handlers.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Snapshot of every registered key and the shape it was bound with.
    pub fn schema(&self) -> RegistrySchema {
        let handlers = self.handlers.read();
        let mut schema = RegistrySchema::new();
        for (key, entry) in handlers.iter() {
            schema.add(key, entry.shape);
        }
        schema
    }

    fn check_vacant(&self, handlers: &HashMap<String, Entry>, key: &str) -> Result<()> {
        if !self.config.allow_override && handlers.contains_key(key) {
            return Err(RegistryError::DuplicateKey(key.to_string()));
        }
        Ok(())
    }

    fn store(&self, handlers: &mut HashMap<String, Entry>, key: String, entry: Entry) -> Result<()> {
        match handlers.entry(key) {
            MapEntry::Vacant(slot) => {
                tracing::debug!("Registered handler {}", slot.key());
                slot.insert(entry);
            }
            MapEntry::Occupied(mut slot) => {
                if !self.config.allow_override {
                    return Err(RegistryError::DuplicateKey(slot.key().clone()));
                }
                tracing::debug!("Overriding handler {}", slot.key());
                slot.insert(entry);
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::DEFAULT)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;

    fn constant(
        value: &'static str,
    ) -> impl Fn(&Context, Payload) -> HandlerResult + Send + Sync + 'static {
        move |_ctx, _req| Ok(Payload::new(value))
    }

    fn call_str(registry: &Registry, key: &str) -> &'static str {
        registry
            .invoke::<&'static str>(&Context::background(), key, ())
            .unwrap()
    }

    #[test]
    fn test_register_and_call() {
        let registry = Registry::default();
        registry.register("Svc.Ping", constant("pong")).unwrap();

        assert!(registry.contains("Svc.Ping"));
        assert_eq!(registry.len(), 1);
        assert_eq!(call_str(&registry, "Svc.Ping"), "pong");
    }

    #[test]
    fn test_handler_not_found() {
        let registry = Registry::default();

        let err = registry
            .call(&Context::background(), "Svc.Missing", Payload::empty())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "handler not found: Svc.Missing");
        assert!(registry.get_handler("Svc.Missing").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_register_is_rejected() {
        let registry = Registry::default();
        registry.register("Svc.Ping", constant("first")).unwrap();

        let err = registry.register("Svc.Ping", constant("second")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey(ref k) if k == "Svc.Ping"));
        assert_eq!(call_str(&registry, "Svc.Ping"), "first");
    }

    #[test]
    fn test_override_replaces_handler() {
        let registry = Registry::new(RegistryConfig::DEFAULT.with_override(true));
        registry.register("Svc.Ping", constant("first")).unwrap();
        registry.register("Svc.Ping", constant("second")).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(call_str(&registry, "Svc.Ping"), "second");
    }

    #[test]
    fn test_insert_ignores_policy() {
        let registry = Registry::default();
        assert!(registry.insert("Svc.Ping", Arc::new(constant("first"))).is_none());

        let previous = registry.insert("Svc.Ping", Arc::new(constant("second")));
        assert!(previous.is_some());
        assert_eq!(call_str(&registry, "Svc.Ping"), "second");
    }

    #[test]
    fn test_handler_error_passes_through() {
        #[derive(Debug, thiserror::Error)]
        #[error("exam {0} not found")]
        struct NotFound(String);

        let registry = Registry::default();
        registry
            .register("Exam.FindExamById", |_ctx, _req| {
                Err(Box::new(NotFound("EX-9".into())) as BoxError)
            })
            .unwrap();

        let err = registry
            .call(&Context::background(), "Exam.FindExamById", Payload::empty())
            .unwrap_err();
        assert_eq!(err.to_string(), "exam EX-9 not found");
        assert_eq!(err.downcast_handler_ref::<NotFound>().unwrap().0, "EX-9");
    }

    #[test]
    fn test_invoke_wrong_response_type() {
        let registry = Registry::default();
        registry.register("Svc.Ping", constant("pong")).unwrap();

        let err = registry
            .invoke::<u64>(&Context::background(), "Svc.Ping", ())
            .unwrap_err();
        match err {
            CallError::Response(mismatch) => {
                assert_eq!(mismatch.expected, "u64");
                assert_eq!(mismatch.found, "&str");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_keys_sorted() {
        let registry = Registry::default();
        registry.register("B.Two", constant("2")).unwrap();
        registry.register("A.One", constant("1")).unwrap();

        assert_eq!(registry.keys(), ["A.One", "B.Two"]);
    }

    #[test]
    fn test_context_reaches_handler() {
        let registry = Registry::default();
        registry
            .register("Svc.Tenant", |ctx, _req| {
                let tenant = ctx.value::<String>().cloned().unwrap_or_default();
                Ok(Payload::new(tenant))
            })
            .unwrap();

        let ctx = Context::background().with_value("acme".to_string());
        let tenant: String = registry.invoke(&ctx, "Svc.Tenant", ()).unwrap();
        assert_eq!(tenant, "acme");
    }

    struct Echo;

    fn echo_impl() -> Implementation<Echo> {
        Implementation::new(Echo)
            .unary_raw("A", |_svc: &Echo, _ctx: &Context, req: Payload| Ok(req))
            .unary_raw("C", |_svc: &Echo, _ctx: &Context, req: Payload| Ok(req))
    }

    #[test]
    fn test_bind_contract_counts_stored_operations() {
        let contract = ContractDescriptor::new("Echo").unary("A").unary("B").unary("C");
        let registry = Registry::new(RegistryConfig::DEFAULT.with_partial(true));

        let stored = {
            let mut handlers = registry.handlers.write();
            registry
                .bind_contract(&mut handlers, "Svc", &contract, &echo_impl())
                .unwrap()
        };
        assert_eq!(stored, 2);
        assert_eq!(registry.keys(), ["Svc.A", "Svc.C"]);
    }

    #[test]
    fn test_bind_contract_overrides_once_checked() {
        let contract = ContractDescriptor::new("Echo").unary("A").unary("C");
        let registry = Registry::new(RegistryConfig::DEFAULT.with_override(true));
        registry.register("Svc.A", constant("old")).unwrap();

        let stored = {
            let mut handlers = registry.handlers.write();
            registry
                .bind_contract(&mut handlers, "Svc", &contract, &echo_impl())
                .unwrap()
        };
        assert_eq!(stored, 2);
        assert_eq!(registry.schema().get("Svc.A").unwrap().shape, Some(Shape::Unary));

        let echoed: u32 = registry.invoke(&Context::background(), "Svc.A", 7u32).unwrap();
        assert_eq!(echoed, 7);
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
