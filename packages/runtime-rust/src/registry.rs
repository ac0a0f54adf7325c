//! Binding table mapping operation names to operations and their
//! interceptor chains.

use std::sync::Arc;

use dashmap::DashMap;
use hookline_core::{Args, Identified};

use crate::config::HookConfig;
use crate::engine::{self, Plan};
use crate::error::{ContractViolation, HookError};
use crate::interceptor::Interceptor;
use crate::operation::{Operation, OperationBinding};

// ---------------------------------------------------------------------------
// HookRegistry
// ---------------------------------------------------------------------------

/// Binding table for one target type: operation name -> operation + chain.
///
/// Registration methods take `&self` and return `&Self` so calls can be
/// chained. Invocations snapshot the binding they run, so the table can be
/// modified (even from inside an interceptor) without disturbing calls
/// already in flight.
pub struct HookRegistry<T> {
    bindings: DashMap<String, OperationBinding<T>>,
    config: HookConfig,
}

impl<T> HookRegistry<T> {
    /// Creates an empty registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HookConfig::default())
    }

    #[must_use]
    pub fn with_config(config: HookConfig) -> Self {
        Self {
            bindings: DashMap::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    /// Binds `operation` under `name`. An existing chain for the name is
    /// kept; the operation (and its error handler) is replaced.
    pub fn install(&self, name: &str, operation: Operation<T>) -> &Self {
        let mut binding = self
            .bindings
            .entry(name.to_string())
            .or_insert_with(|| OperationBinding::pending(name));
        binding.bind(operation);
        tracing::debug!(operation = name, "operation installed");
        self
    }

    /// Installs several operations at once.
    pub fn install_many<I, S>(&self, operations: I) -> &Self
    where
        I: IntoIterator<Item = (S, Operation<T>)>,
        S: AsRef<str>,
    {
        for (name, operation) in operations {
            self.install(name.as_ref(), operation);
        }
        self
    }

    /// Appends a before-interceptor. Works before `install`; the binding is
    /// created on demand and picks up the operation when it is installed.
    pub fn add_before(&self, name: &str, interceptor: Interceptor<T>) -> &Self {
        self.binding_mut(name, |binding| binding.chain_mut().push_before(interceptor));
        self
    }

    /// Appends an after-interceptor.
    ///
    /// # Errors
    ///
    /// Returns `HookError::Contract` if `interceptor` is asynchronous; the
    /// after-chain has no completion barrier.
    pub fn add_after(&self, name: &str, interceptor: Interceptor<T>) -> Result<&Self, HookError> {
        if interceptor.is_async() {
            return Err(HookError::Contract {
                operation: name.to_string(),
                violation: ContractViolation::AsyncAfterInterceptor,
            });
        }
        self.binding_mut(name, |binding| binding.chain_mut().push_after(interceptor));
        Ok(self)
    }

    /// Removes `interceptor` from the before-chain, or clears the whole
    /// before-chain when `None`.
    pub fn remove_before(&self, name: &str, interceptor: Option<&Interceptor<T>>) -> &Self {
        if let Some(mut binding) = self.bindings.get_mut(name) {
            binding.chain_mut().remove_before(interceptor.map(Identified::id));
        }
        self
    }

    /// Removes `interceptor` from the after-chain, or clears the whole
    /// after-chain when `None`.
    pub fn remove_after(&self, name: &str, interceptor: Option<&Interceptor<T>>) -> &Self {
        if let Some(mut binding) = self.bindings.get_mut(name) {
            binding.chain_mut().remove_after(interceptor.map(Identified::id));
        }
        self
    }

    /// Whether an operation function is bound under `name`.
    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        self.bindings
            .get(name)
            .is_some_and(|binding| binding.operation().is_some())
    }

    #[must_use]
    pub fn before_len(&self, name: &str) -> usize {
        self.bindings
            .get(name)
            .map_or(0, |binding| binding.chain().before().len())
    }

    #[must_use]
    pub fn after_len(&self, name: &str) -> usize {
        self.bindings
            .get(name)
            .map_or(0, |binding| binding.chain().after().len())
    }

    /// Calls the operation bound under `name` on `target`, running the
    /// before-chain, the operation, and the after-chain.
    ///
    /// A trailing `Value::Callback` in `args` is taken out of the argument
    /// vector and receives the outcome. Returns as soon as no more work can
    /// run synchronously; an invocation waiting on an asynchronous
    /// interceptor continues when that interceptor calls `done`.
    ///
    /// # Errors
    ///
    /// - `NotInstalled` if no operation is bound under `name`
    /// - `Contract` if an interceptor misused its continuations
    /// - `Unhandled` under [`UnhandledPolicy::Surface`](crate::config::UnhandledPolicy)
    ///   when a chain error had nowhere else to go
    pub fn invoke(&self, target: &Arc<T>, name: &str, args: impl Into<Args>) -> Result<(), HookError> {
        let plan = self.snapshot(name)?;
        engine::start(Arc::clone(target), name, plan, &self.config, args.into())
    }

    fn snapshot(&self, name: &str) -> Result<Plan<T>, HookError> {
        let binding = self.bindings.get(name);
        let Some(operation) = binding.as_ref().and_then(|b| b.operation()) else {
            return Err(HookError::NotInstalled {
                operation: name.to_string(),
            });
        };
        let chain = binding.as_ref().map(|b| b.chain());
        Ok(Plan {
            operation: operation.clone(),
            before: chain.map(|c| c.before().to_vec()).unwrap_or_default(),
            after: chain.map(|c| c.after().to_vec()).unwrap_or_default(),
        })
    }

    fn binding_mut(&self, name: &str, f: impl FnOnce(&mut OperationBinding<T>)) {
        let mut binding = self
            .bindings
            .entry(name.to_string())
            .or_insert_with(|| OperationBinding::pending(name));
        f(&mut binding);
    }
}

impl<T> Default for HookRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
