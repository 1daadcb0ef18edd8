use std::collections::HashMap;
use std::sync::Arc;

use tabflow_core::{Error, Result, WorkflowBackend};
use tracing::info;

use crate::{
    InstanceState, Lifecycle, ModelDescriptor, ModelState, OutputAllocator, Request,
    RequestOutcome,
};

/// What the host hands over when a model instance is initialized.
#[derive(Clone, Debug)]
pub struct InstanceDescriptor {
    pub name: String,
    pub model: String,
    pub device_id: i32,
}

/// Process-wide table of loaded workflows and bound instances. This is the
/// surface the host ABI glue calls into: lifecycle, model and instance
/// init/finalize, and the hot-path execute.
pub struct BackendState<B: WorkflowBackend> {
    backend: B,
    lifecycle: Lifecycle,
    models: HashMap<String, Arc<ModelState>>,
    instances: HashMap<String, InstanceState>,
}

impl<B: WorkflowBackend> BackendState<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            lifecycle: Lifecycle::default(),
            models: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Bring up the foreign runtime exactly once. Idempotent; failure is
    /// fatal to backend load and reported up, not retried.
    pub fn initialize(&mut self) -> Result<()> {
        let backend = &self.backend;
        self.lifecycle.start(|| {
            info!(backend = backend.name(), "initializing runtime");
            backend.initialize()
        })
    }

    /// Tear the foreign runtime down exactly once. Loaded state is dropped
    /// first so workflow teardown happens while the runtime is still up.
    pub fn finalize(&mut self) -> Result<()> {
        self.instances.clear();
        self.models.clear();
        let backend = &self.backend;
        self.lifecycle.stop(|| {
            info!(backend = backend.name(), "finalizing runtime");
            backend.finalize()
        })
    }

    pub fn model_init(&mut self, descriptor: &ModelDescriptor) -> Result<()> {
        self.ensure_running()?;
        let model = ModelState::load(&self.backend, descriptor)?;
        self.models
            .insert(descriptor.name.clone(), Arc::new(model));
        Ok(())
    }

    pub fn model_finalize(&mut self, name: &str) -> Result<()> {
        info!(model = name, "finalizing model");
        self.models.remove(name);
        Ok(())
    }

    pub fn instance_init(&mut self, descriptor: &InstanceDescriptor) -> Result<()> {
        self.ensure_running()?;
        let model = self.models.get(&descriptor.model).ok_or_else(|| {
            Error::InvalidArgument(format!("model '{}' is not loaded", descriptor.model))
        })?;
        info!(
            instance = %descriptor.name,
            model = %descriptor.model,
            device_id = descriptor.device_id,
            "binding instance"
        );
        let instance =
            InstanceState::bind(&descriptor.name, descriptor.device_id, Arc::clone(model));
        self.instances.insert(descriptor.name.clone(), instance);
        Ok(())
    }

    pub fn instance_finalize(&mut self, name: &str) -> Result<()> {
        info!(instance = name, "finalizing instance");
        self.instances.remove(name);
        Ok(())
    }

    /// Hot path: one outcome per request, never fewer, never more. Errors
    /// here mean the instance itself is unusable; per-request faults come
    /// back inside the outcome vector.
    pub fn execute<A: OutputAllocator>(
        &self,
        instance: &str,
        requests: &[Request],
        allocator: &mut A,
    ) -> Result<Vec<RequestOutcome>> {
        self.ensure_running()?;
        let instance = self.instances.get(instance).ok_or_else(|| {
            Error::InvalidArgument(format!("instance '{instance}' is not bound"))
        })?;
        Ok(instance.execute_batch(requests, allocator))
    }

    pub fn model(&self, name: &str) -> Option<&Arc<ModelState>> {
        self.models.get(name)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.lifecycle.is_running() {
            Ok(())
        } else {
            Err(Error::Init("runtime is not initialized".into()))
        }
    }
}
