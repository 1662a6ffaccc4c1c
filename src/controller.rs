//! Named handlers, addressed as `"controller@action"`.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::router::{Handler, HandlerResult, RouteRequest};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Controller not found")]
    ControllerNotFound,

    #[error("Method not found")]
    MethodNotFound,
}

/// A set of actions sharing one name prefix.
#[derive(Clone, Default)]
pub struct Controller {
    actions: HashMap<String, Handler>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&RouteRequest) -> HandlerResult + Send + Sync + 'static,
    {
        self.actions.insert(name.to_string(), Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.actions.get(name)
    }
}

#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Controller>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: &str, controller: Controller) -> Self {
        self.controllers.insert(name.to_string(), controller);
        self
    }

    /// Look up `"controller@action"`. A reference without `@` names a
    /// controller with an empty action.
    pub fn resolve(&self, reference: &str) -> Result<Handler, ResolveError> {
        let (controller, action) = reference.split_once('@').unwrap_or((reference, ""));

        self.controllers
            .get(controller)
            .ok_or(ResolveError::ControllerNotFound)?
            .get(action)
            .cloned()
            .ok_or(ResolveError::MethodNotFound)
    }
}
