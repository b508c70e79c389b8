use crate::cache::traits::ExistenceFilter;
use crate::config::GuardConfig;
use crate::errors::Result;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

pub type BoxedExistenceFilterFuture =
    Pin<Box<dyn Future<Output = Result<Box<dyn ExistenceFilter>>> + Send>>;
pub type ExistenceFilterConstructor =
    Arc<dyn Fn(GuardConfig) -> BoxedExistenceFilterFuture + Send + Sync>;

static GUARD_FILTER_REGISTRY: Lazy<RwLock<HashMap<String, ExistenceFilterConstructor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub fn register_filter_plugin<S: Into<String>>(name: S, constructor: ExistenceFilterConstructor) {
    GUARD_FILTER_REGISTRY.write().insert(name.into(), constructor);
}

pub fn get_filter_plugin(name: &str) -> Option<ExistenceFilterConstructor> {
    GUARD_FILTER_REGISTRY.read().get(name).cloned()
}

pub fn registered_filter_plugins() -> Vec<String> {
    let mut names: Vec<String> = GUARD_FILTER_REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}

pub fn debug_guard_registry() {
    let registry = GUARD_FILTER_REGISTRY.read();
    if registry.is_empty() {
        tracing::debug!("No Existence Guard plugins registered.");
    } else {
        tracing::debug!("Registered Existence Guard plugins:");
        for key in registry.keys() {
            tracing::debug!(" - {}", key);
        }
    }
}
