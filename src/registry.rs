//! Chart factory: chart type names mapped to constructors.

use ahash::AHashMap;
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::charts;
use crate::error::{ChartError, Result};
use crate::viz::base::{self, Chart, ChartEnv, ChartHandle};

/// Builds a chart of one type on a container.
pub type Constructor = Rc<dyn Fn(ChartEnv, &str, &Value) -> Result<Box<dyn Chart>>>;

pub struct ChartRegistry {
    env: ChartEnv,
    constructors: RefCell<IndexMap<String, Constructor>>,
    mounted: RefCell<AHashMap<String, Weak<RefCell<Box<dyn Chart>>>>>,
}

impl ChartRegistry {
    /// An empty registry creating charts in `env`.
    pub fn new(env: ChartEnv) -> Self {
        Self {
            env,
            constructors: RefCell::new(IndexMap::new()),
            mounted: RefCell::new(AHashMap::new()),
        }
    }

    /// A registry with every built-in chart type.
    pub fn with_builtin(env: ChartEnv) -> Self {
        let registry = Self::new(env);
        register_builtin_charts(&registry);
        registry
    }

    pub fn env(&self) -> &ChartEnv {
        &self.env
    }

    /// Register `name`, replacing any existing constructor.
    pub fn register<F>(&self, name: &str, constructor: F)
    where
        F: Fn(ChartEnv, &str, &Value) -> Result<Box<dyn Chart>> + 'static,
    {
        let previous = self
            .constructors
            .borrow_mut()
            .insert(name.to_string(), Rc::new(constructor));
        if previous.is_some() {
            warn!("chart type `{name}` re-registered; the previous constructor was replaced");
        }
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.constructors.borrow_mut().shift_remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.borrow().contains_key(name)
    }

    /// Registered type names in registration order.
    pub fn types(&self) -> Vec<String> {
        self.constructors.borrow().keys().cloned().collect()
    }

    /// Create a `chart_type` chart on `container`. A chart already mounted there is replaced
    /// once the new one has been constructed; if construction fails the old chart stays.
    pub fn create(&self, chart_type: &str, container: &str, options: &Value) -> Result<ChartHandle> {
        let constructor = self
            .constructors
            .borrow()
            .get(chart_type)
            .cloned()
            .ok_or_else(|| ChartError::UnknownChartType(chart_type.to_string()))?;
        let chart = constructor(self.env.clone(), container, options)?;
        if self.destroy(container) {
            // the old chart cleared the container's ARIA attributes on its way out
            chart.base().apply_aria();
        }
        let handle = base::mount(chart);
        self.mounted
            .borrow_mut()
            .insert(container.to_string(), Rc::downgrade(&handle));
        debug!("created {chart_type} chart on #{container}");
        Ok(handle)
    }

    /// [`create`](Self::create) followed by `set_data`.
    pub fn create_with_data(
        &self,
        chart_type: &str,
        container: &str,
        options: &Value,
        data: &Value,
    ) -> Result<ChartHandle> {
        let handle = self.create(chart_type, container, options)?;
        handle.borrow_mut().set_data(data)?;
        Ok(handle)
    }

    /// The live chart mounted on `container`.
    pub fn get(&self, container: &str) -> Option<ChartHandle> {
        self.mounted.borrow().get(container).and_then(Weak::upgrade)
    }

    /// Destroy the chart mounted on `container`. Returns whether one was live.
    pub fn destroy(&self, container: &str) -> bool {
        let previous = self.mounted.borrow_mut().remove(container);
        let Some(handle) = previous.and_then(|w| w.upgrade()) else {
            return false;
        };
        match handle.try_borrow_mut() {
            Ok(mut chart) => {
                chart.destroy();
                true
            }
            Err(_) => {
                warn!("chart on #{container} is busy and was not destroyed");
                false
            }
        }
    }

    /// Number of containers holding a live chart.
    pub fn mounted_count(&self) -> usize {
        self.mounted
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .filter(|h| h.try_borrow().map_or(true, |c| !c.base().is_destroyed()))
            .count()
    }
}

/// Register pie, bar, line, heatmap, timeline and flow.
pub fn register_builtin_charts(registry: &ChartRegistry) {
    charts::pie::register(registry);
    charts::bar::register(registry);
    charts::line::register(registry);
    charts::heatmap::register(registry);
    charts::timeline::register(registry);
    charts::flow::register(registry);
}

thread_local! {
    static DEFAULT_REGISTRY: ChartRegistry = ChartRegistry::with_builtin(ChartEnv::default());
}

/// Run `f` with this thread's default registry.
pub fn with_default<R>(f: impl FnOnce(&ChartRegistry) -> R) -> R {
    DEFAULT_REGISTRY.with(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::PieChart;
    use crate::viz::base::ChartState;
    use serde_json::json;

    fn registry() -> ChartRegistry {
        let env = ChartEnv::default();
        env.document.add_container("a", 400.0, 300.0);
        ChartRegistry::with_builtin(env)
    }

    #[test]
    fn builtins_are_registered_in_order() {
        let r = registry();
        assert_eq!(r.types(), ["pie", "bar", "line", "heatmap", "timeline", "flow"]);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let r = registry();
        let err = r.create("sunburst", "a", &json!({})).err().unwrap();
        assert!(matches!(err, ChartError::UnknownChartType(t) if t == "sunburst"));
    }

    #[test]
    fn creating_on_an_occupied_container_destroys_the_old_chart() {
        let r = registry();
        let first = r.create("pie", "a", &json!({})).unwrap();
        let second = r.create("bar", "a", &json!({})).unwrap();
        assert_eq!(first.borrow().state(), ChartState::Destroyed);
        assert_eq!(second.borrow().chart_type(), "bar");
        assert_eq!(r.mounted_count(), 1);
        assert!(Rc::ptr_eq(&r.get("a").unwrap(), &second));
    }

    #[test]
    fn failed_construction_keeps_the_mounted_chart() {
        let r = registry();
        let first = r.create_with_data("pie", "a", &json!({}), &json!({"x": 1})).unwrap();
        assert!(r.create("bar", "missing", &json!({})).is_err());
        r.register("broken", |_, _, _| Err(ChartError::invalid_option("size", "negative")));
        assert!(r.create("broken", "a", &json!({})).is_err());
        assert_eq!(first.borrow().state(), ChartState::Interactive);
        assert!(Rc::ptr_eq(&r.get("a").unwrap(), &first));
        assert_eq!(r.env().document.surface_count("a"), 1);
    }

    #[test]
    fn replacement_keeps_aria_attributes() {
        let r = registry();
        r.create("pie", "a", &json!({})).unwrap();
        let second = r.create("bar", "a", &json!({"title": "IO"})).unwrap();
        let doc = &r.env().document;
        assert_eq!(doc.attr("a", "role").as_deref(), Some("img"));
        assert_eq!(doc.attr("a", "tabindex").as_deref(), Some("0"));
        assert_eq!(doc.attr("a", "aria-label").as_deref(), Some("bar chart: IO"));
        assert!(doc.has_listener("a", "keydown"));
        assert_eq!(second.borrow().state(), ChartState::Validated);
    }

    #[test]
    fn replacing_a_constructor() {
        let r = registry();
        r.register("bar", |env, container, options| Ok(Box::new(PieChart::new(env, container, options)?)));
        let chart = r.create("bar", "a", &json!({})).unwrap();
        assert_eq!(chart.borrow().chart_type(), "pie");
        assert!(chart.borrow().as_any().downcast_ref::<PieChart>().is_some());
        assert!(r.unregister("bar"));
        assert!(!r.contains("bar"));
    }

    #[test]
    fn dropped_handles_unmount() {
        let r = registry();
        let chart = r.create_with_data("pie", "a", &json!({}), &json!({"x": 1})).unwrap();
        assert_eq!(chart.borrow().record_count(), 1);
        drop(chart);
        assert!(r.get("a").is_none());
        assert!(!r.destroy("a"));
    }

    #[test]
    fn default_registry_knows_builtins() {
        assert!(with_default(|r| r.contains("timeline")));
    }
}
