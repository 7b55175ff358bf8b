//! The component catalog.

use super::component::{ComponentSpec, MetadataSource};
use super::error::CatalogError;
use crate::graph;
use std::collections::{HashMap, HashSet};

/// Read-only view of installed components in canonical dependency order.
#[derive(Debug, Clone)]
pub struct ComponentCatalog {
    /// Components, dependencies first.
    components: Vec<ComponentSpec>,
    /// Component name -> position in `components`.
    index: HashMap<String, usize>,
}

impl ComponentCatalog {
    /// Load and order the components supplied by `source`.
    ///
    /// Fails on duplicate names, dependencies on unknown components, and
    /// dependency cycles.
    pub fn load(source: &dyn MetadataSource) -> Result<Self, CatalogError> {
        Self::from_components(source.components()?)
    }

    /// Build a catalog from already-read component specs.
    pub fn from_components(components: Vec<ComponentSpec>) -> Result<Self, CatalogError> {
        let mut by_name: HashMap<String, ComponentSpec> = HashMap::with_capacity(components.len());
        let mut declared = Vec::with_capacity(components.len());

        for spec in components {
            if by_name.contains_key(&spec.name) {
                return Err(CatalogError::DuplicateComponent(spec.name));
            }
            declared.push(spec.name.clone());
            by_name.insert(spec.name.clone(), spec);
        }

        for name in &declared {
            for dep in &by_name[name].dependencies {
                if !by_name.contains_key(dep) {
                    return Err(CatalogError::UnknownDependency {
                        component: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let order = graph::topological_order(&declared, |name| {
            by_name[name].dependencies.clone()
        })?;
        tracing::debug!(order = ?order, "resolved component order");

        let mut components = Vec::with_capacity(order.len());
        let mut index = HashMap::with_capacity(order.len());
        for name in order {
            if let Some(spec) = by_name.remove(&name) {
                index.insert(name, components.len());
                components.push(spec);
            }
        }

        Ok(Self { components, index })
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// All components, dependencies first.
    pub fn all_components(&self) -> &[ComponentSpec] {
        &self.components
    }

    /// Look up a component.
    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.index.get(name).map(|&idx| &self.components[idx])
    }

    /// Look up a component, failing if it is unknown.
    pub fn component(&self, name: &str) -> Result<&ComponentSpec, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownComponent(name.to_string()))
    }

    /// Direct dependencies of a component, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<&ComponentSpec>, CatalogError> {
        let spec = self.component(name)?;
        spec.dependencies.iter().map(|d| self.component(d)).collect()
    }

    /// Components that directly depend on `name`, in dependency order.
    pub fn dependents_of(&self, name: &str) -> Result<Vec<&ComponentSpec>, CatalogError> {
        self.component(name)?;
        Ok(self
            .components
            .iter()
            .filter(|c| c.dependencies.iter().any(|d| d == name))
            .collect())
    }

    /// `root` and everything it transitively depends on, dependencies first.
    ///
    /// The root is always last.
    pub fn transitive_dependencies(&self, root: &str) -> Result<Vec<&ComponentSpec>, CatalogError> {
        self.component(root)?;

        let mut closure: HashSet<&str> = HashSet::new();
        let mut stack = vec![root];
        while let Some(name) = stack.pop() {
            if !closure.insert(name) {
                continue;
            }
            for dep in &self.component(name)?.dependencies {
                stack.push(dep.as_str());
            }
        }

        Ok(self
            .components
            .iter()
            .filter(|c| closure.contains(c.name.as_str()))
            .collect())
    }

    /// Names of all components in canonical order.
    pub fn dependency_order(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    /// Canonical order restricted to `root`'s transitive closure.
    pub fn dependency_order_for(&self, root: &str) -> Result<Vec<&str>, CatalogError> {
        Ok(self
            .transitive_dependencies(root)?
            .into_iter()
            .map(|c| c.name.as_str())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;

    fn component(name: &str, deps: &[&str]) -> ComponentSpec {
        deps.iter().fold(ComponentSpec::parse(name, "0.1").unwrap(), |spec, d| {
            spec.with_dependency(*d)
        })
    }

    fn sample() -> ComponentCatalog {
        ComponentCatalog::load(&vec![
            component("web", &["blog", "auth"]),
            component("blog", &["auth", "core"]),
            component("auth", &["core"]),
            component("core", &[]),
            component("search", &["core"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let catalog = sample();
        let order = catalog.dependency_order();

        for spec in catalog.all_components() {
            let pos = order.iter().position(|n| *n == spec.name).unwrap();
            for dep in &spec.dependencies {
                let dep_pos = order.iter().position(|n| n == dep).unwrap();
                assert!(dep_pos < pos, "{} must precede {}", dep, spec.name);
            }
        }
        assert_eq!(order, vec!["core", "auth", "blog", "web", "search"]);
    }

    #[test]
    fn test_lookup() {
        let catalog = sample();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.component("blog").unwrap().name, "blog");
        assert!(matches!(
            catalog.component("ghost"),
            Err(CatalogError::UnknownComponent(_))
        ));

        let deps: Vec<&str> = catalog
            .dependencies_of("blog")
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(deps, vec!["auth", "core"]);

        let dependents: Vec<&str> = catalog
            .dependents_of("core")
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(dependents, vec!["auth", "blog", "search"]);
    }

    #[test]
    fn test_transitive_closure() {
        let catalog = sample();
        assert_eq!(
            catalog.dependency_order_for("blog").unwrap(),
            vec!["core", "auth", "blog"]
        );
        assert_eq!(catalog.dependency_order_for("core").unwrap(), vec!["core"]);
        assert_eq!(
            catalog.dependency_order_for("web").unwrap().last(),
            Some(&"web")
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let err = ComponentCatalog::load(&vec![component("a", &["b"]), component("b", &["a"])])
            .unwrap_err();
        assert!(err.is_cycle());
        match err {
            CatalogError::Graph(GraphError::CycleDetected { nodes }) => {
                assert_eq!(nodes, vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let err = ComponentCatalog::load(&vec![component("blog", &["auth"])]).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownDependency { ref component, ref dependency }
                if component == "blog" && dependency == "auth"
        ));
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let err = ComponentCatalog::load(&vec![component("blog", &[]), component("blog", &[])])
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateComponent(name) if name == "blog"));
    }
}
