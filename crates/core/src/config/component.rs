use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ConfigError;

/// Settings one plugin exposes to the rest of the framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    pub name: String,
    pub description: String,
    /// Disabled components are not loaded.
    pub disabled: bool,
    pub version: String,
    pub source: String,
    pub configs: Value,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            disabled: false,
            version: String::new(),
            source: String::new(),
            configs: Value::Object(serde_json::Map::new()),
        }
    }
}

impl ComponentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// One entry of `configs`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.configs.get(key)
    }
}

/// Lets plugins look up (and adjust) each other's configuration.
///
/// Entries keep the order they were registered in.
#[derive(Debug, Default)]
pub struct ConfigMediator {
    components: RwLock<Vec<ComponentConfig>>,
}

impl ConfigMediator {
    pub fn new(components: Vec<ComponentConfig>) -> Self {
        Self {
            components: RwLock::new(components),
        }
    }

    pub fn query(&self, name: &str) -> Option<ComponentConfig> {
        self.components
            .read()
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    pub fn all(&self) -> Vec<ComponentConfig> {
        self.components.read().clone()
    }

    /// Insert or replace a component's entry.
    pub fn upsert(&self, config: ComponentConfig) {
        let mut components = self.components.write();
        match components.iter_mut().find(|c| c.name == config.name) {
            Some(existing) => *existing = config,
            None => components.push(config),
        }
    }

    /// Replace one key inside an existing component's `configs`.
    pub fn update_value(&self, name: &str, key: &str, value: Value) -> Result<(), ConfigError> {
        let mut components = self.components.write();
        let component = components
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ConfigError::UnknownComponent(name.to_string()))?;

        match component.configs.as_object_mut() {
            Some(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            None => Err(ConfigError::Invalid(format!(
                "Configs of component '{}' must be a table",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_and_upsert() {
        let mediator = ConfigMediator::new(vec![ComponentConfig::new("a"), ComponentConfig::new("b")]);
        assert!(mediator.query("a").is_some());
        assert!(mediator.query("c").is_none());

        let mut replaced = ComponentConfig::new("a");
        replaced.disabled = true;
        mediator.upsert(replaced);
        mediator.upsert(ComponentConfig::new("c"));

        let names: Vec<String> = mediator.all().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(mediator.query("a").unwrap().disabled);
    }

    #[test]
    fn test_update_value() {
        let mediator = ConfigMediator::new(vec![ComponentConfig::new("greeter")]);
        mediator.update_value("greeter", "message", json!("hi")).unwrap();
        assert_eq!(mediator.query("greeter").unwrap().get("message"), Some(&json!("hi")));

        assert!(matches!(
            mediator.update_value("missing", "k", json!(1)),
            Err(ConfigError::UnknownComponent(_))
        ));
    }
}
