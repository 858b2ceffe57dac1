use parking_lot::RwLock;

/// A single persisted value with its default.
///
/// Reads are deliberately lock-cheap (`parking_lot::RwLock` around a plain
/// scalar); the renderer reads these every frame and tolerates one frame of
/// staleness. Durable writes go through `ConfigStore::save`, not here.
///
/// The default is mutable because peak-luminance auto-detection promotes the
/// detected value to the new default at runtime.
#[derive(Debug)]
pub struct Setting<T: Copy + PartialEq> {
    name: &'static str,
    value: RwLock<T>,
    default: RwLock<T>,
}

impl<T: Copy + PartialEq> Setting<T> {
    pub fn new(name: &'static str, default: T) -> Self {
        Self {
            name,
            value: RwLock::new(default),
            default: RwLock::new(default),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> T {
        *self.value.read()
    }

    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }

    pub fn default_value(&self) -> T {
        *self.default.read()
    }

    pub fn set_default(&self, value: T) {
        *self.default.write() = value;
    }

    pub fn is_default(&self) -> bool {
        *self.value.read() == *self.default.read()
    }

    pub fn reset(&self) {
        let default = *self.default.read();
        *self.value.write() = default;
    }
}

/// An ordered list of strings with a fixed default.
///
/// Insertion order is preserved on load and save; uniqueness is not
/// enforced. Used for the render-target upgrade lists.
#[derive(Debug)]
pub struct ListSetting {
    name: &'static str,
    values: RwLock<Vec<String>>,
    default: Vec<String>,
}

impl ListSetting {
    pub fn new(name: &'static str, default: &[&str]) -> Self {
        let default: Vec<String> = default.iter().map(|s| s.to_string()).collect();
        Self {
            name,
            values: RwLock::new(default.clone()),
            default,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self) -> Vec<String> {
        self.values.read().clone()
    }

    pub fn set(&self, values: Vec<String>) {
        *self.values.write() = values;
    }

    pub fn default_values(&self) -> &[String] {
        &self.default
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.read().iter().any(|v| v == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tracking_follows_both_sides() {
        let setting = Setting::new("Saturation", 50i32);
        assert!(setting.is_default());

        setting.set(80);
        assert!(!setting.is_default());
        assert_eq!(setting.default_value(), 50);

        // Moving the default onto the current value makes it default again,
        // the way peak-luminance auto-detection does.
        setting.set_default(80);
        assert!(setting.is_default());

        setting.reset();
        assert_eq!(setting.get(), 80);
    }

    #[test]
    fn list_setting_preserves_order_and_duplicates() {
        let list = ListSetting::new("Targets", &["SceneColor", "BloomChain"]);
        list.set(vec![
            "BloomChain".into(),
            "SceneColor".into(),
            "SceneColor".into(),
        ]);
        assert_eq!(list.get(), vec!["BloomChain", "SceneColor", "SceneColor"]);
        assert!(list.contains("SceneColor"));
        assert_eq!(list.default_values().len(), 2);
    }
}
