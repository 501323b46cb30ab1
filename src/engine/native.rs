//! Per-node native state stored as the Taffy node context.

use taffy::{AlignContent, AvailableSpace, FlexDirection, Size, Style};

use super::config_store::{ConfigId, ConfigSettings};

/// Measure callback for leaf nodes.
///
/// Receives the already-known dimensions and the available space, returns the
/// intrinsic size of the content.
pub type MeasureFunc = Box<dyn FnMut(Size<Option<f32>>, Size<AvailableSpace>) -> Size<f32>>;

/// Node kind. Text nodes are leaves sized by their measure function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NodeType {
    #[default]
    Default = 0,
    Text = 1,
}

impl From<u8> for NodeType {
    fn from(value: u8) -> Self {
        match value {
            1 => NodeType::Text,
            _ => NodeType::Default,
        }
    }
}

/// Native state attached to every Taffy node the bridge allocates.
pub struct NativeNode {
    pub config: ConfigId,
    pub measure: Option<MeasureFunc>,
    pub node_type: NodeType,
    pub is_reference_baseline: bool,
    pub has_new_layout: bool,
}

impl NativeNode {
    pub fn new(config: ConfigId) -> Self {
        Self {
            config,
            measure: None,
            node_type: NodeType::Default,
            is_reference_baseline: false,
            has_new_layout: true,
        }
    }

    /// Reset everything except the attached config, returning the cleared
    /// measure function.
    pub fn reset(&mut self) -> Option<MeasureFunc> {
        std::mem::replace(self, Self::new(self.config)).measure
    }
}

/// Initial style of a node created under `settings`.
///
/// Web defaults are Taffy's own CSS defaults. The classic defaults lay out in a
/// column, never shrink, and pack wrapped lines at the start.
pub fn default_style(settings: &ConfigSettings) -> Style {
    if settings.use_web_defaults {
        Style::default()
    } else {
        Style {
            flex_direction: FlexDirection::Column,
            flex_shrink: 0.0,
            align_content: Some(AlignContent::FlexStart),
            ..Style::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_defaults() {
        let style = default_style(&ConfigSettings::default());
        assert_eq!(style.flex_direction, FlexDirection::Column);
        assert_eq!(style.flex_shrink, 0.0);
    }

    #[test]
    fn test_web_defaults() {
        let settings = ConfigSettings {
            use_web_defaults: true,
            ..ConfigSettings::default()
        };
        let style = default_style(&settings);
        assert_eq!(style.flex_direction, FlexDirection::Row);
        assert_eq!(style.flex_shrink, 1.0);
    }

    #[test]
    fn test_reset_keeps_config() {
        let mut store = super::super::ConfigStore::new();
        let config = store.allocate(ConfigSettings::default());

        let mut native = NativeNode::new(config);
        native.node_type = NodeType::Text;
        native.is_reference_baseline = true;
        native.measure = Some(Box::new(|_, _| Size::ZERO));

        assert!(native.reset().is_some());
        assert_eq!(native.config, config);
        assert_eq!(native.node_type, NodeType::Default);
        assert!(!native.is_reference_baseline);
        assert!(native.measure.is_none());
    }
}
