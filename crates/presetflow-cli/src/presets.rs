use anyhow::{bail, Result};
use tracing::debug;

use presetflow_core::Preset;

/// Names of the presets compiled into this binary.
pub const BUILTIN_PRESETS: &[&str] = &[presetflow_preset_node::PRESET_NAME];

/// Loads a compiled-in preset by name.
pub fn load(name: &str) -> Result<Preset> {
    debug!("loading preset: {}", name);
    match name {
        presetflow_preset_node::PRESET_NAME => Ok(presetflow_preset_node::preset()),
        other => bail!(
            "unknown preset '{}' (available: {})",
            other,
            BUILTIN_PRESETS.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_node_preset() {
        let preset = load("node").expect("node preset should load");
        assert!(preset.find_action("build").is_some());
    }

    #[test]
    fn rejects_unknown_preset() {
        let err = load("python").expect_err("must fail");
        assert!(err.to_string().contains("unknown preset 'python'"));
    }
}
