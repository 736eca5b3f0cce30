//! Build target selection.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// Boards whose MCU is shared by several board families, with the variant
/// label used to pick the right pin table.
const DEFAULT_VARIANTS: &[(&str, &str)] = &[("K64F", "FRDM")];

/// The active build target and optional board variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelector {
    /// mbed target name, e.g. `K64F` or `NUCLEO_F401RE`.
    pub target: String,
    /// Explicit board variant label. When unset, a default is derived.
    #[serde(default)]
    pub variant: Option<String>,
}

impl TargetSelector {
    /// Selector with the default variant for `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            variant: None,
        }
    }

    /// Selector with an explicit variant.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    /// The variant label in effect: the explicit one, else the built-in
    /// default for the target, else none.
    pub fn variant_qualifier(&self) -> Option<&str> {
        self.variant.as_deref().filter(|v| !v.is_empty()).or_else(|| {
            DEFAULT_VARIANTS
                .iter()
                .find(|(target, _)| *target == self.target)
                .map(|(_, variant)| *variant)
        })
    }

    /// Whether a pin-table path belongs to this target.
    ///
    /// Matches when a path component is exactly `TARGET_<target>`, or when the
    /// path has both `TARGET_MCU_<target>` and `TARGET_<variant>`. Without a
    /// variant the second branch never matches. Labels must equal a whole
    /// component, which is stricter than substring matching:
    /// `TARGET_NUCLEO_F401RE_X` does not match `NUCLEO_F401RE`.
    pub fn matches_path(&self, path: &Path) -> bool {
        let labels: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        let has = |label: &str| labels.iter().any(|l| *l == label);

        if has(&format!("TARGET_{}", self.target)) {
            return true;
        }
        match self.variant_qualifier() {
            Some(variant) => {
                has(&format!("TARGET_MCU_{}", self.target)) && has(&format!("TARGET_{variant}"))
            }
            None => false,
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_qualifier() {
            Some(variant) => write!(f, "{} ({variant})", self.target),
            None => write!(f, "{}", self.target),
        }
    }
}
