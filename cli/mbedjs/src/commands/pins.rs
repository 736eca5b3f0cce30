//! `mbedjs pins`: show the pin constants a build would embed.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mbedjs_codegen::sanitize_identifier;
use mbedjs_targets::{find_pin_table, load_pin_table, PinEntry, TargetSelector};

use crate::manifest::Settings;

/// Print the pin table for the selected target from the fetched toolchain.
pub fn run(project_dir: &Path, settings: &Settings, target: Option<&str>, variant: Option<&str>) -> Result<()> {
    let selector = settings.resolve_target(target, variant)?;
    let (table, pins) = resolve_pins(&settings.layout(project_dir).pin_defs_dir(), &selector)?;

    println!("Pins for {selector} ({}):", table.display());
    for pin in &pins {
        println!("  {:<16} {:<12} MBEDJS_PIN_{}", pin.name, pin.value, sanitize_identifier(&pin.name));
    }
    println!("{} pins", pins.len());
    Ok(())
}

fn resolve_pins(pin_defs: &Path, selector: &TargetSelector) -> Result<(PathBuf, Vec<PinEntry>)> {
    if !pin_defs.is_dir() {
        bail!(
            "pin definitions not found at {}; run `mbedjs build` once to fetch the toolchain",
            pin_defs.display()
        );
    }
    let table = find_pin_table(pin_defs, selector)?;
    let pins = load_pin_table(&table).with_context(|| format!("reading {}", table.display()))?;
    Ok((table, pins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_pins_from_fetched_tree() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default();
        let pin_defs = settings.layout(dir.path()).pin_defs_dir();
        let table_dir = pin_defs.join("TARGET_STM").join("TARGET_NUCLEO_F401RE");
        fs::create_dir_all(&table_dir).unwrap();
        fs::write(table_dir.join("pins.js"), "var LED1 = 0x05;\nvar USER_BUTTON = 0x2D;\n").unwrap();

        let (table, pins) = resolve_pins(&pin_defs, &TargetSelector::new("NUCLEO_F401RE")).unwrap();
        assert!(table.ends_with("TARGET_NUCLEO_F401RE/pins.js"));
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[1].value, "0x2D");

        run(dir.path(), &settings, Some("NUCLEO_F401RE"), None).unwrap();
    }

    #[test]
    fn unfetched_toolchain_gives_a_hint() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), &Settings::default(), Some("K64F"), None).unwrap_err();
        assert!(err.to_string().contains("mbedjs build"));
    }
}
