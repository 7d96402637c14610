use std::fmt::Write;

use packsync::{LoaderKind, Resolution, Snapshot};

const LABEL_WIDTH: usize = 12;

/// Descriptor fields, one per line, followed by the component versions.
pub fn snapshot_details(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    field(&mut out, "Name:", &snapshot.name);
    if !snapshot.author.is_empty() {
        field(&mut out, "Author:", &snapshot.author);
    }
    if !snapshot.version.is_empty() {
        field(&mut out, "Version:", &snapshot.version);
    }
    field(&mut out, "Format:", snapshot.pack_format.as_str());
    field(
        &mut out,
        "Index:",
        &format!("{} ({})", snapshot.index.file, snapshot.index.hash_format),
    );

    if !snapshot.versions.is_empty() {
        out.push_str("Components:\n");
        for (name, version) in &snapshot.versions {
            let _ = writeln!(out, "  {name:<width$}{version}", width = LABEL_WIDTH - 2);
        }
    }

    out
}

/// Resolved versions for one loader family, marking the selected entries.
pub fn resolution_details(kind: LoaderKind, resolution: &Resolution) -> String {
    let mut out = String::new();
    field(
        &mut out,
        "Loader:",
        &format!("{kind} ({} engine versions)", resolution.engine_versions.len()),
    );
    field(
        &mut out,
        "Minecraft:",
        resolution.selected_engine.as_deref().unwrap_or("-"),
    );
    field(
        &mut out,
        &format!("{kind}:"),
        resolution.selected_loader.as_deref().unwrap_or("-"),
    );

    if !resolution.loader_versions.is_empty() {
        out.push_str("Available:\n");
        out.push_str(&version_list(
            &resolution.loader_versions,
            resolution.selected_loader.as_deref(),
        ));
    }

    out
}

/// One version per line; the selected one is marked with `*`.
pub fn version_list(versions: &[String], selected: Option<&str>) -> String {
    versions
        .iter()
        .map(|version| {
            let marker = if Some(version.as_str()) == selected {
                '*'
            } else {
                ' '
            };
            format!("{marker} {version}\n")
        })
        .collect()
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{label:<width$}{value}", width = LABEL_WIDTH);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        packsync::parse_descriptor(
            b"name = \"Cozy\"\nauthor = \"someone\"\npack-format = \"packwiz:1.1.0\"\n\n[index]\nfile = \"index.toml\"\nhash-format = \"sha256\"\nhash = \"00\"\n\n[versions]\nminecraft = \"1.20.1\"\nfabric = \"0.14.21\"\n",
        )
        .unwrap()
    }

    #[test]
    fn snapshot_lists_fields_and_components() {
        let text = snapshot_details(&snapshot());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Name:       Cozy");
        assert_eq!(lines[1], "Author:     someone");
        assert_eq!(lines[2], "Format:     packwiz:1.1.0");
        assert_eq!(lines[3], "Index:      index.toml (sha256)");
        assert_eq!(lines[4], "Components:");
        assert_eq!(lines[5], "  fabric    0.14.21");
        assert_eq!(lines[6], "  minecraft 1.20.1");
    }

    #[test]
    fn empty_version_is_omitted() {
        assert!(!snapshot_details(&snapshot()).contains("Version:"));
    }

    #[test]
    fn version_list_marks_selection() {
        let versions = vec!["47.1.0".to_owned(), "47.0.35".to_owned()];
        assert_eq!(
            version_list(&versions, Some("47.0.35")),
            "  47.1.0\n* 47.0.35\n"
        );
        assert_eq!(version_list(&versions, None), "  47.1.0\n  47.0.35\n");
    }

    #[test]
    fn resolution_without_engines_shows_placeholders() {
        let text = resolution_details(LoaderKind::Forge, &Resolution::default());
        assert!(text.contains("Minecraft:  -"));
        assert!(text.contains("forge:      -"));
        assert!(!text.contains("Available:"));
    }
}
