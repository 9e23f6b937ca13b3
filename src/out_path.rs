use std::path::{Path, PathBuf};

use crate::resources::Action;

/// Default file names per (resource, action). Names without an extension get one appended.
static TEMPLATES: &[(&str, Action, &str)] = &[
    ("network-device", Action::List, "network_devices"),
    ("network-device", Action::Add, "nad_created.json"),
    ("network-device", Action::Delete, "nad_deleted.json"),
    ("network-device-group", Action::List, "network_device_groups"),
    ("endpoint", Action::List, "endpoints.csv"),
    ("endpoint", Action::Add, "endpoint_created.json"),
    ("endpoint", Action::Delete, "endpoint_deleted.json"),
];

pub fn template_for(resource: &str, action: Action) -> Option<&'static str> {
    TEMPLATES
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, template)| *template)
}

/// An explicit path is returned untouched; otherwise the template, then
/// `<resource_with_underscores>.<ext>`, inside `out_dir`.
pub fn resolve_output_path(
    explicit: Option<&Path>,
    out_dir: &Path,
    resource: &str,
    action: Action,
    extension: &str,
) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let file_name = match template_for(resource, action) {
        Some(template) if Path::new(template).extension().is_some() => template.to_string(),
        Some(template) => format!("{template}.{extension}"),
        None => format!("{}.{extension}", resource.replace('-', "_")),
    };
    out_dir.join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::RESOURCES;

    #[test]
    fn explicit_path_wins() {
        let out = resolve_output_path(
            Some(Path::new("/tmp/out.json")),
            Path::new("logs"),
            "endpoint",
            Action::List,
            "csv",
        );
        assert_eq!(out, PathBuf::from("/tmp/out.json"));
    }

    #[test]
    fn template_extension_wins_over_requested_one() {
        let out = resolve_output_path(None, Path::new("logs"), "endpoint", Action::List, "json");
        assert_eq!(out, PathBuf::from("logs/endpoints.csv"));
    }

    #[test]
    fn template_without_extension_gets_the_requested_one() {
        let out = resolve_output_path(None, Path::new("logs"), "network-device", Action::List, "json");
        assert_eq!(out, PathBuf::from("logs/network_devices.json"));
    }

    #[test]
    fn fallback_uses_the_underscored_resource_name() {
        let out = resolve_output_path(None, Path::new("logs"), "network-device", Action::Get, "json");
        assert_eq!(out, PathBuf::from("logs/network_device.json"));

        let out =
            resolve_output_path(None, Path::new("logs"), "network-device-group", Action::Get, "json");
        assert_eq!(out, PathBuf::from("logs/network_device_group.json"));
    }

    #[test]
    fn every_registered_pair_resolves_the_same_way_twice() {
        for spec in RESOURCES {
            for action in spec.actions {
                let first = resolve_output_path(None, Path::new("logs"), spec.name, *action, "json");
                let again = resolve_output_path(None, Path::new("logs"), spec.name, *action, "json");
                assert_eq!(first, again);
                assert!(first.starts_with("logs"));
                assert!(first.extension().is_some(), "{} has no extension", first.display());
            }
        }
    }
}
