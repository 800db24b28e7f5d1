//! Backup node-set scanner
//!
//! Recovers the node identifiers already present in a local mirror by
//! looking for `<id>.html` files directly inside a section's `node/`
//! directory, under both domain layouts.

use crate::site::{Section, Site};
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

fn node_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)\.html$").expect("static regex"))
}

/// Parses a node identifier out of a mirrored file name
///
/// Returns `None` for anything other than `<digits>.html`, including
/// identifiers too large for a `u64`.
pub fn parse_node_file_name(name: &str) -> Option<u64> {
    node_file_pattern()
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Collects the archived node identifiers for a section
///
/// Scans `<root>/<bare>/<section>/node/` and `<root>/www.<bare>/<section>/node/`.
/// Missing directories are not an error; an empty set tells the caller to
/// skip reconciliation for this section.
pub fn scan_archived_nodes(site: &Site, section: &Section) -> BTreeSet<u64> {
    let mut nodes = BTreeSet::new();

    for root in site.mirror_roots() {
        let node_dir = root.join(section.node_dir());
        collect_node_files(&node_dir, &mut nodes);
    }

    if nodes.is_empty() {
        tracing::info!("No nodes found in backup for {}", section);
    } else {
        tracing::debug!("Found {} archived nodes for {}", nodes.len(), section);
    }

    nodes
}

fn collect_node_files(node_dir: &Path, nodes: &mut BTreeSet<u64>) {
    let entries = match std::fs::read_dir(node_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping {}: {}", node_dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        if let Some(id) = entry.file_name().to_str().and_then(parse_node_file_name) {
            nodes.insert(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site_in(dir: &TempDir) -> Site {
        Site::new("https://www.example.com/", dir.path()).unwrap()
    }

    #[test]
    fn test_parse_node_file_name() {
        assert_eq!(parse_node_file_name("1.html"), Some(1));
        assert_eq!(parse_node_file_name("12345.html"), Some(12345));

        assert_eq!(parse_node_file_name("1.htm"), None);
        assert_eq!(parse_node_file_name("a1.html"), None);
        assert_eq!(parse_node_file_name("1.html.orig"), None);
        assert_eq!(parse_node_file_name(".html"), None);
        assert_eq!(parse_node_file_name("99999999999999999999999.html"), None);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let nodes = scan_archived_nodes(&site_in(&dir), &Section::new("bitacora"));
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_scans_both_layouts() {
        let dir = TempDir::new().unwrap();
        let www = dir.path().join("www.example.com/bitacora/node");
        let bare = dir.path().join("example.com/bitacora/node");
        fs::create_dir_all(&www).unwrap();
        fs::create_dir_all(&bare).unwrap();
        fs::write(www.join("1.html"), "x").unwrap();
        fs::write(www.join("2.html"), "x").unwrap();
        fs::write(bare.join("2.html"), "x").unwrap();
        fs::write(bare.join("5.html"), "x").unwrap();

        let nodes = scan_archived_nodes(&site_in(&dir), &Section::new("bitacora"));
        assert_eq!(nodes.into_iter().collect::<Vec<_>>(), vec![1, 2, 5]);
    }

    #[test]
    fn test_ignores_non_matching_entries() {
        let dir = TempDir::new().unwrap();
        let node_dir = dir.path().join("www.example.com/tortilla/node");
        fs::create_dir_all(node_dir.join("7.html")).unwrap();
        fs::create_dir_all(node_dir.join("8/edit")).unwrap();
        fs::write(node_dir.join("3.html"), "x").unwrap();
        fs::write(node_dir.join("3.html.orig"), "x").unwrap();
        fs::write(node_dir.join("index.html"), "x").unwrap();
        fs::write(node_dir.join("8/edit/9.html"), "x").unwrap();

        let nodes = scan_archived_nodes(&site_in(&dir), &Section::new("tortilla"));
        assert_eq!(nodes.into_iter().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_sections_are_separate() {
        let dir = TempDir::new().unwrap();
        let node_dir = dir.path().join("www.example.com/tortilla/node");
        fs::create_dir_all(&node_dir).unwrap();
        fs::write(node_dir.join("3.html"), "x").unwrap();

        let nodes = scan_archived_nodes(&site_in(&dir), &Section::new("bitacora"));
        assert!(nodes.is_empty());
    }
}
