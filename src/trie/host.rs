use serde::{Deserialize, Serialize};

use crate::route::constraints::strip_port;

/// One label of a host template, between dots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostSegment {
    /// Fixed label, stored lowercase
    Literal { value: String },
    /// Wildcard label that captures the request's label under `name`
    Variable { name: String },
}

/// Compiled form of a route's host template.
///
/// Host templates are far fewer than path templates, so they are not
/// part of the trie; each is checked at terminal time against the
/// candidate the path walk produced. Optional segments in a host
/// template expand to `variants`, each a full label sequence; the
/// variants are tried in order and the first hit wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPattern {
    pub variants: Vec<Vec<HostSegment>>,
}

impl HostPattern {
    /// Matches `host` (port ignored, labels compared case-insensitively)
    /// and returns the variables captured by wildcard labels, or `None`
    /// when no variant fits.
    pub fn matches(&self, host: &str) -> Option<Vec<(String, String)>> {
        let bare = strip_port(host);
        let labels: Vec<&str> = bare.split('.').collect();
        for variant in &self.variants {
            if variant.len() != labels.len() {
                continue;
            }
            // equal lengths, so label-by-label comparison is the same
            // forwards as backwards
            let mut captured = Vec::new();
            let mut matched = true;
            for (segment, label) in variant.iter().zip(&labels) {
                match segment {
                    HostSegment::Literal { value } => {
                        if !value.eq_ignore_ascii_case(label) {
                            matched = false;
                            break;
                        }
                    }
                    HostSegment::Variable { name } => {
                        if label.is_empty() {
                            matched = false;
                            break;
                        }
                        captured.push((name.clone(), (*label).to_string()));
                    }
                }
            }
            if matched {
                return Some(captured);
            }
        }
        None
    }
}
