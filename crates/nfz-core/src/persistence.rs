//! Roadmap document format.
//!
//! The document is JSON:
//! `{nodes: [{id, point, edges}], boundingBox, numSamples, connectionRadius, builtAt?}`.
//! Loading validates node ids and adjacency so a loaded roadmap always
//! reproduces the saved graph. Reading and writing files is left to callers.

use std::collections::{HashMap, HashSet};

use crate::error::PersistenceError;
use crate::roadmap::Roadmap;

pub fn to_json(roadmap: &Roadmap) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string_pretty(roadmap)?)
}

pub fn from_json(data: &str) -> Result<Roadmap, PersistenceError> {
    let roadmap: Roadmap = serde_json::from_str(data)?;
    validate(&roadmap)?;
    Ok(roadmap)
}

/// Node ids are unique, every neighbor id names a node and every neighbor
/// lists the node back.
pub fn validate(roadmap: &Roadmap) -> Result<(), PersistenceError> {
    let mut adjacency: HashMap<_, HashSet<_>> = HashMap::with_capacity(roadmap.nodes.len());
    for node in &roadmap.nodes {
        if adjacency
            .insert(node.id, node.edges.iter().copied().collect())
            .is_some()
        {
            return Err(PersistenceError::DuplicateNode(node.id));
        }
    }
    for node in &roadmap.nodes {
        for &neighbor in &node.edges {
            let Some(back) = adjacency.get(&neighbor) else {
                return Err(PersistenceError::DanglingEdge {
                    node: node.id,
                    neighbor,
                });
            };
            if !back.contains(&node.id) {
                return Err(PersistenceError::OneWayEdge {
                    node: node.id,
                    neighbor,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "nodes": [
            {"id": 0, "point": {"x": 4.9, "y": 52.3}, "edges": [1]},
            {"id": 1, "point": {"x": 4.91, "y": 52.31}, "edges": [0]}
        ],
        "boundingBox": {"minLat": 50.75, "maxLat": 53.55, "minLon": 3.36, "maxLon": 7.23},
        "numSamples": 2,
        "connectionRadius": 0.05
    }"#;

    #[test]
    fn parses_document_without_timestamp() {
        let roadmap = from_json(DOC).expect("valid document");
        assert_eq!(roadmap.len(), 2);
        assert_eq!(roadmap.connection_radius, 0.05);
        assert!(roadmap.built_at.is_none());
    }

    #[test]
    fn round_trip_preserves_document() {
        let roadmap = from_json(DOC).expect("valid document");
        let json = to_json(&roadmap).expect("serialize");
        assert!(json.contains("\"connectionRadius\""));
        assert!(!json.contains("builtAt"));
        assert_eq!(from_json(&json).expect("reparse"), roadmap);
    }

    #[test]
    fn dangling_neighbor_is_rejected() {
        let doc = DOC.replace("\"edges\": [0]", "\"edges\": [0, 9]");
        assert!(matches!(
            from_json(&doc),
            Err(PersistenceError::DanglingEdge { node: 1, neighbor: 9 })
        ));
    }

    #[test]
    fn one_way_neighbor_is_rejected() {
        let doc = DOC.replace("\"edges\": [0]", "\"edges\": []");
        assert!(matches!(
            from_json(&doc),
            Err(PersistenceError::OneWayEdge { node: 0, neighbor: 1 })
        ));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let doc = DOC.replace("\"id\": 1", "\"id\": 0");
        assert!(matches!(from_json(&doc), Err(PersistenceError::DuplicateNode(0))));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(from_json("{nodes"), Err(PersistenceError::Parse(_))));
    }
}
