//! Stage graph derivation from lane names
//!
//! Edges are never persisted. The canvas always receives a full recomputation:
//! for every stage, every output lane name is matched against every other
//! stage's input lane names, and each match produces one edge. Multiple lane
//! matches between the same pair of stages therefore produce multiple edges,
//! and no cycle detection is performed. Pipelines are small (tens of stages),
//! so the quadratic scan is not worth optimizing.
//!
//! A stage whose output lane name collides with one of its own input lane
//! names produces a self-edge; lane-name generation is expected to keep the
//! two namespaces of a single stage disjoint, and this module does not guard
//! against a collision.

use crate::types::StageInstance;

/// A directed connection between two stage instances, derived from one
/// output-lane / input-lane name match
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: StageInstance,
    pub target: StageInstance,
}

/// Result of one full derivation pass over a stage list
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    /// One edge per (stage, output lane, stage) match, duplicates included
    pub edges: Vec<Edge>,
    /// True when at least one stage instance is a source; gates pipeline
    /// validity in the designer
    pub source_exists: bool,
}

/// Recompute the edge set and source flag for a stage list
pub fn derive_graph(stages: &[StageInstance]) -> PipelineGraph {
    let mut graph = PipelineGraph::default();

    for source in stages {
        if source.is_source() {
            graph.source_exists = true;
        }

        for lane in &source.output_lanes {
            for target in stages {
                if target.input_lanes.iter().any(|input| input == lane) {
                    graph.edges.push(Edge {
                        source: source.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StageType, StageUiInfo};

    fn stage(
        name: &str,
        stage_type: StageType,
        inputs: &[&str],
        outputs: &[&str],
    ) -> StageInstance {
        StageInstance {
            instance_name: name.to_string(),
            stage_name: format!("{}-lib", name),
            stage_version: "1.0.0".to_string(),
            configuration: Vec::new(),
            ui_info: StageUiInfo::new(stage_type),
            input_lanes: inputs.iter().map(|s| s.to_string()).collect(),
            output_lanes: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_single_lane_match() {
        let stages = vec![
            stage("s1", StageType::Source, &[], &["s1_out"]),
            stage("s2", StageType::Target, &["s1_out"], &["s2_out"]),
        ];

        let graph = derive_graph(&stages);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source.instance_name, "s1");
        assert_eq!(graph.edges[0].target.instance_name, "s2");
        assert!(graph.source_exists);
    }

    #[test]
    fn test_no_source_no_edges() {
        let stages = vec![
            stage("p1", StageType::Processor, &["nothing"], &[]),
            stage("t1", StageType::Target, &["also_nothing"], &[]),
        ];

        let graph = derive_graph(&stages);

        assert!(graph.edges.is_empty());
        assert!(!graph.source_exists);
    }

    #[test]
    fn test_fan_out_and_fan_in() {
        let stages = vec![
            stage("src", StageType::Source, &[], &["a"]),
            stage("p1", StageType::Processor, &["a"], &["b"]),
            stage("p2", StageType::Processor, &["a"], &["c"]),
            stage("tgt", StageType::Target, &["b", "c"], &[]),
        ];

        let graph = derive_graph(&stages);

        assert_eq!(graph.edges.len(), 4);
        let pairs: Vec<(&str, &str)> = graph
            .edges
            .iter()
            .map(|e| {
                (
                    e.source.instance_name.as_str(),
                    e.target.instance_name.as_str(),
                )
            })
            .collect();
        assert!(pairs.contains(&("src", "p1")));
        assert!(pairs.contains(&("src", "p2")));
        assert!(pairs.contains(&("p1", "tgt")));
        assert!(pairs.contains(&("p2", "tgt")));
    }

    #[test]
    fn test_duplicate_lane_matches_are_not_deduplicated() {
        // Two distinct lanes both wired to the same pair produce two edges.
        let stages = vec![
            stage("src", StageType::Source, &[], &["x", "y"]),
            stage("tgt", StageType::Target, &["x", "y"], &[]),
        ];

        let graph = derive_graph(&stages);

        assert_eq!(graph.edges.len(), 2);
        assert!(graph
            .edges
            .iter()
            .all(|e| e.source.instance_name == "src" && e.target.instance_name == "tgt"));
    }

    #[test]
    fn test_self_match_produces_self_edge() {
        // Ambiguity preserved on purpose: a stage listing the same lane name
        // as both output and input links to itself.
        let stages = vec![stage("loop", StageType::Processor, &["l"], &["l"])];

        let graph = derive_graph(&stages);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source.instance_name, "loop");
        assert_eq!(graph.edges[0].target.instance_name, "loop");
    }

    #[test]
    fn test_empty_stage_list() {
        let graph = derive_graph(&[]);
        assert!(graph.edges.is_empty());
        assert!(!graph.source_exists);
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    /// Small pool of lane names so collisions actually happen
    fn lane_name() -> impl Strategy<Value = String> {
        (0u8..6).prop_map(|i| format!("lane_{}", i))
    }

    fn arb_stage() -> impl Strategy<Value = StageInstance> {
        (
            0u32..1000,
            prop::collection::vec(lane_name(), 0..3),
            prop::collection::vec(lane_name(), 0..3),
            prop::sample::select(vec![
                StageType::Source,
                StageType::Processor,
                StageType::Target,
            ]),
        )
            .prop_map(|(id, inputs, outputs, stage_type)| StageInstance {
                instance_name: format!("stage_{}", id),
                stage_name: "lib".to_string(),
                stage_version: "1.0.0".to_string(),
                configuration: Vec::new(),
                ui_info: StageUiInfo::new(stage_type),
                input_lanes: inputs,
                output_lanes: outputs,
            })
    }

    fn arb_stages() -> impl Strategy<Value = Vec<StageInstance>> {
        prop::collection::vec(arb_stage(), 0..6)
    }

    proptest! {
        #[test]
        fn test_edge_count_equals_lane_match_count(stages in arb_stages()) {
            let graph = derive_graph(&stages);

            // Property: edge count equals the number of (S, lane, T) triples
            // where lane is an output of S and an input of T.
            let mut expected = 0usize;
            for s in &stages {
                for lane in &s.output_lanes {
                    for t in &stages {
                        if t.input_lanes.iter().any(|l| l == lane) {
                            expected += 1;
                        }
                    }
                }
            }
            prop_assert_eq!(graph.edges.len(), expected);
        }

        #[test]
        fn test_every_edge_shares_a_lane(stages in arb_stages()) {
            let graph = derive_graph(&stages);

            for edge in &graph.edges {
                let shared = edge.source.output_lanes.iter().any(|lane| {
                    edge.target.input_lanes.iter().any(|input| input == lane)
                });
                prop_assert!(shared, "edge without a shared lane name");
            }
        }

        #[test]
        fn test_source_flag_matches_stage_types(stages in arb_stages()) {
            let graph = derive_graph(&stages);
            let expected = stages.iter().any(|s| s.is_source());
            prop_assert_eq!(graph.source_exists, expected);
        }
    }
}
