//! Dependency graph of a proof: circular reasoning, derivation depth,
//! bottleneck steps and the longest derivation chain.
//!
//! Edges come from each step's `dependencies` plus references such as
//! "from step 2" in its claim or reasoning. The traversal is iterative, so
//! long chains cannot exhaust the stack.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use symbolic::ProofStep;

/// A step at least this many other steps depend on is a bottleneck.
pub const BOTTLENECK_IN_DEGREE: usize = 3;

lazy_static! {
    // "from step 2", "by step 1a", "using steps 3"
    static ref STEP_REFERENCE: Regex =
        Regex::new(r"(?i)\b(?:from|by|using)\s+steps?\s+([\w.-]*\w)")
            .expect("STEP_REFERENCE regex is valid");
}

/// Dependency naming a step id that is not in the proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub step_id: String,
    pub missing: String,
}

/// Shape of a proof's dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphAnalysis {
    /// Steps in the longest derivation chain; 0 for an empty proof.
    pub depth: usize,
    /// Each cycle follows "depends on" edges and repeats its first id at the end.
    pub cycles: Vec<Vec<String>>,
    /// Steps with at least [`BOTTLENECK_IN_DEGREE`] dependents, in input order.
    pub bottlenecks: Vec<String>,
    /// Longest chain, premise first. Empty when the graph has a cycle.
    pub critical_path: Vec<String>,
    /// Every step after all of its dependencies. `None` when the graph has a cycle.
    pub derivation_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dangling: Vec<DanglingReference>,
}

impl GraphAnalysis {
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Human-readable cycle descriptions, e.g. `"Circular reasoning detected: 1 -> 2 -> 1"`.
    pub fn cycle_messages(&self) -> Vec<String> {
        self.cycles
            .iter()
            .map(|cycle| format!("Circular reasoning detected: {}", cycle.join(" -> ")))
            .collect()
    }
}

/// Step ids referenced in `text` ("from step 2"), in order of appearance.
pub fn referenced_steps(text: &str) -> Vec<String> {
    STEP_REFERENCE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Open,
    Done,
}

/// Resolve every step's dependencies to indices. Explicit ids that match no
/// step are reported as dangling; text references to unknown ids are ignored.
fn edges(steps: &[ProofStep]) -> (Vec<Vec<usize>>, Vec<DanglingReference>) {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        index.entry(step.id.as_str()).or_insert(i);
    }

    let mut dangling = Vec::new();
    let deps = steps
        .iter()
        .map(|step| {
            let mut seen = HashSet::new();
            let mut out = Vec::new();
            for dep in &step.dependencies {
                match index.get(dep.as_str()) {
                    Some(&i) => {
                        if seen.insert(i) {
                            out.push(i);
                        }
                    }
                    None => dangling.push(DanglingReference {
                        step_id: step.id.clone(),
                        missing: dep.clone(),
                    }),
                }
            }
            let mentioned = referenced_steps(&step.claim)
                .into_iter()
                .chain(referenced_steps(&step.reasoning));
            for dep in mentioned {
                if let Some(&i) = index.get(dep.as_str()) {
                    if seen.insert(i) {
                        out.push(i);
                    }
                }
            }
            out
        })
        .collect();
    (deps, dangling)
}

/// Analyse the dependency graph of `steps`.
pub fn analyze(steps: &[ProofStep]) -> GraphAnalysis {
    let n = steps.len();
    let (deps, dangling) = edges(steps);

    let mut mark = vec![Mark::Unvisited; n];
    let mut depth = vec![0usize; n];
    let mut via: Vec<Option<usize>> = vec![None; n];
    let mut order = Vec::with_capacity(n);
    let mut cycles = Vec::new();

    for root in 0..n {
        if mark[root] != Mark::Unvisited {
            continue;
        }
        // (step, next dependency to visit); the stack is the open path.
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        mark[root] = Mark::Open;

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if let Some(&dep) = deps[node].get(top.1) {
                top.1 += 1;
                match mark[dep] {
                    Mark::Unvisited => {
                        mark[dep] = Mark::Open;
                        stack.push((dep, 0));
                    }
                    Mark::Open => {
                        if let Some(start) = stack.iter().position(|&(s, _)| s == dep) {
                            let mut cycle: Vec<String> =
                                stack[start..].iter().map(|&(s, _)| steps[s].id.clone()).collect();
                            cycle.push(steps[dep].id.clone());
                            cycles.push(cycle);
                        }
                    }
                    Mark::Done => {}
                }
                continue;
            }

            stack.pop();
            // Open dependencies are back edges and add no depth.
            let mut best: Option<usize> = None;
            for &d in &deps[node] {
                if mark[d] == Mark::Done && best.map_or(true, |b| depth[d] > depth[b]) {
                    best = Some(d);
                }
            }
            depth[node] = 1 + best.map_or(0, |b| depth[b]);
            via[node] = best;
            mark[node] = Mark::Done;
            order.push(node);
        }
    }

    let mut in_degree = vec![0usize; n];
    for targets in &deps {
        for &d in targets {
            in_degree[d] += 1;
        }
    }
    let bottlenecks = steps
        .iter()
        .zip(&in_degree)
        .filter(|&(_, &count)| count >= BOTTLENECK_IN_DEGREE)
        .map(|(step, _)| step.id.clone())
        .collect();

    let max_depth = depth.iter().copied().max().unwrap_or(0);
    let acyclic = cycles.is_empty();

    let critical_path = match depth.iter().position(|&d| d == max_depth) {
        Some(end) if acyclic => {
            let mut path = vec![steps[end].id.clone()];
            let mut cursor = via[end];
            while let Some(i) = cursor {
                path.push(steps[i].id.clone());
                cursor = via[i];
            }
            path.reverse();
            path
        }
        _ => Vec::new(),
    };

    if !acyclic {
        tracing::warn!(cycles = cycles.len(), "Proof dependency graph has cycles");
    }

    GraphAnalysis {
        depth: max_depth,
        cycles,
        bottlenecks,
        critical_path,
        derivation_order: acyclic.then(|| order.iter().map(|&i| steps[i].id.clone()).collect()),
        dangling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, deps: &[&str]) -> ProofStep {
        ProofStep::new(id, None).with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_linear_chain() {
        let steps = vec![step("1", &[]), step("2", &["1"]), step("3", &["2"])];
        let g = analyze(&steps);
        assert_eq!(g.depth, 3);
        assert!(g.is_acyclic());
        assert_eq!(g.critical_path, vec!["1", "2", "3"]);
        assert_eq!(
            g.derivation_order,
            Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
        assert!(g.bottlenecks.is_empty());
    }

    #[test]
    fn test_order_puts_dependencies_first() {
        let steps = vec![step("c", &["b"]), step("b", &["a"]), step("a", &[])];
        let g = analyze(&steps);
        assert_eq!(
            g.derivation_order,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(g.critical_path, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_three_step_cycle() {
        let steps = vec![step("1", &["3"]), step("2", &["1"]), step("3", &["2"])];
        let g = analyze(&steps);
        assert_eq!(g.cycles, vec![vec!["1", "3", "2", "1"]]);
        assert!(g.critical_path.is_empty());
        assert!(g.derivation_order.is_none());
        assert_eq!(
            g.cycle_messages(),
            vec!["Circular reasoning detected: 1 -> 3 -> 2 -> 1"]
        );
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let g = analyze(&[step("a", &["a"])]);
        assert_eq!(g.cycles, vec![vec!["a", "a"]]);
        assert_eq!(g.depth, 1);
    }

    #[test]
    fn test_bottleneck_needs_three_dependents() {
        let steps = vec![
            step("1", &[]),
            step("2", &["1"]),
            step("3", &["1"]),
            step("4", &["1", "2"]),
        ];
        let g = analyze(&steps);
        assert_eq!(g.bottlenecks, vec!["1"]);
        assert_eq!(g.depth, 3);
        assert_eq!(g.critical_path, vec!["1", "2", "4"]);
    }

    #[test]
    fn test_dangling_dependency_reported_and_ignored() {
        let g = analyze(&[step("1", &[]), step("2", &["1", "9"])]);
        assert_eq!(
            g.dangling,
            vec![DanglingReference {
                step_id: "2".into(),
                missing: "9".into()
            }]
        );
        assert_eq!(g.depth, 2);
        assert!(g.is_acyclic());
    }

    #[test]
    fn test_text_references_add_edges() {
        let steps = vec![
            ProofStep::new("1", None).with_claim("Assume P"),
            ProofStep::new("2", None)
                .with_claim("Q follows")
                .with_reasoning("Modus ponens from step 1"),
            ProofStep::new("3", None).with_claim("Multiply by 2 on both sides"),
        ];
        let g = analyze(&steps);
        assert_eq!(g.depth, 2);
        assert_eq!(g.critical_path, vec!["1", "2"]);
        assert_eq!(referenced_steps("using steps 4 and by step 2b"), vec!["4", "2b"]);
        assert!(referenced_steps("divide by 2").is_empty());
    }

    #[test]
    fn test_text_reference_can_close_a_cycle() {
        let steps = vec![
            step("1", &[]).with_reasoning("by step 2"),
            step("2", &["1"]),
        ];
        let g = analyze(&steps);
        assert_eq!(g.cycles.len(), 1);
    }

    #[test]
    fn test_empty_proof() {
        let g = analyze(&[]);
        assert_eq!(g.depth, 0);
        assert!(g.critical_path.is_empty());
        assert_eq!(g.derivation_order, Some(Vec::new()));
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        // Step i depends on step i + 1, so the first root walks the whole chain.
        let n = 20_000usize;
        let steps: Vec<ProofStep> = (0..n)
            .map(|i| {
                let s = ProofStep::new(i.to_string(), None);
                if i + 1 < n {
                    s.with_dependencies([(i + 1).to_string()])
                } else {
                    s
                }
            })
            .collect();
        let g = analyze(&steps);
        assert_eq!(g.depth, n);
        assert_eq!(g.critical_path.len(), n);
        assert_eq!(g.critical_path[0], (n - 1).to_string());
    }
}
