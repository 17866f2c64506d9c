//! Mini frame graph: passes declare the resources they read and write, and
//! `compile` turns that into a validated execution order.
//!
//! Rules:
//! - every transient resource has exactly one writer;
//! - a pass may only read a resource that some pass writes, or an imported one;
//! - passes that don't contribute to an imported resource are culled.

use std::collections::VecDeque;

use thiserror::Error;

/// Handle for a frame graph resource (a render target).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u32);

/// Handle for a frame graph pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassId(pub u32);

#[derive(Clone, Debug)]
pub struct ResourceDesc {
    pub label: String,
    /// Owned outside the graph (e.g. the swapchain image).
    pub imported: bool,
}

#[derive(Clone, Debug)]
pub struct PassDesc {
    pub label: String,
    pub reads: Vec<ResourceId>,
    pub writes: Vec<ResourceId>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameGraphError {
    #[error("pass '{pass}' references unknown resource #{resource}")]
    UnknownResource { pass: String, resource: u32 },
    #[error("pass '{pass}' reads '{resource}', which no pass writes")]
    UnwrittenRead { pass: String, resource: String },
    #[error("resource '{resource}' is written by both '{first}' and '{second}'")]
    MultipleWriters {
        resource: String,
        first: String,
        second: String,
    },
    #[error("passes form a dependency cycle")]
    Cycle,
    #[error("no pass writes an imported resource")]
    NoOutput,
}

#[derive(Default)]
pub struct FrameGraph {
    resources: Vec<ResourceDesc>,
    passes: Vec<PassDesc>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transient resource produced inside the graph.
    pub fn add_resource(&mut self, label: impl Into<String>) -> ResourceId {
        self.push_resource(label.into(), false)
    }

    /// Add a resource owned outside the graph; writing it makes a pass live.
    pub fn import_resource(&mut self, label: impl Into<String>) -> ResourceId {
        self.push_resource(label.into(), true)
    }

    fn push_resource(&mut self, label: String, imported: bool) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(ResourceDesc { label, imported });
        id
    }

    pub fn add_pass(
        &mut self,
        label: impl Into<String>,
        reads: &[ResourceId],
        writes: &[ResourceId],
    ) -> PassId {
        let id = PassId(self.passes.len() as u32);
        self.passes.push(PassDesc {
            label: label.into(),
            reads: reads.to_vec(),
            writes: writes.to_vec(),
        });
        id
    }

    pub fn pass(&self, id: PassId) -> Option<&PassDesc> {
        self.passes.get(id.0 as usize)
    }

    /// Validate the graph and return live passes in dependency order.
    /// Independent passes keep their insertion order.
    pub fn compile(&self) -> Result<Vec<PassId>, FrameGraphError> {
        let writers = self.writers()?;

        // Pass -> passes it depends on.
        let mut deps: Vec<Vec<usize>> = vec![Vec::new(); self.passes.len()];
        for (p, pass) in self.passes.iter().enumerate() {
            for r in &pass.reads {
                let res = &self.resources[r.0 as usize];
                match writers[r.0 as usize] {
                    Some(w) if w != p => deps[p].push(w),
                    Some(_) => {}
                    None if res.imported => {}
                    None => {
                        return Err(FrameGraphError::UnwrittenRead {
                            pass: pass.label.clone(),
                            resource: res.label.clone(),
                        });
                    }
                }
            }
        }

        let live = self.live_passes(&deps);
        if !live.iter().any(|&l| l) {
            return Err(FrameGraphError::NoOutput);
        }

        // Kahn's algorithm over live passes.
        let mut pending: Vec<usize> = deps
            .iter()
            .map(|d| d.iter().filter(|&&w| live[w]).count())
            .collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.passes.len()];
        for (p, d) in deps.iter().enumerate() {
            if live[p] {
                for &w in d {
                    dependents[w].push(p);
                }
            }
        }

        let mut ready: VecDeque<usize> = (0..self.passes.len())
            .filter(|&p| live[p] && pending[p] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.passes.len());
        while let Some(p) = ready.pop_front() {
            order.push(PassId(p as u32));
            for &next in &dependents[p] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    insert_sorted(&mut ready, next);
                }
            }
        }

        let live_count = live.iter().filter(|&&l| l).count();
        if order.len() != live_count {
            return Err(FrameGraphError::Cycle);
        }

        for (p, pass) in self.passes.iter().enumerate() {
            if !live[p] {
                log::debug!("Frame graph: culled pass '{}'", pass.label);
            }
        }
        Ok(order)
    }

    /// Writer pass index per resource, checking ids and single-writer rule.
    fn writers(&self) -> Result<Vec<Option<usize>>, FrameGraphError> {
        let mut writers: Vec<Option<usize>> = vec![None; self.resources.len()];
        for (p, pass) in self.passes.iter().enumerate() {
            for r in pass.reads.iter().chain(&pass.writes) {
                if r.0 as usize >= self.resources.len() {
                    return Err(FrameGraphError::UnknownResource {
                        pass: pass.label.clone(),
                        resource: r.0,
                    });
                }
            }
            for w in &pass.writes {
                let slot = &mut writers[w.0 as usize];
                if let Some(first) = *slot {
                    return Err(FrameGraphError::MultipleWriters {
                        resource: self.resources[w.0 as usize].label.clone(),
                        first: self.passes[first].label.clone(),
                        second: pass.label.clone(),
                    });
                }
                *slot = Some(p);
            }
        }
        Ok(writers)
    }

    /// Passes reachable backwards from writers of imported resources.
    fn live_passes(&self, deps: &[Vec<usize>]) -> Vec<bool> {
        let mut live = vec![false; self.passes.len()];
        let mut stack: Vec<usize> = self
            .passes
            .iter()
            .enumerate()
            .filter(|(_, pass)| {
                pass.writes
                    .iter()
                    .any(|w| self.resources[w.0 as usize].imported)
            })
            .map(|(p, _)| p)
            .collect();
        while let Some(p) = stack.pop() {
            if live[p] {
                continue;
            }
            live[p] = true;
            stack.extend(deps[p].iter().copied());
        }
        live
    }
}

fn insert_sorted(queue: &mut VecDeque<usize>, value: usize) {
    let pos = queue.iter().position(|&v| v > value).unwrap_or(queue.len());
    queue.insert(pos, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(graph: &FrameGraph, order: &[PassId]) -> Vec<String> {
        order
            .iter()
            .map(|&id| graph.pass(id).unwrap().label.clone())
            .collect()
    }

    #[test]
    fn post_chain_runs_in_dependency_order() {
        let mut g = FrameGraph::new();
        let scene = g.add_resource("scene");
        let bloom = g.add_resource("bloom");
        let surface = g.import_resource("surface");
        // Declared out of order on purpose.
        g.add_pass("holo", &[bloom], &[surface]);
        g.add_pass("bloom", &[scene], &[bloom]);
        g.add_pass("scene", &[], &[scene]);

        let order = g.compile().unwrap();
        assert_eq!(labels(&g, &order), ["scene", "bloom", "holo"]);
    }

    #[test]
    fn reading_unwritten_resource_fails() {
        let mut g = FrameGraph::new();
        let scene = g.add_resource("scene");
        let surface = g.import_resource("surface");
        g.add_pass("present", &[scene], &[surface]);
        assert_eq!(
            g.compile(),
            Err(FrameGraphError::UnwrittenRead {
                pass: "present".into(),
                resource: "scene".into()
            })
        );
    }

    #[test]
    fn second_writer_is_rejected() {
        let mut g = FrameGraph::new();
        let scene = g.add_resource("scene");
        g.add_pass("a", &[], &[scene]);
        g.add_pass("b", &[], &[scene]);
        assert!(matches!(g.compile(), Err(FrameGraphError::MultipleWriters { .. })));
    }

    #[test]
    fn cycle_is_detected() {
        let mut g = FrameGraph::new();
        let x = g.add_resource("x");
        let y = g.add_resource("y");
        let surface = g.import_resource("surface");
        g.add_pass("a", &[y], &[x]);
        g.add_pass("b", &[x], &[y, surface]);
        assert_eq!(g.compile(), Err(FrameGraphError::Cycle));
    }

    #[test]
    fn unused_pass_is_culled() {
        let mut g = FrameGraph::new();
        let scene = g.add_resource("scene");
        let debug = g.add_resource("debug");
        let surface = g.import_resource("surface");
        g.add_pass("scene", &[], &[scene]);
        g.add_pass("debug", &[scene], &[debug]);
        g.add_pass("present", &[scene], &[surface]);
        let order = g.compile().unwrap();
        assert_eq!(labels(&g, &order), ["scene", "present"]);
    }

    #[test]
    fn graph_without_output_is_an_error() {
        let mut g = FrameGraph::new();
        let scene = g.add_resource("scene");
        g.add_pass("scene", &[], &[scene]);
        assert_eq!(g.compile(), Err(FrameGraphError::NoOutput));
    }

    #[test]
    fn unknown_resource_is_reported() {
        let mut g = FrameGraph::new();
        let surface = g.import_resource("surface");
        g.add_pass("present", &[ResourceId(42)], &[surface]);
        assert!(matches!(
            g.compile(),
            Err(FrameGraphError::UnknownResource { resource: 42, .. })
        ));
    }
}
