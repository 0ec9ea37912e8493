//! Transitive resource usage of every scheduled action.
//!
//! A resource body may itself call further resources, so an action uses the
//! resources it calls directly plus everything those resources use. Closures
//! are resolved with an explicit work stack and memoized per resource, so a
//! deep chain of nested resources costs one visit each and no recursion.

use indexmap::{IndexMap, IndexSet};

use crate::builder::Declarations;
use crate::error::{Error, Result};
use crate::types::{ActionId, Entity, ResourceId};

/// Bipartite action/resource usage map.
#[derive(Debug, Clone, Default)]
pub struct UsageMap {
    by_action: IndexMap<ActionId, Vec<ResourceId>>,
    by_resource: IndexMap<ResourceId, Vec<ActionId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

enum Visit {
    Enter(ResourceId),
    Exit(ResourceId),
}

struct Resolver<'a> {
    decls: &'a Declarations,
    marks: Vec<Mark>,
    closures: Vec<Vec<ResourceId>>,
}

impl<'a> Resolver<'a> {
    fn new(decls: &'a Declarations) -> Self {
        Self {
            decls,
            marks: vec![Mark::Unvisited; decls.resources.len()],
            closures: vec![Vec::new(); decls.resources.len()],
        }
    }

    /// Depth-first post-order walk from `root`, filling `closures`.
    fn resolve(&mut self, root: ResourceId) -> Result<()> {
        let mut stack = vec![Visit::Enter(root)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(resource) => {
                    if self.marks[resource.0] != Mark::Unvisited {
                        continue;
                    }
                    self.marks[resource.0] = Mark::InProgress;
                    stack.push(Visit::Exit(resource));
                    for &callee in self.decls.resource(resource).decl.uses.keys() {
                        match self.marks[callee.0] {
                            // callee is on the current path: the resource would
                            // end up calling itself
                            Mark::InProgress => {
                                return Err(Error::DoubleUse {
                                    caller: self.decls.resource(resource).decl.name.clone(),
                                    resource: self.decls.resource(callee).decl.name.clone(),
                                });
                            }
                            Mark::Unvisited => stack.push(Visit::Enter(callee)),
                            Mark::Done => {}
                        }
                    }
                }
                Visit::Exit(resource) => {
                    let decl = &self.decls.resource(resource).decl;
                    let closure = self.join(&decl.name, decl.uses.keys().copied())?;
                    self.closures[resource.0] = closure;
                    self.marks[resource.0] = Mark::Done;
                }
            }
        }
        Ok(())
    }

    /// Concatenate direct callees with their closures, rejecting any resource
    /// reached twice.
    fn join(&self, caller: &str, direct: impl Iterator<Item = ResourceId>) -> Result<Vec<ResourceId>> {
        let mut seen: IndexSet<ResourceId> = IndexSet::new();
        for callee in direct {
            let reached = std::iter::once(callee).chain(self.closures[callee.0].iter().copied());
            for resource in reached {
                if !seen.insert(resource) {
                    return Err(Error::DoubleUse {
                        caller: caller.to_string(),
                        resource: self.decls.resource(resource).decl.name.clone(),
                    });
                }
            }
        }
        Ok(seen.into_iter().collect())
    }
}

impl UsageMap {
    /// Resolve the transitive usage of `actions`.
    ///
    /// Fails with [`Error::DoubleUse`] when an action reaches a resource
    /// through two paths (or a resource reaches itself) and with
    /// [`Error::UndefinedResourceUse`] when it reaches a resource whose body
    /// was never finalized.
    pub(crate) fn build(decls: &Declarations, actions: &[ActionId]) -> Result<Self> {
        let mut resolver = Resolver::new(decls);
        let mut usage = UsageMap::default();

        for &action in actions {
            let decl = &decls.action(action).decl;
            for &callee in decl.uses.keys() {
                resolver.resolve(callee)?;
            }
            let closure = resolver.join(&decl.name, decl.uses.keys().copied())?;
            if let Some(&undefined) = closure.iter().find(|r| !decls.resource(**r).decl.defined()) {
                return Err(Error::UndefinedResourceUse {
                    caller: decl.name.clone(),
                    resource: decls.resource(undefined).decl.name.clone(),
                });
            }
            for &resource in &closure {
                usage.by_resource.entry(resource).or_default().push(action);
            }
            usage.by_action.insert(action, closure);
        }

        usage.by_resource.sort_keys();
        Ok(usage)
    }

    /// Every resource `action` uses, directly or not.
    pub fn resources_for(&self, action: ActionId) -> &[ResourceId] {
        self.by_action.get(&action).map_or(&[], Vec::as_slice)
    }

    /// Every scheduled action using `resource`, in action order.
    pub fn actions_using(&self, resource: ResourceId) -> &[ActionId] {
        self.by_resource.get(&resource).map_or(&[], Vec::as_slice)
    }

    /// Scheduled actions in the order they were resolved.
    pub fn actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.by_action.keys().copied()
    }

    /// Resources used by at least one scheduled action, ascending.
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.by_resource.keys().copied()
    }

    pub fn contains(&self, action: ActionId) -> bool {
        self.by_action.contains_key(&action)
    }

    /// The actions an entity stands for in a relation: the action itself, or
    /// every action using a resource.
    pub fn actions_for(&self, entity: Entity) -> Vec<ActionId> {
        match entity {
            Entity::Action(action) if self.contains(action) => vec![action],
            Entity::Action(_) => Vec::new(),
            Entity::Resource(resource) => self.actions_using(resource).to_vec(),
        }
    }
}
