use crate::domain::{DomainDescription, UnitKey, WorkUnit};
use crate::state::ProgressState;

/// Result of expanding the domain against saved progress
#[derive(Debug, Clone)]
pub struct Enumeration {
    /// Units still to process, in domain order
    pub units: Vec<WorkUnit>,

    /// Units the domain describes in total
    pub total: usize,

    /// Units already marked completed by an earlier run
    pub completed: usize,
}

impl Enumeration {
    pub fn pending(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Expands a domain description into the work units a run should dispatch
///
/// Iteration follows the order of the description file, so reruns dispatch
/// units in the same order.
pub struct WorkEnumerator<'a> {
    domain: &'a DomainDescription,
}

impl<'a> WorkEnumerator<'a> {
    pub fn new(domain: &'a DomainDescription) -> Self {
        Self { domain }
    }

    /// Lists every unit not yet completed, each with its resume page
    ///
    /// A unit with no progress entry starts at page 1; an unfinished one
    /// resumes right after its last checkpointed page. Completed units are
    /// left out entirely.
    pub fn enumerate(&self, progress: &ProgressState) -> Enumeration {
        let [parent_dim, child_dim] = &self.domain.dimensions;
        let mut units = Vec::new();
        let mut completed = 0;

        for group in &self.domain.groups {
            for item in &group.items {
                let key = UnitKey::new(group.id.clone(), item.id.clone());

                let start_page = match progress.entry(&key) {
                    Some(entry) if entry.completed => {
                        completed += 1;
                        continue;
                    }
                    Some(entry) => entry.last_page + 1,
                    None => 1,
                };

                units.push(WorkUnit {
                    dimensions: vec![
                        (parent_dim.clone(), group.id.clone()),
                        (child_dim.clone(), item.id.clone()),
                    ],
                    label: format!("{} > {}", group.name, item.name),
                    key,
                    start_page,
                });
            }
        }

        Enumeration {
            units,
            total: self.domain.unit_count(),
            completed,
        }
    }
}
