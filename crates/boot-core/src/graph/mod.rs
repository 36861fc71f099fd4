//! Tasks and the validated dependency graph they form.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{BootContext, BootError};

/// A named unit of bring-up work.
///
/// The name is the task's identity: two values with the same name are the same node. `run` is
/// called exactly once per boot and is expected to wait for its dependencies through
/// [`BootContext::wait_for`] before doing dependent work.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    fn name(&self) -> String;

    fn depends(&self) -> Vec<TaskRef> {
        Vec::new()
    }

    /// Bring the task up. Returning `Ok` marks it ready; errors after that (a background
    /// service exiting, say) go through `fail`.
    async fn run(
        &self,
        cancel: CancellationToken,
        fail: Fail,
        ctx: Arc<BootContext>,
    ) -> Result<(), BootError>;
}

pub type TaskRef = Arc<dyn Task>;

/// Failure-report callback handed to every task.
#[derive(Clone)]
pub struct Fail(Arc<dyn Fn(BootError) + Send + Sync>);

impl Fail {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(BootError) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn report(&self, err: BootError) {
        (self.0)(err)
    }
}

impl fmt::Debug for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fail")
    }
}

/// Tasks plus everything they depend on, deduplicated by name and checked for cycles.
pub struct TaskGraph {
    tasks: Vec<TaskRef>,
    deps: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    /// Build the graph from `tasks`.
    ///
    /// Tasks reachable only as dependencies are added after the listed ones; for a repeated
    /// name the first instance seen wins.
    pub fn new(tasks: Vec<TaskRef>) -> Result<Self, BootError> {
        let mut graph = Self {
            tasks: Vec::new(),
            deps: Vec::new(),
            index: HashMap::new(),
        };
        let mut queue: VecDeque<TaskRef> = tasks.into();
        while let Some(task) = queue.pop_front() {
            let name = task.name();
            if graph.index.contains_key(&name) {
                continue;
            }
            let deps = task.depends();
            graph.deps.push(deps.iter().map(|d| d.name()).collect());
            graph.index.insert(name, graph.tasks.len());
            graph.tasks.push(task);
            queue.extend(deps);
        }
        graph.check_cycles()?;
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[TaskRef] {
        &self.tasks
    }

    pub fn names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Declared dependency names of `name`.
    pub fn depends(&self, name: &str) -> Option<&[String]> {
        self.index.get(name).map(|&i| self.deps[i].as_slice())
    }

    fn check_cycles(&self) -> Result<(), BootError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let mut marks = vec![Mark::New; self.tasks.len()];
        let mut path = Vec::new();

        fn visit(
            g: &TaskGraph,
            i: usize,
            marks: &mut [Mark],
            path: &mut Vec<usize>,
        ) -> Result<(), BootError> {
            match marks[i] {
                Mark::Done => return Ok(()),
                Mark::Active => {
                    let start = path.iter().position(|&p| p == i).unwrap_or(0);
                    let mut names: Vec<String> =
                        path[start..].iter().map(|&p| g.tasks[p].name()).collect();
                    names.push(g.tasks[i].name());
                    return Err(BootError::Cycle(names));
                }
                Mark::New => {}
            }
            marks[i] = Mark::Active;
            path.push(i);
            for dep in &g.deps[i] {
                let j = g.index[dep];
                visit(g, j, marks, path)?;
            }
            path.pop();
            marks[i] = Mark::Done;
            Ok(())
        }

        for i in 0..self.tasks.len() {
            visit(self, i, &mut marks, &mut path)?;
        }
        Ok(())
    }
}
