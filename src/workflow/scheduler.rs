//! Dependency scheduling: tasks to ordered batches

use crate::config::Task;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors resolving an execution order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("task '{task}' depends on non-existent task '{dependency}'")]
    MissingDependency { task: String, dependency: String },

    #[error("task name '{task}' is used more than once")]
    DuplicateTask { task: String },

    #[error("circular dependency detected: {unresolved} task(s) could not be scheduled")]
    CycleDetected { unresolved: usize },
}

/// Ordered batches of tasks
///
/// Tasks in one batch have no dependency edges among themselves and only
/// depend on tasks of earlier batches. Each batch is sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPlan<'a> {
    batches: Vec<Vec<&'a Task>>,
}

impl<'a> BatchPlan<'a> {
    /// Number of batches
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total number of tasks across all batches
    pub fn task_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Iterate batches in execution order
    pub fn iter(&self) -> impl Iterator<Item = &[&'a Task]> {
        self.batches.iter().map(Vec::as_slice)
    }

    /// Task names per batch
    pub fn names(&self) -> Vec<Vec<&'a str>> {
        self.batches
            .iter()
            .map(|batch| batch.iter().map(|t| t.name.as_str()).collect())
            .collect()
    }

    /// Index of the batch containing a task
    pub fn batch_index(&self, task: &str) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|t| t.name == task))
    }
}

/// Resolve the execution order of tasks into batches
///
/// Layered Kahn's algorithm over name-ordered indices: every pass takes the
/// whole ready set as one batch, and successors that become ready go to the
/// next batch. The result is independent of input order.
pub fn resolve_task_order(tasks: &[Task]) -> Result<BatchPlan<'_>, SchedulerError> {
    // Arena indices follow name order, so sorted index sets are name-sorted
    let mut order: Vec<&Task> = tasks.iter().collect();
    order.sort_by(|a, b| a.name.cmp(&b.name));

    let mut index: HashMap<&str, usize> = HashMap::with_capacity(order.len());
    for (i, task) in order.iter().enumerate() {
        if index.insert(task.name.as_str(), i).is_some() {
            return Err(SchedulerError::DuplicateTask {
                task: task.name.clone(),
            });
        }
    }

    for task in &order {
        for dep in &task.depends_on {
            if !index.contains_key(dep.as_str()) {
                return Err(SchedulerError::MissingDependency {
                    task: task.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // Edges run dependency -> dependent
    let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); order.len()];
    let mut in_degree = vec![0usize; order.len()];
    for (i, task) in order.iter().enumerate() {
        for dep in &task.depends_on {
            if successors[index[dep.as_str()]].insert(i) {
                in_degree[i] += 1;
            }
        }
    }

    let mut ready: Vec<usize> = (0..order.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut batches = Vec::new();
    let mut resolved = 0;

    while !ready.is_empty() {
        let mut next = Vec::new();
        for &node in &ready {
            for &succ in &successors[node] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    next.push(succ);
                }
            }
        }

        resolved += ready.len();
        batches.push(ready.iter().map(|&i| order[i]).collect());

        next.sort_unstable();
        ready = next;
    }

    if resolved != order.len() {
        return Err(SchedulerError::CycleDetected {
            unresolved: order.len() - resolved,
        });
    }

    let plan = BatchPlan { batches };
    tracing::debug!(batches = plan.len(), tasks = plan.task_count(), "Resolved task order");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(name: &str, deps: &[&str]) -> Task {
        Task::new(name, "dummy", "dummy").with_depends_on(deps.iter().copied())
    }

    #[test]
    fn test_linear_dependency() {
        let tasks = vec![t("C", &["B"]), t("B", &["A"]), t("A", &[])];
        let plan = resolve_task_order(&tasks).unwrap();
        assert_eq!(plan.names(), vec![vec!["A"], vec!["B"], vec!["C"]]);
    }

    #[test]
    fn test_parallel_tasks() {
        let tasks = vec![t("A", &[]), t("B", &[]), t("C", &["A", "B"])];
        let plan = resolve_task_order(&tasks).unwrap();
        assert_eq!(plan.names(), vec![vec!["A", "B"], vec!["C"]]);
    }

    #[test]
    fn test_no_dependencies() {
        let tasks = vec![t("C", &[]), t("A", &[]), t("B", &[])];
        let plan = resolve_task_order(&tasks).unwrap();
        assert_eq!(plan.names(), vec![vec!["A", "B", "C"]]);
    }

    #[test]
    fn test_diamond_dependency() {
        let tasks = vec![
            t("A", &[]),
            t("B", &["A"]),
            t("C", &["A"]),
            t("D", &["B", "C"]),
        ];
        let plan = resolve_task_order(&tasks).unwrap();
        assert_eq!(plan.names(), vec![vec!["A"], vec!["B", "C"], vec!["D"]]);
    }

    #[test]
    fn test_uneven_layers() {
        // "late" only depends on a root, so it runs with the second layer
        let tasks = vec![
            t("root", &[]),
            t("mid", &["root"]),
            t("leaf", &["mid"]),
            t("late", &["root"]),
            t("solo", &[]),
        ];
        let plan = resolve_task_order(&tasks).unwrap();
        assert_eq!(
            plan.names(),
            vec![vec!["root", "solo"], vec!["late", "mid"], vec!["leaf"]]
        );
        assert_eq!(plan.batch_index("leaf"), Some(2));
        assert_eq!(plan.batch_index("nope"), None);
    }

    #[test]
    fn test_deterministic_under_permutation() {
        let tasks = vec![
            t("fetch", &[]),
            t("summarize", &["fetch"]),
            t("critique", &["fetch"]),
            t("report", &["summarize", "critique"]),
            t("notify", &[]),
        ];
        let expected = resolve_task_order(&tasks).unwrap().names();

        let mut reversed = tasks.clone();
        reversed.reverse();
        assert_eq!(resolve_task_order(&reversed).unwrap().names(), expected);

        let mut rotated = tasks.clone();
        rotated.rotate_left(2);
        assert_eq!(resolve_task_order(&rotated).unwrap().names(), expected);
    }

    #[test]
    fn test_edges_point_forward() {
        let tasks = vec![
            t("a", &[]),
            t("b", &["a"]),
            t("c", &["a", "b"]),
            t("d", &["c"]),
            t("e", &["a"]),
            t("f", &["e", "d"]),
        ];
        let plan = resolve_task_order(&tasks).unwrap();
        assert_eq!(plan.task_count(), tasks.len());

        for task in &tasks {
            let own = plan.batch_index(&task.name).unwrap();
            for dep in &task.depends_on {
                assert!(plan.batch_index(dep).unwrap() < own);
            }
        }
    }

    #[test]
    fn test_duplicate_dependency_entries() {
        let tasks = vec![t("A", &[]), t("B", &["A", "A"])];
        let plan = resolve_task_order(&tasks).unwrap();
        assert_eq!(plan.names(), vec![vec!["A"], vec!["B"]]);
    }

    #[test]
    fn test_empty_task_list() {
        let plan = resolve_task_order(&[]).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.task_count(), 0);
    }

    #[test]
    fn test_circular_dependency() {
        let tasks = vec![t("A", &["B"]), t("B", &["A"])];
        let err = resolve_task_order(&tasks).unwrap_err();
        assert_eq!(err, SchedulerError::CycleDetected { unresolved: 2 });
        assert!(err.to_string().contains("circular dependency detected"));
    }

    #[test]
    fn test_cycle_behind_valid_prefix() {
        let tasks = vec![
            t("start", &[]),
            t("x", &["start", "z"]),
            t("y", &["x"]),
            t("z", &["y"]),
        ];
        let err = resolve_task_order(&tasks).unwrap_err();
        assert_eq!(err, SchedulerError::CycleDetected { unresolved: 3 });
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let tasks = vec![t("A", &["A"])];
        assert!(matches!(
            resolve_task_order(&tasks),
            Err(SchedulerError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_missing_dependency() {
        let tasks = vec![t("A", &["B"])];
        let err = resolve_task_order(&tasks).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::MissingDependency {
                task: "A".into(),
                dependency: "B".into(),
            }
        );
        assert!(err.to_string().contains("depends on non-existent task 'B'"));
    }

    #[test]
    fn test_duplicate_task_name() {
        let tasks = vec![t("A", &[]), t("A", &[])];
        assert_eq!(
            resolve_task_order(&tasks).unwrap_err(),
            SchedulerError::DuplicateTask { task: "A".into() }
        );
    }
}
