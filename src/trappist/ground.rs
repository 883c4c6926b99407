//! A small ground solver for the siphon logic programs.
//!
//! The programs produced by the encoder are plain propositional constraints
//! over the place atoms, so instead of an ASP system we can enumerate their
//! models directly: a DPLL search with unit propagation, combined with
//! grow/shrink loops and blocking clauses to emit exactly the subset-maximal,
//! subset-minimal, or all models, matching the `domRec`/`dom-mod` enumeration
//! of the external solver.

/// A literal: atom index plus polarity.
pub type Lit = (usize, bool);

/// Which models of the constraint set should be enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnumerationMode {
    /// Subset-maximal models (with respect to true atoms).
    Maximal,
    /// Subset-minimal models.
    Minimal,
    /// All models.
    All,
}

/// A mutable clause database with a basic DPLL procedure.
pub struct GroundSolver {
    num_atoms: usize,
    clauses: Vec<Vec<Lit>>,
}

impl GroundSolver {
    pub fn new(num_atoms: usize) -> GroundSolver {
        GroundSolver {
            num_atoms,
            clauses: Vec::new(),
        }
    }

    pub fn add_clause(&mut self, clause: Vec<Lit>) {
        self.clauses.push(clause);
    }

    /// Find a model extending the given assumptions, or `None` if unsatisfiable.
    /// An optional extra clause is enforced on top of the database.
    fn solve(&self, assumptions: &[Lit], extra: Option<&[Lit]>) -> Option<Vec<bool>> {
        let mut assignment: Vec<Option<bool>> = vec![None; self.num_atoms];
        for (atom, value) in assumptions {
            match assignment[*atom] {
                Some(existing) if existing != *value => return None,
                _ => assignment[*atom] = Some(*value),
            }
        }
        if !self.propagate(&mut assignment, extra) {
            return None;
        }
        self.search(assignment, extra)
    }

    fn search(&self, assignment: Vec<Option<bool>>, extra: Option<&[Lit]>) -> Option<Vec<bool>> {
        let branch_atom = (0..self.num_atoms).find(|a| assignment[*a].is_none());
        let Some(atom) = branch_atom else {
            // Everything is assigned and propagation succeeded.
            return Some(assignment.into_iter().map(|v| v.unwrap()).collect());
        };
        for value in [false, true] {
            let mut candidate = assignment.clone();
            candidate[atom] = Some(value);
            if self.propagate(&mut candidate, extra) {
                if let Some(model) = self.search(candidate, extra) {
                    return Some(model);
                }
            }
        }
        None
    }

    /// Exhaustive unit propagation. Returns `false` on conflict.
    fn propagate(&self, assignment: &mut [Option<bool>], extra: Option<&[Lit]>) -> bool {
        let mut changed = true;
        while changed {
            changed = false;
            let extra_iter = extra.iter().map(|c| *c);
            for clause in self.clauses.iter().map(|c| c.as_slice()).chain(extra_iter) {
                let mut satisfied = false;
                let mut unassigned: Option<Lit> = None;
                let mut unassigned_count = 0;
                for (atom, value) in clause {
                    match assignment[*atom] {
                        Some(assigned) if assigned == *value => {
                            satisfied = true;
                            break;
                        }
                        Some(_) => {}
                        None => {
                            unassigned = Some((*atom, *value));
                            unassigned_count += 1;
                        }
                    }
                }
                if satisfied {
                    continue;
                }
                match (unassigned_count, unassigned) {
                    (0, _) => return false,
                    (1, Some((atom, value))) => {
                        assignment[atom] = Some(value);
                        changed = true;
                    }
                    _ => {}
                }
            }
        }
        true
    }

    /// Enumerate models of the requested kind. The callback can stop the
    /// enumeration early by returning `false`.
    pub fn enumerate(
        &mut self,
        mode: EnumerationMode,
        on_model: &mut dyn FnMut(&[bool]) -> bool,
    ) -> Result<(), String> {
        match mode {
            EnumerationMode::All => self.enumerate_all(on_model),
            EnumerationMode::Maximal => self.enumerate_maximal(on_model),
            EnumerationMode::Minimal => self.enumerate_minimal(on_model),
        }
        Ok(())
    }

    fn enumerate_all(&mut self, on_model: &mut dyn FnMut(&[bool]) -> bool) {
        while let Some(model) = self.solve(&[], None) {
            if !on_model(&model) {
                return;
            }
            // Block exactly this model.
            let blocking: Vec<Lit> = model
                .iter()
                .enumerate()
                .map(|(atom, value)| (atom, !*value))
                .collect();
            self.add_clause(blocking);
        }
    }

    fn enumerate_maximal(&mut self, on_model: &mut dyn FnMut(&[bool]) -> bool) {
        while let Some(mut model) = self.solve(&[], None) {
            // Grow the model until no proper superset is a model.
            loop {
                let assumptions: Vec<Lit> = true_atoms(&model).map(|a| (a, true)).collect();
                let extension: Vec<Lit> = false_atoms(&model).map(|a| (a, true)).collect();
                if extension.is_empty() {
                    break;
                }
                match self.solve(&assumptions, Some(&extension)) {
                    Some(larger) => model = larger,
                    None => break,
                }
            }
            if !on_model(&model) {
                return;
            }
            // Block this model and all its subsets: some atom outside it must hold.
            let blocking: Vec<Lit> = false_atoms(&model).map(|a| (a, true)).collect();
            self.add_clause(blocking);
        }
    }

    fn enumerate_minimal(&mut self, on_model: &mut dyn FnMut(&[bool]) -> bool) {
        while let Some(mut model) = self.solve(&[], None) {
            // Shrink the model until no proper subset is a model.
            loop {
                let assumptions: Vec<Lit> = false_atoms(&model).map(|a| (a, false)).collect();
                let reduction: Vec<Lit> = true_atoms(&model).map(|a| (a, false)).collect();
                if reduction.is_empty() {
                    break;
                }
                match self.solve(&assumptions, Some(&reduction)) {
                    Some(smaller) => model = smaller,
                    None => break,
                }
            }
            if !on_model(&model) {
                return;
            }
            // Block this model and all its supersets: some atom of it must be false.
            let blocking: Vec<Lit> = true_atoms(&model).map(|a| (a, false)).collect();
            self.add_clause(blocking);
        }
    }
}

fn true_atoms(model: &[bool]) -> impl Iterator<Item = usize> + '_ {
    model
        .iter()
        .enumerate()
        .filter(|(_, v)| **v)
        .map(|(a, _)| a)
}

fn false_atoms(model: &[bool]) -> impl Iterator<Item = usize> + '_ {
    model
        .iter()
        .enumerate()
        .filter(|(_, v)| !**v)
        .map(|(a, _)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(solver: &mut GroundSolver, mode: EnumerationMode) -> Vec<Vec<usize>> {
        let mut models: Vec<Vec<usize>> = Vec::new();
        solver
            .enumerate(mode, &mut |model| {
                models.push(true_atoms(model).collect());
                true
            })
            .unwrap();
        models.sort();
        models
    }

    #[test]
    fn test_enumerate_maximal() {
        // Atoms {0, 1, 2}, constraint: not both 0 and 1.
        let mut solver = GroundSolver::new(3);
        solver.add_clause(vec![(0, false), (1, false)]);
        let models = collect(&mut solver, EnumerationMode::Maximal);
        // Maximal models: {0, 2} and {1, 2}.
        assert_eq!(models, vec![vec![0, 2], vec![1, 2]]);
    }

    #[test]
    fn test_enumerate_minimal() {
        // Constraint: 0 or 1 must hold, and 2 follows from 1.
        let mut solver = GroundSolver::new(3);
        solver.add_clause(vec![(0, true), (1, true)]);
        solver.add_clause(vec![(1, false), (2, true)]);
        let models = collect(&mut solver, EnumerationMode::Minimal);
        // Minimal models: {0} and {1, 2}.
        assert_eq!(models, vec![vec![0], vec![1, 2]]);
    }

    #[test]
    fn test_enumerate_all_with_limit() {
        let mut solver = GroundSolver::new(2);
        let mut count = 0;
        solver
            .enumerate(EnumerationMode::All, &mut |_| {
                count += 1;
                count < 3
            })
            .unwrap();
        // Four models exist, but the callback stops the enumeration at three.
        assert_eq!(count, 3);
    }

    #[test]
    fn test_unsatisfiable() {
        let mut solver = GroundSolver::new(1);
        solver.add_clause(vec![(0, true)]);
        solver.add_clause(vec![(0, false)]);
        assert!(collect(&mut solver, EnumerationMode::All).is_empty());
    }
}
