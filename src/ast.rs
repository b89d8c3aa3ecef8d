// Push/Pop Calculus Implementation
//
// Based on the push/pop calculus of section 1.2 of "The Relational Machine Calculus"
// https://arxiv.org/abs/2405.10801
//
// Licensed under Creative Commons Attribution 4.0 International License
// https://creativecommons.org/licenses/by/4.0/

// src/ast.rs
// Core syntax for the push/pop calculus: variables, terms and operations

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// Carrier and Location bounds
// ============================================================================

/// Values carried on the stacks
pub trait Carrier: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> Carrier for T where T: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

/// Names of the stacks in a memory
pub trait Location: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

impl<T> Location for T where T: Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {}

// ============================================================================
// Variables
// ============================================================================

/// A symbolic variable. Identity is by name; `local` marks variables
/// introduced by a new-variable scope.
#[derive(Debug, Clone)]
pub struct Var {
    pub name: String,
    pub local: bool,
}

impl Var {
    pub fn new(s: impl Into<String>) -> Self {
        Var { name: s.into(), local: false }
    }

    pub fn local(s: impl Into<String>) -> Self {
        Var { name: s.into(), local: true }
    }

    /// The local variable `base#index`. Names built with `Var::new` are
    /// expected not to contain `#`.
    pub fn indexed(base: &str, index: usize) -> Self {
        let base = base.split('#').next().unwrap_or(base);
        Var::local(format!("{}#{}", base, index))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Var {}

impl Hash for Var {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Var {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Var {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

// ============================================================================
// Cells
// ============================================================================

/// Contents of a stack cell or a substitution entry: either a concrete
/// value or a reference to a (possibly still unbound) variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell<V> {
    Value(V),
    Ref(Var),
}

impl<V> Cell<V> {
    pub fn as_value(&self) -> Option<&V> {
        match self {
            Cell::Value(v) => Some(v),
            Cell::Ref(_) => None,
        }
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Cell::Ref(x) => Some(x),
            Cell::Value(_) => None,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Cell::Ref(_))
    }
}

// ============================================================================
// Terms
// ============================================================================

/// Evaluation rule attached to a function term
pub type Evaluator<V> = Arc<dyn Fn(&[V]) -> V + Send + Sync>;

/// A function node. `arguments.len()` must equal `arity`; evaluation
/// reports an arity mismatch otherwise.
#[derive(Clone)]
pub struct FuncTerm<V> {
    pub label: String,
    pub arity: usize,
    pub arguments: Vec<Term<V>>,
    pub evaluate: Evaluator<V>,
}

impl<V> fmt::Debug for FuncTerm<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FuncTerm")
            .field("label", &self.label)
            .field("arity", &self.arity)
            .field("arguments", &self.arguments)
            .finish()
    }
}

// Evaluation rules cannot be compared, so two function terms are equal
// when their labels, arities and argument trees are.
impl<V> PartialEq for FuncTerm<V> {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.arity == other.arity && self.arguments == other.arguments
    }
}

pub enum Term<V> {
    Var(Var),
    Func(FuncTerm<V>),
}

impl<V> Clone for Term<V> {
    fn clone(&self) -> Self {
        match self {
            Term::Var(x) => Term::Var(x.clone()),
            Term::Func(func) => Term::Func(FuncTerm {
                label: func.label.clone(),
                arity: func.arity,
                arguments: func.arguments.clone(),
                evaluate: Arc::clone(&func.evaluate),
            }),
        }
    }
}

impl<V> fmt::Debug for Term<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Var(x) => f.debug_tuple("Var").field(&x.name).finish(),
            Term::Func(func) => func.fmt(f),
        }
    }
}

impl<V> PartialEq for Term<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Term::Var(x), Term::Var(y)) => x == y,
            (Term::Func(f1), Term::Func(f2)) => f1 == f2,
            _ => false,
        }
    }
}

impl<V> Term<V> {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(Var::new(name))
    }

    /// A function node with an explicit arity, which may disagree with the
    /// number of arguments supplied.
    pub fn func<F>(label: impl Into<String>, arity: usize, arguments: Vec<Term<V>>, evaluate: F) -> Self
    where
        F: Fn(&[V]) -> V + Send + Sync + 'static,
    {
        Term::Func(FuncTerm {
            label: label.into(),
            arity,
            arguments,
            evaluate: Arc::new(evaluate),
        })
    }

    /// A function node whose arity is the number of arguments
    pub fn apply<F>(label: impl Into<String>, arguments: Vec<Term<V>>, evaluate: F) -> Self
    where
        F: Fn(&[V]) -> V + Send + Sync + 'static,
    {
        let arity = arguments.len();
        Term::func(label, arity, arguments, evaluate)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Term::Var(_))
    }

    pub fn as_var(&self) -> Option<&Var> {
        match self {
            Term::Var(x) => Some(x),
            Term::Func(_) => None,
        }
    }

    pub fn free_vars(&self) -> BTreeSet<Var> {
        let mut fvs = BTreeSet::new();
        self.collect_vars(&mut fvs);
        fvs
    }

    fn collect_vars(&self, acc: &mut BTreeSet<Var>) {
        match self {
            Term::Var(x) => {
                acc.insert(x.clone());
            }
            Term::Func(func) => {
                for arg in &func.arguments {
                    arg.collect_vars(acc);
                }
            }
        }
    }

    /// Replace every occurrence of `old` by `new`
    pub fn rename(&self, old: &Var, new: &Var) -> Self {
        match self {
            Term::Var(x) if x == old => Term::Var(new.clone()),
            Term::Var(x) => Term::Var(x.clone()),
            Term::Func(func) => Term::Func(FuncTerm {
                label: func.label.clone(),
                arity: func.arity,
                arguments: func.arguments.iter().map(|arg| arg.rename(old, new)).collect(),
                evaluate: Arc::clone(&func.evaluate),
            }),
        }
    }
}

impl<V> Term<V>
where
    V: Clone + fmt::Display + Send + Sync + 'static,
{
    /// A literal: a nullary function term returning `value`
    pub fn constant(value: V) -> Self {
        let label = value.to_string();
        Term::apply(label, vec![], move |_| value.clone())
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Discriminant of an operation, for closed-world inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Continue,
    Fail,
    Sequence,
    Branch,
    Iterate,
    Push,
    Pop,
    NewVar,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation<V, L> {
    Continue,
    Fail,
    Sequence(Box<Operation<V, L>>, Box<Operation<V, L>>),
    Branch(Box<Operation<V, L>>, Box<Operation<V, L>>),
    Iterate(Box<Operation<V, L>>),
    Push(Term<V>, L),
    Pop(Term<V>, L),
    NewVar(Var, Box<Operation<V, L>>),
}

impl<V, L> Operation<V, L> {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Continue => OperationKind::Continue,
            Operation::Fail => OperationKind::Fail,
            Operation::Sequence(_, _) => OperationKind::Sequence,
            Operation::Branch(_, _) => OperationKind::Branch,
            Operation::Iterate(_) => OperationKind::Iterate,
            Operation::Push(_, _) => OperationKind::Push,
            Operation::Pop(_, _) => OperationKind::Pop,
            Operation::NewVar(_, _) => OperationKind::NewVar,
        }
    }

    /// Variables occurring free, i.e. not captured by an enclosing `NewVar`
    pub fn free_vars(&self) -> BTreeSet<Var> {
        match self {
            Operation::Continue | Operation::Fail => BTreeSet::new(),
            Operation::Sequence(a, b) | Operation::Branch(a, b) => {
                let mut fvs = a.free_vars();
                fvs.extend(b.free_vars());
                fvs
            }
            Operation::Iterate(body) => body.free_vars(),
            Operation::Push(t, _) | Operation::Pop(t, _) => t.free_vars(),
            Operation::NewVar(x, body) => {
                let mut fvs = body.free_vars();
                fvs.remove(x);
                fvs
            }
        }
    }
}

impl<V: Clone, L: Clone> Operation<V, L> {
    /// Rename free occurrences of `old` to `new`. A nested `NewVar` binding
    /// `old` shadows it.
    pub fn rename(&self, old: &Var, new: &Var) -> Self {
        match self {
            Operation::Continue => Operation::Continue,
            Operation::Fail => Operation::Fail,
            Operation::Sequence(a, b) => {
                Operation::Sequence(Box::new(a.rename(old, new)), Box::new(b.rename(old, new)))
            }
            Operation::Branch(a, b) => {
                Operation::Branch(Box::new(a.rename(old, new)), Box::new(b.rename(old, new)))
            }
            Operation::Iterate(body) => Operation::Iterate(Box::new(body.rename(old, new))),
            Operation::Push(t, l) => Operation::Push(t.rename(old, new), l.clone()),
            Operation::Pop(t, l) => Operation::Pop(t.rename(old, new), l.clone()),
            Operation::NewVar(x, body) if x == old => Operation::NewVar(x.clone(), body.clone()),
            Operation::NewVar(x, body) => {
                Operation::NewVar(x.clone(), Box::new(body.rename(old, new)))
            }
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl<V, L> Operation<V, L> {
    pub fn seq(first: Operation<V, L>, second: Operation<V, L>) -> Self {
        Operation::Sequence(Box::new(first), Box::new(second))
    }

    pub fn branch(left: Operation<V, L>, right: Operation<V, L>) -> Self {
        Operation::Branch(Box::new(left), Box::new(right))
    }

    pub fn iterate(body: Operation<V, L>) -> Self {
        Operation::Iterate(Box::new(body))
    }

    pub fn push(term: Term<V>, location: L) -> Self {
        Operation::Push(term, location)
    }

    pub fn pop(term: Term<V>, location: L) -> Self {
        Operation::Pop(term, location)
    }

    pub fn push_var(name: impl Into<String>, location: L) -> Self {
        Operation::Push(Term::var(name), location)
    }

    pub fn pop_var(name: impl Into<String>, location: L) -> Self {
        Operation::Pop(Term::var(name), location)
    }

    pub fn new_var(x: Var, body: Operation<V, L>) -> Self {
        Operation::NewVar(x, Box::new(body))
    }

    /// Right-nested sequence of `ops`; the empty sequence is `Continue`
    pub fn sequence_of(ops: impl IntoIterator<Item = Operation<V, L>>) -> Self {
        let ops: Vec<_> = ops.into_iter().collect();
        ops.into_iter()
            .rev()
            .reduce(|rest, op| Operation::seq(op, rest))
            .unwrap_or(Operation::Continue)
    }
}
