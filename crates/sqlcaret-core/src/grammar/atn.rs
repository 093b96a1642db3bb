//! Augmented transition network compiled from the grammar rules.
//!
//! Each rule owns a start and a stop state. Elements are wired between them
//! by Thompson construction: tokens become atom transitions, rule references
//! become rule transitions that remember where to resume, and every
//! repetition or alternative is expressed with epsilon transitions.

use super::{Element, Label, Rule};

pub type StateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Basic,
    RuleStart,
    RuleStop,
}

#[derive(Debug, Clone)]
pub enum Transition {
    Epsilon {
        target: StateId,
    },
    Atom {
        target: StateId,
        label: Label,
    },
    /// Enter `rule` at `target` and continue at `follow` once it ends.
    Rule {
        rule: Rule,
        target: StateId,
        follow: StateId,
    },
}

impl Transition {
    pub fn target(&self) -> StateId {
        match self {
            Transition::Epsilon { target }
            | Transition::Atom { target, .. }
            | Transition::Rule { target, .. } => *target,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AtnState {
    pub id: StateId,
    pub rule: Rule,
    pub kind: StateKind,
    pub transitions: Vec<Transition>,
}

#[derive(Debug)]
pub struct Atn {
    states: Vec<AtnState>,
    rule_starts: Vec<StateId>,
    rule_stops: Vec<StateId>,
}

impl Atn {
    pub(crate) fn build(definitions: Vec<(Rule, Element)>) -> Self {
        let mut atn = Atn {
            states: Vec::new(),
            rule_starts: vec![0; Rule::ALL.len()],
            rule_stops: vec![0; Rule::ALL.len()],
        };
        for rule in Rule::ALL {
            atn.rule_starts[rule.index()] = atn.add_state(*rule, StateKind::RuleStart);
            atn.rule_stops[rule.index()] = atn.add_state(*rule, StateKind::RuleStop);
        }
        for (rule, element) in &definitions {
            let start = atn.rule_starts[rule.index()];
            let stop = atn.rule_stops[rule.index()];
            let exit = atn.wire(*rule, element, start);
            atn.link(exit, Transition::Epsilon { target: stop });
        }
        atn
    }

    pub fn state(&self, id: StateId) -> &AtnState {
        &self.states[id]
    }

    pub fn rule_start(&self, rule: Rule) -> StateId {
        self.rule_starts[rule.index()]
    }

    pub fn rule_stop(&self, rule: Rule) -> StateId {
        self.rule_stops[rule.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn add_state(&mut self, rule: Rule, kind: StateKind) -> StateId {
        let id = self.states.len();
        self.states.push(AtnState {
            id,
            rule,
            kind,
            transitions: Vec::new(),
        });
        id
    }

    fn link(&mut self, from: StateId, transition: Transition) {
        self.states[from].transitions.push(transition);
    }

    /// Wires `element` starting at `entry` and returns the exit state.
    fn wire(&mut self, rule: Rule, element: &Element, entry: StateId) -> StateId {
        match element {
            Element::Label(label) => {
                let target = self.add_state(rule, StateKind::Basic);
                self.link(
                    entry,
                    Transition::Atom {
                        target,
                        label: label.clone(),
                    },
                );
                target
            }
            Element::Rule(callee) => {
                let follow = self.add_state(rule, StateKind::Basic);
                let target = self.rule_start(*callee);
                self.link(
                    entry,
                    Transition::Rule {
                        rule: *callee,
                        target,
                        follow,
                    },
                );
                follow
            }
            Element::Seq(items) => items
                .iter()
                .fold(entry, |current, item| self.wire(rule, item, current)),
            Element::Alt(branches) => {
                let exit = self.add_state(rule, StateKind::Basic);
                for branch in branches {
                    let start = self.add_state(rule, StateKind::Basic);
                    self.link(entry, Transition::Epsilon { target: start });
                    let end = self.wire(rule, branch, start);
                    self.link(end, Transition::Epsilon { target: exit });
                }
                exit
            }
            Element::Optional(inner) => {
                let exit = self.add_state(rule, StateKind::Basic);
                let start = self.add_state(rule, StateKind::Basic);
                self.link(entry, Transition::Epsilon { target: start });
                self.link(entry, Transition::Epsilon { target: exit });
                let end = self.wire(rule, inner, start);
                self.link(end, Transition::Epsilon { target: exit });
                exit
            }
            Element::Star(inner) => {
                let hub = self.add_state(rule, StateKind::Basic);
                self.link(entry, Transition::Epsilon { target: hub });
                let start = self.add_state(rule, StateKind::Basic);
                let exit = self.add_state(rule, StateKind::Basic);
                self.link(hub, Transition::Epsilon { target: start });
                self.link(hub, Transition::Epsilon { target: exit });
                let end = self.wire(rule, inner, start);
                self.link(end, Transition::Epsilon { target: hub });
                exit
            }
        }
    }
}
