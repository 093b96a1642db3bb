//! Follow-set candidate collection.
//!
//! Given the tokens from a starting rule up to the caret, this walks the
//! grammar network the way a parser would, forking at every alternative,
//! and records what may appear at the caret: raw tokens, or preferred rules
//! that the completer resolves into names. Per-state follow sets depend on
//! the grammar alone, so they are cached process-wide in
//! [`FollowSetsByState`] and shared by all requests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::grammar::{Atn, Label, Rule, StateId, StateKind, Transition};
use crate::lexer::{Token, TokenType};

/// Deepest rule nesting followed before a branch is abandoned.
pub const MAX_RECURSION_DEPTH: usize = 66;

/// Longest keyword chain collected after a candidate token.
const MAX_FOLLOWING_TOKENS: usize = 8;

/// Grammar-specific knobs of the collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Tokens never offered as candidates.
    pub ignored_tokens: HashSet<TokenType>,
    /// Rules reported as a whole instead of by their tokens.
    pub preferred_rules: BTreeSet<Rule>,
    /// Query rule whose frames collect select-item aliases.
    pub query_rule: Rule,
    /// Outer query rule, collecting aliases and CTE definitions.
    pub shadow_query_rule: Rule,
    pub select_item_alias_rule: Rule,
    pub cte_rule: Rule,
}

impl CollectorConfig {
    fn is_ignored(&self, token_type: TokenType) -> bool {
        self.ignored_tokens.contains(&token_type)
    }
}

/// One rule on the path that led to a candidate, with what the collector
/// learned while inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleContext {
    pub rule: Rule,
    /// Stream indices of select-item alias names seen in this query.
    pub select_item_aliases: Vec<usize>,
    /// Stream indices at which CTE definitions of this query start.
    pub ctes: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatesCollection {
    /// Candidate tokens with the keyword chain that always follows them.
    pub tokens: BTreeMap<TokenType, Vec<TokenType>>,
    /// Preferred rules reachable at the caret with the rule path leading to
    /// them, outermost first, the rule itself excluded.
    pub rules: BTreeMap<Rule, Vec<RuleContext>>,
}

#[derive(Debug, Clone)]
struct FollowSetWithPath {
    /// `None` marks the end of the rule.
    label: Option<Label>,
    path: Vec<Rule>,
    following: Vec<TokenType>,
}

/// Everything that may come first from one state, up to the end of its rule.
#[derive(Debug, Default)]
pub struct FollowSetsHolder {
    sets: Vec<FollowSetWithPath>,
    can_end: bool,
}

impl FollowSetsHolder {
    fn accepts(&self, token_type: TokenType) -> bool {
        self.sets
            .iter()
            .filter_map(|set| set.label.as_ref())
            .any(|label| label.matches(token_type))
    }
}

/// Process-wide cache of follow sets keyed by network state.
///
/// Entries are a pure function of the grammar, so racing writers store
/// identical values and readers never observe a partial entry.
#[derive(Debug, Default)]
pub struct FollowSetsByState {
    map: RwLock<HashMap<StateId, Arc<FollowSetsHolder>>>,
}

impl FollowSetsByState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_collect(
        &self,
        atn: &Atn,
        state: StateId,
        config: &CollectorConfig,
    ) -> Arc<FollowSetsHolder> {
        if let Some(holder) = self
            .map
            .read()
            .ok()
            .and_then(|map| map.get(&state).cloned())
        {
            return holder;
        }

        let holder = Arc::new(determine_follow_sets(atn, state, config));
        match self.map.write() {
            Ok(mut map) => map.entry(state).or_insert(holder).clone(),
            Err(_) => holder,
        }
    }
}

fn determine_follow_sets(atn: &Atn, start: StateId, config: &CollectorConfig) -> FollowSetsHolder {
    let stop = atn.rule_stop(atn.state(start).rule);
    let mut sets = Vec::new();
    let mut seen = HashSet::new();
    let mut rule_stack = Vec::new();
    collect_follow_sets(atn, start, stop, &mut sets, &mut seen, &mut rule_stack, config);
    let can_end = sets.iter().any(|set| set.label.is_none());
    FollowSetsHolder { sets, can_end }
}

fn collect_follow_sets(
    atn: &Atn,
    state_id: StateId,
    stop: StateId,
    sets: &mut Vec<FollowSetWithPath>,
    seen: &mut HashSet<StateId>,
    rule_stack: &mut Vec<Rule>,
    config: &CollectorConfig,
) {
    if !seen.insert(state_id) {
        return;
    }

    let state = atn.state(state_id);
    if state_id == stop || state.kind == StateKind::RuleStop {
        sets.push(FollowSetWithPath {
            label: None,
            path: rule_stack.clone(),
            following: Vec::new(),
        });
        return;
    }

    for transition in &state.transitions {
        match transition {
            Transition::Rule { rule, target, .. } => {
                if rule_stack.contains(rule) {
                    continue;
                }
                rule_stack.push(*rule);
                collect_follow_sets(atn, *target, stop, sets, seen, rule_stack, config);
                rule_stack.pop();
            }
            Transition::Epsilon { target } => {
                collect_follow_sets(atn, *target, stop, sets, seen, rule_stack, config);
            }
            Transition::Atom { target, label } => sets.push(FollowSetWithPath {
                label: Some(label.clone()),
                path: rule_stack.clone(),
                following: following_tokens(atn, *target, config),
            }),
        }
    }
}

/// Tokens that must come next after an atom, as long as the path does not
/// fork. This turns `GROUP` into `GROUP BY`.
fn following_tokens(atn: &Atn, mut state_id: StateId, config: &CollectorConfig) -> Vec<TokenType> {
    let mut result = Vec::new();
    for _ in 0..MAX_FOLLOWING_TOKENS * 4 {
        let transitions = &atn.state(state_id).transitions;
        if transitions.len() != 1 || result.len() >= MAX_FOLLOWING_TOKENS {
            break;
        }
        match &transitions[0] {
            Transition::Epsilon { target } => state_id = *target,
            Transition::Atom { target, label } => match label.single() {
                Some(token_type) if !config.is_ignored(token_type) => {
                    result.push(token_type);
                    state_id = *target;
                }
                _ => break,
            },
            Transition::Rule { .. } => break,
        }
    }
    result
}

#[derive(Debug, Clone, Copy)]
enum PathEntry {
    /// A frame of the running walk.
    Live(usize),
    /// A rule found through a cached follow set.
    Cached(Rule),
}

#[derive(Debug)]
struct Frame {
    rule: Rule,
    select_item_aliases: BTreeSet<usize>,
    ctes: BTreeSet<usize>,
}

/// Candidate collector for one request.
pub struct CodeCompletionCore<'a> {
    atn: &'a Atn,
    config: &'a CollectorConfig,
    follow_sets: &'a FollowSetsByState,
    /// Default-channel token types from the start token up to the caret.
    tokens: Vec<TokenType>,
    /// Stream index of each entry in `tokens`.
    token_indices: Vec<usize>,
    frames: Vec<Frame>,
    call_stack: Vec<usize>,
    last_query: Option<usize>,
    last_shadow_query: Option<usize>,
    candidate_tokens: BTreeMap<TokenType, Vec<TokenType>>,
    candidate_rules: BTreeMap<Rule, Vec<PathEntry>>,
    states_processed: usize,
    /// Branches abandoned at [`MAX_RECURSION_DEPTH`].
    depth_cutoffs: usize,
}

impl<'a> CodeCompletionCore<'a> {
    pub fn new(
        atn: &'a Atn,
        config: &'a CollectorConfig,
        follow_sets: &'a FollowSetsByState,
    ) -> Self {
        Self {
            atn,
            config,
            follow_sets,
            tokens: Vec::new(),
            token_indices: Vec::new(),
            frames: Vec::new(),
            call_stack: Vec::new(),
            last_query: None,
            last_shadow_query: None,
            candidate_tokens: BTreeMap::new(),
            candidate_rules: BTreeMap::new(),
            states_processed: 0,
            depth_cutoffs: 0,
        }
    }

    /// Collects what `start_rule` admits at stream index `caret_index`,
    /// reading tokens from stream index `start_token` on.
    pub fn collect_candidates(
        &mut self,
        stream: &[Token],
        caret_index: usize,
        start_rule: Rule,
        start_token: usize,
    ) -> CandidatesCollection {
        self.tokens.clear();
        self.token_indices.clear();
        self.frames.clear();
        self.call_stack.clear();
        self.last_query = None;
        self.last_shadow_query = None;
        self.candidate_tokens.clear();
        self.candidate_rules.clear();
        self.states_processed = 0;
        self.depth_cutoffs = 0;

        for token in stream.iter().skip(start_token).filter(|t| !t.is_hidden()) {
            self.tokens.push(token.token_type);
            self.token_indices.push(token.index);
            if token.index >= caret_index || token.token_type == TokenType::Eof {
                break;
            }
        }
        if self.tokens.is_empty() {
            self.tokens.push(TokenType::Eof);
            self.token_indices.push(stream.len().saturating_sub(1));
        }

        let start = self.atn.rule_start(start_rule);
        self.fetch_end_status(start, 0);

        #[cfg(feature = "tracing")]
        if self.depth_cutoffs > 0 {
            debug!(
                cutoffs = self.depth_cutoffs,
                max_depth = MAX_RECURSION_DEPTH,
                "rule nesting too deep, candidates may be missing"
            );
        }
        #[cfg(feature = "tracing")]
        trace!(
            states = self.states_processed,
            tokens = self.candidate_tokens.len(),
            rules = self.candidate_rules.len(),
            "collected candidates"
        );

        CandidatesCollection {
            tokens: std::mem::take(&mut self.candidate_tokens),
            rules: std::mem::take(&mut self.candidate_rules)
                .into_iter()
                .map(|(rule, path)| (rule, self.materialize(&path)))
                .collect(),
        }
    }

    pub fn depth_cutoffs(&self) -> usize {
        self.depth_cutoffs
    }

    pub fn states_processed(&self) -> usize {
        self.states_processed
    }

    fn materialize(&self, path: &[PathEntry]) -> Vec<RuleContext> {
        path.iter()
            .map(|entry| match entry {
                PathEntry::Live(frame) => {
                    let frame = &self.frames[*frame];
                    RuleContext {
                        rule: frame.rule,
                        select_item_aliases: frame.select_item_aliases.iter().copied().collect(),
                        ctes: frame.ctes.iter().copied().collect(),
                    }
                }
                PathEntry::Cached(rule) => RuleContext {
                    rule: *rule,
                    select_item_aliases: Vec::new(),
                    ctes: Vec::new(),
                },
            })
            .collect()
    }

    fn rule_of(&self, entry: PathEntry) -> Rule {
        match entry {
            PathEntry::Live(frame) => self.frames[frame].rule,
            PathEntry::Cached(rule) => rule,
        }
    }

    fn live_path(&self) -> Vec<PathEntry> {
        self.call_stack.iter().map(|frame| PathEntry::Live(*frame)).collect()
    }

    fn at_caret(&self, index: usize) -> bool {
        index + 1 >= self.tokens.len()
    }

    /// Walks `start_state`'s rule from token `index` and returns every token
    /// index at which the rule can end.
    fn fetch_end_status(&mut self, start_state: StateId, index: usize) -> BTreeSet<usize> {
        let mut result = BTreeSet::new();
        if self.call_stack.len() > MAX_RECURSION_DEPTH {
            self.depth_cutoffs += 1;
            return result;
        }

        let atn = self.atn;
        let config = self.config;
        let follow_sets = self.follow_sets.get_or_collect(atn, start_state, config);
        let start_rule = atn.state(start_state).rule;

        let frame = self.frames.len();
        self.frames.push(Frame {
            rule: start_rule,
            select_item_aliases: BTreeSet::new(),
            ctes: BTreeSet::new(),
        });
        self.call_stack.push(frame);
        let saved_query = self.last_query;
        let saved_shadow = self.last_shadow_query;
        if start_rule == config.query_rule {
            self.last_query = Some(frame);
        }
        if start_rule == config.shadow_query_rule {
            self.last_shadow_query = Some(frame);
        }

        if self.at_caret(index) {
            self.collect_at_caret(start_rule, &follow_sets);
        } else if follow_sets.can_end || follow_sets.accepts(self.tokens[index]) {
            result = self.walk(start_state, index, start_rule);
        }

        self.last_query = saved_query;
        self.last_shadow_query = saved_shadow;
        self.call_stack.pop();
        result
    }

    fn collect_at_caret(&mut self, start_rule: Rule, follow_sets: &FollowSetsHolder) {
        if self.config.preferred_rules.contains(&start_rule) {
            let path = self.live_path();
            self.translate_to_rule_index(&path);
            return;
        }

        for set in &follow_sets.sets {
            let mut full_path = self.live_path();
            full_path.extend(set.path.iter().map(|rule| PathEntry::Cached(*rule)));
            if self.translate_to_rule_index(&full_path) {
                continue;
            }
            if let Some(label) = &set.label {
                for symbol in label.symbols() {
                    if !self.config.is_ignored(symbol) {
                        self.add_token(symbol, set.following.clone());
                    }
                }
            }
        }
    }

    fn walk(&mut self, start_state: StateId, index: usize, start_rule: Rule) -> BTreeSet<usize> {
        let atn = self.atn;
        let config = self.config;
        let mut result = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut pipeline = vec![(start_state, index)];

        while let Some((state_id, index)) = pipeline.pop() {
            if !visited.insert((state_id, index)) {
                continue;
            }
            self.states_processed += 1;

            let state = atn.state(state_id);
            if state.kind == StateKind::RuleStop {
                result.insert(index);
                continue;
            }
            let at_caret = self.at_caret(index);

            for transition in &state.transitions {
                match transition {
                    Transition::Rule { target, follow, .. } => {
                        for end in self.fetch_end_status(*target, index) {
                            pipeline.push((*follow, end));
                        }
                        if start_rule == config.select_item_alias_rule {
                            self.record_select_item_alias(index);
                        } else if start_rule == config.cte_rule {
                            self.record_cte(index);
                        }
                    }
                    Transition::Epsilon { target } => {
                        if at_caret {
                            let path = self.live_path();
                            self.translate_to_rule_index(&path);
                        }
                        pipeline.push((*target, index));
                    }
                    Transition::Atom { target, label } => {
                        if at_caret {
                            let path = self.live_path();
                            if !self.translate_to_rule_index(&path) {
                                let symbols = label.symbols();
                                let following = if symbols.len() == 1 {
                                    following_tokens(atn, *target, config)
                                } else {
                                    Vec::new()
                                };
                                for symbol in symbols {
                                    if !config.is_ignored(symbol) {
                                        self.add_token(symbol, following.clone());
                                    }
                                }
                            }
                        } else if label.matches(self.tokens[index]) {
                            pipeline.push((*target, index + 1));
                        }
                    }
                }
            }
        }

        result
    }

    fn record_select_item_alias(&mut self, index: usize) {
        let Some(stream_index) = self.token_indices.get(index).copied() else {
            return;
        };
        for frame in [self.last_query, self.last_shadow_query].into_iter().flatten() {
            self.frames[frame].select_item_aliases.insert(stream_index);
        }
    }

    fn record_cte(&mut self, index: usize) {
        let Some(stream_index) = self.token_indices.get(index).copied() else {
            return;
        };
        if let Some(frame) = self.last_shadow_query {
            self.frames[frame].ctes.insert(stream_index);
        }
    }

    /// Tokens seen twice with different continuations keep none.
    fn add_token(&mut self, symbol: TokenType, following: Vec<TokenType>) {
        match self.candidate_tokens.get_mut(&symbol) {
            Some(existing) => {
                if *existing != following {
                    existing.clear();
                }
            }
            None => {
                self.candidate_tokens.insert(symbol, following);
            }
        }
    }

    /// Records the first preferred rule on `path`. Returns whether one was found.
    fn translate_to_rule_index(&mut self, path: &[PathEntry]) -> bool {
        if self.config.preferred_rules.is_empty() {
            return false;
        }

        for (i, entry) in path.iter().enumerate() {
            let rule = self.rule_of(*entry);
            if !self.config.preferred_rules.contains(&rule) {
                continue;
            }

            let prefix = &path[..i];
            let replace = match self.candidate_rules.get(&rule) {
                Some(existing) if existing.len() == prefix.len() => existing
                    .iter()
                    .zip(prefix)
                    .all(|(a, b)| self.rule_of(*a) == self.rule_of(*b)),
                _ => true,
            };
            if replace {
                self.candidate_rules.insert(rule, prefix.to_vec());
            }
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{atn, Kw};
    use crate::lexer::tokenize;
    use crate::types::Dialect;

    fn config() -> CollectorConfig {
        CollectorConfig {
            ignored_tokens: [
                TokenType::Identifier,
                TokenType::QuotedIdentifier,
                TokenType::Number,
                TokenType::String,
                TokenType::Comma,
                TokenType::Period,
                TokenType::LParen,
                TokenType::RParen,
                TokenType::SemiColon,
                TokenType::Star,
                TokenType::Eq,
                TokenType::Operator,
                TokenType::DoubleColon,
                TokenType::LBracket,
                TokenType::RBracket,
                TokenType::Placeholder,
                TokenType::Eof,
            ]
            .into_iter()
            .collect(),
            preferred_rules: [
                Rule::RelationExpr,
                Rule::QualifiedName,
                Rule::ColumnRef,
                Rule::FuncName,
            ]
            .into_iter()
            .collect(),
            query_rule: Rule::SimpleSelectPrimary,
            shadow_query_rule: Rule::SelectNoParens,
            select_item_alias_rule: Rule::TargetAlias,
            cte_rule: Rule::WithClause,
        }
    }

    /// Collects at the end of `sql`.
    fn collect(sql: &str) -> CandidatesCollection {
        let tokens = tokenize(sql, Dialect::Postgres);
        let caret = tokens.len() - 1;
        let config = config();
        let cache = FollowSetsByState::new();
        let mut core = CodeCompletionCore::new(atn(), &config, &cache);
        core.collect_candidates(&tokens, caret, Rule::Root, 0)
    }

    fn has_keyword(candidates: &CandidatesCollection, kw: Kw) -> bool {
        candidates.tokens.contains_key(&TokenType::Keyword(kw))
    }

    #[test]
    fn test_statement_start_offers_statement_keywords() {
        let candidates = collect("");
        for kw in [Kw::Select, Kw::With, Kw::Insert, Kw::Update, Kw::Delete, Kw::Begin] {
            assert!(has_keyword(&candidates, kw), "{kw:?} missing");
        }
        assert!(!has_keyword(&candidates, Kw::From));
        assert!(candidates.rules.is_empty());
    }

    #[test]
    fn test_from_offers_relations() {
        let candidates = collect("SELECT * FROM ");
        assert!(candidates.rules.contains_key(&Rule::RelationExpr));
        assert!(!candidates.rules.contains_key(&Rule::ColumnRef));
    }

    #[test]
    fn test_after_table_offers_clause_keywords() {
        let candidates = collect("SELECT * FROM t ");
        for kw in [Kw::Where, Kw::Group, Kw::Order, Kw::Join, Kw::Left, Kw::Limit] {
            assert!(has_keyword(&candidates, kw), "{kw:?} missing");
        }
        assert_eq!(
            candidates.tokens.get(&TokenType::Keyword(Kw::Group)),
            Some(&vec![TokenType::Keyword(Kw::By)])
        );
    }

    #[test]
    fn test_expression_position_offers_columns_and_functions() {
        let candidates = collect("SELECT a FROM t WHERE ");
        assert!(candidates.rules.contains_key(&Rule::ColumnRef));
        assert!(candidates.rules.contains_key(&Rule::FuncName));
        assert!(has_keyword(&candidates, Kw::Not));
        assert!(has_keyword(&candidates, Kw::Exists));
    }

    #[test]
    fn test_rule_path_carries_select_item_aliases() {
        let sql = "SELECT a AS total FROM t ORDER BY ";
        let tokens = tokenize(sql, Dialect::Postgres);
        let alias_index = tokens.iter().find(|t| t.text == "total").unwrap().index;
        let candidates = collect(sql);
        let path = &candidates.rules[&Rule::ColumnRef];
        assert!(path.iter().any(|ctx| ctx.rule == Rule::SortClause));
        let query = path
            .iter()
            .rev()
            .find(|ctx| ctx.rule == Rule::SelectNoParens)
            .unwrap();
        assert!(query.select_item_aliases.contains(&alias_index));
    }

    #[test]
    fn test_rule_path_carries_cte_positions() {
        let sql = "WITH cte AS (SELECT 1 AS x) SELECT * FROM ";
        let tokens = tokenize(sql, Dialect::Postgres);
        let cte_index = tokens.iter().find(|t| t.text == "cte").unwrap().index;
        let candidates = collect(sql);
        let path = &candidates.rules[&Rule::RelationExpr];
        assert!(path
            .iter()
            .any(|ctx| ctx.rule == Rule::SelectNoParens && ctx.ctes == vec![cte_index]));
    }

    #[test]
    fn test_deep_nesting_counts_cutoffs() {
        let config = config();
        let cache = FollowSetsByState::new();
        let mut core = CodeCompletionCore::new(atn(), &config, &cache);

        let shallow = tokenize("SELECT a FROM t WHERE (", Dialect::Postgres);
        core.collect_candidates(&shallow, shallow.len() - 1, Rule::Root, 0);
        assert_eq!(core.depth_cutoffs(), 0);

        let sql = format!("SELECT a FROM t WHERE {}", "(".repeat(40));
        let deep = tokenize(&sql, Dialect::Postgres);
        core.collect_candidates(&deep, deep.len() - 1, Rule::Root, 0);
        assert!(core.depth_cutoffs() > 0);
    }

    #[test]
    fn test_cache_is_shared_and_stable() {
        let config = config();
        let cache = FollowSetsByState::new();
        let tokens = tokenize("SELECT ", Dialect::Postgres);
        let caret = tokens.len() - 1;
        let first = CodeCompletionCore::new(atn(), &config, &cache).collect_candidates(
            &tokens,
            caret,
            Rule::Root,
            0,
        );
        let filled = cache.len();
        assert!(filled > 0);
        let second = CodeCompletionCore::new(atn(), &config, &cache).collect_candidates(
            &tokens,
            caret,
            Rule::Root,
            0,
        );
        assert_eq!(first, second);
        assert_eq!(cache.len(), filled);
    }
}
