//! PostgreSQL-family grammar used for caret analysis.
//!
//! The grammar only has to be precise enough to tell what may follow a
//! caret, so it covers queries, DML and transaction control and leaves DDL
//! out. Rules are written with the combinators below and compiled once into
//! an [`Atn`] shared by every completion request.

mod atn;
mod keywords;

use std::sync::OnceLock;

pub use atn::{Atn, AtnState, StateId, StateKind, Transition};
pub use keywords::Kw;

use crate::lexer::TokenType;

macro_rules! rules {
    ($($variant:ident,)*) => {
        /// Grammar rules.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Rule {
            $($variant,)*
        }

        impl Rule {
            pub const ALL: &'static [Rule] = &[$(Rule::$variant,)*];

            pub fn index(self) -> usize {
                self as usize
            }
        }
    };
}

rules! {
    Root,
    StmtMulti,
    Stmt,
    SelectStmt,
    SelectWithParens,
    SelectNoParens,
    SelectClause,
    SimpleSelectPrimary,
    ValuesClause,
    WithClause,
    CommonTableExpr,
    TargetList,
    TargetEl,
    TargetAlias,
    FromClause,
    FromList,
    TableRef,
    JoinType,
    JoinQual,
    RelationExpr,
    QualifiedName,
    AliasClause,
    NameList,
    ColId,
    ColLabel,
    WhereClause,
    GroupClause,
    HavingClause,
    SortClause,
    SortBy,
    LimitClause,
    ExprList,
    AExpr,
    CExpr,
    ColumnRef,
    FuncApplication,
    FuncName,
    AExprConst,
    CaseExpr,
    Typename,
    InsertStmt,
    UpdateStmt,
    SetClause,
    DeleteStmt,
    ReturningClause,
    TransactionStmt,
    TransactionMode,
}

/// What an atom transition accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Tokens(Vec<TokenType>),
    /// Identifier, quoted identifier or unreserved keyword.
    Identifier,
    /// Any word, reserved keywords included.
    AnyWord,
}

impl Label {
    pub fn matches(&self, token_type: TokenType) -> bool {
        match self {
            Label::Tokens(types) => types.contains(&token_type),
            Label::Identifier => token_type.is_identifier(),
            Label::AnyWord => matches!(
                token_type,
                TokenType::Identifier | TokenType::QuotedIdentifier | TokenType::Keyword(_)
            ),
        }
    }

    /// Token types worth offering when this label sits at the caret.
    /// Name-like labels only offer the identifier terminals; keywords reached
    /// through them are names, not syntax.
    pub fn symbols(&self) -> Vec<TokenType> {
        match self {
            Label::Tokens(types) => types.clone(),
            Label::Identifier | Label::AnyWord => {
                vec![TokenType::Identifier, TokenType::QuotedIdentifier]
            }
        }
    }

    /// The single token type this label accepts, if it accepts exactly one.
    pub fn single(&self) -> Option<TokenType> {
        match self {
            Label::Tokens(types) if types.len() == 1 => Some(types[0]),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Element {
    Label(Label),
    Rule(Rule),
    Seq(Vec<Element>),
    Alt(Vec<Element>),
    Optional(Box<Element>),
    Star(Box<Element>),
}

pub(crate) fn kw(kw: Kw) -> Element {
    tok(TokenType::Keyword(kw))
}

pub(crate) fn kws(list: &[Kw]) -> Element {
    Element::Label(Label::Tokens(
        list.iter().map(|kw| TokenType::Keyword(*kw)).collect(),
    ))
}

pub(crate) fn tok(token_type: TokenType) -> Element {
    Element::Label(Label::Tokens(vec![token_type]))
}

pub(crate) fn toks(list: &[TokenType]) -> Element {
    Element::Label(Label::Tokens(list.to_vec()))
}

pub(crate) fn rule(rule: Rule) -> Element {
    Element::Rule(rule)
}

pub(crate) fn seq(items: impl IntoIterator<Item = Element>) -> Element {
    Element::Seq(items.into_iter().collect())
}

pub(crate) fn alt(items: impl IntoIterator<Item = Element>) -> Element {
    Element::Alt(items.into_iter().collect())
}

pub(crate) fn opt(element: Element) -> Element {
    Element::Optional(Box::new(element))
}

pub(crate) fn star(element: Element) -> Element {
    Element::Star(Box::new(element))
}

pub(crate) fn plus(element: Element) -> Element {
    seq([element.clone(), star(element)])
}

/// The compiled grammar, built on first use.
pub fn atn() -> &'static Atn {
    static ATN: OnceLock<Atn> = OnceLock::new();
    ATN.get_or_init(|| Atn::build(definitions()))
}

fn parens(inner: Element) -> Element {
    seq([tok(TokenType::LParen), inner, tok(TokenType::RParen)])
}

fn comma_list(item: Element) -> Element {
    seq([item.clone(), star(seq([tok(TokenType::Comma), item]))])
}

fn select_term() -> Element {
    alt([rule(Rule::SimpleSelectPrimary), rule(Rule::SelectWithParens)])
}

fn preparable_stmt() -> Element {
    alt([
        rule(Rule::SelectNoParens),
        rule(Rule::InsertStmt),
        rule(Rule::UpdateStmt),
        rule(Rule::DeleteStmt),
    ])
}

fn table_primary() -> Element {
    let alias = || opt(rule(Rule::AliasClause));
    alt([
        seq([rule(Rule::RelationExpr), alias()]),
        seq([opt(kw(Kw::Lateral)), rule(Rule::SelectWithParens), alias()]),
        seq([parens(rule(Rule::TableRef)), alias()]),
    ])
}

fn join_part() -> Element {
    alt([
        seq([kw(Kw::Cross), kw(Kw::Join), table_primary()]),
        seq([
            opt(kw(Kw::Natural)),
            opt(rule(Rule::JoinType)),
            kw(Kw::Join),
            table_primary(),
            opt(rule(Rule::JoinQual)),
        ]),
    ])
}

fn unary_expr() -> Element {
    seq([
        star(alt([kw(Kw::Not), tok(TokenType::Operator)])),
        rule(Rule::CExpr),
    ])
}

fn limit_part() -> Element {
    seq([kw(Kw::Limit), alt([rule(Rule::AExpr), kw(Kw::All)])])
}

fn offset_part() -> Element {
    seq([
        kw(Kw::Offset),
        rule(Rule::AExpr),
        opt(kws(&[Kw::Row, Kw::Rows])),
    ])
}

fn fetch_part() -> Element {
    seq([
        kw(Kw::Fetch),
        kws(&[Kw::First, Kw::Next]),
        opt(rule(Rule::AExpr)),
        kws(&[Kw::Row, Kw::Rows]),
        kw(Kw::Only),
    ])
}

fn transaction_modes() -> Element {
    seq([
        rule(Rule::TransactionMode),
        star(seq([opt(tok(TokenType::Comma)), rule(Rule::TransactionMode)])),
    ])
}

fn definitions() -> Vec<(Rule, Element)> {
    use TokenType as T;

    vec![
        (Rule::Root, seq([rule(Rule::StmtMulti), tok(T::Eof)])),
        (
            Rule::StmtMulti,
            seq([
                opt(rule(Rule::Stmt)),
                star(seq([tok(T::SemiColon), opt(rule(Rule::Stmt))])),
            ]),
        ),
        (
            Rule::Stmt,
            alt([
                rule(Rule::SelectStmt),
                rule(Rule::InsertStmt),
                rule(Rule::UpdateStmt),
                rule(Rule::DeleteStmt),
                rule(Rule::TransactionStmt),
            ]),
        ),
        (Rule::SelectStmt, rule(Rule::SelectNoParens)),
        (Rule::SelectWithParens, parens(rule(Rule::SelectNoParens))),
        (
            Rule::SelectNoParens,
            seq([
                opt(rule(Rule::WithClause)),
                rule(Rule::SelectClause),
                opt(rule(Rule::SortClause)),
                opt(rule(Rule::LimitClause)),
            ]),
        ),
        (
            Rule::SelectClause,
            seq([
                select_term(),
                star(seq([
                    kws(&[Kw::Union, Kw::Intersect, Kw::Except]),
                    opt(kws(&[Kw::All, Kw::Distinct])),
                    select_term(),
                ])),
            ]),
        ),
        (
            Rule::SimpleSelectPrimary,
            alt([
                seq([
                    kw(Kw::Select),
                    opt(alt([
                        kw(Kw::All),
                        seq([
                            kw(Kw::Distinct),
                            opt(seq([kw(Kw::On), parens(rule(Rule::ExprList))])),
                        ]),
                    ])),
                    opt(rule(Rule::TargetList)),
                    opt(rule(Rule::FromClause)),
                    opt(rule(Rule::WhereClause)),
                    opt(rule(Rule::GroupClause)),
                    opt(rule(Rule::HavingClause)),
                ]),
                rule(Rule::ValuesClause),
                seq([kw(Kw::Table), rule(Rule::RelationExpr)]),
            ]),
        ),
        (
            Rule::ValuesClause,
            seq([kw(Kw::Values), comma_list(parens(rule(Rule::ExprList)))]),
        ),
        (
            Rule::WithClause,
            seq([
                kw(Kw::With),
                opt(kw(Kw::Recursive)),
                comma_list(rule(Rule::CommonTableExpr)),
            ]),
        ),
        (
            Rule::CommonTableExpr,
            seq([
                rule(Rule::ColId),
                opt(parens(rule(Rule::NameList))),
                kw(Kw::As),
                opt(seq([opt(kw(Kw::Not)), kw(Kw::Materialized)])),
                parens(preparable_stmt()),
            ]),
        ),
        (Rule::TargetList, comma_list(rule(Rule::TargetEl))),
        (
            Rule::TargetEl,
            alt([
                tok(T::Star),
                seq([rule(Rule::AExpr), opt(rule(Rule::TargetAlias))]),
            ]),
        ),
        (
            Rule::TargetAlias,
            alt([seq([kw(Kw::As), rule(Rule::ColLabel)]), rule(Rule::ColId)]),
        ),
        (
            Rule::FromClause,
            seq([kw(Kw::From), rule(Rule::FromList)]),
        ),
        (Rule::FromList, comma_list(rule(Rule::TableRef))),
        (Rule::TableRef, seq([table_primary(), star(join_part())])),
        (
            Rule::JoinType,
            alt([
                seq([kws(&[Kw::Full, Kw::Left, Kw::Right]), opt(kw(Kw::Outer))]),
                kw(Kw::Inner),
            ]),
        ),
        (
            Rule::JoinQual,
            alt([
                seq([kw(Kw::Using), parens(rule(Rule::NameList))]),
                seq([kw(Kw::On), rule(Rule::AExpr)]),
            ]),
        ),
        (
            Rule::RelationExpr,
            alt([
                seq([rule(Rule::QualifiedName), opt(tok(T::Star))]),
                seq([
                    kw(Kw::Only),
                    alt([
                        rule(Rule::QualifiedName),
                        parens(rule(Rule::QualifiedName)),
                    ]),
                ]),
            ]),
        ),
        (
            Rule::QualifiedName,
            seq([
                rule(Rule::ColId),
                star(seq([tok(T::Period), rule(Rule::ColLabel)])),
            ]),
        ),
        (
            Rule::AliasClause,
            seq([
                opt(kw(Kw::As)),
                rule(Rule::ColId),
                opt(parens(rule(Rule::NameList))),
            ]),
        ),
        (Rule::NameList, comma_list(rule(Rule::ColId))),
        (Rule::ColId, Element::Label(Label::Identifier)),
        (Rule::ColLabel, Element::Label(Label::AnyWord)),
        (
            Rule::WhereClause,
            seq([kw(Kw::Where), rule(Rule::AExpr)]),
        ),
        (
            Rule::GroupClause,
            seq([kw(Kw::Group), kw(Kw::By), rule(Rule::ExprList)]),
        ),
        (
            Rule::HavingClause,
            seq([kw(Kw::Having), rule(Rule::AExpr)]),
        ),
        (
            Rule::SortClause,
            seq([kw(Kw::Order), kw(Kw::By), comma_list(rule(Rule::SortBy))]),
        ),
        (
            Rule::SortBy,
            seq([
                rule(Rule::AExpr),
                opt(kws(&[Kw::Asc, Kw::Desc])),
                opt(seq([kw(Kw::Nulls), kws(&[Kw::First, Kw::Last])])),
            ]),
        ),
        (
            Rule::LimitClause,
            alt([
                seq([limit_part(), opt(offset_part())]),
                seq([offset_part(), opt(alt([limit_part(), fetch_part()]))]),
                fetch_part(),
            ]),
        ),
        (Rule::ExprList, comma_list(rule(Rule::AExpr))),
        (
            Rule::AExpr,
            seq([
                unary_expr(),
                star(alt([
                    seq([
                        toks(&[
                            T::Operator,
                            T::Star,
                            T::Eq,
                            T::Keyword(Kw::And),
                            T::Keyword(Kw::Or),
                        ]),
                        unary_expr(),
                    ]),
                    seq([
                        kw(Kw::Is),
                        opt(kw(Kw::Not)),
                        alt([
                            kws(&[Kw::Null, Kw::True, Kw::False]),
                            seq([kw(Kw::Distinct), kw(Kw::From), unary_expr()]),
                        ]),
                    ]),
                    seq([
                        opt(kw(Kw::Not)),
                        kw(Kw::In),
                        parens(alt([rule(Rule::SelectNoParens), rule(Rule::ExprList)])),
                    ]),
                    seq([
                        opt(kw(Kw::Not)),
                        kws(&[Kw::Like, Kw::Ilike]),
                        unary_expr(),
                    ]),
                    seq([
                        opt(kw(Kw::Not)),
                        kw(Kw::Between),
                        unary_expr(),
                        kw(Kw::And),
                        unary_expr(),
                    ]),
                    seq([tok(T::DoubleColon), rule(Rule::Typename)]),
                ])),
            ]),
        ),
        (
            Rule::CExpr,
            alt([
                rule(Rule::ColumnRef),
                rule(Rule::AExprConst),
                parens(rule(Rule::ExprList)),
                rule(Rule::SelectWithParens),
                seq([kw(Kw::Exists), rule(Rule::SelectWithParens)]),
                rule(Rule::FuncApplication),
                rule(Rule::CaseExpr),
                seq([
                    kw(Kw::Cast),
                    parens(seq([rule(Rule::AExpr), kw(Kw::As), rule(Rule::Typename)])),
                ]),
                tok(T::Placeholder),
            ]),
        ),
        (
            Rule::ColumnRef,
            seq([
                rule(Rule::ColId),
                star(seq([
                    tok(T::Period),
                    alt([rule(Rule::ColLabel), tok(T::Star)]),
                ])),
            ]),
        ),
        (
            Rule::FuncApplication,
            seq([
                rule(Rule::FuncName),
                parens(opt(alt([
                    tok(T::Star),
                    seq([opt(kw(Kw::Distinct)), rule(Rule::ExprList)]),
                ]))),
            ]),
        ),
        (
            Rule::FuncName,
            seq([
                rule(Rule::ColId),
                star(seq([tok(T::Period), rule(Rule::ColLabel)])),
            ]),
        ),
        (
            Rule::AExprConst,
            toks(&[
                T::Number,
                T::String,
                T::Keyword(Kw::True),
                T::Keyword(Kw::False),
                T::Keyword(Kw::Null),
                T::Keyword(Kw::CurrentDate),
                T::Keyword(Kw::CurrentTime),
                T::Keyword(Kw::CurrentTimestamp),
                T::Keyword(Kw::CurrentUser),
            ]),
        ),
        (
            Rule::CaseExpr,
            seq([
                kw(Kw::Case),
                opt(rule(Rule::AExpr)),
                plus(seq([
                    kw(Kw::When),
                    rule(Rule::AExpr),
                    kw(Kw::Then),
                    rule(Rule::AExpr),
                ])),
                opt(seq([kw(Kw::Else), rule(Rule::AExpr)])),
                kw(Kw::End),
            ]),
        ),
        (
            Rule::Typename,
            seq([
                rule(Rule::ColId),
                opt(parens(comma_list(tok(T::Number)))),
                opt(seq([tok(T::LBracket), tok(T::RBracket)])),
            ]),
        ),
        (
            Rule::InsertStmt,
            seq([
                opt(rule(Rule::WithClause)),
                kw(Kw::Insert),
                kw(Kw::Into),
                rule(Rule::QualifiedName),
                opt(seq([kw(Kw::As), rule(Rule::ColId)])),
                opt(parens(rule(Rule::NameList))),
                alt([
                    rule(Rule::SelectNoParens),
                    seq([kw(Kw::Default), kw(Kw::Values)]),
                ]),
                opt(rule(Rule::ReturningClause)),
            ]),
        ),
        (
            Rule::UpdateStmt,
            seq([
                opt(rule(Rule::WithClause)),
                kw(Kw::Update),
                rule(Rule::RelationExpr),
                opt(seq([kw(Kw::As), rule(Rule::ColId)])),
                kw(Kw::Set),
                comma_list(rule(Rule::SetClause)),
                opt(rule(Rule::FromClause)),
                opt(rule(Rule::WhereClause)),
                opt(rule(Rule::ReturningClause)),
            ]),
        ),
        (
            Rule::SetClause,
            alt([
                seq([rule(Rule::ColId), tok(T::Eq), rule(Rule::AExpr)]),
                seq([
                    parens(rule(Rule::NameList)),
                    tok(T::Eq),
                    parens(rule(Rule::ExprList)),
                ]),
            ]),
        ),
        (
            Rule::DeleteStmt,
            seq([
                opt(rule(Rule::WithClause)),
                kw(Kw::Delete),
                kw(Kw::From),
                rule(Rule::RelationExpr),
                opt(seq([kw(Kw::As), rule(Rule::ColId)])),
                opt(seq([kw(Kw::Using), rule(Rule::FromList)])),
                opt(rule(Rule::WhereClause)),
                opt(rule(Rule::ReturningClause)),
            ]),
        ),
        (
            Rule::ReturningClause,
            seq([kw(Kw::Returning), rule(Rule::TargetList)]),
        ),
        (
            Rule::TransactionStmt,
            alt([
                seq([
                    kw(Kw::Begin),
                    opt(kws(&[Kw::Work, Kw::Transaction])),
                    opt(transaction_modes()),
                ]),
                seq([
                    kw(Kw::Start),
                    kw(Kw::Transaction),
                    opt(transaction_modes()),
                ]),
                seq([
                    kws(&[Kw::Commit, Kw::End, Kw::Abort, Kw::Rollback]),
                    opt(kws(&[Kw::Work, Kw::Transaction])),
                    opt(seq([kw(Kw::And), opt(kw(Kw::No)), kw(Kw::Chain)])),
                ]),
            ]),
        ),
        (
            Rule::TransactionMode,
            alt([
                seq([
                    kw(Kw::Isolation),
                    kw(Kw::Level),
                    alt([
                        seq([kw(Kw::Read), kws(&[Kw::Committed, Kw::Uncommitted])]),
                        seq([kw(Kw::Repeatable), kw(Kw::Read)]),
                        kw(Kw::Serializable),
                    ]),
                ]),
                seq([kw(Kw::Read), kws(&[Kw::Only, Kw::Write])]),
                seq([opt(kw(Kw::Not)), kw(Kw::Deferrable)]),
            ]),
        ),
    ]
}
