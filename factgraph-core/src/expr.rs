//! The typed expression algebra.
//!
//! [`Expr`] is a closed family of operator nodes dispatched by pattern
//! match. Evaluation is lazy and context-dependent: given an
//! [`EvalContext`](context::EvalContext) carrying the graph and the owning
//! fact, `eval` produces a [`MaybeVec`] of [`Computed`] values, `Multiple`
//! whenever a dependency path crosses a collection wildcard.
//!
//! Data-driven failures (division by zero, overflow, operands with no
//! promotion rule) collapse to `Incomplete`; structural defects
//! ([`EvalError::ShapeMismatch`], [`EvalError::Cycle`]) abort the
//! operation.

pub(crate) mod collections;
pub(crate) mod context;
pub(crate) mod logic;
pub(crate) mod math;
pub(crate) mod options;
pub(crate) mod strings;
pub(crate) mod switch;
pub(crate) mod writable;

use crate::error::{DictionaryError, EvalError};
use crate::result::{vectorize, vectorize1, vectorize2, Computed, MaybeVec};
use crate::value::{Value, ValueKind};
use context::EvalContext;
use factgraph_path::{Path, PathError};
use std::fmt::Write;

/// The packaging every expression evaluates to.
pub type Evaluated = MaybeVec<Computed<Value>>;

/// A reference to another fact, optionally qualified by the module that is
/// expected to declare it.
#[derive(Debug, Clone, PartialEq)]
pub struct DepRef {
    /// Absolute, relative or abstract path to the dependency.
    pub path: Path,
    /// Declared module of the target, checked when the dictionary freezes.
    pub module: Option<String>,
}

/// One `condition → value` arm of a [`Expr::Switch`] or
/// [`Expr::ConditionalList`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The guard.
    pub condition: Expr,
    /// The value produced when the guard holds.
    pub value: Expr,
}

impl SwitchCase {
    /// Builds an arm.
    pub fn new(condition: Expr, value: Expr) -> Self {
        Self { condition, value }
    }
}

/// One entry of an [`Expr::EnumOptions`] set: unconditional, or present
/// only while its condition holds.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumOption {
    /// Guard; `None` means always present.
    pub condition: Option<Expr>,
    /// The option string.
    pub value: String,
}

impl EnumOption {
    /// An always-present option.
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            condition: None,
            value: value.into(),
        }
    }

    /// An option present only while `condition` is completely true.
    pub fn when(condition: Expr, value: impl Into<String>) -> Self {
        Self {
            condition: Some(condition),
            value: value.into(),
        }
    }
}

/// An operator node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Const(Value),
    /// The value stored for the owning writable, if any. The
    /// placeholder/override chain sits above this leaf, at the fact level.
    Writable,
    /// Another fact's value.
    Dep(DepRef),
    /// The evaluation date.
    Today,

    /// First arm whose condition holds.
    Switch(Vec<SwitchCase>),
    /// One element per arm whose condition holds.
    ConditionalList(Vec<SwitchCase>),

    /// Variadic sum under numeric promotion.
    Add(Vec<Expr>),
    /// A minuend less each subtrahend in turn.
    Subtract {
        /// The value subtracted from.
        minuend: Box<Expr>,
        /// The values subtracted, in order.
        subtrahends: Vec<Expr>,
    },
    /// Variadic product.
    Multiply(Vec<Expr>),
    /// Quotient; division by zero is incomplete.
    Divide {
        /// The dividend.
        dividend: Box<Expr>,
        /// The divisor.
        divisor: Box<Expr>,
    },
    /// Variadic maximum of its arguments.
    GreaterOf(Vec<Expr>),
    /// Variadic minimum of its arguments.
    LesserOf(Vec<Expr>),
    /// Maximum over a vector, reduced to a single value.
    Maximum(Box<Expr>),
    /// Minimum over a vector, reduced to a single value.
    Minimum(Box<Expr>),
    /// Round to a whole unit in kind, ties to even.
    Round(Box<Expr>),
    /// Round to the nearest `Int`, ties to even.
    RoundToInt(Box<Expr>),
    /// Round toward positive infinity.
    Ceiling(Box<Expr>),
    /// Round toward negative infinity.
    Floor(Box<Expr>),

    /// Boolean negation.
    Not(Box<Expr>),
    /// Short-circuit conjunction.
    All(Vec<Expr>),
    /// Short-circuit disjunction.
    Any(Vec<Expr>),

    /// Equality.
    Equal(Box<Expr>, Box<Expr>),
    /// Negated equality.
    NotEqual(Box<Expr>, Box<Expr>),
    /// Strict greater-than.
    GreaterThan(Box<Expr>, Box<Expr>),
    /// Greater-than-or-equal.
    GreaterOrEqual(Box<Expr>, Box<Expr>),
    /// Strict less-than.
    LessThan(Box<Expr>, Box<Expr>),
    /// Less-than-or-equal.
    LessOrEqual(Box<Expr>, Box<Expr>),

    /// Character count of a string or member count of a collection.
    Length(Box<Expr>),
    /// Concatenation of canonical renderings.
    Paste {
        /// The parts, rendered and joined in order.
        parts: Vec<Expr>,
        /// Separator between parts; empty for plain concatenation.
        separator: String,
    },
    /// Canonical rendering as a string.
    AsString(Box<Expr>),
    /// Dollars rendered with a decimal point.
    AsDecimalString(Box<Expr>),
    /// Whitespace-trimmed string.
    Trim(Box<Expr>),
    /// Uppercased string.
    ToUpper(Box<Expr>),
    /// String with a set of characters removed.
    StripChars {
        /// The string operated on.
        value: Box<Expr>,
        /// Characters to remove.
        chars: Box<Expr>,
    },
    /// MeF name-control normalization and truncation.
    TruncateNameForMef(Box<Expr>),

    /// Final day of a date's month.
    LastDayOfMonth(Box<Expr>),
    /// Month arithmetic preserving last-day-of-month anchors.
    AddPayrollMonths {
        /// The anchor date.
        date: Box<Expr>,
        /// Whole months to shift by.
        months: Box<Expr>,
    },

    /// Member count of a collection, or complete-element count of a
    /// vector.
    Count(Box<Expr>),
    /// Element-type sum over a vector.
    CollectionSum(Box<Expr>),
    /// Member ids passing a predicate.
    Filter {
        /// Path of the collection, resolved against the owner.
        collection: Path,
        /// Predicate evaluated with each member as the current position.
        predicate: Box<Expr>,
    },
    /// First member id passing a predicate.
    Find {
        /// Path of the collection, resolved against the owner.
        collection: Path,
        /// Predicate evaluated with each member as the current position.
        predicate: Box<Expr>,
    },
    /// Member id at a position.
    IndexOf {
        /// The collection value.
        collection: Box<Expr>,
        /// Zero-based position.
        index: Box<Expr>,
    },

    /// An option set.
    EnumOptions(Vec<EnumOption>),
    /// Membership of a choice in an option set.
    EnumOptionsContains {
        /// The option set.
        options: Box<Expr>,
        /// The choice tested.
        value: Box<Expr>,
    },
    /// Size of an option set.
    EnumOptionsSize(Box<Expr>),

    /// Whether the inner expression evaluates completely; itself always
    /// complete.
    IsComplete(Box<Expr>),
}

impl Expr {
    /// A dependency on `path`, unqualified.
    pub fn dep(path: Path) -> Self {
        Expr::Dep(DepRef { path, module: None })
    }

    /// A literal.
    pub fn constant(value: Value) -> Self {
        Expr::Const(value)
    }

    /// Evaluates the node under `ctx`.
    pub(crate) fn eval(&self, ctx: &EvalContext<'_>) -> Result<Evaluated, EvalError> {
        match self {
            Expr::Const(v) => Ok(MaybeVec::Single(Computed::Complete(v.clone()))),
            // reads the raw stored value only; the placeholder/override
            // chain is the fact-level evaluation, not this leaf's
            Expr::Writable => Ok(MaybeVec::Single(match ctx.stored() {
                Some(value) => Computed::Complete(value),
                None => Computed::Incomplete,
            })),
            Expr::Dep(dep) => ctx.dep(dep),
            Expr::Today => Ok(MaybeVec::Single(Computed::Complete(Value::Day(
                ctx.today(),
            )))),

            Expr::Switch(cases) => switch::switch(ctx, cases),
            Expr::ConditionalList(cases) => switch::conditional_list(ctx, cases),

            Expr::Add(operands) => fold_binary(ctx, operands, math::add),
            Expr::Subtract {
                minuend,
                subtrahends,
            } => {
                let mut acc = minuend.eval(ctx)?;
                for operand in subtrahends {
                    let value = operand.eval(ctx)?;
                    acc = vectorize2(&acc, &value, math::sub)?;
                }
                Ok(acc)
            }
            Expr::Multiply(operands) => fold_binary(ctx, operands, math::mul),
            Expr::Divide { dividend, divisor } => {
                let dividend = dividend.eval(ctx)?;
                let divisor = divisor.eval(ctx)?;
                vectorize2(&dividend, &divisor, math::div)
            }
            Expr::GreaterOf(operands) => fold_binary(ctx, operands, math::max2),
            Expr::LesserOf(operands) => fold_binary(ctx, operands, math::min2),
            Expr::Maximum(operand) => reduce(operand.eval(ctx)?, math::max2),
            Expr::Minimum(operand) => reduce(operand.eval(ctx)?, math::min2),
            Expr::Round(operand) => vectorize1(&operand.eval(ctx)?, math::round_whole),
            Expr::RoundToInt(operand) => vectorize1(&operand.eval(ctx)?, math::round_to_int),
            Expr::Ceiling(operand) => vectorize1(&operand.eval(ctx)?, math::ceiling),
            Expr::Floor(operand) => vectorize1(&operand.eval(ctx)?, math::floor),

            Expr::Not(operand) => logic::eval_not(&operand.eval(ctx)?),
            Expr::All(operands) => logic::all(ctx, operands),
            Expr::Any(operands) => logic::any(ctx, operands),

            Expr::Equal(a, b) => binary(ctx, a, b, math::equal),
            Expr::NotEqual(a, b) => binary(ctx, a, b, math::not_equal),
            Expr::GreaterThan(a, b) => binary(ctx, a, b, |x, y| {
                math::compare_with(x, y, std::cmp::Ordering::is_gt)
            }),
            Expr::GreaterOrEqual(a, b) => binary(ctx, a, b, |x, y| {
                math::compare_with(x, y, std::cmp::Ordering::is_ge)
            }),
            Expr::LessThan(a, b) => binary(ctx, a, b, |x, y| {
                math::compare_with(x, y, std::cmp::Ordering::is_lt)
            }),
            Expr::LessOrEqual(a, b) => binary(ctx, a, b, |x, y| {
                math::compare_with(x, y, std::cmp::Ordering::is_le)
            }),

            Expr::Length(operand) => vectorize1(&operand.eval(ctx)?, strings::length),
            Expr::Paste { parts, separator } => {
                let evaluated = parts
                    .iter()
                    .map(|p| p.eval(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                let refs: Vec<&Evaluated> = evaluated.iter().collect();
                vectorize(&refs, |values| strings::paste(values, separator))
            }
            Expr::AsString(operand) => vectorize1(&operand.eval(ctx)?, strings::as_string),
            Expr::AsDecimalString(operand) => {
                vectorize1(&operand.eval(ctx)?, strings::as_decimal_string)
            }
            Expr::Trim(operand) => vectorize1(&operand.eval(ctx)?, strings::trim),
            Expr::ToUpper(operand) => vectorize1(&operand.eval(ctx)?, strings::to_upper),
            Expr::StripChars { value, chars } => binary(ctx, value, chars, strings::strip_chars),
            Expr::TruncateNameForMef(operand) => {
                vectorize1(&operand.eval(ctx)?, strings::truncate_name_for_mef)
            }

            Expr::LastDayOfMonth(operand) => {
                vectorize1(&operand.eval(ctx)?, math::last_day_of_month)
            }
            Expr::AddPayrollMonths { date, months } => {
                binary(ctx, date, months, math::add_payroll_months)
            }

            Expr::Count(operand) => Ok(collections::count(&operand.eval(ctx)?)),
            Expr::CollectionSum(operand) => {
                let evaluated = operand.eval(ctx)?;
                collections::sum(ctx, operand, &evaluated)
            }
            Expr::Filter {
                collection,
                predicate,
            } => collections::filter(ctx, collection, predicate),
            Expr::Find {
                collection,
                predicate,
            } => collections::find(ctx, collection, predicate),
            Expr::IndexOf { collection, index } => {
                let collection = collection.eval(ctx)?;
                let index = index.eval(ctx)?;
                collections::index_of(&collection, &index)
            }

            Expr::EnumOptions(options) => options::enum_options(ctx, options),
            Expr::EnumOptionsContains { options, value } => {
                let options = options.eval(ctx)?;
                let value = value.eval(ctx)?;
                options::contains(&options, &value)
            }
            Expr::EnumOptionsSize(operand) => options::size(&operand.eval(ctx)?),

            Expr::IsComplete(operand) => Ok(logic::is_complete(&operand.eval(ctx)?)),
        }
    }

    /// The dependency references of this expression, resolved to abstract
    /// absolute paths against the owning definition's path.
    ///
    /// # Errors
    /// Returns a [`PathError`] when a relative reference cannot resolve
    /// against `owner`.
    pub fn deps(&self, owner: &Path) -> Result<Vec<DepRef>, PathError> {
        let mut out = Vec::new();
        self.collect_deps(owner, true, &mut out)?;
        Ok(out)
    }

    /// Like [`deps`](Self::deps), but preserves member segments instead of
    /// abstracting them, which is the shape explain traces need when walking a
    /// concrete fact.
    pub(crate) fn deps_at(&self, owner: &Path) -> Result<Vec<DepRef>, PathError> {
        let mut out = Vec::new();
        self.collect_deps(owner, false, &mut out)?;
        Ok(out)
    }

    fn collect_deps(
        &self,
        owner: &Path,
        abstracted: bool,
        out: &mut Vec<DepRef>,
    ) -> Result<(), PathError> {
        let finish = |path: Path| if abstracted { path.to_abstract() } else { path };
        match self {
            Expr::Const(_) | Expr::Writable | Expr::Today => {}
            Expr::Dep(dep) => {
                let resolved = finish(dep.path.resolve(owner)?);
                out.push(DepRef {
                    path: resolved,
                    module: dep.module.clone(),
                });
            }
            Expr::Filter {
                collection,
                predicate,
            }
            | Expr::Find {
                collection,
                predicate,
            } => {
                let collection = finish(collection.resolve(owner)?);
                let member_position = collection.to_abstract().wildcard();
                out.push(DepRef {
                    path: collection,
                    module: None,
                });
                predicate.collect_deps(&member_position, true, out)?;
            }
            _ => {
                for child in self.children() {
                    child.collect_deps(owner, abstracted, out)?;
                }
            }
        }
        Ok(())
    }

    /// Immediate child expressions, for uniform traversal.
    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Writable | Expr::Dep(_) | Expr::Today => Vec::new(),
            Expr::Switch(cases) | Expr::ConditionalList(cases) => cases
                .iter()
                .flat_map(|c| [&c.condition, &c.value])
                .collect(),
            Expr::Add(operands)
            | Expr::Multiply(operands)
            | Expr::GreaterOf(operands)
            | Expr::LesserOf(operands)
            | Expr::All(operands)
            | Expr::Any(operands) => operands.iter().collect(),
            Expr::Subtract {
                minuend,
                subtrahends,
            } => std::iter::once(minuend.as_ref())
                .chain(subtrahends.iter())
                .collect(),
            Expr::Divide { dividend, divisor } => vec![dividend.as_ref(), divisor.as_ref()],
            Expr::Maximum(operand)
            | Expr::Minimum(operand)
            | Expr::Round(operand)
            | Expr::RoundToInt(operand)
            | Expr::Ceiling(operand)
            | Expr::Floor(operand)
            | Expr::Not(operand)
            | Expr::Length(operand)
            | Expr::AsString(operand)
            | Expr::AsDecimalString(operand)
            | Expr::Trim(operand)
            | Expr::ToUpper(operand)
            | Expr::TruncateNameForMef(operand)
            | Expr::LastDayOfMonth(operand)
            | Expr::Count(operand)
            | Expr::CollectionSum(operand)
            | Expr::EnumOptionsSize(operand)
            | Expr::IsComplete(operand) => vec![operand.as_ref()],
            Expr::Equal(a, b)
            | Expr::NotEqual(a, b)
            | Expr::GreaterThan(a, b)
            | Expr::GreaterOrEqual(a, b)
            | Expr::LessThan(a, b)
            | Expr::LessOrEqual(a, b) => vec![a.as_ref(), b.as_ref()],
            Expr::Paste { parts, .. } => parts.iter().collect(),
            Expr::StripChars { value, chars } => vec![value.as_ref(), chars.as_ref()],
            Expr::AddPayrollMonths { date, months } => vec![date.as_ref(), months.as_ref()],
            Expr::IndexOf { collection, index } => {
                vec![collection.as_ref(), index.as_ref()]
            }
            Expr::Filter { predicate, .. } | Expr::Find { predicate, .. } => {
                vec![predicate.as_ref()]
            }
            Expr::EnumOptions(options) => options
                .iter()
                .filter_map(|o| o.condition.as_ref())
                .collect(),
            Expr::EnumOptionsContains { options, value } => {
                vec![options.as_ref(), value.as_ref()]
            }
        }
    }

    /// A compact, human-readable rendering used by explain traces.
    pub fn describe(&self) -> String {
        match self {
            Expr::Const(Value::Str(s)) => format!("\"{s}\""),
            Expr::Const(v) => v.to_string(),
            Expr::Writable => "input".to_string(),
            Expr::Dep(dep) => match &dep.module {
                Some(module) => format!("{module}::{}", dep.path),
                None => dep.path.to_string(),
            },
            Expr::Today => "Today".to_string(),
            Expr::Switch(cases) => {
                let mut out = String::from("Switch(");
                for (i, case) in cases.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    let _ = write!(
                        out,
                        "{} => {}",
                        case.condition.describe(),
                        case.value.describe()
                    );
                }
                out.push(')');
                out
            }
            Expr::ConditionalList(cases) => format!("ConditionalList({} cases)", cases.len()),
            Expr::Add(operands) => nary("Add", operands),
            Expr::Subtract {
                minuend,
                subtrahends,
            } => {
                let mut args = vec![minuend.as_ref()];
                args.extend(subtrahends.iter());
                nary_refs("Subtract", &args)
            }
            Expr::Multiply(operands) => nary("Multiply", operands),
            Expr::Divide { dividend, divisor } => {
                format!("Divide({}, {})", dividend.describe(), divisor.describe())
            }
            Expr::GreaterOf(operands) => nary("GreaterOf", operands),
            Expr::LesserOf(operands) => nary("LesserOf", operands),
            Expr::Maximum(operand) => format!("Maximum({})", operand.describe()),
            Expr::Minimum(operand) => format!("Minimum({})", operand.describe()),
            Expr::Round(operand) => format!("Round({})", operand.describe()),
            Expr::RoundToInt(operand) => format!("RoundToInt({})", operand.describe()),
            Expr::Ceiling(operand) => format!("Ceiling({})", operand.describe()),
            Expr::Floor(operand) => format!("Floor({})", operand.describe()),
            Expr::Not(operand) => format!("Not({})", operand.describe()),
            Expr::All(operands) => nary("All", operands),
            Expr::Any(operands) => nary("Any", operands),
            Expr::Equal(a, b) => format!("{} = {}", a.describe(), b.describe()),
            Expr::NotEqual(a, b) => format!("{} != {}", a.describe(), b.describe()),
            Expr::GreaterThan(a, b) => format!("{} > {}", a.describe(), b.describe()),
            Expr::GreaterOrEqual(a, b) => format!("{} >= {}", a.describe(), b.describe()),
            Expr::LessThan(a, b) => format!("{} < {}", a.describe(), b.describe()),
            Expr::LessOrEqual(a, b) => format!("{} <= {}", a.describe(), b.describe()),
            Expr::Length(operand) => format!("Length({})", operand.describe()),
            Expr::Paste { parts, .. } => nary("Paste", parts),
            Expr::AsString(operand) => format!("AsString({})", operand.describe()),
            Expr::AsDecimalString(operand) => {
                format!("AsDecimalString({})", operand.describe())
            }
            Expr::Trim(operand) => format!("Trim({})", operand.describe()),
            Expr::ToUpper(operand) => format!("ToUpper({})", operand.describe()),
            Expr::StripChars { value, chars } => {
                format!("StripChars({}, {})", value.describe(), chars.describe())
            }
            Expr::TruncateNameForMef(operand) => {
                format!("TruncateNameForMeF({})", operand.describe())
            }
            Expr::LastDayOfMonth(operand) => format!("LastDayOfMonth({})", operand.describe()),
            Expr::AddPayrollMonths { date, months } => format!(
                "AddPayrollMonths({}, {})",
                date.describe(),
                months.describe()
            ),
            Expr::Count(operand) => format!("Count({})", operand.describe()),
            Expr::CollectionSum(operand) => format!("CollectionSum({})", operand.describe()),
            Expr::Filter {
                collection,
                predicate,
            } => format!("Filter({collection}, {})", predicate.describe()),
            Expr::Find {
                collection,
                predicate,
            } => format!("Find({collection}, {})", predicate.describe()),
            Expr::IndexOf { collection, index } => {
                format!("IndexOf({}, {})", collection.describe(), index.describe())
            }
            Expr::EnumOptions(options) => format!("EnumOptions({} options)", options.len()),
            Expr::EnumOptionsContains { options, value } => format!(
                "EnumOptionsContains({}, {})",
                options.describe(),
                value.describe()
            ),
            Expr::EnumOptionsSize(operand) => {
                format!("EnumOptionsSize({})", operand.describe())
            }
            Expr::IsComplete(operand) => format!("IsComplete({})", operand.describe()),
        }
    }

    /// Freeze-time kind inference.
    ///
    /// `lookup` resolves an abstract path to its declared kind. `None`
    /// means the kind cannot be decided statically (which is accepted);
    /// disagreements and unknown dependencies are reported.
    ///
    /// # Errors
    /// Returns [`DictionaryError::UnknownDependency`] for a reference to an
    /// undeclared fact and [`DictionaryError::KindMismatch`] when operand
    /// kinds cannot combine.
    pub(crate) fn infer_kind(
        &self,
        owner: &Path,
        owner_kind: ValueKind,
        lookup: &dyn Fn(&Path) -> Option<ValueKind>,
    ) -> Result<Option<ValueKind>, DictionaryError> {
        use ValueKind as K;
        let of = owner.to_string();
        let mismatch = |a: K, b: K| DictionaryError::KindMismatch {
            path: of.clone(),
            declared: a,
            inferred: b,
        };
        match self {
            Expr::Const(v) => Ok(Some(v.kind())),
            Expr::Writable => Ok(Some(owner_kind)),
            Expr::Dep(dep) => {
                let resolved = dep.path.resolve(owner)?.to_abstract();
                match lookup(&resolved) {
                    Some(kind) => Ok(Some(kind)),
                    None => Err(DictionaryError::UnknownDependency {
                        path: resolved.to_string(),
                        of: of.clone(),
                    }),
                }
            }
            Expr::Today | Expr::LastDayOfMonth(_) | Expr::AddPayrollMonths { .. } => {
                Ok(Some(K::Day))
            }
            Expr::Switch(cases) | Expr::ConditionalList(cases) => {
                let mut unified: Option<K> = None;
                for case in cases {
                    if let Some(k) =
                        case.condition.infer_kind(owner, owner_kind, lookup)?
                    {
                        if k != K::Bool {
                            return Err(mismatch(K::Bool, k));
                        }
                    }
                    if let Some(k) = case.value.infer_kind(owner, owner_kind, lookup)? {
                        match unified {
                            None => unified = Some(k),
                            Some(u) if u != k => return Err(mismatch(u, k)),
                            Some(_) => {}
                        }
                    }
                }
                Ok(unified)
            }
            Expr::Add(operands)
            | Expr::Multiply(operands)
            | Expr::GreaterOf(operands)
            | Expr::LesserOf(operands) => {
                let mut unified: Option<K> = None;
                for operand in operands {
                    let Some(k) = operand.infer_kind(owner, owner_kind, lookup)? else {
                        return Ok(None);
                    };
                    unified = Some(match unified {
                        None => k,
                        Some(u) => math::promoted_kind(u, k).ok_or_else(|| mismatch(u, k))?,
                    });
                }
                Ok(unified)
            }
            Expr::Subtract {
                minuend,
                subtrahends,
            } => {
                let mut unified = match minuend.infer_kind(owner, owner_kind, lookup)? {
                    Some(k) => k,
                    None => return Ok(None),
                };
                for operand in subtrahends {
                    let Some(k) = operand.infer_kind(owner, owner_kind, lookup)? else {
                        return Ok(None);
                    };
                    unified = math::promoted_kind(unified, k)
                        .ok_or_else(|| mismatch(unified, k))?;
                }
                // a pair of dates subtracts to a day count
                if unified == K::Day
                    && subtrahends
                        .iter()
                        .map(|s| s.infer_kind(owner, owner_kind, lookup))
                        .any(|k| matches!(k, Ok(Some(K::Day))))
                {
                    return Ok(Some(K::Days));
                }
                Ok(Some(unified))
            }
            Expr::Divide { dividend, divisor } => {
                let a = dividend.infer_kind(owner, owner_kind, lookup)?;
                let b = divisor.infer_kind(owner, owner_kind, lookup)?;
                let (Some(a), Some(b)) = (a, b) else {
                    return Ok(None);
                };
                match (a, b) {
                    (K::Int | K::Rational, K::Int | K::Rational)
                    | (K::Dollar, K::Dollar) => Ok(Some(K::Rational)),
                    (K::Dollar, K::Int | K::Rational) => Ok(Some(K::Dollar)),
                    _ => Err(mismatch(a, b)),
                }
            }
            Expr::Maximum(operand)
            | Expr::Minimum(operand)
            | Expr::CollectionSum(operand)
            | Expr::Round(operand)
            | Expr::Ceiling(operand)
            | Expr::Floor(operand) => operand.infer_kind(owner, owner_kind, lookup),
            Expr::RoundToInt(_)
            | Expr::Length(_)
            | Expr::Count(_)
            | Expr::EnumOptionsSize(_) => Ok(Some(K::Int)),
            Expr::Not(operand) => {
                if let Some(k) = operand.infer_kind(owner, owner_kind, lookup)? {
                    if k != K::Bool {
                        return Err(mismatch(K::Bool, k));
                    }
                }
                Ok(Some(K::Bool))
            }
            Expr::All(operands) | Expr::Any(operands) => {
                for operand in operands {
                    if let Some(k) = operand.infer_kind(owner, owner_kind, lookup)? {
                        if k != K::Bool {
                            return Err(mismatch(K::Bool, k));
                        }
                    }
                }
                Ok(Some(K::Bool))
            }
            Expr::Equal(a, b)
            | Expr::NotEqual(a, b)
            | Expr::GreaterThan(a, b)
            | Expr::GreaterOrEqual(a, b)
            | Expr::LessThan(a, b)
            | Expr::LessOrEqual(a, b) => {
                // both sides must at least resolve
                a.infer_kind(owner, owner_kind, lookup)?;
                b.infer_kind(owner, owner_kind, lookup)?;
                Ok(Some(K::Bool))
            }
            Expr::EnumOptionsContains { options, value } => {
                options.infer_kind(owner, owner_kind, lookup)?;
                value.infer_kind(owner, owner_kind, lookup)?;
                Ok(Some(K::Bool))
            }
            Expr::IsComplete(operand) => {
                operand.infer_kind(owner, owner_kind, lookup)?;
                Ok(Some(K::Bool))
            }
            Expr::Paste { parts, .. } => {
                for part in parts {
                    part.infer_kind(owner, owner_kind, lookup)?;
                }
                Ok(Some(K::Str))
            }
            Expr::AsString(operand)
            | Expr::AsDecimalString(operand)
            | Expr::Trim(operand)
            | Expr::ToUpper(operand)
            | Expr::TruncateNameForMef(operand) => {
                operand.infer_kind(owner, owner_kind, lookup)?;
                Ok(Some(K::Str))
            }
            Expr::StripChars { value, chars } => {
                value.infer_kind(owner, owner_kind, lookup)?;
                chars.infer_kind(owner, owner_kind, lookup)?;
                Ok(Some(K::Str))
            }
            Expr::Filter {
                collection,
                predicate,
            } => {
                let member_position = collection.resolve(owner)?.to_abstract().wildcard();
                if let Some(k) =
                    predicate.infer_kind(&member_position, owner_kind, lookup)?
                {
                    if k != K::Bool {
                        return Err(mismatch(K::Bool, k));
                    }
                }
                Ok(Some(K::Collection))
            }
            Expr::Find {
                collection,
                predicate,
            } => {
                let member_position = collection.resolve(owner)?.to_abstract().wildcard();
                if let Some(k) =
                    predicate.infer_kind(&member_position, owner_kind, lookup)?
                {
                    if k != K::Bool {
                        return Err(mismatch(K::Bool, k));
                    }
                }
                Ok(Some(K::Str))
            }
            Expr::IndexOf { collection, index } => {
                collection.infer_kind(owner, owner_kind, lookup)?;
                if let Some(k) = index.infer_kind(owner, owner_kind, lookup)? {
                    if k != K::Int {
                        return Err(mismatch(K::Int, k));
                    }
                }
                Ok(Some(K::Str))
            }
            Expr::EnumOptions(options) => {
                for option in options {
                    if let Some(condition) = &option.condition {
                        if let Some(k) =
                            condition.infer_kind(owner, owner_kind, lookup)?
                        {
                            if k != K::Bool {
                                return Err(mismatch(K::Bool, k));
                            }
                        }
                    }
                }
                Ok(Some(K::MultiEnum))
            }
        }
    }
}

fn nary(name: &str, operands: &[Expr]) -> String {
    let refs: Vec<&Expr> = operands.iter().collect();
    nary_refs(name, &refs)
}

fn nary_refs(name: &str, operands: &[&Expr]) -> String {
    let mut out = format!("{name}(");
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&operand.describe());
    }
    out.push(')');
    out
}

fn binary(
    ctx: &EvalContext<'_>,
    a: &Expr,
    b: &Expr,
    f: impl Fn(&Value, &Value) -> Computed<Value>,
) -> Result<Evaluated, EvalError> {
    let a = a.eval(ctx)?;
    let b = b.eval(ctx)?;
    vectorize2(&a, &b, f)
}

fn fold_binary(
    ctx: &EvalContext<'_>,
    operands: &[Expr],
    f: impl Fn(&Value, &Value) -> Computed<Value> + Copy,
) -> Result<Evaluated, EvalError> {
    let mut iter = operands.iter();
    let Some(first) = iter.next() else {
        return Ok(MaybeVec::Single(Computed::Incomplete));
    };
    let mut acc = first.eval(ctx)?;
    for operand in iter {
        let value = operand.eval(ctx)?;
        acc = vectorize2(&acc, &value, f)?;
    }
    Ok(acc)
}

/// Reduces a vector to a single value with a strict binary fold: every
/// element must carry a value, placeholders and unknown membership demote,
/// and an empty vector is incomplete.
fn reduce(
    evaluated: Evaluated,
    f: impl Fn(&Value, &Value) -> Computed<Value>,
) -> Result<Evaluated, EvalError> {
    let (items, complete) = match evaluated {
        MaybeVec::Multiple { items, complete } => (items, complete),
        single => return Ok(single),
    };
    let mut demote = !complete;
    let mut acc: Option<Value> = None;
    for item in items {
        let value = match item {
            Computed::Complete(v) => v,
            Computed::Placeholder(v) => {
                demote = true;
                v
            }
            Computed::Incomplete => return Ok(MaybeVec::Single(Computed::Incomplete)),
        };
        acc = match acc {
            None => Some(value),
            Some(prev) => match f(&prev, &value) {
                Computed::Complete(v) | Computed::Placeholder(v) => Some(v),
                Computed::Incomplete => {
                    return Ok(MaybeVec::Single(Computed::Incomplete))
                }
            },
        };
    }
    Ok(MaybeVec::Single(match acc {
        Some(v) if demote => Computed::Placeholder(v),
        Some(v) => Computed::Complete(v),
        None => Computed::Incomplete,
    }))
}
