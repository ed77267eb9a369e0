//! Statement planner
//!
//! Orders rendered change-set entries into executable units. Every entry
//! becomes a node carrying dependency facts: the objects it provides,
//! requires, releases and consumes. Providers run before requirers and
//! releasers before consumers; a fixed phase per entry kind breaks ties so
//! the order is deterministic.
//!
//! A cycle (two new tables referencing each other) is resolved in a second
//! pass by creating the blocked tables without their foreign keys and adding
//! those afterwards.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::fmt;
use std::sync::LazyLock;

use drizzle_types::ddl::{Column, ColumnDefault, Constraint, Table};
use drizzle_types::naming::qualified_name;
use regex::Regex;

use crate::diff::{ChangeSet, ChangeSetEntry, SequenceTarget, TableName};
use crate::error::{PlanningCycleError, UnsupportedChange};
use crate::rules::{DeferredCreate, DialectRules, RenderResult, Rendered, TableRebuildPlan};
use crate::tracing::{trace_plan, trace_warn};

/// Schema object a plan node depends on
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectRef {
    Schema(String),
    Enum(String),
    Sequence(String),
    Table(String),
    Column(String, String),
    /// A column reachable under this name, provided by a rename
    ColumnName(String, String),
    Index(String, String),
    Constraint(String, String),
}

/// Where a plan unit came from
#[derive(Clone, Debug, PartialEq)]
pub enum UnitOrigin {
    /// One change-set entry
    Entry(ChangeSetEntry),
    /// A table rebuild together with every entry it subsumes
    Rebuild {
        plan: TableRebuildPlan,
        entries: Vec<ChangeSetEntry>,
    },
    /// A foreign key split off a `CREATE TABLE` to break a cycle
    DeferredForeignKey {
        table: TableName,
        constraint: Constraint,
    },
}

/// Executable group of statements
#[derive(Clone, Debug, PartialEq)]
pub struct PlanUnit {
    /// 1-based position in the plan
    pub id: usize,
    /// Human readable summary
    pub description: String,
    /// Runs before the unit's transaction
    pub setup: Vec<String>,
    pub statements: Vec<String>,
    /// Runs after the unit's transaction
    pub teardown: Vec<String>,
    /// `statements` must succeed or fail together
    pub atomic: bool,
    pub origin: UnitOrigin,
}

impl PlanUnit {
    /// Every statement in execution order
    pub fn all_statements(&self) -> impl Iterator<Item = &String> {
        self.setup
            .iter()
            .chain(&self.statements)
            .chain(&self.teardown)
    }

    /// Change-set entries this unit applies
    pub fn entries(&self) -> Vec<&ChangeSetEntry> {
        match &self.origin {
            UnitOrigin::Entry(entry) => vec![entry],
            UnitOrigin::Rebuild { entries, .. } => entries.iter().collect(),
            UnitOrigin::DeferredForeignKey { .. } => Vec::new(),
        }
    }
}

/// A change left out of the plan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanWarning {
    pub entry: String,
    pub reason: String,
}

impl From<PlanWarning> for UnsupportedChange {
    fn from(warning: PlanWarning) -> Self {
        UnsupportedChange {
            change: warning.entry,
            reason: warning.reason,
        }
    }
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped `{}`: {}", self.entry, self.reason)
    }
}

/// Ordered, executable migration plan
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderedPlan {
    pub units: Vec<PlanUnit>,
    pub warnings: Vec<PlanWarning>,
}

impl OrderedPlan {
    /// Returns `true` if there is nothing to execute
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Every statement of every unit in execution order
    pub fn statements(&self) -> Vec<String> {
        self.units
            .iter()
            .flat_map(|u| u.all_statements().cloned())
            .collect()
    }

    /// Find a unit by id
    pub fn unit(&self, id: usize) -> Option<&PlanUnit> {
        self.units.iter().find(|u| u.id == id)
    }
}

// =============================================================================
// Dependency facts
// =============================================================================

#[derive(Clone, Debug, Default)]
struct Facts {
    provides: Vec<ObjectRef>,
    requires: Vec<ObjectRef>,
    releases: Vec<ObjectRef>,
    consumes: Vec<ObjectRef>,
    /// Releases dropped in the second pass (foreign keys between dropped tables)
    soft_releases: Vec<ObjectRef>,
}

impl Facts {
    fn merge(&mut self, other: Facts) {
        self.provides.extend(other.provides);
        self.requires.extend(other.requires);
        self.releases.extend(other.releases);
        self.consumes.extend(other.consumes);
        self.soft_releases.extend(other.soft_releases);
    }
}

static NEXTVAL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)nextval\(\s*'([^']+)'"#).ok());

fn unquote(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| part.trim().trim_matches(|c| c == '"' || c == '`'))
        .collect::<Vec<_>>()
        .join(".")
}

/// Strip the default namespace so keys match snapshot keys
fn normalize_key(key: &str) -> String {
    key.strip_prefix(crate::snapshot::DEFAULT_PG_SCHEMA)
        .and_then(|k| k.strip_prefix('.'))
        .unwrap_or(key)
        .to_string()
}

/// Key of the user type a column type may name (enums); array suffixes and
/// quoting are ignored
fn type_ref(sql_type: &str) -> ObjectRef {
    let base = sql_type.trim().trim_end_matches("[]");
    ObjectRef::Enum(normalize_key(&unquote(base)))
}

/// Sequences referenced by a `nextval('...')` default
fn sequence_refs(column: &Column) -> Vec<ObjectRef> {
    let Some(ColumnDefault::Expression(expr) | ColumnDefault::Literal(expr)) = &column.default
    else {
        return Vec::new();
    };
    let Some(re) = NEXTVAL.as_ref() else {
        return Vec::new();
    };
    re.captures_iter(expr)
        .map(|c| ObjectRef::Sequence(normalize_key(&unquote(&c[1]))))
        .collect()
}

fn column_requires(column: &Column) -> Vec<ObjectRef> {
    let mut refs = vec![type_ref(&column.sql_type)];
    refs.extend(sequence_refs(column));
    refs
}

fn schema_requires(schema: Option<&str>) -> Vec<ObjectRef> {
    schema
        .map(|s| vec![ObjectRef::Schema(s.to_string())])
        .unwrap_or_default()
}

fn fk_target<'a>(table: &TableName, constraint: &'a Constraint) -> Option<(String, &'a [String])> {
    match constraint {
        Constraint::ForeignKey {
            table_to,
            schema_to,
            columns_to,
            ..
        } => {
            let schema = schema_to.as_deref().or(table.schema.as_deref());
            Some((qualified_name(schema, table_to), columns_to.as_slice()))
        }
        _ => None,
    }
}

fn constraint_facts(
    table: &TableName,
    constraint: &Constraint,
    adding: bool,
    need_targets: bool,
) -> Facts {
    let key = table.key();
    let mut facts = Facts::default();
    let columns = constraint
        .columns()
        .iter()
        .map(|c| ObjectRef::Column(key.clone(), c.clone()));
    let own = ObjectRef::Constraint(key.clone(), constraint.name().to_string());

    if adding {
        facts.provides.push(own);
        facts.requires.push(ObjectRef::Table(key.clone()));
        facts.requires.extend(columns);
    } else {
        facts.consumes.push(own);
        facts.releases.extend(columns);
    }

    if let Some((target, columns_to)) = fk_target(table, constraint)
        && target != key
    {
        let target_columns = columns_to
            .iter()
            .map(|c| ObjectRef::Column(target.clone(), c.clone()));
        if adding {
            if need_targets {
                facts.requires.push(ObjectRef::Table(target.clone()));
            }
            facts.requires.extend(target_columns);
        } else {
            facts.releases.push(ObjectRef::Table(target.clone()));
            facts.releases.extend(target_columns);
        }
    }
    facts
}

fn create_table_facts(table: &Table, with_foreign_keys: bool, need_targets: bool) -> Facts {
    let name = TableName::of(table);
    let key = name.key();
    let mut facts = Facts {
        provides: vec![ObjectRef::Table(key.clone())],
        requires: schema_requires(table.schema.as_deref()),
        ..Facts::default()
    };
    for column in &table.columns {
        facts
            .provides
            .push(ObjectRef::Column(key.clone(), column.name.clone()));
        facts.requires.extend(column_requires(column));
    }
    for constraint in &table.constraints {
        if !with_foreign_keys && matches!(constraint, Constraint::ForeignKey { .. }) {
            continue;
        }
        facts.provides.push(ObjectRef::Constraint(
            key.clone(),
            constraint.name().to_string(),
        ));
        if let Some((target, columns_to)) = fk_target(&name, constraint)
            && target != key
        {
            if need_targets {
                facts.requires.push(ObjectRef::Table(target.clone()));
            }
            facts.requires.extend(
                columns_to
                    .iter()
                    .map(|c| ObjectRef::Column(target.clone(), c.clone())),
            );
        }
    }
    facts
}

fn entry_facts(entry: &ChangeSetEntry, need_targets: bool) -> Facts {
    use ChangeSetEntry as E;

    let mut facts = Facts::default();
    match entry {
        E::CreateSchema { name } => facts.provides.push(ObjectRef::Schema(name.clone())),
        E::DropSchema { name } => facts.consumes.push(ObjectRef::Schema(name.clone())),
        E::CreateEnum(e) => {
            facts.provides.push(ObjectRef::Enum(e.key()));
            facts.requires = schema_requires(e.schema.as_deref());
        }
        E::AlterEnum { enum_type, .. } => facts.provides.push(ObjectRef::Enum(enum_type.key())),
        E::DropEnum(e) => facts.consumes.push(ObjectRef::Enum(e.key())),
        E::CreateSequence(s) => {
            facts.provides.push(ObjectRef::Sequence(s.key()));
            facts.requires = schema_requires(s.schema.as_deref());
        }
        E::DropSequence(s) => facts.consumes.push(ObjectRef::Sequence(s.key())),
        E::AlterSequence { sequence, .. } => {
            if let SequenceTarget::Identity { table, column, .. } = sequence {
                facts.requires.push(ObjectRef::Table(table.key()));
                facts
                    .requires
                    .push(ObjectRef::Column(table.key(), column.clone()));
            }
        }
        E::CreateTable(table) => facts = create_table_facts(table, true, need_targets),
        E::DropTable(table) => {
            let name = TableName::of(table);
            facts.consumes.push(ObjectRef::Table(name.key()));
            for column in &table.columns {
                facts.releases.extend(column_requires(column));
            }
            for fk in table.foreign_keys() {
                if let Some((target, _)) = fk_target(&name, fk)
                    && target != name.key()
                {
                    facts.soft_releases.push(ObjectRef::Table(target));
                }
            }
        }
        E::RenameTable { to, .. } => facts.provides.push(ObjectRef::Table(to.key())),
        E::RenameColumn { table, to, .. } => {
            facts.requires.push(ObjectRef::Table(table.key()));
            facts
                .provides
                .push(ObjectRef::Column(table.key(), to.clone()));
            facts
                .provides
                .push(ObjectRef::ColumnName(table.key(), to.clone()));
        }
        E::AddColumn { table, column } => {
            facts.requires.push(ObjectRef::Table(table.key()));
            facts.requires.extend(column_requires(column));
            facts
                .provides
                .push(ObjectRef::Column(table.key(), column.name.clone()));
        }
        E::DropColumn { table, column } => {
            facts.requires.push(ObjectRef::Table(table.key()));
            facts
                .consumes
                .push(ObjectRef::Column(table.key(), column.name.clone()));
            facts.releases.extend(column_requires(column));
        }
        E::AlterColumnType {
            table,
            previous,
            next,
        }
        | E::AlterColumnNullability {
            table,
            previous,
            next,
        }
        | E::AlterColumnDefault {
            table,
            previous,
            next,
        }
        | E::AlterColumnGenerated {
            table,
            previous,
            next,
            ..
        }
        | E::AlterColumnIdentity {
            table,
            previous,
            next,
        } => {
            let column = ObjectRef::Column(table.key(), next.name.clone());
            facts.requires.push(ObjectRef::Table(table.key()));
            facts
                .requires
                .push(ObjectRef::ColumnName(table.key(), next.name.clone()));
            facts.requires.extend(column_requires(next));
            facts.consumes.push(column.clone());
            facts.provides.push(column);
            facts.releases.extend(column_requires(previous));
        }
        E::AddIndex { table, index } => {
            facts.requires.push(ObjectRef::Table(table.key()));
            facts.requires.extend(
                index
                    .columns
                    .iter()
                    .filter(|c| !c.is_expression)
                    .map(|c| ObjectRef::Column(table.key(), c.value.clone())),
            );
            facts
                .provides
                .push(ObjectRef::Index(table.key(), index.name.clone()));
        }
        E::DropIndex { table, index } => {
            facts
                .consumes
                .push(ObjectRef::Index(table.key(), index.name.clone()));
            facts.releases.extend(
                index
                    .columns
                    .iter()
                    .filter(|c| !c.is_expression)
                    .map(|c| ObjectRef::Column(table.key(), c.value.clone())),
            );
        }
        E::AddConstraint { table, constraint } => {
            facts = constraint_facts(table, constraint, true, need_targets);
        }
        E::DropConstraint { table, constraint } => {
            facts = constraint_facts(table, constraint, false, need_targets);
        }
    }
    facts
}

/// Tie-break class; lower runs first when no dependency decides
fn phase(entry: &ChangeSetEntry) -> u8 {
    use ChangeSetEntry as E;
    match entry {
        E::CreateSchema { .. } => 0,
        E::CreateEnum(_) | E::AlterEnum { .. } => 1,
        E::CreateSequence(_) => 2,
        E::DropConstraint { .. } | E::DropIndex { .. } => 3,
        E::RenameTable { .. } | E::RenameColumn { .. } => 4,
        E::CreateTable(_) => 5,
        E::AddColumn { .. }
        | E::AlterColumnType { .. }
        | E::AlterColumnNullability { .. }
        | E::AlterColumnDefault { .. }
        | E::AlterColumnGenerated { .. }
        | E::AlterColumnIdentity { .. }
        | E::AlterSequence { .. } => 6,
        E::DropColumn { .. } => 7,
        E::AddIndex { .. } | E::AddConstraint { .. } => 8,
        E::DropTable(_) => 9,
        E::DropSequence(_) | E::DropEnum(_) => 10,
        E::DropSchema { .. } => 11,
    }
}

const REBUILD_PHASE: u8 = 6;
const DEFERRED_FK_PHASE: u8 = 8;

// =============================================================================
// Graph
// =============================================================================

#[derive(Clone, Debug)]
struct Node {
    phase: u8,
    description: String,
    setup: Vec<String>,
    statements: Vec<String>,
    teardown: Vec<String>,
    atomic: bool,
    origin: UnitOrigin,
    facts: Facts,
    /// Deferred form, for `CREATE TABLE` nodes
    deferred: Option<(Table, DeferredCreate)>,
}

fn entry_node(entry: ChangeSetEntry, statements: Vec<String>, need_targets: bool) -> Node {
    Node {
        phase: phase(&entry),
        description: entry.to_string(),
        setup: Vec::new(),
        statements,
        teardown: Vec::new(),
        atomic: false,
        facts: entry_facts(&entry, need_targets),
        origin: UnitOrigin::Entry(entry),
        deferred: None,
    }
}

/// Sort nodes; returns the order and the nodes left blocked by a cycle
fn topological_order(nodes: &[Node], relax_soft: bool) -> (Vec<usize>, Vec<usize>) {
    let mut providers: HashMap<&ObjectRef, Vec<usize>> = HashMap::new();
    let mut releasers: HashMap<&ObjectRef, Vec<usize>> = HashMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        for object in &node.facts.provides {
            providers.entry(object).or_default().push(idx);
        }
        for object in &node.facts.releases {
            releasers.entry(object).or_default().push(idx);
        }
        if !relax_soft {
            for object in &node.facts.soft_releases {
                releasers.entry(object).or_default().push(idx);
            }
        }
    }

    let mut edges: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        let before = node
            .facts
            .requires
            .iter()
            .filter_map(|o| providers.get(o))
            .chain(node.facts.consumes.iter().filter_map(|o| releasers.get(o)))
            .flatten();
        for &from in before {
            if from != idx {
                edges[from].insert(idx);
            }
        }
    }

    let mut in_degree = vec![0usize; nodes.len()];
    for targets in &edges {
        for &to in targets {
            in_degree[to] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<(u8, usize)>> = nodes
        .iter()
        .enumerate()
        .filter(|(idx, _)| in_degree[*idx] == 0)
        .map(|(idx, node)| Reverse((node.phase, idx)))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse((_, idx))) = ready.pop() {
        order.push(idx);
        for &to in &edges[idx] {
            in_degree[to] -= 1;
            if in_degree[to] == 0 {
                ready.push(Reverse((nodes[to].phase, to)));
            }
        }
    }

    let blocked = (0..nodes.len()).filter(|idx| in_degree[*idx] > 0).collect();
    (order, blocked)
}

/// Replace blocked `CREATE TABLE` nodes with their deferred form
fn defer_foreign_keys(nodes: Vec<Node>, blocked: &[usize], need_targets: bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for (idx, node) in nodes.into_iter().enumerate() {
        let Some((table, deferred)) = node.deferred.clone().filter(|_| blocked.contains(&idx))
        else {
            out.push(node);
            continue;
        };
        trace_plan!("defer", table.key(), "creating table without foreign keys");

        let name = TableName::of(&table);
        out.push(Node {
            statements: deferred.create,
            facts: create_table_facts(&table, false, need_targets),
            deferred: None,
            ..node
        });
        for (constraint, sql) in deferred.foreign_keys {
            out.push(Node {
                phase: DEFERRED_FK_PHASE,
                description: format!("add foreign key {} on {name}", constraint.name()),
                setup: Vec::new(),
                statements: vec![sql],
                teardown: Vec::new(),
                atomic: false,
                facts: constraint_facts(&name, &constraint, true, true),
                origin: UnitOrigin::DeferredForeignKey {
                    table: name.clone(),
                    constraint,
                },
                deferred: None,
            });
        }
    }
    out
}

fn into_units(nodes: Vec<Node>, order: &[usize]) -> Vec<PlanUnit> {
    let mut slots: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    order
        .iter()
        .filter_map(|&idx| slots.get_mut(idx).and_then(Option::take))
        .enumerate()
        .map(|(position, node)| PlanUnit {
            id: position + 1,
            description: node.description,
            setup: node.setup,
            statements: node.statements,
            teardown: node.teardown,
            atomic: node.atomic,
            origin: node.origin,
        })
        .collect()
}

/// Order rendered entries into an executable plan
///
/// Entries rendered as unsupported become warnings. Entries rendered to no
/// statements are dropped. Every non-rename entry of a rebuilt table is
/// folded into the table's single rebuild unit.
pub fn plan(
    rendered: Vec<Rendered>,
    rules: &dyn DialectRules,
) -> Result<OrderedPlan, PlanningCycleError> {
    let need_targets = rules.foreign_keys_need_targets();
    let mut warnings = Vec::new();

    // One rebuild per table, keyed by table
    let mut rebuilds: BTreeMap<String, (TableRebuildPlan, Vec<ChangeSetEntry>, Facts)> =
        BTreeMap::new();
    for item in &rendered {
        if let RenderResult::RequiresRebuild(rebuild) = &item.result {
            rebuilds
                .entry(rebuild.table.key())
                .or_insert_with(|| (rebuild.clone(), Vec::new(), Facts::default()));
        }
    }

    let mut nodes = Vec::new();
    let mut rebuild_slots: BTreeMap<String, usize> = BTreeMap::new();
    for item in rendered {
        let Rendered {
            entry,
            result,
            deferred,
        } = item;

        if let RenderResult::Unsupported(reason) = &result {
            trace_warn!(format!("{entry}: {reason}"));
            warnings.push(PlanWarning {
                entry: entry.to_string(),
                reason: reason.clone(),
            });
            continue;
        }

        let rebuilt = entry
            .table_key()
            .filter(|key| !entry.is_rename() && rebuilds.contains_key(key));
        if let Some(key) = rebuilt {
            let facts = entry_facts(&entry, need_targets);
            if let Some((_, entries, merged)) = rebuilds.get_mut(&key) {
                merged.merge(facts);
                entries.push(entry);
            }
            // The rebuild takes the slot of its table's first entry
            if !rebuild_slots.contains_key(&key) {
                rebuild_slots.insert(key, nodes.len());
                nodes.push(None);
            }
            continue;
        }

        let RenderResult::Statements(statements) = result else {
            continue;
        };
        if statements.is_empty() {
            continue;
        }
        let deferred = match (&entry, deferred) {
            (ChangeSetEntry::CreateTable(table), Some(deferred)) => Some((table.clone(), deferred)),
            _ => None,
        };
        let mut node = entry_node(entry, statements, need_targets);
        node.deferred = deferred;
        nodes.push(Some(node));
    }

    for (key, slot) in rebuild_slots {
        let Some((plan, entries, facts)) = rebuilds.remove(&key) else {
            continue;
        };
        nodes[slot] = Some(Node {
            phase: REBUILD_PHASE,
            description: format!("rebuild table {} ({} change(s))", plan.table, entries.len()),
            setup: plan.setup.clone(),
            statements: plan.body.clone(),
            teardown: plan.teardown.clone(),
            atomic: plan.atomic,
            origin: UnitOrigin::Rebuild { plan, entries },
            facts,
            deferred: None,
        });
    }
    let nodes: Vec<Node> = nodes.into_iter().flatten().collect();

    trace_plan!("pass", 1, "ordering plan nodes");
    let (order, blocked) = topological_order(&nodes, false);
    if blocked.is_empty() {
        return Ok(OrderedPlan {
            units: into_units(nodes, &order),
            warnings,
        });
    }

    trace_plan!("pass", 2, "deferring foreign keys of blocked tables");
    let nodes = defer_foreign_keys(nodes, &blocked, need_targets);
    let (order, blocked) = topological_order(&nodes, true);
    if !blocked.is_empty() {
        return Err(PlanningCycleError {
            blocked: blocked
                .iter()
                .map(|&idx| nodes[idx].description.clone())
                .collect(),
        });
    }

    Ok(OrderedPlan {
        units: into_units(nodes, &order),
        warnings,
    })
}

/// Render and plan a change-set
pub fn plan_changes(
    changes: &ChangeSet,
    rules: &dyn DialectRules,
) -> Result<OrderedPlan, PlanningCycleError> {
    plan(crate::rules::render_all(rules, changes), rules)
}
