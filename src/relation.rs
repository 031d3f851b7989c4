//! Relation metadata and the persisted half of the effective set.
//!
//! The ORM describes a relation with a [`RelationDescriptor`]. From it,
//! [`base_predicate`] builds an existence predicate over the slave table that
//! matches the rows already related to a saved master. The predicate never
//! joins, so it can be ORed with the ledger lookups without duplicating rows.

use std::{borrow::Cow, fmt, iter};

use tether_core::{
    Result, SQL, SQLParam, SelectBuilder, TetherError,
    expressions::conditions::{and, eq, exists},
};

use crate::{
    deferred::ResolveContext,
    ledger::{LedgerParam, text},
};

/// Relation kinds known to the ORM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    HasOne,
    HasMany,
    MorphOne,
    MorphMany,
    BelongsToMany,
    MorphToMany,
    MorphedByMany,
    BelongsTo,
    MorphTo,
    HasManyThrough,
}

impl RelationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationKind::HasOne => "has_one",
            RelationKind::HasMany => "has_many",
            RelationKind::MorphOne => "morph_one",
            RelationKind::MorphMany => "morph_many",
            RelationKind::BelongsToMany => "belongs_to_many",
            RelationKind::MorphToMany => "morph_to_many",
            RelationKind::MorphedByMany => "morphed_by_many",
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::MorphTo => "morph_to",
            RelationKind::HasManyThrough => "has_many_through",
        }
    }

    /// Kinds whose membership lives in a pivot table.
    pub const fn is_pivot(self) -> bool {
        matches!(
            self,
            RelationKind::BelongsToMany | RelationKind::MorphToMany | RelationKind::MorphedByMany
        )
    }

    /// Kinds discriminated by a morph type column.
    pub const fn is_polymorphic(self) -> bool {
        matches!(
            self,
            RelationKind::MorphOne
                | RelationKind::MorphMany
                | RelationKind::MorphToMany
                | RelationKind::MorphedByMany
                | RelationKind::MorphTo
        )
    }

    /// Kinds that can carry deferred bindings. The rest hold the key on the
    /// master side or go through an intermediate model.
    pub const fn is_resolvable(self) -> bool {
        !matches!(
            self,
            RelationKind::BelongsTo | RelationKind::MorphTo | RelationKind::HasManyThrough
        )
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table and its primary key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef<'a> {
    pub table: Cow<'a, str>,
    pub key: Cow<'a, str>,
}

impl<'a> TableRef<'a> {
    pub fn new(table: impl Into<Cow<'a, str>>, key: impl Into<Cow<'a, str>>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
        }
    }
}

/// The link table of a many-to-many relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable<'a> {
    pub table: Cow<'a, str>,
    /// Column pointing at the master.
    pub foreign_key: Cow<'a, str>,
    /// Column pointing at the slave.
    pub other_key: Cow<'a, str>,
}

impl<'a> PivotTable<'a> {
    pub fn new(
        table: impl Into<Cow<'a, str>>,
        foreign_key: impl Into<Cow<'a, str>>,
        other_key: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self {
            table: table.into(),
            foreign_key: foreign_key.into(),
            other_key: other_key.into(),
        }
    }
}

/// Type discriminator of a polymorphic relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Morph<'a> {
    pub type_column: Cow<'a, str>,
    /// Stored value identifying the owning type. `None` when the ORM could
    /// not resolve it, which fails resolution.
    pub class: Option<Cow<'a, str>>,
}

impl<'a> Morph<'a> {
    pub fn new(type_column: impl Into<Cow<'a, str>>, class: impl Into<Cow<'a, str>>) -> Self {
        Self {
            type_column: type_column.into(),
            class: Some(class.into()),
        }
    }

    pub fn unresolved(type_column: impl Into<Cow<'a, str>>) -> Self {
        Self {
            type_column: type_column.into(),
            class: None,
        }
    }
}

/// A named filter registered on the slave entity type.
#[derive(Debug, Clone)]
pub struct GlobalScope<'a, V: SQLParam> {
    pub name: Cow<'a, str>,
    pub condition: SQL<'a, V>,
}

impl<'a, V: SQLParam> GlobalScope<'a, V> {
    pub fn new(name: impl Into<Cow<'a, str>>, condition: SQL<'a, V>) -> Self {
        Self {
            name: name.into(),
            condition,
        }
    }
}

/// Everything the resolver needs to know about one relation.
#[derive(Debug, Clone)]
pub struct RelationDescriptor<'a, V: SQLParam> {
    pub kind: RelationKind,
    pub master: TableRef<'a>,
    pub slave: TableRef<'a>,
    /// Column on the slave table referencing the master, for direct kinds.
    pub foreign_key: Option<Cow<'a, str>>,
    pub pivot: Option<PivotTable<'a>>,
    pub morph: Option<Morph<'a>>,
    /// Conditions defined on the relation itself. They narrow the persisted
    /// rows only.
    pub constraints: Vec<SQL<'a, V>>,
    pub global_scopes: Vec<GlobalScope<'a, V>>,
}

impl<'a, V: SQLParam> RelationDescriptor<'a, V> {
    pub fn new(kind: RelationKind, master: TableRef<'a>, slave: TableRef<'a>) -> Self {
        Self {
            kind,
            master,
            slave,
            foreign_key: None,
            pivot: None,
            morph: None,
            constraints: Vec::new(),
            global_scopes: Vec::new(),
        }
    }

    pub fn has_one(
        master: TableRef<'a>,
        slave: TableRef<'a>,
        foreign_key: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self::new(RelationKind::HasOne, master, slave).with_foreign_key(foreign_key)
    }

    pub fn has_many(
        master: TableRef<'a>,
        slave: TableRef<'a>,
        foreign_key: impl Into<Cow<'a, str>>,
    ) -> Self {
        Self::new(RelationKind::HasMany, master, slave).with_foreign_key(foreign_key)
    }

    pub fn morph_many(
        master: TableRef<'a>,
        slave: TableRef<'a>,
        foreign_key: impl Into<Cow<'a, str>>,
        morph: Morph<'a>,
    ) -> Self {
        Self::new(RelationKind::MorphMany, master, slave)
            .with_foreign_key(foreign_key)
            .with_morph(morph)
    }

    pub fn belongs_to_many(master: TableRef<'a>, slave: TableRef<'a>, pivot: PivotTable<'a>) -> Self {
        Self::new(RelationKind::BelongsToMany, master, slave).with_pivot(pivot)
    }

    pub fn morph_to_many(
        master: TableRef<'a>,
        slave: TableRef<'a>,
        pivot: PivotTable<'a>,
        morph: Morph<'a>,
    ) -> Self {
        Self::new(RelationKind::MorphToMany, master, slave)
            .with_pivot(pivot)
            .with_morph(morph)
    }

    pub fn with_foreign_key(mut self, foreign_key: impl Into<Cow<'a, str>>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn with_pivot(mut self, pivot: PivotTable<'a>) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn with_morph(mut self, morph: Morph<'a>) -> Self {
        self.morph = Some(morph);
        self
    }

    pub fn constraint(mut self, condition: SQL<'a, V>) -> Self {
        self.constraints.push(condition);
        self
    }

    pub fn global_scope(mut self, name: impl Into<Cow<'a, str>>, condition: SQL<'a, V>) -> Self {
        self.global_scopes.push(GlobalScope::new(name, condition));
        self
    }
}

/// The owning record a relation is resolved for.
#[derive(Debug, Clone)]
pub struct MasterRecord<'a, V: SQLParam> {
    type_name: Cow<'a, str>,
    key: Option<V>,
    exists: bool,
    session_key: Option<Cow<'a, str>>,
}

impl<'a, V: SQLParam> MasterRecord<'a, V> {
    /// A record that has not been saved yet.
    pub fn new(type_name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            type_name: type_name.into(),
            key: None,
            exists: false,
            session_key: None,
        }
    }

    /// A saved record with its primary key.
    pub fn persisted(type_name: impl Into<Cow<'a, str>>, key: impl Into<V>) -> Self {
        Self {
            type_name: type_name.into(),
            key: Some(key.into()),
            exists: true,
            session_key: None,
        }
    }

    /// Associates the record with an edit session, used when the caller does
    /// not pass one.
    pub fn with_session_key(mut self, session_key: impl Into<Cow<'a, str>>) -> Self {
        self.session_key = Some(session_key.into());
        self
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub(crate) fn type_name_cow(&self) -> &Cow<'a, str> {
        &self.type_name
    }

    #[inline]
    pub fn key(&self) -> Option<&V> {
        self.key.as_ref()
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.exists
    }

    #[inline]
    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }
}

/// Whether the effective set exposes no pivot columns.
///
/// Pivot relations are resolved with an existence predicate instead of a
/// join, so the pivot row is never part of the result.
pub const fn orphan_mode(kind: RelationKind) -> bool {
    kind.is_pivot()
}

/// Validated shape of a resolvable descriptor.
enum Shape<'d, 'a> {
    Direct {
        foreign_key: &'d Cow<'a, str>,
        morph: Option<(&'d Cow<'a, str>, &'d Cow<'a, str>)>,
    },
    Pivot {
        pivot: &'d PivotTable<'a>,
        morph: Option<(&'d Cow<'a, str>, &'d Cow<'a, str>)>,
    },
}

impl<'d, 'a> Shape<'d, 'a> {
    fn of<V: SQLParam>(descriptor: &'d RelationDescriptor<'a, V>) -> Result<Self> {
        let kind = descriptor.kind;
        if !kind.is_resolvable() {
            return Err(TetherError::UnsupportedRelation(format!(
                "{kind} relation to {} cannot carry deferred bindings",
                descriptor.slave.table
            )));
        }

        let morph = if kind.is_polymorphic() {
            let Some(morph) = &descriptor.morph else {
                return Err(TetherError::Configuration(format!(
                    "{kind} relation to {} has no morph type column",
                    descriptor.slave.table
                )));
            };
            let Some(class) = &morph.class else {
                return Err(TetherError::Configuration(format!(
                    "{kind} relation to {} has no resolvable morph type for {}",
                    descriptor.slave.table, morph.type_column
                )));
            };
            Some((&morph.type_column, class))
        } else {
            None
        };

        if kind.is_pivot() {
            let Some(pivot) = &descriptor.pivot else {
                return Err(TetherError::Configuration(format!(
                    "{kind} relation to {} has no pivot table",
                    descriptor.slave.table
                )));
            };
            Ok(Shape::Pivot { pivot, morph })
        } else {
            let Some(foreign_key) = &descriptor.foreign_key else {
                return Err(TetherError::Configuration(format!(
                    "{kind} relation to {} has no foreign key",
                    descriptor.slave.table
                )));
            };
            Ok(Shape::Direct { foreign_key, morph })
        }
    }
}

/// Checks that a descriptor can be resolved at all, whether or not its master
/// has been saved.
pub fn validate<V: SQLParam>(descriptor: &RelationDescriptor<'_, V>) -> Result<()> {
    Shape::of(descriptor).map(|_| ())
}

/// Predicate over the slave table matching the rows already related to
/// `master`, or `None` when `master` has not been saved.
///
/// The relation's own constraints are ANDed onto the predicate.
pub fn base_predicate<'a, V: LedgerParam<'a>>(
    ctx: &ResolveContext,
    descriptor: &RelationDescriptor<'a, V>,
    master: &MasterRecord<'a, V>,
) -> Result<Option<SQL<'a, V>>> {
    let shape = Shape::of(descriptor)?;
    if !master.exists() {
        return Ok(None);
    }
    let Some(key) = master.key() else {
        return Err(TetherError::Configuration(format!(
            "saved {} record has no key",
            master.type_name()
        )));
    };

    let slave = ctx.table(&descriptor.slave.table);
    let key = SQL::value(key.clone());

    let base = match shape {
        Shape::Direct { foreign_key, morph } => {
            let mut conditions = vec![eq(
                SQL::qualified(slave.clone(), foreign_key.clone()),
                key,
            )];
            if let Some((column, class)) = morph {
                conditions.push(eq(SQL::qualified(slave, column.clone()), text(class)));
            }
            and(conditions)
        }
        Shape::Pivot { pivot, morph } => {
            let table = ctx.table(&pivot.table);
            let mut conditions = vec![
                eq(
                    SQL::qualified(table.clone(), pivot.other_key.clone()),
                    SQL::qualified(slave, descriptor.slave.key.clone()),
                ),
                eq(SQL::qualified(table.clone(), pivot.foreign_key.clone()), key),
            ];
            if let Some((column, class)) = morph {
                conditions.push(eq(
                    SQL::qualified(table.clone(), column.clone()),
                    text(class),
                ));
            }
            exists(
                SelectBuilder::new(SQL::number(1))
                    .from(table)
                    .r#where(and(conditions)),
            )
        }
    };

    Ok(Some(and(
        iter::once(base).chain(descriptor.constraints.iter().cloned()),
    )))
}
