//! Typed aggregation pipelines.
//!
//! A [`Pipeline`] is a backend-neutral description of an aggregation: the MongoDB adapter
//! renders it to BSON stages, the in-memory store evaluates it directly.

use super::Filter;

/// Left-outer join by value: every document in `from` whose `foreign_field` equals the local
/// document's `local_field` is collected into the array `as_field`.
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub as_field: String,
}

/// What documents are grouped by.
#[derive(Clone, Debug, PartialEq)]
pub enum GroupKey {
    /// The value at a field path.
    Field(String),
    /// The `YYYY-MM` prefix of an RFC 3339 timestamp field.
    Month(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Accumulator {
    /// Number of documents in the group.
    Count,
    /// Sum of the numeric values at a path; non-numeric values are ignored.
    Sum(String),
    /// Mean of the numeric values at a path, or null if there are none.
    Avg(String),
    /// Values at a path collected in input order; missing values are skipped.
    Push(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    pub fields: Vec<(String, Accumulator)>,
}

impl Group {
    pub fn by(key: GroupKey) -> Self {
        Self {
            key,
            fields: Vec::new(),
        }
    }

    pub fn count(self, name: &str) -> Self {
        self.field(name, Accumulator::Count)
    }

    pub fn sum(self, name: &str, path: &str) -> Self {
        self.field(name, Accumulator::Sum(path.into()))
    }

    pub fn avg(self, name: &str, path: &str) -> Self {
        self.field(name, Accumulator::Avg(path.into()))
    }

    pub fn push(self, name: &str, path: &str) -> Self {
        self.field(name, Accumulator::Push(path.into()))
    }

    fn field(mut self, name: &str, acc: Accumulator) -> Self {
        self.fields.push((name.into(), acc));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    Match(Filter),
    Lookup(Lookup),
    /// One output document per element of the array field; documents whose field is missing or
    /// empty are dropped.
    Unwind(String),
    Group(Group),
    Sort(Vec<(String, SortOrder)>),
    /// Runs each named sub-pipeline over the same input and emits a single document.
    Facet(Vec<(String, Pipeline)>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(self, filter: Filter) -> Self {
        if filter == Filter::All {
            return self;
        }
        self.stage(Stage::Match(filter))
    }

    pub fn lookup(self, from: &str, local_field: &str, foreign_field: &str, as_field: &str) -> Self {
        self.stage(Stage::Lookup(Lookup {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
        }))
    }

    pub fn unwind(self, field: &str) -> Self {
        self.stage(Stage::Unwind(field.into()))
    }

    pub fn group(self, group: Group) -> Self {
        self.stage(Stage::Group(group))
    }

    pub fn sort(self, keys: &[(&str, SortOrder)]) -> Self {
        self.stage(Stage::Sort(
            keys.iter().map(|(k, o)| ((*k).to_owned(), *o)).collect(),
        ))
    }

    pub fn facet(self, facets: Vec<(&str, Pipeline)>) -> Self {
        self.stage(Stage::Facet(
            facets.into_iter().map(|(n, p)| (n.to_owned(), p)).collect(),
        ))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_all_adds_no_stage() {
        let p = Pipeline::new().matching(Filter::All).unwind("failures");
        assert_eq!(p.stages(), &[Stage::Unwind("failures".into())]);
    }

    #[test]
    fn group_builder_keeps_accumulator_order() {
        let g = Group::by(GroupKey::Field("status".into()))
            .count("count")
            .sum("total_cost", "cost")
            .push("shipments", "tracking_number");
        let names: Vec<&str> = g.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["count", "total_cost", "shipments"]);
    }
}
