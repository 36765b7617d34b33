//! The five entity kinds
//!
//! Legacy record shapes are modelled as small layout enums tried in a fixed
//! priority order, the same way the work scanner handles hosting sources.

use super::{Entity, EntityKind, LinkScope};
use semoa_common::fields;
use semoa_common::tables::{
    AuthorInstitution, AuthorRow, ConceptAncestor, ConceptRow, InstitutionRow, PublisherRow,
    SourcePublisher, SourceRow, Table,
};
use serde::Serialize;
use serde_json::Value;

/// Link type of kinds without side relations; has no values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unlinked {}

// ============================================================================
// Authors
// ============================================================================

/// Where an author record lists its institutions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitutionLayout {
    /// `last_known_institutions: [{id, ...}, ...]`
    List,
    /// `last_known_institution: {id, ...}`
    Single,
}

impl InstitutionLayout {
    pub const PRIORITY: [InstitutionLayout; 2] = [InstitutionLayout::List, InstitutionLayout::Single];

    pub fn institutions(self, record: &Value) -> Option<Vec<&Value>> {
        match self {
            InstitutionLayout::List => match record.get("last_known_institutions") {
                Some(Value::Array(items)) => Some(items.iter().collect()),
                _ => None,
            },
            InstitutionLayout::Single => match record.get("last_known_institution") {
                Some(item) if item.is_object() => Some(vec![item]),
                _ => None,
            },
        }
    }
}

/// Institutions under the first layout present; empty if none is
pub fn last_known_institutions(record: &Value) -> Vec<&Value> {
    InstitutionLayout::PRIORITY
        .iter()
        .find_map(|layout| layout.institutions(record))
        .unwrap_or_default()
}

pub struct Authors;

impl EntityKind for Authors {
    type Row = AuthorRow;
    type Link = AuthorInstitution;
    const ENTITY: Entity = Entity::Authors;
    const LINK_TABLE: Option<Table> = Some(Table::AuthorInstitution);

    fn key(record: &Value) -> Option<String> {
        fields::id_of(record)
    }

    fn row(key: &str, record: &Value) -> AuthorRow {
        AuthorRow {
            id: key.to_string(),
            name: fields::text(record, "display_name"),
            orcid: fields::text(record, "orcid"),
            works_count: fields::count(record, "works_count"),
            cited_by_count: fields::count(record, "cited_by_count"),
        }
    }

    /// Only institutions already in the institution frontier are linked
    fn links(key: &str, record: &Value, scope: &mut LinkScope<'_>) -> Vec<AuthorInstitution> {
        last_known_institutions(record)
            .into_iter()
            .filter_map(|institution| institution.get("id").and_then(fields::reference))
            .filter(|id| scope.related.contains(id))
            .map(|institution_id| AuthorInstitution {
                author_id: key.to_string(),
                institution_id,
            })
            .collect()
    }
}

// ============================================================================
// Institutions
// ============================================================================

pub struct Institutions;

impl EntityKind for Institutions {
    type Row = InstitutionRow;
    type Link = Unlinked;
    const ENTITY: Entity = Entity::Institutions;
    const LINK_TABLE: Option<Table> = None;

    fn key(record: &Value) -> Option<String> {
        fields::id_of(record)
    }

    fn row(key: &str, record: &Value) -> InstitutionRow {
        InstitutionRow {
            id: key.to_string(),
            display_name: fields::text(record, "display_name"),
            country_code: fields::text(record, "country_code"),
            institution_type: fields::text(record, "type"),
            works_count: fields::count(record, "works_count"),
            cited_by_count: fields::count(record, "cited_by_count"),
        }
    }

    fn links(_key: &str, _record: &Value, _scope: &mut LinkScope<'_>) -> Vec<Unlinked> {
        Vec::new()
    }
}

// ============================================================================
// Concepts
// ============================================================================

pub struct Concepts;

impl EntityKind for Concepts {
    type Row = ConceptRow;
    type Link = ConceptAncestor;
    const ENTITY: Entity = Entity::Concepts;
    const LINK_TABLE: Option<Table> = Some(Table::ConceptAncestor);

    fn key(record: &Value) -> Option<String> {
        fields::id_of(record)
    }

    fn row(key: &str, record: &Value) -> ConceptRow {
        ConceptRow {
            id: key.to_string(),
            display_name: fields::text(record, "display_name"),
            level: fields::count(record, "level"),
            works_count: fields::count(record, "works_count"),
            cited_by_count: fields::count(record, "cited_by_count"),
        }
    }

    /// Every ancestor joins the live frontier, seen already or not
    fn links(key: &str, record: &Value, scope: &mut LinkScope<'_>) -> Vec<ConceptAncestor> {
        let mut links = Vec::new();
        for ancestor in fields::array(record, "ancestors") {
            if let Some(ancestor_id) = ancestor.get("id").and_then(fields::reference) {
                scope.frontier.insert(ancestor_id.clone());
                links.push(ConceptAncestor {
                    concept_id: key.to_string(),
                    ancestor_id,
                });
            }
        }
        links
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Source fields that may carry the publisher name, in priority order
pub const SOURCE_PUBLISHER_KEYS: [&str; 2] = ["host_organization_name", "publisher"];

pub struct Sources;

impl EntityKind for Sources {
    type Row = SourceRow;
    type Link = SourcePublisher;
    const ENTITY: Entity = Entity::Sources;
    const LINK_TABLE: Option<Table> = Some(Table::SourcePublisher);

    fn key(record: &Value) -> Option<String> {
        fields::id_of(record)
    }

    fn row(key: &str, record: &Value) -> SourceRow {
        SourceRow {
            id: key.to_string(),
            display_name: fields::text(record, "display_name"),
            issn: fields::text(record, "issn_l"),
            works_count: fields::count(record, "works_count"),
            cited_by_count: fields::count(record, "cited_by_count"),
        }
    }

    fn links(key: &str, record: &Value, scope: &mut LinkScope<'_>) -> Vec<SourcePublisher> {
        SOURCE_PUBLISHER_KEYS
            .iter()
            .find_map(|field| fields::opt_text(record, field))
            .filter(|name| scope.related.contains(name))
            .map(|publisher_name| SourcePublisher {
                source_id: key.to_string(),
                publisher_name,
            })
            .into_iter()
            .collect()
    }
}

// ============================================================================
// Publishers
// ============================================================================

pub struct Publishers;

impl EntityKind for Publishers {
    type Row = PublisherRow;
    type Link = Unlinked;
    const ENTITY: Entity = Entity::Publishers;
    const LINK_TABLE: Option<Table> = None;

    /// The display name as written; never normalized or case-folded
    fn key(record: &Value) -> Option<String> {
        fields::opt_text(record, "display_name")
    }

    fn row(key: &str, record: &Value) -> PublisherRow {
        PublisherRow {
            name: key.to_string(),
            works_count: fields::count(record, "works_count"),
            cited_by_count: fields::count(record, "cited_by_count"),
            country_codes: fields::string_list(record, "country_codes").join(","),
        }
    }

    fn links(_key: &str, _record: &Value, _scope: &mut LinkScope<'_>) -> Vec<Unlinked> {
        Vec::new()
    }
}
