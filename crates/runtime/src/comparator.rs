use std::cmp::Ordering;
use std::marker::PhantomData;

use mux_cql::CqlQuery;
use mux_error::{find_closest_match, ErrorCode, ErrorContext, MuxError, Result};

use crate::entity::Entity;

/// Total order over `E` derived from a `sortby` clause.
#[derive(Debug, Clone)]
pub struct EntityComparator<E> {
    field: &'static str,
    descending: bool,
    _entity: PhantomData<fn(&E)>,
}

impl<E: Entity> EntityComparator<E> {
    /// `Ok(None)` when the query has no sort clause.
    pub fn build(query: &CqlQuery) -> Result<Option<Self>> {
        let key = match query.sort_keys.as_slice() {
            [] => return Ok(None),
            [key] => key,
            keys => {
                return Err(MuxError::new(
                    ErrorCode::MultipleSortKeys,
                    format!("only one sort index is supported, got {}", keys.len()),
                ))
            }
        };

        let field = E::SORT_FIELDS
            .iter()
            .copied()
            .find(|f| f.eq_ignore_ascii_case(&key.index))
            .ok_or_else(|| unsupported::<E>(&key.index))?;

        Ok(Some(Self {
            field,
            descending: key.is_descending(),
            _entity: PhantomData,
        }))
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    pub fn compare(&self, a: &E, b: &E) -> Ordering {
        let ord = compare_ignore_case(
            a.sort_value(self.field).unwrap_or(""),
            b.sort_value(self.field).unwrap_or(""),
        );
        if self.descending {
            ord.reverse()
        } else {
            ord
        }
    }
}

fn unsupported<E: Entity>(index: &str) -> MuxError {
    let supported: Vec<String> = E::SORT_FIELDS.iter().map(|f| f.to_string()).collect();
    let mut err = MuxError::new(
        ErrorCode::UnsupportedSortField,
        format!("unsupported sort index {}", index),
    );
    if let Some(suggestion) = find_closest_match(index, &supported) {
        err = err.with_hint(format!("Did you mean '{}'?", suggestion));
    }
    err.with_context(ErrorContext::SortField {
        field: index.to_string(),
        entity: E::NAME.to_string(),
        supported_fields: supported,
    })
}

fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}
